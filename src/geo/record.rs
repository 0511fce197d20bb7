//! Location / ASN record returned by geo lookups.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::context::Coordinates;

/// Whatever the loaded database edition knows about an address.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoRecord {
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub continent: Option<String>,
    pub time_zone: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub asn: Option<u32>,
    pub asn_organization: Option<String>,
}

impl GeoRecord {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Raw MMDB layout shared by the City, Country and ASN editions.
///
/// Unknown fields are ignored, so one shape decodes every edition.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct MmdbRecord {
    city: Option<Named>,
    continent: Option<Named>,
    country: Option<Country>,
    location: Option<Location>,
    subdivisions: Option<Vec<Named>>,
    autonomous_system_number: Option<u32>,
    autonomous_system_organization: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Named {
    names: Option<BTreeMap<String, String>>,
}

impl Named {
    fn english(&self) -> Option<String> {
        self.names.as_ref().and_then(|n| n.get("en")).cloned()
    }
}

#[derive(Debug, Default, Deserialize)]
struct Country {
    iso_code: Option<String>,
    names: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
struct Location {
    latitude: Option<f64>,
    longitude: Option<f64>,
    time_zone: Option<String>,
}

impl From<MmdbRecord> for GeoRecord {
    fn from(raw: MmdbRecord) -> Self {
        let coordinates = raw.location.as_ref().and_then(|loc| match (loc.latitude, loc.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        });

        GeoRecord {
            city: raw.city.as_ref().and_then(Named::english),
            region: raw
                .subdivisions
                .as_ref()
                .and_then(|subs| subs.first())
                .and_then(Named::english),
            country: raw
                .country
                .as_ref()
                .and_then(|c| c.names.as_ref())
                .and_then(|n| n.get("en"))
                .cloned(),
            country_code: raw.country.as_ref().and_then(|c| c.iso_code.clone()),
            continent: raw.continent.as_ref().and_then(Named::english),
            time_zone: raw.location.and_then(|loc| loc.time_zone),
            coordinates,
            asn: raw.autonomous_system_number,
            asn_organization: raw.autonomous_system_organization,
        }
    }
}
