//! Geo database lookups.

use std::net::IpAddr;
use std::path::Path;

use maxminddb::{MaxMindDBError, Reader};

use crate::geo::record::{GeoRecord, MmdbRecord};

/// Errors raised while opening or reading a geo database.
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("cannot open geo database {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: MaxMindDBError,
    },

    #[error("geo lookup for {ip} failed: {source}")]
    Lookup {
        ip: IpAddr,
        #[source]
        source: MaxMindDBError,
    },
}

/// IP → location/ASN lookup. Implementations must be safe for concurrent use.
pub trait GeoDatabase: Send + Sync {
    /// `Ok(None)` when the address is not in the database.
    fn lookup(&self, ip: IpAddr) -> Result<Option<GeoRecord>, GeoError>;

    /// Database edition label (e.g. "GeoLite2-City").
    fn edition(&self) -> &str;
}

/// A MaxMind DB file loaded fully into memory.
pub struct MaxmindDatabase {
    reader: Reader<Vec<u8>>,
}

impl MaxmindDatabase {
    pub fn open(path: &Path) -> Result<Self, GeoError> {
        let reader = Reader::open_readfile(path).map_err(|source| GeoError::Open {
            path: path.display().to_string(),
            source,
        })?;

        tracing::info!(
            path = %path.display(),
            edition = %reader.metadata.database_type,
            build_epoch = reader.metadata.build_epoch,
            "Opened geo database"
        );

        Ok(Self { reader })
    }
}

impl GeoDatabase for MaxmindDatabase {
    fn lookup(&self, ip: IpAddr) -> Result<Option<GeoRecord>, GeoError> {
        match self.reader.lookup::<MmdbRecord>(ip) {
            Ok(raw) => {
                let record = GeoRecord::from(raw);
                Ok((!record.is_empty()).then_some(record))
            }
            Err(MaxMindDBError::AddressNotFoundError(_)) => Ok(None),
            Err(source) => Err(GeoError::Lookup { ip, source }),
        }
    }

    fn edition(&self) -> &str {
        &self.reader.metadata.database_type
    }
}

impl std::fmt::Debug for MaxmindDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaxmindDatabase")
            .field("edition", &self.reader.metadata.database_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_file() {
        let err = MaxmindDatabase::open(Path::new("/nonexistent/GeoLite2-City.mmdb")).unwrap_err();
        assert!(matches!(err, GeoError::Open { .. }));
        assert!(err.to_string().contains("GeoLite2-City.mmdb"));
    }

    #[test]
    fn test_open_garbage_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"definitely not an mmdb").unwrap();
        assert!(MaxmindDatabase::open(file.path()).is_err());
    }

    // Minimal MMDB writer for an IPv4 tree with 24-bit records.

    fn control(kind: u8, size: usize, out: &mut Vec<u8>) {
        assert!(size < 29);
        if kind <= 7 {
            out.push((kind << 5) | size as u8);
        } else {
            out.push(size as u8);
            out.push(kind - 7);
        }
    }

    fn string(value: &str, out: &mut Vec<u8>) {
        control(2, value.len(), out);
        out.extend_from_slice(value.as_bytes());
    }

    fn uint(kind: u8, value: u64, out: &mut Vec<u8>) {
        let bytes = value.to_be_bytes();
        let skip = bytes.iter().take_while(|b| **b == 0).count();
        control(kind, bytes.len() - skip, out);
        out.extend_from_slice(&bytes[skip..]);
    }

    fn double(value: f64, out: &mut Vec<u8>) {
        control(3, 8, out);
        out.extend_from_slice(&value.to_be_bytes());
    }

    fn map(pairs: usize, out: &mut Vec<u8>) {
        control(7, pairs, out);
    }

    fn record(value: u32, out: &mut Vec<u8>) {
        out.extend_from_slice(&value.to_be_bytes()[1..]);
    }

    /// 0.0.0.0/1 holds a city record, 128.0.0.0/2 holds a bare integer that
    /// cannot decode as a record, and 192.0.0.0/2 is absent.
    fn fixture() -> Vec<u8> {
        const NODES: u32 = 2;

        let mut data = Vec::new();
        map(3, &mut data);
        string("country", &mut data);
        map(2, &mut data);
        string("iso_code", &mut data);
        string("DE", &mut data);
        string("names", &mut data);
        map(1, &mut data);
        string("en", &mut data);
        string("Germany", &mut data);
        string("location", &mut data);
        map(3, &mut data);
        string("latitude", &mut data);
        double(52.5, &mut data);
        string("longitude", &mut data);
        double(13.4, &mut data);
        string("time_zone", &mut data);
        string("Europe/Berlin", &mut data);
        string("autonomous_system_number", &mut data);
        uint(6, 3320, &mut data);
        let corrupt_offset = data.len() as u32;
        uint(6, 7, &mut data);

        let mut out = Vec::new();
        record(NODES + 16, &mut out);
        record(1, &mut out);
        record(NODES + 16 + corrupt_offset, &mut out);
        record(NODES, &mut out);
        out.extend_from_slice(&[0u8; 16]);
        out.extend_from_slice(&data);

        out.extend_from_slice(b"\xAB\xCD\xEFMaxMind.com");
        map(9, &mut out);
        string("binary_format_major_version", &mut out);
        uint(5, 2, &mut out);
        string("binary_format_minor_version", &mut out);
        uint(5, 0, &mut out);
        string("build_epoch", &mut out);
        uint(9, 1_700_000_000, &mut out);
        string("database_type", &mut out);
        string("GeoAuthz-Test", &mut out);
        string("description", &mut out);
        map(1, &mut out);
        string("en", &mut out);
        string("fixture", &mut out);
        string("ip_version", &mut out);
        uint(5, 4, &mut out);
        string("languages", &mut out);
        control(11, 1, &mut out);
        string("en", &mut out);
        string("node_count", &mut out);
        uint(6, NODES as u64, &mut out);
        string("record_size", &mut out);
        uint(5, 24, &mut out);
        out
    }

    #[test]
    fn test_lookup_found_miss_and_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), fixture()).unwrap();
        let db = MaxmindDatabase::open(file.path()).unwrap();
        assert_eq!(db.edition(), "GeoAuthz-Test");

        let found = db.lookup("10.1.2.3".parse().unwrap()).unwrap().unwrap();
        assert_eq!(found.country_code.as_deref(), Some("DE"));
        assert_eq!(found.country.as_deref(), Some("Germany"));
        assert_eq!(found.time_zone.as_deref(), Some("Europe/Berlin"));
        assert_eq!(found.coordinates, Some(crate::context::Coordinates::new(52.5, 13.4)));
        assert_eq!(found.asn, Some(3320));

        // Not in the tree: a miss, not an error.
        assert_eq!(db.lookup("203.0.113.1".parse().unwrap()).unwrap(), None);

        // In the tree but undecodable: an error naming the address.
        let err = db.lookup("150.0.0.1".parse().unwrap()).unwrap_err();
        assert!(matches!(err, GeoError::Lookup { .. }));
        assert!(err.to_string().contains("150.0.0.1"));
    }
}
