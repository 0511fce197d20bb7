//! Match controller implementations.

pub mod asn;
pub mod cidr;
pub mod dynamic;
pub mod geofence;

pub use asn::AsnListMatcher;
pub use cidr::CidrListMatcher;
pub use dynamic::DynamicStoreMatcher;
pub use geofence::GeofenceMatcher;
