use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use common::{Location, UNKNOWN_CITY, UNKNOWN_COUNTRY, UNKNOWN_REGION};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("address not in database")]
    NotFound,
    #[error("geolocation database error: {0}")]
    Database(#[from] maxminddb::MaxMindDBError),
}

/// Raw city-level answer from a geolocation source; any part may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CityRecord {
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl CityRecord {
    /// Fill whatever the lookup returned, keeping sentinel text per missing field.
    pub fn into_location(self) -> Location {
        fn name(v: Option<String>, fallback: &str) -> String {
            v.filter(|s| !s.is_empty()).unwrap_or_else(|| fallback.to_string())
        }
        fn degrees(v: Option<f64>) -> f64 {
            v.filter(|d| d.is_finite()).unwrap_or(0.0)
        }
        Location {
            city: name(self.city, UNKNOWN_CITY),
            region: name(self.region, UNKNOWN_REGION),
            country: name(self.country, UNKNOWN_COUNTRY),
            latitude: degrees(self.latitude),
            longitude: degrees(self.longitude),
        }
    }
}

pub trait GeoLookup: Send + Sync {
    fn lookup(&self, ip: IpAddr) -> Result<CityRecord, GeoError>;
}

/// GeoLite2/GeoIP2 City database loaded into memory.
pub struct MaxMindCity {
    reader: maxminddb::Reader<Vec<u8>>,
}

impl MaxMindCity {
    pub fn open(path: &Path) -> Result<Self, GeoError> {
        let reader = maxminddb::Reader::open_readfile(path)?;
        Ok(Self { reader })
    }
}

fn english(names: Option<BTreeMap<&str, &str>>) -> Option<String> {
    names?.get("en").map(|s| s.to_string())
}

impl GeoLookup for MaxMindCity {
    fn lookup(&self, ip: IpAddr) -> Result<CityRecord, GeoError> {
        let city: maxminddb::geoip2::City = self.reader.lookup(ip).map_err(|e| match e {
            maxminddb::MaxMindDBError::AddressNotFoundError(_) => GeoError::NotFound,
            other => GeoError::Database(other),
        })?;
        let location = city.location.as_ref();
        Ok(CityRecord {
            city: city.city.and_then(|c| english(c.names)),
            region: city
                .subdivisions
                .and_then(|subs| subs.into_iter().next())
                .and_then(|s| english(s.names)),
            country: city.country.and_then(|c| english(c.names)),
            latitude: location.and_then(|l| l.latitude),
            longitude: location.and_then(|l| l.longitude),
        })
    }
}

/// Turns a peer address into a [`Location`], never failing.
#[derive(Clone)]
pub struct Enricher {
    db: Option<Arc<dyn GeoLookup>>,
    loopback_substitute: IpAddr,
}

impl Enricher {
    pub fn new(db: Option<Arc<dyn GeoLookup>>, loopback_substitute: IpAddr) -> Self {
        Self { db, loopback_substitute }
    }

    /// Open the database at `path`. A missing or corrupt database is not
    /// fatal; every lookup then yields the sentinel.
    pub fn open(path: &Path, loopback_substitute: IpAddr) -> Self {
        match MaxMindCity::open(path) {
            Ok(db) => {
                info!(path = %path.display(), "geolocation database loaded");
                let db: Arc<dyn GeoLookup> = Arc::new(db);
                Self::new(Some(db), loopback_substitute)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "geolocation disabled");
                Self::new(None, loopback_substitute)
            }
        }
    }

    pub fn has_database(&self) -> bool {
        self.db.is_some()
    }

    pub fn enrich(&self, ip_address: &str) -> Location {
        let Some(db) = &self.db else {
            return Location::unknown();
        };
        let ip = match ip_address.parse::<IpAddr>() {
            Ok(ip) => ip.to_canonical(),
            Err(_) => {
                debug!(address = %ip_address, "unparseable source address");
                return Location::unknown();
            }
        };
        // Local test connections would never resolve; look up a known public address instead.
        let ip = if ip.is_loopback() { self.loopback_substitute } else { ip };
        match db.lookup(ip) {
            Ok(record) => record.into_location(),
            Err(e) => {
                debug!(%ip, error = %e, "geolocation lookup failed");
                Location::unknown()
            }
        }
    }
}
