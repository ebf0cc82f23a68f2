//! IP geolocation seam for click classification.

use async_trait::async_trait;
use maxminddb::Reader;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::trace;

/// Resolves a client IP to an ISO 3166-1 alpha-2 country code.
///
/// Consulted by the click worker only when the edge proxy supplied no
/// country header.
#[async_trait]
pub trait GeoLookup: Send + Sync {
    async fn lookup(&self, ip: IpAddr) -> Option<String>;

    /// Provider name for logs.
    fn name(&self) -> &'static str;
}

/// Lookup that never resolves; countries come from the proxy header alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGeoLookup;

#[async_trait]
impl GeoLookup for NoGeoLookup {
    async fn lookup(&self, _ip: IpAddr) -> Option<String> {
        None
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Lookup backed by a local GeoLite2/GeoIP2 City database.
#[derive(Clone)]
pub struct MaxMindGeoLookup {
    reader: Arc<Reader<Vec<u8>>>,
}

impl MaxMindGeoLookup {
    /// Loads the `.mmdb` file at `path` into memory.
    pub fn open(path: &str) -> Result<Self, maxminddb::MaxMindDbError> {
        let reader = Reader::open_readfile(path)?;
        Ok(Self {
            reader: Arc::new(reader),
        })
    }
}

#[async_trait]
impl GeoLookup for MaxMindGeoLookup {
    async fn lookup(&self, ip: IpAddr) -> Option<String> {
        let result = self.reader.lookup(ip).ok()?;
        let city: maxminddb::geoip2::City = result.decode().ok()??;
        let country = city.country.iso_code.map(str::to_ascii_uppercase);

        trace!(%ip, ?country, "MaxMind lookup");
        country
    }

    fn name(&self) -> &'static str {
        "maxmind"
    }
}
