//! Zone primary discovery
//!
//! When no server is configured, the daemon asks the system resolver for
//! the zone's SOA record and targets its MNAME. One lookup, no retry: a
//! failure here is a setup error.

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use tracing::debug;

use nsupdate_core::{Error, Result, ZoneResolver};

/// [`ZoneResolver`] backed by the system resolver configuration
/// (`/etc/resolv.conf`).
pub struct SystemZoneResolver {
    resolver: TokioAsyncResolver,
}

impl SystemZoneResolver {
    /// Build a resolver from the system configuration.
    pub fn from_system_conf() -> Result<Self> {
        let resolver = TokioAsyncResolver::tokio_from_system_conf()
            .map_err(|e| Error::zone_resolver(format!("reading resolver config: {e}")))?;
        Ok(Self { resolver })
    }
}

#[async_trait]
impl ZoneResolver for SystemZoneResolver {
    async fn zone_primary(&self, zone: &str) -> Result<String> {
        let lookup = self
            .resolver
            .soa_lookup(zone)
            .await
            .map_err(|e| Error::zone_resolver(format!("SOA lookup for {zone}: {e}")))?;
        let soa = lookup
            .iter()
            .next()
            .ok_or_else(|| Error::zone_resolver(format!("no SOA record for {zone}")))?;
        let primary = soa.mname().to_string();
        debug!(zone = %zone, primary = %primary, "discovered zone primary");
        Ok(primary)
    }
}
