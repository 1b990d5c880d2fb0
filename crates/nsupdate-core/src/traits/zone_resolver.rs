// # Zone Resolver Trait
//
// Defines the interface for discovering the primary server of a zone when
// none is configured explicitly.
//
// ## Implementations
//
// - SOA lookup through the system resolver: `nsupdate-dns` crate

use async_trait::async_trait;

/// Trait for zone primary discovery
///
/// Used once at startup, before tracking begins; a failure here is a setup
/// error, not a delivery error, so implementations perform a single lookup
/// and never retry.
#[async_trait]
pub trait ZoneResolver: Send + Sync {
    /// Return the host name of the zone's primary server (the SOA MNAME).
    ///
    /// # Parameters
    ///
    /// - `zone`: Absolute zone name
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The primary's host name, absolute
    /// - `Err(Error::ZoneResolver)`: The zone has no reachable SOA record
    async fn zone_primary(&self, zone: &str) -> Result<String, crate::Error>;
}
