//! Configuration types for the update system.
//!
//! [`UpdateConfig`] is the fully resolved, immutable configuration the
//! engine consumes: the owner name and zone are absolute, the server is a
//! socket address, and the TSIG secret is already decoded. Resolving raw
//! CLI input into this form (zone defaulting, server discovery, base64
//! decoding) is the binary's job; helpers for the name-derived defaults
//! live here so they can be tested without a running daemon.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Default DNS port used when a server is given without one.
pub const DNS_PORT: u16 = 53;

/// Address family filter for the initial interface scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FamilyFilter {
    /// Both IPv4 and IPv6.
    #[default]
    All,
    /// IPv4 only.
    V4,
    /// IPv6 only.
    V6,
}

impl FromStr for FamilyFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unspec" | "all" => Ok(Self::All),
            "inet" | "ipv4" => Ok(Self::V4),
            "inet6" | "ipv6" => Ok(Self::V6),
            other => Err(Error::config(format!("invalid family: {other}"))),
        }
    }
}

/// TSIG HMAC algorithms supported by the signing backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TsigAlgorithm {
    HmacSha1,
    HmacSha256,
    HmacSha384,
    HmacSha512,
}

impl TsigAlgorithm {
    /// Canonical algorithm name as it appears in the TSIG record.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HmacSha1 => "hmac-sha1",
            Self::HmacSha256 => "hmac-sha256",
            Self::HmacSha384 => "hmac-sha384",
            Self::HmacSha512 => "hmac-sha512",
        }
    }
}

impl FromStr for TsigAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hmac-sha1" | "sha1" => Ok(Self::HmacSha1),
            "hmac-sha256" | "sha256" => Ok(Self::HmacSha256),
            "hmac-sha384" | "sha384" => Ok(Self::HmacSha384),
            "hmac-sha512" | "sha512" => Ok(Self::HmacSha512),
            other => Err(Error::config(format!("invalid tsig algorithm: {other}"))),
        }
    }
}

/// A shared TSIG key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsigKey {
    /// Key name, stored as an absolute domain name.
    pub name: String,
    /// Decoded key bytes.
    pub secret: Vec<u8>,
    /// HMAC algorithm.
    pub algorithm: TsigAlgorithm,
}

impl TsigKey {
    /// Create a key, normalizing the name to its absolute form.
    pub fn new(name: &str, secret: Vec<u8>, algorithm: TsigAlgorithm) -> Self {
        Self {
            name: fqdn(name),
            secret,
            algorithm,
        }
    }
}

/// Immutable configuration consumed by the update engine.
///
/// All defaulting has already happened: `zone` is set (possibly derived
/// from `name`), `server` is a concrete socket address (possibly
/// discovered from the zone's SOA record).
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    /// Owner name whose A/AAAA RRsets are kept in sync, absolute.
    pub name: String,
    /// Zone the updates are sent for, absolute.
    pub zone: String,
    /// Authoritative server receiving the updates.
    pub server: SocketAddr,
    /// Per-attempt timeout, enforced by the transport.
    pub timeout: Duration,
    /// Base retry interval; the i-th retry waits i times this long.
    pub retry_interval: Duration,
    /// TTL for inserted records.
    pub ttl: u32,
    /// Optional TSIG key signing each transaction.
    pub tsig: Option<TsigKey>,
}

impl UpdateConfig {
    /// Check invariants that the resolution step must have established.
    pub fn validate(&self) -> Result<(), Error> {
        if self.name.is_empty() || self.name == "." {
            return Err(Error::config("missing name"));
        }
        if self.zone.is_empty() || self.zone == "." {
            return Err(Error::config("missing zone"));
        }
        if !self.name.ends_with('.') || !self.zone.ends_with('.') {
            return Err(Error::config("name and zone must be absolute"));
        }
        if self.retry_interval.is_zero() {
            return Err(Error::config("retry interval must be non-zero"));
        }
        Ok(())
    }
}

/// Return the absolute form of a domain name.
pub fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

/// Derive the parent zone of an owner name by stripping its first label.
///
/// Returns `None` when the name has no parent below the root, in which
/// case the zone must be given explicitly.
pub fn parent_zone(name: &str) -> Option<String> {
    let name = fqdn(name);
    let rest = name.split_once('.').map(|(_, rest)| rest)?;
    if rest.is_empty() || rest == "." {
        return None;
    }
    Some(rest.to_string())
}
