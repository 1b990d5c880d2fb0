//! Update transactions
//!
//! An [`UpdateTransaction`] is a value describing one RFC 2136 dynamic
//! update: replace the owner name's address RRsets with the addresses of a
//! snapshot. The transport encodes it on the wire as a remove-all-RRsets
//! directive for the owner name (class ANY, type ANY, TTL 0) followed by
//! one insertion per address (A or AAAA, class IN, the configured TTL), so
//! an empty snapshot yields a pure removal.
//!
//! [`TransactionBuilder`] stamps each transaction with a fresh signing
//! timestamp; a retried transaction is rebuilt, never re-sent, so the TSIG
//! time window stays valid no matter how long the retries run.

use std::net::IpAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::{TsigKey, UpdateConfig};
use crate::tracker::AddressSnapshot;

/// TSIG time window in seconds, as used by common update tools.
pub const TSIG_FUDGE: u16 = 300;

/// Request to sign a transaction with a TSIG key.
#[derive(Debug, Clone)]
pub struct TsigRequest {
    /// The shared key.
    pub key: TsigKey,
    /// Permitted clock skew, in seconds.
    pub fudge: u16,
    /// Signing time as a Unix timestamp, fixed when the transaction was
    /// built.
    pub time_signed: u64,
}

/// One dynamic update: make the owner name's A/AAAA RRsets equal to
/// `addrs`.
#[derive(Debug, Clone)]
pub struct UpdateTransaction {
    /// Zone the update applies to, absolute.
    pub zone: String,
    /// Owner name being rewritten, absolute.
    pub name: String,
    /// TTL for inserted records.
    pub ttl: u32,
    /// Addresses to insert, sorted; may be empty.
    pub addrs: Vec<IpAddr>,
    /// Signing request, when a key is configured.
    pub tsig: Option<TsigRequest>,
}

/// Builds transactions from snapshots for one configured owner name.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    zone: String,
    name: String,
    ttl: u32,
    tsig: Option<TsigKey>,
}

impl TransactionBuilder {
    /// Capture the transaction-relevant parts of the configuration.
    pub fn new(config: &UpdateConfig) -> Self {
        Self {
            zone: config.zone.clone(),
            name: config.name.clone(),
            ttl: config.ttl,
            tsig: config.tsig.clone(),
        }
    }

    /// Build a transaction for `snapshot`, stamped with the current time.
    pub fn build(&self, snapshot: &AddressSnapshot) -> UpdateTransaction {
        self.build_at(snapshot, unix_now())
    }

    fn build_at(&self, snapshot: &AddressSnapshot, now: u64) -> UpdateTransaction {
        UpdateTransaction {
            zone: self.zone.clone(),
            name: self.name.clone(),
            ttl: self.ttl,
            addrs: snapshot.addrs.clone(),
            tsig: self.tsig.clone().map(|key| TsigRequest {
                key,
                fudge: TSIG_FUDGE,
                time_signed: now,
            }),
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TsigAlgorithm;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    fn config(tsig: Option<TsigKey>) -> UpdateConfig {
        UpdateConfig {
            name: "host.example.com.".to_string(),
            zone: "example.com.".to_string(),
            server: "192.0.2.1:53".parse().unwrap(),
            timeout: Duration::from_secs(10),
            retry_interval: Duration::from_secs(30),
            ttl: 60,
            tsig,
        }
    }

    #[test]
    fn empty_snapshot_builds_removal_only_transaction() {
        let builder = TransactionBuilder::new(&config(None));
        let txn = builder.build(&AddressSnapshot::default());
        assert_eq!(txn.name, "host.example.com.");
        assert!(txn.addrs.is_empty());
        assert!(txn.tsig.is_none());
    }

    #[test]
    fn addresses_carry_over_sorted() {
        let builder = TransactionBuilder::new(&config(None));
        let snapshot = AddressSnapshot::new(vec![
            Ipv4Addr::new(203, 0, 113, 9).into(),
            Ipv4Addr::new(192, 0, 2, 1).into(),
        ]);
        let txn = builder.build(&snapshot);
        assert_eq!(
            txn.addrs,
            vec![
                IpAddr::from(Ipv4Addr::new(192, 0, 2, 1)),
                IpAddr::from(Ipv4Addr::new(203, 0, 113, 9)),
            ]
        );
    }

    #[test]
    fn each_build_stamps_its_own_time() {
        let key = TsigKey::new("update-key", b"secret".to_vec(), TsigAlgorithm::HmacSha256);
        let builder = TransactionBuilder::new(&config(Some(key)));
        let snapshot = AddressSnapshot::default();
        let first = builder.build_at(&snapshot, 1_000);
        let second = builder.build_at(&snapshot, 2_000);
        assert_eq!(first.tsig.as_ref().unwrap().time_signed, 1_000);
        assert_eq!(second.tsig.as_ref().unwrap().time_signed, 2_000);
        assert_eq!(first.tsig.unwrap().fudge, TSIG_FUDGE);
    }
}
