// # nsupdate-core
//
// Core library for the dynamic DNS update daemon.
//
// ## Architecture Overview
//
// This library provides the core functionality for keeping one DNS owner
// name's A/AAAA RRsets synchronized with one network interface:
// - **AddressSource**: Trait for enumerating and monitoring interface addresses
// - **Transport**: Trait for delivering one update transaction to a server
// - **ZoneResolver**: Trait for discovering a zone's primary server
// - **AddressTracker**: Live view of the interface's global addresses
// - **TransactionBuilder**: Snapshot → RFC 2136 transaction value
// - **UpdateEngine**: Single-writer actor that delivers and retries
//
// ## Design Principles
//
// 1. **Separation of Concerns**: No netlink or network I/O in this crate;
//    implementations live in `nsupdate-netlink` and `nsupdate-dns`
// 2. **Event-Driven**: Kernel notifications drive the tracker; no polling
// 3. **Single Writer**: All retry state is owned by one actor task
// 4. **Library-First**: The daemon binary is a thin driver over this crate

pub mod config;
pub mod engine;
pub mod error;
pub mod tracker;
pub mod traits;
pub mod transaction;

// Re-export core types for convenience
pub use config::{FamilyFilter, TsigAlgorithm, TsigKey, UpdateConfig};
pub use engine::UpdateEngine;
pub use error::{Error, Result};
pub use tracker::{AddressSnapshot, AddressTracker, WaitOutcome};
pub use traits::{AddressEntry, AddressEvent, AddressSource, EventStream, LinkState, Transport, ZoneResolver};
pub use transaction::{TransactionBuilder, TsigRequest, UpdateTransaction};
