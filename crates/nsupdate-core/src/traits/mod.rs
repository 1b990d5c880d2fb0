//! Core traits for the update system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`AddressSource`]: Enumerate and monitor interface addresses
//! - [`Transport`]: Deliver one update transaction to a server
//! - [`ZoneResolver`]: Discover a zone's primary server

pub mod address_source;
pub mod transport;
pub mod zone_resolver;

pub use address_source::{AddressEntry, AddressEvent, AddressSource, EventStream, LinkState};
pub use transport::Transport;
pub use zone_resolver::ZoneResolver;
