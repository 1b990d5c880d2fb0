// # nsupdate-dns
//
// DNS-facing implementations for the update daemon:
// - **UdpTransport**: RFC 2136 message assembly, TSIG signing and UDP
//   exchange (implements `nsupdate_core::Transport`)
// - **SystemZoneResolver**: zone primary discovery via the system
//   resolver's SOA lookup (implements `nsupdate_core::ZoneResolver`)
//
// Wire handling is hickory throughout; this crate contains no retry or
// scheduling logic, which belongs to the core engine.

pub mod message;
pub mod resolver;
pub mod transport;

pub use resolver::SystemZoneResolver;
pub use transport::UdpTransport;
