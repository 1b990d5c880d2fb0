// # Transport Trait
//
// Defines the interface for delivering one update transaction to an
// authoritative server.
//
// ## Implementations
//
// - RFC 2136 over UDP (hickory): `nsupdate-dns` crate

use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;

use crate::transaction::UpdateTransaction;

/// Trait for transaction delivery implementations
///
/// An implementation encodes the transaction into the wire format, signs it
/// when the transaction carries a TSIG request, exchanges it with the
/// server, and interprets the response.
///
/// # Single-shot
///
/// One call performs exactly one delivery attempt. Transports never retry,
/// sleep, or spawn tasks; the engine owns scheduling, and the per-attempt
/// `timeout` bounds the whole exchange.
///
/// # Error mapping
///
/// - Socket errors, timeouts and undecodable responses map to
///   [`Error::Transport`](crate::Error::Transport).
/// - A well-formed response with a non-success code maps to
///   [`Error::Rejected`](crate::Error::Rejected) carrying the code's text.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one transaction to `server`, bounded by `timeout`.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The server accepted the update
    /// - `Err(Error)`: The attempt failed; the engine decides whether to retry
    async fn send(
        &self,
        txn: &UpdateTransaction,
        server: SocketAddr,
        timeout: Duration,
    ) -> Result<(), crate::Error>;
}
