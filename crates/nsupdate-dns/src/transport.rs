//! UDP delivery of update transactions
//!
//! One [`Transport::send`] call is one attempt: assemble the message, sign
//! it, exchange it over a fresh UDP socket, and interpret the response.
//! The caller's timeout bounds the whole exchange, send included. Datagrams
//! with the wrong ID or that fail to decode are skipped rather than treated
//! as the answer; stray responses on an unconnected port are routine.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use hickory_proto::op::{Message, ResponseCode};
use tokio::net::UdpSocket;
use tracing::{debug, trace};

use nsupdate_core::transaction::UpdateTransaction;
use nsupdate_core::{Error, Result, Transport};

use crate::message::{build_message, sign};

/// [`Transport`] implementation speaking RFC 2136 over UDP.
#[derive(Debug, Default)]
pub struct UdpTransport;

impl UdpTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send(
        &self,
        txn: &UpdateTransaction,
        server: SocketAddr,
        timeout: Duration,
    ) -> Result<()> {
        let mut message = build_message(txn)?;
        if let Some(request) = &txn.tsig {
            sign(&mut message, request)?;
        }
        let wire = message
            .to_vec()
            .map_err(|e| Error::transport(format!("encoding update: {e}")))?;
        debug!(
            server = %server,
            id = message.id(),
            bytes = wire.len(),
            signed = txn.tsig.is_some(),
            "sending update"
        );

        tokio::time::timeout(timeout, exchange(&wire, message.id(), server))
            .await
            .map_err(|_| Error::transport(format!("no response from {server} within {timeout:?}")))?
    }
}

async fn exchange(wire: &[u8], id: u16, server: SocketAddr) -> Result<()> {
    let bind_addr = if server.is_ipv4() {
        SocketAddr::from((std::net::Ipv4Addr::UNSPECIFIED, 0))
    } else {
        SocketAddr::from((std::net::Ipv6Addr::UNSPECIFIED, 0))
    };
    let socket = UdpSocket::bind(bind_addr)
        .await
        .map_err(|e| Error::transport(format!("binding socket: {e}")))?;
    socket
        .connect(server)
        .await
        .map_err(|e| Error::transport(format!("connecting to {server}: {e}")))?;
    socket
        .send(wire)
        .await
        .map_err(|e| Error::transport(format!("sending to {server}: {e}")))?;

    let mut buf = [0u8; 4096];
    loop {
        let len = socket
            .recv(&mut buf)
            .await
            .map_err(|e| Error::transport(format!("receiving from {server}: {e}")))?;
        let response = match Message::from_vec(&buf[..len]) {
            Ok(response) => response,
            Err(e) => {
                trace!(error = %e, "skipping undecodable datagram");
                continue;
            }
        };
        if response.id() != id {
            trace!(got = response.id(), want = id, "skipping mismatched response id");
            continue;
        }
        debug!(rcode = %response.response_code(), "update response");
        return check_response(&response);
    }
}

fn check_response(response: &Message) -> Result<()> {
    let code = response.response_code();
    if code == ResponseCode::NoError {
        Ok(())
    } else {
        Err(Error::rejected(code.to_string()))
    }
}
