//! Test doubles and common utilities for architecture contract tests
//!
//! This module provides controllable implementations of the core traits so
//! the tests can script kernel events and delivery outcomes precisely.

#![allow(dead_code)]

use nsupdate_core::config::{FamilyFilter, UpdateConfig};
use nsupdate_core::error::{Error, Result};
use nsupdate_core::tracker::AddressSnapshot;
use nsupdate_core::traits::{
    AddressEntry, AddressEvent, AddressSource, EventStream, LinkState, Transport,
};
use nsupdate_core::transaction::UpdateTransaction;
use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// A controlled AddressSource that serves a scripted link and address list
/// and emits events on demand.
pub struct ScriptedAddressSource {
    link: LinkState,
    addrs: Vec<AddressEntry>,
    engine_rx: Option<mpsc::UnboundedReceiver<AddressEvent>>,
    link_call_count: Arc<AtomicUsize>,
    list_call_count: Arc<AtomicUsize>,
}

impl ScriptedAddressSource {
    /// Create a source for one interface. The returned sender feeds the
    /// event stream; dropping it ends the stream.
    pub fn new(
        link: LinkState,
        addrs: Vec<AddressEntry>,
    ) -> (Self, mpsc::UnboundedSender<AddressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = Self {
            link,
            addrs,
            engine_rx: Some(rx),
            link_call_count: Arc::new(AtomicUsize::new(0)),
            list_call_count: Arc::new(AtomicUsize::new(0)),
        };
        (source, tx)
    }

    pub fn link_call_count(&self) -> usize {
        self.link_call_count.load(Ordering::SeqCst)
    }

    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AddressSource for ScriptedAddressSource {
    async fn link_by_name(&mut self, name: &str) -> Result<LinkState> {
        self.link_call_count.fetch_add(1, Ordering::SeqCst);
        if name == self.link.name {
            Ok(self.link.clone())
        } else {
            Err(Error::interface_not_found(name))
        }
    }

    async fn addresses(&mut self, index: u32, family: FamilyFilter) -> Result<Vec<AddressEntry>> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);
        if index != self.link.index {
            return Ok(Vec::new());
        }
        Ok(self
            .addrs
            .iter()
            .filter(|e| match family {
                FamilyFilter::All => true,
                FamilyFilter::V4 => e.addr.is_ipv4(),
                FamilyFilter::V6 => e.addr.is_ipv6(),
            })
            .copied()
            .collect())
    }

    fn events(&mut self) -> Result<EventStream> {
        let rx = self
            .engine_rx
            .take()
            .expect("events() can only be called once");
        Ok(Box::pin(
            tokio_stream::wrappers::UnboundedReceiverStream::new(rx),
        ))
    }
}

/// One delivery attempt observed by [`MockTransport`].
pub struct Attempt {
    /// The transaction as built for this attempt.
    pub txn: UpdateTransaction,
    /// Tokio time of the attempt; meaningful under paused time.
    pub at: Instant,
}

/// A mock Transport that replays scripted outcomes and records every
/// attempt with its timestamp.
pub struct MockTransport {
    outcomes: Mutex<VecDeque<Result<()>>>,
    attempts: Mutex<Vec<Attempt>>,
}

impl MockTransport {
    /// Transport whose every attempt succeeds.
    pub fn succeeding() -> Arc<Self> {
        Self::with_outcomes(Vec::new())
    }

    /// Transport that replays `outcomes` in order, then succeeds.
    pub fn with_outcomes(outcomes: Vec<Result<()>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            attempts: Mutex::new(Vec::new()),
        })
    }

    /// Transport that fails the first `n` attempts, then succeeds.
    pub fn failing_times(n: usize) -> Arc<Self> {
        Self::with_outcomes(
            (0..n)
                .map(|_| Err(Error::transport("connection refused")))
                .collect(),
        )
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    /// Timestamps of all attempts so far.
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().iter().map(|a| a.at).collect()
    }

    /// Address lists of all attempted transactions so far.
    pub fn attempted_addrs(&self) -> Vec<Vec<IpAddr>> {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .map(|a| a.txn.addrs.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        txn: &UpdateTransaction,
        _server: SocketAddr,
        _timeout: Duration,
    ) -> Result<()> {
        self.attempts.lock().unwrap().push(Attempt {
            txn: txn.clone(),
            at: Instant::now(),
        });
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

/// An interface that is up, with a fixed index and name.
pub fn link_up(index: u32) -> LinkState {
    LinkState {
        index,
        name: "eth0".to_string(),
        up: true,
    }
}

/// A global-scope address entry.
pub fn global(addr: impl Into<IpAddr>) -> AddressEntry {
    AddressEntry {
        addr: addr.into(),
        scope: 0,
    }
}

/// An address-added event for interface `index`.
pub fn addr_added(index: u32, addr: impl Into<IpAddr>) -> AddressEvent {
    AddressEvent::Address {
        index,
        addr: addr.into(),
        scope: 0,
        added: true,
    }
}

/// An address-removed event for interface `index`.
pub fn addr_removed(index: u32, addr: impl Into<IpAddr>) -> AddressEvent {
    AddressEvent::Address {
        index,
        addr: addr.into(),
        scope: 0,
        added: false,
    }
}

/// A snapshot of the given addresses.
pub fn snapshot(addrs: Vec<IpAddr>) -> AddressSnapshot {
    AddressSnapshot::new(addrs)
}

/// Minimal valid engine configuration with the given retry interval.
pub fn engine_config(retry_interval: Duration) -> UpdateConfig {
    UpdateConfig {
        name: "host.example.com.".to_string(),
        zone: "example.com.".to_string(),
        server: "192.0.2.53:53".parse().unwrap(),
        timeout: Duration::from_secs(10),
        retry_interval,
        ttl: 60,
        tsig: None,
    }
}
