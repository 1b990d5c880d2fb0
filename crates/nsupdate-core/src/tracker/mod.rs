//! Address tracker
//!
//! [`AddressTracker`] follows one network interface: it seeds itself from a
//! full address listing, then applies kernel notifications one at a time to
//! keep an in-memory view of the interface's global-scope addresses.
//!
//! The tracker is the single consumer of the event stream. It never blocks
//! in [`AddressTracker::snapshot`]; waiting happens only in
//! [`AddressTracker::wait_for_change`], which resolves after every address
//! event for the tracked interface (even ones the scope filter discards, so
//! callers observe kernel activity) and when the stream closes.
//!
//! Link events replace the stored [`LinkState`] wholesale but do not
//! complete a pending wait: a flap with no address change produces no new
//! snapshot worth publishing. Entries are kept across link-down; the
//! snapshot hides them while the link is down and they reappear when it
//! comes back without the kernel re-announcing each address.

use std::collections::HashMap;
use std::net::IpAddr;

use tokio_stream::StreamExt;
use tracing::{debug, trace};

use crate::config::FamilyFilter;
use crate::error::Result;
use crate::traits::{AddressEntry, AddressEvent, AddressSource, EventStream, LinkState};

/// Immutable copy of the tracked addresses at one point in time.
///
/// Addresses are sorted and de-duplicated; two snapshots compare equal
/// exactly when they describe the same set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AddressSnapshot {
    /// Global-scope addresses of the interface, sorted. Empty while the
    /// link is down.
    pub addrs: Vec<IpAddr>,
}

impl AddressSnapshot {
    /// Snapshot containing exactly the given addresses.
    pub fn new(mut addrs: Vec<IpAddr>) -> Self {
        addrs.sort_unstable();
        addrs.dedup();
        Self { addrs }
    }

    /// Whether the snapshot carries no addresses.
    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }
}

/// Outcome of a [`AddressTracker::wait_for_change`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// An address event for the tracked interface was applied.
    Changed,
    /// The event stream ended; no further changes will be observed.
    Closed,
}

/// Live view of one interface's link state and global addresses.
pub struct AddressTracker {
    link: LinkState,
    entries: HashMap<String, AddressEntry>,
    events: EventStream,
}

impl AddressTracker {
    /// Open a tracker for `interface`.
    ///
    /// Resolves the interface, lists its current addresses restricted to
    /// `family`, and subscribes to change events. The family filter applies
    /// to this initial listing only; subsequent events are applied
    /// regardless of family, mirroring the kernel's notifications.
    pub async fn open(
        source: &mut dyn AddressSource,
        interface: &str,
        family: FamilyFilter,
    ) -> Result<Self> {
        let link = source.link_by_name(interface).await?;
        debug!(
            interface = %link.name,
            index = link.index,
            up = link.up,
            "tracking interface"
        );

        let mut entries = HashMap::new();
        for entry in source.addresses(link.index, family).await? {
            if entry.is_global() {
                entries.insert(entry.addr.to_string(), entry);
            } else {
                trace!(addr = %entry.addr, scope = entry.scope, "ignoring non-global address");
            }
        }

        let events = source.events()?;
        Ok(Self {
            link,
            entries,
            events,
        })
    }

    /// Current state of the tracked link.
    pub fn link(&self) -> &LinkState {
        &self.link
    }

    /// Copy of the current address set.
    ///
    /// Empty while the link is down; the underlying entries survive and
    /// reappear once the link comes back up.
    pub fn snapshot(&self) -> AddressSnapshot {
        if !self.link.up {
            return AddressSnapshot::default();
        }
        AddressSnapshot::new(self.entries.values().map(|e| e.addr).collect())
    }

    /// Wait until the next address event for the tracked interface has been
    /// applied, or until the event stream closes.
    ///
    /// Events for other interfaces are discarded without completing the
    /// wait. Link events for the tracked interface update the stored link
    /// state and the wait continues.
    pub async fn wait_for_change(&mut self) -> WaitOutcome {
        loop {
            let Some(event) = self.events.next().await else {
                debug!("event stream closed");
                return WaitOutcome::Closed;
            };
            match event {
                AddressEvent::Link(mut state) => {
                    if state.index == self.link.index {
                        // Kernel link notifications may omit the name.
                        if state.name.is_empty() {
                            state.name = self.link.name.clone();
                        }
                        trace!(up = state.up, "link state update");
                        self.link = state;
                    }
                }
                AddressEvent::Address {
                    index,
                    addr,
                    scope,
                    added,
                } => {
                    if index != self.link.index {
                        continue;
                    }
                    self.apply_address(AddressEntry { addr, scope }, added);
                    return WaitOutcome::Changed;
                }
            }
        }
    }

    fn apply_address(&mut self, entry: AddressEntry, added: bool) {
        let key = entry.addr.to_string();
        if added {
            if entry.is_global() {
                debug!(addr = %entry.addr, "address added");
                self.entries.insert(key, entry);
            } else {
                trace!(addr = %entry.addr, scope = entry.scope, "ignoring non-global address");
            }
        } else if self.entries.remove(&key).is_some() {
            debug!(addr = %entry.addr, "address removed");
        }
    }
}
