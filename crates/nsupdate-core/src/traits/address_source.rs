// # Address Source Trait
//
// Defines the interface for enumerating and monitoring the addresses of a
// network interface.
//
// ## Implementations
//
// - Netlink-based (Linux): `nsupdate-netlink` crate
//
// ## Usage
//
// ```rust,ignore
// use nsupdate_core::{AddressSource, FamilyFilter};
// use tokio_stream::StreamExt;
//
// async fn seed(source: &mut dyn AddressSource) -> nsupdate_core::Result<()> {
//     let link = source.link_by_name("eth0").await?;
//     let addrs = source.addresses(link.index, FamilyFilter::All).await?;
//     let mut events = source.events()?;
//     while let Some(event) = events.next().await {
//         println!("event: {:?}", event);
//     }
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;
use std::pin::Pin;
use tokio_stream::Stream;

use crate::config::FamilyFilter;

/// Kernel address scope at or above which an address is considered
/// non-global (link-local, host-local) and excluded from tracking.
pub const SCOPE_LINK: u8 = 253;

/// Administrative and operational state of one network interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkState {
    /// Kernel interface index.
    pub index: u32,
    /// Interface name as reported by the kernel.
    pub name: String,
    /// Whether the interface is up.
    pub up: bool,
}

/// One address assigned to an interface, with its kernel scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressEntry {
    /// The address itself.
    pub addr: IpAddr,
    /// Kernel scope value (`RT_SCOPE_*`); addresses at [`SCOPE_LINK`] or
    /// above are filtered out by the tracker.
    pub scope: u8,
}

impl AddressEntry {
    /// Whether this entry survives the tracker's scope filter.
    pub fn is_global(&self) -> bool {
        self.scope < SCOPE_LINK
    }
}

/// A link or address notification from the kernel.
///
/// Events carry the interface index they apply to; the tracker discards
/// events for interfaces other than the one it follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressEvent {
    /// Link attributes changed (or the link appeared/disappeared).
    Link(LinkState),
    /// An address was added to or removed from an interface.
    Address {
        /// Interface index the address belongs to.
        index: u32,
        /// The address.
        addr: IpAddr,
        /// Kernel scope of the address.
        scope: u8,
        /// `true` for an addition, `false` for a removal.
        added: bool,
    },
}

/// Stream of kernel notifications; ends when the underlying subscription
/// closes.
pub type EventStream = Pin<Box<dyn Stream<Item = AddressEvent> + Send + 'static>>;

/// Trait for address source implementations
///
/// This trait defines three capabilities:
/// 1. **link_by_name()**: Resolve an interface name to its current state
/// 2. **addresses()**: Enumerate the addresses currently on an interface
/// 3. **events()**: Subscribe to link and address change notifications
///
/// # Ordering
///
/// Implementations must open the event subscription such that no change is
/// lost between an `addresses()` call and a subsequent `events()` call, or
/// document that callers should subscribe first. The netlink implementation
/// binds its multicast groups at construction, before any query, so both
/// orders are safe.
///
/// # Responsibilities
///
/// Sources report kernel facts verbatim. They do not filter by scope or
/// interface (beyond the explicit `addresses()` filters), decide whether a
/// change is interesting, or retry failed queries; all of that belongs to
/// the tracker and the engine.
#[async_trait]
pub trait AddressSource: Send {
    /// Look up an interface by name.
    ///
    /// # Returns
    ///
    /// - `Ok(LinkState)`: The interface's index, name and up flag
    /// - `Err(Error::InterfaceNotFound)`: No such interface
    async fn link_by_name(&mut self, name: &str) -> Result<LinkState, crate::Error>;

    /// List the addresses currently assigned to an interface.
    ///
    /// # Parameters
    ///
    /// - `index`: Kernel interface index
    /// - `family`: Restrict the listing to one address family
    ///
    /// # Returns
    ///
    /// All matching addresses, unfiltered by scope.
    async fn addresses(
        &mut self,
        index: u32,
        family: FamilyFilter,
    ) -> Result<Vec<AddressEntry>, crate::Error>;

    /// Subscribe to link and address change notifications.
    ///
    /// The stream yields events for all interfaces; filtering is the
    /// caller's job. The stream ends when the subscription closes.
    fn events(&mut self) -> Result<EventStream, crate::Error>;
}
