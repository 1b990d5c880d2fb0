// # Netlink Address Source
//
// This crate provides the rtnetlink-backed `AddressSource` for Linux.
//
// ## How it works
//
// 1. Open one rtnetlink connection and bind RTMGRP_LINK,
//    RTMGRP_IPV4_IFADDR and RTMGRP_IPV6_IFADDR before spawning it, so no
//    notification between the initial queries and the first stream poll is
//    lost
// 2. Serve `link_by_name` via RTM_GETLINK and `addresses` via RTM_GETADDR
//    on the same connection
// 3. Map New/DelLink and New/DelAddress notifications to core
//    `AddressEvent`s, carrying the kernel scope verbatim; scope filtering
//    is the tracker's job
//
// ## Platform Support
//
// Netlink is Linux-specific. Other platforms get a stub whose constructor
// fails, so the daemon reports a setup error instead of failing to build.

#[cfg(target_os = "linux")]
use async_trait::async_trait;

#[cfg(target_os = "linux")]
use futures::{StreamExt, TryStreamExt};

#[cfg(target_os = "linux")]
use netlink_packet_core::{NetlinkMessage, NetlinkPayload};

#[cfg(target_os = "linux")]
use netlink_packet_route::RouteNetlinkMessage;

#[cfg(target_os = "linux")]
use netlink_packet_route::address::{AddressAttribute, AddressMessage};

#[cfg(target_os = "linux")]
use netlink_packet_route::link::{LinkAttribute, LinkFlag, LinkMessage};

#[cfg(target_os = "linux")]
use netlink_packet_route::AddressFamily;

#[cfg(target_os = "linux")]
use rtnetlink::constants::{RTMGRP_IPV4_IFADDR, RTMGRP_IPV6_IFADDR, RTMGRP_LINK};

#[cfg(target_os = "linux")]
use netlink_sys::{AsyncSocket, SocketAddr};

#[cfg(target_os = "linux")]
use rtnetlink::Handle;

#[cfg(target_os = "linux")]
use tracing::{debug, trace};

#[cfg(target_os = "linux")]
use nsupdate_core::config::FamilyFilter;

#[cfg(target_os = "linux")]
use nsupdate_core::traits::{AddressEntry, AddressEvent, AddressSource, EventStream, LinkState};

use nsupdate_core::{Error, Result};

/// Netlink-backed address source for Linux.
#[cfg(target_os = "linux")]
pub struct NetlinkSource {
    handle: Handle,
    events: Option<EventStream>,
}

#[cfg(target_os = "linux")]
impl NetlinkSource {
    /// Open the rtnetlink connection and subscribe to link/address
    /// notifications.
    pub fn new() -> Result<Self> {
        let (mut connection, handle, messages) = rtnetlink::new_connection()
            .map_err(|e| Error::subscription(format!("opening netlink socket: {e}")))?;

        // Bind the multicast groups before the connection task runs, so
        // nothing between the initial queries and the first poll is lost.
        let groups = RTMGRP_LINK | RTMGRP_IPV4_IFADDR | RTMGRP_IPV6_IFADDR;
        let addr = SocketAddr::new(0, groups);
        connection
            .socket_mut()
            .socket_mut()
            .bind(&addr)
            .map_err(|e| Error::subscription(format!("binding multicast groups: {e}")))?;
        tokio::spawn(connection);
        debug!(groups = format_args!("{groups:#x}"), "netlink subscription open");

        let events: EventStream = Box::pin(messages.filter_map(|(message, _addr)| {
            futures::future::ready(map_message(message))
        }));

        Ok(Self {
            handle,
            events: Some(events),
        })
    }
}

#[cfg(target_os = "linux")]
#[async_trait]
impl AddressSource for NetlinkSource {
    async fn link_by_name(&mut self, name: &str) -> Result<LinkState> {
        let mut links = self
            .handle
            .link()
            .get()
            .match_name(name.to_string())
            .execute();
        match links.try_next().await {
            Ok(Some(message)) => link_state(&message)
                .ok_or_else(|| Error::subscription(format!("malformed link message for {name}"))),
            Ok(None) => Err(Error::interface_not_found(name)),
            Err(rtnetlink::Error::NetlinkError(_)) => Err(Error::interface_not_found(name)),
            Err(e) => Err(Error::subscription(format!("link lookup for {name}: {e}"))),
        }
    }

    async fn addresses(&mut self, index: u32, family: FamilyFilter) -> Result<Vec<AddressEntry>> {
        let mut messages = self
            .handle
            .address()
            .get()
            .set_link_index_filter(index)
            .execute();
        let mut entries = Vec::new();
        while let Some(message) = messages
            .try_next()
            .await
            .map_err(|e| Error::subscription(format!("address listing: {e}")))?
        {
            if !family_matches(family, message.header.family) {
                continue;
            }
            if let Some(entry) = address_entry(&message) {
                entries.push(entry);
            } else {
                trace!(index, "skipping address message without an address");
            }
        }
        Ok(entries)
    }

    fn events(&mut self) -> Result<EventStream> {
        self.events
            .take()
            .ok_or_else(|| Error::subscription("event stream already taken"))
    }
}

#[cfg(target_os = "linux")]
fn map_message(message: NetlinkMessage<RouteNetlinkMessage>) -> Option<AddressEvent> {
    let NetlinkPayload::InnerMessage(payload) = message.payload else {
        return None;
    };
    match payload {
        RouteNetlinkMessage::NewLink(m) => link_state(&m).map(AddressEvent::Link),
        RouteNetlinkMessage::DelLink(m) => link_state(&m).map(|mut state| {
            state.up = false;
            AddressEvent::Link(state)
        }),
        RouteNetlinkMessage::NewAddress(m) => address_event(&m, true),
        RouteNetlinkMessage::DelAddress(m) => address_event(&m, false),
        _ => None,
    }
}

#[cfg(target_os = "linux")]
fn link_state(message: &LinkMessage) -> Option<LinkState> {
    let name = message
        .attributes
        .iter()
        .find_map(|attr| match attr {
            LinkAttribute::IfName(name) => Some(name.clone()),
            _ => None,
        })
        .unwrap_or_default();
    Some(LinkState {
        index: message.header.index,
        name,
        up: message.header.flags.contains(&LinkFlag::Up),
    })
}

#[cfg(target_os = "linux")]
fn address_event(message: &AddressMessage, added: bool) -> Option<AddressEvent> {
    let entry = address_entry(message)?;
    Some(AddressEvent::Address {
        index: message.header.index,
        addr: entry.addr,
        scope: entry.scope,
        added,
    })
}

// Prefer IFA_LOCAL over IFA_ADDRESS: for point-to-point interfaces the
// latter is the peer.
#[cfg(target_os = "linux")]
fn address_entry(message: &AddressMessage) -> Option<AddressEntry> {
    let mut local = None;
    let mut address = None;
    for attr in &message.attributes {
        match attr {
            AddressAttribute::Local(ip) => local = Some(*ip),
            AddressAttribute::Address(ip) => address = Some(*ip),
            _ => {}
        }
    }
    Some(AddressEntry {
        addr: local.or(address)?,
        scope: u8::from(message.header.scope),
    })
}

#[cfg(target_os = "linux")]
fn family_matches(filter: FamilyFilter, family: AddressFamily) -> bool {
    match filter {
        FamilyFilter::All => matches!(family, AddressFamily::Inet | AddressFamily::Inet6),
        FamilyFilter::V4 => family == AddressFamily::Inet,
        FamilyFilter::V6 => family == AddressFamily::Inet6,
    }
}

/// Stub for platforms without netlink; construction fails.
#[cfg(not(target_os = "linux"))]
pub struct NetlinkSource;

#[cfg(not(target_os = "linux"))]
impl NetlinkSource {
    pub fn new() -> Result<Self> {
        Err(Error::subscription(
            "netlink address source is only supported on Linux",
        ))
    }
}

#[cfg(not(target_os = "linux"))]
#[async_trait::async_trait]
impl nsupdate_core::traits::AddressSource for NetlinkSource {
    async fn link_by_name(
        &mut self,
        name: &str,
    ) -> Result<nsupdate_core::traits::LinkState> {
        Err(Error::interface_not_found(name))
    }

    async fn addresses(
        &mut self,
        _index: u32,
        _family: nsupdate_core::config::FamilyFilter,
    ) -> Result<Vec<nsupdate_core::traits::AddressEntry>> {
        Ok(Vec::new())
    }

    fn events(&mut self) -> Result<nsupdate_core::traits::EventStream> {
        Err(Error::subscription(
            "netlink address source is only supported on Linux",
        ))
    }
}
