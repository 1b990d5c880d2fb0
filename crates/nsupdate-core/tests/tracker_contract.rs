//! Contract test: address tracker event handling
//!
//! Constraints verified:
//! - The tracker seeds itself from the source's listing, scope-filtered
//! - `wait_for_change` resolves only for address events on the tracked
//!   interface; foreign-interface and link events never complete it
//! - Link events still update link state, and link-down hides (but keeps)
//!   the tracked addresses
//! - A closed event stream resolves `wait_for_change` with `Closed`

mod common;

use common::*;
use nsupdate_core::config::FamilyFilter;
use nsupdate_core::traits::{AddressEvent, LinkState};
use nsupdate_core::tracker::{AddressTracker, WaitOutcome};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;
use tokio::time::timeout;

const IFINDEX: u32 = 3;

fn v4(last: u8) -> IpAddr {
    Ipv4Addr::new(192, 0, 2, last).into()
}

#[tokio::test]
async fn seeds_from_listing_and_filters_scope() {
    let (mut source, _tx) = ScriptedAddressSource::new(
        link_up(IFINDEX),
        vec![
            global(v4(7)),
            global(v4(1)),
            nsupdate_core::traits::AddressEntry {
                addr: Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1).into(),
                scope: 253,
            },
        ],
    );

    let tracker = AddressTracker::open(&mut source, "eth0", FamilyFilter::All)
        .await
        .expect("open succeeds");

    assert_eq!(source.link_call_count(), 1);
    assert_eq!(source.list_call_count(), 1);
    assert_eq!(tracker.snapshot().addrs, vec![v4(1), v4(7)]);
}

#[tokio::test]
async fn missing_interface_fails_open() {
    let (mut source, _tx) = ScriptedAddressSource::new(link_up(IFINDEX), vec![]);
    let result = AddressTracker::open(&mut source, "wlan0", FamilyFilter::All).await;
    assert!(matches!(
        result,
        Err(nsupdate_core::Error::InterfaceNotFound(_))
    ));
}

#[tokio::test]
async fn family_filter_applies_to_seed_listing() {
    let v6: IpAddr = "2001:db8::1".parse().unwrap();
    let (mut source, _tx) =
        ScriptedAddressSource::new(link_up(IFINDEX), vec![global(v4(1)), global(v6)]);

    let tracker = AddressTracker::open(&mut source, "eth0", FamilyFilter::V6)
        .await
        .expect("open succeeds");

    assert_eq!(tracker.snapshot().addrs, vec![v6]);
}

#[tokio::test(start_paused = true)]
async fn address_event_completes_wait_and_updates_snapshot() {
    let (mut source, tx) = ScriptedAddressSource::new(link_up(IFINDEX), vec![global(v4(1))]);
    let mut tracker = AddressTracker::open(&mut source, "eth0", FamilyFilter::All)
        .await
        .expect("open succeeds");

    tx.send(addr_added(IFINDEX, v4(9))).unwrap();
    assert_eq!(tracker.wait_for_change().await, WaitOutcome::Changed);
    assert_eq!(tracker.snapshot().addrs, vec![v4(1), v4(9)]);

    tx.send(addr_removed(IFINDEX, v4(1))).unwrap();
    assert_eq!(tracker.wait_for_change().await, WaitOutcome::Changed);
    assert_eq!(tracker.snapshot().addrs, vec![v4(9)]);
}

#[tokio::test(start_paused = true)]
async fn foreign_interface_events_do_not_complete_wait() {
    let (mut source, tx) = ScriptedAddressSource::new(link_up(IFINDEX), vec![global(v4(1))]);
    let mut tracker = AddressTracker::open(&mut source, "eth0", FamilyFilter::All)
        .await
        .expect("open succeeds");

    tx.send(addr_added(IFINDEX + 1, v4(200))).unwrap();
    let waited = timeout(Duration::from_secs(5), tracker.wait_for_change()).await;
    assert!(waited.is_err(), "foreign event must not complete the wait");
    assert_eq!(tracker.snapshot().addrs, vec![v4(1)]);

    tx.send(addr_added(IFINDEX, v4(2))).unwrap();
    assert_eq!(tracker.wait_for_change().await, WaitOutcome::Changed);
    assert_eq!(tracker.snapshot().addrs, vec![v4(1), v4(2)]);
}

#[tokio::test(start_paused = true)]
async fn scope_filtered_event_completes_wait_as_noop() {
    let (mut source, tx) = ScriptedAddressSource::new(link_up(IFINDEX), vec![global(v4(1))]);
    let mut tracker = AddressTracker::open(&mut source, "eth0", FamilyFilter::All)
        .await
        .expect("open succeeds");

    tx.send(AddressEvent::Address {
        index: IFINDEX,
        addr: Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 2).into(),
        scope: 253,
        added: true,
    })
    .unwrap();

    assert_eq!(tracker.wait_for_change().await, WaitOutcome::Changed);
    assert_eq!(tracker.snapshot().addrs, vec![v4(1)]);
}

#[tokio::test(start_paused = true)]
async fn link_events_update_state_without_completing_wait() {
    let (mut source, tx) = ScriptedAddressSource::new(link_up(IFINDEX), vec![global(v4(1))]);
    let mut tracker = AddressTracker::open(&mut source, "eth0", FamilyFilter::All)
        .await
        .expect("open succeeds");

    tx.send(AddressEvent::Link(LinkState {
        index: IFINDEX,
        name: "eth0".to_string(),
        up: false,
    }))
    .unwrap();

    let waited = timeout(Duration::from_secs(5), tracker.wait_for_change()).await;
    assert!(waited.is_err(), "link event must not complete the wait");
    assert!(!tracker.link().up);
    assert!(tracker.snapshot().is_empty(), "link down hides addresses");

    tx.send(AddressEvent::Link(link_up(IFINDEX))).unwrap();
    let waited = timeout(Duration::from_secs(5), tracker.wait_for_change()).await;
    assert!(waited.is_err());
    assert_eq!(
        tracker.snapshot().addrs,
        vec![v4(1)],
        "addresses survive a link flap"
    );
}

#[tokio::test]
async fn closed_stream_resolves_closed() {
    let (mut source, tx) = ScriptedAddressSource::new(link_up(IFINDEX), vec![]);
    let mut tracker = AddressTracker::open(&mut source, "eth0", FamilyFilter::All)
        .await
        .expect("open succeeds");

    drop(tx);
    assert_eq!(tracker.wait_for_change().await, WaitOutcome::Closed);
}
