// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for interface discovery and the interface cache.

use std::sync::Arc;

use imaq::mock::MockDriver;
use imaq::{
    CONFIG_SERVICE_NAME, ImaqDriver, InterfaceCache, InterfaceDescriptor, MAX_PORTS,
    enumerate_interfaces,
};

fn names(interfaces: &[InterfaceDescriptor]) -> Vec<String> {
    interfaces.iter().map(InterfaceDescriptor::name).collect()
}

fn driver(mock: MockDriver) -> (Arc<MockDriver>, ImaqDriver) {
    let mock = Arc::new(mock);
    let driver: ImaqDriver = mock.clone();
    (mock, driver)
}

#[test]
fn multi_port_interfaces_get_one_entry_per_port() {
    let (_, driver) = driver(MockDriver::new().with_interface("img1", 3));

    let interfaces = enumerate_interfaces(&driver);

    assert_eq!(names(&interfaces), ["img1::0", "img1::1", "img1::2"]);
    assert_eq!(interfaces[2].interface(), "img1");
    assert_eq!(interfaces[2].port(), Some(2));
}

#[test]
fn single_port_interfaces_keep_their_name() {
    let (_, driver) = driver(MockDriver::new().with_interface("img0", 1));

    let interfaces = enumerate_interfaces(&driver);

    assert_eq!(names(&interfaces), ["img0"]);
    assert_eq!(interfaces[0].port(), None);
}

#[test]
fn implausible_port_counts_fall_back_to_one_port() {
    let (mock, driver) = driver(
        MockDriver::new()
            .with_interface("img0", u32::MAX)
            .with_interface("img1", 0)
            .with_interface("img2", MAX_PORTS),
    );

    let interfaces = enumerate_interfaces(&driver);

    assert_eq!(interfaces.len(), 2 + MAX_PORTS as usize);
    assert_eq!(names(&interfaces[..2]), ["img0", "img1"]);
    assert_eq!(interfaces[2].port(), Some(0));
    assert_eq!(mock.open_interface_count(), 0);
}

#[test]
fn discovery_order_is_kept() {
    let (_, driver) = driver(
        MockDriver::new()
            .with_interface("img0", 1)
            .with_interface("img1", 2)
            .with_interface("img2", 1),
    );

    let interfaces = enumerate_interfaces(&driver);

    assert_eq!(names(&interfaces), ["img0", "img1::0", "img1::1", "img2"]);
}

#[test]
fn config_service_and_unopenable_interfaces_are_skipped() {
    let (mock, driver) = driver(
        MockDriver::new()
            .with_interface(CONFIG_SERVICE_NAME, 1)
            .with_unopenable_interface("img0")
            .with_interface("img1", 1),
    );

    let interfaces = enumerate_interfaces(&driver);

    assert_eq!(names(&interfaces), ["img1"]);
    assert_eq!(mock.counters().interface_opens, 1);
}

#[test]
fn queried_interfaces_are_closed_again() {
    let (mock, driver) = driver(
        MockDriver::new()
            .with_interface("img0", 2)
            .with_interface("img1", 1),
    );

    enumerate_interfaces(&driver);

    assert_eq!(mock.counters().interface_opens, 2);
    assert_eq!(mock.open_interface_count(), 0);
}

#[test]
fn query_failure_ends_enumeration() {
    let (_, driver) = driver(
        MockDriver::new()
            .with_interface("img0", 1)
            .with_interface("img1", 1)
            .with_interface("img2", 1)
            .with_query_failure_at(1),
    );

    assert_eq!(names(&enumerate_interfaces(&driver)), ["img0"]);
}

#[test]
fn cache_is_reused_until_forced() {
    let (mock, driver) = driver(MockDriver::new().with_interface("img0", 2));
    let mut cache = InterfaceCache::new();
    assert!(cache.get().is_none());

    let (first, cached) = cache.enumerate(&driver, false);
    assert!(!cached);
    assert_eq!(names(first), ["img0::0", "img0::1"]);

    let (second, cached) = cache.enumerate(&driver, false);
    assert!(cached);
    assert_eq!(names(second), ["img0::0", "img0::1"]);
    assert_eq!(mock.counters().interface_opens, 1);

    let (third, cached) = cache.enumerate(&driver, true);
    assert!(!cached);
    assert_eq!(third.len(), 2);
    assert_eq!(mock.counters().interface_opens, 2);
}

#[test]
fn refresh_replaces_the_whole_list() {
    let (_, first_driver) = driver(MockDriver::new().with_interface("img0", 1));
    let (_, second_driver) = driver(MockDriver::new().with_interface("img5", 1));
    let mut cache = InterfaceCache::new();

    cache.refresh(&first_driver);
    cache.refresh(&second_driver);

    assert_eq!(cache.get().map(names), Some(vec!["img5".to_string()]));

    cache.invalidate();
    assert!(cache.get().is_none());
}

#[test]
fn descriptor_display_matches_name() {
    assert_eq!(InterfaceDescriptor::new("img0").to_string(), "img0");
    assert_eq!(InterfaceDescriptor::with_port("img0", 1).to_string(), "img0::1");
}
