//! Report scenarios over synthetic inventories
//!
//! Each test builds a small inventory by hand, reconciles it, and checks the
//! rendered text the way an operator would read it.

use ec2_reservation_check::provider::{
    InstanceRecord, InstanceState, ReservationRecord, ReservationState,
};
use ec2_reservation_check::report::{
    render_text, ReportOptions, NO_UNRESERVED_MESSAGE, NO_UNUSED_MESSAGE,
};
use ec2_reservation_check::Reconciliation;

fn running(id: &str, instance_type: &str, zone: &str) -> InstanceRecord {
    InstanceRecord {
        id: id.to_string(),
        state: InstanceState::Running,
        spot: false,
        instance_type: instance_type.to_string(),
        availability_zone: zone.to_string(),
        platform: None,
        tags: Vec::new(),
    }
}

fn active(instance_type: &str, zone: Option<&str>, count: u32) -> ReservationRecord {
    ReservationRecord {
        id: format!("ri-{}-{}", instance_type, count),
        state: ReservationState::Active,
        instance_type: instance_type.to_string(),
        availability_zone: zone.map(str::to_string),
        scope: Some(if zone.is_some() { "availability zone" } else { "region" }.to_string()),
        product_description: Some("Linux/UNIX".to_string()),
        instance_count: count,
    }
}

fn lines_starting_with<'a>(text: &'a str, prefix: &str) -> Vec<&'a str> {
    text.lines().filter(|l| l.starts_with(prefix)).collect()
}

#[test]
fn test_empty_inventories() {
    let rec = Reconciliation::from_inventory(&[], &[]);
    let text = render_text(&rec, &ReportOptions::default());

    assert!(text.contains(NO_UNUSED_MESSAGE));
    assert!(text.contains(NO_UNRESERVED_MESSAGE));
    assert!(text.contains("(0) running on-demand instances"));
    assert!(text.contains("(0) reservations"));
    assert!(text.contains("(0) unused reservations"));
}

#[test]
fn test_single_unreserved_instance() {
    let rec = Reconciliation::from_inventory(&[running("i-1", "m5.large", "us-east-1a")], &[]);
    let text = render_text(&rec, &ReportOptions::default());

    assert!(text.contains(NO_UNUSED_MESSAGE));
    assert_eq!(
        lines_starting_with(&text, "Instance not reserved:"),
        vec!["Instance not reserved:\t(1)\tm5.large\tlinux\tus-east-1a"]
    );
}

#[test]
fn test_partially_used_zonal_reservation() {
    let rec = Reconciliation::from_inventory(
        &[running("i-1", "m5.large", "us-east-1a")],
        &[active("m5.large", Some("us-east-1a"), 3)],
    );
    let text = render_text(&rec, &ReportOptions::default());

    assert_eq!(
        lines_starting_with(&text, "UNUSED RESERVATION!"),
        vec!["UNUSED RESERVATION!\t(2)\tm5.large\tlinux\tus-east-1a"]
    );
    assert!(text.contains(NO_UNRESERVED_MESSAGE));
}

#[test]
fn test_regional_reservation_covers_any_zone() {
    let rec = Reconciliation::from_inventory(
        &[running("i-1", "c5.xlarge", "us-east-1b")],
        &[active("c5.xlarge", None, 2)],
    );
    let text = render_text(&rec, &ReportOptions::default());

    assert_eq!(
        lines_starting_with(&text, "UNUSED RESERVATION!"),
        vec!["UNUSED RESERVATION!\t(1)\tc5.xlarge\tlinux\tregion"]
    );
    assert!(lines_starting_with(&text, "Instance not reserved:").is_empty());
    assert!(text.contains(NO_UNRESERVED_MESSAGE));
}

#[test]
fn test_names_listed_sorted() {
    let mut named = running("i-1", "m5.large", "us-east-1a");
    named.tags = vec![("Name".to_string(), "web-1".to_string())];
    let unnamed = running("i-0abc", "m5.large", "us-east-1a");

    let rec = Reconciliation::from_inventory(&[named, unnamed], &[]);
    let text = render_text(&rec, &ReportOptions { include_names: true });

    assert_eq!(
        lines_starting_with(&text, "Instance not reserved:"),
        vec!["Instance not reserved:\t(2)\tm5.large\tlinux\tus-east-1a\ti-0abc, web-1"]
    );
}

#[test]
fn test_regional_shortfall_lists_names_from_all_zones() {
    let mut a = running("i-a", "c5.xlarge", "us-east-1a");
    a.tags = vec![("Name".to_string(), "worker-a".to_string())];
    let b = running("i-b", "c5.xlarge", "us-east-1b");
    let c = running("i-c", "c5.xlarge", "us-east-1c");

    let rec = Reconciliation::from_inventory(&[a, b, c], &[active("c5.xlarge", None, 1)]);
    let text = render_text(&rec, &ReportOptions { include_names: true });

    assert_eq!(
        lines_starting_with(&text, "Instance not reserved:"),
        vec!["Instance not reserved:\t(2)\tc5.xlarge\tlinux\tregion\ti-b, i-c, worker-a"]
    );
    assert!(text.contains(NO_UNUSED_MESSAGE));
}

#[test]
fn test_spot_and_stopped_instances_ignored() {
    let mut spot = running("i-spot", "m5.large", "us-east-1a");
    spot.spot = true;
    let mut stopped = running("i-stopped", "m5.large", "us-east-1a");
    stopped.state = InstanceState::Other("stopped".to_string());

    let rec = Reconciliation::from_inventory(&[spot, stopped], &[]);
    let text = render_text(&rec, &ReportOptions { include_names: true });

    assert!(text.contains(NO_UNRESERVED_MESSAGE));
    assert!(!text.contains("i-spot"));
    assert!(text.contains("(0) running on-demand instances"));
}

#[test]
fn test_windows_and_linux_kept_apart() {
    let mut windows = running("i-win", "m5.large", "us-east-1a");
    windows.platform = Some("windows".to_string());
    let linux = running("i-lin", "m5.large", "us-east-1a");

    let rec = Reconciliation::from_inventory(
        &[windows, linux],
        &[active("m5.large", Some("us-east-1a"), 1)],
    );
    let text = render_text(&rec, &ReportOptions::default());

    assert!(text.contains(NO_UNUSED_MESSAGE));
    assert_eq!(
        lines_starting_with(&text, "Instance not reserved:"),
        vec!["Instance not reserved:\t(1)\tm5.large\twindows\tus-east-1a"]
    );
}

#[test]
fn test_inactive_reservations_ignored() {
    let mut retired = active("m5.large", Some("us-east-1a"), 4);
    retired.state = ReservationState::Other("retired".to_string());

    let rec = Reconciliation::from_inventory(&[], &[retired]);
    let text = render_text(&rec, &ReportOptions::default());

    assert!(text.contains(NO_UNUSED_MESSAGE));
    assert!(text.contains("(0) reservations"));
}
