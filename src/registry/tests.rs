//! Unit tests for the instance registry.

use std::sync::Arc;
use std::thread;

use super::*;
use rstest::{fixture, rstest};

#[fixture]
fn registry() -> InstanceRegistry {
    InstanceRegistry::new()
}

fn running(id: &str) -> InstanceRecord {
    InstanceRecord {
        id: id.to_owned(),
        status: CloudStatus::Running,
        is_up: true,
        is_ssh_reachable: true,
        ssh_options: vec![String::from("-o"), String::from("User=ci")],
        dns_name: format!("{id}.example.test"),
        time_til_next_payment: Duration::from_secs(90),
        on_up_ran: false,
    }
}

#[rstest]
fn untracked_ids_read_as_default(registry: InstanceRegistry) {
    registry.set("a", running("a"));
    assert_eq!(registry.get("missing"), InstanceRecord::default());
    assert_eq!(registry.lookup("missing"), None);
    assert_eq!(registry.len(), 1);
}

#[rstest]
fn set_then_get_returns_equal_value(registry: InstanceRegistry) {
    let record = running("a");
    registry.set("a", record.clone());
    assert_eq!(registry.get("a"), record);

    let replacement = InstanceRecord::fresh("a");
    registry.set("a", replacement.clone());
    assert_eq!(registry.get("a"), replacement);
    assert_eq!(registry.len(), 1);
}

#[rstest]
fn returned_records_do_not_alias_storage(registry: InstanceRegistry) {
    registry.set("a", running("a"));
    let mut copy = registry.get("a");
    copy.dns_name.clear();
    assert_eq!(registry.get("a").dns_name, "a.example.test");
}

#[rstest]
fn reset_clears_everything(registry: InstanceRegistry) {
    registry.set("a", running("a"));
    registry.set("b", running("b"));
    let before: Vec<String> = registry.snapshot_ids().collect();
    assert_eq!(before.len(), 2);

    registry.reset();

    assert_eq!(registry.len(), 0);
    assert!(registry.is_empty());
    let after: Vec<String> = registry.snapshot_ids().collect();
    assert!(before.iter().all(|id| !after.contains(id)));
}

#[rstest]
fn snapshots_match_size(registry: InstanceRegistry) {
    for id in ["a", "b", "c"] {
        registry.set(id, running(id));
    }
    assert_eq!(registry.snapshot_ids().len(), registry.len());
    assert_eq!(registry.snapshot_records().len(), registry.len());

    let mut ids: Vec<String> = registry.snapshot_ids().collect();
    ids.sort();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[rstest]
fn snapshot_is_unaffected_by_later_writes(registry: InstanceRegistry) {
    registry.set("a", running("a"));
    let snapshot = registry.snapshot_records();
    registry.set("b", running("b"));
    registry.set("a", InstanceRecord::fresh("a"));

    let captured: Vec<InstanceRecord> = snapshot.collect();
    assert_eq!(captured, vec![running("a")]);
}

#[rstest]
fn update_writes_back_on_success(registry: InstanceRegistry) {
    registry.set("a", InstanceRecord::fresh("a"));
    let outcome = registry.update("a", |record| {
        record.is_up = true;
        record.dns_name = String::from("a.example.test");
        Ok::<_, ()>(())
    });
    assert_eq!(outcome, Some(Ok(())));
    let stored = registry.get("a");
    assert!(stored.is_up);
    assert_eq!(stored.dns_name, "a.example.test");
}

#[rstest]
fn update_discards_changes_on_error(registry: InstanceRegistry) {
    registry.set("a", InstanceRecord::fresh("a"));
    let outcome = registry.update("a", |record| {
        record.status = CloudStatus::Terminated;
        Err::<(), _>("rejected")
    });
    assert_eq!(outcome, Some(Err("rejected")));
    assert_eq!(registry.get("a").status, CloudStatus::Initializing);
}

#[rstest]
fn update_reports_untracked_ids(registry: InstanceRegistry) {
    let outcome = registry.update("missing", |_| Ok::<_, ()>(()));
    assert_eq!(outcome, None);
    assert!(registry.is_empty());
}

#[rstest]
fn insert_if_absent_keeps_existing_records(registry: InstanceRegistry) {
    assert!(registry.insert_if_absent("a", running("a")));
    assert!(!registry.insert_if_absent("a", InstanceRecord::fresh("a")));
    assert_eq!(registry.get("a"), running("a"));
}

#[rstest]
fn lookup_many_preserves_order(registry: InstanceRegistry) {
    registry.set("a", running("a"));
    registry.set("b", InstanceRecord::fresh("b"));
    let found = registry.lookup_many(["b", "missing", "a"]);
    let statuses: Vec<Option<CloudStatus>> = found
        .iter()
        .map(|record| record.as_ref().map(|r| r.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            Some(CloudStatus::Initializing),
            None,
            Some(CloudStatus::Running)
        ]
    );
}

#[test]
fn snapshots_never_observe_torn_records_under_concurrent_writers() {
    let registry = Arc::new(InstanceRegistry::new());
    let writers: Vec<_> = (0..4)
        .map(|writer| {
            let shared = Arc::clone(&registry);
            thread::spawn(move || {
                for round in 0..200_u64 {
                    let id = format!("w{writer}-{}", round & 7);
                    // Every field is derived from `round`, so a torn record
                    // would carry mismatched values.
                    shared.set(
                        id.clone(),
                        InstanceRecord {
                            id: id.clone(),
                            status: CloudStatus::Running,
                            is_up: round & 1 == 0,
                            is_ssh_reachable: round & 1 == 0,
                            ssh_options: vec![round.to_string()],
                            dns_name: round.to_string(),
                            time_til_next_payment: Duration::from_secs(round),
                            on_up_ran: false,
                        },
                    );
                    if round & 63 == 0 {
                        shared.update(&id, |record| {
                            record.on_up_ran = true;
                            Ok::<_, ()>(())
                        });
                    }
                }
            })
        })
        .collect();

    for _ in 0..200 {
        for record in registry.snapshot_records() {
            let round = record.time_til_next_payment.as_secs();
            assert_eq!(record.dns_name, round.to_string());
            assert_eq!(record.ssh_options, vec![round.to_string()]);
            assert_eq!(record.is_up, record.is_ssh_reachable);
        }
    }

    for writer in writers {
        writer
            .join()
            .unwrap_or_else(|_| panic!("writer thread panicked"));
    }
    assert_eq!(registry.len(), 32);
    assert_eq!(registry.snapshot_ids().len(), 32);
}
