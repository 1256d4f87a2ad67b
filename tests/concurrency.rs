mod common;

use chrono::Utc;
use common::TestProject;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tagguard::paths::ProjectPaths;
use tagguard::policy::default_policy;
use tagguard::reserve::{ReservationAllocator, ReserveRequest, StubFields};
use tagguard::store::{read_counters, read_ledger, LedgerOp, StateStore};

const WORKERS: usize = 8;

fn reserve_once(paths: ProjectPaths, actor: &str) -> String {
    let policy = default_policy();
    let store = StateStore::new(paths, Duration::from_secs(30));
    let fields = StubFields::default();
    let request = ReserveRequest {
        domain: "AUTH",
        actor,
        now: Utc::now(),
        trigger_path: None,
        fields: &fields,
    };
    ReservationAllocator::new(&store, &policy)
        .reserve(&request)
        .expect("reserve under contention")
        .tag_id
}

#[test]
fn concurrent_reservations_are_unique_and_dense() {
    let project = TestProject::with_default_policy();
    let barrier = Arc::new(Barrier::new(WORKERS));

    let handles: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let barrier = Arc::clone(&barrier);
            let paths = project.paths.clone();
            thread::spawn(move || {
                barrier.wait();
                reserve_once(paths, &format!("worker-{worker}"))
            })
        })
        .collect();
    let mut ids: Vec<String> = handles
        .into_iter()
        .map(|handle| handle.join().expect("worker thread"))
        .collect();
    ids.sort();

    let expected: Vec<String> = (1..=WORKERS)
        .map(|n| format!("@SPEC:AUTH-{n:03}"))
        .collect();
    assert_eq!(ids, expected);

    let counters = read_counters(&project.paths.counters_path())
        .expect("read counters")
        .expect("counters present");
    let ledger = read_ledger(&project.paths.ledger_path()).expect("read ledger");
    let reserves = ledger
        .entries
        .iter()
        .filter(|entry| entry.op == LedgerOp::Reserve)
        .count();
    assert_eq!(reserves, WORKERS);
    assert_eq!(ledger.skipped_lines, 0);
    assert_eq!(counters.get("AUTH").copied(), Some(WORKERS as u64));

    let index = StateStore::new(project.paths.clone(), Duration::from_secs(1)).load_index();
    assert_eq!(index.len(), WORKERS);
}
