use super::*;
use crate::policy::default_policy;
use crate::reserve::{ReservationAllocator, ReserveRequest, StubFields};
use crate::store::ledger_or_empty;
use chrono::TimeZone;
use std::time::Duration as StdDuration;

struct Fixture {
    _dir: tempfile::TempDir,
    store: StateStore,
    policy: PolicyConfig,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let paths = ProjectPaths::new(dir.path().to_path_buf());
        Self {
            _dir: dir,
            store: StateStore::new(paths, StdDuration::from_millis(500)),
            policy: default_policy(),
        }
    }

    fn lifecycle(&self) -> Lifecycle<'_> {
        Lifecycle::new(&self.store, &self.policy)
    }

    fn reserve(&self, domain: &str, at: DateTime<Utc>) -> String {
        let fields = StubFields::default();
        let request = ReserveRequest {
            domain,
            actor: "tester",
            now: at,
            trigger_path: None,
            fields: &fields,
        };
        ReservationAllocator::new(&self.store, &self.policy)
            .reserve(&request)
            .expect("reserve")
            .tag_id
    }

    fn ops(&self) -> Vec<LedgerOp> {
        ledger_or_empty(&self.store.paths().ledger_path())
            .entries
            .iter()
            .map(|entry| entry.op)
            .collect()
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
}

fn lifecycle_error(err: &anyhow::Error) -> &LifecycleError {
    err.downcast_ref::<LifecycleError>().expect("lifecycle error")
}

#[test]
fn register_activates_reservation_and_sets_primary() {
    let fixture = Fixture::new();
    let tag = fixture.reserve("AUTH", now());
    let outcome = fixture
        .lifecycle()
        .register(&tag, "src/auth/login.py", "tester", now())
        .expect("register");

    let RegisterOutcome::Registered(entry) = outcome else {
        panic!("expected a fresh registration");
    };
    assert_eq!(entry.state, TagState::Active);
    assert_eq!(entry.primary(), Some("src/auth/login.py"));
    assert_eq!(entry.reserved_until, None);
    assert_eq!(fixture.ops(), vec![LedgerOp::Reserve, LedgerOp::Register]);
}

#[test]
fn register_same_path_twice_is_a_noop() {
    let fixture = Fixture::new();
    let lifecycle = fixture.lifecycle();
    lifecycle
        .register("@SPEC:DOCS-004", "docs/guide.md", "tester", now())
        .expect("first register");
    let outcome = lifecycle
        .register("@SPEC:DOCS-004", "./docs/guide.md", "tester", now())
        .expect("second register");

    assert!(matches!(outcome, RegisterOutcome::Unchanged(_)));
    assert_eq!(outcome.entry().domain, "DOCS");
    assert_eq!(fixture.ops(), vec![LedgerOp::Register]);
}

#[test]
fn register_rejects_second_primary() {
    let fixture = Fixture::new();
    let lifecycle = fixture.lifecycle();
    lifecycle
        .register("@SPEC:AUTH-001", "src/auth/a.py", "tester", now())
        .expect("register");
    let err = lifecycle
        .register("@SPEC:AUTH-001", "src/auth/b.py", "tester", now())
        .expect_err("duplicate primary");

    match lifecycle_error(&err) {
        LifecycleError::DuplicatePrimary { tag, existing } => {
            assert_eq!(tag, "@SPEC:AUTH-001");
            assert_eq!(existing, "src/auth/a.py");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fixture.ops(), vec![LedgerOp::Register]);
}

#[test]
fn register_rejects_malformed_ids() {
    let fixture = Fixture::new();
    let err = fixture
        .lifecycle()
        .register("SPEC:AUTH-1", "src/a.py", "tester", now())
        .expect_err("invalid tag");
    assert!(matches!(lifecycle_error(&err), LifecycleError::InvalidTag(_)));
    assert!(!fixture.store.paths().ledger_path().exists());
}

#[test]
fn release_then_register_is_an_invalid_transition() {
    let fixture = Fixture::new();
    let tag = fixture.reserve("PAY", now());
    let lifecycle = fixture.lifecycle();
    let released = lifecycle.release(&tag, "tester", now()).expect("release");
    assert_eq!(released.state, TagState::Released);

    let err = lifecycle
        .register(&tag, "src/pay/charge.py", "tester", now())
        .expect_err("released ids stay retired");
    assert!(matches!(
        lifecycle_error(&err),
        LifecycleError::InvalidTransition {
            op: LedgerOp::Register,
            state: TagState::Released,
            ..
        }
    ));
    let err = lifecycle
        .release(&tag, "tester", now())
        .expect_err("double release");
    assert!(matches!(
        lifecycle_error(&err),
        LifecycleError::InvalidTransition { .. }
    ));
    assert_eq!(fixture.ops(), vec![LedgerOp::Reserve, LedgerOp::Release]);
}

#[test]
fn release_unknown_tag_fails() {
    let fixture = Fixture::new();
    let err = fixture
        .lifecycle()
        .release("@SPEC:AUTH-999", "tester", now())
        .expect_err("unknown tag");
    assert!(matches!(lifecycle_error(&err), LifecycleError::UnknownTag(_)));
}

#[test]
fn expire_overdue_persists_only_past_deadlines() {
    let fixture = Fixture::new();
    let stale = fixture.reserve("AUTH", now() - Duration::hours(100));
    let fresh = fixture.reserve("AUTH", now());
    let lifecycle = fixture.lifecycle();

    let expired = lifecycle.expire_overdue("tester", now()).expect("expire");
    assert_eq!(expired, vec![stale.clone()]);
    let index = fixture.store.load_index();
    assert_eq!(index[&stale].state, TagState::Expired);
    assert_eq!(index[&fresh].state, TagState::Reserved);

    let again = lifecycle.expire_overdue("tester", now()).expect("expire again");
    assert!(again.is_empty());
    assert_eq!(
        fixture.ops(),
        vec![LedgerOp::Reserve, LedgerOp::Reserve, LedgerOp::Expire]
    );
}

#[test]
fn expired_reservation_can_still_be_registered() {
    let fixture = Fixture::new();
    let tag = fixture.reserve("AUTH", now() - Duration::hours(100));
    let lifecycle = fixture.lifecycle();
    lifecycle.expire_overdue("tester", now()).expect("expire");
    let outcome = lifecycle
        .register(&tag, "src/auth/late.py", "tester", now())
        .expect("register");
    assert_eq!(outcome.entry().state, TagState::Active);
}

#[test]
fn rebuild_index_matches_incremental_index() {
    let fixture = Fixture::new();
    let first = fixture.reserve("AUTH", now());
    fixture.reserve("USER", now());
    let lifecycle = fixture.lifecycle();
    lifecycle
        .register(&first, "src/auth/a.py", "tester", now())
        .expect("register");
    let incremental = fixture.store.load_index();

    std::fs::remove_file(fixture.store.paths().index_path()).expect("remove index");
    let summary = lifecycle.rebuild_index().expect("rebuild");
    assert_eq!(summary.entries, 2);
    assert_eq!(summary.skipped_lines, 0);
    assert_eq!(fixture.store.load_index(), incremental);
}

#[test]
fn status_reports_derived_states_and_counters() {
    let fixture = Fixture::new();
    let expired = fixture.reserve("AUTH", now() - Duration::hours(73));
    let expiring = fixture.reserve("AUTH", now() - Duration::hours(60));
    let reserved = fixture.reserve("USER", now());
    let lifecycle = fixture.lifecycle();
    lifecycle
        .register("@SPEC:CORE-001", "src/core/lib.rs", "tester", now())
        .expect("register");

    let report = lifecycle.status(now());
    let state_of = |id: &str| {
        report
            .entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.state)
    };
    assert_eq!(state_of(&expired), Some(DerivedState::Expired));
    assert_eq!(state_of(&expiring), Some(DerivedState::Expiring));
    assert_eq!(state_of(&reserved), Some(DerivedState::Reserved));
    assert_eq!(state_of("@SPEC:CORE-001"), Some(DerivedState::Active));
    assert_eq!(report.counters.get("AUTH"), Some(&2));
    assert_eq!(report.counters.get("USER"), Some(&1));
    assert_eq!(report.counters.get("CORE"), None);
}
