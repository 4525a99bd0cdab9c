use jury_core::{
    GradingService, InMemoryStateStore, ManualClock, NewDeliverable, Role, User, UserId,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

const DUE_AT: i64 = 1_700_000_000_000;

type Service = GradingService<InMemoryStateStore, ManualClock>;

struct Fixture {
    service: Service,
    clock: ManualClock,
    owner: User,
    teammate: User,
}

fn setup(seed: u64) -> Fixture {
    let clock = ManualClock::new(DUE_AT - 60_000);
    let service = GradingService::with_rng(
        InMemoryStateStore::new(),
        clock.clone(),
        StdRng::seed_from_u64(seed),
    );
    let owner = service.register_user("ana", Role::Student).unwrap();
    let teammate = service.register_user("Bogdan", Role::Student).unwrap();
    Fixture {
        service,
        clock,
        owner,
        teammate,
    }
}

fn register_students(service: &Service, names: &[&str]) -> Vec<UserId> {
    names
        .iter()
        .map(|name| service.register_user(name, Role::Student).unwrap().id)
        .collect()
}

fn create_deliverable(fixture: &Fixture, jury_size: u32) -> jury_core::DeliverableId {
    let project = fixture
        .service
        .create_project(
            fixture.owner.id,
            "Web App",
            &["ANA".to_string(), "bogdan".to_string()],
        )
        .unwrap();
    fixture
        .service
        .create_deliverable(
            fixture.owner.id,
            NewDeliverable {
                project_id: project.id,
                title: "Milestone 1".to_string(),
                due_at: DUE_AT,
                jury_size,
                edit_window_minutes: 30,
            },
        )
        .unwrap()
        .id
}

fn roster(service: &Service, deliverable_id: jury_core::DeliverableId) -> Vec<UserId> {
    service
        .snapshot()
        .unwrap()
        .deliverable(deliverable_id)
        .unwrap()
        .jury_user_ids()
        .to_vec()
}

#[test]
fn top_up_is_noop_before_due_time() {
    let fixture = setup(1);
    register_students(&fixture.service, &["c1", "c2", "c3", "c4"]);
    let deliverable_id = create_deliverable(&fixture, 3);

    fixture.clock.set(DUE_AT - 1);
    let outcome = fixture.service.top_up_jury(deliverable_id).unwrap();

    assert!(!outcome.changed());
    assert_eq!(outcome.roster_len, 0);
    assert!(roster(&fixture.service, deliverable_id).is_empty());
}

#[test]
fn top_up_fills_target_at_due_time() {
    let fixture = setup(2);
    register_students(&fixture.service, &["c1", "c2", "c3", "c4", "c5", "c6"]);
    let deliverable_id = create_deliverable(&fixture, 4);

    fixture.clock.set(DUE_AT);
    let outcome = fixture.service.top_up_jury(deliverable_id).unwrap();

    assert_eq!(outcome.added, 4);
    assert_eq!(outcome.target, 4);
    assert!(!outcome.is_under_assigned());
    let jurors = roster(&fixture.service, deliverable_id);
    assert_eq!(jurors.len(), 4);
    assert_eq!(jurors.iter().collect::<HashSet<_>>().len(), 4);
}

#[test]
fn jury_never_contains_team_members_or_staff() {
    let fixture = setup(3);
    register_students(&fixture.service, &["c1", "c2", "c3"]);
    fixture.service.register_user("prof", Role::Staff).unwrap();
    let deliverable_id = create_deliverable(&fixture, 10);

    fixture.clock.set(DUE_AT + 1);
    fixture.service.top_up_jury(deliverable_id).unwrap();

    let jurors = roster(&fixture.service, deliverable_id);
    let state = fixture.service.snapshot().unwrap();
    assert_eq!(jurors.len(), 3);
    assert!(!jurors.contains(&fixture.owner.id));
    assert!(!jurors.contains(&fixture.teammate.id));
    for juror in jurors {
        assert_eq!(state.user(juror).unwrap().role, Role::Student);
    }
}

#[test]
fn small_pool_stabilizes_below_target() {
    let fixture = setup(4);
    register_students(&fixture.service, &["c1", "c2", "c3"]);
    let deliverable_id = create_deliverable(&fixture, 5);

    fixture.clock.set(DUE_AT);
    let first = fixture.service.top_up_jury(deliverable_id).unwrap();
    assert_eq!(first.added, 3);
    assert!(first.is_under_assigned());
    let settled = roster(&fixture.service, deliverable_id);

    for _ in 0..5 {
        fixture.clock.advance_ms(5_000);
        let again = fixture.service.top_up_jury(deliverable_id).unwrap();
        assert!(!again.changed());
        assert_eq!(again.roster_len, 3);
    }
    assert_eq!(roster(&fixture.service, deliverable_id), settled);
}

#[test]
fn late_registrations_extend_roster_without_reordering() {
    let fixture = setup(5);
    register_students(&fixture.service, &["c1", "c2"]);
    let deliverable_id = create_deliverable(&fixture, 4);

    fixture.clock.set(DUE_AT);
    fixture.service.top_up_jury(deliverable_id).unwrap();
    let before = roster(&fixture.service, deliverable_id);
    assert_eq!(before.len(), 2);

    let late = register_students(&fixture.service, &["late1", "late2", "late3"]);
    let outcome = fixture.service.top_up_jury(deliverable_id).unwrap();
    assert_eq!(outcome.added, 2);

    let after = roster(&fixture.service, deliverable_id);
    assert_eq!(after.len(), 4);
    assert_eq!(&after[..2], before.as_slice());
    assert!(after[2..].iter().all(|id| late.contains(id)));
}

#[test]
fn same_seed_reproduces_the_same_draw() {
    let draw = |seed: u64| {
        let fixture = setup(seed);
        let names = ["c1", "c2", "c3", "c4", "c5", "c6", "c7", "c8"];
        let ids = register_students(&fixture.service, &names);
        let deliverable_id = create_deliverable(&fixture, 3);
        fixture.clock.set(DUE_AT);
        fixture.service.top_up_jury(deliverable_id).unwrap();
        roster(&fixture.service, deliverable_id)
            .iter()
            .map(|id| ids.iter().position(|candidate| candidate == id).unwrap())
            .collect::<Vec<_>>()
    };

    assert_eq!(draw(99), draw(99));
}

#[test]
fn unchanged_top_up_does_not_save() {
    let fixture = setup(6);
    register_students(&fixture.service, &["c1", "c2", "c3"]);
    let deliverable_id = create_deliverable(&fixture, 3);

    fixture.clock.set(DUE_AT);
    fixture.service.top_up_jury(deliverable_id).unwrap();
    fixture.service.top_up_jury(deliverable_id).unwrap();
    fixture.service.top_up_all().unwrap();

    let store = fixture.service.into_store();
    // 5 registrations + project + deliverable + one effective top-up
    assert_eq!(store.save_count(), 8);
}

#[test]
fn top_up_unknown_deliverable_is_not_found() {
    let fixture = setup(7);
    let err = fixture
        .service
        .top_up_jury(uuid::Uuid::new_v4())
        .unwrap_err();
    assert_eq!(err.code(), "not_found");
}
