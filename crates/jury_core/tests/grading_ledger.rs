use jury_core::{
    DeliverableId, EngineError, GradeValueError, GradingService, InMemoryStateStore, ManualClock,
    NewDeliverable, Role, User,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use std::str::FromStr;

const DUE_AT: i64 = 1_700_000_000_000;
const WINDOW_MINUTES: u32 = 10;
const WINDOW_CLOSES_AT: i64 = DUE_AT + WINDOW_MINUTES as i64 * 60_000;

type Service = GradingService<InMemoryStateStore, ManualClock>;

struct Fixture {
    service: Service,
    clock: ManualClock,
    owner: User,
    jurors: Vec<User>,
    deliverable_id: DeliverableId,
}

/// Three eligible students, target three: every eligible student is drawn.
fn setup() -> Fixture {
    let clock = ManualClock::new(DUE_AT - 3_600_000);
    let service = GradingService::with_rng(
        InMemoryStateStore::new(),
        clock.clone(),
        StdRng::seed_from_u64(7),
    );
    let owner = service.register_user("owner", Role::Student).unwrap();
    let jurors = ["j1", "j2", "j3"]
        .iter()
        .map(|name| service.register_user(name, Role::Student).unwrap())
        .collect::<Vec<_>>();
    let project = service
        .create_project(owner.id, "Robot", &["owner".to_string()])
        .unwrap();
    let deliverable_id = service
        .create_deliverable(
            owner.id,
            NewDeliverable {
                project_id: project.id,
                title: "Prototype".to_string(),
                due_at: DUE_AT,
                jury_size: 3,
                edit_window_minutes: WINDOW_MINUTES,
            },
        )
        .unwrap()
        .id;

    clock.set(DUE_AT);
    let outcome = service.top_up_jury(deliverable_id).unwrap();
    assert_eq!(outcome.roster_len, 3);

    Fixture {
        service,
        clock,
        owner,
        jurors,
        deliverable_id,
    }
}

fn dec(raw: &str) -> Decimal {
    Decimal::from_str(raw).unwrap()
}

#[test]
fn team_member_is_not_a_juror() {
    let fixture = setup();

    let err = fixture
        .service
        .submit_grade(fixture.owner.id, fixture.deliverable_id, "9")
        .unwrap_err();
    assert!(matches!(err, EngineError::NotJuror { .. }));
}

#[test]
fn edit_window_boundary_is_inclusive() {
    let fixture = setup();
    let juror = fixture.jurors[0].id;

    fixture.clock.set(WINDOW_CLOSES_AT);
    let grade = fixture
        .service
        .submit_grade(juror, fixture.deliverable_id, "8.5")
        .unwrap();
    assert_eq!(grade.value.as_decimal(), dec("8.50"));

    fixture.clock.set(WINDOW_CLOSES_AT + 1);
    let err = fixture
        .service
        .submit_grade(juror, fixture.deliverable_id, "9")
        .unwrap_err();
    match err {
        EngineError::EditWindowClosed { closed_at, .. } => {
            assert_eq!(closed_at, WINDOW_CLOSES_AT)
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn juror_check_runs_before_window_check() {
    let fixture = setup();
    fixture.clock.set(WINDOW_CLOSES_AT + 60_000);

    let err = fixture
        .service
        .submit_grade(fixture.owner.id, fixture.deliverable_id, "not a number")
        .unwrap_err();
    assert_eq!(err.code(), "not_juror");
}

#[test]
fn window_check_runs_before_value_check() {
    let fixture = setup();
    fixture.clock.set(WINDOW_CLOSES_AT + 1);

    let err = fixture
        .service
        .submit_grade(fixture.jurors[1].id, fixture.deliverable_id, "42")
        .unwrap_err();
    assert_eq!(err.code(), "edit_window_closed");
}

#[test]
fn grade_values_are_validated() {
    let fixture = setup();
    let juror = fixture.jurors[0].id;
    let submit = |raw: &str| {
        fixture
            .service
            .submit_grade(juror, fixture.deliverable_id, raw)
    };

    assert!(matches!(
        submit("9.999").unwrap_err(),
        EngineError::InvalidGrade(GradeValueError::TooPrecise(_))
    ));
    assert!(matches!(
        submit("0.5").unwrap_err(),
        EngineError::InvalidGrade(GradeValueError::OutOfRange(_))
    ));
    assert!(matches!(
        submit("10.01").unwrap_err(),
        EngineError::InvalidGrade(GradeValueError::OutOfRange(_))
    ));
    assert!(matches!(
        submit("nine").unwrap_err(),
        EngineError::InvalidGrade(GradeValueError::Unparseable(_))
    ));

    assert_eq!(submit("9.99").unwrap().value.as_decimal(), dec("9.99"));
    assert_eq!(submit("1").unwrap().value.as_decimal(), dec("1.00"));
    assert_eq!(submit("10.00").unwrap().value.as_decimal(), dec("10.00"));
}

#[test]
fn resubmission_updates_single_row() {
    let fixture = setup();
    let juror = fixture.jurors[2].id;

    let first = fixture
        .service
        .submit_grade(juror, fixture.deliverable_id, "6")
        .unwrap();
    fixture.clock.advance_minutes(3);
    let second = fixture
        .service
        .submit_grade(juror, fixture.deliverable_id, "7.25")
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.created_at, first.created_at);
    assert!(second.updated_at > first.updated_at);

    let state = fixture.service.snapshot().unwrap();
    let rows = state.grades_for(fixture.deliverable_id).collect::<Vec<_>>();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value.as_decimal(), dec("7.25"));

    let mine = fixture
        .service
        .my_grade(juror, fixture.deliverable_id)
        .unwrap()
        .unwrap();
    assert_eq!(mine.value.as_decimal(), dec("7.25"));
}

#[test]
fn my_grade_is_restricted_to_jurors() {
    let fixture = setup();

    assert_eq!(
        fixture
            .service
            .my_grade(fixture.jurors[0].id, fixture.deliverable_id)
            .unwrap(),
        None
    );
    assert_eq!(
        fixture
            .service
            .my_grade(fixture.owner.id, fixture.deliverable_id)
            .unwrap_err()
            .code(),
        "not_juror"
    );
}

#[test]
fn rejected_submissions_do_not_write() {
    let fixture = setup();
    let juror = fixture.jurors[0].id;
    fixture
        .service
        .submit_grade(juror, fixture.deliverable_id, "5")
        .unwrap();
    let before = fixture.service.snapshot().unwrap();

    assert!(fixture
        .service
        .submit_grade(juror, fixture.deliverable_id, "11")
        .is_err());
    assert!(fixture
        .service
        .submit_grade(fixture.owner.id, fixture.deliverable_id, "5")
        .is_err());
    fixture.clock.set(WINDOW_CLOSES_AT + 1);
    assert!(fixture
        .service
        .submit_grade(juror, fixture.deliverable_id, "6")
        .is_err());

    assert_eq!(fixture.service.snapshot().unwrap(), before);
    let store = fixture.service.into_store();
    // 4 registrations + project + deliverable + top-up + one grade
    assert_eq!(store.save_count(), 8);
}

#[test]
fn unknown_deliverable_is_not_found() {
    let fixture = setup();

    let err = fixture
        .service
        .submit_grade(fixture.jurors[0].id, uuid::Uuid::new_v4(), "5")
        .unwrap_err();
    assert_eq!(err.code(), "not_found");
}
