#[macro_use]
mod common;

use common::{draft, owner, stranger, COOLDOWN};
use explog_core::{
    ErrorKind, LedgerError, LedgerRepository, LedgerService, ManualClock, StepDraft,
    ValidationError,
};

type Ledger<R> = LedgerService<R, ManualClock>;

on_both_backends!(
    experiment_ids_are_sequential_and_count_tracks_creates,
    empty_and_short_names_are_invalid_input,
    experiment_records_caller_and_clock,
    first_step_is_exempt_then_cooldown_applies,
    rate_limit_is_per_experiment,
    add_step_rejects_stranger_and_unknown_experiment,
    add_step_validates_title_then_content,
    whitespace_padding_cannot_exceed_upper_bounds,
    update_changes_payload_but_not_identity,
    update_is_not_rate_limited,
    update_rejects_missing_deleted_and_stranger,
    toggle_flips_encryption_flag,
    delete_is_terminal_and_preserves_order,
    delete_rejects_stranger_and_keeps_step,
    deleting_every_step_keeps_cooldown_armed,
    batch_read_is_all_or_nothing,
    experiment_steps_follow_index_order,
    step_reads_on_unknown_experiment_fail,
    repeated_reads_are_identical,
    owned_experiments_are_filtered_by_owner,
    trial_a_scenario,
);

fn experiment_ids_are_sequential_and_count_tracks_creates<R: LedgerRepository>(
    mut ledger: Ledger<R>,
    _clock: ManualClock,
) {
    for expected in 0..5u64 {
        let before = ledger.experiment_count().unwrap();
        let id = ledger
            .create_experiment(&owner(), &format!("Experiment {expected}"))
            .unwrap();
        assert_eq!(id, expected);
        assert_eq!(ledger.experiment_count().unwrap(), before + 1);
    }
}

fn empty_and_short_names_are_invalid_input<R: LedgerRepository>(
    mut ledger: Ledger<R>,
    _clock: ManualClock,
) {
    let too_long = "x".repeat(101);
    for name in ["", "ab", "   ab   ", too_long.as_str()] {
        let err = ledger.create_experiment(&owner(), name).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput, "name `{name}`");
        assert!(matches!(
            err,
            LedgerError::InvalidInput(ValidationError::NameLength { .. })
        ));
    }
    assert_eq!(ledger.experiment_count().unwrap(), 0);
}

fn experiment_records_caller_and_clock<R: LedgerRepository>(
    mut ledger: Ledger<R>,
    clock: ManualClock,
) {
    clock.advance(42);
    let first = ledger.create_experiment(&owner(), "Owner Experiment").unwrap();
    let second = ledger
        .create_experiment(&stranger(), "Addr1 Experiment")
        .unwrap();

    let first = ledger.get_experiment(first).unwrap();
    let second = ledger.get_experiment(second).unwrap();
    assert_eq!(first.owner, owner());
    assert_eq!(second.owner, stranger());
    assert_eq!(first.created_at, common::START + 42);
    assert_eq!(first.name, "Owner Experiment");
    assert!(first.exists);
}

fn first_step_is_exempt_then_cooldown_applies<R: LedgerRepository>(
    mut ledger: Ledger<R>,
    clock: ManualClock,
) {
    let experiment_id = ledger.create_experiment(&owner(), "Test Experiment").unwrap();
    ledger
        .add_step(&owner(), experiment_id, &draft("Step 1", "Content 1"))
        .unwrap();

    let err = ledger
        .add_step(&owner(), experiment_id, &draft("Step 2", "Content 2"))
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::RateLimited {
            retry_after_secs: COOLDOWN,
            ..
        }
    ));

    clock.advance(COOLDOWN - 1);
    let err = ledger
        .add_step(&owner(), experiment_id, &draft("Step 2", "Content 2"))
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::RateLimited {
            retry_after_secs: 1,
            ..
        }
    ));

    clock.advance(1);
    let step_id = ledger
        .add_step(&owner(), experiment_id, &draft("Step 2", "Content 2"))
        .unwrap();
    assert_eq!(step_id, 1);
    assert_eq!(ledger.step_count().unwrap(), 2);
}

fn rate_limit_is_per_experiment<R: LedgerRepository>(mut ledger: Ledger<R>, _clock: ManualClock) {
    let a = ledger.create_experiment(&owner(), "Alpha").unwrap();
    let b = ledger.create_experiment(&owner(), "Beta").unwrap();
    ledger.add_step(&owner(), a, &draft("Step", "Content")).unwrap();
    ledger.add_step(&owner(), b, &draft("Step", "Content")).unwrap();
    assert_eq!(
        ledger
            .add_step(&owner(), a, &draft("Step", "Content"))
            .unwrap_err()
            .kind(),
        ErrorKind::RateLimited
    );
}

fn add_step_rejects_stranger_and_unknown_experiment<R: LedgerRepository>(
    mut ledger: Ledger<R>,
    _clock: ManualClock,
) {
    let experiment_id = ledger.create_experiment(&owner(), "Test Experiment").unwrap();

    let err = ledger
        .add_step(&stranger(), experiment_id, &draft("Step 1", "Content 1"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let err = ledger
        .add_step(&owner(), 999, &draft("Step 1", "Content 1"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::ExperimentNotFound(999)));

    assert_eq!(ledger.step_count().unwrap(), 0);
    assert!(ledger.get_experiment_step_ids(experiment_id).unwrap().is_empty());
}

fn add_step_validates_title_then_content<R: LedgerRepository>(
    mut ledger: Ledger<R>,
    _clock: ManualClock,
) {
    let experiment_id = ledger.create_experiment(&owner(), "Test Experiment").unwrap();

    let err = ledger
        .add_step(&owner(), experiment_id, &draft("", ""))
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InvalidInput(ValidationError::TitleLength { len: 0 })
    ));

    let err = ledger
        .add_step(&owner(), experiment_id, &draft("Step 1", "ab"))
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InvalidInput(ValidationError::ContentLength { len: 2 })
    ));

    // Rejected inserts must not arm the cooldown.
    ledger
        .add_step(&owner(), experiment_id, &draft("Step 1", "Content 1"))
        .unwrap();
}

fn whitespace_padding_cannot_exceed_upper_bounds<R: LedgerRepository>(
    mut ledger: Ledger<R>,
    _clock: ManualClock,
) {
    let padded_name = format!("{}abc", " ".repeat(10_000));
    let err = ledger.create_experiment(&owner(), &padded_name).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InvalidInput(ValidationError::NameLength { len: 10_003 })
    ));
    assert_eq!(ledger.experiment_count().unwrap(), 0);

    let experiment_id = ledger.create_experiment(&owner(), "Test Experiment").unwrap();
    let padded_title = format!("{}Hyp", "\n".repeat(1000));
    let err = ledger
        .add_step(&owner(), experiment_id, &draft(&padded_title, "Content 1"))
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InvalidInput(ValidationError::TitleLength { len: 1003 })
    ));

    let padded_content = format!("{}{}", "c".repeat(5000), " ".repeat(1000));
    let err = ledger
        .add_step(&owner(), experiment_id, &draft("Step 1", &padded_content))
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InvalidInput(ValidationError::ContentLength { len: 6000 })
    ));
    assert_eq!(ledger.step_count().unwrap(), 0);

    let step_id = ledger
        .add_step(&owner(), experiment_id, &draft("Step 1", "Content 1"))
        .unwrap();
    let err = ledger
        .update_step(&owner(), step_id, &draft("Step 1", &padded_content))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let step = ledger.get_step(step_id).unwrap();
    assert_eq!(step.content, "Content 1");
    assert!(step.title.chars().count() <= 200);
}

fn update_changes_payload_but_not_identity<R: LedgerRepository>(
    mut ledger: Ledger<R>,
    _clock: ManualClock,
) {
    let experiment_id = ledger.create_experiment(&owner(), "Test Experiment").unwrap();
    let step_id = ledger
        .add_step(
            &owner(),
            experiment_id,
            &draft("Original Title", "Original Content"),
        )
        .unwrap();

    ledger
        .update_step(
            &owner(),
            step_id,
            &StepDraft::new("Updated Title", "Updated Content", true),
        )
        .unwrap();

    let step = ledger.get_step(step_id).unwrap();
    assert_eq!(step.id, step_id);
    assert_eq!(step.experiment_id, experiment_id);
    assert_eq!(step.title, "Updated Title");
    assert_eq!(step.content, "Updated Content");
    assert!(step.is_encrypted);
    assert!(step.exists);
    assert_eq!(ledger.step_count().unwrap(), 1);
}

fn update_is_not_rate_limited<R: LedgerRepository>(mut ledger: Ledger<R>, _clock: ManualClock) {
    let experiment_id = ledger.create_experiment(&owner(), "Test Experiment").unwrap();
    let step_id = ledger
        .add_step(&owner(), experiment_id, &draft("Step 1", "Content 1"))
        .unwrap();
    for round in 0..3 {
        ledger
            .update_step(
                &owner(),
                step_id,
                &draft(&format!("Title {round}"), "Content 1"),
            )
            .unwrap();
    }
}

fn update_rejects_missing_deleted_and_stranger<R: LedgerRepository>(
    mut ledger: Ledger<R>,
    clock: ManualClock,
) {
    let experiment_id = ledger.create_experiment(&owner(), "Test Experiment").unwrap();
    let kept = ledger
        .add_step(&owner(), experiment_id, &draft("Step 1", "Content 1"))
        .unwrap();
    clock.advance(COOLDOWN);
    let deleted = ledger
        .add_step(&owner(), experiment_id, &draft("Step 2", "Content 2"))
        .unwrap();
    ledger.delete_step(&owner(), deleted).unwrap();

    let err = ledger
        .update_step(&owner(), 999, &draft("Title", "Content"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::StepNotFound(999)));

    let err = ledger
        .update_step(&owner(), deleted, &draft("Title", "Content"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::StepNotFound(id) if id == deleted));

    let err = ledger
        .update_step(&stranger(), kept, &draft("Title", "Content"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let err = ledger
        .update_step(&owner(), kept, &draft("", "Content"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    assert_eq!(ledger.get_step(kept).unwrap().title, "Step 1");
}

fn toggle_flips_encryption_flag<R: LedgerRepository>(mut ledger: Ledger<R>, _clock: ManualClock) {
    let experiment_id = ledger.create_experiment(&owner(), "Test Experiment").unwrap();
    let step_id = ledger
        .add_step(&owner(), experiment_id, &draft("Step 1", "Content 1"))
        .unwrap();

    assert!(ledger.toggle_step_encryption(&owner(), step_id).unwrap());
    assert!(ledger.get_step(step_id).unwrap().is_encrypted);
    assert!(!ledger.toggle_step_encryption(&owner(), step_id).unwrap());

    let step = ledger.get_step(step_id).unwrap();
    assert!(!step.is_encrypted);
    assert_eq!(step.title, "Step 1");
    assert_eq!(step.content, "Content 1");

    assert_eq!(
        ledger
            .toggle_step_encryption(&stranger(), step_id)
            .unwrap_err()
            .kind(),
        ErrorKind::Unauthorized
    );
}

fn delete_is_terminal_and_preserves_order<R: LedgerRepository>(
    mut ledger: Ledger<R>,
    clock: ManualClock,
) {
    let experiment_id = ledger.create_experiment(&owner(), "Test Experiment").unwrap();
    for index in 0..4 {
        ledger
            .add_step(
                &owner(),
                experiment_id,
                &draft(&format!("Step {index}"), "Content"),
            )
            .unwrap();
        clock.advance(COOLDOWN);
    }

    ledger.delete_step(&owner(), 1).unwrap();
    assert_eq!(
        ledger.get_experiment_step_ids(experiment_id).unwrap(),
        vec![0, 2, 3]
    );
    ledger.delete_step(&owner(), 0).unwrap();
    assert_eq!(
        ledger.get_experiment_step_ids(experiment_id).unwrap(),
        vec![2, 3]
    );

    assert!(matches!(
        ledger.get_step(0).unwrap_err(),
        LedgerError::StepNotFound(0)
    ));
    assert!(matches!(
        ledger.delete_step(&owner(), 0).unwrap_err(),
        LedgerError::StepNotFound(0)
    ));
    assert_eq!(ledger.step_count().unwrap(), 4);

    let next = ledger
        .add_step(&owner(), experiment_id, &draft("Step 4", "Content"))
        .unwrap();
    assert_eq!(next, 4);
    assert_eq!(
        ledger.get_experiment_step_ids(experiment_id).unwrap(),
        vec![2, 3, 4]
    );
}

fn delete_rejects_stranger_and_keeps_step<R: LedgerRepository>(
    mut ledger: Ledger<R>,
    _clock: ManualClock,
) {
    let experiment_id = ledger.create_experiment(&owner(), "Test Experiment").unwrap();
    let step_id = ledger
        .add_step(&owner(), experiment_id, &draft("Step 1", "Content 1"))
        .unwrap();

    let err = ledger.delete_step(&stranger(), step_id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert!(ledger.get_step(step_id).unwrap().exists);
    assert_eq!(
        ledger.get_experiment_step_ids(experiment_id).unwrap(),
        vec![step_id]
    );
}

fn deleting_every_step_keeps_cooldown_armed<R: LedgerRepository>(
    mut ledger: Ledger<R>,
    clock: ManualClock,
) {
    let experiment_id = ledger.create_experiment(&owner(), "Test Experiment").unwrap();
    let step_id = ledger
        .add_step(&owner(), experiment_id, &draft("Step 1", "Content 1"))
        .unwrap();
    ledger.delete_step(&owner(), step_id).unwrap();
    assert!(ledger.get_experiment_step_ids(experiment_id).unwrap().is_empty());

    clock.advance(COOLDOWN - 1);
    let err = ledger
        .add_step(&owner(), experiment_id, &draft("Step 2", "Content 2"))
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::RateLimited {
            retry_after_secs: 1,
            ..
        }
    ));

    clock.advance(1);
    assert_eq!(
        ledger
            .add_step(&owner(), experiment_id, &draft("Step 2", "Content 2"))
            .unwrap(),
        1
    );
}

fn batch_read_is_all_or_nothing<R: LedgerRepository>(mut ledger: Ledger<R>, clock: ManualClock) {
    let experiment_id = ledger.create_experiment(&owner(), "Test Experiment").unwrap();
    ledger
        .add_step(&owner(), experiment_id, &draft("Step 1", "Content 1"))
        .unwrap();
    clock.advance(COOLDOWN);
    ledger
        .add_step(&owner(), experiment_id, &draft("Step 2", "Content 2"))
        .unwrap();

    let steps = ledger.get_steps_batch(&[1, 0]).unwrap();
    assert_eq!(
        steps.iter().map(|step| step.id).collect::<Vec<_>>(),
        vec![1, 0]
    );
    assert!(ledger.get_steps_batch(&[]).unwrap().is_empty());

    assert!(matches!(
        ledger.get_steps_batch(&[0, 7]).unwrap_err(),
        LedgerError::StepNotFound(7)
    ));

    ledger.delete_step(&owner(), 1).unwrap();
    assert!(matches!(
        ledger.get_steps_batch(&[0, 1]).unwrap_err(),
        LedgerError::StepNotFound(1)
    ));
}

fn experiment_steps_follow_index_order<R: LedgerRepository>(
    mut ledger: Ledger<R>,
    clock: ManualClock,
) {
    let experiment_id = ledger.create_experiment(&owner(), "Test Experiment").unwrap();
    ledger
        .add_step(&owner(), experiment_id, &draft("Step 1", "Content 1"))
        .unwrap();
    clock.advance(COOLDOWN);
    ledger
        .add_step(
            &owner(),
            experiment_id,
            &StepDraft::new("Step 2", "Content 2", true),
        )
        .unwrap();

    let steps = ledger.get_experiment_steps(experiment_id).unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].title, "Step 1");
    assert_eq!(steps[1].title, "Step 2");
    assert!(steps[1].is_encrypted);
}

fn step_reads_on_unknown_experiment_fail<R: LedgerRepository>(
    ledger: Ledger<R>,
    _clock: ManualClock,
) {
    assert!(matches!(
        ledger.get_experiment_steps(999).unwrap_err(),
        LedgerError::ExperimentNotFound(999)
    ));
    assert!(matches!(
        ledger.get_experiment_step_ids(999).unwrap_err(),
        LedgerError::ExperimentNotFound(999)
    ));
    assert!(matches!(
        ledger.get_experiment(0).unwrap_err(),
        LedgerError::ExperimentNotFound(0)
    ));
}

fn repeated_reads_are_identical<R: LedgerRepository>(mut ledger: Ledger<R>, _clock: ManualClock) {
    let experiment_id = ledger.create_experiment(&owner(), "Test Experiment").unwrap();
    let step_id = ledger
        .add_step(&owner(), experiment_id, &draft("Step 1", "Content 1"))
        .unwrap();

    assert_eq!(
        ledger.get_experiment(experiment_id).unwrap(),
        ledger.get_experiment(experiment_id).unwrap()
    );
    assert_eq!(
        ledger.get_step(step_id).unwrap(),
        ledger.get_step(step_id).unwrap()
    );
}

fn owned_experiments_are_filtered_by_owner<R: LedgerRepository>(
    mut ledger: Ledger<R>,
    _clock: ManualClock,
) {
    ledger.create_experiment(&owner(), "Mine one").unwrap();
    ledger.create_experiment(&stranger(), "Theirs").unwrap();
    ledger.create_experiment(&owner(), "Mine two").unwrap();

    let mine = ledger.list_experiments_by_owner(&owner()).unwrap();
    assert_eq!(
        mine.iter().map(|experiment| experiment.id).collect::<Vec<_>>(),
        vec![0, 2]
    );
    let nobody = explog_core::Principal::new("0xnobody").unwrap();
    assert!(ledger.list_experiments_by_owner(&nobody).unwrap().is_empty());
}

fn trial_a_scenario<R: LedgerRepository>(mut ledger: Ledger<R>, clock: ManualClock) {
    let experiment_id = ledger.create_experiment(&owner(), "Trial A").unwrap();

    let first = ledger
        .add_step(&owner(), experiment_id, &draft("Hyp", "water boils at 100C"))
        .unwrap();
    assert_eq!(first, 0);

    let err = ledger
        .add_step(&owner(), experiment_id, &draft("Obs2", "..."))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RateLimited);

    clock.advance(COOLDOWN);
    let second = ledger
        .add_step(&owner(), experiment_id, &draft("Obs2", "..."))
        .unwrap();
    assert_eq!(second, 1);

    ledger.delete_step(&owner(), 0).unwrap();
    assert_eq!(
        ledger.get_experiment_step_ids(experiment_id).unwrap(),
        vec![1]
    );
}
