//! Hire/fire scenarios: capacity ceilings, fired-worker task recovery, and
//! carry dispatch scoping.

use shopfloor_core::event::Event;
use shopfloor_core::id::StageId;
use shopfloor_core::task::TaskStatus;
use shopfloor_core::test_utils::*;
use shopfloor_core::validation::check_invariants;
use shopfloor_core::worker::WorkerState;

#[test]
fn hires_stop_at_the_ceiling() {
    let mut engine = two_stage_engine();
    engine.department_mut(StageId(0)).unwrap().max_workers = 3;

    for _ in 0..3 {
        engine.hire(StageId(0)).unwrap();
    }
    assert!(engine.hire(StageId(0)).is_err());
    assert_eq!(engine.department(StageId(0)).unwrap().worker_count, 3);
    assert!(check_invariants(&engine).is_empty());
}

/// Firing the only worker of a department mid-WORKING fails its task back
/// into the pool; a replacement hire finishes the job.
#[test]
fn fired_mid_work_task_is_recovered_by_a_replacement() {
    let mut engine = two_stage_engine();
    engine.hire(StageId(0)).unwrap();
    let item = spawn_unit(&mut engine);

    // Walk to the station and get partway through the work timer.
    run_for(&mut engine, 3.0);
    assert_eq!(engine.worker_snapshots()[0].state, WorkerState::Working);

    engine.fire(StageId(0)).unwrap();
    let (_, task) = engine.scheduler().tasks().next().unwrap();
    assert_eq!(task.status, TaskStatus::Queued);
    assert_eq!(task.assigned_to, None);
    assert!(check_invariants(&engine).is_empty());

    // A fresh hire picks the same task up and completes the stage.
    engine.hire(StageId(0)).unwrap();
    run_for(&mut engine, 30.0);
    assert!(engine.item(item).unwrap().processed || engine.item(item).unwrap().stage.stage_id() != Some(StageId(0)));
    assert_eq!(engine.department(StageId(0)).unwrap().items_processed, 1);
}

/// Outbound items are carried only by source-department workers. A staffed
/// destination cannot pull them over; restaffing the source can.
#[test]
fn carry_waits_for_source_department_staff() {
    let mut engine = two_stage_engine();
    engine.hire(StageId(0)).unwrap();
    engine.hire(StageId(1)).unwrap();
    let item = spawn_unit(&mut engine);

    // Let stage 0 finish processing, then remove its whole staff before the
    // carry is claimed. Deterministic because the idle poll outruns the
    // work timer only after processing completes.
    for _ in 0..3000 {
        engine.advance(fixed(0.1));
        if engine.item(item).unwrap().processed {
            break;
        }
    }
    // The carry may already be claimed; firing fails it back either way.
    engine.fire(StageId(0)).unwrap();

    run_for(&mut engine, 30.0);
    // Stage 1 has an idle worker, but the carry task belongs to stage 0.
    assert_eq!(engine.item(item).unwrap().stage.stage_id(), Some(StageId(0)));
    assert!(engine.item(item).unwrap().ready_to_carry);
    assert_eq!(engine.pending_task_count(StageId(0)), 1);

    engine.hire(StageId(0)).unwrap();
    run_for(&mut engine, 60.0);
    assert_ne!(engine.item(item).unwrap().stage.stage_id(), Some(StageId(0)));
}

/// Fired workers release their tile so later hires can spawn there.
#[test]
fn fire_releases_the_spawn_tile() {
    let mut engine = two_stage_engine();
    let worker = engine.hire(StageId(0)).unwrap();
    let tile = engine.crew().worker(worker).unwrap().tile;

    engine.fire(StageId(0)).unwrap();
    assert!(engine.grid.occupant(tile).is_none());

    let replacement = engine.hire(StageId(0)).unwrap();
    assert_eq!(engine.crew().worker(replacement).unwrap().tile, tile);
}

/// Staffing churn mid-flight never corrupts task or staffing invariants.
#[test]
fn churn_keeps_invariants_clean() {
    let mut engine = engine_with(2, 2);
    engine.hire(StageId(0)).unwrap();
    engine.hire(StageId(1)).unwrap();
    engine.accept_order(vec![shopfloor_core::order::OrderLine {
        product: widget(),
        quantity: 4,
    }]);

    for tick in 0..2400u64 {
        // Periodic churn: fire and rehire stage 0 while work is in flight.
        if tick % 400 == 150 {
            let _ = engine.fire(StageId(0));
        }
        if tick % 400 == 250 {
            let _ = engine.hire(StageId(0));
        }
        engine.advance(fixed(0.1));
        if tick % 25 == 0 {
            let violations = check_invariants(&engine);
            assert!(violations.is_empty(), "violations at tick {tick}: {violations:?}");
        }
    }

    // Churn slows the line down but never wedges it: no task is stuck
    // assigned to a missing worker.
    let events = engine.event_bus.drain();
    assert!(events.iter().any(|e| matches!(e, Event::WorkerFired { .. })));
    for (_, task) in engine.scheduler().tasks() {
        if let Some(worker) = task.assigned_to {
            assert!(engine.crew().worker(worker).is_some());
        }
    }
}
