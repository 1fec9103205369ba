//! End-to-end tests for breakpoint registration, dispatch and the
//! isolation guard, parameterized across both interception strategies.

mod common;

use std::sync::{Arc, Mutex};

use debuglet_engine::{
    BreakpointEventKind, CodeUnit, ConditionExpr, DebugError, EvalError, Frame, InterceptMode,
    Value,
};
use test_case::test_case;

use common::{Recorder, engine, run_pass};

#[test_case(InterceptMode::CodePatching; "code_patching")]
#[test_case(InterceptMode::EmulatedTracing; "emulated_tracing")]
fn unconditional_breakpoint_hits_once_per_pass(mode: InterceptMode) {
    let engine = engine(mode);
    let unit = CodeUnit::new("app.py:main", [10, 11, 14]);
    let recorder = Recorder::new();

    let cookie = engine
        .set_breakpoint(&unit, 10, None, recorder.handler())
        .unwrap();

    let frame = Frame::new().with_local("n", Value::Int(3));
    for _ in 0..3 {
        run_pass(&engine, &unit, &frame);
    }

    let events = recorder.events();
    assert_eq!(events.len(), 3);
    for event in &events {
        assert_eq!(event.kind, BreakpointEventKind::Hit);
        assert_eq!(event.cookie, cookie);

        let snapshot = event.snapshot.as_ref().expect("hit carries a snapshot");
        assert_eq!(snapshot.unit, "app.py:main");
        assert_eq!(snapshot.line, 10);
        assert_eq!(snapshot.locals, vec![("n".to_owned(), Value::Int(3))]);
    }
}

#[test_case(InterceptMode::CodePatching; "code_patching")]
#[test_case(InterceptMode::EmulatedTracing; "emulated_tracing")]
fn cleared_breakpoint_never_fires_again(mode: InterceptMode) {
    let engine = engine(mode);
    let unit = CodeUnit::new("app.py", [10]);
    let recorder = Recorder::new();

    let cookie = engine
        .set_breakpoint(&unit, 10, None, recorder.handler())
        .unwrap();

    run_pass(&engine, &unit, &Frame::new());
    engine.clear_breakpoint(cookie).unwrap();
    run_pass(&engine, &unit, &Frame::new());

    assert_eq!(recorder.hit_count(), 1);
}

#[test_case(InterceptMode::CodePatching; "code_patching")]
#[test_case(InterceptMode::EmulatedTracing; "emulated_tracing")]
fn clear_of_unknown_cookie_is_not_found(mode: InterceptMode) {
    let engine = engine(mode);
    let unit = CodeUnit::new("app.py", [10]);
    let recorder = Recorder::new();

    let cookie = engine
        .set_breakpoint(&unit, 10, None, recorder.handler())
        .unwrap();

    engine.clear_breakpoint(cookie).unwrap();
    // A second clear of the same cookie is a contract violation, surfaced
    // as NotFound rather than treated as an idempotent no-op.
    assert!(matches!(
        engine.clear_breakpoint(cookie),
        Err(DebugError::NotFound(_))
    ));
}

#[test_case(InterceptMode::CodePatching; "code_patching")]
#[test_case(InterceptMode::EmulatedTracing; "emulated_tracing")]
fn line_without_statement_is_rejected(mode: InterceptMode) {
    let engine = engine(mode);
    let unit = CodeUnit::new("app.py", [10, 11, 14]);
    let recorder = Recorder::new();

    for line in [9, 12, 15] {
        assert!(matches!(
            engine.set_breakpoint(&unit, line, None, recorder.handler()),
            Err(DebugError::InvalidArgument(_))
        ));
        assert!(!engine.has_source_line(&unit, line));
    }
    assert!(engine.has_source_line(&unit, 10));
    assert!(engine.has_source_line(&unit, 14));
}

#[test_case(InterceptMode::CodePatching; "code_patching")]
#[test_case(InterceptMode::EmulatedTracing; "emulated_tracing")]
fn two_breakpoints_on_one_line_fire_in_registration_order(mode: InterceptMode) {
    let engine = engine(mode);
    let unit = CodeUnit::new("app.py", [10]);
    let recorder = Recorder::new();

    let first = engine
        .set_breakpoint(&unit, 10, None, recorder.handler())
        .unwrap();
    let second = engine
        .set_breakpoint(&unit, 10, None, recorder.handler())
        .unwrap();
    assert_ne!(first, second);

    run_pass(&engine, &unit, &Frame::new());

    let events = recorder.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].cookie, first);
    assert_eq!(events[1].cookie, second);

    // Clearing one must leave the other armed.
    engine.clear_breakpoint(first).unwrap();
    run_pass(&engine, &unit, &Frame::new());

    let events = recorder.events();
    assert_eq!(events.len(), 3);
    assert_eq!(events[2].cookie, second);
}

#[test_case(InterceptMode::CodePatching; "code_patching")]
#[test_case(InterceptMode::EmulatedTracing; "emulated_tracing")]
fn falsy_condition_suppresses_the_hit(mode: InterceptMode) {
    let engine = engine(mode);
    let unit = CodeUnit::new("app.py", [10]);
    let recorder = Recorder::new();

    let condition: ConditionExpr = Arc::new(|_| Ok(Value::Bool(false)));
    engine
        .set_breakpoint(&unit, 10, Some(condition), recorder.handler())
        .unwrap();

    run_pass(&engine, &unit, &Frame::new());
    assert!(recorder.events().is_empty());
}

#[test_case(InterceptMode::CodePatching; "code_patching")]
#[test_case(InterceptMode::EmulatedTracing; "emulated_tracing")]
fn truthy_condition_dispatches_with_context(mode: InterceptMode) {
    let engine = engine(mode);
    let unit = CodeUnit::new("app.py", [10]);
    let recorder = Recorder::new();

    let condition: ConditionExpr = Arc::new(|scope| {
        Ok(Value::Bool(matches!(
            scope.local("retries"),
            Some(Value::Int(n)) if n > 2
        )))
    });
    engine
        .set_breakpoint(&unit, 10, Some(condition), recorder.handler())
        .unwrap();

    run_pass(
        &engine,
        &unit,
        &Frame::new().with_local("retries", Value::Int(1)),
    );
    assert!(recorder.events().is_empty());

    run_pass(
        &engine,
        &unit,
        &Frame::new().with_local("retries", Value::Int(5)),
    );
    assert_eq!(recorder.kinds(), vec![BreakpointEventKind::Hit]);
}

#[test_case(InterceptMode::CodePatching; "code_patching")]
#[test_case(InterceptMode::EmulatedTracing; "emulated_tracing")]
fn mutating_condition_reports_and_stays_armed(mode: InterceptMode) {
    let engine = engine(mode);
    let unit = CodeUnit::new("app.py", [10]);
    let recorder = Recorder::new();

    let condition: ConditionExpr = Arc::new(|scope| {
        scope.set_global("hits", Value::Int(1))?;
        Ok(Value::Bool(true))
    });
    engine
        .set_breakpoint(&unit, 10, Some(condition), recorder.handler())
        .unwrap();

    run_pass(&engine, &unit, &Frame::new());
    assert_eq!(
        recorder.kinds(),
        vec![BreakpointEventKind::ConditionExpressionMutable]
    );

    // The occurrence suppressed the hit but did not disable anything.
    run_pass(&engine, &unit, &Frame::new());
    assert_eq!(
        recorder.kinds(),
        vec![
            BreakpointEventKind::ConditionExpressionMutable,
            BreakpointEventKind::ConditionExpressionMutable
        ]
    );
}

#[test_case(InterceptMode::CodePatching; "code_patching")]
#[test_case(InterceptMode::EmulatedTracing; "emulated_tracing")]
fn faulting_condition_reports_error_and_stays_armed(mode: InterceptMode) {
    let engine = engine(mode);
    let unit = CodeUnit::new("app.py", [10]);
    let recorder = Recorder::new();

    let condition: ConditionExpr = Arc::new(|_| Err(EvalError::Fault("type error".into())));
    engine
        .set_breakpoint(&unit, 10, Some(condition), recorder.handler())
        .unwrap();

    run_pass(&engine, &unit, &Frame::new());
    run_pass(&engine, &unit, &Frame::new());
    assert_eq!(
        recorder.kinds(),
        vec![BreakpointEventKind::Error, BreakpointEventKind::Error]
    );
}

#[test_case(InterceptMode::CodePatching; "code_patching")]
#[test_case(InterceptMode::EmulatedTracing; "emulated_tracing")]
fn nested_hit_during_evaluation_is_suppressed(mode: InterceptMode) {
    let engine = engine(mode);
    let outer = CodeUnit::new("outer.py", [10]);
    let inner = CodeUnit::new("inner.py", [5]);
    let outer_recorder = Recorder::new();
    let inner_recorder = Recorder::new();

    engine
        .set_breakpoint(&inner, 5, None, inner_recorder.handler())
        .unwrap();

    // The condition runs interpreted code that reaches the inner
    // breakpoint's line; that nested hit must not be dispatched.
    let nested_engine = Arc::clone(&engine);
    let nested_unit = Arc::clone(&inner);
    let condition: ConditionExpr = Arc::new(move |_| {
        nested_engine.on_line(&nested_unit, 5, &Frame::new());
        Ok(Value::Bool(true))
    });
    engine
        .set_breakpoint(&outer, 10, Some(condition), outer_recorder.handler())
        .unwrap();

    run_pass(&engine, &outer, &Frame::new());

    assert_eq!(outer_recorder.kinds(), vec![BreakpointEventKind::Hit]);
    assert!(inner_recorder.events().is_empty());

    // Outside of an evaluation the inner breakpoint fires normally.
    run_pass(&engine, &inner, &Frame::new());
    assert_eq!(inner_recorder.kinds(), vec![BreakpointEventKind::Hit]);
}

#[test_case(InterceptMode::CodePatching; "code_patching")]
#[test_case(InterceptMode::EmulatedTracing; "emulated_tracing")]
fn clear_between_detection_and_dispatch_is_a_lookup_miss(mode: InterceptMode) {
    let engine = engine(mode);
    let unit = CodeUnit::new("app.py", [10]);
    let victim_recorder = Recorder::new();

    // The first handler clears the victim while the victim's dispatch is
    // already pending for the same line hit; the pending dispatch must
    // degrade to a lookup miss, not a fault.
    let victim_slot: Arc<Mutex<Option<debuglet_engine::Cookie>>> = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&victim_slot);
    let clearing_engine = Arc::clone(&engine);
    engine
        .set_breakpoint(
            &unit,
            10,
            None,
            Arc::new(move |_| {
                if let Some(cookie) = slot.lock().unwrap().take() {
                    clearing_engine.clear_breakpoint(cookie).unwrap();
                }
            }),
        )
        .unwrap();

    let victim = engine
        .set_breakpoint(&unit, 10, None, victim_recorder.handler())
        .unwrap();
    *victim_slot.lock().unwrap() = Some(victim);

    run_pass(&engine, &unit, &Frame::new());
    assert!(victim_recorder.events().is_empty());
}

#[test]
fn unattached_native_thread_is_invisible_to_tracing() {
    let engine = common::detached_engine(InterceptMode::EmulatedTracing);
    let unit = CodeUnit::new("app.py", [10]);
    let recorder = Recorder::new();
    engine
        .set_breakpoint(&unit, 10, None, recorder.handler())
        .unwrap();

    let worker_engine = Arc::clone(&engine);
    let worker_unit = Arc::clone(&unit);
    std::thread::spawn(move || {
        // Not attached yet: the runtime does not know this thread exists.
        run_pass(&worker_engine, &worker_unit, &Frame::new());

        worker_engine.attach_native_thread();
        worker_engine.attach_native_thread(); // idempotent
        run_pass(&worker_engine, &worker_unit, &Frame::new());
    })
    .join()
    .unwrap();

    assert_eq!(recorder.hit_count(), 1);
}

#[test]
fn patched_locations_trigger_regardless_of_thread_origin() {
    let engine = common::detached_engine(InterceptMode::CodePatching);
    let unit = CodeUnit::new("app.py", [10]);
    let recorder = Recorder::new();
    engine
        .set_breakpoint(&unit, 10, None, recorder.handler())
        .unwrap();

    let worker_engine = Arc::clone(&engine);
    let worker_unit = Arc::clone(&unit);
    std::thread::spawn(move || {
        run_pass(&worker_engine, &worker_unit, &Frame::new());
    })
    .join()
    .unwrap();

    assert_eq!(recorder.hit_count(), 1);
}

#[test]
fn disabled_thread_is_skipped_by_tracing() {
    let engine = engine(InterceptMode::EmulatedTracing);
    let unit = CodeUnit::new("app.py", [10]);
    let recorder = Recorder::new();
    engine
        .set_breakpoint(&unit, 10, None, recorder.handler())
        .unwrap();

    engine.disable_debugger_on_current_thread();
    run_pass(&engine, &unit, &Frame::new());
    assert!(recorder.events().is_empty());
}

#[test]
fn disable_is_a_noop_under_code_patching() {
    let engine = engine(InterceptMode::CodePatching);
    let unit = CodeUnit::new("app.py", [10]);
    let recorder = Recorder::new();
    engine
        .set_breakpoint(&unit, 10, None, recorder.handler())
        .unwrap();

    engine.disable_debugger_on_current_thread();
    run_pass(&engine, &unit, &Frame::new());
    assert_eq!(recorder.hit_count(), 1);
}
