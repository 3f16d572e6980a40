//! Full-sequence telescope tester runs against the simulator
//!
//! A well-behaved simulator must come through with no Issue or Error
//! outcomes; each deliberate misbehavior must produce the matching
//! detection. These tests are the engine's own compliance suite.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use conform_core::sim::{SimQuirks, SimTelescope};
use conform_core::{
    FaultCodes, RecordingSink, Settings, Severity, TelescopeCapabilities, TelescopeTester,
};

async fn run_tester(
    device: SimTelescope,
    settings: Settings,
    cancel: CancellationToken,
) -> Arc<RecordingSink> {
    let sink = Arc::new(RecordingSink::new());
    let mut tester = TelescopeTester::new(
        Arc::new(device),
        sink.clone(),
        settings,
        FaultCodes::default(),
        cancel,
    );
    tester.run().await.expect("run completes");
    sink
}

fn fast_settings() -> Settings {
    Settings::fast()
}

#[tokio::test]
async fn clean_simulator_produces_no_issues_or_errors() {
    let sink = run_tester(
        SimTelescope::new(),
        fast_settings(),
        CancellationToken::new(),
    )
    .await;

    let complaints: Vec<_> = sink
        .outcomes()
        .into_iter()
        .filter(|o| matches!(o.severity, Severity::Issue | Severity::Error))
        .collect();
    assert!(complaints.is_empty(), "unexpected complaints: {:#?}", complaints);
    assert!(sink.count(Severity::Ok) > 50);
}

#[tokio::test]
async fn honest_minimal_driver_passes() {
    // Every capability false, every gated member faulting not-implemented
    let device = SimTelescope::new().capabilities(TelescopeCapabilities::default());
    let sink = run_tester(device, fast_settings(), CancellationToken::new()).await;

    let complaints: Vec<_> = sink
        .outcomes()
        .into_iter()
        .filter(|o| matches!(o.severity, Severity::Issue | Severity::Error))
        .collect();
    assert!(complaints.is_empty(), "unexpected complaints: {:#?}", complaints);
}

#[tokio::test]
async fn physical_pier_side_reporting_is_flagged() {
    let device = SimTelescope::new().quirks(SimQuirks {
        physical_pier_side: true,
        ..SimQuirks::default()
    });
    let sink = run_tester(device, fast_settings(), CancellationToken::new()).await;

    let flagged = sink.for_test("SideOfPier behaviour").into_iter().any(|o| {
        o.severity == Severity::Issue && o.message.contains("physical pier side")
    });
    assert!(flagged, "outcomes: {:#?}", sink.outcomes());
}

#[tokio::test]
async fn accepting_illegal_coordinates_is_an_error() {
    let device = SimTelescope::new().quirks(SimQuirks {
        accept_illegal_coordinates: true,
        ..SimQuirks::default()
    });
    let sink = run_tester(device, fast_settings(), CancellationToken::new()).await;

    let flagged = sink.outcomes().into_iter().any(|o| {
        o.severity == Severity::Error && o.message.contains("accepted illegal coordinates")
    });
    assert!(flagged);
}

#[tokio::test]
async fn target_value_before_write_is_flagged() {
    let device = SimTelescope::new().quirks(SimQuirks {
        target_reads_before_write: true,
        ..SimQuirks::default()
    });
    let sink = run_tester(device, fast_settings(), CancellationToken::new()).await;

    let flagged = sink.for_test("TargetRightAscension").into_iter().any(|o| {
        o.severity == Severity::Issue && o.message.contains("instead of a value-not-set fault")
    });
    assert!(flagged);
}

#[tokio::test]
async fn shared_iterator_state_is_flagged() {
    let device = SimTelescope::new().quirks(SimQuirks {
        second_enumeration_empty: true,
        ..SimQuirks::default()
    });
    let sink = run_tester(device, fast_settings(), CancellationToken::new()).await;

    let flagged = sink.outcomes().into_iter().any(|o| {
        o.severity == Severity::Issue && o.message.contains("share iterator state")
    });
    assert!(flagged, "outcomes: {:#?}", sink.outcomes());
}

#[tokio::test]
async fn overlapping_axis_rates_are_flagged() {
    let device = SimTelescope::new().quirks(SimQuirks {
        overlapping_axis_rates: true,
        ..SimQuirks::default()
    });
    let sink = run_tester(device, fast_settings(), CancellationToken::new()).await;

    let flagged = sink
        .outcomes()
        .into_iter()
        .any(|o| o.severity == Severity::Issue && o.message.contains("overlap"));
    assert!(flagged);
}

#[tokio::test]
async fn capability_gate_violations_are_flagged() {
    // Flags all false but every member still works
    let device = SimTelescope::new()
        .capabilities(TelescopeCapabilities::default())
        .quirks(SimQuirks {
            ignore_capability_gates: true,
            ..SimQuirks::default()
        });
    let sink = run_tester(device, fast_settings(), CancellationToken::new()).await;

    let park_error = sink
        .for_test("Park")
        .into_iter()
        .any(|o| o.severity == Severity::Error && o.message.contains("CanPark is false"));
    assert!(park_error, "outcomes: {:#?}", sink.for_test("Park"));

    let unpark_error = sink
        .for_test("UnPark")
        .into_iter()
        .any(|o| o.severity == Severity::Error && o.message.contains("CanUnpark is false"));
    assert!(unpark_error);
}

#[tokio::test]
async fn nonzero_rate_with_unsettable_flag_is_flagged() {
    let mut caps = TelescopeCapabilities::full();
    caps.can_set_declination_rate = false;
    caps.can_set_right_ascension_rate = false;
    let device = SimTelescope::new().capabilities(caps).quirks(SimQuirks {
        nonzero_rate_when_unsettable: true,
        ..SimQuirks::default()
    });
    let sink = run_tester(device, fast_settings(), CancellationToken::new()).await;

    let flagged = sink.for_test("DeclinationRate").into_iter().any(|o| {
        o.severity == Severity::Issue && o.message.contains("must be 0")
    });
    assert!(flagged);
}

#[tokio::test]
async fn sloppy_pointing_downgrades_slew_verification_to_info() {
    let device = SimTelescope::new().quirks(SimQuirks {
        // Well outside the 10 arc-second band
        sloppy_pointing_arcsec: 120.0,
        ..SimQuirks::default()
    });
    let sink = run_tester(device, fast_settings(), CancellationToken::new()).await;

    let softened = sink.for_test("SlewToCoordinates").into_iter().any(|o| {
        o.severity == Severity::Info && o.message.contains("from the commanded position")
    });
    assert!(softened, "outcomes: {:#?}", sink.for_test("SlewToCoordinates"));

    // Pointing inaccuracy is advisory, never an Error
    let errors = sink
        .for_test("SlewToCoordinates")
        .into_iter()
        .filter(|o| o.severity == Severity::Error)
        .count();
    assert_eq!(errors, 0);
}

#[tokio::test]
async fn hung_slew_times_out_with_an_error() {
    let device = SimTelescope::new().quirks(SimQuirks {
        never_finish_slews: true,
        ..SimQuirks::default()
    });
    let mut settings = fast_settings();
    settings.slew_timeout = Duration::from_millis(150);
    settings.poll_interval = Duration::from_millis(10);
    settings.run_pier_side_tests = false;
    settings.run_performance_tests = false;

    let sink = run_tester(device, settings, CancellationToken::new()).await;

    let timed_out = sink
        .outcomes()
        .into_iter()
        .any(|o| o.severity == Severity::Error && o.message.contains("timed out"));
    assert!(timed_out);
}

#[tokio::test]
async fn pre_cancelled_run_skips_every_stage() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let sink = run_tester(SimTelescope::new(), fast_settings(), cancel).await;

    // Capability flags are still read; nothing further runs
    assert!(!sink.for_test("CanPark").is_empty());
    assert!(sink.for_test("Park").is_empty());
    assert!(sink.for_test("SlewToCoordinates").is_empty());
    assert!(sink.for_test("PostRun").is_empty());
}

#[tokio::test]
async fn cancellation_exits_polling_without_a_timeout_error() {
    let device = SimTelescope::new().quirks(SimQuirks {
        never_finish_slews: true,
        ..SimQuirks::default()
    });
    let mut settings = fast_settings();
    // Long enough that only cancellation can end the wait promptly
    settings.slew_timeout = Duration::from_secs(60);
    settings.poll_interval = Duration::from_millis(10);

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        canceller.cancel();
    });

    let start = Instant::now();
    let sink = run_tester(device, settings, cancel).await;
    assert!(
        start.elapsed() < Duration::from_secs(30),
        "run did not unwind promptly"
    );

    let timed_out = sink
        .outcomes()
        .into_iter()
        .any(|o| o.message.contains("timed out"));
    assert!(!timed_out, "cancellation must not be reported as a timeout");
}

#[tokio::test]
async fn parked_guard_violations_are_flagged() {
    let device = SimTelescope::new().quirks(SimQuirks {
        ignore_parked_guard: true,
        ..SimQuirks::default()
    });
    let sink = run_tester(device, fast_settings(), CancellationToken::new()).await;

    let flagged = sink.outcomes().into_iter().any(|o| {
        o.severity == Severity::Issue
            && (o.message.contains("succeeded while parked")
                || o.message.contains("left the parked state"))
    });
    assert!(flagged, "outcomes: {:#?}", sink.outcomes());
}
