//! Full-sequence dome tester runs against the simulator

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use conform_core::sim::{DomeQuirks, SimDome};
use conform_core::{DomeCapabilities, DomeTester, FaultCodes, RecordingSink, Settings, Severity};

async fn run_tester(
    device: SimDome,
    settings: Settings,
    cancel: CancellationToken,
) -> Arc<RecordingSink> {
    let sink = Arc::new(RecordingSink::new());
    let mut tester = DomeTester::new(
        Arc::new(device),
        sink.clone(),
        settings,
        FaultCodes::default(),
        cancel,
    );
    tester.run().await.expect("run completes");
    sink
}

#[tokio::test]
async fn clean_simulator_produces_no_issues_or_errors() {
    let sink = run_tester(SimDome::new(), Settings::fast(), CancellationToken::new()).await;

    let complaints: Vec<_> = sink
        .outcomes()
        .into_iter()
        .filter(|o| matches!(o.severity, Severity::Issue | Severity::Error))
        .collect();
    assert!(complaints.is_empty(), "unexpected complaints: {:#?}", complaints);
    assert!(sink.count(Severity::Ok) > 20);
}

#[tokio::test]
async fn honest_minimal_dome_passes() {
    let device = SimDome::new().capabilities(DomeCapabilities::default());
    let sink = run_tester(device, Settings::fast(), CancellationToken::new()).await;

    let complaints: Vec<_> = sink
        .outcomes()
        .into_iter()
        .filter(|o| matches!(o.severity, Severity::Issue | Severity::Error))
        .collect();
    assert!(complaints.is_empty(), "unexpected complaints: {:#?}", complaints);
}

#[tokio::test]
async fn stuck_shutter_times_out_with_an_error() {
    let device = SimDome::new().quirks(DomeQuirks {
        stuck_shutter: true,
        ..DomeQuirks::default()
    });
    let mut settings = Settings::fast();
    settings.shutter_timeout = Duration::from_millis(150);
    settings.poll_interval = Duration::from_millis(10);
    settings.run_performance_tests = false;

    let sink = run_tester(device, settings, CancellationToken::new()).await;

    let timed_out = sink
        .outcomes()
        .into_iter()
        .any(|o| o.severity == Severity::Error && o.message.contains("timed out"));
    assert!(timed_out, "outcomes: {:#?}", sink.outcomes());
}

#[tokio::test]
async fn ignored_sync_reads_as_did_not_move() {
    let device = SimDome::new().quirks(DomeQuirks {
        sync_ignored: true,
        ..DomeQuirks::default()
    });
    let sink = run_tester(device, Settings::fast(), CancellationToken::new()).await;

    let flagged = sink.for_test("SyncToAzimuth").into_iter().any(|o| {
        o.severity == Severity::Issue && o.message.contains("not to have moved")
    });
    assert!(flagged, "outcomes: {:#?}", sink.for_test("SyncToAzimuth"));
}

#[tokio::test]
async fn accepting_illegal_azimuth_is_flagged() {
    let device = SimDome::new().quirks(DomeQuirks {
        accept_illegal_coordinates: true,
        ..DomeQuirks::default()
    });
    let sink = run_tester(device, Settings::fast(), CancellationToken::new()).await;

    let flagged = sink.outcomes().into_iter().any(|o| {
        o.severity == Severity::Issue && o.message.contains("accepted an out-of-range value")
    });
    assert!(flagged, "outcomes: {:#?}", sink.outcomes());
}

#[tokio::test]
async fn capability_gate_violations_are_flagged() {
    let device = SimDome::new()
        .capabilities(DomeCapabilities::default())
        .quirks(DomeQuirks {
            ignore_capability_gates: true,
            ..DomeQuirks::default()
        });
    let sink = run_tester(device, Settings::fast(), CancellationToken::new()).await;

    let park_error = sink
        .for_test("Park")
        .into_iter()
        .any(|o| o.severity == Severity::Error && o.message.contains("CanPark is false"));
    assert!(park_error, "outcomes: {:#?}", sink.for_test("Park"));

    let shutter_issue = sink
        .for_test("OpenShutter")
        .into_iter()
        .any(|o| o.severity == Severity::Issue && o.message.contains("CanSetShutter is false"));
    assert!(shutter_issue);
}

#[tokio::test]
async fn pre_cancelled_run_skips_every_stage() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let sink = run_tester(SimDome::new(), Settings::fast(), cancel).await;

    assert!(!sink.for_test("CanPark").is_empty());
    assert!(sink.for_test("Park").is_empty());
    assert!(sink.for_test("OpenShutter").is_empty());
    assert!(sink.for_test("PostRun").is_empty());
}
