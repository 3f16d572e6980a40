//! Dome conformance tester
//!
//! Structurally parallel to the telescope tester: capability flags are
//! read once, properties are checked against their domains, then the
//! shutter, azimuth/altitude slews, sync, park and home workflows are
//! exercised with bounded polling. Synchronous versus asynchronous slew
//! behaviour is inferred from whether `Slewing` reads true immediately
//! after a command returns.

mod shutter;

pub(crate) use shutter::azimuth_verdict;

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::capability::DomeCapabilities;
use crate::config::Settings;
use crate::device::{Device, DomeDevice, ShutterState};
use crate::error::{ConformError, Result};
use crate::fault::{
    invalid_value_probe_verdict, member_fault_verdict, DeviceFault, FaultCodes, Required,
};
use crate::outcome::{OutcomeSink, Severity};
use crate::telescope::WaitOutcome;

/// Condition a dome polling wait resolves on
#[derive(Debug, Clone, Copy)]
enum DomeWait {
    WhileSlewing,
    UntilAtPark,
    UntilAtHome,
    ShutterSettled,
}

/// Per-run context for the dome test sequence
pub struct DomeTester {
    device: Arc<dyn DomeDevice>,
    sink: Arc<dyn OutcomeSink>,
    settings: Settings,
    codes: FaultCodes,
    cancel: CancellationToken,
    caps: DomeCapabilities,
    opened_shutter: bool,
}

impl DomeTester {
    pub fn new(
        device: Arc<dyn DomeDevice>,
        sink: Arc<dyn OutcomeSink>,
        settings: Settings,
        codes: FaultCodes,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            device,
            sink,
            settings,
            codes,
            cancel,
            caps: DomeCapabilities::default(),
            opened_shutter: false,
        }
    }

    /// Cached capability flags, populated by the first run stage
    pub fn capabilities(&self) -> &DomeCapabilities {
        &self.caps
    }

    /// Run the complete dome test sequence
    pub async fn run(&mut self) -> Result<()> {
        self.connect().await?;

        self.comment("Capabilities", "reading capability flags");
        self.caps =
            DomeCapabilities::read(self.device.as_ref(), self.sink.as_ref(), &self.codes).await;

        if !self.cancelled() {
            self.comment("Properties", "checking properties");
            self.check_properties().await;
        }
        if !self.cancelled() {
            self.comment("Methods", "checking methods");
            self.check_methods().await;
        }
        if self.settings.run_performance_tests && !self.cancelled() {
            self.comment("Performance", "measuring call rates");
            self.check_performance().await;
        }
        if !self.cancelled() {
            self.comment("PostRun", "returning dome to a safe state");
            self.post_run_check().await;
        }

        if let Err(fault) = self.device.set_connected(false).await {
            self.info("Connected", &format!("disconnect failed: {}", fault));
        }
        Ok(())
    }

    async fn connect(&self) -> Result<()> {
        match self.device.connected().await {
            Ok(true) => return Ok(()),
            Ok(false) | Err(_) => {}
        }
        self.device.set_connected(true).await.map_err(|fault| {
            ConformError::Device(format!(
                "cannot connect to {}: {}",
                self.device.name(),
                fault
            ))
        })?;
        self.log("Connected", Severity::Ok, "connected to device");
        Ok(())
    }

    // Outcome helpers

    fn log(&self, test: &str, severity: Severity, message: &str) {
        self.sink.log(test, severity, message);
    }

    fn ok(&self, test: &str, message: &str) {
        self.log(test, Severity::Ok, message);
    }

    fn info(&self, test: &str, message: &str) {
        self.log(test, Severity::Info, message);
    }

    fn issue(&self, test: &str, message: &str) {
        self.log(test, Severity::Issue, message);
    }

    fn error(&self, test: &str, message: &str) {
        self.log(test, Severity::Error, message);
    }

    fn comment(&self, test: &str, message: &str) {
        self.log(test, Severity::Comment, message);
    }

    fn handle_fault(&self, test: &str, required: Required, fault: &DeviceFault) {
        let (severity, message) = member_fault_verdict(test, required, fault, &self.codes);
        self.log(test, severity, &message);
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Poll a dome flag until the wait condition resolves, bounded by a
    /// wall-clock timeout independent of cancellation
    async fn wait_for(
        &self,
        test: &str,
        action: &str,
        wait: DomeWait,
        timeout: std::time::Duration,
    ) -> WaitOutcome {
        let start = Instant::now();
        loop {
            if self.cancelled() {
                return WaitOutcome::Cancelled;
            }

            let probe = match wait {
                DomeWait::WhileSlewing => self.device.slewing().await.map(|moving| !moving),
                DomeWait::UntilAtPark => self.device.at_park().await,
                DomeWait::UntilAtHome => self.device.at_home().await,
                DomeWait::ShutterSettled => self
                    .device
                    .shutter_status()
                    .await
                    .map(|state| !state.is_transitional()),
            };
            match probe {
                Ok(true) => return WaitOutcome::Completed,
                Ok(false) => {}
                Err(fault) => {
                    self.error(
                        test,
                        &format!("fault while waiting ({}): {}", action, fault),
                    );
                    return WaitOutcome::Faulted;
                }
            }

            if start.elapsed() > timeout {
                self.error(
                    test,
                    &format!("timed out after {:?} waiting for {}", timeout, action),
                );
                return WaitOutcome::TimedOut;
            }

            self.sink.set_status(test, action, "waiting");
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    async fn stabilise(&self) {
        tokio::time::sleep(self.settings.stabilisation_wait).await;
    }

    async fn check_properties(&self) {
        match self.device.altitude().await {
            Ok(value) if (0.0..=90.0).contains(&value) => {
                self.ok("Altitude", &format!("{}", value))
            }
            Ok(value) => self.issue("Altitude", &format!("{} is outside [0, 90]", value)),
            Err(fault) => self.handle_fault("Altitude", Required::Optional, &fault),
        }

        match self.device.azimuth().await {
            Ok(value) if (0.0..360.0).contains(&value) => {
                self.ok("Azimuth", &format!("{}", value))
            }
            Ok(value) => self.issue("Azimuth", &format!("{} is outside [0, 360)", value)),
            Err(fault) => self.handle_fault("Azimuth", Required::Optional, &fault),
        }

        match self.device.at_home().await {
            Ok(value) => self.ok("AtHome", &value.to_string()),
            Err(fault) => self.handle_fault("AtHome", Required::Optional, &fault),
        }
        match self.device.at_park().await {
            Ok(value) => self.ok("AtPark", &value.to_string()),
            Err(fault) => self.handle_fault("AtPark", Required::Optional, &fault),
        }

        match self.device.shutter_status().await {
            Ok(state) => {
                if state == ShutterState::Error {
                    self.issue("ShutterStatus", "shutter reports the error state");
                } else {
                    self.ok("ShutterStatus", &state.to_string());
                }
            }
            Err(fault) => {
                let policy = if self.caps.can_set_shutter {
                    Required::MustBeImplemented
                } else {
                    Required::Optional
                };
                self.handle_fault("ShutterStatus", policy, &fault);
            }
        }

        match self.device.slewing().await {
            Ok(true) => self.issue("Slewing", "dome reports slewing while idle"),
            Ok(false) => self.ok("Slewing", "false"),
            Err(fault) => self.handle_fault("Slewing", Required::Mandatory, &fault),
        }

        self.check_slaved().await;
    }

    async fn check_slaved(&self) {
        let original = match self.device.slaved().await {
            Ok(value) => {
                self.ok("Slaved", &value.to_string());
                Some(value)
            }
            Err(fault) => {
                self.handle_fault("Slaved", Required::Optional, &fault);
                None
            }
        };

        if self.caps.can_slave {
            let Some(original) = original else { return };
            match self.device.set_slaved(!original).await {
                Ok(()) => match self.device.slaved().await {
                    Ok(value) if value == !original => {
                        self.ok("Slaved write", &format!("toggled to {}", value))
                    }
                    Ok(value) => self.issue(
                        "Slaved write",
                        &format!("wrote {} but read back {}", !original, value),
                    ),
                    Err(fault) => self.handle_fault("Slaved", Required::Mandatory, &fault),
                },
                Err(fault) => {
                    self.handle_fault("Slaved write", Required::MustBeImplemented, &fault)
                }
            }
            if let Err(fault) = self.device.set_slaved(original).await {
                self.error("Slaved write", &format!("failed to restore: {}", fault));
            }
        } else {
            match self.device.set_slaved(true).await {
                Ok(()) => {
                    self.issue(
                        "Slaved write",
                        "write succeeded although CanSlave is false",
                    );
                    let _ = self.device.set_slaved(false).await;
                }
                Err(fault) => {
                    self.handle_fault("Slaved write", Required::MustNotBeImplemented, &fault)
                }
            }
        }
    }

    async fn check_methods(&mut self) {
        match self.device.abort_slew().await {
            Ok(()) => self.ok("AbortSlew", "accepted while idle"),
            Err(fault) => self.handle_fault("AbortSlew", Required::Mandatory, &fault),
        }
        if self.cancelled() {
            return;
        }

        self.check_shutter().await;
        if self.cancelled() {
            return;
        }
        self.check_illegal_inputs().await;
        if self.cancelled() {
            return;
        }

        if !self.settings.destructive_tests {
            self.comment("Methods", "destructive tests disabled, skipping motion");
            return;
        }

        self.check_azimuth_slews().await;
        if self.cancelled() {
            return;
        }
        self.check_altitude_slew().await;
        if self.cancelled() {
            return;
        }
        self.check_sync_to_azimuth().await;
        if self.cancelled() {
            return;
        }
        self.check_set_park().await;
        if self.cancelled() {
            return;
        }
        self.check_park().await;
        if self.cancelled() {
            return;
        }
        self.check_find_home().await;
    }

    /// Out-of-domain arguments must be rejected before any motion starts
    async fn check_illegal_inputs(&self) {
        if self.caps.can_set_azimuth {
            for &bad in &[-10.0, 370.0] {
                let result = self.device.slew_to_azimuth(bad).await;
                if result.is_ok() {
                    let _ = self.device.abort_slew().await;
                }
                let (severity, message) = invalid_value_probe_verdict(
                    "SlewToAzimuth rejection",
                    &format!("azimuth {}", bad),
                    result.as_ref().map(|_| ()),
                    &self.codes,
                );
                self.log("SlewToAzimuth rejection", severity, &message);
            }
        }
        if self.caps.can_set_altitude {
            for &bad in &[-1.0, 91.0] {
                let result = self.device.slew_to_altitude(bad).await;
                if result.is_ok() {
                    let _ = self.device.abort_slew().await;
                }
                let (severity, message) = invalid_value_probe_verdict(
                    "SlewToAltitude rejection",
                    &format!("altitude {}", bad),
                    result.as_ref().map(|_| ()),
                    &self.codes,
                );
                self.log("SlewToAltitude rejection", severity, &message);
            }
        }
        if self.caps.can_sync_azimuth {
            for &bad in &[-10.0, 370.0] {
                let result = self.device.sync_to_azimuth(bad).await;
                let (severity, message) = invalid_value_probe_verdict(
                    "SyncToAzimuth rejection",
                    &format!("azimuth {}", bad),
                    result.as_ref().map(|_| ()),
                    &self.codes,
                );
                self.log("SyncToAzimuth rejection", severity, &message);
            }
        }
    }

    /// Slew to a set of azimuths, inferring sync/async behaviour from the
    /// Slewing flag immediately after the command returns
    async fn check_azimuth_slews(&self) {
        if !self.caps.can_set_azimuth {
            match self.device.slew_to_azimuth(45.0).await {
                Ok(()) => {
                    self.issue(
                        "SlewToAzimuth",
                        "slew succeeded although CanSetAzimuth is false",
                    );
                    let _ = self.device.abort_slew().await;
                }
                Err(fault) => {
                    self.handle_fault("SlewToAzimuth", Required::MustNotBeImplemented, &fault)
                }
            }
            return;
        }

        for target in [90.0, 270.0] {
            if self.cancelled() {
                return;
            }
            let test = "SlewToAzimuth";
            match self.device.slew_to_azimuth(target).await {
                Ok(()) => {}
                Err(fault) => {
                    self.handle_fault(test, Required::MustBeImplemented, &fault);
                    continue;
                }
            }

            match self.device.slewing().await {
                Ok(true) => {
                    self.info(
                        test,
                        &format!("asynchronous slew to {} degrees, polling Slewing", target),
                    );
                    match self
                        .wait_for(
                            test,
                            "azimuth slew",
                            DomeWait::WhileSlewing,
                            self.settings.dome_azimuth_timeout,
                        )
                        .await
                    {
                        WaitOutcome::Completed => {}
                        WaitOutcome::Cancelled => return,
                        WaitOutcome::TimedOut | WaitOutcome::Faulted => {
                            let _ = self.device.abort_slew().await;
                            continue;
                        }
                    }
                }
                Ok(false) => self.info(
                    test,
                    &format!("synchronous slew to {} degrees", target),
                ),
                Err(fault) => {
                    self.error(test, &format!("Slewing read failed: {}", fault));
                    continue;
                }
            }

            self.stabilise().await;
            match self.device.azimuth().await {
                Ok(actual) => {
                    let (severity, message) = azimuth_verdict(target, actual, None);
                    self.log(test, severity, &message);
                }
                Err(fault) => self.error(test, &format!("Azimuth read failed: {}", fault)),
            }
        }
    }

    async fn check_altitude_slew(&self) {
        if !self.caps.can_set_altitude {
            match self.device.slew_to_altitude(45.0).await {
                Ok(()) => {
                    self.issue(
                        "SlewToAltitude",
                        "slew succeeded although CanSetAltitude is false",
                    );
                    let _ = self.device.abort_slew().await;
                }
                Err(fault) => {
                    self.handle_fault("SlewToAltitude", Required::MustNotBeImplemented, &fault)
                }
            }
            return;
        }

        // An open shutter may be required before altitude motion
        if self.settings.open_shutter_before_tests && self.caps.can_set_shutter {
            self.reconcile_shutter(ShutterState::Open).await;
        }

        let target = 45.0;
        match self.device.slew_to_altitude(target).await {
            Ok(()) => {}
            Err(fault) => {
                self.handle_fault("SlewToAltitude", Required::MustBeImplemented, &fault);
                return;
            }
        }
        match self
            .wait_for(
                "SlewToAltitude",
                "altitude slew",
                DomeWait::WhileSlewing,
                self.settings.dome_azimuth_timeout,
            )
            .await
        {
            WaitOutcome::Completed => {}
            WaitOutcome::Cancelled => return,
            WaitOutcome::TimedOut | WaitOutcome::Faulted => {
                let _ = self.device.abort_slew().await;
                return;
            }
        }

        self.stabilise().await;
        match self.device.altitude().await {
            Ok(actual) => {
                let delta = (actual - target).abs();
                if delta < 1.0 {
                    self.ok(
                        "SlewToAltitude",
                        &format!("settled within {:.2} degrees", delta),
                    );
                } else {
                    self.info(
                        "SlewToAltitude",
                        &format!("settled {:.2} degrees from the commanded altitude", delta),
                    );
                }
            }
            Err(fault) => self.error("SlewToAltitude", &format!("Altitude read failed: {}", fault)),
        }
    }

    async fn check_sync_to_azimuth(&self) {
        if !self.caps.can_sync_azimuth {
            match self.device.sync_to_azimuth(45.0).await {
                Ok(()) => self.issue(
                    "SyncToAzimuth",
                    "sync succeeded although CanSyncAzimuth is false",
                ),
                Err(fault) => {
                    self.handle_fault("SyncToAzimuth", Required::MustNotBeImplemented, &fault)
                }
            }
            return;
        }

        let original = match self.device.azimuth().await {
            Ok(value) => value,
            Err(fault) => {
                self.error("SyncToAzimuth", &format!("Azimuth read failed: {}", fault));
                return;
            }
        };

        let offset = self.settings.sync_offset_degrees.max(1.0) * 10.0;
        let synced = crate::transform::range_azimuth(original + offset);
        match self.device.sync_to_azimuth(synced).await {
            Ok(()) => match self.device.azimuth().await {
                Ok(actual) => {
                    let (severity, message) = azimuth_verdict(synced, actual, Some(offset));
                    self.log("SyncToAzimuth", severity, &message);
                    if let Err(fault) = self.device.sync_to_azimuth(original).await {
                        self.info(
                            "SyncToAzimuth",
                            &format!("could not restore the original azimuth: {}", fault),
                        );
                    }
                }
                Err(fault) => {
                    self.error("SyncToAzimuth", &format!("Azimuth read failed: {}", fault))
                }
            },
            Err(fault) => {
                self.handle_fault("SyncToAzimuth", Required::MustBeImplemented, &fault)
            }
        }
    }

    async fn check_set_park(&self) {
        if self.caps.can_set_park {
            match self.device.set_park().await {
                Ok(()) => self.ok("SetPark", "accepted current position"),
                Err(fault) => self.handle_fault("SetPark", Required::MustBeImplemented, &fault),
            }
        } else {
            match self.device.set_park().await {
                Ok(()) => self.issue(
                    "SetPark",
                    "SetPark succeeded although CanSetPark is false",
                ),
                Err(fault) => {
                    self.handle_fault("SetPark", Required::MustNotBeImplemented, &fault)
                }
            }
        }
    }

    async fn check_park(&self) {
        if !self.caps.can_park {
            match self.device.park().await {
                Ok(()) => self.error("Park", "Park succeeded although CanPark is false"),
                Err(fault) => self.handle_fault("Park", Required::MustNotBeImplemented, &fault),
            }
            return;
        }

        match self.device.park().await {
            Ok(()) => {}
            Err(fault) => {
                self.handle_fault("Park", Required::MustBeImplemented, &fault);
                return;
            }
        }
        match self
            .wait_for(
                "Park",
                "parking",
                DomeWait::UntilAtPark,
                self.settings.dome_azimuth_timeout,
            )
            .await
        {
            WaitOutcome::Completed => self.ok("Park", "AtPark true after parking"),
            WaitOutcome::Cancelled => return,
            WaitOutcome::TimedOut | WaitOutcome::Faulted => return,
        }

        // Parking an already parked dome must be a harmless no-op
        match self.device.park().await {
            Ok(()) => match self.device.at_park().await {
                Ok(true) => self.ok("Park", "second Park is idempotent"),
                Ok(false) => self.issue("Park", "second Park dropped the parked state"),
                Err(fault) => self.error("Park", &format!("AtPark read failed: {}", fault)),
            },
            Err(fault) => self.issue(
                "Park",
                &format!("second Park on a parked dome raised a fault: {}", fault),
            ),
        }
    }

    async fn check_find_home(&self) {
        if !self.caps.can_find_home {
            match self.device.find_home().await {
                Ok(()) => self.issue(
                    "FindHome",
                    "homing succeeded although CanFindHome is false",
                ),
                Err(fault) => {
                    self.handle_fault("FindHome", Required::MustNotBeImplemented, &fault)
                }
            }
            return;
        }

        match self.device.find_home().await {
            Ok(()) => {}
            Err(fault) => {
                self.handle_fault("FindHome", Required::MustBeImplemented, &fault);
                return;
            }
        }
        match self
            .wait_for(
                "FindHome",
                "homing",
                DomeWait::UntilAtHome,
                self.settings.dome_azimuth_timeout,
            )
            .await
        {
            WaitOutcome::Completed => self.ok("FindHome", "AtHome true after homing"),
            WaitOutcome::Cancelled | WaitOutcome::TimedOut | WaitOutcome::Faulted => {}
        }
    }

    async fn check_performance(&self) {
        let window = self.settings.performance_window;
        for (test, which) in [
            ("Performance: Azimuth", 0u8),
            ("Performance: ShutterStatus", 1u8),
            ("Performance: Slewing", 2u8),
        ] {
            if self.cancelled() {
                return;
            }
            let start = Instant::now();
            let mut calls: u64 = 0;
            let mut faulted = false;
            while start.elapsed() < window {
                if self.cancelled() {
                    return;
                }
                let result = match which {
                    0 => self.device.azimuth().await.map(|_| ()),
                    1 => self.device.shutter_status().await.map(|_| ()),
                    _ => self.device.slewing().await.map(|_| ()),
                };
                if let Err(fault) = result {
                    self.info(test, &format!("member faulted during probe: {}", fault));
                    faulted = true;
                    break;
                }
                calls += 1;
                self.sink.set_status(test, "measuring", &calls.to_string());
            }
            if !faulted {
                let elapsed = start.elapsed().as_secs_f64();
                self.info(
                    test,
                    &crate::telescope::describe_rate(calls as f64 / elapsed),
                );
            }
        }
    }

    /// Return the dome to a safe state: stop motion, close the shutter if
    /// it was opened, park when possible. Every step is fault-tolerant.
    async fn post_run_check(&self) {
        if let Err(fault) = self.device.abort_slew().await {
            self.info("PostRun", &format!("AbortSlew failed: {}", fault));
        }
        if self.opened_shutter && self.caps.can_set_shutter {
            self.reconcile_shutter(ShutterState::Closed).await;
        }
        if self.caps.can_park && self.settings.destructive_tests {
            if let Err(fault) = self.device.park().await {
                self.info("PostRun", &format!("Park failed: {}", fault));
            } else {
                self.wait_for(
                    "PostRun",
                    "parking",
                    DomeWait::UntilAtPark,
                    self.settings.dome_azimuth_timeout,
                )
                .await;
            }
        }
        self.ok("PostRun", "dome returned to idle");
    }
}
