//! Telescope conformance tester
//!
//! Drives every telescope member through the capability contract: read the
//! `Can*` flags once, exercise properties with range validation, exercise
//! methods including the slew/sync workflows, smoke-test call rates, and
//! finally return the mount to a safe idle state. Tests run strictly
//! sequentially; the device connection is a single shared resource and
//! hardware physically moves.

mod methods;
mod performance;
mod properties;
mod rates;
mod slew;

pub use slew::{classify_pier_side, PierSideBehavior, SideOfPierResult};
pub(crate) use performance::describe_rate;

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::capability::TelescopeCapabilities;
use crate::config::Settings;
use crate::device::{AlignmentMode, Device, TelescopeDevice};
use crate::error::{ConformError, Result};
use crate::fault::{member_fault_verdict, DeviceFault, FaultCodes, Required};
use crate::outcome::{OutcomeSink, Severity};
use crate::transform::local_sidereal_time;

/// Outcome of a bounded polling wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitOutcome {
    Completed,
    Cancelled,
    TimedOut,
    Faulted,
}

/// Condition a polling wait resolves on
#[derive(Debug, Clone, Copy)]
pub(crate) enum WaitFlag {
    WhileSlewing,
    WhilePulseGuiding,
    UntilAtPark,
    UntilAtHome,
}

/// Per-run context for the telescope test sequence
///
/// Holds the cached capability flags, intermediate values later checks need
/// (site geometry, written targets), and the cancellation handle. One
/// instance drives one device for one run.
pub struct TelescopeTester {
    device: Arc<dyn TelescopeDevice>,
    sink: Arc<dyn OutcomeSink>,
    settings: Settings,
    codes: FaultCodes,
    cancel: CancellationToken,
    caps: TelescopeCapabilities,
    alignment: Option<AlignmentMode>,
    site_latitude: Option<f64>,
    site_longitude: Option<f64>,
}

impl TelescopeTester {
    pub fn new(
        device: Arc<dyn TelescopeDevice>,
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
            caps: TelescopeCapabilities::default(),
            alignment: None,
            site_latitude: None,
            site_longitude: None,
        }
    }

    /// Cached capability flags, populated by the first run stage
    pub fn capabilities(&self) -> &TelescopeCapabilities {
        &self.caps
    }

    /// Run the complete telescope test sequence
    ///
    /// The only fatal error is failing to connect; every device fault after
    /// that is classified and logged, and the run continues to the next
    /// independent check. Cancellation stops the run at the next stage
    /// boundary or polling interval.
    pub async fn run(&mut self) -> Result<()> {
        self.connect().await?;

        self.comment("Capabilities", "reading capability flags");
        self.caps = TelescopeCapabilities::read(
            self.device.as_ref(),
            self.sink.as_ref(),
            &self.codes,
        )
        .await;

        if !self.cancelled() {
            self.comment("Properties", "checking properties");
            self.check_properties().await;
        }
        if !self.cancelled() {
            self.comment("Methods", "checking methods");
            self.check_methods().await;
        }
        if !self.cancelled() {
            self.comment("SlewSync", "checking slew and sync operations");
            self.check_slewing().await;
        }
        if self.settings.run_performance_tests && !self.cancelled() {
            self.comment("Performance", "measuring call rates");
            self.check_performance().await;
        }
        if !self.cancelled() {
            self.comment("PostRun", "returning mount to a safe state");
            self.post_run_check().await;
        }

        if let Err(fault) = self.device.set_connected(false).await {
            self.log(
                "Connected",
                Severity::Info,
                &format!("disconnect failed: {}", fault),
            );
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

    pub(crate) fn log(&self, test: &str, severity: Severity, message: &str) {
        self.sink.log(test, severity, message);
    }

    pub(crate) fn ok(&self, test: &str, message: &str) {
        self.log(test, Severity::Ok, message);
    }

    pub(crate) fn info(&self, test: &str, message: &str) {
        self.log(test, Severity::Info, message);
    }

    pub(crate) fn issue(&self, test: &str, message: &str) {
        self.log(test, Severity::Issue, message);
    }

    pub(crate) fn error(&self, test: &str, message: &str) {
        self.log(test, Severity::Error, message);
    }

    pub(crate) fn comment(&self, test: &str, message: &str) {
        self.log(test, Severity::Comment, message);
    }

    /// Classify a member fault under the given policy and log the verdict
    pub(crate) fn handle_fault(&self, test: &str, required: Required, fault: &DeviceFault) {
        let (severity, message) = member_fault_verdict(test, required, fault, &self.codes);
        self.log(test, severity, &message);
    }

    pub(crate) fn cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Current local sidereal time, preferring the device's own clock
    pub(crate) async fn current_lst(&self) -> f64 {
        if let Ok(st) = self.device.sidereal_time().await {
            return st;
        }
        let longitude = self
            .site_longitude
            .or(self.settings.site_longitude)
            .unwrap_or(0.0);
        local_sidereal_time(Utc::now(), longitude)
    }

    /// Poll a device flag until the wait condition resolves
    ///
    /// Bounded by `timeout` independent of cancellation. A timeout is an
    /// Error (hardware that never settles must not hang the run); exiting
    /// on cancellation is not a fault.
    pub(crate) async fn wait_for(
        &self,
        test: &str,
        action: &str,
        flag: WaitFlag,
        timeout: std::time::Duration,
    ) -> WaitOutcome {
        let start = Instant::now();
        loop {
            if self.cancelled() {
                return WaitOutcome::Cancelled;
            }

            let probe = match flag {
                WaitFlag::WhileSlewing => self.device.slewing().await.map(|moving| !moving),
                WaitFlag::WhilePulseGuiding => {
                    self.device.is_pulse_guiding().await.map(|active| !active)
                }
                WaitFlag::UntilAtPark => self.device.at_park().await,
                WaitFlag::UntilAtHome => self.device.at_home().await,
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
                    &format!(
                        "timed out after {:?} waiting for {}",
                        timeout, action
                    ),
                );
                return WaitOutcome::TimedOut;
            }

            self.sink.set_status(test, action, "waiting");
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    /// Pause for the configured stabilisation period after motion stops
    pub(crate) async fn stabilise(&self) {
        tokio::time::sleep(self.settings.stabilisation_wait).await;
    }

    /// Return the mount to a safe idle state; every step is fault-tolerant
    async fn post_run_check(&self) {
        if let Err(fault) = self.device.abort_slew().await {
            self.info("PostRun", &format!("AbortSlew failed: {}", fault));
        }
        for axis in crate::device::TelescopeAxis::ALL {
            if self.caps.can_move_axis[axis.index()] {
                if let Err(fault) = self.device.move_axis(axis, 0.0).await {
                    self.info(
                        "PostRun",
                        &format!("stopping {} axis failed: {}", axis, fault),
                    );
                }
            }
        }
        if self.caps.can_set_tracking {
            if let Err(fault) = self.device.set_tracking(false).await {
                self.info("PostRun", &format!("Tracking off failed: {}", fault));
            }
        }
        self.ok("PostRun", "mount returned to idle");
    }
}
