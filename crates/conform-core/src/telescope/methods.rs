//! Telescope method checks
//!
//! Exercises the motion methods under both sides of the capability
//! contract: a gated method must work when its flag is true and must raise
//! a not-implemented fault when it is false. Physical motion is gated by
//! the destructive-tests setting.

use std::time::{Duration, Instant};

use crate::device::{GuideDirection, TelescopeAxis, TelescopeDevice};
use crate::fault::{invalid_value_probe_verdict, Required};

use super::{TelescopeTester, WaitFlag, WaitOutcome};

/// Pulse guide probe duration
const PULSE_GUIDE_MS: i32 = 1000;

impl TelescopeTester {
    pub(crate) async fn check_methods(&mut self) {
        self.check_abort_slew_idle().await;
        if self.cancelled() {
            return;
        }
        self.check_move_axis().await;
        if self.cancelled() {
            return;
        }
        self.check_pulse_guide().await;
        if self.cancelled() {
            return;
        }
        self.check_find_home().await;
        if self.cancelled() {
            return;
        }
        self.check_set_park().await;
        if self.cancelled() {
            return;
        }
        self.check_park_unpark().await;
    }

    /// AbortSlew with no slew in progress must be accepted
    async fn check_abort_slew_idle(&self) {
        match self.device.abort_slew().await {
            Ok(()) => self.ok("AbortSlew", "accepted while idle"),
            Err(fault) => self.handle_fault("AbortSlew", Required::Mandatory, &fault),
        }
    }

    async fn check_move_axis(&self) {
        for axis in TelescopeAxis::ALL {
            if self.cancelled() {
                return;
            }
            let test = format!("MoveAxis:{}", axis);
            let can_move = self.caps.can_move_axis[axis.index()];

            if !can_move {
                match self.device.move_axis(axis, 0.5).await {
                    Ok(()) => {
                        self.issue(
                            &test,
                            "move succeeded although CanMoveAxis is false",
                        );
                        let _ = self.device.move_axis(axis, 0.0).await;
                        let _ = self.device.abort_slew().await;
                    }
                    Err(fault) => {
                        self.handle_fault(&test, Required::MustNotBeImplemented, &fault)
                    }
                }
                continue;
            }

            let rates = match self.device.axis_rates(axis).await {
                Ok(rates) if !rates.is_empty() => rates,
                _ => {
                    self.info(&test, "no rate ranges available, skipping move tests");
                    continue;
                }
            };
            let probe_rate = rates[0].maximum.min(1.0).max(rates[0].minimum);
            let beyond_maximum = rates
                .iter()
                .map(|rate| rate.maximum)
                .fold(f64::MIN, f64::max)
                + 1.0;

            // Out-of-range rates must be rejected before anything moves
            let result = self.device.move_axis(axis, beyond_maximum).await;
            let (severity, message) = invalid_value_probe_verdict(
                &test,
                &format!("rate {}", beyond_maximum),
                result.as_ref().map(|_| ()),
                &self.codes,
            );
            self.log(&test, severity, &message);
            if result.is_ok() {
                let _ = self.device.move_axis(axis, 0.0).await;
            }

            if !self.settings.destructive_tests {
                self.comment(&test, "destructive tests disabled, skipping motion");
                continue;
            }

            for rate in [probe_rate, -probe_rate] {
                match self.device.move_axis(axis, rate).await {
                    Ok(()) => {
                        self.ok(&test, &format!("moving at {}", rate));
                        tokio::time::sleep(self.settings.stabilisation_wait).await;
                        match self.device.move_axis(axis, 0.0).await {
                            Ok(()) => self.ok(&test, "stopped with rate 0"),
                            Err(fault) => {
                                self.error(&test, &format!("failed to stop: {}", fault));
                                let _ = self.device.abort_slew().await;
                            }
                        }
                    }
                    Err(fault) => {
                        self.handle_fault(&test, Required::MustBeImplemented, &fault)
                    }
                }
            }

            self.stabilise().await;
            match self.device.slewing().await {
                Ok(true) => self.issue(&test, "Slewing still true after all axes stopped"),
                Ok(false) => self.ok(&test, "Slewing false after stop"),
                Err(fault) => self.error(&test, &format!("Slewing read failed: {}", fault)),
            }
        }
    }

    async fn check_pulse_guide(&self) {
        if !self.caps.can_pulse_guide {
            match self.device.pulse_guide(GuideDirection::North, PULSE_GUIDE_MS).await {
                Ok(()) => self.issue(
                    "PulseGuide",
                    "pulse succeeded although CanPulseGuide is false",
                ),
                Err(fault) => {
                    self.handle_fault("PulseGuide", Required::MustNotBeImplemented, &fault)
                }
            }
            return;
        }

        let result = self.device.pulse_guide(GuideDirection::North, -1).await;
        let (severity, message) = invalid_value_probe_verdict(
            "PulseGuide",
            "duration -1ms",
            result.as_ref().map(|_| ()),
            &self.codes,
        );
        self.log("PulseGuide", severity, &message);

        if !self.settings.destructive_tests {
            self.comment("PulseGuide", "destructive tests disabled, skipping motion");
            return;
        }

        for direction in GuideDirection::ALL {
            if self.cancelled() {
                return;
            }
            let started = Instant::now();
            match self.device.pulse_guide(direction, PULSE_GUIDE_MS).await {
                Ok(()) => {
                    let call_time = started.elapsed();
                    if call_time >= Duration::from_millis(PULSE_GUIDE_MS as u64 * 3 / 4) {
                        // Synchronous flavour: the call blocked for the pulse
                        self.ok(
                            "PulseGuide",
                            &format!("{} pulse completed synchronously", direction),
                        );
                    } else {
                        let timeout =
                            Duration::from_millis(PULSE_GUIDE_MS as u64) + self.settings.slew_timeout;
                        match self
                            .wait_for(
                                "PulseGuide",
                                &format!("{} pulse", direction),
                                WaitFlag::WhilePulseGuiding,
                                timeout,
                            )
                            .await
                        {
                            WaitOutcome::Completed => self.ok(
                                "PulseGuide",
                                &format!("{} pulse completed after polling IsPulseGuiding", direction),
                            ),
                            WaitOutcome::Cancelled => return,
                            WaitOutcome::TimedOut | WaitOutcome::Faulted => {}
                        }
                    }
                }
                Err(fault) => {
                    self.handle_fault("PulseGuide", Required::MustBeImplemented, &fault)
                }
            }
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
        if !self.settings.destructive_tests {
            self.comment("FindHome", "destructive tests disabled, skipping");
            return;
        }

        match self.device.find_home().await {
            Ok(()) => {
                match self
                    .wait_for(
                        "FindHome",
                        "homing",
                        WaitFlag::WhileSlewing,
                        self.settings.slew_timeout,
                    )
                    .await
                {
                    WaitOutcome::Completed => match self.device.at_home().await {
                        Ok(true) => self.ok("FindHome", "AtHome true after homing"),
                        Ok(false) => {
                            self.issue("FindHome", "AtHome false after homing completed")
                        }
                        Err(fault) => {
                            self.error("FindHome", &format!("AtHome read failed: {}", fault))
                        }
                    },
                    _ => {}
                }
            }
            Err(fault) => self.handle_fault("FindHome", Required::MustBeImplemented, &fault),
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

    async fn check_park_unpark(&self) {
        if !self.caps.can_park {
            match self.device.park().await {
                Ok(()) => {
                    self.error("Park", "Park succeeded although CanPark is false");
                    let _ = self.device.unpark().await;
                }
                Err(fault) => self.handle_fault("Park", Required::MustNotBeImplemented, &fault),
            }
            if !self.caps.can_unpark {
                match self.device.unpark().await {
                    Ok(()) => {
                        self.error("UnPark", "UnPark succeeded although CanUnpark is false")
                    }
                    Err(fault) => {
                        self.handle_fault("UnPark", Required::MustNotBeImplemented, &fault)
                    }
                }
            }
            return;
        }
        if !self.settings.destructive_tests {
            self.comment("Park", "destructive tests disabled, skipping");
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
            .wait_for("Park", "parking", WaitFlag::UntilAtPark, self.settings.slew_timeout)
            .await
        {
            WaitOutcome::Completed => self.ok("Park", "AtPark true after parking"),
            WaitOutcome::Cancelled => return,
            WaitOutcome::TimedOut | WaitOutcome::Faulted => return,
        }

        // Parking an already parked mount must be a harmless no-op
        match self.device.park().await {
            Ok(()) => match self.device.at_park().await {
                Ok(true) => self.ok("Park", "second Park is idempotent"),
                Ok(false) => self.issue("Park", "second Park dropped the parked state"),
                Err(fault) => self.error("Park", &format!("AtPark read failed: {}", fault)),
            },
            Err(fault) => self.issue(
                "Park",
                &format!("second Park on a parked mount raised a fault: {}", fault),
            ),
        }

        self.check_parked_guard().await;

        if self.caps.can_unpark {
            match self.device.unpark().await {
                Ok(()) => match self.device.at_park().await {
                    Ok(false) => self.ok("UnPark", "AtPark false after unparking"),
                    Ok(true) => self.issue("UnPark", "AtPark still true after UnPark"),
                    Err(fault) => {
                        self.error("UnPark", &format!("AtPark read failed: {}", fault))
                    }
                },
                Err(fault) => self.handle_fault("UnPark", Required::MustBeImplemented, &fault),
            }
            // Unparking twice must also be harmless
            match self.device.unpark().await {
                Ok(()) => self.ok("UnPark", "second UnPark is idempotent"),
                Err(fault) => self.issue(
                    "UnPark",
                    &format!("second UnPark raised a fault: {}", fault),
                ),
            }
        } else {
            match self.device.unpark().await {
                Ok(()) => self.issue(
                    "UnPark",
                    "UnPark succeeded although CanUnpark is false",
                ),
                Err(fault) => {
                    self.handle_fault("UnPark", Required::MustNotBeImplemented, &fault)
                }
            }
        }
    }

    /// While parked, every capability-gated motion command must fault and
    /// the mount must stay parked
    async fn check_parked_guard(&self) {
        let (ra, dec) = self.safe_equatorial_target().await;

        if self.caps.can_slew {
            self.parked_guard_probe("Park guard: SlewToCoordinates", async {
                self.device.slew_to_coordinates(ra, dec).await
            })
            .await;
        }
        if self.caps.can_slew_async {
            self.parked_guard_probe("Park guard: SlewToCoordinatesAsync", async {
                self.device.slew_to_coordinates_async(ra, dec).await
            })
            .await;
        }
        if self.caps.can_sync {
            self.parked_guard_probe("Park guard: SyncToCoordinates", async {
                self.device.sync_to_coordinates(ra, dec).await
            })
            .await;
        }
        if self.caps.can_move_axis[TelescopeAxis::Primary.index()] {
            self.parked_guard_probe("Park guard: MoveAxis", async {
                self.device.move_axis(TelescopeAxis::Primary, 0.5).await
            })
            .await;
        }
        if self.caps.can_pulse_guide {
            self.parked_guard_probe("Park guard: PulseGuide", async {
                self.device
                    .pulse_guide(GuideDirection::North, PULSE_GUIDE_MS)
                    .await
            })
            .await;
        }
        if self.caps.can_find_home {
            self.parked_guard_probe("Park guard: FindHome", async {
                self.device.find_home().await
            })
            .await;
        }
    }

    async fn parked_guard_probe<F>(&self, test: &str, call: F)
    where
        F: std::future::Future<Output = crate::fault::DeviceResult<()>>,
    {
        match call.await {
            Ok(()) => {
                self.issue(test, "motion command succeeded while parked");
                let _ = self.device.abort_slew().await;
                // Re-park so the remaining guard probes still start parked
                let _ = self.device.park().await;
            }
            Err(_) => self.ok(test, "correctly rejected while parked"),
        }

        match self.device.at_park().await {
            Ok(true) => {}
            Ok(false) => {
                self.issue(test, "mount left the parked state");
                let _ = self.device.park().await;
            }
            Err(fault) => self.error(test, &format!("AtPark read failed: {}", fault)),
        }
    }
}
