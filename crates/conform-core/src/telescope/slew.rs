//! Slew and sync orchestration
//!
//! Each operation walks the same state machine: set targets if the
//! operation is target-based, invoke, poll `Slewing` for asynchronous
//! flavours (bounded by the slew timeout and the cancellation token), wait
//! the stabilisation period, then verify the reported position against the
//! commanded one with wraparound-aware arc-second differences. Slews and
//! syncs given out-of-domain coordinates must be rejected before any
//! motion starts; if one slips through, the motion is aborted and reported
//! as an Error.

use crate::device::{AlignmentMode, PierSide, TelescopeDevice};
use crate::fault::{DeviceResult, FaultKind, Required};
use crate::transform::{
    alt_difference_arcsec, azimuth_difference_deg, condition_ra, dec_difference_arcsec,
    degrees_to_dms, hours_to_hms, ra_difference_arcsec,
};

use super::properties::TARGET_TOLERANCE_ARCSEC;
use super::{TelescopeTester, WaitFlag, WaitOutcome};

/// Post-slew position tolerance, arc-seconds. Within this band the slew is
/// OK; beyond it the measured delta is reported as Info because real
/// mounts have finite pointing accuracy.
const SLEW_TOLERANCE_ARCSEC: f64 = 10.0;

/// Hour angles probed by the German-mount pier-side matrix
const PIER_SIDE_HOUR_ANGLES: [f64; 4] = [-9.0, -3.0, 3.0, 9.0];

/// Pier-side pair captured at one hour-angle probe point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SideOfPierResult {
    pub reported: PierSide,
    pub destination: PierSide,
}

/// How a mount reports its pier side across the meridian
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PierSideBehavior {
    /// Sides match within each meridian half: correct pointing-state reporting
    PointingState,
    /// Sides match across the flip boundary: mechanical-side reporting,
    /// which the protocol forbids
    PhysicalSide,
    Inconclusive,
}

/// Classify four captured sides at hour angles {-9, -3, +3, +9}
pub fn classify_pier_side(
    minus9: PierSide,
    minus3: PierSide,
    plus3: PierSide,
    plus9: PierSide,
) -> PierSideBehavior {
    let pointing = minus3 == minus9 && plus3 == plus9 && minus3 != plus3;
    let physical = minus3 == plus9 && plus3 == minus9 && minus3 != minus9;
    match (pointing, physical) {
        (true, false) => PierSideBehavior::PointingState,
        (false, true) => PierSideBehavior::PhysicalSide,
        _ => PierSideBehavior::Inconclusive,
    }
}

/// Slew/sync entry points, unified for dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlewMethod {
    SlewToCoordinates,
    SlewToCoordinatesAsync,
    SlewToTarget,
    SlewToTargetAsync,
    SlewToAltAz,
    SlewToAltAzAsync,
    SyncToCoordinates,
    SyncToTarget,
    SyncToAltAz,
}

impl SlewMethod {
    fn name(self) -> &'static str {
        match self {
            SlewMethod::SlewToCoordinates => "SlewToCoordinates",
            SlewMethod::SlewToCoordinatesAsync => "SlewToCoordinatesAsync",
            SlewMethod::SlewToTarget => "SlewToTarget",
            SlewMethod::SlewToTargetAsync => "SlewToTargetAsync",
            SlewMethod::SlewToAltAz => "SlewToAltAz",
            SlewMethod::SlewToAltAzAsync => "SlewToAltAzAsync",
            SlewMethod::SyncToCoordinates => "SyncToCoordinates",
            SlewMethod::SyncToTarget => "SyncToTarget",
            SlewMethod::SyncToAltAz => "SyncToAltAz",
        }
    }

    fn is_async(self) -> bool {
        matches!(
            self,
            SlewMethod::SlewToCoordinatesAsync
                | SlewMethod::SlewToTargetAsync
                | SlewMethod::SlewToAltAzAsync
        )
    }

    fn uses_alt_az(self) -> bool {
        matches!(
            self,
            SlewMethod::SlewToAltAz | SlewMethod::SlewToAltAzAsync | SlewMethod::SyncToAltAz
        )
    }
}

impl TelescopeTester {
    fn slew_capability(&self, method: SlewMethod) -> bool {
        match method {
            SlewMethod::SlewToCoordinates | SlewMethod::SlewToTarget => self.caps.can_slew,
            SlewMethod::SlewToCoordinatesAsync | SlewMethod::SlewToTargetAsync => {
                self.caps.can_slew_async
            }
            SlewMethod::SlewToAltAz => self.caps.can_slew_alt_az,
            SlewMethod::SlewToAltAzAsync => self.caps.can_slew_alt_az_async,
            SlewMethod::SyncToCoordinates | SlewMethod::SyncToTarget => self.caps.can_sync,
            SlewMethod::SyncToAltAz => self.caps.can_sync_alt_az,
        }
    }

    /// One call through the uniform (a, b) coordinate surface: (ra, dec)
    /// for equatorial methods, (azimuth, altitude) for alt-az methods.
    /// Target-based methods ignore the arguments.
    async fn invoke_slew_method(&self, method: SlewMethod, a: f64, b: f64) -> DeviceResult<()> {
        let device = self.device.as_ref();
        match method {
            SlewMethod::SlewToCoordinates => device.slew_to_coordinates(a, b).await,
            SlewMethod::SlewToCoordinatesAsync => device.slew_to_coordinates_async(a, b).await,
            SlewMethod::SlewToTarget => device.slew_to_target().await,
            SlewMethod::SlewToTargetAsync => device.slew_to_target_async().await,
            SlewMethod::SlewToAltAz => device.slew_to_alt_az(a, b).await,
            SlewMethod::SlewToAltAzAsync => device.slew_to_alt_az_async(a, b).await,
            SlewMethod::SyncToCoordinates => device.sync_to_coordinates(a, b).await,
            SlewMethod::SyncToTarget => device.sync_to_target().await,
            SlewMethod::SyncToAltAz => device.sync_to_alt_az(a, b).await,
        }
    }

    /// A legal, comfortably-placed equatorial target: two hours east of
    /// the meridian at a mid declination on the site's hemisphere
    pub(crate) async fn safe_equatorial_target(&self) -> (f64, f64) {
        let lst = self.current_lst().await;
        let ra = condition_ra(lst + 2.0);
        let latitude = self
            .site_latitude
            .or(self.settings.site_latitude)
            .unwrap_or(45.0);
        let dec = if latitude >= 0.0 { 30.0 } else { -30.0 };
        (ra, dec)
    }

    pub(crate) async fn check_slewing(&self) {
        if !self.settings.destructive_tests {
            self.comment("SlewSync", "destructive tests disabled, skipping");
            return;
        }

        self.prepare_for_slews().await;

        let methods = [
            SlewMethod::SlewToCoordinates,
            SlewMethod::SlewToCoordinatesAsync,
            SlewMethod::SlewToTarget,
            SlewMethod::SlewToTargetAsync,
            SlewMethod::SlewToAltAz,
            SlewMethod::SlewToAltAzAsync,
        ];
        for method in methods {
            if self.cancelled() {
                return;
            }
            self.check_slew_method(method).await;
        }

        if !self.cancelled() {
            self.check_sync_to_coordinates().await;
        }
        if !self.cancelled() {
            self.check_sync_to_target().await;
        }
        if !self.cancelled() {
            self.check_sync_to_alt_az().await;
        }
        if !self.cancelled() {
            self.check_illegal_coordinates().await;
        }
        if self.settings.run_pier_side_tests && !self.cancelled() {
            self.check_pier_side().await;
        }
    }

    /// Slews need an unparked, tracking mount
    async fn prepare_for_slews(&self) {
        if let Ok(true) = self.device.at_park().await {
            if self.caps.can_unpark {
                if let Err(fault) = self.device.unpark().await {
                    self.error("SlewSync", &format!("cannot unpark for slew tests: {}", fault));
                }
            }
        }
        if self.caps.can_set_tracking {
            if let Err(fault) = self.device.set_tracking(true).await {
                self.info("SlewSync", &format!("cannot enable tracking: {}", fault));
            }
        }
    }

    async fn check_slew_method(&self, method: SlewMethod) {
        let test = method.name();
        let (a, b) = if method.uses_alt_az() {
            (135.0, 50.0)
        } else {
            self.safe_equatorial_target().await
        };

        if !self.slew_capability(method) {
            match self.invoke_slew_method(method, a, b).await {
                Ok(()) => {
                    self.issue(
                        test,
                        "slew succeeded although its capability flag is false",
                    );
                    let _ = self.device.abort_slew().await;
                    self.wait_for(test, "aborting", WaitFlag::WhileSlewing, self.settings.slew_timeout)
                        .await;
                }
                Err(fault) => self.handle_fault(test, Required::MustNotBeImplemented, &fault),
            }
            return;
        }

        // Target-based methods require the targets to be written first;
        // a failure here is a failure of the operation itself
        if matches!(method, SlewMethod::SlewToTarget | SlewMethod::SlewToTargetAsync) {
            if let Err(fault) = self.device.set_target_right_ascension(a).await {
                self.handle_fault(test, Required::MustBeImplemented, &fault);
                return;
            }
            if let Err(fault) = self.device.set_target_declination(b).await {
                self.handle_fault(test, Required::MustBeImplemented, &fault);
                return;
            }
        }

        match self.invoke_slew_method(method, a, b).await {
            Ok(()) => {}
            Err(fault) => {
                self.handle_fault(test, Required::MustBeImplemented, &fault);
                return;
            }
        }

        if method.is_async() {
            match self
                .wait_for(test, "slewing", WaitFlag::WhileSlewing, self.settings.slew_timeout)
                .await
            {
                WaitOutcome::Completed => {}
                WaitOutcome::Cancelled => return,
                WaitOutcome::TimedOut | WaitOutcome::Faulted => {
                    let _ = self.device.abort_slew().await;
                    return;
                }
            }
        } else {
            // Synchronous flavours must have settled by the time they return
            if let Ok(true) = self.device.slewing().await {
                self.issue(test, "Slewing still true after a synchronous slew returned");
                self.wait_for(test, "settling", WaitFlag::WhileSlewing, self.settings.slew_timeout)
                    .await;
            }
        }

        self.stabilise().await;
        if method.uses_alt_az() {
            self.verify_alt_az_position(test, a, b).await;
        } else {
            self.verify_equatorial_position(test, a, b).await;
        }
    }

    async fn verify_equatorial_position(&self, test: &str, ra: f64, dec: f64) {
        let actual_ra = match self.device.right_ascension().await {
            Ok(value) => value,
            Err(fault) => {
                self.error(test, &format!("RightAscension read failed: {}", fault));
                return;
            }
        };
        let actual_dec = match self.device.declination().await {
            Ok(value) => value,
            Err(fault) => {
                self.error(test, &format!("Declination read failed: {}", fault));
                return;
            }
        };

        let ra_delta = ra_difference_arcsec(actual_ra, ra);
        let dec_delta = dec_difference_arcsec(actual_dec, dec);
        if ra_delta <= SLEW_TOLERANCE_ARCSEC && dec_delta <= SLEW_TOLERANCE_ARCSEC {
            self.ok(
                test,
                &format!(
                    "settled at {} {} within tolerance (RA {:.1}\", Dec {:.1}\")",
                    hours_to_hms(actual_ra),
                    degrees_to_dms(actual_dec),
                    ra_delta,
                    dec_delta
                ),
            );
        } else {
            self.info(
                test,
                &format!(
                    "settled {:.1}\" in RA and {:.1}\" in Dec from the commanded position ({} {})",
                    ra_delta,
                    dec_delta,
                    hours_to_hms(actual_ra),
                    degrees_to_dms(actual_dec)
                ),
            );
        }
    }

    async fn verify_alt_az_position(&self, test: &str, azimuth: f64, altitude: f64) {
        let actual_az = match self.device.azimuth().await {
            Ok(value) => value,
            Err(fault) => {
                self.error(test, &format!("Azimuth read failed: {}", fault));
                return;
            }
        };
        let actual_alt = match self.device.altitude().await {
            Ok(value) => value,
            Err(fault) => {
                self.error(test, &format!("Altitude read failed: {}", fault));
                return;
            }
        };

        let az_delta = azimuth_difference_deg(actual_az, azimuth) * 3600.0;
        let alt_delta = alt_difference_arcsec(actual_alt, altitude);
        if az_delta <= SLEW_TOLERANCE_ARCSEC && alt_delta <= SLEW_TOLERANCE_ARCSEC {
            self.ok(
                test,
                &format!(
                    "settled within tolerance (Az {:.1}\", Alt {:.1}\")",
                    az_delta, alt_delta
                ),
            );
        } else {
            self.info(
                test,
                &format!(
                    "settled {:.1}\" in Az and {:.1}\" in Alt from the commanded position",
                    az_delta, alt_delta
                ),
            );
        }
    }

    /// Sync to an offset position, verify the readback, sync back
    async fn check_sync_to_coordinates(&self) {
        if !self.slew_capability(SlewMethod::SyncToCoordinates) {
            self.check_gated_sync_rejection(SlewMethod::SyncToCoordinates).await;
            return;
        }

        let (original_ra, original_dec) = match (
            self.device.right_ascension().await,
            self.device.declination().await,
        ) {
            (Ok(ra), Ok(dec)) => (ra, dec),
            _ => {
                self.info("SyncToCoordinates", "cannot read current position, skipping");
                return;
            }
        };

        let offset = self.settings.sync_offset_degrees;
        let synced_ra = condition_ra(original_ra + offset / 15.0);
        let synced_dec = (original_dec + offset).clamp(-89.0, 89.0);

        match self.device.sync_to_coordinates(synced_ra, synced_dec).await {
            Ok(()) => {
                self.verify_sync_readback("SyncToCoordinates", synced_ra, synced_dec, original_ra, original_dec)
                    .await;
                // Undo the deliberate offset
                if let Err(fault) = self.device.sync_to_coordinates(original_ra, original_dec).await
                {
                    self.error(
                        "SyncToCoordinates",
                        &format!("failed to sync back to the original position: {}", fault),
                    );
                }
            }
            Err(fault) => {
                self.handle_fault("SyncToCoordinates", Required::MustBeImplemented, &fault)
            }
        }
    }

    async fn check_sync_to_target(&self) {
        if !self.slew_capability(SlewMethod::SyncToTarget) {
            self.check_gated_sync_rejection(SlewMethod::SyncToTarget).await;
            return;
        }

        let (original_ra, original_dec) = match (
            self.device.right_ascension().await,
            self.device.declination().await,
        ) {
            (Ok(ra), Ok(dec)) => (ra, dec),
            _ => {
                self.info("SyncToTarget", "cannot read current position, skipping");
                return;
            }
        };

        let offset = self.settings.sync_offset_degrees;
        let target_ra = condition_ra(original_ra + offset / 15.0);
        let target_dec = (original_dec + offset).clamp(-89.0, 89.0);

        if let Err(fault) = self.device.set_target_right_ascension(target_ra).await {
            self.handle_fault("SyncToTarget", Required::MustBeImplemented, &fault);
            return;
        }
        if let Err(fault) = self.device.set_target_declination(target_dec).await {
            self.handle_fault("SyncToTarget", Required::MustBeImplemented, &fault);
            return;
        }

        match self.device.sync_to_target().await {
            Ok(()) => {
                self.verify_sync_readback("SyncToTarget", target_ra, target_dec, original_ra, original_dec)
                    .await;
                if let Err(fault) = self.device.sync_to_coordinates(original_ra, original_dec).await
                {
                    self.info(
                        "SyncToTarget",
                        &format!("could not restore the original position: {}", fault),
                    );
                }
            }
            Err(fault) => self.handle_fault("SyncToTarget", Required::MustBeImplemented, &fault),
        }
    }

    async fn check_sync_to_alt_az(&self) {
        if !self.slew_capability(SlewMethod::SyncToAltAz) {
            self.check_gated_sync_rejection(SlewMethod::SyncToAltAz).await;
            return;
        }

        let (original_az, original_alt) = match (
            self.device.azimuth().await,
            self.device.altitude().await,
        ) {
            (Ok(az), Ok(alt)) => (az, alt),
            _ => {
                self.info("SyncToAltAz", "cannot read current position, skipping");
                return;
            }
        };

        let offset = self.settings.sync_offset_degrees;
        let synced_az = crate::transform::range_azimuth(original_az + offset);
        let synced_alt = (original_alt + offset).clamp(0.0, 89.0);

        match self.device.sync_to_alt_az(synced_az, synced_alt).await {
            Ok(()) => {
                let az_delta = match self.device.azimuth().await {
                    Ok(actual) => azimuth_difference_deg(actual, synced_az) * 3600.0,
                    Err(fault) => {
                        self.error("SyncToAltAz", &format!("Azimuth read failed: {}", fault));
                        return;
                    }
                };
                if az_delta <= TARGET_TOLERANCE_ARCSEC {
                    self.ok(
                        "SyncToAltAz",
                        &format!("reported azimuth within {:.1}\"", az_delta),
                    );
                } else {
                    self.info(
                        "SyncToAltAz",
                        &format!("reported azimuth {:.1}\" from the synced value", az_delta),
                    );
                }
                if let Err(fault) = self.device.sync_to_alt_az(original_az, original_alt).await {
                    self.info(
                        "SyncToAltAz",
                        &format!("could not restore the original position: {}", fault),
                    );
                }
            }
            Err(fault) => self.handle_fault("SyncToAltAz", Required::MustBeImplemented, &fault),
        }
    }

    async fn check_gated_sync_rejection(&self, method: SlewMethod) {
        let test = method.name();
        let (a, b) = if method.uses_alt_az() {
            (135.0, 50.0)
        } else {
            self.safe_equatorial_target().await
        };
        match self.invoke_slew_method(method, a, b).await {
            Ok(()) => self.issue(
                test,
                "sync succeeded although its capability flag is false",
            ),
            Err(fault) => self.handle_fault(test, Required::MustNotBeImplemented, &fault),
        }
    }

    async fn verify_sync_readback(
        &self,
        test: &str,
        synced_ra: f64,
        synced_dec: f64,
        original_ra: f64,
        original_dec: f64,
    ) {
        let (actual_ra, actual_dec) = match (
            self.device.right_ascension().await,
            self.device.declination().await,
        ) {
            (Ok(ra), Ok(dec)) => (ra, dec),
            _ => {
                self.error(test, "cannot read back the synced position");
                return;
            }
        };

        let ra_delta = ra_difference_arcsec(actual_ra, synced_ra);
        let dec_delta = dec_difference_arcsec(actual_dec, synced_dec);
        if ra_delta <= TARGET_TOLERANCE_ARCSEC && dec_delta <= TARGET_TOLERANCE_ARCSEC {
            self.ok(
                test,
                &format!(
                    "reported position follows the sync (RA {:.1}\", Dec {:.1}\")",
                    ra_delta, dec_delta
                ),
            );
            return;
        }

        // Close to the pre-sync position means the sync was ignored
        let unmoved_ra = ra_difference_arcsec(actual_ra, original_ra);
        let unmoved_dec = dec_difference_arcsec(actual_dec, original_dec);
        if unmoved_ra <= TARGET_TOLERANCE_ARCSEC && unmoved_dec <= TARGET_TOLERANCE_ARCSEC {
            self.issue(
                test,
                "reported position did not change; the sync appears to have been ignored",
            );
        } else {
            self.issue(
                test,
                &format!(
                    "reported position is {:.1}\" in RA and {:.1}\" in Dec from the synced value",
                    ra_delta, dec_delta
                ),
            );
        }
    }

    /// Out-of-domain coordinates must raise an invalid-value fault from
    /// every slew/sync entry point; motion started by a silent acceptance
    /// is aborted and reported as an Error
    async fn check_illegal_coordinates(&self) {
        let (legal_ra, legal_dec) = self.safe_equatorial_target().await;
        let equatorial_probes = [
            (-1.0, legal_dec, "RA -1h"),
            (25.0, legal_dec, "RA 25h"),
            (legal_ra, -91.0, "Dec -91"),
            (legal_ra, 91.0, "Dec +91"),
        ];
        let alt_az_probes = [
            (-10.0, 50.0, "Az -10"),
            (370.0, 50.0, "Az 370"),
            (135.0, -1.0, "Alt -1"),
            (135.0, 91.0, "Alt +91"),
        ];

        let methods = [
            SlewMethod::SlewToCoordinates,
            SlewMethod::SlewToCoordinatesAsync,
            SlewMethod::SyncToCoordinates,
            SlewMethod::SlewToAltAz,
            SlewMethod::SlewToAltAzAsync,
            SlewMethod::SyncToAltAz,
        ];
        for method in methods {
            if !self.slew_capability(method) {
                continue;
            }
            let probes: &[(f64, f64, &str)] = if method.uses_alt_az() {
                &alt_az_probes
            } else {
                &equatorial_probes
            };
            for &(a, b, detail) in probes {
                if self.cancelled() {
                    return;
                }
                let test = format!("{} rejection", method.name());
                match self.invoke_slew_method(method, a, b).await {
                    Ok(()) => {
                        self.error(
                            &test,
                            &format!("accepted illegal coordinates ({})", detail),
                        );
                        let _ = self.device.abort_slew().await;
                        self.wait_for(
                            &test,
                            "aborting illegal slew",
                            WaitFlag::WhileSlewing,
                            self.settings.slew_timeout,
                        )
                        .await;
                    }
                    Err(fault) => match self.codes.classify(&fault) {
                        FaultKind::InvalidValue => {
                            self.ok(&test, &format!("correctly rejected {}", detail))
                        }
                        _ => self.error(
                            &test,
                            &format!(
                                "rejected {} with the wrong fault class: {}",
                                detail, fault
                            ),
                        ),
                    },
                }
            }
        }
    }

    /// German-mount pier-side matrix: four slews at hour angles ±3h and
    /// ±9h with a pole-biased declination, classifying the reported and
    /// destination sides against the pointing-state truth table
    async fn check_pier_side(&self) {
        if self.alignment != Some(AlignmentMode::GermanPolar) {
            self.comment("SideOfPier behaviour", "not a German mount, skipping");
            return;
        }
        if !self.caps.can_slew && !self.caps.can_slew_async {
            self.comment("SideOfPier behaviour", "mount cannot slew, skipping");
            return;
        }
        let latitude = match self.site_latitude.or(self.settings.site_latitude) {
            Some(latitude) if latitude.abs() >= 6.0 => latitude,
            Some(_) => {
                self.comment(
                    "SideOfPier behaviour",
                    "site is too close to the equator for circumpolar probes, skipping",
                );
                return;
            }
            None => {
                self.comment("SideOfPier behaviour", "site latitude unknown, skipping");
                return;
            }
        };

        // Bias toward the visible celestial pole so all four hour angles
        // stay above the horizon
        let dec = (90.0 - latitude.abs() / 2.0).min(85.0) * latitude.signum();

        let mut captured = Vec::with_capacity(PIER_SIDE_HOUR_ANGLES.len());
        for hour_angle in PIER_SIDE_HOUR_ANGLES {
            if self.cancelled() {
                return;
            }
            let lst = self.current_lst().await;
            let ra = condition_ra(lst - hour_angle);

            let destination = match self.device.destination_side_of_pier(ra, dec).await {
                Ok(side) => side,
                Err(fault) => {
                    self.handle_fault("DestinationSideOfPier", Required::Optional, &fault);
                    self.comment("SideOfPier behaviour", "DestinationSideOfPier unavailable, skipping matrix");
                    return;
                }
            };

            let slewed = if self.caps.can_slew_async {
                match self.device.slew_to_coordinates_async(ra, dec).await {
                    Ok(()) => {
                        matches!(
                            self.wait_for(
                                "SideOfPier behaviour",
                                "pier-side probe slew",
                                WaitFlag::WhileSlewing,
                                self.settings.slew_timeout,
                            )
                            .await,
                            WaitOutcome::Completed
                        )
                    }
                    Err(fault) => {
                        self.error(
                            "SideOfPier behaviour",
                            &format!("probe slew to HA {:+}h failed: {}", hour_angle, fault),
                        );
                        false
                    }
                }
            } else {
                match self.device.slew_to_coordinates(ra, dec).await {
                    Ok(()) => true,
                    Err(fault) => {
                        self.error(
                            "SideOfPier behaviour",
                            &format!("probe slew to HA {:+}h failed: {}", hour_angle, fault),
                        );
                        false
                    }
                }
            };
            if !slewed {
                return;
            }
            self.stabilise().await;

            let reported = match self.device.side_of_pier().await {
                Ok(side) => side,
                Err(fault) => {
                    self.handle_fault("SideOfPier", Required::Optional, &fault);
                    self.comment("SideOfPier behaviour", "SideOfPier unavailable, skipping matrix");
                    return;
                }
            };

            self.info(
                "SideOfPier behaviour",
                &format!(
                    "HA {:+}h: SideOfPier {}, DestinationSideOfPier {}",
                    hour_angle, reported, destination
                ),
            );
            captured.push(SideOfPierResult {
                reported,
                destination,
            });
        }

        let &[minus9, minus3, plus3, plus9] = &captured[..] else {
            return;
        };

        match classify_pier_side(
            minus9.reported,
            minus3.reported,
            plus3.reported,
            plus9.reported,
        ) {
            PierSideBehavior::PointingState => self.ok(
                "SideOfPier behaviour",
                "SideOfPier reports pointing state",
            ),
            PierSideBehavior::PhysicalSide => self.issue(
                "SideOfPier behaviour",
                "SideOfPier reports the physical pier side; the protocol requires pointing state",
            ),
            PierSideBehavior::Inconclusive => self.info(
                "SideOfPier behaviour",
                "SideOfPier responses do not match either reporting pattern",
            ),
        }

        match classify_pier_side(
            minus9.destination,
            minus3.destination,
            plus3.destination,
            plus9.destination,
        ) {
            PierSideBehavior::PointingState => self.ok(
                "DestinationSideOfPier behaviour",
                "DestinationSideOfPier reports pointing state",
            ),
            PierSideBehavior::PhysicalSide => self.issue(
                "DestinationSideOfPier behaviour",
                "DestinationSideOfPier reports the physical pier side; the protocol requires pointing state",
            ),
            PierSideBehavior::Inconclusive => self.info(
                "DestinationSideOfPier behaviour",
                "DestinationSideOfPier responses do not match either reporting pattern",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::PierSide::{East, West};

    #[test]
    fn consistent_halves_classify_as_pointing_state() {
        assert_eq!(
            classify_pier_side(West, West, East, East),
            PierSideBehavior::PointingState
        );
        assert_eq!(
            classify_pier_side(East, East, West, West),
            PierSideBehavior::PointingState
        );
    }

    #[test]
    fn crossed_pairs_classify_as_physical_side() {
        assert_eq!(
            classify_pier_side(East, West, East, West),
            PierSideBehavior::PhysicalSide
        );
        assert_eq!(
            classify_pier_side(West, East, West, East),
            PierSideBehavior::PhysicalSide
        );
    }

    #[test]
    fn uniform_or_mixed_responses_are_inconclusive() {
        assert_eq!(
            classify_pier_side(East, East, East, East),
            PierSideBehavior::Inconclusive
        );
        assert_eq!(
            classify_pier_side(East, West, West, East),
            PierSideBehavior::Inconclusive
        );
    }
}
