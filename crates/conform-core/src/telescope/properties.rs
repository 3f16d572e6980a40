//! Telescope property checks
//!
//! Data-driven where the checks are uniform: one table row per float
//! property with its capability gate, legal domain and policy. The
//! stateful checks (site geometry writes, target round trips, tracking
//! toggles) follow as explicit routines because they thread values into
//! the per-run context for later tests.

use crate::device::{DriveRate, TelescopeDevice};
use crate::fault::{
    invalid_value_probe_verdict, value_not_set_probe_verdict, DeviceResult, Required,
};
use crate::transform::{dec_difference_arcsec, degrees_to_dms, hours_to_hms, ra_difference_arcsec};

use super::TelescopeTester;

/// Round-trip tolerance for target coordinates, arc-seconds
pub(crate) const TARGET_TOLERANCE_ARCSEC: f64 = 10.0;

/// Acceptable drift between device and computed sidereal time, seconds of time
const SIDEREAL_TOLERANCE_SECONDS: f64 = 120.0;

/// Selector for one float property; dispatched by [`TelescopeTester::read_float`]
#[derive(Debug, Clone, Copy)]
pub(crate) enum FloatProp {
    Altitude,
    Azimuth,
    Declination,
    RightAscension,
    SiderealTime,
    ApertureArea,
    ApertureDiameter,
    FocalLength,
    GuideRateDeclination,
    GuideRateRightAscension,
    SiteElevation,
    SiteLatitude,
    SiteLongitude,
}

/// Legal domain for a float property value
#[derive(Debug, Clone, Copy)]
pub(crate) enum Domain {
    /// min ≤ v ≤ max
    Inclusive(f64, f64),
    /// min ≤ v < max
    HalfOpen(f64, f64),
    /// v > 0
    Positive,
}

impl Domain {
    pub(crate) fn contains(&self, value: f64) -> bool {
        match *self {
            Domain::Inclusive(min, max) => value >= min && value <= max,
            Domain::HalfOpen(min, max) => value >= min && value < max,
            Domain::Positive => value > 0.0,
        }
    }

    fn describe(&self) -> String {
        match *self {
            Domain::Inclusive(min, max) => format!("[{}, {}]", min, max),
            Domain::HalfOpen(min, max) => format!("[{}, {})", min, max),
            Domain::Positive => "(0, inf)".to_string(),
        }
    }
}

/// One row of the float property table
struct FloatPropertyCheck {
    name: &'static str,
    prop: FloatProp,
    required: Required,
    domain: Domain,
}

const FLOAT_PROPERTIES: &[FloatPropertyCheck] = &[
    FloatPropertyCheck {
        name: "Altitude",
        prop: FloatProp::Altitude,
        required: Required::Optional,
        domain: Domain::Inclusive(0.0, 90.0),
    },
    FloatPropertyCheck {
        name: "Azimuth",
        prop: FloatProp::Azimuth,
        required: Required::Optional,
        domain: Domain::HalfOpen(0.0, 360.0),
    },
    FloatPropertyCheck {
        name: "Declination",
        prop: FloatProp::Declination,
        required: Required::Mandatory,
        domain: Domain::Inclusive(-90.0, 90.0),
    },
    FloatPropertyCheck {
        name: "RightAscension",
        prop: FloatProp::RightAscension,
        required: Required::Mandatory,
        domain: Domain::HalfOpen(0.0, 24.0),
    },
    FloatPropertyCheck {
        name: "SiderealTime",
        prop: FloatProp::SiderealTime,
        required: Required::Mandatory,
        domain: Domain::HalfOpen(0.0, 24.0),
    },
    FloatPropertyCheck {
        name: "ApertureArea",
        prop: FloatProp::ApertureArea,
        required: Required::Optional,
        domain: Domain::Positive,
    },
    FloatPropertyCheck {
        name: "ApertureDiameter",
        prop: FloatProp::ApertureDiameter,
        required: Required::Optional,
        domain: Domain::Positive,
    },
    FloatPropertyCheck {
        name: "FocalLength",
        prop: FloatProp::FocalLength,
        required: Required::Optional,
        domain: Domain::Positive,
    },
    FloatPropertyCheck {
        name: "GuideRateDeclination",
        prop: FloatProp::GuideRateDeclination,
        required: Required::Optional,
        domain: Domain::Inclusive(0.0, f64::MAX),
    },
    FloatPropertyCheck {
        name: "GuideRateRightAscension",
        prop: FloatProp::GuideRateRightAscension,
        required: Required::Optional,
        domain: Domain::Inclusive(0.0, f64::MAX),
    },
    FloatPropertyCheck {
        name: "SiteElevation",
        prop: FloatProp::SiteElevation,
        required: Required::Optional,
        domain: Domain::Inclusive(-300.0, 10_000.0),
    },
    FloatPropertyCheck {
        name: "SiteLatitude",
        prop: FloatProp::SiteLatitude,
        required: Required::Optional,
        domain: Domain::Inclusive(-90.0, 90.0),
    },
    FloatPropertyCheck {
        name: "SiteLongitude",
        prop: FloatProp::SiteLongitude,
        required: Required::Optional,
        domain: Domain::Inclusive(-180.0, 180.0),
    },
];

impl TelescopeTester {
    async fn read_float(&self, prop: FloatProp) -> DeviceResult<f64> {
        let device = self.device.as_ref();
        match prop {
            FloatProp::Altitude => device.altitude().await,
            FloatProp::Azimuth => device.azimuth().await,
            FloatProp::Declination => device.declination().await,
            FloatProp::RightAscension => device.right_ascension().await,
            FloatProp::SiderealTime => device.sidereal_time().await,
            FloatProp::ApertureArea => device.aperture_area().await,
            FloatProp::ApertureDiameter => device.aperture_diameter().await,
            FloatProp::FocalLength => device.focal_length().await,
            FloatProp::GuideRateDeclination => device.guide_rate_declination().await,
            FloatProp::GuideRateRightAscension => device.guide_rate_right_ascension().await,
            FloatProp::SiteElevation => device.site_elevation().await,
            FloatProp::SiteLatitude => device.site_latitude().await,
            FloatProp::SiteLongitude => device.site_longitude().await,
        }
    }

    /// Read one float property and validate its domain; returns the value
    /// when the read succeeded so callers can stash cross-check state
    async fn check_float_property(&self, check: &FloatPropertyCheck) -> Option<f64> {
        match self.read_float(check.prop).await {
            Ok(value) => {
                if check.domain.contains(value) {
                    self.ok(check.name, &format!("{}", value));
                } else {
                    self.issue(
                        check.name,
                        &format!("{} is outside {}", value, check.domain.describe()),
                    );
                }
                Some(value)
            }
            Err(fault) => {
                self.handle_fault(check.name, check.required, &fault);
                None
            }
        }
    }

    pub(crate) async fn check_properties(&mut self) {
        // Mount geometry first; the pier-side tests key off it
        match self.device.alignment_mode().await {
            Ok(mode) => {
                self.alignment = Some(mode);
                self.ok("AlignmentMode", &mode.to_string());
            }
            Err(fault) => self.handle_fault("AlignmentMode", Required::Mandatory, &fault),
        }
        match self.device.equatorial_system().await {
            Ok(system) => self.ok("EquatorialSystem", &format!("{:?}", system)),
            Err(fault) => self.handle_fault("EquatorialSystem", Required::Mandatory, &fault),
        }

        let mut sidereal = None;
        for check in FLOAT_PROPERTIES {
            if self.cancelled() {
                return;
            }
            let value = self.check_float_property(check).await;
            match check.prop {
                FloatProp::SiderealTime => sidereal = value,
                FloatProp::SiteLatitude => self.site_latitude = value,
                FloatProp::SiteLongitude => self.site_longitude = value,
                _ => {}
            }
        }

        if let Some(observed) = sidereal {
            self.cross_check_sidereal_time(observed);
        }

        self.check_bool_properties().await;
        self.check_rate_offsets().await;
        self.check_site_writes().await;
        self.check_targets().await;
        self.check_tracking().await;
        self.check_slew_settle_time().await;
        self.check_does_refraction().await;
        self.check_side_of_pier_read().await;
        self.check_utc_date().await;
        self.check_tracking_rate_property().await;
        self.check_tracking_rates_collection().await;
        self.check_axis_rates_collections().await;
    }

    /// Compare the device clock against a computed estimate
    fn cross_check_sidereal_time(&self, observed: f64) {
        let longitude = match self.site_longitude.or(self.settings.site_longitude) {
            Some(longitude) => longitude,
            None => {
                self.info(
                    "SiderealTime",
                    "site longitude unknown, skipping clock cross-check",
                );
                return;
            }
        };
        let expected = crate::transform::local_sidereal_time(chrono::Utc::now(), longitude);
        // Difference in seconds of time, wraparound-corrected
        let delta_seconds = ra_difference_arcsec(observed, expected) / 15.0;
        if delta_seconds <= SIDEREAL_TOLERANCE_SECONDS {
            self.ok(
                "SiderealTime",
                &format!("agrees with computed LST within {:.1}s", delta_seconds),
            );
        } else {
            self.issue(
                "SiderealTime",
                &format!(
                    "differs from computed LST by {:.0}s (device {:.4}h, computed {:.4}h)",
                    delta_seconds, observed, expected
                ),
            );
        }
    }

    async fn check_bool_properties(&self) {
        match self.device.at_home().await {
            Ok(value) => self.ok("AtHome", &value.to_string()),
            Err(fault) => self.handle_fault("AtHome", Required::Mandatory, &fault),
        }
        match self.device.at_park().await {
            Ok(value) => self.ok("AtPark", &value.to_string()),
            Err(fault) => self.handle_fault("AtPark", Required::Mandatory, &fault),
        }
        match self.device.slewing().await {
            Ok(true) => self.issue("Slewing", "mount reports slewing while idle"),
            Ok(false) => self.ok("Slewing", "false"),
            Err(fault) => self.handle_fault("Slewing", Required::Mandatory, &fault),
        }
        let pulse_policy = if self.caps.can_pulse_guide {
            Required::MustBeImplemented
        } else {
            Required::Optional
        };
        match self.device.is_pulse_guiding().await {
            Ok(value) => self.ok("IsPulseGuiding", &value.to_string()),
            Err(fault) => self.handle_fault("IsPulseGuiding", pulse_policy, &fault),
        }
    }

    /// Rate offsets must read exactly zero when the matching can-set
    /// capability is false; writes follow both sides of the gate contract
    async fn check_rate_offsets(&self) {
        self.check_rate_offset(
            "DeclinationRate",
            self.caps.can_set_declination_rate,
            self.device.declination_rate().await,
        );
        if self.caps.can_set_declination_rate {
            match self.device.set_declination_rate(0.0).await {
                Ok(()) => self.ok("DeclinationRate write", "accepted 0.0"),
                Err(fault) => {
                    self.handle_fault("DeclinationRate write", Required::MustBeImplemented, &fault)
                }
            }
        } else {
            match self.device.set_declination_rate(0.0).await {
                Ok(()) => self.issue(
                    "DeclinationRate write",
                    "write succeeded although CanSetDeclinationRate is false",
                ),
                Err(fault) => self.handle_fault(
                    "DeclinationRate write",
                    Required::MustNotBeImplemented,
                    &fault,
                ),
            }
        }

        self.check_rate_offset(
            "RightAscensionRate",
            self.caps.can_set_right_ascension_rate,
            self.device.right_ascension_rate().await,
        );
        if self.caps.can_set_right_ascension_rate {
            match self.device.set_right_ascension_rate(0.0).await {
                Ok(()) => self.ok("RightAscensionRate write", "accepted 0.0"),
                Err(fault) => self.handle_fault(
                    "RightAscensionRate write",
                    Required::MustBeImplemented,
                    &fault,
                ),
            }
        } else {
            match self.device.set_right_ascension_rate(0.0).await {
                Ok(()) => self.issue(
                    "RightAscensionRate write",
                    "write succeeded although CanSetRightAscensionRate is false",
                ),
                Err(fault) => self.handle_fault(
                    "RightAscensionRate write",
                    Required::MustNotBeImplemented,
                    &fault,
                ),
            }
        }

        // Guide rate writes share the CanSetGuideRates gate
        if self.caps.can_set_guide_rates {
            if let Ok(rate) = self.device.guide_rate_declination().await {
                match self.device.set_guide_rate_declination(rate).await {
                    Ok(()) => self.ok("GuideRateDeclination write", "accepted current value"),
                    Err(fault) => self.handle_fault(
                        "GuideRateDeclination write",
                        Required::MustBeImplemented,
                        &fault,
                    ),
                }
            }
            let result = self.device.set_guide_rate_declination(-1.0).await;
            let (severity, message) = invalid_value_probe_verdict(
                "GuideRateDeclination write",
                "-1.0",
                result.as_ref().map(|_| ()),
                &self.codes,
            );
            self.log("GuideRateDeclination write", severity, &message);
        } else {
            match self.device.set_guide_rate_declination(0.004).await {
                Ok(()) => self.issue(
                    "GuideRateDeclination write",
                    "write succeeded although CanSetGuideRates is false",
                ),
                Err(fault) => self.handle_fault(
                    "GuideRateDeclination write",
                    Required::MustNotBeImplemented,
                    &fault,
                ),
            }
        }
    }

    fn check_rate_offset(&self, name: &str, settable: bool, reading: DeviceResult<f64>) {
        match reading {
            Ok(value) if !settable && value != 0.0 => self.issue(
                name,
                &format!("reads {} although the rate is not settable (must be 0)", value),
            ),
            Ok(value) if value < 0.0 => {
                self.issue(name, &format!("reads negative rate {}", value))
            }
            Ok(value) => self.ok(name, &format!("{}", value)),
            Err(fault) => self.handle_fault(name, Required::Mandatory, &fault),
        }
    }

    /// Out-of-range site writes must be rejected; in-range writes must
    /// round-trip. Each property is restored to the value read earlier.
    async fn check_site_writes(&self) {
        for &bad in &[91.0, -91.0] {
            let result = self.device.set_site_latitude(bad).await;
            let (severity, message) = invalid_value_probe_verdict(
                "SiteLatitude write",
                &bad.to_string(),
                result.as_ref().map(|_| ()),
                &self.codes,
            );
            self.log("SiteLatitude write", severity, &message);
        }
        if let Some(latitude) = self.site_latitude {
            match self.device.set_site_latitude(latitude).await {
                Ok(()) => match self.device.site_latitude().await {
                    Ok(readback) if (readback - latitude).abs() < 1e-6 => self.ok(
                        "SiteLatitude write",
                        &format!("round-tripped {:.4}", latitude),
                    ),
                    Ok(readback) => self.issue(
                        "SiteLatitude write",
                        &format!("wrote {:.6} but read back {:.6}", latitude, readback),
                    ),
                    Err(fault) => {
                        self.handle_fault("SiteLatitude", Required::Mandatory, &fault)
                    }
                },
                Err(fault) => {
                    self.handle_fault("SiteLatitude write", Required::Optional, &fault)
                }
            }
        }

        for &bad in &[181.0, -181.0] {
            let result = self.device.set_site_longitude(bad).await;
            let (severity, message) = invalid_value_probe_verdict(
                "SiteLongitude write",
                &bad.to_string(),
                result.as_ref().map(|_| ()),
                &self.codes,
            );
            self.log("SiteLongitude write", severity, &message);
        }
        if let Some(longitude) = self.site_longitude {
            match self.device.set_site_longitude(longitude).await {
                Ok(()) => match self.device.site_longitude().await {
                    Ok(readback) if (readback - longitude).abs() < 1e-6 => self.ok(
                        "SiteLongitude write",
                        &format!("round-tripped {:.4}", longitude),
                    ),
                    Ok(readback) => self.issue(
                        "SiteLongitude write",
                        &format!("wrote {:.6} but read back {:.6}", longitude, readback),
                    ),
                    Err(fault) => {
                        self.handle_fault("SiteLongitude", Required::Mandatory, &fault)
                    }
                },
                Err(fault) => {
                    self.handle_fault("SiteLongitude write", Required::Optional, &fault)
                }
            }
        }

        for &bad in &[10_001.0, -301.0] {
            let result = self.device.set_site_elevation(bad).await;
            let (severity, message) = invalid_value_probe_verdict(
                "SiteElevation write",
                &bad.to_string(),
                result.as_ref().map(|_| ()),
                &self.codes,
            );
            self.log("SiteElevation write", severity, &message);
        }
        if let Ok(elevation) = self.device.site_elevation().await {
            match self.device.set_site_elevation(elevation).await {
                Ok(()) => self.ok(
                    "SiteElevation write",
                    &format!("round-tripped {:.1}", elevation),
                ),
                Err(fault) => {
                    self.handle_fault("SiteElevation write", Required::Optional, &fault)
                }
            }
        }
    }

    /// Target properties: value-not-set on first read, rejection of
    /// out-of-domain writes, then a write/read-back inside tolerance
    async fn check_targets(&self) {
        let ra_read = self.device.target_right_ascension().await;
        let (severity, message) = value_not_set_probe_verdict(
            "TargetRightAscension",
            ra_read.as_ref().copied(),
            &self.codes,
        );
        self.log("TargetRightAscension", severity, &message);

        let dec_read = self.device.target_declination().await;
        let (severity, message) = value_not_set_probe_verdict(
            "TargetDeclination",
            dec_read.as_ref().copied(),
            &self.codes,
        );
        self.log("TargetDeclination", severity, &message);

        for &bad_ra in &[-1.0, 24.0] {
            let result = self.device.set_target_right_ascension(bad_ra).await;
            let (severity, message) = invalid_value_probe_verdict(
                "TargetRightAscension write",
                &bad_ra.to_string(),
                result.as_ref().map(|_| ()),
                &self.codes,
            );
            self.log("TargetRightAscension write", severity, &message);
        }
        for &bad_dec in &[-91.0, 91.0] {
            let result = self.device.set_target_declination(bad_dec).await;
            let (severity, message) = invalid_value_probe_verdict(
                "TargetDeclination write",
                &bad_dec.to_string(),
                result.as_ref().map(|_| ()),
                &self.codes,
            );
            self.log("TargetDeclination write", severity, &message);
        }

        let (ra, dec) = self.safe_equatorial_target().await;

        match self.device.set_target_right_ascension(ra).await {
            Ok(()) => match self.device.target_right_ascension().await {
                Ok(readback) => {
                    let delta = ra_difference_arcsec(readback, ra);
                    if delta <= TARGET_TOLERANCE_ARCSEC {
                        self.ok(
                            "TargetRightAscension",
                            &format!("round-tripped {} within {:.1}\"", hours_to_hms(ra), delta),
                        );
                    } else {
                        // The protocol requires the readback to match
                        self.error(
                            "TargetRightAscension",
                            &format!(
                                "wrote {:.6}h, read back {:.6}h ({:.1}\" apart)",
                                ra, readback, delta
                            ),
                        );
                    }
                }
                Err(fault) => {
                    self.handle_fault("TargetRightAscension", Required::Mandatory, &fault)
                }
            },
            Err(fault) => {
                self.handle_fault("TargetRightAscension write", Required::Optional, &fault)
            }
        }

        match self.device.set_target_declination(dec).await {
            Ok(()) => match self.device.target_declination().await {
                Ok(readback) => {
                    let delta = dec_difference_arcsec(readback, dec);
                    if delta <= TARGET_TOLERANCE_ARCSEC {
                        self.ok(
                            "TargetDeclination",
                            &format!("round-tripped {} within {:.1}\"", degrees_to_dms(dec), delta),
                        );
                    } else {
                        self.error(
                            "TargetDeclination",
                            &format!(
                                "wrote {:.6}, read back {:.6} ({:.1}\" apart)",
                                dec, readback, delta
                            ),
                        );
                    }
                }
                Err(fault) => self.handle_fault("TargetDeclination", Required::Mandatory, &fault),
            },
            Err(fault) => self.handle_fault("TargetDeclination write", Required::Optional, &fault),
        }
    }

    async fn check_tracking(&self) {
        let original = match self.device.tracking().await {
            Ok(value) => {
                self.ok("Tracking", &value.to_string());
                Some(value)
            }
            Err(fault) => {
                self.handle_fault("Tracking", Required::Mandatory, &fault);
                None
            }
        };

        if self.caps.can_set_tracking {
            let Some(original) = original else { return };
            match self.device.set_tracking(!original).await {
                Ok(()) => match self.device.tracking().await {
                    Ok(value) if value == !original => {
                        self.ok("Tracking write", &format!("toggled to {}", value))
                    }
                    Ok(value) => self.issue(
                        "Tracking write",
                        &format!("wrote {} but read back {}", !original, value),
                    ),
                    Err(fault) => self.handle_fault("Tracking", Required::Mandatory, &fault),
                },
                Err(fault) => {
                    self.handle_fault("Tracking write", Required::MustBeImplemented, &fault)
                }
            }
            if let Err(fault) = self.device.set_tracking(original).await {
                self.error("Tracking write", &format!("failed to restore: {}", fault));
            }
        } else {
            match self.device.set_tracking(true).await {
                Ok(()) => self.issue(
                    "Tracking write",
                    "write succeeded although CanSetTracking is false",
                ),
                Err(fault) => {
                    self.handle_fault("Tracking write", Required::MustNotBeImplemented, &fault)
                }
            }
        }
    }

    async fn check_slew_settle_time(&self) {
        match self.device.slew_settle_time().await {
            Ok(value) if value < 0 => {
                self.issue("SlewSettleTime", &format!("negative value {}", value))
            }
            Ok(value) => self.ok("SlewSettleTime", &format!("{}s", value)),
            Err(fault) => self.handle_fault("SlewSettleTime", Required::Optional, &fault),
        }

        let result = self.device.set_slew_settle_time(-1).await;
        let (severity, message) = invalid_value_probe_verdict(
            "SlewSettleTime write",
            "-1",
            result.as_ref().map(|_| ()),
            &self.codes,
        );
        self.log("SlewSettleTime write", severity, &message);

        match self.device.set_slew_settle_time(0).await {
            Ok(()) => self.ok("SlewSettleTime write", "accepted 0"),
            Err(fault) => self.handle_fault("SlewSettleTime write", Required::Optional, &fault),
        }
    }

    async fn check_does_refraction(&self) {
        let original = match self.device.does_refraction().await {
            Ok(value) => {
                self.ok("DoesRefraction", &value.to_string());
                Some(value)
            }
            Err(fault) => {
                self.handle_fault("DoesRefraction", Required::Optional, &fault);
                None
            }
        };
        let Some(original) = original else { return };

        match self.device.set_does_refraction(!original).await {
            Ok(()) => {
                self.ok("DoesRefraction write", &format!("toggled to {}", !original));
                if let Err(fault) = self.device.set_does_refraction(original).await {
                    self.error(
                        "DoesRefraction write",
                        &format!("failed to restore: {}", fault),
                    );
                }
            }
            Err(fault) => self.handle_fault("DoesRefraction write", Required::Optional, &fault),
        }
    }

    async fn check_side_of_pier_read(&self) {
        match self.device.side_of_pier().await {
            Ok(side) => self.ok("SideOfPier", &side.to_string()),
            Err(fault) => self.handle_fault("SideOfPier", Required::Optional, &fault),
        }

        let Ok(side) = self.device.side_of_pier().await else {
            return;
        };
        if self.caps.can_set_pier_side {
            // Writing the current side must be accepted without a flip
            match self.device.set_side_of_pier(side).await {
                Ok(()) => self.ok("SideOfPier write", "accepted the current side"),
                Err(fault) => {
                    self.handle_fault("SideOfPier write", Required::MustBeImplemented, &fault)
                }
            }
        } else {
            match self.device.set_side_of_pier(side).await {
                Ok(()) => self.issue(
                    "SideOfPier write",
                    "write succeeded although CanSetPierSide is false",
                ),
                Err(fault) => self.handle_fault(
                    "SideOfPier write",
                    Required::MustNotBeImplemented,
                    &fault,
                ),
            }
        }
    }

    async fn check_utc_date(&self) {
        let observed = match self.device.utc_date().await {
            Ok(value) => {
                if chrono::DateTime::parse_from_rfc3339(&value).is_ok() {
                    self.ok("UTCDate", &value);
                    Some(value)
                } else {
                    self.issue("UTCDate", &format!("unparseable date string: {}", value));
                    None
                }
            }
            Err(fault) => {
                self.handle_fault("UTCDate", Required::Mandatory, &fault);
                None
            }
        };

        // Writing the value just read must either succeed or signal
        // not-implemented; it must not change the clock semantics
        if let Some(value) = observed {
            match self.device.set_utc_date(value).await {
                Ok(()) => self.ok("UTCDate write", "accepted current date"),
                Err(fault) => self.handle_fault("UTCDate write", Required::Optional, &fault),
            }
        }
    }

    async fn check_tracking_rate_property(&self) {
        let current = match self.device.tracking_rate().await {
            Ok(rate) => {
                self.ok("TrackingRate", &rate.to_string());
                Some(rate)
            }
            Err(fault) => {
                self.handle_fault("TrackingRate", Required::Mandatory, &fault);
                None
            }
        };
        let Some(current) = current else { return };

        // Write each advertised rate and read it back, then restore
        let advertised = match self.device.tracking_rates().await {
            Ok(rates) if !rates.is_empty() => rates,
            _ => vec![DriveRate::Sidereal],
        };
        for rate in advertised {
            match self.device.set_tracking_rate(rate).await {
                Ok(()) => match self.device.tracking_rate().await {
                    Ok(readback) if readback == rate => {
                        self.ok("TrackingRate write", &format!("round-tripped {}", rate))
                    }
                    Ok(readback) => self.issue(
                        "TrackingRate write",
                        &format!("wrote {} but read back {}", rate, readback),
                    ),
                    Err(fault) => self.handle_fault("TrackingRate", Required::Mandatory, &fault),
                },
                Err(fault) => self.handle_fault("TrackingRate write", Required::Optional, &fault),
            }
        }
        if let Err(fault) = self.device.set_tracking_rate(current).await {
            self.info(
                "TrackingRate write",
                &format!("failed to restore {}: {}", current, fault),
            );
        }
    }
}
