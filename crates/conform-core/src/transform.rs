//! Coordinate and formatting utilities
//!
//! Pure functions shared by the telescope and dome testers: sexagesimal
//! display strings, range conditioning for right ascension / hour angle /
//! azimuth, a sidereal time estimate, and wraparound-aware angular
//! differences used for tolerance checks.

use chrono::{DateTime, Utc};

/// Days between the Unix epoch and J2000.0 (2000-01-01T12:00:00 UTC)
const UNIX_EPOCH_TO_J2000_DAYS: f64 = 10_957.5;

/// Render hours as "HH:MM:SS.ss"
pub fn hours_to_hms(hours: f64) -> String {
    sexagesimal(hours, 2)
}

/// Render degrees as a signed "sDDD:MM:SS.ss"
pub fn degrees_to_dms(degrees: f64) -> String {
    let sign = if degrees < 0.0 { "-" } else { "+" };
    format!("{}{}", sign, sexagesimal(degrees.abs(), 3))
}

fn sexagesimal(value: f64, whole_width: usize) -> String {
    let total_seconds = value.abs() * 3600.0;
    let whole = (total_seconds / 3600.0).floor();
    let minutes = ((total_seconds - whole * 3600.0) / 60.0).floor();
    let seconds = total_seconds - whole * 3600.0 - minutes * 60.0;
    format!(
        "{:0width$}:{:02}:{:05.2}",
        whole as u32,
        minutes as u32,
        seconds,
        width = whole_width
    )
}

/// Fold right ascension into [0, 24) hours
pub fn condition_ra(hours: f64) -> f64 {
    let folded = hours.rem_euclid(24.0);
    // rem_euclid can return exactly 24.0 for tiny negative inputs
    if folded >= 24.0 {
        folded - 24.0
    } else {
        folded
    }
}

/// Fold an hour angle into [-12, +12) hours
pub fn condition_ha(hours: f64) -> f64 {
    let folded = (hours + 12.0).rem_euclid(24.0);
    if folded >= 24.0 {
        -12.0
    } else {
        folded - 12.0
    }
}

/// Fold an azimuth into [0, 360) degrees
pub fn range_azimuth(degrees: f64) -> f64 {
    let folded = degrees.rem_euclid(360.0);
    if folded >= 360.0 {
        folded - 360.0
    } else {
        folded
    }
}

/// Local apparent sidereal time estimate, in hours [0, 24)
///
/// Linear GMST expansion about J2000.0; accurate to well under a second of
/// time over the tool's lifetime, which is far inside the tolerance this
/// estimate is compared against.
pub fn local_sidereal_time(utc: DateTime<Utc>, site_longitude_deg: f64) -> f64 {
    let days_since_j2000 =
        utc.timestamp_millis() as f64 / 86_400_000.0 - UNIX_EPOCH_TO_J2000_DAYS;
    let gmst_degrees = 280.460_618_37 + 360.985_647_366_29 * days_since_j2000;
    condition_ra(gmst_degrees / 15.0 + site_longitude_deg / 15.0)
}

/// Absolute right ascension difference in arc-seconds, wraparound-corrected
///
/// If the raw difference exceeds 12 hours the short way around is used, so
/// RA values straddling 0h/24h compare as nearly equal.
pub fn ra_difference_arcsec(ra1_hours: f64, ra2_hours: f64) -> f64 {
    let mut diff = (ra1_hours - ra2_hours).abs();
    if diff > 12.0 {
        diff = 24.0 - diff;
    }
    diff * 15.0 * 3600.0
}

/// Absolute declination difference in arc-seconds
pub fn dec_difference_arcsec(dec1_deg: f64, dec2_deg: f64) -> f64 {
    (dec1_deg - dec2_deg).abs() * 3600.0
}

/// Absolute circular azimuth difference in degrees, in [0, 180]
pub fn azimuth_difference_deg(az1_deg: f64, az2_deg: f64) -> f64 {
    let diff = (az1_deg - az2_deg).abs() % 360.0;
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

/// Absolute altitude difference in arc-seconds
pub fn alt_difference_arcsec(alt1_deg: f64, alt2_deg: f64) -> f64 {
    (alt1_deg - alt2_deg).abs() * 3600.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn hms_renders_whole_and_fractional_parts() {
        assert_eq!(hours_to_hms(0.0), "00:00:00.00");
        assert_eq!(hours_to_hms(12.5), "12:30:00.00");
        assert_eq!(hours_to_hms(23.999), "23:59:56.40");
    }

    #[test]
    fn dms_renders_sign() {
        assert_eq!(degrees_to_dms(45.5), "+045:30:00.00");
        assert_eq!(degrees_to_dms(-0.5), "-000:30:00.00");
    }

    #[test]
    fn condition_ra_folds_negative_and_large_values() {
        assert_eq!(condition_ra(25.0), 1.0);
        assert_eq!(condition_ra(-1.0), 23.0);
        assert_eq!(condition_ra(0.0), 0.0);
        assert_eq!(condition_ra(24.0), 0.0);
    }

    #[test]
    fn condition_ha_folds_into_signed_half_day() {
        assert_eq!(condition_ha(13.0), -11.0);
        assert_eq!(condition_ha(-13.0), 11.0);
        assert_eq!(condition_ha(3.0), 3.0);
        assert_eq!(condition_ha(-9.0), -9.0);
    }

    #[test]
    fn ra_difference_wraps_across_zero() {
        // 23.99h and 0.01h are 0.02h apart the short way, not 23.98h
        let arcsec = ra_difference_arcsec(23.99, 0.01);
        assert!((arcsec - 0.02 * 15.0 * 3600.0).abs() < 1e-6, "{arcsec}");
        assert!(arcsec < 1200.0);
    }

    #[test]
    fn ra_difference_without_wrap() {
        let arcsec = ra_difference_arcsec(12.0, 12.001);
        assert!((arcsec - 54.0).abs() < 1e-6, "{arcsec}");
    }

    #[test]
    fn dec_difference_is_linear() {
        assert!((dec_difference_arcsec(45.0, 45.001) - 3.6).abs() < 1e-9);
    }

    #[test]
    fn azimuth_difference_wraps_across_north() {
        assert!((azimuth_difference_deg(359.0, 1.0) - 2.0).abs() < 1e-9);
        assert!((azimuth_difference_deg(10.0, 350.0) - 20.0).abs() < 1e-9);
        assert!((azimuth_difference_deg(90.0, 270.0) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn sidereal_time_reference_value() {
        // 2000-01-01T12:00:00 UTC at Greenwich: GMST is ~18.697h
        let utc = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        let lst = local_sidereal_time(utc, 0.0);
        assert!((lst - 18.697_374).abs() < 0.01, "{lst}");
    }

    #[test]
    fn sidereal_time_shifts_with_longitude() {
        let utc = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let greenwich = local_sidereal_time(utc, 0.0);
        let east_15 = local_sidereal_time(utc, 15.0);
        assert!((condition_ra(east_15 - greenwich) - 1.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn conditioned_ra_is_in_range(hours in -100.0..100.0f64) {
            let r = condition_ra(hours);
            prop_assert!((0.0..24.0).contains(&r));
        }

        #[test]
        fn conditioned_ha_is_in_range(hours in -100.0..100.0f64) {
            let h = condition_ha(hours);
            prop_assert!((-12.0..12.0).contains(&h));
        }

        #[test]
        fn azimuth_is_in_range(degrees in -1000.0..1000.0f64) {
            let a = range_azimuth(degrees);
            prop_assert!((0.0..360.0).contains(&a));
        }

        #[test]
        fn ra_difference_is_symmetric_and_bounded(
            a in 0.0..24.0f64,
            b in 0.0..24.0f64,
        ) {
            let d1 = ra_difference_arcsec(a, b);
            let d2 = ra_difference_arcsec(b, a);
            prop_assert!((d1 - d2).abs() < 1e-6);
            prop_assert!(d1 <= 12.0 * 15.0 * 3600.0 + 1e-6);
        }

        #[test]
        fn azimuth_difference_is_bounded(
            a in 0.0..360.0f64,
            b in 0.0..360.0f64,
        ) {
            let d = azimuth_difference_deg(a, b);
            prop_assert!((0.0..=180.0).contains(&d));
        }
    }
}
