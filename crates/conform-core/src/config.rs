//! Engine settings
//!
//! Immutable for the duration of a run. Durations deserialize from
//! humantime strings ("90s", "5m"); every field has a default so a config
//! file only needs to name what it overrides.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeouts, tolerances and test-group toggles for a conformance run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Maximum wait for a telescope slew to settle
    #[serde(with = "humantime_serde", default = "default_slew_timeout")]
    pub slew_timeout: Duration,

    /// Maximum wait for a dome shutter transition
    #[serde(with = "humantime_serde", default = "default_shutter_timeout")]
    pub shutter_timeout: Duration,

    /// Maximum wait for a dome azimuth or altitude slew
    #[serde(with = "humantime_serde", default = "default_dome_azimuth_timeout")]
    pub dome_azimuth_timeout: Duration,

    /// Pause after motion stops before reading positions back
    #[serde(with = "humantime_serde", default = "default_stabilisation_wait")]
    pub stabilisation_wait: Duration,

    /// Sleep between polls of a moving-state flag
    #[serde(with = "humantime_serde", default = "default_poll_interval")]
    pub poll_interval: Duration,

    /// Wall-clock window for each performance probe
    #[serde(with = "humantime_serde", default = "default_performance_window")]
    pub performance_window: Duration,

    /// Run the call-rate smoke tests
    #[serde(default = "default_true")]
    pub run_performance_tests: bool,

    /// Run the German-mount pier-side flip matrix
    #[serde(default = "default_true")]
    pub run_pier_side_tests: bool,

    /// Allow tests that physically move the device (slews, park, home)
    #[serde(default = "default_true")]
    pub destructive_tests: bool,

    /// Open the dome shutter before testing azimuth motion
    #[serde(default)]
    pub open_shutter_before_tests: bool,

    /// Offset applied by the sync verification tests, degrees
    #[serde(default = "default_sync_offset")]
    pub sync_offset_degrees: f64,

    /// Site latitude fallback when the device cannot report one, degrees
    #[serde(default)]
    pub site_latitude: Option<f64>,

    /// Site longitude fallback when the device cannot report one, degrees
    #[serde(default)]
    pub site_longitude: Option<f64>,
}

fn default_slew_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_shutter_timeout() -> Duration {
    Duration::from_secs(240)
}

fn default_dome_azimuth_timeout() -> Duration {
    Duration::from_secs(240)
}

fn default_stabilisation_wait() -> Duration {
    Duration::from_secs(2)
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_performance_window() -> Duration {
    Duration::from_secs(3)
}

fn default_sync_offset() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            slew_timeout: default_slew_timeout(),
            shutter_timeout: default_shutter_timeout(),
            dome_azimuth_timeout: default_dome_azimuth_timeout(),
            stabilisation_wait: default_stabilisation_wait(),
            poll_interval: default_poll_interval(),
            performance_window: default_performance_window(),
            run_performance_tests: true,
            run_pier_side_tests: true,
            destructive_tests: true,
            open_shutter_before_tests: false,
            sync_offset_degrees: default_sync_offset(),
            site_latitude: None,
            site_longitude: None,
        }
    }
}

impl Settings {
    /// Settings tuned for tests against the in-memory simulators
    pub fn fast() -> Self {
        Self {
            slew_timeout: Duration::from_secs(5),
            shutter_timeout: Duration::from_secs(5),
            dome_azimuth_timeout: Duration::from_secs(5),
            stabilisation_wait: Duration::from_millis(5),
            poll_interval: Duration::from_millis(5),
            performance_window: Duration::from_millis(50),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_compat_values() {
        let settings = Settings::default();
        assert_eq!(settings.slew_timeout, Duration::from_secs(300));
        assert_eq!(settings.shutter_timeout, Duration::from_secs(240));
        assert_eq!(settings.stabilisation_wait, Duration::from_secs(2));
        assert!(settings.destructive_tests);
    }

    #[test]
    fn durations_deserialize_from_humantime_strings() {
        let settings: Settings =
            serde_json::from_str(r#"{"slew_timeout": "90s", "poll_interval": "250ms"}"#)
                .expect("parse");
        assert_eq!(settings.slew_timeout, Duration::from_secs(90));
        assert_eq!(settings.poll_interval, Duration::from_millis(250));
        // Unnamed fields keep their defaults
        assert_eq!(settings.shutter_timeout, Duration::from_secs(240));
    }

    #[test]
    fn toggles_deserialize() {
        let settings: Settings = serde_json::from_str(
            r#"{"destructive_tests": false, "site_latitude": 47.6}"#,
        )
        .expect("parse");
        assert!(!settings.destructive_tests);
        assert_eq!(settings.site_latitude, Some(47.6));
    }
}
