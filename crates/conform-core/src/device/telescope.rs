//! Telescope device contract
//!
//! One method per protocol member. Capability flags (`can_*`) declare which
//! optional members a driver supports; the engine reads each flag once and
//! verifies both sides of the contract.

use async_trait::async_trait;

use super::types::{
    AlignmentMode, AxisRate, DriveRate, EquatorialSystem, GuideDirection, PierSide, TelescopeAxis,
};
use super::Device;
use crate::fault::DeviceResult;

#[async_trait]
pub trait TelescopeDevice: Device {
    // Capability flags

    async fn can_find_home(&self) -> DeviceResult<bool>;
    async fn can_park(&self) -> DeviceResult<bool>;
    async fn can_pulse_guide(&self) -> DeviceResult<bool>;
    async fn can_set_declination_rate(&self) -> DeviceResult<bool>;
    async fn can_set_guide_rates(&self) -> DeviceResult<bool>;
    async fn can_set_park(&self) -> DeviceResult<bool>;
    async fn can_set_pier_side(&self) -> DeviceResult<bool>;
    async fn can_set_right_ascension_rate(&self) -> DeviceResult<bool>;
    async fn can_set_tracking(&self) -> DeviceResult<bool>;
    async fn can_slew(&self) -> DeviceResult<bool>;
    async fn can_slew_async(&self) -> DeviceResult<bool>;
    async fn can_slew_alt_az(&self) -> DeviceResult<bool>;
    async fn can_slew_alt_az_async(&self) -> DeviceResult<bool>;
    async fn can_sync(&self) -> DeviceResult<bool>;
    async fn can_sync_alt_az(&self) -> DeviceResult<bool>;
    async fn can_unpark(&self) -> DeviceResult<bool>;
    async fn can_move_axis(&self, axis: TelescopeAxis) -> DeviceResult<bool>;

    // Read-only properties

    async fn alignment_mode(&self) -> DeviceResult<AlignmentMode>;
    async fn altitude(&self) -> DeviceResult<f64>;
    async fn azimuth(&self) -> DeviceResult<f64>;
    async fn declination(&self) -> DeviceResult<f64>;
    async fn right_ascension(&self) -> DeviceResult<f64>;
    async fn sidereal_time(&self) -> DeviceResult<f64>;
    async fn aperture_area(&self) -> DeviceResult<f64>;
    async fn aperture_diameter(&self) -> DeviceResult<f64>;
    async fn focal_length(&self) -> DeviceResult<f64>;
    async fn at_home(&self) -> DeviceResult<bool>;
    async fn at_park(&self) -> DeviceResult<bool>;
    async fn slewing(&self) -> DeviceResult<bool>;
    async fn is_pulse_guiding(&self) -> DeviceResult<bool>;
    async fn equatorial_system(&self) -> DeviceResult<EquatorialSystem>;
    async fn destination_side_of_pier(&self, ra: f64, dec: f64) -> DeviceResult<PierSide>;

    // Read/write properties

    async fn tracking(&self) -> DeviceResult<bool>;
    async fn set_tracking(&self, tracking: bool) -> DeviceResult<()>;

    async fn tracking_rate(&self) -> DeviceResult<DriveRate>;
    async fn set_tracking_rate(&self, rate: DriveRate) -> DeviceResult<()>;

    async fn tracking_rates(&self) -> DeviceResult<Vec<DriveRate>>;

    async fn declination_rate(&self) -> DeviceResult<f64>;
    async fn set_declination_rate(&self, rate: f64) -> DeviceResult<()>;

    async fn right_ascension_rate(&self) -> DeviceResult<f64>;
    async fn set_right_ascension_rate(&self, rate: f64) -> DeviceResult<()>;

    async fn guide_rate_declination(&self) -> DeviceResult<f64>;
    async fn set_guide_rate_declination(&self, rate: f64) -> DeviceResult<()>;

    async fn guide_rate_right_ascension(&self) -> DeviceResult<f64>;
    async fn set_guide_rate_right_ascension(&self, rate: f64) -> DeviceResult<()>;

    async fn does_refraction(&self) -> DeviceResult<bool>;
    async fn set_does_refraction(&self, does_refraction: bool) -> DeviceResult<()>;

    async fn side_of_pier(&self) -> DeviceResult<PierSide>;
    async fn set_side_of_pier(&self, side: PierSide) -> DeviceResult<()>;

    async fn site_elevation(&self) -> DeviceResult<f64>;
    async fn set_site_elevation(&self, elevation_m: f64) -> DeviceResult<()>;

    async fn site_latitude(&self) -> DeviceResult<f64>;
    async fn set_site_latitude(&self, latitude_deg: f64) -> DeviceResult<()>;

    async fn site_longitude(&self) -> DeviceResult<f64>;
    async fn set_site_longitude(&self, longitude_deg: f64) -> DeviceResult<()>;

    async fn slew_settle_time(&self) -> DeviceResult<i32>;
    async fn set_slew_settle_time(&self, seconds: i32) -> DeviceResult<()>;

    async fn target_declination(&self) -> DeviceResult<f64>;
    async fn set_target_declination(&self, dec: f64) -> DeviceResult<()>;

    async fn target_right_ascension(&self) -> DeviceResult<f64>;
    async fn set_target_right_ascension(&self, ra: f64) -> DeviceResult<()>;

    async fn utc_date(&self) -> DeviceResult<String>;
    async fn set_utc_date(&self, utc: String) -> DeviceResult<()>;

    // Methods

    async fn axis_rates(&self, axis: TelescopeAxis) -> DeviceResult<Vec<AxisRate>>;
    async fn move_axis(&self, axis: TelescopeAxis, rate: f64) -> DeviceResult<()>;
    async fn pulse_guide(&self, direction: GuideDirection, duration_ms: i32) -> DeviceResult<()>;

    async fn abort_slew(&self) -> DeviceResult<()>;
    async fn find_home(&self) -> DeviceResult<()>;
    async fn park(&self) -> DeviceResult<()>;
    async fn unpark(&self) -> DeviceResult<()>;
    async fn set_park(&self) -> DeviceResult<()>;

    async fn slew_to_coordinates(&self, ra: f64, dec: f64) -> DeviceResult<()>;
    async fn slew_to_coordinates_async(&self, ra: f64, dec: f64) -> DeviceResult<()>;
    async fn slew_to_target(&self) -> DeviceResult<()>;
    async fn slew_to_target_async(&self) -> DeviceResult<()>;
    async fn slew_to_alt_az(&self, azimuth: f64, altitude: f64) -> DeviceResult<()>;
    async fn slew_to_alt_az_async(&self, azimuth: f64, altitude: f64) -> DeviceResult<()>;

    async fn sync_to_coordinates(&self, ra: f64, dec: f64) -> DeviceResult<()>;
    async fn sync_to_target(&self) -> DeviceResult<()>;
    async fn sync_to_alt_az(&self, azimuth: f64, altitude: f64) -> DeviceResult<()>;
}
