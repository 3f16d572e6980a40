//! Device capability model
//!
//! Each `Can*` flag is read exactly once per run and cached here; all later
//! tests branch on the cached value and never re-read the live property. A
//! flag whose read faults is reported as an Error (a capability read must
//! never legitimately fail) and cached as `false`, so no potentially unsafe
//! operation runs with an unknown guard.

use std::future::Future;

use crate::device::{DomeDevice, TelescopeAxis, TelescopeDevice};
use crate::fault::{member_fault_verdict, DeviceResult, FaultCodes, Required};
use crate::outcome::{OutcomeSink, Severity};

/// Cached telescope capability flags, immutable after the read phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelescopeCapabilities {
    pub can_find_home: bool,
    pub can_park: bool,
    pub can_pulse_guide: bool,
    pub can_set_declination_rate: bool,
    pub can_set_guide_rates: bool,
    pub can_set_park: bool,
    pub can_set_pier_side: bool,
    pub can_set_right_ascension_rate: bool,
    pub can_set_tracking: bool,
    pub can_slew: bool,
    pub can_slew_async: bool,
    pub can_slew_alt_az: bool,
    pub can_slew_alt_az_async: bool,
    pub can_sync: bool,
    pub can_sync_alt_az: bool,
    pub can_unpark: bool,
    pub can_move_axis: [bool; 3],
}

impl TelescopeCapabilities {
    /// A fully capable mount, the simulator default
    pub fn full() -> Self {
        Self {
            can_find_home: true,
            can_park: true,
            can_pulse_guide: true,
            can_set_declination_rate: true,
            can_set_guide_rates: true,
            can_set_park: true,
            can_set_pier_side: false,
            can_set_right_ascension_rate: true,
            can_set_tracking: true,
            can_slew: true,
            can_slew_async: true,
            can_slew_alt_az: true,
            can_slew_alt_az_async: true,
            can_sync: true,
            can_sync_alt_az: true,
            can_unpark: true,
            can_move_axis: [true, true, false],
        }
    }

    /// Read every telescope capability flag, once each
    pub async fn read(
        device: &dyn TelescopeDevice,
        sink: &dyn OutcomeSink,
        codes: &FaultCodes,
    ) -> Self {
        let mut caps = Self::default();
        caps.can_find_home = read_flag("CanFindHome", device.can_find_home(), sink, codes).await;
        caps.can_park = read_flag("CanPark", device.can_park(), sink, codes).await;
        caps.can_pulse_guide =
            read_flag("CanPulseGuide", device.can_pulse_guide(), sink, codes).await;
        caps.can_set_declination_rate = read_flag(
            "CanSetDeclinationRate",
            device.can_set_declination_rate(),
            sink,
            codes,
        )
        .await;
        caps.can_set_guide_rates = read_flag(
            "CanSetGuideRates",
            device.can_set_guide_rates(),
            sink,
            codes,
        )
        .await;
        caps.can_set_park = read_flag("CanSetPark", device.can_set_park(), sink, codes).await;
        caps.can_set_pier_side =
            read_flag("CanSetPierSide", device.can_set_pier_side(), sink, codes).await;
        caps.can_set_right_ascension_rate = read_flag(
            "CanSetRightAscensionRate",
            device.can_set_right_ascension_rate(),
            sink,
            codes,
        )
        .await;
        caps.can_set_tracking =
            read_flag("CanSetTracking", device.can_set_tracking(), sink, codes).await;
        caps.can_slew = read_flag("CanSlew", device.can_slew(), sink, codes).await;
        caps.can_slew_async = read_flag("CanSlewAsync", device.can_slew_async(), sink, codes).await;
        caps.can_slew_alt_az =
            read_flag("CanSlewAltAz", device.can_slew_alt_az(), sink, codes).await;
        caps.can_slew_alt_az_async = read_flag(
            "CanSlewAltAzAsync",
            device.can_slew_alt_az_async(),
            sink,
            codes,
        )
        .await;
        caps.can_sync = read_flag("CanSync", device.can_sync(), sink, codes).await;
        caps.can_sync_alt_az =
            read_flag("CanSyncAltAz", device.can_sync_alt_az(), sink, codes).await;
        caps.can_unpark = read_flag("CanUnpark", device.can_unpark(), sink, codes).await;
        for axis in TelescopeAxis::ALL {
            caps.can_move_axis[axis.index()] = read_flag(
                &format!("CanMoveAxis:{}", axis),
                device.can_move_axis(axis),
                sink,
                codes,
            )
            .await;
        }
        caps
    }
}

/// Cached dome capability flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DomeCapabilities {
    pub can_find_home: bool,
    pub can_park: bool,
    pub can_set_altitude: bool,
    pub can_set_azimuth: bool,
    pub can_set_park: bool,
    pub can_set_shutter: bool,
    pub can_slave: bool,
    pub can_sync_azimuth: bool,
}

impl DomeCapabilities {
    /// A fully capable dome, the simulator default
    pub fn full() -> Self {
        Self {
            can_find_home: true,
            can_park: true,
            can_set_altitude: true,
            can_set_azimuth: true,
            can_set_park: true,
            can_set_shutter: true,
            can_slave: true,
            can_sync_azimuth: true,
        }
    }

    /// Read every dome capability flag, once each
    pub async fn read(
        device: &dyn DomeDevice,
        sink: &dyn OutcomeSink,
        codes: &FaultCodes,
    ) -> Self {
        Self {
            can_find_home: read_flag("CanFindHome", device.can_find_home(), sink, codes).await,
            can_park: read_flag("CanPark", device.can_park(), sink, codes).await,
            can_set_altitude: read_flag("CanSetAltitude", device.can_set_altitude(), sink, codes)
                .await,
            can_set_azimuth: read_flag("CanSetAzimuth", device.can_set_azimuth(), sink, codes)
                .await,
            can_set_park: read_flag("CanSetPark", device.can_set_park(), sink, codes).await,
            can_set_shutter: read_flag("CanSetShutter", device.can_set_shutter(), sink, codes)
                .await,
            can_slave: read_flag("CanSlave", device.can_slave(), sink, codes).await,
            can_sync_azimuth: read_flag("CanSyncAzimuth", device.can_sync_azimuth(), sink, codes)
                .await,
        }
    }
}

/// Read one capability flag; a fault is an Error and caches false
async fn read_flag(
    name: &str,
    read: impl Future<Output = DeviceResult<bool>>,
    sink: &dyn OutcomeSink,
    codes: &FaultCodes,
) -> bool {
    match read.await {
        Ok(value) => {
            sink.log(name, Severity::Ok, &value.to_string());
            value
        }
        Err(fault) => {
            let (_, message) = member_fault_verdict(name, Required::Mandatory, &fault, codes);
            sink.log(name, Severity::Error, &message);
            false
        }
    }
}
