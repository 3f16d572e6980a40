//! Simulated telescope mount

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::capability::TelescopeCapabilities;
use crate::device::{
    AlignmentMode, AxisRate, Device, DriveRate, EquatorialSystem, GuideDirection, PierSide,
    TelescopeAxis, TelescopeDevice,
};
use crate::fault::{DeviceFault, DeviceResult};
use crate::sim::{physical_side, pointing_side};
use crate::transform::{condition_ha, condition_ra, local_sidereal_time, range_azimuth};

/// Returns a not-connected fault when the simulated link is down
macro_rules! ensure_connected {
    ($state:expr) => {
        if !$state.connected {
            return Err(DeviceFault::not_connected());
        }
    };
}

/// Deliberate protocol violations for exercising the engine
#[derive(Debug, Clone, Copy, Default)]
pub struct SimQuirks {
    /// Report the mechanical pier side instead of the pointing state
    pub physical_pier_side: bool,
    /// Silently accept out-of-domain slew/sync coordinates
    pub accept_illegal_coordinates: bool,
    /// Return a number from an unwritten target property
    pub target_reads_before_write: bool,
    /// Return an empty collection on the second enumeration
    pub second_enumeration_empty: bool,
    /// Report a duplicate entry in TrackingRates
    pub duplicate_tracking_rates: bool,
    /// Report overlapping AxisRates ranges
    pub overlapping_axis_rates: bool,
    /// Let gated members succeed even when their capability flag is false
    pub ignore_capability_gates: bool,
    /// Report a non-zero rate offset although the rate is not settable
    pub nonzero_rate_when_unsettable: bool,
    /// Leave asynchronous slews running forever
    pub never_finish_slews: bool,
    /// Let motion commands succeed while parked and drop the parked state
    pub ignore_parked_guard: bool,
    /// Pointing error applied after every slew, arc-seconds
    pub sloppy_pointing_arcsec: f64,
}

#[derive(Debug, Clone, Copy)]
enum SlewGoal {
    Equatorial { ra: f64, dec: f64 },
    AltAz { azimuth: f64, altitude: f64 },
}

#[derive(Debug, Clone, Copy)]
struct ActiveSlew {
    goal: SlewGoal,
    completes_at: Instant,
}

#[derive(Debug)]
struct TelescopeState {
    connected: bool,
    tracking: bool,
    tracking_rate: DriveRate,
    at_park: bool,
    at_home: bool,
    ra: f64,
    dec: f64,
    altitude: f64,
    azimuth: f64,
    site_latitude: f64,
    site_longitude: f64,
    site_elevation: f64,
    target_ra: Option<f64>,
    target_dec: Option<f64>,
    declination_rate: f64,
    right_ascension_rate: f64,
    guide_rate_ra: f64,
    guide_rate_dec: f64,
    slew_settle_time: i32,
    does_refraction: bool,
    slew: Option<ActiveSlew>,
    pulse_until: Option<Instant>,
    axis_motion: [f64; 3],
    axis_rate_calls: [u32; 3],
    tracking_rates_calls: u32,
}

impl TelescopeState {
    fn new(site_longitude: f64) -> Self {
        let lst = local_sidereal_time(Utc::now(), site_longitude);
        Self {
            connected: false,
            tracking: true,
            tracking_rate: DriveRate::Sidereal,
            at_park: false,
            at_home: false,
            ra: lst,
            dec: 50.0,
            altitude: 50.0,
            azimuth: 180.0,
            site_latitude: 47.6,
            site_longitude,
            site_elevation: 120.0,
            target_ra: None,
            target_dec: None,
            declination_rate: 0.0,
            right_ascension_rate: 0.0,
            guide_rate_ra: 0.004,
            guide_rate_dec: 0.004,
            slew_settle_time: 0,
            does_refraction: false,
            slew: None,
            pulse_until: None,
            axis_motion: [0.0; 3],
            axis_rate_calls: [0; 3],
            tracking_rates_calls: 0,
        }
    }
}

/// Simulated German-equatorial mount with realistic motion timing
pub struct SimTelescope {
    caps: TelescopeCapabilities,
    quirks: SimQuirks,
    slew_duration: Duration,
    state: RwLock<TelescopeState>,
}

impl std::fmt::Debug for SimTelescope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimTelescope")
            .field("caps", &self.caps)
            .field("quirks", &self.quirks)
            .finish_non_exhaustive()
    }
}

impl Default for SimTelescope {
    fn default() -> Self {
        Self::new()
    }
}

impl SimTelescope {
    pub fn new() -> Self {
        Self {
            caps: TelescopeCapabilities::full(),
            quirks: SimQuirks::default(),
            slew_duration: Duration::from_millis(50),
            state: RwLock::new(TelescopeState::new(-122.3)),
        }
    }

    pub fn capabilities(mut self, caps: TelescopeCapabilities) -> Self {
        self.caps = caps;
        self
    }

    pub fn quirks(mut self, quirks: SimQuirks) -> Self {
        self.quirks = quirks;
        self
    }

    pub fn slew_duration(mut self, duration: Duration) -> Self {
        self.slew_duration = duration;
        self
    }

    fn gate(&self, enabled: bool, member: &str) -> DeviceResult<()> {
        if enabled || self.quirks.ignore_capability_gates {
            Ok(())
        } else {
            Err(DeviceFault::not_implemented(member))
        }
    }

    /// Commit any finished motion before a state read
    fn tick(&self, state: &mut TelescopeState) {
        if let Some(active) = state.slew {
            if !self.quirks.never_finish_slews && Instant::now() >= active.completes_at {
                self.apply_goal(state, active.goal);
                state.slew = None;
            }
        }
        if let Some(until) = state.pulse_until {
            if Instant::now() >= until {
                state.pulse_until = None;
            }
        }
    }

    fn apply_goal(&self, state: &mut TelescopeState, goal: SlewGoal) {
        let slop_ra_hours = self.quirks.sloppy_pointing_arcsec / (15.0 * 3600.0);
        let slop_deg = self.quirks.sloppy_pointing_arcsec / 3600.0;
        match goal {
            SlewGoal::Equatorial { ra, dec } => {
                state.ra = condition_ra(ra + slop_ra_hours);
                state.dec = dec + slop_deg;
            }
            SlewGoal::AltAz { azimuth, altitude } => {
                state.azimuth = range_azimuth(azimuth + slop_deg);
                state.altitude = altitude + slop_deg;
            }
        }
        state.at_home = false;
    }

    fn ensure_not_parked(&self, state: &mut TelescopeState, member: &str) -> DeviceResult<()> {
        if !state.at_park {
            return Ok(());
        }
        if self.quirks.ignore_parked_guard {
            state.at_park = false;
            return Ok(());
        }
        Err(DeviceFault::invalid_while_parked(member))
    }

    fn validate_equatorial(&self, ra: f64, dec: f64) -> DeviceResult<()> {
        if self.quirks.accept_illegal_coordinates {
            return Ok(());
        }
        if !(0.0..24.0).contains(&ra) {
            return Err(DeviceFault::invalid_value(format!(
                "right ascension {} is outside [0, 24)",
                ra
            )));
        }
        if !(-90.0..=90.0).contains(&dec) {
            return Err(DeviceFault::invalid_value(format!(
                "declination {} is outside [-90, 90]",
                dec
            )));
        }
        Ok(())
    }

    fn validate_alt_az(&self, azimuth: f64, altitude: f64) -> DeviceResult<()> {
        if self.quirks.accept_illegal_coordinates {
            return Ok(());
        }
        if !(0.0..360.0).contains(&azimuth) {
            return Err(DeviceFault::invalid_value(format!(
                "azimuth {} is outside [0, 360)",
                azimuth
            )));
        }
        if !(0.0..=90.0).contains(&altitude) {
            return Err(DeviceFault::invalid_value(format!(
                "altitude {} is outside [0, 90]",
                altitude
            )));
        }
        Ok(())
    }

    fn start_slew(&self, state: &mut TelescopeState, goal: SlewGoal) {
        state.slew = Some(ActiveSlew {
            goal,
            completes_at: Instant::now() + self.slew_duration,
        });
    }

    fn finish_slew_now(&self, state: &mut TelescopeState, goal: SlewGoal) {
        self.apply_goal(state, goal);
        state.slew = None;
    }

    async fn current_side_of_pier(&self) -> DeviceResult<PierSide> {
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.tick(&mut state);
        let lst = local_sidereal_time(Utc::now(), state.site_longitude);
        let ha = condition_ha(lst - state.ra);
        Ok(if self.quirks.physical_pier_side {
            physical_side(ha)
        } else {
            pointing_side(ha)
        })
    }

    fn axis_rate_table(&self, axis: TelescopeAxis) -> Vec<AxisRate> {
        if !self.caps.can_move_axis[axis.index()] {
            return Vec::new();
        }
        if self.quirks.overlapping_axis_rates {
            vec![AxisRate::new(0.0, 2.0), AxisRate::new(1.0, 3.0)]
        } else {
            vec![AxisRate::new(0.0, 4.0)]
        }
    }
}

#[async_trait]
impl Device for SimTelescope {
    fn name(&self) -> &str {
        "Simulated Telescope"
    }

    async fn description(&self) -> DeviceResult<String> {
        Ok("In-memory German equatorial mount simulator".to_string())
    }

    async fn connected(&self) -> DeviceResult<bool> {
        Ok(self.state.read().await.connected)
    }

    async fn set_connected(&self, connected: bool) -> DeviceResult<()> {
        self.state.write().await.connected = connected;
        Ok(())
    }

    async fn driver_info(&self) -> DeviceResult<String> {
        Ok("Simulated telescope for conformance engine tests".to_string())
    }

    async fn driver_version(&self) -> DeviceResult<String> {
        Ok(env!("CARGO_PKG_VERSION").to_string())
    }
}

#[async_trait]
impl TelescopeDevice for SimTelescope {
    async fn can_find_home(&self) -> DeviceResult<bool> {
        Ok(self.caps.can_find_home)
    }

    async fn can_park(&self) -> DeviceResult<bool> {
        Ok(self.caps.can_park)
    }

    async fn can_pulse_guide(&self) -> DeviceResult<bool> {
        Ok(self.caps.can_pulse_guide)
    }

    async fn can_set_declination_rate(&self) -> DeviceResult<bool> {
        Ok(self.caps.can_set_declination_rate)
    }

    async fn can_set_guide_rates(&self) -> DeviceResult<bool> {
        Ok(self.caps.can_set_guide_rates)
    }

    async fn can_set_park(&self) -> DeviceResult<bool> {
        Ok(self.caps.can_set_park)
    }

    async fn can_set_pier_side(&self) -> DeviceResult<bool> {
        Ok(self.caps.can_set_pier_side)
    }

    async fn can_set_right_ascension_rate(&self) -> DeviceResult<bool> {
        Ok(self.caps.can_set_right_ascension_rate)
    }

    async fn can_set_tracking(&self) -> DeviceResult<bool> {
        Ok(self.caps.can_set_tracking)
    }

    async fn can_slew(&self) -> DeviceResult<bool> {
        Ok(self.caps.can_slew)
    }

    async fn can_slew_async(&self) -> DeviceResult<bool> {
        Ok(self.caps.can_slew_async)
    }

    async fn can_slew_alt_az(&self) -> DeviceResult<bool> {
        Ok(self.caps.can_slew_alt_az)
    }

    async fn can_slew_alt_az_async(&self) -> DeviceResult<bool> {
        Ok(self.caps.can_slew_alt_az_async)
    }

    async fn can_sync(&self) -> DeviceResult<bool> {
        Ok(self.caps.can_sync)
    }

    async fn can_sync_alt_az(&self) -> DeviceResult<bool> {
        Ok(self.caps.can_sync_alt_az)
    }

    async fn can_unpark(&self) -> DeviceResult<bool> {
        Ok(self.caps.can_unpark)
    }

    async fn can_move_axis(&self, axis: TelescopeAxis) -> DeviceResult<bool> {
        Ok(self.caps.can_move_axis[axis.index()])
    }

    async fn alignment_mode(&self) -> DeviceResult<AlignmentMode> {
        Ok(AlignmentMode::GermanPolar)
    }

    async fn altitude(&self) -> DeviceResult<f64> {
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.tick(&mut state);
        Ok(state.altitude)
    }

    async fn azimuth(&self) -> DeviceResult<f64> {
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.tick(&mut state);
        Ok(state.azimuth)
    }

    async fn declination(&self) -> DeviceResult<f64> {
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.tick(&mut state);
        Ok(state.dec)
    }

    async fn right_ascension(&self) -> DeviceResult<f64> {
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.tick(&mut state);
        Ok(state.ra)
    }

    async fn sidereal_time(&self) -> DeviceResult<f64> {
        let state = self.state.read().await;
        ensure_connected!(state);
        Ok(local_sidereal_time(Utc::now(), state.site_longitude))
    }

    async fn aperture_area(&self) -> DeviceResult<f64> {
        Ok(0.0201)
    }

    async fn aperture_diameter(&self) -> DeviceResult<f64> {
        Ok(0.16)
    }

    async fn focal_length(&self) -> DeviceResult<f64> {
        Ok(1.28)
    }

    async fn at_home(&self) -> DeviceResult<bool> {
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.tick(&mut state);
        Ok(state.at_home)
    }

    async fn at_park(&self) -> DeviceResult<bool> {
        let state = self.state.read().await;
        ensure_connected!(state);
        Ok(state.at_park)
    }

    async fn slewing(&self) -> DeviceResult<bool> {
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.tick(&mut state);
        Ok(state.slew.is_some() || state.axis_motion.iter().any(|rate| *rate != 0.0))
    }

    async fn is_pulse_guiding(&self) -> DeviceResult<bool> {
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.tick(&mut state);
        Ok(state.pulse_until.is_some())
    }

    async fn equatorial_system(&self) -> DeviceResult<EquatorialSystem> {
        Ok(EquatorialSystem::Topocentric)
    }

    async fn destination_side_of_pier(&self, ra: f64, dec: f64) -> DeviceResult<PierSide> {
        self.validate_equatorial(ra, dec)?;
        let state = self.state.read().await;
        ensure_connected!(state);
        let lst = local_sidereal_time(Utc::now(), state.site_longitude);
        let ha = condition_ha(lst - ra);
        Ok(if self.quirks.physical_pier_side {
            physical_side(ha)
        } else {
            pointing_side(ha)
        })
    }

    async fn tracking(&self) -> DeviceResult<bool> {
        let state = self.state.read().await;
        ensure_connected!(state);
        Ok(state.tracking)
    }

    async fn set_tracking(&self, tracking: bool) -> DeviceResult<()> {
        self.gate(self.caps.can_set_tracking, "Tracking write")?;
        let mut state = self.state.write().await;
        ensure_connected!(state);
        state.tracking = tracking;
        Ok(())
    }

    async fn tracking_rate(&self) -> DeviceResult<DriveRate> {
        let state = self.state.read().await;
        ensure_connected!(state);
        Ok(state.tracking_rate)
    }

    async fn set_tracking_rate(&self, rate: DriveRate) -> DeviceResult<()> {
        let mut state = self.state.write().await;
        ensure_connected!(state);
        state.tracking_rate = rate;
        Ok(())
    }

    async fn tracking_rates(&self) -> DeviceResult<Vec<DriveRate>> {
        let mut state = self.state.write().await;
        ensure_connected!(state);
        if self.quirks.second_enumeration_empty && state.tracking_rates_calls > 0 {
            return Ok(Vec::new());
        }
        state.tracking_rates_calls += 1;
        let mut rates = vec![
            DriveRate::Sidereal,
            DriveRate::Lunar,
            DriveRate::Solar,
            DriveRate::King,
        ];
        if self.quirks.duplicate_tracking_rates {
            rates.push(DriveRate::Sidereal);
        }
        Ok(rates)
    }

    async fn declination_rate(&self) -> DeviceResult<f64> {
        let state = self.state.read().await;
        ensure_connected!(state);
        if !self.caps.can_set_declination_rate && self.quirks.nonzero_rate_when_unsettable {
            return Ok(1.5);
        }
        Ok(state.declination_rate)
    }

    async fn set_declination_rate(&self, rate: f64) -> DeviceResult<()> {
        self.gate(self.caps.can_set_declination_rate, "DeclinationRate write")?;
        let mut state = self.state.write().await;
        ensure_connected!(state);
        state.declination_rate = rate;
        Ok(())
    }

    async fn right_ascension_rate(&self) -> DeviceResult<f64> {
        let state = self.state.read().await;
        ensure_connected!(state);
        if !self.caps.can_set_right_ascension_rate && self.quirks.nonzero_rate_when_unsettable {
            return Ok(1.5);
        }
        Ok(state.right_ascension_rate)
    }

    async fn set_right_ascension_rate(&self, rate: f64) -> DeviceResult<()> {
        self.gate(
            self.caps.can_set_right_ascension_rate,
            "RightAscensionRate write",
        )?;
        let mut state = self.state.write().await;
        ensure_connected!(state);
        state.right_ascension_rate = rate;
        Ok(())
    }

    async fn guide_rate_declination(&self) -> DeviceResult<f64> {
        let state = self.state.read().await;
        ensure_connected!(state);
        Ok(state.guide_rate_dec)
    }

    async fn set_guide_rate_declination(&self, rate: f64) -> DeviceResult<()> {
        self.gate(self.caps.can_set_guide_rates, "GuideRateDeclination write")?;
        if rate < 0.0 {
            return Err(DeviceFault::invalid_value("guide rate must not be negative"));
        }
        let mut state = self.state.write().await;
        ensure_connected!(state);
        state.guide_rate_dec = rate;
        Ok(())
    }

    async fn guide_rate_right_ascension(&self) -> DeviceResult<f64> {
        let state = self.state.read().await;
        ensure_connected!(state);
        Ok(state.guide_rate_ra)
    }

    async fn set_guide_rate_right_ascension(&self, rate: f64) -> DeviceResult<()> {
        self.gate(
            self.caps.can_set_guide_rates,
            "GuideRateRightAscension write",
        )?;
        if rate < 0.0 {
            return Err(DeviceFault::invalid_value("guide rate must not be negative"));
        }
        let mut state = self.state.write().await;
        ensure_connected!(state);
        state.guide_rate_ra = rate;
        Ok(())
    }

    async fn does_refraction(&self) -> DeviceResult<bool> {
        let state = self.state.read().await;
        ensure_connected!(state);
        Ok(state.does_refraction)
    }

    async fn set_does_refraction(&self, does_refraction: bool) -> DeviceResult<()> {
        let mut state = self.state.write().await;
        ensure_connected!(state);
        state.does_refraction = does_refraction;
        Ok(())
    }

    async fn side_of_pier(&self) -> DeviceResult<PierSide> {
        self.current_side_of_pier().await
    }

    async fn set_side_of_pier(&self, _side: PierSide) -> DeviceResult<()> {
        self.gate(self.caps.can_set_pier_side, "SideOfPier write")?;
        // Forced flips are accepted but positionally a no-op here
        Ok(())
    }

    async fn site_elevation(&self) -> DeviceResult<f64> {
        let state = self.state.read().await;
        ensure_connected!(state);
        Ok(state.site_elevation)
    }

    async fn set_site_elevation(&self, elevation_m: f64) -> DeviceResult<()> {
        if !(-300.0..=10_000.0).contains(&elevation_m) {
            return Err(DeviceFault::invalid_value(format!(
                "site elevation {} is outside [-300, 10000]",
                elevation_m
            )));
        }
        let mut state = self.state.write().await;
        ensure_connected!(state);
        state.site_elevation = elevation_m;
        Ok(())
    }

    async fn site_latitude(&self) -> DeviceResult<f64> {
        let state = self.state.read().await;
        ensure_connected!(state);
        Ok(state.site_latitude)
    }

    async fn set_site_latitude(&self, latitude_deg: f64) -> DeviceResult<()> {
        if !(-90.0..=90.0).contains(&latitude_deg) {
            return Err(DeviceFault::invalid_value(format!(
                "site latitude {} is outside [-90, 90]",
                latitude_deg
            )));
        }
        let mut state = self.state.write().await;
        ensure_connected!(state);
        state.site_latitude = latitude_deg;
        Ok(())
    }

    async fn site_longitude(&self) -> DeviceResult<f64> {
        let state = self.state.read().await;
        ensure_connected!(state);
        Ok(state.site_longitude)
    }

    async fn set_site_longitude(&self, longitude_deg: f64) -> DeviceResult<()> {
        if !(-180.0..=180.0).contains(&longitude_deg) {
            return Err(DeviceFault::invalid_value(format!(
                "site longitude {} is outside [-180, 180]",
                longitude_deg
            )));
        }
        let mut state = self.state.write().await;
        ensure_connected!(state);
        state.site_longitude = longitude_deg;
        Ok(())
    }

    async fn slew_settle_time(&self) -> DeviceResult<i32> {
        let state = self.state.read().await;
        ensure_connected!(state);
        Ok(state.slew_settle_time)
    }

    async fn set_slew_settle_time(&self, seconds: i32) -> DeviceResult<()> {
        if seconds < 0 {
            return Err(DeviceFault::invalid_value(
                "slew settle time must not be negative",
            ));
        }
        let mut state = self.state.write().await;
        ensure_connected!(state);
        state.slew_settle_time = seconds;
        Ok(())
    }

    async fn target_declination(&self) -> DeviceResult<f64> {
        let state = self.state.read().await;
        ensure_connected!(state);
        match state.target_dec {
            Some(dec) => Ok(dec),
            None if self.quirks.target_reads_before_write => Ok(0.0),
            None => Err(DeviceFault::value_not_set("TargetDeclination")),
        }
    }

    async fn set_target_declination(&self, dec: f64) -> DeviceResult<()> {
        if !self.quirks.accept_illegal_coordinates && !(-90.0..=90.0).contains(&dec) {
            return Err(DeviceFault::invalid_value(format!(
                "target declination {} is outside [-90, 90]",
                dec
            )));
        }
        let mut state = self.state.write().await;
        ensure_connected!(state);
        state.target_dec = Some(dec);
        Ok(())
    }

    async fn target_right_ascension(&self) -> DeviceResult<f64> {
        let state = self.state.read().await;
        ensure_connected!(state);
        match state.target_ra {
            Some(ra) => Ok(ra),
            None if self.quirks.target_reads_before_write => Ok(0.0),
            None => Err(DeviceFault::value_not_set("TargetRightAscension")),
        }
    }

    async fn set_target_right_ascension(&self, ra: f64) -> DeviceResult<()> {
        if !self.quirks.accept_illegal_coordinates && !(0.0..24.0).contains(&ra) {
            return Err(DeviceFault::invalid_value(format!(
                "target right ascension {} is outside [0, 24)",
                ra
            )));
        }
        let mut state = self.state.write().await;
        ensure_connected!(state);
        state.target_ra = Some(ra);
        Ok(())
    }

    async fn utc_date(&self) -> DeviceResult<String> {
        let state = self.state.read().await;
        ensure_connected!(state);
        Ok(Utc::now().to_rfc3339())
    }

    async fn set_utc_date(&self, utc: String) -> DeviceResult<()> {
        let state = self.state.read().await;
        ensure_connected!(state);
        chrono::DateTime::parse_from_rfc3339(&utc)
            .map(|_| ())
            .map_err(|e| DeviceFault::invalid_value(format!("unparseable UTC date: {}", e)))
    }

    async fn axis_rates(&self, axis: TelescopeAxis) -> DeviceResult<Vec<AxisRate>> {
        let mut state = self.state.write().await;
        ensure_connected!(state);
        if self.quirks.second_enumeration_empty && state.axis_rate_calls[axis.index()] > 0 {
            return Ok(Vec::new());
        }
        state.axis_rate_calls[axis.index()] += 1;
        Ok(self.axis_rate_table(axis))
    }

    async fn move_axis(&self, axis: TelescopeAxis, rate: f64) -> DeviceResult<()> {
        self.gate(self.caps.can_move_axis[axis.index()], "MoveAxis")?;
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.ensure_not_parked(&mut state, "MoveAxis")?;
        if rate != 0.0
            && !self.quirks.accept_illegal_coordinates
            && !self
                .axis_rate_table(axis)
                .iter()
                .any(|range| range.contains(rate))
        {
            return Err(DeviceFault::invalid_value(format!(
                "rate {} is outside the supported ranges for the {} axis",
                rate, axis
            )));
        }
        state.axis_motion[axis.index()] = rate;
        Ok(())
    }

    async fn pulse_guide(&self, _direction: GuideDirection, duration_ms: i32) -> DeviceResult<()> {
        self.gate(self.caps.can_pulse_guide, "PulseGuide")?;
        if duration_ms < 0 {
            return Err(DeviceFault::invalid_value(
                "pulse guide duration must not be negative",
            ));
        }
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.ensure_not_parked(&mut state, "PulseGuide")?;
        state.pulse_until = Some(Instant::now() + Duration::from_millis(duration_ms as u64));
        Ok(())
    }

    async fn abort_slew(&self) -> DeviceResult<()> {
        let mut state = self.state.write().await;
        ensure_connected!(state);
        state.slew = None;
        state.axis_motion = [0.0; 3];
        state.pulse_until = None;
        Ok(())
    }

    async fn find_home(&self) -> DeviceResult<()> {
        self.gate(self.caps.can_find_home, "FindHome")?;
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.ensure_not_parked(&mut state, "FindHome")?;
        state.slew = None;
        state.at_home = true;
        Ok(())
    }

    async fn park(&self) -> DeviceResult<()> {
        self.gate(self.caps.can_park, "Park")?;
        let mut state = self.state.write().await;
        ensure_connected!(state);
        // Parking an already parked mount is a no-op
        state.slew = None;
        state.axis_motion = [0.0; 3];
        state.tracking = false;
        state.at_park = true;
        Ok(())
    }

    async fn unpark(&self) -> DeviceResult<()> {
        self.gate(self.caps.can_unpark, "UnPark")?;
        let mut state = self.state.write().await;
        ensure_connected!(state);
        state.at_park = false;
        Ok(())
    }

    async fn set_park(&self) -> DeviceResult<()> {
        self.gate(self.caps.can_set_park, "SetPark")?;
        let state = self.state.read().await;
        ensure_connected!(state);
        Ok(())
    }

    async fn slew_to_coordinates(&self, ra: f64, dec: f64) -> DeviceResult<()> {
        self.gate(self.caps.can_slew, "SlewToCoordinates")?;
        self.validate_equatorial(ra, dec)?;
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.ensure_not_parked(&mut state, "SlewToCoordinates")?;
        self.finish_slew_now(&mut state, SlewGoal::Equatorial { ra, dec });
        Ok(())
    }

    async fn slew_to_coordinates_async(&self, ra: f64, dec: f64) -> DeviceResult<()> {
        self.gate(self.caps.can_slew_async, "SlewToCoordinatesAsync")?;
        self.validate_equatorial(ra, dec)?;
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.ensure_not_parked(&mut state, "SlewToCoordinatesAsync")?;
        self.start_slew(&mut state, SlewGoal::Equatorial { ra, dec });
        Ok(())
    }

    async fn slew_to_target(&self) -> DeviceResult<()> {
        self.gate(self.caps.can_slew, "SlewToTarget")?;
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.ensure_not_parked(&mut state, "SlewToTarget")?;
        let (ra, dec) = match (state.target_ra, state.target_dec) {
            (Some(ra), Some(dec)) => (ra, dec),
            _ => {
                return Err(DeviceFault::invalid_operation(
                    "target coordinates have not been set",
                ))
            }
        };
        self.finish_slew_now(&mut state, SlewGoal::Equatorial { ra, dec });
        Ok(())
    }

    async fn slew_to_target_async(&self) -> DeviceResult<()> {
        self.gate(self.caps.can_slew_async, "SlewToTargetAsync")?;
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.ensure_not_parked(&mut state, "SlewToTargetAsync")?;
        let (ra, dec) = match (state.target_ra, state.target_dec) {
            (Some(ra), Some(dec)) => (ra, dec),
            _ => {
                return Err(DeviceFault::invalid_operation(
                    "target coordinates have not been set",
                ))
            }
        };
        self.start_slew(&mut state, SlewGoal::Equatorial { ra, dec });
        Ok(())
    }

    async fn slew_to_alt_az(&self, azimuth: f64, altitude: f64) -> DeviceResult<()> {
        self.gate(self.caps.can_slew_alt_az, "SlewToAltAz")?;
        self.validate_alt_az(azimuth, altitude)?;
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.ensure_not_parked(&mut state, "SlewToAltAz")?;
        self.finish_slew_now(&mut state, SlewGoal::AltAz { azimuth, altitude });
        Ok(())
    }

    async fn slew_to_alt_az_async(&self, azimuth: f64, altitude: f64) -> DeviceResult<()> {
        self.gate(self.caps.can_slew_alt_az_async, "SlewToAltAzAsync")?;
        self.validate_alt_az(azimuth, altitude)?;
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.ensure_not_parked(&mut state, "SlewToAltAzAsync")?;
        self.start_slew(&mut state, SlewGoal::AltAz { azimuth, altitude });
        Ok(())
    }

    async fn sync_to_coordinates(&self, ra: f64, dec: f64) -> DeviceResult<()> {
        self.gate(self.caps.can_sync, "SyncToCoordinates")?;
        self.validate_equatorial(ra, dec)?;
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.ensure_not_parked(&mut state, "SyncToCoordinates")?;
        state.ra = ra;
        state.dec = dec;
        Ok(())
    }

    async fn sync_to_target(&self) -> DeviceResult<()> {
        self.gate(self.caps.can_sync, "SyncToTarget")?;
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.ensure_not_parked(&mut state, "SyncToTarget")?;
        let (ra, dec) = match (state.target_ra, state.target_dec) {
            (Some(ra), Some(dec)) => (ra, dec),
            _ => {
                return Err(DeviceFault::invalid_operation(
                    "target coordinates have not been set",
                ))
            }
        };
        state.ra = ra;
        state.dec = dec;
        Ok(())
    }

    async fn sync_to_alt_az(&self, azimuth: f64, altitude: f64) -> DeviceResult<()> {
        self.gate(self.caps.can_sync_alt_az, "SyncToAltAz")?;
        self.validate_alt_az(azimuth, altitude)?;
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.ensure_not_parked(&mut state, "SyncToAltAz")?;
        state.azimuth = azimuth;
        state.altitude = altitude;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn connected_sim() -> SimTelescope {
        let sim = SimTelescope::new();
        sim.set_connected(true).await.expect("connect");
        sim
    }

    #[tokio::test]
    async fn members_fault_when_disconnected() {
        let sim = SimTelescope::new();
        let fault = sim.right_ascension().await.unwrap_err();
        assert_eq!(fault.code, crate::fault::NOT_CONNECTED);
    }

    #[tokio::test]
    async fn async_slew_reports_slewing_until_done() {
        let sim = connected_sim().await;
        sim.slew_to_coordinates_async(10.0, 20.0).await.expect("slew");
        assert!(sim.slewing().await.expect("slewing"));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!sim.slewing().await.expect("slewing"));
        assert!((sim.right_ascension().await.expect("ra") - 10.0).abs() < 1e-9);
        assert!((sim.declination().await.expect("dec") - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn illegal_coordinates_are_rejected() {
        let sim = connected_sim().await;
        let fault = sim.slew_to_coordinates(-1.0, 0.0).await.unwrap_err();
        assert_eq!(fault.code, crate::fault::INVALID_VALUE);
        let fault = sim.slew_to_coordinates(0.0, 91.0).await.unwrap_err();
        assert_eq!(fault.code, crate::fault::INVALID_VALUE);
    }

    #[tokio::test]
    async fn target_read_before_write_faults() {
        let sim = connected_sim().await;
        let fault = sim.target_right_ascension().await.unwrap_err();
        assert_eq!(fault.code, crate::fault::VALUE_NOT_SET);

        sim.set_target_right_ascension(5.0).await.expect("write");
        assert!((sim.target_right_ascension().await.expect("read") - 5.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn park_is_idempotent_and_guards_motion() {
        let sim = connected_sim().await;
        sim.park().await.expect("park");
        assert!(sim.at_park().await.expect("at_park"));
        sim.park().await.expect("park again");
        assert!(sim.at_park().await.expect("at_park"));

        let fault = sim.slew_to_coordinates(10.0, 20.0).await.unwrap_err();
        assert_eq!(fault.code, crate::fault::INVALID_WHILE_PARKED);
        assert!(sim.at_park().await.expect("still parked"));

        sim.unpark().await.expect("unpark");
        assert!(!sim.at_park().await.expect("unparked"));
    }

    #[tokio::test]
    async fn gated_members_fault_when_capability_is_false() {
        let sim = SimTelescope::new().capabilities(TelescopeCapabilities::default());
        sim.set_connected(true).await.expect("connect");
        let fault = sim.park().await.unwrap_err();
        assert_eq!(fault.code, crate::fault::NOT_IMPLEMENTED);
        let fault = sim.set_tracking(false).await.unwrap_err();
        assert_eq!(fault.code, crate::fault::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn second_enumeration_quirk_drops_collections() {
        let sim = SimTelescope::new().quirks(SimQuirks {
            second_enumeration_empty: true,
            ..SimQuirks::default()
        });
        sim.set_connected(true).await.expect("connect");
        let first = sim.tracking_rates().await.expect("first");
        let second = sim.tracking_rates().await.expect("second");
        assert!(!first.is_empty());
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn pier_side_reports_pointing_state_by_default() {
        let sim = connected_sim().await;
        let lst = sim.sidereal_time().await.expect("lst");
        let east_of_meridian = sim
            .destination_side_of_pier(condition_ra(lst + 3.0), 80.0)
            .await
            .expect("dest");
        let west_of_meridian = sim
            .destination_side_of_pier(condition_ra(lst - 3.0), 80.0)
            .await
            .expect("dest");
        assert_ne!(east_of_meridian, west_of_meridian);
    }
}
