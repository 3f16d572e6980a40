//! Simulated observatory dome

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::capability::DomeCapabilities;
use crate::device::{Device, DomeDevice, ShutterState};
use crate::fault::{DeviceFault, DeviceResult};

/// Returns a not-connected fault when the simulated link is down
macro_rules! ensure_connected {
    ($state:expr) => {
        if !$state.connected {
            return Err(DeviceFault::not_connected());
        }
    };
}

/// Deliberate dome protocol violations for exercising the engine
#[derive(Debug, Clone, Copy, Default)]
pub struct DomeQuirks {
    /// Silently accept out-of-domain azimuth/altitude values
    pub accept_illegal_coordinates: bool,
    /// Let gated members succeed even when their capability flag is false
    pub ignore_capability_gates: bool,
    /// Accept SyncToAzimuth but leave the reported azimuth unchanged
    pub sync_ignored: bool,
    /// Leave the shutter in its transitional state forever
    pub stuck_shutter: bool,
    /// Leave azimuth slews running forever
    pub never_finish_slews: bool,
}

#[derive(Debug, Clone, Copy)]
enum DomeGoal {
    Azimuth(f64),
    Altitude(f64),
    Park(f64),
    Home(f64),
}

#[derive(Debug)]
struct DomeState {
    connected: bool,
    altitude: f64,
    azimuth: f64,
    at_home: bool,
    at_park: bool,
    slaved: bool,
    shutter: ShutterState,
    shutter_done: Option<(ShutterState, Instant)>,
    slew: Option<(DomeGoal, Instant)>,
}

impl DomeState {
    fn new() -> Self {
        Self {
            connected: false,
            altitude: 0.0,
            azimuth: 0.0,
            at_home: false,
            at_park: false,
            slaved: false,
            shutter: ShutterState::Closed,
            shutter_done: None,
            slew: None,
        }
    }
}

/// Simulated dome with timed shutter and azimuth motion
pub struct SimDome {
    caps: DomeCapabilities,
    quirks: DomeQuirks,
    motion_duration: Duration,
    park_azimuth: f64,
    home_azimuth: f64,
    state: RwLock<DomeState>,
}

impl std::fmt::Debug for SimDome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimDome")
            .field("caps", &self.caps)
            .field("quirks", &self.quirks)
            .finish_non_exhaustive()
    }
}

impl Default for SimDome {
    fn default() -> Self {
        Self::new()
    }
}

impl SimDome {
    pub fn new() -> Self {
        Self {
            caps: DomeCapabilities::full(),
            quirks: DomeQuirks::default(),
            motion_duration: Duration::from_millis(50),
            park_azimuth: 90.0,
            home_azimuth: 0.0,
            state: RwLock::new(DomeState::new()),
        }
    }

    pub fn capabilities(mut self, caps: DomeCapabilities) -> Self {
        self.caps = caps;
        self
    }

    pub fn quirks(mut self, quirks: DomeQuirks) -> Self {
        self.quirks = quirks;
        self
    }

    pub fn motion_duration(mut self, duration: Duration) -> Self {
        self.motion_duration = duration;
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
    fn tick(&self, state: &mut DomeState) {
        if let Some((target, done_at)) = state.shutter_done {
            if !self.quirks.stuck_shutter && Instant::now() >= done_at {
                state.shutter = target;
                state.shutter_done = None;
            }
        }
        if let Some((goal, done_at)) = state.slew {
            if !self.quirks.never_finish_slews && Instant::now() >= done_at {
                match goal {
                    DomeGoal::Azimuth(az) => state.azimuth = az,
                    DomeGoal::Altitude(alt) => state.altitude = alt,
                    DomeGoal::Park(az) => {
                        state.azimuth = az;
                        state.at_park = true;
                    }
                    DomeGoal::Home(az) => {
                        state.azimuth = az;
                        state.at_home = true;
                    }
                }
                state.slew = None;
            }
        }
    }

    fn start_motion(&self, state: &mut DomeState, goal: DomeGoal) {
        state.at_home = false;
        state.at_park = false;
        state.slew = Some((goal, Instant::now() + self.motion_duration));
    }

    fn validate_azimuth(&self, azimuth: f64) -> DeviceResult<()> {
        if self.quirks.accept_illegal_coordinates || (0.0..360.0).contains(&azimuth) {
            Ok(())
        } else {
            Err(DeviceFault::invalid_value(format!(
                "azimuth {} is outside [0, 360)",
                azimuth
            )))
        }
    }

    fn validate_altitude(&self, altitude: f64) -> DeviceResult<()> {
        if self.quirks.accept_illegal_coordinates || (0.0..=90.0).contains(&altitude) {
            Ok(())
        } else {
            Err(DeviceFault::invalid_value(format!(
                "altitude {} is outside [0, 90]",
                altitude
            )))
        }
    }
}

#[async_trait]
impl Device for SimDome {
    fn name(&self) -> &str {
        "Simulated Dome"
    }

    async fn description(&self) -> DeviceResult<String> {
        Ok("In-memory observatory dome simulator".to_string())
    }

    async fn connected(&self) -> DeviceResult<bool> {
        Ok(self.state.read().await.connected)
    }

    async fn set_connected(&self, connected: bool) -> DeviceResult<()> {
        self.state.write().await.connected = connected;
        Ok(())
    }

    async fn driver_info(&self) -> DeviceResult<String> {
        Ok("Simulated dome for conformance engine tests".to_string())
    }

    async fn driver_version(&self) -> DeviceResult<String> {
        Ok(env!("CARGO_PKG_VERSION").to_string())
    }
}

#[async_trait]
impl DomeDevice for SimDome {
    async fn can_find_home(&self) -> DeviceResult<bool> {
        Ok(self.caps.can_find_home)
    }

    async fn can_park(&self) -> DeviceResult<bool> {
        Ok(self.caps.can_park)
    }

    async fn can_set_altitude(&self) -> DeviceResult<bool> {
        Ok(self.caps.can_set_altitude)
    }

    async fn can_set_azimuth(&self) -> DeviceResult<bool> {
        Ok(self.caps.can_set_azimuth)
    }

    async fn can_set_park(&self) -> DeviceResult<bool> {
        Ok(self.caps.can_set_park)
    }

    async fn can_set_shutter(&self) -> DeviceResult<bool> {
        Ok(self.caps.can_set_shutter)
    }

    async fn can_slave(&self) -> DeviceResult<bool> {
        Ok(self.caps.can_slave)
    }

    async fn can_sync_azimuth(&self) -> DeviceResult<bool> {
        Ok(self.caps.can_sync_azimuth)
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

    async fn at_home(&self) -> DeviceResult<bool> {
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.tick(&mut state);
        Ok(state.at_home)
    }

    async fn at_park(&self) -> DeviceResult<bool> {
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.tick(&mut state);
        Ok(state.at_park)
    }

    async fn shutter_status(&self) -> DeviceResult<ShutterState> {
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.tick(&mut state);
        Ok(state.shutter)
    }

    async fn slewing(&self) -> DeviceResult<bool> {
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.tick(&mut state);
        Ok(state.slew.is_some())
    }

    async fn slaved(&self) -> DeviceResult<bool> {
        let state = self.state.read().await;
        ensure_connected!(state);
        Ok(state.slaved)
    }

    async fn set_slaved(&self, slaved: bool) -> DeviceResult<()> {
        self.gate(self.caps.can_slave, "Slaved write")?;
        let mut state = self.state.write().await;
        ensure_connected!(state);
        state.slaved = slaved;
        Ok(())
    }

    async fn abort_slew(&self) -> DeviceResult<()> {
        let mut state = self.state.write().await;
        ensure_connected!(state);
        state.slew = None;
        Ok(())
    }

    async fn open_shutter(&self) -> DeviceResult<()> {
        self.gate(self.caps.can_set_shutter, "OpenShutter")?;
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.tick(&mut state);
        if state.shutter == ShutterState::Open {
            return Ok(());
        }
        state.shutter = ShutterState::Opening;
        state.shutter_done = Some((ShutterState::Open, Instant::now() + self.motion_duration));
        Ok(())
    }

    async fn close_shutter(&self) -> DeviceResult<()> {
        self.gate(self.caps.can_set_shutter, "CloseShutter")?;
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.tick(&mut state);
        if state.shutter == ShutterState::Closed {
            return Ok(());
        }
        state.shutter = ShutterState::Closing;
        state.shutter_done = Some((ShutterState::Closed, Instant::now() + self.motion_duration));
        Ok(())
    }

    async fn find_home(&self) -> DeviceResult<()> {
        self.gate(self.caps.can_find_home, "FindHome")?;
        let mut state = self.state.write().await;
        ensure_connected!(state);
        let home = self.home_azimuth;
        self.start_motion(&mut state, DomeGoal::Home(home));
        Ok(())
    }

    async fn park(&self) -> DeviceResult<()> {
        self.gate(self.caps.can_park, "Park")?;
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.tick(&mut state);
        if state.at_park {
            return Ok(());
        }
        let park = self.park_azimuth;
        self.start_motion(&mut state, DomeGoal::Park(park));
        Ok(())
    }

    async fn set_park(&self) -> DeviceResult<()> {
        self.gate(self.caps.can_set_park, "SetPark")?;
        let state = self.state.read().await;
        ensure_connected!(state);
        Ok(())
    }

    async fn slew_to_altitude(&self, altitude: f64) -> DeviceResult<()> {
        self.gate(self.caps.can_set_altitude, "SlewToAltitude")?;
        self.validate_altitude(altitude)?;
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.start_motion(&mut state, DomeGoal::Altitude(altitude));
        Ok(())
    }

    async fn slew_to_azimuth(&self, azimuth: f64) -> DeviceResult<()> {
        self.gate(self.caps.can_set_azimuth, "SlewToAzimuth")?;
        self.validate_azimuth(azimuth)?;
        let mut state = self.state.write().await;
        ensure_connected!(state);
        self.start_motion(&mut state, DomeGoal::Azimuth(azimuth));
        Ok(())
    }

    async fn sync_to_azimuth(&self, azimuth: f64) -> DeviceResult<()> {
        self.gate(self.caps.can_sync_azimuth, "SyncToAzimuth")?;
        self.validate_azimuth(azimuth)?;
        let mut state = self.state.write().await;
        ensure_connected!(state);
        if !self.quirks.sync_ignored {
            state.azimuth = azimuth;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn connected_dome() -> SimDome {
        let dome = SimDome::new();
        dome.set_connected(true).await.expect("connect");
        dome
    }

    #[tokio::test]
    async fn shutter_passes_through_transitional_state() {
        let dome = connected_dome().await;
        dome.open_shutter().await.expect("open");
        assert_eq!(
            dome.shutter_status().await.expect("status"),
            ShutterState::Opening
        );
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(
            dome.shutter_status().await.expect("status"),
            ShutterState::Open
        );
    }

    #[tokio::test]
    async fn azimuth_slew_completes_and_clears_slewing() {
        let dome = connected_dome().await;
        dome.slew_to_azimuth(120.0).await.expect("slew");
        assert!(dome.slewing().await.expect("slewing"));
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!dome.slewing().await.expect("slewing"));
        assert!((dome.azimuth().await.expect("az") - 120.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn sync_ignored_quirk_leaves_azimuth_unchanged() {
        let dome = SimDome::new().quirks(DomeQuirks {
            sync_ignored: true,
            ..DomeQuirks::default()
        });
        dome.set_connected(true).await.expect("connect");
        let before = dome.azimuth().await.expect("az");
        dome.sync_to_azimuth(200.0).await.expect("sync");
        let after = dome.azimuth().await.expect("az");
        assert!((before - after).abs() < 1e-9);
    }

    #[tokio::test]
    async fn illegal_azimuth_is_rejected() {
        let dome = connected_dome().await;
        let fault = dome.slew_to_azimuth(370.0).await.unwrap_err();
        assert_eq!(fault.code, crate::fault::INVALID_VALUE);
        let fault = dome.sync_to_azimuth(-1.0).await.unwrap_err();
        assert_eq!(fault.code, crate::fault::INVALID_VALUE);
    }

    #[tokio::test]
    async fn park_sets_at_park_after_motion() {
        let dome = connected_dome().await;
        dome.park().await.expect("park");
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(dome.at_park().await.expect("at_park"));
    }
}
