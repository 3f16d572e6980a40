//! Dome device contract

use async_trait::async_trait;

use super::types::ShutterState;
use super::Device;
use crate::fault::DeviceResult;

#[async_trait]
pub trait DomeDevice: Device {
    // Capability flags

    async fn can_find_home(&self) -> DeviceResult<bool>;
    async fn can_park(&self) -> DeviceResult<bool>;
    async fn can_set_altitude(&self) -> DeviceResult<bool>;
    async fn can_set_azimuth(&self) -> DeviceResult<bool>;
    async fn can_set_park(&self) -> DeviceResult<bool>;
    async fn can_set_shutter(&self) -> DeviceResult<bool>;
    async fn can_slave(&self) -> DeviceResult<bool>;
    async fn can_sync_azimuth(&self) -> DeviceResult<bool>;

    // Properties

    async fn altitude(&self) -> DeviceResult<f64>;
    async fn azimuth(&self) -> DeviceResult<f64>;
    async fn at_home(&self) -> DeviceResult<bool>;
    async fn at_park(&self) -> DeviceResult<bool>;
    async fn shutter_status(&self) -> DeviceResult<ShutterState>;
    async fn slewing(&self) -> DeviceResult<bool>;

    async fn slaved(&self) -> DeviceResult<bool>;
    async fn set_slaved(&self, slaved: bool) -> DeviceResult<()>;

    // Methods

    async fn abort_slew(&self) -> DeviceResult<()>;
    async fn open_shutter(&self) -> DeviceResult<()>;
    async fn close_shutter(&self) -> DeviceResult<()>;
    async fn find_home(&self) -> DeviceResult<()>;
    async fn park(&self) -> DeviceResult<()>;
    async fn set_park(&self) -> DeviceResult<()>;
    async fn slew_to_altitude(&self, altitude: f64) -> DeviceResult<()>;
    async fn slew_to_azimuth(&self, azimuth: f64) -> DeviceResult<()>;
    async fn sync_to_azimuth(&self, azimuth: f64) -> DeviceResult<()>;
}
