//! Device capability/operation interface consumed by the engine
//!
//! The engine never talks to a transport. It drives devices through these
//! async traits; the harness binary supplies adapters (Alpaca REST, or the
//! built-in simulators) behind them. Every member returns
//! [`DeviceResult`](crate::fault::DeviceResult) so a driver can signal
//! not-implemented, invalid-value and friends as data.

mod dome;
mod telescope;
mod types;

pub use dome::DomeDevice;
pub use telescope::TelescopeDevice;
pub use types::{
    AlignmentMode, AxisRate, DriveRate, EquatorialSystem, GuideDirection, PierSide, ShutterState,
    TelescopeAxis,
};

use async_trait::async_trait;

use crate::fault::DeviceResult;

/// Members common to every device class
#[async_trait]
pub trait Device: Send + Sync {
    /// Short display name of the device
    fn name(&self) -> &str;

    async fn description(&self) -> DeviceResult<String>;

    async fn connected(&self) -> DeviceResult<bool>;

    async fn set_connected(&self, connected: bool) -> DeviceResult<()>;

    async fn driver_info(&self) -> DeviceResult<String>;

    async fn driver_version(&self) -> DeviceResult<String>;
}
