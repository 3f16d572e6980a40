//! Conformance harness for ASCOM Alpaca devices
//!
//! Wires the verification engine in `conform-core` to a concrete device:
//! an Alpaca REST endpoint by default, or the built-in simulator in
//! loopback mode. Owns configuration loading, the terminal outcome sink
//! and ctrl-c cancellation.

pub mod alpaca;
pub mod config;
pub mod error;
pub mod io;
pub mod sink;

pub use config::{load_config, Config, DeviceType};
pub use error::{HarnessError, Result};

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use conform_core::device::{DomeDevice, TelescopeDevice};
use conform_core::sim::{SimDome, SimTelescope};
use conform_core::{DomeTester, TelescopeTester};

use crate::alpaca::{AlpacaDome, AlpacaTelescope};
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::sink::TerminalSink;

/// Run one conformance check per the configuration; returns the sink so
/// the caller can inspect severity counts
pub async fn run(config: Config, cancel: CancellationToken) -> Result<Arc<TerminalSink>> {
    let sink = Arc::new(TerminalSink::new());

    match config.device.device_type {
        DeviceType::Telescope => {
            let device: Arc<dyn TelescopeDevice> = if config.loopback {
                tracing::info!("Running against the built-in telescope simulator");
                Arc::new(SimTelescope::new())
            } else {
                let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::default());
                Arc::new(AlpacaTelescope::new(
                    http,
                    &config.device.host,
                    config.device.port,
                    config.device.device_number,
                ))
            };
            let mut tester = TelescopeTester::new(
                device,
                sink.clone(),
                config.settings,
                config.fault_codes,
                cancel,
            );
            tester.run().await?;
        }
        DeviceType::Dome => {
            let device: Arc<dyn DomeDevice> = if config.loopback {
                tracing::info!("Running against the built-in dome simulator");
                Arc::new(SimDome::new())
            } else {
                let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::default());
                Arc::new(AlpacaDome::new(
                    http,
                    &config.device.host,
                    config.device.port,
                    config.device.device_number,
                ))
            };
            let mut tester = DomeTester::new(
                device,
                sink.clone(),
                config.settings,
                config.fault_codes,
                cancel,
            );
            tester.run().await?;
        }
    }

    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loopback_telescope_run_completes_cleanly() {
        let mut config = Config::default();
        config.loopback = true;
        config.settings = conform_core::Settings::fast();

        let sink = run(config, CancellationToken::new()).await.expect("run");
        assert!(!sink.has_errors());
        assert!(sink.count(conform_core::Severity::Ok) > 0);
    }

    #[tokio::test]
    async fn loopback_dome_run_completes_cleanly() {
        let mut config = Config::default();
        config.device.device_type = DeviceType::Dome;
        config.loopback = true;
        config.settings = conform_core::Settings::fast();

        let sink = run(config, CancellationToken::new()).await.expect("run");
        assert!(!sink.has_errors());
    }
}
