//! Alpaca REST dome adapter

use std::sync::Arc;

use async_trait::async_trait;

use conform_core::device::{Device, DomeDevice, ShutterState};
use conform_core::DeviceResult;

use super::{decode_enum, AlpacaConnection};
use crate::io::HttpClient;

/// Dome reached over the Alpaca REST protocol
pub struct AlpacaDome {
    name: String,
    conn: AlpacaConnection,
}

impl AlpacaDome {
    pub fn new(http: Arc<dyn HttpClient>, host: &str, port: u16, device_number: u32) -> Self {
        Self {
            name: format!("dome/{} at {}:{}", device_number, host, port),
            conn: AlpacaConnection::new(http, host, port, "dome", device_number),
        }
    }
}

impl std::fmt::Debug for AlpacaDome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlpacaDome")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Device for AlpacaDome {
    fn name(&self) -> &str {
        &self.name
    }

    async fn description(&self) -> DeviceResult<String> {
        self.conn.get_value("description").await
    }

    async fn connected(&self) -> DeviceResult<bool> {
        self.conn.get_value("connected").await
    }

    async fn set_connected(&self, connected: bool) -> DeviceResult<()> {
        self.conn
            .put("connected", &[("Connected", connected.to_string())])
            .await
    }

    async fn driver_info(&self) -> DeviceResult<String> {
        self.conn.get_value("driverinfo").await
    }

    async fn driver_version(&self) -> DeviceResult<String> {
        self.conn.get_value("driverversion").await
    }
}

#[async_trait]
impl DomeDevice for AlpacaDome {
    async fn can_find_home(&self) -> DeviceResult<bool> {
        self.conn.get_value("canfindhome").await
    }

    async fn can_park(&self) -> DeviceResult<bool> {
        self.conn.get_value("canpark").await
    }

    async fn can_set_altitude(&self) -> DeviceResult<bool> {
        self.conn.get_value("cansetaltitude").await
    }

    async fn can_set_azimuth(&self) -> DeviceResult<bool> {
        self.conn.get_value("cansetazimuth").await
    }

    async fn can_set_park(&self) -> DeviceResult<bool> {
        self.conn.get_value("cansetpark").await
    }

    async fn can_set_shutter(&self) -> DeviceResult<bool> {
        self.conn.get_value("cansetshutter").await
    }

    async fn can_slave(&self) -> DeviceResult<bool> {
        self.conn.get_value("canslave").await
    }

    async fn can_sync_azimuth(&self) -> DeviceResult<bool> {
        self.conn.get_value("cansyncazimuth").await
    }

    async fn altitude(&self) -> DeviceResult<f64> {
        self.conn.get_value("altitude").await
    }

    async fn azimuth(&self) -> DeviceResult<f64> {
        self.conn.get_value("azimuth").await
    }

    async fn at_home(&self) -> DeviceResult<bool> {
        self.conn.get_value("athome").await
    }

    async fn at_park(&self) -> DeviceResult<bool> {
        self.conn.get_value("atpark").await
    }

    async fn shutter_status(&self) -> DeviceResult<ShutterState> {
        let raw: i32 = self.conn.get_value("shutterstatus").await?;
        decode_enum("shutterstatus", raw)
    }

    async fn slewing(&self) -> DeviceResult<bool> {
        self.conn.get_value("slewing").await
    }

    async fn slaved(&self) -> DeviceResult<bool> {
        self.conn.get_value("slaved").await
    }

    async fn set_slaved(&self, slaved: bool) -> DeviceResult<()> {
        self.conn
            .put("slaved", &[("Slaved", slaved.to_string())])
            .await
    }

    async fn abort_slew(&self) -> DeviceResult<()> {
        self.conn.put("abortslew", &[]).await
    }

    async fn open_shutter(&self) -> DeviceResult<()> {
        self.conn.put("openshutter", &[]).await
    }

    async fn close_shutter(&self) -> DeviceResult<()> {
        self.conn.put("closeshutter", &[]).await
    }

    async fn find_home(&self) -> DeviceResult<()> {
        self.conn.put("findhome", &[]).await
    }

    async fn park(&self) -> DeviceResult<()> {
        self.conn.put("park", &[]).await
    }

    async fn set_park(&self) -> DeviceResult<()> {
        self.conn.put("setpark", &[]).await
    }

    async fn slew_to_altitude(&self, altitude: f64) -> DeviceResult<()> {
        self.conn
            .put("slewtoaltitude", &[("Altitude", altitude.to_string())])
            .await
    }

    async fn slew_to_azimuth(&self, azimuth: f64) -> DeviceResult<()> {
        self.conn
            .put("slewtoazimuth", &[("Azimuth", azimuth.to_string())])
            .await
    }

    async fn sync_to_azimuth(&self, azimuth: f64) -> DeviceResult<()> {
        self.conn
            .put("synctoazimuth", &[("Azimuth", azimuth.to_string())])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{HttpResponse, MockHttpClient};

    #[tokio::test]
    async fn shutter_status_decodes_wire_value() {
        let mut mock = MockHttpClient::new();
        mock.expect_get()
            .withf(|url| url.contains("/api/v1/dome/0/shutterstatus"))
            .returning(|_| {
                Box::pin(async {
                    Ok(HttpResponse {
                        status: 200,
                        body: r#"{"Value": 2, "ErrorNumber": 0, "ErrorMessage": ""}"#.to_string(),
                    })
                })
            });

        let dome = AlpacaDome::new(Arc::new(mock), "localhost", 11111, 0);
        assert_eq!(
            dome.shutter_status().await.expect("status"),
            ShutterState::Opening
        );
    }

    #[tokio::test]
    async fn slew_to_azimuth_sends_parameter() {
        let mut mock = MockHttpClient::new();
        mock.expect_put_form()
            .withf(|url, params| {
                url.ends_with("/slewtoazimuth") && params.contains(&("Azimuth", "180"))
            })
            .returning(|_, _| {
                Box::pin(async {
                    Ok(HttpResponse {
                        status: 200,
                        body: r#"{"ErrorNumber": 0, "ErrorMessage": ""}"#.to_string(),
                    })
                })
            });

        let dome = AlpacaDome::new(Arc::new(mock), "localhost", 11111, 0);
        dome.slew_to_azimuth(180.0).await.expect("slew");
    }

    #[tokio::test]
    async fn not_implemented_error_surfaces_the_driver_code() {
        let mut mock = MockHttpClient::new();
        mock.expect_put_form().returning(|_, _| {
            Box::pin(async {
                Ok(HttpResponse {
                    status: 200,
                    body: r#"{"ErrorNumber": 1024, "ErrorMessage": "Not implemented"}"#
                        .to_string(),
                })
            })
        });

        let dome = AlpacaDome::new(Arc::new(mock), "localhost", 11111, 0);
        let fault = dome.open_shutter().await.unwrap_err();
        assert_eq!(fault.code, 1024);
    }
}
