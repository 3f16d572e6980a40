//! ASCOM Alpaca REST adapters for the engine's device traits
//!
//! URL scheme: `http://host:port/api/v1/{device_type}/{device_number}/{member}`
//! with all path elements in lower case. Responses carry the PascalCase
//! JSON envelope {Value, ErrorNumber, ErrorMessage}; a non-zero ErrorNumber
//! becomes a [`DeviceFault`] carrying the driver's own code, so the
//! engine's fault-code table sees exactly what the driver reported.

mod dome;
mod telescope;

pub use dome::AlpacaDome;
pub use telescope::AlpacaTelescope;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use conform_core::{DeviceFault, DeviceResult};

use crate::io::HttpClient;

/// Fault code used for transport-level failures (connection refused,
/// malformed responses). Outside the reserved Alpaca range, so the
/// engine classifies it as unexpected.
pub const TRANSPORT_FAULT: i32 = -1;

/// PascalCase response envelope common to every Alpaca member
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AlpacaResponse<T> {
    value: Option<T>,
    #[serde(default)]
    error_number: i32,
    #[serde(default)]
    error_message: String,
}

/// One device endpoint: shared HTTP client plus URL/transaction plumbing
pub(crate) struct AlpacaConnection {
    http: Arc<dyn HttpClient>,
    base_url: String,
    client_id: u32,
    transaction: AtomicU32,
}

impl AlpacaConnection {
    pub(crate) fn new(
        http: Arc<dyn HttpClient>,
        host: &str,
        port: u16,
        device_type: &str,
        device_number: u32,
    ) -> Self {
        let base_url = format!(
            "http://{}:{}/api/v1/{}/{}",
            host, port, device_type, device_number
        );
        tracing::debug!("Alpaca device endpoint {}", base_url);
        Self {
            http,
            base_url,
            client_id: std::process::id(),
            transaction: AtomicU32::new(1),
        }
    }

    fn next_transaction(&self) -> u32 {
        self.transaction.fetch_add(1, Ordering::Relaxed)
    }

    fn decode<T: DeserializeOwned>(&self, member: &str, body: &str) -> DeviceResult<T> {
        let parsed: AlpacaResponse<T> = serde_json::from_str(body).map_err(|e| {
            DeviceFault::new(
                TRANSPORT_FAULT,
                format!("{}: unparseable response: {}", member, e),
            )
        })?;
        if parsed.error_number != 0 {
            return Err(DeviceFault::new(parsed.error_number, parsed.error_message));
        }
        parsed.value.ok_or_else(|| {
            DeviceFault::new(
                TRANSPORT_FAULT,
                format!("{}: response carried no value", member),
            )
        })
    }

    /// GET a member value with optional extra query parameters
    pub(crate) async fn get_with<T: DeserializeOwned>(
        &self,
        member: &str,
        params: &[(&str, String)],
    ) -> DeviceResult<T> {
        let mut url = format!(
            "{}/{}?ClientID={}&ClientTransactionID={}",
            self.base_url,
            member,
            self.client_id,
            self.next_transaction()
        );
        for (key, value) in params {
            url.push_str(&format!("&{}={}", key, value));
        }

        let response = self
            .http
            .get(&url)
            .await
            .map_err(|e| DeviceFault::new(TRANSPORT_FAULT, e.to_string()))?;
        if response.status != 200 {
            return Err(DeviceFault::new(
                TRANSPORT_FAULT,
                format!("{}: HTTP status {}", member, response.status),
            ));
        }
        self.decode(member, &response.body)
    }

    pub(crate) async fn get_value<T: DeserializeOwned>(&self, member: &str) -> DeviceResult<T> {
        self.get_with(member, &[]).await
    }

    /// PUT a member with form parameters; the envelope's Value is ignored
    pub(crate) async fn put(&self, member: &str, params: &[(&str, String)]) -> DeviceResult<()> {
        let url = format!("{}/{}", self.base_url, member);
        let client_id = self.client_id.to_string();
        let transaction = self.next_transaction().to_string();

        let mut form: Vec<(&str, &str)> = vec![
            ("ClientID", client_id.as_str()),
            ("ClientTransactionID", transaction.as_str()),
        ];
        for (key, value) in params {
            form.push((key, value.as_str()));
        }

        let response = self
            .http
            .put_form(&url, &form)
            .await
            .map_err(|e| DeviceFault::new(TRANSPORT_FAULT, e.to_string()))?;
        if response.status != 200 {
            return Err(DeviceFault::new(
                TRANSPORT_FAULT,
                format!("{}: HTTP status {}", member, response.status),
            ));
        }

        let parsed: AlpacaResponse<serde_json::Value> = serde_json::from_str(&response.body)
            .map_err(|e| {
                DeviceFault::new(
                    TRANSPORT_FAULT,
                    format!("{}: unparseable response: {}", member, e),
                )
            })?;
        if parsed.error_number != 0 {
            return Err(DeviceFault::new(parsed.error_number, parsed.error_message));
        }
        Ok(())
    }
}

/// Wire form of one axis rate range
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AxisRateWire {
    pub minimum: f64,
    pub maximum: f64,
}

/// Decode an integer wire value into a protocol enum
pub(crate) fn decode_enum<T>(member: &str, value: i32) -> DeviceResult<T>
where
    T: TryFrom<i32, Error = i32>,
{
    T::try_from(value).map_err(|raw| {
        DeviceFault::new(
            TRANSPORT_FAULT,
            format!("{}: unknown wire value {}", member, raw),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{HttpResponse, MockHttpClient};

    fn connection(mock: MockHttpClient) -> AlpacaConnection {
        AlpacaConnection::new(Arc::new(mock), "localhost", 11111, "telescope", 0)
    }

    #[tokio::test]
    async fn get_decodes_value() {
        let mut mock = MockHttpClient::new();
        mock.expect_get()
            .withf(|url| url.contains("/api/v1/telescope/0/rightascension?ClientID="))
            .returning(|_| {
                Box::pin(async {
                    Ok(HttpResponse {
                        status: 200,
                        body: r#"{"Value": 12.5, "ErrorNumber": 0, "ErrorMessage": ""}"#
                            .to_string(),
                    })
                })
            });

        let conn = connection(mock);
        let value: f64 = conn.get_value("rightascension").await.expect("value");
        assert!((value - 12.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn nonzero_error_number_becomes_a_fault() {
        let mut mock = MockHttpClient::new();
        mock.expect_get().returning(|_| {
            Box::pin(async {
                Ok(HttpResponse {
                    status: 200,
                    body: r#"{"Value": 0.0, "ErrorNumber": 1024, "ErrorMessage": "Not implemented"}"#
                        .to_string(),
                })
            })
        });

        let conn = connection(mock);
        let fault = conn.get_value::<f64>("altitude").await.unwrap_err();
        assert_eq!(fault.code, 1024);
        assert_eq!(fault.message, "Not implemented");
    }

    #[tokio::test]
    async fn http_failure_becomes_a_transport_fault() {
        let mut mock = MockHttpClient::new();
        mock.expect_get().returning(|_| {
            Box::pin(async {
                Err(crate::HarnessError::Http("connection refused".to_string()))
            })
        });

        let conn = connection(mock);
        let fault = conn.get_value::<f64>("altitude").await.unwrap_err();
        assert_eq!(fault.code, TRANSPORT_FAULT);
    }

    #[tokio::test]
    async fn non_200_status_becomes_a_transport_fault() {
        let mut mock = MockHttpClient::new();
        mock.expect_get().returning(|_| {
            Box::pin(async {
                Ok(HttpResponse {
                    status: 500,
                    body: "Internal Server Error".to_string(),
                })
            })
        });

        let conn = connection(mock);
        let fault = conn.get_value::<f64>("altitude").await.unwrap_err();
        assert_eq!(fault.code, TRANSPORT_FAULT);
        assert!(fault.message.contains("500"));
    }

    #[tokio::test]
    async fn put_sends_client_ids_and_params() {
        let mut mock = MockHttpClient::new();
        mock.expect_put_form()
            .withf(|url, params| {
                url.ends_with("/api/v1/telescope/0/sitelatitude")
                    && params.iter().any(|(k, _)| *k == "ClientID")
                    && params.iter().any(|(k, _)| *k == "ClientTransactionID")
                    && params.contains(&("SiteLatitude", "45"))
            })
            .returning(|_, _| {
                Box::pin(async {
                    Ok(HttpResponse {
                        status: 200,
                        body: r#"{"ErrorNumber": 0, "ErrorMessage": ""}"#.to_string(),
                    })
                })
            });

        let conn = connection(mock);
        conn.put("sitelatitude", &[("SiteLatitude", "45".to_string())])
            .await
            .expect("put");
    }

    #[tokio::test]
    async fn put_error_number_becomes_a_fault() {
        let mut mock = MockHttpClient::new();
        mock.expect_put_form().returning(|_, _| {
            Box::pin(async {
                Ok(HttpResponse {
                    status: 200,
                    body: r#"{"ErrorNumber": 1025, "ErrorMessage": "Invalid value"}"#.to_string(),
                })
            })
        });

        let conn = connection(mock);
        let fault = conn
            .put("sitelatitude", &[("SiteLatitude", "91".to_string())])
            .await
            .unwrap_err();
        assert_eq!(fault.code, 1025);
    }

    #[tokio::test]
    async fn get_with_appends_extra_parameters() {
        let mut mock = MockHttpClient::new();
        mock.expect_get()
            .withf(|url| url.contains("/axisrates?") && url.contains("&Axis=0"))
            .returning(|_| {
                Box::pin(async {
                    Ok(HttpResponse {
                        status: 200,
                        body: r#"{"Value": [{"Minimum": 0.0, "Maximum": 4.0}], "ErrorNumber": 0, "ErrorMessage": ""}"#
                            .to_string(),
                    })
                })
            });

        let conn = connection(mock);
        let rates: Vec<AxisRateWire> = conn
            .get_with("axisrates", &[("Axis", "0".to_string())])
            .await
            .expect("rates");
        assert_eq!(rates.len(), 1);
        assert!((rates[0].maximum - 4.0).abs() < 1e-9);
    }

    #[test]
    fn decode_enum_rejects_unknown_values() {
        use conform_core::device::PierSide;
        let side: DeviceResult<PierSide> = decode_enum("sideofpier", 0);
        assert_eq!(side.expect("east"), PierSide::East);
        let bad: DeviceResult<PierSide> = decode_enum("sideofpier", 9);
        assert!(bad.is_err());
    }
}
