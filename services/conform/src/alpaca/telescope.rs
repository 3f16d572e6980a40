//! Alpaca REST telescope adapter

use std::sync::Arc;

use async_trait::async_trait;

use conform_core::device::{
    AlignmentMode, AxisRate, Device, DriveRate, EquatorialSystem, GuideDirection, PierSide,
    TelescopeAxis, TelescopeDevice,
};
use conform_core::DeviceResult;

use super::{decode_enum, AlpacaConnection, AxisRateWire};
use crate::io::HttpClient;

/// Telescope reached over the Alpaca REST protocol
pub struct AlpacaTelescope {
    name: String,
    conn: AlpacaConnection,
}

impl AlpacaTelescope {
    pub fn new(http: Arc<dyn HttpClient>, host: &str, port: u16, device_number: u32) -> Self {
        Self {
            name: format!("telescope/{} at {}:{}", device_number, host, port),
            conn: AlpacaConnection::new(http, host, port, "telescope", device_number),
        }
    }
}

impl std::fmt::Debug for AlpacaTelescope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlpacaTelescope")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Device for AlpacaTelescope {
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
impl TelescopeDevice for AlpacaTelescope {
    async fn can_find_home(&self) -> DeviceResult<bool> {
        self.conn.get_value("canfindhome").await
    }

    async fn can_park(&self) -> DeviceResult<bool> {
        self.conn.get_value("canpark").await
    }

    async fn can_pulse_guide(&self) -> DeviceResult<bool> {
        self.conn.get_value("canpulseguide").await
    }

    async fn can_set_declination_rate(&self) -> DeviceResult<bool> {
        self.conn.get_value("cansetdeclinationrate").await
    }

    async fn can_set_guide_rates(&self) -> DeviceResult<bool> {
        self.conn.get_value("cansetguiderates").await
    }

    async fn can_set_park(&self) -> DeviceResult<bool> {
        self.conn.get_value("cansetpark").await
    }

    async fn can_set_pier_side(&self) -> DeviceResult<bool> {
        self.conn.get_value("cansetpierside").await
    }

    async fn can_set_right_ascension_rate(&self) -> DeviceResult<bool> {
        self.conn.get_value("cansetrightascensionrate").await
    }

    async fn can_set_tracking(&self) -> DeviceResult<bool> {
        self.conn.get_value("cansettracking").await
    }

    async fn can_slew(&self) -> DeviceResult<bool> {
        self.conn.get_value("canslew").await
    }

    async fn can_slew_async(&self) -> DeviceResult<bool> {
        self.conn.get_value("canslewasync").await
    }

    async fn can_slew_alt_az(&self) -> DeviceResult<bool> {
        self.conn.get_value("canslewaltaz").await
    }

    async fn can_slew_alt_az_async(&self) -> DeviceResult<bool> {
        self.conn.get_value("canslewaltazasync").await
    }

    async fn can_sync(&self) -> DeviceResult<bool> {
        self.conn.get_value("cansync").await
    }

    async fn can_sync_alt_az(&self) -> DeviceResult<bool> {
        self.conn.get_value("cansyncaltaz").await
    }

    async fn can_unpark(&self) -> DeviceResult<bool> {
        self.conn.get_value("canunpark").await
    }

    async fn can_move_axis(&self, axis: TelescopeAxis) -> DeviceResult<bool> {
        self.conn
            .get_with(
                "canmoveaxis",
                &[("Axis", axis.wire_value().to_string())],
            )
            .await
    }

    async fn alignment_mode(&self) -> DeviceResult<AlignmentMode> {
        let raw: i32 = self.conn.get_value("alignmentmode").await?;
        decode_enum("alignmentmode", raw)
    }

    async fn altitude(&self) -> DeviceResult<f64> {
        self.conn.get_value("altitude").await
    }

    async fn azimuth(&self) -> DeviceResult<f64> {
        self.conn.get_value("azimuth").await
    }

    async fn declination(&self) -> DeviceResult<f64> {
        self.conn.get_value("declination").await
    }

    async fn right_ascension(&self) -> DeviceResult<f64> {
        self.conn.get_value("rightascension").await
    }

    async fn sidereal_time(&self) -> DeviceResult<f64> {
        self.conn.get_value("siderealtime").await
    }

    async fn aperture_area(&self) -> DeviceResult<f64> {
        self.conn.get_value("aperturearea").await
    }

    async fn aperture_diameter(&self) -> DeviceResult<f64> {
        self.conn.get_value("aperturediameter").await
    }

    async fn focal_length(&self) -> DeviceResult<f64> {
        self.conn.get_value("focallength").await
    }

    async fn at_home(&self) -> DeviceResult<bool> {
        self.conn.get_value("athome").await
    }

    async fn at_park(&self) -> DeviceResult<bool> {
        self.conn.get_value("atpark").await
    }

    async fn slewing(&self) -> DeviceResult<bool> {
        self.conn.get_value("slewing").await
    }

    async fn is_pulse_guiding(&self) -> DeviceResult<bool> {
        self.conn.get_value("ispulseguiding").await
    }

    async fn equatorial_system(&self) -> DeviceResult<EquatorialSystem> {
        let raw: i32 = self.conn.get_value("equatorialsystem").await?;
        decode_enum("equatorialsystem", raw)
    }

    async fn destination_side_of_pier(&self, ra: f64, dec: f64) -> DeviceResult<PierSide> {
        let raw: i32 = self
            .conn
            .get_with(
                "destinationsideofpier",
                &[
                    ("RightAscension", ra.to_string()),
                    ("Declination", dec.to_string()),
                ],
            )
            .await?;
        decode_enum("destinationsideofpier", raw)
    }

    async fn tracking(&self) -> DeviceResult<bool> {
        self.conn.get_value("tracking").await
    }

    async fn set_tracking(&self, tracking: bool) -> DeviceResult<()> {
        self.conn
            .put("tracking", &[("Tracking", tracking.to_string())])
            .await
    }

    async fn tracking_rate(&self) -> DeviceResult<DriveRate> {
        let raw: i32 = self.conn.get_value("trackingrate").await?;
        decode_enum("trackingrate", raw)
    }

    async fn set_tracking_rate(&self, rate: DriveRate) -> DeviceResult<()> {
        self.conn
            .put(
                "trackingrate",
                &[("TrackingRate", rate.wire_value().to_string())],
            )
            .await
    }

    async fn tracking_rates(&self) -> DeviceResult<Vec<DriveRate>> {
        let raw: Vec<i32> = self.conn.get_value("trackingrates").await?;
        raw.into_iter()
            .map(|value| decode_enum("trackingrates", value))
            .collect()
    }

    async fn declination_rate(&self) -> DeviceResult<f64> {
        self.conn.get_value("declinationrate").await
    }

    async fn set_declination_rate(&self, rate: f64) -> DeviceResult<()> {
        self.conn
            .put(
                "declinationrate",
                &[("DeclinationRate", rate.to_string())],
            )
            .await
    }

    async fn right_ascension_rate(&self) -> DeviceResult<f64> {
        self.conn.get_value("rightascensionrate").await
    }

    async fn set_right_ascension_rate(&self, rate: f64) -> DeviceResult<()> {
        self.conn
            .put(
                "rightascensionrate",
                &[("RightAscensionRate", rate.to_string())],
            )
            .await
    }

    async fn guide_rate_declination(&self) -> DeviceResult<f64> {
        self.conn.get_value("guideratedeclination").await
    }

    async fn set_guide_rate_declination(&self, rate: f64) -> DeviceResult<()> {
        self.conn
            .put(
                "guideratedeclination",
                &[("GuideRateDeclination", rate.to_string())],
            )
            .await
    }

    async fn guide_rate_right_ascension(&self) -> DeviceResult<f64> {
        self.conn.get_value("guideraterightascension").await
    }

    async fn set_guide_rate_right_ascension(&self, rate: f64) -> DeviceResult<()> {
        self.conn
            .put(
                "guideraterightascension",
                &[("GuideRateRightAscension", rate.to_string())],
            )
            .await
    }

    async fn does_refraction(&self) -> DeviceResult<bool> {
        self.conn.get_value("doesrefraction").await
    }

    async fn set_does_refraction(&self, does_refraction: bool) -> DeviceResult<()> {
        self.conn
            .put(
                "doesrefraction",
                &[("DoesRefraction", does_refraction.to_string())],
            )
            .await
    }

    async fn side_of_pier(&self) -> DeviceResult<PierSide> {
        let raw: i32 = self.conn.get_value("sideofpier").await?;
        decode_enum("sideofpier", raw)
    }

    async fn set_side_of_pier(&self, side: PierSide) -> DeviceResult<()> {
        self.conn
            .put(
                "sideofpier",
                &[("SideOfPier", side.wire_value().to_string())],
            )
            .await
    }

    async fn site_elevation(&self) -> DeviceResult<f64> {
        self.conn.get_value("siteelevation").await
    }

    async fn set_site_elevation(&self, elevation_m: f64) -> DeviceResult<()> {
        self.conn
            .put(
                "siteelevation",
                &[("SiteElevation", elevation_m.to_string())],
            )
            .await
    }

    async fn site_latitude(&self) -> DeviceResult<f64> {
        self.conn.get_value("sitelatitude").await
    }

    async fn set_site_latitude(&self, latitude_deg: f64) -> DeviceResult<()> {
        self.conn
            .put(
                "sitelatitude",
                &[("SiteLatitude", latitude_deg.to_string())],
            )
            .await
    }

    async fn site_longitude(&self) -> DeviceResult<f64> {
        self.conn.get_value("sitelongitude").await
    }

    async fn set_site_longitude(&self, longitude_deg: f64) -> DeviceResult<()> {
        self.conn
            .put(
                "sitelongitude",
                &[("SiteLongitude", longitude_deg.to_string())],
            )
            .await
    }

    async fn slew_settle_time(&self) -> DeviceResult<i32> {
        self.conn.get_value("slewsettletime").await
    }

    async fn set_slew_settle_time(&self, seconds: i32) -> DeviceResult<()> {
        self.conn
            .put(
                "slewsettletime",
                &[("SlewSettleTime", seconds.to_string())],
            )
            .await
    }

    async fn target_declination(&self) -> DeviceResult<f64> {
        self.conn.get_value("targetdeclination").await
    }

    async fn set_target_declination(&self, dec: f64) -> DeviceResult<()> {
        self.conn
            .put(
                "targetdeclination",
                &[("TargetDeclination", dec.to_string())],
            )
            .await
    }

    async fn target_right_ascension(&self) -> DeviceResult<f64> {
        self.conn.get_value("targetrightascension").await
    }

    async fn set_target_right_ascension(&self, ra: f64) -> DeviceResult<()> {
        self.conn
            .put(
                "targetrightascension",
                &[("TargetRightAscension", ra.to_string())],
            )
            .await
    }

    async fn utc_date(&self) -> DeviceResult<String> {
        self.conn.get_value("utcdate").await
    }

    async fn set_utc_date(&self, utc: String) -> DeviceResult<()> {
        self.conn.put("utcdate", &[("UTCDate", utc)]).await
    }

    async fn axis_rates(&self, axis: TelescopeAxis) -> DeviceResult<Vec<AxisRate>> {
        let raw: Vec<AxisRateWire> = self
            .conn
            .get_with("axisrates", &[("Axis", axis.wire_value().to_string())])
            .await?;
        Ok(raw
            .into_iter()
            .map(|rate| AxisRate::new(rate.minimum, rate.maximum))
            .collect())
    }

    async fn move_axis(&self, axis: TelescopeAxis, rate: f64) -> DeviceResult<()> {
        self.conn
            .put(
                "moveaxis",
                &[
                    ("Axis", axis.wire_value().to_string()),
                    ("Rate", rate.to_string()),
                ],
            )
            .await
    }

    async fn pulse_guide(&self, direction: GuideDirection, duration_ms: i32) -> DeviceResult<()> {
        self.conn
            .put(
                "pulseguide",
                &[
                    ("Direction", direction.wire_value().to_string()),
                    ("Duration", duration_ms.to_string()),
                ],
            )
            .await
    }

    async fn abort_slew(&self) -> DeviceResult<()> {
        self.conn.put("abortslew", &[]).await
    }

    async fn find_home(&self) -> DeviceResult<()> {
        self.conn.put("findhome", &[]).await
    }

    async fn park(&self) -> DeviceResult<()> {
        self.conn.put("park", &[]).await
    }

    async fn unpark(&self) -> DeviceResult<()> {
        self.conn.put("unpark", &[]).await
    }

    async fn set_park(&self) -> DeviceResult<()> {
        self.conn.put("setpark", &[]).await
    }

    async fn slew_to_coordinates(&self, ra: f64, dec: f64) -> DeviceResult<()> {
        self.conn
            .put(
                "slewtocoordinates",
                &[
                    ("RightAscension", ra.to_string()),
                    ("Declination", dec.to_string()),
                ],
            )
            .await
    }

    async fn slew_to_coordinates_async(&self, ra: f64, dec: f64) -> DeviceResult<()> {
        self.conn
            .put(
                "slewtocoordinatesasync",
                &[
                    ("RightAscension", ra.to_string()),
                    ("Declination", dec.to_string()),
                ],
            )
            .await
    }

    async fn slew_to_target(&self) -> DeviceResult<()> {
        self.conn.put("slewtotarget", &[]).await
    }

    async fn slew_to_target_async(&self) -> DeviceResult<()> {
        self.conn.put("slewtotargetasync", &[]).await
    }

    async fn slew_to_alt_az(&self, azimuth: f64, altitude: f64) -> DeviceResult<()> {
        self.conn
            .put(
                "slewtoaltaz",
                &[
                    ("Azimuth", azimuth.to_string()),
                    ("Altitude", altitude.to_string()),
                ],
            )
            .await
    }

    async fn slew_to_alt_az_async(&self, azimuth: f64, altitude: f64) -> DeviceResult<()> {
        self.conn
            .put(
                "slewtoaltazasync",
                &[
                    ("Azimuth", azimuth.to_string()),
                    ("Altitude", altitude.to_string()),
                ],
            )
            .await
    }

    async fn sync_to_coordinates(&self, ra: f64, dec: f64) -> DeviceResult<()> {
        self.conn
            .put(
                "synctocoordinates",
                &[
                    ("RightAscension", ra.to_string()),
                    ("Declination", dec.to_string()),
                ],
            )
            .await
    }

    async fn sync_to_target(&self) -> DeviceResult<()> {
        self.conn.put("synctotarget", &[]).await
    }

    async fn sync_to_alt_az(&self, azimuth: f64, altitude: f64) -> DeviceResult<()> {
        self.conn
            .put(
                "synctoaltaz",
                &[
                    ("Azimuth", azimuth.to_string()),
                    ("Altitude", altitude.to_string()),
                ],
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{HttpResponse, MockHttpClient};

    fn value_response(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn tracking_rates_decode_from_wire_integers() {
        let mut mock = MockHttpClient::new();
        mock.expect_get()
            .withf(|url| url.contains("/trackingrates"))
            .returning(|_| {
                Box::pin(async {
                    Ok(value_response(
                        r#"{"Value": [0, 1, 2, 3], "ErrorNumber": 0, "ErrorMessage": ""}"#,
                    ))
                })
            });

        let telescope = AlpacaTelescope::new(Arc::new(mock), "localhost", 11111, 0);
        let rates = telescope.tracking_rates().await.expect("rates");
        assert_eq!(
            rates,
            vec![
                DriveRate::Sidereal,
                DriveRate::Lunar,
                DriveRate::Solar,
                DriveRate::King
            ]
        );
    }

    #[tokio::test]
    async fn unknown_tracking_rate_is_a_fault() {
        let mut mock = MockHttpClient::new();
        mock.expect_get().returning(|_| {
            Box::pin(async {
                Ok(value_response(
                    r#"{"Value": [0, 9], "ErrorNumber": 0, "ErrorMessage": ""}"#,
                ))
            })
        });

        let telescope = AlpacaTelescope::new(Arc::new(mock), "localhost", 11111, 0);
        let fault = telescope.tracking_rates().await.unwrap_err();
        assert!(fault.message.contains("unknown wire value 9"));
    }

    #[tokio::test]
    async fn slew_to_coordinates_sends_both_parameters() {
        let mut mock = MockHttpClient::new();
        mock.expect_put_form()
            .withf(|url, params| {
                url.ends_with("/slewtocoordinates")
                    && params.contains(&("RightAscension", "12.5"))
                    && params.contains(&("Declination", "45"))
            })
            .returning(|_, _| {
                Box::pin(async {
                    Ok(value_response(r#"{"ErrorNumber": 0, "ErrorMessage": ""}"#))
                })
            });

        let telescope = AlpacaTelescope::new(Arc::new(mock), "localhost", 11111, 0);
        telescope
            .slew_to_coordinates(12.5, 45.0)
            .await
            .expect("slew");
    }

    #[tokio::test]
    async fn side_of_pier_decodes_wire_value() {
        let mut mock = MockHttpClient::new();
        mock.expect_get()
            .withf(|url| url.contains("/sideofpier"))
            .returning(|_| {
                Box::pin(async {
                    Ok(value_response(
                        r#"{"Value": 1, "ErrorNumber": 0, "ErrorMessage": ""}"#,
                    ))
                })
            });

        let telescope = AlpacaTelescope::new(Arc::new(mock), "localhost", 11111, 0);
        assert_eq!(telescope.side_of_pier().await.expect("side"), PierSide::West);
    }

    #[tokio::test]
    async fn axis_rates_decode_pascal_case_ranges() {
        let mut mock = MockHttpClient::new();
        mock.expect_get()
            .withf(|url| url.contains("/axisrates") && url.contains("Axis=1"))
            .returning(|_| {
                Box::pin(async {
                    Ok(value_response(
                        r#"{"Value": [{"Minimum": 0.5, "Maximum": 3.5}], "ErrorNumber": 0, "ErrorMessage": ""}"#,
                    ))
                })
            });

        let telescope = AlpacaTelescope::new(Arc::new(mock), "localhost", 11111, 0);
        let rates = telescope
            .axis_rates(TelescopeAxis::Secondary)
            .await
            .expect("rates");
        assert_eq!(rates.len(), 1);
        assert!((rates[0].minimum - 0.5).abs() < 1e-9);
        assert!((rates[0].maximum - 3.5).abs() < 1e-9);
    }
}
