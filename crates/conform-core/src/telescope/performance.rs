//! Call-rate smoke tests
//!
//! Each probe calls one member in a tight loop for a fixed wall-clock
//! window, polling cancellation on every iteration, and reports the
//! resulting calls/second as an advisory band. Never pass/fail.

use std::time::Instant;

use crate::device::TelescopeDevice;
use crate::fault::DeviceResult;

use super::TelescopeTester;

/// Members exercised by the telescope performance probe
#[derive(Debug, Clone, Copy)]
enum PerfProp {
    RightAscension,
    Declination,
    Slewing,
    IsPulseGuiding,
}

/// Advisory banding of a measured call rate
pub(crate) fn describe_rate(calls_per_second: f64) -> String {
    if calls_per_second >= 10.0 {
        format!("{:.1} calls/second, transaction rate is fast", calls_per_second)
    } else if calls_per_second >= 2.0 {
        format!("{:.1} calls/second, transaction rate is good", calls_per_second)
    } else if calls_per_second >= 1.0 {
        format!("{:.1} calls/second, transaction rate is acceptable", calls_per_second)
    } else {
        format!(
            "{:.2} calls/second, transaction rate is slow and may limit client applications",
            calls_per_second
        )
    }
}

impl TelescopeTester {
    pub(crate) async fn check_performance(&self) {
        let probes = [
            ("Performance: RightAscension", PerfProp::RightAscension),
            ("Performance: Declination", PerfProp::Declination),
            ("Performance: Slewing", PerfProp::Slewing),
            ("Performance: IsPulseGuiding", PerfProp::IsPulseGuiding),
        ];
        for (test, prop) in probes {
            if self.cancelled() {
                return;
            }
            if matches!(prop, PerfProp::IsPulseGuiding) && !self.caps.can_pulse_guide {
                continue;
            }
            self.measure(test, prop).await;
        }
    }

    async fn probe(&self, prop: PerfProp) -> DeviceResult<()> {
        let device = self.device.as_ref();
        match prop {
            PerfProp::RightAscension => device.right_ascension().await.map(|_| ()),
            PerfProp::Declination => device.declination().await.map(|_| ()),
            PerfProp::Slewing => device.slewing().await.map(|_| ()),
            PerfProp::IsPulseGuiding => device.is_pulse_guiding().await.map(|_| ()),
        }
    }

    async fn measure(&self, test: &str, prop: PerfProp) {
        let window = self.settings.performance_window;
        let start = Instant::now();
        let mut calls: u64 = 0;

        while start.elapsed() < window {
            if self.cancelled() {
                return;
            }
            if let Err(fault) = self.probe(prop).await {
                self.info(test, &format!("member faulted during probe: {}", fault));
                return;
            }
            calls += 1;
            self.sink.set_status(test, "measuring", &calls.to_string());
        }

        let elapsed = start.elapsed().as_secs_f64();
        if elapsed <= 0.0 {
            return;
        }
        self.info(test, &describe_rate(calls as f64 / elapsed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_bands_cover_the_spectrum() {
        assert!(describe_rate(50.0).contains("fast"));
        assert!(describe_rate(5.0).contains("good"));
        assert!(describe_rate(1.5).contains("acceptable"));
        assert!(describe_rate(0.2).contains("slow"));
    }
}
