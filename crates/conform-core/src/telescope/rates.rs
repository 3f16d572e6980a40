//! Axis-rate and tracking-rate collection checks
//!
//! Enumerated collections must support a count, indexed access and
//! restartable iteration. Iterating twice must yield the same members both
//! times; a second enumeration that comes back empty while the first was
//! populated points at shared-iterator state inside the driver and is
//! flagged as a reporting defect, not treated as "empty is fine".

use std::collections::HashSet;

use crate::device::{AxisRate, TelescopeAxis, TelescopeDevice};
use crate::fault::Required;

use super::TelescopeTester;

/// True when any two rate ranges in the set intersect
pub fn axis_rates_overlap(rates: &[AxisRate]) -> bool {
    for (index, first) in rates.iter().enumerate() {
        for second in &rates[index + 1..] {
            if first.minimum <= second.maximum && second.minimum <= first.maximum {
                return true;
            }
        }
    }
    false
}

impl TelescopeTester {
    pub(crate) async fn check_tracking_rates_collection(&self) {
        let first = match self.device.tracking_rates().await {
            Ok(rates) => rates,
            Err(fault) => {
                self.handle_fault("TrackingRates", Required::Mandatory, &fault);
                return;
            }
        };

        if first.is_empty() {
            self.issue("TrackingRates", "collection is empty");
            return;
        }
        let listing = first
            .iter()
            .map(|rate| rate.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        self.ok(
            "TrackingRates",
            &format!("{} rates: {}", first.len(), listing),
        );

        let mut seen = HashSet::new();
        for rate in &first {
            if !seen.insert(*rate) {
                self.issue("TrackingRates", &format!("duplicate entry {}", rate));
            }
        }

        match self.device.tracking_rate().await {
            Ok(current) if !first.contains(&current) => self.issue(
                "TrackingRates",
                &format!("current TrackingRate {} is not in the collection", current),
            ),
            _ => {}
        }

        self.check_restartable_iteration(
            "TrackingRates",
            first.len(),
            self.device.tracking_rates().await.map(|rates| rates.len()),
        );
    }

    pub(crate) async fn check_axis_rates_collections(&self) {
        for axis in TelescopeAxis::ALL {
            if self.cancelled() {
                return;
            }
            let test = format!("AxisRates:{}", axis);
            let first = match self.device.axis_rates(axis).await {
                Ok(rates) => rates,
                Err(fault) => {
                    self.handle_fault(&test, Required::Mandatory, &fault);
                    continue;
                }
            };

            if first.is_empty() {
                if self.caps.can_move_axis[axis.index()] {
                    self.issue(
                        &test,
                        "collection is empty although CanMoveAxis is true",
                    );
                } else {
                    self.ok(&test, "empty collection for an unsupported axis");
                }
                continue;
            }

            let mut valid = true;
            for (index, rate) in first.iter().enumerate() {
                if rate.minimum < 0.0 {
                    self.issue(
                        &test,
                        &format!("rate {} has negative minimum {}", index + 1, rate.minimum),
                    );
                    valid = false;
                }
                if rate.minimum > rate.maximum {
                    self.issue(
                        &test,
                        &format!(
                            "rate {} minimum {} exceeds maximum {}",
                            index + 1,
                            rate.minimum,
                            rate.maximum
                        ),
                    );
                    valid = false;
                }
            }
            if axis_rates_overlap(&first) {
                self.issue(&test, "rate ranges overlap");
                valid = false;
            }
            if valid {
                let listing = first
                    .iter()
                    .map(|rate| format!("[{}, {}]", rate.minimum, rate.maximum))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.ok(&test, &format!("{} ranges: {}", first.len(), listing));
            }

            self.check_restartable_iteration(
                &test,
                first.len(),
                self.device.axis_rates(axis).await.map(|rates| rates.len()),
            );
        }
    }

    /// The shared-iterator heuristic: compare counts across two
    /// independent enumerations of the same collection
    fn check_restartable_iteration(
        &self,
        test: &str,
        first_count: usize,
        second: Result<usize, crate::fault::DeviceFault>,
    ) {
        match second {
            Ok(0) if first_count > 0 => self.issue(
                test,
                "second enumeration returned no members; the driver appears to \
                 share iterator state between requests",
            ),
            Ok(count) if count != first_count => self.issue(
                test,
                &format!(
                    "second enumeration returned {} members, first returned {}",
                    count, first_count
                ),
            ),
            Ok(_) => self.ok(test, "iteration is restartable"),
            Err(fault) => self.error(
                test,
                &format!("second enumeration raised a fault: {}", fault),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_ranges_are_detected() {
        let rates = [AxisRate::new(0.0, 2.0), AxisRate::new(1.0, 3.0)];
        assert!(axis_rates_overlap(&rates));
    }

    #[test]
    fn disjoint_ranges_do_not_overlap() {
        let rates = [AxisRate::new(0.0, 1.0), AxisRate::new(2.0, 3.0)];
        assert!(!axis_rates_overlap(&rates));
    }

    #[test]
    fn touching_ranges_overlap() {
        let rates = [AxisRate::new(0.0, 1.0), AxisRate::new(1.0, 2.0)];
        assert!(axis_rates_overlap(&rates));
    }

    #[test]
    fn single_range_never_overlaps() {
        let rates = [AxisRate::new(0.0, 5.0)];
        assert!(!axis_rates_overlap(&rates));
    }

    #[test]
    fn empty_set_never_overlaps() {
        assert!(!axis_rates_overlap(&[]));
    }
}
