//! In-memory simulator devices
//!
//! `SimTelescope` and `SimDome` implement the device traits with time-based
//! motion: slews take a configurable duration, shutter transitions pass
//! through the transitional states, parking sets `AtPark`. They are the
//! engine's own test fixtures and the harness binary's loopback target.
//!
//! `SimQuirks` switches on deliberate protocol violations so the engine's
//! detection logic can be exercised: a quirky simulator must make the
//! harness emit the matching Issue/Error outcomes.

mod dome;
mod telescope;

pub use dome::{DomeQuirks, SimDome};
pub use telescope::{SimQuirks, SimTelescope};

use crate::device::PierSide;
use crate::transform::condition_ha;

/// Pier side by pointing state: the side flips when the hour angle changes
/// sign, which is what the protocol requires a driver to report.
pub(crate) fn pointing_side(hour_angle: f64) -> PierSide {
    if condition_ha(hour_angle) < 0.0 {
        PierSide::West
    } else {
        PierSide::East
    }
}

/// Pier side by mechanical position: a German mount goes through the pole
/// beyond |HA| = 6h, so the physical side matches across the meridian in
/// exactly the pattern the protocol forbids drivers to report.
pub(crate) fn physical_side(hour_angle: f64) -> PierSide {
    let ha = condition_ha(hour_angle);
    if (-6.0..0.0).contains(&ha) || ha >= 6.0 {
        PierSide::West
    } else {
        PierSide::East
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointing_side_matches_across_same_sign_hour_angles() {
        assert_eq!(pointing_side(-9.0), pointing_side(-3.0));
        assert_eq!(pointing_side(3.0), pointing_side(9.0));
        assert_ne!(pointing_side(-3.0), pointing_side(3.0));
    }

    #[test]
    fn physical_side_matches_across_the_meridian() {
        assert_eq!(physical_side(-3.0), physical_side(9.0));
        assert_eq!(physical_side(3.0), physical_side(-9.0));
        assert_ne!(physical_side(-3.0), physical_side(-9.0));
    }
}
