//! Protocol enums and value types shared by the device traits
//!
//! Numeric values match the Alpaca wire representation; `TryFrom<i32>`
//! covers decoding values received from a driver.

use std::fmt;

/// Pointing state of an equatorial mount relative to its pier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PierSide {
    East,
    West,
    Unknown,
}

impl PierSide {
    pub fn wire_value(self) -> i32 {
        match self {
            PierSide::East => 0,
            PierSide::West => 1,
            PierSide::Unknown => -1,
        }
    }
}

impl TryFrom<i32> for PierSide {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, i32> {
        match value {
            0 => Ok(PierSide::East),
            1 => Ok(PierSide::West),
            -1 => Ok(PierSide::Unknown),
            other => Err(other),
        }
    }
}

impl fmt::Display for PierSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PierSide::East => write!(f, "East"),
            PierSide::West => write!(f, "West"),
            PierSide::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Standard telescope drive rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriveRate {
    Sidereal,
    Lunar,
    Solar,
    King,
}

impl DriveRate {
    pub fn wire_value(self) -> i32 {
        match self {
            DriveRate::Sidereal => 0,
            DriveRate::Lunar => 1,
            DriveRate::Solar => 2,
            DriveRate::King => 3,
        }
    }
}

impl TryFrom<i32> for DriveRate {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, i32> {
        match value {
            0 => Ok(DriveRate::Sidereal),
            1 => Ok(DriveRate::Lunar),
            2 => Ok(DriveRate::Solar),
            3 => Ok(DriveRate::King),
            other => Err(other),
        }
    }
}

impl fmt::Display for DriveRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriveRate::Sidereal => write!(f, "Sidereal"),
            DriveRate::Lunar => write!(f, "Lunar"),
            DriveRate::Solar => write!(f, "Solar"),
            DriveRate::King => write!(f, "King"),
        }
    }
}

/// Geometry of the mount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentMode {
    AltAz,
    Polar,
    GermanPolar,
}

impl TryFrom<i32> for AlignmentMode {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, i32> {
        match value {
            0 => Ok(AlignmentMode::AltAz),
            1 => Ok(AlignmentMode::Polar),
            2 => Ok(AlignmentMode::GermanPolar),
            other => Err(other),
        }
    }
}

impl fmt::Display for AlignmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignmentMode::AltAz => write!(f, "Alt-Az"),
            AlignmentMode::Polar => write!(f, "Polar"),
            AlignmentMode::GermanPolar => write!(f, "German polar"),
        }
    }
}

/// Equatorial coordinate system used by the mount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquatorialSystem {
    Other,
    Topocentric,
    J2000,
    J2050,
    B1950,
}

impl TryFrom<i32> for EquatorialSystem {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, i32> {
        match value {
            0 => Ok(EquatorialSystem::Other),
            1 => Ok(EquatorialSystem::Topocentric),
            2 => Ok(EquatorialSystem::J2000),
            3 => Ok(EquatorialSystem::J2050),
            4 => Ok(EquatorialSystem::B1950),
            other => Err(other),
        }
    }
}

/// Mechanical axes of a telescope mount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelescopeAxis {
    Primary,
    Secondary,
    Tertiary,
}

impl TelescopeAxis {
    pub const ALL: [TelescopeAxis; 3] = [
        TelescopeAxis::Primary,
        TelescopeAxis::Secondary,
        TelescopeAxis::Tertiary,
    ];

    pub fn wire_value(self) -> i32 {
        match self {
            TelescopeAxis::Primary => 0,
            TelescopeAxis::Secondary => 1,
            TelescopeAxis::Tertiary => 2,
        }
    }

    pub fn index(self) -> usize {
        self.wire_value() as usize
    }
}

impl fmt::Display for TelescopeAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelescopeAxis::Primary => write!(f, "Primary"),
            TelescopeAxis::Secondary => write!(f, "Secondary"),
            TelescopeAxis::Tertiary => write!(f, "Tertiary"),
        }
    }
}

/// Pulse guide directions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideDirection {
    North,
    South,
    East,
    West,
}

impl GuideDirection {
    pub const ALL: [GuideDirection; 4] = [
        GuideDirection::North,
        GuideDirection::South,
        GuideDirection::East,
        GuideDirection::West,
    ];

    pub fn wire_value(self) -> i32 {
        match self {
            GuideDirection::North => 0,
            GuideDirection::South => 1,
            GuideDirection::East => 2,
            GuideDirection::West => 3,
        }
    }
}

impl fmt::Display for GuideDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuideDirection::North => write!(f, "North"),
            GuideDirection::South => write!(f, "South"),
            GuideDirection::East => write!(f, "East"),
            GuideDirection::West => write!(f, "West"),
        }
    }
}

/// State of a dome shutter or roll-off roof
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutterState {
    Open,
    Closed,
    Opening,
    Closing,
    Error,
}

impl ShutterState {
    /// True for the two in-motion states
    pub fn is_transitional(self) -> bool {
        matches!(self, ShutterState::Opening | ShutterState::Closing)
    }
}

impl TryFrom<i32> for ShutterState {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, i32> {
        match value {
            0 => Ok(ShutterState::Open),
            1 => Ok(ShutterState::Closed),
            2 => Ok(ShutterState::Opening),
            3 => Ok(ShutterState::Closing),
            4 => Ok(ShutterState::Error),
            other => Err(other),
        }
    }
}

impl fmt::Display for ShutterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutterState::Open => write!(f, "Open"),
            ShutterState::Closed => write!(f, "Closed"),
            ShutterState::Opening => write!(f, "Opening"),
            ShutterState::Closing => write!(f, "Closing"),
            ShutterState::Error => write!(f, "Error"),
        }
    }
}

/// One supported rate range for a telescope axis, degrees per second
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRate {
    pub minimum: f64,
    pub maximum: f64,
}

impl AxisRate {
    pub fn new(minimum: f64, maximum: f64) -> Self {
        Self { minimum, maximum }
    }

    /// True when a requested rate magnitude falls inside this range
    pub fn contains(&self, rate: f64) -> bool {
        let magnitude = rate.abs();
        magnitude >= self.minimum && magnitude <= self.maximum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pier_side_round_trips_wire_values() {
        for side in [PierSide::East, PierSide::West, PierSide::Unknown] {
            assert_eq!(PierSide::try_from(side.wire_value()), Ok(side));
        }
        assert_eq!(PierSide::try_from(7), Err(7));
    }

    #[test]
    fn drive_rate_round_trips_wire_values() {
        for rate in [
            DriveRate::Sidereal,
            DriveRate::Lunar,
            DriveRate::Solar,
            DriveRate::King,
        ] {
            assert_eq!(DriveRate::try_from(rate.wire_value()), Ok(rate));
        }
        assert_eq!(DriveRate::try_from(9), Err(9));
    }

    #[test]
    fn shutter_state_decodes_all_values() {
        assert_eq!(ShutterState::try_from(0), Ok(ShutterState::Open));
        assert_eq!(ShutterState::try_from(4), Ok(ShutterState::Error));
        assert!(ShutterState::Opening.is_transitional());
        assert!(!ShutterState::Open.is_transitional());
    }

    #[test]
    fn axis_rate_contains_uses_magnitude() {
        let range = AxisRate::new(0.5, 3.0);
        assert!(range.contains(1.0));
        assert!(range.contains(-1.0));
        assert!(!range.contains(0.1));
        assert!(!range.contains(3.5));
    }
}
