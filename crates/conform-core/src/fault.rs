//! Device fault model and the exception classification engine
//!
//! Every device call in the engine returns `Result<T, DeviceFault>`. A fault
//! is data, not control flow: it is caught at the call site, classified into
//! a semantic kind using a device-specific code table, and turned into a
//! severity verdict under the check's `Required` policy. No fault ever
//! aborts the overall run.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::outcome::Severity;

/// Alpaca reserved error code for a member that is not implemented
pub const NOT_IMPLEMENTED: i32 = 0x400;
/// Alpaca reserved error code for an out-of-range argument
pub const INVALID_VALUE: i32 = 0x401;
/// Alpaca reserved error code for reading a property before it was written
pub const VALUE_NOT_SET: i32 = 0x402;
/// Alpaca reserved error code for an operation on a disconnected device
pub const NOT_CONNECTED: i32 = 0x407;
/// Alpaca reserved error code for an operation that is invalid while parked
pub const INVALID_WHILE_PARKED: i32 = 0x408;
/// Alpaca reserved error code for an otherwise invalid operation
pub const INVALID_OPERATION: i32 = 0x40B;

// COM drivers surface the same semantics as HRESULTs in the 0x80040400 block.
const COM_NOT_IMPLEMENTED: i32 = 0x80040400u32 as i32;
const COM_INVALID_VALUE: i32 = 0x80040401u32 as i32;
const COM_VALUE_NOT_SET: i32 = 0x80040402u32 as i32;
const COM_NOT_CONNECTED: i32 = 0x80040407u32 as i32;

/// A fault raised by a device member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFault {
    /// Raw numeric error code as reported by the driver
    pub code: i32,
    /// Raw diagnostic message as reported by the driver
    pub message: String,
}

impl DeviceFault {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_implemented(member: &str) -> Self {
        Self::new(NOT_IMPLEMENTED, format!("{} is not implemented", member))
    }

    pub fn invalid_value(detail: impl Into<String>) -> Self {
        Self::new(INVALID_VALUE, detail)
    }

    pub fn value_not_set(member: &str) -> Self {
        Self::new(VALUE_NOT_SET, format!("{} has not been set", member))
    }

    pub fn not_connected() -> Self {
        Self::new(NOT_CONNECTED, "Device is not connected")
    }

    pub fn invalid_while_parked(member: &str) -> Self {
        Self::new(
            INVALID_WHILE_PARKED,
            format!("{} is invalid while the device is parked", member),
        )
    }

    pub fn invalid_operation(detail: impl Into<String>) -> Self {
        Self::new(INVALID_OPERATION, detail)
    }
}

impl fmt::Display for DeviceFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}: {}", self.code as u32, self.message)
    }
}

/// Result type of every device call made by the engine
pub type DeviceResult<T> = std::result::Result<T, DeviceFault>;

/// Semantic class of a raised fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The member is correctly signalling that it is unsupported
    NotImplemented,
    /// The member is correctly rejecting an out-of-domain argument
    InvalidValue,
    /// A target property was read before ever being written
    ValueNotSet,
    /// The device reports it is not connected
    NotConnected,
    /// None of the expected classes
    Unexpected,
}

/// Policy attached to each individual check, driving the fault verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Required {
    /// The member must work; any fault is a protocol violation
    Mandatory,
    /// The member may legitimately signal not-implemented
    Optional,
    /// A capability flag is true, so the member must work
    MustBeImplemented,
    /// A capability flag is false, so the member must signal not-implemented
    MustNotBeImplemented,
}

/// Device-specific mapping of numeric fault codes to semantic classes
///
/// Different drivers use different numeric codes for the same semantic
/// fault; the table is configuration data, deserializable from the harness
/// config file. Defaults cover the Alpaca reserved codes and their COM
/// HRESULT aliases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultCodes {
    #[serde(default = "default_not_implemented")]
    pub not_implemented: Vec<i32>,
    #[serde(default = "default_invalid_value")]
    pub invalid_value: Vec<i32>,
    #[serde(default = "default_value_not_set")]
    pub value_not_set: Vec<i32>,
    #[serde(default = "default_not_connected")]
    pub not_connected: Vec<i32>,
}

fn default_not_implemented() -> Vec<i32> {
    vec![NOT_IMPLEMENTED, COM_NOT_IMPLEMENTED]
}

fn default_invalid_value() -> Vec<i32> {
    vec![INVALID_VALUE, COM_INVALID_VALUE]
}

fn default_value_not_set() -> Vec<i32> {
    vec![VALUE_NOT_SET, COM_VALUE_NOT_SET]
}

fn default_not_connected() -> Vec<i32> {
    vec![NOT_CONNECTED, COM_NOT_CONNECTED]
}

impl Default for FaultCodes {
    fn default() -> Self {
        Self {
            not_implemented: default_not_implemented(),
            invalid_value: default_invalid_value(),
            value_not_set: default_value_not_set(),
            not_connected: default_not_connected(),
        }
    }
}

impl FaultCodes {
    /// Classify a raised fault into its semantic kind
    pub fn classify(&self, fault: &DeviceFault) -> FaultKind {
        if self.not_implemented.contains(&fault.code) {
            FaultKind::NotImplemented
        } else if self.invalid_value.contains(&fault.code) {
            FaultKind::InvalidValue
        } else if self.value_not_set.contains(&fault.code) {
            FaultKind::ValueNotSet
        } else if self.not_connected.contains(&fault.code) {
            FaultKind::NotConnected
        } else {
            FaultKind::Unexpected
        }
    }
}

/// Verdict for a fault raised by `member` under the given policy
///
/// This is the single classification function replacing exception-typed
/// control flow: the caller catches the fault, this decides what it means.
pub fn member_fault_verdict(
    member: &str,
    required: Required,
    fault: &DeviceFault,
    codes: &FaultCodes,
) -> (Severity, String) {
    match codes.classify(fault) {
        FaultKind::NotImplemented => match required {
            Required::Mandatory => (
                Severity::Error,
                format!("{} is mandatory but raised a not-implemented fault", member),
            ),
            Required::Optional => (
                Severity::Ok,
                format!("Optional member {} raised a not-implemented fault", member),
            ),
            Required::MustBeImplemented => (
                Severity::Error,
                format!(
                    "{} raised a not-implemented fault although its capability flag is true",
                    member
                ),
            ),
            Required::MustNotBeImplemented => (
                Severity::Ok,
                format!("{} correctly raised a not-implemented fault", member),
            ),
        },
        FaultKind::InvalidValue => match required {
            Required::MustNotBeImplemented => (
                Severity::Issue,
                format!(
                    "{} should raise a not-implemented fault, got invalid-value: {}",
                    member, fault
                ),
            ),
            _ => (
                Severity::Error,
                format!("{} raised an invalid-value fault: {}", member, fault),
            ),
        },
        FaultKind::ValueNotSet => match required {
            Required::MustNotBeImplemented => (
                Severity::Issue,
                format!(
                    "{} should raise a not-implemented fault, got value-not-set: {}",
                    member, fault
                ),
            ),
            _ => (
                Severity::Error,
                format!("{} raised a value-not-set fault: {}", member, fault),
            ),
        },
        FaultKind::NotConnected => (
            Severity::Error,
            format!("{} reports the device is not connected: {}", member, fault),
        ),
        FaultKind::Unexpected => match required {
            Required::MustNotBeImplemented => (
                Severity::Issue,
                format!(
                    "{} should raise a not-implemented fault, got an unrelated fault: {}",
                    member, fault
                ),
            ),
            _ => (
                Severity::Error,
                format!("{} raised an unexpected fault: {}", member, fault),
            ),
        },
    }
}

/// Verdict for a probe that deliberately passed an out-of-domain argument
///
/// The member must reject the value with an invalid-value fault. Silent
/// success means range enforcement is missing.
pub fn invalid_value_probe_verdict(
    member: &str,
    detail: &str,
    result: Result<(), &DeviceFault>,
    codes: &FaultCodes,
) -> (Severity, String) {
    match result {
        Ok(()) => (
            Severity::Issue,
            format!("{} accepted an out-of-range value ({})", member, detail),
        ),
        Err(fault) => match codes.classify(fault) {
            FaultKind::InvalidValue => (
                Severity::Ok,
                format!("{} correctly rejected {}", member, detail),
            ),
            FaultKind::NotImplemented => (
                Severity::Ok,
                format!("{} raised a not-implemented fault for {}", member, detail),
            ),
            _ => (
                Severity::Error,
                format!(
                    "{} rejected {} with the wrong fault class: {}",
                    member, detail, fault
                ),
            ),
        },
    }
}

/// Verdict for the first read of a target property before any write
///
/// The protocol requires a value-not-set fault; a returned value means the
/// driver invented state.
pub fn value_not_set_probe_verdict(
    member: &str,
    result: Result<f64, &DeviceFault>,
    codes: &FaultCodes,
) -> (Severity, String) {
    match result {
        Ok(value) => (
            Severity::Issue,
            format!(
                "{} read before any write returned {} instead of a value-not-set fault",
                member, value
            ),
        ),
        Err(fault) => match codes.classify(fault) {
            FaultKind::ValueNotSet => (
                Severity::Ok,
                format!("{} correctly raised a value-not-set fault", member),
            ),
            other => (
                Severity::Error,
                format!(
                    "{} read before any write raised a {:?} fault instead of value-not-set: {}",
                    member, other, fault
                ),
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_classifies_alpaca_codes() {
        let codes = FaultCodes::default();
        assert_eq!(
            codes.classify(&DeviceFault::new(0x400, "")),
            FaultKind::NotImplemented
        );
        assert_eq!(
            codes.classify(&DeviceFault::new(0x401, "")),
            FaultKind::InvalidValue
        );
        assert_eq!(
            codes.classify(&DeviceFault::new(0x402, "")),
            FaultKind::ValueNotSet
        );
        assert_eq!(
            codes.classify(&DeviceFault::new(0x407, "")),
            FaultKind::NotConnected
        );
        assert_eq!(
            codes.classify(&DeviceFault::new(0x499, "")),
            FaultKind::Unexpected
        );
    }

    #[test]
    fn default_table_classifies_com_aliases() {
        let codes = FaultCodes::default();
        assert_eq!(
            codes.classify(&DeviceFault::new(0x80040400u32 as i32, "")),
            FaultKind::NotImplemented
        );
        assert_eq!(
            codes.classify(&DeviceFault::new(0x80040401u32 as i32, "")),
            FaultKind::InvalidValue
        );
    }

    #[test]
    fn table_is_deserializable_configuration_data() {
        let codes: FaultCodes =
            serde_json::from_str(r#"{"not_implemented": [4096, 1]}"#).expect("parse");
        assert_eq!(
            codes.classify(&DeviceFault::new(1, "")),
            FaultKind::NotImplemented
        );
        // Unlisted sections fall back to the defaults
        assert_eq!(
            codes.classify(&DeviceFault::new(0x401, "")),
            FaultKind::InvalidValue
        );
    }

    #[test]
    fn optional_member_may_raise_not_implemented() {
        let codes = FaultCodes::default();
        let fault = DeviceFault::not_implemented("Altitude");
        let (severity, _) = member_fault_verdict("Altitude", Required::Optional, &fault, &codes);
        assert_eq!(severity, Severity::Ok);
    }

    #[test]
    fn mandatory_member_must_not_fault() {
        let codes = FaultCodes::default();
        let fault = DeviceFault::not_implemented("RightAscension");
        let (severity, _) =
            member_fault_verdict("RightAscension", Required::Mandatory, &fault, &codes);
        assert_eq!(severity, Severity::Error);
    }

    #[test]
    fn capability_true_makes_not_implemented_an_error() {
        let codes = FaultCodes::default();
        let fault = DeviceFault::not_implemented("Park");
        let (severity, message) =
            member_fault_verdict("Park", Required::MustBeImplemented, &fault, &codes);
        assert_eq!(severity, Severity::Error);
        assert!(message.contains("capability"));
    }

    #[test]
    fn capability_false_expects_not_implemented() {
        let codes = FaultCodes::default();
        let fault = DeviceFault::not_implemented("Park");
        let (severity, _) =
            member_fault_verdict("Park", Required::MustNotBeImplemented, &fault, &codes);
        assert_eq!(severity, Severity::Ok);

        // A different fault class is not an acceptable substitute
        let wrong = DeviceFault::new(0x500, "driver blew up");
        let (severity, _) =
            member_fault_verdict("Park", Required::MustNotBeImplemented, &wrong, &codes);
        assert_eq!(severity, Severity::Issue);
    }

    #[test]
    fn unexpected_fault_is_always_an_error_otherwise() {
        let codes = FaultCodes::default();
        let fault = DeviceFault::new(0x500, "driver blew up");
        let (severity, message) =
            member_fault_verdict("Slewing", Required::Mandatory, &fault, &codes);
        assert_eq!(severity, Severity::Error);
        assert!(message.contains("driver blew up"));
    }

    #[test]
    fn invalid_value_probe_accepts_rejection() {
        let codes = FaultCodes::default();
        let fault = DeviceFault::invalid_value("91 is out of range");
        let (severity, _) =
            invalid_value_probe_verdict("SiteLatitude", "91.0", Err(&fault), &codes);
        assert_eq!(severity, Severity::Ok);
    }

    #[test]
    fn invalid_value_probe_flags_silent_success() {
        let codes = FaultCodes::default();
        let (severity, message) =
            invalid_value_probe_verdict("SiteLatitude", "91.0", Ok(()), &codes);
        assert_eq!(severity, Severity::Issue);
        assert!(message.contains("accepted"));
    }

    #[test]
    fn invalid_value_probe_flags_wrong_fault_class() {
        let codes = FaultCodes::default();
        let fault = DeviceFault::new(0x500, "boom");
        let (severity, _) =
            invalid_value_probe_verdict("SiteLatitude", "91.0", Err(&fault), &codes);
        assert_eq!(severity, Severity::Error);
    }

    #[test]
    fn target_read_before_write_must_raise_value_not_set() {
        let codes = FaultCodes::default();
        let fault = DeviceFault::value_not_set("TargetRightAscension");
        let (severity, _) =
            value_not_set_probe_verdict("TargetRightAscension", Err(&fault), &codes);
        assert_eq!(severity, Severity::Ok);

        let (severity, message) =
            value_not_set_probe_verdict("TargetRightAscension", Ok(12.0), &codes);
        assert_eq!(severity, Severity::Issue);
        assert!(message.contains("12"));
    }

    #[test]
    fn fault_display_shows_hex_code() {
        let fault = DeviceFault::new(0x401, "bad value");
        assert_eq!(fault.to_string(), "0x401: bad value");
    }
}
