//! Decoding device-originated wire payloads into typed [`Message`]s and
//! presence identifiers into [`DeviceDescriptor`]s.
//!
//! Both decoders are deliberately lenient: a payload that doesn't parse is
//! swallowed rather than surfaced as an error, since a malformed message
//! from one device must never take down the channel for everyone else on it.

use crate::message::{DecodedError, DeviceDescriptor, Message};
use serde_json::Value;

/// Decodes a raw device message by its `type` discriminant. Returns `None`
/// for anything unrecognized; callers log and drop rather than propagate.
pub fn decode_message(raw: &[u8]) -> Option<Message> {
    let value: Value = serde_json::from_slice(raw).ok()?;
    let device = value.get("device").and_then(Value::as_str).map(str::to_owned);
    match value.get("type").and_then(Value::as_str)? {
        "CONSOLE" => {
            let method = value.get("method")?.as_str()?.to_owned();
            let payload = value.get("payload").and_then(Value::as_array).cloned().unwrap_or_default();
            Some(Message::Console { device, method, payload })
        }
        "ERROR" => {
            let error = value.get("error").cloned().and_then(|v| serde_json::from_value::<DecodedError>(v).ok())?;
            Some(Message::Error { device, error })
        }
        "RESEND_CODE" => Some(Message::ResendCode),
        _ => None,
    }
}

/// Attempts to decode a presence subscriber identifier as a device. Plenty
/// of subscribers on a channel aren't devices at all (other host tabs, for
/// instance); those simply fail to decode here and are not reported to
/// presence listeners.
pub fn decode_device_descriptor(identifier: &str) -> Option<DeviceDescriptor> {
    serde_json::from_str(identifier).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_console_message() {
        let raw = br#"{"type":"CONSOLE","device":"abc","method":"log","payload":["hi"]}"#;
        let Some(Message::Console { device, method, payload }) = decode_message(raw) else {
            panic!("expected Console variant")
        };
        assert_eq!(device.as_deref(), Some("abc"));
        assert_eq!(method, "log");
        assert_eq!(payload, vec![Value::String("hi".to_string())]);
    }

    #[test]
    fn decodes_resend_code_with_no_body() {
        let raw = br#"{"type":"RESEND_CODE"}"#;
        assert_eq!(decode_message(raw), Some(Message::ResendCode));
    }

    #[test]
    fn unrecognized_type_decodes_to_none() {
        let raw = br#"{"type":"SOMETHING_ELSE"}"#;
        assert_eq!(decode_message(raw), None);
    }

    #[test]
    fn malformed_json_decodes_to_none() {
        assert_eq!(decode_message(b"not json"), None);
    }

    #[test]
    fn non_device_presence_identifier_does_not_decode() {
        assert_eq!(decode_device_descriptor("host-tab-37"), None);
    }

    #[test]
    fn well_formed_device_identifier_decodes() {
        let identifier = r#"{"id":"device-1","platform":"ios","name":"iPhone","client_sdk_version":"49.0.0"}"#;
        let device = decode_device_descriptor(identifier).expect("decodes");
        assert_eq!(device.id, "device-1");
        assert_eq!(device.platform.as_deref(), Some("ios"));
    }
}
