//! Estimates the number of bytes the transport will charge for publishing a
//! message on a given channel, so the publication pipeline can decide
//! whether to spill files to object storage before it publishes.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::Serialize;

/// Estimates the serialized size, in bytes, of publishing `payload` on
/// `channel_id`. The estimate wraps the payload in the same envelope shape
/// the transport actually sends, so it tracks real overhead rather than just
/// the payload's own length.
pub fn size<T: Serialize>(channel_id: &str, payload: &T) -> Result<usize> {
    let envelope = serde_json::json!({ "channel": channel_id, "message": payload });
    let encoded =
        serde_json::to_vec(&envelope).or_raise(|| ErrorKind::Serialize("payload is not serializable".to_string()))?;
    Ok(encoded.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn larger_payloads_estimate_larger() {
        let small = size("channel-1", &"x").expect("estimate small payload");
        let large = size("channel-1", &"x".repeat(10_000)).expect("estimate large payload");
        assert!(large > small);
    }

    #[test]
    fn estimate_accounts_for_channel_and_envelope_overhead() {
        let payload: BTreeMap<&str, &str> = BTreeMap::new();
        let estimate = size("abcdef", &payload).expect("estimate empty payload");
        assert!(estimate > "abcdef".len());
    }
}
