//! Snapshot construction, diff/spill bookkeeping, and the wire envelope
//! shapes published to the transport (component C7).

use crate::error::{ErrorKind, Result};
use crate::state::{File, FileContents};
use serde::Serialize;
use snack_storage::ObjectStore;
use std::collections::HashMap;

/// The publication ledger: what was last uploaded for each key, the URL it
/// was uploaded to, and the diff most recently transmitted. Disjoint from
/// `files` — this is C7's own bookkeeping, not session state.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    pub s3code: HashMap<String, String>,
    pub s3url: HashMap<String, String>,
    pub diff: HashMap<String, String>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every entry for a key no longer present in `files`.
    fn prune(&mut self, files: &HashMap<String, File>) {
        self.s3code.retain(|key, _| files.contains_key(key));
        self.s3url.retain(|key, _| files.contains_key(key));
        self.diff.retain(|key, _| files.contains_key(key));
    }

    /// Forces a full re-spill on the next publish, per `stopAsync`.
    pub fn clear_urls(&mut self) {
        self.s3url.clear();
    }
}

/// Analytics metadata accompanying a publish. Probe fields an embedder
/// doesn't supply are simply absent from the wire payload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PublishMetadata {
    #[serde(rename = "expoSdkVersion")]
    pub expo_sdk_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
}

/// A message published on the channel, matching the envelope shapes
/// observed on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum PublishPayload {
    #[serde(rename = "CODE")]
    Code {
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        diff: Option<HashMap<String, String>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        s3url: Option<HashMap<String, String>>,
        metadata: PublishMetadata,
    },
    #[serde(rename = "LOADING_MESSAGE")]
    LoadingMessage { message: String },
}

/// Builds (or refreshes) the diff/spill ledger for `files` under the
/// multiple-files wire format, then returns the `{diff, s3url}` envelope
/// ready to publish. Iteratively spills the largest remaining in-source
/// file to `store` until the estimated payload fits `max_payload_bytes`, or
/// no more spill candidates remain.
pub async fn build_snapshot(
    files: &HashMap<String, File>,
    ledger: &mut Ledger,
    store: &dyn ObjectStore,
    channel: &str,
    metadata: &PublishMetadata,
    max_payload_bytes: usize,
) -> Result<PublishPayload> {
    ledger.prune(files);

    for (key, file) in files {
        match &file.contents {
            FileContents::Blob(bytes) => {
                let url = store.put(bytes).await.map_err(ErrorKind::storage)?;
                ledger.s3code.insert(key.clone(), String::new());
                ledger.s3url.insert(key.clone(), url);
                ledger.diff.insert(key.clone(), String::new());
            }
            FileContents::Text(text) => {
                if text.starts_with(store.url_prefix()) {
                    ledger.s3url.insert(key.clone(), text.clone());
                    ledger.diff.insert(key.clone(), String::new());
                } else if ledger.s3url.contains_key(key) {
                    let prev = ledger.s3code.get(key).cloned().unwrap_or_default();
                    ledger.diff.insert(key.clone(), snack_diff::diff(&prev, text));
                } else {
                    ledger.diff.insert(key.clone(), snack_diff::diff("", text));
                }
            }
        }
    }

    loop {
        let payload = PublishPayload::Code {
            code: None,
            diff: Some(ledger.diff.clone()),
            s3url: Some(ledger.s3url.clone()),
            metadata: metadata.clone(),
        };
        let estimated = snack_diff::size(channel, &payload).map_err(ErrorKind::size)?;
        if estimated <= max_payload_bytes {
            return Ok(payload);
        }

        let spill_candidate = files
            .iter()
            .filter(|(key, _)| !ledger.s3url.contains_key(*key))
            .filter_map(|(key, file)| match &file.contents {
                FileContents::Text(text) => Some((key.clone(), text.clone())),
                FileContents::Blob(_) => None,
            })
            .max_by_key(|(key, text)| (text.len(), key.clone()));

        let Some((key, text)) = spill_candidate else {
            // Nothing left to spill; publish oversize rather than loop forever.
            return Ok(payload);
        };

        let url = store.put(text.as_bytes()).await.map_err(ErrorKind::storage)?;
        ledger.s3code.insert(key.clone(), text);
        ledger.s3url.insert(key.clone(), url);
        ledger.diff.insert(key, String::new());
    }
}

/// The legacy, pre-`MULTIPLE_FILES` publish shape: a single `app.js` string.
pub fn legacy_payload(files: &HashMap<String, File>, metadata: &PublishMetadata) -> PublishPayload {
    let code = match files.get("App.js").or_else(|| files.get("app.js")) {
        Some(File { contents: FileContents::Text(text), .. }) => text.clone(),
        _ => String::new(),
    };
    PublishPayload::Code { code: Some(code), diff: None, s3url: None, metadata: metadata.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::File;
    use snack_storage::backend::MockObjectStore;

    fn metadata() -> PublishMetadata {
        PublishMetadata { expo_sdk_version: "52.0.0".to_string(), ..Default::default() }
    }

    #[tokio::test]
    async fn small_bundle_fits_inline_with_no_object_store_call() {
        let store = MockObjectStore::default();
        let mut files = HashMap::new();
        files.insert("app.js".to_string(), File::code("console.log(1)"));
        let mut ledger = Ledger::new();

        let payload = build_snapshot(&files, &mut ledger, &store, "channel-1", &metadata(), 31_500).await.expect("builds");
        let PublishPayload::Code { diff, s3url, .. } = payload else { panic!("expected Code payload") };
        assert_eq!(diff.unwrap().get("app.js"), Some(&"console.log(1)".to_string()));
        assert!(s3url.unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversize_bundle_spills_the_largest_file() {
        let store = MockObjectStore::default();
        let mut files = HashMap::new();
        files.insert("a.js".to_string(), File::code("x".repeat(100_000)));
        files.insert("b.js".to_string(), File::code("x"));
        let mut ledger = Ledger::new();

        let payload = build_snapshot(&files, &mut ledger, &store, "channel-1", &metadata(), 31_500).await.expect("builds");
        let PublishPayload::Code { diff, s3url, .. } = payload else { panic!("expected Code payload") };
        let diff = diff.unwrap();
        let s3url = s3url.unwrap();
        assert_eq!(diff.get("a.js"), Some(&String::new()));
        assert!(s3url.contains_key("a.js"));
        assert_eq!(diff.get("b.js"), Some(&"x".to_string()));
        assert!(!s3url.contains_key("b.js"));
    }

    #[tokio::test]
    async fn removed_keys_are_pruned_from_the_ledger_on_next_publish() {
        let store = MockObjectStore::default();
        let mut files = HashMap::new();
        files.insert("a.js".to_string(), File::code("x".repeat(100_000)));
        files.insert("b.js".to_string(), File::code("x"));
        let mut ledger = Ledger::new();
        build_snapshot(&files, &mut ledger, &store, "channel-1", &metadata(), 31_500).await.expect("builds");
        assert!(ledger.s3url.contains_key("a.js"));

        files.remove("a.js");
        build_snapshot(&files, &mut ledger, &store, "channel-1", &metadata(), 31_500).await.expect("builds");
        assert!(!ledger.s3url.contains_key("a.js"));
        assert!(!ledger.diff.contains_key("a.js"));
    }
}
