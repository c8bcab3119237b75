//! The session façade (component C9): owns all session state, exposes the
//! public operations, and dispatches listener events.
//!
//! Concurrency model: the spec's single cooperative-scheduler task is
//! realized here as a single `Mutex<MutableState>` guarding synchronous
//! fields (never held across an `.await`) plus a `tokio::sync::Mutex`
//! dedicated to the publication ledger, which genuinely needs to survive
//! object-store uploads. A background task owns the transport's
//! message/presence/status streams for the session's lifetime.

use crate::bundler::BundlerClient;
use crate::dependency::{self, DependencyFailure};
use crate::error::{Error, ErrorKind, Result};
use crate::listeners::{ListenerHandle, ListenerRegistry};
use crate::publish::{self, Ledger, PublishMetadata, PublishPayload};
use crate::state::{File, FileContents, Metadata, SessionState, Snapshot};
use exn::ResultExt;
use serde::Serialize;
use snack_config::{Feature, HostConfig, Options, supports};
use snack_storage::StoreHandle;
use snack_transport::{Message, PresenceEvent, StatusEvent, TransportHandle};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// A code update or asset upload submitted through [`SnackSession::send_code_async`].
#[derive(Debug, Clone)]
pub enum FileUpdate {
    Code(String),
    AssetBlob(Vec<u8>),
}

/// Forwarded `CONSOLE`/`ERROR` device messages, decoded into typed records.
#[derive(Debug, Clone)]
pub enum LogEvent {
    Console { device: Option<String>, method: String, payload: Vec<serde_json::Value> },
    DeviceError { device: Option<String>, error: snack_transport::DecodedError },
}

/// A presence change, re-exported at the session boundary.
#[derive(Debug, Clone)]
pub enum PresenceNotification {
    Join(snack_transport::DeviceDescriptor),
    Leave(snack_transport::DeviceDescriptor),
    Timeout(snack_transport::DeviceDescriptor),
}

/// A dependency that failed to resolve against both the bundler and its CDN
/// mirror, routed to its own listener distinct from the general error one.
#[derive(Debug, Clone)]
pub struct DependencyErrorEvent {
    pub name: String,
    pub reason: String,
}

/// The externally-visible snapshot returned by [`SnackSession::get_state`].
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub lifecycle: SessionState,
    pub metadata: Metadata,
    pub is_saved: bool,
    pub is_resolving: bool,
}

struct MutableState {
    lifecycle: SessionState,
    metadata: Metadata,
    files: HashMap<String, File>,
    initial_state: Snapshot,
    is_resolving: bool,
    loading_message: Option<String>,
    snack_id: Option<String>,
}

struct Inner {
    channel: String,
    host: String,
    expo_api_url: String,
    authorization_token: Option<String>,
    transport: TransportHandle,
    store: StoreHandle,
    bundler: BundlerClient,
    http: reqwest::Client,
    debouncer: snack_asyncutils::Debouncer,
    ledger: tokio::sync::Mutex<Ledger>,
    state: Mutex<MutableState>,
    error_listeners: ListenerRegistry<String>,
    log_listeners: ListenerRegistry<LogEvent>,
    presence_listeners: ListenerRegistry<PresenceNotification>,
    state_listeners: ListenerRegistry<()>,
    dependency_error_listeners: ListenerRegistry<DependencyErrorEvent>,
}

/// A handle to a live Snack session. Cheap to clone; every clone shares the
/// same underlying state and background listener task.
#[derive(Clone)]
pub struct SnackSession {
    inner: Arc<Inner>,
}

impl SnackSession {
    /// Validates `options`, snapshots initial state, wires the transport's
    /// event streams to this session's listeners, and — if the session's SDK
    /// version supports `ARBITRARY_IMPORTS` — kicks an initial dependency
    /// resolution without awaiting it.
    pub async fn construct(options: Options, host_config: HostConfig, transport: TransportHandle, store: StoreHandle) -> Result<Self> {
        options.validate().map_err(ErrorKind::options)?;

        let metadata = Metadata {
            sdk_version: options.sdk_version.clone(),
            name: options.name.clone(),
            description: options.description.clone(),
            dependencies: options.dependencies.clone().into(),
        };
        let files: HashMap<String, File> = options.files.iter().map(|(key, contents)| (key.clone(), File::code(contents.clone()))).collect();
        let initial_state = Snapshot { files: files.clone(), metadata: metadata.clone() };

        let bundler =
            BundlerClient::new(host_config.bundler_url.clone(), host_config.bundler_cdn_url.clone(), host_config.bundler_poll_interval(), host_config.bundler_poll_max_attempts);

        let inner = Arc::new(Inner {
            channel: options.channel.clone(),
            host: options.host.clone(),
            expo_api_url: host_config.expo_api_url.clone(),
            authorization_token: options.authorization_token.clone(),
            transport,
            store,
            bundler,
            http: reqwest::Client::new(),
            debouncer: snack_asyncutils::Debouncer::new(host_config.debounce_interval()),
            ledger: tokio::sync::Mutex::new(Ledger::new()),
            state: Mutex::new(MutableState {
                lifecycle: SessionState::Created,
                metadata,
                files,
                initial_state,
                is_resolving: false,
                loading_message: None,
                snack_id: options.snack_id.clone(),
            }),
            error_listeners: ListenerRegistry::new(),
            log_listeners: ListenerRegistry::new(),
            presence_listeners: ListenerRegistry::new(),
            state_listeners: ListenerRegistry::new(),
            dependency_error_listeners: ListenerRegistry::new(),
        });

        let session = Self { inner };
        session.spawn_transport_listener();
        session.kick_dependency_resolution();
        Ok(session)
    }

    /// Subscribes to the channel. Idempotent after the first call.
    pub async fn start_async(&self) -> Result<()> {
        {
            let mut state = self.inner.state.lock().expect("lock poisoned");
            if state.lifecycle != SessionState::Created {
                return Ok(());
            }
            state.lifecycle = SessionState::Started;
        }
        self.inner.transport.subscribe(&self.inner.channel, true).await.map_err(ErrorKind::transport)?;
        self.emit_state_event();
        Ok(())
    }

    /// Unsubscribes from the channel and clears the spill ledger's URL map,
    /// forcing a full re-spill the next time the session starts.
    pub async fn stop_async(&self) -> Result<()> {
        {
            let mut state = self.inner.state.lock().expect("lock poisoned");
            state.lifecycle = SessionState::Stopped;
        }
        self.inner.ledger.lock().await.clear_urls();
        self.inner.transport.unsubscribe(&self.inner.channel).await.map_err(ErrorKind::transport)?;
        self.emit_state_event();
        Ok(())
    }

    /// Reconciles `files` against current session state: missing keys are
    /// deleted, present keys are overwritten, and asset blobs are uploaded
    /// to the object store inline before the reconciliation commits. Then
    /// schedules a debounced publish and kicks a dependency resolution.
    pub async fn send_code_async(&self, files: HashMap<String, FileUpdate>) -> Result<()> {
        let mut resolved = HashMap::with_capacity(files.len());
        for (key, update) in files {
            let file = match update {
                FileUpdate::Code(text) => File::code(text),
                FileUpdate::AssetBlob(bytes) => {
                    let url = self.inner.store.put(&bytes).await.map_err(ErrorKind::storage)?;
                    File::asset_url(url)
                }
            };
            resolved.insert(key, file);
        }

        {
            let mut state = self.inner.state.lock().expect("lock poisoned");
            state.files = resolved;
        }
        self.emit_state_event();
        self.publish();
        self.kick_dependency_resolution();
        Ok(())
    }

    pub fn set_sdk_version(&self, sdk_version: impl Into<String>) {
        {
            let mut state = self.inner.state.lock().expect("lock poisoned");
            state.metadata.sdk_version = sdk_version.into();
        }
        self.emit_state_event();
        self.kick_dependency_resolution();
    }

    pub fn set_name(&self, name: impl Into<String>) {
        {
            let mut state = self.inner.state.lock().expect("lock poisoned");
            state.metadata.name = Some(name.into());
        }
        self.emit_state_event();
    }

    pub fn set_description(&self, description: impl Into<String>) {
        {
            let mut state = self.inner.state.lock().expect("lock poisoned");
            state.metadata.description = Some(description.into());
        }
        self.emit_state_event();
    }

    pub fn get_state(&self) -> StateSnapshot {
        let state = self.inner.state.lock().expect("lock poisoned");
        let current = Snapshot { files: state.files.clone(), metadata: state.metadata.clone() };
        StateSnapshot {
            lifecycle: state.lifecycle,
            metadata: state.metadata.clone(),
            is_saved: current == state.initial_state,
            is_resolving: state.is_resolving,
        }
    }

    /// Constructs the editor URL for this session's current `snackId`.
    pub fn get_url_async(&self) -> Result<String> {
        let snack_id = self.inner.state.lock().expect("lock poisoned").snack_id.clone();
        match snack_id {
            Some(id) => Ok(format!("{}/{id}", self.inner.host)),
            None => exn::bail!(ErrorKind::Save("session has not been saved yet; no snackId to build a URL from".to_string())),
        }
    }

    /// Downloads the exported project bundle for this session's `snackId`.
    pub async fn download_async(&self) -> Result<Vec<u8>> {
        let snack_id = self.inner.state.lock().expect("lock poisoned").snack_id.clone();
        let Some(snack_id) = snack_id else {
            exn::bail!(ErrorKind::Save("session has not been saved yet; nothing to download".to_string()));
        };
        let url = format!("{}/--/api/v2/snack/download/{snack_id}", self.inner.expo_api_url);
        let response = self.inner.http.get(&url).send().await.or_raise(|| ErrorKind::Save("download request failed".to_string()))?;
        if !response.status().is_success() {
            exn::bail!(ErrorKind::Save(format!("download responded with status {}", response.status())));
        }
        Ok(response.bytes().await.or_raise(|| ErrorKind::Save("failed to read download body".to_string()))?.to_vec())
    }

    /// Posts the current manifest and code to the save endpoint, then
    /// updates `initialState` (and thus `isSaved`) on success.
    pub async fn save_async(&self) -> Result<String> {
        let (metadata, files) = {
            let state = self.inner.state.lock().expect("lock poisoned");
            (state.metadata.clone(), state.files.clone())
        };

        let code: HashMap<String, String> = files
            .iter()
            .filter_map(|(key, file)| match &file.contents {
                FileContents::Text(text) => Some((key.clone(), text.clone())),
                FileContents::Blob(_) => None,
            })
            .collect();

        let body = SaveRequest {
            manifest: SaveManifest {
                sdk_version: metadata.sdk_version.clone(),
                name: metadata.name.clone(),
                description: metadata.description.clone(),
                dependencies: if metadata.dependencies.is_empty() { None } else { Some(metadata.dependencies.clone().into()) },
            },
            code,
        };

        let url = format!("{}/--/api/v2/snack/save", self.inner.expo_api_url);
        let mut request = self.inner.http.post(&url).json(&body);
        if let Some(token) = &self.inner.authorization_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.or_raise(|| ErrorKind::Save("save request failed".to_string()))?;
        if !response.status().is_success() {
            exn::bail!(ErrorKind::Save(format!("save responded with status {}", response.status())));
        }
        let saved: SaveResponse = response.json().await.or_raise(|| ErrorKind::Save("invalid save response".to_string()))?;

        {
            let mut state = self.inner.state.lock().expect("lock poisoned");
            state.snack_id = Some(saved.id.clone());
            state.initial_state = Snapshot { files, metadata };
        }
        self.emit_state_event();
        Ok(saved.id)
    }

    /// Uploads an asset blob to the object store, returning its canonical URL.
    pub async fn upload_asset_async(&self, bytes: &[u8]) -> Result<String> {
        self.inner.store.put(bytes).await.map_err(ErrorKind::storage)
    }

    pub fn add_error_listener(&self, callback: impl Fn(&String) + Send + Sync + 'static) -> ListenerHandle<String> {
        self.inner.error_listeners.register(callback)
    }

    pub fn add_log_listener(&self, callback: impl Fn(&LogEvent) + Send + Sync + 'static) -> ListenerHandle<LogEvent> {
        self.inner.log_listeners.register(callback)
    }

    pub fn add_presence_listener(&self, callback: impl Fn(&PresenceNotification) + Send + Sync + 'static) -> ListenerHandle<PresenceNotification> {
        self.inner.presence_listeners.register(callback)
    }

    pub fn add_state_listener(&self, callback: impl Fn(&()) + Send + Sync + 'static) -> ListenerHandle<()> {
        self.inner.state_listeners.register(callback)
    }

    pub fn add_dependency_error_listener(&self, callback: impl Fn(&DependencyErrorEvent) + Send + Sync + 'static) -> ListenerHandle<DependencyErrorEvent> {
        self.inner.dependency_error_listeners.register(callback)
    }

    fn emit_state_event(&self) {
        self.inner.state_listeners.dispatch(&());
    }

    fn log_error(&self, err: Error) {
        warn!(channel = %self.inner.channel, error = %err, "session error");
        self.inner.error_listeners.dispatch(&err.to_string());
    }

    fn publish_metadata(&self, sdk_version: &str) -> PublishMetadata {
        PublishMetadata { expo_sdk_version: sdk_version.to_string(), host_name: None, os_family: None, browser: None }
    }

    /// Schedules a debounced `publishNow`, trailing at the host's configured
    /// debounce interval.
    fn publish(&self) {
        let session = self.clone();
        self.inner.debouncer.schedule(move || async move { session.publish_now().await });
    }

    /// Publishes the current bundle immediately, bypassing the debounce. A
    /// no-op while the session is not yet `Started` (edits before
    /// `startAsync` mutate state but nothing is transmitted) or while a
    /// dependency resolution is in progress; publishes a `LOADING_MESSAGE`
    /// envelope instead of code while one is pending.
    async fn publish_now(&self) {
        let (lifecycle, is_resolving, loading_message, sdk_version) = {
            let state = self.inner.state.lock().expect("lock poisoned");
            (state.lifecycle, state.is_resolving, state.loading_message.clone(), state.metadata.sdk_version.clone())
        };
        if lifecycle != SessionState::Started || is_resolving {
            return;
        }

        let payload = if let Some(message) = loading_message {
            PublishPayload::LoadingMessage { message }
        } else {
            let metadata = self.publish_metadata(&sdk_version);
            let files = self.inner.state.lock().expect("lock poisoned").files.clone();
            if supports(&sdk_version, Feature::MultipleFiles) {
                let mut ledger = self.inner.ledger.lock().await;
                match publish::build_snapshot(&files, &mut ledger, self.inner.store.as_ref(), &self.inner.channel, &metadata, snack_config::MAX_PAYLOAD_BYTES).await {
                    Ok(payload) => payload,
                    Err(err) => {
                        self.log_error(err);
                        return;
                    }
                }
            } else {
                publish::legacy_payload(&files, &metadata)
            }
        };

        let bytes = match serde_json::to_vec(&payload) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, "failed to serialize publish payload");
                return;
            }
        };
        if let Err(err) = self.inner.transport.publish(&self.inner.channel, &bytes).await {
            warn!(channel = %self.inner.channel, error = %err, "publish failed");
            self.inner.error_listeners.dispatch(&err.to_string());
        }
    }

    /// Runs a dependency resolution pass if `ARBITRARY_IMPORTS` is supported
    /// and none is already in flight. Spawned as a detached background task,
    /// matching `construct`'s "kick without awaiting" contract. Guards
    /// re-entrance eagerly, but only sets the loading message and publishes
    /// a notification once the resolve pass confirms there is actually
    /// something to resolve (§4.8 step 3-4).
    fn kick_dependency_resolution(&self) {
        let sdk_version = self.inner.state.lock().expect("lock poisoned").metadata.sdk_version.clone();
        if !supports(&sdk_version, Feature::ArbitraryImports) {
            return;
        }
        {
            let mut state = self.inner.state.lock().expect("lock poisoned");
            if state.is_resolving {
                return;
            }
            state.is_resolving = true;
        }

        let session = self.clone();
        tokio::spawn(async move { session.run_dependency_resolution().await });
    }

    async fn run_dependency_resolution(&self) {
        let (files, existing_pins) = {
            let state = self.inner.state.lock().expect("lock poisoned");
            (state.files.clone(), state.metadata.dependencies.clone())
        };

        let session = self.clone();
        let on_loading = move || async move {
            session.inner.state.lock().expect("lock poisoned").loading_message = Some("Installing dependencies".to_string());
            session.publish_now().await;
        };

        let mut failures: Vec<DependencyFailure> = Vec::new();
        let outcome = dependency::resolve(&files, &existing_pins, &self.inner.bundler, on_loading, &mut failures).await;

        match outcome {
            Ok(Some(result)) => {
                let mut state = self.inner.state.lock().expect("lock poisoned");
                for (key, rewrite) in result.rewritten_files {
                    // Race guard (§4.8): only commit if the file's contents
                    // still match what the scan at entry saw; otherwise a
                    // concurrent `sendCodeAsync` edit would be clobbered.
                    let unchanged = matches!(&state.files.get(&key).map(|f| &f.contents), Some(FileContents::Text(current)) if *current == rewrite.original_source);
                    if unchanged {
                        if let Some(file) = state.files.get_mut(&key) {
                            file.contents = FileContents::Text(rewrite.rewritten_code);
                        }
                    }
                }
                state.metadata.dependencies.merge(result.pins);
                info!(channel = %self.inner.channel, "dependency resolution committed new pins");
            }
            Ok(None) => {}
            Err(err) => self.log_error(err),
        }

        {
            let mut state = self.inner.state.lock().expect("lock poisoned");
            state.is_resolving = false;
            state.loading_message = None;
        }

        for failure in failures {
            warn!(module = %failure.name, reason = %failure.reason, "dependency failed to resolve");
            self.inner.dependency_error_listeners.dispatch(&DependencyErrorEvent { name: failure.name, reason: failure.reason });
        }

        self.emit_state_event();
        self.publish();
    }

    /// Spawns the background task that owns the transport's event streams
    /// for this session's lifetime, forwarding each to the appropriate
    /// listener registry and re-entering the publish pipeline per §4.7/§4.8.
    fn spawn_transport_listener(&self) {
        let session = self.clone();
        tokio::spawn(async move {
            let mut messages = session.inner.transport.messages();
            let mut presence = session.inner.transport.presence();
            let mut status = session.inner.transport.status();
            loop {
                tokio::select! {
                    message = messages.recv() => {
                        match message {
                            Some(message) => session.handle_message(message).await,
                            None => break,
                        }
                    }
                    event = presence.recv() => {
                        match event {
                            Some(event) => session.handle_presence(event).await,
                            None => break,
                        }
                    }
                    event = status.recv() => {
                        match event {
                            Some(event) => session.handle_status(event).await,
                            None => break,
                        }
                    }
                }
            }
        });
    }

    async fn handle_message(&self, message: Message) {
        match message {
            Message::Console { device, method, payload } => {
                self.inner.log_listeners.dispatch(&LogEvent::Console { device, method, payload });
            }
            Message::Error { device, error } => {
                self.inner.log_listeners.dispatch(&LogEvent::DeviceError { device, error });
            }
            Message::ResendCode => {
                self.publish_now().await;
            }
        }
    }

    async fn handle_presence(&self, event: PresenceEvent) {
        match event {
            PresenceEvent::Join(device) => {
                self.inner.presence_listeners.dispatch(&PresenceNotification::Join(device));
                self.publish_now().await;
            }
            PresenceEvent::Leave(device) => {
                self.inner.presence_listeners.dispatch(&PresenceNotification::Leave(device));
            }
            PresenceEvent::Timeout(device) => {
                self.inner.presence_listeners.dispatch(&PresenceNotification::Timeout(device));
            }
        }
    }

    async fn handle_status(&self, event: StatusEvent) {
        if matches!(event, StatusEvent::Reconnected) {
            let started = self.inner.state.lock().expect("lock poisoned").lifecycle == SessionState::Started;
            if started && let Err(err) = self.inner.transport.subscribe(&self.inner.channel, true).await {
                self.log_error(ErrorKind::transport(err));
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct SaveManifest {
    #[serde(rename = "sdkVersion")]
    sdk_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dependencies: Option<HashMap<String, String>>,
}

#[derive(Debug, Serialize)]
struct SaveRequest {
    manifest: SaveManifest,
    code: HashMap<String, String>,
}

#[derive(Debug, serde::Deserialize)]
struct SaveResponse {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use snack_storage::backend::MockObjectStore;
    use snack_transport::MockTransport;
    use std::sync::Arc;
    use std::time::Duration;

    fn test_options(channel: &str) -> Options {
        let mut files = HashMap::new();
        files.insert("app.js".to_string(), "console.log(1)".to_string());
        Options {
            files,
            sdk_version: "49.0.0".to_string(),
            verbose: false,
            channel: channel.to_string(),
            host: "https://snack.expo.dev".to_string(),
            snack_id: None,
            name: None,
            description: None,
            dependencies: HashMap::new(),
            authorization_token: None,
        }
    }

    fn test_host_config() -> HostConfig {
        let mut config = HostConfig::default();
        config.debounce_interval_ms = 10;
        config
    }

    #[tokio::test]
    async fn construct_snapshots_initial_state_as_saved() {
        let transport: TransportHandle = Arc::new(MockTransport::default());
        let store: StoreHandle = Arc::new(MockObjectStore::default());
        let session = SnackSession::construct(test_options("channel"), test_host_config(), transport, store).await.expect("construct");

        let state = session.get_state();
        assert!(state.is_saved);
        assert_eq!(state.lifecycle, SessionState::Created);
    }

    #[tokio::test]
    async fn send_code_updates_files_and_marks_unsaved() {
        let transport: TransportHandle = Arc::new(MockTransport::default());
        let store: StoreHandle = Arc::new(MockObjectStore::default());
        let session = SnackSession::construct(test_options("channel"), test_host_config(), transport, store).await.expect("construct");

        let mut update = HashMap::new();
        update.insert("app.js".to_string(), FileUpdate::Code("console.log(2)".to_string()));
        session.send_code_async(update).await.expect("send code");

        assert!(!session.get_state().is_saved);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn edits_before_start_never_reach_the_transport() {
        let transport = Arc::new(MockTransport::default());
        let store: StoreHandle = Arc::new(MockObjectStore::default());
        let session = SnackSession::construct(test_options("channel"), test_host_config(), transport.clone(), store).await.expect("construct");

        let mut update = HashMap::new();
        update.insert("app.js".to_string(), FileUpdate::Code("console.log(2)".to_string()));
        session.send_code_async(update).await.expect("send code");
        session.set_sdk_version("49.1.0");
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(transport.published().is_empty());
        assert_eq!(session.get_state().lifecycle, SessionState::Created);
    }

    #[tokio::test]
    async fn start_then_stop_transitions_lifecycle() {
        let transport: TransportHandle = Arc::new(MockTransport::default());
        let store: StoreHandle = Arc::new(MockObjectStore::default());
        let session = SnackSession::construct(test_options("channel"), test_host_config(), transport, store).await.expect("construct");

        session.start_async().await.expect("start");
        assert_eq!(session.get_state().lifecycle, SessionState::Started);

        session.stop_async().await.expect("stop");
        assert_eq!(session.get_state().lifecycle, SessionState::Stopped);
    }
}
