//! HTTP client for the package-bundler service: polling for a resolved
//! module and, on failure, probing its CDN mirror (§4.8 steps 6-7).

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use snack_cache::ResolvedDependency;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const PLATFORMS: [&str; 2] = ["ios", "android"];

/// The version a module is pinned to when neither the bundler nor its CDN
/// mirror can confirm a build exists.
pub const ERROR_PIN: &str = "error";

/// The version recorded when the CDN confirms a prebuilt bundle exists but
/// the bundler's own metadata couldn't be fetched, and the caller supplied
/// no pin of its own.
pub const DEFAULT_PIN: &str = "latest";

#[derive(Clone)]
struct BundlerConfig {
    http: reqwest::Client,
    bundler_url: String,
    bundler_cdn_url: String,
    poll_interval: Duration,
    poll_max_attempts: u32,
}

/// Resolves modules against the bundler service, memoizing in-flight and
/// completed fetches so concurrent requesters for the same `(name, version)`
/// share one network round trip.
#[derive(Clone)]
pub struct BundlerClient {
    config: Arc<BundlerConfig>,
    cache: Arc<snack_cache::DependencyCache>,
}

impl BundlerClient {
    pub fn new(bundler_url: impl Into<String>, bundler_cdn_url: impl Into<String>, poll_interval: Duration, poll_max_attempts: u32) -> Self {
        Self {
            config: Arc::new(BundlerConfig {
                http: reqwest::Client::new(),
                bundler_url: bundler_url.into(),
                bundler_cdn_url: bundler_cdn_url.into(),
                poll_interval,
                poll_max_attempts,
            }),
            cache: Arc::new(snack_cache::DependencyCache::new()),
        }
    }

    /// Resolves `name`, pinned to `version` if given, via the memoized
    /// bundler/CDN fetch path.
    pub async fn resolve(&self, name: &str, version: Option<&str>) -> ResolvedDependency {
        let key = snack_cache::fetch_key(name, version);
        let config = Arc::clone(&self.config);
        let name_owned = name.to_string();
        let version_owned = version.map(str::to_string);
        self.cache.get_or_fetch(&key, move || fetch(config, name_owned, version_owned)).await
    }
}

async fn fetch(config: Arc<BundlerConfig>, name: String, version: Option<String>) -> ResolvedDependency {
    match poll_bundler(&config, &name, version.as_deref()).await {
        Ok((resolved_version, dependencies)) => ResolvedDependency::resolved(name, resolved_version, dependencies),
        Err(message) => cdn_fallback(&config, &name, version.as_deref(), &message).await,
    }
}

#[derive(serde::Deserialize)]
struct BundlerResponse {
    #[serde(default)]
    pending: bool,
    version: Option<String>,
    #[serde(default)]
    dependencies: HashMap<String, String>,
}

async fn poll_bundler(config: &BundlerConfig, name: &str, version: Option<&str>) -> Result<(String, HashMap<String, String>), String> {
    let url = match version {
        Some(version) => format!("{}/bundle/{name}@{version}?platforms=ios,android", config.bundler_url),
        None => format!("{}/bundle/{name}?platforms=ios,android", config.bundler_url),
    };

    for attempt in 0..config.poll_max_attempts {
        let response = config.http.get(&url).send().await.map_err(|err| err.to_string())?;
        if !response.status().is_success() {
            return Err(format!("bundler responded with status {}", response.status()));
        }
        let body: BundlerResponse = response.json().await.map_err(|err| format!("invalid bundler response: {err}"))?;
        if body.pending {
            debug!(name, attempt, "bundler still resolving, will re-poll");
            tokio::time::sleep(config.poll_interval).await;
            continue;
        }
        let resolved_version = body.version.unwrap_or_else(|| version.unwrap_or(DEFAULT_PIN).to_string());
        return Ok((resolved_version, body.dependencies));
    }

    Err(format!("timed out after {} polling attempts", config.poll_max_attempts))
}

/// Probes the CDN mirror for a prebuilt bundle on every platform when the
/// bundler itself couldn't be reached.
async fn cdn_fallback(config: &BundlerConfig, name: &str, version: Option<&str>, bundler_error: &str) -> ResolvedDependency {
    let version_for_probe = version.unwrap_or(DEFAULT_PIN);
    let spec = format!("{}@{version_for_probe}", name.replace('/', "~"));
    let encoded = utf8_percent_encode(&spec, NON_ALPHANUMERIC).to_string();

    let mut all_available = true;
    for platform in PLATFORMS {
        let probe_url = format!("{}/{encoded}-{platform}/.done", config.bundler_cdn_url);
        let available = config.http.get(&probe_url).send().await.map(|response| response.status().as_u16() < 400).unwrap_or(false);
        if !available {
            all_available = false;
            break;
        }
    }

    if all_available {
        let version = version.unwrap_or(DEFAULT_PIN).to_string();
        warn!(name, version, error = bundler_error, "bundler fetch failed but CDN mirror confirms a build exists");
        ResolvedDependency::fallback(name, version, bundler_error)
    } else {
        warn!(name, error = bundler_error, "bundler fetch failed and no CDN mirror was found");
        ResolvedDependency::fallback(name, ERROR_PIN, bundler_error)
    }
}
