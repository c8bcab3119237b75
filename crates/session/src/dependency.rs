//! The dependency engine (C8): scan → reconcile → fetch → pin → inject.

use crate::bundler::{BundlerClient, ERROR_PIN};
use crate::error::ErrorKind;
use crate::state::{File, FileContents};
use snack_cache::{PinSet, ResolvedDependency};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Modules the dependency engine never pins, since the SDK supplies them
/// directly rather than through the bundler.
const RESERVED_MODULES: [&str; 3] = ["react", "react-native", "expo"];

/// A single file's rewrite, paired with the source it was computed from so
/// the caller can apply the race guard against its own live state: the
/// rewrite is only safe to commit if the file's contents still match
/// `original_source` at commit time.
pub struct RewrittenFile {
    pub original_source: String,
    pub rewritten_code: String,
}

/// The outcome of a resolution pass: rewritten `.js` files and the pin-set
/// entries to merge into session state.
pub struct ResolutionOutcome {
    pub rewritten_files: HashMap<String, RewrittenFile>,
    pub pins: HashMap<String, String>,
}

/// A single `(name, version)` fetch that failed to resolve against both the
/// bundler and its CDN mirror — routed to the dependency-error listener.
pub struct DependencyFailure {
    pub name: String,
    pub reason: String,
}

/// Runs one full resolution pass over `files` against the currently pinned
/// `existing_pins`. Returns `None` if nothing changed (no modules found, or
/// every discovered module is already pinned at its current inline version).
///
/// `on_loading` fires once, before any network activity, so the caller can
/// publish a loading notification. `failures` accumulates modules that
/// landed on the error pin, for the caller to notify its dependency-error
/// listener with.
pub async fn resolve<F, Fut>(
    files: &HashMap<String, File>,
    existing_pins: &PinSet,
    bundler: &BundlerClient,
    on_loading: F,
    failures: &mut Vec<DependencyFailure>,
) -> crate::error::Result<Option<ResolutionOutcome>>
where
    F: FnOnce() -> Fut + Send,
    Fut: std::future::Future<Output = ()> + Send,
{
    let js_files: Vec<(&String, &str)> = files
        .iter()
        .filter(|(key, _)| key.ends_with(".js"))
        .filter_map(|(key, file)| match &file.contents {
            FileContents::Text(text) => Some((key, text.as_str())),
            FileContents::Blob(_) => None,
        })
        .collect();

    let mut modules: HashMap<String, Option<String>> = HashMap::new();
    for (key, source) in &js_files {
        match snack_scan::scan(source) {
            Ok(found) => modules.extend(found),
            Err(err) => warn!(file = %key, error = %err, "skipping file: import scan failed"),
        }
    }
    modules.retain(|name, _| !RESERVED_MODULES.contains(&name.as_str()));

    let changed: HashMap<String, Option<String>> = modules
        .iter()
        .filter(|(name, inline_version)| match (existing_pins.get(name.as_str()), inline_version) {
            (None, _) => true,
            (Some(pinned), Some(inline)) => pinned != inline,
            (Some(_), None) => false,
        })
        .map(|(name, version)| (name.clone(), version.clone()))
        .collect();

    if modules.is_empty() || changed.is_empty() {
        return Ok(None);
    }

    on_loading().await;

    let mut direct = HashMap::new();
    let mut peer_candidates: HashMap<String, Option<String>> = HashMap::new();
    for (name, version) in &changed {
        let resolved = bundler.resolve(name, version.as_deref()).await;
        record_failure(&resolved, failures);
        if let Some(peers) = &resolved.dependencies {
            for (peer_name, peer_version) in peers {
                if !RESERVED_MODULES.contains(&peer_name.as_str()) && !changed.contains_key(peer_name) {
                    peer_candidates.entry(peer_name.clone()).or_insert_with(|| Some(peer_version.clone()));
                }
            }
        }
        direct.insert(resolved.name.clone(), resolved.version.clone());
    }

    let mut peers = HashMap::new();
    for (name, version) in &peer_candidates {
        let resolved = bundler.resolve(name, version.as_deref()).await;
        record_failure(&resolved, failures);
        peers.insert(resolved.name.clone(), resolved.version.clone());
    }

    // Direct results win on collision with peer results.
    let mut merged = PinSet::from(peers);
    merged.merge(direct);
    let pins: HashMap<String, String> = merged.iter().map(|(name, version)| (name.to_string(), version.to_string())).collect();

    let mut rewritten_files = HashMap::new();
    for (key, original_source) in &js_files {
        let mut code = original_source.to_string();
        for peer_name in peer_candidates.keys() {
            code = snack_rewrite::insert(&code, peer_name).map_err(ErrorKind::rewrite)?;
        }
        code = snack_rewrite::write(&code, &pins);
        rewritten_files.insert((*key).clone(), RewrittenFile { original_source: original_source.to_string(), rewritten_code: code });
    }

    Ok(Some(ResolutionOutcome { rewritten_files, pins }))
}

fn record_failure(resolved: &ResolvedDependency, failures: &mut Vec<DependencyFailure>) {
    if resolved.version == ERROR_PIN {
        let reason = resolved.error.clone().unwrap_or_else(|| "unknown bundler failure".to_string());
        failures.push(DependencyFailure { name: resolved.name.clone(), reason });
    }
}

/// The reserved module set, exposed so callers (and tests) can assert on it
/// without duplicating the literal list.
pub fn reserved_modules() -> HashSet<&'static str> {
    RESERVED_MODULES.into_iter().collect()
}
