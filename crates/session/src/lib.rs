//! The Snack session library: ties the config, diff, scan, rewrite, storage,
//! transport, and cache crates together into a host-facing session façade
//! (components C7-C9).

mod bundler;
mod dependency;
pub mod error;
mod listeners;
mod publish;
mod session;
mod state;

pub use crate::listeners::ListenerHandle;
pub use crate::publish::{Ledger, PublishMetadata, PublishPayload};
pub use crate::session::{DependencyErrorEvent, FileUpdate, LogEvent, PresenceNotification, SnackSession, StateSnapshot};
pub use crate::state::{File, FileContents, FileKind, Metadata, SessionState, Snapshot};
