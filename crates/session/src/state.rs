//! The session's authoritative state: the file map, scalar metadata, and the
//! lifecycle/guard flags C9 owns directly (the publication ledger, owned by
//! C7, lives in [`crate::publish::Ledger`]).

use snack_cache::PinSet;
use std::collections::HashMap;

/// Whether a file is source code or a binary asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Code,
    Asset,
}

/// A file's contents, before or after an asset upload has resolved it to a
/// URL. Code files are always `Text`; an `Asset` file is `Blob` until
/// [`sendCodeAsync`](crate::session::SnackSession::send_code) uploads it
/// inline, after which it becomes `Text` holding the object-store URL.
#[derive(Debug, Clone, PartialEq)]
pub enum FileContents {
    Text(String),
    Blob(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub kind: FileKind,
    pub contents: FileContents,
}

impl File {
    pub fn code(contents: impl Into<String>) -> Self {
        Self { kind: FileKind::Code, contents: FileContents::Text(contents.into()) }
    }

    pub fn asset_blob(bytes: Vec<u8>) -> Self {
        Self { kind: FileKind::Asset, contents: FileContents::Blob(bytes) }
    }

    pub fn asset_url(url: impl Into<String>) -> Self {
        Self { kind: FileKind::Asset, contents: FileContents::Text(url.into()) }
    }
}

/// Scalar session metadata, separated from `files` because `isSaved`
/// compares this tuple (plus `files`) against `initial_state` rather than
/// the whole session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub sdk_version: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub dependencies: PinSet,
}

/// A deep snapshot of the fields that determine `isSaved`.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub files: HashMap<String, File>,
    pub metadata: Metadata,
}

/// The publish lifecycle. One-way except that a network-up status while
/// `Started` re-subscribes without changing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Started,
    Stopped,
}
