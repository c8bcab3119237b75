//! Object key validation.
//!
//! Every key this store ever mints comes from [`crate::content_key`]: a
//! two-hex-character prefix directory followed by the remaining 62 hex
//! characters of a blake3 digest. Rather than sanitizing an arbitrary path
//! (this store never accepts a caller-chosen key — only ones it derived
//! itself from content), validation checks the key against that exact
//! fixed shape and rejects anything else outright.

use std::path::{Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Length of the prefix directory component.
const PREFIX_LEN: usize = 2;
/// Length of a blake3 hex digest (32 bytes, 2 hex chars per byte).
const DIGEST_LEN: usize = 64;

/// Validates that `key` has the `xx/yyyy...` shape `content_key` produces.
///
/// # Examples
///
/// ```
/// use snack_storage::validate_key;
/// assert!(validate_key("ab/0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcd").is_ok());
/// assert!(validate_key("../etc/passwd").is_err());
/// assert!(validate_key("ab/cd/ef").is_err());
/// assert!(validate_key("ZZ/0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcd").is_err());
/// assert!(validate_key("").is_err());
/// ```
pub fn validate(key: impl AsRef<Path>) -> Result<PathBuf> {
    let key = key.as_ref();
    let invalid = || ErrorKind::InvalidKey(key.to_path_buf());
    let raw = key.to_str().ok_or_else(|| exn::Exn::from(invalid()))?;

    let Some((prefix, rest)) = raw.split_once('/') else {
        exn::bail!(invalid());
    };
    if prefix.len() != PREFIX_LEN || rest.len() != DIGEST_LEN - PREFIX_LEN || rest.contains('/') {
        exn::bail!(invalid());
    }
    if !prefix.bytes().all(|b| b.is_ascii_hexdigit()) || !rest.bytes().all(|b| b.is_ascii_hexdigit()) {
        exn::bail!(invalid());
    }

    Ok(Path::new(prefix).join(rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest_tail() -> String {
        "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcd".to_string()
    }

    #[test]
    fn a_well_formed_content_key_passes() {
        let key = format!("ab/{}", digest_tail());
        assert_eq!(validate(&key).unwrap(), Path::new("ab").join(digest_tail()));
    }

    #[test]
    fn wrong_prefix_length_is_rejected() {
        assert!(validate(format!("a/{}", digest_tail())).is_err());
        assert!(validate(format!("abc/{}", digest_tail())).is_err());
    }

    #[test]
    fn wrong_digest_length_is_rejected() {
        assert!(validate("ab/short").is_err());
        assert!(validate(format!("ab/{}ff", digest_tail())).is_err());
    }

    #[test]
    fn non_hex_characters_are_rejected() {
        assert!(validate(format!("zz/{}", digest_tail())).is_err());
        let mut tail = digest_tail();
        tail.replace_range(0..1, "g");
        assert!(validate(format!("ab/{tail}")).is_err());
    }

    #[test]
    fn traversal_attempts_are_rejected() {
        assert!(validate("../etc/passwd").is_err());
        assert!(validate(format!("ab/../{}", digest_tail())).is_err());
        assert!(validate("..").is_err());
    }

    #[test]
    fn extra_path_segments_are_rejected() {
        assert!(validate(format!("ab/cd/{}", &digest_tail()[2..])).is_err());
    }

    #[test]
    fn missing_separator_is_rejected() {
        assert!(validate(format!("ab{}", digest_tail())).is_err());
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(validate("").is_err());
    }
}
