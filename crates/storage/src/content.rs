//! Content-addressing: every object's key is derived from its own bytes.

/// Returns the content-addressed key for `data`: a blake3 hex digest split
/// into a two-character prefix directory, so a filesystem-backed store
/// doesn't dump millions of files into one flat directory.
pub fn content_key(data: &[u8]) -> String {
    let digest = blake3::hash(data).to_hex();
    format!("{}/{}", &digest[..2], &digest[2..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_bytes_produce_the_same_key() {
        assert_eq!(content_key(b"hello"), content_key(b"hello"));
    }

    #[test]
    fn different_bytes_produce_different_keys() {
        assert_ne!(content_key(b"hello"), content_key(b"world"));
    }

    #[test]
    fn key_is_split_into_a_prefix_directory() {
        let key = content_key(b"hello");
        assert_eq!(key.split('/').count(), 2);
    }
}
