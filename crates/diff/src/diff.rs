//! Line-level diffing between a file's previously-transmitted contents and
//! its current contents (component C2).

use similar::{ChangeTag, TextDiff};

/// Produces a line-oriented patch transforming `prev` into `next`.
///
/// When `prev` is empty the patch is `next` itself (plus no meaningful
/// overhead), so a freshly-seen file publishes as if it were sent whole.
/// Emptying a previously non-empty file still produces a real patch (an
/// all-deletion one): an empty string is reserved to mean "unchanged" by
/// the ledger that calls this, so the deletion patch must stay
/// distinguishable from it. The device-side applier, out of scope here, is
/// expected to reconstruct `next` from `prev` and this patch.
pub fn diff(prev: &str, next: &str) -> String {
    if prev.is_empty() {
        return next.to_string();
    }

    let comparison = TextDiff::from_lines(prev, next);
    let mut patch = String::with_capacity(prev.len() + next.len());
    for change in comparison.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => '-',
            ChangeTag::Insert => '+',
            ChangeTag::Equal => ' ',
        };
        patch.push(sign);
        patch.push_str(change.value());
        if !change.value().ends_with('\n') {
            patch.push('\n');
        }
    }
    patch
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn empty_previous_yields_next_verbatim() {
        assert_eq!(diff("", "console.log(1)"), "console.log(1)");
    }

    #[test]
    fn emptying_a_file_yields_an_all_deletion_patch_not_an_empty_one() {
        let patch = diff("console.log(1)", "");
        assert_ne!(patch, "");
        assert!(patch.lines().all(|line| line.starts_with('-')));
    }

    #[test]
    fn identical_inputs_produce_an_all_context_patch() {
        let source = "line one\nline two\n";
        let patch = diff(source, source);
        assert!(patch.lines().all(|line| line.starts_with(' ')));
    }

    #[rstest]
    #[case("a\nb\nc\n", "a\nb\nc\nd\n")]
    #[case("a\nb\nc\n", "a\nc\n")]
    #[case("one line, no newline", "one line, no newline, edited")]
    fn patch_length_is_bounded_by_inputs(#[case] prev: &str, #[case] next: &str) {
        let patch = diff(prev, next);
        assert!(patch.len() <= prev.len() + next.len() + next.lines().count() + prev.lines().count());
    }
}
