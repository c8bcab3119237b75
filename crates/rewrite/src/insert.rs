//! Missing peer import inserter (component C5).

use crate::error::{ErrorKind, Result};
use regex::Regex;
use std::sync::LazyLock;

/// A bare string-literal expression statement at the top of a file, e.g.
/// `'use strict';` — the only thing allowed to precede the inserted import.
static DIRECTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*['"][^'"]*['"];?\s*$"#).expect("DIRECTIVE_RE is a valid regex"));

/// Ensures `code` imports `module` at the top level, for modules the
/// bundler resolved as a peer dependency but the user never wrote an
/// import for. If an import already names `module` in any recognized form,
/// `code` is returned unchanged.
///
/// Idempotent: `insert(insert(code, m)?, m)? == insert(code, m)?`.
///
/// Inherits `snack_scan::scan`'s line-by-line matching: a multi-line named
/// import of `module` (its `from` clause wrapped onto its own line) isn't
/// recognized as an existing import, so this can insert a duplicate.
pub fn insert(code: &str, module: &str) -> Result<String> {
    let modules = snack_scan::scan(code).map_err(ErrorKind::scan)?;
    if modules.contains_key(module) {
        return Ok(code.to_string());
    }

    let had_trailing_newline = code.ends_with('\n');
    let mut lines: Vec<String> = code.lines().map(str::to_string).collect();
    let insert_at = lines.iter().take_while(|line| DIRECTIVE_RE.is_match(line)).count();
    lines.insert(insert_at, format!("import '{module}';"));

    let mut out = lines.join("\n");
    if had_trailing_newline || !code.is_empty() {
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_after_a_leading_directive_prologue() {
        let code = "'use strict';\nconsole.log(1);\n";
        let out = insert(code, "react-native-gesture-handler").expect("insert succeeds");
        assert_eq!(out, "'use strict';\nimport 'react-native-gesture-handler';\nconsole.log(1);\n");
    }

    #[test]
    fn inserts_at_the_top_when_there_is_no_prologue() {
        let out = insert("console.log(1);\n", "p").expect("insert succeeds");
        assert_eq!(out, "import 'p';\nconsole.log(1);\n");
    }

    #[test]
    fn is_a_no_op_when_the_module_is_already_imported() {
        let code = "import 'p';\nconsole.log(1);\n";
        assert_eq!(insert(code, "p").expect("insert succeeds"), code);
    }

    #[test]
    fn is_idempotent() {
        let code = "console.log(1);\n";
        let once = insert(code, "p").expect("first insert succeeds");
        let twice = insert(&once, "p").expect("second insert succeeds");
        assert_eq!(once, twice);
    }
}
