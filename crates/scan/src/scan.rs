//! Static import/require discovery (component C3).

use crate::consts::{IMPORT_RE, REQUIRE_RE, UNTERMINATED_REQUIRE_RE, VERSION_COMMENT_RE};
use crate::error::{ErrorKind, Result};
use std::collections::HashMap;

/// Scans `source` for third-party module specifiers, returning a map from
/// specifier to an inline version pin if one was found as a trailing
/// `// <version>` comment on the same line.
///
/// Relative (`./`, `../`) and absolute (`/`) specifiers are silently
/// excluded, as are malformed `require()` calls (multiple arguments,
/// template-literal arguments, zero arguments). The only condition that
/// raises an error is a `require(` whose string literal is never closed.
///
/// Known limitation: matching is line-by-line, so a named-import list that
/// wraps onto multiple lines (`import {\n  a,\n  b,\n} from 'module';`) is
/// not recognized — `import` and `from` must share a physical line (see the
/// `multiline_named_import_is_not_recognized` test below). This also means
/// `snack_rewrite::insert` (which calls this function to check for an
/// existing import before inserting one) can insert a duplicate import of a
/// module that's already present in a wrapped form.
pub fn scan(source: &str) -> Result<HashMap<String, Option<String>>> {
    let mut modules = HashMap::new();

    for (index, line) in source.lines().enumerate() {
        if UNTERMINATED_REQUIRE_RE.is_match(line) {
            exn::bail!(ErrorKind::UnterminatedRequire { line: index + 1 });
        }

        for capture in IMPORT_RE.captures_iter(line) {
            let specifier = capture.get(1).or_else(|| capture.get(2)).expect("one alternative always matches").as_str();
            record(&mut modules, specifier, line);
        }

        for capture in REQUIRE_RE.captures_iter(line) {
            let specifier = capture.get(2).expect("require() capture always present").as_str();
            record(&mut modules, specifier, line);
        }
    }

    Ok(modules)
}

fn record(modules: &mut HashMap<String, Option<String>>, specifier: &str, line: &str) {
    if is_excluded(specifier) {
        return;
    }
    let version = VERSION_COMMENT_RE.captures(line).map(|c| c[1].to_string());
    modules.insert(specifier.to_string(), version);
}

fn is_excluded(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/')
}
