//! Declarative patterns describing the shapes of import/require statements
//! the scanner recognizes. Kept together so the recognized grammar is
//! visible in one place rather than scattered across the scan logic.

use regex::Regex;
use std::sync::LazyLock;

/// `import Foo from 'bar'`, `import 'bar'`, `import { a, b } from 'bar'`,
/// `export { a } from 'bar'`, `export * from 'bar'` — one capture group per
/// alternative (bare `import '...'` vs. the `from '...'` forms).
pub static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*(?:import\s+['"]([^'"\n]+)['"]|(?:import|export)\s+[^'"\n]*?\bfrom\s+['"]([^'"\n]+)['"])"#)
        .expect("IMPORT_RE is a valid regex")
});

/// `require('bar')` / `require("bar")` — a single string-literal argument,
/// no template interpolation (backtick-quoted arguments never match since
/// only `'` and `"` are accepted quote characters).
pub static REQUIRE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"require\(\s*(['"])([^'"\n]+)\1\s*\)"#).expect("REQUIRE_RE is a valid regex"));

/// A `require(` call whose string literal never closes before the line
/// ends — the one shape the scanner treats as a genuine parse failure
/// rather than something to silently skip.
pub static UNTERMINATED_REQUIRE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"require\(\s*['"][^'"\n]*$"#).expect("UNTERMINATED_REQUIRE_RE is a valid regex"));

/// A trailing `// <version>` pin comment, anchored to start with a digit so
/// ordinary comments aren't mistaken for version pins.
pub static VERSION_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"//\s*([0-9][\w.+-]*)").expect("VERSION_COMMENT_RE is a valid regex"));
