//! Version pin comment writer (component C4).

use snack_scan::consts::{IMPORT_RE, REQUIRE_RE};
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

static TRAILING_VERSION_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*//\s*[0-9][\w.+-]*\s*$").expect("TRAILING_VERSION_COMMENT_RE is a valid regex"));

/// Rewrites `code` so every recognized import/require whose specifier is a
/// key in `pins` carries a trailing `// <version>` comment matching the
/// pin. Unpinned imports are left untouched; every other token on every
/// line is preserved exactly, including lines with no import at all.
///
/// Idempotent: `write(write(code, pins), pins) == write(code, pins)`.
pub fn write(code: &str, pins: &HashMap<String, String>) -> String {
    let had_trailing_newline = code.ends_with('\n');
    let rewritten: Vec<String> = code.lines().map(|line| rewrite_line(line, pins)).collect();
    let mut out = rewritten.join("\n");
    if had_trailing_newline {
        out.push('\n');
    }
    out
}

fn rewrite_line(line: &str, pins: &HashMap<String, String>) -> String {
    let specifier = IMPORT_RE
        .captures(line)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .or_else(|| REQUIRE_RE.captures(line).and_then(|c| c.get(2)))
        .map(|m| m.as_str());

    let Some(specifier) = specifier else { return line.to_string() };
    let Some(version) = pins.get(specifier) else { return line.to_string() };

    let stripped = TRAILING_VERSION_COMMENT_RE.replace(line, "");
    format!("{} // {version}", stripped.trim_end())
}
