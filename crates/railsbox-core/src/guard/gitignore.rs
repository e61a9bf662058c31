//! Translation of `.gitignore` glob lines into sensitive-pattern regexes.
//!
//! - `**` matches across directory boundaries
//! - `*` matches within one path segment
//! - `?` matches one character
//! - a leading `/` anchors the rule to the project root; otherwise it may
//!   start at any segment boundary
//!
//! Negated (`!`) lines are skipped: ignore rules only ever add denials.

/// Translate a single ignore-file line. Returns `None` for lines that carry no
/// rule (blank, comment, negation).
pub fn compile_line(line: &str) -> Option<String> {
    let pattern = line.trim();
    if pattern.is_empty() || pattern.starts_with('#') || pattern.starts_with('!') {
        return None;
    }

    // `**/x` already matches at any depth once unanchored.
    let (anchored, body) = match pattern.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, pattern.strip_prefix("**/").unwrap_or(pattern)),
    };
    if body.is_empty() {
        return None;
    }

    let translated = regex::escape(body)
        .replace(r"\*\*", ".*")
        .replace(r"\*", "[^/]*")
        .replace(r"\?", ".");

    if anchored {
        Some(format!("^{}", translated))
    } else {
        Some(format!("(?:^|/){}", translated))
    }
}

/// Translate every rule-bearing line of an ignore file.
pub fn compile<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    lines.into_iter().filter_map(compile_line).collect()
}
