//! Identifier shape checks used before names reach generated code or queries.

use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(::[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("Invalid identifier regex")
});

static TABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("Invalid table name regex"));

/// A constant or method name, optionally namespaced with `::`.
pub fn valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// A lowercase snake_case table name.
pub fn valid_table_name(name: &str) -> bool {
    TABLE_NAME.is_match(name)
}
