//! Safe SQL building: identifiers are validated and quoted, values are always bound parameters.

mod builder;
mod ddl;
pub mod params;

pub use builder::*;
pub use ddl::*;
pub use params::*;

use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("identifier pattern compiles"));

/// Quote identifier for PostgreSQL.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

/// Quote a string literal for DDL positions where parameters are not allowed.
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Plain PostgreSQL identifier: letter or underscore first, at most 63 bytes.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_escapes_embedded_quotes() {
        assert_eq!(quoted(r#"we"ird"#), r#""we""ird""#);
        assert_eq!(quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn identifiers_reject_sql_fragments() {
        assert!(is_valid_identifier("users"));
        assert!(is_valid_identifier("_audit_2024"));
        assert!(!is_valid_identifier("1users"));
        assert!(!is_valid_identifier("users; drop table x"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier(&"a".repeat(64)));
    }
}
