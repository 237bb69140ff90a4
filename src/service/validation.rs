//! Input checks applied before any name or type reaches tenant SQL.

use crate::error::AppError;
use crate::repositories::{ColumnDefinition, IndexDefinition};
use crate::sql::is_valid_identifier;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// A base type name followed by optional `(n[,m])` and `[]` suffixes.
static DATA_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<base>[A-Za-z][A-Za-z0-9_]*(?: [A-Za-z][A-Za-z0-9_]*)*)(?:\(\d+(?:, ?\d+)?\))?(?:\[\])?$")
        .expect("data type pattern compiles")
});

/// Base type names a column may be declared with. Matched case-insensitively.
static BASE_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "smallint", "integer", "int", "int2", "int4", "int8", "bigint", "serial", "bigserial",
        "smallserial", "serial4", "serial8", "decimal", "numeric", "real", "float4", "float8",
        "double precision", "money", "boolean", "bool", "text", "varchar", "char", "character",
        "character varying", "bpchar", "citext", "name", "bytea", "date", "time", "timetz",
        "time with time zone", "time without time zone", "timestamp", "timestamptz",
        "timestamp with time zone", "timestamp without time zone", "interval", "uuid", "json",
        "jsonb", "xml", "inet", "cidr", "macaddr", "macaddr8", "point", "line", "lseg", "box",
        "path", "polygon", "circle", "bit", "varbit", "bit varying", "tsvector", "tsquery",
        "int4range", "int8range", "numrange", "tsrange", "tstzrange", "daterange", "oid",
    ])
});

pub struct RequestValidator;

impl RequestValidator {
    pub fn identifier(field: &str, value: &str) -> Result<(), AppError> {
        if !is_valid_identifier(value) {
            return Err(AppError::Validation(format!(
                "{} must start with a letter or underscore and contain only letters, digits and underscores (max 63)",
                field
            )));
        }
        Ok(())
    }

    pub fn data_type(field: &str, value: &str) -> Result<(), AppError> {
        let known = value.len() <= 64
            && DATA_TYPE
                .captures(value)
                .and_then(|c| c.name("base"))
                .is_some_and(|base| BASE_TYPES.contains(base.as_str().to_ascii_lowercase().as_str()));
        if !known {
            return Err(AppError::Validation(format!("{} is not a valid data type: {}", field, value)));
        }
        Ok(())
    }

    /// Names, types and uniqueness of a column list. An empty list is rejected.
    pub fn columns(columns: &[ColumnDefinition]) -> Result<(), AppError> {
        if columns.is_empty() {
            return Err(AppError::Validation("at least one column is required".into()));
        }
        let mut seen = HashSet::new();
        for c in columns {
            Self::identifier("column name", &c.name)?;
            Self::data_type(&c.name, &c.data_type)?;
            if !seen.insert(c.name.as_str()) {
                return Err(AppError::Validation(format!("duplicate column: {}", c.name)));
            }
        }
        Ok(())
    }

    pub fn index(index: &IndexDefinition) -> Result<(), AppError> {
        Self::identifier("index name", &index.name)?;
        if index.columns.is_empty() {
            return Err(AppError::Validation("an index needs at least one column".into()));
        }
        for c in &index.columns {
            Self::identifier("index column", c)?;
        }
        Ok(())
    }
}
