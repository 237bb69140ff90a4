//! User-facing message table keyed by dotted message keys.
//!
//! The table is built once on first use and never mutated. Unknown keys fall back
//! to the key itself so callers always receive non-empty text.

use once_cell::sync::Lazy;
use std::collections::HashMap;

const ENTRIES: &[(&str, &str)] = &[
    ("general.error.internal", "Something went wrong, please try again later"),
    ("connection.error.failed", "Could not connect to the project database"),
    ("auth.error.actorMissing", "Authenticated user is missing from the request"),
    ("auth.error.actorInvalid", "Authenticated user header is malformed"),
    ("organization.error.notFound", "Organization not found"),
    ("project.error.notFound", "Project not found"),
    ("project.error.viewForbidden", "You don't have permission to view this project"),
    ("project.error.updateForbidden", "You don't have permission to update this project"),
    ("backup.error.notFound", "Backup not found"),
    ("backup.error.listForbidden", "You don't have permission to view backups"),
    ("backup.error.viewForbidden", "You don't have permission to view this backup"),
    ("backup.error.createForbidden", "You don't have permission to create a backup"),
    ("backup.error.deleteForbidden", "You don't have permission to delete this backup"),
    ("backup.error.deleteInProgress", "Backup deletion is already in progress"),
    ("backup.error.createInProgress", "Backup is still being created"),
    ("backup.error.alreadyDeleted", "Backup has already been deleted"),
    ("backup.error.interrupted", "Backup operation was interrupted before it completed"),
    ("table.error.notFound", "Table not found"),
    ("table.error.listForbidden", "You don't have permission to view tables"),
    ("table.error.createForbidden", "You don't have permission to create tables"),
    ("table.error.deleteForbidden", "You don't have permission to delete tables"),
    ("table.error.updateForbidden", "You don't have permission to update tables"),
    ("table.error.alreadyExists", "Table already exists"),
    ("column.error.createForbidden", "You don't have permission to create columns"),
    ("column.error.updateForbidden", "You don't have permission to update columns"),
    ("column.error.deleteForbidden", "You don't have permission to delete columns"),
    ("column.error.someAlreadyExist", "Some columns already exist"),
    ("column.error.notFound", "Column not found"),
    ("index.error.createForbidden", "You don't have permission to create indexes"),
    ("index.error.deleteForbidden", "You don't have permission to delete indexes"),
    ("index.error.alreadyExists", "Index already exists"),
    ("index.error.notFound", "Index not found"),
    ("row.error.listForbidden", "You don't have permission to view rows"),
    ("row.error.createForbidden", "You don't have permission to insert rows"),
    ("function.error.listForbidden", "You don't have permission to view functions"),
    ("function.error.notFound", "Function not found"),
    ("database_stats.error.forbidden", "You don't have permission to view database stats"),
];

static MESSAGES: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| ENTRIES.iter().copied().collect());

/// Resolve a message key. Returns the key unchanged when it is not in the table.
pub fn lookup(key: &str) -> &str {
    MESSAGES.get(key).copied().unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_key_resolves_to_text() {
        assert_eq!(lookup("backup.error.notFound"), "Backup not found");
    }

    #[test]
    fn unknown_key_falls_back_to_itself() {
        assert_eq!(lookup("backup.error.somethingNew"), "backup.error.somethingNew");
    }

    #[test]
    fn keys_are_unique() {
        assert_eq!(MESSAGES.len(), ENTRIES.len());
    }
}
