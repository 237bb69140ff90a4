//! Single-tenant catalog: projects, organization membership and backup records.
//!
//! Each concern is a trait so services can be exercised without a live catalog database.

mod backups;
mod members;
mod projects;

pub use backups::{BackupStore, PgBackupStore};
pub use members::{MembershipStore, PgMembershipStore};
pub use projects::{PgProjectCatalog, Project, ProjectCatalog};

#[cfg(test)]
pub use backups::MockBackupStore;
#[cfg(test)]
pub use members::MockMembershipStore;
#[cfg(test)]
pub use projects::MockProjectCatalog;
