pub mod error;
pub mod paths;
pub mod roster_file;
pub mod schema;
pub mod store;

pub use error::{Result, StoreError};
pub use paths::{database_path, default_base_dir, resolve_base_dir};
pub use roster_file::{ImportSummary, RosterFile};
pub use store::{SectionSummary, Store, SubmissionSummary};
