pub mod activity;
pub mod list_entry;
pub mod mapping;
pub mod outcome;
pub mod source_ref;

pub use activity::{Activity, ActivityKind};
pub use list_entry::{ListStatus, ListUpdate, RemoteListEntry};
pub use mapping::{MappingKind, MappingResolution, MovieMappingEntry, SeasonMapping, TvMappingEntry};
pub use outcome::{ErrorKind, StatusRecord, UpdateAction, UpdateOutcome};
pub use source_ref::{MetadataType, SourceDb, SourceReference};
