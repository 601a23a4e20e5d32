pub mod error;
pub mod events;
pub mod guid;
pub mod id_index;
pub mod id_index_storage;
pub mod mapping;
pub mod notify;
pub mod status;
pub mod update;

pub use error::SyncError;
pub use events::{DomainEvent, EventBus, EventSubscriber};
pub use id_index::{AnimeIds, IdIndex, IdentifierIndex};
pub use id_index_storage::IdIndexStorage;
pub use mapping::{build_map, MappingSources, MappingStore, MappingTable};
pub use notify::{LogNotificationSink, Notification, NotificationLevel, NotificationSink, Notifier};
pub use status::{JsonLinesStatusStore, StatusRecorder, StatusStore};
pub use update::{decide, Decision, Intent, UpdateEngine, UpdateState};
