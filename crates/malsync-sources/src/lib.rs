pub mod error;
pub mod mal;
pub mod mapping;
pub mod traits;

pub use error::SourceError;
pub use mal::{MalClient, MalTokenRefresher, TokenInfo, TokenManager, TokenRefresher};
pub use mapping::{FileMappingSource, RemoteMappingSource};
pub use traits::{ListClient, MappingSource};
