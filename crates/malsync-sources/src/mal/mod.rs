pub mod api;
pub mod auth;
pub mod client;

pub use auth::{create_mal_client, MalTokenRefresher, TokenInfo, TokenManager, TokenRefresher};
pub use client::MalClient;
