pub mod apply;
pub mod auth;
pub mod index;
pub mod mappings;
pub mod prompts;
pub mod status;
