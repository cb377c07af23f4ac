pub mod auth;
pub mod error;
pub mod groups;
pub mod messages;
pub mod router;
pub mod rows;
pub mod session;
pub mod state;
pub mod validate;
