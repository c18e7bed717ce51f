pub mod auth;
pub mod files;
pub mod health;
pub mod messages;
pub mod threads;
pub mod workspace;
