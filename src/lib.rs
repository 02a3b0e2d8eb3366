#![doc = "The `taskforge` library crate."]
#![doc = ""]
#![doc = "Accounts with bearer-token sessions, avatar storage and per-user task CRUD,"]
#![doc = "served over actix-web. The binary (`main.rs`) only reads configuration, picks"]
#![doc = "a storage backend and mounts `routes::config`."]

pub mod app;
pub mod auth;
pub mod avatar;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod routes;
pub mod store;

pub use crate::app::AppState;
pub use crate::error::AppError;
