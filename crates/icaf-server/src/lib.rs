//! ICAF Server - API for the art submission and voting event
//!
//! Users submit artwork, volunteers approve it, and the public votes with one
//! transferable vote per user. The [`votes`] module keeps every artwork's
//! counter and the aggregate total consistent with the users' vote pointers.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod store;
pub mod votes;

pub use error::AppError;
pub use routes::{create_router, AppState};
