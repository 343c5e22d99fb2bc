//! Database models for the art submission and voting event.

pub mod artwork;
pub mod user;

pub use artwork::{Artwork, FileType, NewArtwork};
pub use user::{NewUser, User};
