//! Use-case services sitting between the HTTP surface and the repositories.

pub mod articles;
pub mod auth;
pub mod categories;
pub mod error;
pub mod languages;
pub mod pagination;
pub mod public_articles;
pub mod repos;
pub mod users;
