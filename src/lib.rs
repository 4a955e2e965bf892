//! inkpost: a content-management backend for a multi-language article
//! platform, with a read-through cache in front of Postgres.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
