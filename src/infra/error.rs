//! Failures raised while the process starts, serves, or runs a maintenance command.

use std::{io, net::SocketAddr};

use thiserror::Error;

use crate::cache::CacheStoreError;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("http server stopped: {0}")]
    Serve(#[source] io::Error),
    #[error("upload directory unusable: {0}")]
    Uploads(#[source] io::Error),
    #[error("database unreachable: {message}")]
    Database { message: String },
    #[error("migrations failed: {message}")]
    Migration { message: String },
    #[error("cache store error: {0}")]
    Cache(#[from] CacheStoreError),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl InfraError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn migration(message: impl Into<String>) -> Self {
        Self::Migration {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
