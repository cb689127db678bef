/*
 * secrets.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Interface to an external secret store.
 */

//! The secret-store collaborator used by the `vault` operator.
//!
//! A store maps a secret path to a flat string-keyed mapping. The wire
//! protocol of any real store lives behind this trait.

use indexmap::IndexMap;
use thiserror::Error;

/// Flat key/value contents of one secret path.
pub type SecretData = IndexMap<String, String>;

/// Failures reported by a [`SecretStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretError {
    #[error("secret `{0}` not found")]
    NotFound(String),

    #[error("secret store transport error: {0}")]
    Transport(String),

    #[error("secret store authentication failed: {0}")]
    AuthFailed(String),
}

/// Source of secret values.
pub trait SecretStore {
    /// Fetch every key stored at `path`.
    fn fetch(&self, path: &str) -> Result<SecretData, SecretError>;
}

/// An in-memory store, filled up front.
#[derive(Debug, Clone, Default)]
pub struct MemorySecretStore {
    secrets: IndexMap<String, SecretData>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the data stored at `path`.
    pub fn insert(&mut self, path: impl Into<String>, data: SecretData) {
        self.secrets.insert(path.into(), data);
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

impl SecretStore for MemorySecretStore {
    fn fetch(&self, path: &str) -> Result<SecretData, SecretError> {
        self.secrets
            .get(path)
            .cloned()
            .ok_or_else(|| SecretError::NotFound(path.to_string()))
    }
}
