/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Per-run state shared by the merger, the evaluator and operators.
 */

//! Run-scoped state.
//!
//! Caches and allocation tables live for exactly one merge-and-evaluate run.
//! Create a fresh [`RunContext`] per run, or call [`RunContext::reset`]
//! between runs.

use crate::cursor::Cursor;
use crate::secrets::{SecretData, SecretError, SecretStore};
use std::collections::HashMap;
use std::fmt;
use std::net::Ipv4Addr;

/// State owned by a single run.
#[derive(Default)]
pub struct RunContext {
    secret_store: Option<Box<dyn SecretStore>>,
    secret_cache: HashMap<String, Result<SecretData, SecretError>>,
    used_addresses: HashMap<(String, Ipv4Addr), String>,
    prune: Vec<Cursor>,

    /// Replace secrets with `REDACTED` instead of fetching them.
    pub redact: bool,
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("has_secret_store", &self.secret_store.is_some())
            .field("cached_secrets", &self.secret_cache.len())
            .field("used_addresses", &self.used_addresses.len())
            .field("prune", &self.prune)
            .field("redact", &self.redact)
            .finish()
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret_store(mut self, store: Box<dyn SecretStore>) -> Self {
        self.secret_store = Some(store);
        self
    }

    pub fn has_secret_store(&self) -> bool {
        self.secret_store.is_some()
    }

    /// Forget every cached secret, allocated address and prune path.
    ///
    /// The secret store itself and the `redact` flag are configuration and
    /// survive a reset.
    pub fn reset(&mut self) {
        self.secret_cache.clear();
        self.used_addresses.clear();
        self.prune.clear();
    }

    /// Fetch the data at `path`, contacting the store at most once per run.
    ///
    /// Failures are cached too. Returns `Ok(None)` when no store is
    /// configured.
    pub fn secret(&mut self, path: &str) -> Result<Option<&SecretData>, SecretError> {
        let Some(store) = self.secret_store.as_ref() else {
            return Ok(None);
        };
        let fetched = self.secret_cache.entry(path.to_string()).or_insert_with(|| {
            tracing::debug!(path, "fetching secret");
            store.fetch(path)
        });
        match &*fetched {
            Ok(data) => Ok(Some(data)),
            Err(e) => Err(e.clone()),
        }
    }

    /// Claim `address` on `network` for `owner`.
    ///
    /// Claiming an address already held by the same owner is allowed, so a
    /// call site that is evaluated twice is harmless. On conflict the current
    /// holder is returned.
    pub fn claim_address(
        &mut self,
        network: &str,
        address: Ipv4Addr,
        owner: &str,
    ) -> Result<(), String> {
        let key = (network.to_string(), address);
        match self.used_addresses.get(&key) {
            Some(holder) if holder != owner => Err(holder.clone()),
            Some(_) => Ok(()),
            None => {
                self.used_addresses.insert(key, owner.to_string());
                Ok(())
            }
        }
    }

    pub fn used_address_count(&self) -> usize {
        self.used_addresses.len()
    }

    /// Record a path to delete once evaluation completes.
    pub fn mark_prune(&mut self, path: Cursor) {
        if !self.prune.contains(&path) {
            tracing::debug!(path = %path, "marked for pruning");
            self.prune.push(path);
        }
    }

    pub fn prune_paths(&self) -> &[Cursor] {
        &self.prune
    }

    pub(crate) fn take_prune_paths(&mut self) -> Vec<Cursor> {
        std::mem::take(&mut self.prune)
    }
}
