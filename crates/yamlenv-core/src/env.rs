//! Environment variable access
//!
//! The loader never touches `std::env` directly; it goes through the
//! [`Environment`] trait so the process table can be swapped for an
//! in-memory map in tests or dry runs.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Read/write access to a table of environment variables
pub trait Environment {
    /// Look up a variable, distinguishing "unset" (`None`) from "set to empty"
    fn lookup(&self, key: &str) -> Option<String>;

    /// Set a variable, overwriting any previous value
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Get a variable, or an empty string when it is unset
    fn get(&self, key: &str) -> String {
        self.lookup(key).unwrap_or_default()
    }
}

impl<E: Environment + ?Sized> Environment for &mut E {
    fn lookup(&self, key: &str) -> Option<String> {
        (**self).lookup(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

/// Check that a key/value pair can be stored in a process environment
///
/// `std::env::set_var` panics on these inputs, so both backends reject
/// them up front with the same error.
pub fn check_var(key: &str, value: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::invalid_key(key, "key is empty"));
    }
    if key.contains('=') {
        return Err(Error::invalid_key(key, "key contains '='"));
    }
    if key.contains('\0') {
        return Err(Error::invalid_key(key, "key contains a NUL byte"));
    }
    if value.contains('\0') {
        return Err(Error::invalid_key(key, "value contains a NUL byte"));
    }
    Ok(())
}

/// The real process environment
///
/// Writes are visible to the whole process and to every child spawned
/// afterwards. There is no locking: callers are expected to apply
/// configuration once, early, from a single thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl SystemEnvironment {
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnvironment {
    fn lookup(&self, key: &str) -> Option<String> {
        if key.is_empty() || key.contains('=') || key.contains('\0') {
            return None;
        }
        std::env::var_os(key).map(|v| v.to_string_lossy().into_owned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        check_var(key, value)?;
        std::env::set_var(key, value);
        Ok(())
    }
}

/// In-memory environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryEnvironment {
    vars: BTreeMap<String, String>,
}

impl MemoryEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of variables currently set
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Remove a variable, returning its previous value
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.vars.remove(key)
    }

    /// All variables, sorted by name
    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MemoryEnvironment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Environment for MemoryEnvironment {
    fn lookup(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        check_var(key, value)?;
        self.vars.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
