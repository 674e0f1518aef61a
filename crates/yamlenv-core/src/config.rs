//! Configuration file model
//!
//! A config file is a YAML mapping with a single `values` list:
//!
//! ```yaml
//! values:
//!   - key: SOME_KEY
//!     value: "some value"
//! ```
//!
//! Parsing is lenient. A missing or null `values`, `key` or `value` becomes
//! empty, unquoted scalars (`42`, `true`) are kept as their text, and unknown
//! fields are ignored.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::env::Environment;
use crate::error::{Error, Result};

/// A single key/value pair from a config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub key: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub value: String,
}

impl Entry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// The ordered entries of one config file
///
/// Duplicate keys are kept as written. When applied to an environment the
/// entries are set in order, so the last occurrence of a key wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default, deserialize_with = "lenient_entries")]
    pub values: Vec<Entry>,
}

impl Configuration {
    pub fn new(values: Vec<Entry>) -> Self {
        Self { values }
    }

    /// Parse a configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::parse(yaml, None)
    }

    /// Load a configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read(path).map_err(|e| Error::io(path, &e))?;
        let content = String::from_utf8(content).map_err(|e| {
            Error::parse(format!("File is not valid UTF-8: {}", e))
                .with_source_location(crate::error::SourceLocation::file(path))
        })?;
        Self::parse(&content, Some(path))
    }

    /// Only the first document of a multi-document stream is read. An empty,
    /// comment-only or null document is an empty configuration.
    fn parse(yaml: &str, file: Option<&Path>) -> Result<Self> {
        let mut documents = serde_yaml::Deserializer::from_str(yaml);
        let Some(document) = documents.next() else {
            return Ok(Self::default());
        };

        let config = Option::<Self>::deserialize(document).map_err(|e| Error::yaml(&e, file))?;
        Ok(config.unwrap_or_default())
    }

    /// Write the configuration to a YAML file, replacing its contents
    ///
    /// The write is not atomic. On Unix a newly created file gets mode 0644.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let yaml = self.to_yaml()?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }

        let mut file = options.open(path).map_err(|e| Error::io(path, &e))?;
        file.write_all(yaml.as_bytes()).map_err(|e| Error::io(path, &e))?;
        file.flush().map_err(|e| Error::io(path, &e))
    }

    /// Export the configuration as YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::serialize(e.to_string()))
    }

    /// Export the configuration as JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::serialize(e.to_string()))
    }

    /// Export the configuration as `KEY="value"` lines, in file order
    pub fn to_dotenv(&self) -> String {
        let mut out = String::new();
        for entry in &self.values {
            out.push_str(&entry.key);
            out.push_str("=\"");
            for c in entry.value.chars() {
                match c {
                    '\\' => out.push_str("\\\\"),
                    '"' => out.push_str("\\\""),
                    '\n' => out.push_str("\\n"),
                    '$' => out.push_str("\\$"),
                    '`' => out.push_str("\\`"),
                    '\r' => out.push_str("\\r"),
                    c => out.push(c),
                }
            }
            out.push_str("\"\n");
        }
        out
    }

    /// Effective value of a key: the last entry with that key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .rev()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    /// Overwrite the effective entry for `key`, or append a new one
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.values.iter_mut().rev().find(|e| e.key == key) {
            Some(entry) => entry.value = value,
            None => self.values.push(Entry { key, value }),
        }
    }

    /// Set every entry in the given environment, in file order
    ///
    /// Stops at the first entry the environment rejects. Entries applied
    /// before it stay set. Returns the number of entries applied.
    pub fn apply<E: Environment + ?Sized>(&self, env: &mut E) -> Result<usize> {
        for (i, entry) in self.values.iter().enumerate() {
            env.set(&entry.key, &entry.value)
                .map_err(|e| e.with_path(format!("values[{}].key", i)))?;
            log::debug!("Set environment variable {}", entry.key);
        }
        Ok(self.values.len())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.values.iter()
    }

    /// Keys in file order, duplicates included
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|e| e.key.as_str())
    }
}

impl<'a> IntoIterator for &'a Configuration {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl FromIterator<Entry> for Configuration {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Load a configuration from a YAML file
pub fn load_config(path: impl AsRef<Path>) -> Result<Configuration> {
    Configuration::load(path)
}

/// Write a configuration to a YAML file
pub fn save_config(config: &Configuration, path: impl AsRef<Path>) -> Result<()> {
    config.save(path)
}

/// `values: ~` and `- ` (null items) read as empty
fn lenient_entries<'de, D>(deserializer: D) -> std::result::Result<Vec<Entry>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Option::<Vec<Option<Entry>>>::deserialize(deserializer)?;
    Ok(entries
        .unwrap_or_default()
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect())
}

/// Accept any YAML scalar as its literal text; null reads as empty
///
/// Unquoted scalars keep their source text (`1.10`, `0x1F`, `1e3`) rather
/// than going through a number. Sequences and mappings are rejected.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
