//! Presence-aware argument sets
//!
//! Command-line flags form the base layer. At most one overlay (stdin or an
//! `--input` file) is layered on top: keys present in the overlay win, keys
//! it omits keep their base value. A key that is present with an empty
//! string is still present.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::{BotFileError, Result};

/// Immutable mapping from argument name to supplied value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentSet {
    values: BTreeMap<String, Value>,
}

impl ArgumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, builder style
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    /// Add a value only when the flag was given
    pub fn with_opt(self, name: &str, value: Option<String>) -> Self {
        match value {
            Some(v) => self.with(name, v),
            None => self,
        }
    }

    /// Parse an overlay from JSON object text; `null` entries count as absent
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| BotFileError::invalid(format!("arguments are not valid JSON: {e}")))?;
        let Value::Object(map) = value else {
            return Err(BotFileError::invalid("arguments must be a JSON object"));
        };
        Ok(Self::from_map(map))
    }

    fn from_map(map: Map<String, Value>) -> Self {
        let values = map.into_iter().filter(|(_, v)| !v.is_null()).collect();
        Self { values }
    }

    /// New set with `overlay` layered on top of `self`
    pub fn layered(&self, overlay: &ArgumentSet) -> ArgumentSet {
        let mut values = self.values.clone();
        values.extend(
            overlay
                .values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        ArgumentSet { values }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Present with a value other than `""` or `false`
    pub fn is_supplied(&self, name: &str) -> bool {
        match self.values.get(name) {
            None | Some(Value::Bool(false)) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Textual value of `name`; numbers and booleans are stringified
    pub fn text(&self, name: &str) -> Result<Option<String>> {
        match self.values.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(v.to_string())),
            Some(_) => Err(BotFileError::invalid(format!(
                "--{name} must be a string value"
            ))),
        }
    }

    /// String map from `name`: JSON text (as on the command line) or an
    /// object given directly in an overlay. An empty value is not a mapping.
    pub fn mapping(&self, name: &str) -> Result<Option<indexmap::IndexMap<String, String>>> {
        if !self.is_supplied(name) {
            return Ok(None);
        }
        let object = match self.values.get(name) {
            None => return Ok(None),
            Some(Value::String(text)) => serde_json::from_str::<Value>(text)
                .map_err(|e| BotFileError::invalid(format!("--{name} is not valid JSON: {e}")))?,
            Some(other) => other.clone(),
        };
        let Value::Object(object) = object else {
            return Err(BotFileError::invalid(format!(
                "--{name} must be a JSON object"
            )));
        };

        object
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(s) => Ok((key, s)),
                v @ (Value::Number(_) | Value::Bool(_)) => Ok((key, v.to_string())),
                _ => Err(BotFileError::invalid(format!(
                    "--{name} value for '{key}' must be a string"
                ))),
            })
            .collect::<Result<_>>()
            .map(Some)
    }
}

/// Where the overlay layer comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlaySource {
    Stdin,
    File(PathBuf),
}

impl OverlaySource {
    /// Choose the overlay from the `--stdin` and `--input` flags; stdin wins
    pub fn select(stdin: bool, input: Option<PathBuf>) -> Option<Self> {
        match (stdin, input) {
            (true, Some(path)) => {
                warn!(input = %path.display(), "--stdin and --input both given, ignoring --input");
                Some(OverlaySource::Stdin)
            }
            (true, None) => Some(OverlaySource::Stdin),
            (false, Some(path)) => Some(OverlaySource::File(path)),
            (false, None) => None,
        }
    }

    /// Read and parse the overlay
    pub async fn read(&self) -> Result<ArgumentSet> {
        let text = match self {
            OverlaySource::Stdin => {
                let mut buf = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut buf)
                    .await
                    .map_err(|e| BotFileError::io("<stdin>", e))?;
                buf
            }
            OverlaySource::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| BotFileError::io(path, e))?,
        };
        let overlay = ArgumentSet::from_json(&text)?;
        debug!(source = ?self, keys = overlay.values.len(), "read argument overlay");
        Ok(overlay)
    }
}

/// Merge directly supplied flags with the optional overlay
pub async fn merge_arguments(
    flags: &ArgumentSet,
    overlay: Option<&OverlaySource>,
) -> Result<ArgumentSet> {
    match overlay {
        Some(source) => Ok(flags.layered(&source.read().await?)),
        None => Ok(flags.clone()),
    }
}
