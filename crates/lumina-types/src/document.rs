//! Validated lumina.json documents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CacheError;

/// A lumina.json document: a named collection of content blocks.
///
/// Accepted source layouts, mirroring what repositories publish:
/// 1. A bare JSON array of blocks (wrapped into `{ "blocks": [...] }`)
/// 2. An object with a `blocks` array, plus arbitrary extra top-level fields
///
/// Anything else fails structural validation with [`CacheError::InvalidFormat`].
/// Individual blocks are treated as opaque JSON; this core does not interpret
/// their contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuminaDoc {
    pub blocks: Vec<Value>,
    /// Extra top-level fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LuminaDoc {
    /// Validate an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, CacheError> {
        match value {
            Value::Array(blocks) => Ok(Self {
                blocks,
                extra: Map::new(),
            }),
            Value::Object(map)
                if map.get("blocks").map(Value::is_array).unwrap_or(false) =>
            {
                serde_json::from_value(Value::Object(map))
                    .map_err(|e| CacheError::invalid_format(e.to_string()))
            }
            _ => Err(CacheError::invalid_format(
                "expected an array of blocks or an object with a 'blocks' array",
            )),
        }
    }

    /// Parse and validate raw document bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CacheError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| CacheError::invalid_format(format!("not valid JSON: {}", e)))?;
        Self::from_value(value)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}
