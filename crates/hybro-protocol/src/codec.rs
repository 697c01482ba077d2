//! Transport string representation of values.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Serialize a value to its transport string.
pub fn stringify<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Deserialize a value from its transport string.
pub fn parse<T: DeserializeOwned>(text: &str) -> Result<T> {
    Ok(serde_json::from_str(text)?)
}
