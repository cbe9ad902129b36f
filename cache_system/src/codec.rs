//! JSON text codec for cached operation results

use crate::errors::CacheError;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Encode a result as JSON text. Non-ASCII text is stored as-is.
pub fn encode<T>(value: &T) -> Result<String, CacheError>
where
    T: Serialize + ?Sized,
{
    serde_json::to_string(value).map_err(CacheError::Encode)
}

/// Decode stored JSON text into the requested result type
pub fn decode<T>(text: &str) -> Result<T, CacheError>
where
    T: DeserializeOwned,
{
    serde_json::from_str(text).map_err(CacheError::Decode)
}
