//! Identifier types for backends and the managed asset.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

fn validate(kind: &'static str, value: String) -> Result<String, ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyIdentifier { kind });
    }
    // Handles are either slugs ("aave-v3") or hex addresses ("0xabc...")
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
    {
        return Err(ValidationError::InvalidIdentifier { kind, value });
    }
    Ok(value)
}

/// Handle of a registered yield backend.
///
/// # Examples
///
/// ```
/// use sluice_core::types::BackendId;
///
/// let id = BackendId::new("aave-v3").unwrap();
/// assert_eq!(id.as_str(), "aave-v3");
/// assert!(BackendId::new("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BackendId(String);

impl BackendId {
    /// Creates a new `BackendId`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the handle is empty or malformed.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        validate("backend id", value.into()).map(Self)
    }

    /// Returns the handle as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BackendId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for BackendId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BackendId> for String {
    fn from(id: BackendId) -> Self {
        id.0
    }
}

impl AsRef<str> for BackendId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier of the asset a manager and its backends operate on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetId(String);

impl AssetId {
    /// Creates a new `AssetId`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the identifier is empty or malformed.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        validate("asset id", value.into()).map(Self)
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AssetId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for AssetId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AssetId> for String {
    fn from(id: AssetId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_id_valid() {
        assert!(BackendId::new("compound-v3").is_ok());
        assert!(BackendId::new("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48").is_ok());
    }

    #[test]
    fn test_backend_id_invalid() {
        assert_eq!(
            BackendId::new(""),
            Err(ValidationError::EmptyIdentifier { kind: "backend id" })
        );
        assert!(matches!(
            BackendId::new("has space"),
            Err(ValidationError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_backend_id_serde_validates() {
        let id: BackendId = serde_json::from_str("\"morpho\"").unwrap();
        assert_eq!(id.as_str(), "morpho");
        assert!(serde_json::from_str::<BackendId>("\"\"").is_err());
    }

    #[test]
    fn test_asset_id_display() {
        let asset = AssetId::new("USDC").unwrap();
        assert_eq!(asset.to_string(), "USDC");
    }
}
