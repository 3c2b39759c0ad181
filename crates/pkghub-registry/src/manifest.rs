//! The producer-declared `_manifest.yml` embedded in every package archive.

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_yaml::Value;

use crate::{
    error::{RegistryError, Result},
    nonempty::NonEmpty,
};

/// Metadata declared by the package author inside the archive.
///
/// This may legitimately differ from the registry's own index record for
/// the same version; consumers receive both.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PackageManifest {
    #[serde(deserialize_with = "scalar_string")]
    pub author: String,
    #[serde(deserialize_with = "scalar_string")]
    pub description: String,
    #[serde(deserialize_with = "scalar_string")]
    pub name: String,
    #[serde(deserialize_with = "scalar_string")]
    pub title: String,
    #[serde(deserialize_with = "scalar_string")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    pub tags: NonEmpty<String>,
}

/// Accepts integer and boolean scalars that authors commonly leave
/// unquoted and reads them as text.
///
/// Floats are rejected: YAML reads `version: 1.10` as `1.1`, so the
/// author's text cannot be recovered and must be quoted instead.
fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => Err(de::Error::invalid_type(
                de::Unexpected::Float(f),
                &"a string or an integer",
            )),
            _ => Ok(n.to_string()),
        },
        Value::Bool(b) => Ok(b.to_string()),
        other => {
            Err(de::Error::invalid_type(
                unexpected(&other),
                &"a string",
            ))
        }
    }
}

fn unexpected(value: &Value) -> de::Unexpected<'_> {
    match value {
        Value::Null => de::Unexpected::Unit,
        Value::Sequence(_) => de::Unexpected::Seq,
        Value::Mapping(_) => de::Unexpected::Map,
        _ => de::Unexpected::Other("tagged value"),
    }
}

impl PackageManifest {
    /// Parses manifest text for the package identified by `package_id`.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::ManifestSyntax`] if the text is not YAML
    /// - [`RegistryError::ManifestSchema`] if it is YAML but lacks a
    ///   required field or has an empty `tags` list
    pub fn parse(package_id: &str, text: &str) -> Result<Self> {
        let document: Value = serde_yaml::from_str(text).map_err(|source| {
            RegistryError::ManifestSyntax {
                package: package_id.to_string(),
                source,
            }
        })?;

        serde_yaml::from_value(document).map_err(|source| {
            RegistryError::ManifestSchema {
                package: package_id.to_string(),
                source,
            }
        })
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|err| RegistryError::Custom(format!("serializing manifest: {err}")))
    }
}
