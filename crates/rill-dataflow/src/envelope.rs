//! Typed settings envelopes.
//!
//! Plan descriptors carry connector settings as a type-tagged byte payload
//! so the plan format stays connector-agnostic. The tag is checked against
//! the registered creator's expected type before the payload is decoded.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::FactoryError;

/// Settings structs that can travel inside a [`SettingsAny`] envelope.
///
/// `TYPE_URL` is the envelope tag and must be unique per settings type.
pub trait ConnectorSettings: Serialize + DeserializeOwned {
    const TYPE_URL: &'static str;
}

/// A type-tagged, serialized settings payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsAny {
    /// Declared type of the payload.
    pub type_url: String,
    /// JSON-encoded settings bytes.
    pub value: Vec<u8>,
}

impl SettingsAny {
    /// Wrap `settings` in an envelope tagged with its type url.
    pub fn pack<S: ConnectorSettings>(settings: &S) -> Result<Self, FactoryError> {
        let value =
            serde_json::to_vec(settings).map_err(|e| FactoryError::SettingsEncodeFailure {
                type_url: S::TYPE_URL.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            type_url: S::TYPE_URL.to_string(),
            value,
        })
    }

    /// Whether the envelope declares payload type `S`.
    pub fn is<S: ConnectorSettings>(&self) -> bool {
        self.type_url == S::TYPE_URL
    }

    /// Decode the payload as `S` without checking the declared type.
    ///
    /// Factories check [`SettingsAny::is`] first so that a mismatched
    /// envelope reports as a type fault, not a decode fault.
    pub fn decode<S: ConnectorSettings>(&self) -> Result<S, serde_json::Error> {
        serde_json::from_slice(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct FileSettings {
        path: String,
        follow: bool,
    }

    impl ConnectorSettings for FileSettings {
        const TYPE_URL: &'static str = "rill.test.FileSettings";
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct OtherSettings {
        url: String,
    }

    impl ConnectorSettings for OtherSettings {
        const TYPE_URL: &'static str = "rill.test.OtherSettings";
    }

    #[test]
    fn test_pack_then_decode() {
        let settings = FileSettings {
            path: "/tmp/in.csv".to_string(),
            follow: true,
        };
        let envelope = SettingsAny::pack(&settings).unwrap();
        assert_eq!(envelope.type_url, "rill.test.FileSettings");
        assert!(envelope.is::<FileSettings>());
        assert!(!envelope.is::<OtherSettings>());
        let back: FileSettings = envelope.decode().unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let envelope = SettingsAny {
            type_url: FileSettings::TYPE_URL.to_string(),
            value: b"{not json".to_vec(),
        };
        assert!(envelope.decode::<FileSettings>().is_err());
    }
}
