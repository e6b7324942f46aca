//! Player identity and client data carried by the Login packet.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::SessionError;

/// Who the player is, according to the identity provider.
///
/// Taken from the `extraData` claim of the chain's leaf link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthProfile {
    #[serde(rename = "displayName")]
    pub display_name: String,
    /// Account UUID, as the hyphenated string the provider sends.
    pub identity: String,
    #[serde(rename = "XUID", default, skip_serializing_if = "Option::is_none")]
    pub xuid: Option<String>,
}

impl AuthProfile {
    /// Reads the profile out of a leaf link's claims.
    pub fn from_claims(claims: &Map<String, Value>) -> Result<Self, SessionError> {
        let extra = claims
            .get("extraData")
            .ok_or_else(|| SessionError::MalformedChain("leaf has no extraData".into()))?;
        serde_json::from_value(extra.clone())
            .map_err(|e| SessionError::MalformedChain(format!("extraData: {e}")))
    }
}

/// Device, skin, and locale details the client reports about itself.
///
/// Every field is optional on the wire; missing ones take their defaults
/// rather than failing the login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ClientData {
    pub client_random_id: i64,
    pub server_address: String,
    pub skin_id: String,
    /// Base64 of the raw skin image.
    pub skin_data: String,
    pub game_version: String,
    #[serde(rename = "DeviceOS")]
    pub device_os: i32,
    pub device_model: String,
    pub language_code: String,
    #[serde(rename = "UIProfile")]
    pub ui_profile: i32,
    pub gui_scale: i32,
    pub current_input_mode: i32,
    pub default_input_mode: i32,
}

impl ClientData {
    pub fn from_claims(claims: Map<String, Value>) -> Result<Self, SessionError> {
        serde_json::from_value(Value::Object(claims))
            .map_err(|e| SessionError::ClientDataVerificationFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_profile_from_claims_reads_extra_data() {
        let claims = object(json!({
            "extraData": {
                "displayName": "Steve",
                "identity": "3c4b2c7e-8a39-4b4f-9d0e-0e6d0c1f5a11",
                "XUID": "2535400000000000"
            }
        }));
        let profile = AuthProfile::from_claims(&claims).unwrap();
        assert_eq!(profile.display_name, "Steve");
        assert_eq!(profile.xuid.as_deref(), Some("2535400000000000"));
    }

    #[test]
    fn test_profile_without_xuid_is_allowed() {
        let claims = object(json!({
            "extraData": {"displayName": "Alex", "identity": "id"}
        }));
        assert_eq!(AuthProfile::from_claims(&claims).unwrap().xuid, None);
    }

    #[test]
    fn test_profile_missing_extra_data_fails() {
        assert!(matches!(
            AuthProfile::from_claims(&Map::new()),
            Err(SessionError::MalformedChain(_))
        ));
    }

    #[test]
    fn test_client_data_pascal_case_fields_and_defaults() {
        let data = ClientData::from_claims(object(json!({
            "ClientRandomId": -42,
            "SkinId": "Standard_Steve",
            "DeviceOS": 7,
            "UIProfile": 1,
            "LanguageCode": "en_US"
        })))
        .unwrap();
        assert_eq!(data.client_random_id, -42);
        assert_eq!(data.skin_id, "Standard_Steve");
        assert_eq!(data.device_os, 7);
        assert_eq!(data.ui_profile, 1);
        assert_eq!(data.language_code, "en_US");
        assert!(data.server_address.is_empty());
    }
}
