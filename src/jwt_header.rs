use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct JWTHeader {
    #[serde(rename = "alg")]
    pub(crate) algorithm: String,

    #[serde(rename = "typ", default, skip_serializing_if = "Option::is_none")]
    pub(crate) signature_type: Option<String>,
}

impl JWTHeader {
    pub(crate) fn new(algorithm: String) -> Self {
        JWTHeader {
            algorithm,
            ..Default::default()
        }
    }
}

impl Default for JWTHeader {
    fn default() -> Self {
        JWTHeader {
            algorithm: "Not set".to_string(),
            signature_type: Some("JWT".to_string()),
        }
    }
}
