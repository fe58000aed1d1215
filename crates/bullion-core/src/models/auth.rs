use serde::{Deserialize, Serialize};

/// The `{ "data": ... }` wrapper around every API payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

/// Body of a successful login or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenPayload {
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

/// Structured error body returned by the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Serialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

// Keep the password out of logs
impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_refresh_payload() {
        let json = r#"{"data": {"accessToken": "xyz", "user": {"id": 7}}}"#;
        let envelope: DataEnvelope<AccessTokenPayload> =
            serde_json::from_str(json).expect("Failed to parse refresh payload");
        assert_eq!(envelope.data.access_token, "xyz");
    }

    #[test]
    fn test_parse_error_payload() {
        let json = r#"{"success": false, "code": "INVALID_REFRESH_TOKEN", "message": "Invalid refresh token"}"#;
        let payload: ErrorPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.code.as_deref(), Some("INVALID_REFRESH_TOKEN"));
        assert_eq!(payload.message.as_deref(), Some("Invalid refresh token"));
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = LoginCredentials {
            username: "desk".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{:?}", creds);
        assert!(debug.contains("desk"));
        assert!(!debug.contains("hunter2"));
    }
}
