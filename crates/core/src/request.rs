//! Request payloads accepted by the import pipeline.
//!
//! Field names follow the JSON contract (camelCase) the web client sends.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Session ids double as checkpoint file names: 1-128 characters of
/// `[A-Za-z0-9_-]`.
pub fn validate_session_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > 128 {
        return Err(ValidationError("socketId must be 1-128 characters".to_string()));
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(ValidationError(format!(
            "socketId '{}' may only contain letters, digits, '-' and '_'",
            id
        )));
    }
    Ok(())
}

/// AES-256-GCM encrypted connection URL, hex-encoded parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedCredential {
    pub encrypted_data: String,
    pub iv: String,
    pub auth_tag: String,
}

/// Start a fresh import.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub redis_con_url: Option<String>,
    pub redis_con_url_encrypted: Option<EncryptedCredential>,
    pub socket_id: Option<String>,
    pub id_field: Option<String>,
    pub key_prefix: Option<String>,
    pub is_stop_on_error: Option<bool>,
    /// Transform expression evaluated per record.
    pub js_function_string: Option<String>,
    pub upload_type: Option<String>,
    pub upload_path: String,
}

impl ImportRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.upload_path.trim().is_empty() {
            return Err(ValidationError("uploadPath is required".to_string()));
        }
        if let Some(id) = &self.socket_id {
            validate_session_id(id)?;
        }
        if let Some(field) = &self.id_field {
            if field.trim().is_empty() {
                return Err(ValidationError("idField must not be empty".to_string()));
            }
        }
        Ok(())
    }
}

/// Resume a paused import. The source must be supplied again; the
/// connection URL only when the checkpoint withheld it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRequest {
    pub socket_id: String,
    pub redis_con_url: Option<String>,
    pub redis_con_url_encrypted: Option<EncryptedCredential>,
    pub is_stop_on_error: Option<bool>,
    pub upload_type: Option<String>,
    pub upload_path: String,
}

impl ResumeRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.socket_id.trim().is_empty() {
            return Err(ValidationError("socketId is required".to_string()));
        }
        validate_session_id(&self.socket_id)?;
        if self.upload_path.trim().is_empty() {
            return Err(ValidationError("uploadPath is required".to_string()));
        }
        Ok(())
    }
}

/// Preload catalog data sources into the default store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreloadRequest {
    #[serde(default)]
    pub ids: Vec<String>,
    pub is_all: Option<bool>,
}

impl PreloadRequest {
    pub fn is_all(&self) -> bool {
        self.is_all.unwrap_or(false)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.ids.is_empty() && !self.is_all() {
            return Err(ValidationError(
                "ids must not be empty unless isAll is set".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_request_parses_client_payload() {
        let json = r#"{
            "redisConUrlEncrypted": {"encryptedData": "aa", "iv": "bb", "authTag": "cc"},
            "socketId": "abc",
            "idField": "productId",
            "keyPrefix": "products:",
            "isStopOnError": true,
            "uploadType": "JSON_FOLDER",
            "uploadPath": "/tmp/upload"
        }"#;
        let req: ImportRequest = serde_json::from_str(json).unwrap();
        assert!(req.redis_con_url.is_none());
        assert_eq!(req.redis_con_url_encrypted.as_ref().unwrap().auth_tag, "cc");
        assert_eq!(req.key_prefix.as_deref(), Some("products:"));
        assert_eq!(req.is_stop_on_error, Some(true));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn session_ids_are_file_name_safe() {
        assert!(validate_session_id("Xy3_-abc").is_ok());
        assert!(validate_session_id("../etc").is_err());
        assert!(validate_session_id("").is_err());
        assert!(validate_session_id(&"a".repeat(129)).is_err());
    }

    #[test]
    fn import_request_requires_upload_path() {
        let err = serde_json::from_str::<ImportRequest>(r#"{"socketId":"a"}"#);
        assert!(err.is_err());

        let req = ImportRequest {
            upload_path: "  ".to_string(),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn resume_request_requires_socket_id() {
        let req = ResumeRequest {
            socket_id: String::new(),
            upload_path: "/tmp/x".to_string(),
            ..Default::default()
        };
        assert_eq!(
            req.validate().unwrap_err().0,
            "socketId is required".to_string()
        );
    }

    #[test]
    fn preload_request_needs_ids_or_all() {
        let req: PreloadRequest = serde_json::from_str(r#"{"isAll": true}"#).unwrap();
        assert!(req.validate().is_ok());
        let req: PreloadRequest = serde_json::from_str(r#"{"ids": []}"#).unwrap();
        assert!(req.validate().is_err());
    }
}
