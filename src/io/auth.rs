//! Service account authentication for the Google Sheets API.
//!
//! The key file is the JSON document downloaded from the cloud console. A
//! short-lived RS256 assertion signed with its private key is exchanged at
//! the key's token endpoint for a bearer token.

use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{Result, ToolError};

/// Read/write access to spreadsheets.
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Credentials read from a service account key file.
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Claims of the signed assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Bearer token returned by the token endpoint.
#[derive(Clone)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expiry")]
    expires_in: i64,
}

fn default_expiry() -> i64 {
    ASSERTION_LIFETIME_SECS
}

impl ServiceAccount {
    /// Loads a key file. Any problem with the file is an authentication
    /// failure since no client can be built without it.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ToolError::AuthenticationFailure(format!(
                "key file {} not found",
                path.display()
            )));
        }
        let source = fs::read_to_string(path)?;
        Self::from_json(&source).map_err(|error| {
            ToolError::AuthenticationFailure(format!("invalid key file {}: {error}", path.display()))
        })
    }

    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn claims(&self, now: DateTime<Utc>) -> Claims {
        let iat = now.timestamp();
        Claims {
            iss: self.client_email.clone(),
            scope: SHEETS_SCOPE.to_string(),
            aud: self.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        }
    }

    /// Signs the assertion presented to the token endpoint.
    pub fn assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes()).map_err(|error| {
            ToolError::AuthenticationFailure(format!("unreadable private key: {error}"))
        })?;
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();
        Ok(encode(&header, &self.claims(now), &key)?)
    }

    /// Exchanges a fresh assertion for an access token.
    #[instrument(level = "info", skip_all, fields(account = %self.client_email))]
    pub fn fetch_token(&self, client: &Client) -> Result<AccessToken> {
        let now = Utc::now();
        let assertion = self.assertion(now)?;

        let response = client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .map_err(|error| {
                ToolError::AuthenticationFailure(format!("token request failed: {error}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ToolError::AuthenticationFailure(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response.json()?;
        let expires_at = now + Duration::seconds(token.expires_in);
        debug!(%expires_at, "access token issued");
        Ok(AccessToken {
            value: token.access_token,
            expires_at,
        })
    }
}
