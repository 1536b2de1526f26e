// crates/core/src/source/sheets.rs
//! Google Sheets row source authenticated with a service account.
//!
//! Flow: sign an RS256 assertion with the service-account key, trade it for an
//! access token, find the spreadsheet by name through Drive, then read every
//! row of the named worksheet.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use super::{records_from_values, RowSource};
use crate::error::SourceError;
use crate::types::Record;

pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com";
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

const SCOPES: &str = "https://www.googleapis.com/auth/spreadsheets.readonly https://www.googleapis.com/auth/drive.readonly";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
const ASSERTION_TTL_SECS: i64 = 3600;

/// Which spreadsheet/worksheet to read and where the APIs live.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet: String,
    pub worksheet: String,
    pub drive_base_url: String,
    pub sheets_base_url: String,
    pub timeout_secs: u64,
}

impl SheetsConfig {
    pub fn new(spreadsheet: impl Into<String>, worksheet: impl Into<String>) -> Self {
        Self {
            spreadsheet: spreadsheet.into(),
            worksheet: worksheet.into(),
            drive_base_url: DRIVE_API_BASE.to_string(),
            sheets_base_url: SHEETS_API_BASE.to_string(),
            timeout_secs: 30,
        }
    }
}

/// The fields of a service-account JSON key file we need.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| SourceError::Credentials {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&contents).map_err(|e| SourceError::Credentials {
            path: path.to_path_buf(),
            message: format!("not a service-account key: {e}"),
        })
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

fn build_claims(key: &ServiceAccountKey, now: DateTime<Utc>) -> AssertionClaims<'_> {
    AssertionClaims {
        iss: &key.client_email,
        scope: SCOPES,
        aud: &key.token_uri,
        iat: now.timestamp(),
        exp: now.timestamp() + ASSERTION_TTL_SECS,
    }
}

fn sign_assertion(key: &ServiceAccountKey, now: DateTime<Utc>) -> Result<String, SourceError> {
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| SourceError::Auth(format!("invalid service-account private key: {e}")))?;
    encode(&Header::new(Algorithm::RS256), &build_claims(key, now), &encoding_key)
        .map_err(|e| SourceError::Auth(format!("failed to sign assertion: {e}")))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

enum Auth {
    ServiceAccount(ServiceAccountKey),
    AccessToken(String),
}

pub struct SheetsRowSource {
    config: SheetsConfig,
    auth: Auth,
    client: reqwest::Client,
}

impl SheetsRowSource {
    pub fn from_service_account_file(
        path: impl AsRef<Path>,
        config: SheetsConfig,
    ) -> Result<Self, SourceError> {
        let key = ServiceAccountKey::from_file(path)?;
        Self::build(config, Auth::ServiceAccount(key))
    }

    /// Use an already issued OAuth access token instead of a service account.
    pub fn with_access_token(
        token: impl Into<String>,
        config: SheetsConfig,
    ) -> Result<Self, SourceError> {
        Self::build(config, Auth::AccessToken(token.into()))
    }

    fn build(config: SheetsConfig, auth: Auth) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SourceError::Http(e.to_string()))?;
        Ok(Self {
            config,
            auth,
            client,
        })
    }

    async fn access_token(&self) -> Result<String, SourceError> {
        let key = match &self.auth {
            Auth::AccessToken(token) => return Ok(token.clone()),
            Auth::ServiceAccount(key) => key,
        };

        let assertion = sign_assertion(key, Utc::now())?;
        let resp = self
            .client
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SourceError::Auth(format!("token endpoint returned {status}: {body}")));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| SourceError::Auth(format!("invalid token response: {e}")))?;
        tracing::debug!(client_email = %key.client_email, "obtained sheets access token");
        Ok(token.access_token)
    }

    async fn find_spreadsheet_id(&self, token: &str) -> Result<String, SourceError> {
        let query = format!(
            "name = '{}' and mimeType = '{}' and trashed = false",
            escape_drive_literal(&self.config.spreadsheet),
            SPREADSHEET_MIME
        );
        let url = format!("{}/drive/v3/files", self.config.drive_base_url.trim_end_matches('/'));

        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("q", query.as_str()), ("fields", "files(id,name)")])
            .send()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => SourceError::Auth(body),
                code => SourceError::Api { status: code, body },
            });
        }

        let list: DriveFileList = resp
            .json()
            .await
            .map_err(|e| SourceError::Http(format!("invalid Drive response: {e}")))?;
        list.files
            .into_iter()
            .next()
            .map(|f| f.id)
            .ok_or_else(|| SourceError::SpreadsheetNotFound(self.config.spreadsheet.clone()))
    }

    async fn fetch_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
    ) -> Result<Vec<Vec<String>>, SourceError> {
        let range = format!("'{}'", self.config.worksheet.replace('\'', "''"));
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.config.sheets_base_url.trim_end_matches('/'),
            spreadsheet_id,
            urlencoding::encode(&range)
        );

        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                // Sheets answers an unknown tab with "Unable to parse range".
                400 => SourceError::WorksheetNotFound {
                    spreadsheet: self.config.spreadsheet.clone(),
                    worksheet: self.config.worksheet.clone(),
                },
                401 | 403 => SourceError::Auth(body),
                404 => SourceError::SpreadsheetNotFound(self.config.spreadsheet.clone()),
                code => SourceError::Api { status: code, body },
            });
        }

        let range: ValueRange = resp
            .json()
            .await
            .map_err(|e| SourceError::Http(format!("invalid Sheets response: {e}")))?;
        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }
}

#[async_trait]
impl RowSource for SheetsRowSource {
    async fn fetch_all(&self) -> Result<Vec<Record>, SourceError> {
        let token = self.access_token().await?;
        let spreadsheet_id = self.find_spreadsheet_id(&token).await?;
        let values = self.fetch_values(&token, &spreadsheet_id).await?;
        let records = records_from_values(values)?;
        tracing::info!(
            spreadsheet = %self.config.spreadsheet,
            worksheet = %self.config.worksheet,
            rows = records.len(),
            "fetched source rows"
        );
        Ok(records)
    }
}

fn escape_drive_literal(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
