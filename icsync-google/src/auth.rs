//! Credential loading and access-token exchange.

use std::path::Path;

use serde::Deserialize;

use icsync_core::{IcsyncError, IcsyncResult};

/// Offline credential material: an OAuth client plus a long-lived refresh
/// token, stored as a small JSON file named by configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl Credentials {
    pub fn load(path: &Path) -> IcsyncResult<Credentials> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            IcsyncError::Config(format!(
                "Failed to read credentials at {}: {}",
                path.display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            IcsyncError::Config(format!(
                "Invalid credentials file at {}: {}",
                path.display(),
                e
            ))
        })
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Exchange the refresh token for a short-lived access token.
///
/// Google typically does not rotate the refresh token on this call, so the
/// credential file never needs rewriting.
pub(crate) async fn fetch_access_token(
    client: &reqwest::Client,
    token_url: &str,
    credentials: &Credentials,
) -> IcsyncResult<String> {
    let params = [
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.as_str()),
        ("refresh_token", credentials.refresh_token.as_str()),
        ("grant_type", "refresh_token"),
    ];

    let response = client
        .post(token_url)
        .form(&params)
        .send()
        .await
        .map_err(|e| IcsyncError::Store(format!("token request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(IcsyncError::Store(format!(
            "token request returned {}",
            response.status()
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| IcsyncError::Store(format!("invalid token response: {e}")))?;

    Ok(token.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_credentials_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        std::fs::write(
            &path,
            r#"{"client_id":"id","client_secret":"secret","refresh_token":"rt"}"#,
        )
        .unwrap();

        let creds = Credentials::load(&path).unwrap();
        assert_eq!(creds.client_id, "id");
        assert_eq!(creds.refresh_token, "rt");
    }

    #[test]
    fn test_missing_or_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();

        assert!(Credentials::load(&dir.path().join("nope.json")).is_err());

        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{}").unwrap();
        assert!(Credentials::load(&path).is_err());
    }
}
