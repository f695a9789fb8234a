use camino::Utf8Path;
use oauth2::{AuthUrl, ClientId, ClientSecret, TokenUrl};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::config::SecretSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secret {
    pub client_id: ClientId,
    pub client_secret: ClientSecret,
    pub auth_url: AuthUrl,
    pub token_url: TokenUrl,
}

impl Secret {
    /// Resolves the secret of the configuration, falling back to `default_path`
    pub async fn resolve(
        source: Option<&SecretSource>,
        default_path: &Utf8Path,
    ) -> anyhow::Result<Secret> {
        match source {
            Some(SecretSource::Inline(secret)) => Ok(secret.clone()),
            Some(SecretSource::File(path)) => load_google_secret(path).await,
            None => load_google_secret(default_path).await,
        }
    }
}

/// Reads a `client_secret.json` file as provided by the Google API console
pub async fn load_google_secret(path: &Utf8Path) -> anyhow::Result<Secret> {
    use anyhow::Context;

    let json = fs::read(path)
        .await
        .with_context(|| format!("Could not read client secret from {path}"))?;
    parse_google_secret(&json)
}

fn parse_google_secret(json: &[u8]) -> anyhow::Result<Secret> {
    let goog: GoogleAppSecret = serde_json::from_slice(json)?;
    match goog {
        GoogleAppSecret::Installed(secret) => Ok(Secret {
            client_id: ClientId::new(secret.client_id),
            client_secret: ClientSecret::new(secret.client_secret),
            auth_url: AuthUrl::new(secret.auth_uri)?,
            token_url: TokenUrl::new(secret.token_uri)?,
        }),
        GoogleAppSecret::Web(_) => anyhow::bail!(
            "Wrong kind of secret file. Please get a secret file with an \"installed\" field"
        ),
    }
}

#[derive(Debug, Clone, Deserialize)]
struct GoogleSecret {
    client_id: String,
    client_secret: String,
    auth_uri: String,
    token_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
enum GoogleAppSecret {
    Installed(GoogleSecret),
    Web(GoogleSecret),
}
