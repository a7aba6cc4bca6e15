//! Bearer token lookup from ambient Google Cloud credentials.
//!
//! Order: a token set on the [`Config`], then `GOOGLE_OAUTH_ACCESS_TOKEN`,
//! then `gcloud auth print-access-token`.

use crate::models::Config;
use crate::{Error, Result};

pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

pub async fn access_token(config: &Config) -> Result<String> {
    if let Some(token) = config.access_token() {
        return Ok(token.to_string());
    }

    if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
        let token = token.trim().to_string();
        if !token.is_empty() {
            tracing::debug!("Using access token from {}", ACCESS_TOKEN_ENV);
            return Ok(token);
        }
    }

    gcloud_access_token().await
}

async fn gcloud_access_token() -> Result<String> {
    tracing::debug!("Requesting access token from gcloud");

    let output = tokio::process::Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .await
        .map_err(|e| {
            Error::Credentials(format!(
                "unable to run gcloud ({}); set {} or install the Google Cloud CLI",
                e, ACCESS_TOKEN_ENV
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Credentials(format!(
            "gcloud auth print-access-token failed: {}",
            stderr.trim()
        )));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(Error::Credentials(
            "gcloud returned an empty access token".to_string(),
        ));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_config_token_takes_precedence() {
        let config = Config::builder()
            .project_id("p")
            .access_token("from-config")
            .build()
            .unwrap();

        assert_eq!(access_token(&config).await.unwrap(), "from-config");
    }
}
