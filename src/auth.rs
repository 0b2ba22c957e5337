// ABOUTME: Bearer token discovery with precedence chain
// ABOUTME: CLI flag → XDG session file → env var, plus the credential seam

use crate::{Error, Result};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Narrow seam between the exporter and whatever performs the actual sign-in
/// flow. The client asks for a token once per request and calls `refresh`
/// at most once when the service rejects a token with 401.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Result<String>;

    fn refresh(&self) -> Result<()> {
        Err(Error::Auth(
            "bearer token expired and cannot be refreshed".into(),
        ))
    }
}

/// Provider for a token resolved up front; cannot refresh.
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: String) -> Self {
        StaticToken { token }
    }
}

impl CredentialProvider for StaticToken {
    fn bearer_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

pub fn resolve_token(cli_token: Option<String>, client_id: Option<&str>) -> Result<String> {
    // 1. CLI flag
    if let Some(token) = cli_token {
        return Ok(token);
    }

    // 2. XDG session file
    if let Some(token) = try_xdg_session()? {
        return Ok(token);
    }

    // 3. Environment variable
    if let Ok(token) = env::var("ONEDOWN_TOKEN") {
        return Ok(token);
    }

    let hint = match client_id {
        Some(id) => format!(" (sign in for application {} and store the session)", id),
        None => String::new(),
    };
    Err(Error::Auth(format!(
        "No bearer token found. Provide via --token, session file, or ONEDOWN_TOKEN env var{}",
        hint
    )))
}

fn try_xdg_session() -> Result<Option<String>> {
    let config_home = env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = env::var("HOME").unwrap_or_default();
        format!("{}/.config", home)
    });

    let path = PathBuf::from(config_home).join("onedown/session.json");
    parse_session_file(&path)
}

fn parse_session_file(path: &PathBuf) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)?;
    let json: serde_json::Value = serde_json::from_str(&content)?;

    if let Some(access_token) = json.get("access_token").and_then(|v| v.as_str()) {
        return Ok(Some(access_token.to_string()));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_token_cli_precedence() {
        let token = resolve_token(Some("cli_token".into()), None).unwrap();
        assert_eq!(token, "cli_token");
    }

    #[test]
    fn test_resolve_token_missing_mentions_client_id() {
        let temp = TempDir::new().unwrap();
        env::set_var("XDG_CONFIG_HOME", temp.path());
        env::remove_var("ONEDOWN_TOKEN");

        let err = resolve_token(None, Some("app-1234")).unwrap_err();
        assert!(err.to_string().contains("app-1234"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_parse_session_file_valid() {
        let temp = TempDir::new().unwrap();
        let session_path = temp.path().join("session.json");

        let content = r#"{"access_token": "test_token_123", "expires_at": "2026-01-01T00:00:00Z"}"#;
        fs::write(&session_path, content).unwrap();

        let token = parse_session_file(&session_path).unwrap();
        assert_eq!(token, Some("test_token_123".into()));
    }

    #[test]
    fn test_parse_session_file_missing() {
        let temp = TempDir::new().unwrap();
        let session_path = temp.path().join("missing.json");

        let token = parse_session_file(&session_path).unwrap();
        assert!(token.is_none());
    }

    #[test]
    fn test_parse_session_file_without_token_key() {
        let temp = TempDir::new().unwrap();
        let session_path = temp.path().join("session.json");
        fs::write(&session_path, r#"{"refresh_token": "only"}"#).unwrap();

        let token = parse_session_file(&session_path).unwrap();
        assert!(token.is_none());
    }
}

#[cfg(test)]
mod provider_tests {
    use super::*;

    #[test]
    fn test_static_token_returns_token() {
        let provider = StaticToken::new("abc".into());
        assert_eq!(provider.bearer_token().unwrap(), "abc");
    }

    #[test]
    fn test_static_token_refresh_is_fatal() {
        let provider = StaticToken::new("abc".into());
        let err = provider.refresh().unwrap_err();
        assert!(err.is_fatal());
    }
}
