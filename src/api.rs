// ABOUTME: Blocking HTTP client for the Graph notebook API
// ABOUTME: Owns the retry/backoff loop; all outbound traffic funnels through here

use crate::auth::CredentialProvider;
use crate::backoff::{self, MAX_RETRIES};
use crate::model::{Notebook, Page, Section};
use crate::paginate::Paged;
use crate::{Error, Result};
use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_API_BASE: &str = "https://graph.microsoft.com/v1.0";

fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.len() <= max_chars {
        return s.to_string();
    }

    // Find a valid UTF-8 boundary at or before max_chars
    let mut boundary = max_chars;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }

    if boundary == 0 {
        return String::new();
    }

    format!("{}...", &s[..boundary])
}

pub struct GraphClient {
    client: Client,
    base_url: String,
    credentials: Box<dyn CredentialProvider>,
    max_retries: u32,
}

impl GraphClient {
    pub fn new(credentials: Box<dyn CredentialProvider>, base_url: Option<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(GraphClient {
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_API_BASE.into()),
            credentials,
            max_retries: MAX_RETRIES,
        })
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Cursor URLs and `contentUrl` values arrive absolute; endpoint paths
    /// are joined onto the configured base.
    fn resolve_url(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            path_or_url.to_string()
        } else {
            format!("{}{}", self.base_url, path_or_url)
        }
    }

    /// Issue a GET with retries. 429 and 5xx back off (honoring a
    /// `Retry-After` hint) up to the retry ceiling; transport errors are
    /// retried the same way; any other 4xx surfaces immediately. A 401
    /// triggers one credential refresh before it is treated as fatal.
    fn execute(&self, url: &str, accept: &str) -> Result<Response> {
        let mut attempt: u32 = 0;
        let mut refreshed = false;

        loop {
            let token = self.credentials.bearer_token()?;
            let result = self
                .client
                .get(url)
                .header("Authorization", format!("Bearer {}", token))
                .header("Accept", accept)
                .header("User-Agent", "onedown/0.1 (Rust)")
                .send();

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(Error::Network(e));
                    }
                    let delay = backoff::retry_delay(attempt);
                    warn!(url, attempt, error = %e, "request failed, retrying in {:?}", delay);
                    std::thread::sleep(delay);
                    attempt += 1;
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                if attempt >= self.max_retries {
                    return Err(Error::Throttled {
                        url: url.to_string(),
                        attempts: attempt + 1,
                    });
                }
                let hint = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(backoff::parse_retry_after);
                let delay = hint.unwrap_or_else(|| backoff::retry_delay(attempt));
                warn!(url, attempt, status = status.as_u16(), "throttled, retrying in {:?}", delay);
                std::thread::sleep(delay);
                attempt += 1;
                continue;
            }

            if status == StatusCode::UNAUTHORIZED && !refreshed {
                debug!(url, "401 received, attempting credential refresh");
                if self.credentials.refresh().is_ok() {
                    refreshed = true;
                    continue;
                }
            }

            let message = response.text().unwrap_or_default();
            return Err(Error::Http {
                url: url.to_string(),
                status: status.as_u16(),
                message: truncate_str(&message, 100),
            });
        }
    }

    pub fn get_json<T: serde::de::DeserializeOwned>(&self, path_or_url: &str) -> Result<T> {
        let url = self.resolve_url(path_or_url);
        let response = self.execute(&url, "application/json")?;
        let body = response.text()?;
        serde_json::from_str(&body).map_err(|e| {
            warn!(url, error = %e, "failed to parse response body");
            Error::Parse(e)
        })
    }

    pub fn get_text(&self, path_or_url: &str, accept: &str) -> Result<String> {
        let url = self.resolve_url(path_or_url);
        let response = self.execute(&url, accept)?;
        Ok(response.text()?)
    }

    /// Raw body plus the response content type.
    pub fn get_bytes(&self, path_or_url: &str) -> Result<(Vec<u8>, Option<String>)> {
        let url = self.resolve_url(path_or_url);
        let response = self.execute(&url, "*/*")?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let bytes = response.bytes()?;
        Ok((bytes.to_vec(), content_type))
    }

    pub fn notebooks(&self) -> Paged<'_, Notebook> {
        Paged::new(self, "/me/onenote/notebooks")
    }

    pub fn sections(&self, notebook_id: &str) -> Paged<'_, Section> {
        Paged::new(self, &format!("/me/onenote/notebooks/{}/sections", notebook_id))
    }

    pub fn pages(&self, section_id: &str) -> Paged<'_, Page> {
        Paged::new(self, &format!("/me/onenote/sections/{}/pages", section_id))
    }

    /// Fetch a page's XHTML body, via its `contentUrl` when present.
    pub fn page_content(&self, page: &Page) -> Result<String> {
        let url = match &page.content_url {
            Some(url) => url.clone(),
            None => format!("/me/onenote/pages/{}/content", page.id),
        };
        self.get_text(&url, "text/html")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;

    fn client(base: &str) -> GraphClient {
        GraphClient::new(Box::new(StaticToken::new("token".into())), Some(base.into())).unwrap()
    }

    #[test]
    fn test_truncate_str_short() {
        assert_eq!(truncate_str("hello", 100), "hello");
    }

    #[test]
    fn test_truncate_str_long() {
        let result = truncate_str("hello world", 7);
        assert!(result.starts_with("hello"));
        assert!(result.ends_with("..."));
    }

    #[test]
    fn test_truncate_str_utf8() {
        // Multi-byte UTF-8 must not panic at a split boundary
        let text = "Hello 世界 World";
        let result = truncate_str(text, 10);
        assert!(!result.is_empty());
    }

    #[test]
    fn test_client_default_base() {
        let client =
            GraphClient::new(Box::new(StaticToken::new("t".into())), None).unwrap();
        assert_eq!(client.base_url(), DEFAULT_API_BASE);
    }

    #[test]
    fn test_resolve_url_joins_relative_paths() {
        let client = client("https://mock.test/v1.0");
        assert_eq!(
            client.resolve_url("/me/onenote/notebooks"),
            "https://mock.test/v1.0/me/onenote/notebooks"
        );
    }

    #[test]
    fn test_resolve_url_passes_absolute_through() {
        let client = client("https://mock.test/v1.0");
        let cursor = "https://other.test/v1.0/me/onenote/notebooks?$skip=20";
        assert_eq!(client.resolve_url(cursor), cursor);
    }
}
