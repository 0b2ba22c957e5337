// ABOUTME: Serde data models for Graph notebook hierarchy responses
// ABOUTME: Tolerant parsing with optional fields and odata pagination cursors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One page of a `value`-wrapped list response, with the optional cursor to
/// the next page.
#[derive(Debug, Clone, Deserialize)]
pub struct ListPage<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notebook {
    pub id: String,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
}

impl Notebook {
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or("Untitled")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
}

impl Section {
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or("Untitled")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "contentUrl", default)]
    pub content_url: Option<String>,
    #[serde(rename = "createdDateTime", default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(rename = "lastModifiedDateTime", default)]
    pub last_modified: Option<DateTime<Utc>>,
}

impl Page {
    pub fn name(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled")
    }
}

/// An image occurrence found in page markup, in emission order. The body
/// carries a `{{IMG:index}}` token where the final relative path goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaReference {
    pub index: usize,
    pub source_url: String,
    pub resource_id: Option<String>,
    pub alt: String,
    pub status: MediaStatus,
}

impl MediaReference {
    pub fn token(&self) -> String {
        format!("{{{{IMG:{}}}}}", self.index)
    }

    /// The Markdown image tag as the transformer emitted it.
    pub fn tag(&self) -> String {
        format!("![{}]({})", self.alt, self.token())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaStatus {
    Pending,
    Fetched,
    Placeholder,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notebook_deserialize_minimal() {
        let json = r#"{"id": "nb-1"}"#;
        let nb: Notebook = serde_json::from_str(json).unwrap();
        assert_eq!(nb.id, "nb-1");
        assert_eq!(nb.name(), "Untitled");
    }

    #[test]
    fn test_notebook_deserialize_full() {
        let json = r#"{
            "id": "nb-1",
            "displayName": "Work Notes",
            "createdDateTime": "2025-10-28T15:04:05Z",
            "extra_field": "ignored"
        }"#;
        let nb: Notebook = serde_json::from_str(json).unwrap();
        assert_eq!(nb.name(), "Work Notes");
    }

    #[test]
    fn test_page_deserialize() {
        let json = r#"{
            "id": "p-1",
            "title": "Meeting Agenda",
            "contentUrl": "https://graph.example/v1.0/me/onenote/pages/p-1/content",
            "createdDateTime": "2025-10-28T15:04:05Z",
            "lastModifiedDateTime": "2025-10-29T01:23:45Z"
        }"#;
        let page: Page = serde_json::from_str(json).unwrap();
        assert_eq!(page.name(), "Meeting Agenda");
        assert!(page.content_url.is_some());
        assert!(page.last_modified.is_some());
    }

    #[test]
    fn test_page_deserialize_untitled() {
        let json = r#"{"id": "p-2"}"#;
        let page: Page = serde_json::from_str(json).unwrap();
        assert_eq!(page.name(), "Untitled");
        assert!(page.content_url.is_none());
    }
}
