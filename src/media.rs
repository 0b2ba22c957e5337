// ABOUTME: Resolves media references to bytes through the rate-limited client
// ABOUTME: Content-type and emptiness checks, extension derivation, placeholder fallback

use crate::api::GraphClient;
use crate::model::{MediaReference, MediaStatus};
use crate::{Error, Result};
use tracing::warn;

pub struct FetchedMedia {
    pub bytes: Vec<u8>,
    pub extension: String,
}

/// A media reference after resolution. `data` is `Some` exactly when the
/// status is `Fetched`.
pub struct ResolvedMedia {
    pub reference: MediaReference,
    pub data: Option<FetchedMedia>,
}

impl ResolvedMedia {
    pub fn fetched(mut reference: MediaReference, data: FetchedMedia) -> Self {
        reference.status = MediaStatus::Fetched;
        ResolvedMedia {
            reference,
            data: Some(data),
        }
    }

    pub fn placeholder(mut reference: MediaReference) -> Self {
        reference.status = MediaStatus::Placeholder;
        ResolvedMedia {
            reference,
            data: None,
        }
    }
}

/// Fetch one referenced image. Failures come back as `Error::MediaFetch`
/// for the caller to degrade to a placeholder, except fatal
/// credential/permission errors, which pass through untouched so the run
/// can abort.
pub fn fetch(client: &GraphClient, reference: &MediaReference) -> Result<FetchedMedia> {
    let resource = reference
        .resource_id
        .clone()
        .unwrap_or_else(|| reference.source_url.clone());

    if reference.source_url.is_empty() {
        return Err(Error::MediaFetch {
            resource,
            reason: "no source URL".into(),
        });
    }

    let (bytes, content_type) = match client.get_bytes(&reference.source_url) {
        Ok(ok) => ok,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!(resource = %resource, error = %e, "media fetch failed");
            return Err(Error::MediaFetch {
                resource,
                reason: e.to_string(),
            });
        }
    };

    let content_type = content_type.unwrap_or_default();
    if !content_type.starts_with("image/") {
        return Err(Error::MediaFetch {
            resource,
            reason: format!("unexpected content type: {:?}", content_type),
        });
    }

    if bytes.is_empty() {
        return Err(Error::MediaFetch {
            resource,
            reason: "empty body".into(),
        });
    }

    let extension = extension_for(&content_type, &reference.source_url);
    Ok(FetchedMedia { bytes, extension })
}

/// Derive a file extension from the content-type subtype, falling back to
/// the URL path, then `bin`.
fn extension_for(content_type: &str, url: &str) -> String {
    let subtype = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .split('/')
        .nth(1)
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match subtype.as_str() {
        "jpeg" => "jpg".into(),
        "svg+xml" => "svg".into(),
        "" => url_extension(url).unwrap_or_else(|| "bin".into()),
        other => other.to_string(),
    }
}

fn url_extension(url: &str) -> Option<String> {
    let path = url.split(|c| c == '?' || c == '#').next()?;
    let name = path.rsplit('/').next()?;
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 5 {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
