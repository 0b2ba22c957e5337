// ABOUTME: Lazy cursor iterator over value-wrapped list endpoints
// ABOUTME: Follows @odata.nextLink until no cursor remains, then fuses

use crate::api::GraphClient;
use crate::model::ListPage;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Lazy walk over one list endpoint. Buffers a single response page and
/// follows the cursor on demand, so a large listing never has to live in
/// memory at once. A failed page request yields exactly one
/// `Error::Pagination` carrying the number of items already yielded, then
/// the iterator fuses.
pub struct Paged<'a, T> {
    client: &'a GraphClient,
    endpoint: String,
    next: Option<String>,
    buffer: std::vec::IntoIter<T>,
    yielded: usize,
    done: bool,
}

impl<'a, T> Paged<'a, T> {
    pub fn new(client: &'a GraphClient, endpoint: &str) -> Self {
        Paged {
            client,
            endpoint: endpoint.to_string(),
            next: Some(endpoint.to_string()),
            buffer: Vec::new().into_iter(),
            yielded: 0,
            done: false,
        }
    }
}

impl<'a, T: DeserializeOwned> Iterator for Paged<'a, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.next() {
                self.yielded += 1;
                return Some(Ok(item));
            }

            if self.done {
                return None;
            }

            let url = match self.next.take() {
                Some(url) => url,
                None => {
                    self.done = true;
                    return None;
                }
            };

            match self.client.get_json::<ListPage<T>>(&url) {
                Ok(page) => {
                    debug!(
                        endpoint = %self.endpoint,
                        items = page.value.len(),
                        has_cursor = page.next_link.is_some(),
                        "fetched listing page"
                    );
                    self.next = page.next_link;
                    self.buffer = page.value.into_iter();
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(Error::Pagination {
                        endpoint: self.endpoint.clone(),
                        yielded: self.yielded,
                        source: Box::new(e),
                    }));
                }
            }
        }
    }
}
