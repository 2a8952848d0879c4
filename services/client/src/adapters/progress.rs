//! services/client/src/adapters/progress.rs
//!
//! Implements the `ProgressSink` port: `POST /user/reading-progress`.

use async_trait::async_trait;
use folio_core::ports::{PortResult, ProgressSink};
use reqwest::Method;
use serde::Serialize;

use super::http::ApiClient;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgressUpdate<'a> {
    book_id: &'a str,
    page: u32,
}

#[derive(Clone)]
pub struct HttpProgressSink {
    client: ApiClient,
}

impl HttpProgressSink {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProgressSink for HttpProgressSink {
    async fn record_progress(&self, item_id: &str, page: u32) -> PortResult<()> {
        let request = self
            .client
            .request(Method::POST, "/user/reading-progress")
            .map(|r| r.json(&ProgressUpdate { book_id: item_id, page }));
        self.client.send(request).await?;
        Ok(())
    }
}
