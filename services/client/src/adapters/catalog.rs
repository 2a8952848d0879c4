//! services/client/src/adapters/catalog.rs
//!
//! Implements the `CatalogService` port against the backend's `/books` endpoints.
//! Creates and updates are sent as multipart forms so covers and PDFs travel
//! with the metadata.

use async_trait::async_trait;
use folio_core::ports::{CatalogService, PortError, PortResult};
use folio_core::{AccessReference, ContentItem, ItemDraft, ItemPatch, Upload};
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::Deserialize;

use super::http::ApiClient;

/// Response of `GET /books/{id}/pdf`.
#[derive(Deserialize)]
struct PdfLocation {
    #[serde(rename = "pdfUrl")]
    pdf_url: String,
}

#[derive(Clone)]
pub struct HttpCatalogService {
    client: ApiClient,
}

impl HttpCatalogService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

fn file_part(upload: &Upload) -> PortResult<Part> {
    Part::bytes(upload.data.to_vec())
        .file_name(upload.file_name.clone())
        .mime_str(&upload.mime_type)
        .map_err(|e| PortError::Invalid(format!("Bad mime type '{}': {e}", upload.mime_type)))
}

fn draft_form(draft: &ItemDraft) -> PortResult<Form> {
    let mut form = Form::new()
        .text("title", draft.title.clone())
        .text("author", draft.author.clone())
        .text("description", draft.description.clone())
        .text("isVip", draft.is_premium.to_string())
        .text("pages", draft.total_pages.to_string());
    if let Some(cover) = &draft.cover {
        form = form.part("cover", file_part(cover)?);
    }
    if let Some(content) = &draft.content {
        form = form.part("pdf", file_part(content)?);
    }
    Ok(form)
}

fn patch_form(patch: &ItemPatch) -> PortResult<Form> {
    let mut form = Form::new();
    if let Some(title) = &patch.title {
        form = form.text("title", title.clone());
    }
    if let Some(author) = &patch.author {
        form = form.text("author", author.clone());
    }
    if let Some(description) = &patch.description {
        form = form.text("description", description.clone());
    }
    if let Some(is_premium) = patch.is_premium {
        form = form.text("isVip", is_premium.to_string());
    }
    if let Some(pages) = patch.total_pages {
        form = form.text("pages", pages.to_string());
    }
    if let Some(page) = patch.last_read_page {
        form = form.text("lastReadPage", page.to_string());
    }
    if let Some(cover) = &patch.cover {
        form = form.part("cover", file_part(cover)?);
    }
    if let Some(content) = &patch.content {
        form = form.part("pdf", file_part(content)?);
    }
    Ok(form)
}

#[async_trait]
impl CatalogService for HttpCatalogService {
    async fn list(&self) -> PortResult<Vec<ContentItem>> {
        let request = self.client.request(Method::GET, "/books");
        self.client.send_json(request).await
    }

    async fn get(&self, id: &str) -> PortResult<ContentItem> {
        let request = self.client.request(Method::GET, &format!("/books/{id}"));
        self.client.send_json(request).await
    }

    async fn create(&self, draft: &ItemDraft) -> PortResult<ContentItem> {
        let form = draft_form(draft)?;
        let request = self
            .client
            .request(Method::POST, "/books")
            .map(|r| r.multipart(form));
        self.client.send_json(request).await
    }

    async fn update(&self, id: &str, patch: &ItemPatch) -> PortResult<ContentItem> {
        let form = patch_form(patch)?;
        let request = self
            .client
            .request(Method::PUT, &format!("/books/{id}"))
            .map(|r| r.multipart(form));
        self.client.send_json(request).await
    }

    async fn delete(&self, id: &str) -> PortResult<()> {
        let request = self.client.request(Method::DELETE, &format!("/books/{id}"));
        self.client.send(request).await?;
        Ok(())
    }

    async fn resolve_access_reference(&self, id: &str) -> PortResult<AccessReference> {
        let request = self.client.request(Method::GET, &format!("/books/{id}/pdf"));
        let location: PdfLocation = self.client.send_json(request).await?;
        Ok(AccessReference(location.pdf_url))
    }
}
