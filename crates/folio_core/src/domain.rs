//! crates/folio_core/src/domain.rs
//!
//! Defines the pure, core data structures for the reader.
//! The serde attributes pin the camelCase wire format shared by the remote
//! services and the persisted local state.

use bytes::Bytes;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

//=========================================================================================
// Identity
//=========================================================================================

/// The capability flags carried by an identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    #[serde(default)]
    pub is_vip: bool,
    #[serde(default)]
    pub is_author: bool,
}

/// The named capability combinations an identity can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityTier {
    Viewer,
    Vip,
    Author,
    VipAuthor,
}

impl Capabilities {
    pub fn tier(&self) -> CapabilityTier {
        match (self.is_vip, self.is_author) {
            (false, false) => CapabilityTier::Viewer,
            (true, false) => CapabilityTier::Vip,
            (false, true) => CapabilityTier::Author,
            (true, true) => CapabilityTier::VipAuthor,
        }
    }
}

/// A signed-in reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(flatten)]
    pub capabilities: Capabilities,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
}

/// The published pair of identity and its opaque bearer credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: Identity,
    pub token: String,
}

//=========================================================================================
// Catalog
//=========================================================================================

/// A single catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub cover_url: String,
    #[serde(rename = "pdfUrl")]
    pub content_url: String,
    #[serde(rename = "isVip")]
    pub is_premium: bool,
    #[serde(deserialize_with = "published_date")]
    pub published_at: NaiveDate,
    #[serde(rename = "pages", default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_read_page: Option<u32>,
}

impl ContentItem {
    /// The stored position, or `None` if the item has not been started.
    pub fn started_at(&self) -> Option<u32> {
        self.last_read_page.filter(|page| *page > 0)
    }
}

/// Accepts a bare `YYYY-MM-DD` date or a full RFC 3339 timestamp.
fn published_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(&raw).map(|at| at.date_naive()))
        .map_err(|_| serde::de::Error::custom(format!("invalid publishedAt '{raw}'")))
}

/// A binary file attached to a catalog write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }
}

/// The fields of a catalog item that does not exist yet.
#[derive(Debug, Clone)]
pub struct ItemDraft {
    pub title: String,
    pub author: String,
    pub description: String,
    pub is_premium: bool,
    pub total_pages: u32,
    pub cover: Option<Upload>,
    pub content: Option<Upload>,
}

/// A partial update; only `Some` fields are sent.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub is_premium: Option<bool>,
    pub total_pages: Option<u32>,
    pub last_read_page: Option<u32>,
    pub cover: Option<Upload>,
    pub content: Option<Upload>,
}

/// A transient reference that actually opens an item's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessReference(pub String);

impl AccessReference {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
