//! In-memory fakes for the ports, shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Notify;

use crate::domain::{
    AccessReference, Capabilities, ContentItem, Identity, ItemDraft, ItemPatch, Upload,
};
use crate::ports::{
    AuthGrant, CatalogService, IdentityService, LocalStore, PortError, PortResult, ProgressSink,
};

pub fn identity() -> Identity {
    Identity {
        id: "u-1".into(),
        email: "ada@example.com".into(),
        name: "Ada".into(),
        avatar: None,
        capabilities: Capabilities::default(),
        subscription_id: None,
    }
}

pub fn item(id: &str, is_premium: bool) -> ContentItem {
    ContentItem {
        id: id.into(),
        title: format!("Book {id}"),
        author: "Jane Doe".into(),
        description: "A book.".into(),
        cover_url: format!("/covers/{id}.jpg"),
        content_url: format!("/books/{id}.pdf"),
        is_premium,
        published_at: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        total_pages: Some(10),
        last_read_page: None,
    }
}

pub fn draft() -> ItemDraft {
    ItemDraft {
        title: "New Book".into(),
        author: "Jane Doe".into(),
        description: "Fresh.".into(),
        is_premium: true,
        total_pages: 120,
        cover: Some(Upload::new("cover.png", "image/png", &b"png"[..])),
        content: Some(Upload::new("book.pdf", "application/pdf", &b"%PDF-1.7"[..])),
    }
}

//=========================================================================================
// LocalStore
//=========================================================================================

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn value(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.values.lock().unwrap().insert(key.into(), value.into());
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.insert(key, value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}

//=========================================================================================
// IdentityService
//=========================================================================================

pub struct FakeIdentityService {
    failure: Option<PortError>,
}

impl FakeIdentityService {
    pub fn accepting() -> Self {
        Self { failure: None }
    }

    pub fn rejecting() -> Self {
        Self::failing_with(PortError::Unauthorized)
    }

    pub fn failing_with(error: PortError) -> Self {
        Self {
            failure: Some(error),
        }
    }

    fn grant(&self, email: &str) -> PortResult<AuthGrant> {
        if let Some(e) = &self.failure {
            return Err(e.clone());
        }
        let mut user = identity();
        user.email = email.into();
        let local = email.split('@').next().unwrap_or(email);
        Ok(AuthGrant {
            user,
            token: format!("token-{local}"),
        })
    }
}

#[async_trait]
impl IdentityService for FakeIdentityService {
    async fn login(&self, email: &str, _password: &str) -> PortResult<AuthGrant> {
        self.grant(email)
    }

    async fn register(&self, email: &str, _password: &str, _name: &str) -> PortResult<AuthGrant> {
        self.grant(email)
    }

    async fn federated_exchange(&self, _provider_token: &str) -> PortResult<AuthGrant> {
        self.grant("ada@example.com")
    }

    async fn fetch_profile(&self) -> PortResult<Identity> {
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(identity()),
        }
    }
}

//=========================================================================================
// CatalogService
//=========================================================================================

#[derive(Default)]
pub struct FakeCatalogService {
    pub items: Mutex<Vec<ContentItem>>,
    pub fail_reads: bool,
    pub fail_writes: bool,
    pub fail_access: bool,
    pub writes: AtomicUsize,
}

impl FakeCatalogService {
    pub fn with_items(items: Vec<ContentItem>) -> Self {
        Self {
            items: Mutex::new(items),
            ..Self::default()
        }
    }

    fn write_guard(&self) -> PortResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            Err(PortError::Rejected {
                status: 500,
                message: "storage offline".into(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CatalogService for FakeCatalogService {
    async fn list(&self) -> PortResult<Vec<ContentItem>> {
        if self.fail_reads {
            return Err(PortError::Unexpected("connection refused".into()));
        }
        Ok(self.items.lock().unwrap().clone())
    }

    async fn get(&self, id: &str) -> PortResult<ContentItem> {
        self.items
            .lock()
            .unwrap()
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(id.into()))
    }

    async fn create(&self, draft: &ItemDraft) -> PortResult<ContentItem> {
        self.write_guard()?;
        let mut items = self.items.lock().unwrap();
        let id = format!("srv-{}", items.len() + 1);
        let mut created = item(&id, draft.is_premium);
        created.title = draft.title.clone();
        created.author = draft.author.clone();
        created.description = draft.description.clone();
        created.total_pages = Some(draft.total_pages);
        items.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, patch: &ItemPatch) -> PortResult<ContentItem> {
        self.write_guard()?;
        let mut items = self.items.lock().unwrap();
        let stored = items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| PortError::NotFound(id.into()))?;
        if let Some(title) = &patch.title {
            stored.title = title.clone();
        }
        if let Some(is_premium) = patch.is_premium {
            stored.is_premium = is_premium;
        }
        if let Some(page) = patch.last_read_page {
            stored.last_read_page = Some(page);
        }
        Ok(stored.clone())
    }

    async fn delete(&self, id: &str) -> PortResult<()> {
        self.write_guard()?;
        self.items.lock().unwrap().retain(|item| item.id != id);
        Ok(())
    }

    async fn resolve_access_reference(&self, id: &str) -> PortResult<AccessReference> {
        if self.fail_access {
            return Err(PortError::Unexpected("cdn unavailable".into()));
        }
        Ok(AccessReference(format!("https://cdn.example/{id}.pdf")))
    }
}

//=========================================================================================
// ProgressSink
//=========================================================================================

/// Records every call; optionally holds each call open until released.
#[derive(Default)]
pub struct RecordingSink {
    pub calls: Mutex<Vec<(String, u32)>>,
    pub hold: Option<Arc<Notify>>,
    pub fail: bool,
    pub completed: AtomicUsize,
}

impl RecordingSink {
    pub fn pages(&self) -> Vec<u32> {
        self.calls.lock().unwrap().iter().map(|(_, page)| *page).collect()
    }
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn record_progress(&self, item_id: &str, page: u32) -> PortResult<()> {
        self.calls.lock().unwrap().push((item_id.into(), page));
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(PortError::Unexpected("sync endpoint down".into()))
        } else {
            Ok(())
        }
    }
}
