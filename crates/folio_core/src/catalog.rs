//! crates/folio_core/src/catalog.rs
//!
//! The content catalog store: the one shared item list of the running process.
//!
//! Reads fall back to a builtin seed when the catalog service is unreachable.
//! Writes are confirm-then-apply: the local list only changes after the
//! service returns the canonical item.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::domain::{AccessReference, ContentItem, ItemDraft, ItemPatch};
use crate::gate;
use crate::ports::{CatalogService, PortError, PortResult};
use crate::session::SessionContext;
use crate::validation::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Only authors may publish items")]
    NotAuthor,
    #[error("Invalid item: {0}")]
    Validation(#[from] ValidationError),
    #[error("Catalog service error: {0}")]
    Port(#[from] PortError),
}

/// Which part of the catalog a listing shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CatalogFilter {
    #[default]
    All,
    Free,
    Premium,
}

impl CatalogFilter {
    fn admits(self, item: &ContentItem) -> bool {
        match self {
            CatalogFilter::All => true,
            CatalogFilter::Free => !item.is_premium,
            CatalogFilter::Premium => item.is_premium,
        }
    }
}

/// Items a reader has started, derived from their stored positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadingHistory {
    pub items: Vec<ContentItem>,
    pub books_started: usize,
    /// Sum of the last read page across started items.
    pub pages_read: u64,
}

pub struct CatalogStore {
    service: Arc<dyn CatalogService>,
    context: SessionContext,
    items: watch::Sender<Vec<ContentItem>>,
}

impl CatalogStore {
    pub fn new(service: Arc<dyn CatalogService>, context: SessionContext) -> Self {
        let (items, _) = watch::channel(Vec::new());
        Self {
            service,
            context,
            items,
        }
    }

    /// Observes every change to the item list.
    pub fn subscribe(&self) -> watch::Receiver<Vec<ContentItem>> {
        self.items.subscribe()
    }

    /// Replaces the list with the service's catalog, or with the builtin seed
    /// if the service cannot be reached.
    pub async fn load(&self) {
        match self.service.list().await {
            Ok(items) => {
                info!("Loaded {} catalog items.", items.len());
                self.items.send_replace(items);
            }
            Err(e) => {
                error!("Failed to fetch catalog, using builtin seed: {e}");
                self.items.send_replace(seed_catalog());
            }
        }
    }

    /// Publishes a new item on behalf of the signed-in author.
    pub async fn create(&self, draft: ItemDraft) -> Result<ContentItem, CatalogError> {
        if !gate::can_publish(self.context.identity().as_ref()) {
            warn!("Rejected a publish attempt from a non-author.");
            return Err(CatalogError::NotAuthor);
        }
        draft.validate()?;
        let created = self.service.create(&draft).await.map_err(|e| {
            error!("Failed to add item: {e}");
            e
        })?;
        self.items.send_modify(|items| items.push(created.clone()));
        Ok(created)
    }

    pub async fn update(&self, id: &str, patch: ItemPatch) -> Result<ContentItem, CatalogError> {
        let updated = self.service.update(id, &patch).await.map_err(|e| {
            error!("Failed to update item {id}: {e}");
            e
        })?;
        self.items.send_modify(|items| {
            for item in items.iter_mut().filter(|item| item.id == id) {
                *item = updated.clone();
            }
        });
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<(), CatalogError> {
        self.service.delete(id).await.map_err(|e| {
            error!("Failed to delete item {id}: {e}");
            e
        })?;
        self.items.send_modify(|items| items.retain(|item| item.id != id));
        Ok(())
    }

    pub fn items(&self) -> Vec<ContentItem> {
        self.items.borrow().clone()
    }

    pub fn get_by_id(&self, id: &str) -> Option<ContentItem> {
        self.items.borrow().iter().find(|item| item.id == id).cloned()
    }

    pub fn free_subset(&self) -> Vec<ContentItem> {
        self.filtered(CatalogFilter::Free)
    }

    pub fn vip_subset(&self) -> Vec<ContentItem> {
        self.filtered(CatalogFilter::Premium)
    }

    /// Every started item, with the totals a profile view shows.
    pub fn reading_history(&self) -> ReadingHistory {
        let items: Vec<ContentItem> = self
            .items
            .borrow()
            .iter()
            .filter(|item| item.started_at().is_some())
            .cloned()
            .collect();
        let pages_read = items
            .iter()
            .filter_map(ContentItem::started_at)
            .map(u64::from)
            .sum();
        ReadingHistory {
            books_started: items.len(),
            pages_read,
            items,
        }
    }

    /// Case-insensitive match on title, author or description within `filter`.
    pub fn search(&self, term: &str, filter: CatalogFilter) -> Vec<ContentItem> {
        let needle = term.to_lowercase();
        self.items
            .borrow()
            .iter()
            .filter(|item| filter.admits(item))
            .filter(|item| {
                needle.is_empty()
                    || [&item.title, &item.author, &item.description]
                        .iter()
                        .any(|field| field.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }

    pub async fn resolve_access_reference(&self, id: &str) -> PortResult<AccessReference> {
        self.service.resolve_access_reference(id).await
    }

    /// Writes the reading position locally, ahead of any remote sync.
    pub(crate) fn record_local_progress(&self, id: &str, page: u32) -> bool {
        let found = self.items.send_if_modified(|items| {
            match items.iter_mut().find(|item| item.id == id) {
                Some(item) => {
                    item.last_read_page = Some(page);
                    true
                }
                None => false,
            }
        });
        if !found {
            warn!("Reading progress for unknown item {id} was not stored locally.");
        }
        found
    }

    fn filtered(&self, filter: CatalogFilter) -> Vec<ContentItem> {
        self.items
            .borrow()
            .iter()
            .filter(|item| filter.admits(item))
            .cloned()
            .collect()
    }
}

//=========================================================================================
// Builtin seed
//=========================================================================================

#[allow(clippy::too_many_arguments)]
fn seed_item(
    id: &str,
    title: &str,
    author: &str,
    description: &str,
    cover_url: &str,
    is_premium: bool,
    published_at: (i32, u32, u32),
    pages: u32,
) -> ContentItem {
    let (year, month, day) = published_at;
    ContentItem {
        id: id.to_string(),
        title: title.to_string(),
        author: author.to_string(),
        description: description.to_string(),
        cover_url: cover_url.to_string(),
        content_url: "/sample.pdf".to_string(),
        is_premium,
        published_at: NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default(),
        total_pages: Some(pages),
        last_read_page: Some(0),
    }
}

/// The four items shown when the catalog service is unavailable.
pub fn seed_catalog() -> Vec<ContentItem> {
    vec![
        seed_item(
            "1",
            "The Digital Revolution",
            "Sarah Johnson",
            "An exploration of how technology has transformed society and what the future holds for humanity in the digital age.",
            "https://images.pexels.com/photos/159866/books-book-pages-read-literature-159866.jpeg?auto=compress&cs=tinysrgb&w=400&h=600&fit=crop",
            false,
            (2024, 1, 15),
            280,
        ),
        seed_item(
            "2",
            "Mysteries of the Cosmos",
            "Dr. Michael Chen",
            "Journey through space and time to discover the most profound mysteries of our universe, from black holes to quantum mechanics.",
            "https://images.pexels.com/photos/1290141/pexels-photo-1290141.jpeg?auto=compress&cs=tinysrgb&w=400&h=600&fit=crop",
            true,
            (2024, 2, 20),
            340,
        ),
        seed_item(
            "3",
            "The Art of Mindfulness",
            "Emma Williams",
            "Discover ancient wisdom and modern techniques for achieving inner peace and mental clarity in our chaotic world.",
            "https://images.pexels.com/photos/1556691/pexels-photo-1556691.jpeg?auto=compress&cs=tinysrgb&w=400&h=600&fit=crop",
            false,
            (2024, 3, 10),
            220,
        ),
        seed_item(
            "4",
            "Advanced Machine Learning",
            "Prof. David Kumar",
            "Deep dive into cutting-edge ML algorithms, neural networks, and AI applications that are reshaping industries.",
            "https://images.pexels.com/photos/8386440/pexels-photo-8386440.jpeg?auto=compress&cs=tinysrgb&w=400&h=600&fit=crop",
            true,
            (2024, 3, 25),
            450,
        ),
    ]
}
