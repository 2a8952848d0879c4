//! crates/folio_core/src/reader.rs
//!
//! The reading session controller.
//!
//! Opening an item runs `Loading -> Ready | Denied | Error`. A `Ready` session owns
//! the page, zoom and fullscreen state, the idle-chrome timer, and writes every
//! page change through to the catalog store and the remote progress sink.
//!
//! Timers and progress sync are spawned on the current tokio runtime, so a
//! `ReadingSession` must be driven from inside one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::catalog::CatalogStore;
use crate::domain::{AccessReference, ContentItem};
use crate::gate::{self, Access};
use crate::ports::{PortError, ProgressSink};
use crate::session::SessionContext;

/// Page count assumed when neither the document nor the catalog knows it.
pub const DEFAULT_TOTAL_PAGES: u32 = 100;

pub const MIN_ZOOM: u16 = 50;
pub const MAX_ZOOM: u16 = 200;
pub const ZOOM_STEP: u16 = 25;
pub const DEFAULT_ZOOM: u16 = 100;

pub const IDLE_CHROME_TIMEOUT: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone)]
pub struct ReaderSettings {
    /// How long fullscreen controls stay visible without pointer activity.
    pub idle_timeout: Duration,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            idle_timeout: IDLE_CHROME_TIMEOUT,
        }
    }
}

/// Why a reading session was not admitted; tells the caller where to route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    RequiresLogin,
    RequiresUpgrade,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReaderError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Failed to load content for {item_id}: {source}")]
    ContentUnavailable { item_id: String, source: PortError },
}

/// The state of one attempt to open an item.
///
/// A view holds `Loading` until `ReadingController::open` resolves; the
/// other three states are terminal for the attempt.
#[derive(Debug, Default)]
pub enum ReaderState {
    #[default]
    Loading,
    Ready(ReadingSession),
    Denied(Denial),
    Error(ReaderError),
}

impl ReaderState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ReaderState::Ready(_))
    }

    pub fn session_mut(&mut self) -> Option<&mut ReadingSession> {
        match self {
            ReaderState::Ready(session) => Some(session),
            _ => None,
        }
    }
}

//=========================================================================================
// ReadingController
//=========================================================================================

pub struct ReadingController {
    context: SessionContext,
    catalog: Arc<CatalogStore>,
    progress: Arc<dyn ProgressSink>,
    settings: ReaderSettings,
}

impl ReadingController {
    pub fn new(
        context: SessionContext,
        catalog: Arc<CatalogStore>,
        progress: Arc<dyn ProgressSink>,
        settings: ReaderSettings,
    ) -> Self {
        Self {
            context,
            catalog,
            progress,
            settings,
        }
    }

    /// Runs admission for `item_id` and, if admitted, resolves its content.
    pub async fn open(&self, item_id: &str) -> ReaderState {
        let Some(item) = self.catalog.get_by_id(item_id) else {
            warn!("Cannot open unknown item {item_id}.");
            return ReaderState::Error(ReaderError::NotFound(item_id.to_string()));
        };

        let identity = self.context.identity();
        match gate::read_admission(identity.as_ref(), &item) {
            Access::Granted => {}
            Access::RequiresLogin => {
                info!("Opening {item_id} requires a signed-in reader.");
                return ReaderState::Denied(Denial::RequiresLogin);
            }
            Access::RequiresUpgrade => {
                info!("Opening {item_id} requires a VIP upgrade.");
                return ReaderState::Denied(Denial::RequiresUpgrade);
            }
        }

        match self.catalog.resolve_access_reference(&item.id).await {
            Ok(access) => {
                let session = ReadingSession::new(
                    item,
                    access,
                    Arc::clone(&self.catalog),
                    Arc::clone(&self.progress),
                    self.settings.idle_timeout,
                );
                info!(
                    "Opened {} at page {} of {}",
                    item_id,
                    session.current_page(),
                    session.total_pages()
                );
                ReaderState::Ready(session)
            }
            Err(e) => {
                error!("Failed to load content for {item_id}: {e}");
                ReaderState::Error(ReaderError::ContentUnavailable {
                    item_id: item_id.to_string(),
                    source: e,
                })
            }
        }
    }
}

//=========================================================================================
// ReadingSession
//=========================================================================================

/// A point-in-time copy of everything a reader view renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewState {
    pub current_page: u32,
    pub total_pages: u32,
    pub zoom_level: u16,
    pub is_fullscreen: bool,
    pub controls_visible: bool,
}

/// Fullscreen chrome, shared with the idle timer task.
#[derive(Debug)]
struct Chrome {
    is_fullscreen: bool,
    controls_visible: bool,
    /// Bumped on every arm so a stale timer cannot hide freshly shown controls.
    epoch: u64,
}

/// Cancels its timer task when dropped.
#[derive(Debug)]
struct IdleTimer {
    token: CancellationToken,
}

impl Drop for IdleTimer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

pub struct ReadingSession {
    item: ContentItem,
    access: AccessReference,
    current_page: u32,
    total_pages: u32,
    zoom_level: u16,
    chrome: Arc<Mutex<Chrome>>,
    idle_timer: Option<IdleTimer>,
    idle_timeout: Duration,
    catalog: Arc<CatalogStore>,
    progress: Arc<dyn ProgressSink>,
}

impl std::fmt::Debug for ReadingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadingSession")
            .field("item_id", &self.item.id)
            .field("view", &self.view())
            .finish_non_exhaustive()
    }
}

fn lock(chrome: &Mutex<Chrome>) -> MutexGuard<'_, Chrome> {
    chrome.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ReadingSession {
    fn new(
        item: ContentItem,
        access: AccessReference,
        catalog: Arc<CatalogStore>,
        progress: Arc<dyn ProgressSink>,
        idle_timeout: Duration,
    ) -> Self {
        let total_pages = item
            .total_pages
            .filter(|pages| *pages > 0)
            .unwrap_or(DEFAULT_TOTAL_PAGES);
        let current_page = item
            .started_at()
            .map_or(1, |page| page.clamp(1, total_pages));
        Self {
            item,
            access,
            current_page,
            total_pages,
            zoom_level: DEFAULT_ZOOM,
            chrome: Arc::new(Mutex::new(Chrome {
                is_fullscreen: false,
                controls_visible: true,
                epoch: 0,
            })),
            idle_timer: None,
            idle_timeout,
            catalog,
            progress,
        }
    }

    /// The item as it was when the session opened. Its `last_read_page` is not
    /// updated by page turns; read the catalog for the current position.
    pub fn item(&self) -> &ContentItem {
        &self.item
    }

    pub fn access_reference(&self) -> &AccessReference {
        &self.access
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn zoom_level(&self) -> u16 {
        self.zoom_level
    }

    pub fn is_fullscreen(&self) -> bool {
        lock(&self.chrome).is_fullscreen
    }

    pub fn controls_visible(&self) -> bool {
        lock(&self.chrome).controls_visible
    }

    pub fn view(&self) -> ViewState {
        let chrome = lock(&self.chrome);
        ViewState {
            current_page: self.current_page,
            total_pages: self.total_pages,
            zoom_level: self.zoom_level,
            is_fullscreen: chrome.is_fullscreen,
            controls_visible: chrome.controls_visible,
        }
    }

    // --- Pagination ---

    pub fn next_page(&mut self) -> u32 {
        self.go_to_page(self.current_page.saturating_add(1))
    }

    pub fn prev_page(&mut self) -> u32 {
        self.go_to_page(self.current_page.saturating_sub(1))
    }

    /// Moves to `page`, clamped to the document. Returns the resulting page.
    pub fn go_to_page(&mut self, page: u32) -> u32 {
        let page = page.clamp(1, self.total_pages);
        if page != self.current_page {
            self.current_page = page;
            self.write_through(page);
        }
        self.current_page
    }

    /// Adopts the page count reported by the loaded document.
    pub fn document_loaded(&mut self, num_pages: u32) {
        if num_pages == 0 {
            return;
        }
        self.total_pages = num_pages;
        if self.current_page > num_pages {
            self.go_to_page(num_pages);
        }
    }

    // --- Zoom ---

    pub fn zoom_in(&mut self) -> u16 {
        self.zoom_level = self.zoom_level.saturating_add(ZOOM_STEP).min(MAX_ZOOM);
        self.zoom_level
    }

    pub fn zoom_out(&mut self) -> u16 {
        self.zoom_level = self.zoom_level.saturating_sub(ZOOM_STEP).max(MIN_ZOOM);
        self.zoom_level
    }

    pub fn reset_zoom(&mut self) -> u16 {
        self.zoom_level = DEFAULT_ZOOM;
        self.zoom_level
    }

    // --- Fullscreen chrome ---

    pub fn toggle_fullscreen(&mut self) -> bool {
        let entered = {
            let mut chrome = lock(&self.chrome);
            chrome.is_fullscreen = !chrome.is_fullscreen;
            chrome.controls_visible = true;
            chrome.is_fullscreen
        };
        self.idle_timer = None;
        if entered {
            self.arm_idle_timer();
        }
        entered
    }

    /// Pointer movement over the reader. Only matters while fullscreen.
    pub fn pointer_activity(&mut self) {
        {
            let mut chrome = lock(&self.chrome);
            if !chrome.is_fullscreen {
                return;
            }
            chrome.controls_visible = true;
        }
        self.arm_idle_timer();
    }

    /// Ends the session. In-flight progress syncs are left to finish.
    pub fn close(mut self) {
        self.idle_timer = None;
        debug!("Closed reading session for {}", self.item.id);
    }

    fn arm_idle_timer(&mut self) {
        let epoch = {
            let mut chrome = lock(&self.chrome);
            chrome.epoch += 1;
            chrome.epoch
        };
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let chrome = Arc::clone(&self.chrome);
        let timeout = self.idle_timeout;

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    let mut chrome = lock(&chrome);
                    if chrome.is_fullscreen && chrome.epoch == epoch {
                        chrome.controls_visible = false;
                        debug!("Hiding reader controls after inactivity.");
                    }
                }
            }
        });

        // Replacing the handle cancels the previous timer.
        self.idle_timer = Some(IdleTimer { token });
    }

    // --- Progress ---

    fn write_through(&self, page: u32) {
        self.catalog.record_local_progress(&self.item.id, page);

        let sink = Arc::clone(&self.progress);
        let item_id = self.item.id.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.record_progress(&item_id, page).await {
                warn!("Failed to sync reading progress for {item_id} (page {page}): {e}");
            }
        });
    }
}
