pub mod catalog;
pub mod domain;
pub mod gate;
pub mod ports;
pub mod reader;
pub mod session;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use catalog::{seed_catalog, CatalogError, CatalogFilter, CatalogStore, ReadingHistory};
pub use domain::{
    AccessReference, Capabilities, CapabilityTier, ContentItem, Identity, ItemDraft, ItemPatch, Session,
    Upload,
};
pub use gate::{access_decision, can_access, can_publish, read_admission, Access};
pub use ports::{
    AuthGrant, CatalogService, IdentityService, LocalStore, PortError, PortResult, ProgressSink,
};
pub use reader::{Denial, ReaderError, ReaderSettings, ReaderState, ReadingController, ReadingSession, ViewState};
pub use session::{Redirect, SessionContext, SessionError, SessionManager, SessionSettings};
pub use validation::{FieldError, ValidationError};
