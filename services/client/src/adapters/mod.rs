pub mod catalog;
pub mod http;
pub mod identity;
pub mod progress;
pub mod store;

pub use catalog::HttpCatalogService;
pub use http::ApiClient;
pub use identity::HttpIdentityService;
pub use progress::HttpProgressSink;
pub use store::SqliteStore;
