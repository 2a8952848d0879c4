//! Test harness for the client adapters.
//!
//! Provides:
//! - MockBackend: an in-process HTTP backend speaking the catalog, identity
//!   and progress endpoints under `/api`
//! - Client: the wired-up `AppState` over an in-memory SQLite store

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Multipart, Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use folio_client::{adapters::SqliteStore, config::Config, shell::AppState};
use serde_json::{json, Value};

pub const VALID_TOKEN: &str = "tok-1";
pub const PASSWORD: &str = "secret1";

/// One multipart field as the backend received it.
#[derive(Debug, Clone)]
pub struct ReceivedField {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl ReceivedField {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

#[derive(Default)]
struct BackendState {
    books: Mutex<Vec<Value>>,
    /// `Authorization` header of each request, keyed by path.
    seen: Mutex<Vec<(String, Option<String>)>>,
    uploads: Mutex<Vec<Vec<ReceivedField>>>,
    progress: Mutex<Vec<(String, u32)>>,
    tokens_revoked: AtomicBool,
    catalog_down: AtomicBool,
}

impl BackendState {
    /// Records the request and checks its credential.
    ///
    /// A revoked or unknown credential is always rejected; a missing one is
    /// rejected only when `required`.
    fn authorize(&self, path: &str, headers: &HeaderMap, required: bool) -> Result<(), Response> {
        let header = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.seen.lock().unwrap().push((path.to_string(), header.clone()));

        let unauthorized = || (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        match header {
            Some(value) => {
                let valid = value == format!("Bearer {VALID_TOKEN}")
                    && !self.tokens_revoked.load(Ordering::SeqCst);
                if valid {
                    Ok(())
                } else {
                    Err(unauthorized())
                }
            }
            None if required => Err(unauthorized()),
            None => Ok(()),
        }
    }
}

pub fn user(email: &str, name: &str, is_vip: bool, is_author: bool) -> Value {
    json!({
        "id": format!("user-{}", email.split('@').next().unwrap_or_default()),
        "email": email,
        "name": name,
        "isVip": is_vip,
        "isAuthor": is_author,
    })
}

pub fn book(id: &str, title: &str, is_vip: bool) -> Value {
    json!({
        "id": id,
        "title": title,
        "author": "Grace Hopper",
        "description": format!("All about {title}"),
        "coverUrl": format!("/covers/{id}.png"),
        "pdfUrl": format!("/pdfs/{id}.pdf"),
        "isVip": is_vip,
        "publishedAt": "2024-03-01",
        "pages": 12,
        "lastReadPage": 0,
    })
}

/// An in-process stand-in for the remote backend.
pub struct MockBackend {
    state: Arc<BackendState>,
    pub base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = Arc::new(BackendState::default());
        state.books.lock().unwrap().extend([
            book("b-free", "Compilers", false),
            book("b-vip", "Distributed Systems", true),
        ]);

        let api = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/register", post(register))
            .route("/auth/google", post(federated))
            .route("/user/profile", get(profile))
            .route("/user/reading-progress", post(reading_progress))
            .route("/books", get(list_books).post(create_book))
            .route("/books/{id}", get(get_book).put(update_book).delete(delete_book))
            .route("/books/{id}/pdf", get(book_pdf))
            .with_state(state.clone());
        let app = Router::new().nest("/api", api);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            state,
            base_url: format!("http://{addr}/api"),
            handle,
        }
    }

    pub fn add_book(&self, book: Value) {
        self.state.books.lock().unwrap().push(book);
    }

    /// Makes every presented credential invalid from now on.
    pub fn revoke_tokens(&self) {
        self.state.tokens_revoked.store(true, Ordering::SeqCst);
    }

    pub fn set_catalog_down(&self, down: bool) {
        self.state.catalog_down.store(down, Ordering::SeqCst);
    }

    /// The `Authorization` headers sent to `path`, in order.
    pub fn auth_headers_for(&self, path: &str) -> Vec<Option<String>> {
        self.state
            .seen
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, h)| h.clone())
            .collect()
    }

    pub fn uploads(&self) -> Vec<Vec<ReceivedField>> {
        self.state.uploads.lock().unwrap().clone()
    }

    pub fn progress(&self) -> Vec<(String, u32)> {
        self.state.progress.lock().unwrap().clone()
    }

    /// Polls until the backend has recorded `count` progress updates.
    pub async fn wait_for_progress(&self, count: usize) -> Vec<(String, u32)> {
        for _ in 0..200 {
            let progress = self.progress();
            if progress.len() >= count {
                return progress;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("backend saw only {:?}", self.progress());
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

fn grant(user: Value) -> Json<Value> {
    Json(json!({ "user": user, "token": VALID_TOKEN }))
}

async fn login(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    state.seen.lock().unwrap().push(("/auth/login".into(), None));
    let email = body["email"].as_str().unwrap_or_default();
    if body["password"] == PASSWORD {
        let is_author = email.starts_with("author");
        grant(user(email, "Ada", false, is_author)).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, "Invalid credentials").into_response()
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    if email == "taken@example.com" {
        return (StatusCode::CONFLICT, "User already exists").into_response();
    }
    let name = body["name"].as_str().unwrap_or_default();
    (StatusCode::CREATED, grant(user(email, name, false, false))).into_response()
}

async fn federated(Json(body): Json<Value>) -> Response {
    if body["token"] == "good-google-token" {
        grant(user("gmail@example.com", "Federated", false, false)).into_response()
    } else {
        (StatusCode::BAD_REQUEST, "Invalid Google token").into_response()
    }
}

async fn profile(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    if let Err(rejection) = state.authorize("/user/profile", &headers, true) {
        return rejection;
    }
    // The server has already recorded a purchase.
    Json(user("ada@example.com", "Ada", true, false)).into_response()
}

async fn reading_progress(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = state.authorize("/user/reading-progress", &headers, true) {
        return rejection;
    }
    let book_id = body["bookId"].as_str().unwrap_or_default().to_string();
    let page = body["page"].as_u64().unwrap_or_default() as u32;
    state.progress.lock().unwrap().push((book_id, page));
    Json(json!({ "message": "Progress saved" })).into_response()
}

async fn list_books(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    if let Err(rejection) = state.authorize("/books", &headers, false) {
        return rejection;
    }
    if state.catalog_down.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "database offline").into_response();
    }
    Json(Value::Array(state.books.lock().unwrap().clone())).into_response()
}

async fn get_book(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(rejection) = state.authorize(&format!("/books/{id}"), &headers, false) {
        return rejection;
    }
    let books = state.books.lock().unwrap();
    match books.iter().find(|b| b["id"] == id.as_str()) {
        Some(book) => Json(book.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "Book not found").into_response(),
    }
}

async fn read_fields(mut multipart: Multipart) -> Vec<ReceivedField> {
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.unwrap().to_vec();
        fields.push(ReceivedField {
            name,
            file_name,
            content_type,
            data,
        });
    }
    fields
}

fn text_field(fields: &[ReceivedField], name: &str) -> Option<String> {
    fields.iter().find(|f| f.name == name).map(ReceivedField::text)
}

async fn create_book(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    if let Err(rejection) = state.authorize("/books", &headers, true) {
        return rejection;
    }
    let fields = read_fields(multipart).await;
    let mut books = state.books.lock().unwrap();
    let id = format!("b-new-{}", books.len());
    let mut created = book(&id, &text_field(&fields, "title").unwrap_or_default(), false);
    created["author"] = json!(text_field(&fields, "author"));
    created["isVip"] = json!(text_field(&fields, "isVip").as_deref() == Some("true"));
    created["pages"] = json!(text_field(&fields, "pages").and_then(|p| p.parse::<u32>().ok()));
    books.push(created.clone());
    state.uploads.lock().unwrap().push(fields);
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn update_book(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    if let Err(rejection) = state.authorize(&format!("/books/{id}"), &headers, true) {
        return rejection;
    }
    let fields = read_fields(multipart).await;
    let mut books = state.books.lock().unwrap();
    let Some(book) = books.iter_mut().find(|b| b["id"] == id.as_str()) else {
        return (StatusCode::NOT_FOUND, "Book not found").into_response();
    };
    if let Some(title) = text_field(&fields, "title") {
        book["title"] = json!(title);
    }
    if let Some(is_vip) = text_field(&fields, "isVip") {
        book["isVip"] = json!(is_vip == "true");
    }
    let updated = book.clone();
    state.uploads.lock().unwrap().push(fields);
    Json(updated).into_response()
}

async fn delete_book(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(rejection) = state.authorize(&format!("/books/{id}"), &headers, true) {
        return rejection;
    }
    let mut books = state.books.lock().unwrap();
    let before = books.len();
    books.retain(|b| b["id"] != id.as_str());
    if books.len() == before {
        (StatusCode::NOT_FOUND, "Book not found").into_response()
    } else {
        Json(json!({ "message": "Book deleted" })).into_response()
    }
}

async fn book_pdf(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let path = format!("/books/{id}/pdf");
    if let Err(rejection) = state.authorize(&path, &headers, true) {
        return rejection;
    }
    Json(json!({ "pdfUrl": format!("https://cdn.test/{id}.pdf") })).into_response()
}

//=========================================================================================
// Client
//=========================================================================================

/// The wired-up client plus a handle on its local store.
pub struct Client {
    pub app: AppState,
    pub store: SqliteStore,
}

pub async fn client(backend: &MockBackend) -> Client {
    let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
    client_over(backend, store).await
}

pub async fn client_over(backend: &MockBackend, store: SqliteStore) -> Client {
    let base_url = backend.base_url.clone();
    let config = Config::from_lookup(|key| match key {
        "API_URL" => Some(base_url.clone()),
        "GOOGLE_CLIENT_ID" => Some("test-client-id".to_string()),
        "UPGRADE_DELAY_MS" => Some("10".to_string()),
        "REQUEST_TIMEOUT_MS" => Some("2000".to_string()),
        _ => None,
    })
    .unwrap();
    let app = AppState::build(&config, Arc::new(store.clone())).unwrap();
    Client { app, store }
}

/// A client signed in as `email` that has loaded the catalog.
pub async fn signed_in(backend: &MockBackend, email: &str) -> Client {
    let client = client(backend).await;
    client.app.sessions.establish_session(email, PASSWORD).await.unwrap();
    client.app.catalog.load().await;
    client
}
