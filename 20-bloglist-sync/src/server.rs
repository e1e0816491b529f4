//! In-memory reference backend for the blog and anecdote collections.
//!
//! Serves `GET/POST /api/<collection>`, `PUT/DELETE /api/<collection>/:id`,
//! `GET /api/users[/:id]` and `POST /api/login`. Records live in per-collection repositories and
//! vanish with the process. Tokens are random strings minted on login.

use std::{
    collections::HashMap,
    future::Future,
    net::SocketAddr,
    str::FromStr,
    sync::{Arc, Mutex, PoisonError},
};

use anyhow::Result;
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::{
    resource::{Anecdote, Blog, BlogSummary, Resource, UserProfile, UserRef},
    session::{Credentials, LoggedUser},
};

/// A user the backend accepts at `/api/login`, parsed from
/// `username:password[:display name]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub username: String,
    pub password: String,
    pub name: String,
}

impl FromStr for Account {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parts = value.splitn(3, ':');
        let username = parts.next().unwrap_or_default().trim();
        let password = parts.next().unwrap_or_default();
        if username.is_empty() || password.is_empty() {
            return Err(format!(
                "expected username:password[:name], got '{value}'"
            ));
        }
        let name = parts
            .next()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(username);
        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
            name: name.to_string(),
        })
    }
}

pub struct Backend {
    listener: TcpListener,
    router: Router,
}

impl Backend {
    pub fn new(listener: TcpListener, accounts: Vec<Account>) -> Self {
        Self {
            listener,
            router: router(accounts),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Backend { listener, router } = self;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("backend stopped");
        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }
}

/// Builds the full API router over fresh, empty repositories.
pub fn router(accounts: Vec<Account>) -> Router {
    let accounts = Arc::new(Accounts::new(accounts));
    let blogs = Arc::new(Repository::<Blog>::default());
    Router::new()
        .merge(collection_routes(Arc::clone(&blogs), Arc::clone(&accounts)))
        .merge(collection_routes::<Anecdote>(
            Arc::default(),
            Arc::clone(&accounts),
        ))
        .merge(
            Router::new()
                .route("/api/users", get(list_users))
                .route("/api/users/:id", get(get_user))
                .with_state(UsersState {
                    accounts: Arc::clone(&accounts),
                    blogs,
                }),
        )
        .merge(
            Router::new()
                .route("/api/login", post(login))
                .with_state(accounts),
        )
        .layer(TraceLayer::new_for_http())
}

fn collection_routes<R: Resource>(records: Arc<Repository<R>>, accounts: Arc<Accounts>) -> Router {
    let state = CollectionState { records, accounts };
    Router::new()
        .route(
            &format!("/api/{}", R::COLLECTION),
            get(list::<R>).post(create::<R>),
        )
        .route(
            &format!("/api/{}/:id", R::COLLECTION),
            put(update_rank::<R>).delete(delete::<R>),
        )
        .with_state(state)
}

struct CollectionState<R> {
    records: Arc<Repository<R>>,
    accounts: Arc<Accounts>,
}

impl<R> Clone for CollectionState<R> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            accounts: Arc::clone(&self.accounts),
        }
    }
}

#[derive(Clone)]
struct UsersState {
    accounts: Arc<Accounts>,
    blogs: Arc<Repository<Blog>>,
}

/// Records in insertion order.
struct Repository<R> {
    records: Mutex<Vec<R>>,
}

impl<R> Default for Repository<R> {
    fn default() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }
}

impl<R: Resource> Repository<R> {
    fn all(&self) -> Vec<R> {
        self.lock().clone()
    }

    fn insert(&self, record: R) {
        self.lock().push(record);
    }

    fn get(&self, id: &str) -> Option<R> {
        self.lock().iter().find(|r| r.id() == id).cloned()
    }

    fn set_rank(&self, id: &str, rank: u64) -> Option<R> {
        let mut records = self.lock();
        let record = records.iter_mut().find(|r| r.id() == id)?;
        record.set_rank(rank);
        Some(record.clone())
    }

    fn remove(&self, id: &str) -> bool {
        let mut records = self.lock();
        let before = records.len();
        records.retain(|r| r.id() != id);
        records.len() != before
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<R>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct Accounts {
    users: HashMap<String, (String, UserRef)>,
    tokens: Mutex<HashMap<String, UserRef>>,
}

impl Accounts {
    fn new(accounts: Vec<Account>) -> Self {
        let users = accounts
            .into_iter()
            .map(|account| {
                let user = UserRef {
                    id: nanoid::nanoid!(),
                    username: account.username.clone(),
                    name: account.name,
                };
                (account.username, (account.password, user))
            })
            .collect();
        Self {
            users,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    fn login(&self, credentials: &Credentials) -> Option<LoggedUser> {
        let (password, user) = self.users.get(&credentials.username)?;
        if *password != credentials.password {
            return None;
        }
        let token = nanoid::nanoid!(32);
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.clone(), user.clone());
        Some(LoggedUser {
            token,
            id: user.id.clone(),
            username: user.username.clone(),
            name: user.name.clone(),
        })
    }

    /// Every account, ordered by username.
    fn users(&self) -> Vec<UserRef> {
        let mut users: Vec<UserRef> = self.users.values().map(|(_, user)| user.clone()).collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users
    }

    fn user(&self, id: &str) -> Option<UserRef> {
        self.users
            .values()
            .map(|(_, user)| user)
            .find(|user| user.id == id)
            .cloned()
    }

    fn authenticate(&self, headers: &HeaderMap) -> Result<UserRef, ApiError> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized("token missing"))?;
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
            .ok_or(ApiError::Unauthorized("token invalid"))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseBody {
    pub error: String,
}

#[derive(Debug)]
enum ApiError {
    Validation(String),
    Unauthorized(&'static str),
    NotFound,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message.to_string()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "unknown id".to_string()),
        };
        (status, Json(ErrorResponseBody { error })).into_response()
    }
}

/// Malformed or mistyped bodies answer with the same `{error}` shape as
/// every other rejection.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

async fn list<R: Resource>(State(state): State<CollectionState<R>>) -> Json<Vec<R>> {
    Json(state.records.all())
}

async fn create<R: Resource>(
    State(state): State<CollectionState<R>>,
    headers: HeaderMap,
    payload: Result<Json<R::Draft>, JsonRejection>,
) -> Result<(StatusCode, Json<R>), ApiError> {
    let Json(draft) = payload?;
    let owner = if R::OWNED {
        Some(state.accounts.authenticate(&headers)?)
    } else {
        None
    };
    R::validate(&draft).map_err(ApiError::Validation)?;

    let record = R::from_draft(nanoid::nanoid!(), draft, owner);
    debug!(id = record.id(), collection = R::COLLECTION, "record created");
    state.records.insert(record.clone());
    Ok((StatusCode::CREATED, Json(record)))
}

async fn update_rank<R: Resource>(
    State(state): State<CollectionState<R>>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<R>, ApiError> {
    let Json(body) = payload?;
    let rank = body
        .get(R::RANK_FIELD)
        .and_then(Value::as_u64)
        .ok_or_else(|| {
            ApiError::Validation(format!("{} must be a non-negative integer", R::RANK_FIELD))
        })?;
    let record = state.records.set_rank(&id, rank).ok_or(ApiError::NotFound)?;
    Ok(Json(record))
}

async fn delete<R: Resource>(
    State(state): State<CollectionState<R>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let record = state.records.get(&id).ok_or(ApiError::NotFound)?;
    if R::OWNED {
        let user = state.accounts.authenticate(&headers)?;
        if record.owner_id() != Some(user.id.as_str()) {
            return Err(ApiError::Unauthorized("only the creator can delete this"));
        }
    }
    state.records.remove(&id);
    debug!(id = %id, collection = R::COLLECTION, "record deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn login(
    State(accounts): State<Arc<Accounts>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<LoggedUser>, ApiError> {
    let Json(credentials) = payload?;
    match accounts.login(&credentials) {
        Some(user) => {
            info!(username = %user.username, "login");
            Ok(Json(user))
        }
        None => Err(ApiError::Unauthorized("invalid username or password")),
    }
}

async fn list_users(State(state): State<UsersState>) -> Json<Vec<UserProfile>> {
    let blogs = state.blogs.all();
    let profiles = state
        .accounts
        .users()
        .into_iter()
        .map(|user| profile(user, &blogs))
        .collect();
    Json(profiles)
}

async fn get_user(
    State(state): State<UsersState>,
    Path(id): Path<String>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state.accounts.user(&id).ok_or(ApiError::NotFound)?;
    Ok(Json(profile(user, &state.blogs.all())))
}

fn profile(user: UserRef, blogs: &[Blog]) -> UserProfile {
    let blogs = blogs
        .iter()
        .filter(|blog| blog.owner_id() == Some(user.id.as_str()))
        .map(BlogSummary::from)
        .collect();
    UserProfile {
        id: user.id,
        username: user.username,
        name: user.name,
        blogs,
    }
}
