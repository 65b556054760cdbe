//! Remote data service used by the data page.

use crate::definition::ServiceError;
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

/// A post as returned by the service, before it is turned into a table row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub title: String,
    pub body: String,
}

/// Search parameters captured by `FETCH`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub keyword: String,
    pub id: String,
}

/// Async access to the posts service.
///
/// Futures must own everything they use; they run on their own task and
/// may be aborted at any point.
pub trait DataBackend: Send + Sync {
    fn fetch_rows(&self, query: SearchQuery) -> BoxFuture<'static, Result<Vec<Post>, ServiceError>>;

    /// Store `fields` for post `id`, returning the stored representation.
    fn save_row(
        &self,
        id: u64,
        fields: Map<String, Value>,
    ) -> BoxFuture<'static, Result<Map<String, Value>, ServiceError>>;
}

#[derive(Default)]
struct Failures {
    fetch: Option<String>,
    save: Option<String>,
}

struct Store {
    posts: Vec<Post>,
    latency: Duration,
    failures: Mutex<Failures>,
    saves: Mutex<Vec<(u64, Map<String, Value>)>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process stand-in for the posts service.
///
/// Searches match the keyword against title and body (case-insensitive) and
/// the id exactly; saves echo the submitted fields back and are recorded.
/// Failures can be injected for the next fetch or save.
///
/// # Example
///
/// ```rust
/// use statecraft::machines::data_page::{DataBackend, InMemoryBackend, SearchQuery};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let backend = InMemoryBackend::builder()
///     .latency(Duration::from_millis(5))
///     .build();
///
/// let posts = backend.fetch_rows(SearchQuery::default()).await.unwrap();
/// assert!(!posts.is_empty());
///
/// backend.fail_next_fetch("Service unavailable");
/// let error = backend.fetch_rows(SearchQuery::default()).await.unwrap_err();
/// assert_eq!(error.message, "Service unavailable");
/// # }
/// ```
#[derive(Clone)]
pub struct InMemoryBackend {
    store: Arc<Store>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Backend with the sample posts and no latency.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> InMemoryBackendBuilder {
        InMemoryBackendBuilder::default()
    }

    /// Make the next fetch fail with `message`.
    pub fn fail_next_fetch(&self, message: impl Into<String>) {
        lock(&self.store.failures).fetch = Some(message.into());
    }

    /// Make the next save fail with `message`.
    pub fn fail_next_save(&self, message: impl Into<String>) {
        lock(&self.store.failures).save = Some(message.into());
    }

    /// Every save that reached the backend, in order.
    pub fn saves(&self) -> Vec<(u64, Map<String, Value>)> {
        lock(&self.store.saves).clone()
    }

    fn search(&self, query: &SearchQuery) -> Vec<Post> {
        let keyword = query.keyword.trim().to_lowercase();
        let id = query.id.trim();
        self.store
            .posts
            .iter()
            .filter(|post| id.is_empty() || post.id.to_string() == id)
            .filter(|post| {
                keyword.is_empty()
                    || post.title.to_lowercase().contains(&keyword)
                    || post.body.to_lowercase().contains(&keyword)
            })
            .cloned()
            .collect()
    }
}

impl DataBackend for InMemoryBackend {
    fn fetch_rows(&self, query: SearchQuery) -> BoxFuture<'static, Result<Vec<Post>, ServiceError>> {
        let injected = lock(&self.store.failures).fetch.take();
        let result = match injected {
            Some(message) => Err(ServiceError::new(message)),
            None => Ok(self.search(&query)),
        };
        let latency = self.store.latency;
        debug!(keyword = %query.keyword, id = %query.id, "in-memory fetch");

        async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            result
        }
        .boxed()
    }

    fn save_row(
        &self,
        id: u64,
        fields: Map<String, Value>,
    ) -> BoxFuture<'static, Result<Map<String, Value>, ServiceError>> {
        let injected = lock(&self.store.failures).save.take();
        let known = self.store.posts.iter().any(|post| post.id == id);
        let store = Arc::clone(&self.store);
        let latency = store.latency;
        debug!(id, "in-memory save");

        async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            if let Some(message) = injected {
                return Err(ServiceError::new(message));
            }
            if !known {
                return Err(ServiceError::new(format!("Post {id} does not exist")));
            }
            lock(&store.saves).push((id, fields.clone()));
            let mut stored = fields;
            stored.insert("id".to_string(), Value::from(id));
            Ok(stored)
        }
        .boxed()
    }
}

/// Builder for [`InMemoryBackend`].
#[derive(Default)]
pub struct InMemoryBackendBuilder {
    posts: Option<Vec<Post>>,
    latency: Duration,
}

impl InMemoryBackendBuilder {
    /// Replace the sample posts.
    pub fn posts(mut self, posts: Vec<Post>) -> Self {
        self.posts = Some(posts);
        self
    }

    /// Simulated round-trip time of every call.
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn build(self) -> InMemoryBackend {
        InMemoryBackend {
            store: Arc::new(Store {
                posts: self.posts.unwrap_or_else(sample_posts),
                latency: self.latency,
                failures: Mutex::new(Failures::default()),
                saves: Mutex::new(Vec::new()),
            }),
        }
    }
}

/// Eight posts with long titles and bodies.
pub fn sample_posts() -> Vec<Post> {
    const TOPICS: [&str; 8] = [
        "ownership and borrowing",
        "async runtimes",
        "error handling",
        "trait objects",
        "pattern matching",
        "iterators and closures",
        "smart pointers",
        "declarative macros",
    ];
    TOPICS
        .iter()
        .zip(1u64..)
        .map(|(topic, id)| Post {
            id,
            title: format!("A practical guide to {topic}"),
            body: format!(
                "This post walks through {topic} with worked examples, common pitfalls and a short exercise at the end."
            ),
        })
        .collect()
}
