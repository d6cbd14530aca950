//! In-memory fakes for the injected collaborators, so the full router can
//! be exercised without Postgres.

use std::{
	collections::HashMap,
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc, Mutex,
	},
	time::Duration,
};

use axum_test::TestServer;
use chrono::Utc;
use marque::{
	auth::{AuthFailure, Identity, IdentityProvider},
	cors::CorsPolicy,
	model::{Author, Post, PostRecord, Status},
	ratelimit::{MemoryStore, RateLimiter},
	route,
	store::{PostQuery, PostStore, StoreError},
	State,
};
use serde_json::json;
use uuid::Uuid;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";
pub const ORIGIN: &str = "https://example.com";

#[derive(Default)]
struct Inner {
	posts: Vec<Post>,
	authors: Vec<Author>,
	next_post: i64,
	next_author: i64,
}

/// [`PostStore`] over a vector. `calls` counts every storage invocation so
/// tests can assert that rejected requests never reach a handler body.
#[derive(Default)]
pub struct MemoryPosts {
	inner: Mutex<Inner>,
	pub calls: AtomicUsize,
}

impl MemoryPosts {
	fn record_call(&self) {
		self.calls.fetch_add(1, Ordering::SeqCst);
	}
}

#[axum::async_trait]
impl PostStore for MemoryPosts {
	async fn list(&self, query: &PostQuery) -> Result<(Vec<Post>, i64), StoreError> {
		self.record_call();

		let inner = self.inner.lock().unwrap();

		let mut matches: Vec<Post> = inner
			.posts
			.iter()
			.filter(|post| {
				query.status.map_or(true, |status| post.status == status)
					&& query.search.as_ref().map_or(true, |search| {
						let needle = search.to_lowercase();

						post.title.to_lowercase().contains(&needle)
							|| post.content.to_lowercase().contains(&needle)
					})
			})
			.cloned()
			.collect();

		matches.sort_by(|a, b| {
			b.created_at
				.cmp(&a.created_at)
				.then_with(|| b.id.cmp(&a.id))
		});

		let total = i64::try_from(matches.len()).unwrap();
		let page = matches
			.into_iter()
			.skip(usize::try_from(query.offset).unwrap())
			.take(usize::try_from(query.limit).unwrap())
			.collect();

		Ok((page, total))
	}

	async fn get(&self, id: i64) -> Result<Option<Post>, StoreError> {
		self.record_call();

		let inner = self.inner.lock().unwrap();

		Ok(inner.posts.iter().find(|post| post.id == id).cloned())
	}

	async fn create(&self, author_id: i64, record: PostRecord) -> Result<Post, StoreError> {
		self.record_call();

		let mut inner = self.inner.lock().unwrap();
		inner.next_post += 1;

		let post = Post {
			id: inner.next_post,
			title: record.title,
			content: record.content,
			excerpt: record.excerpt,
			status: record.status,
			published_at: record.published_at,
			created_at: Utc::now(),
			updated_at: Utc::now(),
			user_id: author_id,
		};

		inner.posts.push(post.clone());

		Ok(post)
	}

	async fn update(&self, id: i64, record: PostRecord) -> Result<Option<Post>, StoreError> {
		self.record_call();

		let mut inner = self.inner.lock().unwrap();

		let Some(post) = inner.posts.iter_mut().find(|post| post.id == id) else {
			return Ok(None);
		};

		post.title = record.title;
		post.content = record.content;
		post.excerpt = record.excerpt;
		post.status = record.status;
		post.published_at = record.published_at;
		post.updated_at = Utc::now();

		Ok(Some(post.clone()))
	}

	async fn delete(&self, id: i64) -> Result<(), StoreError> {
		self.record_call();

		let mut inner = self.inner.lock().unwrap();
		inner.posts.retain(|post| post.id != id);

		Ok(())
	}

	async fn author_by_email(&self, email: &str, name: &str) -> Result<Author, StoreError> {
		self.record_call();

		let mut inner = self.inner.lock().unwrap();

		if let Some(author) = inner.authors.iter().find(|author| author.email == email) {
			return Ok(author.clone());
		}

		inner.next_author += 1;

		let author = Author {
			id: inner.next_author,
			name: name.to_owned(),
			email: email.to_owned(),
		};

		inner.authors.push(author.clone());

		Ok(author)
	}
}

/// Identity provider with a single admin account and in-memory tokens.
#[derive(Default)]
pub struct MemoryIdentity {
	tokens: Mutex<HashMap<String, Identity>>,
}

#[axum::async_trait]
impl IdentityProvider for MemoryIdentity {
	async fn login(&self, email: &str, password: &str) -> Result<(Identity, String), AuthFailure> {
		if email != ADMIN_EMAIL || password != ADMIN_PASSWORD {
			return Err(AuthFailure::InvalidCredentials);
		}

		let identity = Identity {
			user_id: 1,
			email: ADMIN_EMAIL.to_owned(),
			name: "Admin".to_owned(),
		};

		let token = Uuid::new_v4().to_string();

		self.tokens
			.lock()
			.unwrap()
			.insert(token.clone(), identity.clone());

		Ok((identity, token))
	}

	async fn validate(&self, token: &str) -> Result<Identity, AuthFailure> {
		self.tokens
			.lock()
			.unwrap()
			.get(token)
			.cloned()
			.ok_or(AuthFailure::InvalidToken)
	}

	async fn logout(&self, token: &str) -> Result<(), AuthFailure> {
		self.tokens.lock().unwrap().remove(token);

		Ok(())
	}
}

#[must_use]
pub fn server(posts: Arc<MemoryPosts>) -> TestServer {
	server_with(posts, 100, Duration::from_secs(900))
}

#[must_use]
pub fn server_with(posts: Arc<MemoryPosts>, limit: u32, window: Duration) -> TestServer {
	TestServer::new(router_with(posts, limit, window)).unwrap()
}

#[must_use]
pub fn router_with(posts: Arc<MemoryPosts>, limit: u32, window: Duration) -> axum::Router {
	let state = State {
		posts,
		identity: Arc::new(MemoryIdentity::default()),
		limiter: RateLimiter::new(Arc::new(MemoryStore::default()), limit, window),
		cors: CorsPolicy::new(
			&[ORIGIN.to_owned(), "*.vercel.app".to_owned()],
			ORIGIN,
		),
	};

	route::router(state, None)
}

pub async fn login(server: &TestServer) -> String {
	let response = server
		.post("/login")
		.json(&json!({
			"email": ADMIN_EMAIL,
			"password": ADMIN_PASSWORD,
		}))
		.await;

	assert_eq!(response.status_code(), 200);

	response.json::<serde_json::Value>()["data"]["token"]
		.as_str()
		.unwrap()
		.to_owned()
}

/// Seeds a post directly through the store, bypassing the HTTP surface.
pub async fn seed(posts: &MemoryPosts, title: &str, content: &str, status: Status) -> Post {
	let record = PostRecord {
		title: title.to_owned(),
		content: content.to_owned(),
		excerpt: marque::model::derive_excerpt(content),
		status,
		published_at: (status == Status::Published).then(Utc::now),
	};

	posts.create(1, record).await.unwrap()
}
