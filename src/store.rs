use sqlx::{Postgres, QueryBuilder};

use crate::{
	model::{Author, Post, PostRecord, Status},
	Database,
};

/// Storage failure, surfaced to clients as a plain 500.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error(transparent)]
	Database(#[from] sqlx::Error),
	#[error("{0}")]
	Backend(String),
}

/// Filters for a post listing.
#[derive(Debug, Default, Clone)]
pub struct PostQuery {
	pub status: Option<Status>,
	pub search: Option<String>,
	pub limit: i64,
	pub offset: i64,
}

/// Post storage contract.
///
/// Implementations hold no gateway logic: publish-state decisions arrive
/// pre-made inside [`PostRecord`], and listings only filter, order by
/// `created_at` descending and slice.
#[axum::async_trait]
pub trait PostStore: Send + Sync {
	/// Returns the page slice and the total count of matching posts.
	async fn list(&self, query: &PostQuery) -> Result<(Vec<Post>, i64), StoreError>;

	async fn get(&self, id: i64) -> Result<Option<Post>, StoreError>;

	async fn create(&self, author_id: i64, record: PostRecord) -> Result<Post, StoreError>;

	/// Returns `None` when no post with `id` exists.
	async fn update(&self, id: i64, record: PostRecord) -> Result<Option<Post>, StoreError>;

	/// Deleting an id that does not exist is a no-op, reported as success.
	async fn delete(&self, id: i64) -> Result<(), StoreError>;

	/// Finds the author with `email`, creating one on first sight.
	async fn author_by_email(&self, email: &str, name: &str) -> Result<Author, StoreError>;
}

/// [`PostStore`] over Postgres.
#[derive(Clone)]
pub struct PgPosts {
	database: Database,
}

impl PgPosts {
	#[must_use]
	pub fn new(database: Database) -> Self {
		Self { database }
	}
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &PostQuery) {
	let mut joiner = " WHERE ";

	if let Some(status) = query.status {
		builder.push(joiner).push("status = ").push_bind(status);
		joiner = " AND ";
	}

	if let Some(search) = &query.search {
		let pattern = format!("%{}%", escape_like(search));

		builder
			.push(joiner)
			.push("(title ILIKE ")
			.push_bind(pattern.clone())
			.push(" OR content ILIKE ")
			.push_bind(pattern)
			.push(")");
	}
}

/// `%`, `_` and the escape character itself are pattern syntax to `ILIKE`;
/// a search term must match them literally.
fn escape_like(term: &str) -> String {
	let mut escaped = String::with_capacity(term.len());

	for ch in term.chars() {
		if matches!(ch, '%' | '_' | '\\') {
			escaped.push('\\');
		}

		escaped.push(ch);
	}

	escaped
}

#[axum::async_trait]
impl PostStore for PgPosts {
	async fn list(&self, query: &PostQuery) -> Result<(Vec<Post>, i64), StoreError> {
		let mut count = QueryBuilder::new("SELECT COUNT(*) FROM posts");
		push_filters(&mut count, query);

		let total: i64 = count
			.build_query_scalar()
			.fetch_one(&self.database)
			.await?;

		let mut select = QueryBuilder::new("SELECT * FROM posts");
		push_filters(&mut select, query);
		select
			.push(" ORDER BY created_at DESC LIMIT ")
			.push_bind(query.limit)
			.push(" OFFSET ")
			.push_bind(query.offset);

		let posts = select
			.build_query_as::<Post>()
			.fetch_all(&self.database)
			.await?;

		Ok((posts, total))
	}

	async fn get(&self, id: i64) -> Result<Option<Post>, StoreError> {
		let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
			.bind(id)
			.fetch_optional(&self.database)
			.await?;

		Ok(post)
	}

	async fn create(&self, author_id: i64, record: PostRecord) -> Result<Post, StoreError> {
		let post = sqlx::query_as::<_, Post>(
			r"
				INSERT INTO posts (title, content, excerpt, status, published_at, user_id)
				VALUES ($1, $2, $3, $4, $5, $6)
				RETURNING *
			",
		)
		.bind(record.title)
		.bind(record.content)
		.bind(record.excerpt)
		.bind(record.status)
		.bind(record.published_at)
		.bind(author_id)
		.fetch_one(&self.database)
		.await?;

		Ok(post)
	}

	async fn update(&self, id: i64, record: PostRecord) -> Result<Option<Post>, StoreError> {
		let post = sqlx::query_as::<_, Post>(
			r"
				UPDATE posts
				SET title = $1, content = $2, excerpt = $3, status = $4,
					published_at = $5, updated_at = now()
				WHERE id = $6
				RETURNING *
			",
		)
		.bind(record.title)
		.bind(record.content)
		.bind(record.excerpt)
		.bind(record.status)
		.bind(record.published_at)
		.bind(id)
		.fetch_optional(&self.database)
		.await?;

		Ok(post)
	}

	async fn delete(&self, id: i64) -> Result<(), StoreError> {
		sqlx::query("DELETE FROM posts WHERE id = $1")
			.bind(id)
			.execute(&self.database)
			.await?;

		Ok(())
	}

	async fn author_by_email(&self, email: &str, name: &str) -> Result<Author, StoreError> {
		let author = sqlx::query_as::<_, Author>(
			r"
				INSERT INTO authors (name, email)
				VALUES ($1, $2)
				ON CONFLICT (email) DO UPDATE SET name = authors.name
				RETURNING *
			",
		)
		.bind(name)
		.bind(email)
		.fetch_one(&self.database)
		.await?;

		Ok(author)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn like_metacharacters_are_escaped() {
		assert_eq!(escape_like("100%"), r"100\%");
		assert_eq!(escape_like("a_b"), r"a\_b");
		assert_eq!(escape_like(r"back\slash"), r"back\\slash");
		assert_eq!(escape_like("plain"), "plain");
	}
}
