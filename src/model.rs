use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Number of characters taken from the content when no excerpt is supplied.
pub const EXCERPT_LEN: usize = 100;

/// Publication state of a post.
///
/// `published_at` on [`Post`] is non-null exactly when the status is
/// `Published`; the transition logic lives in [`PostInput::into_record`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "post_status", rename_all = "lowercase")]
pub enum Status {
	#[default]
	Draft,
	Published,
}

/// A single post, owned by an author.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Post {
	pub id: i64,
	pub title: String,
	pub content: String,
	pub excerpt: String,
	pub status: Status,
	pub published_at: Option<DateTime<Utc>>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub user_id: i64,
}

/// A post author, lazily created from the authenticated identity's email
/// the first time that identity creates a post.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Author {
	pub id: i64,
	pub name: String,
	pub email: String,
}

/// Request body for creating or updating a post.
#[derive(Debug, Deserialize, Validate)]
pub struct PostInput {
	#[validate(length(min = 1, max = 255, message = "title must be between 1 and 255 characters"))]
	pub title: String,
	#[validate(length(min = 1, message = "content must not be empty"))]
	pub content: String,
	pub excerpt: Option<String>,
	#[serde(default)]
	pub status: Status,
}

/// The fields a handler writes to storage.
///
/// `published_at` is decided here, not by the store, so the
/// draft/published state machine has a single owner.
#[derive(Debug, Clone)]
pub struct PostRecord {
	pub title: String,
	pub content: String,
	pub excerpt: String,
	pub status: Status,
	pub published_at: Option<DateTime<Utc>>,
}

impl PostInput {
	/// Converts validated input into a storage record.
	///
	/// `existing` is the current row for updates, `None` for creates.
	/// A post that is already published keeps its original `published_at`;
	/// only a draft-to-published transition stamps a fresh one. Moving back
	/// to draft clears it.
	#[must_use]
	pub fn into_record(self, existing: Option<&Post>) -> PostRecord {
		let published_at = match self.status {
			Status::Published => match existing {
				Some(post) if post.status == Status::Published => post.published_at,
				_ => Some(Utc::now()),
			},
			Status::Draft => None,
		};

		let excerpt = self
			.excerpt
			.filter(|excerpt| !excerpt.trim().is_empty())
			.unwrap_or_else(|| derive_excerpt(&self.content));

		PostRecord {
			title: self.title,
			content: self.content,
			excerpt,
			status: self.status,
			published_at,
		}
	}
}

/// First [`EXCERPT_LEN`] characters of the content, on char boundaries.
#[must_use]
pub fn derive_excerpt(content: &str) -> String {
	content.chars().take(EXCERPT_LEN).collect()
}
