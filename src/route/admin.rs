use axum::{
	extract::{OriginalUri, Path, State},
	http::StatusCode,
};

use crate::{
	auth::Auth,
	extract::{Json, Query},
	model::{Post, PostInput},
	pagination::{ListQuery, Page},
	response::Envelope,
	store::PostQuery,
	Error, Posts,
};

/// Admin listing: every status unless the query narrows it.
pub async fn list(
	State(posts): State<Posts>,
	_auth: Auth,
	OriginalUri(uri): OriginalUri,
	Query(query): Query<ListQuery>,
) -> Result<Page<Post>, Error> {
	let (rows, total) = posts
		.list(&PostQuery {
			status: query.status,
			search: query.search.clone(),
			limit: query.per_page(),
			offset: query.offset(),
		})
		.await?;

	Ok(Page::new(rows, &query, total, uri.path()))
}

/// Admin fetch by id, drafts included.
pub async fn get(
	State(posts): State<Posts>,
	_auth: Auth,
	Path(id): Path<i64>,
) -> Result<Envelope<Post>, Error> {
	let post = posts.get(id).await?.ok_or(Error::NotFound("post"))?;

	Ok(Envelope::data(post))
}

/// Creates a post for the caller's author record, creating that record on
/// first use. `published_at` is stamped only when the post is born
/// published.
pub async fn create(
	State(posts): State<Posts>,
	auth: Auth,
	Json(input): Json<PostInput>,
) -> Result<(StatusCode, Envelope<Post>), Error> {
	let author = posts
		.author_by_email(&auth.identity.email, &auth.identity.name)
		.await?;

	let post = posts.create(author.id, input.into_record(None)).await?;

	tracing::info!(post_id = post.id, author_id = author.id, "created post");

	Ok((StatusCode::CREATED, Envelope::data(post)))
}

/// Updates a post. The current row is read first so a published post being
/// re-saved keeps its original `published_at`; only a draft being published
/// gets a fresh one.
pub async fn update(
	State(posts): State<Posts>,
	_auth: Auth,
	Path(id): Path<i64>,
	Json(input): Json<PostInput>,
) -> Result<Envelope<Post>, Error> {
	let existing = posts.get(id).await?.ok_or(Error::NotFound("post"))?;

	let post = posts
		.update(id, input.into_record(Some(&existing)))
		.await?
		.ok_or(Error::NotFound("post"))?;

	Ok(Envelope::data(post))
}

/// Hard delete. A missing id is a storage no-op still reported as success,
/// so repeated deletes are idempotent from the client's point of view.
pub async fn delete(
	State(posts): State<Posts>,
	_auth: Auth,
	Path(id): Path<i64>,
) -> Result<Envelope, Error> {
	posts.delete(id).await?;

	tracing::info!(post_id = id, "deleted post");

	Ok(Envelope::message("post deleted"))
}
