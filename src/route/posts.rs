use axum::extract::{OriginalUri, Path, State};

use crate::{
	extract::Query,
	model::{Post, Status},
	pagination::{ListQuery, Page},
	response::Envelope,
	store::PostQuery,
	Error, Posts,
};

/// Public listing: published posts only, newest first. Any `status` filter
/// in the query string is ignored.
pub async fn list(
	State(posts): State<Posts>,
	OriginalUri(uri): OriginalUri,
	Query(query): Query<ListQuery>,
) -> Result<Page<Post>, Error> {
	let (rows, total) = posts
		.list(&PostQuery {
			status: Some(Status::Published),
			search: query.search.clone(),
			limit: query.per_page(),
			offset: query.offset(),
		})
		.await?;

	Ok(Page::new(rows, &query, total, uri.path()))
}

/// Public fetch by id. A draft is indistinguishable from a missing post.
pub async fn get(State(posts): State<Posts>, Path(id): Path<i64>) -> Result<Envelope<Post>, Error> {
	let post = posts
		.get(id)
		.await?
		.filter(|post| post.status == Status::Published)
		.ok_or(Error::NotFound("post"))?;

	Ok(Envelope::data(post))
}
