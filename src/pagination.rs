use axum::{
	body::Body,
	http::Response,
	response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::model::Status;

/// Hard cap on `limit`; larger values are clamped, not rejected.
pub const MAX_LIMIT: i64 = 50;

/// These can be removed when [`serde`] supports
/// literal defaults: <https://github.com/serde-rs/serde/issues/368>
#[inline]
fn one() -> i64 {
	1
}

#[inline]
fn ten() -> i64 {
	10
}

/// Query parameters shared by the list endpoints.
///
/// `status` is only honoured by the admin listing; the public listing
/// always pins `published`.
#[derive(Debug, Deserialize, Validate)]
pub struct ListQuery {
	/// The page number to return (1-indexed).
	#[validate(range(min = 1))]
	#[serde(default = "one")]
	pub page: i64,
	#[validate(range(min = 1))]
	#[serde(default = "ten")]
	pub limit: i64,
	/// Case-insensitive substring match against title or content.
	pub search: Option<String>,
	pub status: Option<Status>,
}

impl ListQuery {
	#[must_use]
	pub fn per_page(&self) -> i64 {
		self.limit.min(MAX_LIMIT)
	}

	#[must_use]
	pub fn offset(&self) -> i64 {
		(self.page - 1) * self.per_page()
	}

	/// Builds the URL for `page` of this listing, carrying the active
	/// filters so following a link never changes the result set.
	fn link(&self, base: &str, page: i64) -> String {
		let params = serde_urlencoded::to_string(LinkQuery {
			page,
			limit: self.per_page(),
			search: self.search.as_deref(),
			status: self.status,
		})
		.unwrap_or_default();

		format!("{base}?{params}")
	}
}

#[derive(Serialize)]
struct LinkQuery<'a> {
	page: i64,
	limit: i64,
	#[serde(skip_serializing_if = "Option::is_none")]
	search: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	status: Option<Status>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
	pub page: i64,
	pub per_page: i64,
	pub total: i64,
	pub last_page: i64,
	pub from: Option<i64>,
	pub to: Option<i64>,
}

/// Hypermedia links; each is null when that page does not exist.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct PageLinks {
	pub first: Option<String>,
	pub last: Option<String>,
	pub prev: Option<String>,
	pub next: Option<String>,
}

/// A paginated listing. Shared by the public and admin list handlers so the
/// page arithmetic exists exactly once.
#[derive(Debug, Serialize)]
pub struct Page<T> {
	pub data: Vec<T>,
	pub meta: PageMeta,
	pub links: PageLinks,
	pub timestamp: DateTime<Utc>,
}

impl<T> Page<T> {
	/// Builds the page envelope for `data`, which is assumed to already be
	/// the slice for `query`'s page out of `total` matching rows.
	#[must_use]
	pub fn new(data: Vec<T>, query: &ListQuery, total: i64, base: &str) -> Self {
		let page = query.page;
		let per_page = query.per_page();

		let last_page = if total == 0 {
			0
		} else {
			(total + per_page - 1) / per_page
		};

		let url = |page: i64| query.link(base, page);

		Self {
			data,
			meta: PageMeta {
				page,
				per_page,
				total,
				last_page,
				from: (total > 0).then(|| (page - 1) * per_page + 1),
				to: (total > 0).then(|| (page * per_page).min(total)),
			},
			links: PageLinks {
				first: (total > 0).then(|| url(1)),
				last: (total > 0).then(|| url(last_page)),
				prev: (page > 1).then(|| url(page - 1)),
				next: (page < last_page).then(|| url(page + 1)),
			},
			timestamp: Utc::now(),
		}
	}
}

impl<T: Serialize> IntoResponse for Page<T> {
	fn into_response(self) -> Response<Body> {
		axum::Json(self).into_response()
	}
}
