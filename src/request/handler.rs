//! Reusable status handlers.
//!
//! Each helper matches the handler signature accepted by
//! [`RequestBuilder::when_status`](crate::request::RequestBuilder::when_status), so operations can
//! be written as `.when_status(200, parse_json).with_default_handler(give_nothing)`.

// std
use std::future::{Ready, ready};
// crates.io
use serde::de::DeserializeOwned;
use serde_json::Value;
// self
use crate::{_prelude::*, http::ApiResponse};

/// Decodes the body as JSON.
pub fn parse_json<T>(response: ApiResponse) -> Ready<Result<Option<T>>>
where
	T: DeserializeOwned,
{
	ready(response.json().map(Some))
}

/// Decodes the body as JSON, mapping an empty body to [`Value::Null`].
pub fn passthrough(response: ApiResponse) -> Ready<Result<Option<Value>>> {
	if response.body.iter().all(u8::is_ascii_whitespace) {
		return ready(Ok(Some(Value::Null)));
	}

	ready(response.json().map(Some))
}

/// Ignores the response and yields "no result".
pub fn give_nothing<T>(_: ApiResponse) -> Ready<Result<Option<T>>> {
	ready(Ok(None))
}
