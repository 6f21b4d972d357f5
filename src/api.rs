//! Typed helpers for the guestbook endpoints.
//!
//! Each helper builds an [`ApiRequest`](crate::http::ApiRequest) and sends it through
//! [`ApiClient::dispatch`](crate::ApiClient::dispatch), so every call inherits credential
//! attachment and unauthorized recovery.

pub mod guest;
pub mod guest_book;

pub use guest::*;
pub use guest_book::*;

/// Percent-encodes a single path segment.
pub(crate) fn path_segment(value: &str) -> String {
	// `byte_serialize` escapes a literal `+`, so every remaining `+` stands for a space.
	url::form_urlencoded::byte_serialize(value.as_bytes()).collect::<String>().replace('+', "%20")
}
