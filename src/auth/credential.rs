//! Access/refresh credential pair and the wire payloads that mint it.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Access + refresh credentials issued together by the backend.
///
/// The pair is only ever replaced as a whole, so a reader holding a clone always sees credentials
/// that were issued together.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
	/// Short-lived credential attached to every API call.
	pub access_token: TokenSecret,
	/// Longer-lived credential presented to the refresh endpoint.
	pub refresh_token: TokenSecret,
	/// Instant the pair was installed locally.
	#[serde(default = "OffsetDateTime::now_utc")]
	pub obtained_at: OffsetDateTime,
}
impl CredentialPair {
	/// Creates a pair stamped with the current clock.
	pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: TokenSecret::new(refresh_token),
			obtained_at: OffsetDateTime::now_utc(),
		}
	}

	/// Overrides the installation instant.
	pub fn with_obtained_at(mut self, instant: OffsetDateTime) -> Self {
		self.obtained_at = instant;

		self
	}

	/// Returns the access credential when it carries a usable value.
	pub fn usable_access_token(&self) -> Option<&TokenSecret> {
		(!self.access_token.is_empty()).then_some(&self.access_token)
	}
}
impl Debug for CredentialPair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialPair")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.field("obtained_at", &self.obtained_at)
			.finish()
	}
}

/// Credentials returned by the login and refresh endpoints.
#[derive(Clone, Deserialize)]
pub struct TokenGrant {
	/// Newly minted access credential.
	pub access_token: TokenSecret,
	/// Rotated refresh credential; absent when the server keeps the previous one alive.
	#[serde(default)]
	pub refresh_token: Option<TokenSecret>,
}
impl TokenGrant {
	/// Builds the pair to install, keeping `previous_refresh` when the server did not rotate it.
	pub fn into_pair(self, previous_refresh: Option<&TokenSecret>) -> Option<CredentialPair> {
		let refresh_token = self
			.refresh_token
			.filter(|secret| !secret.is_empty())
			.or_else(|| previous_refresh.cloned())?;

		Some(CredentialPair {
			access_token: self.access_token,
			refresh_token,
			obtained_at: OffsetDateTime::now_utc(),
		})
	}
}
impl Debug for TokenGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenGrant")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn grant_without_rotation_keeps_previous_refresh() {
		let grant: TokenGrant = serde_json::from_str("{\"access_token\":\"access-new\"}")
			.expect("Grant fixture should deserialize.");
		let previous = TokenSecret::new("refresh-old");
		let pair = grant.into_pair(Some(&previous)).expect("Previous refresh should be reused.");

		assert_eq!(pair.access_token.expose(), "access-new");
		assert_eq!(pair.refresh_token.expose(), "refresh-old");
	}

	#[test]
	fn grant_without_any_refresh_is_rejected() {
		let grant: TokenGrant =
			serde_json::from_str("{\"access_token\":\"access-new\",\"refresh_token\":\"\"}")
				.expect("Grant fixture should deserialize.");

		assert!(grant.into_pair(None).is_none());
	}

	#[test]
	fn pair_debug_redacts_secrets() {
		let pair = CredentialPair::new("access", "refresh")
			.with_obtained_at(macros::datetime!(2025-01-01 00:00 UTC));
		let rendered = format!("{pair:?}");

		assert!(!rendered.contains("access\""));
		assert!(rendered.contains("<redacted>"));
	}

	#[test]
	fn blank_access_token_is_not_usable() {
		let pair = CredentialPair::new(" ", "refresh");

		assert!(pair.usable_access_token().is_none());
	}
}
