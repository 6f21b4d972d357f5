//! Invitation (guest) lookups.

// self
use crate::{
	_prelude::*,
	api,
	client::ApiClient,
	http::{ApiRequest, ApiTransport},
};

/// Invited guest as returned by the invitation endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
	/// Guest identifier.
	pub id: String,
	/// Owner of the invitation list.
	pub user_id: String,
	/// Full name.
	pub realname: String,
	/// Nickname used in invitation links.
	#[serde(default)]
	pub nickname: Option<String>,
	/// Facebook profile link.
	#[serde(default)]
	pub facebook: Option<String>,
	/// Email address.
	#[serde(default)]
	pub email: Option<String>,
	/// Phone number.
	#[serde(default)]
	pub phone: Option<String>,
	/// Personal invitation message.
	#[serde(default)]
	pub content: Option<String>,
}

/// Builds the lookup request for a guest by nickname.
pub fn guest_by_nickname_request(nickname: &str) -> ApiRequest {
	ApiRequest::get(format!("/guest/{}", api::path_segment(nickname)))
}

impl<T> ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Looks up a guest by nickname.
	pub async fn guest_by_nickname(&self, nickname: &str) -> Result<Guest> {
		let request = guest_by_nickname_request(nickname);
		let path = request.path.clone();

		self.dispatch(request).await?.error_for_status(&path)?.json()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::http::Method;

	#[test]
	fn nickname_is_escaped_into_the_path() {
		let request = guest_by_nickname_request("co dau");

		assert_eq!(request.method, Method::Get);
		assert_eq!(request.path, "/guest/co%20dau");
	}

	#[test]
	fn guest_tolerates_missing_optional_fields() {
		let guest: Guest = serde_json::from_str(
			"{\"id\":\"g1\",\"user_id\":\"u1\",\"realname\":\"Tran Minh\",\"created_at\":\"x\"}",
		)
		.expect("Guest fixture should deserialize.");

		assert_eq!(guest.realname, "Tran Minh");
		assert!(guest.nickname.is_none());
	}
}
