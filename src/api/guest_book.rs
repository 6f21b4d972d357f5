//! Guest-book entries: owner-side management and the public guest-side view.

// self
use crate::{
	_prelude::*,
	api,
	client::ApiClient,
	http::{ApiRequest, ApiTransport},
};

const COLLECTION: &str = "/guestbook/";

/// Guest-book entry left for a host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestBook {
	/// Entry identifier.
	pub id: String,
	/// Host the entry was written for.
	pub user_id: String,
	/// Display name of the author.
	pub guest_name: String,
	/// Message body.
	pub content: String,
	/// Attached image URL.
	#[serde(default)]
	pub image: Option<String>,
}

/// Fields of a new guest-book entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewGuestBook {
	/// Display name of the author.
	pub guest_name: String,
	/// Message body.
	pub content: String,
}
impl NewGuestBook {
	/// Creates the entry fields.
	pub fn new(guest_name: impl Into<String>, content: impl Into<String>) -> Self {
		Self { guest_name: guest_name.into(), content: content.into() }
	}

	fn form(&self) -> [(&'static str, String); 2] {
		[("guest_name", self.guest_name.clone()), ("content", self.content.clone())]
	}
}

/// Partial update of an existing entry; unset fields keep their stored value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GuestBookUpdate {
	/// Entry to update.
	pub guest_book_id: String,
	/// New author name.
	pub guest_name: Option<String>,
	/// New message body.
	pub content: Option<String>,
}
impl GuestBookUpdate {
	fn form(&self) -> Vec<(&'static str, String)> {
		let mut fields = vec![("guest_book_id", self.guest_book_id.clone())];

		fields.extend(self.guest_name.clone().map(|value| ("guest_name", value)));
		fields.extend(self.content.clone().map(|value| ("content", value)));

		fields
	}
}

/// Request builders for the guest-book endpoints.
#[derive(Clone, Copy, Debug)]
pub struct GuestBookRequests;
impl GuestBookRequests {
	/// Lists the authenticated host's entries.
	pub fn list() -> ApiRequest {
		ApiRequest::get(COLLECTION)
	}

	/// Fetches one entry.
	pub fn get(guest_book_id: &str) -> ApiRequest {
		ApiRequest::get(format!("{COLLECTION}{}", api::path_segment(guest_book_id)))
	}

	/// Creates an entry as the authenticated host.
	pub fn create(entry: &NewGuestBook) -> ApiRequest {
		ApiRequest::post(COLLECTION).with_form(entry.form())
	}

	/// Updates an entry.
	pub fn update(update: &GuestBookUpdate) -> ApiRequest {
		ApiRequest::put(COLLECTION).with_form(update.form())
	}

	/// Deletes several entries at once.
	pub fn delete<I, S>(guest_book_ids: I) -> ApiRequest
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let ids = guest_book_ids.into_iter().map(Into::into).collect::<Vec<String>>();

		ApiRequest::delete(COLLECTION).with_json(serde_json::json!({ "guest_book_ids": ids }))
	}

	/// Lists a host's entries from the public guest side.
	pub fn view(username: &str) -> ApiRequest {
		ApiRequest::get(format!("{COLLECTION}view/{}", api::path_segment(username)))
	}

	/// Leaves an entry for a host from the public guest side.
	pub fn sign(username: &str, entry: &NewGuestBook) -> ApiRequest {
		ApiRequest::post(format!("{COLLECTION}add/{}", api::path_segment(username)))
			.with_form(entry.form())
	}
}

impl<T> ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Lists the authenticated host's guest-book entries.
	pub async fn guest_books(&self) -> Result<Vec<GuestBook>> {
		self.fetch(GuestBookRequests::list()).await
	}

	/// Fetches one guest-book entry.
	pub async fn guest_book(&self, guest_book_id: &str) -> Result<GuestBook> {
		self.fetch(GuestBookRequests::get(guest_book_id)).await
	}

	/// Creates a guest-book entry as the authenticated host.
	pub async fn create_guest_book(&self, entry: &NewGuestBook) -> Result<GuestBook> {
		self.fetch(GuestBookRequests::create(entry)).await
	}

	/// Updates a guest-book entry.
	pub async fn update_guest_book(&self, update: &GuestBookUpdate) -> Result<GuestBook> {
		self.fetch(GuestBookRequests::update(update)).await
	}

	/// Deletes several guest-book entries.
	pub async fn delete_guest_books<I, S>(&self, guest_book_ids: I) -> Result<()>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let request = GuestBookRequests::delete(guest_book_ids);
		let path = request.path.clone();

		self.dispatch(request).await?.error_for_status(&path)?;

		Ok(())
	}

	/// Lists a host's entries from the public guest side.
	pub async fn public_guest_books(&self, username: &str) -> Result<Vec<GuestBook>> {
		self.fetch(GuestBookRequests::view(username)).await
	}

	/// Leaves an entry for a host from the public guest side.
	pub async fn sign_guest_book(&self, username: &str, entry: &NewGuestBook) -> Result<GuestBook> {
		self.fetch(GuestBookRequests::sign(username, entry)).await
	}

	async fn fetch<R>(&self, request: ApiRequest) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let path = request.path.clone();

		self.dispatch(request).await?.error_for_status(&path)?.json()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::http::{Method, RequestBody};

	fn form_of(request: &ApiRequest) -> Vec<(String, String)> {
		match &request.body {
			Some(RequestBody::Form(fields)) => fields.clone(),
			other => panic!("Expected a form body, got {other:?}."),
		}
	}

	#[test]
	fn update_sends_only_present_fields() {
		let request = GuestBookRequests::update(&GuestBookUpdate {
			guest_book_id: "gb-1".into(),
			content: Some("Chuc mung!".into()),
			..Default::default()
		});

		assert_eq!(request.method, Method::Put);
		assert_eq!(request.path, "/guestbook/");
		assert_eq!(form_of(&request), vec![
			("guest_book_id".to_owned(), "gb-1".to_owned()),
			("content".to_owned(), "Chuc mung!".to_owned()),
		]);
	}

	#[test]
	fn delete_carries_ids_in_json_body() {
		let request = GuestBookRequests::delete(["gb-1", "gb-2"]);

		assert_eq!(request.method, Method::Delete);
		assert_eq!(
			request.body,
			Some(RequestBody::Json(serde_json::json!({ "guest_book_ids": ["gb-1", "gb-2"] })))
		);
	}

	#[test]
	fn guest_side_paths_embed_the_host() {
		let entry = NewGuestBook::new("Lan", "Hanh phuc nhe");

		assert_eq!(GuestBookRequests::view("minh tu").path, "/guestbook/view/minh%20tu");

		let request = GuestBookRequests::sign("minhtu", &entry);

		assert_eq!(request.method, Method::Post);
		assert_eq!(request.path, "/guestbook/add/minhtu");
		assert_eq!(form_of(&request).len(), 2);
	}
}
