//! Form body parsing for `application/x-www-form-urlencoded` and
//! `multipart/form-data` requests.

use bytes::Bytes;
use futures_util::stream::once;
use std::collections::HashMap;
use std::future::ready;

use crate::{Error, Request, Result};

const URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART: &str = "multipart/form-data";

/// A file part of a multipart form
#[derive(Debug, Clone)]
pub struct UploadedFile {
	/// Filename as sent by the client, unsanitized
	pub filename: String,
	pub content_type: Option<String>,
	pub data: Bytes,
}

/// Parsed form fields and uploaded files.
///
/// Repeated text fields keep the last value.
#[derive(Debug, Default, Clone)]
pub struct FormData {
	fields: HashMap<String, String>,
	files: HashMap<String, UploadedFile>,
}

impl FormData {
	/// Parse the body of `request`.
	///
	/// An empty body parses to an empty form regardless of content type.
	/// File parts submitted without a filename (an empty file input) are
	/// dropped.
	///
	/// # Errors
	///
	/// [`Error::BadRequest`] for unsupported content types or malformed bodies.
	///
	/// # Examples
	///
	/// ```
	/// use newsdesk_http::{FormData, Request};
	/// use hyper::Method;
	///
	/// # tokio_test_block(async {
	/// let request = Request::builder()
	///     .method(Method::POST)
	///     .header("Content-Type", "application/x-www-form-urlencoded")
	///     .body("title=Hello+world&description=Body")
	///     .build()
	///     .unwrap();
	///
	/// let form = FormData::from_request(&request).await.unwrap();
	/// assert_eq!(form.field("title"), Some("Hello world"));
	/// # });
	/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
	/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
	/// # }
	/// ```
	pub async fn from_request(request: &Request) -> Result<Self> {
		if request.body.is_empty() {
			return Ok(Self::default());
		}

		match request.content_type().as_deref() {
			Some(URLENCODED) => Self::from_urlencoded(&request.body),
			Some(MULTIPART) => {
				let content_type = request.header("content-type").unwrap_or_default();
				Self::from_multipart(content_type, request.body.clone()).await
			}
			other => Err(Error::BadRequest(format!(
				"Expected {URLENCODED} or {MULTIPART}, got {}",
				other.unwrap_or("no content type")
			))),
		}
	}

	fn from_urlencoded(body: &[u8]) -> Result<Self> {
		let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
			.map_err(|e| Error::BadRequest(format!("Invalid form body: {e}")))?;
		Ok(Self {
			fields: pairs.into_iter().collect(),
			files: HashMap::new(),
		})
	}

	async fn from_multipart(content_type: &str, body: Bytes) -> Result<Self> {
		let boundary = multer::parse_boundary(content_type)
			.map_err(|e| Error::BadRequest(format!("Failed to parse boundary: {e}")))?;

		let stream = once(ready(Ok::<_, std::io::Error>(body)));
		let mut multipart = multer::Multipart::new(stream, boundary);

		let mut form = Self::default();
		while let Some(field) = multipart
			.next_field()
			.await
			.map_err(|e| Error::BadRequest(format!("Failed to read multipart field: {e}")))?
		{
			let Some(name) = field.name().map(str::to_string) else {
				continue;
			};

			match field.file_name().map(str::to_string) {
				None => {
					let text = field
						.text()
						.await
						.map_err(|e| Error::BadRequest(format!("Failed to read text field: {e}")))?;
					form.fields.insert(name, text);
				}
				Some(filename) => {
					let content_type = field.content_type().map(|m| m.to_string());
					let data = field
						.bytes()
						.await
						.map_err(|e| Error::BadRequest(format!("Failed to read file field: {e}")))?;
					if filename.is_empty() {
						continue;
					}
					form.files.insert(
						name,
						UploadedFile {
							filename,
							content_type,
							data,
						},
					);
				}
			}
		}
		Ok(form)
	}

	/// Text field by name
	pub fn field(&self, name: &str) -> Option<&str> {
		self.fields.get(name).map(String::as_str)
	}

	/// Text field that must be present.
	///
	/// # Errors
	///
	/// [`Error::BadRequest`] naming the missing field.
	pub fn required(&self, name: &str) -> Result<&str> {
		self.field(name)
			.ok_or_else(|| Error::BadRequest(format!("Missing form field: {name}")))
	}

	pub fn file(&self, name: &str) -> Option<&UploadedFile> {
		self.files.get(name)
	}

	/// Remove and return a file part
	pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
		self.files.remove(name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use hyper::Method;
	use rstest::rstest;

	const BOUNDARY: &str = "----newsdeskboundary";

	fn multipart_body(parts: &[(&str, Option<&str>, &str)]) -> String {
		let mut body = String::new();
		for (name, filename, content) in parts {
			body.push_str(&format!("--{BOUNDARY}\r\n"));
			match filename {
				Some(filename) => {
					body.push_str(&format!(
						"Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
					));
					body.push_str("Content-Type: image/png\r\n\r\n");
				}
				None => {
					body.push_str(&format!(
						"Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
					));
				}
			}
			body.push_str(content);
			body.push_str("\r\n");
		}
		body.push_str(&format!("--{BOUNDARY}--\r\n"));
		body
	}

	fn post(content_type: &str, body: impl Into<Bytes>) -> Request {
		Request::builder()
			.method(Method::POST)
			.uri("/admin")
			.header("Content-Type", content_type)
			.body(body)
			.build()
			.unwrap()
	}

	#[rstest]
	#[tokio::test]
	async fn test_urlencoded_fields() {
		let request = post(URLENCODED, "title=A%26B&description=x+y&title=Last");

		let form = FormData::from_request(&request).await.unwrap();

		assert_eq!(form.field("title"), Some("Last"));
		assert_eq!(form.field("description"), Some("x y"));
		assert!(form.file("image").is_none());
	}

	#[rstest]
	#[tokio::test]
	async fn test_multipart_text_and_file() {
		let body = multipart_body(&[
			("title", None, "Headline"),
			("image", Some("cat.png"), "PNGDATA"),
		]);
		let request = post(&format!("{MULTIPART}; boundary={BOUNDARY}"), body);

		let mut form = FormData::from_request(&request).await.unwrap();

		assert_eq!(form.field("title"), Some("Headline"));
		let file = form.take_file("image").unwrap();
		assert_eq!(file.filename, "cat.png");
		assert_eq!(file.content_type.as_deref(), Some("image/png"));
		assert_eq!(&file.data[..], b"PNGDATA");
		assert!(form.file("image").is_none());
	}

	#[rstest]
	#[tokio::test]
	async fn test_multipart_empty_file_input_is_skipped() {
		let body = multipart_body(&[("title", None, "T"), ("image", Some(""), "")]);
		let request = post(&format!("{MULTIPART}; boundary={BOUNDARY}"), body);

		let form = FormData::from_request(&request).await.unwrap();

		assert!(form.file("image").is_none());
	}

	#[rstest]
	#[tokio::test]
	async fn test_empty_body_is_empty_form() {
		let request = Request::builder().method(Method::POST).build().unwrap();

		let form = FormData::from_request(&request).await.unwrap();

		assert!(form.field("title").is_none());
	}

	#[rstest]
	#[tokio::test]
	async fn test_unsupported_content_type() {
		let request = post("application/json", "{}");

		let result = FormData::from_request(&request).await;

		assert!(matches!(result, Err(Error::BadRequest(_))));
	}

	#[rstest]
	#[tokio::test]
	async fn test_required_field_missing() {
		let request = post(URLENCODED, "title=x");
		let form = FormData::from_request(&request).await.unwrap();

		let err = form.required("description").unwrap_err();

		assert!(err.to_string().contains("description"));
	}
}
