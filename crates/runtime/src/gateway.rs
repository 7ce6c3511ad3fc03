//! Authenticated HTTPS requests against the local client API.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::logging::Logger;

/// Endpoint used to check that the service is up and accepts our credentials.
pub const HEALTH_CHECK_PATH: &str = "/lol-summoner/v1/current-summoner";

/// Fully buffered HTTP response.
///
/// Status interpretation is left to callers.
#[derive(Debug, Clone)]
pub struct Response {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl Response {
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Body as text, with invalid UTF-8 replaced.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
		Ok(serde_json::from_slice(&self.body)?)
	}
}

/// Sends requests through the shared HTTPS client with session credentials.
pub struct RequestGateway {
	http: reqwest::Client,
	base: Url,
	auth: HeaderValue,
	trace: bool,
	logger: Arc<dyn Logger>,
}

impl RequestGateway {
	/// `trace` logs every request and response body under the endpoint scope.
	pub fn new(http: reqwest::Client, credentials: &Credentials, trace: bool, logger: Arc<dyn Logger>) -> Result<Self> {
		let base = Url::parse(&credentials.base_url())
			.map_err(|e| Error::Connection(format!("invalid base URL for port {}: {e}", credentials.port)))?;
		let mut auth = HeaderValue::from_str(&credentials.authorization())
			.map_err(|e| Error::Connection(format!("password is not a valid header value: {e}")))?;
		auth.set_sensitive(true);

		Ok(Self {
			http,
			base,
			auth,
			trace,
			logger,
		})
	}

	pub fn base_url(&self) -> &Url {
		&self.base
	}

	/// Resolves `path` against the base URL; the leading `/` is optional.
	pub fn url(&self, path: &str) -> Result<Url> {
		self.base
			.join(path.trim_start_matches('/'))
			.map_err(|e| Error::Transport(format!("invalid endpoint {path:?}: {e}")))
	}

	pub async fn request(&self, method: Method, path: &str, body: Option<Bytes>) -> Result<Response> {
		let url = self.url(path)?;

		if self.trace {
			self.logger.debug(path, format_args!("{method} {url}"));
			if let Some(body) = &body {
				self.logger.debug(path, format_args!("request body: {}", String::from_utf8_lossy(body)));
			}
		}

		let mut builder = self
			.http
			.request(method, url)
			.header(AUTHORIZATION, self.auth.clone())
			.header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		if let Some(body) = body {
			builder = builder.body(body);
		}

		let response = builder.send().await?;
		let status = response.status();
		let headers = response.headers().clone();
		let body = response.bytes().await?;

		if self.trace {
			self.logger.debug(path, format_args!("response status: {status}"));
			self.logger.debug(path, format_args!("response body: {}", String::from_utf8_lossy(&body)));
		}

		Ok(Response { status, headers, body })
	}

	/// `GET` on [`HEALTH_CHECK_PATH`], returning the status.
	pub async fn check_health(&self) -> Result<StatusCode> {
		Ok(self.request(Method::GET, HEALTH_CHECK_PATH, None).await?.status)
	}

	/// `true` only when the health check answers 200.
	pub async fn is_healthy(&self) -> bool {
		match self.check_health().await {
			Ok(status) => {
				self.logger.debug("health", format_args!("health check status {status}"));
				status == StatusCode::OK
			}
			Err(err) => {
				self.logger.debug("health", format_args!("health check failed: {err}"));
				false
			}
		}
	}
}

impl std::fmt::Debug for RequestGateway {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RequestGateway")
			.field("base", &self.base.as_str())
			.field("trace", &self.trace)
			.finish_non_exhaustive()
	}
}
