use crate::route::{Handler, Request};
use anyhow::Result;
use hyper::{
	header::{self, HeaderMap, HeaderName, HeaderValue},
	Body, Method, StatusCode,
};
use serde::Serialize;

/// Per-request state: the inbound method and path, the handler chain assembled for the request,
/// and the response being built.
///
/// The chain is fixed before execution starts. Handlers only steer control flow through
/// [`next`](Context::next) and [`abort`](Context::abort); the cursor never moves backwards, so each
/// link runs at most once and always in chain order.
pub struct Context {
	method: Method,
	path: String,
	query: Option<String>,
	request_headers: HeaderMap,

	handlers: Vec<Handler>,
	index: usize,
	aborted: bool,

	status: StatusCode,
	headers: HeaderMap,
	body: Vec<u8>,
}

impl Context {
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: None,
			request_headers: HeaderMap::new(),
			handlers: Vec::new(),
			index: 0,
			aborted: false,
			status: StatusCode::OK,
			headers: HeaderMap::new(),
			body: Vec::new(),
		}
	}

	pub fn from_request(req: &Request) -> Self {
		let mut ctx = Self::new(req.method().clone(), req.uri().path());
		ctx.query = req.uri().query().map(str::to_owned);
		ctx.request_headers = req.headers().clone();
		ctx
	}

	/// Installs the handler chain. The dispatcher calls this once, before the first `next`.
	pub(crate) fn set_handlers(&mut self, handlers: Vec<Handler>) {
		self.handlers = handlers;
		self.index = 0;
		self.aborted = false;
	}

	/// Runs the next link of the chain, if any remain.
	///
	/// Propagation is explicit: a handler that returns without calling `next` stops the chain, and
	/// none of the later middleware or the terminal handler run. Work placed after the call runs
	/// once the rest of the chain has returned, which is how timing, logging and recovery
	/// middleware wrap the handlers below them.
	///
	/// Errors returned further down the chain come back through here unchanged.
	pub fn next(&mut self) -> Result<()> {
		match self.handlers.get(self.index).cloned() {
			Some(handler) => {
				self.index += 1;
				handler(self)
			}
			None => Ok(()),
		}
	}

	/// Skips every link that has not run yet. Later calls to `next` are no-ops.
	pub fn abort(&mut self) {
		self.index = self.handlers.len();
		self.aborted = true;
	}

	/// Whether [`abort`](Context::abort) or [`fail`](Context::fail) was called. A chain that ran
	/// to its end is not aborted.
	pub fn is_aborted(&self) -> bool {
		self.aborted
	}

	pub fn method(&self) -> &Method {
		&self.method
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	/// The query string exactly as received, without the leading `?`.
	pub fn raw_query(&self) -> Option<&str> {
		self.query.as_deref()
	}

	pub fn header(&self, name: &str) -> Option<&str> {
		self.request_headers
			.get(name)
			.and_then(|value| value.to_str().ok())
	}

	pub fn status(&mut self, code: StatusCode) {
		self.status = code;
	}

	pub fn set_header(&mut self, key: &str, value: &str) -> Result<()> {
		let name = HeaderName::from_bytes(key.as_bytes())?;
		let value = HeaderValue::from_str(value)?;
		self.headers.insert(name, value);
		Ok(())
	}

	/// Writes a raw body, replacing anything written before.
	pub fn data(&mut self, code: StatusCode, data: impl Into<Vec<u8>>) {
		self.status(code);
		self.body = data.into();
	}

	pub fn string(&mut self, code: StatusCode, text: impl Into<String>) {
		self.content_type("text/plain; charset=utf-8");
		self.data(code, text.into());
	}

	pub fn html(&mut self, code: StatusCode, html: impl Into<String>) {
		self.content_type("text/html; charset=utf-8");
		self.data(code, html.into());
	}

	pub fn json<T>(&mut self, code: StatusCode, value: &T) -> Result<()>
	where
		T: Serialize + ?Sized,
	{
		let body = serde_json::to_vec(value)?;
		self.content_type("application/json");
		self.data(code, body);
		Ok(())
	}

	/// Aborts the chain and answers with `{"message": ...}`.
	pub fn fail(&mut self, code: StatusCode, message: &str) {
		self.abort();
		self.content_type("application/json");
		self.data(code, serde_json::json!({ "message": message }).to_string());
	}

	pub fn status_code(&self) -> StatusCode {
		self.status
	}

	pub fn response_headers(&self) -> &HeaderMap {
		&self.headers
	}

	pub fn body(&self) -> &[u8] {
		&self.body
	}

	/// Drops everything written to the response so far.
	pub(crate) fn reset_response(&mut self) {
		self.status = StatusCode::OK;
		self.headers.clear();
		self.body.clear();
	}

	pub fn into_response(self) -> hyper::Response<Body> {
		let mut res = hyper::Response::new(Body::from(self.body));
		*res.status_mut() = self.status;
		*res.headers_mut() = self.headers;
		res
	}

	fn content_type(&mut self, value: &'static str) {
		self.headers
			.insert(header::CONTENT_TYPE, HeaderValue::from_static(value));
	}
}
