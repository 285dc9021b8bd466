use crate::Context;
use anyhow::Result;
pub use hyper::{header, Body, Method, StatusCode};
use std::{
	collections::HashMap,
	fmt::{self, Debug, Formatter},
	sync::Arc,
};
use tracing::debug;

pub type Request = hyper::Request<Body>;

/// A link in a request's handler chain.
///
/// Middleware and terminal handlers share this shape. A handler continues the chain by calling
/// [`Context::next`]; returning without calling it ends the chain for the request.
pub type Handler = Arc<dyn Fn(&mut Context) -> Result<()> + Send + Sync>;

type Paths = HashMap<String, Handler>;

/// Exact-match registry from `(method, path)` to a terminal handler.
///
/// Paths are compared byte for byte: no trailing-slash collapsing, no case folding and no
/// dynamic segments.
#[derive(Default)]
pub struct RouteTable {
	routes: HashMap<Method, Paths>,
}

impl RouteTable {
	/// Inserts the handler for `(method, path)`, replacing any previous one.
	pub fn register(&mut self, method: Method, path: impl Into<String>, handler: Handler) {
		let path = path.into();
		debug!(method = %method, path = %path, "route registered");

		self.routes.entry(method).or_default().insert(path, handler);
	}

	pub fn lookup(&self, method: &Method, path: &str) -> Option<&Handler> {
		self.routes.get(method).and_then(|paths| paths.get(path))
	}

	pub fn len(&self) -> usize {
		self.routes.values().map(HashMap::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl Debug for RouteTable {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let keys = self.routes.iter().flat_map(|(method, paths)| {
			paths.keys().map(move |path| format!("{} {}", method, path))
		});
		f.debug_set().entries(keys).finish()
	}
}
