use crate::{route::Handler, Context, Engine};
use anyhow::Result;
use hyper::Method;
use std::sync::Arc;

/// A path-prefix scope and the middleware registered on it.
///
/// The prefix is the concatenation of every ancestor's suffix, fixed at creation.
pub(crate) struct GroupNode {
	pub(crate) prefix: String,
	pub(crate) middleware: Vec<Handler>,
	pub(crate) parent: Option<usize>,
}

impl GroupNode {
	pub(crate) fn root() -> Self {
		Self {
			prefix: String::new(),
			middleware: Vec::new(),
			parent: None,
		}
	}
}

/// A handle for registering routes, middleware and nested groups under a prefix.
///
/// Handles borrow the engine mutably, so all registration has to finish before the engine is
/// handed to the server.
pub struct RouterGroup<'a> {
	engine: &'a mut Engine,
	index: usize,
}

impl<'a> RouterGroup<'a> {
	pub(crate) fn new(engine: &'a mut Engine, index: usize) -> Self {
		Self { engine, index }
	}

	fn node(&self) -> &GroupNode {
		&self.engine.groups[self.index]
	}

	pub fn prefix(&self) -> &str {
		&self.node().prefix
	}

	pub fn parent_prefix(&self) -> Option<&str> {
		self.node()
			.parent
			.map(|parent| self.engine.groups[parent].prefix.as_str())
	}

	/// Creates a group nested under this one, with `suffix` appended to this group's prefix.
	pub fn group(&mut self, suffix: &str) -> RouterGroup<'_> {
		let index = self.engine.create_group(self.index, suffix);
		RouterGroup::new(self.engine, index)
	}

	/// Appends middleware to this group. Middleware runs in the order it was added.
	pub fn use_middleware<H>(&mut self, middleware: H) -> &mut Self
	where
		H: Fn(&mut Context) -> Result<()> + Send + Sync + 'static,
	{
		self.engine.groups[self.index]
			.middleware
			.push(Arc::new(middleware));
		self
	}

	/// Registers a terminal handler for `method` at this group's prefix followed by `suffix`.
	pub fn add_route<H>(&mut self, method: Method, suffix: &str, handler: H) -> &mut Self
	where
		H: Fn(&mut Context) -> Result<()> + Send + Sync + 'static,
	{
		let path = format!("{}{}", self.prefix(), suffix);
		self.engine.routes.register(method, path, Arc::new(handler));
		self
	}

	pub fn get<H>(&mut self, suffix: &str, handler: H) -> &mut Self
	where
		H: Fn(&mut Context) -> Result<()> + Send + Sync + 'static,
	{
		self.add_route(Method::GET, suffix, handler)
	}

	pub fn post<H>(&mut self, suffix: &str, handler: H) -> &mut Self
	where
		H: Fn(&mut Context) -> Result<()> + Send + Sync + 'static,
	{
		self.add_route(Method::POST, suffix, handler)
	}

	pub fn put<H>(&mut self, suffix: &str, handler: H) -> &mut Self
	where
		H: Fn(&mut Context) -> Result<()> + Send + Sync + 'static,
	{
		self.add_route(Method::PUT, suffix, handler)
	}

	pub fn delete<H>(&mut self, suffix: &str, handler: H) -> &mut Self
	where
		H: Fn(&mut Context) -> Result<()> + Send + Sync + 'static,
	{
		self.add_route(Method::DELETE, suffix, handler)
	}

	pub fn patch<H>(&mut self, suffix: &str, handler: H) -> &mut Self
	where
		H: Fn(&mut Context) -> Result<()> + Send + Sync + 'static,
	{
		self.add_route(Method::PATCH, suffix, handler)
	}
}
