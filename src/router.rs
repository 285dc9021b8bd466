use crate::{
	group::{GroupNode, RouterGroup},
	route::{Handler, Request, RouteTable},
	Context,
};
use anyhow::{Error, Result};
use hyper::{Body, Method, Response, StatusCode};
use std::{
	fmt::{self, Debug, Formatter},
	sync::Arc,
};
use tracing::{debug, warn};

/// A function that can convert an error returned from a handler chain into a response.
pub type InternalErrorHandler = fn(e: Error) -> Response<Body>;
fn default_error_handler(e: Error) -> Response<Body> {
	let mut res = Response::new(Body::from(e.to_string()));
	*res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
	res
}

fn default_not_found_handler(c: &mut Context) -> Result<()> {
	let text = format!("404 NOT FOUND: {}\n", c.path());
	c.string(StatusCode::NOT_FOUND, text);
	Ok(())
}

/// Owns the route table and every group, and dispatches requests through them.
///
/// Routes and groups are registered through `&mut` access during setup. Once the engine is
/// handed to [`HttpRouter`](crate::HttpRouter) or [`run`](Engine::run) it is shared read-only
/// between connections.
pub struct Engine {
	pub(crate) routes: RouteTable,
	pub(crate) groups: Vec<GroupNode>,
	not_found: Handler,
	internal_error: InternalErrorHandler,
	middleware_on_not_found: bool,
}

impl Default for Engine {
	fn default() -> Self {
		Self {
			routes: RouteTable::default(),
			groups: vec![GroupNode::root()],
			not_found: Arc::new(default_not_found_handler),
			internal_error: default_error_handler,
			middleware_on_not_found: true,
		}
	}
}

impl Engine {
	pub fn new() -> Self {
		Self::default()
	}

	/// The implicit group with an empty prefix.
	pub fn root(&mut self) -> RouterGroup<'_> {
		RouterGroup::new(self, 0)
	}

	pub fn group(&mut self, prefix: &str) -> RouterGroup<'_> {
		let index = self.create_group(0, prefix);
		RouterGroup::new(self, index)
	}

	pub(crate) fn create_group(&mut self, parent: usize, suffix: &str) -> usize {
		let prefix = format!("{}{}", self.groups[parent].prefix, suffix);
		debug!(prefix = %prefix, "group created");

		self.groups.push(GroupNode {
			prefix,
			middleware: Vec::new(),
			parent: Some(parent),
		});
		self.groups.len() - 1
	}

	pub fn use_middleware<H>(&mut self, middleware: H) -> &mut Self
	where
		H: Fn(&mut Context) -> Result<()> + Send + Sync + 'static,
	{
		self.root().use_middleware(middleware);
		self
	}

	pub fn add_route<H>(&mut self, method: Method, path: &str, handler: H) -> &mut Self
	where
		H: Fn(&mut Context) -> Result<()> + Send + Sync + 'static,
	{
		self.root().add_route(method, path, handler);
		self
	}

	pub fn get<H>(&mut self, path: &str, handler: H) -> &mut Self
	where
		H: Fn(&mut Context) -> Result<()> + Send + Sync + 'static,
	{
		self.add_route(Method::GET, path, handler)
	}

	pub fn post<H>(&mut self, path: &str, handler: H) -> &mut Self
	where
		H: Fn(&mut Context) -> Result<()> + Send + Sync + 'static,
	{
		self.add_route(Method::POST, path, handler)
	}

	pub fn put<H>(&mut self, path: &str, handler: H) -> &mut Self
	where
		H: Fn(&mut Context) -> Result<()> + Send + Sync + 'static,
	{
		self.add_route(Method::PUT, path, handler)
	}

	pub fn delete<H>(&mut self, path: &str, handler: H) -> &mut Self
	where
		H: Fn(&mut Context) -> Result<()> + Send + Sync + 'static,
	{
		self.add_route(Method::DELETE, path, handler)
	}

	pub fn patch<H>(&mut self, path: &str, handler: H) -> &mut Self
	where
		H: Fn(&mut Context) -> Result<()> + Send + Sync + 'static,
	{
		self.add_route(Method::PATCH, path, handler)
	}

	/// Replaces the handler that answers requests with no matching route.
	pub fn not_found_handler<H>(&mut self, handler: H) -> &mut Self
	where
		H: Fn(&mut Context) -> Result<()> + Send + Sync + 'static,
	{
		self.not_found = Arc::new(handler);
		self
	}

	pub fn internal_error_handler(&mut self, handler: InternalErrorHandler) -> &mut Self {
		self.internal_error = handler;
		self
	}

	/// Whether group middleware still runs, ahead of the not-found handler, when no route
	/// matches. Enabled by default.
	pub fn middleware_on_not_found(&mut self, enabled: bool) -> &mut Self {
		self.middleware_on_not_found = enabled;
		self
	}

	/// Collects the middleware of every group whose prefix is a string prefix of `path`.
	///
	/// Groups are scanned flat, in creation order, so any group whose prefix text matches
	/// contributes, whether or not it is an ancestor of another matching group.
	pub fn middleware_for(&self, path: &str) -> Vec<Handler> {
		self.groups
			.iter()
			.filter(|group| path.starts_with(&group.prefix))
			.flat_map(|group| group.middleware.iter().cloned())
			.collect()
	}

	/// Assembles the handler chain for `ctx` and runs it.
	///
	/// The chain is the matching middleware followed by the route's handler. Without a route the
	/// not-found handler takes the terminal position, behind the middleware unless
	/// [`middleware_on_not_found`](Engine::middleware_on_not_found) was disabled.
	pub fn execute(&self, ctx: &mut Context) -> Result<()> {
		let mut handlers = self.middleware_for(ctx.path());

		match self.routes.lookup(ctx.method(), ctx.path()) {
			Some(route) => handlers.push(Arc::clone(route)),
			None => {
				debug!(method = %ctx.method(), path = %ctx.path(), "no route matched");
				if !self.middleware_on_not_found {
					handlers.clear();
				}
				handlers.push(Arc::clone(&self.not_found));
			}
		}

		ctx.set_handlers(handlers);
		ctx.next()
	}

	/// Runs one request through its handler chain and produces the response.
	pub fn handle(&self, mut ctx: Context) -> Response<Body> {
		match self.execute(&mut ctx) {
			Ok(()) => ctx.into_response(),
			Err(e) => {
				warn!(
					method = %ctx.method(),
					path = %ctx.path(),
					error = %e,
					"handler chain failed"
				);
				(self.internal_error)(e)
			}
		}
	}

	pub fn handle_request(&self, req: &Request) -> Response<Body> {
		self.handle(Context::from_request(req))
	}

	pub fn dispatch(&self, method: Method, path: &str) -> Response<Body> {
		self.handle(Context::new(method, path))
	}
}

impl Debug for Engine {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Engine")
			.field("routes", &self.routes)
			.field(
				"groups",
				&self.groups.iter().map(|g| g.prefix.as_str()).collect::<Vec<_>>(),
			)
			.field("middleware_on_not_found", &self.middleware_on_not_found)
			.finish()
	}
}

#[cfg(test)]
mod test {
	use super::Engine;
	use crate::Context;
	use anyhow::anyhow;
	use hyper::{Method, StatusCode};
	use std::sync::{Arc, Mutex};

	type Log = Arc<Mutex<Vec<String>>>;

	fn mark(
		log: &Log,
		name: &'static str,
	) -> impl Fn(&mut Context) -> anyhow::Result<()> + Send + Sync + 'static {
		let log = Arc::clone(log);
		move |c: &mut Context| -> anyhow::Result<()> {
			log.lock().unwrap().push(format!("{} before", name));
			c.next()?;
			log.lock().unwrap().push(format!("{} after", name));
			Ok(())
		}
	}

	fn terminal(
		log: &Log,
		name: &'static str,
	) -> impl Fn(&mut Context) -> anyhow::Result<()> + Send + Sync + 'static {
		let log = Arc::clone(log);
		move |c: &mut Context| -> anyhow::Result<()> {
			log.lock().unwrap().push(name.to_owned());
			c.string(StatusCode::OK, name);
			Ok(())
		}
	}

	fn run(engine: &Engine, method: Method, path: &str) -> Context {
		let mut ctx = Context::new(method, path);
		engine.execute(&mut ctx).unwrap();
		ctx
	}

	fn entries(log: &Log) -> Vec<String> {
		std::mem::take(&mut *log.lock().unwrap())
	}

	#[test]
	fn resolves_registered_routes() {
		let log = Log::default();
		let mut engine = Engine::new();
		engine
			.get("/hello", terminal(&log, "get hello"))
			.post("/hello", terminal(&log, "post hello"));

		let ctx = run(&engine, Method::GET, "/hello");
		assert_eq!(ctx.status_code(), StatusCode::OK);
		assert_eq!(ctx.body(), b"get hello");
		assert_eq!(entries(&log), vec!["get hello"]);

		run(&engine, Method::POST, "/hello");
		assert_eq!(entries(&log), vec!["post hello"]);
	}

	#[test]
	fn reregistration_replaces_handler() {
		let log = Log::default();
		let mut engine = Engine::new();
		engine.get("/hello", terminal(&log, "old"));
		engine.get("/hello", terminal(&log, "new"));

		run(&engine, Method::GET, "/hello");
		assert_eq!(entries(&log), vec!["new"]);
	}

	#[test]
	fn unmatched_request_is_not_found() {
		let log = Log::default();
		let mut engine = Engine::new();
		engine.get("/hello", terminal(&log, "hello"));

		let ctx = run(&engine, Method::GET, "/missing");
		assert_eq!(ctx.status_code(), StatusCode::NOT_FOUND);
		assert_eq!(ctx.body(), b"404 NOT FOUND: /missing\n");

		let ctx = run(&engine, Method::POST, "/hello");
		assert_eq!(ctx.status_code(), StatusCode::NOT_FOUND);
		assert!(entries(&log).is_empty());
	}

	#[test]
	fn nested_group_middleware_runs_ancestor_first() {
		let log = Log::default();
		let mut engine = Engine::new();
		let mut api = engine.group("/api");
		api.use_middleware(mark(&log, "api"));
		api.group("/v1")
			.use_middleware(mark(&log, "v1"))
			.get("/users", terminal(&log, "users"));

		run(&engine, Method::GET, "/api/v1/users");
		assert_eq!(
			entries(&log),
			vec!["api before", "v1 before", "users", "v1 after", "api after"]
		);
	}

	#[test]
	fn root_middleware_applies_everywhere() {
		let log = Log::default();
		let mut engine = Engine::new();
		engine
			.use_middleware(mark(&log, "root"))
			.get("/", terminal(&log, "index"));
		engine.group("/admin").get("/dash", terminal(&log, "dash"));

		run(&engine, Method::GET, "/admin/dash");
		assert_eq!(entries(&log), vec!["root before", "dash", "root after"]);

		run(&engine, Method::GET, "/");
		assert_eq!(entries(&log), vec!["root before", "index", "root after"]);
	}

	#[test]
	fn prefix_match_is_textual() {
		let log = Log::default();
		let mut engine = Engine::new();
		engine.group("/api").use_middleware(mark(&log, "api"));
		engine.group("/apix").use_middleware(mark(&log, "apix"));
		engine.group("/docs").use_middleware(mark(&log, "docs"));
		engine.get("/apix/list", terminal(&log, "list"));

		run(&engine, Method::GET, "/apix/list");
		assert_eq!(
			entries(&log),
			vec!["api before", "apix before", "list", "apix after", "api after"]
		);
	}

	#[test]
	fn middleware_follows_group_creation_order() {
		let log = Log::default();
		let mut engine = Engine::new();
		engine.group("/a/b").use_middleware(mark(&log, "a/b"));
		engine
			.group("/a")
			.use_middleware(mark(&log, "a"))
			.get("/b/x", terminal(&log, "x"));

		run(&engine, Method::GET, "/a/b/x");
		assert_eq!(
			entries(&log),
			vec!["a/b before", "a before", "x", "a after", "a/b after"]
		);
	}

	#[test]
	fn disjoint_siblings_never_share_a_request() {
		let log = Log::default();
		let mut engine = Engine::new();
		let mut v = engine.group("/v");
		v.group("/1").use_middleware(mark(&log, "one")).get("/x", terminal(&log, "x1"));
		v.group("/2").use_middleware(mark(&log, "two")).get("/x", terminal(&log, "x2"));

		run(&engine, Method::GET, "/v/1/x");
		assert_eq!(entries(&log), vec!["one before", "x1", "one after"]);

		run(&engine, Method::GET, "/v/2/x");
		assert_eq!(entries(&log), vec!["two before", "x2", "two after"]);
	}

	#[test]
	fn middleware_wraps_route_handler() {
		let log = Log::default();
		let mut engine = Engine::new();
		let after_log = Arc::clone(&log);
		engine
			.group("/admin")
			.use_middleware(move |c: &mut Context| {
				after_log.lock().unwrap().push("m before".to_owned());
				c.next()?;
				c.set_header("x-admin", "1")?;
				after_log.lock().unwrap().push("m after".to_owned());
				Ok(())
			})
			.get("/dash", terminal(&log, "dash"));

		let ctx = run(&engine, Method::GET, "/admin/dash");
		assert_eq!(entries(&log), vec!["m before", "dash", "m after"]);
		assert_eq!(ctx.response_headers()["x-admin"], "1");
	}

	#[test]
	fn short_circuit_skips_handler() {
		let log = Log::default();
		let mut engine = Engine::new();
		engine
			.group("/admin")
			.use_middleware(|c: &mut Context| {
				if c.header("authorization").is_none() {
					c.fail(StatusCode::UNAUTHORIZED, "unauthorized");
					return Ok(());
				}
				c.next()
			})
			.use_middleware(mark(&log, "inner"))
			.get("/dash", terminal(&log, "dash"));

		let ctx = run(&engine, Method::GET, "/admin/dash");
		assert_eq!(ctx.status_code(), StatusCode::UNAUTHORIZED);
		assert!(entries(&log).is_empty());
	}

	#[test]
	fn middleware_runs_before_not_found_by_default() {
		let log = Log::default();
		let mut engine = Engine::new();
		engine.use_middleware(mark(&log, "root"));

		let ctx = run(&engine, Method::GET, "/missing");
		assert_eq!(ctx.status_code(), StatusCode::NOT_FOUND);
		assert_eq!(entries(&log), vec!["root before", "root after"]);
	}

	#[test]
	fn not_found_can_skip_middleware() {
		let log = Log::default();
		let mut engine = Engine::new();
		engine
			.use_middleware(mark(&log, "root"))
			.middleware_on_not_found(false);

		let ctx = run(&engine, Method::GET, "/missing");
		assert_eq!(ctx.status_code(), StatusCode::NOT_FOUND);
		assert!(entries(&log).is_empty());
	}

	#[test]
	fn custom_not_found_handler() {
		let mut engine = Engine::new();
		engine.not_found_handler(|c: &mut Context| {
			let path = c.path().to_owned();
			c.json(StatusCode::NOT_FOUND, &serde_json::json!({ "missing": path }))
		});

		let ctx = run(&engine, Method::DELETE, "/gone");
		assert_eq!(ctx.body(), br#"{"missing":"/gone"}"#);
	}

	#[test]
	fn errors_become_internal_errors() {
		let mut engine = Engine::new();
		engine.get("/broken", |_: &mut Context| Err(anyhow!("database unavailable")));

		let mut ctx = Context::new(Method::GET, "/broken");
		let err = engine.execute(&mut ctx).unwrap_err();
		assert_eq!(err.to_string(), "database unavailable");

		let res = engine.dispatch(Method::GET, "/broken");
		assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
	}

	#[test]
	fn custom_internal_error_handler() {
		fn teapot(_: anyhow::Error) -> hyper::Response<hyper::Body> {
			let mut res = hyper::Response::default();
			*res.status_mut() = StatusCode::IM_A_TEAPOT;
			res
		}

		let mut engine = Engine::new();
		engine
			.internal_error_handler(teapot)
			.get("/broken", |_: &mut Context| Err(anyhow!("nope")));

		assert_eq!(engine.dispatch(Method::GET, "/broken").status(), StatusCode::IM_A_TEAPOT);
		assert_eq!(engine.dispatch(Method::GET, "/other").status(), StatusCode::NOT_FOUND);
	}

	#[test]
	fn middleware_selection_is_exposed() {
		let log = Log::default();
		let mut engine = Engine::new();
		engine.group("/a").use_middleware(mark(&log, "a"));
		engine.group("/b").use_middleware(mark(&log, "b"));

		assert_eq!(engine.middleware_for("/a/1").len(), 1);
		assert_eq!(engine.middleware_for("/c").len(), 0);
		assert_eq!(
			format!("{:?}", engine),
			r#"Engine { routes: {}, groups: ["", "/a", "/b"], middleware_on_not_found: true }"#
		);
	}
}
