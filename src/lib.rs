//! A dead simple exact-match HTTP router with prefix-grouped middleware, built on hyper.
//!
//! ```no_run
//! use grove::{middleware, Context, Engine, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//! 	let mut engine = Engine::new();
//! 	engine.use_middleware(middleware::logger());
//! 	engine.get("/hello", |c: &mut Context| {
//! 		c.string(StatusCode::OK, "hello");
//! 		Ok(())
//! 	});
//!
//! 	let mut admin = engine.group("/admin");
//! 	admin.use_middleware(|c: &mut Context| {
//! 		if c.header("authorization").is_none() {
//! 			c.fail(StatusCode::UNAUTHORIZED, "unauthorized");
//! 			return Ok(());
//! 		}
//! 		c.next()
//! 	});
//! 	admin.get("/dash", |c: &mut Context| {
//! 		c.html(StatusCode::OK, "<h1>dashboard</h1>");
//! 		Ok(())
//! 	});
//!
//! 	engine.run("127.0.0.1:3000").await
//! }
//! ```
//!
//! Routes match on the exact method and path; there are no dynamic segments. Groups only select
//! middleware: a request picks up the middleware of every group whose prefix its path starts
//! with, in the order the groups were created, followed by the route's handler.
//!
//! Every link in the chain decides whether the rest of the chain runs by calling
//! [`Context::next`]. Not calling it ends the request there.
//!
//! The engine exposes `not_found_handler` and `internal_error_handler` which answer unmatched
//! requests and errors returned from handlers respectively.

mod http;
pub use http::*;

/// Per-request state and the chain-advance operation.
pub mod context;

/// Prefix groups and their registration handles.
pub mod group;

/// Built-in logging and panic recovery middleware.
pub mod middleware;

/// Handler types and the exact-match route table.
pub mod route;

/// The engine that owns routes and groups and dispatches requests.
pub mod router;

pub use context::Context;
pub use group::RouterGroup;
pub use route::*;
pub use router::*;
