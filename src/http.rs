use crate::{route::Request, Engine};
use anyhow::Result;
use hyper::{body::Body, service::Service, Server};
use std::{
	convert::Infallible,
	future::{ready, Ready},
	net::SocketAddr,
	sync::Arc,
	task::{Context, Poll},
};
use tracing::info;

pub use hyper;

/// Hands out a [`RouteHandler`] for every connection accepted by hyper.
#[derive(Debug)]
pub struct HttpRouter {
	engine: Arc<Engine>,
}

impl From<Engine> for HttpRouter {
	fn from(engine: Engine) -> Self {
		Self {
			engine: Arc::new(engine),
		}
	}
}

impl<T> Service<T> for HttpRouter {
	type Response = RouteHandler;
	type Error = Infallible;
	type Future = Ready<Result<Self::Response, Self::Error>>;

	fn poll_ready(&mut self, _: &mut Context) -> Poll<Result<(), Self::Error>> {
		Poll::Ready(Ok(()))
	}

	fn call(&mut self, _: T) -> Self::Future {
		ready(Ok(RouteHandler {
			engine: Arc::clone(&self.engine),
		}))
	}
}

/// Responsible for handling the actual HTTP requests from hyper.
#[derive(Debug, Clone)]
pub struct RouteHandler {
	engine: Arc<Engine>,
}

impl Service<Request> for RouteHandler {
	type Response = hyper::Response<Body>;
	type Error = Infallible;
	type Future = Ready<Result<Self::Response, Self::Error>>;

	fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		Poll::Ready(Ok(()))
	}

	fn call(&mut self, req: Request) -> Self::Future {
		ready(Ok(self.engine.handle_request(&req)))
	}
}

impl Engine {
	/// Serves this engine on `addr` until the server fails.
	pub async fn run(self, addr: &str) -> Result<()> {
		let addr: SocketAddr = addr.parse()?;
		let server = Server::try_bind(&addr)?.serve(HttpRouter::from(self));
		info!(%addr, "listening");

		server.await?;
		Ok(())
	}
}
