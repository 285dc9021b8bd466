use crate::Context;
use anyhow::Result;
use hyper::StatusCode;
use std::{
	any::Any,
	panic::{self, AssertUnwindSafe},
	time::Instant,
};
use tracing::{error, info};

/// Logs every request that passes through it along with the final status and elapsed time.
pub fn logger() -> impl Fn(&mut Context) -> Result<()> + Send + Sync + 'static {
	|c: &mut Context| -> Result<()> {
		let start = Instant::now();
		let res = c.next();

		info!(
			method = %c.method(),
			path = %c.path(),
			status = c.status_code().as_u16(),
			elapsed = ?start.elapsed(),
			"request handled"
		);
		res
	}
}

/// Catches panics raised further down the chain and answers with a 500.
///
/// Errors returned by handlers are not touched; they still reach the engine's internal error
/// handler.
pub fn recovery() -> impl Fn(&mut Context) -> Result<()> + Send + Sync + 'static {
	|c: &mut Context| -> Result<()> {
		match panic::catch_unwind(AssertUnwindSafe(|| c.next())) {
			Ok(res) => res,
			Err(payload) => {
				error!(
					method = %c.method(),
					path = %c.path(),
					panic = %panic_message(&*payload),
					"handler panicked"
				);
				c.abort();
				c.reset_response();
				c.string(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
				Ok(())
			}
		}
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
	if let Some(message) = payload.downcast_ref::<&str>() {
		message
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message
	} else {
		"unknown panic"
	}
}
