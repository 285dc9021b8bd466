use grove::{middleware, Context, Engine, StatusCode};
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn index(c: &mut Context) -> anyhow::Result<()> {
	c.html(StatusCode::OK, "<h1>Hello Grove</h1>");
	Ok(())
}

fn hello(c: &mut Context) -> anyhow::Result<()> {
	let query = c.raw_query().unwrap_or_default().to_owned();
	let text = format!("hello, you're at {} ({})\n", c.path(), query);
	c.string(StatusCode::OK, text);
	Ok(())
}

fn login(c: &mut Context) -> anyhow::Result<()> {
	let user = c.header("x-user").unwrap_or("anonymous").to_owned();
	c.json(StatusCode::OK, &json!({ "user": user }))
}

fn require_token(c: &mut Context) -> anyhow::Result<()> {
	if c.header("authorization").is_none() {
		c.fail(StatusCode::UNAUTHORIZED, "missing token");
		return Ok(());
	}
	c.next()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt().with_env_filter(filter).init();

	let mut engine = Engine::new();
	engine
		.use_middleware(middleware::recovery())
		.use_middleware(middleware::logger())
		.get("/", index);

	let mut v1 = engine.group("/v1");
	v1.get("/hello", hello).post("/login", login);

	let mut admin = v1.group("/admin");
	admin
		.use_middleware(require_token)
		.get("/panic", |_: &mut Context| panic!("boom"));

	engine.run("127.0.0.1:3000").await
}
