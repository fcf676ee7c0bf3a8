use std::sync::Arc;

use clap::Parser;
use tokio::sync::Mutex;
use tracing::info;
use warp::Filter;

use plog::{
    build_api_route_filter,
    config::Args,
    cors, handle_rejection,
    memory::{MemoryPostDatabase, MemoryUserDatabase},
    telemetry, Auth, AuthConfig, SharedPostDatabase,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    telemetry::init(&args.log_level);

    // A weak signing key is fatal at startup.
    let auth_token_secret = args.secret_key()?;

    let auth = Auth::new(AuthConfig {
        auth_token_issuer: args.token_issuer.clone(),
        auth_token_secret,
        auth_token_lifetime: args.token_lifetime(),
        database_connection: Arc::new(Mutex::new(MemoryUserDatabase::new())),
    });
    let posts: SharedPostDatabase = Arc::new(Mutex::new(MemoryPostDatabase::new()));

    let routes = build_api_route_filter(&auth, &posts)
        .recover(handle_rejection)
        .with(cors(&args.cors_origin))
        .with(warp::trace::request());

    info!(
        listen = %args.listen,
        token_lifetime_secs = args.access_token_duration_secs,
        "starting plog"
    );

    warp::serve(routes).run(args.listen).await;

    Ok(())
}
