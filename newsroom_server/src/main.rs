mod docs;
mod error;
mod page;
mod router;
mod state;
mod summary;

use dotenvy::dotenv;
use newsroom_core::config::Config;
use router::router;

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    let server_domain = config.server_domain.clone();

    let app = router(&config)?;

    let listener = tokio::net::TcpListener::bind(&server_domain).await?;
    log::info!("News summarizer listening on {}", server_domain);

    axum::serve(listener, app).await?;
    Ok(())
}
