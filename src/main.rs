use tracing_subscriber::EnvFilter;

mod api;
mod catalog;
mod config;

use api::AppState;
use catalog::Library;
use config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("replayd=info".parse()?))
        .init();

    let config = Config::load()?;

    let library = Library::open(&config.library.dir);
    let assets = library.list();
    tracing::info!(
        dir = %library.root().display(),
        assets = assets.len(),
        "opened media library"
    );

    let state = AppState::new(library, config.http.public_url.clone());
    let server = tokio::spawn(api::start_server(state, config.http.port));

    tokio::select! {
        result = server => {
            result??;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    tracing::info!("shutdown complete");
    Ok(())
}
