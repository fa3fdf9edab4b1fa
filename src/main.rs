use autores_api::config::Config;
use autores_api::database::Sqlite;
use autores_api::http::{AppState, HttpServer, HttpServerConfig};
use autores_api::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init()?;
    let config = Config::from_env()?;

    let author_repo = Sqlite::new(config.database_url()).await?;
    let state = AppState::new(author_repo);
    let server_config = HttpServerConfig::new(config.server_port());
    let http_server = HttpServer::new(state, server_config).await?;
    http_server.run().await
}
