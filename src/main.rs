use courier_server::core::logger::init_logger;
use courier_server::core::server;
use courier_server::{Config, ServerState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_logger();

    let config = Config::from_env();
    let state = ServerState::initialize(config).await?;
    server::run(state).await?;

    Ok(())
}
