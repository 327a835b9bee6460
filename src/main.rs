use std::{net::SocketAddr, sync::Arc, time::Duration};

use staytune::{
    common::types::AnyResult,
    configs::Config,
    log_println,
    server::{AppState, KeepAlive},
    sources::SourceManager,
    transport,
    voice::SinkConnector,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> AnyResult<()> {
    let config = Config::load()?;
    staytune::common::logger::init(&config);

    log_println!(
        "staytune {} ({}@{}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_BRANCH"),
        env!("GIT_COMMIT"),
        env!("BUILD_TIME"),
    );

    let user_agent = config.sources.user_agent.clone();
    let request_timeout = Duration::from_millis(config.sources.request_timeout_ms);
    let probe_client = reqwest::Client::builder()
        .user_agent(user_agent.clone())
        .timeout(request_timeout)
        .build()?;
    // streams run for a whole track, so only the connect is bounded
    let stream_client = reqwest::Client::builder()
        .user_agent(user_agent)
        .connect_timeout(request_timeout)
        .build()?;

    let resolver = Arc::new(SourceManager::new(&config.sources, probe_client));
    info!("Sources enabled: {}", resolver.source_names().join(", "));
    let connector = Arc::new(SinkConnector::new(config.voice.clone(), stream_client));

    let address: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = AppState::new(config, connector, resolver);

    let cancel = CancellationToken::new();
    let dispatcher = tokio::spawn(state.clone().run_dispatcher(cancel.clone()));
    let supervisor = KeepAlive::new(state.clone()).spawn(cancel.clone());

    let app = transport::router(state);
    let listener = tokio::net::TcpListener::bind(address).await?;
    info!("Listening on {}", address);

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for ctrl-c: {}", e);
            }
            info!("Shutting down");
            shutdown.cancel();
        })
        .await?;

    cancel.cancel();
    for task in [dispatcher, supervisor] {
        if let Err(e) = task.await {
            error!("Background task ended abnormally: {}", e);
        }
    }
    Ok(())
}
