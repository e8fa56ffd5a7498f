use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info};

use pipeline_http::{
    serve_metrics, ClientRegistry, Config, CoordinatorEvent, FanoutSet, GstStreamProducer,
    HttpFrontDoor, PrometheusReporter, StreamCoordinator, StreamProducer,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration
    let config = Config::parse();

    // Initialize logging
    let filter = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    info!("Starting pipeline-http v{}", env!("CARGO_PKG_VERSION"));
    config.validate()?;

    // Initialize GStreamer (infrastructure concern)
    gstreamer::init().context("GStreamer initialization failed")?;

    // Initialize metrics
    PrometheusReporter::init_metrics()?;
    let metrics_port = config.metrics_port;
    tokio::spawn(async move {
        serve_metrics(metrics_port).await;
    });

    let descriptor = config
        .to_descriptor()
        .context("invalid stream description")?;
    let metrics = Arc::new(PrometheusReporter::new());
    let (events_tx, events_rx) = mpsc::unbounded_channel::<CoordinatorEvent>();

    // Build the shared producer; an unusable graph fails here, before any
    // listener is opened
    let fanout = Arc::new(FanoutSet::new(events_tx.clone(), metrics.clone()));
    let producer: Arc<dyn StreamProducer> = Arc::new(
        GstStreamProducer::new(&descriptor, events_tx.clone(), fanout)
            .context("pipeline construction failed")?,
    );

    let registry = Arc::new(ClientRegistry::new(
        producer.clone(),
        events_tx.clone(),
        metrics.clone(),
    ));

    let front_door = HttpFrontDoor::bind(
        config.port,
        descriptor.content_type().to_string(),
        registry.clone(),
    )
    .await
    .context("could not start listening")?;

    let coordinator = StreamCoordinator::new(producer, registry, metrics, events_rx);
    let coordinator_handle = tokio::spawn(coordinator.run());

    info!(
        port = config.port,
        content_type = %descriptor.content_type(),
        "serving stream"
    );

    front_door.run_until(shutdown_signal()).await;

    // Force the drain path before the producer and listener are released
    let _ = events_tx.send(CoordinatorEvent::Shutdown);
    coordinator_handle.await?;

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("caught signal, stopping");
}
