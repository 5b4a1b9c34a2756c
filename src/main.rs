use actix_web::{web, App, HttpServer};
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_lifecycle::cache::RedisOrderCache;
use order_lifecycle::config::{Config, LogFormat};
use order_lifecycle::http::{self, AppState};
use order_lifecycle::messaging::RedpandaPublisher;
use order_lifecycle::metrics::Metrics;
use order_lifecycle::service::OrderService;
use order_lifecycle::store::ScyllaOrderStore;

fn init_tracing(config: &Config) {
    // RUST_LOG wins over LOG_LEVEL, e.g. RUST_LOG=order_lifecycle=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(fmt::layer().json().with_target(true)).init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init(),
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real deployments set the environment directly
    let _ = dotenvy::dotenv();
    let config = Config::from_env()?;
    init_tracing(&config);

    tracing::info!(environment = %config.environment, "🚀 Starting order lifecycle service");

    // === 1. ScyllaDB session and schema ===
    tracing::info!(nodes = ?config.scylla_nodes, "Connecting to ScyllaDB...");
    let mut builder = SessionBuilder::new();
    for node in &config.scylla_nodes {
        builder = builder.known_node(node);
    }
    let session: Session = builder.build().await?;

    session
        .query_unpaged(
            format!(
                "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = \
                 {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
                config.scylla_keyspace, config.scylla_replication_factor
            ),
            &[],
        )
        .await?;
    session.use_keyspace(&config.scylla_keyspace, false).await?;

    let store = ScyllaOrderStore::new(Arc::new(session));
    store.ensure_schema().await?;
    tracing::info!(keyspace = %config.scylla_keyspace, "✅ ScyllaDB ready");

    // === 2. Metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 3. Redis cache ===
    let cache = RedisOrderCache::connect(&config.redis_url).await?;
    tracing::info!("✅ Redis connected");

    // === 4. Redpanda publisher (retry + circuit breaker) ===
    let publisher = RedpandaPublisher::new(
        &config.kafka_brokers,
        config.kafka_topic_orders.clone(),
        config.kafka_message_timeout,
        config.retry_policy(),
        metrics.clone(),
    )?;
    tracing::info!(brokers = %config.kafka_brokers, topic = %config.kafka_topic_orders, "✅ Redpanda producer created");

    // === 5. Coordinator and HTTP server ===
    let service = Arc::new(
        OrderService::new(Arc::new(store), Arc::new(cache), Arc::new(publisher), metrics)
            .with_cache_ttl(config.cache_ttl)
            .with_side_effect_timeout(config.request_timeout),
    );
    let state = web::Data::new(AppState::new(service, &config));

    let (host, port) = config.http_addr();
    tracing::info!("🌐 Listening on http://{}:{}", host, port);

    HttpServer::new(move || App::new().app_data(state.clone()).configure(http::routes))
        .bind((host.as_str(), port))?
        .run()
        .await?;

    tracing::info!("👋 Shutdown complete");
    Ok(())
}
