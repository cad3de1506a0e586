use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use fleetcast::{
    AppState,
    cache::RedisSessionStore,
    config::{BroadcastMode, Config},
    database::{PgLoginRegistry, PgUserDirectory},
    router::create_router,
    session::SessionAuthority,
    snapshot::RedisSnapshotStore,
    ws::{RoomRegistry, SnapshotFeed},
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'fleetcast';").await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // 设置 Redis 客户端
    let redis = Arc::new(
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client"),
    );

    let sessions = SessionAuthority::new(
        Arc::new(RedisSessionStore::new(redis.clone())),
        Arc::new(PgLoginRegistry::new(pool.clone())),
        config.session_ttl(),
    );

    // 设置应用状态
    let state = AppState {
        config: config.clone(),
        users: Arc::new(PgUserDirectory::new(pool)),
        sessions: Arc::new(sessions),
        snapshots: Arc::new(RedisSnapshotStore::new(
            redis,
            config.snapshot_fetch_timeout(),
        )),
        rooms: Arc::new(RoomRegistry::new()),
    };

    if config.broadcast_mode == BroadcastMode::Shared {
        let feed = SnapshotFeed::from_config(state.snapshots.clone(), &config);
        tokio::spawn(feed.supervise_shared(state.rooms.clone(), config.broadcast_room.clone()));
    }
    tracing::info!(
        mode = ?config.broadcast_mode,
        interval_ms = config.broadcast_interval_ms,
        room = %config.broadcast_room,
        "Snapshot broadcast configured"
    );

    let router = create_router(state);

    // 开发模式下允许跨域
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        router,
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
