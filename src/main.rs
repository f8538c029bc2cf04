use quickpoll::config::Config;
use quickpoll::db;
use quickpoll::routes::create_routes;
use quickpoll::startup::AppState;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "INFO");
        }
    }
    // initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    let pool = match db::init_db(&config.database_url, config.max_connections).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open poll store at {}: {}", config.database_url, e);
            std::process::exit(1);
        }
    };

    let app_state = AppState::new(pool, &config);
    app_state.spawn_health_check();

    let app = create_routes(app_state);

    info!("listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Unable to spawn tcp listener");

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server stopped: {}", e);
    }
}
