use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use waitlist_processor::{
    config::{self, Secrets},
    modules::{
        clock::SystemClock,
        rate_limit_store::InMemoryRateLimitStore,
        rate_limit_sweeper::RateLimitSweeper,
        rate_limiter::{shared_store, RateLimiter},
        submission_dispatcher::SubmissionDispatcher,
        waitlist_api,
    },
};

const DEFAULT_CONFIG_PATH: &str = "waitlist_processor/Config.toml";

#[tokio::main]
async fn main() {

    // Secrets may come from a local .env file
    dotenvy::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Load the configuration for the dispatcher, limiter and sinks from Config.toml
    let config_path = std::env::var("WAITLIST_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = match config::load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Error loading configuration from {}: {}", config_path, e);
            std::process::exit(1);
        }
    };

    // Fail fast on missing secrets before accepting any signup
    let secrets = Secrets::from_env();
    if let Err(e) = config::validate_config(&config, &secrets) {
        log::error!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }
    log::info!("Configuration validated successfully, transport {:?}", config.dispatcher.transport);

    // Create a new, shared rate limit store
    let store = shared_store(InMemoryRateLimitStore::new(config.rate_limiter.max_entries));
    let rate_limiter = RateLimiter::new(store, Arc::new(SystemClock), &config.rate_limiter);

    // Start sweeping expired entries
    let sweeper = RateLimitSweeper::new(rate_limiter.clone(), config.rate_limiter.clone());
    tokio::spawn(async move {
        sweeper.start_sweeping().await;
    });

    let dispatcher = match SubmissionDispatcher::from_config(&config, &secrets, rate_limiter) {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            log::error!("Error building submission dispatcher: {}", e);
            std::process::exit(1);
        }
    };

    let listener = match TcpListener::bind(&config.server.bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("Error binding {}: {}", config.server.bind_address, e);
            std::process::exit(1);
        }
    };
    log::info!("Waitlist endpoint listening on {}", config.server.bind_address);
    if !config.server.trusted_proxies.is_empty() {
        log::info!("Trusting X-Forwarded-For from {:?}", config.server.trusted_proxies);
    }

    let app = waitlist_api::router(dispatcher, config.server.trusted_proxies.clone()).into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, app).await {
        log::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
