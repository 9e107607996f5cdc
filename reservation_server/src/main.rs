use std::env;

use dotenvy::dotenv;
use log::{error, info};
use reservation_server::{
    cli::handle_command_line_args,
    config::{AuthConfig, ServerConfig},
    server::run_server,
};

#[actix_web::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    if handle_command_line_args() {
        return;
    }
    let config = ServerConfig::from_env_or_default();
    if !preflight_check(&config) {
        eprintln!("🚀️ Preflight check failed. Exiting. Check the logs for details.");
        return;
    }

    info!("🚀️ Starting server on {}:{}", config.host, config.port);
    match run_server(config).await {
        Ok(_) => println!("Bye!"),
        Err(e) => eprintln!("{e}"),
    }
}

fn preflight_check(config: &ServerConfig) -> bool {
    if env::var("SRS_SKIP_PREFLIGHT").ok() == Some("Yes".to_string()) {
        info!("🚦️ Skipping preflight checks. I hope you know what you're doing!");
        return true;
    }
    let mut result = true;
    info!("🚦️ Running preflight checks...");
    info!("🚦️ Checking for required environment variables...");
    if AuthConfig::try_from_env().is_err() {
        error!("🚦️ Preflight check FAILED: You must set JWT_SECRET before carrying on.");
        result = false;
    }
    if config.redis_url.is_empty() {
        error!("🚦️ REDIS_URL is empty. Please set it to the URL of the hot-state store.");
        result = false;
    }
    if config.database_url.is_empty() {
        error!("🚦️ DATABASE_URL is empty. Please set it to the URL of the durable store.");
        result = false;
    }
    if config.reservation_ttl_seconds <= 0 {
        error!("🚦️ RESERVATION_TTL_SECONDS must be positive; holds would expire immediately.");
        result = false;
    }
    if result {
        info!("🚦️ Preflight check PASSED.");
    } else {
        error!("🚦️ Preflight check FAILED: Please fix the issues above before starting the server.");
        info!(
            "🚦️ If you really know what you're doing and want to skip the preflight check, set `SRS_SKIP_PREFLIGHT` \
             to `Yes` in your environment variables"
        );
    }
    result
}
