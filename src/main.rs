#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use passgate::{configure_services, InMemoryUserStore, LoginService, PassgateSettings};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Also loads .env and initializes the logger
    let settings = PassgateSettings::load()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {e}")))?;

    let login_service = LoginService::from_settings(&settings, Arc::new(InMemoryUserStore::new()))
        .map_err(|e| std::io::Error::other(format!("Invalid configuration: {e}")))?;

    start_server(login_service, &settings).await
}

/// Start the HTTP server
///
/// # Errors
///
/// Returns an error if the bind address cannot be bound or the server fails.
async fn start_server(
    login_service: LoginService,
    settings: &PassgateSettings,
) -> std::io::Result<()> {
    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, settings);

    let cors_origins = settings.get_cors_origins();
    let login_service = web::Data::new(login_service);

    HttpServer::new(move || {
        let cors_origins = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _| {
                cors_origins
                    .iter()
                    .any(|allowed| allowed == origin.to_str().unwrap_or(""))
            })
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec!["Authorization", "Content-Type", "Accept"])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(login_service.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .configure(configure_services)
    })
    .bind(&bind_address)?
    .run()
    .await
}

fn print_startup_info(bind_address: &str, settings: &PassgateSettings) {
    println!("Starting passgate {} on http://{bind_address}", passgate::VERSION);
    println!();
    println!("Login endpoints:");
    println!("  GET  /auth/github/authorize - Redirect to GitHub consent");
    println!("  POST /auth/login            - Exchange authorization code for tokens");
    println!("  POST /auth/refresh          - New access token from refresh cookie");
    println!("  POST /auth/logout           - Clear refresh cookie");
    println!();
    println!("GitHub redirect URI: {}", settings.github.redirect_uri);
    println!(
        "Token TTLs: access {}s, refresh {}s",
        settings.tokens.access_token_ttl_seconds, settings.tokens.refresh_token_ttl_seconds
    );
    println!();
    println!("System endpoints:");
    println!("  GET  /ping - Health check");
}
