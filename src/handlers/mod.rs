// HTTP handlers for the GitHub login service
pub mod auth;
pub mod health;

pub use auth::{github_authorize, login, logout, refresh, TokenResponse};
pub use health::health;

use actix_web::web;

/// Register every route; the `LoginService` must be provided as app data
pub fn configure_services(cfg: &mut web::ServiceConfig) {
    cfg.route("/auth/github/authorize", web::get().to(github_authorize))
        .route("/auth/login", web::post().to(login))
        .route("/auth/refresh", web::post().to(refresh))
        .route("/auth/logout", web::post().to(logout))
        .route("/ping", web::get().to(health));
}
