// HTTP surface tests: status codes, bodies and the refresh cookie
use std::sync::Arc;

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use passgate::configure_services;
use passgate::login::LoginService;
use passgate::testing::fixtures::TestFixtures;
use passgate::testing::mock::{FakeProviderGateway, IdentityReply, TokenReply};
use passgate::tokens::REFRESH_COOKIE_NAME;
use serde_json::{json, Value};

fn service_with(gateway: FakeProviderGateway) -> LoginService {
    TestFixtures::login_service(Arc::new(gateway))
}

macro_rules! app {
    ($service:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($service))
                .configure(configure_services),
        )
        .await
    };
}

#[actix_web::test]
async fn login_returns_access_token_and_refresh_cookie() {
    let app = app!(service_with(FakeProviderGateway::succeeding("ghp_xyz", "42")));

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "code": "abc123" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let set_cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .expect("refresh cookie set")
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("refresh-token="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Secure"));
    assert!(set_cookie.contains("Path=/"));
    assert!(set_cookie.contains("Max-Age=1209600"));

    let refresh_value = set_cookie
        .trim_start_matches("refresh-token=")
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["token_type"], "Bearer");
    let access_token = body["access_token"].as_str().expect("access token");
    assert!(!access_token.is_empty());
    assert!(body["expires_at"].is_i64());
    assert!(body.get("refresh_token").is_none());
    assert!(!body.to_string().contains(&refresh_value));
}

#[actix_web::test]
async fn login_without_code_is_bad_request() {
    let app = app!(service_with(FakeProviderGateway::succeeding("ghp_xyz", "42")));

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "missing_field");
}

#[actix_web::test]
async fn rejected_code_is_unauthorized_without_cookie() {
    let app = app!(service_with(FakeProviderGateway::new(
        TokenReply::Reject,
        IdentityReply::Reject
    )));

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "code": "stale" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().get(header::SET_COOKIE).is_none());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "upstream_auth_failed");
}

#[actix_web::test]
async fn refresh_cookie_mints_new_access_token() {
    let service = service_with(FakeProviderGateway::succeeding("ghp_xyz", "42"));
    let login = service.login("abc123").await.expect("login succeeds");
    let app = app!(service.clone());

    let req = test::TestRequest::post()
        .uri("/auth/refresh")
        .cookie(login.refresh_cookie().to_cookie())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    let access_token = body["access_token"].as_str().expect("access token");
    let claims = service
        .verify_access_token(access_token)
        .expect("refreshed token verifies");
    assert_eq!(claims.sub, "42");
}

#[actix_web::test]
async fn refresh_with_access_token_in_cookie_is_rejected() {
    let service = service_with(FakeProviderGateway::succeeding("ghp_xyz", "42"));
    let login = service.login("abc123").await.expect("login succeeds");
    let app = app!(service);

    let req = test::TestRequest::post()
        .uri("/auth/refresh")
        .cookie(actix_web::cookie::Cookie::new(
            REFRESH_COOKIE_NAME,
            login.access_token().as_str().to_string(),
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn refresh_without_cookie_is_unauthorized() {
    let app = app!(service_with(FakeProviderGateway::succeeding("ghp_xyz", "42")));

    let req = test::TestRequest::post().uri("/auth/refresh").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_token");
}

#[actix_web::test]
async fn logout_expires_refresh_cookie() {
    let app = app!(service_with(FakeProviderGateway::succeeding("ghp_xyz", "42")));

    let req = test::TestRequest::post().uri("/auth/logout").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let set_cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .expect("cookie cleared")
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with("refresh-token=;"));
    assert!(set_cookie.contains("Max-Age=0"));
}

#[actix_web::test]
async fn authorize_redirects_to_github() {
    let app = app!(service_with(FakeProviderGateway::succeeding("ghp_xyz", "42")));

    let req = test::TestRequest::get()
        .uri("/auth/github/authorize")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap(),
        TestFixtures::authorize_url().as_str()
    );
}

#[actix_web::test]
async fn ping_reports_ok() {
    let app = app!(service_with(FakeProviderGateway::succeeding("ghp_xyz", "42")));

    let req = test::TestRequest::get().uri("/ping").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
}
