#![cfg(feature = "inmem-store")]

use actix_http::Request;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{test, web, App, Error};
use fappit::rate_limit::RateLimiterFacade;
use fappit::repo::inmem::InMemRepo;
use fappit::routes::{config, AppState};
use std::sync::Arc;

fn state() -> AppState {
    AppState { repo: Arc::new(InMemRepo::new()), rate: RateLimiterFacade::disabled() }
}

async fn seed_subfapp<S>(app: &S, name: &str)
where
    S: Service<Request, Response = ServiceResponse, Error = Error>,
{
    let req = test::TestRequest::post()
        .uri("/api/subfapps")
        .set_json(serde_json::json!({"name": name, "description": "a community"}))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), 201);
}

async fn membership<S>(
    app: &S,
    user_id: &str,
    subfapp: &str,
    action: &str,
) -> (actix_web::http::StatusCode, serde_json::Value)
where
    S: Service<Request, Response = ServiceResponse, Error = Error>,
{
    let req = test::TestRequest::post()
        .uri("/api/subfapps/membership")
        .set_json(serde_json::json!({
            "userId": user_id,
            "subfappName": subfapp,
            "action": action
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    (status, body)
}

#[actix_web::test]
async fn join_is_idempotent_and_counts_follow_ledger() {
    let app = test::init_service(
        App::new().app_data(web::Data::new(state())).configure(config),
    )
    .await;
    seed_subfapp(&app, "movies").await;

    let (status, body) = membership(&app, "user-a", "movies", "join").await;
    assert_eq!(status, 200);
    assert_eq!(body["memberCount"], 1);

    // joining again is a no-op
    let (status, body) = membership(&app, "user-a", "movies", "join").await;
    assert_eq!(status, 200);
    assert_eq!(body["memberCount"], 1);

    let (_, body) = membership(&app, "user-b", "movies", "join").await;
    assert_eq!(body["memberCount"], 2);

    let (_, body) = membership(&app, "user-a", "movies", "leave").await;
    assert_eq!(body["memberCount"], 1);
}

#[actix_web::test]
async fn leaving_when_not_a_member_is_a_noop() {
    let app = test::init_service(
        App::new().app_data(web::Data::new(state())).configure(config),
    )
    .await;
    seed_subfapp(&app, "movies").await;

    let (status, body) = membership(&app, "user-a", "movies", "leave").await;
    assert_eq!(status, 200);
    assert_eq!(body["memberCount"], 0);

    // never goes negative
    let (status, body) = membership(&app, "user-a", "movies", "leave").await;
    assert_eq!(status, 200);
    assert_eq!(body["memberCount"], 0);
}

#[actix_web::test]
async fn unknown_subfapp_is_404() {
    let app = test::init_service(
        App::new().app_data(web::Data::new(state())).configure(config),
    )
    .await;
    let (status, _) = membership(&app, "user-a", "nope", "join").await;
    assert_eq!(status, 404);
}

#[actix_web::test]
async fn invalid_action_and_missing_fields_are_400() {
    let app = test::init_service(
        App::new().app_data(web::Data::new(state())).configure(config),
    )
    .await;
    seed_subfapp(&app, "movies").await;

    let (status, _) = membership(&app, "user-a", "movies", "lurk").await;
    assert_eq!(status, 400);

    let req = test::TestRequest::post()
        .uri("/api/subfapps/membership")
        .set_json(serde_json::json!({"userId": "user-a"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn user_memberships_listing() {
    let app = test::init_service(
        App::new().app_data(web::Data::new(state())).configure(config),
    )
    .await;
    seed_subfapp(&app, "movies").await;
    seed_subfapp(&app, "books").await;

    membership(&app, "user-a", "movies", "join").await;
    membership(&app, "user-a", "books", "join").await;
    membership(&app, "user-b", "movies", "join").await;

    let req = test::TestRequest::get()
        .uri("/api/subfapps/user-memberships?userId=user-a")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(
        body,
        serde_json::json!([{"subfapp_name": "books"}, {"subfapp_name": "movies"}])
    );

    // missing userId
    let req = test::TestRequest::get().uri("/api/subfapps/user-memberships").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn subfapp_listing_ordered_by_member_count() {
    let app = test::init_service(
        App::new().app_data(web::Data::new(state())).configure(config),
    )
    .await;
    seed_subfapp(&app, "movies").await;
    seed_subfapp(&app, "books").await;

    membership(&app, "user-a", "books", "join").await;
    membership(&app, "user-b", "books", "join").await;
    membership(&app, "user-a", "movies", "join").await;

    let req = test::TestRequest::get().uri("/api/subfapps").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    let names: Vec<&str> =
        body.as_array().unwrap().iter().map(|s| s["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["books", "movies"]);
    assert_eq!(body[0]["memberCount"], 2);
}

#[actix_web::test]
async fn duplicate_subfapp_name_is_409() {
    let app = test::init_service(
        App::new().app_data(web::Data::new(state())).configure(config),
    )
    .await;
    seed_subfapp(&app, "movies").await;

    let req = test::TestRequest::post()
        .uri("/api/subfapps")
        .set_json(serde_json::json!({"name": "movies", "description": "again"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);
}
