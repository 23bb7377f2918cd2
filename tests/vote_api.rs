#![cfg(feature = "inmem-store")]

use actix_http::Request;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{test, web, App, Error};
use fappit::rate_limit::{InMemoryRateLimiter, RateLimitConfig, RateLimiterFacade};
use fappit::repo::inmem::InMemRepo;
use fappit::routes::{config, AppState};
use std::sync::Arc;

fn state() -> AppState {
    AppState { repo: Arc::new(InMemRepo::new()), rate: RateLimiterFacade::disabled() }
}

async fn seed_post<S>(app: &S) -> i64
where
    S: Service<Request, Response = ServiceResponse, Error = Error>,
{
    let req = test::TestRequest::post()
        .uri("/api/subfapps")
        .set_json(serde_json::json!({"name": "movies", "description": "All about movies"}))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), 201);

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .set_json(serde_json::json!({
            "title": "Great film",
            "content": "watch it",
            "subfapp": "movies",
            "userId": "author-1"
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), 201);
    let post: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    post["id"].as_i64().unwrap()
}

async fn vote<S>(
    app: &S,
    post_id: i64,
    user_id: &str,
    vote_type: serde_json::Value,
) -> (actix_web::http::StatusCode, serde_json::Value)
where
    S: Service<Request, Response = ServiceResponse, Error = Error>,
{
    let req = test::TestRequest::post()
        .uri("/api/posts/vote")
        .set_json(serde_json::json!({"postId": post_id, "userId": user_id, "voteType": vote_type}))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    (status, body)
}

#[actix_web::test]
async fn up_then_down_then_retract() {
    let app = test::init_service(
        App::new().app_data(web::Data::new(state())).configure(config),
    )
    .await;
    let post_id = seed_post(&app).await;

    let (status, body) = vote(&app, post_id, "user-a", "up".into()).await;
    assert_eq!(status, 200);
    assert_eq!(body["upvotes"], 1);
    assert_eq!(body["downvotes"], 0);
    assert_eq!(body["userVote"], "up");

    let (status, body) = vote(&app, post_id, "user-a", "down".into()).await;
    assert_eq!(status, 200);
    assert_eq!(body["upvotes"], 0);
    assert_eq!(body["downvotes"], 1);
    assert_eq!(body["userVote"], "down");

    let (status, body) = vote(&app, post_id, "user-a", serde_json::Value::Null).await;
    assert_eq!(status, 200);
    assert_eq!(body["upvotes"], 0);
    assert_eq!(body["downvotes"], 0);
    assert_eq!(body["userVote"], serde_json::Value::Null);
}

#[actix_web::test]
async fn same_direction_again_toggles_off() {
    let app = test::init_service(
        App::new().app_data(web::Data::new(state())).configure(config),
    )
    .await;
    let post_id = seed_post(&app).await;

    let (_, body) = vote(&app, post_id, "user-a", "up".into()).await;
    assert_eq!(body["upvotes"], 1);

    let (status, body) = vote(&app, post_id, "user-a", "up".into()).await;
    assert_eq!(status, 200);
    assert_eq!(body["upvotes"], 0);
    assert_eq!(body["userVote"], serde_json::Value::Null);

    // the ledger holds no row for the user afterwards
    let req = test::TestRequest::get()
        .uri("/api/posts/user-votes?userId=user-a")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let votes: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(votes.as_array().unwrap().len(), 0);
}

#[actix_web::test]
async fn votes_from_two_users_both_counted() {
    let app = test::init_service(
        App::new().app_data(web::Data::new(state())).configure(config),
    )
    .await;
    let post_id = seed_post(&app).await;

    let (_, body) = vote(&app, post_id, "user-a", "up".into()).await;
    assert_eq!(body["upvotes"], 1);
    let (_, body) = vote(&app, post_id, "user-b", "up".into()).await;
    assert_eq!(body["upvotes"], 2);
    let (_, body) = vote(&app, post_id, "user-c", "down".into()).await;
    assert_eq!(body["upvotes"], 2);
    assert_eq!(body["downvotes"], 1);

    let req = test::TestRequest::get()
        .uri("/api/posts/user-votes?userId=user-c")
        .to_request();
    let resp = test::call_service(&app, req).await;
    let votes: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(votes, serde_json::json!([{"post_id": post_id, "vote_type": "down"}]));
}

#[actix_web::test]
async fn vote_on_unknown_post_is_404() {
    let app = test::init_service(
        App::new().app_data(web::Data::new(state())).configure(config),
    )
    .await;
    let (status, _) = vote(&app, 999, "user-a", "up".into()).await;
    assert_eq!(status, 404);
}

#[actix_web::test]
async fn invalid_vote_type_is_400() {
    let app = test::init_service(
        App::new().app_data(web::Data::new(state())).configure(config),
    )
    .await;
    let post_id = seed_post(&app).await;
    let (status, _) = vote(&app, post_id, "user-a", "sideways".into()).await;
    assert_eq!(status, 400);
}

#[actix_web::test]
async fn missing_fields_are_400() {
    let app = test::init_service(
        App::new().app_data(web::Data::new(state())).configure(config),
    )
    .await;
    let req = test::TestRequest::post()
        .uri("/api/posts/vote")
        .set_json(serde_json::json!({"voteType": "up"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let req = test::TestRequest::get().uri("/api/posts/user-votes").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn wrong_method_is_405() {
    let app = test::init_service(
        App::new().app_data(web::Data::new(state())).configure(config),
    )
    .await;
    let req = test::TestRequest::get().uri("/api/posts/vote").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 405);
}

#[actix_web::test]
async fn vote_rate_limit_returns_429() {
    let rate = RateLimiterFacade::new(
        InMemoryRateLimiter::new(true),
        RateLimitConfig {
            vote_limit: 2,
            vote_window: std::time::Duration::from_secs(60),
            membership_limit: 10,
            membership_window: std::time::Duration::from_secs(60),
            post_limit: 10,
            post_window: std::time::Duration::from_secs(60),
            comment_limit: 10,
            comment_window: std::time::Duration::from_secs(60),
            like_limit: 10,
            like_window: std::time::Duration::from_secs(60),
        },
    );
    let state = AppState { repo: Arc::new(InMemRepo::new()), rate };
    let app = test::init_service(
        App::new().app_data(web::Data::new(state)).configure(config),
    )
    .await;
    let post_id = seed_post(&app).await;

    let (status, _) = vote(&app, post_id, "user-a", "up".into()).await;
    assert_eq!(status, 200);
    let (status, _) = vote(&app, post_id, "user-a", "down".into()).await;
    assert_eq!(status, 200);
    let (status, _) = vote(&app, post_id, "user-a", "up".into()).await;
    assert_eq!(status, 429);
    // a different user is unaffected
    let (status, _) = vote(&app, post_id, "user-b", "up".into()).await;
    assert_eq!(status, 200);
}
