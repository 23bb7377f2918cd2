use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::models::*;
use crate::rate_limit::RateLimiterFacade;
use crate::repo::Repo;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::resource("/posts")
                    .route(web::get().to(list_posts))
                    .route(web::post().to(create_post)),
            )
            .service(web::resource("/posts/vote").route(web::post().to(cast_vote)))
            .service(web::resource("/posts/user-votes").route(web::get().to(user_votes)))
            .service(web::resource("/posts/{id}").route(web::get().to(get_post)))
            .service(
                web::resource("/subfapps")
                    .route(web::get().to(list_subfapps))
                    .route(web::post().to(create_subfapp)),
            )
            .service(web::resource("/subfapps/membership").route(web::post().to(set_membership)))
            .service(
                web::resource("/subfapps/user-memberships").route(web::get().to(user_memberships)),
            )
            .service(
                web::resource("/comments")
                    .route(web::get().to(list_comments))
                    .route(web::post().to(create_comment)),
            )
            .service(web::resource("/comments/like").route(web::post().to(toggle_like)))
            .service(web::resource("/comments/reply").route(web::post().to(create_reply))),
    );
    cfg.route("/healthz", web::get().to(healthz));
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    pub rate: RateLimiterFacade,
}

const RECENT_POSTS_LIMIT: i64 = 50;

// ---------------- posts -----------------------------------------------

#[utoipa::path(
    get,
    path = "/api/posts",
    responses((status = 200, description = "Recent posts, newest first", body = [Post]))
)]
pub async fn list_posts(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let posts = data.repo.list_posts(RECENT_POSTS_LIMIT).await?;
    Ok(HttpResponse::Ok().json(posts))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub subfapp: Option<String>,
    pub user_id: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = Post),
        (status = 400, description = "Missing required fields"),
        (status = 404, description = "Subfapp not found")
    )
)]
pub async fn create_post(
    data: web::Data<AppState>,
    payload: web::Json<CreatePostRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = payload.into_inner();
    let (title, content, subfapp_name, user_id) =
        match (body.title, body.content, body.subfapp, body.user_id) {
            (Some(t), Some(c), Some(s), Some(u)) => (t, c, s, u),
            _ => return Err(ApiError::Validation("Missing required fields".into())),
        };
    if !data.rate.allow_post(&user_id) {
        return Err(ApiError::RateLimited);
    }
    let post = data
        .repo
        .create_post(NewPost { title, content, image_url: body.image_url, subfapp_name, user_id })
        .await?;
    Ok(HttpResponse::Created().json(post))
}

#[utoipa::path(
    get,
    path = "/api/posts/{id}",
    params(("id" = Id, Path, description = "Post id")),
    responses(
        (status = 200, description = "The post", body = Post),
        (status = 404, description = "Post not found")
    )
)]
pub async fn get_post(
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let post = data.repo.get_post(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(post))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub post_id: Option<Id>,
    pub user_id: Option<String>,
    /// "up", "down", or null to retract the current vote.
    pub vote_type: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/posts/vote",
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Recomputed counters and the caller's vote", body = VoteTally),
        (status = 400, description = "Missing or invalid fields"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn cast_vote(
    data: web::Data<AppState>,
    payload: web::Json<VoteRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = payload.into_inner();
    let (post_id, user_id) = match (body.post_id, body.user_id) {
        (Some(p), Some(u)) => (p, u),
        _ => return Err(ApiError::Validation("Missing required fields".into())),
    };
    let direction = match body.vote_type.as_deref() {
        None => None,
        Some(s) => Some(
            VoteType::parse(s)
                .ok_or_else(|| ApiError::Validation("voteType must be 'up' or 'down'".into()))?,
        ),
    };
    if !data.rate.allow_vote(&user_id) {
        return Err(ApiError::RateLimited);
    }
    let tally = data.repo.cast_vote(post_id, &user_id, direction).await?;
    Ok(HttpResponse::Ok().json(tally))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/posts/user-votes",
    params(("userId" = String, Query, description = "User id")),
    responses((status = 200, description = "The user's current votes", body = [UserVote]))
)]
pub async fn user_votes(
    data: web::Data<AppState>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, ApiError> {
    let user_id = query
        .into_inner()
        .user_id
        .ok_or_else(|| ApiError::Validation("User ID is required".into()))?;
    let votes = data.repo.user_votes(&user_id).await?;
    Ok(HttpResponse::Ok().json(votes))
}

// ---------------- subfapps --------------------------------------------

#[utoipa::path(
    get,
    path = "/api/subfapps",
    responses((status = 200, description = "Subfapps ordered by member count", body = [Subfapp]))
)]
pub async fn list_subfapps(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let subfapps = data.repo.list_subfapps().await?;
    Ok(HttpResponse::Ok().json(subfapps))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSubfappRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/subfapps",
    request_body = CreateSubfappRequest,
    responses(
        (status = 201, description = "Subfapp created", body = Subfapp),
        (status = 409, description = "Name already taken")
    )
)]
pub async fn create_subfapp(
    data: web::Data<AppState>,
    payload: web::Json<CreateSubfappRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = payload.into_inner();
    let (name, description) = match (body.name, body.description) {
        (Some(n), Some(d)) if !n.is_empty() => (n, d),
        _ => return Err(ApiError::Validation("Missing required fields".into())),
    };
    let subfapp = data.repo.create_subfapp(NewSubfapp { name, description }).await?;
    Ok(HttpResponse::Created().json(subfapp))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MembershipRequest {
    pub user_id: Option<String>,
    pub subfapp_name: Option<String>,
    /// "join" or "leave".
    pub action: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MembershipResponse {
    pub message: String,
    pub member_count: i64,
}

#[utoipa::path(
    post,
    path = "/api/subfapps/membership",
    request_body = MembershipRequest,
    responses(
        (status = 200, description = "Membership updated", body = MembershipResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 404, description = "Subfapp not found")
    )
)]
pub async fn set_membership(
    data: web::Data<AppState>,
    payload: web::Json<MembershipRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = payload.into_inner();
    let (user_id, subfapp_name, action) = match (body.user_id, body.subfapp_name, body.action) {
        (Some(u), Some(s), Some(a)) => (u, s, a),
        _ => return Err(ApiError::Validation("Missing required fields".into())),
    };
    let action = match action.as_str() {
        "join" => MembershipAction::Join,
        "leave" => MembershipAction::Leave,
        _ => return Err(ApiError::Validation("action must be 'join' or 'leave'".into())),
    };
    if !data.rate.allow_membership(&user_id) {
        return Err(ApiError::RateLimited);
    }
    let member_count = data.repo.set_membership(&user_id, &subfapp_name, action).await?;
    let message = match action {
        MembershipAction::Join => format!("Successfully joined {subfapp_name}"),
        MembershipAction::Leave => format!("Successfully left {subfapp_name}"),
    };
    Ok(HttpResponse::Ok().json(MembershipResponse { message, member_count }))
}

#[utoipa::path(
    get,
    path = "/api/subfapps/user-memberships",
    params(("userId" = String, Query, description = "User id")),
    responses((status = 200, description = "Subfapps the user has joined", body = [UserMembership]))
)]
pub async fn user_memberships(
    data: web::Data<AppState>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, ApiError> {
    let user_id = query
        .into_inner()
        .user_id
        .ok_or_else(|| ApiError::Validation("User ID is required".into()))?;
    let memberships = data.repo.user_memberships(&user_id).await?;
    Ok(HttpResponse::Ok().json(memberships))
}

// ---------------- comments --------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentsQuery {
    pub post_id: Option<Id>,
}

#[utoipa::path(
    get,
    path = "/api/comments",
    params(("postId" = Id, Query, description = "Post id")),
    responses(
        (status = 200, description = "Comments newest first, with nested replies", body = [CommentThread]),
        (status = 404, description = "Post not found")
    )
)]
pub async fn list_comments(
    data: web::Data<AppState>,
    query: web::Query<CommentsQuery>,
) -> Result<HttpResponse, ApiError> {
    let post_id = query
        .into_inner()
        .post_id
        .ok_or_else(|| ApiError::Validation("Post ID is required".into()))?;
    let comments = data.repo.list_comments(post_id).await?;
    Ok(HttpResponse::Ok().json(comments))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    pub post_id: Option<Id>,
    pub user_id: Option<String>,
    pub content: Option<String>,
    pub user_name: Option<String>,
    pub user_avatar: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/comments",
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment created", body = Comment),
        (status = 400, description = "Missing required fields"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn create_comment(
    data: web::Data<AppState>,
    payload: web::Json<CommentRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = payload.into_inner();
    let (post_id, user_id, content) = match (body.post_id, body.user_id, body.content) {
        (Some(p), Some(u), Some(c)) if !c.is_empty() => (p, u, c),
        _ => return Err(ApiError::Validation("Missing required fields".into())),
    };
    if !data.rate.allow_comment(&user_id) {
        return Err(ApiError::RateLimited);
    }
    let comment = data
        .repo
        .create_comment(NewComment {
            post_id,
            user_id,
            user_name: body.user_name.unwrap_or_else(|| "Anonymous".into()),
            user_avatar: body.user_avatar,
            content,
        })
        .await?;
    Ok(HttpResponse::Created().json(comment))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest {
    pub comment_id: Option<Id>,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub like_count: i64,
}

#[utoipa::path(
    post,
    path = "/api/comments/like",
    request_body = LikeRequest,
    responses(
        (status = 200, description = "Like toggled, recomputed count", body = LikeResponse),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn toggle_like(
    data: web::Data<AppState>,
    payload: web::Json<LikeRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = payload.into_inner();
    let (comment_id, user_id) = match (body.comment_id, body.user_id) {
        (Some(c), Some(u)) => (c, u),
        _ => return Err(ApiError::Validation("Missing required fields".into())),
    };
    if !data.rate.allow_like(&user_id) {
        return Err(ApiError::RateLimited);
    }
    let like_count = data.repo.toggle_like(comment_id, &user_id).await?;
    Ok(HttpResponse::Ok().json(LikeResponse { like_count }))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest {
    pub parent_comment_id: Option<Id>,
    pub user_id: Option<String>,
    pub content: Option<String>,
    pub user_name: Option<String>,
    pub user_avatar: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/comments/reply",
    request_body = ReplyRequest,
    responses(
        (status = 201, description = "Reply created", body = Reply),
        (status = 400, description = "Missing required fields"),
        (status = 404, description = "Parent comment not found")
    )
)]
pub async fn create_reply(
    data: web::Data<AppState>,
    payload: web::Json<ReplyRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = payload.into_inner();
    let (parent_comment_id, user_id, content) =
        match (body.parent_comment_id, body.user_id, body.content) {
            (Some(p), Some(u), Some(c)) if !c.is_empty() => (p, u, c),
            _ => return Err(ApiError::Validation("Missing required fields".into())),
        };
    if !data.rate.allow_comment(&user_id) {
        return Err(ApiError::RateLimited);
    }
    let reply = data
        .repo
        .create_reply(NewReply {
            parent_comment_id,
            user_id,
            user_name: body.user_name.unwrap_or_else(|| "Anonymous".into()),
            user_avatar: body.user_avatar,
            content,
        })
        .await?;
    Ok(HttpResponse::Created().json(reply))
}

// ---------------- health ----------------------------------------------

pub async fn healthz(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    data.repo.ping().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })))
}
