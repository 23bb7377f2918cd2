use crate::models::{
    Comment, CommentThread, MembershipAction, NewComment, NewPost, NewReply, NewSubfapp, Post,
    Reply, Subfapp, UserMembership, UserVote, VoteTally, VoteType,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::list_posts,
        crate::routes::create_post,
        crate::routes::get_post,
        crate::routes::cast_vote,
        crate::routes::user_votes,
        crate::routes::list_subfapps,
        crate::routes::create_subfapp,
        crate::routes::set_membership,
        crate::routes::user_memberships,
        crate::routes::list_comments,
        crate::routes::create_comment,
        crate::routes::toggle_like,
        crate::routes::create_reply,
    ),
    components(schemas(
        Post, NewPost, Subfapp, NewSubfapp, Comment, NewComment, Reply, NewReply,
        CommentThread, VoteTally, VoteType, UserVote, UserMembership, MembershipAction,
        crate::routes::CreatePostRequest, crate::routes::VoteRequest,
        crate::routes::CreateSubfappRequest, crate::routes::MembershipRequest,
        crate::routes::MembershipResponse, crate::routes::CommentRequest,
        crate::routes::LikeRequest, crate::routes::LikeResponse,
        crate::routes::ReplyRequest,
    )),
    tags(
        (name = "posts", description = "Post and vote operations"),
        (name = "subfapps", description = "Subfapp and membership operations"),
        (name = "comments", description = "Comment, like and reply operations"),
    )
)]
pub struct ApiDoc;
