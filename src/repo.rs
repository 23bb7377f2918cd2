use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("storage: {0}")] Storage(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

use async_trait::async_trait;

#[async_trait]
pub trait PostRepo: Send + Sync {
    async fn create_post(&self, new: NewPost) -> RepoResult<Post>;
    async fn get_post(&self, id: Id) -> RepoResult<Post>;
    async fn list_posts(&self, limit: i64) -> RepoResult<Vec<Post>>;
    /// Apply a vote mutation for (post, user) and recompute the post's
    /// counters from the vote ledger. `direction == None` retracts; a
    /// direction equal to the stored one toggles the vote off.
    async fn cast_vote(
        &self,
        post_id: Id,
        user_id: &str,
        direction: Option<VoteType>,
    ) -> RepoResult<VoteTally>;
    async fn user_votes(&self, user_id: &str) -> RepoResult<Vec<UserVote>>;
}

#[async_trait]
pub trait SubfappRepo: Send + Sync {
    async fn create_subfapp(&self, new: NewSubfapp) -> RepoResult<Subfapp>;
    async fn list_subfapps(&self) -> RepoResult<Vec<Subfapp>>;
    /// Join or leave a subfapp, then recompute `member_count` from the
    /// membership ledger. Both directions are idempotent.
    async fn set_membership(
        &self,
        user_id: &str,
        subfapp_name: &str,
        action: MembershipAction,
    ) -> RepoResult<i64>;
    async fn user_memberships(&self, user_id: &str) -> RepoResult<Vec<UserMembership>>;
}

#[async_trait]
pub trait CommentRepo: Send + Sync {
    async fn create_comment(&self, new: NewComment) -> RepoResult<Comment>;
    async fn list_comments(&self, post_id: Id) -> RepoResult<Vec<CommentThread>>;
    /// Flip the (comment, user) like row and recompute the like counter.
    /// Returns the new count.
    async fn toggle_like(&self, comment_id: Id, user_id: &str) -> RepoResult<i64>;
    async fn create_reply(&self, new: NewReply) -> RepoResult<Reply>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> RepoResult<()>;
}

pub trait Repo: PostRepo + SubfappRepo + CommentRepo + HealthRepo {}

impl<T> Repo for T where T: PostRepo + SubfappRepo + CommentRepo + HealthRepo {}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use chrono::Utc;
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, RwLock};

    #[derive(Default)]
    struct State {
        posts: HashMap<Id, Post>,
        // vote ledger: one entry per (post, user)
        votes: HashMap<(Id, String), VoteType>,
        subfapps: HashMap<String, Subfapp>,
        // membership ledger: (user, subfapp)
        members: HashSet<(String, String)>,
        comments: HashMap<Id, Comment>,
        // like ledger: (comment, user)
        likes: HashSet<(Id, String)>,
        replies: HashMap<Id, Reply>,
        next_id: Id,
    }

    impl State {
        fn next_id(&mut self) -> Id {
            self.next_id += 1;
            self.next_id
        }

        fn recompute_vote_counts(&mut self, post_id: Id) {
            let up = self
                .votes
                .iter()
                .filter(|((p, _), v)| *p == post_id && **v == VoteType::Up)
                .count() as i64;
            let down = self
                .votes
                .iter()
                .filter(|((p, _), v)| *p == post_id && **v == VoteType::Down)
                .count() as i64;
            if let Some(post) = self.posts.get_mut(&post_id) {
                post.upvotes = up;
                post.downvotes = down;
                post.updated_at = Utc::now();
            }
        }

        fn recompute_member_count(&mut self, name: &str) -> i64 {
            let count = self.members.iter().filter(|(_, s)| s == name).count() as i64;
            if let Some(subfapp) = self.subfapps.get_mut(name) {
                subfapp.member_count = count;
            }
            count
        }

        fn recompute_like_count(&mut self, comment_id: Id) -> i64 {
            let count = self.likes.iter().filter(|(c, _)| *c == comment_id).count() as i64;
            if let Some(comment) = self.comments.get_mut(&comment_id) {
                comment.likes = count;
                comment.updated_at = Utc::now();
            }
            count
        }
    }

    #[derive(Clone, Default)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
    }

    impl InMemRepo {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl PostRepo for InMemRepo {
        async fn create_post(&self, new: NewPost) -> RepoResult<Post> {
            let mut s = self.state.write().unwrap();
            if !s.subfapps.contains_key(&new.subfapp_name) {
                return Err(RepoError::NotFound);
            }
            let now = Utc::now();
            let id = s.next_id();
            let post = Post {
                id,
                title: new.title,
                content: new.content,
                image_url: new.image_url,
                subfapp_name: new.subfapp_name,
                user_id: new.user_id,
                upvotes: 0,
                downvotes: 0,
                created_at: now,
                updated_at: now,
            };
            s.posts.insert(id, post.clone());
            Ok(post)
        }

        async fn get_post(&self, id: Id) -> RepoResult<Post> {
            let s = self.state.read().unwrap();
            s.posts.get(&id).cloned().ok_or(RepoError::NotFound)
        }

        async fn list_posts(&self, limit: i64) -> RepoResult<Vec<Post>> {
            let s = self.state.read().unwrap();
            let mut v: Vec<_> = s.posts.values().cloned().collect();
            v.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            v.truncate(limit.max(0) as usize);
            Ok(v)
        }

        async fn cast_vote(
            &self,
            post_id: Id,
            user_id: &str,
            direction: Option<VoteType>,
        ) -> RepoResult<VoteTally> {
            let mut s = self.state.write().unwrap();
            if !s.posts.contains_key(&post_id) {
                return Err(RepoError::NotFound);
            }
            let key = (post_id, user_id.to_string());
            let current = s.votes.get(&key).copied();
            // same direction again toggles off
            let next = match (current, direction) {
                (Some(cur), Some(req)) if cur == req => None,
                (_, req) => req,
            };
            s.votes.remove(&key);
            if let Some(v) = next {
                s.votes.insert(key, v);
            }
            s.recompute_vote_counts(post_id);
            let post = &s.posts[&post_id];
            Ok(VoteTally {
                upvotes: post.upvotes,
                downvotes: post.downvotes,
                user_vote: next,
            })
        }

        async fn user_votes(&self, user_id: &str) -> RepoResult<Vec<UserVote>> {
            let s = self.state.read().unwrap();
            let mut v: Vec<_> = s
                .votes
                .iter()
                .filter(|((_, u), _)| u == user_id)
                .map(|((p, _), vote)| UserVote { post_id: *p, vote_type: *vote })
                .collect();
            v.sort_by_key(|uv| uv.post_id);
            Ok(v)
        }
    }

    #[async_trait]
    impl SubfappRepo for InMemRepo {
        async fn create_subfapp(&self, new: NewSubfapp) -> RepoResult<Subfapp> {
            let mut s = self.state.write().unwrap();
            if s.subfapps.contains_key(&new.name) {
                return Err(RepoError::Conflict);
            }
            let id = s.next_id();
            let subfapp = Subfapp {
                id,
                name: new.name.clone(),
                description: new.description,
                member_count: 0,
                created_at: Utc::now(),
            };
            s.subfapps.insert(new.name, subfapp.clone());
            Ok(subfapp)
        }

        async fn list_subfapps(&self) -> RepoResult<Vec<Subfapp>> {
            let s = self.state.read().unwrap();
            let mut v: Vec<_> = s.subfapps.values().cloned().collect();
            v.sort_by(|a, b| b.member_count.cmp(&a.member_count).then(a.name.cmp(&b.name)));
            Ok(v)
        }

        async fn set_membership(
            &self,
            user_id: &str,
            subfapp_name: &str,
            action: MembershipAction,
        ) -> RepoResult<i64> {
            let mut s = self.state.write().unwrap();
            if !s.subfapps.contains_key(subfapp_name) {
                return Err(RepoError::NotFound);
            }
            let key = (user_id.to_string(), subfapp_name.to_string());
            match action {
                MembershipAction::Join => {
                    s.members.insert(key);
                }
                MembershipAction::Leave => {
                    s.members.remove(&key);
                }
            }
            Ok(s.recompute_member_count(subfapp_name))
        }

        async fn user_memberships(&self, user_id: &str) -> RepoResult<Vec<UserMembership>> {
            let s = self.state.read().unwrap();
            let mut v: Vec<_> = s
                .members
                .iter()
                .filter(|(u, _)| u == user_id)
                .map(|(_, name)| UserMembership { subfapp_name: name.clone() })
                .collect();
            v.sort_by(|a, b| a.subfapp_name.cmp(&b.subfapp_name));
            Ok(v)
        }
    }

    #[async_trait]
    impl CommentRepo for InMemRepo {
        async fn create_comment(&self, new: NewComment) -> RepoResult<Comment> {
            let mut s = self.state.write().unwrap();
            if !s.posts.contains_key(&new.post_id) {
                return Err(RepoError::NotFound);
            }
            let now = Utc::now();
            let id = s.next_id();
            let comment = Comment {
                id,
                post_id: new.post_id,
                user_id: new.user_id,
                user_name: new.user_name,
                user_avatar: new.user_avatar,
                content: new.content,
                likes: 0,
                created_at: now,
                updated_at: now,
            };
            s.comments.insert(id, comment.clone());
            Ok(comment)
        }

        async fn list_comments(&self, post_id: Id) -> RepoResult<Vec<CommentThread>> {
            let s = self.state.read().unwrap();
            if !s.posts.contains_key(&post_id) {
                return Err(RepoError::NotFound);
            }
            let mut comments: Vec<_> = s
                .comments
                .values()
                .filter(|c| c.post_id == post_id)
                .cloned()
                .collect();
            comments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            Ok(comments
                .into_iter()
                .map(|comment| {
                    let mut replies: Vec<_> = s
                        .replies
                        .values()
                        .filter(|r| r.parent_comment_id == comment.id)
                        .cloned()
                        .collect();
                    replies.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
                    CommentThread { reply_count: replies.len() as i64, comment, replies }
                })
                .collect())
        }

        async fn toggle_like(&self, comment_id: Id, user_id: &str) -> RepoResult<i64> {
            let mut s = self.state.write().unwrap();
            if !s.comments.contains_key(&comment_id) {
                return Err(RepoError::NotFound);
            }
            let key = (comment_id, user_id.to_string());
            if !s.likes.remove(&key) {
                s.likes.insert(key);
            }
            Ok(s.recompute_like_count(comment_id))
        }

        async fn create_reply(&self, new: NewReply) -> RepoResult<Reply> {
            let mut s = self.state.write().unwrap();
            if !s.comments.contains_key(&new.parent_comment_id) {
                return Err(RepoError::NotFound);
            }
            let now = Utc::now();
            let id = s.next_id();
            let reply = Reply {
                id,
                parent_comment_id: new.parent_comment_id,
                user_id: new.user_id,
                user_name: new.user_name,
                user_avatar: new.user_avatar,
                content: new.content,
                created_at: now,
                updated_at: now,
            };
            s.replies.insert(id, reply.clone());
            Ok(reply)
        }
    }

    #[async_trait]
    impl HealthRepo for InMemRepo {
        async fn ping(&self) -> RepoResult<()> {
            Ok(())
        }
    }
}

// Postgres implementation (feature = "postgres-store")
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use sqlx::{Pool, Postgres};
    use std::collections::HashMap;

    #[derive(Clone)]
    pub struct PgRepo {
        pool: Pool<Postgres>,
    }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self {
            Self { pool }
        }
    }

    fn storage(e: sqlx::Error) -> RepoError {
        if let sqlx::Error::Database(ref db) = e {
            // 23505 = unique_violation
            if db.code().as_deref() == Some("23505") {
                return RepoError::Conflict;
            }
        }
        RepoError::Storage(e.to_string())
    }

    #[async_trait]
    impl PostRepo for PgRepo {
        async fn create_post(&self, new: NewPost) -> RepoResult<Post> {
            let exists: Option<(Id,)> =
                sqlx::query_as("SELECT id FROM subfapps WHERE name = $1")
                    .bind(&new.subfapp_name)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(storage)?;
            if exists.is_none() {
                return Err(RepoError::NotFound);
            }
            sqlx::query_as::<_, Post>(
                r#"
                INSERT INTO posts (title, content, image_url, subfapp_name, user_id)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, title, content, image_url, subfapp_name, user_id,
                          upvotes, downvotes, created_at, updated_at
                "#,
            )
            .bind(&new.title)
            .bind(&new.content)
            .bind(&new.image_url)
            .bind(&new.subfapp_name)
            .bind(&new.user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(storage)
        }

        async fn get_post(&self, id: Id) -> RepoResult<Post> {
            sqlx::query_as::<_, Post>(
                r#"
                SELECT id, title, content, image_url, subfapp_name, user_id,
                       upvotes, downvotes, created_at, updated_at
                FROM posts WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?
            .ok_or(RepoError::NotFound)
        }

        async fn list_posts(&self, limit: i64) -> RepoResult<Vec<Post>> {
            sqlx::query_as::<_, Post>(
                r#"
                SELECT id, title, content, image_url, subfapp_name, user_id,
                       upvotes, downvotes, created_at, updated_at
                FROM posts ORDER BY created_at DESC, id DESC LIMIT $1
                "#,
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)
        }

        async fn cast_vote(
            &self,
            post_id: Id,
            user_id: &str,
            direction: Option<VoteType>,
        ) -> RepoResult<VoteTally> {
            let mut tx = self.pool.begin().await.map_err(storage)?;
            // lock the post row so concurrent voters serialize their recomputes
            let locked: Option<(Id,)> =
                sqlx::query_as("SELECT id FROM posts WHERE id = $1 FOR UPDATE")
                    .bind(post_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(storage)?;
            if locked.is_none() {
                return Err(RepoError::NotFound);
            }
            let current: Option<(String,)> = sqlx::query_as(
                "SELECT vote_type FROM post_votes WHERE post_id = $1 AND user_id = $2",
            )
            .bind(post_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage)?;
            let current = current.and_then(|(v,)| VoteType::parse(&v));
            let next = match (current, direction) {
                (Some(cur), Some(req)) if cur == req => None,
                (_, req) => req,
            };
            sqlx::query("DELETE FROM post_votes WHERE post_id = $1 AND user_id = $2")
                .bind(post_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(storage)?;
            if let Some(v) = next {
                sqlx::query(
                    "INSERT INTO post_votes (post_id, user_id, vote_type) VALUES ($1, $2, $3)",
                )
                .bind(post_id)
                .bind(user_id)
                .bind(v.as_str())
                .execute(&mut *tx)
                .await
                .map_err(storage)?;
            }
            let (upvotes, downvotes): (i64, i64) = sqlx::query_as(
                r#"
                UPDATE posts SET
                    upvotes = (SELECT COUNT(*) FROM post_votes
                               WHERE post_id = $1 AND vote_type = 'up'),
                    downvotes = (SELECT COUNT(*) FROM post_votes
                                 WHERE post_id = $1 AND vote_type = 'down'),
                    updated_at = now()
                WHERE id = $1
                RETURNING upvotes, downvotes
                "#,
            )
            .bind(post_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(storage)?;
            tx.commit().await.map_err(storage)?;
            Ok(VoteTally { upvotes, downvotes, user_vote: next })
        }

        async fn user_votes(&self, user_id: &str) -> RepoResult<Vec<UserVote>> {
            let rows: Vec<(Id, String)> = sqlx::query_as(
                "SELECT post_id, vote_type FROM post_votes WHERE user_id = $1 ORDER BY post_id",
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
            Ok(rows
                .into_iter()
                .filter_map(|(post_id, v)| {
                    VoteType::parse(&v).map(|vote_type| UserVote { post_id, vote_type })
                })
                .collect())
        }
    }

    #[async_trait]
    impl SubfappRepo for PgRepo {
        async fn create_subfapp(&self, new: NewSubfapp) -> RepoResult<Subfapp> {
            sqlx::query_as::<_, Subfapp>(
                r#"
                INSERT INTO subfapps (name, description) VALUES ($1, $2)
                RETURNING id, name, description, member_count, created_at
                "#,
            )
            .bind(&new.name)
            .bind(&new.description)
            .fetch_one(&self.pool)
            .await
            .map_err(storage)
        }

        async fn list_subfapps(&self) -> RepoResult<Vec<Subfapp>> {
            sqlx::query_as::<_, Subfapp>(
                r#"
                SELECT id, name, description, member_count, created_at
                FROM subfapps ORDER BY member_count DESC, name
                "#,
            )
            .fetch_all(&self.pool)
            .await
            .map_err(storage)
        }

        async fn set_membership(
            &self,
            user_id: &str,
            subfapp_name: &str,
            action: MembershipAction,
        ) -> RepoResult<i64> {
            let mut tx = self.pool.begin().await.map_err(storage)?;
            let locked: Option<(Id,)> =
                sqlx::query_as("SELECT id FROM subfapps WHERE name = $1 FOR UPDATE")
                    .bind(subfapp_name)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(storage)?;
            if locked.is_none() {
                return Err(RepoError::NotFound);
            }
            match action {
                MembershipAction::Join => {
                    sqlx::query(
                        r#"
                        INSERT INTO subfapp_members (user_id, subfapp_name) VALUES ($1, $2)
                        ON CONFLICT (user_id, subfapp_name) DO NOTHING
                        "#,
                    )
                    .bind(user_id)
                    .bind(subfapp_name)
                    .execute(&mut *tx)
                    .await
                    .map_err(storage)?;
                }
                MembershipAction::Leave => {
                    sqlx::query(
                        "DELETE FROM subfapp_members WHERE user_id = $1 AND subfapp_name = $2",
                    )
                    .bind(user_id)
                    .bind(subfapp_name)
                    .execute(&mut *tx)
                    .await
                    .map_err(storage)?;
                }
            }
            let (member_count,): (i64,) = sqlx::query_as(
                r#"
                UPDATE subfapps SET
                    member_count = (SELECT COUNT(*) FROM subfapp_members
                                    WHERE subfapp_name = $1)
                WHERE name = $1
                RETURNING member_count
                "#,
            )
            .bind(subfapp_name)
            .fetch_one(&mut *tx)
            .await
            .map_err(storage)?;
            tx.commit().await.map_err(storage)?;
            Ok(member_count)
        }

        async fn user_memberships(&self, user_id: &str) -> RepoResult<Vec<UserMembership>> {
            let rows: Vec<(String,)> = sqlx::query_as(
                r#"
                SELECT subfapp_name FROM subfapp_members
                WHERE user_id = $1 ORDER BY subfapp_name
                "#,
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
            Ok(rows
                .into_iter()
                .map(|(subfapp_name,)| UserMembership { subfapp_name })
                .collect())
        }
    }

    #[async_trait]
    impl CommentRepo for PgRepo {
        async fn create_comment(&self, new: NewComment) -> RepoResult<Comment> {
            let exists: Option<(Id,)> = sqlx::query_as("SELECT id FROM posts WHERE id = $1")
                .bind(new.post_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage)?;
            if exists.is_none() {
                return Err(RepoError::NotFound);
            }
            sqlx::query_as::<_, Comment>(
                r#"
                INSERT INTO comments (post_id, user_id, user_name, user_avatar, content)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, post_id, user_id, user_name, user_avatar, content,
                          likes, created_at, updated_at
                "#,
            )
            .bind(new.post_id)
            .bind(&new.user_id)
            .bind(&new.user_name)
            .bind(&new.user_avatar)
            .bind(&new.content)
            .fetch_one(&self.pool)
            .await
            .map_err(storage)
        }

        async fn list_comments(&self, post_id: Id) -> RepoResult<Vec<CommentThread>> {
            let exists: Option<(Id,)> = sqlx::query_as("SELECT id FROM posts WHERE id = $1")
                .bind(post_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage)?;
            if exists.is_none() {
                return Err(RepoError::NotFound);
            }
            let comments = sqlx::query_as::<_, Comment>(
                r#"
                SELECT id, post_id, user_id, user_name, user_avatar, content,
                       likes, created_at, updated_at
                FROM comments WHERE post_id = $1 ORDER BY created_at DESC, id DESC
                "#,
            )
            .bind(post_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
            let replies = sqlx::query_as::<_, Reply>(
                r#"
                SELECT r.id, r.parent_comment_id, r.user_id, r.user_name, r.user_avatar,
                       r.content, r.created_at, r.updated_at
                FROM comment_replies r
                JOIN comments c ON c.id = r.parent_comment_id
                WHERE c.post_id = $1
                ORDER BY r.created_at ASC, r.id ASC
                "#,
            )
            .bind(post_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
            let mut by_parent: HashMap<Id, Vec<Reply>> = HashMap::new();
            for reply in replies {
                by_parent.entry(reply.parent_comment_id).or_default().push(reply);
            }
            Ok(comments
                .into_iter()
                .map(|comment| {
                    let replies = by_parent.remove(&comment.id).unwrap_or_default();
                    CommentThread { reply_count: replies.len() as i64, comment, replies }
                })
                .collect())
        }

        async fn toggle_like(&self, comment_id: Id, user_id: &str) -> RepoResult<i64> {
            let mut tx = self.pool.begin().await.map_err(storage)?;
            let locked: Option<(Id,)> =
                sqlx::query_as("SELECT id FROM comments WHERE id = $1 FOR UPDATE")
                    .bind(comment_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(storage)?;
            if locked.is_none() {
                return Err(RepoError::NotFound);
            }
            let removed = sqlx::query(
                "DELETE FROM comment_likes WHERE comment_id = $1 AND user_id = $2",
            )
            .bind(comment_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(storage)?
            .rows_affected();
            if removed == 0 {
                sqlx::query("INSERT INTO comment_likes (comment_id, user_id) VALUES ($1, $2)")
                    .bind(comment_id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(storage)?;
            }
            let (likes,): (i64,) = sqlx::query_as(
                r#"
                UPDATE comments SET
                    likes = (SELECT COUNT(*) FROM comment_likes WHERE comment_id = $1),
                    updated_at = now()
                WHERE id = $1
                RETURNING likes
                "#,
            )
            .bind(comment_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(storage)?;
            tx.commit().await.map_err(storage)?;
            Ok(likes)
        }

        async fn create_reply(&self, new: NewReply) -> RepoResult<Reply> {
            let exists: Option<(Id,)> = sqlx::query_as("SELECT id FROM comments WHERE id = $1")
                .bind(new.parent_comment_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage)?;
            if exists.is_none() {
                return Err(RepoError::NotFound);
            }
            sqlx::query_as::<_, Reply>(
                r#"
                INSERT INTO comment_replies (parent_comment_id, user_id, user_name,
                                             user_avatar, content)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, parent_comment_id, user_id, user_name, user_avatar,
                          content, created_at, updated_at
                "#,
            )
            .bind(new.parent_comment_id)
            .bind(&new.user_id)
            .bind(&new.user_name)
            .bind(&new.user_avatar)
            .bind(&new.content)
            .fetch_one(&self.pool)
            .await
            .map_err(storage)
        }
    }

    #[async_trait]
    impl HealthRepo for PgRepo {
        async fn ping(&self) -> RepoResult<()> {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(storage)?;
            Ok(())
        }
    }
}
