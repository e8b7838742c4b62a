use std::future::Future;
use std::sync::Arc;

use threadline_core::pagination::{assemble_page, CommentScope, Page, PageRequest, ReplyScope};
use threadline_core::{Comment, NewComment};
use threadline_realtime::bus::{CommentBus, Subscription};
use threadline_storage::{CommentStorage, PostStorage};

use crate::error::{require_positive, require_text};
use crate::{ServiceError, COMMENT_PAGE_LIMITS};

#[derive(Clone)]
pub struct CommentService {
    comments: Arc<dyn CommentStorage>,
    posts: Arc<dyn PostStorage>,
    bus: Arc<CommentBus>,
}

impl CommentService {
    #[must_use]
    pub fn new(
        comments: Arc<dyn CommentStorage>,
        posts: Arc<dyn PostStorage>,
        bus: Arc<CommentBus>,
    ) -> Self {
        Self {
            comments,
            posts,
            bus,
        }
    }

    /// Persists a comment and then offers it to the post's live listeners.
    ///
    /// The post must exist and accept comments. A parent, when given, must
    /// be a comment on the same post.
    pub async fn create_comment(&self, comment: NewComment) -> Result<Comment, ServiceError> {
        require_positive(comment.post_id, "post_id")?;
        require_positive(comment.author_id, "author_id")?;
        if let Some(parent_id) = comment.parent_id {
            require_positive(parent_id, "parent_id")?;
        }
        require_text(&comment.body, "body")?;

        let post = self.posts.get_post(comment.post_id).await?;
        if !post.comments_enabled {
            return Err(ServiceError::Forbidden("comments are disabled for this post"));
        }
        if let Some(parent_id) = comment.parent_id {
            let parent = self.comments.get_comment(parent_id).await?;
            if parent.post_id != comment.post_id {
                return Err(ServiceError::invalid(
                    "parent comment belongs to another post",
                ));
            }
        }

        let created = self.comments.create_comment(&comment).await?;
        let delivered = self.bus.publish(created.post_id, &created).await;
        tracing::debug!(
            post_id = created.post_id,
            comment_id = created.id,
            delivered,
            "comment created"
        );
        Ok(created)
    }

    pub async fn get_comment(&self, comment_id: i64) -> Result<Comment, ServiceError> {
        require_positive(comment_id, "comment_id")?;
        Ok(self.comments.get_comment(comment_id).await?)
    }

    /// Newest-first page of a post's comments, replies included.
    pub async fn list_comments(
        &self,
        post_id: i64,
        request: &PageRequest,
    ) -> Result<Page<Comment>, ServiceError> {
        require_positive(post_id, "post_id")?;
        let storage = &self.comments;
        let page = assemble_page(
            COMMENT_PAGE_LIMITS,
            request,
            CommentScope { post_id },
            |query| async move { storage.list_comments(&query).await },
        )
        .await?;
        Ok(page)
    }

    /// Newest-first page of the direct replies to `parent_id`.
    pub async fn list_replies(
        &self,
        post_id: i64,
        parent_id: i64,
        request: &PageRequest,
    ) -> Result<Page<Comment>, ServiceError> {
        require_positive(post_id, "post_id")?;
        require_positive(parent_id, "parent_id")?;
        let storage = &self.comments;
        let page = assemble_page(
            COMMENT_PAGE_LIMITS,
            request,
            ReplyScope { post_id, parent_id },
            |query| async move { storage.list_replies(&query).await },
        )
        .await?;
        Ok(page)
    }

    /// Live feed of comments created on `post_id` until `lifetime` completes.
    pub async fn subscribe<F>(&self, post_id: i64, lifetime: F) -> Result<Subscription, ServiceError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        require_positive(post_id, "post_id")?;
        Ok(self.bus.subscribe_until(post_id, lifetime).await)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    use futures_util::StreamExt;
    use threadline_core::pagination::PageRequest;
    use threadline_core::{Comment, NewComment, NewPost};
    use threadline_realtime::bus::{BusConfig, CommentBus};
    use threadline_storage::{MemoryStorage, PostStorage};
    use time::macros::datetime;
    use time::{Duration, OffsetDateTime};
    use tokio::sync::oneshot;

    use super::CommentService;
    use crate::ServiceError;

    struct Fixture {
        service: CommentService,
        storage: Arc<MemoryStorage>,
        bus: Arc<CommentBus>,
    }

    async fn fixture(posts: usize) -> Fixture {
        let storage = Arc::new(MemoryStorage::new());
        for _ in 0..posts {
            storage
                .create_post(&NewPost {
                    author_id: 1,
                    title: "title".to_owned(),
                    body: "body".to_owned(),
                    comments_enabled: true,
                })
                .await
                .expect("seed post");
        }
        let bus = Arc::new(CommentBus::new(BusConfig::default()));
        let service = CommentService::new(storage.clone(), storage.clone(), bus.clone());
        Fixture {
            service,
            storage,
            bus,
        }
    }

    fn comment(post_id: i64, parent_id: Option<i64>, body: &str) -> NewComment {
        NewComment {
            post_id,
            parent_id,
            author_id: 2,
            body: body.to_owned(),
        }
    }

    fn t(index: i64) -> OffsetDateTime {
        datetime!(2024-07-01 09:00:00 UTC) + Duration::seconds(index)
    }

    fn ids(comments: &[Comment]) -> Vec<i64> {
        comments.iter().map(|comment| comment.id).collect()
    }

    #[tokio::test]
    async fn created_comment_reaches_live_listener() {
        let fixture = fixture(1).await;
        let mut subscription = fixture
            .service
            .subscribe(1, std::future::pending())
            .await
            .expect("subscribe");

        let created = fixture
            .service
            .create_comment(comment(1, None, "first"))
            .await
            .expect("create");

        let received = tokio::time::timeout(StdDuration::from_secs(1), subscription.recv())
            .await
            .expect("receive before timeout")
            .expect("comment");
        assert_eq!(received, created);
    }

    #[tokio::test]
    async fn ended_lifetime_stops_delivery() {
        let fixture = fixture(1).await;
        let (stop, stopped) = oneshot::channel::<()>();
        let mut subscription = fixture
            .service
            .subscribe(1, async move {
                let _ = stopped.await;
            })
            .await
            .expect("subscribe");

        fixture
            .service
            .create_comment(comment(1, None, "a"))
            .await
            .expect("create a");
        assert_eq!(subscription.recv().await.expect("comment a").body, "a");

        stop.send(()).expect("stop listener");
        tokio::time::timeout(StdDuration::from_secs(1), async {
            while fixture.bus.listener_count(1).await > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("listener removed");

        fixture
            .service
            .create_comment(comment(1, None, "b"))
            .await
            .expect("create b");
        assert!(subscription.next().await.is_none());
    }

    #[tokio::test]
    async fn disabled_comments_are_forbidden_and_not_published() {
        let fixture = fixture(1).await;
        fixture
            .storage
            .set_comments_enabled(1, false)
            .await
            .expect("disable");
        let mut subscription = fixture.bus.subscribe(1).await;

        let error = fixture
            .service
            .create_comment(comment(1, None, "nope"))
            .await
            .expect_err("comments disabled");
        assert!(matches!(error, ServiceError::Forbidden(_)));
        assert!(subscription.try_recv().is_none());
    }

    #[tokio::test]
    async fn parent_must_exist_on_same_post() {
        let fixture = fixture(2).await;
        let root = fixture
            .service
            .create_comment(comment(1, None, "root"))
            .await
            .expect("root");

        let error = fixture
            .service
            .create_comment(comment(2, Some(root.id), "cross-post"))
            .await
            .expect_err("parent on other post");
        assert!(matches!(error, ServiceError::InvalidRequest(_)));

        assert_eq!(
            fixture
                .service
                .create_comment(comment(1, Some(99), "orphan"))
                .await,
            Err(ServiceError::NotFound)
        );
        assert_eq!(
            fixture
                .service
                .create_comment(comment(7, None, "no post"))
                .await,
            Err(ServiceError::NotFound)
        );
    }

    #[tokio::test]
    async fn create_comment_validates_input() {
        let fixture = fixture(1).await;
        for input in [
            comment(0, None, "body"),
            comment(1, Some(0), "body"),
            comment(1, None, " "),
            NewComment {
                author_id: 0,
                ..comment(1, None, "body")
            },
        ] {
            assert!(matches!(
                fixture.service.create_comment(input).await,
                Err(ServiceError::InvalidRequest(_))
            ));
        }
    }

    #[tokio::test]
    async fn replies_page_with_peek_row() {
        let fixture = fixture(1).await;
        let root = fixture
            .storage
            .create_comment_at(&comment(1, None, "root"), t(0))
            .await
            .expect("root");
        for index in 1..=4 {
            fixture
                .storage
                .create_comment_at(&comment(1, Some(root.id), "reply"), t(index))
                .await
                .expect("reply");
        }

        let first = fixture
            .service
            .list_replies(1, root.id, &PageRequest::first(3))
            .await
            .expect("first replies page");
        assert_eq!(ids(&first.items), vec![5, 4, 3]);
        assert!(first.has_next_page);

        let rest = fixture
            .service
            .list_replies(
                1,
                root.id,
                &PageRequest::after(3, first.end_cursor.clone().expect("end cursor")),
            )
            .await
            .expect("second replies page");
        assert_eq!(ids(&rest.items), vec![2]);
        assert!(!rest.has_next_page);

        let back = fixture
            .service
            .list_replies(
                1,
                root.id,
                &PageRequest::before(3, rest.start_cursor.clone().expect("start cursor")),
            )
            .await
            .expect("backward replies page");
        assert_eq!(ids(&back.items), vec![5, 4, 3]);
    }

    #[tokio::test]
    async fn list_comments_includes_replies() {
        let fixture = fixture(1).await;
        let root = fixture
            .service
            .create_comment(comment(1, None, "root"))
            .await
            .expect("root");
        fixture
            .service
            .create_comment(comment(1, Some(root.id), "reply"))
            .await
            .expect("reply");

        let page = fixture
            .service
            .list_comments(1, &PageRequest::default())
            .await
            .expect("comments");
        assert_eq!(page.count, 2);
        assert!(matches!(
            fixture
                .service
                .list_comments(0, &PageRequest::default())
                .await,
            Err(ServiceError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn get_comment_validates_and_maps_not_found() {
        let fixture = fixture(1).await;
        let created = fixture
            .service
            .create_comment(comment(1, None, "hello"))
            .await
            .expect("create");
        assert_eq!(
            fixture.service.get_comment(created.id).await.expect("get"),
            created
        );
        assert!(matches!(
            fixture.service.get_comment(-1).await,
            Err(ServiceError::InvalidRequest(_))
        ));
        assert_eq!(
            fixture.service.get_comment(404).await,
            Err(ServiceError::NotFound)
        );
    }
}
