use chrono::{Duration, Utc};
use std::sync::Arc;
use techtalk_store::{
    BcryptHasher, NewComment, NewPost, PostStore, PostUpdate, StoreError,
};

async fn memory_store() -> PostStore {
    PostStore::connect_with_hasher("sqlite::memory:", Arc::new(BcryptHasher::new(4)))
        .await
        .expect("in-memory store")
}

fn new_post(title: &str, password: &str) -> NewPost {
    NewPost {
        title: title.to_string(),
        content: format!("{title} body"),
        tags: vec!["rust".into(), "sqlx".into()],
        url: Some("https://example.com".into()),
        thumbnail_url: None,
        password: password.to_string(),
    }
}

fn new_comment(post_id: i64, content: &str) -> NewComment {
    NewComment {
        post_id,
        content: content.to_string(),
        password: "c-pass".into(),
    }
}

#[tokio::test]
async fn create_then_read_counts_views() {
    let store = memory_store().await;
    let created = store.create_post(new_post("hello", "pw")).await.unwrap();
    assert_eq!(created.views, 0);
    assert_eq!(created.tags, vec!["rust", "sqlx"]);

    let first = store.get_post(created.id).await.unwrap();
    let second = store.get_post(created.id).await.unwrap();
    assert_eq!(first.post.views, 1);
    assert_eq!(second.post.views, 2);
    assert!(second.comments.is_empty());
}

#[tokio::test]
async fn missing_post_is_not_found() {
    let store = memory_store().await;
    assert!(matches!(store.get_post(42).await, Err(StoreError::PostNotFound)));
    assert!(matches!(
        store.verify_post_password(42, "x").await,
        Err(StoreError::PostNotFound)
    ));
    assert!(matches!(
        store.create_comment(new_comment(42, "orphan")).await,
        Err(StoreError::PostNotFound)
    ));
}

#[tokio::test]
async fn list_is_newest_first_with_comment_counts() {
    let store = memory_store().await;
    let older = store.create_post(new_post("older", "pw")).await.unwrap();
    let newer = store.create_post(new_post("newer", "pw")).await.unwrap();
    store.create_comment(new_comment(older.id, "one")).await.unwrap();
    store.create_comment(new_comment(older.id, "two")).await.unwrap();

    let list = store.list_posts().await.unwrap();
    let ids: Vec<i64> = list.iter().map(|s| s.post.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);
    assert_eq!(list[0].comment_count, 0);
    assert_eq!(list[1].comment_count, 2);
}

#[tokio::test]
async fn post_mutations_require_the_password() {
    let store = memory_store().await;
    let post = store.create_post(new_post("gated", "right")).await.unwrap();

    assert!(matches!(
        store.verify_post_password(post.id, "wrong").await,
        Err(StoreError::PasswordMismatch)
    ));
    store.verify_post_password(post.id, "right").await.unwrap();

    let update = |password: &str| PostUpdate {
        title: "edited".into(),
        content: "edited body".into(),
        tags: vec!["go".into()],
        url: None,
        thumbnail_url: Some("https://img.example.com/t.png".into()),
        password: password.to_string(),
    };
    assert!(matches!(
        store.update_post(post.id, update("wrong")).await,
        Err(StoreError::PasswordMismatch)
    ));
    let updated = store.update_post(post.id, update("right")).await.unwrap();
    assert_eq!(updated.title, "edited");
    assert_eq!(updated.tags, vec!["go"]);
    assert!(updated.url.is_none());
    assert_eq!(updated.created_at, post.created_at);

    assert!(matches!(
        store.delete_post(post.id, "wrong").await,
        Err(StoreError::PasswordMismatch)
    ));
    store.get_post(post.id).await.expect("still there");
}

#[tokio::test]
async fn deleting_a_post_deletes_its_comments() {
    let store = memory_store().await;
    let post = store.create_post(new_post("doomed", "pw")).await.unwrap();
    let keep = store.create_post(new_post("kept", "pw")).await.unwrap();
    let comment = store.create_comment(new_comment(post.id, "bye")).await.unwrap();
    store.create_comment(new_comment(keep.id, "stay")).await.unwrap();

    store.delete_post(post.id, "pw").await.unwrap();

    assert!(matches!(store.get_post(post.id).await, Err(StoreError::PostNotFound)));
    assert!(matches!(
        store.delete_comment(comment.id, Some("c-pass")).await,
        Err(StoreError::CommentNotFound)
    ));
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comment")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(remaining, 1);
}

#[tokio::test]
async fn comment_update_checks_fields_then_password() {
    let store = memory_store().await;
    let post = store.create_post(new_post("p", "pw")).await.unwrap();
    let comment = store.create_comment(new_comment(post.id, "first")).await.unwrap();

    assert!(matches!(
        store.update_comment(999, Some("c-pass"), Some("x")).await,
        Err(StoreError::CommentNotFound)
    ));
    assert!(matches!(
        store.update_comment(comment.id, None, Some("x")).await,
        Err(StoreError::MissingField("Password and content required"))
    ));
    assert!(matches!(
        store.update_comment(comment.id, Some("c-pass"), Some("")).await,
        Err(StoreError::MissingField(_))
    ));
    assert!(matches!(
        store.update_comment(comment.id, Some("nope"), Some("x")).await,
        Err(StoreError::CommentPasswordMismatch)
    ));

    let updated = store
        .update_comment(comment.id, Some("c-pass"), Some("second"))
        .await
        .unwrap();
    assert_eq!(updated.content, "second");
    assert_eq!(updated.post_id, post.id);
}

#[tokio::test]
async fn comment_delete_requires_password() {
    let store = memory_store().await;
    let post = store.create_post(new_post("p", "pw")).await.unwrap();
    let comment = store.create_comment(new_comment(post.id, "c")).await.unwrap();

    assert!(matches!(
        store.delete_comment(comment.id, None).await,
        Err(StoreError::MissingField("Password required"))
    ));
    assert!(matches!(
        store.delete_comment(comment.id, Some("bad")).await,
        Err(StoreError::CommentPasswordMismatch)
    ));
    store.delete_comment(comment.id, Some("c-pass")).await.unwrap();
    assert!(store.get_post(post.id).await.unwrap().comments.is_empty());
}

#[tokio::test]
async fn comments_page_oldest_first() {
    let store = memory_store().await;
    let post = store.create_post(new_post("p", "pw")).await.unwrap();
    for i in 0..5 {
        store
            .create_comment(new_comment(post.id, &format!("c{i}")))
            .await
            .unwrap();
    }

    let page = store.list_comments(post.id, 1, 2).await.unwrap();
    let contents: Vec<&str> = page.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, vec!["c1", "c2"]);

    let tail = store.list_comments(post.id, 4, 20).await.unwrap();
    assert_eq!(tail.len(), 1);
    assert!(store.list_comments(post.id, 10, 20).await.unwrap().is_empty());
    assert!(matches!(
        store.list_comments(post.id + 1, 0, 20).await,
        Err(StoreError::PostNotFound)
    ));

    let detail = store.get_post(post.id).await.unwrap();
    assert_eq!(detail.comments.first().unwrap().content, "c0");
}

#[tokio::test]
async fn posts_between_is_half_open() {
    let store = memory_store().await;
    let post = store.create_post(new_post("recent", "pw")).await.unwrap();
    store.create_comment(new_comment(post.id, "c")).await.unwrap();

    let hour = Duration::hours(1);
    let hits = store
        .posts_between(post.created_at, post.created_at + hour)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].comment_count, 1);

    let before = store
        .posts_between(post.created_at - hour, post.created_at)
        .await
        .unwrap();
    assert!(before.is_empty());

    let future = Utc::now() + hour;
    assert!(store
        .posts_between(future, future + hour)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn file_database_survives_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("board.db").display());

    let store = PostStore::connect_with_hasher(&url, Arc::new(BcryptHasher::new(4)))
        .await
        .unwrap();
    let post = store.create_post(new_post("persisted", "pw")).await.unwrap();
    store.pool().close().await;

    let reopened = PostStore::connect_with_hasher(&url, Arc::new(BcryptHasher::new(4)))
        .await
        .unwrap();
    let detail = reopened.get_post(post.id).await.unwrap();
    assert_eq!(detail.post.title, "persisted");
}
