//! Relation-resolution integration tests over the mock driver.

mod common;

use common::{MockDriver, row};
use serde_json::json;
use trellis::builder::Operator;
use trellis::dialect::Dialect;
use trellis::entity::{ColumnDef, EntityDef, Registry};
use trellis::error::TrellisError;
use trellis::source::{DataSource, SourceConfig};
use trellis::value::Value;

fn blog_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register(
            EntityDef::new("User")
                .column(ColumnDef::new("id").primary())
                .column(ColumnDef::new("firstName"))
                .has_many("posts", "Post", "userId")
                .has_one("profile", "Profile", "userId"),
        )
        .unwrap();
    registry
        .register(
            EntityDef::new("Post")
                .column(ColumnDef::new("id").primary())
                .column(ColumnDef::new("userId"))
                .column(ColumnDef::new("title"))
                .belongs_to("author", "User", "userId")
                .many_to_many("tags", "Tag", "PostTag", "postId"),
        )
        .unwrap();
    registry
        .register(
            EntityDef::new("Profile")
                .column(ColumnDef::new("id").primary())
                .column(ColumnDef::new("userId"))
                .column(ColumnDef::new("bio")),
        )
        .unwrap();
    registry
        .register(
            EntityDef::new("Tag")
                .column(ColumnDef::new("id").primary())
                .column(ColumnDef::new("name"))
                .many_to_many("posts", "Post", "PostTag", "tagId"),
        )
        .unwrap();
    registry
        .register(
            EntityDef::new("PostTag")
                .column(ColumnDef::new("id").primary())
                .column(ColumnDef::new("postId"))
                .column(ColumnDef::new("tagId")),
        )
        .unwrap();
    registry
}

fn source(registry: Registry) -> DataSource {
    DataSource::new(SourceConfig::new(Dialect::MySql, "blog"), registry)
}

#[tokio::test]
async fn has_many_batches_into_one_query() {
    let source = source(blog_registry());
    let mut driver = MockDriver::new(Dialect::MySql)
        .respond(vec![
            row(json!({"id": 1, "first_name": "Ada"})),
            row(json!({"id": 2, "first_name": "Brin"})),
        ])
        .respond(vec![
            row(json!({"id": 10, "user_id": 1, "title": "a"})),
            row(json!({"id": 11, "user_id": 1, "title": "b"})),
            row(json!({"id": 12, "user_id": 2, "title": "c"})),
        ]);

    let users = source
        .query("User")
        .unwrap()
        .with("posts")
        .fetch_all(&mut driver, source.registry())
        .await
        .unwrap();

    assert_eq!(users.len(), 2);
    let posts_of = |i: usize| {
        users[i]
            .related_many("posts")
            .iter()
            .map(|p| p.get("id").unwrap().as_i64().unwrap())
            .collect::<Vec<_>>()
    };
    assert_eq!(posts_of(0), vec![10, 11]);
    assert_eq!(posts_of(1), vec![12]);

    let log = driver.log.lock().unwrap();
    // One query for the owners, exactly one more for the relation.
    assert_eq!(log.fetches.len(), 2);
    assert_eq!(
        log.fetches[1].0,
        "SELECT * FROM `posts` WHERE `user_id` IN (?, ?)"
    );
    assert_eq!(log.fetches[1].1, vec![Value::Int(1), Value::Int(2)]);
}

#[tokio::test]
async fn has_one_attaches_single_record() {
    let source = source(blog_registry());
    let mut driver = MockDriver::new(Dialect::MySql)
        .respond(vec![row(json!({"id": 1, "first_name": "Ada"}))])
        .respond(vec![row(json!({"id": 5, "user_id": 1, "bio": "hello"}))]);

    let users = source
        .query("User")
        .unwrap()
        .with("profile")
        .fetch_all(&mut driver, source.registry())
        .await
        .unwrap();

    let profile = users[0].related_one("profile").unwrap();
    assert_eq!(profile.get("bio"), Some(&json!("hello")));
}

#[tokio::test]
async fn belongs_to_maps_by_primary_key() {
    let source = source(blog_registry());
    let mut driver = MockDriver::new(Dialect::MySql)
        .respond(vec![
            row(json!({"id": 10, "user_id": 2, "title": "a"})),
            row(json!({"id": 11, "user_id": 1, "title": "b"})),
            row(json!({"id": 12, "user_id": null, "title": "orphan"})),
        ])
        .respond(vec![
            row(json!({"id": 1, "first_name": "Ada"})),
            row(json!({"id": 2, "first_name": "Brin"})),
        ]);

    let posts = source
        .query("Post")
        .unwrap()
        .with("author")
        .fetch_all(&mut driver, source.registry())
        .await
        .unwrap();

    assert_eq!(
        posts[0].related_one("author").unwrap().get("firstName"),
        Some(&json!("Brin"))
    );
    assert_eq!(
        posts[1].related_one("author").unwrap().get("firstName"),
        Some(&json!("Ada"))
    );
    assert!(posts[2].related_one("author").is_none());

    let log = driver.log.lock().unwrap();
    assert_eq!(log.fetches.len(), 2);
    // Distinct keys only, nulls excluded.
    assert_eq!(log.fetches[1].1, vec![Value::Int(2), Value::Int(1)]);
}

#[tokio::test]
async fn string_normalized_keys_merge_across_types() {
    let source = source(blog_registry());
    // The driver hands back string ids for the relation rows.
    let mut driver = MockDriver::new(Dialect::MySql)
        .respond(vec![row(json!({"id": 1, "first_name": "Ada"}))])
        .respond(vec![row(json!({"id": "10", "user_id": "1", "title": "a"}))]);

    let users = source
        .query("User")
        .unwrap()
        .with("posts")
        .fetch_all(&mut driver, source.registry())
        .await
        .unwrap();

    assert_eq!(users[0].related_many("posts").len(), 1);
}

#[tokio::test]
async fn empty_owner_keys_issue_no_relation_query() {
    let source = source(blog_registry());
    let mut driver = MockDriver::new(Dialect::MySql)
        .respond(vec![row(json!({"id": 10, "user_id": null, "title": "a"}))]);

    let posts = source
        .query("Post")
        .unwrap()
        .with("author")
        .fetch_all(&mut driver, source.registry())
        .await
        .unwrap();

    assert!(posts[0].related_one("author").is_none());
    let log = driver.log.lock().unwrap();
    assert_eq!(log.fetches.len(), 1);
}

#[tokio::test]
async fn many_to_many_joins_through_pivot() {
    let source = source(blog_registry());
    let mut driver = MockDriver::new(Dialect::MySql)
        .respond(vec![
            row(json!({"id": 10, "user_id": 1, "title": "a"})),
            row(json!({"id": 11, "user_id": 1, "title": "b"})),
        ])
        .respond(vec![
            row(json!({"id": 7, "name": "rust", "_pivot_key": 10})),
            row(json!({"id": 8, "name": "sql", "_pivot_key": 10})),
            row(json!({"id": 7, "name": "rust", "_pivot_key": 11})),
        ]);

    let posts = source
        .query("Post")
        .unwrap()
        .with("tags")
        .fetch_all(&mut driver, source.registry())
        .await
        .unwrap();

    let names = |i: usize| {
        posts[i]
            .related_many("tags")
            .iter()
            .map(|t| t.get("name").unwrap().as_str().unwrap().to_string())
            .collect::<Vec<_>>()
    };
    assert_eq!(names(0), vec!["rust", "sql"]);
    assert_eq!(names(1), vec!["rust"]);
    // The annotation column never reaches the payload.
    for tag in posts[0].related_many("tags") {
        assert!(tag.get("_pivot_key").is_none());
        assert!(tag.extra.is_empty());
    }

    let log = driver.log.lock().unwrap();
    assert_eq!(log.fetches.len(), 2);
    let (sql, params) = &log.fetches[1];
    assert_eq!(
        sql,
        "SELECT `tags`.*, `post_tags`.`post_id` AS `_pivot_key` FROM `tags` \
         INNER JOIN `post_tags` ON `post_tags`.`tag_id` = `tags`.`id` \
         WHERE `post_tags`.`post_id` IN (?, ?)"
    );
    assert_eq!(params, &vec![Value::Int(10), Value::Int(11)]);
}

#[tokio::test]
async fn many_to_many_without_reciprocal_is_terminal() {
    let mut registry = Registry::new();
    registry
        .register(
            EntityDef::new("Post")
                .column(ColumnDef::new("id").primary())
                .many_to_many("tags", "Tag", "PostTag", "postId"),
        )
        .unwrap();
    // Tag never declares the reciprocal relation through PostTag.
    registry
        .register(
            EntityDef::new("Tag")
                .column(ColumnDef::new("id").primary())
                .column(ColumnDef::new("name")),
        )
        .unwrap();
    registry
        .register(EntityDef::new("PostTag").column(ColumnDef::new("id").primary()))
        .unwrap();
    let source = source(registry);

    let mut driver =
        MockDriver::new(Dialect::MySql).respond(vec![row(json!({"id": 10}))]);

    let err = source
        .query("Post")
        .unwrap()
        .with("tags")
        .fetch_all(&mut driver, source.registry())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TrellisError::MissingReciprocal { entity, through }
            if entity == "Tag" && through == "PostTag"
    ));
    // The failure is a configuration error, raised before the relation
    // query is ever issued.
    assert_eq!(driver.log.lock().unwrap().fetches.len(), 1);
}

#[tokio::test]
async fn related_entity_without_primary_key_is_terminal() {
    let mut registry = Registry::new();
    registry
        .register(
            EntityDef::new("User")
                .column(ColumnDef::new("id").primary())
                .has_many("posts", "Post", "userId"),
        )
        .unwrap();
    registry
        .register(EntityDef::new("Post").column(ColumnDef::new("title")))
        .unwrap();
    let source = source(registry);

    let mut driver = MockDriver::new(Dialect::MySql).respond(vec![row(json!({"id": 1}))]);

    let err = source
        .query("User")
        .unwrap()
        .with("posts")
        .fetch_all(&mut driver, source.registry())
        .await
        .unwrap_err();

    assert!(matches!(err, TrellisError::MissingPrimaryKey(name) if name == "Post"));
    assert_eq!(driver.log.lock().unwrap().fetches.len(), 1);
}

#[tokio::test]
async fn fetch_one_variants() {
    let source = source(blog_registry());

    let mut driver = MockDriver::new(Dialect::MySql)
        .respond(vec![row(json!({"id": 1, "first_name": "Ada"}))]);
    let found = source
        .query("User")
        .unwrap()
        .filter("id", Operator::Eq, 1)
        .fetch_one(&mut driver, source.registry())
        .await
        .unwrap();
    assert_eq!(found.unwrap().get("firstName"), Some(&json!("Ada")));
    // The single-result variant caps the query itself.
    assert!(driver.log.lock().unwrap().fetches[0].0.ends_with("LIMIT 1"));

    let mut empty = MockDriver::new(Dialect::MySql).respond(vec![]);
    let err = source
        .query("User")
        .unwrap()
        .filter("id", Operator::Eq, 99)
        .fetch_one_or_fail(&mut empty, source.registry())
        .await
        .unwrap_err();
    assert!(matches!(err, TrellisError::NotFound));
}

#[tokio::test]
async fn count_reads_aggregate_alias() {
    let source = source(blog_registry());
    let mut driver = MockDriver::new(Dialect::MySql).respond(vec![row(json!({"total": 42}))]);
    let count = source
        .query("User")
        .unwrap()
        .filter("firstName", Operator::Like, "%a%")
        .count(&mut driver)
        .await
        .unwrap();
    assert_eq!(count, 42);
    assert_eq!(
        driver.log.lock().unwrap().fetches[0].0,
        "SELECT COUNT(*) AS total FROM `users` WHERE `first_name` LIKE ?"
    );
}
