//! Integration tests for table models
//!
//! Runs the full model surface (CRUD, soft delete, hooks, validators,
//! relations, cache invalidation and transactions) against an in-memory
//! SQLite database with a single pooled connection.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tablehaus::prelude::*;

const USERS_SCHEMA: &str = "create table users (
    id integer primary key autoincrement,
    name text not null,
    email text,
    profile text,
    score integer not null default 0,
    is_deleted integer not null default 0
)";

const POSTS_SCHEMA: &str = "create table posts (
    id integer primary key autoincrement,
    user_id integer not null,
    title text not null
)";

struct Fixture {
    haus: TableHaus,
    cache: Arc<MemoryCache>,
}

async fn setup() -> Fixture {
    let registry = Registry::new();
    let connection = ConnectionConfig::new("default", "sqlite::memory:")
        .with_max_open_conns(1)
        .with_max_idle_conns(1);
    registry
        .connect(&connection)
        .await
        .expect("Failed to open in-memory database");

    let cache = Arc::new(MemoryCache::new());
    let haus = TableHaus::from_parts(registry, Some(cache.clone() as Arc<dyn Cache>));

    let raw = haus.bind(haus.model("users"));
    raw.exec(USERS_SCHEMA, &[]).await.expect("Failed to create users");
    raw.exec(POSTS_SCHEMA, &[]).await.expect("Failed to create posts");

    Fixture { haus, cache }
}

impl Fixture {
    fn users(&self) -> Model {
        self.haus.bind(
            self.haus
                .model("users")
                .soft_delete("is_deleted")
                .cache_keys(["email"])
                .json("profile"),
        )
    }

    fn posts(&self) -> Model {
        self.haus.bind(self.haus.model("posts"))
    }

    async fn seed_user(&self, name: &str, email: &str) -> i64 {
        self.users()
            .insert(record! { "name" => name, "email" => email })
            .await
            .expect("Failed to seed user")
    }
}

// ========================================
// Insert and read
// ========================================

#[tokio::test]
async fn test_insert_then_first() {
    let fx = setup().await;
    let users = fx.users();

    let id = users
        .insert(record! { "name" => "Ann", "email" => "ann@example.com" })
        .await
        .expect("Failed to insert");
    assert_eq!(id, 1);

    let row = users
        .first(QueryBuilder::new().where_eq("id", id))
        .await
        .expect("Failed to read back");
    assert_eq!(row.get_string("name"), "Ann");
    assert_eq!(row.get_i64("score"), Some(0));
    assert!(!row.contains_key("is_deleted"));
}

#[tokio::test]
async fn test_insert_ignores_client_primary_key() {
    let fx = setup().await;
    let users = fx.users();

    let id = users
        .insert(record! { "id" => 99, "name" => "Ann" })
        .await
        .expect("Failed to insert");
    assert_eq!(id, 1);

    let err = users.insert(record! { "id" => 5 }).await.unwrap_err();
    assert!(err.is_validation());
    let err = users.insert(Record::new()).await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_insert_rejects_bad_field_names() {
    let fx = setup().await;
    let err = fx
        .users()
        .insert(record! { "name; drop table users" => "x" })
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(fx.users().count(QueryBuilder::new()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_first_not_found_and_empty_select() {
    let fx = setup().await;
    let users = fx.users();

    let err = users
        .first(QueryBuilder::new().where_eq("id", 42))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let rows = users.select(QueryBuilder::new()).await.unwrap();
    assert!(rows.is_empty());

    let row = users.select_one(QueryBuilder::new().where_eq("id", 42)).await;
    assert!(matches!(row.err, Some(DbError::NotFound)));
}

#[tokio::test]
async fn test_insert_batch_is_atomic_on_mismatch() {
    let fx = setup().await;
    let users = fx.users();

    let inserted = users
        .insert_batch(vec![
            record! { "name" => "a", "email" => "a@x" },
            record! { "name" => "b", "email" => "b@x" },
            record! { "name" => "c", "email" => "c@x" },
        ])
        .await
        .expect("Failed to insert batch");
    assert_eq!(inserted, 3);

    let err = users
        .insert_batch(vec![
            record! { "name" => "d", "email" => "d@x" },
            record! { "name" => "e" },
        ])
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(users.count(QueryBuilder::new()).await.unwrap(), 3);
}

#[tokio::test]
async fn test_insert_ignore_skips_conflicts() {
    let fx = setup().await;
    let users = fx.users();
    let id = fx.seed_user("Ann", "ann@x").await;

    let skipped = users
        .insert_ignore(record! { "id" => id, "name" => "Other" })
        .await
        .unwrap();
    assert_eq!(skipped, 0);

    let row = users.find_by_id(id).await.unwrap();
    assert_eq!(row.get_string("name"), "Ann");
}

// ========================================
// Count and paging
// ========================================

#[tokio::test]
async fn test_count_and_page() {
    let fx = setup().await;
    let users = fx.users();
    for i in 1..=5 {
        fx.seed_user(&format!("user{}", i), &format!("u{}@x", i)).await;
    }

    let query = QueryBuilder::new().where_gte("id", 1).order_by_asc("id");
    assert_eq!(users.count(query.clone().fields(["name"])).await.unwrap(), 5);

    let page = users.page(2, 2, query).await.unwrap();
    assert_eq!(page.total, 5);
    let ids: Vec<i64> = page.list.iter().filter_map(|r| r.get_i64("id")).collect();
    assert_eq!(ids, vec![3, 4]);
}

// ========================================
// Update and delete
// ========================================

#[tokio::test]
async fn test_update_adds_primary_key_condition() {
    let fx = setup().await;
    let users = fx.users();
    let ann = fx.seed_user("Ann", "ann@x").await;
    let bob = fx.seed_user("Bob", "bob@x").await;

    let affected = users
        .update(record! { "id" => ann, "name" => "Anna" }, QueryBuilder::new())
        .await
        .expect("Failed to update");
    assert_eq!(affected, 1);

    assert_eq!(users.find_by_id(ann).await.unwrap().get_string("name"), "Anna");
    assert_eq!(users.find_by_id(bob).await.unwrap().get_string("name"), "Bob");
}

#[tokio::test]
async fn test_update_with_counters_and_nothing_to_write() {
    let fx = setup().await;
    let users = fx.users();
    let id = fx.seed_user("Ann", "ann@x").await;

    users
        .update(Record::new(), QueryBuilder::new().where_eq("id", id).increment("score", 5))
        .await
        .unwrap();
    users
        .update_by_id(id, record! { "score" => 2 })
        .await
        .unwrap();
    assert_eq!(users.find_by_id(id).await.unwrap().get_i64("score"), Some(2));

    let err = users
        .update(record! { "id" => id }, QueryBuilder::new())
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_delete_requires_condition() {
    let fx = setup().await;
    let users = fx.users();
    fx.seed_user("Ann", "ann@x").await;

    let err = users.delete(QueryBuilder::new()).await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(users.count(QueryBuilder::new()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_soft_delete_flags_and_hides_rows() {
    let fx = setup().await;
    let users = fx.users();
    let ann = fx.seed_user("Ann", "ann@x").await;
    fx.seed_user("Bob", "bob@x").await;

    let affected = users.delete_by_id(ann).await.unwrap();
    assert_eq!(affected, 1);

    assert!(users.find_by_id(ann).await.unwrap_err().is_not_found());
    assert_eq!(users.count(QueryBuilder::new()).await.unwrap(), 1);

    let raw = users
        .query("select is_deleted from users where id = ?", &[Value::Int(ann)])
        .await
        .unwrap();
    assert_eq!(raw[0].get_i64("is_deleted"), Some(1));
}

#[tokio::test]
async fn test_soft_delete_filter_wraps_or_conditions() {
    let fx = setup().await;
    let users = fx.users();
    fx.seed_user("a", "a@x").await;
    let b = fx.seed_user("b", "b@x").await;
    users.delete_by_id(b).await.unwrap();

    let rows = users
        .select(QueryBuilder::new().where_eq("name", "a").or_where_eq("name", "b"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_string("name"), "a");
}

#[tokio::test]
async fn test_physical_delete_without_soft_delete_field() {
    let fx = setup().await;
    let posts = fx.posts();
    posts
        .insert(record! { "user_id" => 1, "title" => "hello" })
        .await
        .unwrap();

    let affected = posts
        .delete(QueryBuilder::new().where_eq("title", "hello"))
        .await
        .unwrap();
    assert_eq!(affected, 1);
    assert_eq!(posts.count(QueryBuilder::new()).await.unwrap(), 0);
}

// ========================================
// Upsert
// ========================================

#[tokio::test]
async fn test_insert_or_update_by_primary_key() {
    let fx = setup().await;
    let users = fx.users();
    let id = fx.seed_user("Ann", "ann@x").await;

    let (row, affected) = users
        .insert_or_update(record! { "id" => id, "name" => "Anna", "email" => "anna@x" }, &["name"])
        .await
        .expect("Failed to upsert");
    assert_eq!(affected, 1);
    assert_eq!(row.get_string("name"), "Anna");
    assert_eq!(row.get_string("email"), "ann@x");
}

#[tokio::test]
async fn test_insert_or_update_without_key_reads_back_by_fields() {
    let fx = setup().await;
    let users = fx.users();

    let (row, affected) = users
        .insert_or_update(record! { "name" => "New", "email" => "new@x" }, &[])
        .await
        .expect("Failed to upsert");
    assert_eq!(affected, 1);
    assert_eq!(row.get_i64("id"), Some(1));
    assert_eq!(row.get_string("email"), "new@x");
}

// ========================================
// Hooks and validators
// ========================================

#[tokio::test]
async fn test_json_hook_round_trip() {
    let fx = setup().await;
    let users = fx.users();

    let id = users
        .insert(record! { "name" => "Ann", "profile" => json!({"lang": "en", "tags": [1, 2]}) })
        .await
        .unwrap();

    let row = users.find_by_id(id).await.unwrap();
    assert_eq!(row.get_json("profile"), Some(json!({"lang": "en", "tags": [1, 2]})));

    let raw = users
        .query("select profile from users where id = ?", &[Value::Int(id)])
        .await
        .unwrap();
    assert!(matches!(raw[0].get("profile"), Some(Value::String(text)) if text.contains("\"lang\"")));
}

#[tokio::test]
async fn test_validators_abort_writes() {
    let fx = setup().await;
    let users = fx.haus.bind(
        fx.haus
            .model("users")
            .validator(Required::new(["name"]))
            .validator(Unique::new("email")),
    );

    let id = users
        .insert(record! { "name" => "Ann", "email" => "ann@x" })
        .await
        .unwrap();

    let err = users
        .insert(record! { "name" => "  ", "email" => "other@x" })
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let err = users
        .insert(record! { "name" => "Dup", "email" => "ann@x" })
        .await
        .unwrap_err();
    assert!(err.is_validation());

    users
        .update(record! { "id" => id, "email" => "ann@x" }, QueryBuilder::new())
        .await
        .expect("Own row must not count as a duplicate");

    users
        .without_validation()
        .insert(record! { "name" => "Dup", "email" => "ann@x" })
        .await
        .expect("Validation is skipped");
}

#[tokio::test]
async fn test_closure_validator() {
    let fx = setup().await;
    let posts = fx.haus.bind(fx.haus.model("posts").validator(
        |record: &Record, _model: &Model| -> Result<(), DbError> {
            match record.get("title").and_then(Value::as_str) {
                Some(title) if title.len() > 10 => {
                    Err(DbError::Validation("title too long".to_string()))
                }
                _ => Ok(()),
            }
        },
    ));

    assert!(posts
        .insert(record! { "user_id" => 1, "title" => "a much too long title" })
        .await
        .unwrap_err()
        .is_validation());
    assert!(posts
        .insert(record! { "user_id" => 1, "title" => "short" })
        .await
        .is_ok());
}

// ========================================
// Relations
// ========================================

#[tokio::test]
async fn test_has_many_and_has_one_relations() {
    let fx = setup().await;
    let ann = fx.seed_user("Ann", "ann@x").await;
    let bob = fx.seed_user("Bob", "bob@x").await;
    let posts = fx.posts();
    posts
        .insert_batch(vec![
            record! { "user_id" => ann, "title" => "one" },
            record! { "user_id" => ann, "title" => "two" },
        ])
        .await
        .unwrap();

    let users = fx.haus.bind(
        fx.haus
            .model("users")
            .has_many("posts", posts.clone(), "id", "user_id")
            .has_one("latest", posts, "id", "user_id"),
    );

    let rows = users
        .select(QueryBuilder::new().order_by_asc("id"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);

    let ann_posts = rows[0].get_json("posts").unwrap();
    assert_eq!(ann_posts.as_array().map(Vec::len), Some(2));
    assert!(rows[0].get_json("latest").is_some());

    assert_eq!(rows[1].get_i64("id"), Some(bob));
    assert_eq!(rows[1].get_json("posts"), Some(json!([])));
    assert_eq!(rows[1].get("latest"), Some(&Value::Null));
}

// ========================================
// Cache
// ========================================

#[tokio::test]
async fn test_find_by_id_reads_through_cache() {
    let fx = setup().await;
    let users = fx.users();
    let id = fx.seed_user("Ann", "ann@x").await;

    users.find_by_id(id).await.unwrap();
    assert!(fx.cache.contains(&format!("users:id:{}", id)));

    // Bypasses invalidation, so the cached row is still served
    users
        .exec("update users set name = ? where id = ?", &[Value::from("Raw"), Value::Int(id)])
        .await
        .unwrap();
    assert_eq!(users.find_by_id(id).await.unwrap().get_string("name"), "Ann");
}

#[tokio::test]
async fn test_update_invalidates_primary_and_secondary_keys() {
    let fx = setup().await;
    let users = fx.users();
    let id = fx.seed_user("Ann", "ann@x").await;

    let row = users.find_by_field("email", "ann@x").await.unwrap();
    assert_eq!(row.get_i64("id"), Some(id));
    assert!(fx.cache.contains("users:email:ann@x"));
    assert!(fx.cache.contains(&format!("users:id:{}", id)));

    users
        .update(
            record! { "name" => "Anna" },
            QueryBuilder::new().where_eq("email", "ann@x"),
        )
        .await
        .unwrap();
    assert!(!fx.cache.contains("users:email:ann@x"));
    assert!(!fx.cache.contains(&format!("users:id:{}", id)));

    assert_eq!(users.find_by_id(id).await.unwrap().get_string("name"), "Anna");
}

#[tokio::test]
async fn test_changed_cache_key_drops_old_mapping() {
    let fx = setup().await;
    let users = fx.users();
    let id = fx.seed_user("Ann", "old@x").await;

    users.find_by_field("email", "old@x").await.unwrap();
    assert!(fx.cache.contains("users:email:old@x"));

    users
        .update(record! { "id" => id, "email" => "new@x" }, QueryBuilder::new())
        .await
        .unwrap();
    assert!(!fx.cache.contains("users:email:old@x"));
    assert!(!fx.cache.contains(&format!("users:id:{}", id)));

    let err = users.find_by_field("email", "old@x").await.unwrap_err();
    assert!(err.is_not_found());
    let row = users.find_by_field("email", "new@x").await.unwrap();
    assert_eq!(row.get_i64("id"), Some(id));
}

#[tokio::test]
async fn test_mapping_to_row_without_that_value_is_dropped() {
    let fx = setup().await;
    let users = fx.users();
    let id = fx.seed_user("Ann", "ann@x").await;

    fx.cache
        .set("users:email:ghost@x", &id.to_string())
        .await
        .unwrap();

    let err = users.find_by_field("email", "ghost@x").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(!fx.cache.contains("users:email:ghost@x"));
}

#[tokio::test]
async fn test_cache_hit_returns_same_values_as_miss() {
    let fx = setup().await;
    let events = fx.haus.bind(fx.haus.model("events"));
    events
        .exec(
            "create table events (id integer primary key autoincrement, created datetime, payload blob, label text)",
            &[],
        )
        .await
        .unwrap();
    events
        .exec(
            "insert into events (created, payload, label) values ('2024-01-02 03:04:05', x'ff00', 'boot')",
            &[],
        )
        .await
        .unwrap();

    let miss = events.find_by_id(1).await.unwrap();
    assert!(fx.cache.contains("events:id:1"));
    let hit = events.find_by_id(1).await.unwrap();

    assert_eq!(hit, miss);
    assert!(matches!(hit.get("created"), Some(Value::Timestamp(_))));
    assert_eq!(hit.get("payload"), Some(&Value::Bytes(vec![0xff, 0x00])));
}

#[tokio::test]
async fn test_delete_by_id_invalidates_cache() {
    let fx = setup().await;
    let users = fx.users();
    let id = fx.seed_user("Ann", "ann@x").await;

    users.find_by_id(id).await.unwrap();
    users.delete_by_id(id).await.unwrap();
    assert!(fx.cache.is_empty());
    assert!(users.find_by_id(id).await.unwrap_err().is_not_found());
}

// ========================================
// Decoding
// ========================================

#[tokio::test]
async fn test_sqlite_decimal_column_reads_storage_class() {
    let fx = setup().await;
    let prices = fx.haus.bind(fx.haus.model("prices"));
    prices
        .exec("create table prices (id integer primary key autoincrement, price decimal(10,2))", &[])
        .await
        .unwrap();
    prices
        .exec("insert into prices (price) values (3), (12.5)", &[])
        .await
        .unwrap();

    let rows = prices.select(QueryBuilder::new().order_by_asc("id")).await.unwrap();
    assert_eq!(rows[0].get("price"), Some(&Value::Int(3)));
    assert_eq!(rows[1].get("price"), Some(&Value::Float(12.5)));
    assert_eq!(
        rows[1].get_decimal("price"),
        Some(tablehaus::type_mapping::Decimal::new(125, 1))
    );
}

// ========================================
// Transactions
// ========================================

#[tokio::test]
async fn test_transaction_commits_on_success() {
    let fx = setup().await;
    let users = fx.users();

    let id = users
        .transaction(|_tx, users| async move {
            users.insert(record! { "name" => "Ann", "email" => "ann@x" }).await
        })
        .await
        .expect("Transaction failed");

    assert_eq!(users.find_by_id(id).await.unwrap().get_string("name"), "Ann");
}

#[tokio::test]
async fn test_transaction_rolls_back_on_error() {
    let fx = setup().await;
    let users = fx.users();

    let result: Result<(), DbError> = users
        .transaction(|_tx, users| async move {
            users.insert(record! { "name" => "Ann" }).await?;
            assert_eq!(users.count(QueryBuilder::new()).await?, 1);
            Err(DbError::Validation("abort".to_string()))
        })
        .await;
    assert!(result.unwrap_err().is_validation());

    assert_eq!(users.count(QueryBuilder::new()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_manual_transaction_handle() {
    let fx = setup().await;
    let users = fx.users();

    let tx = users.begin().await.unwrap();
    users
        .with_tx(tx.clone())
        .insert(record! { "name" => "Ann" })
        .await
        .unwrap();
    tablehaus::store_object::rollback(&tx).await.unwrap();
    assert!(tablehaus::store_object::commit(&tx).await.is_err());

    assert_eq!(users.count(QueryBuilder::new()).await.unwrap(), 0);
}

// ========================================
// Configuration and scoping
// ========================================

#[tokio::test]
async fn test_unbound_models_report_config_errors() {
    let fx = setup().await;

    let missing = fx.haus.bind(fx.haus.model("users").connection("missing"));
    assert!(!missing.is_bound());
    assert!(matches!(
        missing.select(QueryBuilder::new()).await,
        Err(DbError::Config(_))
    ));

    let empty = fx.haus.bind(fx.haus.model(""));
    assert!(matches!(
        empty.insert(record! { "name" => "x" }).await,
        Err(DbError::Config(_))
    ));

    let bad_key = fx.haus.bind(fx.haus.model("users").primary_key("id;"));
    assert!(matches!(
        bad_key.count(QueryBuilder::new()).await,
        Err(DbError::Config(_))
    ));
}

#[tokio::test]
async fn test_cancelled_token_aborts_statement() {
    let fx = setup().await;
    let token = CancellationToken::new();
    token.cancel();

    let err = fx
        .users()
        .with_cancel(token)
        .select(QueryBuilder::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Cancelled));

    let rows = fx
        .users()
        .with_timeout(Duration::from_secs(5))
        .select(QueryBuilder::new())
        .await
        .unwrap();
    assert!(rows.is_empty());
}
