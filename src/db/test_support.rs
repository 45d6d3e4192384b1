//! Fixtures shared by repository and service tests

use chrono::{DateTime, Utc};

use super::{create_test_pool, migrations, DatabasePool, DynDatabasePool};

pub async fn migrated_pool() -> DynDatabasePool {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

pub async fn insert_user(pool: &DynDatabasePool, username: &str) -> i64 {
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO users (username, email, password_hash, created_at, updated_at) VALUES (?, ?, 'hash', ?, ?)",
    )
    .bind(username)
    .bind(format!("{}@example.com", username))
    .bind(now)
    .bind(now)
    .execute(pool.sqlite().expect("sqlite pool"))
    .await
    .expect("Failed to create test user")
    .last_insert_rowid()
}

pub async fn insert_category(pool: &DynDatabasePool, slug: &str, is_published: bool) -> i64 {
    sqlx::query(
        "INSERT INTO categories (title, slug, description, is_published, created_at) VALUES (?, ?, '', ?, ?)",
    )
    .bind(slug.to_uppercase())
    .bind(slug)
    .bind(is_published)
    .bind(Utc::now())
    .execute(pool.sqlite().expect("sqlite pool"))
    .await
    .expect("Failed to create test category")
    .last_insert_rowid()
}

pub async fn insert_location(pool: &DynDatabasePool, name: &str, is_published: bool) -> i64 {
    sqlx::query("INSERT INTO locations (name, is_published, created_at) VALUES (?, ?, ?)")
        .bind(name)
        .bind(is_published)
        .bind(Utc::now())
        .execute(pool.sqlite().expect("sqlite pool"))
        .await
        .expect("Failed to create test location")
        .last_insert_rowid()
}

pub async fn insert_post(
    pool: &DynDatabasePool,
    author_id: i64,
    category_id: i64,
    pub_date: DateTime<Utc>,
    is_published: bool,
) -> i64 {
    sqlx::query(
        r#"
        INSERT INTO posts (title, text, pub_date, is_published, author_id, category_id, created_at)
        VALUES ('Post', 'Body', ?, ?, ?, ?, ?)
        "#,
    )
    .bind(pub_date)
    .bind(is_published)
    .bind(author_id)
    .bind(category_id)
    .bind(Utc::now())
    .execute(pool.sqlite().expect("sqlite pool"))
    .await
    .expect("Failed to create test post")
    .last_insert_rowid()
}

pub async fn insert_comment(
    pool: &DynDatabasePool,
    post_id: i64,
    author_id: i64,
    is_published: bool,
) -> i64 {
    sqlx::query(
        "INSERT INTO comments (post_id, author_id, text, is_published, created_at) VALUES (?, ?, 'Nice', ?, ?)",
    )
    .bind(post_id)
    .bind(author_id)
    .bind(is_published)
    .bind(Utc::now())
    .execute(pool.sqlite().expect("sqlite pool"))
    .await
    .expect("Failed to create test comment")
    .last_insert_rowid()
}
