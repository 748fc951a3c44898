use sqlx::PgPool;

use crate::models::User;

pub struct NewUser<'a> {
    pub email: &'a str,
    pub full_name: Option<&'a str>,
    pub password_hash: &'a str,
    pub is_active: bool,
    pub is_admin: bool,
    pub groups: &'a [String],
}

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user: &NewUser<'_>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (email, full_name, password_hash, is_active, is_admin, groups)
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(user.email)
    .bind(user.full_name)
    .bind(user.password_hash)
    .bind(user.is_active)
    .bind(user.is_admin)
    .bind(user.groups)
    .fetch_one(executor)
    .await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn list_all(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id")
        .fetch_all(pool)
        .await
}

/// Hard delete. Returns whether a row was removed.
pub async fn delete_by_email(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE email = $1")
        .bind(email)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_all(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users").execute(pool).await?;
    Ok(result.rows_affected())
}
