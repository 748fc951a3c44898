use sqlx::PgPool;

use crate::models::{MonthlyStat, NewMonthlyStat};

pub async fn insert<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    stat: &NewMonthlyStat,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO pinterest_account_stats_monthly
             (calendar_month, impressions, engagements, outbound_clicks, saves)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(stat.calendar_month)
    .bind(stat.impressions)
    .bind(stat.engagements)
    .bind(stat.outbound_clicks)
    .bind(stat.saves)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn list_all(pool: &PgPool) -> Result<Vec<MonthlyStat>, sqlx::Error> {
    sqlx::query_as::<_, MonthlyStat>("SELECT * FROM pinterest_account_stats_monthly ORDER BY id")
        .fetch_all(pool)
        .await
}

pub async fn list_by_month(pool: &PgPool) -> Result<Vec<MonthlyStat>, sqlx::Error> {
    sqlx::query_as::<_, MonthlyStat>(
        "SELECT * FROM pinterest_account_stats_monthly ORDER BY calendar_month ASC, id ASC",
    )
    .fetch_all(pool)
    .await
}

pub async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pinterest_account_stats_monthly")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}
