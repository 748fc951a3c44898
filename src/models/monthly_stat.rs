use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One stored aggregation period.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct MonthlyStat {
    pub id: i64,
    pub calendar_month: NaiveDate,
    pub impressions: i64,
    pub engagements: i64,
    pub outbound_clicks: i64,
    pub saves: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A parsed CSV row waiting to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMonthlyStat {
    pub calendar_month: NaiveDate,
    pub impressions: i64,
    pub engagements: i64,
    pub outbound_clicks: i64,
    pub saves: i64,
}
