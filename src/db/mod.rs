pub mod monthly_stats;
pub mod users;
