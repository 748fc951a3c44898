pub mod monthly_stat;
pub mod user;

pub use monthly_stat::{MonthlyStat, NewMonthlyStat};
pub use user::User;
