mod session_repo_mysql;
mod user_repo_mysql;

pub use session_repo_mysql::*;
pub use user_repo_mysql::*;
