mod session_repo_memory;
mod user_repo_memory;

pub use session_repo_memory::*;
pub use user_repo_memory::*;
