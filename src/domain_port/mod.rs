// store

mod cache_store;

pub use cache_store::*;

// repo

mod session_repo;
mod user_repo;

pub use session_repo::*;
pub use user_repo::*;
