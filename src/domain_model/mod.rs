mod session;
mod user;

pub mod password;

pub use session::*;
pub use user::*;
