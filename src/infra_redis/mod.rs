mod fallback_cache;

pub use fallback_cache::*;
