//! Team cache implementations.

mod local;
mod redis_cache;

pub use local::LocalTeamCache;
pub use redis_cache::RedisTeamCache;
