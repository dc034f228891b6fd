pub mod admin_source;
pub mod avatar_cache;
pub mod config_loader;
pub mod cycle;
pub mod leaderboard;
