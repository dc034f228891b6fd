pub mod avatar;
pub mod edit_admin;
pub mod leaderboard;
pub mod podium;
