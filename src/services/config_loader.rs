use chrono::NaiveDateTime;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CONFIG_ENV_VAR: &str = "LEADERBOARD_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "leaderboard.toml";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    Http {
        base_url: String,
        #[serde(default = "default_admins_path")]
        admins_path: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_timeout_seconds")]
        timeout_seconds: u64,
    },
    File {
        path: PathBuf,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::File {
            path: PathBuf::from("admins.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Reward {
    pub place: usize,
    pub points: u64,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompetitionConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_subtitle")]
    pub subtitle: String,
    /// Local wall-clock instant the first cycle starts at.
    #[serde(default = "default_start")]
    pub start: NaiveDateTime,
    #[serde(default = "default_cycle_days")]
    pub cycle_days: u32,
    #[serde(default = "default_grand_prize_points")]
    pub grand_prize_points: u64,
    #[serde(default = "default_winner_cooldown_days")]
    pub winner_cooldown_days: u32,
    #[serde(default = "default_rewards")]
    pub rewards: Vec<Reward>,
    #[serde(default = "default_notes")]
    pub notes: Vec<String>,
}

impl Default for CompetitionConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            subtitle: default_subtitle(),
            start: default_start(),
            cycle_days: default_cycle_days(),
            grand_prize_points: default_grand_prize_points(),
            winner_cooldown_days: default_winner_cooldown_days(),
            rewards: default_rewards(),
            notes: default_notes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresentationConfig {
    #[serde(default = "default_window_width")]
    pub window_width: f32,
    #[serde(default = "default_window_height")]
    pub window_height: f32,
    #[serde(default = "default_pixels_per_point")]
    pub pixels_per_point: f32,
    #[serde(default = "default_avatar_max_dimension")]
    pub avatar_max_dimension: u32,
    /// Extra font tried before the built-in ones, e.g. for Arabic names.
    #[serde(default)]
    pub font_path: Option<PathBuf>,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            window_width: default_window_width(),
            window_height: default_window_height(),
            pixels_per_point: default_pixels_per_point(),
            avatar_max_dimension: default_avatar_max_dimension(),
            font_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EditingConfig {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LeaderboardConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub competition: CompetitionConfig,
    #[serde(default)]
    pub presentation: PresentationConfig,
    #[serde(default)]
    pub editing: EditingConfig,
}

fn default_admins_path() -> String {
    "public_admins".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_title() -> String {
    "October 2025 Competition".to_string()
}

fn default_subtitle() -> String {
    "Admin performance tracking".to_string()
}

fn default_start() -> NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(2025, 10, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

fn default_cycle_days() -> u32 {
    10
}

fn default_grand_prize_points() -> u64 {
    30_000
}

fn default_winner_cooldown_days() -> u32 {
    20
}

fn default_rewards() -> Vec<Reward> {
    vec![Reward {
        place: 1,
        points: default_grand_prize_points(),
        title: Some("Grand prize".to_string()),
    }]
}

fn default_notes() -> Vec<String> {
    vec![
        "Points are calculated automatically from attendance, commitment and activity".to_string(),
        "The top three places update immediately when points change".to_string(),
        "Rewards are handed out every 10 days according to the final ranking".to_string(),
        "A winner cannot compete again until 20 days have passed".to_string(),
    ]
}

fn default_window_width() -> f32 {
    1280.0
}

fn default_window_height() -> f32 {
    860.0
}

fn default_pixels_per_point() -> f32 {
    1.0
}

fn default_avatar_max_dimension() -> u32 {
    256
}

/// First CLI argument, then the env var, then `leaderboard.toml` in the working directory.
pub fn resolve_config_path(cli_arg: Option<String>, env_value: Option<String>) -> PathBuf {
    cli_arg
        .or(env_value)
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

pub fn load_leaderboard_config(config_path: &Path) -> Result<LeaderboardConfig, String> {
    if !config_path.exists() {
        info!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        return Ok(LeaderboardConfig::default());
    }

    if !config_path.is_file() {
        return Err(format!(
            "Config path exists but is not a file: {}",
            config_path.display()
        ));
    }

    let raw = fs::read_to_string(config_path).map_err(|err| {
        format!(
            "Failed to read config at {}: {}",
            config_path.display(),
            err
        )
    })?;

    let config = parse_leaderboard_config(&raw).map_err(|err| {
        format!(
            "Failed to parse config at {}: {}",
            config_path.display(),
            err
        )
    })?;
    info!("Loaded config from {}", config_path.display());
    Ok(config)
}

pub fn parse_leaderboard_config(raw: &str) -> Result<LeaderboardConfig, String> {
    let config = toml::from_str::<LeaderboardConfig>(raw).map_err(|err| err.to_string())?;
    if config.competition.cycle_days == 0 {
        return Err("competition.cycle_days must be at least 1".to_string());
    }
    Ok(config)
}
