use serde::{Deserialize, Serialize};

/// Public admin record as served by the leaderboard source.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Admin {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub admin_id: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub initials: String,
    pub total_points: u64,
}

impl Admin {
    /// Initials derived from the name, or the stored ones when the name yields nothing.
    pub fn display_initials(&self) -> String {
        initials_or(&self.name, &self.initials)
    }

    pub fn avatar(&self) -> Option<&str> {
        self.avatar_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// An admin together with its 1-based position in the unfiltered board.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedAdmin {
    pub rank: usize,
    pub admin: Admin,
}

impl RankedAdmin {
    pub fn index(&self) -> usize {
        self.rank - 1
    }
}

/// Payload handed to the update collaborator. Unset optionals stay `None`
/// and serialize as `null`, never as an empty string.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AdminUpdate {
    #[serde(skip_serializing)]
    pub id: String,
    pub name: String,
    pub admin_id: Option<String>,
    pub avatar_url: Option<String>,
}

pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|token| token.chars().next())
        .collect()
}

pub fn initials_or(name: &str, fallback: &str) -> String {
    let derived = initials(name);
    if derived.is_empty() {
        fallback.to_string()
    } else {
        derived
    }
}
