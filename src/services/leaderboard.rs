use crate::models::{Admin, RankedAdmin};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    All,
    Top3,
    Top10,
}

impl FilterMode {
    pub const ALL: [FilterMode; 3] = [FilterMode::All, FilterMode::Top3, FilterMode::Top10];

    pub fn label(self) -> &'static str {
        match self {
            FilterMode::All => "All",
            FilterMode::Top3 => "Top 3",
            FilterMode::Top10 => "Top 10",
        }
    }

    /// `index` is the zero-based position in the unfiltered board.
    pub fn admits(self, index: usize) -> bool {
        match self {
            FilterMode::All => true,
            FilterMode::Top3 => index < 3,
            FilterMode::Top10 => index < 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankBadge {
    Gold,
    Silver,
    Bronze,
    Plain(usize),
}

impl RankBadge {
    pub fn for_rank(rank: usize) -> Self {
        match rank {
            1 => RankBadge::Gold,
            2 => RankBadge::Silver,
            3 => RankBadge::Bronze,
            other => RankBadge::Plain(other),
        }
    }

    pub fn label(self) -> String {
        match self {
            RankBadge::Gold => "1".to_string(),
            RankBadge::Silver => "2".to_string(),
            RankBadge::Bronze => "3".to_string(),
            RankBadge::Plain(rank) => format!("#{rank}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Aggregates {
    pub total_admins: usize,
    pub total_points: u64,
}

/// Attaches the board position to each record. The source already orders
/// the records by points, so nothing is re-sorted here.
pub fn rank_admins(admins: Vec<Admin>) -> Vec<RankedAdmin> {
    admins
        .into_iter()
        .enumerate()
        .map(|(index, admin)| RankedAdmin {
            rank: index + 1,
            admin,
        })
        .collect()
}

pub fn filter_admins<'a>(
    board: &'a [RankedAdmin],
    query: &str,
    mode: FilterMode,
) -> Vec<&'a RankedAdmin> {
    let needle = query.to_lowercase();
    board
        .iter()
        .filter(|entry| mode.admits(entry.index()))
        .filter(|entry| entry.admin.name.to_lowercase().contains(&needle))
        .collect()
}

pub fn aggregates(board: &[RankedAdmin]) -> Aggregates {
    Aggregates {
        total_admins: board.len(),
        total_points: board
            .iter()
            .fold(0u64, |sum, entry| sum.saturating_add(entry.admin.total_points)),
    }
}

/// Top three in display order: second, first, third. `None` below three admins.
pub fn podium(board: &[RankedAdmin]) -> Option<[&RankedAdmin; 3]> {
    match board {
        [first, second, third, ..] => Some([second, first, third]),
        _ => None,
    }
}

/// Thousands separated with commas, e.g. `30,000`.
pub fn format_points(points: u64) -> String {
    let digits = points.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Short form used on the stats card, e.g. `30K`.
pub fn format_points_short(points: u64) -> String {
    if points >= 1_000_000 && points % 1_000_000 == 0 {
        format!("{}M", points / 1_000_000)
    } else if points >= 1_000 && points % 1_000 == 0 {
        format!("{}K", points / 1_000)
    } else {
        format_points(points)
    }
}

pub fn place_label(rank: usize) -> String {
    let suffix = match (rank % 10, rank % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{rank}{suffix} place")
}
