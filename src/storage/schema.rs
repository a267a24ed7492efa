//! Relations consumed by the API and the fixed vocabularies used to filter them.
//!
//! Relations (populated by external loaders, read-only here):
//! - play_information: one row per (game_id, play_id)
//! - tracking_data: one row per player per frame per play
//! - vw_complete_tracking: tracking_data plus the post-play output frames,
//!   tagged with data_source

/// Yards per second to miles per hour
pub const MPH_PER_YARD_PER_SEC: f64 = 2.04545;

/// Positions that run routes
pub const SKILL_POSITIONS: [&str; 4] = ["WR", "TE", "RB", "FB"];

/// Positions eligible for the speed-vs-success leaderboard
pub const RECEIVING_POSITIONS: [&str; 3] = ["WR", "TE", "RB"];

pub const OFFENSE_POSITIONS: [&str; 5] = ["QB", "RB", "FB", "WR", "TE"];

pub const DEFENSE_POSITIONS: [&str; 12] = [
    "CB", "S", "SS", "FS", "LB", "ILB", "OLB", "MLB", "DE", "DT", "NT", "DL",
];

/// Yards-to-go buckets in display order: (label, inclusive upper bound)
pub const DISTANCE_BUCKETS: [(&str, Option<i32>); 4] = [
    ("Short (1-3)", Some(3)),
    ("Medium (4-6)", Some(6)),
    ("Long (7-10)", Some(10)),
    ("Very Long (11+)", None),
];

/// Pass result code for a completed pass
pub const PASS_COMPLETE: &str = "C";

/// Position grouping accepted by the speed statistics filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionGroup {
    Offense,
    Defense,
}

impl PositionGroup {
    pub fn positions(&self) -> &'static [&'static str] {
        match self {
            PositionGroup::Offense => &OFFENSE_POSITIONS,
            PositionGroup::Defense => &DEFENSE_POSITIONS,
        }
    }
}

impl std::str::FromStr for PositionGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "offense" => Ok(PositionGroup::Offense),
            "defense" => Ok(PositionGroup::Defense),
            _ => Err(format!(
                "invalid position_group '{}': expected 'offense' or 'defense'",
                s
            )),
        }
    }
}

/// SQL `CASE` mapping a yards-to-go column onto its bucket label.
///
/// Labels come from [`DISTANCE_BUCKETS`] only, never from request input.
pub fn distance_bucket_sql(column: &str) -> String {
    let mut sql = String::from("CASE");
    for (label, upper) in DISTANCE_BUCKETS {
        match upper {
            Some(upper) => sql.push_str(&format!(" WHEN {} <= {} THEN '{}'", column, upper, label)),
            None => sql.push_str(&format!(" ELSE '{}'", label)),
        }
    }
    sql.push_str(" END");
    sql
}

/// SQL `CASE` ranking bucket labels in display order
pub fn distance_rank_sql(column: &str) -> String {
    let mut sql = format!("CASE {}", column);
    for (rank, (label, _)) in DISTANCE_BUCKETS.iter().enumerate() {
        sql.push_str(&format!(" WHEN '{}' THEN {}", label, rank + 1));
    }
    sql.push_str(" END");
    sql
}
