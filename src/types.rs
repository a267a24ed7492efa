//! Row and response types for the NFL tracking API.
//!
//! Each query result row decodes into a dedicated record so a renamed column
//! fails at the decoding boundary instead of silently producing `null`.

use serde::Serialize;
use sqlx::FromRow;
use std::collections::BTreeMap;

// ==================== Games & Plays ====================

/// One game of the served season
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GameSummary {
    pub game_id: String,
    pub home_team_abbr: Option<String>,
    pub visitor_team_abbr: Option<String>,
    pub week: Option<i32>,
    pub game_date: Option<String>,
}

/// Full play record, returned when listing the plays of one game
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PlayDetail {
    pub game_id: String,
    pub play_id: i32,
    pub season: Option<i32>,
    pub week: Option<i32>,
    pub game_date: Option<String>,
    pub home_team_abbr: Option<String>,
    pub visitor_team_abbr: Option<String>,
    pub play_description: Option<String>,
    pub quarter: Option<i32>,
    pub game_clock: Option<String>,
    pub down: Option<i32>,
    pub yards_to_go: Option<i32>,
    pub possession_team: Option<String>,
    pub defensive_team: Option<String>,
    pub yardline_side: Option<String>,
    pub yardline_number: Option<i32>,
    pub pre_snap_home_score: Option<i32>,
    pub pre_snap_visitor_score: Option<i32>,
    pub pass_result: Option<String>,
    pub pass_length: Option<f64>,
    pub offense_formation: Option<String>,
    pub receiver_alignment: Option<String>,
    pub route_of_targeted_receiver: Option<String>,
    pub play_action: Option<bool>,
    pub team_coverage_man_zone: Option<String>,
    pub team_coverage_type: Option<String>,
    pub defenders_in_the_box: Option<i32>,
    pub yards_gained: Option<i32>,
    pub expected_points_added: Option<f64>,
    pub pre_snap_home_team_win_probability: Option<f64>,
    pub pre_snap_visitor_team_win_probability: Option<f64>,
    pub ball_land_x: Option<f64>,
    pub ball_land_y: Option<f64>,
}

/// Summary projection used when no game is selected
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PlaySummary {
    pub game_id: String,
    pub play_id: i32,
    pub season: Option<i32>,
    pub week: Option<i32>,
    pub game_date: Option<String>,
    pub home_team_abbr: Option<String>,
    pub visitor_team_abbr: Option<String>,
    pub play_description: Option<String>,
    pub quarter: Option<i32>,
    pub game_clock: Option<String>,
    pub down: Option<i32>,
    pub yards_to_go: Option<i32>,
    pub possession_team: Option<String>,
    pub defensive_team: Option<String>,
    pub yardline_side: Option<String>,
    pub yardline_number: Option<i32>,
    pub pre_snap_home_score: Option<i32>,
    pub pre_snap_visitor_score: Option<i32>,
    pub pass_result: Option<String>,
    pub yards_gained: Option<i32>,
}

/// Response body of the plays listing
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PlayListing {
    Detailed(Vec<PlayDetail>),
    Summary(Vec<PlaySummary>),
}

// ==================== Tracking ====================

/// One player at one frame, from the complete tracking view
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TrackingFrame {
    pub frame_id: i32,
    pub nfl_id: i32,
    pub player_name: Option<String>,
    pub player_position: Option<String>,
    pub player_side: Option<String>,
    pub player_role: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub s: Option<f64>,
    pub a: Option<f64>,
    pub dir: Option<f64>,
    pub o: Option<f64>,
    pub data_source: Option<String>,
}

/// A player taking part in a play
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PlayParticipant {
    pub nfl_id: i32,
    pub player_name: Option<String>,
    pub player_position: Option<String>,
    pub player_side: Option<String>,
}

/// Frame-by-frame tracking for a single play
#[derive(Debug, Serialize)]
pub struct PlayTracking {
    pub game_id: String,
    pub play_id: i32,
    pub players: Vec<PlayParticipant>,
    pub tracking: Vec<TrackingFrame>,
    pub total_frames: i32,
}

/// Flat route row: one skill player at one frame, in frame order
#[derive(Debug, Clone, FromRow)]
pub struct RoutePointRow {
    pub nfl_id: i32,
    pub player_name: Option<String>,
    pub player_position: Option<String>,
    pub x: f64,
    pub y: f64,
}

/// A point on a route polyline
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoutePoint {
    pub x: f64,
    pub y: f64,
}

/// The path one player ran during a play
#[derive(Debug, Clone, Serialize)]
pub struct PlayerRoute {
    pub nfl_id: i32,
    pub player_name: Option<String>,
    pub player_position: Option<String>,
    pub route: Vec<RoutePoint>,
}

/// A distinct player identity observed in tracking data
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PlayerInfo {
    pub nfl_id: i32,
    pub player_name: Option<String>,
    pub player_position: Option<String>,
}

// ==================== Analytics ====================

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TeamInfo {
    pub team_abbr: String,
    pub team_name: String,
}

/// Speed distribution for one position (mph)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PositionSpeedStats {
    pub position: Option<String>,
    pub num_frames: i64,
    pub avg_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub min_speed: Option<f64>,
    pub speed_stddev: Option<f64>,
}

/// Efficiency of one targeted route
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RouteEfficiency {
    pub route: String,
    pub attempts: i64,
    pub completions: i64,
    pub completion_pct: Option<f64>,
    pub avg_depth: Option<f64>,
    pub avg_yards: Option<f64>,
    pub avg_epa: Option<f64>,
}

/// Separation estimated from pass length, not measured from player positions
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SeparationEstimate {
    pub route: String,
    pub catches: i64,
    pub avg_estimated_separation: Option<f64>,
    pub min_estimated_separation: Option<f64>,
    pub max_estimated_separation: Option<f64>,
}

/// Outcome of one offensive formation against one coverage
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FormationMatchup {
    pub offense_formation: String,
    pub team_coverage_type: String,
    pub plays: i64,
    pub completions: i64,
    pub completion_pct: Option<f64>,
    pub avg_yards: Option<f64>,
    pub avg_epa: Option<f64>,
}

/// Average speed against target success for one skill player
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SpeedSuccess {
    pub player_name: Option<String>,
    pub player_position: Option<String>,
    pub avg_speed: Option<f64>,
    pub targets: i64,
    pub completions: i64,
    pub success_rate: Option<f64>,
}

/// One cell of the down and distance heatmap
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DownDistanceCell {
    pub down: i32,
    pub distance: String,
    pub plays: i64,
    pub avg_epa: Option<f64>,
    pub completion_pct: Option<f64>,
    pub avg_yards: Option<f64>,
}

// ==================== Service ====================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Root index describing the API surface
#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub message: String,
    pub endpoints: BTreeMap<String, String>,
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
