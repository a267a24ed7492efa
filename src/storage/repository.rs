//! Read-only query library over play and tracking data.
//!
//! One statement per endpoint. Request-supplied values only ever reach SQL
//! through `push_bind`/`bind`; everything pushed as text is a constant from
//! [`super::schema`].

use sqlx::{PgConnection, Postgres, QueryBuilder};

use super::schema::{
    distance_bucket_sql, distance_rank_sql, PositionGroup, MPH_PER_YARD_PER_SEC, PASS_COMPLETE,
    RECEIVING_POSITIONS, SKILL_POSITIONS,
};
use crate::types::{
    DownDistanceCell, FormationMatchup, GameSummary, PlayDetail, PlayParticipant, PlaySummary,
    PlayerInfo, PositionSpeedStats, RouteEfficiency, RoutePointRow, SeparationEstimate,
    SpeedSuccess, TeamInfo, TrackingFrame,
};

/// Row cap when listing plays without a game
pub const PLAY_SUMMARY_LIMIT: i64 = 100;
pub const ROUTE_MIN_ATTEMPTS: i64 = 5;
pub const SEPARATION_MIN_CATCHES: i64 = 5;
pub const SEPARATION_LIMIT: i64 = 15;
pub const FORMATION_MIN_PLAYS: i64 = 3;
pub const SPEED_SUCCESS_MIN_TARGETS: i64 = 5;
pub const SPEED_SUCCESS_LIMIT: i64 = 30;

/// Separation proxy multipliers applied to pass length: (min, avg, max)
pub const SEPARATION_FACTORS: (f64, f64, f64) = (0.2, 0.3, 0.4);

macro_rules! play_summary_columns {
    () => {
        r#"
            p.game_id::text AS game_id,
            p.play_id::int4 AS play_id,
            p.season::int4 AS season,
            p.week::int4 AS week,
            p.game_date::text AS game_date,
            p.home_team_abbr::text AS home_team_abbr,
            p.visitor_team_abbr::text AS visitor_team_abbr,
            p.play_description::text AS play_description,
            p.quarter::int4 AS quarter,
            p.game_clock::text AS game_clock,
            p.down::int4 AS down,
            p.yards_to_go::int4 AS yards_to_go,
            p.possession_team::text AS possession_team,
            p.defensive_team::text AS defensive_team,
            p.yardline_side::text AS yardline_side,
            p.yardline_number::int4 AS yardline_number,
            p.pre_snap_home_score::int4 AS pre_snap_home_score,
            p.pre_snap_visitor_score::int4 AS pre_snap_visitor_score,
            p.pass_result::text AS pass_result,
            p.yards_gained::int4 AS yards_gained"#
    };
}

const GAMES_SQL: &str = r#"
    SELECT DISTINCT
        p.game_id::text AS game_id,
        p.home_team_abbr::text AS home_team_abbr,
        p.visitor_team_abbr::text AS visitor_team_abbr,
        p.week::int4 AS week,
        p.game_date::text AS game_date
    FROM play_information p
    WHERE p.season = $1
    ORDER BY game_date, game_id
"#;

const PLAYS_FOR_GAME_SQL: &str = concat!(
    "SELECT",
    play_summary_columns!(),
    r#",
            p.pass_length::float8 AS pass_length,
            p.offense_formation::text AS offense_formation,
            p.receiver_alignment::text AS receiver_alignment,
            p.route_of_targeted_receiver::text AS route_of_targeted_receiver,
            p.play_action::boolean AS play_action,
            p.team_coverage_man_zone::text AS team_coverage_man_zone,
            p.team_coverage_type::text AS team_coverage_type,
            p.defenders_in_the_box::int4 AS defenders_in_the_box,
            p.expected_points_added::float8 AS expected_points_added,
            p.pre_snap_home_team_win_probability::float8 AS pre_snap_home_team_win_probability,
            p.pre_snap_visitor_team_win_probability::float8 AS pre_snap_visitor_team_win_probability,
            b.ball_land_x,
            b.ball_land_y
        FROM play_information p
        LEFT JOIN (
            SELECT
                t.game_id,
                t.play_id,
                MAX(t.ball_land_x)::float8 AS ball_land_x,
                MAX(t.ball_land_y)::float8 AS ball_land_y
            FROM tracking_data t
            WHERE t.game_id = $1
            GROUP BY t.game_id, t.play_id
        ) b ON b.game_id = p.game_id AND b.play_id = p.play_id
        WHERE p.game_id = $1
        ORDER BY p.play_id
    "#
);

const PLAY_SUMMARIES_SQL: &str = concat!(
    "SELECT",
    play_summary_columns!(),
    r#"
        FROM play_information p
        ORDER BY p.game_id, p.play_id
        LIMIT $1
    "#
);

const PLAY_TRACKING_SQL: &str = r#"
    SELECT
        frame_id::int4 AS frame_id,
        nfl_id::int4 AS nfl_id,
        player_name::text AS player_name,
        player_position::text AS player_position,
        player_side::text AS player_side,
        player_role::text AS player_role,
        x::float8 AS x,
        y::float8 AS y,
        s::float8 AS s,
        a::float8 AS a,
        dir::float8 AS dir,
        o::float8 AS o,
        data_source::text AS data_source
    FROM vw_complete_tracking
    WHERE game_id = $1 AND play_id = $2
    ORDER BY frame_id, nfl_id
"#;

const PLAY_PARTICIPANTS_SQL: &str = r#"
    SELECT DISTINCT
        nfl_id::int4 AS nfl_id,
        player_name::text AS player_name,
        player_position::text AS player_position,
        player_side::text AS player_side
    FROM vw_complete_tracking
    WHERE game_id = $1 AND play_id = $2
    ORDER BY nfl_id, player_name, player_position, player_side
"#;

const TEAMS_SQL: &str = r#"
    SELECT team_abbr, team_abbr AS team_name
    FROM (
        SELECT home_team_abbr::text AS team_abbr
        FROM play_information
        WHERE home_team_abbr IS NOT NULL
        UNION
        SELECT visitor_team_abbr::text AS team_abbr
        FROM play_information
        WHERE visitor_team_abbr IS NOT NULL
    ) teams
    ORDER BY team_abbr
"#;

/// Which team column a `team` filter is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamScope {
    /// Either side of the game
    HomeOrVisitor,
    /// Only the team with the ball
    Possession,
}

/// Optional week/team restriction on plays (`p`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayFilter {
    pub week: Option<i32>,
    pub team: Option<String>,
}

impl PlayFilter {
    pub fn is_empty(&self) -> bool {
        self.week.is_none() && self.team.is_none()
    }

    /// Append `AND ...` conditions for the set filters.
    fn push_conditions(&self, qb: &mut QueryBuilder<'static, Postgres>, scope: TeamScope) {
        if let Some(week) = self.week {
            qb.push(" AND p.week = ").push_bind(week);
        }
        if let Some(ref team) = self.team {
            match scope {
                TeamScope::HomeOrVisitor => {
                    qb.push(" AND (p.home_team_abbr = ")
                        .push_bind(team.clone())
                        .push(" OR p.visitor_team_abbr = ")
                        .push_bind(team.clone())
                        .push(")");
                }
                TeamScope::Possession => {
                    qb.push(" AND p.possession_team = ").push_bind(team.clone());
                }
            }
        }
    }
}

/// Filters accepted by the speed statistics endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeedFilter {
    /// Side the player lined up on, compared case-insensitively
    pub side: Option<String>,
    pub position_group: Option<PositionGroup>,
    pub plays: PlayFilter,
}

/// `('A', 'B', ...)` from a constant vocabulary
fn sql_list(values: &[&str]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| format!("'{}'", v)).collect();
    format!("({})", quoted.join(", "))
}

// ==================== Statement builders ====================

pub fn play_routes_query(game_id: &str, play_id: i32) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        r#"
        SELECT
            nfl_id::int4 AS nfl_id,
            player_name::text AS player_name,
            player_position::text AS player_position,
            x::float8 AS x,
            y::float8 AS y
        FROM tracking_data
        WHERE game_id = "#,
    );
    qb.push_bind(game_id.to_string());
    qb.push(" AND play_id = ").push_bind(play_id);
    qb.push(format!(
        " AND player_position IN {} AND x IS NOT NULL AND y IS NOT NULL",
        sql_list(&SKILL_POSITIONS)
    ));
    qb.push(" ORDER BY nfl_id, frame_id");
    qb
}

pub fn players_query(position: Option<&str>) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        r#"
        SELECT DISTINCT
            nfl_id::int4 AS nfl_id,
            player_name::text AS player_name,
            player_position::text AS player_position
        FROM tracking_data"#,
    );
    match position {
        Some(position) => {
            qb.push(" WHERE player_position = ").push_bind(position.to_string());
            qb.push(" ORDER BY player_name, nfl_id");
        }
        None => {
            qb.push(" ORDER BY player_position, player_name, nfl_id");
        }
    }
    qb
}

pub fn speed_stats_query(filter: &SpeedFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        r#"
        SELECT
            t.player_position::text AS position,
            COUNT(*) AS num_frames,
            ROUND((AVG(t.s) * {mph})::numeric, 2)::float8 AS avg_speed,
            ROUND((MAX(t.s) * {mph})::numeric, 2)::float8 AS max_speed,
            ROUND((MIN(t.s) * {mph})::numeric, 2)::float8 AS min_speed,
            ROUND((STDDEV(t.s) * {mph})::numeric, 2)::float8 AS speed_stddev
        FROM tracking_data t"#,
        mph = MPH_PER_YARD_PER_SEC
    ));

    // Plays are only joined when a play-level filter needs them
    if !filter.plays.is_empty() {
        qb.push(" JOIN play_information p ON t.game_id = p.game_id AND t.play_id = p.play_id");
    }
    qb.push(" WHERE t.s IS NOT NULL");
    filter.plays.push_conditions(&mut qb, TeamScope::HomeOrVisitor);

    if let Some(ref side) = filter.side {
        qb.push(" AND LOWER(t.player_side) = LOWER(")
            .push_bind(side.clone())
            .push(")");
    }
    if let Some(group) = filter.position_group {
        qb.push(format!(" AND t.player_position IN {}", sql_list(group.positions())));
    }

    qb.push(" GROUP BY t.player_position ORDER BY avg_speed DESC, t.player_position");
    qb
}

pub fn route_analysis_query(filter: &PlayFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        r#"
        SELECT
            p.route_of_targeted_receiver::text AS route,
            COUNT(*) AS attempts,
            COUNT(*) FILTER (WHERE p.pass_result = '{c}') AS completions,
            ROUND((COUNT(*) FILTER (WHERE p.pass_result = '{c}'))::numeric / COUNT(*)::numeric * 100, 1)::float8 AS completion_pct,
            ROUND(AVG(p.pass_length)::numeric, 1)::float8 AS avg_depth,
            ROUND(AVG(p.yards_gained)::numeric, 1)::float8 AS avg_yards,
            ROUND(AVG(p.expected_points_added)::numeric, 2)::float8 AS avg_epa
        FROM play_information p
        WHERE p.route_of_targeted_receiver IS NOT NULL"#,
        c = PASS_COMPLETE
    ));
    filter.push_conditions(&mut qb, TeamScope::HomeOrVisitor);
    qb.push(format!(
        " GROUP BY p.route_of_targeted_receiver HAVING COUNT(*) >= {} ORDER BY attempts DESC, route",
        ROUTE_MIN_ATTEMPTS
    ));
    qb
}

pub fn separation_stats_query(filter: &PlayFilter) -> QueryBuilder<'static, Postgres> {
    let (min_factor, avg_factor, max_factor) = SEPARATION_FACTORS;
    let mut qb = QueryBuilder::new(format!(
        r#"
        SELECT
            p.route_of_targeted_receiver::text AS route,
            COUNT(*) AS catches,
            ROUND(AVG(p.pass_length * {avg_factor})::numeric, 1)::float8 AS avg_estimated_separation,
            ROUND(MIN(p.pass_length * {min_factor})::numeric, 1)::float8 AS min_estimated_separation,
            ROUND(MAX(p.pass_length * {max_factor})::numeric, 1)::float8 AS max_estimated_separation
        FROM play_information p
        WHERE p.pass_result = '{c}'
            AND p.pass_length IS NOT NULL
            AND p.route_of_targeted_receiver IS NOT NULL"#,
        c = PASS_COMPLETE
    ));
    filter.push_conditions(&mut qb, TeamScope::Possession);
    qb.push(format!(
        " GROUP BY p.route_of_targeted_receiver HAVING COUNT(*) >= {} ORDER BY catches DESC, route LIMIT {}",
        SEPARATION_MIN_CATCHES, SEPARATION_LIMIT
    ));
    qb
}

pub fn formation_matchup_query(filter: &PlayFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        r#"
        SELECT
            p.offense_formation::text AS offense_formation,
            p.team_coverage_type::text AS team_coverage_type,
            COUNT(*) AS plays,
            COUNT(*) FILTER (WHERE p.pass_result = '{c}') AS completions,
            ROUND((COUNT(*) FILTER (WHERE p.pass_result = '{c}'))::numeric / COUNT(*)::numeric * 100, 1)::float8 AS completion_pct,
            ROUND(AVG(p.yards_gained)::numeric, 1)::float8 AS avg_yards,
            ROUND(AVG(p.expected_points_added)::numeric, 2)::float8 AS avg_epa
        FROM play_information p
        WHERE p.offense_formation IS NOT NULL
            AND p.team_coverage_type IS NOT NULL"#,
        c = PASS_COMPLETE
    ));
    filter.push_conditions(&mut qb, TeamScope::HomeOrVisitor);
    qb.push(format!(
        " GROUP BY p.offense_formation, p.team_coverage_type HAVING COUNT(*) >= {} \
         ORDER BY plays DESC, offense_formation, team_coverage_type",
        FORMATION_MIN_PLAYS
    ));
    qb
}

pub fn speed_vs_success_query(filter: &PlayFilter) -> QueryBuilder<'static, Postgres> {
    // play_id repeats across games, so plays are identified by both keys
    let play_key = "(p.game_id::text || ':' || p.play_id::text)";
    let mut qb = QueryBuilder::new(format!(
        r#"
        WITH receiver_stats AS (
            SELECT
                t.player_name::text AS player_name,
                t.player_position::text AS player_position,
                ROUND(AVG(t.s * {mph})::numeric, 2)::float8 AS avg_speed,
                COUNT(DISTINCT {key}) FILTER (WHERE p.pass_result = '{c}') AS completions,
                COUNT(DISTINCT {key}) AS targets
            FROM tracking_data t
            JOIN play_information p ON t.game_id = p.game_id AND t.play_id = p.play_id
            WHERE t.player_position IN {positions}
                AND t.player_side = 'Offense'
                AND t.s IS NOT NULL"#,
        mph = MPH_PER_YARD_PER_SEC,
        key = play_key,
        c = PASS_COMPLETE,
        positions = sql_list(&RECEIVING_POSITIONS),
    ));
    filter.push_conditions(&mut qb, TeamScope::Possession);
    qb.push(format!(
        r#"
            GROUP BY t.player_name, t.player_position
            HAVING COUNT(DISTINCT {key}) >= {min_targets}
        )
        SELECT
            player_name,
            player_position,
            avg_speed,
            targets,
            completions,
            ROUND(completions::numeric / targets::numeric * 100, 1)::float8 AS success_rate
        FROM receiver_stats
        ORDER BY targets DESC, player_name
        LIMIT {limit}"#,
        key = play_key,
        min_targets = SPEED_SUCCESS_MIN_TARGETS,
        limit = SPEED_SUCCESS_LIMIT,
    ));
    qb
}

pub fn down_distance_query(filter: &PlayFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        r#"
        WITH situational_data AS (
            SELECT
                p.down::int4 AS down,
                {bucket} AS distance,
                p.expected_points_added,
                p.pass_result,
                p.yards_gained
            FROM play_information p
            WHERE p.down IS NOT NULL
                AND p.yards_to_go IS NOT NULL
                AND p.down <= 4"#,
        bucket = distance_bucket_sql("p.yards_to_go")
    ));
    filter.push_conditions(&mut qb, TeamScope::Possession);
    qb.push(format!(
        r#"
        )
        SELECT
            down,
            distance,
            COUNT(*) AS plays,
            ROUND(AVG(expected_points_added)::numeric, 2)::float8 AS avg_epa,
            ROUND((COUNT(*) FILTER (WHERE pass_result = '{c}'))::numeric / COUNT(*)::numeric * 100, 1)::float8 AS completion_pct,
            ROUND(AVG(yards_gained)::numeric, 1)::float8 AS avg_yards
        FROM situational_data
        GROUP BY down, distance
        ORDER BY down, {rank}"#,
        c = PASS_COMPLETE,
        rank = distance_rank_sql("distance"),
    ));
    qb
}

// ==================== Repository ====================

/// Read-only access to play and tracking data over one connection
pub struct TrackingRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> TrackingRepository<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Games of one season, by date then id
    pub async fn list_games(&mut self, season: i32) -> Result<Vec<GameSummary>, sqlx::Error> {
        sqlx::query_as::<_, GameSummary>(GAMES_SQL)
            .bind(season)
            .fetch_all(&mut *self.conn)
            .await
    }

    /// Every play of a game with its ball landing spot
    pub async fn plays_for_game(&mut self, game_id: &str) -> Result<Vec<PlayDetail>, sqlx::Error> {
        sqlx::query_as::<_, PlayDetail>(PLAYS_FOR_GAME_SQL)
            .bind(game_id)
            .fetch_all(&mut *self.conn)
            .await
    }

    /// First plays across all games, capped at [`PLAY_SUMMARY_LIMIT`]
    pub async fn play_summaries(&mut self) -> Result<Vec<PlaySummary>, sqlx::Error> {
        sqlx::query_as::<_, PlaySummary>(PLAY_SUMMARIES_SQL)
            .bind(PLAY_SUMMARY_LIMIT)
            .fetch_all(&mut *self.conn)
            .await
    }

    pub async fn play_tracking(
        &mut self,
        game_id: &str,
        play_id: i32,
    ) -> Result<Vec<TrackingFrame>, sqlx::Error> {
        sqlx::query_as::<_, TrackingFrame>(PLAY_TRACKING_SQL)
            .bind(game_id)
            .bind(play_id)
            .fetch_all(&mut *self.conn)
            .await
    }

    pub async fn play_participants(
        &mut self,
        game_id: &str,
        play_id: i32,
    ) -> Result<Vec<PlayParticipant>, sqlx::Error> {
        sqlx::query_as::<_, PlayParticipant>(PLAY_PARTICIPANTS_SQL)
            .bind(game_id)
            .bind(play_id)
            .fetch_all(&mut *self.conn)
            .await
    }

    /// Skill-position frames of a play, by player then frame
    pub async fn play_route_points(
        &mut self,
        game_id: &str,
        play_id: i32,
    ) -> Result<Vec<RoutePointRow>, sqlx::Error> {
        play_routes_query(game_id, play_id)
            .build_query_as::<RoutePointRow>()
            .fetch_all(&mut *self.conn)
            .await
    }

    pub async fn list_players(
        &mut self,
        position: Option<&str>,
    ) -> Result<Vec<PlayerInfo>, sqlx::Error> {
        players_query(position)
            .build_query_as::<PlayerInfo>()
            .fetch_all(&mut *self.conn)
            .await
    }

    pub async fn list_teams(&mut self) -> Result<Vec<TeamInfo>, sqlx::Error> {
        sqlx::query_as::<_, TeamInfo>(TEAMS_SQL)
            .fetch_all(&mut *self.conn)
            .await
    }

    pub async fn speed_stats(
        &mut self,
        filter: &SpeedFilter,
    ) -> Result<Vec<PositionSpeedStats>, sqlx::Error> {
        speed_stats_query(filter)
            .build_query_as::<PositionSpeedStats>()
            .fetch_all(&mut *self.conn)
            .await
    }

    pub async fn route_analysis(
        &mut self,
        filter: &PlayFilter,
    ) -> Result<Vec<RouteEfficiency>, sqlx::Error> {
        route_analysis_query(filter)
            .build_query_as::<RouteEfficiency>()
            .fetch_all(&mut *self.conn)
            .await
    }

    pub async fn separation_stats(
        &mut self,
        filter: &PlayFilter,
    ) -> Result<Vec<SeparationEstimate>, sqlx::Error> {
        separation_stats_query(filter)
            .build_query_as::<SeparationEstimate>()
            .fetch_all(&mut *self.conn)
            .await
    }

    pub async fn formation_matchup(
        &mut self,
        filter: &PlayFilter,
    ) -> Result<Vec<FormationMatchup>, sqlx::Error> {
        formation_matchup_query(filter)
            .build_query_as::<FormationMatchup>()
            .fetch_all(&mut *self.conn)
            .await
    }

    pub async fn speed_vs_success(
        &mut self,
        filter: &PlayFilter,
    ) -> Result<Vec<SpeedSuccess>, sqlx::Error> {
        speed_vs_success_query(filter)
            .build_query_as::<SpeedSuccess>()
            .fetch_all(&mut *self.conn)
            .await
    }

    pub async fn down_distance_heatmap(
        &mut self,
        filter: &PlayFilter,
    ) -> Result<Vec<DownDistanceCell>, sqlx::Error> {
        down_distance_query(filter)
            .build_query_as::<DownDistanceCell>()
            .fetch_all(&mut *self.conn)
            .await
    }
}
