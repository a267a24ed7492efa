//! API route handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::reshape::{assemble_tracking, group_routes};
use crate::storage::schema::PositionGroup;
use crate::storage::{Database, PlayFilter, SpeedFilter, StoreError, TrackingRepository};
use crate::types::{
    DownDistanceCell, ErrorResponse, FormationMatchup, GameSummary, HealthResponse,
    IndexResponse, PlayListing, PlayTracking, PlayerInfo, PlayerRoute, PositionSpeedStats,
    RouteEfficiency, SeparationEstimate, SpeedSuccess, TeamInfo,
};

const PLAY_NOT_FOUND: &str = "Play not found";
const ROUTES_NOT_FOUND: &str = "No routes found for this play";

/// Application state shared across handlers.
pub struct AppState {
    pub db: Database,
    pub config: AppConfig,
}

/// Error type for API handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, "Request failed: {}", self.message);
        } else {
            tracing::debug!(status = %self.status, "{}", self.message);
        }

        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

// ==================== Query parameters ====================

/// `?week=&team=` on the analytics endpoints
#[derive(Debug, Default, Deserialize)]
pub struct PlayFilterParams {
    pub week: Option<String>,
    pub team: Option<String>,
}

impl PlayFilterParams {
    fn parse(self) -> Result<PlayFilter, ApiError> {
        Ok(PlayFilter {
            week: parse_week(self.week)?,
            team: non_empty(self.team),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SpeedStatsParams {
    pub side: Option<String>,
    pub position_group: Option<String>,
    pub week: Option<String>,
    pub team: Option<String>,
}

impl SpeedStatsParams {
    fn parse(self) -> Result<SpeedFilter, ApiError> {
        let position_group = non_empty(self.position_group)
            .map(|group| group.parse::<PositionGroup>())
            .transpose()
            .map_err(ApiError::internal)?;

        Ok(SpeedFilter {
            side: non_empty(self.side),
            position_group,
            plays: PlayFilterParams {
                week: self.week,
                team: self.team,
            }
            .parse()?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PlaysParams {
    pub game_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlayersParams {
    pub position: Option<String>,
}

/// Empty query values mean the filter was not given
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_week(value: Option<String>) -> Result<Option<i32>, ApiError> {
    non_empty(value)
        .map(|week| {
            week.trim()
                .parse::<i32>()
                .map_err(|e| ApiError::internal(format!("invalid week '{}': {}", week, e)))
        })
        .transpose()
}

/// Non-numeric play ids cannot name a play.
fn parse_play_id(raw: &str, not_found: &str) -> Result<i32, ApiError> {
    raw.parse::<i32>().map_err(|_| ApiError::not_found(not_found))
}

// ==================== Router ====================

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/games", get(list_games))
        .route("/api/plays", get(list_plays))
        .route("/api/play/{game_id}/{play_id}/tracking", get(play_tracking))
        .route("/api/play/{game_id}/{play_id}/routes", get(play_routes))
        .route("/api/players", get(list_players))
        .route("/api/analytics/teams", get(list_teams))
        .route("/api/analytics/speed-stats", get(speed_stats))
        .route("/api/analytics/route-analysis", get(route_analysis))
        .route("/api/analytics/separation-stats", get(separation_stats))
        .route("/api/analytics/formation-matchup", get(formation_matchup))
        .route("/api/analytics/speed-vs-success", get(speed_vs_success))
        .route(
            "/api/analytics/down-distance-heatmap",
            get(down_distance_heatmap),
        )
        .with_state(state)
}

// ==================== Handlers ====================

/// Service index.
pub async fn index() -> Json<IndexResponse> {
    let endpoints = [
        ("games", "/api/games"),
        ("plays", "/api/plays?game_id=GAME_ID"),
        ("play_tracking", "/api/play/GAME_ID/PLAY_ID/tracking"),
        ("play_routes", "/api/play/GAME_ID/PLAY_ID/routes"),
        ("players", "/api/players?position=POSITION"),
        ("teams", "/api/analytics/teams"),
        (
            "speed_stats",
            "/api/analytics/speed-stats?side=SIDE&position_group=GROUP&week=WEEK&team=TEAM",
        ),
        ("route_analysis", "/api/analytics/route-analysis?week=WEEK&team=TEAM"),
        ("separation_stats", "/api/analytics/separation-stats?week=WEEK&team=TEAM"),
        ("formation_matchup", "/api/analytics/formation-matchup?week=WEEK&team=TEAM"),
        ("speed_vs_success", "/api/analytics/speed-vs-success?week=WEEK&team=TEAM"),
        (
            "down_distance_heatmap",
            "/api/analytics/down-distance-heatmap?week=WEEK&team=TEAM",
        ),
    ]
    .into_iter()
    .map(|(name, path)| (name.to_string(), path.to_string()))
    .collect::<BTreeMap<_, _>>();

    Json(IndexResponse {
        message: "NFL Tracking API".to_string(),
        endpoints,
    })
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Games of the configured season.
pub async fn list_games(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<GameSummary>>, ApiError> {
    let season = state.config.analytics.season;
    let games = state
        .db
        .with_connection(move |conn| {
            Box::pin(async move { TrackingRepository::new(conn).list_games(season).await })
        })
        .await?;

    tracing::debug!("Listed {} games for season {}", games.len(), season);
    Ok(Json(games))
}

/// Plays of one game, or a capped summary of all plays.
pub async fn list_plays(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PlaysParams>,
) -> Result<Json<PlayListing>, ApiError> {
    let game_id = non_empty(params.game_id);

    let listing = state
        .db
        .with_connection(move |conn| {
            Box::pin(async move {
                let mut repo = TrackingRepository::new(conn);
                match game_id {
                    Some(game_id) => repo.plays_for_game(&game_id).await.map(PlayListing::Detailed),
                    None => repo.play_summaries().await.map(PlayListing::Summary),
                }
            })
        })
        .await?;

    Ok(Json(listing))
}

/// Every frame of a play, with its participants.
pub async fn play_tracking(
    State(state): State<Arc<AppState>>,
    Path((game_id, play_id)): Path<(String, String)>,
) -> Result<Json<PlayTracking>, ApiError> {
    let play_id = parse_play_id(&play_id, PLAY_NOT_FOUND)?;

    let key = game_id.clone();
    let (tracking, players) = state
        .db
        .with_connection(move |conn| {
            Box::pin(async move {
                let mut repo = TrackingRepository::new(conn);
                let tracking = repo.play_tracking(&key, play_id).await?;
                if tracking.is_empty() {
                    return Ok((tracking, Vec::new()));
                }
                let players = repo.play_participants(&key, play_id).await?;
                Ok::<_, sqlx::Error>((tracking, players))
            })
        })
        .await?;

    let play = assemble_tracking(game_id, play_id, players, tracking)
        .ok_or_else(|| ApiError::not_found(PLAY_NOT_FOUND))?;

    tracing::debug!(
        "Play {}/{}: {} frames, {} players",
        play.game_id,
        play.play_id,
        play.total_frames,
        play.players.len()
    );
    Ok(Json(play))
}

/// Route polylines of the skill players on a play.
pub async fn play_routes(
    State(state): State<Arc<AppState>>,
    Path((game_id, play_id)): Path<(String, String)>,
) -> Result<Json<Vec<PlayerRoute>>, ApiError> {
    let play_id = parse_play_id(&play_id, ROUTES_NOT_FOUND)?;

    let rows = state
        .db
        .with_connection(move |conn| {
            Box::pin(async move {
                TrackingRepository::new(conn)
                    .play_route_points(&game_id, play_id)
                    .await
            })
        })
        .await?;

    if rows.is_empty() {
        return Err(ApiError::not_found(ROUTES_NOT_FOUND));
    }

    Ok(Json(group_routes(rows)))
}

/// Distinct players, optionally for one position.
pub async fn list_players(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PlayersParams>,
) -> Result<Json<Vec<PlayerInfo>>, ApiError> {
    let position = non_empty(params.position);

    let players = state
        .db
        .with_connection(move |conn| {
            Box::pin(async move {
                TrackingRepository::new(conn)
                    .list_players(position.as_deref())
                    .await
            })
        })
        .await?;

    Ok(Json(players))
}

/// Teams appearing in the play data.
pub async fn list_teams(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TeamInfo>>, ApiError> {
    let teams = state
        .db
        .with_connection(|conn| {
            Box::pin(async move { TrackingRepository::new(conn).list_teams().await })
        })
        .await?;

    Ok(Json(teams))
}

/// Speed distribution per position.
pub async fn speed_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SpeedStatsParams>,
) -> Result<Json<Vec<PositionSpeedStats>>, ApiError> {
    let filter = params.parse()?;

    let stats = state
        .db
        .with_connection(move |conn| {
            Box::pin(async move { TrackingRepository::new(conn).speed_stats(&filter).await })
        })
        .await?;

    Ok(Json(stats))
}

/// Completion and yardage by targeted route.
pub async fn route_analysis(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PlayFilterParams>,
) -> Result<Json<Vec<RouteEfficiency>>, ApiError> {
    let filter = params.parse()?;

    let stats = state
        .db
        .with_connection(move |conn| {
            Box::pin(async move { TrackingRepository::new(conn).route_analysis(&filter).await })
        })
        .await?;

    Ok(Json(stats))
}

/// Separation estimated from pass length, by route.
pub async fn separation_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PlayFilterParams>,
) -> Result<Json<Vec<SeparationEstimate>>, ApiError> {
    let filter = params.parse()?;

    let stats = state
        .db
        .with_connection(move |conn| {
            Box::pin(async move { TrackingRepository::new(conn).separation_stats(&filter).await })
        })
        .await?;

    Ok(Json(stats))
}

/// Offensive formation against coverage type.
pub async fn formation_matchup(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PlayFilterParams>,
) -> Result<Json<Vec<FormationMatchup>>, ApiError> {
    let filter = params.parse()?;

    let stats = state
        .db
        .with_connection(move |conn| {
            Box::pin(async move { TrackingRepository::new(conn).formation_matchup(&filter).await })
        })
        .await?;

    Ok(Json(stats))
}

/// Receiver speed against target success.
pub async fn speed_vs_success(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PlayFilterParams>,
) -> Result<Json<Vec<SpeedSuccess>>, ApiError> {
    let filter = params.parse()?;

    let stats = state
        .db
        .with_connection(move |conn| {
            Box::pin(async move { TrackingRepository::new(conn).speed_vs_success(&filter).await })
        })
        .await?;

    Ok(Json(stats))
}

/// Outcomes by down and distance bucket.
pub async fn down_distance_heatmap(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PlayFilterParams>,
) -> Result<Json<Vec<DownDistanceCell>>, ApiError> {
    let filter = params.parse()?;

    let cells = state
        .db
        .with_connection(move |conn| {
            Box::pin(async move {
                TrackingRepository::new(conn)
                    .down_distance_heatmap(&filter)
                    .await
            })
        })
        .await?;

    Ok(Json(cells))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::storage::fixture::{self, SeededDatabase};
    use crate::storage::schema::OFFENSE_POSITIONS;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use std::collections::HashSet;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let mut config = AppConfig::default();
        config.database = DatabaseConfig {
            host: "127.0.0.1".to_string(),
            // Nothing listens on port 1
            port: 1,
            name: Some("nfl".to_string()),
            user: Some("reader".to_string()),
            password: None,
            production: false,
            connect_timeout_secs: 2,
        };

        let state = Arc::new(AppState {
            db: Database::new(&config.database),
            config,
        });
        router(state)
    }

    fn seeded_app(seeded: &SeededDatabase) -> Router {
        router(Arc::new(AppState {
            db: seeded.db.clone(),
            config: AppConfig::default(),
        }))
    }

    async fn send_get(uri: &str) -> (StatusCode, Value) {
        send(test_app(), uri).await
    }

    async fn send(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[test]
    fn test_parse_week() {
        assert_eq!(parse_week(None).unwrap(), None);
        assert_eq!(parse_week(Some("".to_string())).unwrap(), None);
        assert_eq!(parse_week(Some("7".to_string())).unwrap(), Some(7));
        assert!(parse_week(Some("seven".to_string())).is_err());
    }

    #[test]
    fn test_play_filter_params_empty_values() {
        let filter = PlayFilterParams {
            week: Some(String::new()),
            team: Some(String::new()),
        }
        .parse()
        .unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_speed_stats_params() {
        let filter = SpeedStatsParams {
            side: Some("Defense".to_string()),
            position_group: Some("Offense".to_string()),
            week: Some("2".to_string()),
            team: Some("KC".to_string()),
        }
        .parse()
        .unwrap();

        assert_eq!(filter.side.as_deref(), Some("Defense"));
        assert_eq!(filter.position_group, Some(PositionGroup::Offense));
        assert_eq!(filter.plays.week, Some(2));
        assert_eq!(filter.plays.team.as_deref(), Some("KC"));
    }

    #[test]
    fn test_speed_stats_params_rejects_unknown_group() {
        let result = SpeedStatsParams {
            position_group: Some("special_teams".to_string()),
            ..Default::default()
        }
        .parse();
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_play_id() {
        assert_eq!(parse_play_id("56", PLAY_NOT_FOUND).unwrap(), 56);
        let err = parse_play_id("abc", PLAY_NOT_FOUND).unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_store_error_maps_to_500() {
        let err: ApiError = StoreError::Query(sqlx::Error::RowNotFound).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.is_empty());
    }

    #[tokio::test]
    async fn test_error_response_body() {
        let response = ApiError::not_found(PLAY_NOT_FOUND).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({ "error": "Play not found" }));
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send_get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_index_lists_endpoints() {
        let (status, body) = send_get("/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["endpoints"]["games"], "/api/games");
        assert!(body["endpoints"]["down_distance_heatmap"].is_string());
    }

    #[tokio::test]
    async fn test_non_numeric_play_id_is_not_found() {
        let (status, body) = send_get("/api/play/2023090700/abc/tracking").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], PLAY_NOT_FOUND);

        let (status, body) = send_get("/api/play/2023090700/abc/routes").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], ROUTES_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_week_is_server_error() {
        for path in [
            "/api/analytics/route-analysis?week=abc",
            "/api/analytics/speed-stats?week=abc",
            "/api/analytics/down-distance-heatmap?week=1.5",
        ] {
            let (status, body) = send_get(path).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{}", path);
            assert!(body["error"].as_str().unwrap().contains("invalid week"));
        }
    }

    #[tokio::test]
    async fn test_unknown_position_group_is_server_error() {
        let (status, body) = send_get("/api/analytics/speed-stats?position_group=special").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("position_group"));
    }

    #[tokio::test]
    async fn test_unreachable_database_is_server_error() {
        let (status, body) = send_get("/api/games").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body["error"].as_str().unwrap().is_empty());

        let (status, _) = send_get("/api/play/2023090700/56/tracking").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_seeded_games_and_plays_endpoints() {
        let Some(seeded) = fixture::seed().await else {
            return;
        };

        let (status, games) = send(seeded_app(&seeded), "/api/games").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(games.as_array().unwrap().len(), 2);

        let (status, plays) = send(seeded_app(&seeded), "/api/plays?game_id=2023090700").await;
        assert_eq!(status, StatusCode::OK);
        let plays = plays.as_array().unwrap();
        assert_eq!(plays.len(), 21);
        assert!(plays.iter().all(|p| p["game_id"] == "2023090700"));
        let ids: Vec<i64> = plays.iter().map(|p| p["play_id"].as_i64().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert!(plays[0].get("ball_land_x").is_some());

        let (status, summaries) = send(seeded_app(&seeded), "/api/plays?game_id=").await;
        assert_eq!(status, StatusCode::OK);
        let summaries = summaries.as_array().unwrap();
        assert_eq!(summaries.len(), 42);
        assert!(summaries[0].get("ball_land_x").is_none());

        seeded.drop_schema().await;
    }

    #[tokio::test]
    async fn test_seeded_tracking_endpoint() {
        let Some(seeded) = fixture::seed().await else {
            return;
        };

        let (status, play) = send(seeded_app(&seeded), "/api/play/2023090700/1/tracking").await;
        assert_eq!(status, StatusCode::OK);
        let frames = play["tracking"].as_array().unwrap();
        let max_frame = frames.iter().filter_map(|f| f["frame_id"].as_i64()).max();
        assert_eq!(play["total_frames"].as_i64(), max_frame);
        assert_eq!(play["total_frames"], 8);
        let tracked: HashSet<i64> = frames.iter().filter_map(|f| f["nfl_id"].as_i64()).collect();
        let players = play["players"].as_array().unwrap();
        assert!(!players.is_empty());
        assert!(players
            .iter()
            .all(|p| tracked.contains(&p["nfl_id"].as_i64().unwrap())));

        // Plays without tracking rows are not found, even when the play exists
        for path in ["/api/play/2023090700/500/tracking", "/api/play/2023090700/99/tracking"] {
            let (status, body) = send(seeded_app(&seeded), path).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{}", path);
            assert_eq!(body["error"], PLAY_NOT_FOUND);
        }

        seeded.drop_schema().await;
    }

    #[tokio::test]
    async fn test_seeded_routes_endpoint() {
        let Some(seeded) = fixture::seed().await else {
            return;
        };

        let (status, routes) = send(seeded_app(&seeded), "/api/play/2023090700/1/routes").await;
        assert_eq!(status, StatusCode::OK);
        let routes = routes.as_array().unwrap();
        let positions: Vec<&str> = routes
            .iter()
            .filter_map(|r| r["player_position"].as_str())
            .collect();
        assert_eq!(positions, ["WR", "TE", "WR"]);
        assert!(routes
            .iter()
            .all(|r| r["route"].as_array().unwrap().iter().all(|p| p["x"].is_f64())));

        let (status, body) = send(seeded_app(&seeded), "/api/play/2023090700/500/routes").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], ROUTES_NOT_FOUND);

        seeded.drop_schema().await;
    }

    #[tokio::test]
    async fn test_seeded_players_endpoint() {
        let Some(seeded) = fixture::seed().await else {
            return;
        };

        let (status, players) = send(seeded_app(&seeded), "/api/players?position=WR").await;
        assert_eq!(status, StatusCode::OK);
        let players = players.as_array().unwrap();
        assert!(players.iter().all(|p| p["player_position"] == "WR"));
        let names: Vec<&str> = players
            .iter()
            .filter_map(|p| p["player_name"].as_str())
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        let ids: HashSet<i64> = players.iter().filter_map(|p| p["nfl_id"].as_i64()).collect();
        assert_eq!(ids.len(), players.len());

        seeded.drop_schema().await;
    }

    #[tokio::test]
    async fn test_seeded_speed_stats_endpoint() {
        let Some(seeded) = fixture::seed().await else {
            return;
        };

        let (status, rows) = send(
            seeded_app(&seeded),
            "/api/analytics/speed-stats?position_group=offense",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let rows = rows.as_array().unwrap();
        assert!(!rows.is_empty());
        for row in rows {
            let position = row["position"].as_str().unwrap();
            assert!(OFFENSE_POSITIONS.contains(&position), "{}", position);
            let avg = row["avg_speed"].as_f64().unwrap();
            assert!(avg > 0.0 && avg < 25.0);
            assert!(row["min_speed"].as_f64().unwrap() <= avg);
            assert!(avg <= row["max_speed"].as_f64().unwrap());
        }

        let (status, body) = send(
            seeded_app(&seeded),
            "/api/analytics/speed-stats?position_group=bogus",
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("position_group"));

        seeded.drop_schema().await;
    }
}
