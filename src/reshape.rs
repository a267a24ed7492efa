//! Reshaping of flat tracking rows into per-player structures.

use indexmap::IndexMap;

use crate::types::{
    PlayParticipant, PlayTracking, PlayerRoute, RoutePoint, RoutePointRow, TrackingFrame,
};

/// Group frame-ordered route rows into one polyline per player.
///
/// Players keep the order in which they are first seen; points keep input
/// order, so frame-sorted input yields frame-sorted routes.
pub fn group_routes<I>(rows: I) -> Vec<PlayerRoute>
where
    I: IntoIterator<Item = RoutePointRow>,
{
    let mut routes: IndexMap<i32, PlayerRoute> = IndexMap::new();

    for row in rows {
        let RoutePointRow {
            nfl_id,
            player_name,
            player_position,
            x,
            y,
        } = row;

        routes
            .entry(nfl_id)
            .or_insert_with(|| PlayerRoute {
                nfl_id,
                player_name,
                player_position,
                route: Vec::new(),
            })
            .route
            .push(RoutePoint { x, y });
    }

    routes.into_values().collect()
}

/// Assemble the tracking response for a play.
///
/// Returns `None` when no frames were found.
pub fn assemble_tracking(
    game_id: String,
    play_id: i32,
    players: Vec<PlayParticipant>,
    tracking: Vec<TrackingFrame>,
) -> Option<PlayTracking> {
    let total_frames = tracking.iter().map(|frame| frame.frame_id).max()?;

    Some(PlayTracking {
        game_id,
        play_id,
        players,
        tracking,
        total_frames,
    })
}
