//! Low-frequency presentation data: leaderboard, latency and frame rate.

use crate::entity::PlayerData;
use crate::store::EntityStore;
use shared::Position;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankEntry {
    pub id: u16,
    pub score: i32,
    pub is_local: bool,
}

#[derive(Debug, Clone)]
pub struct Hud {
    refresh_ms: u64,
    next_refresh_at: Option<u64>,
    last_refresh_at: u64,
    frames: u32,
    ranking: Vec<RankEntry>,
    rtt_text: String,
    fps: u32,
    coordinates: Position,
}

impl Hud {
    pub fn new(refresh_ms: u64) -> Self {
        Self {
            refresh_ms,
            next_refresh_at: None,
            last_refresh_at: 0,
            frames: 0,
            ranking: Vec::new(),
            rtt_text: rtt_text(None),
            fps: 0,
            coordinates: Position::default(),
        }
    }

    pub fn record_frame(&mut self) {
        self.frames += 1;
    }

    pub fn set_coordinates(&mut self, position: Position) {
        self.coordinates = position;
    }

    /// Recomputes ranking, latency text and FPS when the refresh interval
    /// has elapsed. Returns whether anything was recomputed.
    pub fn maybe_refresh(
        &mut self,
        now: u64,
        players: &EntityStore<PlayerData>,
        local_id: u16,
        rtt: Option<u64>,
    ) -> bool {
        if let Some(due) = self.next_refresh_at {
            if now < due {
                return false;
            }
            let elapsed = now.saturating_sub(self.last_refresh_at);
            if elapsed > 0 {
                self.fps = (u64::from(self.frames) * 1000 / elapsed) as u32;
            }
        }

        self.ranking = rank(players, local_id);
        self.rtt_text = rtt_text(rtt);
        self.frames = 0;
        self.last_refresh_at = now;
        self.next_refresh_at = Some(now + self.refresh_ms);
        true
    }

    pub fn ranking(&self) -> &[RankEntry] {
        &self.ranking
    }

    pub fn rtt_text(&self) -> &str {
        &self.rtt_text
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn coordinates_text(&self) -> String {
        format!("X: {:.0} Y: {:.0}", self.coordinates.x, self.coordinates.y)
    }

    /// Forces a recompute on the next refresh call.
    pub fn reset(&mut self) {
        self.next_refresh_at = None;
        self.frames = 0;
        self.ranking.clear();
        self.rtt_text = rtt_text(None);
    }
}

/// Live players ordered by score descending, ties broken by id.
pub fn rank(players: &EntityStore<PlayerData>, local_id: u16) -> Vec<RankEntry> {
    let mut ranking: Vec<RankEntry> = players
        .iter_live()
        .map(|player| RankEntry {
            id: player.id,
            score: player.data.score,
            is_local: player.id == local_id,
        })
        .collect();
    ranking.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));
    ranking
}

fn rtt_text(rtt: Option<u64>) -> String {
    match rtt {
        Some(ms) => format!("RTT: {}ms", ms),
        None => "RTT: --".to_string(),
    }
}
