//! 计分面板：步数、用时与星级。

use serde::{Deserialize, Serialize};

use super::config::GameConfig;
use super::state::{DealSummary, GameEvent};

pub const MAX_STARS: u8 = 3;

/// 星级阈值：步数达到 `two_star_moves` 降为两星，达到 `one_star_moves` 降为一星。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StarThresholds {
    pub two_star_moves: u32,
    pub one_star_moves: u32,
}

impl StarThresholds {
    pub fn stars_for(&self, moves: u32) -> u8 {
        if moves >= self.one_star_moves {
            1
        } else if moves >= self.two_star_moves {
            2
        } else {
            MAX_STARS
        }
    }
}

impl Default for StarThresholds {
    fn default() -> Self {
        Self {
            two_star_moves: 30,
            one_star_moves: 40,
        }
    }
}

impl From<&GameConfig> for StarThresholds {
    fn from(config: &GameConfig) -> Self {
        Self {
            two_star_moves: config.two_star_moves,
            one_star_moves: config.one_star_moves,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreTracker {
    pub moves: u32,
    pub elapsed_seconds: u32,
    pub stars: u8,
    #[serde(default)]
    pub thresholds: StarThresholds,
}

impl ScoreTracker {
    pub fn new(thresholds: StarThresholds) -> Self {
        Self {
            moves: 0,
            elapsed_seconds: 0,
            stars: MAX_STARS,
            thresholds,
        }
    }

    pub fn increment_move(&mut self) -> Vec<GameEvent> {
        self.moves = self.moves.saturating_add(1);
        let mut events = vec![GameEvent::MovesChanged { moves: self.moves }];

        // 星级只降不升
        let stars = self.thresholds.stars_for(self.moves).min(self.stars);
        if stars != self.stars {
            self.stars = stars;
            log::debug!("stars dropped to {stars} after {} moves", self.moves);
            events.push(GameEvent::StarsChanged { stars });
        }
        events
    }

    pub fn increment_time(&mut self) -> Vec<GameEvent> {
        self.elapsed_seconds = self.elapsed_seconds.saturating_add(1);
        vec![GameEvent::TimeChanged {
            seconds: self.elapsed_seconds,
        }]
    }

    pub fn reset(&mut self) -> Vec<GameEvent> {
        self.moves = 0;
        self.elapsed_seconds = 0;
        self.stars = MAX_STARS;
        vec![
            GameEvent::MovesChanged { moves: 0 },
            GameEvent::StarsChanged { stars: MAX_STARS },
            GameEvent::TimeChanged { seconds: 0 },
        ]
    }

    pub fn summary(&self) -> DealSummary {
        DealSummary {
            moves: self.moves,
            seconds: self.elapsed_seconds,
            stars: self.stars,
        }
    }
}

impl Default for ScoreTracker {
    fn default() -> Self {
        Self::new(StarThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stars_step_down_at_thresholds() {
        let mut score = ScoreTracker::default();
        let mut ratings = Vec::new();
        for _ in 0..45 {
            score.increment_move();
            ratings.push((score.moves, score.stars));
        }
        for (moves, stars) in ratings {
            let expected = match moves {
                0..=29 => 3,
                30..=39 => 2,
                _ => 1,
            };
            assert_eq!(stars, expected, "wrong rating at {moves} moves");
        }
    }

    #[test]
    fn star_change_is_notified_once() {
        let mut score = ScoreTracker::default();
        let changes: Vec<GameEvent> = (0..40)
            .flat_map(|_| score.increment_move())
            .filter(|event| matches!(event, GameEvent::StarsChanged { .. }))
            .collect();
        assert_eq!(
            changes,
            vec![
                GameEvent::StarsChanged { stars: 2 },
                GameEvent::StarsChanged { stars: 1 },
            ]
        );
    }

    #[test]
    fn reset_restores_full_rating() {
        let mut score = ScoreTracker::default();
        for _ in 0..35 {
            score.increment_move();
        }
        score.increment_time();
        let events = score.reset();
        assert_eq!(score.summary(), DealSummary { moves: 0, seconds: 0, stars: 3 });
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn time_counts_whole_seconds() {
        let mut score = ScoreTracker::default();
        score.increment_time();
        let events = score.increment_time();
        assert_eq!(events, vec![GameEvent::TimeChanged { seconds: 2 }]);
        assert_eq!(score.moves, 0, "ticks never count as moves");
    }

    #[test]
    fn custom_thresholds_apply() {
        let mut score = ScoreTracker::new(StarThresholds {
            two_star_moves: 2,
            one_star_moves: 4,
        });
        score.increment_move();
        score.increment_move();
        assert_eq!(score.stars, 2);
        score.increment_move();
        score.increment_move();
        assert_eq!(score.stars, 1);
    }
}
