use rand::rngs::SmallRng;
use rand::SeedableRng;

use super::config::GameConfig;
use super::presenter::Presenter;
use super::rules::{RevealOutcome, RuleError};
use super::score::{StarThresholds, ScoreTracker};
use super::state::{Deck, DeckPhase, GameEvent, Position};
use super::timer::{ManualScheduler, Scheduler, TimerHandle, TimerTask};

/// 一个对局上下文：独占一副牌、一个计分面板以及它们的协作者。
pub struct GameSession<S: Scheduler, P: Presenter> {
    config: GameConfig,
    deck: Deck,
    score: ScoreTracker,
    scheduler: S,
    presenter: P,
    rng: SmallRng,
    pending_resolution: Option<TimerHandle>,
    clock: Option<TimerHandle>,
}

impl<S: Scheduler, P: Presenter> GameSession<S, P> {
    /// 洗好第一局并通知展示层，但不启动计时。
    pub fn new(config: GameConfig, scheduler: S, presenter: P) -> Self {
        let mut rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let mut deck = Deck::canonical();
        let layout = deck.shuffle(&mut rng);

        let mut session = Self {
            score: ScoreTracker::new(StarThresholds::from(&config)),
            config,
            deck,
            scheduler,
            presenter,
            rng,
            pending_resolution: None,
            clock: None,
        };
        session.emit(layout);
        let score_events = session.score.reset();
        session.emit(score_events);
        session
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn score(&self) -> &ScoreTracker {
        &self.score
    }

    pub fn phase(&self) -> DeckPhase {
        self.deck.phase()
    }

    /// 计时器是否在走。
    pub fn is_running(&self) -> bool {
        self.clock.is_some()
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    fn emit(&mut self, events: Vec<GameEvent>) {
        for event in &events {
            self.presenter.notify(event);
        }
    }

    /// 翻开一张牌。被拒绝的请求不改变任何状态，也不产生通知。
    pub fn request_reveal(&mut self, position: Position) -> Result<RevealOutcome, RuleError> {
        let resolution = match self.deck.reveal_card(position) {
            Ok(resolution) => resolution,
            Err(error) => {
                log::debug!("ignored reveal of {position}: {error}");
                return Err(error);
            }
        };
        self.emit(resolution.events);
        let score_events = self.score.increment_move();
        self.emit(score_events);

        if let RevealOutcome::PendingResolution { first, second } = resolution.outcome {
            self.cancel_resolution();
            let handle = self
                .scheduler
                .schedule(TimerTask::ResolvePair, self.config.resolve_delay_ms);
            log::debug!("scheduled resolution of ({first}, {second}) as {handle:?}");
            self.pending_resolution = Some(handle);
        }
        Ok(resolution.outcome)
    }

    /// 重新发牌并清零计分；不影响计时器的启停。
    pub fn request_reset(&mut self) -> Result<(), RuleError> {
        let deck_events = self.deck.reset(&mut self.rng)?;
        self.cancel_resolution();
        self.emit(deck_events);
        let score_events = self.score.reset();
        self.emit(score_events);
        log::debug!("deal reset");
        Ok(())
    }

    /// 重新发牌并启动每秒一跳的计时器。
    pub fn request_start(&mut self) -> Result<(), RuleError> {
        self.request_reset()?;
        self.stop_clock();
        let handle = self
            .scheduler
            .schedule_repeating(TimerTask::Tick, self.config.tick_interval_ms);
        self.clock = Some(handle);
        log::info!("deal started");
        Ok(())
    }

    /// 定时器到期时由驱动方调用；过期或未知的句柄直接忽略。
    pub fn fire(&mut self, handle: TimerHandle) {
        if self.pending_resolution == Some(handle) {
            self.pending_resolution = None;
            self.resolve();
        } else if self.clock == Some(handle) {
            self.tick();
        } else {
            log::debug!("ignoring stale timer {handle:?}");
        }
    }

    fn resolve(&mut self) {
        let resolution = match self.deck.resolve_pair() {
            Ok(resolution) => resolution,
            Err(error) => {
                log::warn!("resolution fired without a pair: {error}");
                return;
            }
        };
        self.emit(resolution.events);

        if resolution.deal_won {
            self.stop_clock();
            let summary = self.score.summary();
            log::info!(
                "deal won in {} moves, {}s, {} stars",
                summary.moves,
                summary.seconds,
                summary.stars
            );
            self.emit(vec![GameEvent::DealWon { summary }]);
        }
    }

    fn tick(&mut self) {
        if self.deck.is_won() {
            self.stop_clock();
            return;
        }
        let events = self.score.increment_time();
        self.emit(events);
    }

    fn cancel_resolution(&mut self) {
        if let Some(handle) = self.pending_resolution.take() {
            self.scheduler.cancel(handle);
        }
    }

    fn stop_clock(&mut self) {
        if let Some(handle) = self.clock.take() {
            self.scheduler.cancel(handle);
        }
    }
}

impl<P: Presenter> GameSession<ManualScheduler, P> {
    /// 推进虚拟时钟并依次触发到期的定时器。
    pub fn advance(&mut self, elapsed_ms: u64) {
        let until = self.scheduler.now_ms() + elapsed_ms;
        while let Some((handle, _task)) = self.scheduler.pop_due(until) {
            self.fire(handle);
        }
        self.scheduler.set_now(until);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::presenter::EventLog;
    use crate::game::state::{CardState, DealSummary, DECK_SIZE};

    type TestSession = GameSession<ManualScheduler, EventLog>;

    fn session() -> TestSession {
        let mut session = GameSession::new(
            GameConfig::default().with_seed(2024),
            ManualScheduler::new(),
            EventLog::new(),
        );
        session.presenter_mut().clear();
        session
    }

    fn mismatched_pair(deck: &Deck) -> (Position, Position) {
        let first = deck
            .cards
            .iter()
            .find(|card| card.is_closed())
            .map(|card| card.position)
            .expect("a closed card");
        let symbol = deck.cards[first].symbol;
        let second = deck
            .cards
            .iter()
            .find(|card| card.is_closed() && card.symbol != symbol)
            .map(|card| card.position)
            .expect("a closed card with another symbol");
        (first, second)
    }

    fn matching_pair(deck: &Deck) -> (Position, Position) {
        let first = deck
            .cards
            .iter()
            .find(|card| card.is_closed())
            .map(|card| card.position)
            .expect("a closed card");
        let second = deck.partner_of(first).expect("every card has a partner");
        (first, second)
    }

    #[test]
    fn new_session_lays_out_a_closed_deal() {
        let session = GameSession::new(
            GameConfig::default().with_seed(1),
            ManualScheduler::new(),
            EventLog::new(),
        );
        let events = session.presenter().events();
        assert_eq!(
            events.first(),
            Some(&GameEvent::Layout {
                symbols: session.deck().symbols()
            })
        );
        assert_eq!(session.deck().count_in_state(CardState::Closed), DECK_SIZE);
        assert_eq!(session.score().summary(), DealSummary { moves: 0, seconds: 0, stars: 3 });
        assert!(!session.is_running());
    }

    #[test]
    fn same_seed_deals_same_layout() {
        let a = session();
        let b = session();
        assert_eq!(a.deck().symbols(), b.deck().symbols());
    }

    #[test]
    fn mismatch_stays_visible_until_delay_elapses() {
        let mut session = session();
        let (first, second) = mismatched_pair(session.deck());

        assert_eq!(
            session.request_reveal(first),
            Ok(RevealOutcome::Pending { position: first })
        );
        assert_eq!(
            session.request_reveal(second),
            Ok(RevealOutcome::PendingResolution { first, second })
        );

        session.advance(199);
        assert_eq!(session.deck().count_in_state(CardState::Opened), 2);

        session.advance(1);
        assert_eq!(session.deck().count_in_state(CardState::Closed), DECK_SIZE);
        assert_eq!(session.score().moves, 2, "each accepted reveal is a move");
        assert_eq!(
            session.presenter().events(),
            &[
                GameEvent::CardOpened { position: first },
                GameEvent::MovesChanged { moves: 1 },
                GameEvent::CardOpened { position: second },
                GameEvent::MovesChanged { moves: 2 },
                GameEvent::CardClosed { position: first },
                GameEvent::CardClosed { position: second },
            ]
        );
    }

    #[test]
    fn matching_pair_locks_after_delay() {
        let mut session = session();
        let (first, second) = matching_pair(session.deck());
        session.request_reveal(first).expect("first reveal");
        session.request_reveal(second).expect("second reveal");
        session.advance(200);

        assert_eq!(session.deck().matched_count, 2);
        let tail = &session.presenter().events()[4..];
        assert_eq!(
            tail,
            &[
                GameEvent::CardMatched { position: first },
                GameEvent::CardMatched { position: second },
            ]
        );
    }

    #[test]
    fn third_reveal_during_resolution_is_dropped() {
        let mut session = session();
        let (first, second) = mismatched_pair(session.deck());
        session.request_reveal(first).expect("first reveal");
        session.request_reveal(second).expect("second reveal");
        session.presenter_mut().clear();

        let third = (0..DECK_SIZE)
            .find(|p| *p != first && *p != second)
            .expect("another card");
        assert_eq!(session.request_reveal(third), Err(RuleError::ResolutionPending));
        assert!(session.presenter().events().is_empty());
        assert_eq!(session.score().moves, 2);
    }

    #[test]
    fn revealing_matched_card_is_silent() {
        let mut session = session();
        let (first, second) = matching_pair(session.deck());
        session.request_reveal(first).expect("first reveal");
        session.request_reveal(second).expect("second reveal");
        session.advance(200);
        session.presenter_mut().clear();

        assert_eq!(
            session.request_reveal(first),
            Err(RuleError::CardNotClosed {
                position: first,
                state: CardState::Matched
            })
        );
        assert_eq!(
            session.request_reveal(DECK_SIZE + 3),
            Err(RuleError::InvalidPosition {
                position: DECK_SIZE + 3
            })
        );
        assert!(session.presenter().events().is_empty());
        assert_eq!(session.score().moves, 2);
    }

    #[test]
    fn clock_ticks_once_per_second_after_start() {
        let mut session = session();
        session.request_start().expect("start succeeds");
        session.presenter_mut().clear();

        session.advance(3500);
        assert_eq!(session.score().elapsed_seconds, 3);
        assert_eq!(
            session.presenter().events(),
            &[
                GameEvent::TimeChanged { seconds: 1 },
                GameEvent::TimeChanged { seconds: 2 },
                GameEvent::TimeChanged { seconds: 3 },
            ]
        );
    }

    #[test]
    fn restarting_does_not_double_the_clock() {
        let mut session = session();
        session.request_start().expect("first start");
        session.advance(1000);
        session.request_start().expect("second start");
        assert_eq!(session.score().elapsed_seconds, 0);
        assert_eq!(session.scheduler_mut().pending_count(), 1);

        session.advance(2000);
        assert_eq!(session.score().elapsed_seconds, 2);
    }

    #[test]
    fn reset_cancels_pending_resolution() {
        let mut session = session();
        let (first, second) = mismatched_pair(session.deck());
        session.request_reveal(first).expect("first reveal");
        session.request_reveal(second).expect("second reveal");

        session.request_reset().expect("reset succeeds");
        session.presenter_mut().clear();
        session.advance(1000);

        assert!(session.presenter().events().is_empty());
        assert_eq!(session.phase(), DeckPhase::Idle);
        assert_eq!(session.score().moves, 0);
        assert!(!session.is_running(), "reset alone never starts the clock");
    }

    #[test]
    fn final_pair_wins_and_stops_the_clock() {
        let mut session = session();
        session.request_start().expect("start succeeds");

        while session.deck().matched_count < DECK_SIZE - 2 {
            let (first, second) = matching_pair(session.deck());
            session.request_reveal(first).expect("first reveal");
            session.request_reveal(second).expect("second reveal");
            session.advance(200);
        }
        let (first, second) = matching_pair(session.deck());
        session.request_reveal(first).expect("first reveal");
        session.request_reveal(second).expect("second reveal");
        session.presenter_mut().clear();
        session.advance(200);

        let summary = session.score().summary();
        assert_eq!(
            session.presenter().events(),
            &[
                GameEvent::CardMatched { position: first },
                GameEvent::CardMatched { position: second },
                GameEvent::DealWon { summary },
            ]
        );
        assert_eq!(summary.moves, DECK_SIZE as u32);
        assert_eq!(session.phase(), DeckPhase::Won);
        assert!(!session.is_running());

        session.presenter_mut().clear();
        session.advance(5000);
        assert!(session.presenter().events().is_empty(), "no ticks after a win");
        assert_eq!(session.request_reveal(0), Err(RuleError::DealWon));
    }

    #[test]
    fn sloppy_play_loses_stars() {
        let mut session = session();
        let mut drops = Vec::new();
        for _ in 0..20 {
            let (first, second) = mismatched_pair(session.deck());
            session.request_reveal(first).expect("first reveal");
            session.request_reveal(second).expect("second reveal");
            session.advance(200);
            drops.extend(
                session
                    .presenter_mut()
                    .take()
                    .into_iter()
                    .filter(|event| matches!(event, GameEvent::StarsChanged { .. })),
            );
        }
        assert_eq!(session.score().moves, 40);
        assert_eq!(session.score().stars, 1);
        assert_eq!(
            drops,
            vec![
                GameEvent::StarsChanged { stars: 2 },
                GameEvent::StarsChanged { stars: 1 },
            ]
        );
    }
}
