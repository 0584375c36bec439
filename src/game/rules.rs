use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::{CardState, Deck, DeckPhase, GameEvent, IntegrityError, Position, DECK_SIZE};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RuleError {
    InvalidPosition { position: Position },
    CardNotClosed { position: Position, state: CardState },
    ResolutionPending,
    DealWon,
    NothingToResolve,
    IntegrityViolation { error: IntegrityError },
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::InvalidPosition { position } => {
                write!(f, "position {position} is outside the deck")
            }
            RuleError::CardNotClosed { position, state } => {
                write!(f, "card {position} is already {state:?}")
            }
            RuleError::ResolutionPending => write!(f, "two cards are already open"),
            RuleError::DealWon => write!(f, "the deal is already won"),
            RuleError::NothingToResolve => write!(f, "no pair is waiting for resolution"),
            RuleError::IntegrityViolation { error } => write!(f, "integrity violation: {error}"),
        }
    }
}

impl std::error::Error for RuleError {}

/// 翻开一张牌后的结果。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RevealOutcome {
    Pending { position: Position },
    PendingResolution { first: Position, second: Position },
}

/// 两张牌比对后的结果。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum PairOutcome {
    Matched { first: Position, second: Position },
    Mismatched { first: Position, second: Position },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleResolution<T> {
    pub outcome: T,
    pub events: Vec<GameEvent>,
    #[serde(default)]
    pub deal_won: bool,
}

impl<T> RuleResolution<T> {
    fn new(outcome: T, events: Vec<GameEvent>, deal_won: bool) -> Self {
        Self {
            outcome,
            events,
            deal_won,
        }
    }
}

impl Deck {
    fn ensure_integrity(&self) -> Result<(), RuleError> {
        self.integrity_check()
            .map_err(|error| RuleError::IntegrityViolation { error })
    }

    fn ensure_accepting_reveals(&self) -> Result<(), RuleError> {
        match self.phase() {
            DeckPhase::Won => Err(RuleError::DealWon),
            DeckPhase::Resolving { .. } => Err(RuleError::ResolutionPending),
            DeckPhase::Idle | DeckPhase::AwaitingSecond { .. } => Ok(()),
        }
    }

    fn ensure_closed(&self, position: Position) -> Result<(), RuleError> {
        let card = self
            .card(position)
            .ok_or(RuleError::InvalidPosition { position })?;
        match card.state {
            CardState::Closed => Ok(()),
            state @ (CardState::Opened | CardState::Matched) => {
                Err(RuleError::CardNotClosed { position, state })
            }
        }
    }

    /// Fisher–Yates 洗牌；牌位不变，只重新分配图案。
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<GameEvent> {
        let mut symbols = self.symbols();
        symbols.shuffle(rng);
        for (card, symbol) in self.cards.iter_mut().zip(symbols) {
            card.symbol = symbol;
        }
        log::debug!("shuffled deck: {symbols:?}");
        vec![GameEvent::Layout { symbols }]
    }

    /// 清空翻开与配对状态后重新洗牌。
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Vec<GameEvent>, RuleError> {
        self.ensure_integrity()?;

        self.revealed.clear();
        self.matched_count = 0;
        let mut events = Vec::with_capacity(DECK_SIZE + 1);
        for card in &mut self.cards {
            card.state = CardState::Closed;
            events.push(GameEvent::CardClosed {
                position: card.position,
            });
        }
        events.extend(self.shuffle(rng));
        Ok(events)
    }

    pub fn reveal_card(
        &mut self,
        position: Position,
    ) -> Result<RuleResolution<RevealOutcome>, RuleError> {
        self.ensure_accepting_reveals()?;
        self.ensure_integrity()?;
        self.ensure_closed(position)?;

        self.set_state(position, CardState::Opened);
        self.revealed.push(position);
        log::debug!("opened card {position}, revealed = {:?}", self.revealed);

        let events = vec![GameEvent::CardOpened { position }];
        let outcome = match self.phase() {
            DeckPhase::Resolving { first, second } => {
                RevealOutcome::PendingResolution { first, second }
            }
            _ => RevealOutcome::Pending { position },
        };
        Ok(RuleResolution::new(outcome, events, false))
    }

    pub fn resolve_pair(&mut self) -> Result<RuleResolution<PairOutcome>, RuleError> {
        let (first, second) = match self.phase() {
            DeckPhase::Resolving { first, second } => (first, second),
            _ => return Err(RuleError::NothingToResolve),
        };

        let symbols = (
            self.card(first).map(|card| card.symbol),
            self.card(second).map(|card| card.symbol),
        );
        self.revealed.clear();

        let (outcome, events) = match symbols {
            (Some(a), Some(b)) if a == b => {
                self.set_state(first, CardState::Matched);
                self.set_state(second, CardState::Matched);
                self.matched_count += 2;
                (
                    PairOutcome::Matched { first, second },
                    vec![
                        GameEvent::CardMatched { position: first },
                        GameEvent::CardMatched { position: second },
                    ],
                )
            }
            _ => {
                self.set_state(first, CardState::Closed);
                self.set_state(second, CardState::Closed);
                (
                    PairOutcome::Mismatched { first, second },
                    vec![
                        GameEvent::CardClosed { position: first },
                        GameEvent::CardClosed { position: second },
                    ],
                )
            }
        };
        log::debug!(
            "resolved pair {outcome:?}, matched = {}/{}",
            self.matched_count,
            self.cards.len()
        );

        Ok(RuleResolution::new(outcome, events, self.is_won()))
    }
}
