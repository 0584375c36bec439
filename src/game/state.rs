use serde::{Deserialize, Serialize};
use std::fmt;

/// 一副牌的张数（8 种图案 × 2）。
pub const DECK_SIZE: usize = 16;
/// 图案种类数。
pub const PAIR_COUNT: usize = DECK_SIZE / 2;

/// 牌位索引，范围 `[0, DECK_SIZE)`。
pub type Position = usize;

/// 卡牌图案，每种图案在一局中恰好出现两次。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Symbol {
    Anchor,
    Bicycle,
    Bolt,
    Bomb,
    Cube,
    Diamond,
    Leaf,
    PaperPlane,
}

impl Symbol {
    pub const ALL: [Symbol; PAIR_COUNT] = [
        Symbol::Anchor,
        Symbol::Bicycle,
        Symbol::Bolt,
        Symbol::Bomb,
        Symbol::Cube,
        Symbol::Diamond,
        Symbol::Leaf,
        Symbol::PaperPlane,
    ];

    /// Font Awesome 图标类名，前端直接写入 `<i class>`。
    pub fn icon_class(self) -> &'static str {
        match self {
            Symbol::Anchor => "fa fa-anchor",
            Symbol::Bicycle => "fa fa-bicycle",
            Symbol::Bolt => "fa fa-bolt",
            Symbol::Bomb => "fa fa-bomb",
            Symbol::Cube => "fa fa-cube",
            Symbol::Diamond => "fa fa-diamond",
            Symbol::Leaf => "fa fa-leaf",
            Symbol::PaperPlane => "fa fa-paper-plane-o",
        }
    }
}

/// 卡牌状态：`Closed → Opened → {Matched | Closed}`，`Matched` 为终态。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CardState {
    Closed,
    Opened,
    Matched,
}

impl Default for CardState {
    fn default() -> Self {
        CardState::Closed
    }
}

impl CardState {
    pub fn css_class(self) -> &'static str {
        match self {
            CardState::Closed => "card",
            CardState::Opened => "card open show",
            CardState::Matched => "card open match",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    pub position: Position,
    pub symbol: Symbol,
    #[serde(default)]
    pub state: CardState,
}

impl Card {
    pub fn new(position: Position, symbol: Symbol) -> Self {
        Self {
            position,
            symbol,
            state: CardState::Closed,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == CardState::Closed
    }
}

/// 一局结束时的成绩。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DealSummary {
    pub moves: u32,
    pub seconds: u32,
    pub stars: u8,
}

/// 交给前端的事件流。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    Layout { symbols: [Symbol; DECK_SIZE] },
    CardOpened { position: Position },
    CardClosed { position: Position },
    CardMatched { position: Position },
    MovesChanged { moves: u32 },
    TimeChanged { seconds: u32 },
    StarsChanged { stars: u8 },
    DealWon { summary: DealSummary },
}

/// 牌桌阶段，由 `revealed` 与 `matched_count` 推导而来。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum DeckPhase {
    Idle,
    AwaitingSecond { first: Position },
    Resolving { first: Position, second: Position },
    Won,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    WrongCardCount { count: usize },
    UnpairedSymbol { symbol: Symbol, count: usize },
    PositionMismatch { index: usize, position: Position },
    PartnerNotMatched { position: Position },
    RevealedNotOpened { position: Position },
    DuplicateRevealed { position: Position },
    TooManyRevealed { count: usize },
    MatchedCountMismatch { recorded: usize, actual: usize },
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityError::WrongCardCount { count } => {
                write!(f, "deck holds {count} cards, expected {DECK_SIZE}")
            }
            IntegrityError::UnpairedSymbol { symbol, count } => {
                write!(f, "symbol {symbol:?} appears {count} times, expected 2")
            }
            IntegrityError::PositionMismatch { index, position } => {
                write!(f, "card at slot {index} claims position {position}")
            }
            IntegrityError::PartnerNotMatched { position } => {
                write!(f, "card {position} is matched but its partner is not")
            }
            IntegrityError::RevealedNotOpened { position } => {
                write!(f, "revealed card {position} is not in the opened state")
            }
            IntegrityError::DuplicateRevealed { position } => {
                write!(f, "card {position} is revealed twice")
            }
            IntegrityError::TooManyRevealed { count } => {
                write!(f, "{count} cards revealed at once")
            }
            IntegrityError::MatchedCountMismatch { recorded, actual } => {
                write!(f, "matched count is {recorded} but {actual} cards are matched")
            }
        }
    }
}

impl std::error::Error for IntegrityError {}

/// 一局牌的完整状态。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deck {
    pub cards: Vec<Card>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub revealed: Vec<Position>,
    #[serde(default)]
    pub matched_count: usize,
}

impl Deck {
    /// 未洗牌的标准牌组：同一图案相邻排列。
    pub fn canonical() -> Self {
        let cards = Symbol::ALL
            .iter()
            .flat_map(|symbol| [*symbol, *symbol])
            .enumerate()
            .map(|(position, symbol)| Card::new(position, symbol))
            .collect();
        Self {
            cards,
            revealed: Vec::with_capacity(2),
            matched_count: 0,
        }
    }

    /// 按给定排列建立一局，全部牌为 `Closed`。
    pub fn from_symbols(symbols: [Symbol; DECK_SIZE]) -> Result<Self, IntegrityError> {
        let deck = Self {
            cards: symbols
                .iter()
                .enumerate()
                .map(|(position, symbol)| Card::new(position, *symbol))
                .collect(),
            revealed: Vec::with_capacity(2),
            matched_count: 0,
        };
        deck.integrity_check()?;
        Ok(deck)
    }

    pub fn card(&self, position: Position) -> Option<&Card> {
        self.cards.get(position)
    }

    pub fn symbols(&self) -> [Symbol; DECK_SIZE] {
        let mut symbols = [Symbol::Anchor; DECK_SIZE];
        for (slot, card) in symbols.iter_mut().zip(&self.cards) {
            *slot = card.symbol;
        }
        symbols
    }

    /// 与 `position` 同图案的另一张牌的位置。
    pub fn partner_of(&self, position: Position) -> Option<Position> {
        let symbol = self.card(position)?.symbol;
        self.cards
            .iter()
            .find(|card| card.symbol == symbol && card.position != position)
            .map(|card| card.position)
    }

    pub fn phase(&self) -> DeckPhase {
        if self.is_won() {
            return DeckPhase::Won;
        }
        match self.revealed.as_slice() {
            [first] => DeckPhase::AwaitingSecond { first: *first },
            [first, second, ..] => DeckPhase::Resolving {
                first: *first,
                second: *second,
            },
            [] => DeckPhase::Idle,
        }
    }

    pub fn is_won(&self) -> bool {
        !self.cards.is_empty() && self.matched_count == self.cards.len()
    }

    pub fn count_in_state(&self, state: CardState) -> usize {
        self.cards.iter().filter(|card| card.state == state).count()
    }

    pub(crate) fn set_state(&mut self, position: Position, state: CardState) {
        if let Some(card) = self.cards.get_mut(position) {
            card.state = state;
        }
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        if self.cards.len() != DECK_SIZE {
            return Err(IntegrityError::WrongCardCount {
                count: self.cards.len(),
            });
        }

        for symbol in Symbol::ALL {
            let count = self.cards.iter().filter(|card| card.symbol == symbol).count();
            if count != 2 {
                return Err(IntegrityError::UnpairedSymbol { symbol, count });
            }
        }

        for (index, card) in self.cards.iter().enumerate() {
            if card.position != index {
                return Err(IntegrityError::PositionMismatch {
                    index,
                    position: card.position,
                });
            }
            if card.state == CardState::Matched {
                let partner_matched = self
                    .partner_of(index)
                    .and_then(|partner| self.card(partner))
                    .map(|partner| partner.state == CardState::Matched)
                    .unwrap_or(false);
                if !partner_matched {
                    return Err(IntegrityError::PartnerNotMatched { position: index });
                }
            }
        }

        if self.revealed.len() > 2 {
            return Err(IntegrityError::TooManyRevealed {
                count: self.revealed.len(),
            });
        }
        for (i, position) in self.revealed.iter().enumerate() {
            if self.revealed[..i].contains(position) {
                return Err(IntegrityError::DuplicateRevealed {
                    position: *position,
                });
            }
            let opened = self
                .card(*position)
                .map(|card| card.state == CardState::Opened)
                .unwrap_or(false);
            if !opened {
                return Err(IntegrityError::RevealedNotOpened {
                    position: *position,
                });
            }
        }

        let actual = self.count_in_state(CardState::Matched);
        if actual != self.matched_count {
            return Err(IntegrityError::MatchedCountMismatch {
                recorded: self.matched_count,
                actual,
            });
        }

        Ok(())
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::canonical()
    }
}
