//! 游戏核心逻辑模块（牌组状态机、计分、定时器抽象）。

pub mod config;
pub mod presenter;
pub mod rules;
pub mod score;
pub mod session;
pub mod state;
pub mod timer;

pub use config::{ConfigError, GameConfig};
pub use presenter::{EventLog, Presenter};
pub use rules::{PairOutcome, RevealOutcome, RuleError, RuleResolution};
pub use score::{ScoreTracker, StarThresholds};
pub use session::GameSession;
pub use state::{
    Card,
    CardState,
    DealSummary,
    Deck,
    DeckPhase,
    GameEvent,
    IntegrityError,
    Position,
    Symbol,
    DECK_SIZE,
    PAIR_COUNT,
};
pub use timer::{ManualScheduler, Scheduler, TimerHandle, TimerTask};
