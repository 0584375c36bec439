pub mod browser;
pub mod game;

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;
use web_sys::js_sys::Function;

pub use browser::{BrowserScheduler, BrowserSession, ConsoleLogger, JsPresenter};
pub use game::{
    Card, CardState, ConfigError, DealSummary, Deck, DeckPhase, EventLog, GameConfig, GameEvent,
    GameSession, IntegrityError, ManualScheduler, PairOutcome, Position, Presenter, RevealOutcome,
    RuleError, RuleResolution, Scheduler, ScoreTracker, StarThresholds, Symbol, TimerHandle,
    TimerTask, DECK_SIZE, PAIR_COUNT,
};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    browser::init_logging(level);
    log::info!("memory game core loaded");
}

fn to_js_error<E: Serialize>(error: E) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

#[derive(Serialize)]
struct SessionSnapshot<'a> {
    deck: &'a Deck,
    score: &'a ScoreTracker,
    phase: DeckPhase,
    running: bool,
}

fn snapshot_json<S: Scheduler, P: Presenter>(
    session: &GameSession<S, P>,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&SessionSnapshot {
        deck: session.deck(),
        score: session.score(),
        phase: session.phase(),
        running: session.is_running(),
    })
}

fn parse_config(config_json: Option<String>) -> Result<GameConfig, JsValue> {
    let config = match config_json {
        Some(json) => serde_json::from_str(&json).map_err(serde_to_js_error)?,
        None => GameConfig::default(),
    };
    config.validate().map_err(to_js_error)?;
    Ok(config)
}

/// 前端持有的对局对象。事件通过构造时传入的回调推送。
#[wasm_bindgen]
pub struct MemoryGame {
    session: Rc<RefCell<BrowserSession>>,
}

impl MemoryGame {
    fn with_session<T>(
        &self,
        action: impl FnOnce(&mut BrowserSession) -> Result<T, JsValue>,
    ) -> Result<T, JsValue> {
        let mut session = self
            .session
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("game session is busy"))?;
        action(&mut session)
    }
}

#[wasm_bindgen]
impl MemoryGame {
    #[wasm_bindgen(constructor)]
    pub fn new(on_event: Function, config_json: Option<String>) -> Result<MemoryGame, JsValue> {
        let config = parse_config(config_json)?;
        let presenter = JsPresenter::new(on_event);
        let session = Rc::new_cyclic(|weak| {
            RefCell::new(GameSession::new(
                config,
                BrowserScheduler::new(weak.clone()),
                presenter,
            ))
        });
        Ok(MemoryGame { session })
    }

    /// 翻开一张牌；被忽略的请求返回 `null`。
    pub fn reveal(&self, position: usize) -> Result<JsValue, JsValue> {
        self.with_session(|session| match session.request_reveal(position) {
            Ok(outcome) => to_value(&outcome).map_err(JsValue::from),
            Err(_) => Ok(JsValue::NULL),
        })
    }

    pub fn reset(&self) -> Result<(), JsValue> {
        self.with_session(|session| session.request_reset().map_err(to_js_error))
    }

    pub fn start(&self) -> Result<(), JsValue> {
        self.with_session(|session| session.request_start().map_err(to_js_error))
    }

    #[wasm_bindgen(js_name = "isRunning")]
    pub fn is_running(&self) -> Result<bool, JsValue> {
        self.with_session(|session| Ok(session.is_running()))
    }

    #[wasm_bindgen(js_name = "stateJson")]
    pub fn state_json(&self) -> Result<String, JsValue> {
        self.with_session(|session| snapshot_json(session).map_err(serde_to_js_error))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SymbolClass {
    symbol: Symbol,
    icon_class: &'static str,
}

/// 图案到图标类名的映射，按标准顺序排列。
#[wasm_bindgen(js_name = "symbolClasses")]
pub fn symbol_classes() -> Result<JsValue, JsValue> {
    let classes: Vec<SymbolClass> = Symbol::ALL
        .iter()
        .map(|symbol| SymbolClass {
            symbol: *symbol,
            icon_class: symbol.icon_class(),
        })
        .collect();
    to_value(&classes).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "defaultConfig")]
pub fn default_config() -> Result<String, JsValue> {
    serde_json::to_string(&GameConfig::default()).map_err(serde_to_js_error)
}

#[wasm_bindgen(js_name = "validateDeck")]
pub fn validate_deck(deck_json: &str) -> Result<(), JsValue> {
    let deck: Deck = serde_json::from_str(deck_json).map_err(serde_to_js_error)?;
    deck.integrity_check().map_err(to_js_error)
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
