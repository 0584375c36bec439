//! 浏览器端协作者：基于 gloo-timers 的调度器、JS 回调展示层与 console 日志。

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use gloo_timers::future::TimeoutFuture;
use log::{Level, LevelFilter, Log, Metadata, Record};
use serde_wasm_bindgen::to_value;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::spawn_local;
use web_sys::console;
use web_sys::js_sys::Function;

use crate::game::{GameEvent, GameSession, Presenter, Scheduler, TimerHandle, TimerTask};

pub type BrowserSession = GameSession<BrowserScheduler, JsPresenter>;

/// 每个定时器对应一个 `spawn_local` 任务；取消只是把句柄移出存活集合，
/// 任务醒来后发现句柄不在集合里便直接结束。
pub struct BrowserScheduler {
    session: Weak<RefCell<BrowserSession>>,
    live: Rc<RefCell<HashSet<TimerHandle>>>,
    next_id: u64,
}

impl BrowserScheduler {
    pub fn new(session: Weak<RefCell<BrowserSession>>) -> Self {
        Self {
            session,
            live: Rc::new(RefCell::new(HashSet::new())),
            next_id: 0,
        }
    }

    fn register(&mut self) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.live.borrow_mut().insert(handle);
        handle
    }
}

fn deliver(session: &Weak<RefCell<BrowserSession>>, handle: TimerHandle, task: TimerTask) {
    let Some(session) = session.upgrade() else {
        return;
    };
    match session.try_borrow_mut() {
        Ok(mut session) => session.fire(handle),
        Err(_) => log::warn!("{task:?} timer {handle:?} fired while the session was busy"),
    };
}

impl Scheduler for BrowserScheduler {
    fn schedule(&mut self, task: TimerTask, delay_ms: u32) -> TimerHandle {
        let handle = self.register();
        let live = Rc::clone(&self.live);
        let session = self.session.clone();
        spawn_local(async move {
            TimeoutFuture::new(delay_ms).await;
            let still_live = live.borrow_mut().remove(&handle);
            if still_live {
                deliver(&session, handle, task);
            }
        });
        handle
    }

    fn schedule_repeating(&mut self, task: TimerTask, period_ms: u32) -> TimerHandle {
        let handle = self.register();
        let live = Rc::clone(&self.live);
        let session = self.session.clone();
        spawn_local(async move {
            loop {
                TimeoutFuture::new(period_ms).await;
                let still_live = live.borrow().contains(&handle);
                if !still_live {
                    break;
                }
                deliver(&session, handle, task);
            }
        });
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.live.borrow_mut().remove(&handle);
    }
}

/// 把每个事件序列化后交给前端注册的回调 `(event) => void`。
pub struct JsPresenter {
    callback: Function,
}

impl JsPresenter {
    pub fn new(callback: Function) -> Self {
        Self { callback }
    }
}

impl Presenter for JsPresenter {
    fn notify(&mut self, event: &GameEvent) {
        let value = match to_value(event) {
            Ok(value) => value,
            Err(error) => {
                log::error!("failed to serialize {event:?}: {error}");
                return;
            }
        };
        if let Err(error) = self.callback.call1(&JsValue::NULL, &value) {
            log::warn!("event callback threw: {error:?}");
        }
    }
}

/// `log` 门面到浏览器 console 的桥接。
pub struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            Level::Error => console::error_1(&message),
            Level::Warn => console::warn_1(&message),
            Level::Info => console::info_1(&message),
            Level::Debug | Level::Trace => console::debug_1(&message),
        }
    }

    fn flush(&self) {}
}

/// 重复调用是安全的，只有第一次生效。
pub fn init_logging(level: LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
