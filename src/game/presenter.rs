use super::state::GameEvent;

/// 展示层协作者：按发生顺序接收每个事件。
pub trait Presenter {
    fn notify(&mut self, event: &GameEvent);
}

impl<P: Presenter + ?Sized> Presenter for Box<P> {
    fn notify(&mut self, event: &GameEvent) {
        (**self).notify(event);
    }
}

/// 记录所有事件的展示层，供测试和回放使用。
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Vec<GameEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn take(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Presenter for EventLog {
    fn notify(&mut self, event: &GameEvent) {
        self.events.push(event.clone());
    }
}
