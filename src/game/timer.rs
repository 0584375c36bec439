//! 可取消的延时任务抽象。
//!
//! 核心逻辑只通过 [`Scheduler`] 申请定时器；到期后由驱动方调用
//! `GameSession::fire`。浏览器端使用 `gloo-timers`，测试使用 [`ManualScheduler`]
//! 的虚拟时钟，无需真实等待。

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimerTask {
    /// 比对当前翻开的两张牌。
    ResolvePair,
    /// 计时器每秒一跳。
    Tick,
}

pub trait Scheduler {
    fn schedule(&mut self, task: TimerTask, delay_ms: u32) -> TimerHandle;
    fn schedule_repeating(&mut self, task: TimerTask, period_ms: u32) -> TimerHandle;
    /// 取消未触发的定时器；对已触发或未知的句柄无效果。
    fn cancel(&mut self, handle: TimerHandle);
}

#[derive(Debug, Clone)]
struct PendingTimer {
    handle: TimerHandle,
    task: TimerTask,
    due_ms: u64,
    period_ms: Option<u32>,
}

/// 确定性的虚拟时钟调度器。
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now_ms: u64,
    next_id: u64,
    pending: Vec<PendingTimer>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|timer| timer.handle == handle)
    }

    /// 取出 `until_ms` 之前最早到期的定时器，并把时钟推进到它的到期时刻。
    /// 周期定时器会按周期重新排队。
    pub fn pop_due(&mut self, until_ms: u64) -> Option<(TimerHandle, TimerTask)> {
        let index = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due_ms <= until_ms)
            .min_by_key(|(_, timer)| (timer.due_ms, timer.handle))
            .map(|(index, _)| index)?;

        let timer = &mut self.pending[index];
        self.now_ms = self.now_ms.max(timer.due_ms);
        let fired = (timer.handle, timer.task);
        let period_ms = timer.period_ms;
        match period_ms {
            Some(period) => timer.due_ms += u64::from(period.max(1)),
            None => {
                self.pending.swap_remove(index);
            }
        }
        Some(fired)
    }

    pub fn set_now(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    fn push(&mut self, task: TimerTask, delay_ms: u32, period_ms: Option<u32>) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.pending.push(PendingTimer {
            handle,
            task,
            due_ms: self.now_ms + u64::from(delay_ms),
            period_ms,
        });
        handle
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, task: TimerTask, delay_ms: u32) -> TimerHandle {
        self.push(task, delay_ms, None)
    }

    fn schedule_repeating(&mut self, task: TimerTask, period_ms: u32) -> TimerHandle {
        self.push(task, period_ms.max(1), Some(period_ms))
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.pending.retain(|timer| timer.handle != handle);
    }
}
