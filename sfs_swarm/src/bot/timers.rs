//! Per-actor timer bookkeeping.
//!
//! Every delay and interval an actor schedules is a [`TimerSet`] entry. Each
//! entry is a spawned task that posts [`TimerFired`] back to the actor's
//! timer inbox; the set maps the id back to the action to run.

use std::collections::HashMap;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Duration, Instant, MissedTickBehavior, interval_at, sleep},
};

/// Identifier of one armed timer, unique within its set
pub type TimerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    OneShot,
    Repeating,
}

/// Work an actor performs when one of its timers fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerAction {
    /// The `init` reply did not arrive in time
    InitTimeout,
    /// Join delay elapsed
    JoinRoom,
    /// Movement tick
    Move,
    /// Shop catalog request delay elapsed
    RequestShops,
    /// Buy and wear a random catalog entry
    ApplyClothes,
    /// Wear a purchased item
    ChangeClothes { clip: String, color: i32 },
}

/// Delivery posted by a timer task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub id: TimerId,
}

#[derive(Debug)]
struct ArmedTimer {
    kind: TimerKind,
    action: TimerAction,
    task: JoinHandle<()>,
}

/// All timers armed by one actor
#[derive(Debug)]
pub struct TimerSet {
    next_id: TimerId,
    armed: HashMap<TimerId, ArmedTimer>,
    sender: mpsc::UnboundedSender<TimerFired>,
}

impl TimerSet {
    /// Create an empty set and the inbox its timers deliver to
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerFired>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let set = Self {
            next_id: 0,
            armed: HashMap::new(),
            sender,
        };
        (set, receiver)
    }

    /// Fire `action` once after `delay`
    pub fn once(&mut self, delay: Duration, action: TimerAction) -> TimerId {
        let id = self.allocate();
        let sender = self.sender.clone();
        let task = tokio::spawn(async move {
            sleep(delay).await;
            let _ = sender.send(TimerFired { id });
        });
        self.armed.insert(
            id,
            ArmedTimer {
                kind: TimerKind::OneShot,
                action,
                task,
            },
        );
        id
    }

    /// Fire `action` every `period`, first after one full period
    pub fn repeat(&mut self, period: Duration, action: TimerAction) -> TimerId {
        let period = period.max(Duration::from_millis(1));
        let id = self.allocate();
        let sender = self.sender.clone();
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if sender.send(TimerFired { id }).is_err() {
                    break;
                }
            }
        });
        self.armed.insert(
            id,
            ArmedTimer {
                kind: TimerKind::Repeating,
                action,
                task,
            },
        );
        id
    }

    /// Cancel a timer. Deliveries already queued for it are ignored by
    /// [`TimerSet::fired`]. Returns whether it was armed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.armed.remove(&id) {
            Some(timer) => {
                timer.task.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel every armed timer, returning how many there were
    pub fn cancel_all(&mut self) -> usize {
        let count = self.armed.len();
        for (_, timer) in self.armed.drain() {
            timer.task.abort();
        }
        count
    }

    /// Resolve a delivery into its action.
    ///
    /// One-shot timers are forgotten here. Returns `None` for deliveries from
    /// cancelled or already-fired timers.
    pub fn fired(&mut self, fired: TimerFired) -> Option<TimerAction> {
        let kind = self.armed.get(&fired.id)?.kind;
        match kind {
            TimerKind::Repeating => self.armed.get(&fired.id).map(|t| t.action.clone()),
            TimerKind::OneShot => self.armed.remove(&fired.id).map(|t| t.action),
        }
    }

    pub fn is_armed(&self, id: TimerId) -> bool {
        self.armed.contains_key(&id)
    }

    pub fn kind(&self, id: TimerId) -> Option<TimerKind> {
        self.armed.get(&id).map(|t| t.kind)
    }

    pub fn len(&self) -> usize {
        self.armed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }

    fn allocate(&mut self) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
