//! "Run at offset O from event E" daily scheduling.
//!
//! A `DailySchedule` is a set of rules, each anchoring a named callback to
//! a session event. `resolve` turns the rules into wall-clock triggers for
//! one session, ordered by time. The calendar (which days are sessions)
//! stays with the caller.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;

/// How long before the open `BeforeOpen` fires.
pub const BEFORE_OPEN_LEAD_MINUTES: i64 = 45;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Callback {
    BeforeTradingStart,
    FindDownGaps,
    ShortDownGaps,
    ClosePositions,
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Callback::BeforeTradingStart => "before_trading_start",
            Callback::FindDownGaps => "find_down_gaps",
            Callback::ShortDownGaps => "short_down_gaps",
            Callback::ClosePositions => "close_positions",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    BeforeOpen,
    MarketOpen,
    MarketClose,
}

impl SessionEvent {
    /// Open-anchored callbacks see opening prices; close-anchored ones see
    /// the close.
    pub fn is_close_anchored(&self) -> bool {
        matches!(self, SessionEvent::MarketClose)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRule {
    pub callback: Callback,
    pub event: SessionEvent,
    pub offset: Duration,
}

impl ScheduleRule {
    pub fn before_open(callback: Callback) -> Self {
        Self {
            callback,
            event: SessionEvent::BeforeOpen,
            offset: Duration::zero(),
        }
    }

    pub fn market_open(callback: Callback, minutes_after: i64) -> Self {
        Self {
            callback,
            event: SessionEvent::MarketOpen,
            offset: Duration::minutes(minutes_after),
        }
    }

    pub fn market_close(callback: Callback, minutes_before: i64) -> Self {
        Self {
            callback,
            event: SessionEvent::MarketClose,
            offset: -Duration::minutes(minutes_before),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Session {
    pub date: NaiveDate,
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl Session {
    pub fn at(&self, event: SessionEvent) -> NaiveDateTime {
        match event {
            SessionEvent::BeforeOpen => {
                self.date.and_time(self.open) - Duration::minutes(BEFORE_OPEN_LEAD_MINUTES)
            }
            SessionEvent::MarketOpen => self.date.and_time(self.open),
            SessionEvent::MarketClose => self.date.and_time(self.close),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub at: NaiveDateTime,
    pub callback: Callback,
    pub event: SessionEvent,
}

#[derive(Debug, Clone, Default)]
pub struct DailySchedule {
    rules: Vec<ScheduleRule>,
}

impl DailySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, rule: ScheduleRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[ScheduleRule] {
        &self.rules
    }

    /// Triggers for one session, earliest first. Rules resolving to the
    /// same instant keep their insertion order.
    pub fn resolve(&self, session: &Session) -> Vec<Trigger> {
        let mut triggers: Vec<Trigger> = self
            .rules
            .iter()
            .map(|rule| Trigger {
                at: session.at(rule.event) + rule.offset,
                callback: rule.callback,
                event: rule.event,
            })
            .collect();
        triggers.sort_by_key(|t| t.at);
        triggers
    }
}
