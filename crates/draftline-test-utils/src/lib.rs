//! Testing utilities for the Draftline workspace
//!
//! In-memory collaborators with fault injection, plus fixtures.

#![allow(missing_docs)]

pub mod gateway;
pub mod storage;

pub use gateway::{GatewayCall, InMemoryGateway};
pub use storage::{InMemoryBlobStorage, StaticIdentity};

use chrono::{NaiveDate, Utc};
use draftline_core::{ChildFields, GoalFields, NamedFields, PendingFile, StrategyFields};

pub fn value(name: &str) -> ChildFields {
    ChildFields::Value(NamedFields::new(name))
}

pub fn pillar(name: &str) -> ChildFields {
    ChildFields::Pillar(NamedFields::new(name))
}

pub fn strategic_goal(name: &str) -> ChildFields {
    ChildFields::StrategicGoal(GoalFields::new(name, "3 years", "growth"))
}

pub fn operational_goal(name: &str) -> ChildFields {
    ChildFields::OperationalGoal(GoalFields::new(name, "1 year", "delivery"))
}

pub fn strategy_fields(name: &str) -> StrategyFields {
    let start = Utc::now().date_naive();
    let end = start
        .checked_add_days(chrono::Days::new(365))
        .unwrap_or(start);
    StrategyFields::new(name, start, end).with_description(format!("{name} description"))
}

pub fn fixed_day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn pdf(name: &str, size: usize) -> PendingFile {
    PendingFile::new(format!("{name}.pdf"), "application/pdf", vec![0x25; size])
}

