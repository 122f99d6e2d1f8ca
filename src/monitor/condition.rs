//! Value conditions over topic payloads and waits that watch for them.

use crate::error::{NotifyError, Result};
use crate::topics::TopicStore;
use crate::wait::Deadline;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::watch::{MonitorOutcome, MonitorReport};

/// Comparison applied between a payload value and a constant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparison::Eq => lhs == rhs,
            Comparison::Ne => lhs != rhs,
            Comparison::Lt => lhs < rhs,
            Comparison::Le => lhs <= rhs,
            Comparison::Gt => lhs > rhs,
            Comparison::Ge => lhs >= rhs,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
        }
    }
}

impl FromStr for Comparison {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "==" => Ok(Comparison::Eq),
            "!=" => Ok(Comparison::Ne),
            "<" => Ok(Comparison::Lt),
            "<=" => Ok(Comparison::Le),
            ">" => Ok(Comparison::Gt),
            ">=" => Ok(Comparison::Ge),
            other => Err(NotifyError::InvalidCondition(format!("unknown operator {other:?}"))),
        }
    }
}

/// `/<topic>/<key> <op> <value>`, e.g. `/a/1 == 512`.
#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    topic: String,
    key: String,
    op: Comparison,
    value: f64,
}

impl Condition {
    pub fn new(path: &str, op: Comparison, value: f64) -> Result<Self> {
        let (topic, key) = parse_path(path)?;
        Ok(Self {
            topic,
            key,
            op,
            value,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Check the condition against the store's current value. A missing
    /// sub-key never satisfies a condition.
    pub fn evaluate(&self, store: &TopicStore) -> Result<bool> {
        Ok(store
            .value(&self.topic, &self.key)?
            .is_some_and(|v| self.op.apply(v, self.value)))
    }
}

impl FromStr for Condition {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        let [path, op, value] = parts.as_slice() else {
            return Err(NotifyError::InvalidCondition(format!(
                "expected `<path> <op> <value>`, got {s:?}"
            )));
        };
        let value: f64 = value
            .parse()
            .map_err(|_| NotifyError::InvalidCondition(format!("bad value {value:?}")))?;
        Condition::new(path, op.parse()?, value)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{} {} {}", self.topic, self.key, self.op.symbol(), self.value)
    }
}

fn parse_path(path: &str) -> Result<(String, String)> {
    let invalid = || NotifyError::InvalidCondition(format!("bad path {path:?}"));
    let rest = path.strip_prefix('/').ok_or_else(invalid)?;
    let (topic, key) = rest.split_once('/').ok_or_else(invalid)?;
    if topic.is_empty() || key.is_empty() || key.contains('/') {
        return Err(invalid());
    }
    Ok((topic.to_string(), key.to_string()))
}

/// Wait until every condition holds in the same observation of the store.
///
/// An observation reads each topic under its own lock, one after another.
/// It is consistent only while a single writer updates the topics between
/// wakeups. A write racing the reads can make conditions pass together that
/// never held at the same instant.
pub fn wait_values_at_once(
    store: &TopicStore,
    conditions: &[Condition],
    budget: Duration,
) -> Result<MonitorReport> {
    observe_until(store, conditions, budget, |store, _| {
        for condition in conditions {
            if !condition.evaluate(store)? {
                return Ok(false);
            }
        }
        Ok(true)
    })
}

/// Wait until each condition has held at some observation, not necessarily
/// the same one.
pub fn wait_values(
    store: &TopicStore,
    conditions: &[Condition],
    budget: Duration,
) -> Result<MonitorReport> {
    let mut seen = vec![false; conditions.len()];
    observe_until(store, conditions, budget, |store, _| {
        for (condition, seen) in conditions.iter().zip(seen.iter_mut()) {
            if !*seen && condition.evaluate(store)? {
                tracing::debug!(%condition, "condition observed");
                *seen = true;
            }
        }
        Ok(seen.iter().all(|s| *s))
    })
}

/// Register on the conditions' topics, then evaluate, then wait; repeat.
/// Values already true when called count.
fn observe_until<F>(
    store: &TopicStore,
    conditions: &[Condition],
    budget: Duration,
    mut check: F,
) -> Result<MonitorReport>
where
    F: FnMut(&TopicStore, &[String]) -> Result<bool>,
{
    if conditions.is_empty() {
        return Err(NotifyError::InvalidCondition("no conditions given".into()));
    }

    let deadline = Deadline::after(budget);
    let topics: Vec<&str> = conditions.iter().map(Condition::topic).collect();
    let mut wakeups = 0;
    let mut last_arrived = Vec::new();

    loop {
        let pending = store.wait_any(topics.iter().copied())?;

        if check(store, &last_arrived)? {
            tracing::info!(wakeups, "value conditions met");
            return Ok(MonitorReport {
                outcome: MonitorOutcome::ConditionMet,
                wakeups,
                last_arrived,
                elapsed: deadline.elapsed(),
            });
        }

        match pending.wait_deadline(&deadline) {
            Ok(arrived) => {
                wakeups += 1;
                last_arrived = arrived;
            }
            Err(e) if e.is_timeout() => {
                tracing::warn!(wakeups, ?budget, "value conditions not met before deadline");
                return Ok(MonitorReport {
                    outcome: MonitorOutcome::DeadlineExceeded,
                    wakeups,
                    last_arrived,
                    elapsed: budget,
                });
            }
            Err(e) => return Err(e),
        }
    }
}
