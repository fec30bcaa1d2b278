use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Where a job is in its life on the broker. The broker owns transitions;
/// `Acked` is the only terminal state.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum JobState {
    /// Waiting to be synchronously replicated.
    ///
    /// On the wire: `wait-repl`
    WaitingReplication,
    /// Waiting in a queue to be fetched.
    ///
    /// On the wire: `queued`
    Queued,
    /// Being processed, or waiting for its delay to expire.
    ///
    /// On the wire: `active`
    Active,
    /// Acknowledged.
    ///
    /// On the wire: `acked`
    Acked,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        use JobState::*;

        match self {
            WaitingReplication => "wait-repl",
            Queued => "queued",
            Active => "active",
            Acked => "acked",
        }
    }
}

impl FromStr for JobState {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use JobState::*;

        Ok(match s {
            "wait-repl" => WaitingReplication,
            "queued" => Queued,
            "active" => Active,
            "acked" => Acked,
            _ => return Err(UnknownToken(s.to_owned())),
        })
    }
}

/// Which directions of traffic a queue refuses.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum QueuePauseState {
    /// Not paused.
    #[default]
    None,
    /// `ADDJOB` is refused.
    In,
    /// `GETJOB` is refused.
    Out,
    /// Both directions are refused.
    All,
}

impl QueuePauseState {
    pub fn as_str(&self) -> &'static str {
        use QueuePauseState::*;

        match self {
            None => "none",
            In => "in",
            Out => "out",
            All => "all",
        }
    }

    /// Whether new jobs are refused while in this state.
    pub fn blocks_input(&self) -> bool {
        matches!(self, QueuePauseState::In | QueuePauseState::All)
    }

    /// Whether fetches are refused while in this state.
    pub fn blocks_output(&self) -> bool {
        matches!(self, QueuePauseState::Out | QueuePauseState::All)
    }
}

impl FromStr for QueuePauseState {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use QueuePauseState::*;

        Ok(match s {
            "none" => None,
            "in" => In,
            "out" => Out,
            "all" => All,
            _ => return Err(UnknownToken(s.to_owned())),
        })
    }
}

/// A state token the broker sent that this crate doesn't recognise.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("unknown state token {0:?}")]
pub struct UnknownToken(pub String);

// Both enums print as their wire tokens, which is what YAML output wants.
impl Serialize for JobState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl Serialize for QueuePauseState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}
