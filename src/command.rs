//! Builds [`DisqueCommand`]s from typed operation parameters.
//!
//! Everything here is pure: the current time is passed in rather than read,
//! so TTL derivation can be tested at any instant.
use crate::error::DisqueError;
use crate::types::protocol::DisqueCommand;
use crate::types::states::QueuePauseState;

/// The broker stores `now + TTL` as an unsigned 32-bit unix time. Anything
/// past this wraps, and the job is deleted on arrival.
pub const MAX_BROKER_TIME: u32 = u32::MAX;

/// Options for `ADDJOB`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AddJobOptions {
    /// Seconds before the job is first queued.
    pub delay: u32,
    /// Seconds without an ACK before the job is requeued. 0 gives
    /// at-most-once delivery.
    pub retry_after: u32,
    /// Seconds before the job is deleted regardless of state. `None` picks
    /// the longest TTL the broker can represent, see [`max_ttl`].
    pub delete_after: Option<u32>,
    /// Milliseconds the broker may spend replicating before it fails the
    /// command.
    pub timeout_ms: u32,
    /// Refuse the job if the queue already holds this many.
    pub max_len: Option<u32>,
    /// Reply before replication completes. Faster, but jobs not yet
    /// replicated are lost if the node dies.
    pub replicate_async: bool,
}

impl Default for AddJobOptions {
    fn default() -> Self {
        Self {
            delay: 0,
            retry_after: 300,
            delete_after: None,
            timeout_ms: 5000,
            max_len: None,
            replicate_async: false,
        }
    }
}

/// Options for `GETJOB`.
///
/// A blocking fetch holds the connection until a job arrives or
/// `timeout_ms` passes (0 waits forever). On a single connection shared with
/// other work, that stalls everything queued behind it, hence the
/// non-blocking default.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FetchOptions {
    pub blocking: bool,
    pub timeout_ms: u32,
}

/// How far a `PAUSE` reaches.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PauseScope {
    /// Broadcast the state to every node.
    #[default]
    Cluster,
    /// Only the node receiving the command.
    Node,
}

/// How an acknowledgement is propagated.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum AckMode {
    /// `ACKJOB`: replicate the ACK and delete once no node is likely to
    /// still hold the job active.
    #[default]
    Replicated,
    /// `FASTACK`: best-effort delete on every node that may hold a copy,
    /// without waiting for confirmation.
    Fast,
}

/// The longest TTL for which `now + TTL` can't pass [`MAX_BROKER_TIME`],
/// even if the command is retransmitted once `timeout_ms` has elapsed.
///
/// Fails instead of clamping if no such TTL exists.
pub fn max_ttl(now: u64, timeout_ms: u32) -> Result<u32, DisqueError> {
    let margin = i64::from(timeout_ms.div_ceil(1000));
    let ttl = i64::from(MAX_BROKER_TIME)
        .checked_sub_unsigned(now)
        .and_then(|t| t.checked_sub(margin));

    ttl.and_then(|t| u32::try_from(t).ok())
        .ok_or(DisqueError::TtlOutOfRange { now, timeout_ms })
}

pub fn add_job(
    queue: &str,
    body: String,
    opts: &AddJobOptions,
    now: u64,
) -> Result<DisqueCommand, DisqueError> {
    let ttl = match opts.delete_after {
        Some(ttl) => ttl,
        None => max_ttl(now, opts.timeout_ms)?,
    };

    // The broker refuses this too, but catching it here keeps the failed
    // attempt off the wire.
    if opts.delay >= ttl {
        return Err(DisqueError::DelayExceedsTtl);
    }

    Ok(DisqueCommand::AddJob {
        queue: queue.to_owned(),
        body,
        timeout_ms: opts.timeout_ms,
        delay: opts.delay,
        retry: opts.retry_after,
        ttl,
        max_len: opts.max_len,
        replicate_async: opts.replicate_async,
    })
}

pub fn get_jobs<S: AsRef<str>>(
    count: u32,
    queues: &[S],
    opts: FetchOptions,
) -> DisqueCommand {
    DisqueCommand::GetJob {
        blocking: opts.blocking,
        timeout_ms: opts.timeout_ms,
        count,
        queues: to_owned_all(queues),
    }
}

pub fn pause(
    queue: &str,
    state: QueuePauseState,
    scope: PauseScope,
) -> DisqueCommand {
    DisqueCommand::Pause {
        queue: queue.to_owned(),
        state,
        broadcast: scope == PauseScope::Cluster,
    }
}

pub fn acknowledge<S: AsRef<str>>(ids: &[S], mode: AckMode) -> DisqueCommand {
    let ids = to_owned_all(ids);
    match mode {
        AckMode::Replicated => DisqueCommand::AckJob { ids },
        AckMode::Fast => DisqueCommand::FastAck { ids },
    }
}

pub(crate) fn to_owned_all<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    items.iter().map(|s| s.as_ref().to_owned()).collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    // 2026-01-01T00:00:00Z
    const NOW: u64 = 1_767_225_600;

    #[test]
    fn test_max_ttl() {
        assert_eq!(max_ttl(NOW, 5000).unwrap(), u32::MAX - NOW as u32 - 5);
        // Partial seconds round up.
        assert_eq!(max_ttl(NOW, 5001).unwrap(), u32::MAX - NOW as u32 - 6);
        assert_eq!(max_ttl(NOW, 1).unwrap(), u32::MAX - NOW as u32 - 1);
        assert_eq!(max_ttl(NOW, 0).unwrap(), u32::MAX - NOW as u32);
        assert_eq!(max_ttl(0, 0).unwrap(), u32::MAX);

        // Right at the edge of the broker's clock.
        assert_eq!(max_ttl(u32::MAX as u64 - 5, 5000).unwrap(), 0);
        assert!(matches!(
            max_ttl(u32::MAX as u64 - 5, 5001),
            Err(DisqueError::TtlOutOfRange {
                now: 4294967290,
                timeout_ms: 5001
            })
        ));
        assert!(max_ttl(u32::MAX as u64 + 1, 0).is_err());
        assert!(max_ttl(u64::MAX, u32::MAX).is_err());
    }

    proptest! {
        #[test]
        fn prop_max_ttl_never_overflows(
            now in any::<u64>(),
            timeout_ms in any::<u32>(),
        ) {
            let now_wide = now as u128;
            let margin = (timeout_ms as u128 + 999) / 1000;
            match max_ttl(now, timeout_ms) {
                Ok(ttl) => prop_assert!(
                    ttl as u128 + now_wide + margin <= u32::MAX as u128
                ),
                Err(_) => prop_assert!(now_wide + margin > u32::MAX as u128),
            }
        }
    }

    #[test]
    fn test_add_job() {
        let opts = AddJobOptions {
            delete_after: Some(5),
            ..Default::default()
        };
        assert_eq!(
            add_job("q", "{}".into(), &opts, NOW).unwrap(),
            DisqueCommand::AddJob {
                queue: "q".into(),
                body: "{}".into(),
                timeout_ms: 5000,
                delay: 0,
                retry: 300,
                ttl: 5,
                max_len: None,
                replicate_async: false,
            }
        );

        // At-most-once delivery.
        let opts = AddJobOptions {
            retry_after: 0,
            delete_after: Some(5),
            ..Default::default()
        };
        let cmd = add_job("q", "{}".into(), &opts, NOW).unwrap();
        assert_eq!(
            cmd.args(),
            ["q", "{}", "5000", "DELAY", "0", "RETRY", "0", "TTL", "5"]
        );

        // Without delete_after, the TTL is derived from the clock.
        let cmd = add_job("q", "{}".into(), &Default::default(), NOW).unwrap();
        let DisqueCommand::AddJob { ttl, .. } = cmd else {
            panic!("not an ADDJOB: {cmd:?}");
        };
        assert_eq!(ttl, u32::MAX - NOW as u32 - 5);
    }

    #[test]
    fn test_add_job_rejects_delay_not_below_ttl() {
        for (delay, delete_after) in [(2, 1), (5, 5), (1, 0)] {
            let opts = AddJobOptions {
                delay,
                delete_after: Some(delete_after),
                ..Default::default()
            };
            assert!(matches!(
                add_job("q", "{}".into(), &opts, NOW),
                Err(DisqueError::DelayExceedsTtl)
            ));
        }

        let opts = AddJobOptions {
            delay: 4,
            delete_after: Some(5),
            ..Default::default()
        };
        assert!(add_job("q", "{}".into(), &opts, NOW).is_ok());
    }

    #[test]
    fn test_selectors() {
        assert_eq!(
            acknowledge(&["a"], AckMode::default()),
            DisqueCommand::AckJob {
                ids: vec!["a".into()]
            }
        );
        assert_eq!(
            acknowledge(&["a"], AckMode::Fast),
            DisqueCommand::FastAck {
                ids: vec!["a".into()]
            }
        );
        assert_eq!(
            pause("q", QueuePauseState::In, PauseScope::default()),
            DisqueCommand::Pause {
                queue: "q".into(),
                state: QueuePauseState::In,
                broadcast: true,
            }
        );
        assert_eq!(
            get_jobs(2, &["a"], FetchOptions::default()),
            DisqueCommand::GetJob {
                blocking: false,
                timeout_ms: 0,
                count: 2,
                queues: vec!["a".into()],
            }
        );
    }
}
