//! Typed failures, and the translation of broker error strings into them.
use thiserror::Error;

use crate::codec::CodecError;
use crate::transport::TransportError;
use crate::types::protocol::DisqueCommand;

/// Everything an operation on [`crate::DisqueClient`] can fail with.
#[derive(Debug, Error)]
pub enum DisqueError {
    /// The job body couldn't be serialised. Nothing was sent.
    #[error("unable to encode job body: {0}")]
    Encode(#[source] CodecError),

    /// A reply didn't have the layout the command promises. Usually means
    /// the broker speaks a different protocol version.
    #[error("malformed reply: {0}")]
    Decode(#[from] DecodeError),

    /// The queue is paused for input (`in` or `all`).
    #[error("queue paused in input")]
    QueuePaused,

    /// The job would expire before its delay elapsed.
    #[error("delay is not less than TTL, job would never be delivered")]
    DelayExceedsTtl,

    /// The node that answered `WORKING` holds no such job.
    #[error("job not known to this node")]
    UnknownJob,

    /// Half the job's TTL has elapsed, so `WORKING` is refused.
    #[error("too late to postpone: half of job TTL already elapsed")]
    TooLateToPostpone,

    /// No TTL fits between now and the broker's 32-bit clock limit.
    #[error("no TTL fits at unix time {now}s with a {timeout_ms}ms timeout")]
    TtlOutOfRange { now: u64, timeout_ms: u32 },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl DisqueError {
    /// Returns whether a caller could sensibly retry, with backoff. For I/O
    /// failures and closed connections that retry needs a fresh connection.
    /// A poisoned connection is never worth retrying on.
    pub fn is_retryable(&self) -> bool {
        match self {
            DisqueError::Transport(TransportError::Io(_)) => true,
            DisqueError::Transport(TransportError::ConnectionClosed) => true,
            DisqueError::Transport(TransportError::Server(_)) => true,
            _ => false,
        }
    }
}

/// A reply that doesn't fit the layout expected for its command.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum DecodeError {
    #[error("{record} reply has {got} items, expected {expected}")]
    Length {
        record: &'static str,
        expected: usize,
        got: usize,
    },

    #[error(
        "{record} field `{field}` (index {index}): \
         expected {expected}, got {got}"
    )]
    FieldKind {
        record: &'static str,
        field: &'static str,
        index: usize,
        expected: &'static str,
        got: &'static str,
    },

    #[error("{record} field `{field}` (index {index}): {reason}")]
    FieldValue {
        record: &'static str,
        field: &'static str,
        index: usize,
        reason: String,
    },

    #[error("{command} reply: expected {expected}, got {got}")]
    Unexpected {
        command: &'static str,
        expected: &'static str,
        got: &'static str,
    },
}

const ADDJOB_PAUSED: &str = "PAUSED Queue paused in input, try later";
const ADDJOB_DELAY_GT_TTL: &str =
    "ERR The specified DELAY is greater than TTL. \
     Job refused since would never be delivered";
const WORKING_NOJOB: &str = "NOJOB Job not known in the context of this node.";
const WORKING_TOOLATE: &str = "TOOLATE Half of job TTL already elapsed, you \
                               are no longer allowed to postpone the next \
                               delivery.";

/// Maps a broker error for `cmd` onto a typed failure.
///
/// Only `ADDJOB` and `WORKING` have known reasons. Matching is on the whole
/// reason string, case and punctuation included; anything else comes back
/// as the transport error it arrived as.
pub fn translate(cmd: &DisqueCommand, error: TransportError) -> DisqueError {
    let TransportError::Server(reason) = &error else {
        return error.into();
    };

    match (cmd, reason.as_str()) {
        (DisqueCommand::AddJob { .. }, ADDJOB_PAUSED) => {
            DisqueError::QueuePaused
        },
        (DisqueCommand::AddJob { .. }, ADDJOB_DELAY_GT_TTL) => {
            DisqueError::DelayExceedsTtl
        },
        (DisqueCommand::Working { .. }, WORKING_NOJOB) => {
            DisqueError::UnknownJob
        },
        (DisqueCommand::Working { .. }, WORKING_TOOLATE) => {
            DisqueError::TooLateToPostpone
        },
        _ => error.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_job() -> DisqueCommand {
        DisqueCommand::AddJob {
            queue: "q".into(),
            body: "{}".into(),
            timeout_ms: 5000,
            delay: 0,
            retry: 300,
            ttl: 10,
            max_len: None,
            replicate_async: false,
        }
    }

    fn working() -> DisqueCommand {
        DisqueCommand::Working { id: "D-1".into() }
    }

    fn server(reason: &str) -> TransportError {
        TransportError::Server(reason.to_owned())
    }

    #[test]
    fn test_reason_strings_are_verbatim() {
        assert_eq!(
            ADDJOB_DELAY_GT_TTL,
            concat!(
                "ERR The specified DELAY is greater than TTL. ",
                "Job refused since would never be delivered",
            )
        );
        assert_eq!(
            WORKING_TOOLATE,
            concat!(
                "TOOLATE Half of job TTL already elapsed, ",
                "you are no longer allowed to postpone the next delivery.",
            )
        );
    }

    #[test]
    fn test_translate() {
        assert!(matches!(
            translate(&add_job(), server(ADDJOB_PAUSED)),
            DisqueError::QueuePaused
        ));
        assert!(matches!(
            translate(&add_job(), server(ADDJOB_DELAY_GT_TTL)),
            DisqueError::DelayExceedsTtl
        ));
        assert!(matches!(
            translate(&working(), server(WORKING_NOJOB)),
            DisqueError::UnknownJob
        ));
        assert!(matches!(
            translate(&working(), server(WORKING_TOOLATE)),
            DisqueError::TooLateToPostpone
        ));
    }

    #[test]
    fn test_translate_passes_through() {
        // Known reasons are scoped to their command.
        match translate(&working(), server(ADDJOB_PAUSED)) {
            DisqueError::Transport(TransportError::Server(reason)) => {
                assert_eq!(reason, ADDJOB_PAUSED)
            },
            other => panic!("unexpected {other:?}"),
        }

        // Prefixes and case changes don't match.
        for reason in [
            "PAUSED",
            "PAUSED Queue paused in input, try later.",
            "paused Queue paused in input, try later",
            "NOJOB Job not known in the context of this node",
        ] {
            let cmd = if reason.starts_with("NOJOB") {
                working()
            } else {
                add_job()
            };
            match translate(&cmd, server(reason)) {
                DisqueError::Transport(TransportError::Server(r)) => {
                    assert_eq!(r, reason)
                },
                other => panic!("unexpected {other:?} for {reason:?}"),
            }
        }

        // Other commands never translate.
        let ack = DisqueCommand::AckJob { ids: vec![] };
        assert!(matches!(
            translate(&ack, server(WORKING_NOJOB)),
            DisqueError::Transport(TransportError::Server(_))
        ));

        assert!(matches!(
            translate(&add_job(), TransportError::ConnectionClosed),
            DisqueError::Transport(TransportError::ConnectionClosed)
        ));
    }

    #[test]
    fn test_is_retryable() {
        assert!(
            DisqueError::from(TransportError::ConnectionClosed).is_retryable()
        );
        assert!(DisqueError::from(server("ERR whatever")).is_retryable());
        assert!(!DisqueError::from(TransportError::Poisoned).is_retryable());

        assert!(!DisqueError::QueuePaused.is_retryable());
        assert!(!DisqueError::UnknownJob.is_retryable());
        assert!(!DisqueError::Decode(DecodeError::Unexpected {
            command: "QLEN",
            expected: "integer",
            got: "array",
        })
        .is_retryable());
    }
}
