//! Decodes broker replies into typed records.
//!
//! `SHOW` and `QSTAT` reply with flat label/value arrays, and `GETJOB`
//! replies with one fixed-shape array per job. The positions are the broker's
//! contract, written down once per record in the layout tables below; the
//! decoders only ever read fields through those tables.
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::codec::BodyCodec;
use crate::error::DecodeError;
use crate::types::job::{Job, JobInfo, QueueInfo};
use crate::types::reply::Reply;
use crate::types::states::QueuePauseState;

/// Where one value sits in a reply array. `label` is the broker's name for
/// it, which for label/value layouts is the item just before `index`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Field {
    pub label: &'static str,
    pub index: usize,
}

const fn field(label: &'static str, index: usize) -> Field {
    Field { label, index }
}

/// `QSTAT <queue>`
pub mod qstat {
    use super::{field, Field};

    pub const RECORD: &str = "QSTAT";
    pub const LEN: usize = 20;

    pub const NAME: Field = field("name", 1);
    pub const LENGTH: Field = field("len", 3);
    pub const AGE: Field = field("age", 5);
    pub const IDLE: Field = field("idle", 7);
    pub const BLOCKED: Field = field("blocked", 9);
    pub const IMPORT_FROM: Field = field("import-from", 11);
    pub const IMPORT_RATE: Field = field("import-rate", 13);
    pub const JOBS_IN: Field = field("jobs-in", 15);
    pub const JOBS_OUT: Field = field("jobs-out", 17);
    pub const PAUSE: Field = field("pause", 19);
}

/// One job within a `GETJOB ... WITHCOUNTERS` reply. Only the counters are
/// labelled.
pub mod getjob {
    use super::{field, Field};

    pub const RECORD: &str = "GETJOB";
    pub const LEN: usize = 7;

    pub const QUEUE: Field = field("queue", 0);
    pub const ID: Field = field("id", 1);
    pub const BODY: Field = field("body", 2);
    pub const NACKS: Field = field("nacks", 4);
    pub const ADDITIONAL_DELIVERIES: Field = field("additional-deliveries", 6);
}

/// `SHOW <id>`
pub mod show {
    use super::{field, Field};

    pub const RECORD: &str = "SHOW";
    pub const LEN: usize = 30;

    pub const ID: Field = field("id", 1);
    pub const QUEUE: Field = field("queue", 3);
    pub const STATE: Field = field("state", 5);
    pub const TTL: Field = field("ttl", 9);
    /// microseconds since the epoch
    pub const CTIME: Field = field("ctime", 11);
    pub const DELAY: Field = field("delay", 13);
    pub const RETRY: Field = field("retry", 15);
    pub const NACKS: Field = field("nacks", 17);
    pub const ADDITIONAL_DELIVERIES: Field = field("additional-deliveries", 19);
    pub const NODES_DELIVERED: Field = field("nodes-delivered", 21);
    pub const NODES_CONFIRMED: Field = field("nodes-confirmed", 23);
    /// milliseconds
    pub const NEXT_REQUEUE_WITHIN: Field = field("next-requeue-within", 25);
    pub const BODY: Field = field("body", 29);

    pub const CTIME_UNITS_PER_SECOND: i64 = 1_000_000;
    pub const REQUEUE_UNITS_PER_SECOND: i64 = 1_000;
}

/// Reads typed values out of a reply array whose length has been checked
/// against its layout.
struct Fields<'a> {
    record: &'static str,
    items: &'a [Reply],
}

impl<'a> Fields<'a> {
    fn new(
        record: &'static str,
        items: &'a [Reply],
        expected: usize,
    ) -> Result<Self, DecodeError> {
        if items.len() == expected {
            Ok(Self { record, items })
        } else {
            Err(DecodeError::Length {
                record,
                expected,
                got: items.len(),
            })
        }
    }

    fn wrong_kind(&self, f: Field, expected: &'static str) -> DecodeError {
        DecodeError::FieldKind {
            record: self.record,
            field: f.label,
            index: f.index,
            expected,
            got: self.items[f.index].kind(),
        }
    }

    fn bad_value(&self, f: Field, reason: impl ToString) -> DecodeError {
        DecodeError::FieldValue {
            record: self.record,
            field: f.label,
            index: f.index,
            reason: reason.to_string(),
        }
    }

    /// The raw payload of a bulk field, or `None` if it's nil.
    fn bulk(&self, f: Field) -> Result<Option<&'a Bytes>, DecodeError> {
        match &self.items[f.index] {
            Reply::Bulk(b) => Ok(Some(b)),
            Reply::Nil => Ok(None),
            _ => Err(self.wrong_kind(f, "bulk")),
        }
    }

    fn string(&self, f: Field) -> Result<String, DecodeError> {
        match &self.items[f.index] {
            Reply::Bulk(b) => utf8(b).map_err(|e| self.bad_value(f, e)),
            _ => Err(self.wrong_kind(f, "bulk")),
        }
    }

    fn int(&self, f: Field) -> Result<i64, DecodeError> {
        match &self.items[f.index] {
            Reply::Integer(n) => Ok(*n),
            _ => Err(self.wrong_kind(f, "integer")),
        }
    }

    fn count(&self, f: Field) -> Result<u64, DecodeError> {
        let n = self.int(f)?;
        u64::try_from(n)
            .map_err(|_| self.bad_value(f, format!("negative count {n}")))
    }

    fn strings(&self, f: Field) -> Result<Vec<String>, DecodeError> {
        let Reply::Array(items) = &self.items[f.index] else {
            return Err(self.wrong_kind(f, "array"));
        };

        items
            .iter()
            .map(|item| match item {
                Reply::Bulk(b) => utf8(b).map_err(|e| self.bad_value(f, e)),
                other => Err(self.bad_value(
                    f,
                    format!("expected bulk elements, got {}", other.kind()),
                )),
            })
            .collect()
    }

    fn token<T>(&self, f: Field) -> Result<T, DecodeError>
    where
        T: FromStr,
        T::Err: ToString,
    {
        self.string(f)?.parse().map_err(|e| self.bad_value(f, e))
    }

    fn timestamp(
        &self,
        f: Field,
        per_second: i64,
    ) -> Result<DateTime<Utc>, DecodeError> {
        let raw = self.int(f)?;
        DateTime::from_timestamp(raw.div_euclid(per_second), 0).ok_or_else(
            || self.bad_value(f, format!("timestamp {raw} out of range")),
        )
    }
}

fn utf8(b: &Bytes) -> Result<String, std::string::FromUtf8Error> {
    String::from_utf8(b.to_vec())
}

/// Decodes a body, treating an empty or undecodable payload as absent so the
/// rest of the record still comes through.
fn body<B, C: BodyCodec<B>>(codec: &C, raw: Option<&Bytes>) -> Option<B> {
    let raw = raw.filter(|r| !r.is_empty())?;
    match codec.decode(raw) {
        Ok(body) => Some(body),
        Err(error) => {
            debug!(%error, "job body did not decode, leaving it empty");
            None
        },
    }
}

fn unexpected(
    command: &'static str,
    expected: &'static str,
    got: &Reply,
) -> DecodeError {
    DecodeError::Unexpected {
        command,
        expected,
        got: got.kind(),
    }
}

pub fn queue_info(reply: &Reply) -> Result<Option<QueueInfo>, DecodeError> {
    use qstat::*;

    let items = match reply {
        Reply::Nil => return Ok(None),
        Reply::Array(items) => items,
        other => return Err(unexpected(RECORD, "array or nil", other)),
    };
    let r = Fields::new(RECORD, items, LEN)?;

    Ok(Some(QueueInfo {
        name: r.string(NAME)?,
        length: r.count(LENGTH)?,
        age: r.int(AGE)?,
        idle: r.int(IDLE)?,
        blocked: r.count(BLOCKED)?,
        import_from: r.strings(IMPORT_FROM)?,
        import_rate: r.count(IMPORT_RATE)?,
        jobs_in: r.count(JOBS_IN)?,
        jobs_out: r.count(JOBS_OUT)?,
        pause_state: r.token(PAUSE)?,
    }))
}

pub fn job_info<B, C: BodyCodec<B>>(
    reply: &Reply,
    codec: &C,
) -> Result<Option<JobInfo<B>>, DecodeError> {
    use show::*;

    let items = match reply {
        Reply::Nil => return Ok(None),
        Reply::Array(items) => items,
        other => return Err(unexpected(RECORD, "array or nil", other)),
    };
    let r = Fields::new(RECORD, items, LEN)?;

    // At-most-once jobs are never requeued, and the broker's countdown for
    // them is garbage.
    let retry_interval = r.int(RETRY)?;
    let next_retry_within = match r.int(NEXT_REQUEUE_WITHIN)? {
        _ if retry_interval == 0 => 0,
        ms => ms / REQUEUE_UNITS_PER_SECOND,
    };

    Ok(Some(JobInfo {
        id: r.string(ID)?,
        queue: r.string(QUEUE)?,
        state: r.token(STATE)?,
        time_to_live: r.int(TTL)?,
        created_at: r.timestamp(CTIME, CTIME_UNITS_PER_SECOND)?,
        delay: r.int(DELAY)?,
        retry_interval,
        next_retry_within,
        nacks: r.count(NACKS)?,
        additional_deliveries: r.count(ADDITIONAL_DELIVERIES)?,
        nodes_delivered: r.strings(NODES_DELIVERED)?,
        nodes_confirmed: r.strings(NODES_CONFIRMED)?,
        body: body(codec, r.bulk(BODY)?),
    }))
}

fn job<B, C: BodyCodec<B>>(
    item: &Reply,
    codec: &C,
) -> Result<Job<B>, DecodeError> {
    use getjob::*;

    let Reply::Array(items) = item else {
        return Err(unexpected(RECORD, "array per job", item));
    };
    let r = Fields::new(RECORD, items, LEN)?;

    Ok(Job {
        id: r.string(ID)?,
        queue: r.string(QUEUE)?,
        nacks: r.count(NACKS)?,
        additional_deliveries: r.count(ADDITIONAL_DELIVERIES)?,
        body: body(codec, r.bulk(BODY)?),
    })
}

/// Decodes a `GETJOB` reply. Nil (no job before the timeout) is an empty
/// list; one malformed job fails the whole reply.
pub fn jobs<B, C: BodyCodec<B>>(
    reply: &Reply,
    codec: &C,
) -> Result<Vec<Job<B>>, DecodeError> {
    match reply {
        Reply::Nil => Ok(vec![]),
        Reply::Array(items) => items.iter().map(|i| job(i, codec)).collect(),
        other => Err(unexpected(getjob::RECORD, "array or nil", other)),
    }
}

/// A non-negative integer reply. Nil counts as 0.
pub fn count(
    command: &'static str,
    reply: &Reply,
) -> Result<u64, DecodeError> {
    match reply {
        Reply::Nil => Ok(0),
        Reply::Integer(n) if *n >= 0 => Ok(*n as u64),
        other => Err(unexpected(command, "non-negative integer", other)),
    }
}

/// A signed integer reply.
pub fn integer(
    command: &'static str,
    reply: &Reply,
) -> Result<i64, DecodeError> {
    match reply {
        Reply::Integer(n) => Ok(*n),
        other => Err(unexpected(command, "integer", other)),
    }
}

/// Free-form text, as from `INFO`. Nil is empty.
pub fn text(
    command: &'static str,
    reply: &Reply,
) -> Result<String, DecodeError> {
    match reply {
        Reply::Nil => Ok(String::new()),
        Reply::Bulk(b) => Ok(String::from_utf8_lossy(b).into_owned()),
        other => Err(unexpected(command, "bulk", other)),
    }
}

/// A job ID, as from `ADDJOB`.
pub fn job_id(
    command: &'static str,
    reply: &Reply,
) -> Result<String, DecodeError> {
    match reply {
        Reply::Bulk(b) if !b.is_empty() => {
            utf8(b).map_err(|_| unexpected(command, "UTF-8 job ID", reply))
        },
        other => Err(unexpected(command, "job ID", other)),
    }
}

/// The pause state echoed back by `PAUSE`.
pub fn pause_state(
    command: &'static str,
    reply: &Reply,
) -> Result<QueuePauseState, DecodeError> {
    match reply {
        Reply::Bulk(b) => std::str::from_utf8(b)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| unexpected(command, "pause state token", reply)),
        other => Err(unexpected(command, "pause state token", other)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::TimeZone;
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::codec::Json;
    use crate::types::states::JobState;

    #[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
    pub(crate) struct Thumbnail {
        pub(crate) path: String,
    }

    fn nodes(names: &[&'static str]) -> Reply {
        Reply::Array(names.iter().map(|n| Reply::from(*n)).collect())
    }

    pub(crate) fn qstat_reply(
        name: &'static str,
        pause: &'static str,
    ) -> Reply {
        Reply::Array(vec![
            "name".into(),
            name.into(),
            "len".into(),
            Reply::Integer(3),
            "age".into(),
            Reply::Integer(120),
            "idle".into(),
            Reply::Integer(4),
            "blocked".into(),
            Reply::Integer(1),
            "import-from".into(),
            nodes(&["7b2cf7a1"]),
            "import-rate".into(),
            Reply::Integer(0),
            "jobs-in".into(),
            Reply::Integer(10),
            "jobs-out".into(),
            Reply::Integer(7),
            "pause".into(),
            pause.into(),
        ])
    }

    pub(crate) fn show_reply(body: Reply) -> Reply {
        Reply::Array(vec![
            "id".into(),
            "D-dcb833cf-8YL1NT17e9+wsA/09NqxscQI-05a1".into(),
            "queue".into(),
            "thumbs".into(),
            "state".into(),
            "queued".into(),
            "repl".into(),
            Reply::Integer(1),
            "ttl".into(),
            Reply::Integer(86399),
            "ctime".into(),
            // 2026-01-01T00:00:01.5Z in microseconds
            Reply::Integer(1_767_225_601_500_000),
            "delay".into(),
            Reply::Integer(0),
            "retry".into(),
            Reply::Integer(300),
            "nacks".into(),
            Reply::Integer(2),
            "additional-deliveries".into(),
            Reply::Integer(1),
            "nodes-delivered".into(),
            nodes(&["dcb833cf"]),
            "nodes-confirmed".into(),
            nodes(&[]),
            "next-requeue-within".into(),
            Reply::Integer(299_999),
            "next-awake-within".into(),
            Reply::Integer(299_499),
            "body".into(),
            body,
        ])
    }

    pub(crate) fn getjob_item(id: &'static str, body: Reply) -> Reply {
        Reply::Array(vec![
            "thumbs".into(),
            id.into(),
            body,
            "nacks".into(),
            Reply::Integer(0),
            "additional-deliveries".into(),
            Reply::Integer(3),
        ])
    }

    #[test]
    fn test_queue_info() {
        let info = queue_info(&qstat_reply("thumbs", "out")).unwrap().unwrap();
        assert_eq!(
            info,
            QueueInfo {
                name: "thumbs".into(),
                length: 3,
                age: 120,
                idle: 4,
                blocked: 1,
                import_from: vec!["7b2cf7a1".into()],
                import_rate: 0,
                jobs_in: 10,
                jobs_out: 7,
                pause_state: QueuePauseState::Out,
            }
        );

        assert_eq!(queue_info(&Reply::Nil), Ok(None));
    }

    #[test]
    fn test_job_info() {
        let info: JobInfo<Thumbnail> =
            job_info(&show_reply(r#"{"path":"/a.png"}"#.into()), &Json)
                .unwrap()
                .unwrap();

        assert_eq!(info.id, "D-dcb833cf-8YL1NT17e9+wsA/09NqxscQI-05a1");
        assert_eq!(info.queue, "thumbs");
        assert_eq!(info.state, JobState::Queued);
        assert_eq!(info.time_to_live, 86399);
        assert_eq!(
            info.created_at,
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 1).unwrap()
        );
        assert_eq!(info.delay, 0);
        assert_eq!(info.retry_interval, 300);
        // 299999ms truncates to 299s.
        assert_eq!(info.next_retry_within, 299);
        assert_eq!(info.nacks, 2);
        assert_eq!(info.additional_deliveries, 1);
        assert_eq!(info.nodes_delivered, vec!["dcb833cf".to_owned()]);
        assert!(info.nodes_confirmed.is_empty());
        assert_eq!(
            info.body,
            Some(Thumbnail {
                path: "/a.png".into()
            })
        );

        assert_eq!(job_info::<Thumbnail, _>(&Reply::Nil, &Json), Ok(None));
    }

    #[test]
    fn test_job_info_at_most_once() {
        let Reply::Array(mut items) = show_reply(Reply::Nil) else {
            unreachable!()
        };
        items[show::RETRY.index] = Reply::Integer(0);
        items[show::NEXT_REQUEUE_WITHIN.index] =
            Reply::Integer(-1_767_225_601_500);

        let info: JobInfo<Thumbnail> =
            job_info(&Reply::Array(items), &Json).unwrap().unwrap();
        assert_eq!(info.retry_interval, 0);
        assert_eq!(info.next_retry_within, 0);
    }

    #[test]
    fn test_body_failure_keeps_record() {
        for raw in [Reply::from("not json"), Reply::from(""), Reply::Nil] {
            let info: JobInfo<Thumbnail> =
                job_info(&show_reply(raw), &Json).unwrap().unwrap();
            assert_eq!(info.body, None);
            assert_eq!(info.queue, "thumbs");
        }
    }

    #[test]
    fn test_jobs() {
        let reply = Reply::Array(vec![
            getjob_item("D-1", r#"{"path":"/a.png"}"#.into()),
            getjob_item("D-2", "garbage".into()),
        ]);
        let fetched: Vec<Job<Thumbnail>> = jobs(&reply, &Json).unwrap();

        assert_eq!(
            fetched,
            vec![
                Job {
                    id: "D-1".into(),
                    queue: "thumbs".into(),
                    nacks: 0,
                    additional_deliveries: 3,
                    body: Some(Thumbnail {
                        path: "/a.png".into()
                    }),
                },
                Job {
                    id: "D-2".into(),
                    queue: "thumbs".into(),
                    nacks: 0,
                    additional_deliveries: 3,
                    body: None,
                },
            ]
        );

        assert_eq!(jobs::<Thumbnail, _>(&Reply::Nil, &Json), Ok(vec![]));
        assert_eq!(
            jobs::<Thumbnail, _>(&Reply::Array(vec![]), &Json),
            Ok(vec![])
        );
    }

    #[test]
    fn test_malformed_records() {
        // Asserts the reply fails to decode with exactly this error.
        #[track_caller]
        fn fault(reply: Reply, expected: DecodeError) {
            assert_eq!(job_info::<Thumbnail, _>(&reply, &Json), Err(expected));
        }

        let Reply::Array(good) = show_reply(Reply::Nil) else {
            unreachable!()
        };

        let mut short = good.clone();
        short.pop();
        fault(
            Reply::Array(short),
            DecodeError::Length {
                record: "SHOW",
                expected: 30,
                got: 29,
            },
        );

        let mut ttl_text = good.clone();
        ttl_text[9] = "86399".into();
        fault(
            Reply::Array(ttl_text),
            DecodeError::FieldKind {
                record: "SHOW",
                field: "ttl",
                index: 9,
                expected: "integer",
                got: "bulk",
            },
        );

        let mut bad_state = good.clone();
        bad_state[5] = "sleeping".into();
        assert!(matches!(
            job_info::<Thumbnail, _>(&Reply::Array(bad_state), &Json),
            Err(DecodeError::FieldValue {
                field: "state",
                index: 5,
                ..
            })
        ));

        let mut negative = good.clone();
        negative[17] = Reply::Integer(-1);
        assert!(matches!(
            job_info::<Thumbnail, _>(&Reply::Array(negative), &Json),
            Err(DecodeError::FieldValue { field: "nacks", .. })
        ));

        let mut nodes = good;
        nodes[21] = Reply::Array(vec![Reply::Integer(1)]);
        assert!(matches!(
            job_info::<Thumbnail, _>(&Reply::Array(nodes), &Json),
            Err(DecodeError::FieldValue {
                field: "nodes-delivered",
                ..
            })
        ));

        fault(
            "D-1".into(),
            DecodeError::Unexpected {
                command: "SHOW",
                expected: "array or nil",
                got: "bulk",
            },
        );

        // One bad job spoils the batch.
        let reply =
            Reply::Array(vec![getjob_item("D-1", Reply::Nil), Reply::Nil]);
        assert!(jobs::<Thumbnail, _>(&reply, &Json).is_err());
    }

    #[test]
    fn test_scalars() {
        assert_eq!(count("QLEN", &Reply::Integer(7)), Ok(7));
        assert_eq!(count("QLEN", &Reply::Nil), Ok(0));
        assert!(count("QLEN", &Reply::Integer(-1)).is_err());
        assert!(count("QLEN", &"7".into()).is_err());

        assert_eq!(integer("WORKING", &Reply::Integer(300)), Ok(300));
        assert!(integer("WORKING", &Reply::Nil).is_err());

        assert_eq!(
            text("INFO", &"# Server\r\n".into()),
            Ok("# Server\r\n".into())
        );
        assert_eq!(text("INFO", &Reply::Nil), Ok(String::new()));

        assert_eq!(job_id("ADDJOB", &"D-1".into()), Ok("D-1".into()));
        assert!(job_id("ADDJOB", &Reply::Nil).is_err());
        assert!(job_id("ADDJOB", &"".into()).is_err());

        assert_eq!(
            pause_state("PAUSE", &"all".into()),
            Ok(QueuePauseState::All)
        );
        assert!(pause_state("PAUSE", &"bcast".into()).is_err());
    }
}
