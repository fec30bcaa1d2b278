use chrono::{DateTime, Utc};
use serde::Serialize;

use super::states::{JobState, QueuePauseState};

/// One delivery of a job, as returned by `GETJOB ... WITHCOUNTERS`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Job<B> {
    /// Cluster-wide unique job ID.
    pub id: String,
    /// Queue the job was fetched from.
    pub queue: String,
    /// Best-effort count of `NACK`s received.
    pub nacks: u64,
    /// Best-effort count of redeliveries not caused by a `NACK`, e.g. after
    /// a worker crashed or the retry interval lapsed.
    pub additional_deliveries: u64,
    /// `None` if the payload was empty or didn't decode as `B`.
    pub body: Option<B>,
}

/// The broker's bookkeeping for one job, as returned by `SHOW`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JobInfo<B> {
    pub id: String,
    pub queue: String,
    pub state: JobState,
    /// seconds left before the job is deleted, processed or not
    pub time_to_live: i64,
    /// creation time on the node that answered, to the second
    pub created_at: DateTime<Utc>,
    /// seconds the job waited before first being queued
    pub delay: i64,
    /// seconds without an ACK before the job is requeued; 0 means
    /// at-most-once delivery
    pub retry_interval: i64,
    /// seconds left before the job is requeued
    pub next_retry_within: i64,
    pub nacks: u64,
    pub additional_deliveries: u64,
    /// nodes the job was sent to for replication
    pub nodes_delivered: Vec<String>,
    /// nodes confirmed to hold a copy
    pub nodes_confirmed: Vec<String>,
    pub body: Option<B>,
}

/// Queue metrics, as returned by `QSTAT`.
///
/// The broker creates queue objects lazily and evicts idle ones even while
/// they still own jobs, so a missing `QueueInfo` says nothing about whether
/// jobs exist.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct QueueInfo {
    pub name: String,
    /// jobs currently queued
    pub length: u64,
    /// seconds since the queue object was created
    pub age: i64,
    /// seconds since the queue was last accessed
    pub idle: i64,
    /// clients blocked in `GETJOB` on this queue
    pub blocked: u64,
    /// nodes this node is importing jobs from
    pub import_from: Vec<String>,
    /// rough jobs/sec imported from other nodes
    pub import_rate: u64,
    pub jobs_in: u64,
    pub jobs_out: u64,
    pub pause_state: QueuePauseState,
}
