//! High-level client API: one method per broker operation.
use chrono::Utc;
use tracing::{debug, error, warn};

use crate::codec::{BodyCodec, CodecError, Json};
use crate::command::{self, AckMode, AddJobOptions, FetchOptions, PauseScope};
use crate::decode;
use crate::error::{self, DecodeError, DisqueError};
use crate::transport::{Transport, TransportError};
use crate::types::job::{Job, JobInfo, QueueInfo};
use crate::types::protocol::DisqueCommand;
use crate::types::reply::Reply;
use crate::types::states::QueuePauseState;

/// Maps queue and job operations onto Disque commands sent over `T`, with job
/// bodies encoded by `C`.
///
/// Holds no state between calls: each method sends one command and awaits
/// one reply. Nothing is retried.
pub struct DisqueClient<T, C = Json> {
    transport: T,
    codec: C,
}

impl<T: Transport> DisqueClient<T, Json> {
    /// Creates a client storing job bodies as JSON.
    pub fn new(transport: T) -> Self {
        Self::with_codec(transport, Json)
    }
}

impl<T: Transport, C> DisqueClient<T, C> {
    pub fn with_codec(transport: T, codec: C) -> Self {
        Self { transport, codec }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    // =========================================================================
    // Helper methods
    // =========================================================================

    /// Sends the command, turning error replies into errors. Known broker
    /// reasons for the command become their typed variants.
    async fn execute(&self, cmd: &DisqueCommand) -> Result<Reply, DisqueError> {
        let name = cmd.name();
        let args = cmd.args();
        debug!(command = name, n_args = args.len(), "sending command");

        let result = match self.transport.send(name, &args).await {
            Ok(Reply::Error(reason)) => Err(TransportError::Server(reason)),
            other => other,
        };

        result.map_err(|e| match error::translate(cmd, e) {
            DisqueError::Transport(TransportError::Server(reason)) => {
                warn!(command = name, %reason, "broker refused command");
                TransportError::Server(reason).into()
            },
            translated => translated,
        })
    }

    /// Passes a decoded value through, logging a decode fault loudly: it
    /// points at a protocol mismatch rather than anything retryable.
    fn decoded<R>(
        &self,
        cmd: &DisqueCommand,
        result: Result<R, DecodeError>,
    ) -> Result<R, DisqueError> {
        result.map_err(|error| {
            error!(
                command = cmd.name(),
                %error,
                "reply did not match the expected layout"
            );
            error.into()
        })
    }

    async fn count(&self, cmd: DisqueCommand) -> Result<u64, DisqueError> {
        let reply = self.execute(&cmd).await?;
        self.decoded(&cmd, decode::count(cmd.name(), &reply))
    }

    // =========================================================================
    // Server operations
    // =========================================================================

    /// Returns the server's info/stats text.
    pub async fn info(&self) -> Result<String, DisqueError> {
        let cmd = DisqueCommand::Info;
        let reply = self.execute(&cmd).await?;
        self.decoded(&cmd, decode::text(cmd.name(), &reply))
    }

    // =========================================================================
    // Queue operations
    // =========================================================================

    /// Returns how many jobs are queued. Unknown queues have length 0.
    pub async fn queue_length(&self, queue: &str) -> Result<u64, DisqueError> {
        self.count(DisqueCommand::QueueLength {
            queue: queue.to_owned(),
        })
        .await
    }

    /// Sets which directions of traffic a queue refuses, returning the state
    /// now in effect.
    pub async fn pause_queue(
        &self,
        queue: &str,
        state: QueuePauseState,
        scope: PauseScope,
    ) -> Result<QueuePauseState, DisqueError> {
        let cmd = command::pause(queue, state, scope);
        let reply = self.execute(&cmd).await?;
        self.decoded(&cmd, decode::pause_state(cmd.name(), &reply))
    }

    /// Returns the queue's metrics, or `None` if the node answering holds no
    /// queue object by that name. Queue objects are created on demand and
    /// evicted when idle, so `None` doesn't mean the queue has no jobs.
    pub async fn queue_metrics(
        &self,
        queue: &str,
    ) -> Result<Option<QueueInfo>, DisqueError> {
        let cmd = DisqueCommand::QueueStat {
            queue: queue.to_owned(),
        };
        let reply = self.execute(&cmd).await?;
        self.decoded(&cmd, decode::queue_info(&reply))
    }

    // =========================================================================
    // Job operations
    // =========================================================================

    /// Returns what the broker knows about a job, or `None` if it knows
    /// nothing (unknown ID, or already deleted).
    pub async fn show_job<B>(
        &self,
        id: &str,
    ) -> Result<Option<JobInfo<B>>, DisqueError>
    where
        C: BodyCodec<B>,
    {
        let cmd = DisqueCommand::Show { id: id.to_owned() };
        let reply = self.execute(&cmd).await?;
        self.decoded(&cmd, decode::job_info(&reply, &self.codec))
    }

    /// Fetches up to `count` jobs, trying the queues left to right. Returns
    /// an empty list if none were available in time.
    ///
    /// A blocking fetch keeps the broker holding the request, and the
    /// transport busy, until a job arrives or the timeout passes.
    pub async fn get_jobs<B, S: AsRef<str>>(
        &self,
        count: u32,
        queues: &[S],
        opts: FetchOptions,
    ) -> Result<Vec<Job<B>>, DisqueError>
    where
        C: BodyCodec<B>,
    {
        let cmd = command::get_jobs(count, queues, opts);
        if opts.blocking {
            debug!(timeout_ms = opts.timeout_ms, "blocking fetch");
        }
        let reply = self.execute(&cmd).await?;
        self.decoded(&cmd, decode::jobs(&reply, &self.codec))
    }

    /// Adds a job, returning its ID.
    ///
    /// The body must encode to UTF-8 text. When `delete_after` is unset, the
    /// TTL is the longest the broker's 32-bit clock allows; see
    /// [`command::max_ttl`].
    pub async fn add_job<B>(
        &self,
        body: &B,
        queue: &str,
        opts: &AddJobOptions,
    ) -> Result<String, DisqueError>
    where
        C: BodyCodec<B>,
    {
        let raw = self.codec.encode(body).map_err(DisqueError::Encode)?;
        let body = String::from_utf8(raw)
            .map_err(|e| DisqueError::Encode(CodecError::new(e)))?;

        let cmd = command::add_job(queue, body, opts, unix_now())?;
        let reply = self.execute(&cmd).await?;
        let id = self.decoded(&cmd, decode::job_id(cmd.name(), &reply))?;

        debug!(%id, queue, "added job");

        Ok(id)
    }

    /// Tells the broker the job is still being worked on, postponing its
    /// next requeue. Returns roughly how many seconds it was postponed by.
    ///
    /// Best effort: a node on the other side of a partition may still
    /// deliver the job.
    pub async fn postpone_work(&self, id: &str) -> Result<i64, DisqueError> {
        let cmd = DisqueCommand::Working { id: id.to_owned() };
        let reply = self.execute(&cmd).await?;
        self.decoded(&cmd, decode::integer(cmd.name(), &reply))
    }

    /// Acknowledges jobs as done, returning how many were known.
    pub async fn acknowledge<S: AsRef<str>>(
        &self,
        ids: &[S],
        mode: AckMode,
    ) -> Result<u64, DisqueError> {
        self.count(command::acknowledge(ids, mode)).await
    }

    /// Puts jobs straight back in their queue, counting a NACK against each.
    /// Returns how many were requeued.
    pub async fn negative_acknowledge<S: AsRef<str>>(
        &self,
        ids: &[S],
    ) -> Result<u64, DisqueError> {
        self.count(DisqueCommand::Nack {
            ids: command::to_owned_all(ids),
        })
        .await
    }

    /// Queues jobs not already queued, counting an additional delivery
    /// against each. Returns how many were queued.
    pub async fn enqueue<S: AsRef<str>>(
        &self,
        ids: &[S],
    ) -> Result<u64, DisqueError> {
        self.count(DisqueCommand::Enqueue {
            ids: command::to_owned_all(ids),
        })
        .await
    }

    /// Hides jobs from their queue until their retry time, returning how many
    /// were hidden. The jobs are not deleted.
    pub async fn dequeue<S: AsRef<str>>(
        &self,
        ids: &[S],
    ) -> Result<u64, DisqueError> {
        self.count(DisqueCommand::Dequeue {
            ids: command::to_owned_all(ids),
        })
        .await
    }

    /// Deletes jobs from the node answering only, returning how many it
    /// deleted. Other nodes keep their copies; use
    /// [`acknowledge`](Self::acknowledge) for cluster-wide removal.
    pub async fn delete_jobs<S: AsRef<str>>(
        &self,
        ids: &[S],
    ) -> Result<u64, DisqueError> {
        self.count(DisqueCommand::DelJob {
            ids: command::to_owned_all(ids),
        })
        .await
    }
}

fn unix_now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}
