use super::serialisable::{encode_request, RespSerialisable};
use super::states::QueuePauseState;

/// A command sent by the client to the broker.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DisqueCommand {
    /// Returns the server's info/stats text.
    ///
    /// On the wire: `INFO`
    Info,
    /// Returns the number of jobs queued. The broker replies 0 for queues it
    /// has never seen.
    ///
    /// On the wire: `QLEN <queue>`
    QueueLength { queue: String },
    /// Sets which directions of traffic a queue refuses. With `broadcast`,
    /// the state is sent to every node in the cluster.
    ///
    /// On the wire: `PAUSE <queue> <state> [bcast]`
    Pause {
        queue: String,
        state: QueuePauseState,
        broadcast: bool,
    },
    /// Returns queue metrics as a label/value array, or nil if this node
    /// holds no queue object by that name.
    ///
    /// On the wire: `QSTAT <queue>`
    QueueStat { queue: String },
    /// Returns a job's bookkeeping as a label/value array, or nil if the job
    /// is unknown.
    ///
    /// On the wire: `SHOW <id>`
    Show { id: String },
    /// Fetches up to `count` jobs from the queues, scanned left to right.
    /// Without `blocking`, `NOHANG` is sent and the broker replies at once.
    ///
    /// On the wire: `GETJOB [NOHANG] TIMEOUT <ms> COUNT <n> WITHCOUNTERS
    /// FROM <queue>...`
    GetJob {
        blocking: bool,
        timeout_ms: u32,
        count: u32,
        queues: Vec<String>,
    },
    /// Adds a job. `timeout_ms` bounds how long the broker waits for
    /// synchronous replication before failing the command.
    ///
    /// On the wire: `ADDJOB <queue> <body> <ms> DELAY <s> RETRY <s> TTL <s>
    /// [MAXLEN <n>] [ASYNC]`
    AddJob {
        queue: String,
        body: String,
        timeout_ms: u32,
        delay: u32,
        retry: u32,
        ttl: u32,
        max_len: Option<u32>,
        replicate_async: bool,
    },
    /// Tells the broker the job is still being processed, postponing its
    /// next requeue. Replies with the seconds postponed.
    ///
    /// On the wire: `WORKING <id>`
    Working { id: String },
    /// Acknowledges jobs with a replicated ACK, deleting them cluster-wide.
    ///
    /// On the wire: `ACKJOB <id>...`
    AckJob { ids: Vec<String> },
    /// Acknowledges jobs with a best-effort `DELJOB` broadcast instead of a
    /// replicated ACK. Faster, but completed jobs may be redelivered during
    /// failures.
    ///
    /// On the wire: `FASTACK <id>...`
    FastAck { ids: Vec<String> },
    /// Puts jobs back in their queue as soon as possible, bumping `nacks`.
    ///
    /// On the wire: `NACK <id>...`
    Nack { ids: Vec<String> },
    /// Queues jobs that are not already queued, bumping
    /// `additional-deliveries`.
    ///
    /// On the wire: `ENQUEUE <id>...`
    Enqueue { ids: Vec<String> },
    /// Hides jobs from their queue until the retry time elapses.
    ///
    /// On the wire: `DEQUEUE <id>...`
    Dequeue { ids: Vec<String> },
    /// Deletes jobs on the receiving node only. Not replicated.
    ///
    /// On the wire: `DELJOB <id>...`
    DelJob { ids: Vec<String> },
}

impl DisqueCommand {
    /// The command name as sent on the wire.
    pub fn name(&self) -> &'static str {
        use DisqueCommand::*;

        match self {
            Info => "INFO",
            QueueLength { .. } => "QLEN",
            Pause { .. } => "PAUSE",
            QueueStat { .. } => "QSTAT",
            Show { .. } => "SHOW",
            GetJob { .. } => "GETJOB",
            AddJob { .. } => "ADDJOB",
            Working { .. } => "WORKING",
            AckJob { .. } => "ACKJOB",
            FastAck { .. } => "FASTACK",
            Nack { .. } => "NACK",
            Enqueue { .. } => "ENQUEUE",
            Dequeue { .. } => "DEQUEUE",
            DelJob { .. } => "DELJOB",
        }
    }

    /// The ordered argument list, not including the command name.
    pub fn args(&self) -> Vec<String> {
        use DisqueCommand::*;

        match self {
            Info => vec![],

            QueueLength { queue } | QueueStat { queue } => vec![queue.clone()],

            Show { id } | Working { id } => vec![id.clone()],

            AckJob { ids }
            | FastAck { ids }
            | Nack { ids }
            | Enqueue { ids }
            | Dequeue { ids }
            | DelJob { ids } => ids.clone(),

            Pause {
                queue,
                state,
                broadcast,
            } => {
                let mut args = vec![queue.clone(), state.as_str().to_owned()];
                if *broadcast {
                    args.push("bcast".to_owned());
                }
                args
            },

            GetJob {
                blocking,
                timeout_ms,
                count,
                queues,
            } => {
                let mut args = Vec::with_capacity(7 + queues.len());
                if !blocking {
                    args.push("NOHANG".to_owned());
                }
                args.extend([
                    "TIMEOUT".to_owned(),
                    timeout_ms.to_string(),
                    "COUNT".to_owned(),
                    count.to_string(),
                    "WITHCOUNTERS".to_owned(),
                    "FROM".to_owned(),
                ]);
                args.extend(queues.iter().cloned());
                args
            },

            AddJob {
                queue,
                body,
                timeout_ms,
                delay,
                retry,
                ttl,
                max_len,
                replicate_async,
            } => {
                let mut args = vec![
                    queue.clone(),
                    body.clone(),
                    timeout_ms.to_string(),
                    "DELAY".to_owned(),
                    delay.to_string(),
                    "RETRY".to_owned(),
                    retry.to_string(),
                    "TTL".to_owned(),
                    ttl.to_string(),
                ];
                if let Some(max_len) = max_len {
                    args.push("MAXLEN".to_owned());
                    args.push(max_len.to_string());
                }
                if *replicate_async {
                    args.push("ASYNC".to_owned());
                }
                args
            },
        }
    }
}

impl RespSerialisable for DisqueCommand {
    fn serialise_resp(&self) -> Vec<u8> {
        encode_request(self.name(), &self.args())
    }
}
