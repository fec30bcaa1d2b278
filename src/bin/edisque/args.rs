use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use enchanted_disque::QueuePauseState;

#[derive(Parser, Debug)]
#[command(about, long_about = None, version)]
pub(crate) struct Args {
    /// Reads connection settings from a YAML file. Flags override it.
    #[arg(short, long)]
    pub(crate) config: Option<PathBuf>,
    /// Broker URL, as disque://[:password@]host[:port]. Replaces the config
    /// file; the flags below override it.
    #[arg(short, long, env = "DISQUE_URL", hide_env_values = true)]
    pub(crate) url: Option<String>,
    /// Broker hostname.
    #[arg(short = 'H', long, env = "DISQUE_HOST")]
    pub(crate) host: Option<String>,
    /// Broker (TCP) port.
    #[arg(short, long, env = "DISQUE_PORT")]
    pub(crate) port: Option<u16>,
    /// Password sent with AUTH on connect.
    #[arg(long, env = "DISQUE_PASSWORD", hide_env_values = true)]
    pub(crate) password: Option<String>,
    /// Enables human-friendly logging.
    #[arg(short, long, default_value_t)]
    pub(crate) debug: bool,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Prints the broker's info text.
    Info,
    /// Prints the number of jobs queued.
    Qlen { queue: String },
    /// Prints a queue's metrics.
    Qstat { queue: String },
    /// Sets a queue's pause state.
    Pause {
        queue: String,
        #[arg(value_enum)]
        state: PauseArg,
        /// Applies to the receiving node only, without broadcasting.
        #[arg(long, default_value_t)]
        local: bool,
    },
    /// Prints everything the broker knows about a job.
    Show { id: String },
    /// Fetches jobs from the first queues with any available.
    Get(GetArgs),
    /// Adds a job whose body is a JSON document.
    Add(AddArgs),
    /// Postpones a job's next requeue.
    Working { id: String },
    /// Acknowledges jobs as done.
    Ack {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Best-effort delete without waiting for replication.
        #[arg(long, default_value_t)]
        fast: bool,
    },
    /// Requeues jobs, counting a NACK against each.
    Nack {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Queues jobs not already queued.
    Enqueue {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Hides jobs from their queue.
    Dequeue {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Deletes jobs from the receiving node.
    Del {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(ClapArgs, Debug)]
pub(crate) struct GetArgs {
    #[arg(required = true)]
    pub(crate) queues: Vec<String>,
    /// Maximum jobs to fetch.
    #[arg(short = 'n', long, default_value_t = 1)]
    pub(crate) count: u32,
    /// Waits for a job instead of returning straight away.
    #[arg(short, long, default_value_t)]
    pub(crate) block: bool,
    /// Milliseconds to wait when blocking. 0 waits forever.
    #[arg(short, long, default_value_t = 0)]
    pub(crate) timeout_ms: u32,
}

#[derive(ClapArgs, Debug)]
pub(crate) struct AddArgs {
    pub(crate) queue: String,
    /// JSON body.
    pub(crate) body: String,
    /// Seconds before the job is first queued.
    #[arg(long, default_value_t = 0)]
    pub(crate) delay: u32,
    /// Seconds without an ACK before the job is requeued.
    #[arg(long, default_value_t = 300)]
    pub(crate) retry: u32,
    /// Seconds before the job is deleted. Defaults to the longest the broker
    /// allows.
    #[arg(long)]
    pub(crate) ttl: Option<u32>,
    /// Milliseconds allowed for replication.
    #[arg(long, default_value_t = 5000)]
    pub(crate) timeout_ms: u32,
    /// Refuses the job if the queue already holds this many.
    #[arg(long)]
    pub(crate) max_len: Option<u32>,
    /// Replies before replication completes.
    #[arg(long, default_value_t)]
    pub(crate) r#async: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum PauseArg {
    None,
    In,
    Out,
    All,
}

impl From<PauseArg> for QueuePauseState {
    fn from(value: PauseArg) -> Self {
        match value {
            PauseArg::None => QueuePauseState::None,
            PauseArg::In => QueuePauseState::In,
            PauseArg::Out => QueuePauseState::Out,
            PauseArg::All => QueuePauseState::All,
        }
    }
}
