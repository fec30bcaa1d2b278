mod args;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use enchanted_disque::{
    AckMode, AddJobOptions, ClientConfig, DisqueClient, FetchOptions,
    PauseScope, RespConnection,
};
use serde::Serialize;
use serde_json::Value;
use tokio::{select, signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};

use crate::args::{Args, Command};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Logging
    if args.debug {
        tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .init();
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(error) = signal::ctrl_c().await {
                warn!(%error, "something strange with ctrl-c handling!");
            };
            cancel.cancel();
        });
    }

    // A blocking GETJOB can wait indefinitely, so the whole call races
    // against ctrl-c.
    select! {
        result = begin(args) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                let error = format!("{error:#}");
                error!(%error, "encountered runtime error");
                ExitCode::FAILURE
            },
        },
        _ = cancel.cancelled() => {
            info!("interrupted");
            ExitCode::from(130)
        },
    }
}

fn load_config(args: &Args) -> Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            ClientConfig::from_yaml(&source)
                .with_context(|| format!("parsing {}", path.display()))?
        },
        None => ClientConfig::default(),
    };

    if let Some(url) = &args.url {
        config = ClientConfig::from_url(url).context("parsing --url")?;
    }

    if let Some(host) = &args.host {
        config.hostname = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(password) = &args.password {
        config.password = Some(password.clone());
    }

    Ok(config)
}

async fn begin(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    let conn = RespConnection::connect(&config).await.with_context(|| {
        format!("connecting to {}:{}", config.hostname, config.port)
    })?;
    let client = DisqueClient::new(conn);

    match args.command {
        Command::Info => {
            println!("{}", client.info().await?);
        },
        Command::Qlen { queue } => {
            print(&client.queue_length(&queue).await?)?;
        },
        Command::Qstat { queue } => {
            print(&client.queue_metrics(&queue).await?)?;
        },
        Command::Pause {
            queue,
            state,
            local,
        } => {
            let scope = if local {
                PauseScope::Node
            } else {
                PauseScope::Cluster
            };
            print(&client.pause_queue(&queue, state.into(), scope).await?)?;
        },
        Command::Show { id } => {
            print(&client.show_job::<Value>(&id).await?)?;
        },
        Command::Get(get) => {
            let opts = FetchOptions {
                blocking: get.block,
                timeout_ms: get.timeout_ms,
            };
            let jobs = client
                .get_jobs::<Value, _>(get.count, &get.queues, opts)
                .await?;
            print(&jobs)?;
        },
        Command::Add(add) => {
            let body: Value = serde_json::from_str(&add.body)
                .context("body is not valid JSON")?;
            let opts = AddJobOptions {
                delay: add.delay,
                retry_after: add.retry,
                delete_after: add.ttl,
                timeout_ms: add.timeout_ms,
                max_len: add.max_len,
                replicate_async: add.r#async,
            };
            println!("{}", client.add_job(&body, &add.queue, &opts).await?);
        },
        Command::Working { id } => {
            print(&client.postpone_work(&id).await?)?;
        },
        Command::Ack { ids, fast } => {
            let mode = if fast {
                AckMode::Fast
            } else {
                AckMode::Replicated
            };
            print(&client.acknowledge(&ids, mode).await?)?;
        },
        Command::Nack { ids } => {
            print(&client.negative_acknowledge(&ids).await?)?;
        },
        Command::Enqueue { ids } => print(&client.enqueue(&ids).await?)?,
        Command::Dequeue { ids } => print(&client.dequeue(&ids).await?)?,
        Command::Del { ids } => print(&client.delete_jobs(&ids).await?)?,
    }

    client
        .transport()
        .close()
        .await
        .context("during shutdown")?;

    Ok(())
}

/// Writes a result to stdout as YAML.
fn print<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_yaml::to_string(value).context("formatting output")?;
    print!("{out}");
    Ok(())
}
