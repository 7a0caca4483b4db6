use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use optiqueue_core::impls::{ChannelSink, HttpJobService, InMemoryJobService};
use optiqueue_core::ports::{JobService, LayoutSource};
use optiqueue_core::{ClientBuilder, ClientConfig, ConfigOverrides, DomainEvent, TaskResult};

#[derive(Debug, Parser)]
#[command(name = "optiqueue", about = "Submit layout optimization jobs and follow them")]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Polling interval in milliseconds
    #[arg(long, global = true)]
    interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Submit jobs and poll until every one is terminal
    Submit {
        #[arg(long, default_value_t = 1)]
        jobs: usize,

        /// Label for the first job; the rest get the default label
        #[arg(long)]
        label: Option<String>,

        /// Run against an in-process service instead of HTTP
        #[arg(long)]
        simulate: bool,
    },
    /// Print the currently deployed container layout
    Layout {
        #[arg(long)]
        simulate: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Command::Submit {
            jobs,
            label,
            simulate,
        } => submit(config, jobs, label, simulate).await,
        Command::Layout { simulate } => layout(config, simulate).await,
    }
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let overrides = ConfigOverrides {
        base_url: cli.base_url.clone(),
        poll_interval_ms: cli.interval_ms,
    };
    Ok(ClientConfig::resolve(cli.config.as_deref(), &overrides)?)
}

fn simulated_service() -> Arc<InMemoryJobService> {
    let layout = vec![
        r#"{"id":"urn:container:1","location":{"value":{"coordinates":[-0.3763,39.4699]}}}"#
            .to_string(),
        r#"{"id":"urn:container:2","location":{"value":{"coordinates":[-0.3751,39.4712]}}}"#
            .to_string(),
    ];
    Arc::new(
        InMemoryJobService::new()
            .with_auto_complete(
                3,
                json!([[-0.3763, 39.4699], [-0.3751, 39.4712], [-0.3740, 39.4688]]),
            )
            .with_layout(layout),
    )
}

fn services(
    config: &ClientConfig,
    simulate: bool,
) -> Result<(Arc<dyn JobService>, Arc<dyn LayoutSource>)> {
    if simulate {
        let service = simulated_service();
        let jobs: Arc<dyn JobService> = service.clone();
        let layout: Arc<dyn LayoutSource> = service;
        return Ok((jobs, layout));
    }
    let service = Arc::new(HttpJobService::new(config).context("building HTTP client")?);
    let jobs: Arc<dyn JobService> = service.clone();
    let layout: Arc<dyn LayoutSource> = service;
    Ok((jobs, layout))
}

async fn submit(config: ClientConfig, jobs: usize, label: Option<String>, simulate: bool) -> Result<()> {
    let (service, layout_source) = services(&config, simulate)?;
    let (sink, events) = ChannelSink::new();
    let client = ClientBuilder::new()
        .config(config)
        .job_service(service)
        .layout_source(layout_source)
        .sink(Arc::new(sink))
        .build()?;

    let printer = tokio::spawn(print_events(events));

    for n in 0..jobs {
        let label = if n == 0 { label.as_deref() } else { None };
        if let Err(e) = client.submit(label).await {
            // 1件の失敗で他のジョブは止めない
            warn!(error = %e, "submission failed");
        }
    }

    let handle = client.start_polling();
    let mut settle = tokio::time::interval(client.config().poll_interval());
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupted, stopping");
                break;
            }
            _ = settle.tick() => {
                if client.is_settled().await {
                    break;
                }
            }
        }
    }
    handle.shutdown_and_join().await;

    let counts = client.counts().await;
    info!(
        pending = counts.pending,
        succeeded = counts.succeeded,
        failed = counts.failed,
        "done"
    );

    drop(client);
    let _ = printer.await;
    Ok(())
}

async fn print_events(mut events: UnboundedReceiver<DomainEvent>) {
    while let Some(event) = events.recv().await {
        let task = event.task();
        match &event {
            DomainEvent::TaskCreated(_) => println!("{} [{}] in progress", task.label(), task.id()),
            DomainEvent::TaskCompleted(_) => {
                println!("{} [{}] completed", task.label(), task.id());
                for c in task.containers().unwrap_or_default() {
                    println!("  {} lat={} lng={}", c.id, c.location.lat, c.location.lng);
                }
            }
            DomainEvent::TaskFailed(_) => {
                let diagnostic = match task.result() {
                    Some(TaskResult::Failure(d)) => d.to_string(),
                    _ => String::new(),
                };
                println!("{} [{}] failed: {}", task.label(), task.id(), diagnostic);
            }
        }
    }
}

async fn layout(config: ClientConfig, simulate: bool) -> Result<()> {
    let (service, layout_source) = services(&config, simulate)?;
    let client = ClientBuilder::new()
        .config(config)
        .job_service(service)
        .layout_source(layout_source)
        .build()?;

    let containers = client
        .load_current_layout()
        .await
        .context("fetching current layout")?;
    for c in &containers {
        println!("{} lat={} lng={}", c.id, c.location.lat, c.location.lng);
    }
    Ok(())
}
