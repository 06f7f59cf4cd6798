use anyhow::Context;
use futures_util::StreamExt;

use scanner_core::DatasetId;
use scanner_sync::{ConnectOutcome, ScannerAgent, ScannerStatus, SyncResult};

fn print_outcome(outcome: &ConnectOutcome) {
    if let Some(message) = &outcome.message {
        println!("{message}");
    }
}

fn print_status(status: &ScannerStatus) {
    println!("state:    {}", status.state);
    println!("server:   {}", status.server_url.as_deref().unwrap_or("-"));
    match (&status.active_dataset_id, &status.active_dataset_name) {
        (Some(id), Some(name)) => println!("dataset:  {name} (#{id})"),
        (Some(id), None) => println!("dataset:  #{id}"),
        _ => println!("dataset:  -"),
    }
    if let Some(progress) = status.progress {
        let done = if progress.is_complete() { ", complete" } else { "" };
        println!(
            "progress: {}/{} ({}%{done})",
            progress.scanned, progress.total, progress.percentage
        );
    }
    println!("pending:  {}", status.pending_count);
    if let Some(error) = &status.last_error {
        println!("error:    {error}");
    }
}

/// Turns a retryable server error into a notice instead of a failure.
fn unless_unavailable<T>(result: SyncResult<T>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_retryable() => {
            println!("Server unavailable, try again later ({e}).");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Prints why nothing could be resumed, if that is the case.
async fn resume(agent: &ScannerAgent) -> anyhow::Result<()> {
    match agent.start().await? {
        Some(outcome) => {
            if !outcome.connected {
                print_outcome(&outcome);
            }
        }
        None => println!("No server configured. Run `scanner connect <address>` first."),
    }
    Ok(())
}

pub async fn connect(agent: &ScannerAgent, url: &str) -> anyhow::Result<()> {
    let outcome = agent.connect(url).await?;
    print_outcome(&outcome);
    Ok(())
}

pub async fn datasets(agent: &ScannerAgent) -> anyhow::Result<()> {
    resume(agent).await?;
    let active = agent.status().await.active_dataset_id;

    let Some(datasets) =
        unless_unavailable(agent.list_datasets().await).context("listing datasets")?
    else {
        return Ok(());
    };
    if datasets.is_empty() {
        println!("Server has no datasets.");
    }
    for dataset in datasets {
        let marker = if Some(dataset.id) == active { "*" } else { " " };
        let progress = dataset.progress();
        println!(
            "{marker} {:>4}  {:<30} {:>5}/{:<5} {:>3}%",
            dataset.id, dataset.name, progress.scanned, progress.total, progress.percentage
        );
    }
    Ok(())
}

pub async fn activate(agent: &ScannerAgent, dataset_id: DatasetId) -> anyhow::Result<()> {
    resume(agent).await?;
    let dataset = agent.activate_dataset_id(dataset_id).await?;
    println!("Active dataset: {} (#{})", dataset.name, dataset.id);
    Ok(())
}

pub async fn status(agent: &ScannerAgent, watch: bool) -> anyhow::Result<()> {
    resume(agent).await?;
    print_status(&agent.status().await);

    if watch {
        let mut pending = agent.pending_count_stream();
        let mut saved = agent.server_config_stream();
        loop {
            tokio::select! {
                item = pending.next() => match item {
                    Some(count) => println!("pending: {}", count?),
                    None => break,
                },
                item = saved.next() => match item {
                    Some(config) => match config? {
                        Some(config) => println!(
                            "saved:   {} dataset {}",
                            config.server_url,
                            config.active_dataset_name.as_deref().unwrap_or("-")
                        ),
                        None => println!("saved:   -"),
                    },
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => break,
            }
        }
    }
    Ok(())
}

pub async fn sync(agent: &ScannerAgent) -> anyhow::Result<()> {
    resume(agent).await?;
    let report = agent.sync_now().await?;
    println!("Uploaded {} record(s).", report.uploaded);
    if let Some(halt) = report.halted {
        println!("Stopped at {}: {}", halt.box_number, halt.error);
    }
    Ok(())
}

pub async fn remote(agent: &ScannerAgent, limit: u32) -> anyhow::Result<()> {
    resume(agent).await?;
    let Some(scans) = unless_unavailable(agent.recent_remote_scans(limit).await)? else {
        return Ok(());
    };
    for scan in scans {
        println!(
            "{:<20} {:<8} {}",
            scan.scanned_at.as_deref().unwrap_or("-"),
            scan.zone.as_deref().unwrap_or("-"),
            scan.box_number
        );
    }
    Ok(())
}
