use tokio::io::{AsyncBufReadExt, BufReader};

use scanner_core::{DatasetId, RecordFilter};
use scanner_sync::{ScannerAgent, SyncError};

async fn scan_one(agent: &ScannerAgent, code: &str) -> anyhow::Result<()> {
    match agent.scan(code).await {
        Ok(result) => println!("{}", result.message()),
        Err(SyncError::Validation(e)) => eprintln!("skipped: {e}"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub async fn scan(agent: &ScannerAgent, codes: Vec<String>) -> anyhow::Result<()> {
    agent.start().await?;
    if !agent.status().await.has_active_dataset() {
        println!("No active dataset. Run `scanner activate <id>` first.");
        return Ok(());
    }

    if codes.is_empty() {
        println!("Ready. One code per line, Ctrl-D to finish.");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => match line? {
                    Some(line) if line.trim().is_empty() => continue,
                    Some(line) => scan_one(agent, &line).await?,
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => break,
            }
        }
    } else {
        for code in &codes {
            scan_one(agent, code).await?;
        }
    }

    let status = agent.status().await;
    if status.pending_count > 0 {
        println!("{} scan(s) waiting for upload.", status.pending_count);
    }
    Ok(())
}

pub async fn records(agent: &ScannerAgent, filter: RecordFilter) -> anyhow::Result<()> {
    agent.start().await?;
    for record in agent.records(filter).await? {
        let verdict = if !record.found {
            "not found"
        } else if record.is_duplicate() {
            "duplicate"
        } else {
            "found"
        };
        let queued = if record.is_pending() { " (queued)" } else { "" };
        println!(
            "{}  {:<24} {:<10} {}{queued}",
            record.scanned_at.format("%Y-%m-%d %H:%M:%S"),
            record.box_number,
            verdict,
            record.zone.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

pub async fn clear(agent: &ScannerAgent, dataset_id: DatasetId) -> anyhow::Result<()> {
    let removed = agent.clear_dataset(dataset_id).await?;
    println!("Removed {removed} record(s) of dataset #{dataset_id}.");
    Ok(())
}
