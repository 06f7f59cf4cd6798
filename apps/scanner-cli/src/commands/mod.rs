//! # CLI Commands
//!
//! ```text
//! commands/
//! ├── mod.rs         ◄─── dispatch
//! ├── connection.rs  ◄─── connect, datasets, activate, status, sync, remote
//! └── scan.rs        ◄─── scan, records, clear
//! ```
//!
//! Every command except `connect` first resumes the saved server, so
//! background loops (poller, reconnect, pending drain) run while it works.

mod connection;
mod scan;

use scanner_sync::ScannerAgent;

use crate::cli::Command;

pub async fn run(agent: &ScannerAgent, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Connect { url } => connection::connect(agent, &url).await,
        Command::Datasets => connection::datasets(agent).await,
        Command::Activate { dataset_id } => connection::activate(agent, dataset_id).await,
        Command::Status { watch } => connection::status(agent, watch).await,
        Command::Sync => connection::sync(agent).await,
        Command::Remote { limit } => connection::remote(agent, limit).await,
        Command::Scan { codes } => scan::scan(agent, codes).await,
        Command::Records { filter } => scan::records(agent, filter).await,
        Command::Clear { dataset_id } => scan::clear(agent, dataset_id).await,
    }
}
