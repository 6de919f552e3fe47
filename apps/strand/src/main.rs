//! strand - verified record stream downloader
//!
//! Runs download cycles against the configured sources and writes every
//! committed file as a JSON line. Also decodes single local files and
//! prints block filenames.

mod cli;
mod error;
mod logging;
mod sink;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::sink::JsonLinesSink;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use strand_config::Config;
use strand_downloader::{Downloader, InMemoryPointerStore, JsonFilePointerStore, PointerStore};
use strand_errors::{ErrorKind, UserFacingError};
use strand_provider::PathResolver;
use strand_reader::CompositeReader;
use strand_types::{block_filename, FileKind, NodeId, StreamFileData, StreamFilename};
use tokio::select;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_tracing(cli.global.json_logs, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        eprintln!("Error: {e}");
        process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::BlockFilename { number } => {
            println!("{}", block_filename(number)?);
            Ok(())
        }
        Commands::Parse { file } => parse_file(&file).await,
        Commands::Run {
            once,
            interval_secs,
            output,
        } => {
            // file (or defaults), then environment, then flags
            let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
            config.merge_env()?;
            if let Some(secs) = interval_secs {
                config.downloader.interval_secs = secs;
            }
            config.validate()?;
            run_downloader(config, once, output).await
        }
    }
}

async fn parse_file(path: &Path) -> Result<(), CliError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CliError::Usage(format!("{} has no file name", path.display())))?;
    let filename = StreamFilename::parse(name)?;
    if filename.kind() == FileKind::Signature {
        return Err(CliError::Usage(format!(
            "{name} is a signature file; pass the record file it signs"
        )));
    }
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| strand_errors::Error::io_with_path(&e, path))?;
    let data = StreamFileData::new(filename, bytes, NodeId(0), "local");
    let file = CompositeReader::default().parse(&data)?;
    let json = serde_json::to_string_pretty(&file.summary()).map_err(strand_errors::Error::from)?;
    println!("{json}");
    Ok(())
}

async fn run_downloader(config: Config, once: bool, output: Option<PathBuf>) -> Result<(), CliError> {
    info!("Starting strand v{}", env!("CARGO_PKG_VERSION"));
    let (event_sender, event_receiver) = strand_events::channel();
    let events = tokio::spawn(logging::drain_events(
        event_receiver,
        config.downloader.stream.clone(),
    ));

    let resolver = Arc::new(PathResolver::from_config(&config.path).with_events(event_sender.clone()));
    let provider = Arc::new(strand_provider::from_config(
        &config,
        resolver,
        Some(event_sender.clone()),
    )?);
    let pointers: Arc<dyn PointerStore> = match &config.pointer.path {
        Some(path) => Arc::new(JsonFilePointerStore::new(path)),
        None => {
            warn!("No pointer path configured; progress is lost on exit");
            Arc::new(InMemoryPointerStore::new())
        }
    };
    let sink = Arc::new(match output {
        Some(path) => JsonLinesSink::append(&path).await?,
        None => JsonLinesSink::stdout(),
    });
    let downloader = Downloader::new(&config, provider, pointers, sink)?.with_events(event_sender);

    let cancel = downloader.cancellation_token();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, finishing current file");
                cancel.cancel();
            }
        }
    });

    let interval = config.downloader.interval();
    let result = loop {
        match downloader.run_cycle().await {
            Ok(report) => {
                // a full clean batch means more files are probably waiting
                let more = report.caught_up()
                    && report.candidates > 0
                    && report.candidates >= config.downloader.batch_size;
                if once || cancel.is_cancelled() {
                    break Ok(());
                }
                if more {
                    continue;
                }
            }
            Err(e) if !once && e.is_retryable() && e.kind() != ErrorKind::ChainBreak => {
                warn!(error = %e, "Cycle failed, retrying after interval");
            }
            Err(e) => break Err(CliError::from(e)),
        }
        select! {
            () = cancel.cancelled() => break Ok(()),
            () = tokio::time::sleep(interval) => {}
        }
    };

    // closing the last sender ends the event drain
    drop(downloader);
    let _ = events.await;
    result
}
