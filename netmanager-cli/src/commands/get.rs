//! Get command - download a URL with a progress bar.

use std::io::Write;
use std::path::PathBuf;

use bytes::Bytes;
use indicatif::{ProgressBar, ProgressStyle};
use netmanager::{
    Handlers, ManagerConfig, NetworkError, NetworkManager, NetworkResult, Request, Response,
};
use tokio::sync::oneshot;

use super::common::{build_request, cancel_on_interrupt, RequestArgs};
use crate::error::CliError;

/// Resolution of the progress bar; fractions are scaled to this many steps.
const BAR_STEPS: u64 = 1000;

/// Arguments for the get command.
#[derive(Debug)]
pub struct GetArgs {
    pub request: RequestArgs,
    pub output: Option<PathBuf>,
}

/// Run the get command.
pub async fn run(config: ManagerConfig, args: GetArgs) -> Result<(), CliError> {
    let manager = NetworkManager::new(config)?;
    let request = build_request(&args.request)?;

    let bar = progress_bar();
    let result = download(&manager, request, bar.clone(), true).await;
    bar.finish_and_clear();
    let body = result?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, &body)
                .map_err(|e| CliError::io(format!("Failed to write {}", path.display()), e))?;
            eprintln!(
                "{} {} bytes to {}",
                console::style("Saved").green().bold(),
                body.len(),
                path.display()
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&body)
                .and_then(|_| stdout.flush())
                .map_err(|e| CliError::io("Failed to write to stdout", e))?;
        }
    }

    Ok(())
}

/// Run one download, feeding progress to `bar`, and return the payload.
///
/// The payload arrives through the data callback; the completion callback
/// carries the outcome.
pub async fn download(
    manager: &NetworkManager,
    request: Request,
    bar: ProgressBar,
    interruptible: bool,
) -> Result<Bytes, CliError> {
    let (data_tx, data_rx) = oneshot::channel::<Bytes>();
    let (done_tx, done_rx) = oneshot::channel();

    let handlers = Handlers::new()
        .on_progress(move |fraction| bar.set_position((fraction * BAR_STEPS as f64) as u64))
        .on_data(move |bytes| {
            let _ = data_tx.send(bytes);
        })
        .on_complete(move |result: NetworkResult<Response>| {
            let _ = done_tx.send(result.map(|response| response.status()));
        });

    let handle = manager.fetch(request, handlers);
    if interruptible {
        cancel_on_interrupt(&handle)?;
    }

    let status = done_rx.await.unwrap_or(Err(NetworkError::Shutdown))?;
    tracing::info!(op = %handle.id(), status = %status, "Download finished");

    // Data is always delivered before a successful completion.
    data_rx.await.map_err(|_| CliError::Network(NetworkError::Shutdown))
}

fn progress_bar() -> ProgressBar {
    if !atty::is(atty::Stream::Stderr) {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(BAR_STEPS);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}%")
    {
        bar.set_style(style.progress_chars("#>-"));
    }
    bar
}
