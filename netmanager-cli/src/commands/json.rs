//! Json command - fetch a URL and pretty-print the decoded document.

use netmanager::{Handlers, ManagerConfig, NetworkError, NetworkManager, NetworkResult, Request};
use serde_json::Value;
use tokio::sync::oneshot;

use super::common::{build_request, cancel_on_interrupt, RequestArgs};
use crate::error::CliError;

/// Run the json command.
pub async fn run(config: ManagerConfig, args: RequestArgs) -> Result<(), CliError> {
    let manager = NetworkManager::new(config)?;
    let request = build_request(&args)?;

    let value = fetch_value(&manager, request, true).await?;
    println!("{}", render(&value));
    Ok(())
}

/// Fetch and decode a JSON document.
pub async fn fetch_value(
    manager: &NetworkManager,
    request: Request,
    interruptible: bool,
) -> Result<Value, CliError> {
    let (tx, rx) = oneshot::channel();
    let handlers = Handlers::new().on_complete(move |result: NetworkResult<Value>| {
        let _ = tx.send(result);
    });

    let handle = manager.fetch_json(request, handlers);
    if interruptible {
        cancel_on_interrupt(&handle)?;
    }

    Ok(rx.await.unwrap_or(Err(NetworkError::Shutdown))?)
}

fn render(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
