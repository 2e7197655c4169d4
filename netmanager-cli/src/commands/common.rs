//! Helpers shared across CLI commands.

use std::path::Path;
use std::time::Duration;

use netmanager::{ManagerConfig, Request};

use crate::error::CliError;

/// Options every request-issuing command accepts.
#[derive(Debug, Clone, Default)]
pub struct RequestArgs {
    pub url: String,
    pub timeout: Option<u64>,
    pub headers: Vec<String>,
}

/// Load the manager configuration.
///
/// An explicit `--config` file must exist and parse; without one the
/// defaults are used.
pub fn load_config(path: Option<&Path>) -> Result<ManagerConfig, CliError> {
    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading configuration");
            Ok(ManagerConfig::from_ini_file(path)?)
        }
        None => Ok(ManagerConfig::default()),
    }
}

/// Split a `Name: value` header argument.
pub fn parse_header(raw: &str) -> Result<(String, String), CliError> {
    let (name, value) = raw.split_once(':').ok_or_else(|| {
        CliError::Usage(format!(
            "Invalid header '{}', expected NAME:VALUE",
            raw
        ))
    })?;

    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::Usage(format!(
            "Invalid header '{}', name is empty",
            raw
        )));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Build a GET request from the command-line arguments.
pub fn build_request(args: &RequestArgs) -> Result<Request, CliError> {
    let mut request = Request::get(&args.url)?;

    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        request = request.with_header(&name, &value)?;
    }

    if let Some(secs) = args.timeout {
        request = request.with_timeout(Duration::from_secs(secs));
    }

    Ok(request)
}

/// Cancel the operation when the user presses Ctrl+C.
pub fn cancel_on_interrupt(handle: &netmanager::OperationHandle) -> Result<(), CliError> {
    let handle = handle.clone();
    ctrlc::set_handler(move || {
        tracing::info!(op = %handle.id(), "Interrupted, cancelling");
        handle.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("Accept: application/json").unwrap(),
            ("Accept".to_string(), "application/json".to_string())
        );
        assert_eq!(
            parse_header("X-Token:a:b").unwrap(),
            ("X-Token".to_string(), "a:b".to_string())
        );
    }

    #[test]
    fn test_parse_header_rejects_malformed() {
        assert!(matches!(parse_header("Accept"), Err(CliError::Usage(_))));
        assert!(matches!(parse_header(" : x"), Err(CliError::Usage(_))));
    }

    #[test]
    fn test_build_request() {
        let args = RequestArgs {
            url: "https://example.com/file".to_string(),
            timeout: Some(7),
            headers: vec!["Accept: */*".to_string()],
        };

        let request = build_request(&args).unwrap();

        assert_eq!(request.timeout(), Some(Duration::from_secs(7)));
        assert_eq!(request.headers().get("accept").unwrap(), "*/*");
    }

    #[test]
    fn test_build_request_invalid_url_is_network_error() {
        let args = RequestArgs {
            url: "ftp://example.com/file".to_string(),
            ..Default::default()
        };

        let err = build_request(&args).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_load_config() {
        assert!(load_config(None).is_ok());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[network]\ntimeout_secs = 9").unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(9));

        let err = load_config(Some(Path::new("/nonexistent/netmanager.ini"))).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }
}
