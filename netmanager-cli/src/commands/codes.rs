//! Codes command - print the error-code table.

use console::style;
use netmanager::ErrorCode;

/// Short description of what each code means for a caller.
fn describe(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::SUCCESS => "Operation completed, value delivered",
        ErrorCode::INVALID_REQUEST => "Malformed URL, header or unsupported scheme",
        ErrorCode::UNREACHABLE => "Host could not be resolved or connected",
        ErrorCode::TIMEOUT => "Operation exceeded its timeout",
        ErrorCode::STATUS => "Server answered with a non-2xx status",
        ErrorCode::TRANSFER => "Connection failed while reading the body",
        ErrorCode::DECODE => "Body could not be decoded",
        ErrorCode::CANCELLED => "Cancelled by the caller",
        ErrorCode::SHUTDOWN => "Manager shut down before the operation ran",
        ErrorCode::TOO_LARGE => "Body exceeded the configured size limit",
        _ => "Unknown",
    }
}

/// Table rows: code, kind, description.
pub fn rows() -> Vec<(u32, &'static str, &'static str)> {
    ErrorCode::ALL
        .iter()
        .map(|&code| (code.value(), code.kind_name(), describe(code)))
        .collect()
}

/// Run the codes command.
pub fn run() {
    println!(
        "{}",
        style(format!("{:<5} {:<16} {}", "CODE", "KIND", "MEANING")).bold()
    );
    for (code, kind, meaning) in rows() {
        let code_cell = format!("{:<5}", code);
        let code_cell = if code == 0 {
            style(code_cell).green()
        } else {
            style(code_cell).yellow()
        };
        println!("{} {:<16} {}", code_cell, kind, meaning);
    }
}
