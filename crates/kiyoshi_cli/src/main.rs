//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `kiyoshi_core` linkage with deterministic output.
//! - Normalize a Kiyoshi list file: `kiyoshi_cli [path.json]`.

use std::process::ExitCode;

fn main() -> ExitCode {
    println!("kiyoshi_core ping={}", kiyoshi_core::ping());
    println!("kiyoshi_core version={}", kiyoshi_core::core_version());

    let Some(path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };
    match normalize_file(&path) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("kiyoshi_cli: {path}: {message}");
            ExitCode::FAILURE
        }
    }
}

fn normalize_file(path: &str) -> Result<String, String> {
    let raw = std::fs::read_to_string(path).map_err(|err| err.to_string())?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|err| format!("malformed JSON: {err}"))?;
    let payloads = kiyoshi_core::validate_kiyoshi_list(&value).map_err(|err| err.to_string())?;
    let kiyoshies = kiyoshi_core::nested_kiyoshies(payloads).map_err(|err| err.to_string())?;
    let normalized = kiyoshi_core::normalize_kiyoshies(&kiyoshies);
    serde_json::to_string_pretty(&normalized).map_err(|err| err.to_string())
}
