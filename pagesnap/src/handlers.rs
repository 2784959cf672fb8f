use anyhow::Context;
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use pagesnap_bundler::error::SnapshotError;
use pagesnap_bundler::result::PageSnapshot;
use pagesnap_bundler::{ImportMode, Snapshotter, VariableScope};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Normalize the URL argument, prefixing `https://` when the scheme is
/// missing. `None` when no prefix makes it parseable.
pub fn parse_target_url(raw: &str) -> Option<String> {
    if Url::parse(raw).is_ok() {
        return Some(raw.to_string());
    }

    let with_scheme = format!("https://{}", raw);
    if Url::parse(&with_scheme).is_ok() {
        return Some(with_scheme);
    }

    None
}

pub fn error_payload(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

/// Serialize a capture outcome. A terminal failure becomes the
/// `{"error": ...}` payload; partial per-asset failures never surface here.
pub fn render_outcome(
    outcome: &Result<PageSnapshot, SnapshotError>,
    pretty: bool,
) -> String {
    match outcome {
        Ok(snapshot) => {
            let serialized = if pretty {
                serde_json::to_string_pretty(snapshot)
            } else {
                serde_json::to_string(snapshot)
            };
            serialized.unwrap_or_else(|e| error_payload(&format!("Serialization failed: {}", e)))
        }
        Err(e) => error_payload(&e.to_string()),
    }
}

/// Write the payload to a tilde-expandable path.
pub fn write_output(path: &PathBuf, payload: &str) -> anyhow::Result<()> {
    let expanded = shellexpand::tilde(&path.display().to_string()).into_owned();
    fs::write(&expanded, payload)
        .with_context(|| format!("Failed to write snapshot to {}", expanded))?;
    Ok(())
}

pub async fn handle_snapshot(sub_matches: &ArgMatches) {
    // Logs go to stderr; stdout carries the JSON payload.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let quiet = sub_matches.get_flag("quiet");

    let Some(raw_url) = sub_matches.get_one::<String>("URL") else {
        println!("{}", error_payload("No URL provided"));
        std::process::exit(1);
    };

    // An argument that cannot be made parseable still goes to the engine;
    // the failed root fetch produces the error payload.
    let page_url = parse_target_url(raw_url).unwrap_or_else(|| raw_url.clone());

    let import_mode = sub_matches
        .get_one::<String>("imports")
        .and_then(|mode| ImportMode::from_str(mode))
        .unwrap_or(ImportMode::Recursive);
    let variable_scope = sub_matches
        .get_one::<String>("variables")
        .and_then(|scope| VariableScope::from_str(scope))
        .unwrap_or(VariableScope::RootOnly);
    let depth = *sub_matches.get_one::<usize>("depth").unwrap_or(&3);

    debug!(
        "Options: imports={:?}, variables={:?}, depth={}",
        import_mode, variable_scope, depth
    );

    let spinner = if quiet {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap(),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Snapshotting {}", page_url));
        Some(pb)
    };

    let snapshotter = Snapshotter::new()
        .with_import_mode(import_mode)
        .with_variable_scope(variable_scope)
        .with_max_import_depth(depth);

    let outcome = snapshotter.capture(&page_url).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let payload = render_outcome(&outcome, sub_matches.get_flag("pretty"));

    match sub_matches.get_one::<PathBuf>("output") {
        Some(path) => {
            if let Err(e) = write_output(path, &payload) {
                eprintln!("{} {}", "✗".red().bold(), e);
                std::process::exit(1);
            }
            if !quiet {
                eprintln!(
                    "{} Snapshot saved to {}",
                    "✓".green().bold(),
                    path.display()
                );
            }
        }
        None => println!("{}", payload),
    }
}
