use colored::Colorize;
use pagesnap::handlers::handle_snapshot;

mod commands;

#[tokio::main]
async fn main() {
    let cmd = commands::command_argument_builder();
    let matches = cmd.get_matches();
    let quiet = matches.get_flag("quiet");

    // Banner goes to stderr so stdout stays pipeable JSON.
    if !quiet {
        print_banner();
    }

    handle_snapshot(&matches).await;
}

fn print_banner() {
    eprintln!("{}", "pagesnap".bright_cyan().bold());
    eprintln!(
        "{}",
        format!(
            "v{} - self-contained web page snapshots",
            env!("CARGO_PKG_VERSION")
        )
        .bright_black()
    );
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
