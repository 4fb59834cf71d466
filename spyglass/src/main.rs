use colored::Colorize;
use commands::command_argument_builder;

mod commands;
mod handlers;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    match chosen_command.subcommand() {
        Some(("scan", primary_command)) => handlers::handle_scan(primary_command).await,
        Some(("discover", primary_command)) => handlers::handle_discover(primary_command).await,
        Some(("domainbust", primary_command)) => {
            handlers::handle_domainbust(primary_command).await
        }
        Some(("dirbust", primary_command)) => handlers::handle_dirbust(primary_command).await,
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

fn print_banner() {
    println!(
        "{}",
        r#"
                         _
  ___ _ __  _   _  __ _| | __ _ ___ ___
 / __| '_ \| | | |/ _` | |/ _` / __/ __|
 \__ \ |_) | |_| | (_| | | (_| \__ \__ \
 |___/ .__/ \__, |\__, |_|\__,_|___/___/
     |_|    |___/ |___/
"#
        .bright_cyan()
    );
    println!(
        "  {} {}\n",
        "staged domain reconnaissance".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_blue()
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
