//! Smart Redirect CLI
//!
//! Manage redirect rules in a JSON store file and try them against URLs.
//! Every command runs the same flow as the extension: a background is
//! started over the store, edits are persisted and then announced to it.

mod commands;
mod prompt;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sr-cli")]
#[command(about = "Smart Redirect rule manager")]
struct Cli {
    /// JSON store file
    #[arg(long, global = true, default_value = "redirect-store.json")]
    store: String,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List rules in match order
    List,

    /// Add a redirect rule
    Add {
        /// Website to redirect from, e.g. example.com
        source: String,

        /// URL to redirect to
        destination: String,

        /// How the source is compared with the hostname
        #[arg(short, long = "match", default_value = "exact", value_parser = ["exact", "contains", "startswith"])]
        match_type: String,
    },

    /// Change a rule (it moves to the end of the list)
    Edit {
        /// Rule id
        id: String,

        #[arg(long)]
        source: Option<String>,

        #[arg(long)]
        destination: Option<String>,

        #[arg(short, long = "match", value_parser = ["exact", "contains", "startswith"])]
        match_type: Option<String>,
    },

    /// Delete a rule
    Delete {
        /// Rule id
        id: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Enable or disable a single rule
    Toggle {
        /// Rule id
        id: String,
    },

    /// Turn redirecting on
    Enable,

    /// Turn redirecting off without touching the rules
    Disable,

    /// Export rules to a JSON file
    Export {
        /// Output file, `-` for stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Import rules from a JSON file
    Import {
        /// File to import
        input: String,

        /// Replace all current rules
        #[arg(long, conflicts_with = "merge")]
        replace: bool,

        /// Keep current rules and add new ones
        #[arg(long)]
        merge: bool,
    },

    /// Delete all rules
    Clear {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Show what would happen when navigating to a URL
    Check {
        url: String,

        /// Browser request type
        #[arg(short = 't', long = "type", default_value = "main_frame")]
        request_type: String,
    },

    /// Show the popup summary, optionally for a page
    Status {
        #[arg(short, long)]
        url: Option<String>,
    },

    /// Redirect the website of a page URL
    QuickAdd {
        /// Page whose hostname becomes the rule source
        url: String,

        /// URL to redirect to
        destination: String,
    },

    /// Send a raw message to the background, e.g. '{"action":"getRules"}'
    Message {
        json: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    let store = cli.store.as_str();
    let result = match cli.command {
        Commands::List => commands::cmd_list(store),
        Commands::Add {
            source,
            destination,
            match_type,
        } => commands::cmd_add(store, &source, &destination, &match_type),
        Commands::Edit {
            id,
            source,
            destination,
            match_type,
        } => commands::cmd_edit(store, &id, source, destination, match_type.as_deref()),
        Commands::Delete { id, yes } => commands::cmd_delete(store, &id, yes),
        Commands::Toggle { id } => commands::cmd_toggle(store, &id),
        Commands::Enable => commands::cmd_set_enabled(store, true),
        Commands::Disable => commands::cmd_set_enabled(store, false),
        Commands::Export { output } => commands::cmd_export(store, output.as_deref()),
        Commands::Import { input, replace, merge } => commands::cmd_import(store, &input, replace, merge),
        Commands::Clear { yes } => commands::cmd_clear(store, yes),
        Commands::Check { url, request_type } => commands::cmd_check(store, &url, &request_type),
        Commands::Status { url } => commands::cmd_status(store, url),
        Commands::QuickAdd { url, destination } => commands::cmd_quick_add(store, &url, &destination),
        Commands::Message { json } => commands::cmd_message(store, &json),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
