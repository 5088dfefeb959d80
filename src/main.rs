use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use userdeck::api::{PaginatedResult, PanelClient, User};
use userdeck::common::config::DocumentedConfig;
use userdeck::config::AppConfig;
use userdeck::ui::{self, Level, OutputFormat};
use userdeck::users::{self, Sort, parse_filters};

/// Terminal admin console for panel users
#[derive(Parser, Debug)]
#[command(name = "userdeck", author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode (also records API requests to the request log)
    #[arg(short, long, global = true)]
    debug: bool,

    /// Output format for non-interactive commands
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Browse users interactively (default)
    Tui {
        /// Initial search, e.g. `username:alice`
        #[arg(short, long)]
        search: Option<String>,
        /// Sort column, prefix with `-` for descending
        #[arg(long)]
        sort: Option<Sort>,
    },

    /// Print one page of users
    List {
        /// Search in `field:value` syntax, or plain text to match emails
        #[arg(short, long)]
        search: Option<String>,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        /// Sort column, prefix with `-` for descending
        #[arg(long)]
        sort: Option<Sort>,
    },

    /// Show how a search string is turned into API filters
    Filters {
        #[arg(default_value = "")]
        query: String,
    },

    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Print a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the config file location
    Path,
    /// Print the effective configuration
    Show,
    /// Write a documented default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    ui::init(cli.format, !cli.no_color);
    ui::set_debug_mode(cli.debug);

    if let Err(err) = run(cli.command).await {
        ui::emit(Level::Error, "userdeck.error", &format!("{err:#}"), None);
        std::process::exit(1);
    }
}

async fn run(command: Option<Commands>) -> Result<()> {
    let command = command.unwrap_or(Commands::Tui {
        search: None,
        sort: None,
    });

    match command {
        Commands::Tui { search, sort } => {
            let config = AppConfig::load()?;
            tokio::task::block_in_place(|| users::run_users_tui(&config, search, sort))
        }
        Commands::List { search, page, sort } => list_users(search, page, sort).await,
        Commands::Filters { query } => {
            let params = parse_filters(&query);
            println!("{}", serde_json::to_string_pretty(&params)?);
            Ok(())
        }
        Commands::Config { command } => config_command(command),
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "userdeck", &mut std::io::stdout());
            Ok(())
        }
    }
}

async fn list_users(search: Option<String>, page: u32, sort: Option<Sort>) -> Result<()> {
    let config = AppConfig::load()?;
    let client = PanelClient::new(&config)?;
    let params = parse_filters(search.as_deref().unwrap_or_default())
        .with_page(page)
        .with_sort(sort);

    ui::emit(
        Level::Debug,
        "users.list.request",
        &format!("GET {} {}", client.users_url(), params.cache_key()),
        None,
    );

    let result = client
        .list_users(&params)
        .await
        .context("Failed to fetch users")?;

    match ui::get_output_format() {
        OutputFormat::Json => ui::emit(
            Level::Info,
            "users.list",
            &result.pagination.label(),
            Some(serde_json::to_value(&result)?),
        ),
        OutputFormat::Text => {
            println!("{}", users_table(&result));
            println!("{}", result.pagination.label());
        }
    }

    Ok(())
}

fn users_table(result: &PaginatedResult<User>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "Email", "Username", "Role", "2FA"]);

    for user in &result.items {
        table.add_row(vec![
            user.id.to_string(),
            user.email.clone(),
            user.username.clone(),
            user.role_label().to_string(),
            user.totp_label().to_string(),
        ]);
    }
    table
}

fn config_command(command: ConfigCommands) -> Result<()> {
    let path = <AppConfig as DocumentedConfig>::config_path()?;

    match command {
        ConfigCommands::Path => println!("{}", path.display()),
        ConfigCommands::Show => {
            let mut config = AppConfig::load()?;
            if config.api_key.is_some() {
                config.api_key = Some("********".to_string());
            }
            print!("{}", config.to_documented_string());
        }
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            AppConfig::default().save_with_documentation(&path)?;
            ui::emit(
                Level::Success,
                "config.init",
                &format!("Wrote {}", path.display()),
                None,
            );
        }
    }

    Ok(())
}
