use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use reelboard_core::board::{BoardAction, Direction};
use reelboard_core::identity::Identity;
use reelboard_kanban::config::{self, ClientConfig};
use reelboard_kanban::render::{render_board, render_item, render_status};
use reelboard_kanban::session::{ClientError, Session};

#[derive(Parser)]
#[command(name = "reelboard", about = "Reelboard - plan, script, film, post", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Config file (defaults to <config_dir>/reelboard/client.json)
    #[arg(long, global = true, env = "REELBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Column API base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Bearer token; without one the board stays on this machine
    #[arg(long, global = true, env = "REELBOARD_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Directory for the signed-out board
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the board
    Show(ShowArgs),
    /// Add a section before the last one
    AddSection(AddSectionArgs),
    /// Rename a section
    RenameSection(RenameSectionArgs),
    /// Delete a section and everything in it
    DeleteSection(SectionArgs),
    /// Add an item to a section
    AddItem(AddItemArgs),
    /// Change an item's title or description
    EditItem(EditItemArgs),
    /// Delete an item
    DeleteItem(ItemArgs),
    /// Move an item to the neighbouring section
    MoveItem(MoveItemArgs),
    /// Show one item in full, optionally moving it first
    Open(OpenArgs),
    /// Copy the signed-out board into an empty cloud board
    Migrate,
    /// Show where the board lives and whether it is saved
    Status,
}

#[derive(Args)]
struct ShowArgs {
    /// Only items whose title or description contains this text
    #[arg(long)]
    search: Option<String>,
}

#[derive(Args)]
struct AddSectionArgs {
    title: String,
    color: String,
}

#[derive(Args)]
struct RenameSectionArgs {
    id: String,
    title: String,
}

#[derive(Args)]
struct SectionArgs {
    id: String,
}

#[derive(Args)]
struct AddItemArgs {
    /// Section id
    column: String,
    title: String,
}

#[derive(Args)]
struct EditItemArgs {
    item: String,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
}

#[derive(Args)]
struct ItemArgs {
    /// Section id
    column: String,
    item: String,
}

#[derive(Args)]
struct MoveItemArgs {
    /// Section the item is in now
    column: String,
    item: String,
    #[arg(value_enum)]
    direction: DirectionArg,
}

#[derive(Args)]
struct OpenArgs {
    item: String,
    /// Move the item to the neighbouring section and keep it open
    #[arg(long = "move", value_enum)]
    move_to: Option<DirectionArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    Left,
    Right,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Left => Direction::Left,
            DirectionArg::Right => Direction::Right,
        }
    }
}

fn resolve_config(cli: &Cli) -> ClientConfig {
    let path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let mut config = config::load_config(&path);
    if let Some(url) = &cli.api_url {
        config.api_url = url.clone();
    }
    if let Some(token) = &cli.token {
        config.token = Some(token.clone());
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }
    config
}

fn usage(message: impl Into<String>) -> ClientError {
    ClientError::Usage(message.into())
}

fn require_title(title: &str) -> Result<(), ClientError> {
    if title.trim().is_empty() {
        return Err(usage("Title cannot be empty"));
    }
    Ok(())
}

/// The first and last sections anchor the pipeline and cannot be renamed
/// or deleted.
fn require_editable_section(session: &Session, id: &str) -> Result<(), ClientError> {
    let board = session.board();
    let index = board
        .column_index(id)
        .ok_or_else(|| usage(format!("No section with id {}", id)))?;
    if index == 0 || index + 1 == board.len() {
        return Err(usage(format!(
            "Section {} is the first or last section and cannot be changed",
            id
        )));
    }
    Ok(())
}

fn require_section(session: &Session, id: &str) -> Result<(), ClientError> {
    match session.board().column(id) {
        Some(_) => Ok(()),
        None => Err(usage(format!("No section with id {}", id))),
    }
}

fn require_item_in(session: &Session, column: &str, item: &str) -> Result<(), ClientError> {
    let board = session.board();
    let col = board
        .column(column)
        .ok_or_else(|| usage(format!("No section with id {}", column)))?;
    if col.find_item(item).is_none() {
        return Err(usage(format!("No item {} in section {}", item, column)));
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), ClientError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| usage(format!("Cannot encode output: {}", e)))?;
    println!("{}", text);
    Ok(())
}

async fn run(cli: Cli) -> Result<(), ClientError> {
    let config = resolve_config(&cli);
    let identity = Identity::from_token(config.token.clone());
    let session = Session::open(identity, &config).await?;

    if let Some(offer) = session.migration_offer() {
        if !matches!(cli.command, Commands::Migrate) && !cli.json {
            eprintln!(
                "You have {} items in {} local sections. Run `reelboard migrate` to move them to the cloud.",
                offer.items, offer.columns
            );
        }
    }

    let action = match cli.command {
        Commands::Show(args) => {
            let board = session.board();
            let board = match args.search.as_deref() {
                Some(query) => board.filter(query),
                None => board,
            };
            if cli.json {
                print_json(&board)?;
            } else {
                print!("{}", render_board(&board));
            }
            return Ok(());
        }
        Commands::Status => {
            let status = session.status();
            if cli.json {
                print_json(&status)?;
            } else {
                print!("{}", render_status(&status));
            }
            return Ok(());
        }
        Commands::Open(args) => {
            let view = session.open_item(&args.item)?;
            if let Some(direction) = args.move_to {
                session.dispatch(BoardAction::move_item(
                    &view.column_id,
                    &view.item_id,
                    direction.into(),
                ))?;
                session.finish().await?;
            }
            let board = session.board();
            let view = session
                .viewing()
                .ok_or_else(|| usage(format!("Item {} is no longer on the board", args.item)))?;
            if cli.json {
                let item = board.find_item(&view.item_id).map(|(_, item)| item);
                print_json(&serde_json::json!({ "view": view, "item": item }))?;
            } else {
                print!("{}", render_item(&board, &view));
            }
            return Ok(());
        }
        Commands::Migrate => {
            let board = session.migrate().await?;
            println!(
                "Migrated {} items in {} sections to the cloud.",
                board.item_count(),
                board.len()
            );
            return Ok(());
        }
        Commands::AddSection(args) => {
            require_title(&args.title)?;
            if args.color.trim().is_empty() {
                return Err(usage("Color cannot be empty"));
            }
            BoardAction::add_column(&args.title, args.color.trim())
        }
        Commands::RenameSection(args) => {
            require_title(&args.title)?;
            require_editable_section(&session, &args.id)?;
            BoardAction::rename_column(&args.id, &args.title)
        }
        Commands::DeleteSection(args) => {
            require_editable_section(&session, &args.id)?;
            BoardAction::delete_column(&args.id)
        }
        Commands::AddItem(args) => {
            require_title(&args.title)?;
            require_section(&session, &args.column)?;
            BoardAction::add_item(&args.column, &args.title)
        }
        Commands::EditItem(args) => {
            let board = session.board();
            let (_, item) = board
                .find_item(&args.item)
                .ok_or_else(|| usage(format!("No item with id {}", args.item)))?;
            let mut item = item.clone();
            if let Some(title) = args.title {
                require_title(&title)?;
                item.title = title;
            }
            if let Some(description) = args.description {
                item.description = description;
            }
            BoardAction::update_item(item)
        }
        Commands::DeleteItem(args) => {
            require_item_in(&session, &args.column, &args.item)?;
            BoardAction::delete_item(&args.column, &args.item)
        }
        Commands::MoveItem(args) => {
            require_item_in(&session, &args.column, &args.item)?;
            BoardAction::move_item(&args.column, &args.item, args.direction.into())
        }
    };

    session.dispatch(action)?;
    session.finish().await?;
    if !cli.json {
        print!("{}", render_board(&session.board()));
    } else {
        print_json(&session.board())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
