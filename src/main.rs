use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use photobatch::batch::{BatchEditor, PhotosForm};
use photobatch::config::Config;
use photobatch::db::{SqliteDb, Store};
use photobatch::logging;

/// A batch edit request as read from JSON.
#[derive(Debug, Deserialize)]
struct Request {
    photos: Vec<String>,
    #[serde(default)]
    values: PhotosForm,
}

enum Command {
    Apply(PathBuf),
    ShowForm(Vec<String>),
}

struct Args {
    config_path: Option<PathBuf>,
    db_path: Option<PathBuf>,
    command: Command,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut db_path = None;
    let mut show_form = false;
    let mut positional = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("photobatch {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" | "--db" => {
                if i + 1 < args.len() {
                    let path = Some(PathBuf::from(&args[i + 1]));
                    if args[i] == "--db" {
                        db_path = path;
                    } else {
                        config_path = path;
                    }
                    i += 1;
                } else {
                    eprintln!("Error: {} requires a path argument", args[i]);
                    std::process::exit(1);
                }
            }
            "--show-form" => show_form = true,
            arg if arg.starts_with('-') => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
            arg => positional.push(arg.to_string()),
        }
        i += 1;
    }

    let command = if show_form {
        Command::ShowForm(positional)
    } else if positional.len() == 1 {
        Command::Apply(PathBuf::from(&positional[0]))
    } else {
        print_help();
        std::process::exit(1);
    };

    Args {
        config_path,
        db_path,
        command,
    }
}

fn print_help() {
    println!(
        r#"photobatch - apply one metadata edit to many photos

USAGE:
    photobatch [OPTIONS] <REQUEST.json>
    photobatch [OPTIONS] --show-form <PHOTO_UID>...

OPTIONS:
    --config, -c PATH   Path to config file
    --db PATH           Path to the SQLite database (overrides config)
    --show-form         Print the edit form for a selection as JSON
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    PHOTOBATCH_LOG      Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/photobatch/config.toml"#
    );
}

fn main() -> Result<()> {
    let args = parse_args();

    let _ = logging::init(None);

    let config = match &args.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let db_path = args.db_path.unwrap_or_else(|| config.database.path.clone());
    let db = SqliteDb::open(&db_path, config.busy_timeout())
        .with_context(|| format!("Failed to open database {:?}", db_path))?;
    db.initialize()?;

    match args.command {
        Command::ShowForm(uids) => {
            let mut photos = Vec::with_capacity(uids.len());
            for uid in &uids {
                match db.load_photo(uid)? {
                    Some(photo) => photos.push(photo),
                    None => bail!("Photo not found: {}", uid),
                }
            }
            let form = PhotosForm::from_photos(&photos);
            println!("{}", serde_json::to_string_pretty(&form)?);
        }
        Command::Apply(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read request {:?}", path))?;
            let request: Request = serde_json::from_str(&content)
                .with_context(|| format!("Invalid request {:?}", path))?;

            let priorities = config.priority_table();
            let editor = BatchEditor::new(&db, &priorities)
                .retry_policy(config.retry_policy())
                .album_type(config.batch.default_album_type.clone());

            let mut cache = HashMap::new();
            let result = editor.apply(&request.photos, &request.values, &mut cache)?;

            println!("{}", result);
            for e in &result.errors {
                eprintln!("  {}", e);
            }
        }
    }

    Ok(())
}
