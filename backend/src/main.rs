//! Gridform CLI - manage a tabular dataset from the terminal
//!
//! # Commands
//!
//! ```bash
//! gridform serve                        # Start HTTP server (port 3000)
//! gridform import people.csv            # Replace the dataset from a file
//! gridform show                         # Print the grid
//! gridform edit 2 --set name=Bob        # Edit one record
//! gridform export --format csv -o out.csv
//! gridform reconcile form.json          # Load a grouped form spec
//! gridform clear                        # Drop the stored snapshot
//! ```
//!
//! Every command works on the snapshot under `--key` in `--data-dir`.

use clap::{Parser, Subcommand};
use gridform::{
    decode_bytes_auto, edit::InputKind, models::value_to_text, EngineConfig, FileFormat,
    FileStore, FormSection, GridEngine, Record, EMPTY_CELL,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gridform")]
#[command(about = "Tabular data engine: import, edit and export grids", long_about = None)]
struct Cli {
    /// Directory holding stored snapshots (env: GRIDFORM_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Storage key of the snapshot (env: GRIDFORM_STORAGE_KEY)
    #[arg(long, global = true)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on (env: GRIDFORM_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Replace the dataset with a JSON or CSV file
    Import {
        /// Input file (.json or .csv)
        input: PathBuf,
    },

    /// Export the dataset
    Export {
        /// Output format: json or csv
        #[arg(short, long, default_value = "json")]
        format: FileFormat,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the current grid
    Show,

    /// Edit one record; the committed values replace the record entirely
    Edit {
        /// Record index (0-based)
        index: usize,

        /// Set a value, e.g. --set name=Bob (repeatable)
        #[arg(short, long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Remove a key from the record (repeatable)
        #[arg(long = "drop", value_name = "KEY")]
        drop: Vec<String>,
    },

    /// Load a grouped form spec (JSON array of sections) into the grid
    Reconcile {
        /// Form spec JSON file
        input: PathBuf,

        /// Also write the resulting dataset as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Clear the grid and the stored snapshot
    Clear,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let port = match &cli.command {
        Commands::Serve { port } => *port,
        _ => None,
    };
    let config = EngineConfig::from_env().with_overrides(cli.data_dir, cli.key, port);

    let result = match cli.command {
        Commands::Serve { .. } => cmd_serve(config).await,
        Commands::Import { input } => cmd_import(&config, &input),
        Commands::Export { format, output } => cmd_export(&config, format, output.as_deref()),
        Commands::Show => cmd_show(&config),
        Commands::Edit { index, set, drop } => cmd_edit(&config, index, &set, &drop),
        Commands::Reconcile { input, output } => cmd_reconcile(&config, &input, output.as_deref()),
        Commands::Clear => cmd_clear(&config),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn open_engine(config: &EngineConfig) -> GridEngine<FileStore> {
    GridEngine::init(FileStore::with_dir(&config.data_dir), config.storage_key.clone())
}

async fn cmd_serve(config: EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    gridform::server::start_server(config).await
}

fn cmd_import(config: &EngineConfig, input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Importing: {}", input.display());

    let bytes = fs::read(input)?;
    let mut engine = open_engine(config);
    let dataset = engine.import_file(&input.to_string_lossy(), &bytes)?;

    eprintln!("   Fields: {}", dataset.keys().join(", "));
    eprintln!("✅ Imported {} records", dataset.len());
    Ok(())
}

fn cmd_export(
    config: &EngineConfig,
    format: FileFormat,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine(config);
    let export = engine.export(format)?;

    eprintln!("📦 Exporting {} records as {}", engine.dataset().len(), export.mime);
    write_output(&export.body, output)
}

fn cmd_show(config: &EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine(config);
    let dataset = engine.dataset();

    if dataset.fields.is_empty() {
        eprintln!("📋 Grid is empty.");
        eprintln!("   Use 'gridform import <file>' to load data.");
        return Ok(());
    }

    let labels: Vec<&str> = dataset.fields.iter().map(|f| f.label.as_str()).collect();
    println!("#\t{}", labels.join("\t"));

    for row in 0..dataset.len() {
        let cells: Vec<String> = dataset
            .fields
            .iter()
            .map(|f| {
                dataset
                    .cell_text(row, &f.key)
                    .unwrap_or_else(|| EMPTY_CELL.to_string())
            })
            .collect();
        println!("{}\t{}", row, cells.join("\t"));
    }

    eprintln!("\n📊 {} records, {} fields", dataset.len(), dataset.fields.len());
    Ok(())
}

fn cmd_edit(
    config: &EngineConfig,
    index: usize,
    set: &[String],
    drop: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = open_engine(config);
    let draft = engine.on_edit_requested(index)?;

    eprintln!("✏️  Editing record {}", index);
    for field in &draft.fields {
        eprintln!("   {}: {}", field.label, value_to_text(&field.default));
    }

    // Start from the draft, as a submitted form would
    let mut values: Record = draft.values();

    for assignment in set {
        let (key, raw) = assignment
            .split_once('=')
            .ok_or_else(|| format!("Expected KEY=VALUE, got '{}'", assignment))?;

        let checkbox = draft
            .fields
            .iter()
            .any(|f| f.key == key && f.input == InputKind::Checkbox);
        let value = if checkbox {
            Value::Bool(raw.parse().map_err(|_| format!("'{}' expects true or false", key))?)
        } else {
            Value::String(raw.to_string())
        };
        values.insert(key.to_string(), value);
    }

    for key in drop {
        values.remove(key);
    }

    let index = engine.on_edit_committed(values)?;
    eprintln!("✅ Record {} saved", index);
    Ok(())
}

fn cmd_reconcile(
    config: &EngineConfig,
    input: &Path,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("🧩 Reconciling form spec: {}", input.display());

    let content = decode_bytes_auto(&fs::read(input)?)?;
    let sections: Vec<FormSection> = serde_json::from_str(&content)?;

    let mut engine = open_engine(config);
    let dataset = engine.load_form_spec(&sections)?;
    eprintln!("   Fields: {}", dataset.keys().join(", "));
    eprintln!("✅ {} records", dataset.len());

    if let Some(path) = output {
        write_output(&engine.export_json()?, Some(path))?;
    }
    Ok(())
}

fn cmd_clear(config: &EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = open_engine(config);
    engine.clear()?;
    eprintln!("🗑️  Cleared '{}'", config.storage_key);
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
