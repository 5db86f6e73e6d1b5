//! Purpose: `h5scope` CLI entry point and command dispatch.
//! Role: Binary crate root; parses args, runs inspector operations, prints
//! human or JSON output on stdout.
//! Invariants: Errors are emitted as JSON objects on stderr when stderr is
//! not a terminal, human text otherwise.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: SIGINT cancels in-flight export/search between chunks
//! instead of killing the process mid-write.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use h5scope::api::{
    format_descriptor, format_sample, format_table, parse_row_selection, to_exit_code,
    CancelToken, Error, ErrorKind, ExportOutcome, ExportRequest, Inspector, NodeKind,
    SearchRequest, DEFAULT_CHUNK_ROWS, DEFAULT_MAX_ELEMENTS,
};

#[derive(Parser)]
#[command(name = "h5scope", version, about = "Inspect HDF5 files and export selections to CSV")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List leaf datasets and stored tables in a file
    List {
        file: PathBuf,
        /// Emit one JSON array instead of human text
        #[arg(long)]
        json: bool,
    },
    /// Show the inferred schema of one node
    Info {
        file: PathBuf,
        node: String,
        #[arg(long)]
        json: bool,
    },
    /// Preview a bounded sample of one node
    Show {
        file: PathBuf,
        node: String,
        /// Element budget for the sample
        #[arg(long, default_value_t = DEFAULT_MAX_ELEMENTS)]
        max_elements: usize,
    },
    /// Export selected rows/columns of a node to CSV
    Export {
        file: PathBuf,
        node: String,
        /// Output CSV path
        #[arg(short, long)]
        output: PathBuf,
        /// Comma-separated column names (default: all inferred columns)
        #[arg(long)]
        columns: Option<String>,
        /// Row selection, e.g. `1-100,200,500` (default: all rows)
        #[arg(long)]
        rows: Option<String>,
        /// Rows per chunk
        #[arg(long, default_value_t = DEFAULT_CHUNK_ROWS)]
        chunk_size: usize,
    },
    /// Scan a column for rows exactly matching a value
    Find {
        file: PathBuf,
        node: String,
        /// Column to scan
        #[arg(long)]
        column: String,
        /// Exact value to match, as text
        #[arg(long)]
        value: String,
        /// Write matching rows to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Preview row limit in human output
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Generate shell completions
    Completions { shell: Shell },
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(()) => 0,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<(), Error> {
    let cli = Cli::parse();
    match cli.command {
        Command::List { file, json } => cmd_list(&file, json),
        Command::Info { file, node, json } => cmd_info(&file, &node, json),
        Command::Show {
            file,
            node,
            max_elements,
        } => cmd_show(&file, &node, max_elements),
        Command::Export {
            file,
            node,
            output,
            columns,
            rows,
            chunk_size,
        } => cmd_export(&file, &node, output, columns, rows, chunk_size),
        Command::Find {
            file,
            node,
            column,
            value,
            output,
            limit,
        } => cmd_find(&file, &node, column, value, output, limit),
        Command::Completions { shell } => {
            let mut command = Cli::command();
            let name = command.get_name().to_string();
            clap_complete::generate(shell, &mut command, name, &mut io::stdout());
            Ok(())
        }
    }
}

fn cmd_list(file: &PathBuf, json: bool) -> Result<(), Error> {
    let inspector = Inspector::open(file)?;
    let entries = inspector.list()?;
    if json {
        println!("{}", serde_json::to_string(&entries).map_err(json_error)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("no datasets found");
        return Ok(());
    }
    for entry in entries {
        match entry.kind {
            NodeKind::Table => println!("{}  [table]", entry.path),
            _ => println!("{}", entry.path),
        }
    }
    Ok(())
}

fn cmd_info(file: &PathBuf, node: &str, json: bool) -> Result<(), Error> {
    let inspector = Inspector::open(file)?;
    let descriptor = inspector.describe(node)?;
    if json {
        println!("{}", serde_json::to_string(&descriptor).map_err(json_error)?);
    } else {
        println!("{}", format_descriptor(&descriptor));
    }
    Ok(())
}

fn cmd_show(file: &PathBuf, node: &str, max_elements: usize) -> Result<(), Error> {
    let inspector = Inspector::open(file)?;
    let descriptor = inspector.describe(node)?;
    if descriptor.kind == NodeKind::Table {
        // Stored tables preview as a row-bounded table read.
        let n_cols = descriptor.columns.len().max(1);
        let rows = (max_elements / n_cols).max(1);
        let table = inspector.read(node, Some((0, rows)))?;
        println!("{}", format_table(&table, descriptor.row_count));
        return Ok(());
    }
    let sample = inspector.sample(node, max_elements)?;
    println!("{}", format_sample(&sample));
    Ok(())
}

fn cmd_export(
    file: &PathBuf,
    node: &str,
    output: PathBuf,
    columns: Option<String>,
    rows: Option<String>,
    chunk_size: usize,
) -> Result<(), Error> {
    // Row selection parses before the file is touched.
    let selection = parse_row_selection(rows.as_deref().unwrap_or(""))?;
    let inspector = Inspector::open(file)?;
    let mut request = ExportRequest::new(node, output);
    request.rows = selection;
    request.chunk_rows = chunk_size;
    if let Some(columns) = columns {
        request.columns = columns
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
    }

    let cancel = cancel_on_interrupt()?;
    let outcome = inspector.export(&request, progress_to_stderr, &cancel)?;
    match outcome {
        ExportOutcome::Complete {
            rows_written,
            chunks,
            columns,
            dropped_columns,
        } => {
            if !dropped_columns.is_empty() {
                eprintln!("warning: skipped missing columns: {}", dropped_columns.join(", "));
            }
            println!(
                "exported {rows_written} rows x {} columns in {chunks} chunks to {}",
                columns.len(),
                request.output.display()
            );
        }
        ExportOutcome::Cancelled {
            chunks_written,
            rows_written,
        } => {
            println!(
                "cancelled after {chunks_written} chunks ({rows_written} rows); partial file left at {}",
                request.output.display()
            );
        }
    }
    Ok(())
}

fn cmd_find(
    file: &PathBuf,
    node: &str,
    column: String,
    value: String,
    output: Option<PathBuf>,
    limit: usize,
) -> Result<(), Error> {
    let inspector = Inspector::open(file)?;
    let request = SearchRequest::new(node, column.clone(), value.clone());
    let cancel = cancel_on_interrupt()?;
    let outcome = inspector.search(&request, progress_to_stderr, &cancel)?;

    if outcome.cancelled {
        println!(
            "cancelled after {}/{} chunks; {} matches so far",
            outcome.chunks_scanned,
            outcome.total_chunks,
            outcome.matches.n_rows()
        );
        return Ok(());
    }
    if outcome.matches.is_empty() {
        println!("no rows found where `{column}` exactly equals `{value}`");
    } else {
        println!(
            "found {} rows x {} columns where `{column}` == `{value}`",
            outcome.matches.n_rows(),
            outcome.matches.n_cols()
        );
        println!("{}", format_table(&outcome.matches.head(limit), Some(outcome.matches.n_rows())));
    }

    // The output file is written even for an empty result, so a caller
    // scripting around `find` always gets a CSV with the header row.
    if let Some(output) = output {
        if outcome.matches.n_cols() == 0 {
            println!("skipped {}: no columns to write", output.display());
            return Ok(());
        }
        let mut writer = csv::Writer::from_path(&output).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("cannot open output: {err}"))
                .with_path(output.clone())
        })?;
        writer
            .write_record(outcome.matches.columns())
            .map_err(|err| Error::new(ErrorKind::Io).with_message(err.to_string()))?;
        for row in outcome.matches.rows() {
            writer
                .write_record(row.iter().map(|cell| cell.render()))
                .map_err(|err| Error::new(ErrorKind::Io).with_message(err.to_string()))?;
        }
        writer.flush().map_err(Error::from)?;
        println!("wrote {} matching rows to {}", outcome.matches.n_rows(), output.display());
    }
    Ok(())
}

fn progress_to_stderr(percent: f64, message: &str) {
    eprintln!("[{percent:5.1}%] {message}");
    let _ = io::stderr().flush();
}

/// SIGINT flips the cancel token so long scans stop at the next chunk
/// boundary instead of dying mid-write.
fn cancel_on_interrupt() -> Result<CancelToken, Error> {
    let cancel = CancelToken::new();
    signal_hook::flag::register(signal_hook::consts::SIGINT, cancel.as_flag())
        .map_err(Error::from)?;
    Ok(cancel)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn json_error(err: serde_json::Error) -> Error {
    Error::new(ErrorKind::Internal)
        .with_message("json encode failed")
        .with_source(err)
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        match err.hint() {
            Some(hint) => eprintln!("error: {err}\n  hint: {hint}"),
            None => eprintln!("error: {err}"),
        }
        return;
    }
    let value = json!({
        "error": {
            "kind": format!("{:?}", err.kind()),
            "message": err.to_string(),
            "hint": err.hint(),
        }
    });
    let text = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{text}");
}
