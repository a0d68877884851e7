//! `triveridb` command-line entry point (component M + K glue).
//!
//! Four subcommands mirroring spec.md §6 exactly. This is the thin wrapper
//! spec.md §1 calls out as "no algorithmic substance": argument parsing,
//! opening the store, calling into the library modules, and mapping the
//! result onto stdout/stderr/exit-code per the table in §6.

mod differ;
mod error;
mod export;
mod mapper;
mod query;
mod reader;
mod sparql;
mod store;
mod turtle;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use store::Store;

#[derive(Parser)]
#[command(name = "triveridb", version, about = "A minimal RDF triple-store toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a Turtle document and print the number of triples it contains.
    CountTriples {
        /// Path to the Turtle document. Omit to read from stdin.
        file: Option<PathBuf>,
    },
    /// Reconcile a Turtle document against a named graph already in the database.
    Import {
        /// Path to the SQLite database file.
        database: PathBuf,
        /// IRI of the named graph (model) to import into.
        model_uri: String,
        /// Path to the Turtle document to import.
        model_path: PathBuf,
    },
    /// Emit a named graph from the database as Turtle.
    Export {
        /// Path to the SQLite database file.
        database: PathBuf,
        /// IRI of the named graph (model) to export.
        model_uri: String,
    },
    /// Parse a SPARQL SELECT query, translate it to SQL, and run it.
    Sparql {
        /// Print the generated SQL instead of executing it.
        #[arg(short, long)]
        sql: bool,
        /// Path to the SQLite database file.
        database: PathBuf,
        /// The SPARQL SELECT query text.
        query: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    match Cli::parse().command {
        Command::CountTriples { file } => match file {
            Some(path) => count_triples(&path),
            None => {
                Cli::command().find_subcommand("count-triples").unwrap().clone().print_help()?;
                println!();
                Ok(())
            }
        },
        Command::Import { database, model_uri, model_path } => {
            import(&database, &model_uri, &model_path)
        }
        Command::Export { database, model_uri } => export_model(&database, &model_uri),
        Command::Sparql { sql, database, query } => run_sparql(sql, &database, &query),
    }
}

fn count_triples(file: &std::path::Path) -> Result<()> {
    let reader = File::open(file).with_context(|| format!("failed to open {}", file.display()))?;
    let mut count = 0usize;
    turtle::parse::<_, ()>(reader, |_triple| {
        count += 1;
        None
    })
    .map_err(anyhow::Error::from)
    .context("failed to parse Turtle document")?;
    println!("{count}");
    Ok(())
}

fn import(database: &std::path::Path, model_uri: &str, model_path: &std::path::Path) -> Result<()> {
    let store = Store::open(
        database
            .to_str()
            .context("database path is not valid UTF-8")?,
    )
    .context("failed to open database")?;

    let file = File::open(model_path)
        .with_context(|| format!("failed to open {}", model_path.display()))?;

    let mut triples = Vec::new();
    turtle::parse::<_, ()>(file, |triple| {
        triples.push(triple);
        None
    })
    .map_err(anyhow::Error::from)
    .context("failed to parse Turtle document")?;

    let result = differ::import(&store, model_uri, triples).context("import failed")?;

    eprintln!(
        "{} duplicates removed, {} added, {} removed",
        result.duplicates_removed, result.added, result.removed
    );
    Ok(())
}

fn export_model(database: &std::path::Path, model_uri: &str) -> Result<()> {
    let store = Store::open(
        database
            .to_str()
            .context("database path is not valid UTF-8")?,
    )
    .context("failed to open database")?;

    let model_id = store.lookup_resource(model_uri).context("lookup failed")?;
    if model_id == store::NOT_FOUND {
        return Ok(());
    }

    let rows = store.export_rows(model_id).context("failed to read model")?;
    let turtle_text = export::export(&rows);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    out.write_all(turtle_text.as_bytes())?;
    out.flush()?;
    Ok(())
}

fn run_sparql(sql_only: bool, database: &std::path::Path, query_text: &str) -> Result<()> {
    let store = Store::open(
        database
            .to_str()
            .context("database path is not valid UTF-8")?,
    )
    .context("failed to open database")?;

    let mapped = match sparql::parse(query_text)
        .map_err(anyhow::Error::from)
        .and_then(|ast| mapper::map(&store, &ast).map_err(anyhow::Error::from))
    {
        Ok(mapped) => mapped,
        Err(e) => {
            if sql_only {
                bail!(e);
            }
            let stdout = io::stdout();
            query::write_error_xml(stdout.lock(), &e.to_string())?;
            return Ok(());
        }
    };

    if sql_only {
        println!("{}", mapped.sql);
        return Ok(());
    }

    let stdout = io::stdout();
    match query::execute(&store, &mapped) {
        Ok(results) => query::write_results_xml(stdout.lock(), &results)?,
        Err(e) => query::write_error_xml(stdout.lock(), &e.to_string())?,
    }
    Ok(())
}
