//! Schemagraph CLI
//!
//! Command-line interface for SDF event schemas:
//! - Assembling the classified graph of a schema document
//! - Extracting the one-step subgraph around a node (or the root)
//! - Listing the entity catalogue
//! - Printing the schema dictionary that filters node fields
//! - Renumbering ids into canonical form (`*_reordered.json` + `*_id_mapping.csv`)
//! - Serving the interactive editing API

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::Level;

use schemagraph_graph::{assemble, entity_catalogue, extract_subgraph, Anchor};
use schemagraph_model::{Document, RecordKind, SchemaDictionary};
use schemagraph_renumber::{output_paths, render_document, RenumberOptions, Renumberer};

mod server;

#[derive(Parser)]
#[command(name = "schemagraph")]
#[command(author, version, about = "Schemagraph: SDF event schema graphs")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble the classified graph of a schema document.
    Graph {
        /// Input schema JSON
        input: PathBuf,
        /// Write the graph here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print the subgraph one step around a node.
    Subgraph {
        /// Input schema JSON
        input: PathBuf,
        /// Node id, or `root` for the first root event
        #[arg(short, long, default_value = "root")]
        node: String,
    },

    /// List every declared entity with the events that declare and use it.
    Entities {
        /// Input schema JSON
        input: PathBuf,
    },

    /// Print the schema dictionary: the fields copied onto nodes, per record kind.
    Dictionary,

    /// Rewrite ids into canonical numbered form.
    ///
    /// Each input gets `<stem>_reordered.json` and `<stem>_id_mapping.csv`
    /// written next to it.
    Renumber {
        /// Input schema JSON files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Namespace prefix for new ids
        #[arg(long, default_value = "resin:")]
        namespace: String,
        /// Zero-padded width of the numeric segment
        #[arg(long, default_value_t = 5)]
        width: usize,
    },

    /// Serve the editing API over HTTP.
    Serve(ServeArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Listen address (use port 0 for an ephemeral port)
    #[arg(long, default_value = "127.0.0.1:5000")]
    listen: SocketAddr,
    /// Schema document to load at startup
    #[arg(long)]
    preload: Option<PathBuf>,
    /// Write `{"addr", "pid"}` here once the listener is bound
    #[arg(long)]
    ready_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Graph { input, out } => cmd_graph(&input, out.as_deref()),
        Commands::Subgraph { input, node } => cmd_subgraph(&input, &node),
        Commands::Entities { input } => cmd_entities(&input),
        Commands::Dictionary => cmd_dictionary(),
        Commands::Renumber {
            inputs,
            namespace,
            width,
        } => cmd_renumber(&inputs, RenumberOptions { namespace, width }),
        Commands::Serve(args) => server::run_server(server::ServerConfig {
            listen: args.listen,
            preload: args.preload,
            ready_file: args.ready_file,
        }),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn read_document(path: &Path) -> Result<Document> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Document::from_json_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_graph(input: &Path, out: Option<&Path>) -> Result<()> {
    let document = read_document(input)?;
    let graph = assemble(&document)?;
    let text = serde_json::to_string_pretty(&graph)?;

    match out {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "{} {} ({} nodes, {} edges)",
                "wrote".green().bold(),
                path.display().to_string().bold(),
                graph.nodes().len(),
                graph.edges().len()
            );
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn cmd_subgraph(input: &Path, node: &str) -> Result<()> {
    let document = read_document(input)?;
    let graph = assemble(&document)?;
    let view = extract_subgraph(&graph, &Anchor::parse(node))?;
    print_json(&serde_json::json!({
        "name": view.name,
        "subgraph": view.subgraph,
    }))
}

fn cmd_entities(input: &Path) -> Result<()> {
    let document = read_document(input)?;
    print_json(&entity_catalogue(&document))
}

#[derive(Serialize)]
struct DictionaryReport {
    version: &'static str,
    records: Vec<DictionarySection>,
}

#[derive(Serialize)]
struct DictionarySection {
    kind: RecordKind,
    fields: &'static [&'static str],
}

fn cmd_dictionary() -> Result<()> {
    let dictionary = SchemaDictionary;
    print_json(&DictionaryReport {
        version: dictionary.version(),
        records: dictionary
            .entries()
            .map(|(kind, fields)| DictionarySection { kind, fields })
            .collect(),
    })
}

fn cmd_renumber(inputs: &[PathBuf], options: RenumberOptions) -> Result<()> {
    let renumberer = Renumberer::new(options)?;
    for input in inputs {
        let mut document = read_document(input)?;
        let mapping = renumberer
            .renumber(&mut document)
            .map_err(|e| anyhow!("renumber {}: {e}", input.display()))?;

        let (doc_path, csv_path) = output_paths(input);
        fs::write(&doc_path, render_document(&document)?)
            .with_context(|| format!("failed to write {}", doc_path.display()))?;
        fs::write(&csv_path, mapping.to_csv())
            .with_context(|| format!("failed to write {}", csv_path.display()))?;

        eprintln!(
            "{} {} ({} ids)",
            "wrote".green().bold(),
            doc_path.display().to_string().bold(),
            mapping.len()
        );
        eprintln!("{} {}", "wrote".green().bold(), csv_path.display().to_string().bold());
    }
    Ok(())
}
