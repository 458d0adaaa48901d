//! Ontoscope CLI: ontology inspection and paper relevance assessment.
//!
//! Usage:
//!   ontoscope validate <ontology>
//!   ontoscope neighbors <ontology> <concept> [--depth N] [--relation TYPE]...
//!   ontoscope assess <ontology> --papers <file> [--paper ID]... [--concept ID]...

use clap::{Parser, Subcommand, ValueEnum};
use ontoscope::{
    load_concepts, CommandModel, ConceptGraph, ConceptId, Direction, GraphError,
    GraphRagPipeline, JsonPaperSource, LanguageModel, PaperId, PipelineConfig, RelationType,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "ontoscope",
    version,
    about = "Ontology-grounded relevance assessment of scientific papers"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    Both,
    Outgoing,
    Incoming,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Both => Direction::Both,
            DirectionArg::Outgoing => Direction::Outgoing,
            DirectionArg::Incoming => Direction::Incoming,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Load an ontology file and check graph integrity
    Validate {
        /// Concept file (JSON or YAML)
        ontology: PathBuf,
    },
    /// List the neighborhood of a concept
    Neighbors {
        /// Concept file (JSON or YAML)
        ontology: PathBuf,
        /// Concept id
        concept: String,
        /// Maximum hops
        #[arg(long, default_value_t = 1)]
        depth: usize,
        /// Relation types to follow (default: all)
        #[arg(long = "relation")]
        relations: Vec<String>,
        #[arg(long, value_enum, default_value = "both")]
        direction: DirectionArg,
    },
    /// Assess papers against the ontology and print reports as JSON
    Assess {
        /// Concept file (JSON or YAML)
        ontology: PathBuf,
        /// Paper collection (JSON array)
        #[arg(long)]
        papers: PathBuf,
        /// Paper ids to assess (default: every paper in the collection)
        #[arg(long = "paper")]
        paper_ids: Vec<String>,
        /// Assess the candidate papers of these concepts instead
        #[arg(long = "concept")]
        concepts: Vec<String>,
        /// Pipeline config file (default: ./ontoscope.yaml or the user config dir)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Ollama model name
        #[arg(long, default_value = "gpt-oss")]
        model: String,
        /// Model command to run instead of ollama, prompt on stdin
        #[arg(long)]
        model_command: Option<String>,
        /// Override configured scoring parallelism
        #[arg(long)]
        parallelism: Option<usize>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_graph(path: &Path) -> Result<ConceptGraph, GraphError> {
    let concepts = load_concepts(path)?;
    ConceptGraph::build(concepts)
}

fn open_graph(path: &Path) -> Option<ConceptGraph> {
    match load_graph(path) {
        Ok(graph) => Some(graph),
        Err(GraphError::Integrity(violations)) => {
            eprintln!("Error: {} integrity violation(s) in {}", violations.len(), path.display());
            for violation in violations {
                eprintln!("  {}", violation);
            }
            None
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            None
        }
    }
}

fn cmd_validate(ontology: &Path) -> i32 {
    let Some(graph) = open_graph(ontology) else {
        return 1;
    };
    println!(
        "{}: {} concepts, {} relations, {} roots",
        ontology.display(),
        graph.len(),
        graph.edge_count(),
        graph.roots().len()
    );
    0
}

fn cmd_neighbors(
    ontology: &Path,
    concept: &str,
    depth: usize,
    relations: &[String],
    direction: Direction,
) -> i32 {
    let Some(graph) = open_graph(ontology) else {
        return 1;
    };

    let relation_types: Vec<RelationType> = if relations.is_empty() {
        RelationType::ALL.to_vec()
    } else {
        match relations.iter().map(|r| r.parse::<RelationType>()).collect::<Result<Vec<_>, _>>() {
            Ok(types) => types,
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
    };

    let id = ConceptId::from(concept);
    match graph.neighbors_directed(&id, &relation_types, depth, direction) {
        Ok(neighbors) => {
            for neighbor in graph.most_specific_first(neighbors) {
                let label = graph.get(&neighbor).map(|c| c.display_label()).unwrap_or("");
                let depth = graph
                    .depth_of(&neighbor)
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{}\t{}\t{}", neighbor, depth, label);
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

struct AssessArgs {
    ontology: PathBuf,
    papers: PathBuf,
    paper_ids: Vec<String>,
    concepts: Vec<String>,
    config: Option<PathBuf>,
    model: String,
    model_command: Option<String>,
    parallelism: Option<usize>,
}

fn build_model(args: &AssessArgs) -> Result<CommandModel, String> {
    match &args.model_command {
        Some(command) => {
            let mut parts = command.split_whitespace();
            let program = parts
                .next()
                .ok_or_else(|| "--model-command is empty".to_string())?;
            Ok(CommandModel::new(program).with_args(parts))
        }
        None => Ok(CommandModel::ollama(&args.model)),
    }
}

fn cmd_assess(args: AssessArgs) -> i32 {
    let Some(graph) = open_graph(&args.ontology) else {
        return 1;
    };

    let loaded = match &args.config {
        Some(path) => PipelineConfig::from_file(path),
        None => PipelineConfig::load(),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if let Some(parallelism) = args.parallelism {
        config.parallelism = parallelism;
    }

    let source = match JsonPaperSource::from_file(&args.papers) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let default_ids = source.ids().to_vec();

    let model = match build_model(&args) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            return 1;
        }
    };

    rt.block_on(async {
        if !model.is_available().await {
            eprintln!("Error: model command '{}' not found on PATH", model.program());
            return 1;
        }

        let pipeline = match GraphRagPipeline::with_model(
            Arc::new(graph),
            Arc::new(source),
            Arc::new(model),
            config,
        ) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        };

        let paper_ids: Vec<PaperId> = if !args.paper_ids.is_empty() {
            args.paper_ids.iter().map(|id| PaperId::from(id.as_str())).collect()
        } else if !args.concepts.is_empty() {
            let concepts: Vec<ConceptId> =
                args.concepts.iter().map(|c| ConceptId::from(c.as_str())).collect();
            match pipeline.discover_papers(&concepts).await {
                Ok(ids) => ids,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return 1;
                }
            }
        } else {
            default_ids
        };

        let token = pipeline.cancellation_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Cancelling after in-flight calls finish...");
                token.cancel();
            }
        });

        let reports = pipeline.run(&paper_ids).await;
        let partial = reports.iter().filter(|r| r.is_partial()).count();

        match serde_json::to_string_pretty(&reports) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: failed to serialize reports: {}", e);
                return 1;
            }
        }
        for report in &reports {
            let fit = report.ontology_fit.as_ref().map_or(0.0, |f| f.total);
            eprintln!("{}: {:?}, ontology fit {:.1}/100", report.paper_id, report.verdict, fit);
            for path in &report.reasoned_paths {
                eprintln!("  {}", path.describe(pipeline.graph()));
            }
        }
        eprintln!(
            "Assessed {} paper(s), {} incomplete",
            reports.len(),
            partial
        );
        0
    })
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match cli.command {
        Commands::Validate { ontology } => cmd_validate(&ontology),
        Commands::Neighbors {
            ontology,
            concept,
            depth,
            relations,
            direction,
        } => cmd_neighbors(&ontology, &concept, depth, &relations, direction.into()),
        Commands::Assess {
            ontology,
            papers,
            paper_ids,
            concepts,
            config,
            model,
            model_command,
            parallelism,
        } => cmd_assess(AssessArgs {
            ontology,
            papers,
            paper_ids,
            concepts,
            config,
            model,
            model_command,
            parallelism,
        }),
    };
    std::process::exit(code);
}
