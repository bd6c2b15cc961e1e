use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

// Import from domgraph-core
use domgraph_core::{
    GraphAnalytics, GraphConfig, GraphStore, HashingEmbedder, PageProcessor, ProcessedPage,
    QueryBasedSearch, ReasoningStrategy,
};

// Import CLI utilities
use domgraph::PageFetcher;

#[derive(Parser)]
#[command(name = "domgraph")]
#[command(about = "Turn a web page into a knowledge graph, infer over it, and search it")]
struct Args {
    /// Path to a local HTML file
    #[arg(short, long, conflicts_with = "url")]
    input: Option<String>,

    /// Page URL to fetch (also recorded as the page's source URL)
    #[arg(short, long)]
    url: Option<String>,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Reasoning strategy to apply, in order (repeatable). Replaces the
    /// configured pipeline: TransitiveContains, ClassSimilarity, Rdfs, OwlRl
    #[arg(short, long = "strategy")]
    strategies: Vec<String>,

    /// Similarity search over element text
    #[arg(short, long)]
    search: Option<String>,

    /// Minimum similarity score (overrides config)
    #[arg(long)]
    threshold: Option<f32>,

    /// Maximum number of search hits (overrides config)
    #[arg(long)]
    top_k: Option<usize>,

    /// Pattern query, inline or a path to a query file
    #[arg(short, long)]
    query: Option<String>,

    /// Compute degree, betweenness and PageRank scores into the graph
    #[arg(long)]
    centrality: bool,

    /// Output file path (if not specified, auto-generated based on input)
    #[arg(short, long)]
    output: Option<String>,

    /// Output format: json or ntriples
    #[arg(short = 'f', long, default_value = "json")]
    output_format: String,

    /// Enable detailed profiling of all pipeline steps
    #[arg(long)]
    profile: bool,

    /// Show available config options and exit
    #[arg(long)]
    show_configs: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("domgraph=info,domgraph_core=info")),
        )
        .init();

    let args = Args::parse();

    if args.show_configs {
        show_help()?;
        return Ok(());
    }

    // Load config using the fallback loader, then apply CLI overrides
    let mut config = GraphConfig::load_with_fallback(args.config.as_deref());
    if let Some(threshold) = args.threshold {
        config.search.threshold = threshold;
    }
    if let Some(top_k) = args.top_k {
        config.search.top_k = top_k;
    }
    match &args.config {
        Some(path) => info!(path = %path, "Loaded config"),
        None => info!("Using default config"),
    }

    let mut processor = PageProcessor::new(&config);
    if !args.strategies.is_empty() {
        let strategies = args
            .strategies
            .iter()
            .map(|s| s.parse::<ReasoningStrategy>())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        processor = processor.with_strategies(strategies);
    }

    let ProcessedPage { mut store, report } =
        process_input(&args, &processor).context("Processing failed")?;

    println!("Graph metrics:");
    println!("   - Statements: {}", store.len());
    println!("   - Elements: {}", report.build.elements);
    println!("   - Text segments: {}", report.build.text_segments);
    println!("   - Inferred: {}", report.inferred);
    for (rule, elapsed) in &report.rule_timings {
        println!("   - {rule}: {}ms", elapsed.as_millis());
    }

    if args.centrality {
        print_centrality(&mut store);
    }

    let embedder = HashingEmbedder::new(config.search.dimension);
    let search = QueryBasedSearch::new(&store, &embedder, &config.search);

    if let Some(text) = &args.search {
        let hits = search.search_top(text)?;
        println!("\nSearch results for {text:?} ({} hits):", hits.len());
        for hit in hits {
            println!("   {:.3}  {}  {}", hit.score, hit.node, hit.text);
        }
    }

    if let Some(query) = &args.query {
        let text = if Path::new(query).is_file() {
            std::fs::read_to_string(query).with_context(|| format!("Failed to read query file {query}"))?
        } else {
            query.clone()
        };
        let results = search.query(&text)?;
        println!("\nQuery results ({} rows):", results.len());
        println!("   {}", results.variables.join(" | "));
        for row in results.iter() {
            let cells: Vec<String> = results
                .variables
                .iter()
                .map(|v| row.get(v).map(|t| t.to_string()).unwrap_or_default())
                .collect();
            println!("   {}", cells.join(" | "));
        }
    }

    let output_path = args.output.clone().unwrap_or_else(|| default_output_path(&args));
    save_graph(&store, &output_path, &args.output_format)?;

    Ok(())
}

fn process_input(args: &Args, processor: &PageProcessor) -> Result<ProcessedPage> {
    match (&args.input, &args.url) {
        (Some(input), _) => {
            let path = Path::new(input);
            if !path.exists() {
                bail!("Input file not found at: {input}");
            }
            Ok(processor.process_file(path, args.url.as_deref(), args.profile)?)
        }
        (None, Some(url)) => {
            let markup = PageFetcher::default().fetch(url)?;
            Ok(processor.process_markup_with_profiling(&markup, Some(url), args.profile)?)
        }
        (None, None) => bail!("Provide --input <file> or --url <url>"),
    }
}

fn default_output_path(args: &Args) -> String {
    let stem = args
        .input
        .as_ref()
        .and_then(|p| Path::new(p).file_stem())
        .and_then(|s| s.to_str())
        .unwrap_or("page");
    let extension = match args.output_format.as_str() {
        "ntriples" | "nt" => "nt",
        _ => "json",
    };
    format!("{stem}_domgraph.{extension}")
}

fn print_centrality(store: &mut GraphStore) {
    let mut scores = GraphAnalytics::compute_centrality(store);
    scores.sort_by(|a, b| b.pagerank.total_cmp(&a.pagerank));
    println!("\nMost central nodes:");
    for score in scores.iter().take(5) {
        println!(
            "   {}  pagerank={:.4} degree={:.4} betweenness={:.4}",
            score.node, score.pagerank, score.degree, score.betweenness
        );
    }
}

fn show_help() -> Result<()> {
    println!("\nAvailable Configuration Options:");
    println!("  --config <path>         Load custom config file");
    println!("  --input <path>          HTML file to process");
    println!("  --url <url>             Fetch and process a page");
    println!("  --strategy <name>       Reasoning strategy (repeatable): TransitiveContains, ClassSimilarity, Rdfs, OwlRl");
    println!("  --search <text>         Similarity search over element text");
    println!("  --query <text|path>     Pattern query (SELECT ... WHERE {{ ... }})");
    println!("  --centrality            Add centrality scores to the graph");
    println!("  --output <path>         Output file path (auto-generated if not specified)");
    println!("  --output-format <fmt>   Output format: json or ntriples");

    println!("\nDefault config (YAML):");
    println!("{}", GraphConfig::default().to_yaml()?);

    println!("Usage Examples:");
    println!("  domgraph -i page.html -s \"product price\"");
    println!("  domgraph -u https://shop.example/item --strategy OwlRl -f ntriples");
    println!("  domgraph -i page.html -q 'SELECT ?e WHERE {{ ?e a ex:LinkElement }}'");
    Ok(())
}

fn save_graph(store: &GraphStore, output_path: &str, format: &str) -> Result<()> {
    store
        .save_with_format(output_path, format)
        .with_context(|| format!("Failed to save graph to {output_path}"))?;
    println!("\nGraph saved to: {output_path}");
    Ok(())
}
