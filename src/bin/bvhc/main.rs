//! bvhc CLI - collapse binary BVH files into 8-wide GPU buffers.

use std::env;
use std::path::Path;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use bvhc::bvh::WideBvhStats;
use bvhc::collapse::tree_cost;
use bvhc::io::{read_bvh2, read_file_header, save_bvh8, Header};
use bvhc::{collapse, CollapseParams};

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = "info";
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "error",
            _ => filtered_args.push(arg),
        }
    }
    init_logging(level);

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let result = match filtered_args[0] {
        "collapse" | "c" => {
            if filtered_args.len() < 3 {
                eprintln!("Error: missing arguments");
                eprintln!("Usage: bvhc collapse <in.bvh2> <out.bvh8> [--params <file.json>] [--json]");
                std::process::exit(1);
            }
            let opts = Options::parse(&filtered_args[3..]);
            opts.and_then(|o| cmd_collapse(filtered_args[1], Some(filtered_args[2]), &o))
        }

        "stats" | "s" => {
            if filtered_args.len() < 2 {
                eprintln!("Error: missing file argument");
                eprintln!("Usage: bvhc stats <in.bvh2> [--params <file.json>] [--json]");
                std::process::exit(1);
            }
            let opts = Options::parse(&filtered_args[2..]);
            opts.and_then(|o| cmd_collapse(filtered_args[1], None, &o))
        }

        "info" | "i" => {
            if filtered_args.len() < 2 {
                eprintln!("Error: missing file argument");
                eprintln!("Usage: bvhc info <file>");
                std::process::exit(1);
            }
            cmd_info(filtered_args[1])
        }

        "params" | "p" => cmd_params(),

        "version" | "-V" | "--version" => {
            println!("bvhc {} ({})", env!("CARGO_PKG_VERSION"), env!("BVHC_BUILD_DATE"));
            Ok(())
        }

        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        // Default: if file exists, show info; otherwise error
        _ => {
            if Path::new(filtered_args[0]).exists() {
                cmd_info(filtered_args[0])
            } else {
                eprintln!("Unknown command: {}", filtered_args[0]);
                eprintln!();
                print_help();
                std::process::exit(1);
            }
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn print_help() {
    println!("bvhc - binary to 8-wide BVH collapse");
    println!();
    println!("USAGE:");
    println!("    bvhc [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    c, collapse <in> <out>    Collapse a BVH2 file and write BVH8 buffers");
    println!("    s, stats    <in>          Collapse a BVH2 file and print stats only");
    println!("    i, info     <file>        Show BVH2/BVH8 header summary");
    println!("    p, params                 Print default collapse params as JSON");
    println!("    version                   Show version and build date");
    println!("    h, help                   Show this help");
    println!();
    println!("COLLAPSE OPTIONS:");
    println!("    --params <file.json>      Load collapse params (missing fields use defaults)");
    println!("    --json                    Print stats as JSON");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Only show errors");
    println!();
    println!("EXAMPLES:");
    println!("    bvhc collapse scene.bvh2 scene.bvh8");
    println!("    bvhc params > params.json");
    println!("    bvhc stats scene.bvh2 --params params.json --json");
    println!();
    println!("NOTES:");
    println!("    - RUST_LOG overrides -v/-vv/-q");
}

/// Options shared by `collapse` and `stats`.
#[derive(Default)]
struct Options {
    params: CollapseParams,
    json: bool,
}

impl Options {
    fn parse(args: &[&str]) -> Result<Self> {
        let mut opts = Self::default();
        let mut it = args.iter();
        while let Some(&arg) = it.next() {
            match arg {
                "--json" | "-j" => opts.json = true,
                "--params" => {
                    let Some(path) = it.next() else {
                        bail!("--params needs a file argument");
                    };
                    opts.params = CollapseParams::load(path)
                        .with_context(|| format!("loading params from {}", path))?;
                }
                other => bail!("unknown option: {}", other),
            }
        }
        Ok(opts)
    }
}

/// Stats printed after a collapse.
#[derive(Serialize)]
struct Report {
    input_nodes: usize,
    #[serde(flatten)]
    wide: WideBvhStats,
    expected_cost: f32,
    collapse_ms: f64,
}

fn cmd_collapse(input: &str, output: Option<&str>, opts: &Options) -> Result<()> {
    tracing::info!("Reading {}", input);
    let binary = read_bvh2(input).with_context(|| format!("reading {}", input))?;

    let start = Instant::now();
    let wide = collapse(&binary, &opts.params).context("collapse failed")?;
    let collapse_ms = start.elapsed().as_secs_f64() * 1000.0;

    let report = Report {
        input_nodes: binary.nodes.len(),
        wide: wide.stats(),
        expected_cost: tree_cost(&wide, &opts.params),
        collapse_ms,
    };

    if let Some(output) = output {
        let gpu = wide.to_gpu();
        wide.release();
        save_bvh8(output, &gpu).with_context(|| format!("writing {}", output))?;
        tracing::info!("Wrote {} ({} nodes, {} faces)", output, gpu.nodes.len(), gpu.faces.len());
    }

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(r: &Report) {
    println!("Input nodes:     {}", r.input_nodes);
    println!("Wide nodes:      {}", r.wide.node_count);
    println!("Faces:           {}", r.wide.face_count);
    println!("Leaves:          {}", r.wide.leaf_count);
    println!("Internal slots:  {}", r.wide.internal_slots);
    println!("Empty slots:     {}", r.wide.empty_slots);
    println!("Leaf size:       avg {:.2}, max {}", r.wide.avg_leaf_size, r.wide.max_leaf_size);
    println!("Max depth:       {}", r.wide.max_depth);
    println!("Expected cost:   {:.3}", r.expected_cost);
    println!("Collapse time:   {:.2} ms", r.collapse_ms);
}

fn cmd_info(path: &str) -> Result<()> {
    match read_file_header(path).with_context(|| format!("reading {}", path))? {
        Header::Bvh2 { nodes, faces, vertices } => {
            println!("{}: BVH2 (binary input)", path);
            println!("  Nodes:    {}", nodes);
            println!("  Faces:    {}", faces);
            println!("  Vertices: {}", vertices);
        }
        Header::Bvh8 { aabb, nodes, faces } => {
            println!("{}: BVH8 (collapsed GPU buffers)", path);
            println!("  Nodes:    {}", nodes);
            println!("  Faces:    {}", faces);
            println!("  Bounds:   {:?}", aabb);
        }
    }
    Ok(())
}

fn cmd_params() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&CollapseParams::default())?);
    Ok(())
}
