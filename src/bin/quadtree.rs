//! Command-line front end: a canned demo, JSON batch loading with exports,
//! and an interactive shell.

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use point_quadtree::command::{Command, Session, HELP};
use point_quadtree::records::{self, BatchSummary, QueryCounts, QueryExport};
use point_quadtree::{AttrValue, Point, Quadtree, QuadtreeConfig, Rectangle, DEFAULT_MAX_DEPTH};
use tracing::debug;

#[derive(Parser)]
#[command(name = "quadtree")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Spatial search over 2D points with a quadtree", long_about = None)]
struct Cli {
    /// Center x of the indexed area
    #[arg(long, default_value_t = 500.0, env = "QUADTREE_CENTER_X", global = true)]
    center_x: f64,
    /// Center y of the indexed area
    #[arg(long, default_value_t = 500.0, env = "QUADTREE_CENTER_Y", global = true)]
    center_y: f64,
    #[arg(long, default_value_t = 1000.0, env = "QUADTREE_WIDTH", global = true)]
    width: f64,
    #[arg(long, default_value_t = 1000.0, env = "QUADTREE_HEIGHT", global = true)]
    height: f64,
    /// Points per leaf before it splits
    #[arg(short, long, default_value_t = 4, env = "QUADTREE_CAPACITY", global = true)]
    capacity: usize,
    /// Depth at which leaves stop splitting
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH, env = "QUADTREE_MAX_DEPTH", global = true)]
    max_depth: u8,
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    /// No logging at all
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert a handful of places and run each kind of query
    Demo,
    /// Load a JSON array of records and print statistics
    Load {
        file: PathBuf,
        /// Write summary and query results as JSON into this directory
        #[arg(long)]
        export_dir: Option<PathBuf>,
        /// Attribute to count points by
        #[arg(long, default_value = "category")]
        group_by: String,
        /// Numeric attribute to average
        #[arg(long, default_value = "rating")]
        average_of: String,
        /// Count and export points whose group-by attribute equals this value
        /// (repeatable)
        #[arg(long = "filter", value_name = "VALUE")]
        filters: Vec<String>,
    },
    /// Interactive shell
    Repl,
}

impl Cli {
    fn config(&self) -> QuadtreeConfig {
        QuadtreeConfig::new(
            Rectangle::new(self.center_x, self.center_y, self.width, self.height),
            self.capacity,
        )
        .with_max_depth(self.max_depth)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet)?;

    let config = cli.config();
    debug!(?config, "building quadtree");
    let tree = Quadtree::from_config(&config).context("invalid quadtree configuration")?;

    match &cli.command {
        Commands::Demo => demo(tree),
        Commands::Load {
            file,
            export_dir,
            group_by,
            average_of,
            filters,
        } => load(tree, file, export_dir.as_deref(), group_by, average_of, filters),
        Commands::Repl => repl(tree),
    }
}

fn init_logging(verbose: bool, quiet: bool) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if quiet {
        "off"
    } else if verbose {
        "debug"
    } else {
        "error"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;
    Ok(())
}

fn demo(mut tree: Quadtree) -> Result<()> {
    let places = [
        (100.0, 100.0, "Restaurant A", "Restaurant"),
        (200.0, 200.0, "Hospital B", "Hospital"),
        (300.0, 300.0, "School C", "School"),
        (150.0, 150.0, "Restaurant D", "Restaurant"),
        (400.0, 400.0, "Park E", "Park"),
    ];

    println!("inserting points");
    for (x, y, name, category) in places {
        let point = Point::new(x, y)
            .with_attribute("name", name)
            .with_attribute("category", category);
        if tree.insert(point) {
            println!("  {name} at ({x}, {y})");
        } else {
            println!("  {name} at ({x}, {y}) is outside the boundary");
        }
    }
    println!("total points: {}", tree.count_points());

    let rect = Rectangle::new(200.0, 200.0, 200.0, 200.0);
    let found = tree.query_range(&rect);
    println!(
        "\nrange center=({}, {}) size=({}, {}): {} points",
        rect.center_x(),
        rect.center_y(),
        rect.width(),
        rect.height(),
        found.len()
    );
    for p in &found {
        println!("  {} at ({}, {})", label(p), p.x, p.y);
    }

    let query = Point::new(180.0, 180.0);
    match tree.nearest_neighbor_with_distance(&query) {
        Some((p, distance)) => println!(
            "\nnearest to ({}, {}): {} at ({}, {}), distance {distance:.2}",
            query.x,
            query.y,
            label(p),
            p.x,
            p.y
        ),
        None => println!("\nnearest to ({}, {}): none", query.x, query.y),
    }

    let restaurants = tree.filter_by_attribute("category", "Restaurant");
    println!("\nrestaurants: {}", restaurants.len());
    for p in &restaurants {
        println!("  {} at ({}, {})", label(p), p.x, p.y);
    }
    Ok(())
}

fn load(
    mut tree: Quadtree,
    file: &Path,
    export_dir: Option<&Path>,
    group_by: &str,
    average_of: &str,
    filters: &[String],
) -> Result<()> {
    let report = records::load_file(&mut tree, file)
        .with_context(|| format!("failed to load {}", file.display()))?;
    println!(
        "inserted {} points ({} outside the boundary, {} malformed)",
        report.inserted, report.rejected, report.skipped
    );

    let summary = records::summarize(&tree, group_by, average_of);
    println!("\nby {group_by}:");
    for (group, count) in &summary.by_group {
        println!("  {group}: {count}");
    }
    if let Some(average) = summary.average {
        println!("average {average_of}: {average:.2}");
    }

    // Middle 30% of the area on each axis.
    let boundary = *tree.boundary();
    let center = Rectangle::new(
        boundary.center_x(),
        boundary.center_y(),
        boundary.width() * 0.3,
        boundary.height() * 0.3,
    );
    let in_center = tree.query_range(&center);
    println!("\npoints near the center: {}", in_center.len());

    let middle = Point::new(boundary.center_x(), boundary.center_y());
    let nearest = tree.nearest_neighbor_with_distance(&middle);
    if let Some((p, distance)) = nearest {
        println!("nearest to the center: {} at distance {distance:.2}", label(p));
    }

    let matches: Vec<(&String, Vec<&Point>)> = filters
        .iter()
        .map(|value| (value, records::filter_by_text(&tree, group_by, value)))
        .collect();
    for (value, found) in &matches {
        println!("{group_by}={value}: {} points", found.len());
    }

    let Some(dir) = export_dir else {
        return Ok(());
    };
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let queries = QueryCounts {
        range_found: in_center.len(),
        filters: matches
            .iter()
            .map(|(value, found)| ((*value).clone(), found.len()))
            .collect::<BTreeMap<_, _>>(),
        nearest_distance: nearest.map(|(_, distance)| distance),
    };
    records::save_json(dir.join("summary.json"), &BatchSummary::new(summary, queries))?;
    records::save_json(dir.join("range_center.json"), &QueryExport::range(&center, in_center))?;
    records::save_json(dir.join("nearest_center.json"), &QueryExport::nearest(&middle, nearest))?;
    for (value, found) in matches {
        let export = QueryExport::filter(group_by, &AttrValue::from(value.as_str()), found);
        records::save_json(dir.join(format!("filter_{}.json", file_stem(value))), &export)?;
    }
    println!("\nexports written to {}", dir.display());
    Ok(())
}

/// Lowercased `value` with anything but ASCII letters and digits replaced by `_`.
fn file_stem(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

fn repl(tree: Quadtree) -> Result<()> {
    let mut session = Session::new(tree);
    println!("{HELP}\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();
    loop {
        print!("quadtree> ");
        stdout.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        match Command::parse(&line) {
            Ok(None) => {}
            Ok(Some(Command::Exit)) => break,
            Ok(Some(command)) => println!("{}", session.execute(&command)),
            Err(e) => println!("error: {e}"),
        }
    }
    Ok(())
}

fn label(point: &Point) -> String {
    point
        .attribute("name")
        .map_or_else(|| "(unnamed)".to_string(), ToString::to_string)
}
