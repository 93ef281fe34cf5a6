use crate::config::{Config, OutputFormat, load_config};
use crate::layout_dump::{LayoutDump, write_layout_dump};
use crate::scenario::{Scenario, ScenarioPaths};
use anyhow::Result;
use clap::{ArgAction, Parser};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "flowvis", version, about = "Flow network visualizer with detour edge routing")]
pub struct Args {
    /// Scenario directory (with input/nodes.txt, input/edges.txt, ...)
    pub path: PathBuf,

    /// Output directory. Defaults to PATH/plots.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config JSON file. Defaults to PATH/config.json when present.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "format", value_enum)]
    pub format: Option<OutputFormat>,

    /// Render the plain network layout
    #[arg(long = "layout")]
    pub layout: bool,

    /// Render the attack plan
    #[arg(long = "attack")]
    pub attack: bool,

    /// Skip the before/after solution figures
    #[arg(long = "no-solution")]
    pub no_solution: bool,

    #[arg(long = "nodes")]
    pub nodes: Option<PathBuf>,

    #[arg(long = "edges")]
    pub edges: Option<PathBuf>,

    #[arg(long = "attack-file")]
    pub attack_file: Option<PathBuf>,

    #[arg(long = "solution-file")]
    pub solution_file: Option<PathBuf>,

    /// Write the computed layouts as JSON
    #[arg(long = "dump-layout")]
    pub dump_layout: Option<PathBuf>,

    /// Width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    SimpleLogger::new().with_level(log_level(args.verbose)).init()?;

    let config = resolve_config(&args)?;
    let mut scenario = Scenario::load(resolve_paths(&args))?;
    let output = args.output.clone().unwrap_or_else(|| args.path.join("plots"));
    let figures = scenario.visualize(&output, &config)?;

    if figures.is_empty() {
        log::warn!("no figures rendered for {}", args.path.display());
    }
    if let Some(path) = args.dump_layout.as_deref() {
        let dumps: Vec<_> = figures
            .iter()
            .map(|figure| LayoutDump::from_layout(figure.name, &figure.layout))
            .collect();
        write_layout_dump(path, &dumps)?;
    }
    Ok(())
}

fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Config file values overlaid by command-line flags.
fn resolve_config(args: &Args) -> Result<Config> {
    let default_config = args.path.join("config.json");
    let config_path = match args.config.as_deref() {
        Some(path) => Some(path),
        None if default_config.is_file() => Some(default_config.as_path()),
        None => None,
    };
    let mut config = load_config(config_path)?;
    if let Some(format) = args.format {
        config.render.format = format;
    }
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }
    if args.layout {
        config.scenario.visualize_layout = true;
    }
    if args.attack {
        config.scenario.visualize_attack = true;
    }
    if args.no_solution {
        config.scenario.visualize_solution = false;
    }
    Ok(config)
}

fn resolve_paths(args: &Args) -> ScenarioPaths {
    let mut paths = ScenarioPaths::in_dir(&args.path);
    let overrides = [
        (&mut paths.nodes, &args.nodes),
        (&mut paths.edges, &args.edges),
        (&mut paths.attack, &args.attack_file),
        (&mut paths.solution, &args.solution_file),
    ];
    for (slot, value) in overrides {
        if let Some(path) = value {
            *slot = path.clone();
        }
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("flowvis").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), r#"{"width": 640, "visualize_layout": false}"#).unwrap();
        let path = dir.path().to_str().unwrap();
        let args = parse(&[path, "--layout", "--no-solution", "-e", "png", "-H", "480"]);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.render.width, 640.0);
        assert_eq!(config.render.height, 480.0);
        assert_eq!(config.render.format, OutputFormat::Png);
        assert!(config.scenario.visualize_layout);
        assert!(!config.scenario.visualize_solution);
    }

    #[test]
    fn file_overrides_replace_defaults() {
        let args = parse(&["scen", "--nodes", "n.tsv", "--solution-file", "out/sol.txt"]);
        let paths = resolve_paths(&args);
        assert_eq!(paths.nodes, PathBuf::from("n.tsv"));
        assert_eq!(paths.edges, PathBuf::from("scen/input/edges.txt"));
        assert_eq!(paths.solution, PathBuf::from("out/sol.txt"));
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(log_level(parse(&["scen"]).verbose), LevelFilter::Warn);
        assert_eq!(log_level(parse(&["scen", "-vv"]).verbose), LevelFilter::Debug);
    }
}
