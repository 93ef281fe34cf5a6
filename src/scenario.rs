use crate::config::Config;
use crate::ir::Network;
use crate::layout::{Layout, compute_layout};
use crate::parser::{parse_attack, parse_edges, parse_nodes, parse_solution};
use crate::render::{render_svg, write_figure};
use anyhow::{Context, Result};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Input files of a scenario directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioPaths {
    pub nodes: PathBuf,
    pub edges: PathBuf,
    pub attack: PathBuf,
    pub solution: PathBuf,
}

impl ScenarioPaths {
    pub fn in_dir(dir: &Path) -> Self {
        let input = dir.join("input");
        Self {
            nodes: input.join("nodes.txt"),
            edges: input.join("edges.txt"),
            attack: input.join("attack.txt"),
            solution: dir.join("solution.txt"),
        }
    }
}

/// A rendered figure and the layout it was drawn from.
#[derive(Debug)]
pub struct Figure {
    pub name: &'static str,
    pub path: PathBuf,
    pub layout: Layout,
}

#[derive(Debug)]
pub struct Scenario {
    pub paths: ScenarioPaths,
    pub network: Network,
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

impl Scenario {
    pub fn load(paths: ScenarioPaths) -> Result<Self> {
        let nodes = parse_nodes(&read(&paths.nodes)?)?;
        let edges = parse_edges(&read(&paths.edges)?)?;
        let network = Network::new(nodes, edges)?;
        info!(
            "loaded {} nodes and {} edges from {}",
            network.nodes.len(),
            network.edges.len(),
            paths.nodes.display()
        );
        Ok(Self { paths, network })
    }

    /// Renders the figures enabled in `config.scenario` into `output_dir`.
    /// Attack and solution figures are skipped when their input file is
    /// missing.
    pub fn visualize(&mut self, output_dir: &Path, config: &Config) -> Result<Vec<Figure>> {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("failed to create {}", output_dir.display()))?;
        let mut options = config.scenario.clone();
        let mut figures = Vec::new();

        if options.visualize_layout {
            figures.push(self.render_figure("basic_layout", output_dir, config)?);
        }
        if options.visualize_attack && !self.paths.attack.is_file() {
            warn!("no attack file at {}, skipping attack_plan", self.paths.attack.display());
            options.visualize_attack = false;
        }
        if options.visualize_solution && !self.paths.solution.is_file() {
            warn!(
                "no solution file at {}, skipping solution figures",
                self.paths.solution.display()
            );
            options.visualize_solution = false;
        }
        if !(options.visualize_attack || options.visualize_solution) {
            return Ok(figures);
        }

        let attack = parse_attack(&read(&self.paths.attack)?)?;
        self.network.load_attack(&attack)?;
        if options.visualize_attack {
            figures.push(self.render_figure("attack_plan", output_dir, config)?);
        }
        if !options.visualize_solution {
            return Ok(figures);
        }

        let solution = parse_solution(&read(&self.paths.solution)?)?;
        if let Some(summary) = solution.summary {
            info!(
                "attack loss {} (normal costs {}, attack costs {})",
                summary.attack_loss, summary.normal_costs, summary.attack_costs
            );
        }
        self.network.reset_functionality();
        self.network.load_config(&solution.before)?;
        figures.push(self.render_figure("solution_before", output_dir, config)?);

        self.network.load_attack(&attack)?;
        self.network.load_config(&solution.after)?;
        figures.push(self.render_figure("solution_after", output_dir, config)?);
        Ok(figures)
    }

    fn render_figure(&self, name: &'static str, output_dir: &Path, config: &Config) -> Result<Figure> {
        let layout = compute_layout(&self.network, &config.layout).with_context(|| format!("failed to lay out {name}"))?;
        let svg = render_svg(&layout, &config.theme, &config.layout, &config.render);
        let path = output_dir.join(format!("{name}.{}", config.render.format.extension()));
        write_figure(&svg, &path, &config.render)?;
        info!("wrote {}", path.display());
        Ok(Figure { name, path, layout })
    }
}
