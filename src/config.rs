use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Run the detour router at all; straight edges otherwise.
    pub optimize_layout: bool,
    /// Cap on scan/relax cycles.
    pub max_segments: usize,
    /// Pull between a waypoint and the nodes it avoids.
    pub attractor: f64,
    /// Pull along a routed edge, shared out over its segments.
    pub path_attractor: f64,
    /// Ideal spring length of the relaxation.
    pub avg_dist: f64,
    pub iterations: usize,
    /// Proximity threshold in units of 1.5 node sizes.
    pub limit_dist_scale: f64,
    pub minimal_control: bool,
    pub canvas_scale: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            optimize_layout: true,
            max_segments: 2,
            attractor: 16.0,
            path_attractor: 100.0,
            avg_dist: 1.0,
            iterations: 1000,
            limit_dist_scale: 1.0,
            minimal_control: true,
            canvas_scale: 0.95,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub label_scale: f64,
    pub node_scale: f64,
    pub edge_scale: f64,
    /// Defaults to `label_scale`.
    pub edge_label_scale: Option<f64>,
    /// Defaults to `label_scale`.
    pub node_label_scale: Option<f64>,
    pub show_node_labels: bool,
    pub show_edge_labels: bool,
    pub show_edges: bool,
    pub with_node_ids: bool,
    /// Position of a straight edge's label along the edge.
    pub edge_label_position: f64,
    /// Draw the auxiliary routing graph on top of the figure.
    pub show_routing_graph: bool,
    /// How much smaller a transit node is drawn.
    pub transit_fraction: f64,
    /// Canvas borders; default to two node sizes from each side.
    pub top_right_border: Option<f64>,
    pub bottom_left_border: Option<f64>,
    pub routing: RoutingConfig,
}

impl LayoutConfig {
    pub fn edge_label_scale(&self) -> f64 {
        self.edge_label_scale.unwrap_or(self.label_scale)
    }

    pub fn node_label_scale(&self) -> f64 {
        self.node_label_scale.unwrap_or(self.label_scale)
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            label_scale: 1.0,
            node_scale: 1.0,
            edge_scale: 1.0,
            edge_label_scale: None,
            node_label_scale: None,
            show_node_labels: true,
            show_edge_labels: true,
            show_edges: true,
            with_node_ids: false,
            edge_label_position: 0.5,
            show_routing_graph: false,
            transit_fraction: 3.0,
            top_right_border: None,
            bottom_left_border: None,
            routing: RoutingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    #[default]
    Svg,
    Png,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Svg => "svg",
            OutputFormat::Png => "png",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "svg" => Some(OutputFormat::Svg),
            "png" => Some(OutputFormat::Png),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
    pub format: OutputFormat,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 1000.0,
            background: "#ffffff".to_string(),
            format: OutputFormat::Svg,
        }
    }
}

/// Which figures a scenario produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub visualize_layout: bool,
    pub visualize_attack: bool,
    pub visualize_solution: bool,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            visualize_layout: false,
            visualize_attack: false,
            visualize_solution: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
    pub scenario: ScenarioConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    theme: Option<String>,
    font_family: Option<String>,
    colors: Option<BTreeMap<String, String>>,
    label_scale: Option<f64>,
    node_scale: Option<f64>,
    edge_scale: Option<f64>,
    edge_label_scale: Option<f64>,
    node_label_scale: Option<f64>,
    show_node_labels: Option<bool>,
    show_edge_labels: Option<bool>,
    show_edges: Option<bool>,
    with_node_ids: Option<bool>,
    edge_label_position: Option<f64>,
    #[serde(alias = "force_layout_show")]
    show_routing_graph: Option<bool>,
    transit_fraction: Option<f64>,
    top_right_border: Option<f64>,
    bottom_left_border: Option<f64>,
    optimize_layout: Option<bool>,
    max_segments: Option<usize>,
    attractor: Option<f64>,
    path_attractor: Option<f64>,
    avg_dist: Option<f64>,
    iterations: Option<usize>,
    limit_dist_scale: Option<f64>,
    minimal_control: Option<bool>,
    canvas_scale: Option<f64>,
    visualize_layout: Option<bool>,
    visualize_attack: Option<bool>,
    visualize_solution: Option<bool>,
    format: Option<String>,
    width: Option<f32>,
    height: Option<f32>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents).map_err(|err| err.context(format!("invalid config file {}", path.display())))
}

/// Overlays the keys present in a JSON (or JSON5) document on the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = match serde_json::from_str(contents) {
        Ok(parsed) => parsed,
        Err(json_err) => json5::from_str(contents).map_err(|_| json_err)?,
    };

    let mut config = Config::default();

    if let Some(theme_name) = parsed.theme.as_deref() {
        match theme_name {
            "modern" => config.theme = Theme::modern(),
            "default" | "flowvis" | "classic" => config.theme = Theme::flowvis_default(),
            other => anyhow::bail!("unknown theme {other:?}"),
        }
    }
    if let Some(v) = parsed.font_family {
        config.theme.font_family = v;
    }
    if let Some(colors) = parsed.colors {
        for (key, value) in colors {
            if !config.theme.set_color(&key, &value) {
                anyhow::bail!("unknown color key {key:?}");
            }
        }
    }

    let layout = &mut config.layout;
    if let Some(v) = parsed.label_scale {
        layout.label_scale = v;
    }
    if let Some(v) = parsed.node_scale {
        layout.node_scale = v;
    }
    if let Some(v) = parsed.edge_scale {
        layout.edge_scale = v;
    }
    if parsed.edge_label_scale.is_some() {
        layout.edge_label_scale = parsed.edge_label_scale;
    }
    if parsed.node_label_scale.is_some() {
        layout.node_label_scale = parsed.node_label_scale;
    }
    if let Some(v) = parsed.show_node_labels {
        layout.show_node_labels = v;
    }
    if let Some(v) = parsed.show_edge_labels {
        layout.show_edge_labels = v;
    }
    if let Some(v) = parsed.show_edges {
        layout.show_edges = v;
    }
    if let Some(v) = parsed.with_node_ids {
        layout.with_node_ids = v;
    }
    if let Some(v) = parsed.edge_label_position {
        layout.edge_label_position = v;
    }
    if let Some(v) = parsed.show_routing_graph {
        layout.show_routing_graph = v;
    }
    if let Some(v) = parsed.transit_fraction {
        layout.transit_fraction = v;
    }
    if parsed.top_right_border.is_some() {
        layout.top_right_border = parsed.top_right_border;
    }
    if parsed.bottom_left_border.is_some() {
        layout.bottom_left_border = parsed.bottom_left_border;
    }

    let routing = &mut config.layout.routing;
    if let Some(v) = parsed.optimize_layout {
        routing.optimize_layout = v;
    }
    if let Some(v) = parsed.max_segments {
        routing.max_segments = v;
    }
    if let Some(v) = parsed.attractor {
        routing.attractor = v;
    }
    if let Some(v) = parsed.path_attractor {
        routing.path_attractor = v;
    }
    if let Some(v) = parsed.avg_dist {
        routing.avg_dist = v;
    }
    if let Some(v) = parsed.iterations {
        routing.iterations = v;
    }
    if let Some(v) = parsed.limit_dist_scale {
        routing.limit_dist_scale = v;
    }
    if let Some(v) = parsed.minimal_control {
        routing.minimal_control = v;
    }
    if let Some(v) = parsed.canvas_scale {
        routing.canvas_scale = v;
    }

    if let Some(v) = parsed.visualize_layout {
        config.scenario.visualize_layout = v;
    }
    if let Some(v) = parsed.visualize_attack {
        config.scenario.visualize_attack = v;
    }
    if let Some(v) = parsed.visualize_solution {
        config.scenario.visualize_solution = v;
    }
    if let Some(v) = parsed.format.as_deref() {
        config.render.format =
            OutputFormat::from_extension(v).ok_or_else(|| anyhow::anyhow!("unsupported output format {v:?}"))?;
    }
    if let Some(v) = parsed.width {
        config.render.width = v;
    }
    if let Some(v) = parsed.height {
        config.render.height = v;
    }

    config.render.background = config.theme.background.clone();

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config.layout.routing.max_segments, 2);
        assert_eq!(config.layout.routing.iterations, 1000);
        assert!(config.layout.routing.minimal_control);
        assert!(config.scenario.visualize_solution);
        assert_eq!(config.render.format, OutputFormat::Svg);
    }

    #[test]
    fn overlays_routing_and_colors() {
        let config = parse_config(
            r#"{
                "max_segments": 4,
                "attractor": 8,
                "minimal_control": false,
                "edge_label_scale": 0.5,
                "format": ".png",
                "colors": {"ec": "0.5", "uc": "green"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.layout.routing.max_segments, 4);
        assert_eq!(config.layout.routing.attractor, 8.0);
        assert!(!config.layout.routing.minimal_control);
        assert_eq!(config.layout.edge_label_scale(), 0.5);
        assert_eq!(config.layout.node_label_scale(), 1.0);
        assert_eq!(config.render.format, OutputFormat::Png);
        assert_eq!(config.theme.edge_color, "#808080");
        assert_eq!(config.theme.user_color, "#008000");
    }

    #[test]
    fn accepts_json5() {
        let config = parse_config("{ // comment\n iterations: 10, }").unwrap();
        assert_eq!(config.layout.routing.iterations, 10);
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(parse_config(r#"{"colors": {"xx": "red"}}"#).is_err());
        assert!(parse_config(r#"{"max_segmnts": 3}"#).is_err());
        assert!(parse_config(r#"{"format": "pdf"}"#).is_err());
    }

    #[test]
    fn legacy_debug_flag_is_an_alias() {
        let config = parse_config(r#"{"force_layout_show": true}"#).unwrap();
        assert!(config.layout.show_routing_graph);
    }
}
