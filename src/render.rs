use crate::config::{LayoutConfig, OutputFormat, RenderConfig};
use crate::ir::NodeRole;
use crate::layout::{EdgeLayout, Layout, NodeLayout, Point};
use crate::text_metrics::label_width;
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

/// Width of the reference figure in points; font sizes and line widths are
/// given in points of a figure this wide.
const FIGURE_POINTS: f32 = 720.0;
const DISABLED_ALPHA: f32 = 0.3;
const LABEL_BOX_PAD: f32 = 0.3;

/// Unit canvas to pixel mapping, y pointing up.
struct Viewport {
    width: f32,
    height: f32,
}

impl Viewport {
    fn x(&self, p: Point) -> f32 {
        p.x as f32 * self.width
    }

    fn y(&self, p: Point) -> f32 {
        (1.0 - p.y as f32) * self.height
    }

    /// Lengths on the unit canvas.
    fn len(&self, value: f64) -> f32 {
        value as f32 * self.width.min(self.height)
    }

    /// Sizes given in points of the reference figure.
    fn pt(&self, value: f64) -> f32 {
        value as f32 * self.width / FIGURE_POINTS
    }
}

#[derive(Clone, Copy)]
enum Anchor {
    Center,
    /// Text sits above the anchor point.
    Above,
    /// Text hangs below and to the left of the anchor point.
    BelowLeft,
}

struct Label<'a> {
    text: String,
    at: Point,
    size: f32,
    anchor: Anchor,
    /// Box fill; `None` draws the text bare.
    box_fill: Option<&'a str>,
}

pub fn render_svg(layout: &Layout, theme: &Theme, config: &LayoutConfig, render: &RenderConfig) -> String {
    let view = Viewport {
        width: render.width,
        height: render.height,
    };
    let mut svg = String::new();
    let (width, height) = (render.width, render.height);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        render.background
    ));
    svg.push_str("<defs>");
    svg.push_str(&format!(
        "<marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"4\" markerHeight=\"4\" orient=\"auto\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
        theme.edge_color
    ));
    svg.push_str("</defs>");

    let mut labels = Vec::new();
    let mut overlays = String::new();

    if config.show_edges {
        for edge in &layout.edges {
            push_edge(&mut svg, &mut overlays, &mut labels, edge, layout, theme, config, &view);
        }
    }
    for node in &layout.nodes {
        push_node(&mut svg, &mut overlays, &mut labels, node, theme, config, &view);
    }
    for label in &labels {
        push_label(&mut svg, label, theme, &view);
    }
    svg.push_str(&overlays);
    if config.show_routing_graph {
        push_routing_graph(&mut svg, layout, theme, &view);
    }

    svg.push_str("</svg>");
    svg
}

fn alpha(functional: bool) -> f32 {
    if functional { 1.0 } else { DISABLED_ALPHA }
}

#[allow(clippy::too_many_arguments)]
fn push_edge<'a>(
    svg: &mut String,
    overlays: &mut String,
    labels: &mut Vec<Label<'a>>,
    edge: &EdgeLayout,
    layout: &Layout,
    theme: &'a Theme,
    config: &LayoutConfig,
    view: &Viewport,
) {
    let opacity = alpha(edge.functional);
    let stroke = view.len(0.1 * layout.node_size * config.edge_scale);
    let last = edge.segments.len().saturating_sub(1);
    for (idx, segment) in edge.segments.iter().enumerate() {
        let marker = if idx == last { " marker-end=\"url(#arrow)\"" } else { "" };
        svg.push_str(&format!(
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{}\" stroke-width=\"{stroke:.2}\" stroke-linecap=\"round\" opacity=\"{opacity}\"{marker}/>",
            view.x(segment.start),
            view.y(segment.start),
            view.x(segment.end),
            view.y(segment.end),
            theme.edge_color,
        ));
    }

    let label_scale = config.edge_label_scale();
    if config.show_edge_labels {
        let mut text = edge.capacity.map(|c| format_number(c.abs())).unwrap_or_default();
        let mut box_fill = theme.background.as_str();
        if let (Some(flux), Some(capacity)) = (edge.flux, edge.capacity)
            && capacity != 0.0
        {
            let percent = (100.0 * flux / capacity).round();
            if percent < 100.0 {
                box_fill = theme.warning_color.as_str();
            }
            text.push_str(&format!("; {}%", format_number(percent)));
        }
        if !text.is_empty() {
            labels.push(Label {
                text,
                at: edge.label_anchor,
                size: view.pt(layout.node_size * 200.0 * label_scale),
                anchor: Anchor::Center,
                box_fill: Some(box_fill),
            });
        }
    }

    if !edge.functional {
        let size = layout.node_size * label_scale;
        let corner = Point::new(edge.label_anchor.x - 0.4 * size, edge.label_anchor.y + 0.3 * size);
        push_cross_bar(overlays, corner, size, 0.07 * size, 45.0, theme, view);
    }
}

fn push_node<'a>(
    svg: &mut String,
    overlays: &mut String,
    labels: &mut Vec<Label<'a>>,
    node: &NodeLayout,
    theme: &'a Theme,
    config: &LayoutConfig,
    view: &Viewport,
) {
    let opacity = alpha(node.functional);
    let (cx, cy) = (view.x(node.center), view.y(node.center));
    let r = node.radius;
    let size = node.drawn_radius(config.transit_fraction);
    let role_color = match node.role {
        NodeRole::Producer => theme.producer_color.as_str(),
        _ => theme.user_color.as_str(),
    };
    let mut circle = |radius: f64, attrs: String| {
        svg.push_str(&format!(
            "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{:.2}\" {attrs}/>",
            view.len(radius)
        ));
    };

    circle(size, format!("fill=\"{}\"", theme.background));
    if node.role == NodeRole::Transit {
        circle(size, format!("fill=\"{}\" opacity=\"{opacity}\"", theme.layout_color));
    } else if let Some(coverage) = node.coverage {
        let mut status = r * (coverage / node.need).abs();
        if status > r {
            status = r;
            for (scale, ring_alpha, width) in [(1.05, 0.9, 3.0), (1.15, 0.7, 2.0), (1.21, 0.5, 1.0)] {
                circle(
                    scale * r,
                    format!(
                        "fill=\"none\" stroke=\"{}\" stroke-width=\"{:.2}\" opacity=\"{}\"",
                        theme.excess_color,
                        view.pt(width),
                        ring_alpha * opacity
                    ),
                );
            }
        }
        if status < r {
            circle(r, format!("fill=\"{}\" opacity=\"{}\"", theme.alert_color, 0.5 * opacity));
        }
        circle(status, format!("fill=\"{role_color}\" opacity=\"{opacity}\""));
        circle(
            r,
            format!(
                "fill=\"none\" stroke=\"{}\" stroke-width=\"{:.2}\" opacity=\"{opacity}\"",
                theme.layout_color,
                view.pt(0.5)
            ),
        );
    } else {
        circle(r, format!("fill=\"{role_color}\" opacity=\"{}\"", 0.5 * opacity));
        circle(
            0.99 * r,
            format!(
                "fill=\"none\" stroke=\"{}\" stroke-width=\"{:.2}\" opacity=\"{opacity}\"",
                theme.layout_color,
                view.pt(70.0 * node.radius)
            ),
        );
    }

    let label_scale = config.node_label_scale();
    if config.with_node_ids {
        labels.push(Label {
            text: node.id.to_string(),
            at: node.center,
            size: view.pt(r * 300.0 * label_scale),
            anchor: Anchor::Center,
            box_fill: None,
        });
    }
    if config.show_node_labels && node.role != NodeRole::Transit {
        let need = format_number(node.need.abs());
        let label_size = view.pt(r * 250.0 * label_scale);
        match node.coverage {
            None => {
                let mut text = need;
                if let Some(penalty) = node.penalty.filter(|p| *p != 0.0) {
                    text.push_str(&format!("; {}", format_number(penalty)));
                }
                labels.push(Label {
                    text,
                    at: Point::new(node.center.x + r, node.center.y - r),
                    size: label_size,
                    anchor: Anchor::Above,
                    box_fill: Some(theme.background.as_str()),
                });
            }
            Some(coverage) => {
                let percent = (coverage.abs() / node.need.abs() * 100.0).trunc();
                let box_fill = if percent < 100.0 {
                    theme.alert_color.as_str()
                } else {
                    theme.background.as_str()
                };
                labels.push(Label {
                    text: format!("{need}; {}%", format_number(percent)),
                    at: Point::new(node.center.x + r, node.center.y + r),
                    size: label_size,
                    anchor: Anchor::BelowLeft,
                    box_fill: Some(box_fill),
                });
            }
        }
    }

    if !node.functional {
        let corner = Point::new(node.center.x - size, node.center.y + 0.7 * size);
        push_cross_bar(overlays, corner, 2.4 * size, 0.2 * size, 40.0, theme, view);
    }
}

/// Bar in the alert colour starting at `corner` and running down to the
/// right at `angle` degrees.
fn push_cross_bar(svg: &mut String, corner: Point, length: f64, thickness: f64, angle: f32, theme: &Theme, view: &Viewport) {
    let (w, h) = (view.len(length), view.len(thickness));
    svg.push_str(&format!(
        "<rect x=\"0\" y=\"{:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" fill=\"{}\" opacity=\"{}\" transform=\"translate({:.2} {:.2}) rotate({angle})\"/>",
        -h,
        theme.alert_color,
        (2.0 * DISABLED_ALPHA).min(1.0),
        view.x(corner),
        view.y(corner),
    ));
}

fn push_label(svg: &mut String, label: &Label<'_>, theme: &Theme, view: &Viewport) {
    let width = label_width(&label.text, label.size, &theme.font_family);
    let height = label.size;
    let pad = LABEL_BOX_PAD * label.size;
    let (x, y) = (view.x(label.at), view.y(label.at));
    let (left, top) = match label.anchor {
        Anchor::Center => (x - width / 2.0, y - height / 2.0),
        Anchor::Above => (x - width / 2.0, y - height - pad),
        Anchor::BelowLeft => (x - width - pad, y + pad),
    };
    if let Some(fill) = label.box_fill {
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{:.2}\" ry=\"{:.2}\" fill=\"{fill}\" stroke=\"{}\" stroke-width=\"0.8\" opacity=\"0.8\"/>",
            left - pad,
            top - pad,
            width + 2.0 * pad,
            height + 2.0 * pad,
            pad,
            pad,
            theme.text_color,
        ));
    }
    svg.push_str(&format!(
        "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" dominant-baseline=\"central\" font-family=\"{}\" font-size=\"{:.2}\" fill=\"{}\">{}</text>",
        left + width / 2.0,
        top + height / 2.0,
        escape_xml(&theme.font_family),
        label.size,
        theme.text_color,
        escape_xml(&label.text)
    ));
}

/// Auxiliary routing graph drawn over the figure: dashed springs and the
/// free waypoints.
fn push_routing_graph(svg: &mut String, layout: &Layout, theme: &Theme, view: &Viewport) {
    let Some(snapshot) = &layout.snapshot else {
        return;
    };
    svg.push_str("<g class=\"routing-graph\">");
    for &(a, b, _) in &snapshot.edges {
        let (Some(&from), Some(&to)) = (snapshot.positions.get(a), snapshot.positions.get(b)) else {
            continue;
        };
        svg.push_str(&format!(
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{}\" stroke-width=\"1\" stroke-dasharray=\"4 3\" opacity=\"0.6\"/>",
            view.x(from),
            view.y(from),
            view.x(to),
            view.y(to),
            theme.alert_color,
        ));
    }
    for point in snapshot.positions.iter().skip(snapshot.fixed_count) {
        svg.push_str(&format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"3\" fill=\"{}\"/>",
            view.x(*point),
            view.y(*point),
            theme.alert_color,
        ));
    }
    svg.push_str("</g>");
}

/// Shortest representation with up to six significant digits.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (5 - magnitude).clamp(0, 15) as usize;
    let text = format!("{value:.decimals$}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" { "0".to_string() } else { text.to_string() }
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "DejaVu Sans".to_string();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .ok_or_else(|| anyhow::anyhow!("invalid figure size {}x{}", render_cfg.width, render_cfg.height))?;
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, output: &Path, _render_cfg: &RenderConfig) -> Result<()> {
    anyhow::bail!("cannot write {}: built without PNG support", output.display())
}

/// Writes a rendered figure in the configured format.
pub fn write_figure(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    match render_cfg.format {
        OutputFormat::Svg => write_output_svg(svg, Some(output)),
        OutputFormat::Png => write_output_png(svg, output, render_cfg),
    }
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Edge, Network, Node};
    use crate::layout::compute_layout;

    fn network() -> Network {
        let mut producer = Node::new(1, 0.0, 0.0, -10.0);
        producer.penalty = Some(0.0);
        let mut user = Node::new(2, 10.0, 0.0, 4.0);
        user.penalty = Some(25.0);
        let transit = Node::new(3, 5.0, 8.0, 0.0);
        let mut edge = Edge::new(0, 1, 2);
        edge.capacity = Some(8.0);
        let mut back = Edge::new(1, 2, 3);
        back.capacity = Some(2.5);
        Network::new(vec![producer, user, transit], vec![edge, back]).unwrap()
    }

    fn render(network: &Network, config: &LayoutConfig) -> String {
        let layout = compute_layout(network, config).unwrap();
        render_svg(&layout, &Theme::default(), config, &RenderConfig::default())
    }

    #[test]
    fn layout_mode_labels() {
        let svg = render(&network(), &LayoutConfig::default());
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains(">10</text>"));
        assert!(svg.contains(">4; 25</text>"));
        assert!(svg.contains(">8</text>"));
        assert!(svg.contains(">2.5</text>"));
        assert_eq!(svg.matches("marker-end").count(), 2);
    }

    #[test]
    fn solution_mode_marks_shortfalls() {
        let mut network = network();
        let mut flows = crate::ir::FlowConfig::default();
        flows.uncovered.insert(2, (1.0, 25.0));
        flows.flows.insert((1, 2), 3.0);
        network.load_config(&flows).unwrap();
        let theme = Theme::default();
        let svg = render(&network, &LayoutConfig::default());
        assert!(svg.contains(">4; 75%</text>"));
        assert!(svg.contains(">8; 38%</text>"));
        assert!(svg.contains(&format!("fill=\"{}\"", theme.warning_color)));
    }

    #[test]
    fn over_covered_nodes_get_excess_rings() {
        let mut network = network();
        let mut flows = crate::ir::FlowConfig::default();
        flows.uncovered.insert(2, (-2.0, 0.0));
        network.load_config(&flows).unwrap();
        let theme = Theme {
            excess_color: "#ABCDEF".to_string(),
            ..Theme::default()
        };
        let config = LayoutConfig::default();
        let layout = compute_layout(&network, &config).unwrap();
        let svg = render_svg(&layout, &theme, &config, &RenderConfig::default());
        assert_eq!(svg.matches("stroke=\"#ABCDEF\"").count(), 3);
        assert!(svg.contains(">4; 150%</text>"));
    }

    #[test]
    fn disabled_elements_are_crossed_out() {
        let mut network = network();
        network
            .load_attack(&crate::ir::Attack {
                nodes: vec![3],
                edges: vec![(1, 2)],
            })
            .unwrap();
        let svg = render(&network, &LayoutConfig::default());
        assert_eq!(svg.matches("rotate(").count(), 2);
        assert!(svg.contains("opacity=\"0.3\""));
    }

    #[test]
    fn hidden_edges_and_ids() {
        let config = LayoutConfig {
            show_edges: false,
            with_node_ids: true,
            ..LayoutConfig::default()
        };
        let svg = render(&network(), &config);
        assert!(!svg.contains("<line"));
        assert!(svg.contains(">3</text>"));
    }

    #[test]
    fn routing_graph_overlay() {
        let nodes = vec![
            Node::new(1, 0.0, 0.0, 1.0),
            Node::new(2, 5.0, 0.0, 1.0),
            Node::new(3, 10.0, 0.0, 1.0),
        ];
        let network = Network::new(nodes, vec![Edge::new(0, 1, 3)]).unwrap();
        let config = LayoutConfig {
            show_routing_graph: true,
            ..LayoutConfig::default()
        };
        let svg = render(&network, &config);
        assert!(svg.contains("class=\"routing-graph\""));
        assert!(svg.contains("stroke-dasharray"));
    }

    #[test]
    fn numbers_print_like_g() {
        assert_eq!(format_number(10.0), "10");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(0.125), "0.125");
        assert_eq!(format_number(1.0 / 3.0), "0.333333");
        assert_eq!(format_number(-0.0), "0");
    }

    #[test]
    fn escape_xml_basic() {
        assert_eq!(escape_xml("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }
}
