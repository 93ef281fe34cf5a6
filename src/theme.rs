use serde::{Deserialize, Serialize};

/// Colours of a flow network figure. Keys in configuration files use the
/// short names given on each field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    /// `lc`: node borders and transit nodes.
    pub layout_color: String,
    /// `tc`: text.
    pub text_color: String,
    /// `ec`: edges.
    pub edge_color: String,
    /// `uc`: user nodes.
    pub user_color: String,
    /// `pc`: producer nodes.
    pub producer_color: String,
    /// `ex`: overflow rings around nodes covered beyond their need.
    pub excess_color: String,
    /// `ac`: uncovered need and disabled elements.
    pub alert_color: String,
    /// `wc`: under-used edges.
    pub warning_color: String,
    /// `bc`: background and label boxes.
    pub background: String,
}

impl Theme {
    pub fn flowvis_default() -> Self {
        Self {
            font_family: "DejaVu Sans, Helvetica, Arial, sans-serif".to_string(),
            layout_color: resolve_color("0.2"),
            text_color: resolve_color("black"),
            edge_color: resolve_color("0.25"),
            user_color: resolve_color("blue"),
            producer_color: resolve_color("yellow"),
            excess_color: resolve_color("orange"),
            alert_color: resolve_color("red"),
            warning_color: resolve_color("orange"),
            background: resolve_color("white"),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            layout_color: "#1C2430".to_string(),
            text_color: "#1C2430".to_string(),
            edge_color: "#7A8AA6".to_string(),
            user_color: "#3B82F6".to_string(),
            producer_color: "#F5C542".to_string(),
            excess_color: "#F59E0B".to_string(),
            alert_color: "#E5484D".to_string(),
            warning_color: "#F59E0B".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    /// Sets the colour stored under a short palette key. Returns false for
    /// unknown keys.
    pub fn set_color(&mut self, key: &str, value: &str) -> bool {
        let slot = match key {
            "lc" => &mut self.layout_color,
            "tc" => &mut self.text_color,
            "ec" => &mut self.edge_color,
            "uc" => &mut self.user_color,
            "pc" => &mut self.producer_color,
            "ex" => &mut self.excess_color,
            "ac" => &mut self.alert_color,
            "wc" => &mut self.warning_color,
            "bc" => &mut self.background,
            _ => return false,
        };
        *slot = resolve_color(value);
        true
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::flowvis_default()
    }
}

/// Turns a colour value into something SVG understands.
///
/// Accepts hex codes, grey levels between 0 and 1 (`"0.25"`), single-letter
/// colour codes and names. Names are lower-cased and passed through.
pub fn resolve_color(value: &str) -> String {
    let value = value.trim();
    if value.starts_with('#') {
        return value.to_string();
    }
    if let Ok(level) = value.parse::<f64>()
        && (0.0..=1.0).contains(&level)
    {
        let channel = (level * 255.0).round() as u8;
        return format!("#{channel:02x}{channel:02x}{channel:02x}");
    }
    let lower = value.to_ascii_lowercase();
    let named = match lower.as_str() {
        "b" => "#0000ff",
        "g" => "#008000",
        "r" => "#ff0000",
        "c" => "#00bfbf",
        "m" => "#bf00bf",
        "y" => "#bfbf00",
        "k" | "black" => "#000000",
        "w" | "white" => "#ffffff",
        "blue" => "#0000ff",
        "yellow" => "#ffff00",
        "orange" => "#ffa500",
        "red" => "#ff0000",
        "green" => "#008000",
        "gray" | "grey" => "#808080",
        _ => return lower,
    };
    named.to_string()
}
