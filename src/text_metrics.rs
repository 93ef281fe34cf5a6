use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

/// Average advance of a label glyph, relative to the font size, used when no
/// system font can be found.
const FALLBACK_CHAR_WIDTH: f32 = 0.56;

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

/// Width of `text` set in `font_family` at `font_size`, in the unit of
/// `font_size`. Falls back to a per-character estimate.
pub fn label_width(text: &str, font_size: f32, font_family: &str) -> f32 {
    measure_text_width(text, font_size, font_family).unwrap_or_else(|| estimate_width(text, font_size))
}

pub fn measure_text_width(text: &str, font_size: f32, font_family: &str) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = TEXT_MEASURER.lock().ok()?;
    guard.measure(text, font_size, font_family)
}

pub fn estimate_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * FALLBACK_CHAR_WIDTH
}

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    cache: HashMap<String, Option<FontMetrics>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            cache: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let key = font_family.trim().to_string();
        if !self.cache.contains_key(&key) {
            let metrics = self.load(font_family);
            self.cache.insert(key.clone(), metrics);
        }
        let metrics = self.cache.get(&key)?.as_ref()?;
        Some(metrics.width(text, font_size))
    }

    fn load(&mut self, font_family: &str) -> Option<FontMetrics> {
        let names: Vec<&str> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\''))
            .filter(|part| !part.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "sans-serif" | "system-ui" => Family::SansSerif,
                "monospace" => Family::Monospace,
                _ => Family::Name(name),
            })
            .collect();
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| {
                let face = Face::parse(data, index).ok()?;
                Some(FontMetrics::from_face(&face))
            })
            .flatten()
    }
}

struct FontMetrics {
    units_per_em: f32,
    ascii_advances: [u16; 128],
}

impl FontMetrics {
    fn from_face(face: &Face<'_>) -> Self {
        let mut ascii_advances = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph) = face.glyph_index(byte as char) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph).unwrap_or(0);
            }
        }
        Self {
            units_per_em: face.units_per_em().max(1) as f32,
            ascii_advances,
        }
    }

    fn width(&self, text: &str, font_size: f32) -> f32 {
        let scale = font_size / self.units_per_em;
        let fallback = font_size * FALLBACK_CHAR_WIDTH;
        text.chars()
            .map(|ch| match self.ascii_advances.get(ch as usize) {
                Some(&advance) if advance > 0 => advance as f32 * scale,
                _ => fallback,
            })
            .sum()
    }
}
