use eframe::egui;
use serde::{Deserialize, Serialize};

// ── Colors ──────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color4 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// CSS color keywords accepted in category definitions.
const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("red", [255, 0, 0]),
    ("green", [0, 128, 0]),
    ("lime", [0, 255, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("cyan", [0, 255, 255]),
    ("aqua", [0, 255, 255]),
    ("magenta", [255, 0, 255]),
    ("fuchsia", [255, 0, 255]),
    ("orange", [255, 165, 0]),
    ("purple", [128, 0, 128]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("navy", [0, 0, 128]),
    ("teal", [0, 128, 128]),
    ("maroon", [128, 0, 0]),
    ("olive", [128, 128, 0]),
    ("pink", [255, 192, 203]),
    ("brown", [165, 42, 42]),
];

impl Color4 {
    pub fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: 1.0,
        }
    }

    /// Parses `#rrggbb`, `#rgb` or a CSS color keyword.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return Self::from_hex(hex);
        }
        let lower = s.to_ascii_lowercase();
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, [r, g, b])| Self::rgb8(*r, *g, *b))
    }

    fn from_hex(hex: &str) -> Option<Self> {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            6 => {
                let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
                Some(Self::rgb8(channel(0)?, channel(2)?, channel(4)?))
            }
            3 => {
                let channel = |i: usize| {
                    u8::from_str_radix(&hex[i..i + 1], 16)
                        .ok()
                        .map(|v| v * 17)
                };
                Some(Self::rgb8(channel(0)?, channel(1)?, channel(2)?))
            }
            _ => None,
        }
    }

    pub fn to_egui(&self) -> egui::Color32 {
        egui::Color32::from_rgba_unmultiplied(
            (self.r * 255.0).round() as u8,
            (self.g * 255.0).round() as u8,
            (self.b * 255.0).round() as u8,
            (self.a * 255.0).round() as u8,
        )
    }

    pub fn from_rgb(rgb: [f32; 3]) -> Self {
        Self {
            r: rgb[0],
            g: rgb[1],
            b: rgb[2],
            a: 1.0,
        }
    }
}

impl Default for Color4 {
    fn default() -> Self {
        Self {
            r: 1.0,
            g: 0.0,
            b: 0.0,
            a: 1.0,
        }
    }
}

// ── Categories ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct Category {
    pub color: Color4,
    /// Default marker diameter in pixels.
    pub size: f32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegisterError {
    EmptyName,
    Duplicate(String),
}

impl std::fmt::Display for RegisterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterError::EmptyName => write!(f, "category name is empty"),
            RegisterError::Duplicate(name) => write!(f, "category '{name}' already exists"),
        }
    }
}

impl std::error::Error for RegisterError {}

/// Categories keyed by identifier, kept in insertion order.
#[derive(Clone, Debug, Default)]
pub struct CategoryRegistry {
    entries: Vec<(String, Category)>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The three categories the widget starts with when nothing is configured.
    pub fn builtin() -> Self {
        let entries = [
            ("waypoints", Color4::rgb8(0, 128, 0), 20.0),
            ("ships", Color4::rgb8(255, 255, 0), 25.0),
            ("danger", Color4::rgb8(255, 0, 0), 30.0),
        ]
        .into_iter()
        .map(|(name, color, size)| (name.to_string(), Category { color, size }))
        .collect();
        Self { entries }
    }

    pub fn insert(&mut self, name: &str, category: Category) -> Result<(), RegisterError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegisterError::EmptyName);
        }
        if self.contains(name) {
            return Err(RegisterError::Duplicate(name.to_string()));
        }
        self.entries.push((name.to_string(), category));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, category)| category)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Category)> {
        self.entries.iter().map(|(key, cat)| (key.as_str(), cat))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Markers ─────────────────────────────────────────────────────────────────

pub type MarkerId = u64;

#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub id: MarkerId,
    pub category: String,
    /// Top-left corner, relative to the container origin.
    pub pos: egui::Pos2,
    pub diameter: f32,
    pub color: Color4,
}

impl Marker {
    /// Where the marker shows inside `container`. The stored position is
    /// kept as-is; a smaller container only pins the drawn marker to its edge.
    pub fn screen_rect(&self, container: egui::Rect) -> egui::Rect {
        let size = container.size();
        let shown = egui::pos2(
            self.pos.x.clamp(0.0, size.x.max(0.0)),
            self.pos.y.clamp(0.0, size.y.max(0.0)),
        );
        egui::Rect::from_min_size(
            container.min + shown.to_vec2(),
            egui::vec2(self.diameter, self.diameter),
        )
    }

    pub fn contains(&self, container: egui::Rect, screen_pos: egui::Pos2) -> bool {
        let rect = self.screen_rect(container);
        (screen_pos - rect.center()).length() <= self.diameter * 0.5
    }
}
