use std::collections::HashMap;

use eframe::egui::Color32;

use crate::graph::Dimension;

pub const DEFAULT_RADIUS: f32 = 8.0;
pub const DEFAULT_NODE_STROKE: Color32 = Color32::WHITE;
pub const DEFAULT_NODE_STROKE_WIDTH: f32 = 1.0;
pub const DEFAULT_FONT_SIZE: Dimension = Dimension::Pt(11.0);
pub const DEFAULT_LABEL_COLOR: Color32 = Color32::WHITE;
pub const DEFAULT_LABEL_DX: f32 = 0.0;
pub const DEFAULT_LABEL_DY: f32 = 5.0;
pub const DEFAULT_EDGE_STROKE: Color32 = Color32::from_rgb(0x99, 0x99, 0x99);
pub const DEFAULT_EDGE_STROKE_WIDTH: Dimension = Dimension::Px(1.5);

const CATEGORY20: [Color32; 20] = [
    Color32::from_rgb(0x1f, 0x77, 0xb4),
    Color32::from_rgb(0xae, 0xc7, 0xe8),
    Color32::from_rgb(0xff, 0x7f, 0x0e),
    Color32::from_rgb(0xff, 0xbb, 0x78),
    Color32::from_rgb(0x2c, 0xa0, 0x2c),
    Color32::from_rgb(0x98, 0xdf, 0x8a),
    Color32::from_rgb(0xd6, 0x27, 0x28),
    Color32::from_rgb(0xff, 0x98, 0x96),
    Color32::from_rgb(0x94, 0x67, 0xbd),
    Color32::from_rgb(0xc5, 0xb0, 0xd5),
    Color32::from_rgb(0x8c, 0x56, 0x4b),
    Color32::from_rgb(0xc4, 0x9c, 0x94),
    Color32::from_rgb(0xe3, 0x77, 0xc2),
    Color32::from_rgb(0xf7, 0xb6, 0xd2),
    Color32::from_rgb(0x7f, 0x7f, 0x7f),
    Color32::from_rgb(0xc7, 0xc7, 0xc7),
    Color32::from_rgb(0xbc, 0xbd, 0x22),
    Color32::from_rgb(0xdb, 0xdb, 0x8d),
    Color32::from_rgb(0x17, 0xbe, 0xcf),
    Color32::from_rgb(0x9e, 0xda, 0xe5),
];

#[derive(Debug, Default)]
pub struct Palette {
    assigned: HashMap<String, usize>,
}

impl Palette {
    pub fn color_for(&mut self, group: Option<&str>) -> Color32 {
        let next = self.assigned.len();
        let slot = *self
            .assigned
            .entry(group.unwrap_or_default().to_owned())
            .or_insert(next);
        CATEGORY20[slot % CATEGORY20.len()]
    }
}

pub fn parse_color(text: &str) -> Option<Color32> {
    let text = text.trim().to_ascii_lowercase();
    if let Some(hex) = text.strip_prefix('#') {
        return parse_hex(hex);
    }
    if let Some(body) = text
        .strip_prefix("rgba(")
        .or_else(|| text.strip_prefix("rgb("))
    {
        return parse_functional(body.strip_suffix(')')?);
    }
    named_color(&text)
}

fn parse_hex(hex: &str) -> Option<Color32> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let nibble = |index: usize| u8::from_str_radix(&hex[index..=index], 16).ok().map(|v| v * 17);
    let byte = |index: usize| u8::from_str_radix(&hex[index..index + 2], 16).ok();

    match hex.len() {
        3 => Some(Color32::from_rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(Color32::from_rgba_unmultiplied(
            nibble(0)?,
            nibble(1)?,
            nibble(2)?,
            nibble(3)?,
        )),
        6 => Some(Color32::from_rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Color32::from_rgba_unmultiplied(
            byte(0)?,
            byte(2)?,
            byte(4)?,
            byte(6)?,
        )),
        _ => None,
    }
}

fn parse_functional(body: &str) -> Option<Color32> {
    let parts = body.split(',').map(str::trim).collect::<Vec<_>>();
    let channel = |part: &str| -> Option<u8> {
        let value = match part.strip_suffix('%') {
            Some(percent) => percent.trim().parse::<f32>().ok()? * 2.55,
            None => part.parse::<f32>().ok()?,
        };
        value.is_finite().then(|| value.round().clamp(0.0, 255.0) as u8)
    };

    match parts.as_slice() {
        [r, g, b] => Some(Color32::from_rgb(channel(r)?, channel(g)?, channel(b)?)),
        [r, g, b, a] => {
            let alpha = a.parse::<f32>().ok().filter(|a| a.is_finite())?;
            Some(Color32::from_rgba_unmultiplied(
                channel(r)?,
                channel(g)?,
                channel(b)?,
                (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
            ))
        }
        _ => None,
    }
}

fn named_color(name: &str) -> Option<Color32> {
    let (r, g, b) = match name {
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "green" => (0, 128, 0),
        "lime" => (0, 255, 0),
        "blue" => (0, 0, 255),
        "yellow" => (255, 255, 0),
        "orange" => (255, 165, 0),
        "purple" => (128, 0, 128),
        "pink" => (255, 192, 203),
        "brown" => (165, 42, 42),
        "gray" | "grey" => (128, 128, 128),
        "darkgray" | "darkgrey" => (169, 169, 169),
        "lightgray" | "lightgrey" => (211, 211, 211),
        "silver" => (192, 192, 192),
        "maroon" => (128, 0, 0),
        "navy" => (0, 0, 128),
        "teal" => (0, 128, 128),
        "olive" => (128, 128, 0),
        "cyan" | "aqua" => (0, 255, 255),
        "magenta" | "fuchsia" => (255, 0, 255),
        "steelblue" => (70, 130, 180),
        "gold" => (255, 215, 0),
        "indigo" => (75, 0, 130),
        "violet" => (238, 130, 238),
        "salmon" => (250, 128, 114),
        "coral" => (255, 127, 80),
        "crimson" => (220, 20, 60),
        "transparent" => return Some(Color32::TRANSPARENT),
        _ => return None,
    };
    Some(Color32::from_rgb(r, g, b))
}
