use ratatui::style::Color;

/// Catppuccin Mocha color palette.
///
/// Values are hex RGB strings in the `#RRGGBB` format.
#[allow(dead_code)]
pub mod colors {
    // Accent colors
    pub const ROSEWATER: &str = "#f5e0dc";
    pub const MAUVE: &str = "#cba6f7";
    pub const RED: &str = "#f38ba8";
    pub const PEACH: &str = "#fab387";
    pub const YELLOW: &str = "#f9e2af";
    pub const GREEN: &str = "#a6e3a1";
    pub const TEAL: &str = "#94e2d5";
    pub const SKY: &str = "#89dceb";
    pub const BLUE: &str = "#89b4fa";
    pub const LAVENDER: &str = "#b4befe";

    // Surface colors
    pub const SURFACE0: &str = "#313244";
    pub const SURFACE1: &str = "#45475a";
    pub const SURFACE2: &str = "#585b70";

    // Overlay colors
    pub const OVERLAY0: &str = "#6c7086";
    pub const OVERLAY1: &str = "#7f849c";

    // Text colors
    pub const SUBTEXT0: &str = "#a6adc8";
    pub const TEXT: &str = "#cdd6f4";

    // Base colors (backgrounds)
    pub const BASE: &str = "#1e1e2e";
    pub const MANTLE: &str = "#181825";
    pub const CRUST: &str = "#11111b";
}

fn parse_hex_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some((r, g, b))
}

/// Convert hex color (`#RRGGBB`) to a true color ratatui color.
pub fn color(hex: &str) -> Color {
    match parse_hex_rgb(hex) {
        Some((r, g, b)) => Color::Rgb(r, g, b),
        None => Color::Reset,
    }
}

/// Linear blend from `from` to `to`; `t` is clamped to `0.0..=1.0`.
pub fn blend(from: &str, to: &str, t: f32) -> Color {
    let (Some(a), Some(b)) = (parse_hex_rgb(from), parse_hex_rgb(to)) else {
        return color(to);
    };
    let t = t.clamp(0.0, 1.0);
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    Color::Rgb(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}
