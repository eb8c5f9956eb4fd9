use image::Rgba;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Opaque 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    /// Packs the channels into the low 24 bits, `0x00RRGGBB`.
    pub fn packed(self) -> u32 {
        let [r, g, b] = self.0;
        (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
    }

    pub fn from_packed(value: u32) -> Self {
        Self([(value >> 16) as u8, (value >> 8) as u8, value as u8])
    }

    pub fn to_rgba(self, alpha: u8) -> Rgba<u8> {
        let [r, g, b] = self.0;
        Rgba([r, g, b, alpha])
    }

    pub fn hex(self) -> String {
        let [r, g, b] = self.0;
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    pub fn css(self) -> String {
        let [r, g, b] = self.0;
        format!("rgb({r},{g},{b})")
    }

    /// Channel-wise linear interpolation, `t` clamped to `[0, 1]`.
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| {
            (f64::from(a) + (f64::from(b) - f64::from(a)) * t)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Rgb([
            mix(self.0[0], other.0[0]),
            mix(self.0[1], other.0[1]),
            mix(self.0[2], other.0[2]),
        ])
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex())
    }
}

impl FromStr for Rgb {
    type Err = String;

    /// Accepts `#rrggbb`, `#rgb` and `rgb(r, g, b)`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        parse_color_opt(raw).ok_or_else(|| format!("invalid color: {raw:?}"))
    }
}

fn parse_color_opt(raw: &str) -> Option<Rgb> {
    let s = raw.trim();
    if let Some(hex) = s.strip_prefix('#') {
        if !hex.is_ascii() {
            return None;
        }
        if hex.len() == 6 {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            return Some(Rgb([r, g, b]));
        }
        if hex.len() == 3 {
            let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
            return Some(Rgb([nibble(0)?, nibble(1)?, nibble(2)?]));
        }
        return None;
    }

    let lower = s.to_ascii_lowercase();
    if lower.starts_with("rgb(") && lower.ends_with(')') {
        let body = &lower[4..lower.len() - 1];
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return None;
        }
        let r = parts[0].parse::<f64>().ok()?.round().clamp(0.0, 255.0) as u8;
        let g = parts[1].parse::<f64>().ok()?.round().clamp(0.0, 255.0) as u8;
        let b = parts[2].parse::<f64>().ok()?.round().clamp(0.0, 255.0) as u8;
        return Some(Rgb([r, g, b]));
    }

    None
}
