//! CSS-style color strings parsed into normalized RGBA.

use std::collections::HashMap;
use thiserror::Error;

/// A color with every channel, including opacity, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    fn from_bytes(r: u8, g: u8, b: u8) -> Self {
        Self::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            1.0,
        )
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorParseError {
    #[error("unrecognized color {0:?}")]
    Unrecognized(String),
    #[error("malformed {kind} color {input:?}")]
    Malformed { kind: &'static str, input: String },
}

/// Lookup-or-insert cache of parsed colors keyed by the input string.
///
/// Failed parses are not cached.
#[derive(Debug, Default)]
pub struct ColorCache {
    entries: HashMap<String, Rgba>,
}

impl ColorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, input: &str) -> Result<Rgba, ColorParseError> {
        if let Some(c) = self.entries.get(input) {
            return Ok(*c);
        }
        let c = parse_color(input)?;
        self.entries.insert(input.to_owned(), c);
        Ok(c)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parses `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb[a](..)`, `hsl[a](..)`
/// and named colors. Alpha is optional everywhere and defaults to 1.
pub fn parse_color(input: &str) -> Result<Rgba, ColorParseError> {
    let s = input.trim().to_ascii_lowercase();

    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(|| malformed("hex", input));
    }

    if let Some(open) = s.find('(') {
        let name = s[..open].trim();
        let body = s[open + 1..]
            .strip_suffix(')')
            .ok_or_else(|| malformed("functional", input))?;
        let args = split_args(body);
        return match name {
            "rgb" | "rgba" => parse_rgb(&args).ok_or_else(|| malformed("rgb", input)),
            "hsl" | "hsla" => parse_hsl(&args).ok_or_else(|| malformed("hsl", input)),
            _ => Err(ColorParseError::Unrecognized(input.to_owned())),
        };
    }

    named(&s).ok_or_else(|| ColorParseError::Unrecognized(input.to_owned()))
}

fn malformed(kind: &'static str, input: &str) -> ColorParseError {
    ColorParseError::Malformed {
        kind,
        input: input.to_owned(),
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    let (r, g, b, a) = match hex.len() {
        3 => (nibble(0)?, nibble(1)?, nibble(2)?, 255),
        4 => (nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?),
        6 => (byte(0)?, byte(2)?, byte(4)?, 255),
        8 => (byte(0)?, byte(2)?, byte(4)?, byte(6)?),
        _ => return None,
    };
    let mut c = Rgba::from_bytes(r, g, b);
    c.a = f32::from(a) / 255.0;
    Some(c)
}

/// Accepts both the comma form `1, 2, 3, 0.5` and the space form `1 2 3 / 0.5`.
fn split_args(body: &str) -> Vec<&str> {
    if body.contains(',') {
        body.split(',').map(str::trim).collect()
    } else {
        body.split(|c: char| c.is_whitespace() || c == '/')
            .filter(|t| !t.is_empty())
            .collect()
    }
}

fn parse_number(token: &str) -> Option<f32> {
    let v: f32 = token.parse().ok()?;
    v.is_finite().then_some(v)
}

/// `50%` -> 0.5, `0.5` -> 0.5.
fn parse_unit(token: &str) -> Option<f32> {
    match token.strip_suffix('%') {
        Some(p) => parse_number(p).map(|v| v / 100.0),
        None => parse_number(token),
    }
}

fn parse_alpha(args: &[&str]) -> Option<f32> {
    match args.get(3) {
        Some(t) => parse_unit(t).map(|v| v.clamp(0.0, 1.0)),
        None => Some(1.0),
    }
}

fn parse_rgb(args: &[&str]) -> Option<Rgba> {
    if !(3..=4).contains(&args.len()) {
        return None;
    }
    let channel = |t: &str| -> Option<f32> {
        let v = match t.strip_suffix('%') {
            Some(p) => parse_number(p)? / 100.0,
            None => parse_number(t)? / 255.0,
        };
        Some(v.clamp(0.0, 1.0))
    };
    Some(Rgba::new(
        channel(args[0])?,
        channel(args[1])?,
        channel(args[2])?,
        parse_alpha(args)?,
    ))
}

fn parse_hsl(args: &[&str]) -> Option<Rgba> {
    if !(3..=4).contains(&args.len()) {
        return None;
    }
    let h = parse_number(args[0].trim_end_matches("deg"))?;
    let s = parse_unit(args[1])?.clamp(0.0, 1.0);
    let l = parse_unit(args[2])?.clamp(0.0, 1.0);
    let [r, g, b] = hsl_to_rgb(h.rem_euclid(360.0) / 360.0, s, l);
    Some(Rgba::new(r, g, b, parse_alpha(args)?))
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [f32; 3] {
    if s == 0.0 {
        return [l, l, l];
    }
    let q = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let hue = |mut t: f32| {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * 6.0 * (2.0 / 3.0 - t)
        } else {
            p
        }
    };
    [hue(h + 1.0 / 3.0), hue(h), hue(h - 1.0 / 3.0)]
}

fn named(name: &str) -> Option<Rgba> {
    let (r, g, b) = match name {
        "transparent" => return Some(Rgba::new(0.0, 0.0, 0.0, 0.0)),
        "black" => (0x00, 0x00, 0x00),
        "silver" => (0xC0, 0xC0, 0xC0),
        "gray" | "grey" => (0x80, 0x80, 0x80),
        "white" => (0xFF, 0xFF, 0xFF),
        "maroon" => (0x80, 0x00, 0x00),
        "red" => (0xFF, 0x00, 0x00),
        "purple" => (0x80, 0x00, 0x80),
        "fuchsia" | "magenta" => (0xFF, 0x00, 0xFF),
        "green" => (0x00, 0x80, 0x00),
        "lime" => (0x00, 0xFF, 0x00),
        "olive" => (0x80, 0x80, 0x00),
        "yellow" => (0xFF, 0xFF, 0x00),
        "navy" => (0x00, 0x00, 0x80),
        "blue" => (0x00, 0x00, 0xFF),
        "teal" => (0x00, 0x80, 0x80),
        "aqua" | "cyan" => (0x00, 0xFF, 0xFF),
        "orange" => (0xFF, 0xA5, 0x00),
        "gold" => (0xFF, 0xD7, 0x00),
        "pink" => (0xFF, 0xC0, 0xCB),
        "hotpink" => (0xFF, 0x69, 0xB4),
        "orchid" => (0xDA, 0x70, 0xD6),
        "violet" => (0xEE, 0x82, 0xEE),
        "indigo" => (0x4B, 0x00, 0x82),
        "steelblue" => (0x46, 0x82, 0xB4),
        "royalblue" => (0x41, 0x69, 0xE1),
        "dodgerblue" => (0x1E, 0x90, 0xFF),
        "tomato" => (0xFF, 0x63, 0x47),
        "crimson" => (0xDC, 0x14, 0x3C),
        "lightgray" | "lightgrey" => (0xD3, 0xD3, 0xD3),
        "darkgray" | "darkgrey" => (0xA9, 0xA9, 0xA9),
        _ => return None,
    };
    Some(Rgba::from_bytes(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Rgba, b: Rgba) -> bool {
        let d = |x: f32, y: f32| (x - y).abs() < 1e-3;
        d(a.r, b.r) && d(a.g, b.g) && d(a.b, b.b) && d(a.a, b.a)
    }

    #[test]
    fn parses_hex_forms() {
        assert_eq!(parse_color("#ff0000").unwrap(), Rgba::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(parse_color("#0F0").unwrap(), Rgba::new(0.0, 1.0, 0.0, 1.0));
        assert_eq!(parse_color("#0000ff80").unwrap().a, 128.0 / 255.0);
        assert!(matches!(
            parse_color("#12345"),
            Err(ColorParseError::Malformed { kind: "hex", .. })
        ));
    }

    #[test]
    fn parses_rgba_with_and_without_alpha() {
        assert!(close(
            parse_color("rgba(255, 0, 0, 0.5)").unwrap(),
            Rgba::new(1.0, 0.0, 0.0, 0.5)
        ));
        assert!(close(
            parse_color("rgb(0,128,255)").unwrap(),
            Rgba::new(0.0, 128.0 / 255.0, 1.0, 1.0)
        ));
        assert!(close(
            parse_color("rgb(100% 0% 50% / 25%)").unwrap(),
            Rgba::new(1.0, 0.0, 0.5, 0.25)
        ));
    }

    #[test]
    fn parses_hsla() {
        assert!(close(
            parse_color("hsla(0, 100%, 50%, 0.3)").unwrap(),
            Rgba::new(1.0, 0.0, 0.0, 0.3)
        ));
        assert!(close(
            parse_color("hsl(120, 100%, 25%)").unwrap(),
            Rgba::new(0.0, 0.5, 0.0, 1.0)
        ));
        assert!(close(
            parse_color("hsl(240deg, 0%, 40%)").unwrap(),
            Rgba::new(0.4, 0.4, 0.4, 1.0)
        ));
    }

    #[test]
    fn named_and_unknown() {
        assert_eq!(parse_color("Purple").unwrap(), Rgba::from_bytes(0x80, 0, 0x80));
        assert_eq!(parse_color("transparent").unwrap().a, 0.0);
        assert_eq!(
            parse_color("not-a-color"),
            Err(ColorParseError::Unrecognized("not-a-color".into()))
        );
        assert!(parse_color("cmyk(1,2,3)").is_err());
        assert!(parse_color("rgb(1,2)").is_err());
    }

    #[test]
    fn cache_reuses_successful_parses_only() {
        let mut cache = ColorCache::new();
        let first = cache.get("rgba(0, 0, 255, 0.7)").unwrap();
        let second = cache.get("rgba(0, 0, 255, 0.7)").unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);

        assert!(cache.get("bogus").is_err());
        assert_eq!(cache.len(), 1);
    }
}
