//! RGB colors with an HSL view, used for material tints and outline darkening.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color `{0}` (expected #rrggbb, 0xrrggbb or rgb(r, g, b))")]
pub struct ColorParseError(pub String);

/// sRGB triple, channels in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    /// Hue in [0, 1).
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0.0, g: 0.0, b: 0.0 };
    pub const WHITE: Rgb = Rgb { r: 1.0, g: 1.0, b: 1.0 };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r: r.clamp(0.0, 1.0), g: g.clamp(0.0, 1.0), b: b.clamp(0.0, 1.0) }
    }

    pub fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xff) as f32 / 255.0;
        let g = ((hex >> 8) & 0xff) as f32 / 255.0;
        let b = (hex & 0xff) as f32 / 255.0;
        Self { r, g, b }
    }

    pub fn to_hex(self) -> u32 {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u32;
        (q(self.r) << 16) | (q(self.g) << 8) | q(self.b)
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        let hex = self.to_hex();
        [(hex >> 16) as u8, (hex >> 8) as u8, hex as u8, 255]
    }

    pub fn to_hsl(self) -> Hsl {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let l = (min + max) / 2.0;
        if min == max {
            return Hsl { h: 0.0, s: 0.0, l };
        }
        let delta = max - min;
        let s = if l <= 0.5 { delta / (max + min) } else { delta / (2.0 - max - min) };
        let h = if max == self.r {
            (self.g - self.b) / delta + if self.g < self.b { 6.0 } else { 0.0 }
        } else if max == self.g {
            (self.b - self.r) / delta + 2.0
        } else {
            (self.r - self.g) / delta + 4.0
        };
        Hsl { h: h / 6.0, s, l }
    }

    pub fn from_hsl(hsl: Hsl) -> Self {
        let h = hsl.h.rem_euclid(1.0);
        let s = hsl.s.clamp(0.0, 1.0);
        let l = hsl.l.clamp(0.0, 1.0);
        if s == 0.0 {
            return Self { r: l, g: l, b: l };
        }
        let p = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let q = 2.0 * l - p;
        Self {
            r: hue_to_channel(q, p, h + 1.0 / 3.0),
            g: hue_to_channel(q, p, h),
            b: hue_to_channel(q, p, h - 1.0 / 3.0),
        }
    }

    pub fn lightness(self) -> f32 {
        self.to_hsl().l
    }

    /// Shift hue, saturation and lightness; the result is clamped back into range.
    pub fn offset_hsl(self, dh: f32, ds: f32, dl: f32) -> Self {
        let hsl = self.to_hsl();
        Self::from_hsl(Hsl { h: hsl.h + dh, s: hsl.s + ds, l: hsl.l + dl })
    }

    /// Lower HSL lightness by `delta` (sign ignored), bottoming out at black.
    pub fn darken(self, delta: f32) -> Self {
        let delta = delta.abs();
        if delta == 0.0 || !delta.is_finite() {
            return self;
        }
        let hsl = self.to_hsl();
        if hsl.l <= 0.0 {
            return self;
        }
        Self::from_hsl(Hsl { l: (hsl.l - delta).max(0.0), ..hsl })
    }
}

fn hue_to_channel(p: f32, q: f32, mut t: f32) -> f32 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 0.5 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * 6.0 * (2.0 / 3.0 - t);
    }
    p
}

impl FromStr for Rgb {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let err = || ColorParseError(s.to_string());
        let hex_digits = raw
            .strip_prefix('#')
            .or_else(|| raw.strip_prefix("0x"))
            .or_else(|| raw.strip_prefix("0X"));
        if let Some(digits) = hex_digits {
            if digits.len() != 6 {
                return Err(err());
            }
            let value = u32::from_str_radix(digits, 16).map_err(|_| err())?;
            return Ok(Rgb::from_hex(value));
        }
        let inner = raw
            .strip_prefix("rgb(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(err)?;
        let channels: Vec<u8> = inner
            .split(',')
            .map(|c| c.trim().parse::<u8>())
            .collect::<Result<_, _>>()
            .map_err(|_| err())?;
        match channels.as_slice() {
            [r, g, b] => Ok(Rgb::from_hex(((*r as u32) << 16) | ((*g as u32) << 8) | *b as u32)),
            _ => Err(err()),
        }
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_notations() {
        let a: Rgb = "#0ce1e8".parse().unwrap();
        let b: Rgb = "0x0ce1e8".parse().unwrap();
        let c: Rgb = "rgb(12, 225, 232)".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.to_hex(), 0x0ce1e8);
        assert_eq!(a.to_string(), "#0ce1e8");
    }

    #[test]
    fn rejects_garbage() {
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("rgb(1, 2)".parse::<Rgb>().is_err());
        assert!("rgb(300, 0, 0)".parse::<Rgb>().is_err());
        assert!("teal".parse::<Rgb>().is_err());
    }

    #[test]
    fn hsl_round_trip_is_stable() {
        let c = Rgb::from_hex(0xdbd3d3);
        let back = Rgb::from_hsl(c.to_hsl());
        assert_eq!(back.to_hex(), 0xdbd3d3);
    }

    #[test]
    fn darken_lowers_lightness_by_delta() {
        let c = Rgb::from_hex(0x027812);
        let d = c.darken(0.25);
        assert!(d.lightness() < c.lightness());
        assert!((c.lightness() - 0.25).max(0.0) - d.lightness() < 1e-4);
        assert_eq!(c.darken(0.25), c.darken(0.25));
    }

    #[test]
    fn darken_bottoms_out_at_black() {
        let c = Rgb::from_hex(0x353835);
        assert_eq!(c.darken(0.9).to_hex(), 0x000000);
        assert_eq!(Rgb::BLACK.darken(0.25), Rgb::BLACK);
        assert_eq!(c.darken(0.0), c);
    }

    #[test]
    fn grey_has_no_saturation() {
        let hsl = Rgb::new(0.5, 0.5, 0.5).to_hsl();
        assert_eq!(hsl.s, 0.0);
        assert_eq!(hsl.h, 0.0);
    }
}
