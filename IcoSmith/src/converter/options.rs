//! Rendering options
//!
//! One immutable value per conversion. Callers build it with struct update
//! syntax over [`RenderOptions::default`]; the converter calls
//! [`RenderOptions::resolved`] once at entry and hands the result to every
//! size unchanged.

use crate::utils::error::{IcoError, Result};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Opaque background color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` or `#RGB` (leading `#` optional, case-insensitive).
    pub fn from_hex(value: &str) -> Result<Self> {
        let digits = value.trim().trim_start_matches('#');
        let invalid = || IcoError::InvalidInput(format!("Invalid background color {:?}", value));
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
        match digits.len() {
            6 => Ok(Self::new(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            3 => {
                // #abc expands to #aabbcc
                let r = channel(&digits[0..1])?;
                let g = channel(&digits[1..2])?;
                let b = channel(&digits[2..3])?;
                Ok(Self::new(r * 17, g * 17, b * 17))
            }
            _ => Err(invalid()),
        }
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl FromStr for Rgb {
    type Err = IcoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Per-conversion rendering configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RenderOptions {
    /// Letterbox the source inside the square (`true`) or stretch it (`false`)
    pub preserve_aspect_ratio: bool,

    /// Leave the canvas transparent; otherwise fill it with `background_color`
    pub background_transparent: bool,

    /// Canvas fill, used only when `background_transparent` is off
    pub background_color: Rgb,

    /// Stepped downscaling for sizes up to 48 px
    pub crisp_small_icons: bool,

    /// Force neutral dilation ("bolding") at 16 px and below
    pub small_icon_mode: bool,

    /// Dilation pass multiplier, clamped into 0.0..=2.0
    pub small_icon_strength: f32,

    /// Force (`Some(true)`) or forbid (`Some(false)`) the 16 px outline;
    /// `None` lets the auto profile decide from mean luminance
    pub outline_16px: Option<bool>,

    /// Coverage/luminance-adaptive tuning; overrides the manual small-icon
    /// flags at 16 px and below
    pub auto_profile: bool,

    /// Run the edge-adaptive sharpen pass on sizes above 96 px
    pub sharpen_large_icons: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            preserve_aspect_ratio: true,
            background_transparent: true,
            background_color: Rgb::BLACK,
            crisp_small_icons: true,
            small_icon_mode: false,
            small_icon_strength: 1.2,
            outline_16px: None,
            auto_profile: false,
            sharpen_large_icons: false,
        }
    }
}

impl RenderOptions {
    pub const MAX_STRENGTH: f32 = 2.0;

    /// Copy with every field normalized: strength clamped, NaN treated as 0.
    pub fn resolved(&self) -> Self {
        let strength = if self.small_icon_strength.is_nan() {
            0.0
        } else {
            self.small_icon_strength.clamp(0.0, Self::MAX_STRENGTH)
        };
        Self {
            small_icon_strength: strength,
            ..*self
        }
    }

    /// Canvas fill color, `None` for a transparent canvas.
    pub fn background(&self) -> Option<Rgb> {
        if self.background_transparent {
            None
        } else {
            Some(self.background_color)
        }
    }

    /// Outline requested with neither bolding nor auto profile.
    pub fn is_sharp_preset(&self) -> bool {
        self.outline_16px == Some(true) && !self.small_icon_mode && !self.auto_profile
    }

    /// Bolding requested without outline or auto profile.
    pub fn is_soft_preset(&self) -> bool {
        self.small_icon_mode && self.outline_16px != Some(true) && !self.auto_profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RenderOptions::default();
        assert!(options.preserve_aspect_ratio);
        assert!(options.background_transparent);
        assert!(options.crisp_small_icons);
        assert!(!options.auto_profile);
        assert!(!options.sharpen_large_icons);
        assert_eq!(options.outline_16px, None);
        assert_eq!(options.background(), None);
    }

    #[test]
    fn test_resolved_clamps_strength() {
        let high = RenderOptions {
            small_icon_strength: 7.5,
            ..RenderOptions::default()
        };
        assert_eq!(high.resolved().small_icon_strength, 2.0);

        let low = RenderOptions {
            small_icon_strength: -1.0,
            ..RenderOptions::default()
        };
        assert_eq!(low.resolved().small_icon_strength, 0.0);

        let nan = RenderOptions {
            small_icon_strength: f32::NAN,
            ..RenderOptions::default()
        };
        assert_eq!(nan.resolved().small_icon_strength, 0.0);
    }

    #[test]
    fn test_background_only_when_opaque() {
        let options = RenderOptions {
            background_transparent: false,
            background_color: Rgb::new(1, 2, 3),
            ..RenderOptions::default()
        };
        assert_eq!(options.background(), Some(Rgb::new(1, 2, 3)));
    }

    #[test]
    fn test_presets() {
        let sharp = RenderOptions {
            outline_16px: Some(true),
            ..RenderOptions::default()
        };
        assert!(sharp.is_sharp_preset());
        assert!(!sharp.is_soft_preset());

        let soft = RenderOptions {
            small_icon_mode: true,
            ..RenderOptions::default()
        };
        assert!(soft.is_soft_preset());
        assert!(!soft.is_sharp_preset());

        let auto = RenderOptions {
            small_icon_mode: true,
            auto_profile: true,
            ..RenderOptions::default()
        };
        assert!(!auto.is_soft_preset());
    }

    #[test]
    fn test_rgb_from_hex() {
        assert_eq!(Rgb::from_hex("#000000").unwrap(), Rgb::BLACK);
        assert_eq!(Rgb::from_hex("#FFffFF").unwrap(), Rgb::WHITE);
        assert_eq!(Rgb::from_hex("1a2B3c").unwrap(), Rgb::new(0x1a, 0x2b, 0x3c));
        assert_eq!(Rgb::from_hex("#f80").unwrap(), Rgb::new(0xff, 0x88, 0x00));
        assert_eq!("#102030".parse::<Rgb>().unwrap().to_string(), "#102030");
    }

    #[test]
    fn test_rgb_rejects_garbage() {
        for bad in ["", "#", "#12345", "#1234567", "#ggg000", "#+1+2+3", "#日本"] {
            assert!(
                matches!(Rgb::from_hex(bad), Err(IcoError::InvalidInput(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }
}
