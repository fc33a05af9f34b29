//! Size-banded sharpen/contrast tuning
//!
//! Bands: <=16, 17-32, 33-48, 49-64, 65-96 and 97-256. Every (amount,
//! contrast) pair is passed through [`clamp_consistency`] before use, so
//! upstream heuristics can never push a band outside its safe range.

/// Solid-pixel coverage below this reads as thin strokes.
pub const THIN_COVERAGE: f64 = 0.18;
/// Solid-pixel coverage above this reads as a filled shape.
pub const BOLD_COVERAGE: f64 = 0.70;

/// Shape class picked from measured coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageProfile {
    Thin,
    Neutral,
    Bold,
}

impl CoverageProfile {
    /// Dilation strength the automatic profile substitutes for the manual one.
    pub fn strength(self) -> f32 {
        match self {
            CoverageProfile::Thin => 1.3,
            CoverageProfile::Neutral => 1.0,
            CoverageProfile::Bold => 0.6,
        }
    }

    /// Forced bolding mode, `None` leaves the caller's choice alone.
    pub fn small_icon_mode(self) -> Option<bool> {
        match self {
            CoverageProfile::Thin => Some(true),
            CoverageProfile::Neutral => None,
            CoverageProfile::Bold => Some(false),
        }
    }
}

/// Classify coverage; both thresholds are strict.
pub fn select_profile(coverage: f64) -> CoverageProfile {
    if coverage < THIN_COVERAGE {
        CoverageProfile::Thin
    } else if coverage > BOLD_COVERAGE {
        CoverageProfile::Bold
    } else {
        CoverageProfile::Neutral
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharpenParams {
    pub amount: f32,
    pub contrast: f32,
}

/// Measurements and flags feeding [`sharpen_params`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TuningInputs {
    /// Resolved dilation strength, 0..=2
    pub strength: f32,
    /// Explicit outline requested without bolding or auto profile
    pub sharp_preset: bool,
    /// Solid coverage after dilation, only measured with the auto profile
    pub coverage: Option<f64>,
    /// Mean Sobel magnitude, only measured with the auto profile above 96 px
    pub edge_strength: Option<f64>,
}

fn coverage_adjust(base: f32, step: f32, coverage: Option<f64>) -> f32 {
    match coverage {
        Some(c) if c < THIN_COVERAGE => base + step,
        Some(c) if c > BOLD_COVERAGE => base - step,
        _ => base,
    }
}

/// Unclamped sharpen amount and contrast for `size`.
pub fn sharpen_params(size: u32, inputs: &TuningInputs) -> SharpenParams {
    match size {
        0..=16 => SharpenParams {
            amount: (0.15 + 0.04 * inputs.strength).clamp(0.15, 0.23),
            contrast: 0.97,
        },
        17..=32 => SharpenParams {
            amount: if inputs.sharp_preset { 0.18 } else { 0.14 },
            contrast: 1.00,
        },
        33..=48 => {
            let compact = size <= 44;
            let base = if compact { 0.16 } else { 0.10 };
            SharpenParams {
                amount: coverage_adjust(base, 0.03, inputs.coverage),
                contrast: if compact {
                    1.02
                } else if inputs.sharp_preset {
                    1.04
                } else {
                    1.03
                },
            }
        }
        49..=64 => SharpenParams {
            amount: coverage_adjust(0.14, 0.02, inputs.coverage),
            contrast: 1.02,
        },
        65..=96 => SharpenParams {
            amount: coverage_adjust(0.10, 0.02, inputs.coverage),
            contrast: 1.02,
        },
        _ => {
            let base = if size >= 256 {
                0.05
            } else if size >= 192 {
                0.06
            } else {
                0.08
            };
            let contrast = if size >= 192 { 1.01 } else { 1.02 };
            match inputs.edge_strength {
                // Busy, high-contrast content
                Some(edge) if edge > 30.0 => SharpenParams {
                    amount: (base - 0.02f32).max(0.02),
                    contrast: 1.00,
                },
                // Flat content
                Some(edge) if edge < 12.0 => SharpenParams {
                    amount: base + 0.02,
                    contrast: (if size >= 192 { 1.02f32 } else { 1.03 }).min(1.04),
                },
                _ => SharpenParams {
                    amount: base,
                    contrast,
                },
            }
        }
    }
}

/// Clamp `params` into the safe range of the band containing `size`.
pub fn clamp_consistency(size: u32, params: SharpenParams) -> SharpenParams {
    let (s_lo, s_hi, c_lo, c_hi) = match size {
        0..=16 => (0.12, 0.23, 0.96, 1.02),
        17..=32 => (0.10, 0.20, 0.98, 1.02),
        33..=48 => (0.08, 0.18, 0.98, 1.03),
        49..=64 => (0.06, 0.16, 0.99, 1.03),
        65..=96 => (0.04, 0.14, 0.99, 1.03),
        _ => (0.02, 0.10, 0.96, 1.04),
    };
    SharpenParams {
        amount: params.amount.clamp(s_lo, s_hi),
        contrast: params.contrast.clamp(c_lo, c_hi),
    }
}

/// Minimum luminance delta the sharpen pass reacts to.
pub fn sharpen_threshold(size: u32) -> f32 {
    if size <= 16 {
        3.0
    } else {
        6.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_profile_thresholds_are_strict() {
        assert_eq!(select_profile(0.1799), CoverageProfile::Thin);
        assert_eq!(select_profile(0.18), CoverageProfile::Neutral);
        assert_eq!(select_profile(0.70), CoverageProfile::Neutral);
        assert_eq!(select_profile(0.7001), CoverageProfile::Bold);
    }

    #[test]
    fn test_profile_overrides() {
        assert_eq!(CoverageProfile::Thin.small_icon_mode(), Some(true));
        assert_eq!(CoverageProfile::Bold.small_icon_mode(), Some(false));
        assert_eq!(CoverageProfile::Neutral.small_icon_mode(), None);
        assert!(approx(CoverageProfile::Bold.strength(), 0.6));
    }

    #[test]
    fn test_tiny_band_scales_with_strength() {
        let weak = sharpen_params(16, &TuningInputs::default());
        let strong = sharpen_params(
            16,
            &TuningInputs {
                strength: 2.0,
                ..TuningInputs::default()
            },
        );
        assert!(approx(weak.amount, 0.15));
        assert!(approx(strong.amount, 0.23));
        assert!(approx(strong.contrast, 0.97));
    }

    #[test]
    fn test_sharp_preset_at_32() {
        let sharp = sharpen_params(
            32,
            &TuningInputs {
                sharp_preset: true,
                ..TuningInputs::default()
            },
        );
        assert!(approx(sharp.amount, 0.18));
        assert!(approx(sharpen_params(32, &TuningInputs::default()).amount, 0.14));
    }

    #[test]
    fn test_mid_bands_follow_coverage() {
        let thin = TuningInputs {
            coverage: Some(0.05),
            ..TuningInputs::default()
        };
        let bold = TuningInputs {
            coverage: Some(0.9),
            ..TuningInputs::default()
        };
        assert!(approx(sharpen_params(48, &thin).amount, 0.13));
        assert!(approx(sharpen_params(48, &bold).amount, 0.07));
        assert!(approx(sharpen_params(44, &TuningInputs::default()).amount, 0.16));
        assert!(approx(sharpen_params(64, &thin).amount, 0.16));
        assert!(approx(sharpen_params(96, &bold).amount, 0.08));
    }

    #[test]
    fn test_large_band_uses_edge_strength() {
        let plain = sharpen_params(256, &TuningInputs::default());
        assert!(approx(plain.amount, 0.05));
        assert!(approx(plain.contrast, 1.01));

        let busy = sharpen_params(
            128,
            &TuningInputs {
                edge_strength: Some(45.0),
                ..TuningInputs::default()
            },
        );
        assert!(approx(busy.amount, 0.06));
        assert!(approx(busy.contrast, 1.00));

        let flat = sharpen_params(
            192,
            &TuningInputs {
                edge_strength: Some(3.0),
                ..TuningInputs::default()
            },
        );
        assert!(approx(flat.amount, 0.08));
        assert!(approx(flat.contrast, 1.02));
    }

    #[test]
    fn test_clamp_consistency_per_band() {
        let wild = SharpenParams {
            amount: 0.9,
            contrast: 2.0,
        };
        let c16 = clamp_consistency(16, wild);
        assert!(approx(c16.amount, 0.23));
        assert!(approx(c16.contrast, 1.02));

        let c48 = clamp_consistency(48, SharpenParams {
            amount: 0.0,
            contrast: 0.5,
        });
        assert!(approx(c48.amount, 0.08));
        assert!(approx(c48.contrast, 0.98));

        let c256 = clamp_consistency(256, wild);
        assert!(approx(c256.amount, 0.10));
        assert!(approx(c256.contrast, 1.04));
    }

    #[test]
    fn test_every_band_lands_inside_its_clamp() {
        for size in [1u32, 16, 24, 32, 40, 48, 60, 64, 80, 96, 128, 192, 256] {
            let raw = sharpen_params(
                size,
                &TuningInputs {
                    strength: 1.2,
                    ..TuningInputs::default()
                },
            );
            assert_eq!(clamp_consistency(size, raw), raw, "size {}", size);
        }
    }

    #[test]
    fn test_threshold() {
        assert!(approx(sharpen_threshold(16), 3.0));
        assert!(approx(sharpen_threshold(17), 6.0));
    }
}
