use super::MediaError;
use std::fmt;

/// Orientation bucket derived from the reduced width:height ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AspectRatio {
    /// 16:9
    Landscape,
    /// 9:16
    Portrait,
    Other,
}

impl AspectRatio {
    /// Classify a frame size. Zero in either dimension is rejected.
    pub fn classify(width: u32, height: u32) -> Result<Self, MediaError> {
        if width == 0 || height == 0 {
            return Err(MediaError::InvalidDimensions { width, height });
        }

        Ok(match reduce(width, height) {
            (16, 9) => AspectRatio::Landscape,
            (9, 16) => AspectRatio::Portrait,
            _ => AspectRatio::Other,
        })
    }

    pub fn label(self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Other => "other",
        }
    }

    /// Storage key prefix. `Other` has no bucket of its own and lands in
    /// `fallback`.
    pub fn orientation_prefix(self, fallback: &str) -> &str {
        match self {
            AspectRatio::Landscape => "landscape",
            AspectRatio::Portrait => "portrait",
            AspectRatio::Other => fallback,
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Greatest common divisor by repeated remainder.
pub fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Divide both sides by their gcd. Callers guarantee positive inputs.
pub fn reduce(width: u32, height: u32) -> (u32, u32) {
    let g = gcd(width, height);
    (width / g, height / g)
}
