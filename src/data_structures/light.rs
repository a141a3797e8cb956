//! Scene lights.

use cgmath::Vector3;

/// Parse a `#rrggbb` colour into linear-ish `[0, 1]` components.
///
/// Returns `None` for anything that is not exactly six hex digits after the `#`.
pub fn parse_hex_color(hex: &str) -> Option<[f32; 3]> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let value = u32::from_str_radix(digits, 16).ok()?;
    Some([
        ((value >> 16) & 0xff) as f32 / 255.0,
        ((value >> 8) & 0xff) as f32 / 255.0,
        (value & 0xff) as f32 / 255.0,
    ])
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    /// Uniform light from every direction.
    Ambient { color: [f32; 3], intensity: f32 },
    /// Parallel light shining from `position` toward the origin.
    Directional {
        color: [f32; 3],
        intensity: f32,
        position: Vector3<f32>,
        cast_shadow: bool,
    },
}

impl Light {
    pub fn ambient(color: [f32; 3], intensity: f32) -> Self {
        Light::Ambient { color, intensity }
    }

    pub fn directional(color: [f32; 3], intensity: f32, position: Vector3<f32>) -> Self {
        Light::Directional {
            color,
            intensity,
            position,
            cast_shadow: false,
        }
    }

    pub fn with_shadow(self, cast: bool) -> Self {
        match self {
            Light::Directional {
                color,
                intensity,
                position,
                ..
            } => Light::Directional {
                color,
                intensity,
                position,
                cast_shadow: cast,
            },
            ambient => ambient,
        }
    }

    pub fn color(&self) -> [f32; 3] {
        match self {
            Light::Ambient { color, .. } | Light::Directional { color, .. } => *color,
        }
    }

    pub fn intensity(&self) -> f32 {
        match self {
            Light::Ambient { intensity, .. } | Light::Directional { intensity, .. } => *intensity,
        }
    }

    pub fn set_intensity(&mut self, value: f32) {
        match self {
            Light::Ambient { intensity, .. } | Light::Directional { intensity, .. } => {
                *intensity = value
            }
        }
    }

    /// Position of a directional light, `None` for ambient light.
    pub fn position(&self) -> Option<Vector3<f32>> {
        match self {
            Light::Directional { position, .. } => Some(*position),
            Light::Ambient { .. } => None,
        }
    }

    pub fn position_mut(&mut self) -> Option<&mut Vector3<f32>> {
        match self {
            Light::Directional { position, .. } => Some(position),
            Light::Ambient { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_moonlight_colour() {
        let [r, g, b] = parse_hex_color("#d1ebfe").unwrap();
        assert_eq!((r * 255.0).round() as u8, 0xd1);
        assert_eq!((g * 255.0).round() as u8, 0xeb);
        assert_eq!((b * 255.0).round() as u8, 0xfe);
        assert!(parse_hex_color("d1ebfe").is_none());
        assert!(parse_hex_color("#d1eb").is_none());
    }

    #[test]
    fn rejects_signs_and_non_hex_digits() {
        assert!(parse_hex_color("#+d1ebf").is_none());
        assert!(parse_hex_color("#-d1ebf").is_none());
        assert!(parse_hex_color("#d1ebfg").is_none());
        assert!(parse_hex_color("#D1EBFE").is_some());
    }

    #[test]
    fn ambient_light_has_no_position() {
        let mut light = Light::ambient([1.0; 3], 0.5);
        assert!(light.position_mut().is_none());
        light.set_intensity(0.25);
        assert_eq!(light.intensity(), 0.25);
        assert_eq!(light.with_shadow(true), Light::ambient([1.0; 3], 0.25));
    }
}
