//! Startup configuration.
//!
//! [`AppConfig`] collects everything the composition root needs before the
//! window exists. The native binary fills it from the command line, the web
//! entry point uses [`AppConfig::default`].

use std::path::PathBuf;

use crate::scene::SceneVariant;

/// Damping factor of the orbit controller when none is configured.
pub const DEFAULT_DAMPING_FACTOR: f32 = 0.05;

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    /// Which of the two scene layouts to build.
    pub variant: SceneVariant,
    /// Directory that texture paths are resolved against (native only).
    pub assets_dir: PathBuf,
    /// Whether the orbit controller eases toward its target instead of snapping.
    pub damping: bool,
    /// Fraction of the pending rotation applied per update step.
    pub damping_factor: f32,
    pub window_title: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            variant: SceneVariant::default(),
            assets_dir: PathBuf::from("./assets"),
            damping: true,
            damping_factor: DEFAULT_DAMPING_FACTOR,
            window_title: "snowscape".to_string(),
        }
    }
}

impl AppConfig {
    pub fn with_variant(mut self, variant: SceneVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_assets_dir(mut self, assets_dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = assets_dir.into();
        self
    }

    /// Disable damping or change its factor. Factors outside (0, 1] are clamped.
    pub fn with_damping(mut self, enabled: bool, factor: f32) -> Self {
        self.damping = enabled;
        self.damping_factor = factor.clamp(f32::EPSILON, 1.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build_the_overlook_scene() {
        let config = AppConfig::default();
        assert_eq!(config.variant, SceneVariant::Overlook);
        assert!(config.damping);
        assert_eq!(config.damping_factor, 0.05);
    }

    #[test]
    fn damping_factor_is_clamped() {
        let config = AppConfig::default().with_damping(true, 3.0);
        assert_eq!(config.damping_factor, 1.0);
        let config = AppConfig::default().with_damping(false, -1.0);
        assert!(!config.damping);
        assert!(config.damping_factor > 0.0);
    }
}
