use std::path::PathBuf;

use clap::Parser;
use snowscape::{
    config::{AppConfig, DEFAULT_DAMPING_FACTOR},
    scene::{SceneVariant, SnowScene},
};

/// A moonlit snow field under a slowly turning planet.
#[derive(Parser, Debug)]
#[command(name = "snowscape", version, about)]
struct Cli {
    /// Scene layout to build.
    #[arg(long, value_enum, default_value_t = SceneVariant::Overlook)]
    variant: SceneVariant,

    /// Directory the texture paths are resolved against.
    #[arg(long, default_value = "./assets")]
    assets: PathBuf,

    /// Snap the camera to the pointer instead of easing toward it.
    #[arg(long)]
    no_damping: bool,

    /// Fraction of the pending camera rotation applied per frame.
    #[arg(long, default_value_t = DEFAULT_DAMPING_FACTOR)]
    damping_factor: f32,
}

impl Cli {
    fn into_config(self) -> AppConfig {
        AppConfig::default()
            .with_variant(self.variant)
            .with_assets_dir(self.assets)
            .with_damping(!self.no_damping, self.damping_factor)
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config();
    let constructors = vec![SnowScene::constructor(config.variant)];
    snowscape::flow::run(config, constructors)
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_give_the_default_config() {
        let config = Cli::parse_from(["snowscape"]).into_config();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn flags_override_the_defaults() {
        let config = Cli::parse_from([
            "snowscape",
            "--variant",
            "tiled",
            "--assets",
            "/srv/snow",
            "--no-damping",
            "--damping-factor",
            "0.2",
        ])
        .into_config();
        assert_eq!(config.variant, SceneVariant::Tiled);
        assert_eq!(config.assets_dir, PathBuf::from("/srv/snow"));
        assert!(!config.damping);
        assert_eq!(config.damping_factor, 0.2);
    }

    #[test]
    fn unknown_variants_are_rejected() {
        assert!(Cli::try_parse_from(["snowscape", "--variant", "desert"]).is_err());
    }
}
