//! Runtime configuration.
//!
//! [`Config::default`] reproduces the reference playground: a camera orbiting
//! the origin at radius 20, never dipping below height 2, turning 0.02 rad
//! per tick, and a clock advancing 0.01 per tick.

use std::path::PathBuf;

use anyhow::bail;
use cgmath::{Deg, Point3};

use crate::animation::Timing;

/// Refresh rate `Timing::Scaled` is calibrated against.
pub const REFERENCE_HZ: f32 = 60.0;

const ASSET_ROOT_VAR: &str = "FLOW_PLAYGROUND_ASSETS";
const TIMING_VAR: &str = "FLOW_PLAYGROUND_TIMING";

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub orbit_radius: f32,
    pub min_height: f32,
    pub look_at: Point3<f32>,
    /// Orbit angle change per tick per held key, radians.
    pub angle_step: f32,
    /// Clock advance per tick.
    pub clock_step: f32,
    pub timing: Timing,
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
    /// Directory asset paths are resolved against.
    pub asset_root: PathBuf,
    pub title: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            orbit_radius: 20.0,
            min_height: 2.0,
            look_at: Point3::new(0.0, 0.0, 0.0),
            angle_step: 0.02,
            clock_step: 0.01,
            timing: Timing::FixedStep,
            fovy: Deg(75.0),
            znear: 0.1,
            zfar: 1000.0,
            asset_root: PathBuf::from("assets"),
            title: "flow playground".to_string(),
        }
    }
}

impl Config {
    /// Defaults, overridden by `FLOW_PLAYGROUND_ASSETS` (asset directory) and
    /// `FLOW_PLAYGROUND_TIMING` (`fixed` or `scaled`).
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Ok(root) = std::env::var(ASSET_ROOT_VAR) {
            config.asset_root = PathBuf::from(root);
        }
        if let Ok(timing) = std::env::var(TIMING_VAR) {
            config.timing = parse_timing(&timing)?;
        }
        Ok(config)
    }

    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = root.into();
        self
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }
}

pub fn parse_timing(value: &str) -> anyhow::Result<Timing> {
    match value.trim().to_ascii_lowercase().as_str() {
        "fixed" => Ok(Timing::FixedStep),
        "scaled" => Ok(Timing::Scaled {
            reference_hz: REFERENCE_HZ,
        }),
        other => bail!("{TIMING_VAR} must be `fixed` or `scaled`, got `{other}`"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_names() {
        assert_eq!(parse_timing("fixed").unwrap(), Timing::FixedStep);
        assert_eq!(
            parse_timing(" Scaled ").unwrap(),
            Timing::Scaled { reference_hz: 60.0 }
        );
        assert!(parse_timing("wallclock").is_err());
    }
}
