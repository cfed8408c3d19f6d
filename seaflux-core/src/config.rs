//! Configuration of a flux calculation
//!
//! A [`FluxConfig`] collects every choice that changes the result of a run so
//! that it can be stored next to the output. It is usually read from TOML:
//!
//! ```toml
//! bomb_scaling = 16.0
//! lat_interpolation = "linear"
//!
//! [gas_transfer]
//! type = "Wanninkhof1992"
//! coefficient = 0.31
//! schmidt_reference = 660.0
//!
//! [checks]
//! action = "warn"
//! ```
//!
//! Missing fields fall back to their defaults.

use crate::atmospheric::LatInterpolation;
use crate::checks::UnitChecks;
use crate::constants::DAYS_PER_YEAR;
use crate::errors::{SeaFluxError, SeaFluxResult};
use crate::field::FloatValue;
use crate::flux::SkinBiases;
use crate::gas_transfer::{GasTransferVelocity, Wanninkhof1992};
use crate::vapour_pressure::VapourPressure;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Method used to turn concentration differences into a flux
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FluxMethod {
    /// kw K0 ΔpCO2
    #[default]
    Bulk,
    /// Skin and foundation layers following Woolf et al. (2016)
    Woolf2016,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FluxConfig {
    /// Target global mean kw (cm/hr) for bomb-14C scaling.
    /// Written as `false` in TOML to use the coefficients as given.
    /// default: 16.0
    #[serde(with = "bomb_scaling_repr")]
    pub bomb_scaling: Option<FloatValue>,

    /// default: bulk
    pub method: FluxMethod,

    /// Days used to annualise daily fluxes.
    /// default: 365
    pub days_per_year: FloatValue,

    /// Interpolation of MBL xCO2 onto the grid latitudes.
    /// default: linear
    pub lat_interpolation: LatInterpolation,

    /// Water vapour pressure used when converting xCO2 to pCO2.
    /// default: dickson2007
    pub vapour_pressure: VapourPressure,

    /// default: Wanninkhof (1992)
    pub gas_transfer: Box<dyn GasTransferVelocity>,

    pub checks: UnitChecks,

    /// Only used by the Woolf et al. (2016) method.
    pub skin: SkinBiases,
}

/// Global mean kw of Wanninkhof (2014)
pub const DEFAULT_BOMB_TARGET: FloatValue = 16.0;

/// `bomb_scaling` as either a target, `true` for the default target or `false`
mod bomb_scaling_repr {
    use super::{FloatValue, DEFAULT_BOMB_TARGET};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Target(FloatValue),
        Enabled(bool),
    }

    pub fn serialize<S: Serializer>(value: &Option<FloatValue>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(target) => Repr::Target(*target),
            None => Repr::Enabled(false),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<FloatValue>, D::Error> {
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Target(target) => Some(target),
            Repr::Enabled(true) => Some(DEFAULT_BOMB_TARGET),
            Repr::Enabled(false) => None,
        })
    }
}

impl Default for FluxConfig {
    fn default() -> Self {
        Self {
            bomb_scaling: Some(DEFAULT_BOMB_TARGET),
            method: FluxMethod::Bulk,
            days_per_year: DAYS_PER_YEAR,
            lat_interpolation: LatInterpolation::Linear,
            vapour_pressure: VapourPressure::Dickson2007,
            gas_transfer: Box::new(Wanninkhof1992::default()),
            checks: UnitChecks::default(),
            skin: SkinBiases::default(),
        }
    }
}

impl FluxConfig {
    pub fn from_toml_str(text: &str) -> SeaFluxResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> SeaFluxResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> SeaFluxResult<String> {
        Ok(toml::to_string(self)?)
    }

    pub fn validate(&self) -> SeaFluxResult<()> {
        if let Some(target) = self.bomb_scaling {
            if !(target > 0.0) {
                return Err(SeaFluxError::InvalidParameter {
                    name: "bomb_scaling".to_string(),
                    reason: format!("must be positive, got {}", target),
                });
            }
        }
        if !(self.days_per_year > 0.0) {
            return Err(SeaFluxError::InvalidParameter {
                name: "days_per_year".to_string(),
                reason: format!("must be positive, got {}", self.days_per_year),
            });
        }
        Ok(())
    }
}
