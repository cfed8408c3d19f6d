//! Range checks for physical inputs
//!
//! Gridded products arrive in a mix of units (Kelvin vs Celsius, Pa vs hPa, ppm vs
//! atm) and a wrong guess silently produces fluxes that are orders of magnitude off.
//! Each input is therefore checked against plausible limits before use.
//!
//! Values outside the limits are handled according to a [`CheckAction`]. Independently
//! of the action, if more than half of the valid values are outside the limits the
//! input is assumed to be in the wrong units and an error is returned.

use crate::constants::{STANDARD_PRESSURE_HPA, ZERO_CELSIUS_K};
use crate::errors::{SeaFluxError, SeaFluxResult};
use crate::field::{Field, FloatValue};
use log::warn;
use serde::{Deserialize, Serialize};

/// What to do with values that fall outside the limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckAction {
    /// Return an error if any value is outside
    Raise,
    /// Log a warning and mask outside values with NaN
    #[default]
    Warn,
    /// Mask outside values with NaN without logging
    Quiet,
    /// Leave the data untouched
    Ignore,
}

/// Exclusive lower and upper limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    pub lower: FloatValue,
    pub upper: FloatValue,
}

impl Limits {
    pub const fn new(lower: FloatValue, upper: FloatValue) -> Self {
        Self { lower, upper }
    }

    /// True if the value is below the lower or above the upper limit. NaN is never outside.
    pub fn is_outside(&self, value: FloatValue) -> bool {
        value < self.lower || value > self.upper
    }
}

/// Check that a field falls within the given limits
///
/// Fields with two or fewer elements are returned unchanged.
pub fn check_bounds(
    field: &Field,
    limits: Limits,
    action: CheckAction,
    name: &str,
) -> SeaFluxResult<Field> {
    if field.len() <= 2 {
        return Ok(field.clone());
    }

    let outside = field.iter().filter(|v| limits.is_outside(**v)).count();
    let valid = field.iter().filter(|v| !v.is_nan()).count();

    if outside as f64 > valid as f64 * 0.5 {
        return Err(SeaFluxError::OutOfRange {
            name: name.to_string(),
            count: outside,
            valid,
            lower: limits.lower,
            upper: limits.upper,
        });
    }

    if outside == 0 {
        return Ok(field.clone());
    }

    match action {
        CheckAction::Raise => Err(SeaFluxError::OutOfRange {
            name: name.to_string(),
            count: outside,
            valid,
            lower: limits.lower,
            upper: limits.upper,
        }),
        CheckAction::Warn => {
            warn!(
                "{} values of {} fall outside the limits ({}, {}) and are masked",
                outside, name, limits.lower, limits.upper
            );
            Ok(mask_outside(field, limits))
        }
        CheckAction::Quiet => Ok(mask_outside(field, limits)),
        CheckAction::Ignore => Ok(field.clone()),
    }
}

fn mask_outside(field: &Field, limits: Limits) -> Field {
    field.mapv(|v| if limits.is_outside(v) { FloatValue::NAN } else { v })
}

/// Original values wherever the converted copy survived the check
fn keep_unmasked(original: &Field, checked: &Field) -> Field {
    let mut out = original.clone();
    out.zip_mut_with(checked, |o, c| {
        if c.is_nan() {
            *o = FloatValue::NAN;
        }
    });
    out
}

/// Limits for each checked input, together with the action to take
///
/// The limits admit unusual but real observations and reject values in the
/// wrong units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitChecks {
    /// Action applied to every check.
    /// default: warn
    pub action: CheckAction,
    /// Temperature (K).
    /// default: (270, 318.5)
    pub temperature_k: Limits,
    /// Pressure (atm).
    /// default: (0.5, 1.5)
    pub pressure_atm: Limits,
    /// CO2 mole fraction or partial pressure (atm).
    /// default: (5e-6, 0.08)
    pub co2_mol: Limits,
    /// Salinity (PSU).
    /// default: (0, 50)
    pub salinity: Limits,
    /// Wind speed (m/s).
    /// default: (0, 50)
    pub wind_ms: Limits,
    /// Sea ice fraction.
    /// default: (0, 1)
    pub ice: Limits,
}

impl Default for UnitChecks {
    fn default() -> Self {
        Self {
            action: CheckAction::Warn,
            temperature_k: Limits::new(270.0, 318.5),
            pressure_atm: Limits::new(0.5, 1.5),
            co2_mol: Limits::new(5e-6, 0.08),
            salinity: Limits::new(0.0, 50.0),
            wind_ms: Limits::new(0.0, 50.0),
            ice: Limits::new(0.0, 1.0),
        }
    }
}

impl UnitChecks {
    /// Same limits, different action
    pub fn with_action(action: CheckAction) -> Self {
        Self {
            action,
            ..Default::default()
        }
    }

    pub fn temperature_k(&self, field: &Field) -> SeaFluxResult<Field> {
        check_bounds(field, self.temperature_k, self.action, "temperature (K)")
    }

    /// Checks a temperature given in degrees C against the Kelvin limits.
    pub fn temperature_c(&self, field: &Field) -> SeaFluxResult<Field> {
        let kelvin = field.mapv(|t| t + ZERO_CELSIUS_K);
        Ok(keep_unmasked(field, &self.temperature_k(&kelvin)?))
    }

    pub fn pressure_atm(&self, field: &Field) -> SeaFluxResult<Field> {
        check_bounds(field, self.pressure_atm, self.action, "pressure (atm)")
    }

    /// Checks a pressure given in hPa against the atmosphere limits.
    pub fn pressure_hpa(&self, field: &Field) -> SeaFluxResult<Field> {
        let atm = field.mapv(|p| p / STANDARD_PRESSURE_HPA);
        Ok(keep_unmasked(field, &self.pressure_atm(&atm)?))
    }

    pub fn co2_mol(&self, field: &Field) -> SeaFluxResult<Field> {
        check_bounds(field, self.co2_mol, self.action, "CO2 mole fraction")
    }

    /// Checks a CO2 partial pressure given in µatm against the mole fraction limits.
    pub fn co2_uatm(&self, field: &Field) -> SeaFluxResult<Field> {
        let atm = field.mapv(|c| c * 1e-6);
        Ok(keep_unmasked(field, &self.co2_mol(&atm)?))
    }

    pub fn salinity(&self, field: &Field) -> SeaFluxResult<Field> {
        check_bounds(field, self.salinity, self.action, "salinity (PSU)")
    }

    pub fn wind_ms(&self, field: &Field) -> SeaFluxResult<Field> {
        check_bounds(field, self.wind_ms, self.action, "wind speed (m/s)")
    }

    pub fn ice_fraction(&self, field: &Field) -> SeaFluxResult<Field> {
        check_bounds(field, self.ice, self.action, "sea ice fraction")
    }
}
