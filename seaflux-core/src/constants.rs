//! Physical constants shared across modules

use crate::field::FloatValue;

/// 0 °C in Kelvin
pub const ZERO_CELSIUS_K: FloatValue = 273.15;

/// One standard atmosphere in hPa
pub const STANDARD_PRESSURE_HPA: FloatValue = 1013.25;

/// Molar mass of carbon (g/mol)
pub const CARBON_MOLAR_MASS: FloatValue = 12.0108;

/// Days per year used when annualising daily fluxes
pub const DAYS_PER_YEAR: FloatValue = 365.0;

/// Grams in a petagram
pub const GRAMS_PER_PETAGRAM: FloatValue = 1e15;

/// Gas constant (cm³ atm / (mol K)) used by the virial expansion
pub const GAS_CONSTANT_VIRIAL: FloatValue = 82.057;
