//! Air-sea CO2 flux calculations
//!
//! Equations for the marine carbonate system quantities needed to turn gridded
//! observations (sea surface pCO2, temperature, salinity, wind, pressure and ice)
//! into sea-air CO2 fluxes, and a [`pipeline::BulkFluxPipeline`] that ties them
//! together on a latitude/longitude grid.

pub mod area;
pub mod atmospheric;
pub mod checks;
pub mod config;
pub mod constants;
pub mod conversion;
pub mod field;
pub mod filling;
pub mod flux;
pub mod gas_transfer;
pub mod pipeline;
pub mod solubility;
pub mod vapour_pressure;

pub mod errors;

#[cfg(feature = "python")]
pub mod python;
