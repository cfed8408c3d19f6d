//! Air-sea CO2 flux
//!
//! Fluxes are in gC m⁻² day⁻¹ with the sea-to-air direction positive, so a
//! negative flux is uptake by the ocean.
//!
//! The bulk formulation is
//!
//! $$ F = k_w K_0 (fCO_2^{sea} - fCO_2^{air}) $$
//!
//! where both fugacities come from the partial pressures through the virial
//! coefficient at the sea surface temperature. With kw in cm/hr, K0 in
//! mol L⁻¹ atm⁻¹ and fCO2 in µatm the conversion to gC m⁻² day⁻¹ is
//! `0.24 × 1e-6 × 12.0108e3`.

use crate::constants::{CARBON_MOLAR_MASS, DAYS_PER_YEAR, GRAMS_PER_PETAGRAM, STANDARD_PRESSURE_HPA, ZERO_CELSIUS_K};
use crate::conversion::virial_coeff;
use crate::errors::{SeaFluxError, SeaFluxResult};
use crate::field::{map_fields, Field, FloatValue};
use crate::gas_transfer::{self, GasTransferVelocity};
use crate::solubility;
use serde::{Deserialize, Serialize};

/// cm/hr to m/day
const CM_PER_HOUR_TO_M_PER_DAY: FloatValue = 24.0 / 100.0;

/// g/mol to g/mmol, so that mol L⁻¹ becomes mmol m⁻³
const CARBON_G_PER_MMOL_M3: FloatValue = CARBON_MOLAR_MASS * 1000.0;

/// Bulk flux for a single cell
///
/// Both partial pressures are converted to fugacity before taking the
/// difference, since K0 is defined per unit fugacity.
///
/// * `temp_c` - sea surface temperature (°C)
/// * `salinity` - sea surface salinity (PSU)
/// * `pco2_sea`, `pco2_air` - partial pressures (µatm)
/// * `pres_hpa` - sea level pressure (hPa)
/// * `kw` - gas transfer velocity (cm/hr)
pub fn bulk(
    temp_c: FloatValue,
    salinity: FloatValue,
    pco2_sea: FloatValue,
    pco2_air: FloatValue,
    pres_hpa: FloatValue,
    kw: FloatValue,
) -> FloatValue {
    let temp_k = temp_c + ZERO_CELSIUS_K;
    let pres_atm = pres_hpa / STANDARD_PRESSURE_HPA;
    let k0 = solubility::weiss1974(salinity, temp_k, pres_atm);
    let fco2_delta = (pco2_sea - pco2_air) * virial_coeff(temp_k, pres_atm, None);
    kw * CM_PER_HOUR_TO_M_PER_DAY * k0 * fco2_delta * 1e-6 * CARBON_G_PER_MMOL_M3
}

/// Bulk flux over broadcast fields, see [`bulk`]
pub fn bulk_field(
    temp_c: &Field,
    salinity: &Field,
    pco2_sea: &Field,
    pco2_air: &Field,
    pres_hpa: &Field,
    kw: &Field,
) -> SeaFluxResult<Field> {
    map_fields(
        [temp_c, salinity, pco2_sea, pco2_air, pres_hpa, kw],
        |[t, s, sea, air, p, k]| bulk(t, s, sea, air, p, k),
    )
}

/// Scale fluxes by the open water fraction
///
/// Cells fully covered by ice have zero flux. A missing ice fraction is treated
/// as open water.
pub fn ice_corrected(flux: &Field, ice: &Field) -> SeaFluxResult<Field> {
    map_fields([flux, ice], |[f, i]| {
        if i.is_nan() {
            f
        } else {
            f * (1.0 - i)
        }
    })
}

/// Temperature and salinity differences between the skin and foundation layers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkinBiases {
    /// Foundation minus skin temperature, subtracted from the bulk temperature
    /// unit: K
    /// default: 0.14
    pub cool_skin: FloatValue,
    /// Added to the bulk salinity by evaporation at the surface
    /// unit: PSU
    /// default: 0.1
    pub salty_skin: FloatValue,
}

impl Default for SkinBiases {
    fn default() -> Self {
        Self {
            cool_skin: 0.14,
            salty_skin: 0.1,
        }
    }
}

/// Flux from the skin and foundation concentrations (Woolf et al. 2016, rapid model)
///
/// Bulk temperature and salinity are taken as the foundation values and the skin
/// values derived with `biases`. The seawater concentration uses foundation
/// solubility and temperature, the air-side concentration uses skin values, and
/// kw is evaluated at the skin temperature from `wind_ms` (m/s).
#[allow(clippy::too_many_arguments)]
pub fn woolf2016_rapid(
    temp_c: &Field,
    salinity: &Field,
    pco2_sea: &Field,
    pco2_air: &Field,
    pres_hpa: &Field,
    wind_ms: &Field,
    param: &dyn GasTransferVelocity,
    biases: &SkinBiases,
) -> SeaFluxResult<Field> {
    let temp_skin_c = temp_c.mapv(|t| t - biases.cool_skin);
    let kw = gas_transfer::transfer_velocity(param, wind_ms, None, &temp_skin_c)?;
    woolf2016_rapid_kw(temp_c, salinity, pco2_sea, pco2_air, pres_hpa, &kw, biases)
}

/// As [`woolf2016_rapid`] with a precomputed transfer velocity (cm/hr)
pub fn woolf2016_rapid_kw(
    temp_c: &Field,
    salinity: &Field,
    pco2_sea: &Field,
    pco2_air: &Field,
    pres_hpa: &Field,
    kw: &Field,
    biases: &SkinBiases,
) -> SeaFluxResult<Field> {
    let delta_t = biases.cool_skin;
    map_fields(
        [temp_c, salinity, pco2_sea, pco2_air, pres_hpa, kw],
        |[t, s, sea, air, p, k]| {
            let p_atm = p / STANDARD_PRESSURE_HPA;
            let t_fnd = t + ZERO_CELSIUS_K;
            let t_skn = t_fnd - delta_t;
            let s_skn = s + biases.salty_skin;

            let fco2_sea = sea * 1e-6 * virial_coeff(t_fnd, p_atm, None);
            let fco2_air = air * 1e-6 * virial_coeff(t_skn, p_atm, None);

            let k0_fnd = solubility::woolf2016(s, t_fnd, delta_t, p_atm);
            let k0_skn = solubility::woolf2016(s_skn, t_skn, delta_t, p_atm);

            let conc_sea = k0_fnd * fco2_sea * CARBON_G_PER_MMOL_M3;
            let conc_air = k0_skn * fco2_air * CARBON_G_PER_MMOL_M3;

            k * CM_PER_HOUR_TO_M_PER_DAY * (conc_sea - conc_air)
        },
    )
}

/// Globally integrated fluxes, one value per time step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluxIntegral {
    /// gC/yr
    pub grams_per_year: Vec<FloatValue>,
}

impl FluxIntegral {
    /// PgC/yr
    pub fn petagrams_per_year(&self) -> Vec<FloatValue> {
        self.grams_per_year
            .iter()
            .map(|g| g / GRAMS_PER_PETAGRAM)
            .collect()
    }

    /// Total uptake (PgC) over steps of the given lengths in years
    pub fn total_petagrams(&self, step_years: &[FloatValue]) -> SeaFluxResult<FloatValue> {
        if step_years.len() != self.grams_per_year.len() {
            return Err(SeaFluxError::ShapeMismatch {
                left: vec![self.grams_per_year.len()],
                right: vec![step_years.len()],
            });
        }
        Ok(self
            .petagrams_per_year()
            .iter()
            .zip(step_years)
            .map(|(pg, years)| pg * years)
            .sum())
    }
}

/// Integrate fluxes over area
///
/// `flux` (gC m⁻² day⁻¹) must end in the two axes of `area` (m², shape
/// `(lat, lon)`); leading axes are treated as time steps. NaN cells are skipped.
pub fn integrate_global(flux: &Field, area: &Field, days_per_year: Option<FloatValue>) -> SeaFluxResult<FluxIntegral> {
    let days = days_per_year.unwrap_or(DAYS_PER_YEAR);
    let ndim = flux.ndim();
    if area.ndim() != 2 || ndim < 2 || flux.shape()[ndim - 2..] != *area.shape() {
        return Err(SeaFluxError::ShapeMismatch {
            left: flux.shape().to_vec(),
            right: area.shape().to_vec(),
        });
    }

    let cell_area: Vec<FloatValue> = area.iter().cloned().collect();
    let n_cells = cell_area.len().max(1);
    let n_steps = flux.len() / n_cells;

    let mut grams_per_year = vec![0.0; n_steps];
    for (idx, f) in flux.iter().enumerate() {
        let value = f * cell_area[idx % n_cells] * days;
        if !value.is_nan() {
            grams_per_year[idx / n_cells] += value;
        }
    }

    Ok(FluxIntegral { grams_per_year })
}
