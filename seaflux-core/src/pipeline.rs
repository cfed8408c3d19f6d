//! End-to-end flux calculation on a latitude/longitude grid
//!
//! [`BulkFluxPipeline::run`] takes raw gridded fields and produces fluxes, the
//! intermediate transfer velocity and solubility, and the global integral:
//!
//! 1. range checks on every input
//! 2. atmospheric pCO2, either given directly or derived from xCO2 / MBL data
//! 3. gas transfer velocity, optionally scaled to the bomb-14C target
//! 4. solubility and flux
//! 5. ice correction and area integration
//!
//! Fields are shaped `(time, lat, lon)` (or `(lat, lon)` for a single step). Any
//! input may instead be a lower-dimensional field that broadcasts to that shape,
//! for example a scalar pressure.

use crate::area::LatLonGrid;
use crate::atmospheric::{xco2_to_pco2_field, MblRecord};
use crate::config::{FluxConfig, FluxMethod};
use crate::constants::{STANDARD_PRESSURE_HPA, ZERO_CELSIUS_K};
use crate::errors::{SeaFluxError, SeaFluxResult};
use crate::field::{map_fields, scalar, Field, FloatValue};
use crate::flux::{self, FluxIntegral};
use crate::gas_transfer::{self, WindMoment};
use crate::solubility;
use log::{debug, info};

/// Source of atmospheric CO2
#[derive(Debug, Clone)]
pub enum AtmosphericCo2 {
    /// Partial pressure (µatm)
    Pco2(Field),
    /// Dry air mole fraction (ppm)
    Xco2(Field),
    /// MBL record, one time step per step of the other inputs
    Mbl(MblRecord),
}

/// Raw inputs to a flux calculation
#[derive(Debug, Clone)]
pub struct FluxInputs {
    /// Sea surface temperature (°C)
    pub temp_c: Field,
    /// Sea surface salinity (PSU)
    pub salinity: Field,
    /// Seawater pCO2 (µatm)
    pub pco2_sea: Field,
    pub atmosphere: AtmosphericCo2,
    /// Sea level pressure (hPa)
    pub pres_hpa: Field,
    /// Mean wind speed at 10 m (m/s)
    pub wind_ms: Field,
    /// Standard deviation of the wind within each cell (m/s)
    pub wind_stdev: Option<Field>,
    /// Sea ice fraction (0-1)
    pub ice: Option<Field>,
}

#[derive(Debug, Clone)]
pub struct FluxOutput {
    /// Sea-air flux (gC m⁻² day⁻¹), positive out of the ocean
    pub fgco2: Field,
    /// Gas transfer velocity (cm/hr)
    pub kw: Field,
    /// Solubility (mol L⁻¹ atm⁻¹)
    pub k0: Field,
    /// Atmospheric pCO2 (µatm)
    pub pco2_air: Field,
    /// Cell area (m²), shape `(lat, lon)`
    pub area: Field,
    pub integral: FluxIntegral,
    /// Scaling applied to kw: the fitted quadratic coefficient for second moment
    /// parameterizations, or a multiplicative factor otherwise
    pub kw_scaling: Option<FloatValue>,
}

/// Checked copies of the inputs
struct CheckedInputs {
    temp_c: Field,
    salinity: Field,
    pco2_sea: Field,
    pres_hpa: Field,
    wind_ms: Field,
    ice: Option<Field>,
}

#[derive(Debug, Default)]
pub struct BulkFluxPipeline {
    config: FluxConfig,
}

impl BulkFluxPipeline {
    pub fn new(config: FluxConfig) -> Self {
        Self { config }
    }

    pub fn from_toml_str(text: &str) -> SeaFluxResult<Self> {
        Ok(Self::new(FluxConfig::from_toml_str(text)?))
    }

    pub fn config(&self) -> &FluxConfig {
        &self.config
    }

    pub fn run(&self, inputs: &FluxInputs, grid: &LatLonGrid) -> SeaFluxResult<FluxOutput> {
        check_grid(&inputs.temp_c, grid)?;

        let checked = self.check_inputs(inputs)?;
        let pco2_air = self.atmospheric_pco2(inputs, &checked, grid)?;
        debug!("Atmospheric pCO2 resolved with shape {:?}", pco2_air.shape());

        let (kw, kw_scaling) = self.transfer_velocity(inputs, &checked)?;
        debug!(
            "Gas transfer velocity from {} (scaling {:?})",
            self.config.gas_transfer.name(),
            kw_scaling
        );

        let k0 = map_fields(
            [&checked.salinity, &checked.temp_c, &checked.pres_hpa],
            |[s, t, p]| solubility::weiss1974(s, t + ZERO_CELSIUS_K, p / STANDARD_PRESSURE_HPA),
        )?;

        let fgco2 = match self.config.method {
            FluxMethod::Bulk => flux::bulk_field(
                &checked.temp_c,
                &checked.salinity,
                &checked.pco2_sea,
                &pco2_air,
                &checked.pres_hpa,
                &kw,
            )?,
            FluxMethod::Woolf2016 => flux::woolf2016_rapid_kw(
                &checked.temp_c,
                &checked.salinity,
                &checked.pco2_sea,
                &pco2_air,
                &checked.pres_hpa,
                &kw,
                &self.config.skin,
            )?,
        };
        let fgco2 = match &checked.ice {
            Some(ice) => flux::ice_corrected(&fgco2, ice)?,
            None => fgco2,
        };

        let area = grid.area()?;
        let integral = flux::integrate_global(&fgco2, &area, Some(self.config.days_per_year))?;
        info!(
            "Global sea-air flux (PgC/yr): {:?}",
            integral.petagrams_per_year()
        );

        Ok(FluxOutput {
            fgco2,
            kw,
            k0,
            pco2_air,
            area,
            integral,
            kw_scaling,
        })
    }

    fn check_inputs(&self, inputs: &FluxInputs) -> SeaFluxResult<CheckedInputs> {
        let checks = &self.config.checks;
        Ok(CheckedInputs {
            temp_c: checks.temperature_c(&inputs.temp_c)?,
            salinity: checks.salinity(&inputs.salinity)?,
            pco2_sea: checks.co2_uatm(&inputs.pco2_sea)?,
            pres_hpa: checks.pressure_hpa(&inputs.pres_hpa)?,
            wind_ms: checks.wind_ms(&inputs.wind_ms)?,
            ice: inputs.ice.as_ref().map(|ice| checks.ice_fraction(ice)).transpose()?,
        })
    }

    fn atmospheric_pco2(
        &self,
        inputs: &FluxInputs,
        checked: &CheckedInputs,
        grid: &LatLonGrid,
    ) -> SeaFluxResult<Field> {
        let checks = &self.config.checks;
        match &inputs.atmosphere {
            AtmosphericCo2::Pco2(pco2) => checks.co2_uatm(pco2),
            AtmosphericCo2::Xco2(xco2) => {
                let xco2 = checks.co2_uatm(xco2)?;
                xco2_to_pco2_field(
                    &xco2,
                    &checked.pres_hpa,
                    &checked.temp_c,
                    &checked.salinity,
                    self.config.vapour_pressure,
                )
            }
            AtmosphericCo2::Mbl(record) => {
                let pco2 = record.to_pco2(
                    grid,
                    self.config.lat_interpolation,
                    self.config.vapour_pressure,
                    &checked.pres_hpa,
                    &checked.temp_c,
                    &checked.salinity,
                )?;
                checks.co2_uatm(&pco2)
            }
        }
    }

    fn transfer_velocity(
        &self,
        inputs: &FluxInputs,
        checked: &CheckedInputs,
    ) -> SeaFluxResult<(Field, Option<FloatValue>)> {
        let param = self.config.gas_transfer.as_ref();
        let stdev = inputs.wind_stdev.as_ref();
        let ice = checked.ice.as_ref();

        match (self.config.bomb_scaling, param.wind_moment()) {
            (Some(target), WindMoment::SecondMoment) => {
                let scaled =
                    gas_transfer::scaled_quadratic(&checked.wind_ms, stdev, &checked.temp_c, ice, target)?;
                Ok((scaled.kw, Some(scaled.alpha)))
            }
            (Some(target), WindMoment::Speed) => {
                let kw = gas_transfer::transfer_velocity(param, &checked.wind_ms, stdev, &checked.temp_c)?;
                let zero = scalar(0.0);
                let weights = map_fields([&kw, ice.unwrap_or(&zero)], |[_, i]| {
                    if i.is_nan() {
                        1.0
                    } else {
                        1.0 - i
                    }
                })?;
                let (kw, factor) = gas_transfer::rescale_to_mean(&kw, target, Some(&weights))?;
                Ok((kw, Some(factor)))
            }
            (None, _) => Ok((
                gas_transfer::transfer_velocity(param, &checked.wind_ms, stdev, &checked.temp_c)?,
                None,
            )),
        }
    }
}

fn check_grid(field: &Field, grid: &LatLonGrid) -> SeaFluxResult<()> {
    let shape = field.shape();
    let (n_lat, n_lon) = grid.shape();
    if shape.len() < 2 || shape[shape.len() - 2..] != [n_lat, n_lon] {
        return Err(SeaFluxError::InvalidGrid(format!(
            "temperature has shape {:?} but the grid is ({}, {})",
            shape, n_lat, n_lon
        )));
    }
    Ok(())
}
