//! Python bindings for the flux equations
//!
//! Array arguments accept any NumPy array of floats and follow NumPy
//! broadcasting. Errors are raised as `ValueError`.
//!
//! ```python
//! from seaflux._lib.core import BulkFluxPipeline, area_grid
//!
//! pipeline = BulkFluxPipeline('[gas_transfer]\ntype = "Wanninkhof2014"')
//! result = pipeline.run(lat, lon, sst, sss, spco2, slp, wind, pco2_air=apco2)
//! result["fgco2"]
//! ```

use crate::area::{self, LatLonGrid};
use crate::atmospheric::{self, MblRecord};
use crate::constants::{STANDARD_PRESSURE_HPA, ZERO_CELSIUS_K};
use crate::conversion;
use crate::errors::SeaFluxError;
use crate::field::{scalar, Field, FloatValue};
use crate::filling;
use crate::flux;
use crate::gas_transfer;
use crate::pipeline::{AtmosphericCo2, BulkFluxPipeline, FluxInputs};
use crate::solubility;
use crate::vapour_pressure::VapourPressure;
use numpy::{IntoPyArray, PyArrayDyn, PyReadonlyArrayDyn};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use std::path::PathBuf;

impl From<SeaFluxError> for PyErr {
    fn from(err: SeaFluxError) -> Self {
        PyValueError::new_err(err.to_string())
    }
}

fn pres_or_standard(pres_hpa: &Option<PyReadonlyArrayDyn<'_, FloatValue>>) -> Field {
    to_optional_field(pres_hpa).unwrap_or_else(|| scalar(STANDARD_PRESSURE_HPA))
}

type PyField<'py> = Bound<'py, PyArrayDyn<FloatValue>>;

fn to_field(array: &PyReadonlyArrayDyn<'_, FloatValue>) -> Field {
    array.as_array().to_owned()
}

fn to_optional_field(array: &Option<PyReadonlyArrayDyn<'_, FloatValue>>) -> Option<Field> {
    array.as_ref().map(to_field)
}

/// Convert pCO2 to fCO2 (µatm), optionally correcting to a second temperature
#[pyfunction]
#[pyo3(signature = (pco2_uatm, temp_c, pres_hpa=None, temp_eq_c=None))]
fn pco2_to_fco2<'py>(
    py: Python<'py>,
    pco2_uatm: PyReadonlyArrayDyn<'py, FloatValue>,
    temp_c: PyReadonlyArrayDyn<'py, FloatValue>,
    pres_hpa: Option<PyReadonlyArrayDyn<'py, FloatValue>>,
    temp_eq_c: Option<PyReadonlyArrayDyn<'py, FloatValue>>,
) -> PyResult<PyField<'py>> {
    let result = conversion::pco2_to_fco2_field(
        &to_field(&pco2_uatm),
        &to_field(&temp_c),
        &pres_or_standard(&pres_hpa),
        to_optional_field(&temp_eq_c).as_ref(),
    )?;
    Ok(result.into_pyarray_bound(py))
}

/// Convert fCO2 to pCO2 (µatm), optionally correcting to a second temperature
#[pyfunction]
#[pyo3(signature = (fco2_uatm, temp_c, pres_hpa=None, temp_eq_c=None))]
fn fco2_to_pco2<'py>(
    py: Python<'py>,
    fco2_uatm: PyReadonlyArrayDyn<'py, FloatValue>,
    temp_c: PyReadonlyArrayDyn<'py, FloatValue>,
    pres_hpa: Option<PyReadonlyArrayDyn<'py, FloatValue>>,
    temp_eq_c: Option<PyReadonlyArrayDyn<'py, FloatValue>>,
) -> PyResult<PyField<'py>> {
    let result = conversion::fco2_to_pco2_field(
        &to_field(&fco2_uatm),
        &to_field(&temp_c),
        &pres_or_standard(&pres_hpa),
        to_optional_field(&temp_eq_c).as_ref(),
    )?;
    Ok(result.into_pyarray_bound(py))
}

/// Correct pressure measured at `sensor_height` (m) to sea level (hPa)
#[pyfunction]
fn pressure_height_correction(pres_hpa: FloatValue, temp_c: FloatValue, sensor_height: FloatValue) -> FloatValue {
    conversion::pressure_height_correction(pres_hpa, temp_c, sensor_height)
}

/// CO2 solubility (mol L⁻¹ atm⁻¹) after Weiss (1974)
#[pyfunction]
#[pyo3(signature = (salinity, temp_c, pres_atm=None))]
fn solubility_weiss1974<'py>(
    py: Python<'py>,
    salinity: PyReadonlyArrayDyn<'py, FloatValue>,
    temp_c: PyReadonlyArrayDyn<'py, FloatValue>,
    pres_atm: Option<PyReadonlyArrayDyn<'py, FloatValue>>,
) -> PyResult<PyField<'py>> {
    let temp_k = temp_c.as_array().mapv(|t| t + ZERO_CELSIUS_K);
    let pres_atm = to_optional_field(&pres_atm).unwrap_or_else(|| scalar(1.0));
    let result = solubility::weiss1974_field(&to_field(&salinity), &temp_k, &pres_atm)?;
    Ok(result.into_pyarray_bound(py))
}

/// Schmidt number of CO2 in seawater
#[pyfunction]
fn schmidt_number<'py>(py: Python<'py>, temp_c: PyReadonlyArrayDyn<'py, FloatValue>) -> PyField<'py> {
    temp_c
        .as_array()
        .mapv(gas_transfer::schmidt_number)
        .into_pyarray_bound(py)
}

/// Gas transfer velocity (cm/hr) for a parameterization given by short name
///
/// Names are Li86, Wa92, Wa99, Ni00, Mc01, Ho06, Sw07, Wa09 and Wa14.
#[pyfunction]
#[pyo3(signature = (name, wind_ms, temp_c, wind_stdev=None))]
fn gas_transfer_velocity<'py>(
    py: Python<'py>,
    name: &str,
    wind_ms: PyReadonlyArrayDyn<'py, FloatValue>,
    temp_c: PyReadonlyArrayDyn<'py, FloatValue>,
    wind_stdev: Option<PyReadonlyArrayDyn<'py, FloatValue>>,
) -> PyResult<PyField<'py>> {
    let param = gas_transfer::from_name(name)?;
    let result = gas_transfer::transfer_velocity(
        param.as_ref(),
        &to_field(&wind_ms),
        to_optional_field(&wind_stdev).as_ref(),
        &to_field(&temp_c),
    )?;
    Ok(result.into_pyarray_bound(py))
}

/// Quadratic gas transfer velocity scaled to a global mean (cm/hr)
///
/// Returns the transfer velocity and the fitted coefficient.
#[pyfunction]
#[pyo3(signature = (wind_ms, temp_c, wind_stdev=None, ice=None, target=16.0))]
fn scaled_quadratic<'py>(
    py: Python<'py>,
    wind_ms: PyReadonlyArrayDyn<'py, FloatValue>,
    temp_c: PyReadonlyArrayDyn<'py, FloatValue>,
    wind_stdev: Option<PyReadonlyArrayDyn<'py, FloatValue>>,
    ice: Option<PyReadonlyArrayDyn<'py, FloatValue>>,
    target: FloatValue,
) -> PyResult<(PyField<'py>, FloatValue)> {
    let scaled = gas_transfer::scaled_quadratic(
        &to_field(&wind_ms),
        to_optional_field(&wind_stdev).as_ref(),
        &to_field(&temp_c),
        to_optional_field(&ice).as_ref(),
        target,
    )?;
    Ok((scaled.kw.into_pyarray_bound(py), scaled.alpha))
}

/// Cell area (m²) of a latitude/longitude grid given by cell centres
#[pyfunction]
fn area_grid(py: Python<'_>, lat: Vec<FloatValue>, lon: Vec<FloatValue>) -> PyResult<PyField<'_>> {
    Ok(area::area_grid(&lat, &lon)?.into_pyarray_bound(py))
}

/// Bulk sea-air flux (gC m⁻² day⁻¹)
#[pyfunction]
fn flux_bulk<'py>(
    py: Python<'py>,
    temp_c: PyReadonlyArrayDyn<'py, FloatValue>,
    salinity: PyReadonlyArrayDyn<'py, FloatValue>,
    pco2_sea: PyReadonlyArrayDyn<'py, FloatValue>,
    pco2_air: PyReadonlyArrayDyn<'py, FloatValue>,
    pres_hpa: PyReadonlyArrayDyn<'py, FloatValue>,
    kw: PyReadonlyArrayDyn<'py, FloatValue>,
) -> PyResult<PyField<'py>> {
    let result = flux::bulk_field(
        &to_field(&temp_c),
        &to_field(&salinity),
        &to_field(&pco2_sea),
        &to_field(&pco2_air),
        &to_field(&pres_hpa),
        &to_field(&kw),
    )?;
    Ok(result.into_pyarray_bound(py))
}

/// Atmospheric pCO2 (µatm) from dry air xCO2 (ppm)
#[pyfunction]
fn xco2_to_pco2<'py>(
    py: Python<'py>,
    xco2_ppm: PyReadonlyArrayDyn<'py, FloatValue>,
    slp_hpa: PyReadonlyArrayDyn<'py, FloatValue>,
    temp_c: PyReadonlyArrayDyn<'py, FloatValue>,
    salinity: PyReadonlyArrayDyn<'py, FloatValue>,
) -> PyResult<PyField<'py>> {
    let result = atmospheric::xco2_to_pco2_field(
        &to_field(&xco2_ppm),
        &to_field(&slp_hpa),
        &to_field(&temp_c),
        &to_field(&salinity),
        VapourPressure::default(),
    )?;
    Ok(result.into_pyarray_bound(py))
}

/// Climatology scaled to a reference pCO2 product, for filling its gaps
///
/// Returns the filler and the scaling factor of each time step.
#[pyfunction]
fn spco2_filler<'py>(
    py: Python<'py>,
    reference: PyReadonlyArrayDyn<'py, FloatValue>,
    climatology: PyReadonlyArrayDyn<'py, FloatValue>,
    area: PyReadonlyArrayDyn<'py, FloatValue>,
) -> PyResult<(PyField<'py>, Vec<FloatValue>)> {
    let scaled = filling::scaled_climatology(&to_field(&reference), &to_field(&climatology), &to_field(&area))?;
    Ok((scaled.filler.into_pyarray_bound(py), scaled.scaling_factor))
}

/// Replace NaN in `data` with `filler`
#[pyfunction]
fn fill_missing<'py>(
    py: Python<'py>,
    data: PyReadonlyArrayDyn<'py, FloatValue>,
    filler: PyReadonlyArrayDyn<'py, FloatValue>,
) -> PyResult<PyField<'py>> {
    Ok(filling::fill_missing(&to_field(&data), &to_field(&filler))?.into_pyarray_bound(py))
}

/// Extend a series with time along the first axis by one year
///
/// Returns the extended decimal-year times and values.
#[pyfunction]
#[pyo3(signature = (times, values, steps_per_year=12))]
fn extend_year<'py>(
    py: Python<'py>,
    times: Vec<FloatValue>,
    values: PyReadonlyArrayDyn<'py, FloatValue>,
    steps_per_year: usize,
) -> PyResult<(Vec<FloatValue>, PyField<'py>)> {
    let (times, values) = atmospheric::extend_year(&times, &to_field(&values), steps_per_year)?;
    Ok((times, values.into_pyarray_bound(py)))
}

/// Flux pipeline configured from TOML
///
/// An empty configuration uses the defaults: Wanninkhof (1992) scaled to a
/// global mean kw of 16 cm/hr and the bulk flux formulation.
#[pyclass]
#[pyo3(name = "BulkFluxPipeline")]
#[derive(Debug)]
pub struct PyBulkFluxPipeline(pub BulkFluxPipeline);

#[pymethods]
impl PyBulkFluxPipeline {
    #[new]
    #[pyo3(signature = (config=""))]
    fn new(config: &str) -> PyResult<Self> {
        Ok(Self(BulkFluxPipeline::from_toml_str(config)?))
    }

    #[staticmethod]
    fn from_path(path: PathBuf) -> PyResult<Self> {
        let config = crate::config::FluxConfig::from_path(path)?;
        Ok(Self(BulkFluxPipeline::new(config)))
    }

    /// The configuration as TOML, including defaults
    fn config_toml(&self) -> PyResult<String> {
        Ok(self.0.config().to_toml_string()?)
    }

    fn __repr__(&self) -> String {
        format!("{:?}", self.0)
    }

    /// Calculate fluxes on a grid
    ///
    /// Atmospheric CO2 is taken from `pco2_air` (µatm), `xco2` (ppm) or the
    /// text of a NOAA MBL file together with the decimal year of each time step,
    /// in that order of preference.
    ///
    /// Returns a dict with `fgco2`, `kw`, `k0`, `pco2_air`, `area`,
    /// `fgco2_global` (PgC/yr per step) and `kw_scaling`.
    #[pyo3(signature = (
        lat, lon, temp_c, salinity, pco2_sea, pres_hpa, wind_ms,
        pco2_air=None, xco2=None, mbl=None, times=None, wind_stdev=None, ice=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn run<'py>(
        &self,
        py: Python<'py>,
        lat: Vec<FloatValue>,
        lon: Vec<FloatValue>,
        temp_c: PyReadonlyArrayDyn<'py, FloatValue>,
        salinity: PyReadonlyArrayDyn<'py, FloatValue>,
        pco2_sea: PyReadonlyArrayDyn<'py, FloatValue>,
        pres_hpa: PyReadonlyArrayDyn<'py, FloatValue>,
        wind_ms: PyReadonlyArrayDyn<'py, FloatValue>,
        pco2_air: Option<PyReadonlyArrayDyn<'py, FloatValue>>,
        xco2: Option<PyReadonlyArrayDyn<'py, FloatValue>>,
        mbl: Option<&str>,
        times: Option<Vec<FloatValue>>,
        wind_stdev: Option<PyReadonlyArrayDyn<'py, FloatValue>>,
        ice: Option<PyReadonlyArrayDyn<'py, FloatValue>>,
    ) -> PyResult<Bound<'py, PyDict>> {
        let atmosphere = match (pco2_air, xco2, mbl) {
            (Some(pco2), _, _) => AtmosphericCo2::Pco2(to_field(&pco2)),
            (None, Some(xco2), _) => AtmosphericCo2::Xco2(to_field(&xco2)),
            (None, None, Some(text)) => {
                let times = times.ok_or_else(|| {
                    PyValueError::new_err("`times` is required to align MBL data with the inputs")
                })?;
                AtmosphericCo2::Mbl(MblRecord::parse(text)?.reindex_nearest(&times)?)
            }
            (None, None, None) => {
                return Err(PyValueError::new_err(
                    "One of `pco2_air`, `xco2` or `mbl` must be given",
                ))
            }
        };

        let inputs = FluxInputs {
            temp_c: to_field(&temp_c),
            salinity: to_field(&salinity),
            pco2_sea: to_field(&pco2_sea),
            atmosphere,
            pres_hpa: to_field(&pres_hpa),
            wind_ms: to_field(&wind_ms),
            wind_stdev: to_optional_field(&wind_stdev),
            ice: to_optional_field(&ice),
        };
        let grid = LatLonGrid::new(lat, lon)?;
        let output = py.allow_threads(|| self.0.run(&inputs, &grid))?;

        let result = PyDict::new_bound(py);
        result.set_item("fgco2", output.fgco2.into_pyarray_bound(py))?;
        result.set_item("kw", output.kw.into_pyarray_bound(py))?;
        result.set_item("k0", output.k0.into_pyarray_bound(py))?;
        result.set_item("pco2_air", output.pco2_air.into_pyarray_bound(py))?;
        result.set_item("area", output.area.into_pyarray_bound(py))?;
        result.set_item("fgco2_global", output.integral.petagrams_per_year())?;
        result.set_item("kw_scaling", output.kw_scaling)?;
        Ok(result)
    }
}

#[pymodule]
pub fn core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(pco2_to_fco2, m)?)?;
    m.add_function(wrap_pyfunction!(fco2_to_pco2, m)?)?;
    m.add_function(wrap_pyfunction!(pressure_height_correction, m)?)?;
    m.add_function(wrap_pyfunction!(solubility_weiss1974, m)?)?;
    m.add_function(wrap_pyfunction!(schmidt_number, m)?)?;
    m.add_function(wrap_pyfunction!(gas_transfer_velocity, m)?)?;
    m.add_function(wrap_pyfunction!(scaled_quadratic, m)?)?;
    m.add_function(wrap_pyfunction!(area_grid, m)?)?;
    m.add_function(wrap_pyfunction!(flux_bulk, m)?)?;
    m.add_function(wrap_pyfunction!(xco2_to_pco2, m)?)?;
    m.add_function(wrap_pyfunction!(spco2_filler, m)?)?;
    m.add_function(wrap_pyfunction!(fill_missing, m)?)?;
    m.add_function(wrap_pyfunction!(extend_year, m)?)?;
    m.add_class::<PyBulkFluxPipeline>()?;
    Ok(())
}
