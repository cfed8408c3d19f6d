//! Atmospheric pCO2 in the marine boundary layer
//!
//! Atmospheric CO2 is usually reported as a dry-air mole fraction (xCO2, ppm).
//! The partial pressure seen by the ocean is reduced by the total pressure and by
//! the water vapour pressure at the sea surface:
//!
//! $$ pCO_2^{air} = xCO_2 (P - p_{H_2O}) $$
//!
//! [`MblRecord`] holds the NOAA marine boundary layer (MBL) reference product,
//! which gives xCO2 as a function of time and latitude only. It can be
//! interpolated to the latitudes of a grid and broadcast along longitude.
//! Records that stop short of the final year of an analysis can be carried one
//! year forward with [`extend_year`].

use crate::area::LatLonGrid;
use crate::constants::{STANDARD_PRESSURE_HPA, ZERO_CELSIUS_K};
use crate::errors::{SeaFluxError, SeaFluxResult};
use crate::field::{map_fields, nan_mean, Field, FloatValue};
use crate::vapour_pressure::VapourPressure;
use log::debug;
use ndarray::{Array2, Array3, Axis, Ix2};
use serde::{Deserialize, Serialize};

/// Convert atmospheric xCO2 (ppm) to pCO2 (µatm)
///
/// The water vapour pressure follows Dickson et al. (2007) at the sea surface
/// temperature and salinity.
pub fn xco2_to_pco2(xco2_ppm: FloatValue, slp_hpa: FloatValue, temp_c: FloatValue, salinity: FloatValue) -> FloatValue {
    xco2_to_pco2_with(xco2_ppm, slp_hpa, temp_c, salinity, VapourPressure::Dickson2007)
}

/// As [`xco2_to_pco2`] with a choice of water vapour pressure
pub fn xco2_to_pco2_with(
    xco2_ppm: FloatValue,
    slp_hpa: FloatValue,
    temp_c: FloatValue,
    salinity: FloatValue,
    vapour: VapourPressure,
) -> FloatValue {
    let ph2o = vapour.calculate(salinity, temp_c + ZERO_CELSIUS_K);
    xco2_ppm * (slp_hpa / STANDARD_PRESSURE_HPA - ph2o)
}

pub fn xco2_to_pco2_field(
    xco2_ppm: &Field,
    slp_hpa: &Field,
    temp_c: &Field,
    salinity: &Field,
    vapour: VapourPressure,
) -> SeaFluxResult<Field> {
    map_fields([xco2_ppm, slp_hpa, temp_c, salinity], |[x, p, t, s]| {
        xco2_to_pco2_with(x, p, t, s, vapour)
    })
}

/// Interpolation used to move MBL values onto other latitudes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatInterpolation {
    #[default]
    Linear,
    Nearest,
}

/// Number of latitude nodes in the MBL surface product
pub const MBL_NODES: usize = 41;

/// Latitudes (degrees) of nodes spaced evenly in sine of latitude
pub fn sine_latitudes(n: usize) -> Vec<FloatValue> {
    if n < 2 {
        return vec![0.0; n];
    }
    (0..n)
        .map(|i| {
            let sine = -1.0 + 2.0 * i as FloatValue / (n - 1) as FloatValue;
            sine.asin().to_degrees()
        })
        .collect()
}

/// Marine boundary layer xCO2 (ppm) by time and latitude
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MblRecord {
    /// Decimal years
    pub times: Vec<FloatValue>,
    /// Latitude of each node (degrees), ascending
    pub lat: Vec<FloatValue>,
    /// Shape `(time, lat)`
    pub xco2: Array2<FloatValue>,
}

impl MblRecord {
    pub fn new(times: Vec<FloatValue>, lat: Vec<FloatValue>, xco2: Array2<FloatValue>) -> SeaFluxResult<Self> {
        if xco2.dim() != (times.len(), lat.len()) {
            return Err(SeaFluxError::ShapeMismatch {
                left: vec![times.len(), lat.len()],
                right: xco2.shape().to_vec(),
            });
        }
        if lat.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SeaFluxError::InvalidGrid(
                "MBL latitudes must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { times, lat, xco2 })
    }

    /// Parse the NOAA MBL surface text layout
    ///
    /// Header lines start with `#` and one of them must identify the file as an
    /// MBL surface product. Each data row holds a decimal year followed by a value
    /// and uncertainty for each of the 41 sine-latitude nodes; uncertainties are
    /// dropped.
    pub fn parse(text: &str) -> SeaFluxResult<Self> {
        let mut is_surface = false;
        let mut times = Vec::new();
        let mut values = Vec::new();

        for (number, line) in text.lines().enumerate() {
            let line_no = number + 1;
            let trimmed = line.trim();
            if trimmed.starts_with('#') {
                if trimmed
                    .find("MBL")
                    .is_some_and(|i| trimmed[i..].contains("SURFACE"))
                {
                    is_surface = true;
                }
                continue;
            }
            if trimmed.is_empty() {
                continue;
            }
            if !is_surface {
                return Err(SeaFluxError::MblParse {
                    line: line_no,
                    reason: "header does not describe an MBL SURFACE file".to_string(),
                });
            }

            let columns = trimmed
                .split_whitespace()
                .map(|c| c.parse::<FloatValue>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| SeaFluxError::MblParse {
                    line: line_no,
                    reason: e.to_string(),
                })?;

            if columns.len() != 1 + 2 * MBL_NODES {
                return Err(SeaFluxError::MblParse {
                    line: line_no,
                    reason: format!(
                        "expected {} columns, found {}",
                        1 + 2 * MBL_NODES,
                        columns.len()
                    ),
                });
            }
            if let Some(previous) = times.last() {
                if columns[0] <= *previous {
                    return Err(SeaFluxError::MblParse {
                        line: line_no,
                        reason: "times must be increasing".to_string(),
                    });
                }
            }

            times.push(columns[0]);
            values.extend(columns[1..].iter().step_by(2));
        }

        if times.is_empty() {
            return Err(SeaFluxError::MblParse {
                line: text.lines().count(),
                reason: "no data rows".to_string(),
            });
        }

        debug!("Parsed {} MBL time steps", times.len());
        let xco2 = Array2::from_shape_vec((times.len(), MBL_NODES), values)
            .map_err(|e| SeaFluxError::Error(e.to_string()))?;
        Self::new(times, sine_latitudes(MBL_NODES), xco2)
    }

    /// Interpolate onto new latitudes, giving shape `(time, lat)`
    ///
    /// Latitudes outside the node range are NaN.
    pub fn interpolate_lat(&self, target: &[FloatValue], method: LatInterpolation) -> Array2<FloatValue> {
        let n_times = self.times.len();
        let mut out = Array2::from_elem((n_times, target.len()), FloatValue::NAN);

        for (j, lat) in target.iter().enumerate() {
            let Some(weights) = interpolation_weights(&self.lat, *lat, method) else {
                continue;
            };
            for t in 0..n_times {
                out[[t, j]] = weights
                    .iter()
                    .map(|(node, w)| self.xco2[[t, *node]] * w)
                    .sum();
            }
        }
        out
    }

    /// Pick the record closest in time to each target (decimal years)
    ///
    /// Ties go to the earlier record.
    pub fn reindex_nearest(&self, targets: &[FloatValue]) -> SeaFluxResult<Self> {
        let rows: Vec<usize> = targets
            .iter()
            .map(|t| nearest_index(&self.times, *t))
            .collect();
        let xco2 = self.xco2.select(Axis(0), &rows);
        Self::new(targets.to_vec(), self.lat.clone(), xco2)
    }

    /// Average the records falling in each interval `[edges[i], edges[i + 1])`
    ///
    /// Each interval is labelled by its midpoint. Intervals without records are NaN.
    pub fn resample_mean(&self, edges: &[FloatValue]) -> SeaFluxResult<Self> {
        if edges.len() < 2 || edges.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SeaFluxError::InvalidParameter {
                name: "edges".to_string(),
                reason: "at least two strictly increasing edges are required".to_string(),
            });
        }

        let n_out = edges.len() - 1;
        let mut xco2 = Array2::from_elem((n_out, self.lat.len()), FloatValue::NAN);
        for i in 0..n_out {
            let rows: Vec<usize> = self
                .times
                .iter()
                .enumerate()
                .filter(|(_, t)| **t >= edges[i] && **t < edges[i + 1])
                .map(|(row, _)| row)
                .collect();
            if rows.is_empty() {
                continue;
            }
            for j in 0..self.lat.len() {
                xco2[[i, j]] = nan_mean(rows.iter().map(|row| &self.xco2[[*row, j]]));
            }
        }

        let times = edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
        Self::new(times, self.lat.clone(), xco2)
    }

    /// Append the year after the last record, see [`extend_year`]
    pub fn extend_year(&self, steps_per_year: usize) -> SeaFluxResult<Self> {
        let (times, xco2) = extend_year(&self.times, &self.xco2.view().into_dyn().to_owned(), steps_per_year)?;
        let xco2 = xco2
            .into_dimensionality::<Ix2>()
            .map_err(|e| SeaFluxError::Error(e.to_string()))?;
        Self::new(times, self.lat.clone(), xco2)
    }

    /// xCO2 on a grid, shape `(time, lat, lon)`, constant along longitude
    pub fn to_grid(&self, grid: &LatLonGrid, method: LatInterpolation) -> Field {
        let by_lat = self.interpolate_lat(&grid.lat, method);
        let (n_lat, n_lon) = grid.shape();
        Array3::from_shape_fn((self.times.len(), n_lat, n_lon), |(t, i, _)| by_lat[[t, i]]).into_dyn()
    }

    /// Atmospheric pCO2 (µatm) on a grid
    ///
    /// The pressure, temperature and salinity fields must broadcast against
    /// `(time, lat, lon)` with this record's time steps.
    pub fn to_pco2(
        &self,
        grid: &LatLonGrid,
        method: LatInterpolation,
        vapour: VapourPressure,
        slp_hpa: &Field,
        temp_c: &Field,
        salinity: &Field,
    ) -> SeaFluxResult<Field> {
        let xco2 = self.to_grid(grid, method);
        xco2_to_pco2_field(&xco2, slp_hpa, temp_c, salinity, vapour)
    }
}

/// Index of the slot a decimal year falls into when its calendar year is split
/// into `steps_per_year` equal parts
fn year_slot(time: FloatValue, steps_per_year: usize) -> usize {
    let fraction = time - time.floor();
    ((fraction * steps_per_year as FloatValue).floor() as usize).min(steps_per_year - 1)
}

fn mean_of_rows(values: &Field, rows: &[usize]) -> Field {
    values
        .select(Axis(0), rows)
        .map_axis(Axis(0), |lane| nan_mean(lane.iter()))
}

/// Carry a series one year past its last record
///
/// `values` has time along its first axis and `times` are increasing decimal
/// years. Each year is split into `steps_per_year` slots (12 for monthly data).
/// Every slot of the year after the last record gets
///
/// $$ x_{last} + \overline{\Delta x}_{Dec \to Jan} + (\bar{x}_{slot} - \bar{x}) $$
///
/// The step is averaged over every boundary between the final slot of one year
/// and the first slot of the next. The anomaly is the climatological mean of the
/// slot minus the mean of the whole series. New records keep the position within
/// the year of the latest record in the same slot.
///
/// Returns the extended times and values.
pub fn extend_year(
    times: &[FloatValue],
    values: &Field,
    steps_per_year: usize,
) -> SeaFluxResult<(Vec<FloatValue>, Field)> {
    if steps_per_year == 0 {
        return Err(SeaFluxError::InvalidParameter {
            name: "steps_per_year".to_string(),
            reason: "at least one step per year is required".to_string(),
        });
    }
    if values.ndim() == 0 || values.shape()[0] != times.len() {
        return Err(SeaFluxError::ShapeMismatch {
            left: vec![times.len()],
            right: values.shape().to_vec(),
        });
    }
    if times.windows(2).any(|w| w[1] <= w[0]) {
        return Err(SeaFluxError::InvalidParameter {
            name: "times".to_string(),
            reason: "times must be strictly increasing".to_string(),
        });
    }

    let slots: Vec<usize> = times.iter().map(|t| year_slot(*t, steps_per_year)).collect();
    let year_starts: Vec<usize> = (1..times.len())
        .filter(|&i| {
            times[i].floor() == times[i - 1].floor() + 1.0 && slots[i] == 0 && slots[i - 1] == steps_per_year - 1
        })
        .collect();
    if year_starts.is_empty() {
        return Err(SeaFluxError::InvalidParameter {
            name: "times".to_string(),
            reason: "the series must cross at least one year boundary".to_string(),
        });
    }
    let year_ends: Vec<usize> = year_starts.iter().map(|i| i - 1).collect();
    let jumps = &values.select(Axis(0), &year_starts) - &values.select(Axis(0), &year_ends);
    let step = jumps.map_axis(Axis(0), |lane| nan_mean(lane.iter()));

    let all_rows: Vec<usize> = (0..times.len()).collect();
    let overall = mean_of_rows(values, &all_rows);
    let last = times.len() - 1;
    let start = &values.index_axis(Axis(0), last) + &step;
    let year = times[last].floor() + 1.0;

    let mut new_times = Vec::with_capacity(steps_per_year);
    let mut new_rows = Vec::with_capacity(steps_per_year);
    for slot in 0..steps_per_year {
        let rows: Vec<usize> = (0..times.len()).filter(|i| slots[*i] == slot).collect();
        let latest = *rows.last().ok_or_else(|| SeaFluxError::InvalidParameter {
            name: "times".to_string(),
            reason: format!("no records fall in step {} of the year", slot),
        })?;
        new_times.push(year + (times[latest] - times[latest].floor()));
        let anomaly = &mean_of_rows(values, &rows) - &overall;
        new_rows.push(&start + &anomaly);
    }
    debug!("Extended series of {} records into {}", times.len(), year);

    let mut views = vec![values.view()];
    views.extend(new_rows.iter().map(|row| row.view().insert_axis(Axis(0))));
    let extended = ndarray::concatenate(Axis(0), &views).map_err(|_| SeaFluxError::ShapeMismatch {
        left: values.shape().to_vec(),
        right: new_rows[0].shape().to_vec(),
    })?;

    let mut times = times.to_vec();
    times.extend(new_times);
    Ok((times, extended))
}

fn interpolation_weights(
    nodes: &[FloatValue],
    target: FloatValue,
    method: LatInterpolation,
) -> Option<Vec<(usize, FloatValue)>> {
    let first = *nodes.first()?;
    let last = *nodes.last()?;
    if target.is_nan() || target < first || target > last {
        return None;
    }

    // index of the first node above the target
    let upper = nodes.partition_point(|n| *n <= target);
    if upper == 0 {
        return Some(vec![(0, 1.0)]);
    }
    if upper == nodes.len() {
        return Some(vec![(nodes.len() - 1, 1.0)]);
    }

    let lower = upper - 1;
    let span = nodes[upper] - nodes[lower];
    let frac = (target - nodes[lower]) / span;

    match method {
        LatInterpolation::Linear => Some(vec![(lower, 1.0 - frac), (upper, frac)]),
        LatInterpolation::Nearest if frac <= 0.5 => Some(vec![(lower, 1.0)]),
        LatInterpolation::Nearest => Some(vec![(upper, 1.0)]),
    }
}

fn nearest_index(values: &[FloatValue], target: FloatValue) -> usize {
    let upper = values.partition_point(|v| *v < target);
    if upper == 0 {
        return 0;
    }
    if upper == values.len() {
        return values.len() - 1;
    }
    if target - values[upper - 1] <= values[upper] - target {
        upper - 1
    } else {
        upper
    }
}
