//! Filling gaps in surface ocean pCO2
//!
//! Observation-based pCO2 products often leave out marginal seas and the high
//! latitudes, so their global flux integrals cover different areas. Missing cells
//! can be taken from a climatology scaled to the level of the product at each
//! time step (Fay et al. 2021):
//!
//! $$ s(t) = \frac{\sum_{ij} A_{ij} \, r_{tij} / c_{tij}}{\sum_{ij} A_{ij}} $$
//!
//! where $r$ is the reference product, $c$ the climatology and only cells where
//! both are valid contribute to the area-weighted mean.

use crate::errors::{SeaFluxError, SeaFluxResult};
use crate::field::{map_fields, weighted_nan_mean, Field, FloatValue};
use log::{info, warn};

/// A climatology scaled to a reference product
#[derive(Debug, Clone)]
pub struct ScaledClimatology {
    /// Area-weighted mean of reference / climatology, one value per time step
    pub scaling_factor: Vec<FloatValue>,
    /// Climatology multiplied by the scaling factor, shape `(time, lat, lon)`
    pub filler: Field,
}

/// Scale `climatology` to `reference`
///
/// Both fields have shape `(time, lat, lon)` and `area` (m²) matches the last two
/// axes. Cells where the climatology is zero are skipped. A time step without any
/// overlap between the two products gets a NaN factor.
pub fn scaled_climatology(reference: &Field, climatology: &Field, area: &Field) -> SeaFluxResult<ScaledClimatology> {
    if reference.shape() != climatology.shape() {
        return Err(SeaFluxError::ShapeMismatch {
            left: reference.shape().to_vec(),
            right: climatology.shape().to_vec(),
        });
    }
    if reference.ndim() != 3 || area.shape() != &reference.shape()[1..] {
        return Err(SeaFluxError::ShapeMismatch {
            left: reference.shape().to_vec(),
            right: area.shape().to_vec(),
        });
    }

    let scaling_factor: Vec<FloatValue> = reference
        .outer_iter()
        .zip(climatology.outer_iter())
        .map(|(r, c)| {
            let ratio: Vec<FloatValue> = r
                .iter()
                .zip(c.iter())
                .map(|(r, c)| {
                    let q = r / c;
                    if q.is_finite() {
                        q
                    } else {
                        FloatValue::NAN
                    }
                })
                .collect();
            weighted_nan_mean(ratio.iter(), area.iter())
        })
        .collect();

    let missing = scaling_factor.iter().filter(|s| s.is_nan()).count();
    if missing > 0 {
        warn!("{} time steps have no overlap with the climatology", missing);
    }
    info!("Scaled climatology over {} time steps", scaling_factor.len());

    let mut filler = climatology.clone();
    for (mut step, factor) in filler.outer_iter_mut().zip(&scaling_factor) {
        step.mapv_inplace(|c| c * factor);
    }

    Ok(ScaledClimatology { scaling_factor, filler })
}

/// Replace missing values of `data` with `filler`
pub fn fill_missing(data: &Field, filler: &Field) -> SeaFluxResult<Field> {
    map_fields([data, filler], |[d, f]| if d.is_nan() { f } else { d })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2, Array3, Axis};

    fn climatology() -> Field {
        Array3::from_shape_fn((2, 3, 4), |(_, i, j)| 350.0 + 10.0 * i as f64 + j as f64).into_dyn()
    }

    #[test]
    fn uniform_ratio_is_recovered() {
        let clim = climatology();
        let mut reference = clim.mapv(|c| c * 1.1);
        // the product only covers the first two latitudes
        for t in 0..2 {
            for j in 0..4 {
                reference[[t, 2, j]] = f64::NAN;
            }
        }
        let area = Array2::<f64>::ones((3, 4)).into_dyn();

        let scaled = scaled_climatology(&reference, &clim, &area).unwrap();
        for factor in &scaled.scaling_factor {
            assert!((factor - 1.1).abs() < 1e-12, "{}", factor);
        }

        let filled = fill_missing(&reference, &scaled.filler).unwrap();
        assert!(filled.iter().all(|v| v.is_finite()));
        assert_eq!(filled[[0, 0, 0]], reference[[0, 0, 0]]);
        assert!((filled[[1, 2, 3]] - clim[[1, 2, 3]] * 1.1).abs() < 1e-9);
    }

    #[test]
    fn ratio_is_weighted_by_area() {
        let clim = Array3::from_elem((1, 2, 1), 400.0).into_dyn();
        let reference = array![[[400.0], [800.0]]].into_dyn();
        let area = array![[3.0], [1.0]].into_dyn();

        let scaled = scaled_climatology(&reference, &clim, &area).unwrap();
        assert!((scaled.scaling_factor[0] - 1.25).abs() < 1e-12);
        assert!((scaled.filler[[0, 1, 0]] - 500.0).abs() < 1e-9);
    }

    #[test]
    fn steps_without_overlap() {
        let clim = climatology();
        let mut reference = clim.clone();
        reference.index_axis_mut(Axis(0), 1).fill(f64::NAN);
        let area = Array2::<f64>::ones((3, 4)).into_dyn();

        let scaled = scaled_climatology(&reference, &clim, &area).unwrap();
        assert!((scaled.scaling_factor[0] - 1.0).abs() < 1e-12);
        assert!(scaled.scaling_factor[1].is_nan());
        assert!(scaled.filler.index_axis(Axis(0), 1).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn zero_climatology_is_skipped() {
        let clim = array![[[0.0, 400.0]]].into_dyn();
        let reference = array![[[300.0, 440.0]]].into_dyn();
        let area = array![[1.0, 1.0]].into_dyn();
        let scaled = scaled_climatology(&reference, &clim, &area).unwrap();
        assert!((scaled.scaling_factor[0] - 1.1).abs() < 1e-12);
    }

    #[test]
    fn shapes_must_agree() {
        let clim = climatology();
        let area = array![[1.0, 1.0]].into_dyn();
        assert!(scaled_climatology(&clim, &clim, &area).is_err());
        assert!(scaled_climatology(&clim, &array![1.0].into_dyn(), &area).is_err());
    }
}
