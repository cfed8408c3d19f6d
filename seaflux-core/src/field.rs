//! Gridded fields and elementwise plumbing
//!
//! Every physical quantity in this crate is carried as a [`Field`]: an n-dimensional
//! array of [`FloatValue`]. Gridded products are conventionally shaped
//! `(time, lat, lon)`, but nothing here depends on that; inputs are combined using
//! NumPy broadcasting rules so that a scalar pressure can be paired with a full
//! temperature grid.
//!
//! ```rust
//! use ndarray::array;
//! use seaflux_core::field::{map_fields, scalar};
//!
//! let temp = array![[10.0, 12.0], [14.0, 16.0]].into_dyn();
//! let offset = scalar(273.15);
//! let kelvin = map_fields([&temp, &offset], |[t, o]| t + o).unwrap();
//! assert_eq!(kelvin.shape(), &[2, 2]);
//! assert!((kelvin[[1, 1]] - 289.15).abs() < 1e-12);
//! ```

use crate::errors::{SeaFluxError, SeaFluxResult};
use ndarray::{arr0, ArrayD, IxDyn};
use num::Float;

pub type FloatValue = f64;

/// An n-dimensional array of values
pub type Field = ArrayD<FloatValue>;

/// Create a 0-dimensional field holding a single value
pub fn scalar(value: FloatValue) -> Field {
    arr0(value).into_dyn()
}

/// Resolve the shape that a set of shapes broadcast to
///
/// Follows NumPy semantics: trailing axes are aligned and an axis of length 1
/// stretches to match the other operand.
pub fn broadcast_shape(shapes: &[&[usize]]) -> SeaFluxResult<Vec<usize>> {
    let mut out: Vec<usize> = Vec::new();

    for shape in shapes {
        let ndim = out.len().max(shape.len());
        let mut merged = vec![1; ndim];

        for k in 0..ndim {
            let a = out.len().checked_sub(k + 1).map_or(1, |i| out[i]);
            let b = shape.len().checked_sub(k + 1).map_or(1, |i| shape[i]);
            merged[ndim - 1 - k] = match (a, b) {
                (a, b) if a == b => a,
                (1, b) => b,
                (a, 1) => a,
                _ => {
                    return Err(SeaFluxError::ShapeMismatch {
                        left: out.clone(),
                        right: shape.to_vec(),
                    })
                }
            };
        }
        out = merged;
    }

    Ok(out)
}

/// Apply an elementwise function over several broadcast fields
///
/// The closure receives one value from each input, in the order given.
pub fn map_fields<const N: usize, F>(fields: [&Field; N], f: F) -> SeaFluxResult<Field>
where
    F: Fn([FloatValue; N]) -> FloatValue,
{
    let shapes: Vec<&[usize]> = fields.iter().map(|field| field.shape()).collect();
    let shape = broadcast_shape(&shapes)?;

    let views = fields
        .iter()
        .map(|field| {
            field
                .broadcast(shape.as_slice())
                .ok_or_else(|| SeaFluxError::ShapeMismatch {
                    left: field.shape().to_vec(),
                    right: shape.clone(),
                })
        })
        .collect::<SeaFluxResult<Vec<_>>>()?;

    let mut iters: Vec<_> = views.iter().map(|view| view.iter()).collect();
    let len: usize = shape.iter().product();
    let mut values = Vec::with_capacity(len);

    for _ in 0..len {
        let mut args = [FloatValue::NAN; N];
        for (arg, iter) in args.iter_mut().zip(iters.iter_mut()) {
            if let Some(v) = iter.next() {
                *arg = *v;
            }
        }
        values.push(f(args));
    }

    Field::from_shape_vec(IxDyn(&shape), values).map_err(|e| SeaFluxError::Error(e.to_string()))
}

/// Sum that skips NaN values (an all-NaN input sums to zero)
pub fn nan_sum<'a, T: Float + 'a>(values: impl IntoIterator<Item = &'a T>) -> T {
    values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold(T::zero(), |acc, &v| acc + v)
}

/// Mean that skips NaN values (an all-NaN input gives NaN)
pub fn nan_mean<'a, T: Float + 'a>(values: impl IntoIterator<Item = &'a T>) -> T {
    let (sum, count) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((T::zero(), 0usize), |(sum, count), &v| (sum + v, count + 1));

    match T::from(count) {
        Some(n) if count > 0 => sum / n,
        _ => T::nan(),
    }
}

/// Weighted mean that skips pairs where either the value or the weight is NaN
///
/// Returns NaN when the remaining weights sum to zero.
pub fn weighted_nan_mean<'a, T: Float + 'a>(
    values: impl IntoIterator<Item = &'a T>,
    weights: impl IntoIterator<Item = &'a T>,
) -> T {
    let (numerator, denominator) = values
        .into_iter()
        .zip(weights)
        .filter(|(v, w)| !v.is_nan() && !w.is_nan())
        .fold((T::zero(), T::zero()), |(num, den), (&v, &w)| {
            (num + v * w, den + w)
        });

    if denominator == T::zero() {
        T::nan()
    } else {
        numerator / denominator
    }
}
