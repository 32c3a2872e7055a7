//! NaN-aware mean reductions over grid axes.
//!
//! Averaging ignores NaN entries per reduction group; a group that is
//! entirely NaN yields NaN rather than an error. Reductions run as
//! `(sum, count)` folds along one axis at a time, so no intermediate buffer
//! larger than the pointwise field itself is required.

use crate::models::ReductionMode;

use ndarray::{ArrayD, Axis};

/// A reduced pointwise-error field.
#[derive(Clone, Debug, PartialEq)]
pub struct Reduced {
    /// Dimension names kept by the reduction
    pub dims: Vec<String>,
    /// Shape of the reduced values. Empty for a scalar.
    pub shape: Vec<usize>,
    /// Reduced values
    pub values: ArrayD<f64>,
}

/// Reduce a pointwise error field according to `mode`.
///
/// `dims` names the axes of `field` in order. The field must declare every
/// dimension the mode reduces over; the pipeline validates this before any
/// field is materialised.
pub fn reduce(field: &ArrayD<f64>, dims: &[String], mode: ReductionMode) -> Reduced {
    let mut axes: Vec<usize> = mode
        .reduced_dims()
        .iter()
        .map(|reduced| {
            dims.iter()
                .position(|dim| dim == reduced)
                .expect("pointwise fields declare the required dimensions")
        })
        .collect();
    axes.sort_unstable();
    let values = nanmean_axes(field, &axes);
    let kept = dims
        .iter()
        .filter(|dim| !mode.reduced_dims().contains(&dim.as_str()))
        .cloned()
        .collect();
    Reduced {
        dims: kept,
        shape: values.shape().to_vec(),
        values,
    }
}

/// NaN-excluding mean over one or more axes of the provided array.
///
/// Folds `(sum, count)` over the first axis, then folds the partial tuples
/// over the remaining axes before dividing. Groups with a zero count come
/// out as NaN.
pub fn nanmean_axes(values: &ArrayD<f64>, axes: &[usize]) -> ArrayD<f64> {
    if axes.is_empty() {
        return values.clone();
    }
    // Sum and count non-NaN entries over the first axis.
    let mut acc = values
        .fold_axis(Axis(axes[0]), (0.0_f64, 0_i64), |(sum, count), value| {
            if value.is_nan() {
                (*sum, *count)
            } else {
                (*sum + *value, *count + 1)
            }
        })
        .into_dyn();
    // Combine partial sums over the remaining axes.
    if let Some(remaining_axes) = axes.get(1..) {
        for (n, axis) in remaining_axes.iter().enumerate() {
            acc = acc
                .fold_axis(
                    Axis(axis - n - 1),
                    (0.0_f64, 0_i64),
                    |(total_sum, total_count), (sum, count)| {
                        (*total_sum + *sum, *total_count + *count)
                    },
                )
                .into_dyn();
        }
    }
    acc.mapv(|(sum, count)| {
        if count == 0 {
            f64::NAN
        } else {
            sum / count as f64
        }
    })
}

/// NaN-excluding mean of all entries.
pub fn nanmean(values: &ArrayD<f64>) -> f64 {
    let (sum, count) = values.fold((0.0_f64, 0_i64), |(sum, count), value| {
        if value.is_nan() {
            (sum, count)
        } else {
            (sum + value, count + 1)
        }
    });
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}
