//! Coordinate alignment of gridded variables.
//!
//! Two grids can only be compared pointwise once they cover the same
//! coordinates. Alignment restricts both variables to the intersection of
//! their coordinate values along each required axis, ordered ascending.
//! Matching is by exact numeric value; grids with incompatible resolution
//! produce an empty intersection and fail rather than being interpolated.

use crate::dataset::{GridVariable, REQUIRED_DIMS};
use crate::error::EvaluationError;

use hashbrown::{HashMap, HashSet};
use ndarray::Axis;

/// Two variables restricted to their common coordinates.
///
/// Both members have identical shape and identical coordinate vectors along
/// each axis.
#[derive(Clone, Debug)]
pub struct AlignedPair {
    pub sim: GridVariable,
    pub obs: GridVariable,
}

/// Align two variables on the intersection of their coordinates.
///
/// Fails with [EvaluationError::EmptyIntersection] if any required axis has
/// no coordinate values in common. Dimension order of each variable is
/// preserved.
pub fn align(sim: GridVariable, obs: GridVariable) -> Result<AlignedPair, EvaluationError> {
    let mut sim = sim;
    let mut obs = obs;
    for axis in REQUIRED_DIMS {
        let common = intersect(
            expect_coord(&sim, axis),
            expect_coord(&obs, axis),
        );
        if common.is_empty() {
            return Err(EvaluationError::EmptyIntersection { axis });
        }
        sim = reindex(sim, axis, &common)?;
        obs = reindex(obs, axis, &common)?;
    }
    Ok(AlignedPair { sim, obs })
}

fn expect_coord<'a>(var: &'a GridVariable, dim: &str) -> &'a [f64] {
    var.coord(dim)
        .expect("validated variables carry coordinates for required dimensions")
}

/// Exact-match intersection of two coordinate vectors, ascending.
///
/// Values are matched on their bit pattern, so 0.0 and -0.0 are distinct and
/// NaN coordinates only match an identical NaN encoding.
fn intersect(a: &[f64], b: &[f64]) -> Vec<f64> {
    let b_bits: HashSet<u64> = b.iter().map(|value| value.to_bits()).collect();
    let mut common: Vec<f64> = a
        .iter()
        .copied()
        .filter(|value| b_bits.contains(&value.to_bits()))
        .collect();
    common.sort_by(f64::total_cmp);
    common.dedup_by(|x, y| x.to_bits() == y.to_bits());
    common
}

/// Restrict `var` to the `target` coordinate values along `dim`.
fn reindex(
    var: GridVariable,
    dim: &str,
    target: &[f64],
) -> Result<GridVariable, EvaluationError> {
    let axis = var
        .axis(dim)
        .expect("validated variables declare all required dimensions");
    let index_of: HashMap<u64, usize> = expect_coord(&var, dim)
        .iter()
        .enumerate()
        .map(|(index, value)| (value.to_bits(), index))
        .collect();
    let indices: Vec<usize> = target
        .iter()
        .map(|value| {
            *index_of
                .get(&value.to_bits())
                .expect("intersection values come from both coordinate vectors")
        })
        .collect();
    let values = var.values.select(Axis(axis), &indices);
    let mut coords = var.coords;
    coords.insert(dim.to_string(), target.to_vec());
    GridVariable::new(var.name, var.dims, coords, values)
}
