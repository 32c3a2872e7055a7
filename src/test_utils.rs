use crate::dataset::{Dataset, GridVariable, LAT, LON, TIME};

use hashbrown::HashMap;
use ndarray::{ArrayD, IxDyn};

/// Build a (time, lat, lon) variable with explicit coordinate vectors.
pub(crate) fn grid_variable(
    name: &str,
    time: &[f64],
    lat: &[f64],
    lon: &[f64],
    values: Vec<f64>,
) -> GridVariable {
    let shape = [time.len(), lat.len(), lon.len()];
    let values = ArrayD::from_shape_vec(IxDyn(&shape), values).unwrap();
    let mut coords = HashMap::new();
    coords.insert(TIME.to_string(), time.to_vec());
    coords.insert(LAT.to_string(), lat.to_vec());
    coords.insert(LON.to_string(), lon.to_vec());
    GridVariable::new(
        name.to_string(),
        vec![TIME.to_string(), LAT.to_string(), LON.to_string()],
        coords,
        values,
    )
    .unwrap()
}

fn standard_coords() -> HashMap<String, Vec<f64>> {
    let mut coords = HashMap::new();
    coords.insert(TIME.to_string(), vec![0.0, 1.0]);
    coords.insert(LAT.to_string(), vec![0.0, 1.0]);
    coords.insert(LON.to_string(), vec![0.0, 1.0]);
    coords
}

/// A dataset holding one `name` variable on the standard 2x2x2 grid.
pub(crate) fn named_dataset(name: &str, values: Vec<f64>) -> Dataset {
    let values = ArrayD::from_shape_vec(IxDyn(&[2, 2, 2]), values).unwrap();
    Dataset::from_parts(
        vec![(
            name.to_string(),
            vec![TIME.to_string(), LAT.to_string(), LON.to_string()],
            values,
        )],
        standard_coords(),
    )
}

/// Simulation and observation datasets of `temp` on the standard grid.
pub(crate) fn dataset_pair(sim: Vec<f64>, obs: Vec<f64>) -> (Dataset, Dataset) {
    (named_dataset("temp", sim), named_dataset("temp", obs))
}

/// A dataset whose variable declares only (lat, lon).
pub(crate) fn flat_dataset(name: &str, values: Vec<f64>) -> Dataset {
    let values = ArrayD::from_shape_vec(IxDyn(&[2, 2]), values).unwrap();
    Dataset::from_parts(
        vec![(
            name.to_string(),
            vec![LAT.to_string(), LON.to_string()],
            values,
        )],
        standard_coords(),
    )
}

/// A dataset declaring several variables on the standard grid, in order.
pub(crate) fn two_variable_dataset(names: &[&str]) -> Dataset {
    let variables = names
        .iter()
        .map(|name| {
            let values =
                ArrayD::from_shape_vec(IxDyn(&[2, 2, 2]), (0..8).map(f64::from).collect())
                    .unwrap();
            (
                name.to_string(),
                vec![TIME.to_string(), LAT.to_string(), LON.to_string()],
                values,
            )
        })
        .collect();
    Dataset::from_parts(variables, standard_coords())
}
