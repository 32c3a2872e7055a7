//! In-memory gridded datasets decoded from NetCDF payloads.
//!
//! A [Dataset] holds the data variables of one decoded payload in declaration
//! order, together with the payload's coordinate vectors. A [GridVariable] is
//! the view of one variable that the evaluation pipeline consumes: canonical
//! dimension names, one coordinate vector per dimension and the values as an
//! [ndarray] array.

use crate::error::EvaluationError;

use hashbrown::HashMap;
use ndarray::{ArrayD, IxDyn};
use std::path::Path;

/// Canonical latitude dimension name.
pub const LAT: &str = "lat";
/// Canonical longitude dimension name.
pub const LON: &str = "lon";
/// Canonical time dimension name.
pub const TIME: &str = "time";

/// Dimensions every comparable variable must declare.
pub const REQUIRED_DIMS: [&str; 3] = [TIME, LAT, LON];

/// Canonicalise a coordinate axis name.
///
/// Payloads name the horizontal axes either `lat`/`lon` or
/// `latitude`/`longitude`. Aliases are resolved once at decode time and the
/// canonical names are used everywhere else.
pub fn canonical_dim(name: &str) -> &str {
    match name {
        "latitude" => LAT,
        "longitude" => LON,
        _ => name,
    }
}

/// One data variable of a decoded payload.
#[derive(Clone, Debug)]
struct DataVariable {
    name: String,
    dims: Vec<String>,
    values: ArrayD<f64>,
}

/// A decoded multi-dimensional-array payload.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    /// Data variables in payload declaration order.
    variables: Vec<DataVariable>,
    /// Coordinate vectors keyed by canonical dimension name.
    coords: HashMap<String, Vec<f64>>,
}

impl Dataset {
    /// Decode a NetCDF payload from `path`.
    ///
    /// Variables whose name matches their single dimension are treated as
    /// coordinate variables; everything else that reads as numeric data
    /// becomes a data variable. `_FillValue` and `missing_value` entries are
    /// masked to NaN so the pipeline's NaN semantics apply uniformly.
    pub fn from_netcdf(path: &Path) -> Result<Self, EvaluationError> {
        let file = netcdf::open(path)?;
        let mut dataset = Dataset::default();
        for var in file.variables() {
            let name = var.name();
            let dims: Vec<String> = var
                .dimensions()
                .iter()
                .map(|dim| canonical_dim(&dim.name()).to_string())
                .collect();
            let flat = match var.get_values::<f64, _>(..) {
                Ok(flat) => flat,
                Err(err) => {
                    // Non-numeric variables (e.g. strings) are not comparable.
                    tracing::debug!("skipping variable {}: {}", name, err);
                    continue;
                }
            };
            if dims.len() == 1 && canonical_dim(&name) == dims[0] {
                let dim = dims
                    .into_iter()
                    .next()
                    .expect("coordinate variables have exactly one dimension");
                dataset.coords.insert(dim, flat);
            } else {
                let shape: Vec<usize> = var.dimensions().iter().map(|dim| dim.len()).collect();
                let mut values = ArrayD::from_shape_vec(IxDyn(&shape), flat)?;
                let fill =
                    f64_attr(&var, "_FillValue").or_else(|| f64_attr(&var, "missing_value"));
                if let Some(fill) = fill {
                    values.mapv_inplace(|value| if value == fill { f64::NAN } else { value });
                }
                dataset.variables.push(DataVariable { name, dims, values });
            }
        }
        Ok(dataset)
    }

    /// Data variable names in payload declaration order.
    pub fn variable_names(&self) -> Vec<String> {
        self.variables.iter().map(|var| var.name.clone()).collect()
    }

    /// Return the named variable as a [GridVariable] view.
    ///
    /// When `name` is `None` the first declared data variable is selected;
    /// this default is deterministic because declaration order is preserved.
    /// `dataset` labels the side ("simulation" or "observation") in errors.
    pub fn variable(
        &self,
        name: Option<&str>,
        dataset: &'static str,
    ) -> Result<GridVariable, EvaluationError> {
        let var = match name {
            Some(name) => self
                .variables
                .iter()
                .find(|var| var.name == name)
                .ok_or_else(|| EvaluationError::UnsupportedVariable {
                    variable: name.to_string(),
                    dataset,
                })?,
            None => self
                .variables
                .first()
                .ok_or(EvaluationError::MissingInput {
                    name: "data variable",
                })?,
        };

        let mut coords = HashMap::new();
        let mut missing = Vec::new();
        for (axis, dim) in var.dims.iter().enumerate() {
            match self.coords.get(dim) {
                Some(coord) => {
                    coords.insert(dim.clone(), coord.clone());
                }
                None if dim == LAT => missing.push(LAT),
                None if dim == LON => missing.push(LON),
                None => {
                    // Dimensions without a coordinate variable fall back to
                    // the index coordinate.
                    let length = var.values.shape()[axis];
                    coords.insert(dim.clone(), (0..length).map(|i| i as f64).collect());
                }
            }
        }
        if !missing.is_empty() {
            return Err(EvaluationError::MissingCoordinates {
                variable: var.name.clone(),
                missing,
            });
        }
        GridVariable::new(var.name.clone(), var.dims.clone(), coords, var.values.clone())
    }

    /// Assemble a dataset from decoded parts.
    #[cfg(test)]
    pub(crate) fn from_parts(
        variables: Vec<(String, Vec<String>, ArrayD<f64>)>,
        coords: HashMap<String, Vec<f64>>,
    ) -> Self {
        let variables = variables
            .into_iter()
            .map(|(name, dims, values)| DataVariable { name, dims, values })
            .collect();
        Dataset { variables, coords }
    }
}

/// One named variable on a coordinate grid.
#[derive(Clone, Debug, PartialEq)]
pub struct GridVariable {
    /// Variable name as declared in the source payload
    pub name: String,
    /// Canonical dimension names in declaration order
    pub dims: Vec<String>,
    /// Coordinate vector per dimension
    pub coords: HashMap<String, Vec<f64>>,
    /// Variable values, shaped according to `dims`
    pub values: ArrayD<f64>,
}

impl GridVariable {
    /// Return a new GridVariable.
    ///
    /// The array extent along each axis must equal the length of that axis's
    /// coordinate vector.
    pub fn new(
        name: String,
        dims: Vec<String>,
        coords: HashMap<String, Vec<f64>>,
        values: ArrayD<f64>,
    ) -> Result<Self, EvaluationError> {
        if dims.len() != values.ndim() {
            return Err(ndarray::ShapeError::from_kind(ndarray::ErrorKind::IncompatibleShape).into());
        }
        for (axis, dim) in dims.iter().enumerate() {
            let coord_len = coords.get(dim).map(Vec::len);
            if coord_len != Some(values.shape()[axis]) {
                return Err(
                    ndarray::ShapeError::from_kind(ndarray::ErrorKind::IncompatibleShape).into(),
                );
            }
        }
        Ok(GridVariable {
            name,
            dims,
            coords,
            values,
        })
    }

    /// The axis index of the named dimension, if declared.
    pub fn axis(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    /// The coordinate vector of the named dimension, if declared.
    pub fn coord(&self, dim: &str) -> Option<&[f64]> {
        self.coords.get(dim).map(Vec::as_slice)
    }

    /// Names in `required` that are absent from this variable's dimensions.
    ///
    /// Pure and deterministic; the pipeline turns a non-empty result into a
    /// request failure.
    pub fn missing_dims(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|required| !self.dims.iter().any(|dim| dim == *required))
            .map(|required| required.to_string())
            .collect()
    }
}

/// Helper to get an f64 attribute.
fn f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !var.attributes().any(|attr| attr.name() == name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    use std::path::PathBuf;

    #[test]
    fn canonical_dim_aliases() {
        assert_eq!(LAT, canonical_dim("latitude"));
        assert_eq!(LON, canonical_dim("longitude"));
        assert_eq!("time", canonical_dim("time"));
        assert_eq!("level", canonical_dim("level"));
    }

    #[test]
    fn default_variable_is_first_declared() {
        let dataset = test_utils::two_variable_dataset(&["temp", "precip"]);
        let var = dataset.variable(None, "simulation").unwrap();
        assert_eq!("temp", var.name);
    }

    #[test]
    fn named_variable_lookup() {
        let dataset = test_utils::two_variable_dataset(&["temp", "precip"]);
        let var = dataset.variable(Some("precip"), "simulation").unwrap();
        assert_eq!("precip", var.name);
    }

    #[test]
    fn unknown_variable_is_unsupported() {
        let dataset = test_utils::two_variable_dataset(&["temp", "precip"]);
        match dataset.variable(Some("wind"), "observation").unwrap_err() {
            EvaluationError::UnsupportedVariable { variable, dataset } => {
                assert_eq!("wind", variable);
                assert_eq!("observation", dataset);
            }
            err => panic!("unexpected error {err:?}"),
        }
    }

    #[test]
    fn empty_dataset_has_no_default_variable() {
        let dataset = Dataset::default();
        match dataset.variable(None, "simulation").unwrap_err() {
            EvaluationError::MissingInput { name } => assert_eq!("data variable", name),
            err => panic!("unexpected error {err:?}"),
        }
    }

    #[test]
    fn missing_lat_lon_coords_detected() {
        let values = ArrayD::from_shape_vec(IxDyn(&[1, 1, 2]), vec![1.0, 2.0]).unwrap();
        let dataset = Dataset::from_parts(
            vec![(
                "temp".to_string(),
                vec![TIME.to_string(), LAT.to_string(), LON.to_string()],
                values,
            )],
            // No lat/lon coordinate vectors at all.
            HashMap::new(),
        );
        match dataset.variable(None, "simulation").unwrap_err() {
            EvaluationError::MissingCoordinates { variable, missing } => {
                assert_eq!("temp", variable);
                assert_eq!(vec![LAT, LON], missing);
            }
            err => panic!("unexpected error {err:?}"),
        }
    }

    #[test]
    fn uncoordinated_dim_falls_back_to_index() {
        let values = ArrayD::from_shape_vec(IxDyn(&[3, 1, 2]), vec![0.0; 6]).unwrap();
        let mut coords = HashMap::new();
        coords.insert(LAT.to_string(), vec![10.0]);
        coords.insert(LON.to_string(), vec![0.0, 1.0]);
        let dataset = Dataset::from_parts(
            vec![(
                "temp".to_string(),
                vec![TIME.to_string(), LAT.to_string(), LON.to_string()],
                values,
            )],
            coords,
        );
        let var = dataset.variable(None, "simulation").unwrap();
        assert_eq!(Some(&[0.0, 1.0, 2.0][..]), var.coord(TIME));
    }

    #[test]
    fn grid_variable_shape_invariant() {
        let values = ArrayD::from_shape_vec(IxDyn(&[2]), vec![1.0, 2.0]).unwrap();
        let mut coords = HashMap::new();
        coords.insert(LAT.to_string(), vec![0.0, 1.0, 2.0]);
        let result = GridVariable::new("temp".to_string(), vec![LAT.to_string()], coords, values);
        match result.unwrap_err() {
            EvaluationError::ShapeInvalid(_) => (),
            err => panic!("unexpected error {err:?}"),
        }
    }

    #[test]
    fn missing_dims_reported() {
        let var = test_utils::grid_variable(
            "temp",
            &[0.0],
            &[0.0],
            &[0.0, 1.0],
            vec![1.0, 2.0],
        );
        assert!(var.missing_dims(&REQUIRED_DIMS).is_empty());

        let values = ArrayD::from_shape_vec(IxDyn(&[2]), vec![1.0, 2.0]).unwrap();
        let mut coords = HashMap::new();
        coords.insert(LON.to_string(), vec![0.0, 1.0]);
        let var = GridVariable::new("temp".to_string(), vec![LON.to_string()], coords, values)
            .unwrap();
        assert_eq!(vec!["time", "lat"], var.missing_dims(&REQUIRED_DIMS));
    }

    fn scratch_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("gridverify-{}-{}.nc", tag, uuid::Uuid::new_v4()))
    }

    #[test]
    fn netcdf_round_trip_with_aliases_and_fill() {
        let path = scratch_path("roundtrip");
        {
            let mut file = netcdf::create(&path).unwrap();
            file.add_dimension("time", 2).unwrap();
            file.add_dimension("latitude", 2).unwrap();
            file.add_dimension("longitude", 3).unwrap();
            let mut time = file.add_variable::<f64>("time", &["time"]).unwrap();
            time.put_values(&[0.0, 1.0], ..).unwrap();
            let mut lat = file.add_variable::<f64>("latitude", &["latitude"]).unwrap();
            lat.put_values(&[40.0, 41.0], ..).unwrap();
            let mut lon = file
                .add_variable::<f64>("longitude", &["longitude"])
                .unwrap();
            lon.put_values(&[10.0, 11.0, 12.0], ..).unwrap();
            let mut temp = file
                .add_variable::<f64>("temp", &["time", "latitude", "longitude"])
                .unwrap();
            let data: Vec<f64> = (0..12).map(f64::from).collect();
            temp.put_values(&data, ..).unwrap();
            temp.put_attribute("_FillValue", 7.0).unwrap();
            let mut precip = file
                .add_variable::<f64>("precip", &["time", "latitude", "longitude"])
                .unwrap();
            precip.put_values(&vec![0.5; 12], ..).unwrap();
        }

        let dataset = Dataset::from_netcdf(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        // Coordinate variables are excluded and order is preserved.
        assert_eq!(vec!["temp", "precip"], dataset.variable_names());

        let var = dataset.variable(None, "simulation").unwrap();
        assert_eq!(vec!["time", "lat", "lon"], var.dims);
        assert_eq!(&[2, 2, 3], var.values.shape());
        assert_eq!(Some(&[40.0, 41.0][..]), var.coord(LAT));
        assert_eq!(Some(&[10.0, 11.0, 12.0][..]), var.coord(LON));
        // The fill value 7.0 is masked to NaN.
        assert!(var.values.iter().any(|value| value.is_nan()));
        assert!(!var.values.iter().any(|value| *value == 7.0));
    }
}
