//! Named fields on a shared (time, lat, lon) grid.

use std::collections::BTreeMap;

use ndarray::{Array3, ArrayView3};
use serde::{Deserialize, Serialize};

use crate::error::{MhwError, MhwResult};
use crate::grid::GridCoords;
use crate::time::TimeAxis;

/// Input container handed to the pipeline: one or more scalar fields that
/// share the same time axis and grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub time: TimeAxis,
    pub coords: GridCoords,
    /// Fields indexed `[time, lat, lon]`.
    pub fields: BTreeMap<String, Array3<f32>>,
    /// Free-form attributes carried alongside the data.
    #[serde(default)]
    pub attrs: BTreeMap<String, serde_json::Value>,
}

impl Dataset {
    /// Create an empty dataset on the given axes.
    pub fn new(time: TimeAxis, coords: GridCoords) -> Self {
        Self {
            time,
            coords,
            fields: BTreeMap::new(),
            attrs: BTreeMap::new(),
        }
    }

    /// Add a field, checking its shape against the axes.
    pub fn with_field(mut self, name: impl Into<String>, values: Array3<f32>) -> MhwResult<Self> {
        let name = name.into();
        self.check_shape(&name, values.shape())?;
        self.fields.insert(name, values);
        Ok(self)
    }

    /// Expected `[time, lat, lon]` shape of every field.
    pub fn shape(&self) -> [usize; 3] {
        let (nlat, nlon) = self.coords.shape();
        [self.time.len(), nlat, nlon]
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> MhwResult<ArrayView3<'_, f32>> {
        let values = self.fields.get(name).ok_or_else(|| {
            MhwError::invalid_input(format!(
                "field '{}' not found (available: {:?})",
                name,
                self.fields.keys().collect::<Vec<_>>()
            ))
        })?;
        self.check_shape(name, values.shape())?;
        Ok(values.view())
    }

    /// Validate axes and every field.
    pub fn validate(&self) -> MhwResult<()> {
        self.coords.validate()?;
        self.time.validate()?;
        if self.time.is_empty() {
            return Err(MhwError::degenerate_input("dataset has no timesteps"));
        }
        for (name, values) in &self.fields {
            self.check_shape(name, values.shape())?;
        }
        Ok(())
    }

    fn check_shape(&self, name: &str, actual: &[usize]) -> MhwResult<()> {
        let expected = self.shape();
        if actual != expected.as_slice() {
            return Err(MhwError::shape_mismatch(
                &format!("field '{}'", name),
                &expected,
                actual,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn axes(nt: usize) -> (TimeAxis, GridCoords) {
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        (
            TimeAxis::regular(start, Duration::days(1), nt),
            GridCoords::global(4, 8),
        )
    }

    #[test]
    fn test_field_lookup() {
        let (time, coords) = axes(2);
        let ds = Dataset::new(time, coords)
            .with_field("ssta", Array3::zeros((2, 4, 8)))
            .unwrap();
        assert_eq!(ds.field("ssta").unwrap().shape(), &[2, 4, 8]);
        assert!(ds.validate().is_ok());
    }

    #[test]
    fn test_missing_field() {
        let (time, coords) = axes(2);
        let ds = Dataset::new(time, coords);
        let err = ds.field("ssta").unwrap_err();
        assert!(matches!(err, MhwError::InvalidInput(_)));
        assert!(err.to_string().contains("ssta"));
    }

    #[test]
    fn test_wrong_shape_rejected() {
        let (time, coords) = axes(2);
        let result = Dataset::new(time, coords).with_field("ssta", Array3::zeros((2, 4, 7)));
        assert!(matches!(result, Err(MhwError::InvalidInput(_))));
    }

    #[test]
    fn test_no_timesteps_degenerate() {
        let (time, coords) = axes(0);
        let ds = Dataset::new(time, coords);
        assert!(matches!(ds.validate(), Err(MhwError::DegenerateInput(_))));
    }

    #[test]
    fn test_json_roundtrip_keeps_field() {
        let (time, coords) = axes(1);
        let mut values = Array3::zeros((1, 4, 8));
        values[[0, 1, 2]] = 1.5;
        let ds = Dataset::new(time, coords).with_field("ssta", values).unwrap();

        let json = serde_json::to_string(&ds).unwrap();
        let back: Dataset = serde_json::from_str(&json).unwrap();
        assert_eq!(back.field("ssta").unwrap()[[0, 1, 2]], 1.5);
        assert_eq!(back.time, ds.time);
    }
}
