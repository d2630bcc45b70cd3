//! Conversion of a scalar field into a boolean feature mask.

use mhw_common::{Dataset, MhwError, MhwResult};
use ndarray::{Array2, Array3, ArrayView3, Axis, Zip};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Rule deciding which cells of the field are features.
///
/// NaN never satisfies any criterion.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "threshold", rename_all = "snake_case")]
pub enum MaskCriterion {
    /// Value > 0, for a field that already encodes the anomaly.
    #[default]
    Positive,
    /// Value < 0, for cold anomalies.
    Negative,
    /// Value > threshold.
    Above(f32),
    /// Value < threshold.
    Below(f32),
}

impl MaskCriterion {
    /// Whether one value is a feature cell.
    #[inline]
    pub fn test(&self, value: f32) -> bool {
        match *self {
            Self::Positive => value > 0.0,
            Self::Negative => value < 0.0,
            Self::Above(t) => value > t,
            Self::Below(t) => value < t,
        }
    }
}

/// Builds the `[time, lat, lon]` feature mask of one dataset field.
#[derive(Debug, Clone, Default)]
pub struct MaskBuilder {
    criterion: MaskCriterion,
    domain: Option<Array2<bool>>,
}

impl MaskBuilder {
    pub fn new(criterion: MaskCriterion) -> Self {
        Self {
            criterion,
            domain: None,
        }
    }

    /// Restrict features to cells where `domain` is true (e.g. ocean cells).
    pub fn with_domain(mut self, domain: Array2<bool>) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn criterion(&self) -> MaskCriterion {
        self.criterion
    }

    pub fn domain(&self) -> Option<&Array2<bool>> {
        self.domain.as_ref()
    }

    /// Mask of the named field. Fails if the field is missing or misshapen.
    pub fn build(&self, dataset: &Dataset, field: &str) -> MhwResult<Array3<bool>> {
        let values = dataset.field(field)?;
        let mask = self.build_from_view(values)?;
        debug!(
            field,
            cells = mask.len(),
            features = mask.iter().filter(|&&m| m).count(),
            "Built feature mask"
        );
        Ok(mask)
    }

    /// Mask of a `[time, lat, lon]` array.
    pub fn build_from_view(&self, values: ArrayView3<f32>) -> MhwResult<Array3<bool>> {
        let mut mask = values.mapv(|v| self.criterion.test(v));
        if let Some(domain) = &self.domain {
            let (_, nlat, nlon) = values.dim();
            if domain.dim() != (nlat, nlon) {
                return Err(MhwError::shape_mismatch(
                    "domain mask",
                    &[nlat, nlon],
                    domain.shape(),
                ));
            }
            for mut step in mask.axis_iter_mut(Axis(0)) {
                Zip::from(&mut step).and(domain).for_each(|m, &d| *m &= d);
            }
        }
        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use mhw_common::{GridCoords, TimeAxis};
    use ndarray::array;

    fn dataset(values: Array3<f32>) -> Dataset {
        let (nt, nlat, nlon) = values.dim();
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        Dataset::new(
            TimeAxis::regular(start, Duration::days(1), nt),
            GridCoords::global(nlat, nlon),
        )
        .with_field("ssta", values)
        .unwrap()
    }

    #[test]
    fn test_positive_criterion() {
        let values = array![[[0.5, -0.2], [f32::NAN, 0.0]]];
        let mask = MaskBuilder::default().build(&dataset(values), "ssta").unwrap();
        assert_eq!(mask, array![[[true, false], [false, false]]]);
    }

    #[test]
    fn test_threshold_criteria() {
        assert!(MaskCriterion::Above(1.0).test(1.5));
        assert!(!MaskCriterion::Above(1.0).test(1.0));
        assert!(MaskCriterion::Below(-1.0).test(-2.0));
        assert!(MaskCriterion::Negative.test(-0.1));
        assert!(!MaskCriterion::Negative.test(f32::NAN));
    }

    #[test]
    fn test_missing_field() {
        let ds = dataset(Array3::zeros((1, 2, 2)));
        let err = MaskBuilder::default().build(&ds, "sst").unwrap_err();
        assert!(matches!(err, MhwError::InvalidInput(_)));
    }

    #[test]
    fn test_domain_mask_applied() {
        let values = Array3::from_elem((2, 2, 2), 1.0f32);
        let domain = array![[true, false], [true, true]];
        let mask = MaskBuilder::default()
            .with_domain(domain.clone())
            .build(&dataset(values), "ssta")
            .unwrap();
        for step in mask.axis_iter(Axis(0)) {
            assert_eq!(step, domain);
        }
    }

    #[test]
    fn test_domain_shape_mismatch() {
        let values = Array3::from_elem((1, 2, 2), 1.0f32);
        let result = MaskBuilder::default()
            .with_domain(Array2::from_elem((3, 2), true))
            .build(&dataset(values), "ssta");
        assert!(matches!(result, Err(MhwError::InvalidInput(_))));
    }

    #[test]
    fn test_criterion_yaml_forms() {
        let positive: MaskCriterion = serde_yaml::from_str("kind: positive").unwrap();
        assert_eq!(positive, MaskCriterion::Positive);
        let above: MaskCriterion = serde_yaml::from_str("kind: above\nthreshold: 1.5").unwrap();
        assert_eq!(above, MaskCriterion::Above(1.5));
    }
}
