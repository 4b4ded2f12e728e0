//! User supplied correction of the transducer curve.
//!
//! Points are entered as `raw=actual` text, where `raw` is what the sensor reported and
//! `actual` what a reference gauge showed. The correction is fitted once and applied to
//! every raw pressure before unit conversion.

use crate::error::CalibrationParseError;
use std::str::FromStr;
use tracing::{event, Level};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalibrationPoint {
    pub raw: f64,
    pub actual: f64,
}

impl CalibrationPoint {
    pub fn new(raw: f64, actual: f64) -> Self {
        Self { raw, actual }
    }
}

impl FromStr for CalibrationPoint {
    type Err = CalibrationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (raw, actual) = s
            .split_once('=')
            .ok_or_else(|| CalibrationParseError::MissingSeparator(s.to_owned()))?;

        Ok(Self {
            raw: parse_finite(raw)?,
            actual: parse_finite(actual)?,
        })
    }
}

fn parse_finite(s: &str) -> Result<f64, CalibrationParseError> {
    let s = s.trim();
    match s.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(CalibrationParseError::InvalidNumber(s.to_owned())),
    }
}

/// Parse calibration entries, skipping blank ones and dropping malformed ones with a warning.
pub fn parse_points<I, S>(entries: I) -> Vec<CalibrationPoint>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .filter(|entry| !entry.as_ref().trim().is_empty())
        .filter_map(|entry| match entry.as_ref().parse() {
            Ok(point) => Some(point),
            Err(e) => {
                event!(Level::WARN, "ignoring calibration point: {}", e);
                None
            }
        })
        .collect()
}

/// Correction applied to a raw pressure.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum CalibrationModel {
    /// No calibration points
    #[default]
    Identity,
    /// One point, shift every reading by the same amount
    ConstantOffset(f64),
    /// Two or more points, least-squares line through all of them
    LinearFit { slope: f64, intercept: f64 },
}

impl CalibrationModel {
    /// Choose and fit a model for the given number of points.
    ///
    /// Points with (near) identical raw values make the normal equations ill-conditioned.
    /// They are fitted as-is, a non-finite result is only reported.
    pub fn fit(points: &[CalibrationPoint]) -> Self {
        match points {
            [] => Self::Identity,
            [point] => Self::ConstantOffset(point.actual - point.raw),
            _ => {
                let (slope, intercept) = least_squares(points);

                if !slope.is_finite() || !intercept.is_finite() {
                    event!(
                        Level::WARN,
                        "calibration points {:?} do not determine a line",
                        points
                    );
                }

                Self::LinearFit { slope, intercept }
            }
        }
    }

    pub fn apply(&self, value: f64) -> f64 {
        match *self {
            Self::Identity => value,
            Self::ConstantOffset(delta) => value + delta,
            Self::LinearFit { slope, intercept } => slope * value + intercept,
        }
    }
}

// Solve the normal equations of y = m * x + c for (m, c)
fn least_squares(points: &[CalibrationPoint]) -> (f64, f64) {
    let n = points.len() as f64;
    let (mut sx, mut sy, mut sxx, mut sxy) = (0.0, 0.0, 0.0, 0.0);

    for p in points {
        sx += p.raw;
        sy += p.actual;
        sxx += p.raw * p.raw;
        sxy += p.raw * p.actual;
    }

    let slope = (n * sxy - sx * sy) / (n * sxx - sx * sx);
    let intercept = (sy - slope * sx) / n;

    (slope, intercept)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1E-9;

    #[test]
    fn parses_points_with_whitespace() {
        assert_eq!(
            " 10 = 12.5 ".parse::<CalibrationPoint>(),
            Ok(CalibrationPoint::new(10.0, 12.5))
        );
        assert_eq!(
            "10".parse::<CalibrationPoint>(),
            Err(CalibrationParseError::MissingSeparator("10".to_owned()))
        );
        assert_eq!(
            "10=abc".parse::<CalibrationPoint>(),
            Err(CalibrationParseError::InvalidNumber("abc".to_owned()))
        );
        assert!("inf=3".parse::<CalibrationPoint>().is_err());
    }

    #[test]
    fn malformed_and_blank_entries_are_dropped() {
        let points = parse_points(["10=12", "", "garbage", "20=NaN", "20=19"]);

        assert_eq!(
            points,
            vec![CalibrationPoint::new(10.0, 12.0), CalibrationPoint::new(20.0, 19.0)]
        );
    }

    #[test]
    fn no_points_is_identity() {
        let model = CalibrationModel::fit(&[]);

        assert_eq!(model, CalibrationModel::Identity);
        for v in [-5.0, 0.0, 3.3, 1E6] {
            assert_eq!(model.apply(v), v);
        }
    }

    #[test]
    fn one_point_shifts_by_constant() {
        let model = CalibrationModel::fit(&[CalibrationPoint::new(30.0, 32.5)]);

        assert!((model.apply(30.0) - 32.5).abs() < EPS);
        for v in [-10.0, 0.0, 55.0] {
            assert!((model.apply(v) - v - 2.5).abs() < EPS);
        }
    }

    #[test]
    fn two_points_interpolate_exactly() {
        let points = parse_points(["10=12", "20=19"]);
        let model = CalibrationModel::fit(&points);

        match model {
            CalibrationModel::LinearFit { slope, intercept } => {
                assert!((slope - 0.7).abs() < EPS);
                assert!((intercept - 5.0).abs() < EPS);
            }
            other => panic!("expected a linear fit, got {:?}", other),
        }
        for p in &points {
            assert!((model.apply(p.raw) - p.actual).abs() < EPS);
        }
        assert!((model.apply(15.0) - 15.5).abs() < EPS);
    }

    #[test]
    fn three_points_fit_least_squares() {
        // Best fit of (0, 0), (1, 1), (2, 3) is y = 1.5x - 1/6
        let points = [
            CalibrationPoint::new(0.0, 0.0),
            CalibrationPoint::new(1.0, 1.0),
            CalibrationPoint::new(2.0, 3.0),
        ];
        let model = CalibrationModel::fit(&points);

        assert!((model.apply(0.0) + 1.0 / 6.0).abs() < EPS);
        assert!((model.apply(2.0) - 17.0 / 6.0).abs() < EPS);

        // Residuals of a least-squares fit with an intercept sum to zero
        let residual_sum: f64 = points.iter().map(|p| p.actual - model.apply(p.raw)).sum();
        assert!(residual_sum.abs() < EPS);
    }

    #[test]
    fn duplicate_raw_values_are_not_special_cased() {
        let model = CalibrationModel::fit(&[
            CalibrationPoint::new(5.0, 6.0),
            CalibrationPoint::new(5.0, 7.0),
        ]);

        match model {
            CalibrationModel::LinearFit { slope, .. } => assert!(!slope.is_finite()),
            other => panic!("expected a linear fit, got {:?}", other),
        }
    }
}
