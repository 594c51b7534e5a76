use chrono::{Datelike, NaiveDate};
use ndarray::{Array1, Array2, ArrayView1, Axis, Zip};

/// One sample's observations: rows are dates, columns are bands.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSeries {
    pub dates: Vec<NaiveDate>,
    pub bands: Vec<String>,
    pub values: Array2<f64>,
}

impl SampleSeries {
    /// Rows dated within `year`.
    pub fn for_year(&self, year: i32) -> Array2<f64> {
        let rows = self.rows_where(|date| date.year() == year);
        self.values.select(Axis(0), &rows)
    }

    /// Rows dated up to and including the end of `year`, with their dates.
    pub fn through_year(&self, year: i32) -> (Vec<NaiveDate>, Array2<f64>) {
        let rows = self.rows_where(|date| date.year() <= year);
        let dates = rows.iter().map(|&row| self.dates[row]).collect();
        (dates, self.values.select(Axis(0), &rows))
    }

    fn rows_where(&self, keep: impl Fn(&NaiveDate) -> bool) -> Vec<usize> {
        self.dates
            .iter()
            .enumerate()
            .filter(|(_, date)| keep(*date))
            .map(|(row, _)| row)
            .collect()
    }
}

/// `(a - b) / (a + b)` per element. A zero denominator gives NaN, and NaN
/// inputs stay NaN.
pub fn normalized_difference(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> Array1<f64> {
    Zip::from(&a).and(&b).map_collect(|&a, &b| {
        let sum = a + b;
        if sum == 0.0 {
            f64::NAN
        } else {
            (a - b) / sum
        }
    })
}

#[cfg(test)]
mod tests {
    use ndarray::{array, Array1};

    use super::*;

    fn series() -> SampleSeries {
        let d = |y, m| NaiveDate::from_ymd_opt(y, m, 1).unwrap();
        SampleSeries {
            dates: vec![d(2015, 6), d(2016, 3), d(2016, 9), d(2017, 6)],
            bands: vec!["red".to_string(), "nir".to_string()],
            values: array![[0.1, 0.3], [0.2, 0.4], [0.0, 0.0], [0.3, 0.5]],
        }
    }

    #[test]
    fn for_year_selects_matching_rows() {
        let year = series().for_year(2016);
        assert_eq!(year.dim(), (2, 2));
        assert_eq!(year, array![[0.2, 0.4], [0.0, 0.0]]);
        assert_eq!(series().for_year(2014).dim(), (0, 2));
    }

    #[test]
    fn through_year_is_inclusive() {
        let (dates, values) = series().through_year(2016);
        assert_eq!(dates.len(), 3);
        assert_eq!(values.dim(), (3, 2));
    }

    #[test]
    fn normalized_difference_handles_zero_sum() {
        let nir = Array1::from(vec![0.3, 0.0, f64::NAN, 0.2]);
        let red = Array1::from(vec![0.1, 0.0, 0.1, -0.2]);
        let ndi = normalized_difference(nir.view(), red.view());
        assert!((ndi[0] - 0.5).abs() < 1e-12);
        assert!(ndi[1].is_nan());
        assert!(ndi[2].is_nan());
        assert!(ndi[3].is_nan());
    }
}
