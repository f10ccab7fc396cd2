#![allow(dead_code)]

use std::f64::consts::PI;
use chrono::NaiveDate;
use ndarray::Array2;
use pv_decomposition::declination::delta_cooper;
use pv_decomposition::models::PowerData;

pub const ROWS: usize = 48;
pub const SUNRISE: usize = 12;
pub const SUNSET: usize = 36;

/// Days from January 1st 2023
pub fn dates(days: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    start.iter_days().take(days).collect()
}

/// Relative loss of an afternoon obstruction centered at t = 0.7 of the daylight hours
pub fn notch(t: f64) -> f64 {
    let x = (t - 0.7) / 0.3;
    if x.abs() < 0.5 { 0.6 * (PI * x).cos().powi(2) } else { 0.0 }
}

/// A year of clear half-hourly days with the same half sine profile, where days with a
/// declination inside +-6 degrees lose power to an afternoon obstruction
pub fn shaded_year() -> PowerData {
    let days = 365;
    let doy = dates(days);
    let mut data = Array2::<f64>::zeros((ROWS, days));
    let mut daytime = Array2::from_elem((ROWS, days), false);

    for day in 0..days {
        let shaded = delta_cooper(day as f64 + 1.0).abs() <= 6.0;
        for r in SUNRISE..SUNSET {
            let t = (r - SUNRISE + 1) as f64 / (SUNSET - SUNRISE + 1) as f64;
            let loss = if shaded { notch(t) } else { 0.0 };
            data[[r, day]] = 0.5 * (PI * t).sin() * (1.0 - loss);
            daytime[[r, day]] = true;
        }
    }

    PowerData::new(data, daytime, vec![true; days], doy, None).unwrap()
}

/// Linear soiling ramp from 0 to -0.1 over the series
pub fn soiling_ramp(n: usize) -> Vec<f64> {
    (0..n).map(|t| -0.1 * t as f64 / (n - 1) as f64).collect()
}

/// Annual sinusoid
pub fn seasonal(n: usize, amplitude: f64) -> Vec<f64> {
    (0..n).map(|t| amplitude * (2.0 * PI * t as f64 / 365.0).sin()).collect()
}

pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let ma = a.iter().sum::<f64>() / n;
    let mb = b.iter().sum::<f64>() / n;
    let cov: f64 = a.iter().zip(b).map(|(x, y)| (x - ma) * (y - mb)).sum();
    let va: f64 = a.iter().map(|x| (x - ma).powi(2)).sum();
    let vb: f64 = b.iter().map(|y| (y - mb).powi(2)).sum();
    cov / (va * vb).sqrt()
}
