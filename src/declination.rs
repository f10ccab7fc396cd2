use std::collections::BTreeMap;
use ndarray::Array2;
use serde::Serialize;
use crate::errors::ShapeError;

/// Returns the solar declination angle in degrees for a day of year (1-based).
///
/// Cooper's approximation, equation (1.6.1a) in Duffie & Beckman,
/// Solar Engineering of Thermal Processes.
///
/// # Arguments
///
/// * 'day_of_year' - day of year, 1 is January 1st
pub fn delta_cooper(day_of_year: f64) -> f64 {
    23.45 * (360.0 * (284.0 + day_of_year) / 365.0).to_radians().sin()
}

/// A resampled surface averaged per declination bucket
#[derive(Serialize, Clone, Debug)]
pub struct DeclinationSurface {
    /// Bucket declination in degrees, descending
    pub keys: Vec<f64>,
    /// One row per bucket, one column per resampled time-of-day point
    pub surface: Array2<f64>,
}

/// Rounds a declination to the nearest multiple of the bucket width.
/// Halves go to the even multiple.
///
/// # Arguments
///
/// * 'delta' - declination in degrees
/// * 'bucket' - bucket width in degrees
fn bucket_index(delta: f64, bucket: f64) -> i64 {
    (delta / bucket).round_ties_even() as i64
}

/// Groups the clear days of a resampled surface by rounded declination and averages each group.
///
/// # Arguments
///
/// * 'normalized' - resampled surface, 2^power x days
/// * 'days_of_year' - day of year per column
/// * 'clear_days' - clear day flag per column, only clear days take part
/// * 'bucket' - bucket width in degrees
pub fn aggregate_by_declination(
    normalized: &Array2<f64>,
    days_of_year: &[u32],
    clear_days: &[bool],
    bucket: f64) -> Result<DeclinationSurface, ShapeError>
{
    let (points, days) = normalized.dim();
    if days_of_year.len() != days || clear_days.len() != days {
        return Err(ShapeError(format!(
            "{} days in surface, {} days of year, {} clear flags", days, days_of_year.len(), clear_days.len())));
    }
    if !(bucket > 0.0) {
        return Err(ShapeError(format!("declination bucket must be positive, got {}", bucket)));
    }

    let mut groups: BTreeMap<i64, (Vec<f64>, usize)> = BTreeMap::new();
    for (day, (&doy, _)) in days_of_year.iter().zip(clear_days).enumerate().filter(|(_, (_, c))| **c) {
        let key = bucket_index(delta_cooper(doy as f64), bucket);
        let entry = groups.entry(key).or_insert_with(|| (vec![0.0; points], 0));
        entry.0.iter_mut()
            .zip(normalized.column(day))
            .for_each(|(s, v)| *s += v);
        entry.1 += 1;
    }

    if groups.is_empty() {
        return Err(ShapeError("no clear days to aggregate".into()));
    }

    let mut surface = Array2::<f64>::zeros((groups.len(), points));
    let mut keys = Vec::with_capacity(groups.len());
    for (row, (key, (sums, count))) in groups.into_iter().rev().enumerate() {
        keys.push(key as f64 * bucket);
        surface.row_mut(row)
            .iter_mut()
            .zip(sums)
            .for_each(|(o, s)| *o = s / count as f64);
    }

    Ok(DeclinationSurface { keys, surface })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declination_at_year_ends_and_solstice() {
        assert!((delta_cooper(1.0) + 23.0).abs() < 1.0);
        assert!((delta_cooper(365.0) + 23.0).abs() < 1.0);
        assert!((delta_cooper(172.0) - 23.45).abs() < 0.5);
    }

    #[test]
    fn declination_crosses_zero_near_equinoxes() {
        assert!(delta_cooper(81.0).abs() < 1.0);
        assert!(delta_cooper(265.0).abs() < 1.5);
    }

    #[test]
    fn rounds_halves_to_even() {
        assert_eq!(bucket_index(2.5, 1.0), 2);
        assert_eq!(bucket_index(3.5, 1.0), 4);
        assert_eq!(bucket_index(-0.4, 1.0), 0);
        assert_eq!(bucket_index(7.0, 2.0), 4);
    }

    #[test]
    fn averages_clear_days_per_bucket_in_descending_order() {
        // Days 1 and 2 share a bucket, day 172 sits at the top, day 3 is cloudy
        let mut normalized = Array2::<f64>::zeros((2, 4));
        normalized.column_mut(0).fill(1.0);
        normalized.column_mut(1).fill(3.0);
        normalized.column_mut(2).fill(100.0);
        normalized.column_mut(3).fill(5.0);

        let agg = aggregate_by_declination(
            &normalized,
            &[1, 2, 3, 172],
            &[true, true, false, true],
            1.0).unwrap();

        assert_eq!(agg.keys, vec![23.0, -23.0]);
        assert_eq!(agg.surface.dim(), (2, 2));
        assert!(agg.surface.row(0).iter().all(|v| (*v - 5.0).abs() < 1e-12));
        assert!(agg.surface.row(1).iter().all(|v| (*v - 2.0).abs() < 1e-12));
    }

    #[test]
    fn fails_without_clear_days() {
        let normalized = Array2::<f64>::zeros((2, 2));
        assert!(aggregate_by_declination(&normalized, &[1, 2], &[false, false], 1.0).is_err());
    }
}
