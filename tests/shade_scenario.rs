mod common;

use pv_decomposition::config::{ShadeParameters, SolverParameters};
use pv_decomposition::{RunStatus, ShadeAnalysis};
use common::shaded_year;

fn analysis() -> ShadeAnalysis {
    let params = ShadeParameters { power: 4, ..ShadeParameters::default() };
    ShadeAnalysis::new(shaded_year(), params, SolverParameters::default())
}

#[test]
fn shade_shows_up_on_obstructed_days() {
    let mut analysis = analysis();
    analysis.run().unwrap();
    assert_eq!(*analysis.status(), RunStatus::Succeeded);

    let keys = &analysis.data_transformed().unwrap().keys;
    let shade = analysis.shade_component().unwrap();
    let notch_columns = 9..=12;

    let mean_over = |select: &dyn Fn(f64) -> bool| {
        let mut sum = 0.0;
        let mut count = 0;
        for (row, key) in keys.iter().enumerate().filter(|(_, k)| select(**k)) {
            for c in notch_columns.clone() {
                sum += shade[[row, c]];
                count += 1;
            }
        }
        sum / count as f64
    };

    let shaded = mean_over(&|k: f64| k.abs() <= 5.0);
    let unshaded = mean_over(&|k: f64| k.abs() >= 15.0);
    assert!(shaded > unshaded, "shaded {} vs unshaded {}", shaded, unshaded);
}

#[test]
fn components_are_feasible() {
    let mut analysis = analysis();
    analysis.run().unwrap();

    let surface = &analysis.data_transformed().unwrap().surface;
    let residual = analysis.residual_component().unwrap();
    let clear_sky = analysis.clear_sky_component().unwrap();
    let shade = analysis.shade_component().unwrap();
    let last = surface.ncols() - 1;

    for ((r, c), y) in surface.indexed_iter() {
        assert!(clear_sky[[r, c]] >= -1e-6);
        assert!(shade[[r, c]] >= -1e-6);
        assert!((residual[[r, c]] - (y - clear_sky[[r, c]] + shade[[r, c]])).abs() < 1e-5);
    }
    for r in 0..surface.nrows() {
        assert!(clear_sky[[r, 0]].abs() < 1e-6);
        assert!(clear_sky[[r, last]].abs() < 1e-6);
    }
}

#[test]
fn yearly_energy_follows_the_obstruction() {
    let mut analysis = analysis();
    let yearly = analysis.analyze_yearly_energy().unwrap().clone();
    assert!(analysis.has_run());

    assert_eq!(yearly.daily_shade_loss.len(), 365);
    // day 80 is close to the spring equinox, day 172 to the summer solstice
    assert!(yearly.daily_shade_loss[79] > yearly.daily_shade_loss[171]);
    assert!(yearly.daily_clear_energy.iter().all(|e| *e > 0.0));
    assert_eq!(yearly.avg_energy.len(), 365);

    // a second run keeps the cached results
    analysis.run().unwrap();
    assert_eq!(analysis.yearly_energy().unwrap().daily_shade_loss, yearly.daily_shade_loss);
}
