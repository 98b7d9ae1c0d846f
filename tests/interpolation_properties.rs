use proptest::prelude::*;
use scratch_view::calibration::Calibration;
use scratch_view::data::model::{Sample, SignalStore};

/// Strictly increasing positions built from positive steps.
fn samples() -> impl Strategy<Value = Vec<Sample>> {
    prop::collection::vec((0.01f64..50.0, -100.0f64..100.0), 2..64).prop_map(|steps| {
        let mut position = -200.0;
        steps
            .into_iter()
            .map(|(step, force)| {
                position += step;
                Sample::new(position, force)
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn exact_positions_return_their_force(samples in samples()) {
        let store = SignalStore::load(samples.clone()).unwrap();
        for s in &samples {
            prop_assert_eq!(store.force_at(s.position), s.force);
        }
    }

    #[test]
    fn interpolation_stays_between_bracketing_samples(
        samples in samples(),
        at in 0.0f64..1.0,
        pick in any::<prop::sample::Index>(),
    ) {
        let store = SignalStore::load(samples.clone()).unwrap();
        let i = pick.index(samples.len() - 1);
        let (a, b) = (samples[i], samples[i + 1]);
        let p = a.position + at * (b.position - a.position);

        let expected = a.force + (p - a.position) / (b.position - a.position) * (b.force - a.force);
        let got = store.force_at(p);
        prop_assert!((got - expected).abs() <= 1e-6);
        prop_assert!(got >= a.force.min(b.force) - 1e-6);
        prop_assert!(got <= a.force.max(b.force) + 1e-6);
    }

    #[test]
    fn outside_range_clamps_to_endpoints(samples in samples(), beyond in 0.001f64..1e6) {
        let store = SignalStore::load(samples.clone()).unwrap();
        let (lo, hi) = store.range();
        prop_assert_eq!(store.force_at(lo - beyond), samples[0].force);
        prop_assert_eq!(store.force_at(hi + beyond), samples[samples.len() - 1].force);
    }

    #[test]
    fn calibrated_mapping_is_deterministic(
        ox in -1e4f64..1e4,
        oy in -1e4f64..1e4,
        scale in 0.01f64..10.0,
        px in -1e4f64..1e4,
        py in -1e4f64..1e4,
    ) {
        let mut cal = Calibration::default();
        prop_assert!(cal.to_physical_position(px, py).is_err());
        cal.set_origin(ox, oy, scale);
        let first = cal.to_physical_position(px, py).unwrap();
        prop_assert_eq!(first, cal.to_physical_position(px, py).unwrap());
        prop_assert_eq!(first, (px - ox) * scale);
    }
}
