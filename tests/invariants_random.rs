//! Seeded random sweeps over device sizes, loads and fault schedules.

mod common;

use microgrid_sim::devices::{BatteryStore, Load, Priority, SolarSource};
use microgrid_sim::sim::{ActiveFault, DecisionEvent, FaultEvent, SimConfig, SimulationEngine};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SEEDS: u64 = 24;
const EPS: f64 = 1e-6;

fn random_engine(rng: &mut StdRng) -> SimulationEngine {
    let timestep_s = [60, 300, 900][rng.random_range(0..3)];
    let start_hour = f64::from(rng.random_range(0..24u8));
    let config = SimConfig::new(timestep_s, start_hour, 36.0).unwrap();

    let capacity = rng.random_range(500.0..10_000.0);
    let min_soc = rng.random_range(0.0..0.2);
    let max_soc = rng.random_range(0.8..1.0);
    let initial = capacity * rng.random_range(min_soc..max_soc);
    let battery = BatteryStore::with_soc_limits(
        capacity,
        initial,
        rng.random_range(0.0..3000.0),
        rng.random_range(0.0..3000.0),
        min_soc,
        max_soc,
    )
    .unwrap();

    let solar = SolarSource::new(rng.random_range(0.0..6000.0), rng.random_range(0.1..0.3)).unwrap();

    let num_loads = rng.random_range(1..7);
    let loads: Vec<Load> = (0..num_loads)
        .map(|i| {
            let priority = Priority::try_from(rng.random_range(0..3u8)).unwrap();
            common::load(&format!("load-{i}"), rng.random_range(20.0..800.0), priority)
        })
        .collect();

    let mut engine =
        SimulationEngine::new(config, solar, battery, loads, common::default_settings()).unwrap();

    for _ in 0..rng.random_range(0..4) {
        let start = rng.random_range(0..30 * 3600u64);
        let end = start + rng.random_range(600..8 * 3600u64);
        let event = FaultEvent::cloud_cover(start, end, rng.random_range(0.0..1.0)).unwrap();
        engine.inject_fault(event).unwrap();
    }

    // back to back in time, so no two spikes on one load ever overlap
    let mut cursor = 0u64;
    for _ in 0..rng.random_range(0..5) {
        let start = cursor + rng.random_range(0..6 * 3600u64);
        let end = start + rng.random_range(1800..4 * 3600u64);
        cursor = end;
        let target = format!("load-{}", rng.random_range(0..num_loads));
        let event =
            FaultEvent::load_spike(start, end, target.as_str(), rng.random_range(0.0..1500.0))
                .unwrap();
        engine.inject_fault(event).unwrap();
    }

    if rng.random_bool(0.5) {
        let start = rng.random_range(0..30 * 3600u64);
        let event = FaultEvent::panel_failure(start, rng.random_range(0.0..1.0)).unwrap();
        engine.inject_fault(event).unwrap();
    }
    engine
}

fn rank_of(engine: &SimulationEngine, name: &str) -> u8 {
    engine
        .loads()
        .iter()
        .find(|l| l.name() == name)
        .map(|l| l.priority().rank())
        .unwrap()
}

#[test]
fn random_runs_hold_step_invariants() {
    for seed in 0..SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut engine = random_engine(&mut rng);
        let min_soc = engine.battery().min_soc();
        let max_soc = engine.battery().max_soc();
        let mut shed_counts: Vec<u32> = engine.loads().iter().map(Load::shed_count).collect();

        while let Some(r) = engine.step() {
            let r = r.clone();
            assert!(
                r.battery_soc >= min_soc - EPS && r.battery_soc <= max_soc + EPS,
                "seed {seed} step {}: SOC {} outside [{min_soc}, {max_soc}]",
                r.step,
                r.battery_soc
            );
            assert!(
                r.power_from_battery == 0.0 || r.power_to_battery == 0.0,
                "seed {seed} step {}: battery charged and discharged",
                r.step
            );
            assert!(r.power_from_solar >= 0.0 && r.power_from_battery >= 0.0);
            assert!((r.power_from_solar + r.power_from_battery - r.total_demand).abs() < EPS);
            if r.reserve_mode {
                assert_eq!(r.power_to_battery, 0.0);
            }

            let shed = r
                .decision_trace
                .iter()
                .any(|e| matches!(e, DecisionEvent::Shed { .. }));
            let restored = r
                .decision_trace
                .iter()
                .any(|e| matches!(e, DecisionEvent::Restore { .. }));
            assert!(!(shed && restored), "seed {seed} step {}: shed and restored", r.step);

            for (prev, load) in shed_counts.iter_mut().zip(engine.loads()) {
                assert!(load.shed_count() >= *prev);
                assert!(load.shed_count() <= *prev + 1);
                *prev = load.shed_count();
            }
        }
        assert!(engine.is_finished());
    }
}

#[test]
fn shedding_never_skips_a_lower_priority_load() {
    let mut shed_ticks = 0;
    let mut spike_ticks = 0;
    for seed in 0..SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut engine = random_engine(&mut rng);

        while let Some(r) = engine.step() {
            let r = r.clone();
            if r.active_faults.iter().any(|f| matches!(f, ActiveFault::LoadSpike { .. })) {
                spike_ticks += 1;
            }
            let shed_ranks: Vec<u8> = r
                .decision_trace
                .iter()
                .filter_map(|e| match e {
                    DecisionEvent::Shed { priority, .. } => Some(priority.rank()),
                    _ => None,
                })
                .collect();
            let Some(&lowest_shed) = shed_ranks.iter().min() else {
                continue;
            };
            shed_ticks += 1;
            for name in &r.active_load_names {
                let rank = rank_of(&engine, name);
                assert!(
                    lowest_shed >= rank,
                    "seed {seed} step {}: shed rank {lowest_shed} while {name} (rank {rank}) stays on",
                    r.step
                );
            }
        }
    }
    assert!(shed_ticks > 0, "no sweep ever shed a load");
    assert!(spike_ticks > 0, "no sweep ever saw a load spike");
}

#[test]
fn shed_loads_match_controller_shed_set() {
    for seed in 0..SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut engine = random_engine(&mut rng);
        while engine.step().is_some() {
            let shed: Vec<&str> = engine
                .loads()
                .iter()
                .filter(|l| !l.is_active())
                .map(Load::name)
                .collect();
            let tracked: Vec<&str> = engine
                .controller()
                .shed_set()
                .iter()
                .map(String::as_str)
                .collect();
            let mut shed_sorted = shed.clone();
            shed_sorted.sort_unstable();
            assert_eq!(shed_sorted, tracked, "seed {seed}");
        }
    }
}
