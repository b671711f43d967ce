//! Controller behaviour on hand-built device states.

mod common;

use microgrid_sim::devices::{BatteryStore, Priority};
use microgrid_sim::sim::{ControllerSettings, DecisionEvent, PowerController};

const TIMESTEP_S: f64 = 60.0;

#[test]
fn reserve_mode_caps_battery_to_critical_demand() {
    let solar = common::unit_solar(1000.0, 0.0);
    // exactly at the 20% reserve
    let battery = BatteryStore::new(1000.0, 200.0, 1000.0, 1000.0).unwrap();
    let mut loads = vec![
        common::load("Fridge", 200.0, Priority::Critical),
        common::load("Pump", 500.0, Priority::Deferrable),
    ];
    let mut controller = PowerController::new(common::default_settings());

    let d = controller.decide(&solar, &battery, &mut loads, TIMESTEP_S);

    assert!(d.reserve_mode);
    assert_eq!(d.total_available, 200.0);
    assert_eq!(d.active_loads, vec!["Fridge"]);
    assert_eq!(d.shed_loads, vec!["Pump"]);
    assert_eq!(d.power_from_battery, 200.0);
    assert_eq!(d.power_to_battery, 0.0);
    assert!(
        d.trace
            .contains(&DecisionEvent::BatteryReservedForCritical { ceiling_w: 200.0 })
    );
    assert!(loads[0].is_active());
    assert!(!loads[1].is_active());
}

#[test]
fn restore_waits_for_hysteresis_threshold() {
    let battery = common::idle_battery();
    let mut loads = vec![common::load("Pump", 500.0, Priority::Deferrable)];
    let mut controller = PowerController::new(common::default_settings());

    let d = controller.decide(&common::unit_solar(1000.0, 0.48), &battery, &mut loads, TIMESTEP_S);
    assert_eq!(d.shed_loads, vec!["Pump"]);

    // 450 * 1.1 = 495 < 500
    let d = controller.decide(&common::unit_solar(1000.0, 0.45), &battery, &mut loads, TIMESTEP_S);
    assert_eq!(d.shed_loads, vec!["Pump"]);
    assert!(!loads[0].is_active());

    // 460 * 1.1 = 506 >= 500
    let d = controller.decide(&common::unit_solar(1000.0, 0.46), &battery, &mut loads, TIMESTEP_S);
    assert_eq!(d.active_loads, vec!["Pump"]);
    assert!(controller.shed_set().is_empty());
    assert_eq!(loads[0].shed_count(), 1);
}

#[test]
fn oscillating_supply_never_sheds_and_restores_in_one_tick() {
    let battery = common::idle_battery();
    let mut loads = vec![
        common::load("Lights", 200.0, Priority::High),
        common::load("Pump", 300.0, Priority::Deferrable),
    ];
    let mut controller = PowerController::new(common::default_settings());

    for i in 0..40 {
        let irradiance = if i % 2 == 0 { 0.48 } else { 0.52 };
        let d = controller.decide(
            &common::unit_solar(1000.0, irradiance),
            &battery,
            &mut loads,
            TIMESTEP_S,
        );
        let shed = d.trace.iter().any(|e| matches!(e, DecisionEvent::Shed { .. }));
        let restored = d.trace.iter().any(|e| matches!(e, DecisionEvent::Restore { .. }));
        assert!(!(shed && restored), "tick {i} shed and restored");
    }
}

#[test]
fn shedding_follows_priority_then_collection_order() {
    let battery = common::idle_battery();
    let mut loads = vec![
        common::load("Pump A", 100.0, Priority::Deferrable),
        common::load("Fridge", 100.0, Priority::Critical),
        common::load("Pump B", 100.0, Priority::Deferrable),
        common::load("Lights", 100.0, Priority::High),
    ];
    let mut controller = PowerController::new(common::default_settings());

    let d = controller.decide(&common::unit_solar(1000.0, 0.15), &battery, &mut loads, TIMESTEP_S);

    let shed_order: Vec<&str> = d
        .trace
        .iter()
        .filter_map(|e| match e {
            DecisionEvent::Shed { load, .. } => Some(load.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(shed_order, vec!["Pump A", "Pump B", "Lights"]);
    assert_eq!(d.active_loads, vec!["Fridge"]);
}

#[test]
fn repeated_decision_on_same_state_is_stable() {
    let solar = common::unit_solar(1000.0, 0.0);
    let battery = BatteryStore::new(1000.0, 200.0, 1000.0, 1000.0).unwrap();
    let mut loads = vec![
        common::load("Fridge", 200.0, Priority::Critical),
        common::load("Pump", 500.0, Priority::Deferrable),
    ];
    let mut controller = PowerController::new(common::default_settings());

    let first = controller.decide(&solar, &battery, &mut loads, TIMESTEP_S);
    let second = controller.decide(&solar, &battery, &mut loads, TIMESTEP_S);

    assert_eq!(first.active_loads, second.active_loads);
    assert_eq!(first.shed_loads, second.shed_loads);
    assert_eq!(first.power_from_battery, second.power_from_battery);
    assert_eq!(loads[1].shed_count(), 1);

    let third = controller.decide(&solar, &battery, &mut loads, TIMESTEP_S);
    assert_eq!(second, third);
    assert_eq!(loads[1].shed_count(), 1);
}

#[test]
fn zero_supply_sheds_everything() {
    let battery = BatteryStore::new(1000.0, 0.0, 500.0, 500.0).unwrap();
    let mut loads = common::household_loads();
    let mut controller = PowerController::new(ControllerSettings::new(0.2, 0.1).unwrap());

    let d = controller.decide(&common::unit_solar(1000.0, 0.0), &battery, &mut loads, TIMESTEP_S);

    assert!(d.active_loads.is_empty());
    assert_eq!(d.total_demand, 0.0);
    assert!(
        d.trace
            .iter()
            .any(|e| matches!(e, DecisionEvent::AllLoadsShed { .. }))
    );
    assert_eq!(controller.shed_set().len(), 3);
}

#[test]
fn excess_solar_charges_unless_in_reserve() {
    let mut loads = vec![common::load("Lights", 100.0, Priority::High)];
    let solar = common::unit_solar(1000.0, 0.5);

    let mut controller = PowerController::new(common::default_settings());
    let healthy = BatteryStore::new(1000.0, 500.0, 1000.0, 1000.0).unwrap();
    let d = controller.decide(&solar, &healthy, &mut loads, TIMESTEP_S);
    assert_eq!(d.power_to_battery, 400.0);

    let low = BatteryStore::new(1000.0, 100.0, 1000.0, 1000.0).unwrap();
    let d = controller.decide(&solar, &low, &mut loads, TIMESTEP_S);
    assert!(d.reserve_mode);
    assert_eq!(d.power_to_battery, 0.0);
    assert_eq!(d.power_from_solar, 100.0);
}
