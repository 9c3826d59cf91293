//! Monthly tracing events, captured with the `instrument` recorder, agree
//! with what the engine stores in memory.

#![cfg(feature = "instrument")]

use approx::assert_relative_eq;

use circleverse_core::instrument;
use circleverse_core::{ShockKind, example_simulation};

#[test]
fn household_events_match_history() {
    let mut sim = example_simulation(8).unwrap();
    let (advanced, recorder) = instrument::record(|| sim.run_until(4));
    assert_eq!(advanced, 4);

    let table = recorder.table("household_month").unwrap();
    assert_eq!(table.rows(), 45 * 4);

    let months = table.column("month").unwrap().as_u64().unwrap();
    let ids = table.column("household_id").unwrap().as_text().unwrap();
    let wealth = table.column("wealth").unwrap().as_f64().unwrap();
    let income = table.column("income").unwrap().as_f64().unwrap();
    let expenses = table.column("expenses").unwrap().as_f64().unwrap();
    let net = table.column("net_income").unwrap().as_f64().unwrap();

    for row in 0..table.rows() {
        let record = sim
            .household(&ids[row])
            .unwrap()
            .history()
            .at_month(months[row] as u32)
            .unwrap();
        assert_eq!(wealth[row], record.wealth);
        assert_eq!(income[row], record.income);
        assert_eq!(expenses[row], record.expenses);
        assert_relative_eq!(net[row], income[row] - expenses[row]);
    }
}

#[test]
fn town_events_match_average_history() {
    let mut sim = example_simulation(8).unwrap();
    let ((), recorder) = instrument::record(|| sim.step_months(3));

    let table = recorder.table("town_month").unwrap();
    assert_eq!(table.rows(), 3 * 3);
    let towns = table.column("town_id").unwrap().as_text().unwrap();
    let months = table.column("month").unwrap().as_u64().unwrap();
    let averages = table.column("average_wealth").unwrap().as_f64().unwrap();

    for row in 0..table.rows() {
        let town = sim.town(&towns[row]).unwrap();
        assert_eq!(averages[row], town.average_wealth_history()[months[row] as usize]);
    }
}

#[test]
fn shocks_are_recorded() {
    let mut sim = example_simulation(8).unwrap();
    let (result, recorder) = instrument::record(|| {
        sim.apply_shock("Struggleville_HH003", ShockKind::Medical, 1200.0)
    });
    result.unwrap();

    let table = recorder.table("shock").unwrap();
    assert_eq!(table.rows(), 1);
    assert_eq!(table.column("kind").unwrap().as_text().unwrap(), ["medical"]);
    assert_eq!(
        table.column("wealth").unwrap().as_f64().unwrap(),
        [sim.household("Struggleville_HH003").unwrap().wealth()]
    );
    assert!(recorder.table("household_month").is_none());
}

#[test]
fn recorded_tables_convert_to_frames() {
    let mut sim = example_simulation(8).unwrap();
    let ((), recorder) = instrument::record(|| sim.step());
    let frames = recorder.to_frames().unwrap();
    assert_eq!(frames["household_month"].height(), 45);
    assert_eq!(frames["town_month"].height(), 3);
}
