//! Household economy simulation across circular towns.
//!
//! Each month every household earns occupation-based income scaled by its
//! town's economic multiplier, pays size-scaled expenses, and saves or draws
//! down wealth. Towns, statistics, shocks and CSV export sit on top of that.

use wasm_bindgen::prelude::*;

pub mod config;
pub mod error;
#[cfg(feature = "csv")]
pub mod export;
pub mod household;
pub mod member;
pub mod setup;
pub mod shock;
pub mod simulation;
pub mod snapshot;
pub mod stats;
pub mod town;
pub mod variation;

pub use config::{EngineConfig, ExpenseCategory, ExpenseShares, IncomeTable};
pub use error::{EngineError, ExportError, Result};
pub use household::{ExpenseBreakdown, History, Household, MonthRecord};
pub use member::{Member, Occupation};
pub use setup::{ScenarioConfig, example_simulation, random_simulation, simulation_from_scenario};
pub use shock::ShockKind;
pub use simulation::Simulation;
pub use snapshot::{HouseholdSnapshot, SimulationSnapshot, TownSnapshot};
pub use stats::{GlobalStatistics, WealthDistribution};
pub use town::Town;
pub use variation::{FixedVariation, UniformVariation, Variation};

#[cfg(feature = "instrument")]
pub use instrument;

// ============================================================================
// WASM API
// ============================================================================

/// Browser-facing wrapper. Inputs arrive as JSON strings, outputs leave as
/// typed snapshots.
#[wasm_bindgen]
pub struct CircleverseHandle {
    sim: Simulation,
}

fn js_error(err: EngineError) -> JsError {
    JsError::new(&err.to_string())
}

#[wasm_bindgen]
impl CircleverseHandle {
    /// The three-town example economy.
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64) -> std::result::Result<CircleverseHandle, JsError> {
        // Better panic messages in browser console
        console_error_panic_hook::set_once();
        let sim = example_simulation(seed).map_err(js_error)?;
        Ok(Self { sim })
    }

    /// Build from a scenario document (see [`ScenarioConfig`]).
    #[wasm_bindgen]
    pub fn from_scenario(json: &str) -> std::result::Result<CircleverseHandle, JsError> {
        console_error_panic_hook::set_once();
        let scenario = ScenarioConfig::from_json_str(json).map_err(js_error)?;
        let sim = simulation_from_scenario(&scenario).map_err(js_error)?;
        Ok(Self { sim })
    }

    #[wasm_bindgen]
    pub fn step(&mut self) {
        self.sim.step();
    }

    /// Advance by the configured speed unless paused. Returns months advanced.
    #[wasm_bindgen]
    pub fn tick(&mut self) -> u32 {
        self.sim.tick()
    }

    #[wasm_bindgen]
    pub fn run_until(&mut self, month: u32) -> u32 {
        self.sim.run_until(month)
    }

    #[wasm_bindgen]
    pub fn current_month(&self) -> u32 {
        self.sim.current_month()
    }

    #[wasm_bindgen]
    pub fn pause(&mut self) {
        self.sim.pause();
    }

    #[wasm_bindgen]
    pub fn resume(&mut self) {
        self.sim.resume();
    }

    #[wasm_bindgen]
    pub fn is_paused(&self) -> bool {
        self.sim.is_paused()
    }

    #[wasm_bindgen]
    pub fn set_speed(&mut self, months_per_tick: u32) -> std::result::Result<(), JsError> {
        self.sim.set_speed(months_per_tick).map_err(js_error)
    }

    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.sim.reset();
    }

    #[wasm_bindgen]
    pub fn apply_shock(&mut self, household_id: &str, kind: &str, amount: f64) -> std::result::Result<(), JsError> {
        self.sim
            .apply_named_shock(household_id, kind, amount)
            .map_err(js_error)
    }

    #[wasm_bindgen]
    pub fn set_town_economy(
        &mut self,
        town_id: &str,
        economic_multiplier: f64,
        cost_of_living: f64,
    ) -> std::result::Result<(), JsError> {
        self.sim
            .set_town_economy(town_id, economic_multiplier, cost_of_living)
            .map_err(js_error)
    }

    /// Get a snapshot of the current state for rendering
    #[wasm_bindgen]
    pub fn snapshot(&self) -> SimulationSnapshot {
        self.sim.snapshot()
    }

    #[wasm_bindgen]
    pub fn global_statistics(&self) -> std::result::Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.sim.global_statistics())?)
    }
}
