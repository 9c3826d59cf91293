// Read-only views of simulation state for renderers

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::household::{Household, MonthRecord};
use crate::simulation::Simulation;
use crate::stats::WealthDistribution;
use crate::town::Town;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct SimulationSnapshot {
    pub month: u32,
    pub paused: bool,
    pub towns: Vec<TownSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
pub struct TownSnapshot {
    pub id: String,
    pub center: (f64, f64),
    pub radius: f64,
    pub economic_multiplier: f64,
    pub cost_of_living: f64,
    pub distribution: WealthDistribution,
    pub gini: f64,
    pub average_wealth_history: Vec<f64>,
    pub households: Vec<HouseholdSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
pub struct HouseholdSnapshot {
    pub id: String,
    pub wealth: f64,
    pub location: (f64, f64),
    pub member_count: usize,
    pub dependents: u32,
    pub savings_rate: f64,
    pub history: Vec<MonthRecord>,
}

impl From<&Household> for HouseholdSnapshot {
    fn from(household: &Household) -> Self {
        Self {
            id: household.id().to_string(),
            wealth: household.wealth(),
            location: household.location(),
            member_count: household.member_count(),
            dependents: household.dependents(),
            savings_rate: household.savings_rate(),
            history: household.history().records().to_vec(),
        }
    }
}

impl From<&Town> for TownSnapshot {
    fn from(town: &Town) -> Self {
        Self {
            id: town.id().to_string(),
            center: town.center(),
            radius: town.radius(),
            economic_multiplier: town.economic_multiplier(),
            cost_of_living: town.cost_of_living(),
            distribution: town.wealth_distribution(),
            gini: town.gini_coefficient(),
            average_wealth_history: town.average_wealth_history().to_vec(),
            households: town.households().iter().map(HouseholdSnapshot::from).collect(),
        }
    }
}

impl Simulation {
    /// Copy of everything a renderer needs. Later steps do not affect it.
    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            month: self.current_month(),
            paused: self.is_paused(),
            towns: self.towns().iter().map(TownSnapshot::from).collect(),
        }
    }
}
