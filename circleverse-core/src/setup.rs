//! Building populations: random towns, towns described in a JSON scenario,
//! and the three-town example economy.
//!
//! Generation uses its own seeded rng, separate from the simulation's noise
//! source, so the same seed always yields the same population.

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::household::{Household, MAX_MEMBERS, MIN_MEMBERS};
use crate::member::{Member, Occupation};
use crate::simulation::Simulation;
use crate::town::{DEFAULT_RADIUS, Town};

// === CONSTANTS ===

/// Mixed into the seed for population generation so it does not share a
/// stream with the monthly noise.
const GENERATION_SALT: u64 = 0x5eed_c1bc_1e5e_0001;

pub const WORKING_AGE_MIN: u32 = 18;
pub const WORKING_AGE_MAX: u32 = 65;
pub const DEFAULT_SAVINGS_RATE: f64 = 0.15;
/// Gap between neighbouring town centers, in radii.
const TOWN_SPACING: f64 = 2.5;

fn is_working_age(age: u32) -> bool {
    (WORKING_AGE_MIN..=WORKING_AGE_MAX).contains(&age)
}

/// Head of household is working age; everyone else may be a child or retiree.
fn random_age<R: Rng>(rng: &mut R, position: usize) -> u32 {
    if position == 0 {
        rng.random_range(25..=65)
    } else {
        rng.random_range(0..=80)
    }
}

fn random_member<R: Rng>(rng: &mut R, position: usize) -> Member {
    let age = random_age(rng, position);
    if !is_working_age(age) {
        return Member::unemployed(age);
    }
    let occupation = Occupation::ALL[rng.random_range(0..Occupation::ALL.len())];
    Member::new(age, occupation, occupation != Occupation::Unemployed)
}

pub fn household_id(town_id: &str, index: usize) -> String {
    format!("{town_id}_HH{:03}", index + 1)
}

// === RANDOM TOWNS ===

/// Parameters for [`random_town`]. Unset economics are drawn at random:
/// multiplier in [0.7, 1.3], cost of living in [0.8, 1.4].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomTownSpec {
    pub id: String,
    pub households: usize,
    #[serde(default = "default_radius")]
    pub radius: f64,
    #[serde(default)]
    pub economic_multiplier: Option<f64>,
    #[serde(default)]
    pub cost_of_living: Option<f64>,
}

impl RandomTownSpec {
    pub fn new(id: impl Into<String>, households: usize) -> Self {
        Self {
            id: id.into(),
            households,
            radius: DEFAULT_RADIUS,
            economic_multiplier: None,
            cost_of_living: None,
        }
    }

    pub fn with_economy(mut self, economic_multiplier: f64, cost_of_living: f64) -> Self {
        self.economic_multiplier = Some(economic_multiplier);
        self.cost_of_living = Some(cost_of_living);
        self
    }
}

fn default_radius() -> f64 {
    DEFAULT_RADIUS
}

/// Town of random households: 1-6 members, 0-3 dependents, savings rate in
/// [0.05, 0.25], no starting wealth, placed at random inside the circle.
pub fn random_town<R: Rng>(spec: &RandomTownSpec, center: (f64, f64), rng: &mut R) -> Result<Town> {
    let multiplier = spec
        .economic_multiplier
        .unwrap_or_else(|| rng.random_range(0.7..=1.3));
    let cost_of_living = spec
        .cost_of_living
        .unwrap_or_else(|| rng.random_range(0.8..=1.4));
    let mut town = Town::new(&spec.id, multiplier, cost_of_living)?.with_layout(center, spec.radius)?;

    for i in 0..spec.households {
        let member_count = rng.random_range(MIN_MEMBERS..=MAX_MEMBERS);
        let members = (0..member_count).map(|p| random_member(rng, p)).collect();
        let dependents = rng.random_range(0..=3);
        let savings_rate = rng.random_range(0.05..=0.25);
        let household = Household::new(household_id(&spec.id, i), members, dependents, 0.0, savings_rate)?;
        town.place_household(household, rng)?;
    }

    tracing::debug!(
        town_id = spec.id.as_str(),
        households = spec.households,
        multiplier,
        cost_of_living,
        "generated random town"
    );
    Ok(town)
}

// === MANUAL TOWNS ===

/// One household in a scenario file. Omitted fields are generated or
/// defaulted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HouseholdSpec {
    /// Member count; defaults to the number of listed occupations, or a
    /// random 1-6 when none are listed.
    pub members: Option<usize>,
    pub dependents: u32,
    /// Occupations for the first members; the rest are generated.
    pub occupations: Vec<Occupation>,
    pub savings_rate: Option<f64>,
    pub initial_wealth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TownSpec {
    pub id: String,
    #[serde(default = "default_radius")]
    pub radius: f64,
    #[serde(default = "one")]
    pub economic_multiplier: f64,
    #[serde(default = "one")]
    pub cost_of_living: f64,
    #[serde(default)]
    pub households: Vec<HouseholdSpec>,
}

fn one() -> f64 {
    1.0
}

fn manual_household<R: Rng>(town_id: &str, index: usize, spec: &HouseholdSpec, rng: &mut R) -> Result<Household> {
    let member_count = match spec.members {
        Some(n) => n,
        None if !spec.occupations.is_empty() => spec.occupations.len(),
        None => rng.random_range(MIN_MEMBERS..=MAX_MEMBERS),
    };

    let members = (0..member_count)
        .map(|p| match spec.occupations.get(p) {
            Some(&occupation) => {
                let age = random_age(rng, p);
                let working = is_working_age(age) && occupation != Occupation::Unemployed;
                Member::new(age, occupation, working)
            }
            None => random_member(rng, p),
        })
        .collect();

    Household::new(
        household_id(town_id, index),
        members,
        spec.dependents,
        spec.initial_wealth,
        spec.savings_rate.unwrap_or(DEFAULT_SAVINGS_RATE),
    )
}

/// Town from an explicit description. Households are placed at random.
pub fn manual_town<R: Rng>(spec: &TownSpec, center: (f64, f64), rng: &mut R) -> Result<Town> {
    let mut town =
        Town::new(&spec.id, spec.economic_multiplier, spec.cost_of_living)?.with_layout(center, spec.radius)?;
    for (i, hh) in spec.households.iter().enumerate() {
        let household = manual_household(&spec.id, i, hh, rng)?;
        town.place_household(household, rng)?;
    }
    Ok(town)
}

// === SCENARIOS ===

/// A complete simulation description, usually loaded from JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub engine: EngineConfig,
    pub seed: u64,
    pub towns: Vec<TownSpec>,
    pub random_towns: Vec<RandomTownSpec>,
}

impl ScenarioConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| EngineError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}

fn town_center(index: usize, radius: f64) -> (f64, f64) {
    (index as f64 * TOWN_SPACING * radius, 0.0)
}

/// Build a simulation from a scenario: explicit towns first, then random
/// ones, laid out left to right.
pub fn simulation_from_scenario(scenario: &ScenarioConfig) -> Result<Simulation> {
    let mut sim = Simulation::with_seed(scenario.engine.clone(), scenario.seed)?;
    let mut rng = StdRng::seed_from_u64(scenario.seed ^ GENERATION_SALT);

    for (i, spec) in scenario.towns.iter().enumerate() {
        sim.add_town(manual_town(spec, town_center(i, spec.radius), &mut rng)?)?;
    }
    let offset = scenario.towns.len();
    for (i, spec) in scenario.random_towns.iter().enumerate() {
        sim.add_town(random_town(spec, town_center(offset + i, spec.radius), &mut rng)?)?;
    }

    tracing::info!(
        seed = scenario.seed,
        towns = sim.towns().len(),
        households = sim.households().count(),
        "built simulation from scenario"
    );
    Ok(sim)
}

/// `towns` random towns named `Town_01`, `Town_02`, ...
pub fn random_simulation(towns: usize, households_per_town: usize, seed: u64) -> Result<Simulation> {
    let scenario = ScenarioConfig {
        seed,
        random_towns: (0..towns)
            .map(|i| RandomTownSpec::new(format!("Town_{:02}", i + 1), households_per_town))
            .collect(),
        ..Default::default()
    };
    simulation_from_scenario(&scenario)
}

/// Three contrasting economies: a prosperous town, a struggling one with high
/// prices, and a balanced one.
pub fn example_simulation(seed: u64) -> Result<Simulation> {
    let scenario = ScenarioConfig {
        seed,
        random_towns: vec![
            RandomTownSpec::new("Prosperity", 15).with_economy(1.4, 1.1),
            RandomTownSpec::new("Struggleville", 18).with_economy(0.7, 1.3),
            RandomTownSpec::new("Balance", 12).with_economy(1.0, 1.0),
        ],
        ..Default::default()
    };
    simulation_from_scenario(&scenario)
}
