// Simulation: towns advancing in lockstep on one monthly timeline

use std::fmt;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::household::Household;
use crate::shock::ShockKind;
use crate::stats::GlobalStatistics;
use crate::town::Town;
use crate::variation::{UniformVariation, Variation};

/// Complete state of a simulation run.
///
/// The month counter always equals the number of completed `step`s, and every
/// town has been advanced exactly that many times.
pub struct Simulation {
    towns: Vec<Town>,
    current_month: u32,
    paused: bool,
    /// Months advanced per automatic `tick`
    speed: u32,
    config: EngineConfig,
    variation: Box<dyn Variation>,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("towns", &self.towns)
            .field("current_month", &self.current_month)
            .field("paused", &self.paused)
            .field("speed", &self.speed)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Simulation {
    pub fn new(config: EngineConfig, variation: impl Variation + 'static) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            towns: Vec::new(),
            current_month: 0,
            paused: false,
            speed: 1,
            config,
            variation: Box::new(variation),
        })
    }

    /// Uniform noise in the configured band, seeded for reproducible runs.
    pub fn with_seed(config: EngineConfig, seed: u64) -> Result<Self> {
        let variation = UniformVariation::seeded(seed).with_band(config.variation_band);
        Self::new(config, variation)
    }

    // === Accessors ===

    pub fn current_month(&self) -> u32 {
        self.current_month
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn towns(&self) -> &[Town] {
        &self.towns
    }

    pub fn town(&self, id: &str) -> Option<&Town> {
        self.towns.iter().find(|t| t.id() == id)
    }

    pub fn households(&self) -> impl Iterator<Item = &Household> {
        self.towns.iter().flat_map(|t| t.households())
    }

    pub fn household(&self, id: &str) -> Option<&Household> {
        self.towns.iter().find_map(|t| t.household(id))
    }

    pub fn household_mut(&mut self, id: &str) -> Option<&mut Household> {
        self.towns.iter_mut().find_map(|t| t.household_mut(id))
    }

    // === Town Management ===

    /// Add a town. Town ids and household ids must be unique across the
    /// whole simulation; on a collision nothing is added.
    ///
    /// Towns can only join at month 0, so every town has been advanced
    /// exactly `current_month` times.
    pub fn add_town(&mut self, town: Town) -> Result<()> {
        if self.current_month > 0 {
            return Err(EngineError::invalid(format!(
                "town {} cannot join at month {}; towns are added before the first step",
                town.id(),
                self.current_month
            )));
        }
        if self.town(town.id()).is_some() {
            return Err(EngineError::duplicate("town", town.id()));
        }
        if let Some(clash) = town.households().iter().find(|h| self.household(h.id()).is_some()) {
            return Err(EngineError::duplicate("household", clash.id()));
        }
        tracing::debug!(
            town_id = town.id(),
            households = town.households().len(),
            month = self.current_month,
            "added town"
        );
        self.towns.push(town);
        Ok(())
    }

    pub fn add_household(&mut self, town_id: &str, household: Household) -> Result<()> {
        if self.household(household.id()).is_some() {
            return Err(EngineError::duplicate("household", household.id()));
        }
        let town = self
            .towns
            .iter_mut()
            .find(|t| t.id() == town_id)
            .ok_or_else(|| EngineError::UnknownTown(town_id.to_string()))?;
        town.add_household(household)
    }

    /// Change a town's multiplier and cost-of-living index. Both are
    /// validated before either is applied.
    pub fn set_town_economy(
        &mut self,
        town_id: &str,
        economic_multiplier: f64,
        cost_of_living: f64,
    ) -> Result<()> {
        let town = self
            .towns
            .iter_mut()
            .find(|t| t.id() == town_id)
            .ok_or_else(|| EngineError::UnknownTown(town_id.to_string()))?;
        let previous = town.economic_multiplier();
        town.set_economic_multiplier(economic_multiplier)?;
        if let Err(e) = town.set_cost_of_living(cost_of_living) {
            town.set_economic_multiplier(previous)?;
            return Err(e);
        }
        Ok(())
    }

    // === Time Stepping ===

    /// Advance every town one month. Works whether or not the simulation is
    /// paused.
    pub fn step(&mut self) {
        let month = self.current_month;
        for town in &mut self.towns {
            town.advance_month(month, &self.config, self.variation.as_mut());
        }
        self.current_month += 1;
        tracing::debug!(month = self.current_month, "month complete");
    }

    pub fn step_months(&mut self, months: u32) {
        for _ in 0..months {
            self.step();
        }
    }

    /// Step until the month counter reaches `target_month`. Never moves
    /// backward; returns how many months were advanced.
    pub fn run_until(&mut self, target_month: u32) -> u32 {
        let start = self.current_month;
        while self.current_month < target_month {
            self.step();
        }
        self.current_month - start
    }

    /// Entry point for an automatic driver: advances `speed` months unless
    /// paused. Returns how many months were advanced.
    pub fn tick(&mut self) -> u32 {
        if self.paused {
            return 0;
        }
        self.step_months(self.speed);
        self.speed
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }

    pub fn set_speed(&mut self, months_per_tick: u32) -> Result<()> {
        if months_per_tick == 0 {
            return Err(EngineError::invalid("speed must be at least one month per tick"));
        }
        self.speed = months_per_tick;
        Ok(())
    }

    /// Back to month 0 with every household as it was constructed. The noise
    /// source is not rewound.
    pub fn reset(&mut self) {
        for town in &mut self.towns {
            town.reset();
        }
        self.current_month = 0;
        self.paused = false;
        tracing::debug!("simulation reset");
    }

    // === Shocks ===

    pub fn apply_shock(&mut self, household_id: &str, kind: ShockKind, amount: f64) -> Result<()> {
        let household = self
            .household_mut(household_id)
            .ok_or_else(|| EngineError::UnknownHousehold(household_id.to_string()))?;
        household.apply_shock(kind, amount);
        Ok(())
    }

    /// Shock selected by name. The kind is checked before the household is
    /// looked up, so an unknown kind never mutates anything.
    pub fn apply_named_shock(&mut self, household_id: &str, kind: &str, amount: f64) -> Result<()> {
        let kind: ShockKind = kind.parse()?;
        self.apply_shock(household_id, kind, amount)
    }

    // === Statistics & Export ===

    pub fn global_statistics(&self) -> GlobalStatistics {
        let wealth: Vec<f64> = self.households().map(Household::wealth).collect();
        let mut stats = GlobalStatistics {
            total_households: wealth.len(),
            total_towns: self.towns.len(),
            current_month: self.current_month,
            ..Default::default()
        };
        if wealth.is_empty() {
            return stats;
        }

        stats.total_wealth = wealth.iter().sum();
        stats.average_wealth = stats.total_wealth / wealth.len() as f64;
        stats.min_wealth = wealth.iter().copied().fold(f64::INFINITY, f64::min);
        stats.max_wealth = wealth.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        stats
    }

    /// Write every household's history as CSV. See [`crate::export`].
    #[cfg(feature = "csv")]
    pub fn export_to_csv(&self, path: impl AsRef<std::path::Path>) -> Result<usize> {
        crate::export::write_csv(self, path.as_ref())
    }
}
