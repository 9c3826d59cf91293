// Town (circlverse): households sharing local economic conditions

use std::f64::consts::TAU;

use rand::Rng;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::household::Household;
use crate::stats::{self, WealthDistribution};
use crate::variation::Variation;

pub const DEFAULT_RADIUS: f64 = 100.0;
/// Households are placed within this fraction of the radius.
pub const PLACEMENT_MARGIN: f64 = 0.8;

/// A circular town of households under one multiplier and cost-of-living
/// index. Households keep insertion order.
#[derive(Debug, Clone)]
pub struct Town {
    id: String,
    economic_multiplier: f64,
    cost_of_living: f64,
    center: (f64, f64),
    radius: f64,
    households: Vec<Household>,
    /// Average household wealth after each advanced month
    average_wealth_history: Vec<f64>,
}

impl Town {
    pub fn new(id: impl Into<String>, economic_multiplier: f64, cost_of_living: f64) -> Result<Self> {
        validate_positive("economic multiplier", economic_multiplier)?;
        validate_positive("cost-of-living index", cost_of_living)?;
        Ok(Self {
            id: id.into(),
            economic_multiplier,
            cost_of_living,
            center: (0.0, 0.0),
            radius: DEFAULT_RADIUS,
            households: Vec::new(),
            average_wealth_history: Vec::new(),
        })
    }

    /// Layout used by renderers. Has no effect on the economics.
    pub fn with_layout(mut self, center: (f64, f64), radius: f64) -> Result<Self> {
        validate_positive("radius", radius)?;
        self.center = center;
        self.radius = radius;
        Ok(self)
    }

    // === Accessors ===

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn economic_multiplier(&self) -> f64 {
        self.economic_multiplier
    }

    pub fn cost_of_living(&self) -> f64 {
        self.cost_of_living
    }

    pub fn center(&self) -> (f64, f64) {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn households(&self) -> &[Household] {
        &self.households
    }

    pub fn household(&self, id: &str) -> Option<&Household> {
        self.households.iter().find(|h| h.id() == id)
    }

    pub fn household_mut(&mut self, id: &str) -> Option<&mut Household> {
        self.households.iter_mut().find(|h| h.id() == id)
    }

    pub fn average_wealth_history(&self) -> &[f64] {
        &self.average_wealth_history
    }

    pub fn set_economic_multiplier(&mut self, multiplier: f64) -> Result<()> {
        validate_positive("economic multiplier", multiplier)?;
        self.economic_multiplier = multiplier;
        Ok(())
    }

    pub fn set_cost_of_living(&mut self, cost_of_living: f64) -> Result<()> {
        validate_positive("cost-of-living index", cost_of_living)?;
        self.cost_of_living = cost_of_living;
        Ok(())
    }

    // === Household Management ===

    /// Add a household at its current location. Fails, leaving the town
    /// unchanged, if the id is already taken here.
    pub fn add_household(&mut self, household: Household) -> Result<()> {
        if self.household(household.id()).is_some() {
            return Err(EngineError::duplicate("household", household.id()));
        }
        self.households.push(household);
        Ok(())
    }

    /// Add a household at a random point inside the town circle.
    pub fn place_household<R: Rng>(
        &mut self,
        mut household: Household,
        rng: &mut R,
    ) -> Result<()> {
        let angle = rng.random_range(0.0..TAU);
        let distance = rng.random_range(0.0..self.radius * PLACEMENT_MARGIN);
        household.set_location((
            self.center.0 + distance * angle.cos(),
            self.center.1 + distance * angle.sin(),
        ));
        self.add_household(household)
    }

    // === Simulation ===

    /// Advance every household one month, in insertion order.
    pub fn advance_month<V: Variation + ?Sized>(
        &mut self,
        month: u32,
        config: &EngineConfig,
        variation: &mut V,
    ) {
        for household in &mut self.households {
            household.advance_month(
                month,
                self.economic_multiplier,
                self.cost_of_living,
                config,
                variation,
            );
        }

        let distribution = self.wealth_distribution();
        self.average_wealth_history.push(distribution.mean);

        tracing::info!(
            target: "town_month",
            month,
            town_id = self.id.as_str(),
            households = distribution.count as u64,
            average_wealth = distribution.mean,
            total_wealth = distribution.total,
        );
    }

    pub fn wealth_values(&self) -> Vec<f64> {
        self.households.iter().map(Household::wealth).collect()
    }

    pub fn wealth_distribution(&self) -> WealthDistribution {
        WealthDistribution::from_values(&self.wealth_values())
    }

    /// Gini coefficient of current wealth, or 0.0 when it is undefined
    /// (no households, or total wealth not positive).
    pub fn gini_coefficient(&self) -> f64 {
        stats::gini(&self.wealth_values()).unwrap_or(0.0)
    }

    pub(crate) fn reset(&mut self) {
        for household in &mut self.households {
            household.reset();
        }
        self.average_wealth_history.clear();
    }
}

fn validate_positive(what: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(EngineError::invalid(format!(
            "{what} must be a positive number, got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::member::{Member, Occupation};
    use crate::variation::FixedVariation;

    fn household(id: &str, wealth: f64) -> Household {
        Household::new(
            id,
            vec![Member::employed(40, Occupation::Service)],
            0,
            wealth,
            0.2,
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_non_positive_parameters() {
        assert!(Town::new("T", 0.0, 1.0).is_err());
        assert!(Town::new("T", 1.0, -1.0).is_err());
        assert!(Town::new("T", f64::INFINITY, 1.0).is_err());

        let mut town = Town::new("T", 1.0, 1.0).unwrap();
        assert!(matches!(
            town.set_cost_of_living(0.0),
            Err(EngineError::InvalidConfiguration(_))
        ));
        assert_eq!(town.cost_of_living(), 1.0);
    }

    #[test]
    fn test_duplicate_household_rejected() {
        let mut town = Town::new("T", 1.0, 1.0).unwrap();
        town.add_household(household("A", 10.0)).unwrap();
        let err = town.add_household(household("A", 99.0)).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateIdentifier { kind: "household", .. }));
        assert_eq!(town.households().len(), 1);
        assert_eq!(town.households()[0].wealth(), 10.0);
    }

    #[test]
    fn test_placement_stays_inside_circle() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut town = Town::new("T", 1.0, 1.0)
            .unwrap()
            .with_layout((500.0, -200.0), 50.0)
            .unwrap();
        for i in 0..200 {
            town.place_household(household(&format!("H{i}"), 0.0), &mut rng)
                .unwrap();
        }
        for hh in town.households() {
            let (x, y) = hh.location();
            let d = ((x - 500.0).powi(2) + (y + 200.0).powi(2)).sqrt();
            assert!(d < 50.0 * PLACEMENT_MARGIN + 1e-9, "{} at distance {d}", hh.id());
        }
    }

    #[test]
    fn test_advance_month_in_insertion_order() {
        let config = EngineConfig::default();
        let mut town = Town::new("T", 1.2, 0.9).unwrap();
        for id in ["C", "A", "B"] {
            town.add_household(household(id, 0.0)).unwrap();
        }

        town.advance_month(0, &config, &mut FixedVariation(1.0));

        let ids: Vec<&str> = town.households().iter().map(|h| h.id()).collect();
        assert_eq!(ids, ["C", "A", "B"]);
        for hh in town.households() {
            assert_eq!(hh.history().len(), 1);
            // 3000 * 1.2 income, 3600 * 0.9 expenses
            let record = hh.history().last().unwrap();
            assert!((record.income - 3600.0).abs() < 1e-9);
            assert!((record.expenses - 3240.0).abs() < 1e-9);
        }
        assert_eq!(town.average_wealth_history().len(), 1);
    }

    #[test]
    fn test_empty_town_statistics() {
        let config = EngineConfig::default();
        let mut town = Town::new("Ghost", 1.0, 1.0).unwrap();
        assert_eq!(town.wealth_distribution(), WealthDistribution::default());
        assert_eq!(town.gini_coefficient(), 0.0);

        town.advance_month(0, &config, &mut FixedVariation(1.0));
        assert_eq!(town.average_wealth_history(), &[0.0]);
    }

    #[test]
    fn test_gini_of_single_household_is_zero() {
        let mut town = Town::new("T", 1.0, 1.0).unwrap();
        town.add_household(household("only", 5000.0)).unwrap();
        assert_eq!(town.gini_coefficient(), 0.0);
    }

    #[test]
    fn test_gini_of_one_rich_household() {
        let mut town = Town::new("T", 1.0, 1.0).unwrap();
        for (id, wealth) in [("a", 0.0), ("b", 0.0), ("c", 0.0), ("d", 100.0)] {
            town.add_household(household(id, wealth)).unwrap();
        }
        assert!((town.gini_coefficient() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_gini_sentinel_when_all_non_positive() {
        let mut town = Town::new("T", 1.0, 1.0).unwrap();
        for (id, wealth) in [("a", -10.0), ("b", 0.0), ("c", -2500.0)] {
            town.add_household(household(id, wealth)).unwrap();
        }
        assert_eq!(town.gini_coefficient(), 0.0);
    }
}
