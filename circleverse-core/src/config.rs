// Engine-wide economic parameters

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::member::Occupation;

// === CONSTANTS ===

pub const DEFAULT_VARIATION_BAND: f64 = 0.10;

// === INCOME TABLE ===

/// Monthly base income per occupation, before the town multiplier.
///
/// Unemployed members have no entry: their income is always zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomeTable {
    pub professional: f64,
    pub skilled_trade: f64,
    pub service: f64,
    pub retail: f64,
}

impl Default for IncomeTable {
    fn default() -> Self {
        Self {
            professional: 8000.0,
            skilled_trade: 5000.0,
            service: 3000.0,
            retail: 2500.0,
        }
    }
}

impl IncomeTable {
    pub fn base_income(&self, occupation: Occupation) -> f64 {
        match occupation {
            Occupation::Professional => self.professional,
            Occupation::SkilledTrade => self.skilled_trade,
            Occupation::Service => self.service,
            Occupation::Retail => self.retail,
            Occupation::Unemployed => 0.0,
        }
    }
}

// === EXPENSES ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Housing,
    Food,
    Healthcare,
    Transportation,
    Utilities,
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 6] = [
        ExpenseCategory::Housing,
        ExpenseCategory::Food,
        ExpenseCategory::Healthcare,
        ExpenseCategory::Transportation,
        ExpenseCategory::Utilities,
        ExpenseCategory::Other,
    ];

    /// Larger households need more space and more food.
    pub fn scales_with_household_size(self) -> bool {
        matches!(self, ExpenseCategory::Housing | ExpenseCategory::Food)
    }
}

/// Fraction of adjusted income spent on each category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpenseShares {
    pub housing: f64,
    pub food: f64,
    pub healthcare: f64,
    pub transportation: f64,
    pub utilities: f64,
    pub other: f64,
}

impl Default for ExpenseShares {
    fn default() -> Self {
        Self {
            housing: 0.35,
            food: 0.15,
            healthcare: 0.10,
            transportation: 0.10,
            utilities: 0.08,
            other: 0.22,
        }
    }
}

impl ExpenseShares {
    pub fn share(&self, category: ExpenseCategory) -> f64 {
        match category {
            ExpenseCategory::Housing => self.housing,
            ExpenseCategory::Food => self.food,
            ExpenseCategory::Healthcare => self.healthcare,
            ExpenseCategory::Transportation => self.transportation,
            ExpenseCategory::Utilities => self.utilities,
            ExpenseCategory::Other => self.other,
        }
    }
}

// === ENGINE CONFIG ===

/// Parameters shared by every household update in a simulation.
///
/// Passed explicitly to the engine instead of living in module-level tables,
/// so two simulations in one process can run with different economies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub incomes: IncomeTable,
    pub expense_shares: ExpenseShares,
    /// Half-width of the multiplicative noise applied to income and expenses.
    /// 0.10 means factors are drawn from [0.9, 1.1].
    pub variation_band: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            incomes: IncomeTable::default(),
            expense_shares: ExpenseShares::default(),
            variation_band: DEFAULT_VARIATION_BAND,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for occupation in Occupation::ALL {
            let income = self.incomes.base_income(occupation);
            if !income.is_finite() || income < 0.0 {
                return Err(EngineError::invalid(format!(
                    "base income for {occupation:?} must be a non-negative number, got {income}"
                )));
            }
        }
        for category in ExpenseCategory::ALL {
            let share = self.expense_shares.share(category);
            if !share.is_finite() || share < 0.0 {
                return Err(EngineError::invalid(format!(
                    "expense share for {category:?} must be a non-negative number, got {share}"
                )));
            }
        }
        if !(0.0..1.0).contains(&self.variation_band) {
            return Err(EngineError::invalid(format!(
                "variation band must be in [0, 1), got {}",
                self.variation_band
            )));
        }
        Ok(())
    }
}
