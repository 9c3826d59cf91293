use serde::{Deserialize, Serialize};

use crate::config::IncomeTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occupation {
    Professional,
    SkilledTrade,
    Service,
    Retail,
    Unemployed,
}

impl Occupation {
    pub const ALL: [Occupation; 5] = [
        Occupation::Professional,
        Occupation::SkilledTrade,
        Occupation::Service,
        Occupation::Retail,
        Occupation::Unemployed,
    ];
}

/// A household member (a dot on the dice face).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub age: u32,
    pub occupation: Occupation,
    pub working: bool,
}

impl Member {
    pub fn new(age: u32, occupation: Occupation, working: bool) -> Self {
        Self {
            age,
            occupation,
            working,
        }
    }

    /// Working-age member employed in `occupation`.
    pub fn employed(age: u32, occupation: Occupation) -> Self {
        Self::new(age, occupation, true)
    }

    pub fn unemployed(age: u32) -> Self {
        Self::new(age, Occupation::Unemployed, false)
    }

    pub fn monthly_income(&self, incomes: &IncomeTable) -> f64 {
        if !self.is_earning() {
            return 0.0;
        }
        incomes.base_income(self.occupation)
    }

    /// Members who currently draw an income.
    pub fn is_earning(&self) -> bool {
        self.working && self.occupation != Occupation::Unemployed
    }
}
