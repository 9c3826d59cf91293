// Household (cluster cube) state and the monthly update rule

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::config::{EngineConfig, ExpenseCategory};
use crate::error::{EngineError, Result};
use crate::member::Member;
use crate::shock::ShockKind;
use crate::variation::Variation;

// === CONSTANTS ===

pub const MIN_MEMBERS: usize = 1;
pub const MAX_MEMBERS: usize = 6;

// === HISTORY ===

/// One month of a household's cash flow, as recorded after the update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Tsify)]
pub struct MonthRecord {
    pub month: u32,
    pub income: f64,
    pub expenses: f64,
    pub wealth: f64,
}

/// Append-only, month-ordered log of [`MonthRecord`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    records: Vec<MonthRecord>,
}

impl History {
    fn append(&mut self, record: MonthRecord) {
        debug_assert!(
            self.records.last().is_none_or(|last| last.month < record.month),
            "history must be ordered by month: {:?} after {:?}",
            record,
            self.records.last()
        );
        self.records.push(record);
    }

    pub fn records(&self) -> &[MonthRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&MonthRecord> {
        self.records.last()
    }

    /// Record for `month`, if this household was advanced during it.
    pub fn at_month(&self, month: u32) -> Option<&MonthRecord> {
        self.records
            .binary_search_by_key(&month, |r| r.month)
            .ok()
            .map(|i| &self.records[i])
    }
}

// === EXPENSES ===

/// Expense multiplier for housing and food, relative to a single-person
/// household. Linear in the number of people the household supports.
pub fn household_size_factor(members: usize, dependents: u32) -> f64 {
    (members as f64 + dependents as f64).max(1.0)
}

/// Base monthly expenses per category, before the cost-of-living index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpenseBreakdown {
    pub amounts: [(ExpenseCategory, f64); 6],
}

impl ExpenseBreakdown {
    pub fn get(&self, category: ExpenseCategory) -> f64 {
        self.amounts
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, amount)| *amount)
            .unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.amounts.iter().map(|(_, amount)| amount).sum()
    }
}

// === HOUSEHOLD ===

/// A household of 1-6 members accumulating wealth month by month.
#[derive(Debug, Clone)]
pub struct Household {
    id: String,
    members: Vec<Member>,
    dependents: u32,
    wealth: f64,
    savings_rate: f64,
    location: (f64, f64),
    history: History,
    // Restored by `reset`
    initial_wealth: f64,
    initial_members: Vec<Member>,
}

impl Household {
    pub fn new(
        id: impl Into<String>,
        members: Vec<Member>,
        dependents: u32,
        wealth: f64,
        savings_rate: f64,
    ) -> Result<Self> {
        let id = id.into();
        if !(MIN_MEMBERS..=MAX_MEMBERS).contains(&members.len()) {
            return Err(EngineError::invalid(format!(
                "household {id} has {} members, expected {MIN_MEMBERS}..={MAX_MEMBERS}",
                members.len()
            )));
        }
        validate_savings_rate(savings_rate)?;
        if !wealth.is_finite() {
            return Err(EngineError::invalid(format!(
                "household {id} has non-finite wealth {wealth}"
            )));
        }

        Ok(Self {
            id,
            initial_members: members.clone(),
            members,
            dependents,
            wealth,
            savings_rate,
            location: (0.0, 0.0),
            history: History::default(),
            initial_wealth: wealth,
        })
    }

    pub fn with_location(mut self, location: (f64, f64)) -> Self {
        self.location = location;
        self
    }

    // === Accessors ===

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn dependents(&self) -> u32 {
        self.dependents
    }

    pub fn wealth(&self) -> f64 {
        self.wealth
    }

    pub fn savings_rate(&self) -> f64 {
        self.savings_rate
    }

    pub fn location(&self) -> (f64, f64) {
        self.location
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn set_location(&mut self, location: (f64, f64)) {
        self.location = location;
    }

    pub fn set_savings_rate(&mut self, savings_rate: f64) -> Result<()> {
        validate_savings_rate(savings_rate)?;
        self.savings_rate = savings_rate;
        Ok(())
    }

    // === Monthly update ===

    pub fn gross_income(&self, config: &EngineConfig) -> f64 {
        self.members
            .iter()
            .map(|m| m.monthly_income(&config.incomes))
            .sum()
    }

    /// Category split of this month's base expenses at the given multiplier.
    pub fn expense_breakdown(&self, multiplier: f64, config: &EngineConfig) -> ExpenseBreakdown {
        let adjusted_income = self.gross_income(config) * multiplier;
        let size_factor = household_size_factor(self.members.len(), self.dependents);

        let amounts = ExpenseCategory::ALL.map(|category| {
            let mut amount = adjusted_income * config.expense_shares.share(category);
            if category.scales_with_household_size() {
                amount *= size_factor;
            }
            (category, amount)
        });
        ExpenseBreakdown { amounts }
    }

    /// Run one month of income, expenses and saving, and append the result
    /// to the history.
    ///
    /// `multiplier` and `cost_of_living` must be positive; towns guarantee
    /// this for the values they pass. Income noise is drawn before expense
    /// noise.
    pub fn advance_month<V: Variation + ?Sized>(
        &mut self,
        month: u32,
        multiplier: f64,
        cost_of_living: f64,
        config: &EngineConfig,
        variation: &mut V,
    ) -> MonthRecord {
        let adjusted_income = self.gross_income(config) * multiplier;
        let adjusted_expenses = self.expense_breakdown(multiplier, config).total() * cost_of_living;

        let income = adjusted_income * variation.factor();
        let expenses = adjusted_expenses * variation.factor();
        let net_income = income - expenses;

        if net_income > 0.0 {
            // The unsaved remainder is consumed
            self.wealth += net_income * self.savings_rate;
        } else {
            // Deficits come entirely out of wealth
            self.wealth += net_income;
        }

        tracing::info!(
            target: "household_month",
            month,
            household_id = self.id.as_str(),
            income,
            expenses,
            net_income,
            wealth = self.wealth,
        );

        let record = MonthRecord {
            month,
            income,
            expenses,
            wealth: self.wealth,
        };
        self.history.append(record);
        record
    }

    // === Shocks ===

    /// Apply a shock immediately. No history entry is written; the next
    /// month's record reflects the aftermath.
    pub fn apply_shock(&mut self, kind: ShockKind, amount: f64) {
        match kind {
            ShockKind::JobLoss => {
                for member in self.members.iter_mut().filter(|m| m.working) {
                    member.working = false;
                }
            }
            ShockKind::Medical => self.wealth -= amount.abs(),
            ShockKind::Windfall => self.wealth += amount,
        }

        tracing::info!(
            target: "shock",
            household_id = self.id.as_str(),
            kind = kind.as_str(),
            amount,
            wealth = self.wealth,
        );
    }

    /// Apply a shock selected by name (`job_loss`, `medical`, `windfall`).
    /// Unknown names fail without touching the household.
    pub fn apply_named_shock(&mut self, kind: &str, amount: f64) -> Result<()> {
        let kind: ShockKind = kind.parse()?;
        self.apply_shock(kind, amount);
        Ok(())
    }

    /// Back to the state the household was constructed with.
    pub fn reset(&mut self) {
        self.wealth = self.initial_wealth;
        self.members = self.initial_members.clone();
        self.history = History::default();
    }
}

fn validate_savings_rate(savings_rate: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&savings_rate) {
        return Err(EngineError::invalid(format!(
            "savings rate must be in [0, 1], got {savings_rate}"
        )));
    }
    Ok(())
}
