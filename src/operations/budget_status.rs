//! Spent-vs-budget evaluation over trailing windows.
//!
//! Two call sites classify budgets with different WARNING cut-offs: the
//! periodic alerts ([`ThresholdPath::Alert`]) and the dashboard banner
//! ([`ThresholdPath::Dashboard`]). Both values come from [`BudgetThresholds`].

use crate::config::BudgetThresholds;
use crate::db::LedgerStore;
use crate::error::LedgerResult;
use crate::models::budget::{Budget, BudgetPeriod};
use chrono::{Local, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdPath {
    Alert,
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    Ok,
    Warning,
    Over,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetReport {
    pub category: String,
    pub amount: Decimal,
    pub period: BudgetPeriod,
    pub spent: Decimal,
    pub remaining: Decimal,
    /// Percent of the budget spent; 0 for a zero budget.
    pub progress: Decimal,
    pub status: BudgetStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetOverview {
    pub reports: Vec<BudgetReport>,
    pub total_budget: Decimal,
    pub total_spent: Decimal,
    pub total_remaining: Decimal,
}

/// Banner summary shown on the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardStatus {
    NoBudgets,
    OverBudget { count: usize },
    NearLimit { count: usize },
    OnTrack { spent: Decimal, budgeted: Decimal },
}

impl fmt::Display for DashboardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardStatus::NoBudgets => write!(f, "No budgets set"),
            DashboardStatus::OverBudget { count } => {
                write!(f, "{} category(ies) over budget", count)
            }
            DashboardStatus::NearLimit { count } => {
                write!(f, "{} category(ies) near budget limit", count)
            }
            DashboardStatus::OnTrack { spent, budgeted } => write!(
                f,
                "Budget status: {}/{} spent",
                spent.round_dp(0),
                budgeted.round_dp(0)
            ),
        }
    }
}

pub fn progress_percent(amount: Decimal, spent: Decimal) -> Decimal {
    if amount.is_zero() {
        return Decimal::ZERO;
    }
    spent / amount * Decimal::ONE_HUNDRED
}

/// OVER when spending exceeds the amount, else WARNING at or above
/// `warning_percent`, else OK.
pub fn classify(amount: Decimal, spent: Decimal, warning_percent: f64) -> BudgetStatus {
    let remaining = amount - spent;
    if remaining < Decimal::ZERO {
        return BudgetStatus::Over;
    }
    let progress = progress_percent(amount, spent).to_f64().unwrap_or(0.0);
    if progress >= warning_percent {
        BudgetStatus::Warning
    } else {
        BudgetStatus::Ok
    }
}

pub struct BudgetEngine<'a> {
    store: &'a dyn LedgerStore,
    thresholds: BudgetThresholds,
    today: Option<NaiveDate>,
}

impl<'a> BudgetEngine<'a> {
    pub fn new(store: &'a dyn LedgerStore, thresholds: BudgetThresholds) -> Self {
        Self {
            store,
            thresholds,
            today: None,
        }
    }

    /// Pins "today" so windows do not follow the clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    fn warning_percent(&self, path: ThresholdPath) -> f64 {
        match path {
            ThresholdPath::Alert => self.thresholds.alert_warning_percent,
            ThresholdPath::Dashboard => self.thresholds.dashboard_warning_percent,
        }
    }

    /// Sum of the category's expenses in the period's trailing window. Zero
    /// for unknown categories.
    pub fn spent_amount(&self, category: &str, period: BudgetPeriod) -> LedgerResult<Decimal> {
        let (start, end) = period.trailing_window(self.today());
        let expenses = self
            .store
            .expenses_for_category_in_range(category, start, end)?;
        Ok(expenses.iter().map(|e| e.amount).sum())
    }

    pub fn classify_budget(
        &self,
        budget: &Budget,
        path: ThresholdPath,
    ) -> LedgerResult<BudgetReport> {
        let spent = self.spent_amount(&budget.category, budget.period)?;
        Ok(BudgetReport {
            category: budget.category.clone(),
            amount: budget.amount,
            period: budget.period,
            spent,
            remaining: budget.amount - spent,
            progress: progress_percent(budget.amount, spent),
            status: classify(budget.amount, spent, self.warning_percent(path)),
        })
    }

    /// One report per budget, ordered by category name.
    pub fn budget_reports(&self, path: ThresholdPath) -> LedgerResult<Vec<BudgetReport>> {
        self.store
            .get_budgets()?
            .iter()
            .map(|budget| self.classify_budget(budget, path))
            .collect()
    }

    pub fn budget_overview(&self, path: ThresholdPath) -> LedgerResult<BudgetOverview> {
        let reports = self.budget_reports(path)?;
        let total_budget: Decimal = reports.iter().map(|r| r.amount).sum();
        let total_spent: Decimal = reports.iter().map(|r| r.spent).sum();
        Ok(BudgetOverview {
            reports,
            total_budget,
            total_spent,
            total_remaining: total_budget - total_spent,
        })
    }

    /// One message per budget that is over, or at/above the alert threshold.
    pub fn check_all_budgets(&self) -> LedgerResult<Vec<String>> {
        let mut messages = Vec::new();
        for budget in self.store.get_budgets()? {
            let report = self.classify_budget(&budget, ThresholdPath::Alert)?;
            match report.status {
                BudgetStatus::Over => messages.push(format!(
                    "Budget Alert: {} is over budget by {:.2}",
                    report.category,
                    report.remaining.abs().round_dp(2)
                )),
                BudgetStatus::Warning => messages.push(format!(
                    "Budget Warning: {} is at {:.1}% of budget",
                    report.category,
                    report.progress.round_dp(1)
                )),
                BudgetStatus::Ok => {}
            }
        }
        tracing::debug!(alerts = messages.len(), "budget check finished");
        Ok(messages)
    }

    pub fn dashboard_status(&self) -> LedgerResult<DashboardStatus> {
        let overview = self.budget_overview(ThresholdPath::Dashboard)?;
        if overview.reports.is_empty() {
            return Ok(DashboardStatus::NoBudgets);
        }
        let over = overview
            .reports
            .iter()
            .filter(|r| r.status == BudgetStatus::Over)
            .count();
        let near = overview
            .reports
            .iter()
            .filter(|r| r.status == BudgetStatus::Warning)
            .count();
        Ok(if over > 0 {
            DashboardStatus::OverBudget { count: over }
        } else if near > 0 {
            DashboardStatus::NearLimit { count: near }
        } else {
            DashboardStatus::OnTrack {
                spent: overview.total_spent,
                budgeted: overview.total_budget,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;
    use crate::models::expense::NewExpense;
    use chrono::Duration;
    use std::str::FromStr;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    fn spend(store: &SqliteStore, days_ago: i64, amount: &str, category: &str) {
        store
            .add_expense(&NewExpense::new(
                today() - Duration::days(days_ago),
                Decimal::from_str(amount).unwrap(),
                category,
                "",
            ))
            .unwrap();
    }

    fn engine(store: &SqliteStore) -> BudgetEngine<'_> {
        BudgetEngine::new(store, BudgetThresholds::default()).with_today(today())
    }

    #[test]
    fn test_weekly_window_includes_both_ends() {
        let store = SqliteStore::open_in_memory().unwrap();
        spend(&store, 0, "1", "Food");
        spend(&store, 7, "10", "Food");
        spend(&store, 8, "100", "Food");

        let spent = engine(&store).spent_amount("Food", BudgetPeriod::Weekly).unwrap();
        assert_eq!(spent, Decimal::from(11));
    }

    #[test]
    fn test_window_moves_with_today() {
        let store = SqliteStore::open_in_memory().unwrap();
        spend(&store, 8, "100", "Food");

        let shifted = BudgetEngine::new(&store, BudgetThresholds::default())
            .with_today(today() - Duration::days(1));
        assert_eq!(
            shifted.spent_amount("Food", BudgetPeriod::Weekly).unwrap(),
            Decimal::from(100)
        );
        assert_eq!(
            engine(&store).spent_amount("Food", BudgetPeriod::Weekly).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_monthly_and_yearly_windows() {
        let store = SqliteStore::open_in_memory().unwrap();
        spend(&store, 30, "5", "Food");
        spend(&store, 31, "7", "Food");
        spend(&store, 365, "11", "Food");
        spend(&store, 366, "13", "Food");

        let engine = engine(&store);
        assert_eq!(engine.spent_amount("Food", BudgetPeriod::Monthly).unwrap(), Decimal::from(5));
        assert_eq!(engine.spent_amount("Food", BudgetPeriod::Yearly).unwrap(), Decimal::from(23));
    }

    #[test]
    fn test_unknown_label_uses_monthly_window() {
        let store = SqliteStore::open_in_memory().unwrap();
        spend(&store, 20, "5", "Food");
        spend(&store, 40, "7", "Food");

        let period = BudgetPeriod::from_label("Quarterly");
        assert_eq!(engine(&store).spent_amount("Food", period).unwrap(), Decimal::from(5));
    }

    #[test]
    fn test_unknown_category_spends_nothing() {
        let store = SqliteStore::open_in_memory().unwrap();
        let spent = engine(&store).spent_amount("Nope", BudgetPeriod::Monthly).unwrap();
        assert_eq!(spent, Decimal::ZERO);
    }

    #[test]
    fn test_spent_amount_is_repeatable() {
        let store = SqliteStore::open_in_memory().unwrap();
        spend(&store, 2, "12.34", "Food");
        let engine = engine(&store);

        let first = engine.spent_amount("Food", BudgetPeriod::Monthly).unwrap();
        let second = engine.spent_amount("Food", BudgetPeriod::Monthly).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_over_whenever_spent_exceeds_amount() {
        let cent = Decimal::from_str("0.01").unwrap();
        assert_eq!(
            classify(Decimal::from(500), Decimal::from(500) + cent, 90.0),
            BudgetStatus::Over
        );
        assert_eq!(classify(Decimal::from(500), Decimal::from(100_000), 90.0), BudgetStatus::Over);
        assert_eq!(classify(Decimal::ZERO, cent, 90.0), BudgetStatus::Over);
    }

    #[test]
    fn test_zero_budget_with_no_spending_is_ok() {
        assert_eq!(progress_percent(Decimal::ZERO, Decimal::ZERO), Decimal::ZERO);
        assert_eq!(classify(Decimal::ZERO, Decimal::ZERO, 90.0), BudgetStatus::Ok);
    }

    #[test]
    fn test_thresholds_are_independent() {
        let amount = Decimal::from(100);
        let spent = Decimal::from(85);
        let thresholds = BudgetThresholds::default();
        assert_ne!(thresholds.alert_warning_percent, thresholds.dashboard_warning_percent);

        assert_eq!(classify(amount, spent, thresholds.alert_warning_percent), BudgetStatus::Ok);
        assert_eq!(
            classify(amount, spent, thresholds.dashboard_warning_percent),
            BudgetStatus::Warning
        );
    }

    #[test]
    fn test_food_at_ninety_percent_warns_on_both_paths() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert_budget("Food", Decimal::from(500), BudgetPeriod::Monthly)
            .unwrap();
        spend(&store, 3, "200", "Food");
        spend(&store, 10, "250", "Food");
        let engine = engine(&store);
        let budget = store.get_budget("Food").unwrap().unwrap();

        let alert = engine.classify_budget(&budget, ThresholdPath::Alert).unwrap();
        assert_eq!(alert.progress, Decimal::from(90));
        assert_eq!(alert.status, BudgetStatus::Warning);
        let dashboard = engine.classify_budget(&budget, ThresholdPath::Dashboard).unwrap();
        assert_eq!(dashboard.status, BudgetStatus::Warning);

        assert_eq!(
            engine.check_all_budgets().unwrap(),
            vec!["Budget Warning: Food is at 90.0% of budget".to_string()]
        );
    }

    #[test]
    fn test_food_over_budget_on_both_paths() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert_budget("Food", Decimal::from(500), BudgetPeriod::Monthly)
            .unwrap();
        spend(&store, 1, "550", "Food");
        let engine = engine(&store);
        let budget = store.get_budget("Food").unwrap().unwrap();

        for path in [ThresholdPath::Alert, ThresholdPath::Dashboard] {
            let report = engine.classify_budget(&budget, path).unwrap();
            assert_eq!(report.remaining, Decimal::from(-50));
            assert_eq!(report.status, BudgetStatus::Over);
        }
        assert_eq!(
            engine.check_all_budgets().unwrap(),
            vec!["Budget Alert: Food is over budget by 50.00".to_string()]
        );
        assert_eq!(engine.dashboard_status().unwrap(), DashboardStatus::OverBudget { count: 1 });
    }

    #[test]
    fn test_alerts_skip_budgets_below_alert_threshold() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert_budget("Food", Decimal::from(100), BudgetPeriod::Weekly)
            .unwrap();
        store
            .upsert_budget("Transport", Decimal::from(100), BudgetPeriod::Weekly)
            .unwrap();
        spend(&store, 1, "85", "Food");
        spend(&store, 1, "10", "Transport");
        let engine = engine(&store);

        assert!(engine.check_all_budgets().unwrap().is_empty());
        assert_eq!(engine.dashboard_status().unwrap(), DashboardStatus::NearLimit { count: 1 });
    }

    #[test]
    fn test_alerts_repeat_on_every_check() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert_budget("Food", Decimal::from(10), BudgetPeriod::Weekly)
            .unwrap();
        spend(&store, 1, "20", "Food");
        let engine = engine(&store);

        assert_eq!(engine.check_all_budgets().unwrap().len(), 1);
        assert_eq!(engine.check_all_budgets().unwrap().len(), 1);
    }

    #[test]
    fn test_dashboard_on_track_and_empty() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(engine(&store).dashboard_status().unwrap(), DashboardStatus::NoBudgets);

        store
            .upsert_budget("Food", Decimal::from(500), BudgetPeriod::Monthly)
            .unwrap();
        store
            .upsert_budget("Fun", Decimal::from(100), BudgetPeriod::Monthly)
            .unwrap();
        spend(&store, 1, "100", "Food");

        let status = engine(&store).dashboard_status().unwrap();
        assert_eq!(
            status,
            DashboardStatus::OnTrack {
                spent: Decimal::from(100),
                budgeted: Decimal::from(600)
            }
        );
        assert_eq!(status.to_string(), "Budget status: 100/600 spent");
    }

    #[test]
    fn test_overview_totals() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert_budget("Food", Decimal::from(200), BudgetPeriod::Monthly)
            .unwrap();
        store
            .upsert_budget("Bills", Decimal::from(300), BudgetPeriod::Yearly)
            .unwrap();
        spend(&store, 100, "120", "Bills");
        spend(&store, 5, "50", "Food");

        let overview = engine(&store).budget_overview(ThresholdPath::Dashboard).unwrap();
        assert_eq!(overview.reports.len(), 2);
        assert_eq!(overview.reports[0].category, "Bills");
        assert_eq!(overview.total_budget, Decimal::from(500));
        assert_eq!(overview.total_spent, Decimal::from(170));
        assert_eq!(overview.total_remaining, Decimal::from(330));
    }
}
