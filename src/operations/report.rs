//! Read-only aggregations behind the dashboard, the charts and the exports.

use crate::db::LedgerStore;
use crate::error::LedgerResult;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

/// Inclusive date range. The aggregations take it as given; callers that
/// accept user input should build it with [`DateRange::normalized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Orders the two bounds so that `start <= end`.
    pub fn normalized(a: NaiveDate, b: NaiveDate) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// First of the month through `today`.
    pub fn month_to_date(today: NaiveDate) -> Self {
        let start = today.with_day(1).unwrap_or(today);
        Self { start, end: today }
    }

    /// Every date the ledger can hold.
    pub fn all_time() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN),
            end: NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX),
        }
    }
}

/// Spending per category and day. `series[c][i]` belongs to `dates[i]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DailyPivot {
    pub dates: Vec<NaiveDate>,
    pub series: BTreeMap<String, Vec<Decimal>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodSummary {
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub balance: Decimal,
}

/// Label for incomes recorded without a source.
pub const UNNAMED_INCOME_SOURCE: &str = "Income";

/// Every category with its total in the range, zero totals included.
pub fn category_totals(
    store: &dyn LedgerStore,
    range: DateRange,
) -> LedgerResult<Vec<(String, Decimal)>> {
    store.sum_by_category(range.start, range.end)
}

/// Only the dates that carry at least one expense make it onto the axis.
pub fn daily_category_pivot(store: &dyn LedgerStore, range: DateRange) -> LedgerResult<DailyPivot> {
    let rows = store.daily_sums_by_category(range.start, range.end)?;

    let dates: Vec<NaiveDate> = rows
        .iter()
        .map(|(date, _, _)| *date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let index: BTreeMap<NaiveDate, usize> =
        dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

    let mut series: BTreeMap<String, Vec<Decimal>> = BTreeMap::new();
    for (date, category, total) in rows {
        let cells = series
            .entry(category)
            .or_insert_with(|| vec![Decimal::ZERO; dates.len()]);
        if let Some(&i) = index.get(&date) {
            cells[i] += total;
        }
    }

    Ok(DailyPivot { dates, series })
}

pub fn period_summary(store: &dyn LedgerStore, range: DateRange) -> LedgerResult<PeriodSummary> {
    let total_income = store.total_incomes(range.start, range.end)?;
    let total_expenses = store.total_expenses(range.start, range.end)?;
    Ok(PeriodSummary {
        total_income,
        total_expenses,
        balance: total_income - total_expenses,
    })
}

/// Incomes grouped by source, in the order sources first appear in the
/// newest-first listing.
pub fn income_by_source(
    store: &dyn LedgerStore,
    range: DateRange,
) -> LedgerResult<Vec<(String, Decimal)>> {
    let mut groups: Vec<(String, Decimal)> = Vec::new();
    for income in store.incomes_in_range(range.start, range.end)? {
        let source = match income.source.trim() {
            "" => UNNAMED_INCOME_SOURCE,
            s => s,
        };
        match groups.iter_mut().find(|(name, _)| name == source) {
            Some((_, total)) => *total += income.amount,
            None => groups.push((source.to_string(), income.amount)),
        }
    }
    Ok(groups)
}

/// Category totals without the empty categories.
pub fn chart_dataset(
    store: &dyn LedgerStore,
    range: DateRange,
) -> LedgerResult<Vec<(String, Decimal)>> {
    Ok(category_totals(store, range)?
        .into_iter()
        .filter(|(_, total)| !total.is_zero())
        .collect())
}
