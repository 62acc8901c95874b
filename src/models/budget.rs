use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BudgetPeriod {
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl BudgetPeriod {
    /// Lenient parse used on stored labels: anything unrecognized is Monthly.
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BudgetPeriod::Weekly => "Weekly",
            BudgetPeriod::Monthly => "Monthly",
            BudgetPeriod::Yearly => "Yearly",
        }
    }

    /// Length of the trailing window, in days before today.
    pub fn window_days(self) -> i64 {
        match self {
            BudgetPeriod::Weekly => 7,
            BudgetPeriod::Monthly => 30,
            BudgetPeriod::Yearly => 365,
        }
    }

    /// Inclusive `[today - window_days, today]`. Not aligned to calendar weeks,
    /// months or years.
    pub fn trailing_window(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        (today - Duration::days(self.window_days()), today)
    }
}

impl FromStr for BudgetPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weekly" => Ok(BudgetPeriod::Weekly),
            "monthly" => Ok(BudgetPeriod::Monthly),
            "yearly" => Ok(BudgetPeriod::Yearly),
            other => Err(format!(
                "Invalid budget period '{}'. Use Weekly, Monthly or Yearly",
                other
            )),
        }
    }
}

impl fmt::Display for BudgetPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Budget {
    pub id: i64,
    pub category: String,
    pub amount: Decimal,
    pub period: BudgetPeriod,
    pub created_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label_falls_back_to_monthly() {
        assert_eq!(BudgetPeriod::from_label("Weekly"), BudgetPeriod::Weekly);
        assert_eq!(BudgetPeriod::from_label("yearly"), BudgetPeriod::Yearly);
        assert_eq!(BudgetPeriod::from_label("Biweekly"), BudgetPeriod::Monthly);
        assert_eq!(BudgetPeriod::from_label(""), BudgetPeriod::Monthly);
    }

    #[test]
    fn test_strict_parse_rejects_unknown() {
        assert!("Quarterly".parse::<BudgetPeriod>().is_err());
        assert_eq!(" MONTHLY ".parse::<BudgetPeriod>().unwrap(), BudgetPeriod::Monthly);
    }

    #[test]
    fn test_trailing_windows() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(
            BudgetPeriod::Weekly.trailing_window(today),
            (NaiveDate::from_ymd_opt(2025, 2, 22).unwrap(), today)
        );
        assert_eq!(
            BudgetPeriod::Monthly.trailing_window(today),
            (NaiveDate::from_ymd_opt(2025, 1, 30).unwrap(), today)
        );
        assert_eq!(
            BudgetPeriod::Yearly.trailing_window(today),
            (NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), today)
        );
    }
}
