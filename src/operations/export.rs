use crate::db::LedgerStore;
use crate::error::{LedgerError, LedgerResult};
use crate::models::category::Category;
use crate::models::expense::Expense;
use crate::models::income::Income;
use crate::operations::report::{category_totals, period_summary, DateRange};
use chrono::{Local, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const EXPORT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(LedgerError::Validation(format!(
                "Unsupported export format '{}'. Use csv or json",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SummaryValue {
    Amount(Decimal),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    #[serde(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Value")]
    pub value: SummaryValue,
}

#[derive(Debug, Serialize)]
struct ExportInfo {
    start_date: NaiveDate,
    end_date: NaiveDate,
    exported_at: NaiveDateTime,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct JsonExport {
    export_info: ExportInfo,
    expenses: Vec<Expense>,
    incomes: Vec<Income>,
    categories: Vec<Category>,
    summary: Vec<SummaryRow>,
}

/// Appends the format's extension unless the path already ends with it.
pub fn with_extension(path: &Path, format: ExportFormat) -> PathBuf {
    let wanted = format.extension();
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case(wanted) => path.to_path_buf(),
        _ => {
            let mut name = path.as_os_str().to_os_string();
            name.push(".");
            name.push(wanted);
            PathBuf::from(name)
        }
    }
}

/// Totals, balance and period, followed by one row per category with spending.
pub fn summary_rows(store: &dyn LedgerStore, range: DateRange) -> LedgerResult<Vec<SummaryRow>> {
    let summary = period_summary(store, range)?;
    let mut rows = vec![
        SummaryRow {
            metric: "Total Income".to_string(),
            value: SummaryValue::Amount(summary.total_income),
        },
        SummaryRow {
            metric: "Total Expenses".to_string(),
            value: SummaryValue::Amount(summary.total_expenses),
        },
        SummaryRow {
            metric: "Balance".to_string(),
            value: SummaryValue::Amount(summary.balance),
        },
        SummaryRow {
            metric: "Period".to_string(),
            value: SummaryValue::Text(format!("{} to {}", range.start, range.end)),
        },
    ];
    for (category, total) in category_totals(store, range)? {
        if total > Decimal::ZERO {
            rows.push(SummaryRow {
                metric: format!("Category: {}", category),
                value: SummaryValue::Amount(total),
            });
        }
    }
    Ok(rows)
}

/// Expenses first, then incomes. Incomes carry "N/A" as category and their
/// source in the note column.
pub fn write_csv<W: Write>(
    store: &dyn LedgerStore,
    range: DateRange,
    writer: W,
) -> LedgerResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["Type", "Date", "Category", "Amount", "Note"])?;

    for expense in store.expenses_in_range(range.start, range.end)? {
        wtr.write_record([
            "Expense".to_string(),
            expense.date.to_string(),
            expense.category,
            expense.amount.to_string(),
            expense.note,
        ])?;
    }
    for income in store.incomes_in_range(range.start, range.end)? {
        wtr.write_record([
            "Income".to_string(),
            income.date.to_string(),
            "N/A".to_string(),
            income.amount.to_string(),
            income.source,
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(
    store: &dyn LedgerStore,
    range: DateRange,
    exported_at: NaiveDateTime,
    writer: W,
) -> LedgerResult<()> {
    let export = JsonExport {
        export_info: ExportInfo {
            start_date: range.start,
            end_date: range.end,
            exported_at,
            version: EXPORT_VERSION,
        },
        expenses: store.expenses_in_range(range.start, range.end)?,
        incomes: store.incomes_in_range(range.start, range.end)?,
        categories: store.all_categories()?,
        summary: summary_rows(store, range)?,
    };
    serde_json::to_writer_pretty(writer, &export)?;
    Ok(())
}

/// Writes the range to `path` in `format` and returns the final file path.
pub fn export_data(
    store: &dyn LedgerStore,
    range: DateRange,
    format: ExportFormat,
    path: &Path,
) -> LedgerResult<PathBuf> {
    let target = with_extension(path, format);
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(&target)?;
    match format {
        ExportFormat::Csv => write_csv(store, range, file)?,
        ExportFormat::Json => write_json(store, range, Local::now().naive_local(), file)?,
    }
    tracing::info!(path = %target.display(), format = format.extension(), "data exported");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;
    use crate::models::expense::NewExpense;
    use crate::models::income::NewIncome;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, d).unwrap()
    }

    fn sample_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.add_category("Unused").unwrap();
        store
            .add_expense(&NewExpense::new(date(3), Decimal::new(1250, 2), "Food", "lunch, late"))
            .unwrap();
        store
            .add_income(&NewIncome::new(date(1), Decimal::from(100), "Salary"))
            .unwrap();
        store
    }

    fn april() -> DateRange {
        DateRange::normalized(date(1), date(30))
    }

    #[test]
    fn test_with_extension() {
        assert_eq!(
            with_extension(Path::new("out/report"), ExportFormat::Csv),
            PathBuf::from("out/report.csv")
        );
        assert_eq!(
            with_extension(Path::new("report.JSON"), ExportFormat::Json),
            PathBuf::from("report.JSON")
        );
        assert_eq!(
            with_extension(Path::new("report.txt"), ExportFormat::Json),
            PathBuf::from("report.txt.json")
        );
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_csv_rows() {
        let store = sample_store();
        let mut out = Vec::new();
        write_csv(&store, april(), &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Type,Date,Category,Amount,Note",
                "Expense,2025-04-03,Food,12.50,\"lunch, late\"",
                "Income,2025-04-01,N/A,100,Salary",
            ]
        );
    }

    #[test]
    fn test_summary_rows_skip_empty_categories() {
        let store = sample_store();
        let rows = summary_rows(&store, april()).unwrap();

        let metrics: Vec<&str> = rows.iter().map(|r| r.metric.as_str()).collect();
        assert_eq!(
            metrics,
            vec!["Total Income", "Total Expenses", "Balance", "Period", "Category: Food"]
        );
        assert_eq!(rows[2].value, SummaryValue::Amount(Decimal::new(8750, 2)));
        assert_eq!(
            rows[3].value,
            SummaryValue::Text("2025-04-01 to 2025-04-30".to_string())
        );
    }

    #[test]
    fn test_json_layout() {
        let store = sample_store();
        let exported_at = date(30).and_hms_opt(12, 0, 0).unwrap();
        let mut out = Vec::new();
        write_json(&store, april(), exported_at, &mut out).unwrap();

        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["export_info"]["start_date"], json!("2025-04-01"));
        assert_eq!(value["export_info"]["version"], json!("1.0"));
        assert_eq!(value["expenses"][0]["category"], json!("Food"));
        assert_eq!(value["expenses"][0]["amount"], json!(12.5));
        assert_eq!(value["incomes"][0]["source"], json!("Salary"));
        assert_eq!(value["categories"].as_array().unwrap().len(), 2);
        assert_eq!(value["summary"][0], json!({"Metric": "Total Income", "Value": 100.0}));
    }

    #[test]
    fn test_export_data_writes_file() {
        let dir = TempDir::new().unwrap();
        let store = sample_store();

        let path =
            export_data(&store, april(), ExportFormat::Csv, &dir.path().join("april")).unwrap();
        assert_eq!(path, dir.path().join("april.csv"));
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Type,Date,Category,Amount,Note"));

        let target = dir.path().join("april.json");
        let path = export_data(&store, april(), ExportFormat::Json, &target).unwrap();
        let value: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["expenses"].as_array().unwrap().len(), 1);
    }
}
