//! User settings, loaded once at startup and passed to whoever needs them.

use crate::error::{LedgerError, LedgerResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_ENV_VAR: &str = "EXPENSE_MANAGER_CONFIG";
const CONFIG_FILE_NAME: &str = "config.json";
const MAX_DECIMAL_PLACES: u32 = 10;

/// Keys accepted by [`Settings::set`], in display order.
pub const SETTING_KEYS: &[&str] = &[
    "currency",
    "decimal_places",
    "alert_warning_percent",
    "dashboard_warning_percent",
    "alert_interval_secs",
    "database_type",
    "database_path",
    "cloud_host",
    "cloud_port",
    "cloud_database",
    "cloud_user",
    "cloud_password",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    #[default]
    Sqlite,
    Postgresql,
}

/// Connection details for the networked backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudDatabase {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl Default for CloudDatabase {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 5432,
            database: String::new(),
            user: String::new(),
            password: String::new(),
        }
    }
}

impl DatabaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseType::Sqlite => "sqlite",
            DatabaseType::Postgresql => "postgresql",
        }
    }
}

impl std::str::FromStr for DatabaseType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(DatabaseType::Sqlite),
            "postgresql" | "postgres" => Ok(DatabaseType::Postgresql),
            other => Err(LedgerError::Config(format!(
                "Unknown database type '{}'. Use sqlite or postgresql.",
                other
            ))),
        }
    }
}

impl CloudDatabase {
    pub fn is_configured(&self) -> bool {
        !self.host.is_empty()
            && !self.database.is_empty()
            && !self.user.is_empty()
            && !self.password.is_empty()
    }
}

/// WARNING cut-offs, in percent of the budget spent.
///
/// The periodic alerts and the dashboard banner use different values and are
/// configured separately.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetThresholds {
    pub alert_warning_percent: f64,
    pub dashboard_warning_percent: f64,
}

impl Default for BudgetThresholds {
    fn default() -> Self {
        Self {
            alert_warning_percent: 90.0,
            dashboard_warning_percent: 80.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_type: DatabaseType,
    pub database_path: PathBuf,
    pub cloud_database: CloudDatabase,
    pub currency: String,
    pub decimal_places: u32,
    pub thresholds: BudgetThresholds,
    pub alert_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_type: DatabaseType::default(),
            database_path: default_database_path(),
            cloud_database: CloudDatabase::default(),
            currency: "USD".to_string(),
            decimal_places: 2,
            thresholds: BudgetThresholds::default(),
            alert_interval_secs: 300,
        }
    }
}

impl Settings {
    /// Reads settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> LedgerResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&data)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Writes settings next to `path` first and renames over it.
    pub fn save(&self, path: &Path) -> LedgerResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.database_type == DatabaseType::Postgresql && !self.cloud_database.is_configured() {
            return Err(LedgerError::Config(
                "postgresql selected but cloud_database is incomplete".to_string(),
            ));
        }
        if self.alert_interval_secs == 0 {
            return Err(LedgerError::Config(
                "alert_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.currency.trim().is_empty() {
            return Err(LedgerError::Config("currency cannot be empty".to_string()));
        }
        if self.decimal_places > MAX_DECIMAL_PLACES {
            return Err(LedgerError::Config(format!(
                "decimal_places must be at most {}",
                MAX_DECIMAL_PLACES
            )));
        }
        for (name, value) in [
            ("alert_warning_percent", self.thresholds.alert_warning_percent),
            ("dashboard_warning_percent", self.thresholds.dashboard_warning_percent),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(LedgerError::Config(format!(
                    "{} must be a positive number",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Sets the setting named `key` (one of [`SETTING_KEYS`]) from its text
    /// form. Nothing changes unless the result validates.
    pub fn set(&mut self, key: &str, value: &str) -> LedgerResult<()> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> LedgerResult<T> {
            value.parse().map_err(|_| {
                LedgerError::Config(format!("Invalid value '{}' for {}", value, key))
            })
        }

        let value = value.trim();
        let mut updated = self.clone();
        match key.trim() {
            "currency" => updated.currency = value.to_uppercase(),
            "decimal_places" => updated.decimal_places = parse(key, value)?,
            "alert_warning_percent" => {
                updated.thresholds.alert_warning_percent = parse(key, value)?
            }
            "dashboard_warning_percent" => {
                updated.thresholds.dashboard_warning_percent = parse(key, value)?
            }
            "alert_interval_secs" => updated.alert_interval_secs = parse(key, value)?,
            "database_type" => updated.database_type = value.parse()?,
            "database_path" => updated.database_path = PathBuf::from(value),
            "cloud_host" => updated.cloud_database.host = value.to_string(),
            "cloud_port" => updated.cloud_database.port = parse(key, value)?,
            "cloud_database" => updated.cloud_database.database = value.to_string(),
            "cloud_user" => updated.cloud_database.user = value.to_string(),
            "cloud_password" => updated.cloud_database.password = value.to_string(),
            other => {
                return Err(LedgerError::Config(format!(
                    "Unknown setting '{}'. Known settings: {}",
                    other,
                    SETTING_KEYS.join(", ")
                )))
            }
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Current values in [`SETTING_KEYS`] order, with the password masked.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let cloud = &self.cloud_database;
        let password = if cloud.password.is_empty() { "" } else { "********" };
        vec![
            ("currency", self.currency.clone()),
            ("decimal_places", self.decimal_places.to_string()),
            ("alert_warning_percent", self.thresholds.alert_warning_percent.to_string()),
            (
                "dashboard_warning_percent",
                self.thresholds.dashboard_warning_percent.to_string(),
            ),
            ("alert_interval_secs", self.alert_interval_secs.to_string()),
            ("database_type", self.database_type.as_str().to_string()),
            ("database_path", self.database_path.display().to_string()),
            ("cloud_host", cloud.host.clone()),
            ("cloud_port", cloud.port.to_string()),
            ("cloud_database", cloud.database.clone()),
            ("cloud_user", cloud.user.clone()),
            ("cloud_password", password.to_string()),
        ]
    }

    pub fn format_amount(&self, amount: rust_decimal::Decimal) -> String {
        format!("{} {}", amount.round_dp(self.decimal_places), self.currency)
    }
}

/// Applies one edit to the settings file at `path` and saves it. `edit` is
/// either `key = value` or `defaults`, which restores every default.
/// Returns the settings as saved.
pub fn update_settings_file(path: &Path, edit: &str) -> LedgerResult<Settings> {
    let edit = edit.trim();
    let settings = if edit.eq_ignore_ascii_case("defaults") {
        Settings::default()
    } else {
        let (key, value) = edit.split_once('=').ok_or_else(|| {
            LedgerError::Validation("Expected 'key = value' or 'defaults'".to_string())
        })?;
        let mut settings = Settings::load(path)?;
        settings.set(key, value)?;
        settings
    };
    settings.save(path)?;
    tracing::info!(path = %path.display(), "settings saved");
    Ok(settings)
}

/// Resolves the config file: explicit path, then `EXPENSE_MANAGER_CONFIG`,
/// then the platform config directory.
pub fn config_file_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(custom) = std::env::var(CONFIG_ENV_VAR) {
        return PathBuf::from(custom);
    }
    match ProjectDirs::from("", "", "expense-manager") {
        Some(dirs) => dirs.config_dir().join(CONFIG_FILE_NAME),
        None => PathBuf::from(CONFIG_FILE_NAME),
    }
}

fn default_database_path() -> PathBuf {
    match ProjectDirs::from("", "", "expense-manager") {
        Some(dirs) => dirs.data_dir().join("expenses.db"),
        None => PathBuf::from("expenses.db"),
    }
}
