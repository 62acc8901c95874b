//! Backup and restore of the local SQLite ledger through SQLite's online
//! backup API.

use crate::error::{storage, LedgerError, LedgerResult};
use chrono::{DateTime, Local, NaiveDateTime};
use rusqlite::backup::Progress;
use rusqlite::{Connection, MAIN_DB};
use std::fs;
use std::path::{Path, PathBuf};

/// A backup file found on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupInfo {
    pub filename: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseInfo {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: DateTime<Local>,
}

pub fn backup_name_at(timestamp: NaiveDateTime) -> String {
    format!("expense_manager_backup_{}.db", timestamp.format("%Y%m%d_%H%M%S"))
}

/// `expense_manager_backup_<YYYYmmdd_HHMMSS>.db` for the current time.
pub fn default_backup_name() -> String {
    backup_name_at(Local::now().naive_local())
}

/// Opens `path` as SQLite and fails unless `PRAGMA quick_check` passes and
/// the file holds at least one table.
fn verify_database(path: &Path, what: &str) -> LedgerResult<()> {
    let failed = |detail: String| {
        LedgerError::Storage(format!("{} verification failed - {}", what, detail))
    };
    let conn = Connection::open(path).map_err(|e| failed(e.to_string()))?;
    let check: String = conn
        .query_row("PRAGMA quick_check", [], |row| row.get(0))
        .map_err(|e| failed(e.to_string()))?;
    if check != "ok" {
        return Err(failed(check));
    }
    let tables: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
            [],
            |row| row.get(0),
        )
        .map_err(storage("Failed to read schema"))?;
    if tables == 0 {
        return Err(failed("no tables found".to_string()));
    }
    Ok(())
}

/// Snapshots the database at `db_path` into `backup_path` with SQLite's
/// online backup, creating parent directories, and checks the copy.
/// Other connections may stay open; the copy holds everything committed.
pub fn backup_database(db_path: &Path, backup_path: &Path) -> LedgerResult<()> {
    if !db_path.exists() {
        return Err(LedgerError::not_found("Database", db_path.display()));
    }
    if let Some(parent) = backup_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(db_path).map_err(storage("Failed to open database"))?;
    conn.backup(MAIN_DB, backup_path, None)
        .map_err(storage("Failed to back up database"))?;
    verify_database(backup_path, "Backup")?;
    tracing::info!(from = %db_path.display(), to = %backup_path.display(), "backup created");
    Ok(())
}

/// Replaces the contents of `db_path` with `backup_path`. The current data is
/// first saved as `<db>.backup_<YYYYmmdd_HHMMSS>`; that path is returned when
/// a current file existed.
///
/// Waits for other connections to `db_path` to release their locks.
pub fn restore_database(db_path: &Path, backup_path: &Path) -> LedgerResult<Option<PathBuf>> {
    if !backup_path.exists() {
        return Err(LedgerError::not_found("Backup file", backup_path.display()));
    }
    verify_database(backup_path, "Backup")?;

    let saved = if db_path.exists() {
        let mut name = db_path.as_os_str().to_os_string();
        name.push(format!(".backup_{}", Local::now().format("%Y%m%d_%H%M%S")));
        let saved = PathBuf::from(name);
        backup_database(db_path, &saved)?;
        Some(saved)
    } else {
        None
    };

    let mut conn = Connection::open(db_path).map_err(storage("Failed to open database"))?;
    conn.restore(MAIN_DB, backup_path, None::<fn(Progress)>)
        .map_err(storage("Failed to restore database"))?;
    drop(conn);
    verify_database(db_path, "Restore")?;
    tracing::info!(from = %backup_path.display(), to = %db_path.display(), "database restored");
    Ok(saved)
}

fn modified_at(metadata: &fs::Metadata) -> LedgerResult<DateTime<Local>> {
    Ok(DateTime::<Local>::from(metadata.modified()?))
}

/// `.db` files in `dir` whose name contains "backup", newest first.
pub fn list_backups(dir: &Path) -> LedgerResult<Vec<BackupInfo>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut backups = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_db = path.extension().is_some_and(|ext| ext == "db");
        let filename = match path.file_name() {
            Some(name) => name.to_string_lossy().to_string(),
            None => continue,
        };
        if !is_db || !filename.contains("backup") || !path.is_file() {
            continue;
        }
        let metadata = fs::metadata(&path)?;
        backups.push(BackupInfo {
            filename,
            size_bytes: metadata.len(),
            modified: modified_at(&metadata)?,
            path,
        });
    }

    backups.sort_by(|a, b| b.modified.cmp(&a.modified));
    Ok(backups)
}

pub fn database_info(db_path: &Path) -> LedgerResult<DatabaseInfo> {
    if !db_path.exists() {
        return Err(LedgerError::not_found("Database", db_path.display()));
    }
    let metadata = fs::metadata(db_path)?;
    Ok(DatabaseInfo {
        path: db_path.to_path_buf(),
        size_bytes: metadata.len(),
        modified: modified_at(&metadata)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{LedgerStore, SqliteStore};
    use crate::models::budget::BudgetPeriod;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::fs::File;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn ledger_with_budget(path: &Path, amount: i64) {
        let store = SqliteStore::open(path).unwrap();
        store
            .upsert_budget("Food", Decimal::from(amount), BudgetPeriod::Monthly)
            .unwrap();
    }

    fn budget_amount(path: &Path) -> Decimal {
        let store = SqliteStore::open(path).unwrap();
        store.get_budget("Food").unwrap().unwrap().amount
    }

    #[test]
    fn test_backup_name() {
        let ts = NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        assert_eq!(backup_name_at(ts), "expense_manager_backup_20250102_030405.db");
        assert!(default_backup_name().starts_with("expense_manager_backup_"));
    }

    #[test]
    fn test_backup_copies_committed_data() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("ledger.db");
        ledger_with_budget(&db, 500);

        let target = dir.path().join("backups").join("copy_backup.db");
        backup_database(&db, &target).unwrap();
        assert_eq!(budget_amount(&target), Decimal::from(500));
    }

    #[test]
    fn test_backup_missing_database() {
        let dir = TempDir::new().unwrap();
        let err = backup_database(&dir.path().join("none.db"), &dir.path().join("b.db"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }

    #[test]
    fn test_backup_with_open_reader() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("ledger.db");
        ledger_with_budget(&db, 500);

        let reader = Connection::open(&db).unwrap();
        reader.execute_batch("BEGIN").unwrap();
        let seen: String = reader
            .query_row("SELECT amount FROM budgets", [], |row| row.get(0))
            .unwrap();
        assert_eq!(seen, "500");

        ledger_with_budget(&db, 777);
        let target = dir.path().join("open_reader_backup.db");
        backup_database(&db, &target).unwrap();
        assert_eq!(budget_amount(&target), Decimal::from(777));

        reader.execute_batch("COMMIT").unwrap();
        assert_eq!(budget_amount(&db), Decimal::from(777));
    }

    #[test]
    fn test_restore_saves_current_file() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("ledger.db");
        let backup = dir.path().join("ledger_backup.db");
        ledger_with_budget(&db, 500);
        backup_database(&db, &backup).unwrap();
        ledger_with_budget(&db, 900);

        let saved = restore_database(&db, &backup).unwrap().unwrap();
        assert!(saved.to_string_lossy().contains("ledger.db.backup_"));
        assert_eq!(budget_amount(&db), Decimal::from(500));
        assert_eq!(budget_amount(&saved), Decimal::from(900));
    }

    #[test]
    fn test_restore_rejects_invalid_backup() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("ledger.db");
        ledger_with_budget(&db, 500);

        let missing = restore_database(&db, &dir.path().join("absent.db")).unwrap_err();
        assert!(matches!(missing, LedgerError::NotFound { .. }));

        let empty = dir.path().join("empty.db");
        File::create(&empty).unwrap();
        let err = restore_database(&db, &empty).unwrap_err();
        assert!(err.to_string().contains("no tables found"));
        assert_eq!(budget_amount(&db), Decimal::from(500));

        let garbage = dir.path().join("garbage_backup.db");
        fs::write(&garbage, vec![0x5a; 8192]).unwrap();
        let err = restore_database(&db, &garbage).unwrap_err();
        assert!(err.to_string().contains("Backup verification failed"));
        assert_eq!(budget_amount(&db), Decimal::from(500));
    }

    #[test]
    fn test_list_backups_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        let now = SystemTime::now();
        for (name, age) in [
            ("old_backup.db", 300),
            ("new_backup.db", 10),
            ("ledger.db", 0),
            ("backup_notes.txt", 0),
        ] {
            let file = File::create(dir.path().join(name)).unwrap();
            file.set_modified(now - Duration::from_secs(age)).unwrap();
        }

        let names: Vec<String> = list_backups(dir.path())
            .unwrap()
            .into_iter()
            .map(|b| b.filename)
            .collect();
        assert_eq!(names, vec!["new_backup.db", "old_backup.db"]);
        assert!(list_backups(&dir.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_database_info() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("ledger.db");
        ledger_with_budget(&db, 1);

        let info = database_info(&db).unwrap();
        assert!(info.size_bytes > 0);
        assert_eq!(info.path, db);
        assert!(database_info(&dir.path().join("x.db")).is_err());
    }
}
