use pretty_assertions::assert_eq;
use rowmap_db::{Database, DatabaseConfig, DbError, Dsn, ErrorInfo, Schema};
use std::path::PathBuf;

fn config(dsn: &str) -> DatabaseConfig {
    DatabaseConfig {
        dsn: dsn.to_string(),
        ..DatabaseConfig::default()
    }
}

// ── Defaults ─────────────────────────────────────────────────────

#[test]
fn default_is_in_memory() {
    let cfg = DatabaseConfig::default();
    assert_eq!(cfg.parse_dsn().unwrap(), Dsn::Memory);
    assert!(cfg.foreign_keys);
    assert_eq!(cfg.busy_timeout_ms, Some(5_000));
    assert_eq!(cfg.datetime_format, "%Y-%m-%d %H:%M:%S");
}

// ── DSN parsing ──────────────────────────────────────────────────

#[test]
fn dsn_forms() {
    assert_eq!(config(":memory:").parse_dsn().unwrap(), Dsn::Memory);
    assert_eq!(
        config("sqlite:data/app.db").parse_dsn().unwrap(),
        Dsn::File(PathBuf::from("data/app.db"))
    );
    assert_eq!(
        config("sqlite:///var/app.db").parse_dsn().unwrap(),
        Dsn::File(PathBuf::from("/var/app.db"))
    );
    assert_eq!(
        config("app.db").parse_dsn().unwrap(),
        Dsn::File(PathBuf::from("app.db"))
    );
    assert_eq!(
        config(r"C:\data\app.db").parse_dsn().unwrap(),
        Dsn::File(PathBuf::from(r"C:\data\app.db"))
    );
}

#[test]
fn file_helper_round_trips() {
    let cfg = DatabaseConfig::file("/tmp/x.db");
    assert_eq!(cfg.parse_dsn().unwrap(), Dsn::File(PathBuf::from("/tmp/x.db")));
}

#[test]
fn unsupported_driver_is_connection_error() {
    let err = config("mysql:host=localhost;dbname=app").parse_dsn().unwrap_err();
    assert!(matches!(err, DbError::Connection(_)));
    assert!(matches!(config("  ").parse_dsn(), Err(DbError::Connection(_))));
    assert!(matches!(config("sqlite:").parse_dsn(), Err(DbError::Connection(_))));
}

#[test]
fn open_with_bad_dsn_fails() {
    let result = Database::open(config("pgsql:host=db"), Schema::new());
    assert!(matches!(result, Err(DbError::Connection(_))));
}

// ── Config files ─────────────────────────────────────────────────

#[test]
fn from_file_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    std::fs::write(&path, r#"{"dsn": "sqlite:app.db", "foreign_keys": false}"#).unwrap();

    let cfg = DatabaseConfig::from_file(&path).unwrap();
    assert_eq!(cfg.dsn, "sqlite:app.db");
    assert!(!cfg.foreign_keys);
    assert_eq!(cfg.busy_timeout_ms, Some(5_000));
}

#[test]
fn from_file_reports_bad_input() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    assert!(matches!(
        DatabaseConfig::from_file(&missing),
        Err(DbError::Config(_))
    ));

    let garbled = dir.path().join("garbled.json");
    std::fs::write(&garbled, "{dsn:").unwrap();
    assert!(matches!(
        DatabaseConfig::from_file(&garbled),
        Err(DbError::Config(_))
    ));
}

#[test]
fn bad_datetime_format_fails_write() {
    let schema = Schema::new()
        .with(rowmap_db::RecordType::new("Note").with_timestamps())
        .unwrap();
    let cfg = DatabaseConfig {
        datetime_format: "%Q".to_string(),
        ..DatabaseConfig::default()
    };
    let db = Database::open(cfg, schema).unwrap();
    db.execute_batch("CREATE TABLE Note (ID INTEGER PRIMARY KEY, Created TEXT, Updated TEXT)")
        .unwrap();
    let mut note = rowmap_db::Entity::new();
    assert!(matches!(db.insert("Note", &mut note), Err(DbError::Config(_))));
}

// ── Error detail ─────────────────────────────────────────────────

#[test]
fn error_info_display() {
    let info = ErrorInfo {
        code: Some(787),
        state: "ConstraintViolation".to_string(),
        message: "FOREIGN KEY constraint failed".to_string(),
    };
    assert_eq!(
        info.to_string(),
        "[ConstraintViolation 787] FOREIGN KEY constraint failed"
    );
    let generic = ErrorInfo {
        code: None,
        state: ErrorInfo::GENERIC_STATE.to_string(),
        message: "oops".to_string(),
    };
    assert_eq!(generic.to_string(), "[HY000] oops");
}

#[test]
fn error_display_mentions_kind() {
    let err = DbError::Validation("bad key".to_string());
    assert!(format!("{err}").contains("bad key"));
    assert!(format!("{err:?}").contains("Validation"));
}
