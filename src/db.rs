// ==========================================
// CityCatalyst eCRF 导入 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键/busy_timeout）
// - 提供本地库表结构（分类、清单、配置），供仓储层与测试共用
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 默认数据库路径
///
/// 优先级: 环境变量 CITYCATALYST_ECRF_DB_PATH → 用户数据目录 → 当前目录
pub fn default_db_path() -> String {
    if let Ok(path) = std::env::var("CITYCATALYST_ECRF_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./citycatalyst_ecrf.db");
    if let Some(data_dir) = dirs::data_local_dir() {
        let dir = data_dir.join("citycatalyst-ecrf");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("citycatalyst_ecrf.db");
        }
    }
    path.to_string_lossy().to_string()
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 建表（幂等）
///
/// 分类表（sector/sub_sector/sub_category/scope）对导入管道只读，
/// 由外部数据加载流程写入。
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS scope (
            scope_id TEXT PRIMARY KEY,
            scope_name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sector (
            sector_id TEXT PRIMARY KEY,
            sector_name TEXT NOT NULL,
            reference_number TEXT
        );

        CREATE TABLE IF NOT EXISTS sub_sector (
            subsector_id TEXT PRIMARY KEY,
            subsector_name TEXT NOT NULL,
            reference_number TEXT,
            sector_id TEXT REFERENCES sector(sector_id),
            scope_id TEXT REFERENCES scope(scope_id)
        );

        CREATE TABLE IF NOT EXISTS sub_category (
            subcategory_id TEXT PRIMARY KEY,
            subcategory_name TEXT NOT NULL,
            reference_number TEXT,
            subsector_id TEXT REFERENCES sub_sector(subsector_id),
            scope_id TEXT REFERENCES scope(scope_id)
        );

        CREATE INDEX IF NOT EXISTS idx_sub_sector_ref ON sub_sector(reference_number);
        CREATE INDEX IF NOT EXISTS idx_sub_category_ref ON sub_category(reference_number);

        CREATE TABLE IF NOT EXISTS inventory (
            inventory_id TEXT PRIMARY KEY,
            inventory_name TEXT NOT NULL,
            city_name TEXT NOT NULL,
            year INTEGER
        );

        CREATE TABLE IF NOT EXISTS inventory_value (
            id TEXT PRIMARY KEY,
            inventory_id TEXT NOT NULL REFERENCES inventory(inventory_id) ON DELETE CASCADE,
            gpc_reference_number TEXT NOT NULL,
            sector_id TEXT,
            sub_sector_id TEXT,
            sub_category_id TEXT,
            co2eq INTEGER,
            unavailable_reason TEXT,
            unavailable_explanation TEXT,
            input_methodology TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(inventory_id, gpc_reference_number)
        );

        CREATE TABLE IF NOT EXISTS activity_value (
            id TEXT PRIMARY KEY,
            inventory_value_id TEXT NOT NULL REFERENCES inventory_value(id) ON DELETE CASCADE,
            activity_data_json TEXT NOT NULL,
            metadata_json TEXT NOT NULL,
            co2eq INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_activity_value_parent ON activity_value(inventory_value_id);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), None);

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_inventory_value_unique_per_gpc_ref() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO inventory (inventory_id, inventory_name, city_name) VALUES ('inv', 'n', 'c')",
            [],
        )
        .unwrap();

        let insert = "INSERT INTO inventory_value (id, inventory_id, gpc_reference_number, created_at, updated_at) \
                      VALUES (?1, 'inv', 'I.1.1', 'now', 'now')";
        conn.execute(insert, ["a"]).unwrap();
        assert!(conn.execute(insert, ["b"]).is_err());
    }
}
