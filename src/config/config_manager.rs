// ==========================================
// CityCatalyst eCRF 导入 - 配置管理器
// ==========================================
// 职责: 配置加载、查询
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::{
    ImportConfigReader, ImportSettings, DEFAULT_MAX_FILE_SIZE_BYTES, DEFAULT_YEAR_MAX,
    DEFAULT_YEAR_MIN,
};
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    pub const MAX_FILE_SIZE_BYTES: &str = "ecrf/max_file_size_bytes";
    pub const ACCEPTED_EXTENSIONS: &str = "ecrf/accepted_extensions";
    pub const PRIMARY_SHEET_NAMES: &str = "ecrf/primary_sheet_names";
    pub const YEAR_MIN: &str = "ecrf/year_min";
    pub const YEAR_MAX: &str = "ecrf/year_max";
}

// 逗号分隔列表，去空白、转小写、丢弃空项
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().trim_start_matches('.').to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_max_file_size_bytes(&self) -> Result<u64, Box<dyn Error>> {
        let default = DEFAULT_MAX_FILE_SIZE_BYTES.to_string();
        let value = self.get_config_or_default(config_keys::MAX_FILE_SIZE_BYTES, &default)?;
        match value.trim().parse::<u64>() {
            Ok(v) if v > 0 => Ok(v),
            _ => {
                tracing::warn!(
                    config_key = config_keys::MAX_FILE_SIZE_BYTES,
                    raw_value = %value,
                    "invalid file size limit, using default"
                );
                Ok(DEFAULT_MAX_FILE_SIZE_BYTES)
            }
        }
    }

    async fn get_accepted_extensions(&self) -> Result<Vec<String>, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::ACCEPTED_EXTENSIONS, "xlsx,csv")?;
        let extensions = parse_list(&value);
        if extensions.is_empty() {
            Ok(ImportSettings::default().accepted_extensions) // 默认值
        } else {
            Ok(extensions)
        }
    }

    async fn get_primary_sheet_names(&self) -> Result<Vec<String>, Box<dyn Error>> {
        let default = ImportSettings::default().primary_sheet_names.join(",");
        let value = self.get_config_or_default(config_keys::PRIMARY_SHEET_NAMES, &default)?;
        let names = parse_list(&value);
        if names.is_empty() {
            Ok(ImportSettings::default().primary_sheet_names)
        } else {
            Ok(names)
        }
    }

    async fn get_year_bounds(&self) -> Result<(i32, i32), Box<dyn Error>> {
        let min = self
            .get_config_or_default(config_keys::YEAR_MIN, &DEFAULT_YEAR_MIN.to_string())?
            .trim()
            .parse::<i32>()
            .unwrap_or(DEFAULT_YEAR_MIN);
        let max = self
            .get_config_or_default(config_keys::YEAR_MAX, &DEFAULT_YEAR_MAX.to_string())?
            .trim()
            .parse::<i32>()
            .unwrap_or(DEFAULT_YEAR_MAX);

        if min > max {
            tracing::warn!(min, max, "year bounds inverted, using defaults");
            return Ok((DEFAULT_YEAR_MIN, DEFAULT_YEAR_MAX));
        }
        Ok((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn setup_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_when_config_missing() {
        let manager = setup_manager();
        let settings = manager.get_import_settings().await.unwrap();
        assert_eq!(settings, ImportSettings::default());
    }

    #[tokio::test]
    async fn test_overrides_from_config_kv() {
        let manager = setup_manager();
        manager
            .set_global_config_value(config_keys::MAX_FILE_SIZE_BYTES, "1024")
            .unwrap();
        manager
            .set_global_config_value(config_keys::ACCEPTED_EXTENSIONS, " CSV , .xlsx ,")
            .unwrap();
        manager.set_global_config_value(config_keys::YEAR_MIN, "1990").unwrap();

        let settings = manager.get_import_settings().await.unwrap();
        assert_eq!(settings.max_file_size_bytes, 1024);
        assert_eq!(settings.accepted_extensions, vec!["csv", "xlsx"]);
        assert_eq!((settings.year_min, settings.year_max), (1990, 2100));
    }

    #[tokio::test]
    async fn test_invalid_values_fall_back() {
        let manager = setup_manager();
        manager
            .set_global_config_value(config_keys::MAX_FILE_SIZE_BYTES, "lots")
            .unwrap();
        manager.set_global_config_value(config_keys::YEAR_MIN, "2200").unwrap();

        assert_eq!(
            manager.get_max_file_size_bytes().await.unwrap(),
            DEFAULT_MAX_FILE_SIZE_BYTES
        );
        assert_eq!(manager.get_year_bounds().await.unwrap(), (1900, 2100));
    }

    #[test]
    fn test_config_snapshot() {
        let manager = setup_manager();
        manager.set_global_config_value(config_keys::YEAR_MAX, "2050").unwrap();

        let snapshot = manager.get_config_snapshot().unwrap();
        let parsed: HashMap<String, String> = serde_json::from_str(&snapshot).unwrap();
        assert_eq!(parsed.get(config_keys::YEAR_MAX).map(String::as_str), Some("2050"));
    }
}
