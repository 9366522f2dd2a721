// ==========================================
// CityCatalyst eCRF 导入 - 清单值 Repository 实现
// ==========================================
// 职责: 实现清单相关数据访问（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::inventory::{ActivityValue, Inventory, InventoryValue};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::inventory_repo::InventoryRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

const INVENTORY_VALUE_COLUMNS: &str = "id, inventory_id, gpc_reference_number, sector_id, \
     sub_sector_id, sub_category_id, co2eq, unavailable_reason, unavailable_explanation, \
     input_methodology, created_at, updated_at";

// 时间以 RFC3339 文本存储
fn parse_timestamp(raw: &str, field: &str) -> RepositoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::FieldValueError {
            field: field.to_string(),
            message: format!("{} ({})", e, raw),
        })
}

// 先按原始列读出，时间/JSON 的解析放到 rusqlite 闭包之外做
struct InventoryValueRow {
    id: String,
    inventory_id: String,
    gpc_reference_number: String,
    sector_id: Option<String>,
    sub_sector_id: Option<String>,
    sub_category_id: Option<String>,
    co2eq: Option<i64>,
    unavailable_reason: Option<String>,
    unavailable_explanation: Option<String>,
    input_methodology: Option<String>,
    created_at: String,
    updated_at: String,
}

impl InventoryValueRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            inventory_id: row.get(1)?,
            gpc_reference_number: row.get(2)?,
            sector_id: row.get(3)?,
            sub_sector_id: row.get(4)?,
            sub_category_id: row.get(5)?,
            co2eq: row.get(6)?,
            unavailable_reason: row.get(7)?,
            unavailable_explanation: row.get(8)?,
            input_methodology: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    fn into_entity(self) -> RepositoryResult<InventoryValue> {
        Ok(InventoryValue {
            created_at: parse_timestamp(&self.created_at, "created_at")?,
            updated_at: parse_timestamp(&self.updated_at, "updated_at")?,
            id: self.id,
            inventory_id: self.inventory_id,
            gpc_reference_number: self.gpc_reference_number,
            sector_id: self.sector_id,
            sub_sector_id: self.sub_sector_id,
            sub_category_id: self.sub_category_id,
            co2eq: self.co2eq,
            unavailable_reason: self.unavailable_reason,
            unavailable_explanation: self.unavailable_explanation,
            input_methodology: self.input_methodology,
        })
    }
}

// ==========================================
// SqliteInventoryRepository
// ==========================================
pub struct SqliteInventoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteInventoryRepository {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 复用已有连接
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

#[async_trait]
impl InventoryRepository for SqliteInventoryRepository {
    async fn create_inventory(&self, inventory: &Inventory) -> RepositoryResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO inventory (inventory_id, inventory_name, city_name, year) VALUES (?1, ?2, ?3, ?4)",
            params![
                inventory.inventory_id,
                inventory.inventory_name,
                inventory.city_name,
                inventory.year,
            ],
        )?;
        Ok(())
    }

    async fn find_inventory(&self, inventory_id: &str) -> RepositoryResult<Option<Inventory>> {
        let conn = self.lock()?;
        let inventory = conn
            .query_row(
                "SELECT inventory_id, inventory_name, city_name, year FROM inventory WHERE inventory_id = ?1",
                params![inventory_id],
                |row| {
                    Ok(Inventory {
                        inventory_id: row.get(0)?,
                        inventory_name: row.get(1)?,
                        city_name: row.get(2)?,
                        year: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(inventory)
    }

    async fn update_inventory_year(&self, inventory_id: &str, year: i32) -> RepositoryResult<()> {
        let conn = self.lock()?;
        let affected = conn.execute(
            "UPDATE inventory SET year = ?1 WHERE inventory_id = ?2",
            params![year, inventory_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Inventory".to_string(),
                id: inventory_id.to_string(),
            });
        }
        Ok(())
    }

    async fn find_inventory_value(
        &self,
        inventory_id: &str,
        gpc_reference_number: &str,
    ) -> RepositoryResult<Option<InventoryValue>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM inventory_value WHERE inventory_id = ?1 AND gpc_reference_number = ?2",
            INVENTORY_VALUE_COLUMNS
        );
        let raw = conn
            .query_row(
                &sql,
                params![inventory_id, gpc_reference_number],
                InventoryValueRow::from_row,
            )
            .optional()?;

        raw.map(InventoryValueRow::into_entity).transpose()
    }

    async fn insert_inventory_value(&self, value: &InventoryValue) -> RepositoryResult<()> {
        let conn = self.lock()?;
        let sql = format!(
            "INSERT INTO inventory_value ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            INVENTORY_VALUE_COLUMNS
        );
        conn.execute(
            &sql,
            params![
                value.id,
                value.inventory_id,
                value.gpc_reference_number,
                value.sector_id,
                value.sub_sector_id,
                value.sub_category_id,
                value.co2eq,
                value.unavailable_reason,
                value.unavailable_explanation,
                value.input_methodology,
                value.created_at.to_rfc3339(),
                value.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn update_inventory_value(&self, value: &InventoryValue) -> RepositoryResult<()> {
        let conn = self.lock()?;
        let affected = conn.execute(
            r#"
            UPDATE inventory_value SET
                sector_id = ?2,
                sub_sector_id = ?3,
                sub_category_id = ?4,
                co2eq = ?5,
                unavailable_reason = ?6,
                unavailable_explanation = ?7,
                input_methodology = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
            params![
                value.id,
                value.sector_id,
                value.sub_sector_id,
                value.sub_category_id,
                value.co2eq,
                value.unavailable_reason,
                value.unavailable_explanation,
                value.input_methodology,
                value.updated_at.to_rfc3339(),
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "InventoryValue".to_string(),
                id: value.id.clone(),
            });
        }
        Ok(())
    }

    async fn list_inventory_values(
        &self,
        inventory_id: &str,
    ) -> RepositoryResult<Vec<InventoryValue>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM inventory_value WHERE inventory_id = ?1 ORDER BY gpc_reference_number",
            INVENTORY_VALUE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![inventory_id], InventoryValueRow::from_row)?;

        let mut values = Vec::new();
        for row in rows {
            values.push(row?.into_entity()?);
        }
        Ok(values)
    }

    async fn insert_activity_value(&self, value: &ActivityValue) -> RepositoryResult<()> {
        let activity_data_json = serde_json::to_string(&value.activity_data)?;
        let metadata_json = serde_json::to_string(&value.metadata)?;

        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO activity_value (
                id, inventory_value_id, activity_data_json, metadata_json, co2eq, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                value.id,
                value.inventory_value_id,
                activity_data_json,
                metadata_json,
                value.co2eq,
                value.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn delete_activity_values(&self, inventory_value_id: &str) -> RepositoryResult<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM activity_value WHERE inventory_value_id = ?1",
            params![inventory_value_id],
        )?;
        Ok(deleted)
    }

    async fn list_activity_values(
        &self,
        inventory_value_id: &str,
    ) -> RepositoryResult<Vec<ActivityValue>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, inventory_value_id, activity_data_json, metadata_json, co2eq, created_at
            FROM activity_value
            WHERE inventory_value_id = ?1
            ORDER BY created_at, id
            "#,
        )?;
        let rows = stmt.query_map(params![inventory_value_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut values = Vec::new();
        for row in rows {
            let (id, parent_id, activity_data_json, metadata_json, co2eq, created_at) = row?;
            values.push(ActivityValue {
                id,
                inventory_value_id: parent_id,
                activity_data: serde_json::from_str(&activity_data_json)?,
                metadata: serde_json::from_str(&metadata_json)?,
                co2eq,
                created_at: parse_timestamp(&created_at, "created_at")?,
            });
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use serde_json::json;

    fn setup_repo() -> SqliteInventoryRepository {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        SqliteInventoryRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn sample_inventory() -> Inventory {
        Inventory {
            inventory_id: "inv-1".to_string(),
            inventory_name: "Test inventory".to_string(),
            city_name: "Test City".to_string(),
            year: None,
        }
    }

    fn sample_value(id: &str) -> InventoryValue {
        let now = Utc::now();
        InventoryValue {
            id: id.to_string(),
            inventory_id: "inv-1".to_string(),
            gpc_reference_number: "I.1.1".to_string(),
            sector_id: Some("sector-i".to_string()),
            sub_sector_id: Some("ss-i-1".to_string()),
            sub_category_id: Some("sc-i-1-1".to_string()),
            co2eq: Some(12_500),
            unavailable_reason: None,
            unavailable_explanation: None,
            input_methodology: Some("direct-measure".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_inventory_year_update() {
        let repo = setup_repo();
        repo.create_inventory(&sample_inventory()).await.unwrap();

        repo.update_inventory_year("inv-1", 2023).await.unwrap();
        let inventory = repo.find_inventory("inv-1").await.unwrap().unwrap();
        assert_eq!(inventory.year, Some(2023));

        let missing = repo.update_inventory_year("nope", 2023).await;
        assert!(matches!(missing, Err(RepositoryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_inventory_value_insert_find_update() {
        let repo = setup_repo();
        repo.create_inventory(&sample_inventory()).await.unwrap();
        repo.insert_inventory_value(&sample_value("v-1")).await.unwrap();

        let mut found = repo
            .find_inventory_value("inv-1", "I.1.1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.co2eq, Some(12_500));

        found.co2eq = None;
        found.unavailable_reason = Some("no-occurrance".to_string());
        repo.update_inventory_value(&found).await.unwrap();

        let values = repo.list_inventory_values("inv-1").await.unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].co2eq, None);
        assert_eq!(values[0].unavailable_reason.as_deref(), Some("no-occurrance"));
    }

    #[tokio::test]
    async fn test_duplicate_gpc_ref_is_unique_violation() {
        let repo = setup_repo();
        repo.create_inventory(&sample_inventory()).await.unwrap();
        repo.insert_inventory_value(&sample_value("v-1")).await.unwrap();

        let err = repo.insert_inventory_value(&sample_value("v-2")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
    }

    #[tokio::test]
    async fn test_activity_values_roundtrip_and_delete() {
        let repo = setup_repo();
        repo.create_inventory(&sample_inventory()).await.unwrap();
        repo.insert_inventory_value(&sample_value("v-1")).await.unwrap();

        let activity = ActivityValue {
            id: "a-1".to_string(),
            inventory_value_id: "v-1".to_string(),
            activity_data: json!({"fuel-consumption": 10.0, "fuel-consumption-unit": "units-liters"}),
            metadata: json!({"dataSource": "Utility bills"}),
            co2eq: 12_500,
            created_at: Utc::now(),
        };
        repo.insert_activity_value(&activity).await.unwrap();

        let listed = repo.list_activity_values("v-1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].activity_data["fuel-consumption-unit"], "units-liters");

        assert_eq!(repo.delete_activity_values("v-1").await.unwrap(), 1);
        assert!(repo.list_activity_values("v-1").await.unwrap().is_empty());
    }
}
