// ==========================================
// CityCatalyst eCRF 导入 - GPC 分类仓储
// ==========================================
// 职责: 按 GPC 编号查询 部门/子部门/子类别/范围 引用
// 红线: 导入管道对分类数据只读
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::inventory::TaxonomyEntry;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// TaxonomyRepository Trait
// ==========================================
// 实现者: SqliteTaxonomyRepository
#[async_trait]
pub trait TaxonomyRepository: Send + Sync {
    /// 按子类别编号查询（部门 I–III 使用）
    async fn find_subcategory_by_ref(
        &self,
        reference_number: &str,
    ) -> RepositoryResult<Option<TaxonomyEntry>>;

    /// 按子部门编号查询（部门 IV–V 无子类别）
    async fn find_subsector_by_ref(
        &self,
        reference_number: &str,
    ) -> RepositoryResult<Option<TaxonomyEntry>>;
}

// ==========================================
// SqliteTaxonomyRepository
// ==========================================
pub struct SqliteTaxonomyRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTaxonomyRepository {
    /// 创建新的 Repository 实例
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
}

#[async_trait]
impl TaxonomyRepository for SqliteTaxonomyRepository {
    async fn find_subcategory_by_ref(
        &self,
        reference_number: &str,
    ) -> RepositoryResult<Option<TaxonomyEntry>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let entry = conn
            .query_row(
                r#"
                SELECT sc.subcategory_id, sc.reference_number, sc.scope_id,
                       ss.subsector_id, ss.sector_id, s.reference_number
                FROM sub_category sc
                LEFT JOIN sub_sector ss ON ss.subsector_id = sc.subsector_id
                LEFT JOIN sector s ON s.sector_id = ss.sector_id
                WHERE sc.reference_number = ?1
                LIMIT 1
                "#,
                params![reference_number.trim()],
                |row| {
                    Ok(TaxonomyEntry {
                        sub_category_id: row.get(0)?,
                        reference_number: row.get(1)?,
                        scope_id: row.get(2)?,
                        sub_sector_id: row.get(3)?,
                        sector_id: row.get(4)?,
                        sector_reference_number: row.get(5)?,
                    })
                },
            )
            .optional()?;

        Ok(entry)
    }

    async fn find_subsector_by_ref(
        &self,
        reference_number: &str,
    ) -> RepositoryResult<Option<TaxonomyEntry>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let entry = conn
            .query_row(
                r#"
                SELECT ss.subsector_id, ss.reference_number, ss.scope_id,
                       ss.sector_id, s.reference_number
                FROM sub_sector ss
                LEFT JOIN sector s ON s.sector_id = ss.sector_id
                WHERE ss.reference_number = ?1
                LIMIT 1
                "#,
                params![reference_number.trim()],
                |row| {
                    Ok(TaxonomyEntry {
                        sub_sector_id: row.get(0)?,
                        reference_number: row.get(1)?,
                        scope_id: row.get(2)?,
                        sector_id: row.get(3)?,
                        sector_reference_number: row.get(4)?,
                        sub_category_id: None,
                    })
                },
            )
            .optional()?;

        Ok(entry)
    }
}
