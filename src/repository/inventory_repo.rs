// ==========================================
// CityCatalyst eCRF 导入 - 清单值 Repository Trait
// ==========================================
// 职责: 定义清单/清单值/活动值数据访问接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::inventory::{ActivityValue, Inventory, InventoryValue};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// InventoryRepository Trait
// ==========================================
// 用途: 清单导入相关数据访问
// 实现者: SqliteInventoryRepository
// 说明: 同一清单的并发导入不在此层协调
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    // ===== 清单 =====

    /// 创建清单
    async fn create_inventory(&self, inventory: &Inventory) -> RepositoryResult<()>;

    /// 按 ID 查询清单
    async fn find_inventory(&self, inventory_id: &str) -> RepositoryResult<Option<Inventory>>;

    /// 设置清单年份
    async fn update_inventory_year(&self, inventory_id: &str, year: i32) -> RepositoryResult<()>;

    // ===== 清单值 =====

    /// 按 (inventory_id, gpc_reference_number) 查询清单值
    async fn find_inventory_value(
        &self,
        inventory_id: &str,
        gpc_reference_number: &str,
    ) -> RepositoryResult<Option<InventoryValue>>;

    /// 新建清单值
    async fn insert_inventory_value(&self, value: &InventoryValue) -> RepositoryResult<()>;

    /// 按 id 整行更新清单值
    async fn update_inventory_value(&self, value: &InventoryValue) -> RepositoryResult<()>;

    /// 列出清单下所有清单值（按 GPC 编号排序）
    async fn list_inventory_values(&self, inventory_id: &str)
        -> RepositoryResult<Vec<InventoryValue>>;

    // ===== 活动值 =====

    /// 新建活动值
    async fn insert_activity_value(&self, value: &ActivityValue) -> RepositoryResult<()>;

    /// 删除清单值下所有活动值
    ///
    /// # 返回
    /// - Ok(usize): 删除条数
    async fn delete_activity_values(&self, inventory_value_id: &str) -> RepositoryResult<usize>;

    /// 列出清单值下所有活动值
    async fn list_activity_values(
        &self,
        inventory_value_id: &str,
    ) -> RepositoryResult<Vec<ActivityValue>>;
}
