// ==========================================
// CityCatalyst eCRF 导入 - 清单实体
// ==========================================
// 对齐: db::init_schema 中 inventory / inventory_value / activity_value 表
// 排放量单位: 千克 CO2e（整数）
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Inventory - 城市温室气体清单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub inventory_id: String,
    pub inventory_name: String,
    pub city_name: String,
    pub year: Option<i32>, // 清单年份（可由导入文件回填）
}

// ==========================================
// InventoryValue - 清单值（按 GPC 编号唯一）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryValue {
    pub id: String,
    pub inventory_id: String,
    pub gpc_reference_number: String,
    pub sector_id: Option<String>,
    pub sub_sector_id: Option<String>,
    pub sub_category_id: Option<String>,
    pub co2eq: Option<i64>,                      // 千克 CO2e
    pub unavailable_reason: Option<String>,      // 注释键映射值
    pub unavailable_explanation: Option<String>, // 注释键说明
    pub input_methodology: Option<String>,       // 推断出的方法学 ID 或原文
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// ActivityValue - 活动值（清单值的伴随记录）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityValue {
    pub id: String,
    pub inventory_value_id: String,
    pub activity_data: serde_json::Value, // 按方法学 schema 布局的活动数据
    pub metadata: serde_json::Value,      // 数据来源/质量/排放因子
    pub co2eq: i64,                       // 千克 CO2e
    pub created_at: DateTime<Utc>,
}

// ==========================================
// TaxonomyEntry - GPC 分类引用
// ==========================================
// 部门(Sector) → 子部门(SubSector) → 子类别(SubCategory) → 范围(Scope)
// 部门 I–III 有子类别；部门 IV–V 直接挂在子部门上
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyEntry {
    pub reference_number: String,
    pub sector_id: Option<String>,
    pub sector_reference_number: Option<String>,
    pub sub_sector_id: Option<String>,
    pub sub_category_id: Option<String>,
    pub scope_id: Option<String>,
}

impl TaxonomyEntry {
    /// 具备部门与范围引用时才可用于导入
    pub fn is_complete(&self) -> bool {
        self.sector_id.is_some() && self.scope_id.is_some()
    }
}
