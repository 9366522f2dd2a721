// ==========================================
// CityCatalyst eCRF 导入 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: eCRF 表格 → GPC 温室气体清单
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 解析/校验/提取/导入
pub mod importer;

// 配置层 - 导入参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{FieldKey, FileType, NotationKey};

// 领域实体
pub use domain::{
    ColumnMapping, EcrfImportResult, ImportSummary, ImportedRow, Inventory, InventoryValue,
    ParsedFileData, UploadedFile, ValidationResult,
};

// 导入管道
pub use importer::{
    detect_columns, parse_file, EcrfImporter, FileValidator, InventoryImporter, RowExtractor,
    TranslationLookup,
};

// API
pub use api::{ApiError, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "CityCatalyst eCRF Importer";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
