// ==========================================
// CityCatalyst eCRF 导入 - 领域模型层
// ==========================================
// 职责: 定义导入管道数据结构、清单实体、领域类型
// 红线: 不含数据访问逻辑,不含导入逻辑
// ==========================================

pub mod ecrf;
pub mod inventory;
pub mod types;

// 重导出核心类型
pub use ecrf::{
    ActivityFields, CellValue, ColumnMapping, EcrfImportResult, EmissionFactorFields,
    ImportSummary, ImportedRow, ParsedFileData, ParsedSheet, SheetRow, UploadedFile,
    ValidationResult,
};
pub use inventory::{ActivityValue, Inventory, InventoryValue, TaxonomyEntry};
pub use types::{FieldKey, FileType, NotationKey};
