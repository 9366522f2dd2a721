// ==========================================
// CityCatalyst eCRF 导入 - 导入层
// ==========================================
// 管道: 解析 → 列检测 → 校验 → 行提取 → 导入
// 支持: xlsx, csv（内存字节）
// ==========================================

// 模块声明
pub mod column_detector;
pub mod data_cleaner;
pub mod ecrf_importer_trait;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod file_validator;
pub mod inventory_importer;
pub mod methodology;
pub mod row_extractor;
pub mod translation;

// 重导出核心类型
pub use column_detector::{detect_columns, find_column, find_column_index};
pub use data_cleaner::DataCleaner as DataCleanerImpl;
pub use error::{ImportError, ImportResult};
pub use field_mapper::{rule_for, ColumnRule, HeaderExclusion, COLUMN_RULES};
pub use file_parser::{parse_file, CsvParser, ExcelParser, UniversalFileParser};
pub use file_validator::FileValidator;
pub use inventory_importer::InventoryImporter;
pub use methodology::{infer_methodology, schema_for, MethodologySchema};
pub use row_extractor::RowExtractor;
pub use translation::TranslationLookup;

// 重导出 Trait 接口
pub use ecrf_importer_trait::{DataCleaner, EcrfImporter, FileParser};
