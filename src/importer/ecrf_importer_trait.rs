// ==========================================
// CityCatalyst eCRF 导入 - 导入管道 Trait
// ==========================================
// 职责: 定义解析/清洗/导入接口（不包含实现）
// ==========================================

use crate::domain::ecrf::{CellValue, EcrfImportResult, ImportSummary, ParsedSheet};
use crate::domain::types::FileType;
use crate::importer::error::ImportResult;
use async_trait::async_trait;

// ==========================================
// EcrfImporter Trait
// ==========================================
// 用途: 将提取结果写入清单
// 实现者: InventoryImporter
#[async_trait]
pub trait EcrfImporter: Send + Sync {
    /// 将行提取结果导入指定清单
    ///
    /// # 参数
    /// - inventory_id: 目标清单 ID
    /// - result: RowExtractor 产出的提取结果
    ///
    /// # 返回
    /// - Ok(ImportSummary): 导入汇总（行级问题记录在其中）
    /// - Err: 清单不存在等致命错误
    async fn import(
        &self,
        inventory_id: &str,
        result: &EcrfImportResult,
    ) -> ImportResult<ImportSummary>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 内存字节 → 工作表列表
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析器处理的文件类型
    fn file_type(&self) -> FileType;

    /// 解析字节内容为工作表列表（按文件中顺序）
    ///
    /// # 返回
    /// - Err: 字节内容损坏（ZIP/XML 错误、CSV 语法错误、非 UTF-8）
    fn parse_sheets(&self, bytes: &[u8]) -> ImportResult<Vec<ParsedSheet>>;
}

// ==========================================
// DataCleaner Trait
// ==========================================
// 用途: 单元格取值与类型转换
// 实现者: DataCleaner
pub trait DataCleaner: Send + Sync {
    /// TRIM（可选 UPPER）
    fn clean_text(&self, value: &str, uppercase: bool) -> String;

    /// 空白字符串 → None
    fn normalize_null(&self, value: Option<String>) -> Option<String>;

    /// 单元格 → 去空白的非空文本
    fn cell_text(&self, cell: &CellValue) -> Option<String>;

    /// 单元格 → 数值（数值单元格或数字文本，允许千分位逗号）
    fn parse_number(&self, cell: &CellValue) -> Option<f64>;

    /// 单元格 → 年份（整数且在 [min, max] 内）
    fn parse_year(&self, cell: &CellValue, min: i32, max: i32) -> Option<i32>;
}
