// ==========================================
// CityCatalyst eCRF 导入 - 导入管道数据模型
// ==========================================
// 生命周期: 仅在一次解析/校验/提取/导入调用内
// 序列化: camelCase（与前端 JSON 契约一致）
// ==========================================

use crate::domain::types::{FieldKey, FileType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// ==========================================
// CellValue - 原始单元格值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// 空值或空白字符串
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Empty
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", b),
            // 整数值不带小数部分（Excel 中的 2023 读出为 2023.0）
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{:.0}", n),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => write!(f, "{}", s),
        }
    }
}

// ==========================================
// SheetRow - 数据行（与表头按下标对齐）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SheetRow {
    pub cells: Vec<CellValue>,
}

impl SheetRow {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// 按列下标取值，越界视为空
    pub fn cell(&self, index: usize) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.cells.get(index).unwrap_or(&EMPTY)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(CellValue::is_empty)
    }
}

// ==========================================
// ParsedSheet - 解析后的工作表
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<SheetRow>,
    pub row_count: usize,
    pub column_count: usize,
}

impl ParsedSheet {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<SheetRow>) -> Self {
        let row_count = rows.len();
        let column_count = headers.len();
        Self {
            name: name.into(),
            headers,
            rows,
            row_count,
            column_count,
        }
    }

    pub fn has_data(&self) -> bool {
        !self.rows.is_empty()
    }

    /// 以 表头 → 值 的形式查看一行
    pub fn record(&self, row_index: usize) -> Option<HashMap<&str, &CellValue>> {
        let row = self.rows.get(row_index)?;
        Some(
            self.headers
                .iter()
                .enumerate()
                .map(|(idx, header)| (header.as_str(), row.cell(idx)))
                .collect(),
        )
    }
}

// ==========================================
// ParsedFileData - 一次解析的完整结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedFileData {
    pub file_type: FileType,
    pub sheets: Vec<ParsedSheet>,
    /// 主数据表在 sheets 中的下标
    pub primary_sheet: Option<usize>,
}

impl ParsedFileData {
    pub fn primary_sheet(&self) -> Option<&ParsedSheet> {
        self.primary_sheet.and_then(|idx| self.sheets.get(idx))
    }
}

// ==========================================
// ColumnMapping - 逻辑字段 → 列下标
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping {
    columns: BTreeMap<FieldKey, usize>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: FieldKey, index: usize) {
        self.columns.insert(field, index);
    }

    pub fn get(&self, field: FieldKey) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    pub fn contains(&self, field: FieldKey) -> bool {
        self.columns.contains_key(&field)
    }

    pub fn remove(&mut self, field: FieldKey) -> Option<usize> {
        self.columns.remove(&field)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, usize)> + '_ {
        self.columns.iter().map(|(k, v)| (*k, *v))
    }
}

// ==========================================
// UploadedFile - 上传文件（名称 + 字节）
// ==========================================
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn file_type(&self) -> Option<FileType> {
        FileType::from_file_name(&self.name)
    }
}

// ==========================================
// ValidationResult - 文件校验结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub file_type: Option<FileType>,
    pub file_size: u64,
    pub detected_columns: ColumnMapping,
}

// ==========================================
// ActivityFields - 活动数据字段
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityFields {
    pub activity_type: Option<String>,
    pub activity_amount: Option<f64>,
    pub activity_unit: Option<String>,
    pub methodology: Option<String>,
    pub data_source: Option<String>,
    pub data_quality: Option<String>,
}

impl ActivityFields {
    /// 是否存在需要落为活动值记录的元数据
    pub fn has_metadata(&self) -> bool {
        self.activity_amount.is_some()
            || self.activity_type.is_some()
            || self.activity_unit.is_some()
            || self.data_source.is_some()
            || self.data_quality.is_some()
    }
}

// ==========================================
// EmissionFactorFields - 排放因子字段
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmissionFactorFields {
    pub co2: Option<f64>,
    pub ch4: Option<f64>,
    pub n2o: Option<f64>,
    pub total: Option<f64>,
    pub unit: Option<String>,
}

// ==========================================
// ImportedRow - 提取后的标准化行
// ==========================================
// 气体数值单位: 公吨 CO2e
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedRow {
    /// 数据行下标（从 0 开始，不含表头）
    pub row_index: usize,
    pub gpc_reference_number: String,

    // 分类引用（来自 taxonomy 查询）
    pub sector_id: Option<String>,
    pub sector_reference_number: Option<String>,
    pub sub_sector_id: Option<String>,
    pub sub_category_id: Option<String>,
    pub scope_id: Option<String>,

    // 气体数值
    pub co2: Option<f64>,
    pub ch4: Option<f64>,
    pub n2o: Option<f64>,
    #[serde(rename = "totalCO2e")]
    pub total_co2e: Option<f64>,

    pub notation_key: Option<String>,
    pub explanation: Option<String>,
    pub year: Option<i32>,

    pub activity: ActivityFields,
    pub emission_factor: EmissionFactorFields,

    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ImportedRow {
    /// 表格中的行号（表头为第 1 行）
    pub fn row_number(&self) -> usize {
        self.row_index + 2
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_gas_values(&self) -> bool {
        self.co2.is_some() || self.ch4.is_some() || self.n2o.is_some() || self.total_co2e.is_some()
    }
}

// ==========================================
// EcrfImportResult - 行提取结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcrfImportResult {
    pub rows: Vec<ImportedRow>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub row_count: usize,
    pub valid_row_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inferred_year_from_file: Option<i32>,
}

impl EcrfImportResult {
    /// 存在文件级错误即不可导入
    pub fn is_importable(&self) -> bool {
        self.errors.is_empty() && self.valid_row_count > 0
    }
}

// ==========================================
// ImportSummary - 导入汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total_rows: usize,
    pub imported_rows: usize,
    pub skipped_rows: usize,
    pub created_values: usize,
    pub updated_values: usize,
    pub activity_values_created: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}
