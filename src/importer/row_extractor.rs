// ==========================================
// CityCatalyst eCRF 导入 - 行提取器
// ==========================================
// 职责: 数据行 → ImportedRow（取值、类型转换、分类查询）
// 文件级错误: 缺少 GPC 编号列 / 无有效行
// 行级问题: 记录到行的 errors / warnings，不中断整个文件
// ==========================================

use crate::config::import_config_trait::{DEFAULT_YEAR_MAX, DEFAULT_YEAR_MIN};
use crate::domain::ecrf::{
    ActivityFields, CellValue, ColumnMapping, EcrfImportResult, EmissionFactorFields,
    ImportedRow, ParsedFileData, SheetRow,
};
use crate::domain::inventory::TaxonomyEntry;
use crate::domain::types::FieldKey;
use crate::i18n::t_with_args;
use crate::importer::column_detector::find_column_index;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::ecrf_importer_trait::DataCleaner as _;
use crate::importer::field_mapper::rule_for;
use crate::importer::translation::TranslationLookup;
use crate::repository::error::RepositoryResult;
use crate::repository::taxonomy_repo::TaxonomyRepository;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

/// 总量列修复时要求同时出现的表头词
const TOTAL_REPAIR_TERMS: [&str; 3] = ["ghgs", "metric tonnes", "total co2e"];

/// 若检测到的总量列实为排放因子列，改用 GHGs 总量列
///
/// 找不到替代列时保留原下标
pub fn repair_total_co2e_column(headers: &[String], detected: Option<usize>) -> Option<usize> {
    let idx = detected?;
    let header = headers.get(idx).map(|h| h.to_lowercase()).unwrap_or_default();
    if !header.contains("emission factor") || header.contains("ghgs") {
        return Some(idx);
    }

    let replacement = headers.iter().position(|h| {
        let h = h.to_lowercase();
        TOTAL_REPAIR_TERMS.iter().all(|term| h.contains(term))
    });
    match replacement {
        Some(new_idx) => {
            tracing::debug!(from = idx, to = new_idx, "total CO2e column repaired");
            Some(new_idx)
        }
        None => Some(idx),
    }
}

// ==========================================
// 每个文件解析一次的列下标
// ==========================================
struct ResolvedColumns {
    columns: HashMap<FieldKey, usize>,
}

impl ResolvedColumns {
    fn resolve(headers: &[String], mapping: &ColumnMapping) -> Self {
        let mut columns: HashMap<FieldKey, usize> = mapping.iter().collect();

        // 映射缺失的字段使用备用词表
        for field in OPTIONAL_FIELDS {
            if columns.contains_key(&field) {
                continue;
            }
            let fallback = rule_for(field)
                .filter(|rule| !rule.fallback_terms.is_empty())
                .and_then(|rule| find_column_index(headers, rule.fallback_terms));
            if let Some(idx) = fallback {
                columns.insert(field, idx);
            }
        }

        match repair_total_co2e_column(headers, columns.get(&FieldKey::TotalCo2e).copied()) {
            Some(idx) => columns.insert(FieldKey::TotalCo2e, idx),
            None => columns.remove(&FieldKey::TotalCo2e),
        };

        Self { columns }
    }

    fn cell<'r>(&self, row: &'r SheetRow, field: FieldKey) -> Option<&'r CellValue> {
        self.columns.get(&field).map(|idx| row.cell(*idx))
    }
}

/// 可通过备用词表定位的字段
const OPTIONAL_FIELDS: [FieldKey; 14] = [
    FieldKey::NotationKey,
    FieldKey::Explanation,
    FieldKey::Year,
    FieldKey::ActivityType,
    FieldKey::ActivityAmount,
    FieldKey::ActivityUnit,
    FieldKey::Methodology,
    FieldKey::DataSource,
    FieldKey::DataQuality,
    FieldKey::EmissionFactorCo2,
    FieldKey::EmissionFactorCh4,
    FieldKey::EmissionFactorN2o,
    FieldKey::EmissionFactorTotal,
    FieldKey::EmissionFactorUnit,
];

// ==========================================
// RowExtractor
// ==========================================
pub struct RowExtractor<T>
where
    T: TaxonomyRepository,
{
    taxonomy: Arc<T>,
    translations: Arc<TranslationLookup>,
    cleaner: DataCleaner,
    year_min: i32,
    year_max: i32,
}

impl<T> RowExtractor<T>
where
    T: TaxonomyRepository,
{
    pub fn new(taxonomy: Arc<T>, translations: Arc<TranslationLookup>) -> Self {
        Self {
            taxonomy,
            translations,
            cleaner: DataCleaner,
            year_min: DEFAULT_YEAR_MIN,
            year_max: DEFAULT_YEAR_MAX,
        }
    }

    /// 设置年份范围（两端均含）
    pub fn with_year_bounds(mut self, year_min: i32, year_max: i32) -> Self {
        self.year_min = year_min;
        self.year_max = year_max;
        self
    }

    /// 提取主数据表的全部行
    #[instrument(skip_all, fields(file_type = %parsed.file_type))]
    pub async fn extract(&self, parsed: &ParsedFileData, mapping: &ColumnMapping) -> EcrfImportResult {
        let mut result = EcrfImportResult::default();

        let Some(sheet) = parsed.primary_sheet() else {
            result.errors.push(t_with_args("validation.no_data_sheet", &[]));
            return result;
        };
        let Some(gpc_idx) = mapping.get(FieldKey::GpcRefNo) else {
            result.errors.push(t_with_args("extract.missing_gpc_column", &[]));
            return result;
        };

        let columns = ResolvedColumns::resolve(&sheet.headers, mapping);

        for (row_index, row) in sheet.rows.iter().enumerate() {
            let Some(gpc_ref) = self.cleaner.cell_text(row.cell(gpc_idx)) else {
                result.warnings.push(t_with_args(
                    "extract.missing_gpc_ref",
                    &[("row", (row_index + 2).to_string().as_str())],
                ));
                continue;
            };

            let imported = self.extract_row(row_index, gpc_ref, row, &columns).await;
            result.rows.push(imported);
        }

        result.row_count = result.rows.len();
        result.valid_row_count = result.rows.iter().filter(|r| r.is_valid()).count();
        result.inferred_year_from_file = result.rows.iter().find_map(|r| r.year);
        if result.valid_row_count == 0 {
            result.errors.push(t_with_args("extract.no_valid_rows", &[]));
        }

        tracing::info!(
            sheet = %sheet.name,
            rows = result.row_count,
            valid_rows = result.valid_row_count,
            warnings = result.warnings.len(),
            "rows extracted"
        );
        result
    }

    async fn extract_row(
        &self,
        row_index: usize,
        gpc_ref: String,
        row: &SheetRow,
        columns: &ResolvedColumns,
    ) -> ImportedRow {
        let mut imported = ImportedRow {
            row_index,
            ..Default::default()
        };

        // 分类引用
        match self.lookup_taxonomy(&gpc_ref).await {
            Ok(Some(entry)) if entry.is_complete() => {
                imported.sector_id = entry.sector_id;
                imported.sector_reference_number = entry.sector_reference_number;
                imported.sub_sector_id = entry.sub_sector_id;
                imported.sub_category_id = entry.sub_category_id;
                imported.scope_id = entry.scope_id;
            }
            Ok(_) => {
                imported.errors.push(t_with_args(
                    "extract.reference_not_found",
                    &[("gpc", gpc_ref.as_str())],
                ));
            }
            Err(e) => {
                tracing::warn!(gpc = %gpc_ref, error = %e, "taxonomy lookup failed");
                imported.errors.push(t_with_args(
                    "extract.taxonomy_lookup_failed",
                    &[("gpc", gpc_ref.as_str()), ("reason", e.to_string().as_str())],
                ));
            }
        }
        imported.gpc_reference_number = gpc_ref;

        // 气体数值
        imported.co2 = self.number(row, columns, FieldKey::Co2);
        imported.ch4 = self.number(row, columns, FieldKey::Ch4);
        imported.n2o = self.number(row, columns, FieldKey::N2o);
        imported.total_co2e = self.number(row, columns, FieldKey::TotalCo2e);

        // 注释键 / 说明 / 年份
        imported.notation_key = columns
            .cell(row, FieldKey::NotationKey)
            .and_then(|c| self.cleaner.clean_notation_key(c));
        imported.explanation = self.text(row, columns, FieldKey::Explanation);
        imported.year = columns
            .cell(row, FieldKey::Year)
            .and_then(|c| self.cleaner.parse_year(c, self.year_min, self.year_max));

        // 活动数据
        imported.activity = ActivityFields {
            activity_type: self.text(row, columns, FieldKey::ActivityType),
            activity_amount: self.number(row, columns, FieldKey::ActivityAmount),
            activity_unit: self
                .text(row, columns, FieldKey::ActivityUnit)
                .map(|unit| self.translations.canonicalize(&unit)),
            methodology: self.text(row, columns, FieldKey::Methodology),
            data_source: self.text(row, columns, FieldKey::DataSource),
            data_quality: self.text(row, columns, FieldKey::DataQuality),
        };

        // 排放因子
        imported.emission_factor = EmissionFactorFields {
            co2: self.number(row, columns, FieldKey::EmissionFactorCo2),
            ch4: self.number(row, columns, FieldKey::EmissionFactorCh4),
            n2o: self.number(row, columns, FieldKey::EmissionFactorN2o),
            total: self.number(row, columns, FieldKey::EmissionFactorTotal),
            unit: self.text(row, columns, FieldKey::EmissionFactorUnit),
        };

        if !imported.has_gas_values() && imported.notation_key.is_none() {
            imported
                .warnings
                .push(t_with_args("extract.no_gas_or_notation", &[]));
        }

        imported
    }

    /// 先查子类别，再查子部门
    async fn lookup_taxonomy(&self, gpc_ref: &str) -> RepositoryResult<Option<TaxonomyEntry>> {
        if let Some(entry) = self.taxonomy.find_subcategory_by_ref(gpc_ref).await? {
            return Ok(Some(entry));
        }
        self.taxonomy.find_subsector_by_ref(gpc_ref).await
    }

    fn number(&self, row: &SheetRow, columns: &ResolvedColumns, field: FieldKey) -> Option<f64> {
        columns
            .cell(row, field)
            .and_then(|c| self.cleaner.parse_number(c))
    }

    fn text(&self, row: &SheetRow, columns: &ResolvedColumns, field: FieldKey) -> Option<String> {
        columns.cell(row, field).and_then(|c| self.cleaner.cell_text(c))
    }
}
