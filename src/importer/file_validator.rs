// ==========================================
// CityCatalyst eCRF 导入 - 文件校验器
// ==========================================
// 检查顺序:
//   1. 扩展名
//   2. 文件大小
//   3. 结构（主数据表、必填列、气体数值列）
// 列检测结果无论成败都写入 detected_columns
// ==========================================

use crate::config::ImportSettings;
use crate::domain::ecrf::{ParsedFileData, UploadedFile, ValidationResult};
use crate::domain::types::{file_extension, FieldKey, FileType};
use crate::i18n::t_with_args;
use crate::importer::column_detector::detect_columns;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::ecrf_importer_trait::DataCleaner as _;
use crate::importer::error::ImportError;
use crate::importer::field_mapper::rule_for;
use crate::importer::file_parser::UniversalFileParser;
use std::borrow::Cow;

pub struct FileValidator {
    settings: ImportSettings,
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new(ImportSettings::default())
    }
}

impl FileValidator {
    pub fn new(settings: ImportSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// 校验上传文件
    ///
    /// # 参数
    /// - file: 上传文件
    /// - parsed: 已解析内容（None 时在此解析）
    pub fn validate(&self, file: &UploadedFile, parsed: Option<&ParsedFileData>) -> ValidationResult {
        let mut result = ValidationResult {
            file_type: file.file_type(),
            file_size: file.size(),
            ..Default::default()
        };

        self.check_extension(file, &mut result);
        self.check_size(file, &mut result);

        if result.errors.is_empty() {
            match self.resolve_parsed(file, parsed) {
                Ok(data) => self.check_structure(&data, &mut result),
                Err(e) => {
                    tracing::warn!(file = %file.name, error = %e, "file parse failed during validation");
                    result.errors.push(t_with_args(
                        "validation.parse_failed",
                        &[("reason", e.to_string().as_str())],
                    ));
                }
            }
        }

        result.is_valid = result.errors.is_empty();
        tracing::info!(
            file = %file.name,
            is_valid = result.is_valid,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "file validated"
        );
        result
    }

    // ===== 1. 扩展名 =====
    fn check_extension(&self, file: &UploadedFile, result: &mut ValidationResult) {
        let ext = file_extension(&file.name).unwrap_or_default();
        if !self.settings.accepted_extensions.iter().any(|a| *a == ext) {
            result.errors.push(t_with_args(
                "validation.unsupported_extension",
                &[
                    ("ext", ext.as_str()),
                    ("accepted", self.settings.accepted_extensions.join(", ").as_str()),
                ],
            ));
        }
    }

    // ===== 2. 文件大小 =====
    fn check_size(&self, file: &UploadedFile, result: &mut ValidationResult) {
        let size = file.size();
        if size == 0 {
            result.errors.push(t_with_args("validation.empty_file", &[]));
        } else if size > self.settings.max_file_size_bytes {
            result.errors.push(t_with_args(
                "validation.file_too_large",
                &[
                    ("size", size.to_string().as_str()),
                    ("max", self.settings.max_file_size_bytes.to_string().as_str()),
                ],
            ));
        }
    }

    fn resolve_parsed<'a>(
        &self,
        file: &UploadedFile,
        parsed: Option<&'a ParsedFileData>,
    ) -> Result<Cow<'a, ParsedFileData>, ImportError> {
        if let Some(data) = parsed {
            return Ok(Cow::Borrowed(data));
        }
        let file_type: FileType = file
            .file_type()
            .ok_or_else(|| ImportError::UnsupportedFormat(file.name.clone()))?;
        let parser = UniversalFileParser::new(self.settings.primary_sheet_names.clone());
        Ok(Cow::Owned(parser.parse(&file.bytes, file_type)?))
    }

    // ===== 3. 结构 =====
    fn check_structure(&self, parsed: &ParsedFileData, result: &mut ValidationResult) {
        let Some(sheet) = parsed.primary_sheet() else {
            result.errors.push(t_with_args("validation.no_data_sheet", &[]));
            return;
        };

        // 4. 机会性列检测
        result.detected_columns = detect_columns(&sheet.headers);

        if !sheet.has_data() {
            result
                .errors
                .push(t_with_args("validation.no_data_rows", &[("sheet", sheet.name.as_str())]));
            return;
        }

        for field in FieldKey::REQUIRED {
            if !result.detected_columns.contains(field) {
                let label = rule_for(field).map(|r| r.label).unwrap_or(field.as_str());
                result.errors.push(t_with_args(
                    "validation.missing_required_column",
                    &[("column", label)],
                ));
            }
        }

        let gas_columns: Vec<usize> = FieldKey::GAS_VALUES
            .iter()
            .filter_map(|field| result.detected_columns.get(*field))
            .collect();
        if gas_columns.is_empty() {
            result.errors.push(t_with_args("validation.no_gas_columns", &[]));
            return;
        }

        let cleaner = DataCleaner;
        let has_numeric = sheet.rows.iter().any(|row| {
            gas_columns
                .iter()
                .any(|idx| cleaner.parse_number(row.cell(*idx)).is_some())
        });
        if !has_numeric {
            result
                .warnings
                .push(t_with_args("validation.no_numeric_gas_values", &[]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "GPC ref. no.,Sector,Sub-sector,Scope,GHGs (metric tonnes CO2e) - CO2";

    fn csv_file(name: &str, body: &str) -> UploadedFile {
        UploadedFile::new(name, body.as_bytes().to_vec())
    }

    #[test]
    fn test_valid_csv() {
        let file = csv_file(
            "ecrf.csv",
            &format!("{}\nI.1.1,Stationary Energy,Residential,1,12.5\n", HEADER),
        );
        let result = FileValidator::default().validate(&file, None);

        assert!(result.is_valid, "{:?}", result.errors);
        assert!(result.warnings.is_empty());
        assert_eq!(result.file_type, Some(FileType::Csv));
        assert_eq!(result.detected_columns.get(FieldKey::Co2), Some(4));
    }

    #[test]
    fn test_rejects_extension() {
        let file = csv_file("ecrf.xls", "a,b\n1,2\n");
        let result = FileValidator::default().validate(&file, None);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("xls"));
        assert_eq!(result.file_type, None);
    }

    #[test]
    fn test_rejects_empty_and_oversized() {
        let validator = FileValidator::default();
        let empty = validator.validate(&csv_file("e.csv", ""), None);
        assert!(!empty.is_valid);
        assert_eq!(empty.errors.len(), 1);

        let settings = ImportSettings {
            max_file_size_bytes: 10,
            ..Default::default()
        };
        let big = FileValidator::new(settings).validate(&csv_file("b.csv", HEADER), None);
        assert!(!big.is_valid);
        assert!(big.errors[0].contains("10"));
        // 大小不合格时不做结构检查
        assert!(big.detected_columns.is_empty());
    }

    #[test]
    fn test_size_limit_is_inclusive() {
        let body = format!("{}\nI.1.1,S,SS,1,1\n", HEADER);
        let settings = ImportSettings {
            max_file_size_bytes: body.len() as u64,
            ..Default::default()
        };
        let result = FileValidator::new(settings).validate(&csv_file("ok.csv", &body), None);
        assert!(result.is_valid, "{:?}", result.errors);
    }

    #[test]
    fn test_missing_required_columns_one_error_each() {
        let file = csv_file("x.csv", "GPC ref. no.,CO2\nI.1.1,1\n");
        let result = FileValidator::default().validate(&file, None);

        assert!(!result.is_valid);
        // Sector / Sub-sector / Scope
        assert_eq!(result.errors.len(), 3);
        assert!(result.errors.iter().any(|e| e.contains("Sub-sector")));
    }

    #[test]
    fn test_no_gas_columns_single_error() {
        let file = csv_file("x.csv", "GPC ref. no.,Sector,Sub-sector,Scope\nI.1.1,S,SS,1\n");
        let result = FileValidator::default().validate(&file, None);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_gas_columns_without_numbers_warns() {
        let file = csv_file("x.csv", &format!("{}\nI.1.1,S,SS,1,NO\n", HEADER));
        let result = FileValidator::default().validate(&file, None);
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_header_only_file_has_no_data_rows() {
        let file = csv_file("x.csv", &format!("{}\n", HEADER));
        let result = FileValidator::default().validate(&file, None);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        // 仍然记录检测到的列
        assert_eq!(result.detected_columns.get(FieldKey::GpcRefNo), Some(0));
    }

    #[test]
    fn test_malformed_xlsx_is_error() {
        let file = UploadedFile::new("broken.xlsx", b"not a zip".to_vec());
        let result = FileValidator::default().validate(&file, None);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_uses_given_parsed_data() {
        let file = csv_file("x.csv", "ignored");
        let parsed = crate::importer::file_parser::parse_file(
            format!("{}\nI.1.1,S,SS,1,3\n", HEADER).as_bytes(),
            FileType::Csv,
        )
        .unwrap();
        let result = FileValidator::default().validate(&file, Some(&parsed));
        assert!(result.is_valid, "{:?}", result.errors);
    }
}
