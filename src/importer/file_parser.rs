// ==========================================
// CityCatalyst eCRF 导入 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx) / CSV (.csv)，均从内存字节读取
// 输出: ParsedFileData（全部工作表 + 主数据表下标）
// ==========================================

use crate::config::ImportSettings;
use crate::domain::ecrf::{CellValue, ParsedFileData, ParsedSheet, SheetRow};
use crate::domain::types::FileType;
use crate::importer::ecrf_importer_trait::FileParser;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use csv::ReaderBuilder;
use std::io::Cursor;

/// 空表头占位前缀
pub const EMPTY_HEADER_PREFIX: &str = "__EMPTY_";

/// CSV 唯一工作表名称
pub const CSV_SHEET_NAME: &str = "Sheet1";

/// 表头为空时生成占位名
fn header_name(raw: &str, col_idx: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        format!("{}{}", EMPTY_HEADER_PREFIX, col_idx)
    } else {
        trimmed.to_string()
    }
}

/// 是否为占位表头
pub fn is_placeholder_header(header: &str) -> bool {
    header.starts_with(EMPTY_HEADER_PREFIX)
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn file_type(&self) -> FileType {
        FileType::Csv
    }

    fn parse_sheets(&self, bytes: &[u8]) -> ImportResult<Vec<ParsedSheet>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(bytes);

        // 读取表头
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(idx, h)| header_name(h.trim_start_matches('\u{feff}'), idx))
            .collect();

        // 读取所有行
        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let cells: Vec<CellValue> = record
                .iter()
                .map(|value| {
                    if value.trim().is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(value.to_string())
                    }
                })
                .collect();

            let row = SheetRow::new(cells);
            // 跳过完全空白的行
            if row.is_blank() {
                continue;
            }
            rows.push(row);
        }

        tracing::debug!(rows = rows.len(), columns = headers.len(), "csv parsed");
        Ok(vec![ParsedSheet::new(CSV_SHEET_NAME, headers, rows)])
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    fn convert_cell(cell: &Data) -> CellValue {
        match cell {
            Data::Empty | Data::Error(_) => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Bool(*b),
            // 日期/时长等保持 calamine 的文本表示
            other => CellValue::Text(other.to_string()),
        }
    }
}

impl FileParser for ExcelParser {
    fn file_type(&self) -> FileType {
        FileType::Xlsx
    }

    fn parse_sheets(&self, bytes: &[u8]) -> ImportResult<Vec<ParsedSheet>> {
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;

        let mut sheets = Vec::new();
        for sheet_name in workbook.sheet_names() {
            let range = workbook.worksheet_range(&sheet_name)?;

            // 第一行为表头
            let mut range_rows = range.rows();
            let headers: Vec<String> = match range_rows.next() {
                Some(header_row) => header_row
                    .iter()
                    .enumerate()
                    .map(|(idx, cell)| header_name(&cell.to_string(), idx))
                    .collect(),
                None => {
                    sheets.push(ParsedSheet::new(sheet_name, Vec::new(), Vec::new()));
                    continue;
                }
            };

            let mut rows = Vec::new();
            for data_row in range_rows {
                let row = SheetRow::new(data_row.iter().map(Self::convert_cell).collect());
                // 跳过完全空白的行
                if row.is_blank() {
                    continue;
                }
                rows.push(row);
            }

            tracing::debug!(
                sheet = %sheet_name,
                rows = rows.len(),
                columns = headers.len(),
                "worksheet parsed"
            );
            sheets.push(ParsedSheet::new(sheet_name, headers, rows));
        }

        if sheets.is_empty() {
            return Err(ImportError::ExcelParseError("workbook has no worksheets".to_string()));
        }
        Ok(sheets)
    }
}

// ==========================================
// 主数据表选择
// ==========================================
// 顺序: 名称标识（按优先级，包含匹配）→ 首个有数据的表 → 首个表
pub fn select_primary_sheet(sheets: &[ParsedSheet], identifiers: &[String]) -> Option<usize> {
    if sheets.is_empty() {
        return None;
    }

    let names: Vec<String> = sheets.iter().map(|s| s.name.to_lowercase()).collect();
    for identifier in identifiers {
        let identifier = identifier.trim().to_lowercase();
        if identifier.is_empty() {
            continue;
        }
        if let Some(idx) = names.iter().position(|name| name.contains(&identifier)) {
            return Some(idx);
        }
    }

    sheets.iter().position(ParsedSheet::has_data).or(Some(0))
}

// ==========================================
// 通用文件解析器（根据文件类型选择）
// ==========================================
pub struct UniversalFileParser {
    primary_sheet_names: Vec<String>,
}

impl Default for UniversalFileParser {
    fn default() -> Self {
        Self::new(ImportSettings::default().primary_sheet_names)
    }
}

impl UniversalFileParser {
    pub fn new(primary_sheet_names: Vec<String>) -> Self {
        Self {
            primary_sheet_names,
        }
    }

    pub fn parse(&self, bytes: &[u8], file_type: FileType) -> ImportResult<ParsedFileData> {
        let sheets = match file_type {
            FileType::Csv => CsvParser.parse_sheets(bytes)?,
            FileType::Xlsx => ExcelParser.parse_sheets(bytes)?,
        };
        let primary_sheet = select_primary_sheet(&sheets, &self.primary_sheet_names);

        Ok(ParsedFileData {
            file_type,
            sheets,
            primary_sheet,
        })
    }
}

/// 使用默认主表标识解析文件
pub fn parse_file(bytes: &[u8], file_type: FileType) -> ImportResult<ParsedFileData> {
    UniversalFileParser::default().parse(bytes, file_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_parser_headers_and_rows() {
        let csv = "GPC ref. no.,Sector,,Scope\nI.1.1,Stationary Energy,x,1\n";
        let sheets = CsvParser.parse_sheets(csv.as_bytes()).unwrap();

        assert_eq!(sheets.len(), 1);
        let sheet = &sheets[0];
        assert_eq!(sheet.name, "Sheet1");
        assert_eq!(sheet.headers, vec!["GPC ref. no.", "Sector", "__EMPTY_2", "Scope"]);
        assert_eq!(sheet.row_count, 1);
        assert_eq!(sheet.rows[0].cell(0), &CellValue::Text("I.1.1".to_string()));
        assert_eq!(sheet.rows[0].cell(3), &CellValue::Text("1".to_string()));
    }

    #[test]
    fn test_csv_parser_skip_empty_rows() {
        let csv = "GPC ref. no.,CO2\nI.1.1,2.5\n,\nI.1.2,3.0\n";
        let sheets = CsvParser.parse_sheets(csv.as_bytes()).unwrap();

        // 应跳过空行
        assert_eq!(sheets[0].rows.len(), 2);
    }

    #[test]
    fn test_csv_parser_flexible_rows() {
        let csv = "a,b,c\n1\n1,2,3,4\n";
        let sheets = CsvParser.parse_sheets(csv.as_bytes()).unwrap();
        assert_eq!(sheets[0].rows.len(), 2);
        assert_eq!(sheets[0].rows[0].cell(2), &CellValue::Empty);
    }

    #[test]
    fn test_csv_parser_invalid_utf8_fails() {
        let bytes: &[u8] = b"a,b\n\xff\xfe,1\n";
        let result = CsvParser.parse_sheets(bytes);
        assert!(matches!(result, Err(ImportError::CsvParseError(_))));
    }

    #[test]
    fn test_excel_parser_rejects_garbage() {
        let result = ExcelParser.parse_sheets(b"definitely not a zip archive");
        assert!(matches!(result, Err(ImportError::ExcelParseError(_))));
    }

    #[test]
    fn test_excel_cell_conversion() {
        assert_eq!(ExcelParser::convert_cell(&Data::Float(12.5)), CellValue::Number(12.5));
        assert_eq!(ExcelParser::convert_cell(&Data::Int(2023)), CellValue::Number(2023.0));
        assert_eq!(ExcelParser::convert_cell(&Data::Bool(true)), CellValue::Bool(true));
        assert_eq!(ExcelParser::convert_cell(&Data::Empty), CellValue::Empty);
        assert_eq!(
            ExcelParser::convert_cell(&Data::String("NO".to_string())),
            CellValue::Text("NO".to_string())
        );
    }

    fn sheet(name: &str, rows: usize) -> ParsedSheet {
        let data = (0..rows)
            .map(|_| SheetRow::new(vec![CellValue::Text("x".to_string())]))
            .collect();
        ParsedSheet::new(name, vec!["h".to_string()], data)
    }

    #[test]
    fn test_select_primary_sheet_by_identifier_priority() {
        let sheets = vec![sheet("Cover", 3), sheet("Inventory data", 2), sheet("eCRF_3", 5)];
        let ids = vec!["ecrf".to_string(), "inventory".to_string()];
        assert_eq!(select_primary_sheet(&sheets, &ids), Some(2));
    }

    #[test]
    fn test_select_primary_sheet_fallbacks() {
        let sheets = vec![sheet("Cover", 0), sheet("Numbers", 4)];
        assert_eq!(select_primary_sheet(&sheets, &["ecrf".to_string()]), Some(1));

        let empty = vec![sheet("A", 0), sheet("B", 0)];
        assert_eq!(select_primary_sheet(&empty, &[]), Some(0));
        assert_eq!(select_primary_sheet(&[], &[]), None);
    }

    #[test]
    fn test_parse_file_csv() {
        let parsed = parse_file(b"GPC ref. no.\nI.1.1\n", FileType::Csv).unwrap();
        assert_eq!(parsed.file_type, FileType::Csv);
        assert_eq!(parsed.primary_sheet, Some(0));
        assert_eq!(parsed.primary_sheet().unwrap().row_count, 1);
    }
}
