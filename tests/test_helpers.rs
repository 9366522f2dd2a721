// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、GPC 分类种子数据、eCRF 测试文件生成
// ==========================================

#![allow(dead_code)]

use citycatalyst_ecrf::api::ImportApi;
use citycatalyst_ecrf::db::{init_schema, open_sqlite_connection};
use citycatalyst_ecrf::domain::UploadedFile;
use rusqlite::Connection;
use rust_xlsxwriter::Workbook;
use std::error::Error;
use tempfile::NamedTempFile;

/// 标准 eCRF 表头
pub const ECRF_HEADERS: &[&str] = &[
    "GPC ref. no.",
    "Sector",
    "Sub-sector",
    "Sub-category",
    "Scope",
    "GHGs (metric tonnes CO2e) - CO2",
    "GHGs (metric tonnes CO2e) - CH4",
    "GHGs (metric tonnes CO2e) - N2O",
    "GHGs (metric tonnes CO2e) - Total CO2e",
    "Notation key",
    "Explanation",
    "Year",
    "Activity type",
    "Activity amount",
    "Activity unit",
    "Methodology",
    "Data source",
    "Data quality",
    "Emission factor - CO2",
    "Emission factor - CH4",
    "Emission factor - N2O",
    "Emission factor - Total CO2e",
    "Emission factor unit",
];

/// 创建临时测试数据库，初始化 schema 并写入分类种子数据
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("temp path is not utf-8")?
        .to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;
    seed_taxonomy(&conn)?;

    Ok((temp_file, db_path))
}

/// 写入一组最小的 GPC 分类数据
///
/// 部门 I–III 带子类别；部门 IV–V 只有子部门
pub fn seed_taxonomy(conn: &Connection) -> Result<(), Box<dyn Error>> {
    conn.execute_batch(
        r#"
        INSERT INTO scope (scope_id, scope_name) VALUES
            ('scope-1', '1'), ('scope-2', '2'), ('scope-3', '3');

        INSERT INTO sector (sector_id, sector_name, reference_number) VALUES
            ('sector-i', 'Stationary Energy', 'I'),
            ('sector-ii', 'Transportation', 'II'),
            ('sector-iii', 'Waste', 'III'),
            ('sector-iv', 'IPPU', 'IV'),
            ('sector-v', 'AFOLU', 'V');

        INSERT INTO sub_sector (subsector_id, subsector_name, reference_number, sector_id, scope_id) VALUES
            ('ss-i-1', 'Residential buildings', 'I.1', 'sector-i', NULL),
            ('ss-i-2', 'Commercial buildings', 'I.2', 'sector-i', NULL),
            ('ss-ii-1', 'On-road', 'II.1', 'sector-ii', NULL),
            ('ss-iii-1', 'Solid waste', 'III.1', 'sector-iii', NULL),
            ('ss-iv-1', 'Industrial processes', 'IV.1', 'sector-iv', 'scope-1'),
            ('ss-v-1', 'Livestock', 'V.1', 'sector-v', 'scope-1');

        INSERT INTO sub_category (subcategory_id, subcategory_name, reference_number, subsector_id, scope_id) VALUES
            ('sc-i-1-1', 'Residential fuel combustion', 'I.1.1', 'ss-i-1', 'scope-1'),
            ('sc-i-1-2', 'Residential grid energy', 'I.1.2', 'ss-i-1', 'scope-2'),
            ('sc-i-2-1', 'Commercial fuel combustion', 'I.2.1', 'ss-i-2', 'scope-1'),
            ('sc-ii-1-1', 'On-road fuel combustion', 'II.1.1', 'ss-ii-1', 'scope-1'),
            ('sc-iii-1-1', 'Solid waste disposed in city', 'III.1.1', 'ss-iii-1', 'scope-1');
        "#,
    )?;
    Ok(())
}

/// 基于临时数据库创建 ImportApi
pub fn create_test_api(db_path: &str) -> Result<ImportApi, Box<dyn Error>> {
    Ok(ImportApi::new(db_path)?)
}

/// 创建临时数据库 + ImportApi + 一个无年份的清单
pub async fn setup_with_inventory(
    inventory_id: &str,
) -> Result<(NamedTempFile, ImportApi), Box<dyn Error>> {
    let (temp_file, db_path) = create_test_db()?;
    let api = create_test_api(&db_path)?;
    api.create_inventory(inventory_id, "Test inventory", "Test City", None)
        .await?;
    Ok((temp_file, api))
}

// 简写 → ECRF_HEADERS 下标
fn column_of(alias: &str) -> usize {
    match alias {
        "gpc" => 0,
        "sector" => 1,
        "sub_sector" => 2,
        "sub_category" => 3,
        "scope" => 4,
        "co2" => 5,
        "ch4" => 6,
        "n2o" => 7,
        "total" => 8,
        "notation" => 9,
        "explanation" => 10,
        "year" => 11,
        "activity_type" => 12,
        "activity_amount" => 13,
        "activity_unit" => 14,
        "methodology" => 15,
        "data_source" => 16,
        "data_quality" => 17,
        "ef_co2" => 18,
        "ef_ch4" => 19,
        "ef_n2o" => 20,
        "ef_total" => 21,
        "ef_unit" => 22,
        other => panic!("unknown column alias: {}", other),
    }
}

/// 按简写生成一行 CSV（未给出的列为空）
///
/// 例: ecrf_line(&[("gpc", "I.1.1"), ("co2", "12.5")])
pub fn ecrf_line(values: &[(&str, &str)]) -> String {
    let mut cells = vec![String::new(); ECRF_HEADERS.len()];
    for (alias, value) in values {
        cells[column_of(alias)] = value.to_string();
    }
    cells.join(",")
}

/// 按标准表头生成 CSV 文件（行内逗号分隔，列数可少于表头）
pub fn ecrf_csv(name: &str, rows: &[&str]) -> UploadedFile {
    let mut body = ECRF_HEADERS.join(",");
    body.push('\n');
    for row in rows {
        body.push_str(row);
        body.push('\n');
    }
    UploadedFile::new(name, body.into_bytes())
}

/// 单元格：数字或文本
pub enum Cell<'a> {
    Num(f64),
    Text(&'a str),
    Blank,
}

/// 生成 xlsx 文件（第一个工作表为说明页，第二个为数据页）
pub fn ecrf_xlsx(
    name: &str,
    data_sheet_name: &str,
    headers: &[&str],
    rows: &[Vec<Cell<'_>>],
) -> Result<UploadedFile, Box<dyn Error>> {
    let mut workbook = Workbook::new();

    let intro = workbook.add_worksheet();
    intro.set_name("Instructions")?;
    intro.write_string(0, 0, "Fill the data sheet")?;

    let sheet = workbook.add_worksheet();
    sheet.set_name(data_sheet_name)?;
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *header)?;
    }
    for (row_idx, row) in rows.iter().enumerate() {
        let excel_row = (row_idx + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            match cell {
                Cell::Num(n) => {
                    sheet.write_number(excel_row, col as u16, *n)?;
                }
                Cell::Text(s) => {
                    sheet.write_string(excel_row, col as u16, *s)?;
                }
                Cell::Blank => {}
            }
        }
    }

    Ok(UploadedFile::new(name, workbook.save_to_buffer()?))
}
