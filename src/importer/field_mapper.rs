// ==========================================
// CityCatalyst eCRF 导入 - 字段映射规则表
// ==========================================
// 职责: 逻辑字段 → 候选表头词（按优先级）
// 说明: 词表均为小写；检测时表头同样转小写
// ==========================================

use crate::domain::types::FieldKey;

// ==========================================
// 表头排除规则
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderExclusion {
    None,
    /// 子串匹配时跳过含 "emission factor" 但不含 "ghgs" 的表头
    EmissionFactorUnlessGhgs,
}

impl HeaderExclusion {
    /// 参数为已转小写的表头
    pub fn excludes(&self, header: &str) -> bool {
        match self {
            HeaderExclusion::None => false,
            HeaderExclusion::EmissionFactorUnlessGhgs => {
                header.contains("emission factor") && !header.contains("ghgs")
            }
        }
    }
}

// ==========================================
// ColumnRule - 单字段的列检测规则
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct ColumnRule {
    pub field: FieldKey,
    /// 错误消息中展示的列名
    pub label: &'static str,
    /// 列检测词表（按优先级）
    pub terms: &'static [&'static str],
    /// 行提取时映射缺失才使用的备用词表
    pub fallback_terms: &'static [&'static str],
    pub exclusion: HeaderExclusion,
}

const fn rule(
    field: FieldKey,
    label: &'static str,
    terms: &'static [&'static str],
    fallback_terms: &'static [&'static str],
) -> ColumnRule {
    ColumnRule {
        field,
        label,
        terms,
        fallback_terms,
        exclusion: HeaderExclusion::None,
    }
}

/// eCRF 列检测规则（顺序即 detect_columns 的执行顺序）
pub const COLUMN_RULES: &[ColumnRule] = &[
    // ===== 必填列 =====
    rule(
        FieldKey::GpcRefNo,
        "GPC ref. no.",
        &[
            "gpc ref. no.",
            "gpc ref no",
            "gpc reference number",
            "gpc ref",
            "gpc reference",
            "reference number",
        ],
        &[],
    ),
    rule(FieldKey::Sector, "Sector", &["sector"], &[]),
    rule(
        FieldKey::SubSector,
        "Sub-sector",
        &["sub-sector", "subsector", "sub sector"],
        &[],
    ),
    rule(
        FieldKey::SubCategory,
        "Sub-category",
        &["sub-category", "subcategory", "sub category"],
        &[],
    ),
    rule(FieldKey::Scope, "Scope", &["scope"], &[]),
    // ===== 气体数值（公吨 CO2e）=====
    rule(
        FieldKey::Co2,
        "CO2",
        &["co2", "ghgs (metric tonnes co2e) - co2", "carbon dioxide"],
        &[],
    ),
    rule(
        FieldKey::Ch4,
        "CH4",
        &["ch4", "ghgs (metric tonnes co2e) - ch4", "methane"],
        &[],
    ),
    rule(
        FieldKey::N2o,
        "N2O",
        &["n2o", "ghgs (metric tonnes co2e) - n2o", "nitrous oxide"],
        &[],
    ),
    ColumnRule {
        field: FieldKey::TotalCo2e,
        label: "Total CO2e",
        terms: &[
            "total co2e",
            "ghgs (metric tonnes co2e) - total co2e",
            "total ghg emissions",
            "total emissions",
            "co2 equivalent",
        ],
        fallback_terms: &[],
        exclusion: HeaderExclusion::EmissionFactorUnlessGhgs,
    },
    // ===== 注释键 / 年份 =====
    rule(
        FieldKey::NotationKey,
        "Notation key",
        &["notation key", "notation keys", "notation"],
        &[],
    ),
    rule(
        FieldKey::Explanation,
        "Explanation",
        &["explanation", "explanations"],
        &["comments", "comment", "remarks"],
    ),
    rule(
        FieldKey::Year,
        "Year",
        &["year", "inventory year", "reporting year"],
        &[],
    ),
    // ===== 活动数据 =====
    rule(
        FieldKey::ActivityType,
        "Activity type",
        &["activity type", "type of activity", "activity data - type"],
        &["fuel type", "type"],
    ),
    rule(
        FieldKey::ActivityAmount,
        "Activity amount",
        &[
            "activity amount",
            "activity data - amount",
            "activity data amount",
            "activity value",
        ],
        &["amount", "quantity", "consumption"],
    ),
    rule(
        FieldKey::ActivityUnit,
        "Activity unit",
        &["activity unit", "activity data - unit", "unit of activity"],
        &["units", "unit"],
    ),
    rule(
        FieldKey::Methodology,
        "Methodology",
        &["methodology", "calculation methodology", "methodology used"],
        &["method", "approach"],
    ),
    rule(
        FieldKey::DataSource,
        "Data source",
        &["data source", "source of data"],
        &["source"],
    ),
    rule(
        FieldKey::DataQuality,
        "Data quality",
        &["data quality", "quality of data"],
        &["quality"],
    ),
    // ===== 排放因子 =====
    rule(
        FieldKey::EmissionFactorCo2,
        "Emission factor CO2",
        &["emission factor - co2", "emission factor co2", "co2 emission factor"],
        &["ef co2", "ef - co2"],
    ),
    rule(
        FieldKey::EmissionFactorCh4,
        "Emission factor CH4",
        &["emission factor - ch4", "emission factor ch4", "ch4 emission factor"],
        &["ef ch4", "ef - ch4"],
    ),
    rule(
        FieldKey::EmissionFactorN2o,
        "Emission factor N2O",
        &["emission factor - n2o", "emission factor n2o", "n2o emission factor"],
        &["ef n2o", "ef - n2o"],
    ),
    rule(
        FieldKey::EmissionFactorTotal,
        "Emission factor total CO2e",
        &[
            "emission factor - total co2e",
            "emission factor total co2e",
            "emission factor total",
        ],
        &["ef total", "ef - total co2e"],
    ),
    rule(
        FieldKey::EmissionFactorUnit,
        "Emission factor unit",
        &["emission factor unit", "emission factor - unit", "unit of emission factor"],
        &["ef unit", "ef - unit"],
    ),
];

/// 按字段取规则
pub fn rule_for(field: FieldKey) -> Option<&'static ColumnRule> {
    COLUMN_RULES.iter().find(|r| r.field == field)
}
