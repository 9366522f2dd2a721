// ==========================================
// CityCatalyst eCRF 导入 - 列检测器
// ==========================================
// 职责: 按候选词表在表头中定位语义列
// 算法: 三轮匹配
//   1. 精确匹配（大小写不敏感）
//   2. 子串匹配（表头包含候选词，长词优先）
//   3. 反向子串（候选词包含表头）
// ==========================================

use crate::domain::ecrf::ColumnMapping;
use crate::domain::types::FieldKey;
use crate::importer::field_mapper::{ColumnRule, HeaderExclusion, COLUMN_RULES};
use crate::importer::file_parser::is_placeholder_header;

/// 标准化表头；空表头与占位表头返回 None（永不匹配）
fn normalize_header(header: &str) -> Option<String> {
    let trimmed = header.trim();
    if trimmed.is_empty() || is_placeholder_header(trimmed) {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// 在表头中查找候选词对应的列下标
pub fn find_column_index(headers: &[String], terms: &[&str]) -> Option<usize> {
    find_column_index_with(headers, terms, HeaderExclusion::None)
}

/// 按列规则查找（使用规则的排除条件）
pub fn find_column(headers: &[String], rule: &ColumnRule) -> Option<usize> {
    find_column_index_with(headers, rule.terms, rule.exclusion)
}

fn find_column_index_with(
    headers: &[String],
    terms: &[&str],
    exclusion: HeaderExclusion,
) -> Option<usize> {
    let headers: Vec<Option<String>> = headers.iter().map(|h| normalize_header(h)).collect();
    let terms: Vec<String> = terms
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    if terms.is_empty() {
        return None;
    }

    // 第 1 轮: 精确匹配
    if let Some(idx) = headers
        .iter()
        .position(|h| matches!(h, Some(h) if terms.iter().any(|t| t == h)))
    {
        return Some(idx);
    }

    // 第 2 轮: 子串匹配，长词优先（稳定排序保持同长度词的优先级）
    let mut by_length: Vec<&String> = terms.iter().collect();
    by_length.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
    for term in by_length {
        for (idx, header) in headers.iter().enumerate() {
            let Some(header) = header else { continue };
            if exclusion.excludes(header) {
                continue;
            }
            if header.contains(term.as_str()) {
                return Some(idx);
            }
        }
    }

    // 第 3 轮: 反向子串
    headers
        .iter()
        .position(|h| matches!(h, Some(h) if terms.iter().any(|t| t.contains(h.as_str()))))
}

/// 按规则表检测全部列
pub fn detect_columns(headers: &[String]) -> ColumnMapping {
    let mut mapping = ColumnMapping::new();
    for rule in COLUMN_RULES {
        if let Some(idx) = find_column(headers, rule) {
            mapping.insert(rule.field, idx);
        }
    }

    // 总量列不得占用已分配给单一气体的列
    if let Some(total_idx) = mapping.get(FieldKey::TotalCo2e) {
        let claimed = FieldKey::GAS_VALUES
            .iter()
            .filter(|gas| **gas != FieldKey::TotalCo2e)
            .any(|gas| mapping.get(*gas) == Some(total_idx));
        if claimed {
            mapping.remove(FieldKey::TotalCo2e);
        }
    }

    tracing::debug!(detected = mapping.len(), headers = headers.len(), "columns detected");
    mapping
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_match_preferred_over_substring() {
        let h = headers(&["Sub-sector", "Sector"]);
        // "sector" 是 "sub-sector" 的子串，但精确匹配优先
        assert_eq!(find_column_index(&h, &["sector"]), Some(1));
    }

    #[test]
    fn test_exact_match_is_case_insensitive() {
        let h = headers(&["x", "  GPC REF. NO. "]);
        assert_eq!(find_column_index(&h, &["gpc ref. no."]), Some(1));
    }

    #[test]
    fn test_substring_prefers_longest_term() {
        let h = headers(&["Some co2e column", "Total CO2e (t)"]);
        assert_eq!(find_column_index(&h, &["co2e", "total co2e"]), Some(1));
    }

    #[test]
    fn test_substring_scans_headers_left_to_right() {
        let h = headers(&["CO2 a", "CO2 b"]);
        assert_eq!(find_column_index(&h, &["co2"]), Some(0));
    }

    #[test]
    fn test_reverse_substring_fallback() {
        let h = headers(&["Year", "Ref"]);
        assert_eq!(find_column_index(&h, &["gpc ref no"]), Some(1));
    }

    #[test]
    fn test_not_found_and_empty_headers() {
        let h = headers(&["", "   ", "__EMPTY_2"]);
        assert_eq!(find_column_index(&h, &["scope"]), None);
        assert_eq!(find_column_index(&headers(&["Scope"]), &[]), None);
    }

    #[test]
    fn test_total_co2e_skips_emission_factor_headers() {
        let h = headers(&[
            "Emission factor - Total CO2e",
            "GHGs (metric tonnes CO2e) - Total CO2e",
        ]);
        let rule = crate::importer::field_mapper::rule_for(FieldKey::TotalCo2e).unwrap();
        assert_eq!(find_column(&h, rule), Some(1));

        // 无排除条件时命中第一个
        assert_eq!(find_column_index(&h, &["total co2e"]), Some(0));
    }

    #[test]
    fn test_detect_columns_ecrf_headers() {
        let h = headers(&[
            "GPC ref. no.",
            "Sector",
            "Sub-sector",
            "Sub-category",
            "Scope",
            "Activity type",
            "Activity amount",
            "Activity unit",
            "Emission factor - CO2",
            "Emission factor - Total CO2e",
            "GHGs (metric tonnes CO2e) - CO2",
            "GHGs (metric tonnes CO2e) - CH4",
            "GHGs (metric tonnes CO2e) - N2O",
            "GHGs (metric tonnes CO2e) - Total CO2e",
            "Notation key",
            "Explanation",
        ]);
        let mapping = detect_columns(&h);

        assert_eq!(mapping.get(FieldKey::GpcRefNo), Some(0));
        assert_eq!(mapping.get(FieldKey::Sector), Some(1));
        assert_eq!(mapping.get(FieldKey::SubSector), Some(2));
        assert_eq!(mapping.get(FieldKey::SubCategory), Some(3));
        assert_eq!(mapping.get(FieldKey::Scope), Some(4));
        assert_eq!(mapping.get(FieldKey::ActivityAmount), Some(6));
        assert_eq!(mapping.get(FieldKey::EmissionFactorCo2), Some(8));
        assert_eq!(mapping.get(FieldKey::EmissionFactorTotal), Some(9));
        assert_eq!(mapping.get(FieldKey::Co2), Some(10));
        assert_eq!(mapping.get(FieldKey::Ch4), Some(11));
        assert_eq!(mapping.get(FieldKey::N2o), Some(12));
        assert_eq!(mapping.get(FieldKey::TotalCo2e), Some(13));
        assert_eq!(mapping.get(FieldKey::NotationKey), Some(14));
        assert_eq!(mapping.get(FieldKey::Explanation), Some(15));
    }

    #[test]
    fn test_total_co2e_not_mapped_onto_gas_column() {
        let h = headers(&["GPC ref. no.", "Sector", "Sub-sector", "Scope", "CO2", "CH4", "N2O"]);
        let mapping = detect_columns(&h);

        assert_eq!(mapping.get(FieldKey::Co2), Some(4));
        assert_eq!(mapping.get(FieldKey::Ch4), Some(5));
        assert_eq!(mapping.get(FieldKey::N2o), Some(6));
        assert_eq!(mapping.get(FieldKey::TotalCo2e), None);
    }
}
