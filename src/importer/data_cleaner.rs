// ==========================================
// CityCatalyst eCRF 导入 - 数据清洗器实现
// ==========================================
// 职责: TRIM / UPPER / NULL 标准化 / 数值与年份转换
// ==========================================

use crate::domain::ecrf::CellValue;
use crate::importer::ecrf_importer_trait::DataCleaner as DataCleanerTrait;

pub struct DataCleaner;

impl DataCleanerTrait for DataCleaner {
    fn clean_text(&self, value: &str, uppercase: bool) -> String {
        let trimmed = value.trim();
        if uppercase {
            trimmed.to_uppercase()
        } else {
            trimmed.to_string()
        }
    }

    fn normalize_null(&self, value: Option<String>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    fn cell_text(&self, cell: &CellValue) -> Option<String> {
        match cell {
            CellValue::Empty => None,
            other => self.normalize_null(Some(other.to_string())),
        }
    }

    fn parse_number(&self, cell: &CellValue) -> Option<f64> {
        let value = match cell {
            CellValue::Number(n) => *n,
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                if trimmed.contains(',') {
                    strip_thousands_separators(trimmed)?.parse::<f64>().ok()?
                } else {
                    trimmed.parse::<f64>().ok()?
                }
            }
            CellValue::Empty | CellValue::Bool(_) => return None,
        };

        if value.is_finite() {
            Some(value)
        } else {
            None
        }
    }

    fn parse_year(&self, cell: &CellValue, min: i32, max: i32) -> Option<i32> {
        let year = match cell {
            CellValue::Number(n) if n.is_finite() && n.fract() == 0.0 => {
                if *n < i32::MIN as f64 || *n > i32::MAX as f64 {
                    return None;
                }
                *n as i32
            }
            CellValue::Text(s) => s.trim().parse::<i32>().ok()?,
            _ => return None,
        };

        if (min..=max).contains(&year) {
            Some(year)
        } else {
            None
        }
    }
}

/// 去掉千分位分隔符
///
/// 仅接受 `1,234` / `-12,345,678.9` 这类三位分组；`1,5` 之类返回 None
fn strip_thousands_separators(value: &str) -> Option<String> {
    let (sign, unsigned) = match value.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", value.strip_prefix('+').unwrap_or(value)),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut groups = integer.split(',');
    let head = groups.next()?;
    if head.is_empty() || head.len() > 3 || !head.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut digits = head.to_string();
    for group in groups {
        if group.len() != 3 || !group.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        digits.push_str(group);
    }

    match fraction {
        Some(f) if f.is_empty() || !f.chars().all(|c| c.is_ascii_digit()) => None,
        Some(f) => Some(format!("{}{}.{}", sign, digits, f)),
        None => Some(format!("{}{}", sign, digits)),
    }
}

impl DataCleaner {
    /// 注释键: TRIM + UPPER，空值为 None
    pub fn clean_notation_key(&self, cell: &CellValue) -> Option<String> {
        self.cell_text(cell).map(|v| self.clean_text(&v, true))
    }
}
