// ==========================================
// CityCatalyst eCRF 导入 - 领域类型定义
// ==========================================
// 依据: GPC (Global Protocol for Community-scale) 清单框架
// 依据: eCRF 模板列定义
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 文件类型 (File Type)
// ==========================================
// 仅接受 xlsx / csv 两种
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Xlsx,
    Csv,
}

impl FileType {
    /// 按扩展名识别（大小写不敏感）
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().trim_start_matches('.').to_lowercase().as_str() {
            "xlsx" => Some(FileType::Xlsx),
            "csv" => Some(FileType::Csv),
            _ => None,
        }
    }

    /// 按文件名识别（取最后一个 `.` 之后的部分）
    pub fn from_file_name(name: &str) -> Option<Self> {
        file_extension(name).and_then(|ext| Self::from_extension(&ext))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Xlsx => "xlsx",
            FileType::Csv => "csv",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 提取文件扩展名（小写，不含点）
pub fn file_extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

// ==========================================
// 注释键 (Notation Key)
// ==========================================
// 无排放数值时用于说明数据缺失原因
// 序列化值与清单存储中的 unavailable_reason 一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotationKey {
    #[serde(rename = "no-occurrance")]
    NoOccurrence, // NO
    #[serde(rename = "not-estimated")]
    NotEstimated, // NE
    #[serde(rename = "confidential-information")]
    Confidential, // C
    #[serde(rename = "included-elsewhere")]
    IncludedElsewhere, // IE
}

impl NotationKey {
    /// 解析注释键缩写（大小写不敏感），未知值返回 None
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "NO" => Some(NotationKey::NoOccurrence),
            "NE" => Some(NotationKey::NotEstimated),
            "C" => Some(NotationKey::Confidential),
            "IE" => Some(NotationKey::IncludedElsewhere),
            _ => None,
        }
    }

    /// 存储用的 unavailable_reason 值
    pub fn reason(&self) -> &'static str {
        match self {
            // 拼写与既有数据保持一致
            NotationKey::NoOccurrence => "no-occurrance",
            NotationKey::NotEstimated => "not-estimated",
            NotationKey::Confidential => "confidential-information",
            NotationKey::IncludedElsewhere => "included-elsewhere",
        }
    }
}

impl fmt::Display for NotationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason())
    }
}

// ==========================================
// 逻辑字段键 (Field Key)
// ==========================================
// 列检测的目标字段，序列化为 camelCase 键
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldKey {
    #[serde(rename = "gpcRefNo")]
    GpcRefNo,
    #[serde(rename = "sector")]
    Sector,
    #[serde(rename = "subSector")]
    SubSector,
    #[serde(rename = "subCategory")]
    SubCategory,
    #[serde(rename = "scope")]
    Scope,
    #[serde(rename = "co2")]
    Co2,
    #[serde(rename = "ch4")]
    Ch4,
    #[serde(rename = "n2o")]
    N2o,
    #[serde(rename = "totalCO2e")]
    TotalCo2e,
    #[serde(rename = "notationKey")]
    NotationKey,
    #[serde(rename = "explanation")]
    Explanation,
    #[serde(rename = "year")]
    Year,
    #[serde(rename = "activityType")]
    ActivityType,
    #[serde(rename = "activityAmount")]
    ActivityAmount,
    #[serde(rename = "activityUnit")]
    ActivityUnit,
    #[serde(rename = "methodology")]
    Methodology,
    #[serde(rename = "dataSource")]
    DataSource,
    #[serde(rename = "dataQuality")]
    DataQuality,
    #[serde(rename = "emissionFactorCO2")]
    EmissionFactorCo2,
    #[serde(rename = "emissionFactorCH4")]
    EmissionFactorCh4,
    #[serde(rename = "emissionFactorN2O")]
    EmissionFactorN2o,
    #[serde(rename = "emissionFactorTotal")]
    EmissionFactorTotal,
    #[serde(rename = "emissionFactorUnit")]
    EmissionFactorUnit,
}

impl FieldKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::GpcRefNo => "gpcRefNo",
            FieldKey::Sector => "sector",
            FieldKey::SubSector => "subSector",
            FieldKey::SubCategory => "subCategory",
            FieldKey::Scope => "scope",
            FieldKey::Co2 => "co2",
            FieldKey::Ch4 => "ch4",
            FieldKey::N2o => "n2o",
            FieldKey::TotalCo2e => "totalCO2e",
            FieldKey::NotationKey => "notationKey",
            FieldKey::Explanation => "explanation",
            FieldKey::Year => "year",
            FieldKey::ActivityType => "activityType",
            FieldKey::ActivityAmount => "activityAmount",
            FieldKey::ActivityUnit => "activityUnit",
            FieldKey::Methodology => "methodology",
            FieldKey::DataSource => "dataSource",
            FieldKey::DataQuality => "dataQuality",
            FieldKey::EmissionFactorCo2 => "emissionFactorCO2",
            FieldKey::EmissionFactorCh4 => "emissionFactorCH4",
            FieldKey::EmissionFactorN2o => "emissionFactorN2O",
            FieldKey::EmissionFactorTotal => "emissionFactorTotal",
            FieldKey::EmissionFactorUnit => "emissionFactorUnit",
        }
    }

    /// 必填列（缺失即结构性错误）
    pub const REQUIRED: [FieldKey; 4] = [
        FieldKey::GpcRefNo,
        FieldKey::Sector,
        FieldKey::SubSector,
        FieldKey::Scope,
    ];

    /// 气体数值列（至少需要一列）
    pub const GAS_VALUES: [FieldKey; 4] = [
        FieldKey::Co2,
        FieldKey::Ch4,
        FieldKey::N2o,
        FieldKey::TotalCo2e,
    ];
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
