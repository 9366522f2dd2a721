// ==========================================
// CityCatalyst eCRF 导入 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;

/// 默认文件大小上限: 20 MiB
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 20 * 1024 * 1024;

/// 默认年份下限（含）
pub const DEFAULT_YEAR_MIN: i32 = 1900;

/// 默认年份上限（含）
pub const DEFAULT_YEAR_MAX: i32 = 2100;

// ==========================================
// ImportSettings - 导入参数快照
// ==========================================
// 每次导入开始时读取一次，之后按值传入各组件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSettings {
    /// 文件大小上限（字节，含）
    pub max_file_size_bytes: u64,
    /// 可接受的扩展名（小写，不含点）
    pub accepted_extensions: Vec<String>,
    /// 主数据表名称标识（按优先级，大小写不敏感包含匹配）
    pub primary_sheet_names: Vec<String>,
    /// 清单年份下限（含）
    pub year_min: i32,
    /// 清单年份上限（含）
    pub year_max: i32,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            accepted_extensions: vec!["xlsx".to_string(), "csv".to_string()],
            primary_sheet_names: vec![
                "ecrf".to_string(),
                "emissions".to_string(),
                "inventory".to_string(),
                "data".to_string(),
            ],
            year_min: DEFAULT_YEAR_MIN,
            year_max: DEFAULT_YEAR_MAX,
        }
    }
}

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入模块所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 获取文件大小上限（字节）
    ///
    /// # 默认值
    /// - 20 MiB
    async fn get_max_file_size_bytes(&self) -> Result<u64, Box<dyn Error>>;

    /// 获取可接受的扩展名列表
    ///
    /// # 默认值
    /// - ["xlsx", "csv"]
    async fn get_accepted_extensions(&self) -> Result<Vec<String>, Box<dyn Error>>;

    /// 获取主数据表名称标识
    ///
    /// # 默认值
    /// - ["ecrf", "emissions", "inventory", "data"]
    async fn get_primary_sheet_names(&self) -> Result<Vec<String>, Box<dyn Error>>;

    /// 获取清单年份范围 (min, max)，两端均含
    ///
    /// # 默认值
    /// - (1900, 2100)
    async fn get_year_bounds(&self) -> Result<(i32, i32), Box<dyn Error>>;

    /// 一次性读取全部导入参数
    async fn get_import_settings(&self) -> Result<ImportSettings, Box<dyn Error>> {
        let max_file_size_bytes = self.get_max_file_size_bytes().await?;
        let accepted_extensions = self.get_accepted_extensions().await?;
        let primary_sheet_names = self.get_primary_sheet_names().await?;
        let (year_min, year_max) = self.get_year_bounds().await?;

        Ok(ImportSettings {
            max_file_size_bytes,
            accepted_extensions,
            primary_sheet_names,
            year_min,
            year_max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = ImportSettings::default();
        assert_eq!(settings.max_file_size_bytes, 20_971_520);
        assert_eq!(settings.accepted_extensions, vec!["xlsx", "csv"]);
        assert_eq!((settings.year_min, settings.year_max), (1900, 2100));
    }
}
