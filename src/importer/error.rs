// ==========================================
// CityCatalyst eCRF 导入 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 行级问题以字符串记录在结果中，不走此类型；
//       此处只覆盖致命错误（解析失败、清单不存在、存储失败）
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("unsupported file format: {0} (only .xlsx/.csv are accepted)")]
    UnsupportedFormat(String),

    #[error("failed to read file: {0}")]
    FileReadError(String),

    #[error("failed to parse Excel file: {0}")]
    ExcelParseError(String),

    #[error("failed to parse CSV file: {0}")]
    CsvParseError(String),

    // ===== 清单相关错误 =====
    #[error("inventory not found: {0}")]
    InventoryNotFound(String),

    #[error("file is not importable: {}", .0.join("; "))]
    NotImportable(Vec<String>),

    // ===== 存储错误 =====
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    // ===== 配置错误 =====
    #[error("failed to read configuration: {0}")]
    ConfigReadError(String),

    // ===== 通用错误 =====
    #[error("internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::XlsxError>
impl From<calamine::XlsxError> for ImportError {
    fn from(err: calamine::XlsxError) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::InternalError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
