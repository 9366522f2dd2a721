// ==========================================
// CityCatalyst eCRF 导入 - 导入 API
// ==========================================
// 职责: 组合 解析 → 校验 → 提取 → 导入，供 CLI / 上层调用
// 连接: 同一数据库连接由配置、分类、清单仓储共享
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportConfigReader, ImportSettings};
use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::ecrf::{EcrfImportResult, ImportSummary, ParsedFileData, UploadedFile, ValidationResult};
use crate::domain::inventory::{ActivityValue, Inventory, InventoryValue};
use crate::importer::{
    EcrfImporter, FileValidator, ImportError, InventoryImporter, RowExtractor, TranslationLookup,
    UniversalFileParser,
};
use crate::repository::{InventoryRepository, SqliteInventoryRepository, SqliteTaxonomyRepository};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// 提取 API 响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractApiResponse {
    pub validation: ValidationResult,
    pub extraction: EcrfImportResult,
}

/// 导入 API 响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportApiResponse {
    pub inventory_id: String,
    /// 校验警告（不阻断导入）
    pub validation_warnings: Vec<String>,
    /// 提取阶段的文件级警告
    pub extraction_warnings: Vec<String>,
    pub summary: ImportSummary,
    /// 导入耗时（毫秒）
    pub elapsed_ms: i64,
}

// 校验 + 提取的中间结果
struct PreparedFile {
    validation: ValidationResult,
    extraction: EcrfImportResult,
}

/// 导入 API
pub struct ImportApi {
    conn: Arc<Mutex<Connection>>,
    translations: Arc<TranslationLookup>,
}

impl ImportApi {
    /// 打开数据库并创建 ImportApi
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ApiResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| ApiError::DatabaseError(format!("failed to open {}: {}", db_path, e)))?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 复用已有连接（使用内置翻译表）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ApiResult<Self> {
        let translations = TranslationLookup::builtin()?;
        Ok(Self::with_translations(conn, Arc::new(translations)))
    }

    /// 复用已有连接并指定翻译表
    pub fn with_translations(
        conn: Arc<Mutex<Connection>>,
        translations: Arc<TranslationLookup>,
    ) -> Self {
        Self { conn, translations }
    }

    /// 建表（幂等）
    pub fn init_schema(&self) -> ApiResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ApiError::DatabaseError(format!("lock poisoned: {}", e)))?;
        init_schema(&conn).map_err(|e| ApiError::DatabaseError(e.to_string()))
    }

    /// 读取导入参数（config_kv 覆写 + 默认值）
    pub async fn load_settings(&self) -> ApiResult<ImportSettings> {
        let manager = ConfigManager::from_connection(self.conn.clone())
            .map_err(|e| ImportError::ConfigReadError(e.to_string()))?;
        let settings = manager
            .get_import_settings()
            .await
            .map_err(|e| ImportError::ConfigReadError(e.to_string()))?;
        Ok(settings)
    }

    /// 校验上传文件
    ///
    /// # 返回
    /// - Ok(ValidationResult): 校验结果（未通过也返回 Ok）
    pub async fn validate_file(&self, file: &UploadedFile) -> ApiResult<ValidationResult> {
        let settings = self.load_settings().await?;
        let parsed = Self::try_parse(file, &settings);
        Ok(FileValidator::new(settings).validate(file, parsed.as_ref()))
    }

    /// 校验并提取（不写库）
    ///
    /// # 返回
    /// - Err(ApiError::NotImportable): 校验未通过
    pub async fn extract_file(&self, file: &UploadedFile) -> ApiResult<ExtractApiResponse> {
        let prepared = self.prepare(file).await?;
        Ok(ExtractApiResponse {
            validation: prepared.validation,
            extraction: prepared.extraction,
        })
    }

    /// 校验、提取并导入指定清单
    ///
    /// # 返回
    /// - Err(ApiError::NotImportable): 校验或提取存在文件级错误
    /// - Err(ApiError::NotFound): 清单不存在
    pub async fn import_file(
        &self,
        file: &UploadedFile,
        inventory_id: &str,
    ) -> ApiResult<ImportApiResponse> {
        let start = Instant::now();
        let prepared = self.prepare(file).await?;
        if !prepared.extraction.is_importable() {
            return Err(ApiError::NotImportable(prepared.extraction.errors));
        }

        let importer = InventoryImporter::new(self.inventory_repo(), self.translations.clone());
        let summary = importer.import(inventory_id, &prepared.extraction).await?;

        Ok(ImportApiResponse {
            inventory_id: inventory_id.to_string(),
            validation_warnings: prepared.validation.warnings,
            extraction_warnings: prepared.extraction.warnings,
            summary,
            elapsed_ms: start.elapsed().as_millis() as i64,
        })
    }

    /// 创建清单
    pub async fn create_inventory(
        &self,
        inventory_id: &str,
        inventory_name: &str,
        city_name: &str,
        year: Option<i32>,
    ) -> ApiResult<Inventory> {
        if inventory_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("inventory id must not be empty".to_string()));
        }
        let inventory = Inventory {
            inventory_id: inventory_id.trim().to_string(),
            inventory_name: inventory_name.to_string(),
            city_name: city_name.to_string(),
            year,
        };
        self.inventory_repo().create_inventory(&inventory).await?;
        tracing::info!(inventory_id = %inventory.inventory_id, "inventory created");
        Ok(inventory)
    }

    /// 查询清单
    pub async fn get_inventory(&self, inventory_id: &str) -> ApiResult<Inventory> {
        self.inventory_repo()
            .find_inventory(inventory_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("inventory {}", inventory_id)))
    }

    /// 列出清单值
    pub async fn list_inventory_values(&self, inventory_id: &str) -> ApiResult<Vec<InventoryValue>> {
        Ok(self.inventory_repo().list_inventory_values(inventory_id).await?)
    }

    /// 列出清单值的活动值
    pub async fn list_activity_values(&self, inventory_value_id: &str) -> ApiResult<Vec<ActivityValue>> {
        Ok(self
            .inventory_repo()
            .list_activity_values(inventory_value_id)
            .await?)
    }

    // ==========================================
    // 内部
    // ==========================================

    fn inventory_repo(&self) -> Arc<SqliteInventoryRepository> {
        Arc::new(SqliteInventoryRepository::from_connection(self.conn.clone()))
    }

    // 大小合格时才在此解析；解析失败交由校验器报告
    fn try_parse(file: &UploadedFile, settings: &ImportSettings) -> Option<ParsedFileData> {
        if file.size() == 0 || file.size() > settings.max_file_size_bytes {
            return None;
        }
        let file_type = file.file_type()?;
        UniversalFileParser::new(settings.primary_sheet_names.clone())
            .parse(&file.bytes, file_type)
            .ok()
    }

    async fn prepare(&self, file: &UploadedFile) -> ApiResult<PreparedFile> {
        let settings = self.load_settings().await?;
        let (year_min, year_max) = (settings.year_min, settings.year_max);

        let parsed = Self::try_parse(file, &settings);
        let validation = FileValidator::new(settings).validate(file, parsed.as_ref());
        if !validation.is_valid {
            return Err(ApiError::NotImportable(validation.errors));
        }
        let parsed = parsed.ok_or_else(|| {
            ApiError::InternalError(format!("{} validated without parsed content", file.name))
        })?;

        let taxonomy = Arc::new(SqliteTaxonomyRepository::from_connection(self.conn.clone()));
        let extractor = RowExtractor::new(taxonomy, self.translations.clone())
            .with_year_bounds(year_min, year_max);
        let extraction = extractor.extract(&parsed, &validation.detected_columns).await;

        Ok(PreparedFile {
            validation,
            extraction,
        })
    }
}
