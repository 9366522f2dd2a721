// ==========================================
// CityCatalyst eCRF 导入 - 清单导入器
// ==========================================
// 职责: ImportedRow → 清单值 / 活动值
// 规则:
//   - 有排放量（> 0）优先于注释键
//   - 同一 GPC 编号再次导入为更新，活动值整体替换
//   - 单行失败记为行错误，继续处理后续行（不回滚该行已写入部分）
// ==========================================

use crate::domain::ecrf::{EcrfImportResult, ImportSummary, ImportedRow};
use crate::domain::inventory::{ActivityValue, InventoryValue};
use crate::domain::types::NotationKey;
use crate::i18n::t_with_args;
use crate::importer::ecrf_importer_trait::EcrfImporter;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::methodology::{infer_methodology, schema_for};
use crate::importer::translation::TranslationLookup;
use crate::repository::inventory_repo::InventoryRepository;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// 行总排放量（公吨）: 显式总量 > 0 时直接使用，否则为各气体之和
pub fn total_co2e_tonnes(row: &ImportedRow) -> f64 {
    match row.total_co2e {
        Some(total) if total > 0.0 => total,
        _ => [row.co2, row.ch4, row.n2o].iter().flatten().sum(),
    }
}

/// 公吨 → 千克（四舍五入为整数）
pub fn tonnes_to_kg(tonnes: f64) -> i64 {
    (tonnes * 1000.0).round() as i64
}

// 单行处理结果
enum RowOutcome {
    Stored {
        created: bool,
        activity_values: usize,
    },
    Skipped(String),
}

// ==========================================
// InventoryImporter
// ==========================================
pub struct InventoryImporter<R>
where
    R: InventoryRepository,
{
    repo: Arc<R>,
    translations: Arc<TranslationLookup>,
}

impl<R> InventoryImporter<R>
where
    R: InventoryRepository,
{
    pub fn new(repo: Arc<R>, translations: Arc<TranslationLookup>) -> Self {
        Self { repo, translations }
    }

    fn row_message(row: &ImportedRow, message: &str) -> String {
        t_with_args(
            "import.row_message",
            &[
                ("row", row.row_number().to_string().as_str()),
                ("gpc", row.gpc_reference_number.as_str()),
                ("message", message),
            ],
        )
    }

    async fn import_row(
        &self,
        inventory_id: &str,
        row: &ImportedRow,
        pending_year: &mut Option<i32>,
    ) -> ImportResult<RowOutcome> {
        // 年份回填（整个导入只做一次）
        if let Some(year) = pending_year.take() {
            self.repo.update_inventory_year(inventory_id, year).await?;
            tracing::info!(inventory_id, year, "inventory year backfilled");
        }

        let existing = self
            .repo
            .find_inventory_value(inventory_id, &row.gpc_reference_number)
            .await?;
        let total_tonnes = total_co2e_tonnes(row);

        if total_tonnes > 0.0 {
            let co2eq = tonnes_to_kg(total_tonnes);
            let methodology =
                infer_methodology(row.activity.methodology.as_deref(), &row.gpc_reference_number);

            let mut value = self.prepare_value(inventory_id, row, existing.clone());
            value.co2eq = Some(co2eq);
            value.unavailable_reason = None;
            value.unavailable_explanation = None;
            value.input_methodology = methodology.clone();
            let created = self.save_value(&value, existing.is_some()).await?;

            let mut activity_values = 0;
            if row.activity.has_metadata() {
                let activity = self.build_activity_value(&value.id, row, methodology.as_deref(), co2eq);
                self.repo.insert_activity_value(&activity).await?;
                activity_values = 1;
            }
            return Ok(RowOutcome::Stored {
                created,
                activity_values,
            });
        }

        let Some(raw_key) = row.notation_key.as_deref() else {
            return Ok(RowOutcome::Skipped(t_with_args("import.no_emissions_or_notation", &[])));
        };
        let Some(notation) = NotationKey::parse(raw_key) else {
            return Ok(RowOutcome::Skipped(t_with_args(
                "import.unknown_notation_key",
                &[("key", raw_key)],
            )));
        };

        let mut value = self.prepare_value(inventory_id, row, existing.clone());
        value.co2eq = None;
        value.unavailable_reason = Some(notation.reason().to_string());
        value.unavailable_explanation = row.explanation.clone();
        let created = self.save_value(&value, existing.is_some()).await?;

        Ok(RowOutcome::Stored {
            created,
            activity_values: 0,
        })
    }

    /// 基于已有记录（或新建）填充分类引用
    fn prepare_value(
        &self,
        inventory_id: &str,
        row: &ImportedRow,
        existing: Option<InventoryValue>,
    ) -> InventoryValue {
        let now = Utc::now();
        let mut value = existing.unwrap_or_else(|| InventoryValue {
            id: Uuid::new_v4().to_string(),
            inventory_id: inventory_id.to_string(),
            gpc_reference_number: row.gpc_reference_number.clone(),
            sector_id: None,
            sub_sector_id: None,
            sub_category_id: None,
            co2eq: None,
            unavailable_reason: None,
            unavailable_explanation: None,
            input_methodology: None,
            created_at: now,
            updated_at: now,
        });
        value.sector_id = row.sector_id.clone();
        value.sub_sector_id = row.sub_sector_id.clone();
        value.sub_category_id = row.sub_category_id.clone();
        value.updated_at = now;
        value
    }

    /// 新建或更新；更新时清除旧活动值
    ///
    /// # 返回
    /// - Ok(true): 新建
    /// - Ok(false): 更新
    async fn save_value(&self, value: &InventoryValue, exists: bool) -> ImportResult<bool> {
        if exists {
            self.repo.update_inventory_value(value).await?;
            let removed = self.repo.delete_activity_values(&value.id).await?;
            tracing::debug!(gpc = %value.gpc_reference_number, removed, "inventory value updated");
            Ok(false)
        } else {
            self.repo.insert_inventory_value(value).await?;
            tracing::debug!(gpc = %value.gpc_reference_number, "inventory value created");
            Ok(true)
        }
    }

    /// 按方法学 schema 布局活动数据
    fn build_activity_value(
        &self,
        inventory_value_id: &str,
        row: &ImportedRow,
        methodology: Option<&str>,
        co2eq: i64,
    ) -> ActivityValue {
        let schema = methodology.map(schema_for).unwrap_or_else(|| schema_for(""));
        let activity = &row.activity;

        let (amount_key, unit_key) = match schema.activity_title {
            Some(title) => (title.to_string(), format!("{}-unit", title)),
            None => (
                "activity-amount".to_string(),
                "activity-amount-unit".to_string(),
            ),
        };
        let type_key = schema.type_field.unwrap_or("activity-type");

        let mut data = Map::new();
        if let Some(amount) = activity.activity_amount {
            data.insert(amount_key, Value::from(amount));
        }
        if let Some(unit) = activity.activity_unit.as_deref() {
            data.insert(unit_key, Value::from(self.translations.canonicalize(unit)));
        }
        if let Some(activity_type) = activity.activity_type.as_deref() {
            data.insert(
                type_key.to_string(),
                Value::from(self.translations.canonicalize(activity_type)),
            );
        }

        let factor = &row.emission_factor;
        let mut metadata = Map::new();
        let text_fields = [
            ("methodology", methodology),
            ("dataSource", activity.data_source.as_deref()),
            ("dataQuality", activity.data_quality.as_deref()),
            ("emissionFactorUnit", factor.unit.as_deref()),
        ];
        for (key, value) in text_fields {
            if let Some(v) = value {
                metadata.insert(key.to_string(), Value::from(v));
            }
        }
        let number_fields = [
            ("emissionFactorCO2", factor.co2),
            ("emissionFactorCH4", factor.ch4),
            ("emissionFactorN2O", factor.n2o),
            ("emissionFactorTotal", factor.total),
        ];
        for (key, value) in number_fields {
            if let Some(v) = value {
                metadata.insert(key.to_string(), Value::from(v));
            }
        }

        ActivityValue {
            id: Uuid::new_v4().to_string(),
            inventory_value_id: inventory_value_id.to_string(),
            activity_data: Value::Object(data),
            metadata: Value::Object(metadata),
            co2eq,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
impl<R> EcrfImporter for InventoryImporter<R>
where
    R: InventoryRepository,
{
    #[instrument(skip(self, result), fields(rows = result.rows.len()))]
    async fn import(
        &self,
        inventory_id: &str,
        result: &EcrfImportResult,
    ) -> ImportResult<ImportSummary> {
        let inventory = self
            .repo
            .find_inventory(inventory_id)
            .await?
            .ok_or_else(|| ImportError::InventoryNotFound(inventory_id.to_string()))?;

        let mut summary = ImportSummary {
            total_rows: result.rows.len(),
            warnings: result.warnings.clone(),
            ..Default::default()
        };
        let mut pending_year = match inventory.year {
            None => result.inferred_year_from_file,
            Some(_) => None,
        };

        for row in &result.rows {
            if !row.is_valid() {
                summary.skipped_rows += 1;
                summary
                    .errors
                    .extend(row.errors.iter().map(|e| Self::row_message(row, e)));
                continue;
            }

            match self.import_row(inventory_id, row, &mut pending_year).await {
                Ok(RowOutcome::Stored {
                    created,
                    activity_values,
                }) => {
                    summary.imported_rows += 1;
                    if created {
                        summary.created_values += 1;
                    } else {
                        summary.updated_values += 1;
                    }
                    summary.activity_values_created += activity_values;
                }
                Ok(RowOutcome::Skipped(warning)) => {
                    summary.skipped_rows += 1;
                    summary.warnings.push(Self::row_message(row, &warning));
                }
                Err(e) => {
                    tracing::warn!(
                        row = row.row_number(),
                        gpc = %row.gpc_reference_number,
                        error = %e,
                        "row import failed"
                    );
                    summary.skipped_rows += 1;
                    let message =
                        t_with_args("import.row_failed", &[("reason", e.to_string().as_str())]);
                    summary.errors.push(Self::row_message(row, &message));
                }
            }
        }

        tracing::info!(
            inventory_id,
            imported = summary.imported_rows,
            skipped = summary.skipped_rows,
            created = summary.created_values,
            updated = summary.updated_values,
            "import finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::inventory::Inventory;
    use crate::repository::error::{RepositoryError, RepositoryResult};

    fn row(total: Option<f64>, co2: Option<f64>, ch4: Option<f64>, n2o: Option<f64>) -> ImportedRow {
        ImportedRow {
            gpc_reference_number: "I.1.1".to_string(),
            co2,
            ch4,
            n2o,
            total_co2e: total,
            ..Default::default()
        }
    }

    #[test]
    fn test_total_prefers_explicit_positive_total() {
        assert_eq!(total_co2e_tonnes(&row(Some(5.0), Some(1.0), Some(1.0), None)), 5.0);
        assert_eq!(total_co2e_tonnes(&row(None, Some(1.5), Some(2.0), Some(0.5))), 4.0);
        // 总量为 0 时回退到各气体之和
        assert_eq!(total_co2e_tonnes(&row(Some(0.0), Some(2.0), None, None)), 2.0);
        assert_eq!(total_co2e_tonnes(&row(None, None, None, None)), 0.0);
    }

    #[test]
    fn test_tonnes_to_kg_rounds() {
        assert_eq!(tonnes_to_kg(12.5), 12_500);
        assert_eq!(tonnes_to_kg(0.0004), 0);
        assert_eq!(tonnes_to_kg(0.0005), 1);
        assert_eq!(tonnes_to_kg(1.23456), 1_235);
        assert!((tonnes_to_kg(3.217) as f64 / 1000.0 - 3.217).abs() < 1e-9);
    }

    #[test]
    fn test_activity_layout_follows_methodology_schema() {
        use crate::repository::SqliteInventoryRepository;
        use rusqlite::Connection;
        use std::sync::Mutex;

        let conn = Connection::open_in_memory().unwrap();
        let repo = SqliteInventoryRepository::from_connection(Arc::new(Mutex::new(conn)));
        let importer = InventoryImporter::new(
            Arc::new(repo),
            Arc::new(TranslationLookup::builtin().unwrap()),
        );

        let mut r = row(Some(4.2), None, None, None);
        r.activity.activity_type = Some("Firewood".to_string());
        r.activity.activity_amount = Some(2500.0);
        r.activity.activity_unit = Some("Litres".to_string());
        r.activity.data_source = Some("National stats".to_string());
        r.emission_factor.co2 = Some(1.5);

        let value = importer.build_activity_value("v-1", &r, Some("fuel-combustion-consumption"), 4200);
        assert_eq!(value.activity_data["fuel-consumption"], 2500.0);
        assert_eq!(value.activity_data["fuel-consumption-unit"], "units-liters");
        assert_eq!(value.activity_data["fuel-type"], "fuel-type-firewood");
        assert_eq!(value.metadata["methodology"], "fuel-combustion-consumption");
        assert_eq!(value.metadata["dataSource"], "National stats");
        assert_eq!(value.metadata["emissionFactorCO2"], 1.5);
        assert!(value.metadata.get("dataQuality").is_none());
        assert_eq!(value.co2eq, 4200);

        let generic = importer.build_activity_value("v-1", &r, Some("direct-measure"), 4200);
        assert_eq!(generic.activity_data["activity-amount"], 2500.0);
        assert_eq!(generic.activity_data["activity-amount-unit"], "units-liters");
        assert_eq!(generic.activity_data["activity-type"], "fuel-type-firewood");
    }

    // ==========================================
    // 内存仓储: 指定 GPC 编号的清单值写入失败
    // ==========================================
    struct FlakyRepo {
        fail_gpc: &'static str,
        values: std::sync::Mutex<Vec<InventoryValue>>,
    }

    #[async_trait]
    impl InventoryRepository for FlakyRepo {
        async fn create_inventory(&self, _inventory: &Inventory) -> RepositoryResult<()> {
            Ok(())
        }

        async fn find_inventory(&self, inventory_id: &str) -> RepositoryResult<Option<Inventory>> {
            Ok(Some(Inventory {
                inventory_id: inventory_id.to_string(),
                inventory_name: "Test".to_string(),
                city_name: "Test City".to_string(),
                year: Some(2023),
            }))
        }

        async fn update_inventory_year(
            &self,
            _inventory_id: &str,
            _year: i32,
        ) -> RepositoryResult<()> {
            Ok(())
        }

        async fn find_inventory_value(
            &self,
            _inventory_id: &str,
            _gpc_reference_number: &str,
        ) -> RepositoryResult<Option<InventoryValue>> {
            Ok(None)
        }

        async fn insert_inventory_value(
            &self,
            value: &InventoryValue,
        ) -> RepositoryResult<()> {
            if value.gpc_reference_number == self.fail_gpc {
                return Err(RepositoryError::DatabaseQueryError(
                    "disk I/O error".to_string(),
                ));
            }
            self.values.lock().unwrap().push(value.clone());
            Ok(())
        }

        async fn update_inventory_value(
            &self,
            _value: &InventoryValue,
        ) -> RepositoryResult<()> {
            Ok(())
        }

        async fn list_inventory_values(
            &self,
            _inventory_id: &str,
        ) -> RepositoryResult<Vec<InventoryValue>> {
            Ok(self.values.lock().unwrap().clone())
        }

        async fn insert_activity_value(
            &self,
            _value: &ActivityValue,
        ) -> RepositoryResult<()> {
            Ok(())
        }

        async fn delete_activity_values(
            &self,
            _inventory_value_id: &str,
        ) -> RepositoryResult<usize> {
            Ok(0)
        }

        async fn list_activity_values(
            &self,
            _inventory_value_id: &str,
        ) -> RepositoryResult<Vec<ActivityValue>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_storage_failure_on_one_row_does_not_stop_import() {
        let repo = Arc::new(FlakyRepo {
            fail_gpc: "I.1.2",
            values: std::sync::Mutex::new(Vec::new()),
        });
        let importer = InventoryImporter::new(
            repo.clone(),
            Arc::new(TranslationLookup::builtin().unwrap()),
        );

        let mut failing = row(None, Some(1.0), None, None);
        failing.gpc_reference_number = "I.1.2".to_string();
        failing.row_index = 0;
        let mut next = row(None, Some(2.0), None, None);
        next.gpc_reference_number = "I.2.1".to_string();
        next.row_index = 1;

        let result = EcrfImportResult {
            rows: vec![failing, next],
            row_count: 2,
            valid_row_count: 2,
            ..Default::default()
        };

        let summary = importer.import("inv-1", &result).await.unwrap();
        assert_eq!(summary.total_rows, 2);
        assert_eq!(summary.imported_rows, 1);
        assert_eq!(summary.skipped_rows, 1);
        assert_eq!(summary.created_values, 1);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].contains("I.1.2"));
        assert!(summary.errors[0].contains("Failed to import row"));
        assert!(summary.errors[0].contains("disk I/O error"));

        let stored = repo.list_inventory_values("inv-1").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].gpc_reference_number, "I.2.1");
        assert_eq!(stored[0].co2eq, Some(2_000));
    }
}
