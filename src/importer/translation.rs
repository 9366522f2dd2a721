// ==========================================
// CityCatalyst eCRF 导入 - 翻译反查表
// ==========================================
// 职责: 显示文本 → 规范键（单位、活动类型）
// 生命周期: 服务启动时构建一次，Arc 共享给提取器与导入器
// 格式: { "<规范键>": "<显示文本>" | ["<显示文本>", ...] }
// ==========================================

use crate::importer::error::ImportResult;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// 内置翻译表
const BUILTIN_TRANSLATIONS: &str = include_str!("../../assets/ecrf_translations.json");

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DisplayValue {
    One(String),
    Many(Vec<String>),
}

/// 反查用的文本标准化: TRIM + 小写 + 合并空白
fn normalize(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone, Default)]
pub struct TranslationLookup {
    by_display: HashMap<String, String>,
    keys: HashSet<String>,
}

impl TranslationLookup {
    /// 空表（所有反查均返回 None）
    pub fn empty() -> Self {
        Self::default()
    }

    /// 加载编译期内置的翻译表
    pub fn builtin() -> ImportResult<Self> {
        Self::from_json_str(BUILTIN_TRANSLATIONS)
    }

    /// 从 JSON 文本构建
    pub fn from_json_str(json: &str) -> ImportResult<Self> {
        // BTreeMap 保证键序稳定；显示文本冲突时先出现的键生效
        let table: BTreeMap<String, DisplayValue> = serde_json::from_str(json)?;

        let mut lookup = Self::empty();
        for (key, value) in table {
            let displays = match value {
                DisplayValue::One(s) => vec![s],
                DisplayValue::Many(list) => list,
            };
            for display in displays {
                let normalized = normalize(&display);
                if normalized.is_empty() {
                    continue;
                }
                lookup
                    .by_display
                    .entry(normalized)
                    .or_insert_with(|| key.clone());
            }
            lookup.keys.insert(key);
        }

        tracing::debug!(keys = lookup.keys.len(), "translation lookup built");
        Ok(lookup)
    }

    /// 从 JSON 文件构建
    pub fn load(path: impl AsRef<Path>) -> ImportResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// 显示文本 → 规范键；已是规范键的值映射到自身
    pub fn reverse_lookup(&self, display: &str) -> Option<&str> {
        let trimmed = display.trim();
        if let Some(key) = self.keys.get(trimmed) {
            return Some(key.as_str());
        }
        self.by_display.get(&normalize(trimmed)).map(String::as_str)
    }

    /// 反查失败时保留原文
    pub fn canonicalize(&self, display: &str) -> String {
        self.reverse_lookup(display)
            .map(str::to_string)
            .unwrap_or_else(|| display.trim().to_string())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
