// ==========================================
// CityCatalyst eCRF 导入 - 方法学推断
// ==========================================
// 职责: 自由文本方法学名称 → 方法学 ID
//       方法学 ID → 活动值字段布局
// 可用方法学: 按 部门 (GPC 编号第一段) + 范围 (最后一段) 查表
// ==========================================

/// 方法学 ID 的统一后缀（模糊匹配前去除）
const METHODOLOGY_SUFFIX: &str = "-methodology";

// ==========================================
// 可用方法学目录
// ==========================================
struct CatalogEntry {
    sector: &'static str,
    /// None 表示该部门任意范围
    scope: Option<&'static str>,
    methodologies: &'static [&'static str],
}

const CATALOG: &[CatalogEntry] = &[
    // I 固定能源
    CatalogEntry {
        sector: "I",
        scope: Some("1"),
        methodologies: &[
            "fuel-combustion-consumption",
            "sampling-scaled-data",
            "modeled-data",
            "direct-measure",
        ],
    },
    CatalogEntry {
        sector: "I",
        scope: None,
        methodologies: &["energy-consumption", "direct-measure"],
    },
    // II 交通
    CatalogEntry {
        sector: "II",
        scope: Some("1"),
        methodologies: &[
            "fuel-sales",
            "induced-activity-1",
            "geographic",
            "direct-measure-transportation",
        ],
    },
    CatalogEntry {
        sector: "II",
        scope: Some("2"),
        methodologies: &["energy-consumption", "direct-measure-transportation"],
    },
    CatalogEntry {
        sector: "II",
        scope: None,
        methodologies: &[
            "induced-activity-1",
            "geographic",
            "direct-measure-transportation",
        ],
    },
    // III 废弃物
    CatalogEntry {
        sector: "III",
        scope: None,
        methodologies: &["methane-commitment", "first-order-decay", "direct-measure-waste"],
    },
    // IV 工业过程与产品使用
    CatalogEntry {
        sector: "IV",
        scope: None,
        methodologies: &["direct-measure-ippu"],
    },
    // V 农业、林业及其他土地利用
    CatalogEntry {
        sector: "V",
        scope: None,
        methodologies: &["direct-measure-afolu"],
    },
];

/// GPC 编号 → (部门罗马数字, 末段)
fn split_reference(gpc_reference_number: &str) -> Option<(String, String)> {
    let trimmed = gpc_reference_number.trim();
    let mut segments = trimmed.split('.').filter(|s| !s.is_empty());
    let sector = segments.next()?.to_uppercase();
    let last = trimmed
        .rsplit('.')
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string();
    Some((sector, last))
}

/// 部门的直接测量方法学
pub fn direct_measure_id(sector: &str) -> Option<&'static str> {
    match sector.trim().to_uppercase().as_str() {
        "I" => Some("direct-measure"),
        "II" => Some("direct-measure-transportation"),
        "III" => Some("direct-measure-waste"),
        "IV" => Some("direct-measure-ippu"),
        "V" => Some("direct-measure-afolu"),
        _ => None,
    }
}

/// GPC 编号可用的方法学 ID（目录顺序）
pub fn available_methodologies(gpc_reference_number: &str) -> &'static [&'static str] {
    let Some((sector, scope)) = split_reference(gpc_reference_number) else {
        return &[];
    };
    CATALOG
        .iter()
        .find(|entry| {
            entry.sector == sector && entry.scope.map_or(true, |s| s == scope)
        })
        .map(|entry| entry.methodologies)
        .unwrap_or(&[])
}

// ==========================================
// 关键词推断规则（按顺序求值）
// ==========================================
#[derive(Debug, Clone, Copy)]
enum Target {
    /// 部门的直接测量方法学
    DirectMeasure,
    /// 候选 ID，取第一个可用的
    Ids(&'static [&'static str]),
}

struct KeywordRule {
    /// 全部出现才命中
    all_of: &'static [&'static str],
    /// 任一出现即可（为空表示不要求）
    any_of: &'static [&'static str],
    target: Target,
}

const KEYWORD_RULES: &[KeywordRule] = &[
    KeywordRule {
        all_of: &["direct", "measure"],
        any_of: &[],
        target: Target::DirectMeasure,
    },
    KeywordRule {
        all_of: &[],
        any_of: &["fuel"],
        target: Target::Ids(&["fuel-combustion-consumption", "fuel-sales"]),
    },
    KeywordRule {
        all_of: &[],
        any_of: &["energy", "electricity"],
        target: Target::Ids(&["energy-consumption"]),
    },
    KeywordRule {
        all_of: &[],
        any_of: &["sampl", "scaled"],
        target: Target::Ids(&["sampling-scaled-data"]),
    },
    KeywordRule {
        all_of: &[],
        any_of: &["model"],
        target: Target::Ids(&["modeled-data"]),
    },
    KeywordRule {
        all_of: &[],
        any_of: &["induced"],
        target: Target::Ids(&["induced-activity-1"]),
    },
    KeywordRule {
        all_of: &[],
        any_of: &["geographic"],
        target: Target::Ids(&["geographic"]),
    },
    KeywordRule {
        all_of: &[],
        any_of: &["decay"],
        target: Target::Ids(&["first-order-decay"]),
    },
    KeywordRule {
        all_of: &["methane", "commitment"],
        any_of: &[],
        target: Target::Ids(&["methane-commitment"]),
    },
];

impl KeywordRule {
    fn matches(&self, text: &str) -> bool {
        self.all_of.iter().all(|k| text.contains(k))
            && (self.any_of.is_empty() || self.any_of.iter().any(|k| text.contains(k)))
    }
}

/// 小写后按非字母数字切词，以 '-' 连接
fn normalize_words(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// 整词匹配可用 ID（去 "-methodology" 后缀）
///
/// 输入含 ID 的全部词时直接命中；输入词全部出现在 ID 中时，
/// 仅在恰好一个 ID 满足时命中
fn match_by_words(words: &str, available: &[&'static str]) -> Option<&'static str> {
    let input: Vec<&str> = words.split('-').collect();
    let id_words = |id: &'static str| -> Vec<&'static str> {
        id.strip_suffix(METHODOLOGY_SUFFIX).unwrap_or(id).split('-').collect()
    };

    if let Some(id) = available
        .iter()
        .copied()
        .find(|id| id_words(id).iter().all(|w| input.contains(w)))
    {
        return Some(id);
    }

    let mut candidates = available
        .iter()
        .copied()
        .filter(|id| {
            let parts = id_words(id);
            input.iter().all(|w| parts.contains(w))
        });
    match (candidates.next(), candidates.next()) {
        (Some(id), None) => Some(id),
        _ => None,
    }
}

/// 推断方法学 ID
///
/// # 顺序
/// 1. 关键词规则（仅接受该 GPC 编号可用的方法学）
/// 2. 与可用 ID（去 "-methodology" 后缀）的模糊词包含匹配
/// 3. 部门的直接测量方法学
/// 4. 原文
///
/// 输入为空时返回 None
pub fn infer_methodology(raw: Option<&str>, gpc_reference_number: &str) -> Option<String> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    let text = raw.to_lowercase();
    let available = available_methodologies(gpc_reference_number);
    let sector = split_reference(gpc_reference_number).map(|(sector, _)| sector);
    let direct = sector.as_deref().and_then(direct_measure_id);

    // 1. 关键词规则
    for rule in KEYWORD_RULES {
        if !rule.matches(&text) {
            continue;
        }
        let found = match rule.target {
            Target::DirectMeasure => direct.filter(|id| available.contains(id)),
            Target::Ids(ids) => ids.iter().copied().find(|id| available.contains(id)),
        };
        if let Some(id) = found {
            return Some(id.to_string());
        }
    }

    // 2. 模糊词包含（整词）
    let words = normalize_words(raw);
    if !words.is_empty() {
        if let Some(id) = match_by_words(&words, available) {
            return Some(id.to_string());
        }
    }

    // 3. 部门默认 / 4. 原文
    match direct {
        Some(id) => Some(id.to_string()),
        None => Some(raw.to_string()),
    }
}

// ==========================================
// 方法学 schema（活动值字段布局）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodologySchema {
    /// 活动数量键；单位键为 "{title}-unit"
    pub activity_title: Option<&'static str>,
    /// 活动类型键
    pub type_field: Option<&'static str>,
}

impl MethodologySchema {
    const GENERIC: MethodologySchema = MethodologySchema {
        activity_title: None,
        type_field: None,
    };
}

/// 方法学 ID → schema；未知 ID 与直接测量均无活动标题
pub fn schema_for(methodology_id: &str) -> MethodologySchema {
    let (activity_title, type_field) = match methodology_id {
        "fuel-combustion-consumption" => ("fuel-consumption", "fuel-type"),
        "sampling-scaled-data" => ("fuel-consumption-sample", "fuel-type"),
        "modeled-data" => ("modeled-fuel-consumption", "fuel-type"),
        "energy-consumption" => ("energy-consumption", "energy-type"),
        "fuel-sales" => ("fuel-sold", "fuel-type"),
        "induced-activity-1" => ("vkt", "vehicle-type"),
        "methane-commitment" | "first-order-decay" => ("waste-disposed", "waste-type"),
        _ => return MethodologySchema::GENERIC,
    };
    MethodologySchema {
        activity_title: Some(activity_title),
        type_field: Some(type_field),
    }
}
