// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持英文（默认）和中文
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// # 参数
/// - locale: 语言代码（"en" 或 "zh-CN"）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

// 替换 %{name} 占位符
fn fill_args(template: String, args: &[(&str, &str)]) -> String {
    let mut result = template;
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

/// 翻译消息（无参数）
///
/// # 示例
/// ```no_run
/// use citycatalyst_ecrf::i18n::t;
/// let msg = t("extract.no_valid_rows");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数）
///
/// # 示例
/// ```no_run
/// use citycatalyst_ecrf::i18n::t_with_args;
/// let msg = t_with_args("extract.missing_gpc_ref", &[("row", "5")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    fill_args(rust_i18n::t!(key).to_string(), args)
}

/// 按指定语言翻译（不修改全局语言）
pub fn t_for(locale: &str, key: &str, args: &[(&str, &str)]) -> String {
    fill_args(rust_i18n::t!(key, locale = locale).to_string(), args)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 全局语言在并行测试间共享，这里只使用显式语言

    #[test]
    fn test_translate_simple() {
        assert_eq!(
            t_for("en", "extract.no_valid_rows", &[]),
            "No valid rows found in file"
        );
        assert_eq!(t_for("zh-CN", "extract.no_valid_rows", &[]), "文件中没有有效行");
    }

    #[test]
    fn test_translate_with_args() {
        let msg = t_for("en", "extract.missing_gpc_ref", &[("row", "7")]);
        assert_eq!(msg, "Row 7: missing GPC reference number, row skipped");

        let msg = t_for("zh-CN", "extract.missing_gpc_ref", &[("row", "7")]);
        assert!(msg.contains("第 7 行"));
    }

    #[test]
    fn test_unknown_locale_falls_back_to_english() {
        let msg = t_for("fr", "validation.empty_file", &[]);
        assert_eq!(msg, "File is empty");
    }

    #[test]
    fn test_default_locale_messages() {
        let msg = t_with_args("import.unknown_notation_key", &[("key", "XX")]);
        assert!(msg.contains("XX"));
        assert!(!t("validation.no_data_sheet").is_empty());
    }
}
