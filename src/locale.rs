//! Localized user-facing messages
//!
//! Every message shown to the person who supplied the parameters goes through
//! this module so that parse errors, missing-input errors and the performance
//! summary come out in the caller's language.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported message languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Locale {
    /// English (default)
    #[default]
    #[serde(rename = "en")]
    En,
    /// Simplified Chinese
    #[serde(rename = "zh-CN")]
    ZhCn,
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::En => write!(f, "en"),
            Self::ZhCn => write!(f, "zh-CN"),
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "en" | "en-us" | "en-gb" => Ok(Self::En),
            "zh" | "zh-cn" | "zh-hans" => Ok(Self::ZhCn),
            other => Err(format!("Unsupported locale: {other} (expected en or zh-CN)")),
        }
    }
}

impl Locale {
    /// Message for a scalar field that is not a finite number
    #[must_use]
    pub fn invalid_number(self, title: &str) -> String {
        match self {
            Self::En => format!("{title} must be a number or a number in scientific notation"),
            Self::ZhCn => format!("{title} 必须为数字或科学计数法表示的数字"),
        }
    }

    /// Message for a comma separated list that contains a non-number
    #[must_use]
    pub fn invalid_number_list(self, title: &str) -> String {
        match self {
            Self::En => format!(
                "{title} must be comma separated numbers or numbers in scientific notation"
            ),
            Self::ZhCn => format!("{title} 必须为逗号分隔的数字或科学计数法表示的数字"),
        }
    }

    /// Message for a removal request without an image
    #[must_use]
    pub fn no_image(self) -> &'static str {
        match self {
            Self::En => "no image provided",
            Self::ZhCn => "请上传图片",
        }
    }

    /// Two-line performance summary, seconds with two decimals
    #[must_use]
    pub fn performance_summary(self, load_secs: f64, remove_secs: f64) -> String {
        match self {
            Self::En => format!(
                "Model load time: {load_secs:.2}s\nBackground removal time: {remove_secs:.2}s"
            ),
            Self::ZhCn => format!("加载模型耗时: {load_secs:.2}s\n去除背景耗时: {remove_secs:.2}s"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_parsing() {
        assert_eq!("en".parse::<Locale>().unwrap(), Locale::En);
        assert_eq!("zh_CN".parse::<Locale>().unwrap(), Locale::ZhCn);
        assert_eq!("ZH".parse::<Locale>().unwrap(), Locale::ZhCn);
        assert!("fr".parse::<Locale>().is_err());
    }

    #[test]
    fn test_messages_name_the_field() {
        assert!(Locale::En.invalid_number("Epsilon").starts_with("Epsilon "));
        assert!(Locale::ZhCn.invalid_number("Epsilon").starts_with("Epsilon "));
        assert!(Locale::En.invalid_number_list("Shifts").contains("comma separated"));
    }

    #[test]
    fn test_performance_summary_precision() {
        let summary = Locale::En.performance_summary(0.123_456, 3.0);
        assert_eq!(summary, "Model load time: 0.12s\nBackground removal time: 3.00s");

        let summary = Locale::ZhCn.performance_summary(1.005, 0.5);
        assert!(summary.contains("加载模型耗时"));
        assert!(summary.contains("0.50s"));
    }
}
