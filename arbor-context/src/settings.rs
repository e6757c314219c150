//! 上下文设置
//!
//! 可以写在 TOML 配置文件的 `[context]` 表中，也可以从 Environment 读取
//! `context.*` 属性。

use std::fs;
use std::path::Path;

use arbor_core::utils::strings::tokenize;
use arbor_core::Environment;
use serde::Deserialize;

use crate::constants::{CONFIG_LOCATION_DELIMITERS, CONTEXT_SETTINGS_TABLE};
use crate::error::{ContextError, ContextResult};

/// 上下文设置属性
///
/// 未设置的开关保持 `None`，此时沿用 BeanFactory 的默认值。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ContextSettings {
    pub id: Option<String>,

    pub allow_bean_definition_overriding: Option<bool>,

    pub allow_circular_references: Option<bool>,

    pub config_locations: Vec<String>,

    pub active_profiles: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsDocument {
    #[serde(default)]
    context: ContextSettings,
}

impl ContextSettings {
    /// 解析 TOML 文本中的 `[context]` 表；没有该表时返回默认设置
    pub fn from_toml(content: &str) -> ContextResult<Self> {
        Self::parse(content, "<inline>")
    }

    /// 读取 TOML 文件中的 `[context]` 表
    pub fn from_file(path: impl AsRef<Path>) -> ContextResult<Self> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|e| ContextError::Settings {
            origin: origin.clone(),
            message: e.to_string(),
        })?;
        Self::parse(&content, &origin)
    }

    fn parse(content: &str, origin: &str) -> ContextResult<Self> {
        let document: SettingsDocument = toml::from_str(content).map_err(|e| ContextError::Settings {
            origin: origin.to_string(),
            message: e.to_string(),
        })?;
        Ok(document.context)
    }

    /// 从 Environment 加载配置
    pub fn from_environment(env: &Environment) -> Self {
        let key = |name: &str| format!("{}.{}", CONTEXT_SETTINGS_TABLE, name);
        let list = |name: &str| {
            env.get(&key(name))
                .and_then(|value| value.to_text())
                .map(|text| tokenize(&text, CONFIG_LOCATION_DELIMITERS))
                .unwrap_or_default()
        };

        Self {
            id: env.get_string(&key("id")),
            allow_bean_definition_overriding: env.get_bool(&key("allow-bean-definition-overriding")),
            allow_circular_references: env.get_bool(&key("allow-circular-references")),
            config_locations: list("config-locations"),
            active_profiles: list("active-profiles"),
        }
    }
}
