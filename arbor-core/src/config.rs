use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

use parking_lot::RwLock;

use crate::error::{CoreError, CoreResult};
use crate::utils::strings;

/// 激活 profile 的属性键（逗号分隔）
pub const ACTIVE_PROFILES_PROPERTY: &str = "arbor.profiles.active";

/// 默认 profile 的属性键（逗号分隔）
pub const DEFAULT_PROFILES_PROPERTY: &str = "arbor.profiles.default";

/// 未显式配置时的默认 profile
pub const RESERVED_DEFAULT_PROFILE: &str = "default";

const PLACEHOLDER_PREFIX: &str = "${";
const PLACEHOLDER_SUFFIX: &str = "}";
const VALUE_SEPARATOR: char = ':';

/// 配置值类型
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<ConfigValue>),
    Object(HashMap<String, ConfigValue>),
}

impl ConfigValue {
    /// 转换为字符串切片
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// 标量值的文本形式，占位符替换时使用
    pub fn to_text(&self) -> Option<String> {
        match self {
            ConfigValue::String(s) => Some(s.clone()),
            ConfigValue::Int(i) => Some(i.to_string()),
            ConfigValue::Float(f) => Some(f.to_string()),
            ConfigValue::Bool(b) => Some(b.to_string()),
            ConfigValue::Array(items) => {
                let parts: Option<Vec<String>> = items.iter().map(ConfigValue::to_text).collect();
                parts.map(|parts| parts.join(","))
            }
            ConfigValue::Object(_) => None,
        }
    }

    /// 转换为整数
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            ConfigValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// 转换为布尔值
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            ConfigValue::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Some(true),
                "false" | "no" | "off" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

/// 配置源 trait
pub trait PropertySource: Send + Sync {
    /// 获取配置源名称
    fn name(&self) -> &str;

    /// 获取配置值
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// 获取所有配置键
    fn keys(&self) -> Vec<String>;

    /// 配置源优先级（数字越大优先级越高）
    fn priority(&self) -> i32 {
        0
    }
}

/// Environment - 配置与 profile 管理
///
/// 提供属性查找、`${...}` 占位符解析以及 profile 判定。
/// XML 读取器通过它解析 `<import resource>` 中的占位符并过滤 `<beans profile>`。
pub struct Environment {
    /// 配置源列表（按优先级降序）
    sources: RwLock<Vec<Box<dyn PropertySource>>>,

    /// 显式设置的激活 profile；为空时回退到 `arbor.profiles.active` 属性
    active_profiles: RwLock<Vec<String>>,

    /// 没有任何激活 profile 时生效的 profile
    default_profiles: RwLock<Vec<String>>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("active_profiles", &self.active_profiles())
            .field("default_profiles", &self.default_profiles())
            .field("sources_count", &self.sources.read().len())
            .finish()
    }
}

impl Environment {
    /// 创建不含任何配置源的环境
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(Vec::new()),
            active_profiles: RwLock::new(Vec::new()),
            default_profiles: RwLock::new(vec![RESERVED_DEFAULT_PROFILE.to_string()]),
        }
    }

    /// 创建包含进程环境变量配置源的环境
    pub fn standard() -> Self {
        let environment = Self::new();
        environment.add_property_source(Box::new(EnvironmentPropertySource::new("")));
        environment
    }

    /// 添加配置源
    pub fn add_property_source(&self, source: Box<dyn PropertySource>) {
        let mut sources = self.sources.write();
        tracing::debug!("Adding property source '{}'", source.name());
        sources.push(source);
        // 按优先级降序排序（稳定排序，同优先级保持添加顺序）
        sources.sort_by(|a, b| b.priority().cmp(&a.priority()));
    }

    /// 获取配置值
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        let sources = self.sources.read();
        for source in sources.iter() {
            if let Some(value) = source.get(key) {
                tracing::trace!("Found key '{}' in property source '{}'", key, source.name());
                return Some(value);
            }
        }
        tracing::trace!("Could not find key '{}' in any property source", key);
        None
    }

    /// 是否存在指定属性
    pub fn contains_property(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// 获取字符串配置（标量值会被转换为文本）
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.to_text())
    }

    /// 获取字符串配置（带默认值）
    pub fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|| default.to_string())
    }

    /// 获取布尔值配置
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    /// 获取整数配置
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }

    // ========== Profiles ==========

    /// 设置激活的 profile
    pub fn set_active_profiles<I, S>(&self, profiles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let profiles: Vec<String> = profiles.into_iter().map(Into::into).collect();
        tracing::debug!("Activating profiles {:?}", profiles);
        *self.active_profiles.write() = profiles;
    }

    /// 追加一个激活的 profile
    pub fn add_active_profile(&self, profile: impl Into<String>) {
        let profile = profile.into();
        let mut active = self.active_profiles.write();
        if !active.contains(&profile) {
            active.push(profile);
        }
    }

    /// 设置默认 profile
    pub fn set_default_profiles<I, S>(&self, profiles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.default_profiles.write() = profiles.into_iter().map(Into::into).collect();
    }

    /// 获取激活的 profile
    ///
    /// 未显式设置时读取 `arbor.profiles.active` 属性
    pub fn active_profiles(&self) -> Vec<String> {
        let explicit = self.active_profiles.read().clone();
        if !explicit.is_empty() {
            return explicit;
        }
        self.get_string(ACTIVE_PROFILES_PROPERTY)
            .map(|value| strings::tokenize(&value, ","))
            .unwrap_or_default()
    }

    /// 获取默认 profile
    pub fn default_profiles(&self) -> Vec<String> {
        match self.get_string(DEFAULT_PROFILES_PROPERTY) {
            Some(value) => strings::tokenize(&value, ","),
            None => self.default_profiles.read().clone(),
        }
    }

    /// 判断给定的 profile 列表中是否至少有一个被接受
    ///
    /// 以 `!` 开头的 profile 表示"该 profile 未激活"。
    pub fn accepts_profiles<S: AsRef<str>>(&self, profiles: &[S]) -> bool {
        profiles.iter().any(|profile| {
            let profile = profile.as_ref().trim();
            match profile.strip_prefix('!') {
                Some(negated) => !negated.is_empty() && !self.is_profile_active(negated),
                None => !profile.is_empty() && self.is_profile_active(profile),
            }
        })
    }

    fn is_profile_active(&self, profile: &str) -> bool {
        let active = self.active_profiles();
        if active.is_empty() {
            self.default_profiles().iter().any(|p| p == profile)
        } else {
            active.iter().any(|p| p == profile)
        }
    }

    // ========== Placeholders ==========

    /// 解析 `${key}` / `${key:default}` 占位符，无法解析的占位符原样保留
    pub fn resolve_placeholders(&self, text: &str) -> String {
        let mut visited = HashSet::new();
        // 忽略未解析占位符时不会产生错误；循环引用同样按原样保留
        self.parse_string_value(text, &mut visited, true)
            .unwrap_or_else(|_| text.to_string())
    }

    /// 解析占位符，存在无法解析的占位符时返回错误
    pub fn resolve_required_placeholders(&self, text: &str) -> CoreResult<String> {
        let mut visited = HashSet::new();
        self.parse_string_value(text, &mut visited, false)
    }

    fn parse_string_value(
        &self,
        value: &str,
        visited: &mut HashSet<String>,
        ignore_unresolvable: bool,
    ) -> CoreResult<String> {
        let mut result = value.to_string();
        let mut search_from = 0;

        while let Some(relative_start) = result[search_from..].find(PLACEHOLDER_PREFIX) {
            let start = search_from + relative_start;
            let Some(end) = find_placeholder_end(&result, start) else {
                break;
            };

            let original = result[start + PLACEHOLDER_PREFIX.len()..end].to_string();
            if !visited.insert(original.clone()) {
                return Err(CoreError::CircularPlaceholder(original));
            }

            // 占位符本身也可能包含占位符
            let placeholder = self.parse_string_value(&original, visited, ignore_unresolvable)?;

            let mut resolved = self.get_string(&placeholder);
            if resolved.is_none() {
                if let Some(separator) = placeholder.find(VALUE_SEPARATOR) {
                    let (key, default) = placeholder.split_at(separator);
                    resolved = self
                        .get_string(key)
                        .or_else(|| Some(default[VALUE_SEPARATOR.len_utf8()..].to_string()));
                }
            }

            match resolved {
                Some(resolved) => {
                    let resolved = self.parse_string_value(&resolved, visited, ignore_unresolvable)?;
                    result.replace_range(start..end + PLACEHOLDER_SUFFIX.len(), &resolved);
                    search_from = start + resolved.len();
                }
                None if ignore_unresolvable => {
                    search_from = end + PLACEHOLDER_SUFFIX.len();
                }
                None => {
                    return Err(CoreError::UnresolvablePlaceholder {
                        placeholder,
                        value: value.to_string(),
                    });
                }
            }

            visited.remove(&original);
        }

        Ok(result)
    }
}

/// 找到与 `start` 处 `${` 配对的 `}`，考虑嵌套
fn find_placeholder_end(text: &str, start: usize) -> Option<usize> {
    let mut index = start + PLACEHOLDER_PREFIX.len();
    let mut depth = 0usize;
    while index < text.len() {
        let rest = &text[index..];
        if rest.starts_with(PLACEHOLDER_SUFFIX) {
            if depth == 0 {
                return Some(index);
            }
            depth -= 1;
            index += PLACEHOLDER_SUFFIX.len();
        } else if rest.starts_with(PLACEHOLDER_PREFIX) {
            depth += 1;
            index += PLACEHOLDER_PREFIX.len();
        } else {
            index += rest.chars().next().map_or(1, char::len_utf8);
        }
    }
    None
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

// ========== Property Sources ==========

/// 环境变量配置源
pub struct EnvironmentPropertySource {
    prefix: String,
    priority: i32,
}

impl EnvironmentPropertySource {
    /// 创建环境变量配置源
    ///
    /// # 参数
    /// * `prefix` - 环境变量前缀，例如 "APP_"；空字符串表示不加前缀
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            priority: 100, // 环境变量优先级较高
        }
    }

    /// 将环境变量名转换为配置键
    /// 例如: APP_DATABASE_URL -> database.url
    fn env_to_key(&self, env_key: &str) -> String {
        let stripped = env_key.strip_prefix(&self.prefix).unwrap_or(env_key);
        stripped.to_lowercase().replace('_', ".")
    }

    /// 将配置键转换为环境变量名
    /// 例如: database.url -> APP_DATABASE_URL
    fn key_to_env(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.replace(['.', '-'], "_").to_uppercase())
    }
}

impl PropertySource for EnvironmentPropertySource {
    fn name(&self) -> &str {
        "systemEnvironment"
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        std::env::var(self.key_to_env(key))
            .or_else(|_| std::env::var(key))
            .ok()
            .map(ConfigValue::String)
    }

    fn keys(&self) -> Vec<String> {
        std::env::vars()
            .filter(|(k, _)| k.starts_with(&self.prefix))
            .map(|(k, _)| self.env_to_key(&k))
            .collect()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// TOML 文件配置源
pub struct TomlPropertySource {
    name: String,
    properties: HashMap<String, ConfigValue>,
    priority: i32,
}

impl TomlPropertySource {
    /// 从文件加载 TOML 配置
    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let description = format!("file [{}]", path.display());
        let content = fs::read_to_string(path).map_err(|e| CoreError::io(description.clone(), e))?;
        Self::parse(&content, path.to_string_lossy().to_string())
    }

    /// 从字符串解析 TOML 配置
    pub fn parse(content: &str, name: impl Into<String>) -> CoreResult<Self> {
        let name = name.into();
        let value: toml::Value = toml::from_str(content)
            .map_err(|e| CoreError::resolution(format!("TOML source [{}]", name), e.to_string()))?;

        let mut properties = HashMap::new();
        Self::flatten_toml(&value, String::new(), &mut properties);

        Ok(Self {
            name,
            properties,
            priority: 0, // 文件配置优先级最低
        })
    }

    /// 展平 TOML 结构
    /// 例如: { database: { url: "xxx" } } -> { "database.url": "xxx" }
    fn flatten_toml(value: &toml::Value, prefix: String, result: &mut HashMap<String, ConfigValue>) {
        match value {
            toml::Value::Table(table) => {
                for (key, val) in table {
                    let new_prefix = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", prefix, key)
                    };
                    Self::flatten_toml(val, new_prefix, result);
                }
            }
            other => {
                result.insert(prefix, Self::toml_value_to_config(other));
            }
        }
    }

    /// 转换 TOML 值为 ConfigValue
    fn toml_value_to_config(value: &toml::Value) -> ConfigValue {
        match value {
            toml::Value::String(s) => ConfigValue::String(s.clone()),
            toml::Value::Integer(i) => ConfigValue::Int(*i),
            toml::Value::Float(f) => ConfigValue::Float(*f),
            toml::Value::Boolean(b) => ConfigValue::Bool(*b),
            toml::Value::Array(arr) => {
                ConfigValue::Array(arr.iter().map(Self::toml_value_to_config).collect())
            }
            toml::Value::Table(table) => ConfigValue::Object(
                table
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::toml_value_to_config(v)))
                    .collect(),
            ),
            toml::Value::Datetime(dt) => ConfigValue::String(dt.to_string()),
        }
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl PropertySource for TomlPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.properties.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// 内存配置源（用于测试或运行时配置）
pub struct MapPropertySource {
    name: String,
    properties: HashMap<String, ConfigValue>,
    priority: i32,
}

impl MapPropertySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: HashMap::new(),
            priority: 50,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// 添加字符串属性
    pub fn with(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_property(key, ConfigValue::String(value.into()))
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl PropertySource for MapPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.properties.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}
