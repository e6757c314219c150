/// 上下文相关常量

/// Environment 以单例形式注册时使用的名称
pub const ENVIRONMENT_BEAN_NAME: &str = "environment";

/// 未指定配置位置时加载的文档
pub const DEFAULT_CONFIG_LOCATION: &str = "applicationContext.xml";

/// 配置位置字符串的分隔符
pub const CONFIG_LOCATION_DELIMITERS: &str = ",; \t\n";

/// 配置文件中上下文设置所在的表
pub const CONTEXT_SETTINGS_TABLE: &str = "context";
