use thiserror::Error;

/// 基础设施层错误
///
/// 覆盖占位符解析、资源定位与 I/O、日志初始化等与 Bean 无关的失败。
#[derive(Debug, Error)]
pub enum CoreError {
    /// 必需的占位符无法解析
    #[error("Could not resolve placeholder '{placeholder}' in value \"{value}\"")]
    UnresolvablePlaceholder { placeholder: String, value: String },

    /// 占位符之间形成了循环引用
    #[error("Circular placeholder reference '{0}' in property definitions")]
    CircularPlaceholder(String),

    /// 资源无法定位（不存在、无法转换为 URL 或无法创建相对资源）
    #[error("{description}: {message}")]
    ResourceResolution { description: String, message: String },

    /// 读取资源时的 I/O 错误
    #[error("I/O failure on {description}")]
    Io {
        description: String,
        #[source]
        source: std::io::Error,
    },

    /// 非法的 URL 字符串
    #[error("Invalid URL [{url}]")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// 日志系统初始化失败
    #[error("Logging initialization failed: {0}")]
    LoggingInit(String),
}

impl CoreError {
    pub fn resolution(description: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ResourceResolution {
            description: description.into(),
            message: message.into(),
        }
    }

    pub fn io(description: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            description: description.into(),
            source,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
