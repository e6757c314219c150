use arbor_beans::BeanError;
use arbor_core::CoreError;
use thiserror::Error;

/// 刷新失败时携带的原始错误
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 上下文错误类型
#[derive(Debug, Error)]
pub enum ContextError {
    /// 生命周期状态不允许当前操作
    #[error("{0}")]
    IllegalState(String),

    /// refresh 期间的失败，上下文保持未激活
    #[error("Error initializing {context}: {source}")]
    Initialization {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Beans(#[from] BeanError),

    #[error(transparent)]
    Core(#[from] CoreError),

    /// 上下文配置文件无法解析
    #[error("Invalid context settings in {origin}: {message}")]
    Settings { origin: String, message: String },
}

impl ContextError {
    /// 导致失败的组件级错误（如果有）
    pub fn bean_error(&self) -> Option<&BeanError> {
        match self {
            ContextError::Beans(e) => Some(e),
            ContextError::Initialization { source, .. } => source.downcast_ref::<BeanError>(),
            _ => None,
        }
    }
}

pub type ContextResult<T> = Result<T, ContextError>;
