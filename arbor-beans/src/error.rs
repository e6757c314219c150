use std::fmt;

use arbor_core::CoreError;
use thiserror::Error;

/// 组件级错误类型
///
/// 覆盖定义注册、文档解析与 Bean 实例化过程中的所有失败。
#[derive(Debug, Error)]
pub enum BeanError {
    /// 注册冲突：重复定义、别名冲突、非法名称等
    #[error("Invalid bean definition{}{}: {message}", fmt_name(.name), fmt_resource(.resource))]
    DefinitionStore {
        name: Option<String>,
        resource: Option<String>,
        message: String,
    },

    /// 未知的 Bean 名称或别名
    #[error("No bean named '{0}' available")]
    NoSuchDefinition(String),

    /// 文档结构错误（非良构 XML、根元素不是 beans），对该资源是致命的
    #[error("Malformed configuration in {resource}: {message}")]
    MalformedConfiguration { resource: String, message: String },

    /// 元素级问题的汇总
    #[error("{0}")]
    Configuration(ProblemReport),

    /// 实例化、属性注入或初始化失败
    #[error("Error creating bean with name '{name}': {message}")]
    BeanCreation {
        name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// 创建过程中再次请求同一个 Bean（循环依赖）
    #[error("Error creating bean with name '{name}': Requested bean is currently in creation: {chain}")]
    CurrentlyInCreation { name: String, chain: String },

    /// 请求了抽象定义
    #[error("Error creating bean with name '{0}': Bean definition is abstract")]
    BeanIsAbstract(String),

    /// 类型不匹配
    #[error("Bean named '{name}' is expected to be of type '{expected}' but was actually of type '{actual}'")]
    BeanNotOfRequiredType {
        name: String,
        expected: String,
        actual: String,
    },

    /// 类名无法在类注册表中找到
    #[error("Cannot find class [{class}] for bean with name '{name}'")]
    CannotLoadClass { name: String, class: String },

    /// 生命周期或状态误用
    #[error("{0}")]
    IllegalState(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

fn fmt_name(name: &Option<String>) -> String {
    name.as_ref()
        .map(|n| format!(" '{}'", n))
        .unwrap_or_default()
}

fn fmt_resource(resource: &Option<String>) -> String {
    resource
        .as_ref()
        .map(|r| format!(" defined in {}", r))
        .unwrap_or_default()
}

impl BeanError {
    pub fn store(message: impl Into<String>) -> Self {
        Self::DefinitionStore {
            name: None,
            resource: None,
            message: message.into(),
        }
    }

    pub fn store_for(name: &str, resource: Option<String>, message: impl Into<String>) -> Self {
        Self::DefinitionStore {
            name: Some(name.to_string()),
            resource,
            message: message.into(),
        }
    }

    pub fn creation(name: &str, message: impl Into<String>) -> Self {
        Self::BeanCreation {
            name: name.to_string(),
            message: message.into(),
            source: None,
        }
    }

    pub fn creation_caused_by(
        name: &str,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::BeanCreation {
            name: name.to_string(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 沿错误链查找是否由循环依赖导致
    pub fn is_currently_in_creation(&self) -> bool {
        match self {
            BeanError::CurrentlyInCreation { .. } => true,
            BeanError::BeanCreation {
                source: Some(source),
                ..
            } => source
                .downcast_ref::<BeanError>()
                .is_some_and(BeanError::is_currently_in_creation),
            _ => false,
        }
    }
}

pub type BeanResult<T> = Result<T, BeanError>;

// ========== Problem collection ==========

/// 问题发生的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemLocation {
    /// 资源描述
    pub resource: String,
    /// 出问题的元素名
    pub element: Option<String>,
    /// 行号（从 1 开始）
    pub line: Option<u32>,
}

impl fmt::Display for ProblemLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resource)?;
        if let Some(element) = &self.element {
            write!(f, " <{}>", element)?;
        }
        if let Some(line) = self.line {
            write!(f, " (line {})", line)?;
        }
        Ok(())
    }
}

/// 一个元素级配置问题
#[derive(Debug)]
pub struct Problem {
    pub message: String,
    pub location: ProblemLocation,
    pub cause: Option<BeanError>,
}

impl Problem {
    pub fn new(message: impl Into<String>, location: ProblemLocation) -> Self {
        Self {
            message: message.into(),
            location,
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: BeanError) -> Self {
        self.cause = Some(cause);
        self
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration problem: {}", self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, "; nested exception is {}", cause)?;
        }
        write!(f, "\nOffending resource: {}", self.location)
    }
}

/// 一次加载过程中累积的全部问题
#[derive(Debug, Default)]
pub struct ProblemReport {
    problems: Vec<Problem>,
}

impl ProblemReport {
    pub fn new(problems: Vec<Problem>) -> Self {
        Self { problems }
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn into_problems(self) -> Vec<Problem> {
        self.problems
    }

    /// 是否有问题的消息包含给定文本
    pub fn mentions(&self, text: &str) -> bool {
        self.problems.iter().any(|p| p.to_string().contains(text))
    }
}

impl fmt::Display for ProblemReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} configuration problem(s) detected", self.problems.len())?;
        for problem in &self.problems {
            write!(f, "\n{}", problem)?;
        }
        Ok(())
    }
}
