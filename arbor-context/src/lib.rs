// arbor-context: 应用上下文与刷新生命周期
//
// 提供：
// - ApplicationContext：未初始化 → 激活 → 关闭 的刷新状态机
// - 位置解析策略（类路径 / 文件系统）与定义加载器（XML / 配置类）
// - 通用、XML、配置类几种上下文
// - 上下文设置（TOML `[context]` 表）

pub mod annotation;
pub mod constants;
pub mod context;
pub mod error;
pub mod generic;
pub mod loader;
pub mod settings;
pub mod strategy;
pub mod xml;

// 重新导出常用类型
pub use annotation::{
    AnnotatedBeanDefinitionReader, AnnotatedDefinitionLoader, AnnotationConfigApplicationContext, BeanMethod,
    ComponentSubmission, ConfigurationClass,
};
pub use constants::{DEFAULT_CONFIG_LOCATION, ENVIRONMENT_BEAN_NAME};
pub use context::{ApplicationContext, ApplicationContextBuilder, ContextState, RefreshMode};
pub use error::{ContextError, ContextResult};
pub use generic::GenericApplicationContext;
pub use loader::{DefinitionLoader, LoaderContext, NoopDefinitionLoader, XmlDefinitionLoader};
pub use settings::ContextSettings;
pub use strategy::{ClassPathStrategy, FileSystemStrategy, ResourceStrategy};
pub use xml::{ClassPathXmlApplicationContext, FileSystemXmlApplicationContext};

// 重新导出下层 crate，使用者只需要依赖 arbor-context
pub use arbor_beans;
pub use arbor_core;
