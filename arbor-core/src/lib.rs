// arbor-core: 容器的基础设施层
//
// 提供与 Bean 无关的公共能力：
// - Environment：属性源、占位符解析、profile 判定
// - Resource / ResourceLoader：配置文档的字节来源
// - 日志初始化
// - 命名与路径工具

pub mod config;
pub mod error;
pub mod logging;
pub mod resource;
pub mod utils;

// 重新导出常用类型
pub use config::{
    ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource, PropertySource,
    TomlPropertySource, ACTIVE_PROFILES_PROPERTY, DEFAULT_PROFILES_PROPERTY,
    RESERVED_DEFAULT_PROFILE,
};
pub use error::{CoreError, CoreResult};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use resource::{
    is_url, ByteArrayResource, ClassPath, ClassPathResource, DefaultResourceLoader,
    FileSystemResource, FileSystemResourceLoader, Resource, ResourceLoader, UrlResource,
    CLASSPATH_URL_PREFIX, FILE_URL_PREFIX,
};
