//! 配置位置解析策略
//!
//! 不同的上下文只在"不带协议的路径指向哪里"和"默认加载哪些文档"上有差别，
//! 这两点由 [`ResourceStrategy`] 决定。带协议的位置总是按字面解析。

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use arbor_core::{
    ClassPath, CoreResult, DefaultResourceLoader, FileSystemResourceLoader, Resource, ResourceLoader,
};

use crate::constants::DEFAULT_CONFIG_LOCATION;

/// 位置到资源的解析策略
pub trait ResourceStrategy: Send + Sync + fmt::Debug {
    /// 读取器解析 import 时使用的加载器
    fn resource_loader(&self) -> Arc<dyn ResourceLoader>;

    fn get_resource(&self, location: &str) -> CoreResult<Arc<dyn Resource>> {
        self.resource_loader().get_resource(location)
    }

    /// 没有显式配置位置时加载的文档
    fn default_config_locations(&self) -> Vec<String> {
        vec![DEFAULT_CONFIG_LOCATION.to_string()]
    }
}

/// 类路径策略：裸路径在类路径根目录中查找
#[derive(Debug, Clone)]
pub struct ClassPathStrategy {
    loader: Arc<DefaultResourceLoader>,
}

impl ClassPathStrategy {
    pub fn new(class_path: ClassPath) -> Self {
        Self {
            loader: Arc::new(DefaultResourceLoader::new(class_path)),
        }
    }
}

impl Default for ClassPathStrategy {
    fn default() -> Self {
        Self::new(ClassPath::current_dir())
    }
}

impl ResourceStrategy for ClassPathStrategy {
    fn resource_loader(&self) -> Arc<dyn ResourceLoader> {
        self.loader.clone()
    }
}

/// 文件系统策略：裸路径相对于工作目录（开头的 `/` 被去掉）
#[derive(Debug, Clone)]
pub struct FileSystemStrategy {
    loader: Arc<FileSystemResourceLoader>,
}

impl FileSystemStrategy {
    pub fn new() -> Self {
        Self::with_loader(FileSystemResourceLoader::new(ClassPath::current_dir()))
    }

    /// 以指定目录代替进程工作目录
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self::with_loader(FileSystemResourceLoader::new(ClassPath::current_dir()).with_base_dir(base_dir))
    }

    pub fn with_loader(loader: FileSystemResourceLoader) -> Self {
        Self {
            loader: Arc::new(loader),
        }
    }
}

impl Default for FileSystemStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceStrategy for FileSystemStrategy {
    fn resource_loader(&self) -> Arc<dyn ResourceLoader> {
        self.loader.clone()
    }
}
