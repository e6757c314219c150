//! 基于 XML 文档的可刷新上下文
//!
//! 两者的区别只在于裸路径的含义：类路径根目录，或者工作目录。

use std::ops::Deref;
use std::sync::Arc;

use crate::context::{ApplicationContext, ApplicationContextBuilder, RefreshMode};
use crate::error::ContextResult;
use crate::loader::{DefinitionLoader, XmlDefinitionLoader};
use crate::strategy::{ClassPathStrategy, FileSystemStrategy, ResourceStrategy};

fn xml_context(
    builder: ApplicationContextBuilder,
    kind: &'static str,
    strategy: fn() -> Arc<dyn ResourceStrategy>,
) -> ContextResult<ApplicationContext> {
    builder
        .kind(kind)
        .refresh_mode(RefreshMode::Repeatable)
        .strategy_or(strategy)
        .loader_or(|| -> Arc<dyn DefinitionLoader> { Arc::new(XmlDefinitionLoader::new()) })
        .build()
}

/// 从类路径加载 XML 文档的上下文
#[derive(Debug)]
pub struct ClassPathXmlApplicationContext {
    context: ApplicationContext,
}

impl ClassPathXmlApplicationContext {
    pub const KIND: &'static str = "ClassPathXmlApplicationContext";

    /// 创建并立即刷新
    pub fn new<S: AsRef<str>>(config_locations: &[S]) -> ContextResult<Self> {
        let context = Self::from_builder(ApplicationContext::builder().config_locations(config_locations))?;
        context.refresh()?;
        Ok(context)
    }

    /// 以构建器的设置创建，不刷新
    ///
    /// 未设置策略时使用以工作目录为根的类路径。
    pub fn from_builder(builder: ApplicationContextBuilder) -> ContextResult<Self> {
        let context = xml_context(builder, Self::KIND, || -> Arc<dyn ResourceStrategy> {
            Arc::new(ClassPathStrategy::default())
        })?;
        Ok(Self { context })
    }
}

impl Deref for ClassPathXmlApplicationContext {
    type Target = ApplicationContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

/// 从文件系统加载 XML 文档的上下文
#[derive(Debug)]
pub struct FileSystemXmlApplicationContext {
    context: ApplicationContext,
}

impl FileSystemXmlApplicationContext {
    pub const KIND: &'static str = "FileSystemXmlApplicationContext";

    /// 创建并立即刷新
    pub fn new<S: AsRef<str>>(config_locations: &[S]) -> ContextResult<Self> {
        let context = Self::from_builder(ApplicationContext::builder().config_locations(config_locations))?;
        context.refresh()?;
        Ok(context)
    }

    /// 以构建器的设置创建，不刷新
    ///
    /// 未设置策略时裸路径相对于进程工作目录。
    pub fn from_builder(builder: ApplicationContextBuilder) -> ContextResult<Self> {
        let context = xml_context(builder, Self::KIND, || -> Arc<dyn ResourceStrategy> {
            Arc::new(FileSystemStrategy::default())
        })?;
        Ok(Self { context })
    }
}

impl Deref for FileSystemXmlApplicationContext {
    type Target = ApplicationContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}
