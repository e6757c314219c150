use std::sync::Arc;

use arbor_core::Resource;

use crate::definition::{BeanDefinitionHolder, SourceLocation};
use crate::xml::DocumentDefaults;

/// 读取器事件监听器
///
/// 在文档解析过程中接收通知，所有方法默认为空实现
pub trait ReaderEventListener: Send + Sync {
    /// 一个 `<beans>` 层级的默认值已确定
    fn defaults_registered(&self, _defaults: &DocumentDefaults) {}

    /// 一个 Bean 定义（及其别名）已注册
    fn component_registered(&self, _holder: &BeanDefinitionHolder) {}

    /// 一个 `<alias>` 已注册
    fn alias_registered(&self, _name: &str, _alias: &str, _source: &SourceLocation) {}

    /// 一个 `<import>` 已处理完成，`resources` 为实际加载的资源
    fn import_processed(&self, _location: &str, _resources: &[Arc<dyn Resource>], _source: &SourceLocation) {}
}

/// 忽略所有事件
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyReaderEventListener;

impl ReaderEventListener for EmptyReaderEventListener {}
