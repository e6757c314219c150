//! 定义加载器
//!
//! refresh 创建出新的 BeanFactory 之后，由加载器把定义写进去：XML 文档、
//! 配置类，或者什么都不做（定义已经直接注册在工厂里）。

use std::fmt;
use std::sync::Arc;

use arbor_beans::{
    BeanResult, DefaultListableBeanFactory, DocumentHooks, NamespaceHandler, ReaderEventListener,
    XmlBeanDefinitionReader,
};
use arbor_core::Environment;

use crate::strategy::ResourceStrategy;

/// 一次加载所需的上下文
pub struct LoaderContext<'a> {
    pub environment: &'a Arc<Environment>,
    pub strategy: &'a dyn ResourceStrategy,
    /// 已解析占位符的配置位置；为空时使用策略的默认位置
    pub config_locations: &'a [String],
}

impl LoaderContext<'_> {
    /// 实际要加载的位置
    pub fn effective_locations(&self) -> Vec<String> {
        if self.config_locations.is_empty() {
            self.strategy.default_config_locations()
        } else {
            self.config_locations.to_vec()
        }
    }
}

/// 把定义加载到工厂中，返回新注册的定义数量
pub trait DefinitionLoader: Send + Sync {
    fn load_bean_definitions(
        &self,
        factory: &DefaultListableBeanFactory,
        ctx: &LoaderContext<'_>,
    ) -> BeanResult<usize>;
}

/// 不加载任何定义
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDefinitionLoader;

impl DefinitionLoader for NoopDefinitionLoader {
    fn load_bean_definitions(&self, _factory: &DefaultListableBeanFactory, _ctx: &LoaderContext<'_>) -> BeanResult<usize> {
        Ok(0)
    }
}

/// 从 XML 文档加载定义
#[derive(Default)]
pub struct XmlDefinitionLoader {
    listener: Option<Arc<dyn ReaderEventListener>>,
    hooks: Option<Arc<dyn DocumentHooks>>,
    namespace_handlers: Vec<(String, Arc<dyn NamespaceHandler>)>,
}

impl XmlDefinitionLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event_listener(mut self, listener: Arc<dyn ReaderEventListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn with_document_hooks(mut self, hooks: Arc<dyn DocumentHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn with_namespace_handler(
        mut self,
        namespace_uri: impl Into<String>,
        handler: Arc<dyn NamespaceHandler>,
    ) -> Self {
        self.namespace_handlers.push((namespace_uri.into(), handler));
        self
    }

    fn reader<'r>(&self, factory: &'r DefaultListableBeanFactory, ctx: &LoaderContext<'_>) -> XmlBeanDefinitionReader<'r> {
        let mut reader = XmlBeanDefinitionReader::new(factory)
            .with_environment(Arc::clone(ctx.environment))
            .with_resource_loader(ctx.strategy.resource_loader());
        if let Some(listener) = &self.listener {
            reader = reader.with_event_listener(Arc::clone(listener));
        }
        if let Some(hooks) = &self.hooks {
            reader = reader.with_document_hooks(Arc::clone(hooks));
        }
        for (namespace_uri, handler) in &self.namespace_handlers {
            reader = reader.with_namespace_handler(namespace_uri.clone(), Arc::clone(handler));
        }
        reader
    }
}

impl DefinitionLoader for XmlDefinitionLoader {
    fn load_bean_definitions(
        &self,
        factory: &DefaultListableBeanFactory,
        ctx: &LoaderContext<'_>,
    ) -> BeanResult<usize> {
        let locations = ctx.effective_locations();
        tracing::debug!("Loading XML bean definitions from {:?}", locations);
        self.reader(factory, ctx)
            .load_bean_definitions_from_locations(&locations)
    }
}

impl fmt::Debug for XmlDefinitionLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let namespaces: Vec<&str> = self
            .namespace_handlers
            .iter()
            .map(|(uri, _)| uri.as_str())
            .collect();
        f.debug_struct("XmlDefinitionLoader")
            .field("listener", &self.listener.is_some())
            .field("hooks", &self.hooks.is_some())
            .field("namespace_handlers", &namespaces)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::ClassPathStrategy;
    use arbor_beans::{BeanDefinitionRegistry, BeanError, ClassRegistry};
    use arbor_core::ClassPath;
    use std::fs;

    fn factory() -> DefaultListableBeanFactory {
        DefaultListableBeanFactory::new(Arc::new(ClassRegistry::new()))
    }

    #[test]
    fn test_xml_loader_uses_default_location() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("applicationContext.xml"),
            r#"<beans><bean id="user" class="User"/></beans>"#,
        )
        .unwrap();

        let environment = Arc::new(Environment::new());
        let strategy = ClassPathStrategy::new(ClassPath::new([dir.path()]));
        let ctx = LoaderContext {
            environment: &environment,
            strategy: &strategy,
            config_locations: &[],
        };

        let factory = factory();
        let count = XmlDefinitionLoader::new()
            .load_bean_definitions(&factory, &ctx)
            .unwrap();
        assert_eq!(count, 1);
        assert!(factory.contains_bean_definition("user"));
    }

    #[test]
    fn test_xml_loader_reports_missing_location() {
        let dir = tempfile::tempdir().unwrap();
        let environment = Arc::new(Environment::new());
        let strategy = ClassPathStrategy::new(ClassPath::new([dir.path()]));
        let locations = vec!["missing.xml".to_string()];
        let ctx = LoaderContext {
            environment: &environment,
            strategy: &strategy,
            config_locations: &locations,
        };

        let err = XmlDefinitionLoader::new()
            .load_bean_definitions(&factory(), &ctx)
            .unwrap_err();
        assert!(matches!(err, BeanError::Core(_)));
        assert!(err.to_string().contains("missing.xml"));
    }

    #[test]
    fn test_noop_loader() {
        let environment = Arc::new(Environment::new());
        let strategy = ClassPathStrategy::default();
        let ctx = LoaderContext {
            environment: &environment,
            strategy: &strategy,
            config_locations: &[],
        };
        assert_eq!(NoopDefinitionLoader.load_bean_definitions(&factory(), &ctx).unwrap(), 0);
    }
}
