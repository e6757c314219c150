use std::ops::Deref;
use std::sync::Arc;

use arbor_beans::{
    BeanDefinition, BeanDefinitionRegistry, BeanResult, ClassRegistry, DefaultListableBeanFactory,
    XmlBeanDefinitionReader,
};
use arbor_core::{ByteArrayResource, Resource};

use crate::context::{ApplicationContext, ApplicationContextBuilder, RefreshMode};
use crate::error::ContextResult;

/// 通用上下文
///
/// 工厂在构造时创建，刷新之前就可以直接注册定义或加载 XML；只能刷新一次。
pub struct GenericApplicationContext {
    context: ApplicationContext,
    bean_factory: Arc<DefaultListableBeanFactory>,
}

impl GenericApplicationContext {
    pub const KIND: &'static str = "GenericApplicationContext";

    /// 使用所有通过 inventory 提交的类
    pub fn new() -> Self {
        Self::with_classes(Arc::new(ClassRegistry::with_submitted()))
    }

    pub fn with_classes(classes: Arc<ClassRegistry>) -> Self {
        let builder = ApplicationContext::builder().classes(classes);
        Self::assemble(builder, Self::KIND, |builder| Ok(builder.build_with_locations(Vec::new())))
            .unwrap_or_else(|never: std::convert::Infallible| match never {})
    }

    /// 以构建器的设置创建（配置位置会被忽略）
    pub fn from_builder(builder: ApplicationContextBuilder) -> ContextResult<Self> {
        Self::from_builder_as(builder, Self::KIND)
    }

    pub(crate) fn from_builder_as(builder: ApplicationContextBuilder, kind: &'static str) -> ContextResult<Self> {
        Self::assemble(builder, kind, ApplicationContextBuilder::build)
    }

    fn assemble<E>(
        builder: ApplicationContextBuilder,
        kind: &'static str,
        build: impl FnOnce(ApplicationContextBuilder) -> Result<ApplicationContext, E>,
    ) -> Result<Self, E> {
        let builder = builder.kind(kind).refresh_mode(RefreshMode::Once);
        let classes = builder.classes_or_submitted();
        let bean_factory = Arc::new(DefaultListableBeanFactory::new(Arc::clone(&classes)));
        let context = build(builder.classes(classes).bean_factory(Arc::clone(&bean_factory)))?;
        Ok(Self { context, bean_factory })
    }

    /// 内部的 BeanFactory，任何时候都可用
    pub fn bean_factory(&self) -> &Arc<DefaultListableBeanFactory> {
        &self.bean_factory
    }

    pub fn context(&self) -> &ApplicationContext {
        &self.context
    }

    fn xml_reader(&self) -> XmlBeanDefinitionReader<'_> {
        XmlBeanDefinitionReader::new(self.bean_factory.as_ref())
            .with_environment(Arc::clone(self.context.environment()))
            .with_resource_loader(self.context.strategy().resource_loader())
    }

    /// 从资源加载 XML 定义，返回新注册的定义数量
    pub fn load_xml(&self, resource: Arc<dyn Resource>) -> ContextResult<usize> {
        Ok(self.xml_reader().load_bean_definitions(resource)?)
    }

    /// 从位置加载 XML 定义，`${...}` 占位符按 Environment 解析
    pub fn load_xml_locations<S: AsRef<str>>(&self, locations: &[S]) -> ContextResult<usize> {
        let mut resolved = Vec::with_capacity(locations.len());
        for location in locations {
            resolved.push(
                self.context
                    .environment()
                    .resolve_required_placeholders(location.as_ref().trim())?,
            );
        }
        Ok(self.xml_reader().load_bean_definitions_from_locations(&resolved)?)
    }

    /// 从内存中的文档加载 XML 定义
    pub fn load_xml_str(&self, content: &str, description: &str) -> ContextResult<usize> {
        self.load_xml(Arc::new(ByteArrayResource::new(content.as_bytes(), description)))
    }
}

impl Default for GenericApplicationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for GenericApplicationContext {
    type Target = ApplicationContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

impl BeanDefinitionRegistry for GenericApplicationContext {
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> BeanResult<()> {
        self.bean_factory.register_bean_definition(name, definition)
    }

    fn remove_bean_definition(&self, name: &str) -> BeanResult<()> {
        self.bean_factory.remove_bean_definition(name)
    }

    fn get_bean_definition(&self, name: &str) -> BeanResult<Arc<BeanDefinition>> {
        self.bean_factory.get_bean_definition(name)
    }

    fn contains_bean_definition(&self, name: &str) -> bool {
        self.bean_factory.contains_bean_definition(name)
    }

    fn bean_definition_names(&self) -> Vec<String> {
        self.bean_factory.bean_definition_names()
    }

    fn bean_definition_count(&self) -> usize {
        self.bean_factory.bean_definition_count()
    }

    fn register_alias(&self, name: &str, alias: &str) -> BeanResult<()> {
        self.bean_factory.register_alias(name, alias)
    }

    fn remove_alias(&self, alias: &str) -> BeanResult<()> {
        self.bean_factory.remove_alias(alias)
    }

    fn is_alias(&self, name: &str) -> bool {
        self.bean_factory.is_alias(name)
    }

    fn get_aliases(&self, name: &str) -> Vec<String> {
        self.bean_factory.get_aliases(name)
    }

    fn is_bean_name_in_use(&self, name: &str) -> bool {
        self.bean_factory.is_bean_name_in_use(name)
    }
}
