//! 配置类驱动的上下文
//!
//! 配置类本身注册为一个 Bean，它的每个 Bean 方法变成一个以配置类为
//! 工厂 Bean 的工厂方法定义。组件通过 inventory 在链接期提交，按类名前缀扫描。
//!
//! ```ignore
//! inventory::submit! { ComponentSubmission::new("app::service::UserService") }
//!
//! let context = AnnotationConfigApplicationContext::new(vec![
//!     ConfigurationClass::new("app::AppConfig").bean(BeanMethod::new("user").named("user")),
//! ])?;
//! ```

use std::ops::Deref;
use std::sync::Arc;

use arbor_beans::{
    register_bean_definition_holder, BeanDefinition, BeanDefinitionHolder, BeanDefinitionRegistry,
    BeanResult, DefaultListableBeanFactory, Scope,
};
use arbor_core::utils::naming::{short_name, to_camel_case};

use crate::context::{ApplicationContext, ApplicationContextBuilder};
use crate::error::ContextResult;
use crate::generic::GenericApplicationContext;
use crate::loader::{DefinitionLoader, LoaderContext};

/// 类名对应的默认 Bean 名称：短名的 camelCase
pub fn default_bean_name(class_name: &str) -> String {
    to_camel_case(short_name(class_name))
}

/// 配置类中的一个 Bean 方法
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeanMethod {
    /// 配置类上的工厂方法名
    pub method_name: String,
    /// 第一个为 Bean 名称，其余为别名；为空时使用方法名
    pub names: Vec<String>,
    pub scope: Option<Scope>,
    pub lazy: Option<bool>,
    pub primary: bool,
    pub init_method: Option<String>,
    pub destroy_method: Option<String>,
    pub depends_on: Vec<String>,
}

impl BeanMethod {
    pub fn new(method_name: impl Into<String>) -> Self {
        Self {
            method_name: method_name.into(),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = Some(lazy);
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn init_method(mut self, method: impl Into<String>) -> Self {
        self.init_method = Some(method.into());
        self
    }

    pub fn destroy_method(mut self, method: impl Into<String>) -> Self {
        self.destroy_method = Some(method.into());
        self
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    fn bean_name(&self) -> &str {
        self.names
            .first()
            .map(String::as_str)
            .unwrap_or(&self.method_name)
    }

    fn to_definition(&self, config_bean_name: &str) -> BeanDefinition {
        let mut definition =
            BeanDefinition::new().with_factory_method(Some(config_bean_name), &self.method_name);
        definition.scope = self.scope;
        definition.lazy_init = self.lazy;
        definition.primary = self.primary;
        definition.init_method_name = self.init_method.clone();
        definition.destroy_method_name = self.destroy_method.clone();
        definition.depends_on = self.depends_on.clone();
        definition.description = Some(format!("Bean method '{}' on '{}'", self.method_name, config_bean_name));
        definition
    }
}

/// 配置类描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationClass {
    /// 已注册到 ClassRegistry 的类名
    pub class_name: String,
    /// 未设置时使用类短名的 camelCase
    pub bean_name: Option<String>,
    pub methods: Vec<BeanMethod>,
}

impl ConfigurationClass {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            bean_name: None,
            methods: Vec::new(),
        }
    }

    pub fn named(mut self, bean_name: impl Into<String>) -> Self {
        self.bean_name = Some(bean_name.into());
        self
    }

    pub fn bean(mut self, method: BeanMethod) -> Self {
        self.methods.push(method);
        self
    }

    pub fn bean_name(&self) -> String {
        self.bean_name
            .clone()
            .unwrap_or_else(|| default_bean_name(&self.class_name))
    }
}

/// 组件提交 - 用于 inventory 收集
///
/// ```ignore
/// inventory::submit! { ComponentSubmission::new("app::service::UserService").lazy() }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ComponentSubmission {
    pub class_name: &'static str,
    pub bean_name: Option<&'static str>,
    pub lazy: bool,
    pub scope: Scope,
}

impl ComponentSubmission {
    pub const fn new(class_name: &'static str) -> Self {
        Self {
            class_name,
            bean_name: None,
            lazy: false,
            scope: Scope::Singleton,
        }
    }

    pub const fn named(self, bean_name: &'static str) -> Self {
        Self {
            bean_name: Some(bean_name),
            ..self
        }
    }

    pub const fn lazy(self) -> Self {
        Self { lazy: true, ..self }
    }

    pub const fn prototype(self) -> Self {
        Self {
            scope: Scope::Prototype,
            ..self
        }
    }

    pub fn bean_name(&self) -> String {
        self.bean_name
            .map(String::from)
            .unwrap_or_else(|| default_bean_name(self.class_name))
    }
}

inventory::collect!(ComponentSubmission);

/// 把配置类与组件转换为定义并注册
pub struct AnnotatedBeanDefinitionReader<'r> {
    registry: &'r dyn BeanDefinitionRegistry,
}

impl<'r> AnnotatedBeanDefinitionReader<'r> {
    pub fn new(registry: &'r dyn BeanDefinitionRegistry) -> Self {
        Self { registry }
    }

    /// 注册配置类及其 Bean 方法，返回新注册的定义数量
    pub fn register(&self, configuration: &ConfigurationClass) -> BeanResult<usize> {
        let count_before = self.registry.bean_definition_count();
        let config_bean_name = configuration.bean_name();

        let mut definition = BeanDefinition::of_class(configuration.class_name.as_str());
        definition.description = Some(format!("Configuration class '{}'", configuration.class_name));
        self.registry
            .register_bean_definition(&config_bean_name, definition)?;
        tracing::debug!(
            "Registered configuration class '{}' as bean '{}'",
            configuration.class_name,
            config_bean_name
        );

        for method in &configuration.methods {
            let holder = BeanDefinitionHolder::new(method.to_definition(&config_bean_name), method.bean_name())
                .with_aliases(method.names.iter().skip(1).cloned().collect());
            register_bean_definition_holder(&holder, self.registry)?;
            tracing::trace!("Registered bean method {}", holder);
        }

        Ok(self
            .registry
            .bean_definition_count()
            .saturating_sub(count_before))
    }

    /// 注册单个组件
    pub fn register_component(&self, component: &ComponentSubmission) -> BeanResult<String> {
        let bean_name = component.bean_name();
        let mut definition = BeanDefinition::of_class(component.class_name).with_scope(component.scope);
        if component.lazy {
            definition.lazy_init = Some(true);
        }
        self.registry.register_bean_definition(&bean_name, definition)?;
        tracing::trace!("Registered component '{}' as bean '{}'", component.class_name, bean_name);
        Ok(bean_name)
    }

    /// 注册类名以 `prefix` 开头的所有已提交组件，按类名顺序，返回新注册的定义数量
    pub fn scan(&self, prefix: &str) -> BeanResult<usize> {
        let mut components: Vec<&ComponentSubmission> = inventory::iter::<ComponentSubmission>
            .into_iter()
            .filter(|component| component.class_name.starts_with(prefix))
            .collect();
        components.sort_by_key(|component| component.class_name);

        let count_before = self.registry.bean_definition_count();
        for component in components {
            self.register_component(component)?;
        }
        let count = self
            .registry
            .bean_definition_count()
            .saturating_sub(count_before);
        tracing::debug!("Scanned {} component(s) under '{}'", count, prefix);
        Ok(count)
    }
}

/// 在每次刷新时注册配置类与扫描结果
///
/// 适合可重复刷新的上下文；单次刷新的上下文直接使用
/// [`AnnotationConfigApplicationContext`]。
#[derive(Debug, Clone, Default)]
pub struct AnnotatedDefinitionLoader {
    classes: Vec<ConfigurationClass>,
    scan_prefixes: Vec<String>,
}

impl AnnotatedDefinitionLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, configuration: ConfigurationClass) -> Self {
        self.classes.push(configuration);
        self
    }

    pub fn with_scan(mut self, prefix: impl Into<String>) -> Self {
        self.scan_prefixes.push(prefix.into());
        self
    }
}

impl DefinitionLoader for AnnotatedDefinitionLoader {
    fn load_bean_definitions(
        &self,
        factory: &DefaultListableBeanFactory,
        _ctx: &LoaderContext<'_>,
    ) -> BeanResult<usize> {
        let reader = AnnotatedBeanDefinitionReader::new(factory);
        let mut count = 0;
        for configuration in &self.classes {
            count += reader.register(configuration)?;
        }
        for prefix in &self.scan_prefixes {
            count += reader.scan(prefix)?;
        }
        Ok(count)
    }
}

/// 配置类驱动的上下文，只能刷新一次
pub struct AnnotationConfigApplicationContext {
    context: GenericApplicationContext,
}

impl AnnotationConfigApplicationContext {
    pub const KIND: &'static str = "AnnotationConfigApplicationContext";

    /// 注册配置类并立即刷新
    pub fn new(classes: Vec<ConfigurationClass>) -> ContextResult<Self> {
        let context = Self::from_builder(ApplicationContext::builder())?;
        for configuration in &classes {
            context.register(configuration)?;
        }
        context.refresh()?;
        Ok(context)
    }

    /// 以构建器的设置创建，不刷新
    pub fn from_builder(builder: ApplicationContextBuilder) -> ContextResult<Self> {
        let context = GenericApplicationContext::from_builder_as(builder, Self::KIND)?;
        Ok(Self { context })
    }

    /// 注册一个配置类
    pub fn register(&self, configuration: &ConfigurationClass) -> ContextResult<usize> {
        Ok(AnnotatedBeanDefinitionReader::new(self.context.bean_factory().as_ref()).register(configuration)?)
    }

    /// 扫描类名以 `prefix` 开头的组件
    pub fn scan(&self, prefix: &str) -> ContextResult<usize> {
        Ok(AnnotatedBeanDefinitionReader::new(self.context.bean_factory().as_ref()).scan(prefix)?)
    }
}

impl Deref for AnnotationConfigApplicationContext {
    type Target = GenericApplicationContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}
