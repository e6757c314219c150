use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use arbor_beans::{
    BeanError, BeanFactory, BeanFactoryPostProcessor, BeanPostProcessor, BeanResult,
    BeanDefinitionRegistry, ClassRegistry, DefaultListableBeanFactory, SharedInstance,
};
use arbor_core::utils::strings::tokenize;
use arbor_core::{CoreResult, Environment, Resource};
use parking_lot::{Mutex, RwLock};

use crate::constants::{CONFIG_LOCATION_DELIMITERS, ENVIRONMENT_BEAN_NAME};
use crate::error::{BoxError, ContextError, ContextResult};
use crate::loader::{DefinitionLoader, LoaderContext, NoopDefinitionLoader};
use crate::settings::ContextSettings;
use crate::strategy::{ClassPathStrategy, ResourceStrategy};

/// 未指定 ID 的上下文使用的序号
static CONTEXT_COUNTER: AtomicUsize = AtomicUsize::new(0);

const NOT_ACTIVE_MESSAGE: &str =
    "BeanFactory not initialized or already closed - call 'refresh' before accessing beans via the ApplicationContext";

/// 上下文生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// 尚未成功刷新（或刷新失败）
    Uninitialized,
    Active,
    Closed,
}

/// 刷新模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// 只允许刷新一次，工厂在构造时创建，刷新前即可注册定义
    Once,
    /// 每次刷新都销毁旧工厂并重新加载
    Repeatable,
}

/// 应用上下文
///
/// 持有 Environment、类描述符和当前激活的 BeanFactory。不同的上下文类型只是
/// [`ResourceStrategy`]、[`DefinitionLoader`] 与 [`RefreshMode`] 的不同组合。
pub struct ApplicationContext {
    /// 上下文类型名称（用于日志和错误信息）
    kind: &'static str,

    id: RwLock<String>,

    display_name: RwLock<String>,

    mode: RefreshMode,

    environment: Arc<Environment>,

    /// 所有工厂共享的类描述符
    classes: Arc<ClassRegistry>,

    strategy: Arc<dyn ResourceStrategy>,

    loader: Arc<dyn DefinitionLoader>,

    /// 已解析占位符的配置位置
    config_locations: RwLock<Vec<String>>,

    allow_bean_definition_overriding: RwLock<Option<bool>>,

    allow_circular_references: RwLock<Option<bool>>,

    /// 当前发布的工厂
    bean_factory: RwLock<Option<Arc<DefaultListableBeanFactory>>>,

    state: RwLock<ContextState>,

    /// 单次刷新模式下是否已经刷新过
    refreshed: AtomicBool,

    /// 串行化 refresh 与 close
    startup_shutdown_monitor: Mutex<()>,

    /// Bean 工厂后置处理器列表（按优先级排序）
    bean_factory_post_processors: RwLock<Vec<Arc<dyn BeanFactoryPostProcessor>>>,

    /// 刷新时交给工厂的 Bean 后置处理器
    bean_post_processors: RwLock<Vec<Arc<dyn BeanPostProcessor>>>,
}

impl ApplicationContext {
    /// 构建器模式创建上下文
    pub fn builder() -> ApplicationContextBuilder {
        ApplicationContextBuilder::new()
    }

    // ========== Identity ==========

    pub fn id(&self) -> String {
        self.id.read().clone()
    }

    pub fn set_id(&self, id: impl Into<String>) {
        *self.id.write() = id.into();
    }

    pub fn display_name(&self) -> String {
        self.display_name.read().clone()
    }

    pub fn set_display_name(&self, name: impl Into<String>) {
        *self.display_name.write() = name.into();
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn refresh_mode(&self) -> RefreshMode {
        self.mode
    }

    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    pub fn classes(&self) -> &Arc<ClassRegistry> {
        &self.classes
    }

    pub fn strategy(&self) -> &Arc<dyn ResourceStrategy> {
        &self.strategy
    }

    pub fn state(&self) -> ContextState {
        *self.state.read()
    }

    pub fn is_active(&self) -> bool {
        self.state() == ContextState::Active
    }

    // ========== Configuration ==========

    /// 设置配置位置，多个位置可以用 `,; \t\n` 分隔
    pub fn set_config_location(&self, location: &str) -> ContextResult<()> {
        self.set_config_locations(&tokenize(location, CONFIG_LOCATION_DELIMITERS))
    }

    /// 设置配置位置，`${...}` 占位符按 Environment 解析
    pub fn set_config_locations<S: AsRef<str>>(&self, locations: &[S]) -> ContextResult<()> {
        let resolved = resolve_locations(&self.environment, locations)?;
        tracing::debug!("Config locations of {} set to {:?}", self.display_name(), resolved);
        *self.config_locations.write() = resolved;
        Ok(())
    }

    /// 实际加载的配置位置；未设置时为策略的默认位置
    pub fn config_locations(&self) -> Vec<String> {
        let locations = self.config_locations.read();
        if locations.is_empty() {
            self.strategy.default_config_locations()
        } else {
            locations.clone()
        }
    }

    pub fn set_allow_bean_definition_overriding(&self, allow: bool) {
        *self.allow_bean_definition_overriding.write() = Some(allow);
        if let Some(factory) = self.bean_factory.read().as_ref() {
            factory.set_allow_bean_definition_overriding(allow);
        }
    }

    pub fn set_allow_circular_references(&self, allow: bool) {
        *self.allow_circular_references.write() = Some(allow);
        if let Some(factory) = self.bean_factory.read().as_ref() {
            factory.set_allow_circular_references(allow);
        }
    }

    /// 注册 BeanFactoryPostProcessor
    ///
    /// 在定义加载后、单例预实例化之前执行，按优先级顺序执行
    pub fn add_bean_factory_post_processor(&self, processor: Arc<dyn BeanFactoryPostProcessor>) {
        let mut processors = self.bean_factory_post_processors.write();
        let order = processor.order();
        processors.push(processor);
        // 按优先级排序（order 越小优先级越高）
        processors.sort_by_key(|p| p.order());
        tracing::debug!("Registered BeanFactoryPostProcessor with order {}", order);
    }

    pub fn bean_factory_post_processors(&self) -> Vec<Arc<dyn BeanFactoryPostProcessor>> {
        self.bean_factory_post_processors.read().clone()
    }

    /// 注册 BeanPostProcessor，下一次刷新时交给工厂
    pub fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        self.bean_post_processors.write().push(processor);
    }

    /// 按当前策略解析资源位置
    pub fn get_resource(&self, location: &str) -> CoreResult<Arc<dyn Resource>> {
        self.strategy.get_resource(location)
    }

    // ========== Bean factory access ==========

    /// 获取内部的 BeanFactory
    ///
    /// 单次刷新的上下文在构造时就拥有工厂；可重复刷新的上下文只在
    /// 刷新成功之后、关闭之前拥有工厂。
    pub fn get_bean_factory(&self) -> ContextResult<Arc<DefaultListableBeanFactory>> {
        self.bean_factory
            .read()
            .clone()
            .ok_or_else(|| ContextError::IllegalState(NOT_ACTIVE_MESSAGE.to_string()))
    }

    /// 状态与工厂在同一个读锁下取得
    ///
    /// refresh 与 close 在状态写锁下撤下工厂之后才销毁其中的单例。
    fn active_bean_factory(&self) -> BeanResult<Arc<DefaultListableBeanFactory>> {
        let state = self.state.read();
        match self.bean_factory.read().clone() {
            Some(factory) if *state == ContextState::Active => Ok(factory),
            _ => Err(BeanError::IllegalState(NOT_ACTIVE_MESSAGE.to_string())),
        }
    }

    pub fn get_aliases(&self, name: &str) -> ContextResult<Vec<String>> {
        Ok(self.active_bean_factory()?.get_aliases(name))
    }

    pub fn bean_definition_names(&self) -> ContextResult<Vec<String>> {
        Ok(self.active_bean_factory()?.bean_definition_names())
    }

    pub fn bean_definition_count(&self) -> ContextResult<usize> {
        Ok(self.active_bean_factory()?.bean_definition_count())
    }

    pub fn contains_bean_definition(&self, name: &str) -> bool {
        self.active_bean_factory()
            .map(|factory| factory.contains_bean_definition(name))
            .unwrap_or(false)
    }

    // ========== Lifecycle ==========

    /// 加载定义并预实例化所有非延迟单例
    ///
    /// 失败时新工厂中已创建的单例会被销毁，上下文保持未激活。
    pub fn refresh(&self) -> ContextResult<()> {
        if self.mode == RefreshMode::Once
            && self
                .refreshed
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
        {
            return Err(ContextError::IllegalState(format!(
                "{} does not support multiple refresh attempts: just call 'refresh' once",
                self.kind
            )));
        }

        let _monitor = self.startup_shutdown_monitor.lock();
        tracing::info!("Refreshing {}", self.display_name());

        let factory = match self.mode {
            RefreshMode::Once => self.get_bean_factory()?,
            RefreshMode::Repeatable => {
                let previous = {
                    let mut state = self.state.write();
                    if *state == ContextState::Active {
                        *state = ContextState::Uninitialized;
                    }
                    self.bean_factory.write().take()
                };
                if let Some(previous) = previous {
                    tracing::debug!("Destroying bean factory of previous refresh of {}", self.display_name());
                    previous.destroy_singletons();
                    previous.set_serialization_id(None);
                }
                Arc::new(DefaultListableBeanFactory::new(Arc::clone(&self.classes)))
            }
        };

        match self.prepare_bean_factory(&factory) {
            Ok(count) => {
                {
                    let mut state = self.state.write();
                    if self.mode == RefreshMode::Repeatable {
                        *self.bean_factory.write() = Some(factory);
                    }
                    *state = ContextState::Active;
                }
                tracing::info!(
                    "Refreshed {} with {} bean definition(s) loaded",
                    self.display_name(),
                    count
                );
                Ok(())
            }
            Err(source) => {
                tracing::warn!(
                    "Exception encountered during context initialization - cancelling refresh attempt: {}",
                    source
                );
                factory.destroy_singletons();
                factory.set_serialization_id(None);
                self.set_state_if(ContextState::Active, ContextState::Uninitialized);
                Err(ContextError::Initialization {
                    context: self.display_name(),
                    source,
                })
            }
        }
    }

    /// 定制工厂、加载定义、执行后置处理器并预实例化单例
    fn prepare_bean_factory(&self, factory: &DefaultListableBeanFactory) -> Result<usize, BoxError> {
        factory.set_serialization_id(Some(self.id()));
        if let Some(allow) = *self.allow_bean_definition_overriding.read() {
            factory.set_allow_bean_definition_overriding(allow);
        }
        if let Some(allow) = *self.allow_circular_references.read() {
            factory.set_allow_circular_references(allow);
        }

        let locations = self.config_locations.read().clone();
        let loader_ctx = LoaderContext {
            environment: &self.environment,
            strategy: self.strategy.as_ref(),
            config_locations: &locations,
        };
        let count = self.loader.load_bean_definitions(factory, &loader_ctx)?;

        if !factory.contains_singleton(ENVIRONMENT_BEAN_NAME)
            && !factory.contains_bean_definition(ENVIRONMENT_BEAN_NAME)
        {
            let environment: SharedInstance = self.environment.clone();
            factory.register_singleton(ENVIRONMENT_BEAN_NAME, environment)?;
        }

        for processor in self.bean_post_processors.read().iter() {
            factory.add_bean_post_processor(Arc::clone(processor));
        }

        self.invoke_bean_factory_post_processors(factory)?;

        factory.preinstantiate_singletons()?;
        Ok(count)
    }

    /// 调用所有 BeanFactoryPostProcessor
    fn invoke_bean_factory_post_processors(&self, factory: &DefaultListableBeanFactory) -> Result<(), BoxError> {
        let processors = self.bean_factory_post_processors();
        if processors.is_empty() {
            tracing::debug!("No BeanFactoryPostProcessors to invoke");
            return Ok(());
        }

        tracing::debug!("Invoking {} BeanFactoryPostProcessor(s)", processors.len());
        for processor in processors {
            processor.post_process_bean_factory(factory).map_err(|e| {
                e.context(format!("BeanFactoryPostProcessor '{}' failed", processor.name()))
            })?;
        }
        Ok(())
    }

    /// 关闭上下文，销毁所有单例；重复调用无效果
    pub fn close(&self) {
        let _monitor = self.startup_shutdown_monitor.lock();
        if self.state() == ContextState::Closed {
            return;
        }
        tracing::info!("Closing {}", self.display_name());

        let factory = {
            let mut state = self.state.write();
            *state = ContextState::Closed;
            match self.mode {
                RefreshMode::Once => self.bean_factory.read().clone(),
                RefreshMode::Repeatable => self.bean_factory.write().take(),
            }
        };
        if let Some(factory) = factory {
            factory.destroy_singletons();
            factory.set_serialization_id(None);
        }
    }

    fn set_state_if(&self, expected: ContextState, next: ContextState) {
        let mut state = self.state.write();
        if *state == expected {
            *state = next;
        }
    }
}

impl BeanFactory for ApplicationContext {
    fn get_bean(&self, name: &str) -> BeanResult<SharedInstance> {
        self.active_bean_factory()?.get_bean(name)
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.active_bean_factory()
            .map(|factory| factory.contains_bean(name))
            .unwrap_or(false)
    }

    fn is_singleton(&self, name: &str) -> BeanResult<bool> {
        self.active_bean_factory()?.is_singleton(name)
    }

    fn is_prototype(&self, name: &str) -> BeanResult<bool> {
        self.active_bean_factory()?.is_prototype(name)
    }

    fn type_name_of(&self, name: &str) -> Option<String> {
        self.active_bean_factory().ok()?.type_name_of(name)
    }
}

impl fmt::Debug for ApplicationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationContext")
            .field("kind", &self.kind)
            .field("id", &self.id())
            .field("mode", &self.mode)
            .field("state", &self.state())
            .field("strategy", &self.strategy)
            .finish()
    }
}

impl fmt::Display for ApplicationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

fn resolve_locations<S: AsRef<str>>(environment: &Environment, locations: &[S]) -> ContextResult<Vec<String>> {
    locations
        .iter()
        .map(|location| {
            environment
                .resolve_required_placeholders(location.as_ref().trim())
                .map_err(ContextError::from)
        })
        .collect()
}

/// ApplicationContext 构建器
pub struct ApplicationContextBuilder {
    kind: &'static str,
    id: Option<String>,
    display_name: Option<String>,
    mode: RefreshMode,
    environment: Option<Arc<Environment>>,
    classes: Option<Arc<ClassRegistry>>,
    strategy: Option<Arc<dyn ResourceStrategy>>,
    loader: Option<Arc<dyn DefinitionLoader>>,
    bean_factory: Option<Arc<DefaultListableBeanFactory>>,
    config_locations: Vec<String>,
    active_profiles: Vec<String>,
    allow_bean_definition_overriding: Option<bool>,
    allow_circular_references: Option<bool>,
    bean_factory_post_processors: Vec<Arc<dyn BeanFactoryPostProcessor>>,
    bean_post_processors: Vec<Arc<dyn BeanPostProcessor>>,
}

impl ApplicationContextBuilder {
    /// 默认：可重复刷新、类路径策略、不加载任何定义
    pub fn new() -> Self {
        Self {
            kind: "ApplicationContext",
            id: None,
            display_name: None,
            mode: RefreshMode::Repeatable,
            environment: None,
            classes: None,
            strategy: None,
            loader: None,
            bean_factory: None,
            config_locations: Vec::new(),
            active_profiles: Vec::new(),
            allow_bean_definition_overriding: None,
            allow_circular_references: None,
            bean_factory_post_processors: Vec::new(),
            bean_post_processors: Vec::new(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn kind(mut self, kind: &'static str) -> Self {
        self.kind = kind;
        self
    }

    pub fn refresh_mode(mut self, mode: RefreshMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn environment(mut self, environment: Arc<Environment>) -> Self {
        self.environment = Some(environment);
        self
    }

    /// 类描述符；未设置时加载所有通过 inventory 提交的类
    pub fn classes(mut self, classes: Arc<ClassRegistry>) -> Self {
        self.classes = Some(classes);
        self
    }

    pub fn strategy(mut self, strategy: Arc<dyn ResourceStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn loader(mut self, loader: Arc<dyn DefinitionLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// 已设置的类描述符，未设置时加载所有通过 inventory 提交的类
    pub(crate) fn classes_or_submitted(&self) -> Arc<ClassRegistry> {
        self.classes
            .clone()
            .unwrap_or_else(|| Arc::new(ClassRegistry::with_submitted()))
    }

    /// 未显式设置策略时使用的策略
    pub(crate) fn strategy_or(mut self, strategy: impl FnOnce() -> Arc<dyn ResourceStrategy>) -> Self {
        self.strategy.get_or_insert_with(strategy);
        self
    }

    /// 未显式设置加载器时使用的加载器
    pub(crate) fn loader_or(mut self, loader: impl FnOnce() -> Arc<dyn DefinitionLoader>) -> Self {
        self.loader.get_or_insert_with(loader);
        self
    }

    pub(crate) fn bean_factory(mut self, factory: Arc<DefaultListableBeanFactory>) -> Self {
        self.bean_factory = Some(factory);
        self
    }

    pub fn config_location(mut self, location: &str) -> Self {
        self.config_locations
            .extend(tokenize(location, CONFIG_LOCATION_DELIMITERS));
        self
    }

    pub fn config_locations<S: AsRef<str>>(mut self, locations: &[S]) -> Self {
        self.config_locations
            .extend(locations.iter().map(|l| l.as_ref().to_string()));
        self
    }

    pub fn active_profile(mut self, profile: impl Into<String>) -> Self {
        self.active_profiles.push(profile.into());
        self
    }

    pub fn allow_bean_definition_overriding(mut self, allow: bool) -> Self {
        self.allow_bean_definition_overriding = Some(allow);
        self
    }

    pub fn allow_circular_references(mut self, allow: bool) -> Self {
        self.allow_circular_references = Some(allow);
        self
    }

    /// 应用配置文件中的设置，显式设置过的值会被覆盖
    pub fn settings(mut self, settings: ContextSettings) -> Self {
        if let Some(id) = settings.id {
            self.id = Some(id);
        }
        if let Some(allow) = settings.allow_bean_definition_overriding {
            self.allow_bean_definition_overriding = Some(allow);
        }
        if let Some(allow) = settings.allow_circular_references {
            self.allow_circular_references = Some(allow);
        }
        self.config_locations.extend(settings.config_locations);
        self.active_profiles.extend(settings.active_profiles);
        self
    }

    pub fn bean_factory_post_processor(mut self, processor: Arc<dyn BeanFactoryPostProcessor>) -> Self {
        self.bean_factory_post_processors.push(processor);
        self
    }

    pub fn bean_post_processor(mut self, processor: Arc<dyn BeanPostProcessor>) -> Self {
        self.bean_post_processors.push(processor);
        self
    }

    /// 构建上下文（不刷新）
    pub fn build(mut self) -> ContextResult<ApplicationContext> {
        let environment = self
            .environment
            .get_or_insert_with(|| Arc::new(Environment::standard()));
        if !self.active_profiles.is_empty() {
            environment.set_active_profiles(self.active_profiles.drain(..));
        }
        let config_locations = resolve_locations(&**environment, &self.config_locations)?;
        Ok(self.build_with_locations(config_locations))
    }

    /// 以已经解析好的配置位置构建
    pub(crate) fn build_with_locations(self, config_locations: Vec<String>) -> ApplicationContext {
        let environment = self
            .environment
            .unwrap_or_else(|| Arc::new(Environment::standard()));
        if !self.active_profiles.is_empty() {
            environment.set_active_profiles(self.active_profiles);
        }

        let classes = self
            .classes
            .unwrap_or_else(|| Arc::new(ClassRegistry::with_submitted()));

        let bean_factory = match (self.mode, self.bean_factory) {
            (_, Some(factory)) => Some(factory),
            (RefreshMode::Once, None) => Some(Arc::new(DefaultListableBeanFactory::new(Arc::clone(&classes)))),
            (RefreshMode::Repeatable, None) => None,
        };
        if let Some(factory) = &bean_factory {
            if let Some(allow) = self.allow_bean_definition_overriding {
                factory.set_allow_bean_definition_overriding(allow);
            }
            if let Some(allow) = self.allow_circular_references {
                factory.set_allow_circular_references(allow);
            }
        }

        let id = self.id.unwrap_or_else(|| {
            format!("{}@{}", self.kind, CONTEXT_COUNTER.fetch_add(1, Ordering::Relaxed))
        });
        let display_name = self.display_name.unwrap_or_else(|| id.clone());

        let mut bean_factory_post_processors = self.bean_factory_post_processors;
        bean_factory_post_processors.sort_by_key(|p| p.order());

        tracing::debug!("Created {} '{}' ({:?})", self.kind, id, self.mode);

        ApplicationContext {
            kind: self.kind,
            id: RwLock::new(id),
            display_name: RwLock::new(display_name),
            mode: self.mode,
            environment,
            classes,
            strategy: self
                .strategy
                .unwrap_or_else(|| Arc::new(ClassPathStrategy::default())),
            loader: self.loader.unwrap_or_else(|| Arc::new(NoopDefinitionLoader)),
            config_locations: RwLock::new(config_locations),
            allow_bean_definition_overriding: RwLock::new(self.allow_bean_definition_overriding),
            allow_circular_references: RwLock::new(self.allow_circular_references),
            bean_factory: RwLock::new(bean_factory),
            state: RwLock::new(ContextState::Uninitialized),
            refreshed: AtomicBool::new(false),
            startup_shutdown_monitor: Mutex::new(()),
            bean_factory_post_processors: RwLock::new(bean_factory_post_processors),
            bean_post_processors: RwLock::new(self.bean_post_processors),
        }
    }
}

impl Default for ApplicationContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
