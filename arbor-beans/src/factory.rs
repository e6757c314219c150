//! Bean Factory - 定义注册表 + 实例化引擎 + 单例注册表
//!
//! [`DefaultListableBeanFactory`] 持有原始定义（按注册顺序）、惰性计算并缓存的
//! 合并定义、别名表以及按创建顺序记录的单例。

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{ReentrantMutex, RwLock};

use crate::alias::AliasRegistry;
use crate::class::{Arguments, BeanClass, ClassRegistry, DestroyMethod, Instance, ResolvedValue, SharedInstance};
use crate::definition::{AutowireMode, BeanDefinition, BeanValue};
use crate::error::{BeanError, BeanResult};
use crate::lifecycle::BeanPostProcessor;
use crate::registry::BeanDefinitionRegistry;
use crate::utils::dependency::{CreationGuard, CreationTracker};

/// BeanFactory - 最基础的容器接口
///
/// 注意：此 trait 不包含泛型方法，因此可以作为 trait object 使用
pub trait BeanFactory: Send + Sync {
    /// 通过名称或别名获取 Bean
    fn get_bean(&self, name: &str) -> BeanResult<SharedInstance>;

    /// 是否包含指定名称（或别名）的定义或单例
    fn contains_bean(&self, name: &str) -> bool;

    fn is_singleton(&self, name: &str) -> BeanResult<bool>;

    fn is_prototype(&self, name: &str) -> BeanResult<bool>;

    /// Bean 的类名（用于诊断）
    fn type_name_of(&self, name: &str) -> Option<String>;
}

/// BeanFactoryExt - BeanFactory 的扩展 trait
///
/// 提供泛型方法，不能作为 trait object 使用
pub trait BeanFactoryExt: BeanFactory {
    /// 获取并向下转型
    fn get_bean_typed<T: Any + Send + Sync>(&self, name: &str) -> BeanResult<Arc<T>> {
        self.get_bean(name)?
            .downcast::<T>()
            .map_err(|_| BeanError::BeanNotOfRequiredType {
                name: name.to_string(),
                expected: std::any::type_name::<T>().to_string(),
                actual: self.type_name_of(name).unwrap_or_else(|| "unknown".to_string()),
            })
    }
}

impl<F: BeanFactory + ?Sized> BeanFactoryExt for F {}

/// 一个带销毁方法的单例
struct DisposableBean {
    instance: SharedInstance,
    method: String,
    destroy: DestroyMethod,
}

impl DisposableBean {
    fn destroy(&self, bean_name: &str) {
        tracing::trace!("Invoking destroy method '{}' on bean with name '{}'", self.method, bean_name);
        if let Err(e) = (self.destroy)(self.instance.as_ref()) {
            tracing::warn!(
                "Destroy method '{}' on bean with name '{}' failed: {:#}",
                self.method,
                bean_name,
                e
            );
        }
    }
}

fn instance_type_id(instance: &(dyn Any + Send + Sync)) -> TypeId {
    instance.type_id()
}

/// DefaultListableBeanFactory - 定义注册表与实例化引擎的默认实现
pub struct DefaultListableBeanFactory {
    /// 序列化 ID（通常等于上下文 ID）
    serialization_id: RwLock<Option<String>>,

    /// 类描述符
    classes: Arc<ClassRegistry>,

    /// 原始定义，按注册顺序
    definitions: RwLock<IndexMap<String, Arc<BeanDefinition>>>,

    /// 合并定义缓存，任何定义变更都会清空
    merged_definitions: RwLock<HashMap<String, Arc<BeanDefinition>>>,

    aliases: AliasRegistry,

    /// 单例缓存，按创建完成顺序
    singletons: RwLock<IndexMap<String, SharedInstance>>,

    /// 需要销毁回调的单例，按创建完成顺序
    disposable_beans: RwLock<IndexMap<String, DisposableBean>>,

    /// 串行化实例创建；同一线程内的递归依赖可以重入
    creation_lock: ReentrantMutex<()>,

    /// 循环依赖检测
    creation_tracker: CreationTracker,

    /// Bean 后置处理器列表（按优先级排序）
    bean_post_processors: RwLock<Vec<Arc<dyn BeanPostProcessor>>>,

    allow_bean_definition_overriding: AtomicBool,

    allow_circular_references: AtomicBool,

    singletons_currently_in_destruction: AtomicBool,
}

impl DefaultListableBeanFactory {
    /// 创建新的 Bean 工厂
    pub fn new(classes: Arc<ClassRegistry>) -> Self {
        Self {
            serialization_id: RwLock::new(None),
            classes,
            definitions: RwLock::new(IndexMap::new()),
            merged_definitions: RwLock::new(HashMap::new()),
            aliases: AliasRegistry::new(),
            singletons: RwLock::new(IndexMap::new()),
            disposable_beans: RwLock::new(IndexMap::new()),
            creation_lock: ReentrantMutex::new(()),
            creation_tracker: CreationTracker::new(),
            bean_post_processors: RwLock::new(Vec::new()),
            allow_bean_definition_overriding: AtomicBool::new(true),
            allow_circular_references: AtomicBool::new(true),
            singletons_currently_in_destruction: AtomicBool::new(false),
        }
    }

    pub fn classes(&self) -> &Arc<ClassRegistry> {
        &self.classes
    }

    pub fn serialization_id(&self) -> Option<String> {
        self.serialization_id.read().clone()
    }

    pub fn set_serialization_id(&self, id: Option<String>) {
        *self.serialization_id.write() = id;
    }

    fn display_id(&self) -> String {
        self.serialization_id()
            .unwrap_or_else(|| "DefaultListableBeanFactory".to_string())
    }

    pub fn set_allow_bean_definition_overriding(&self, allow: bool) {
        self.allow_bean_definition_overriding.store(allow, Ordering::Release);
    }

    pub fn is_allow_bean_definition_overriding(&self) -> bool {
        self.allow_bean_definition_overriding.load(Ordering::Acquire)
    }

    /// 记录循环引用策略
    ///
    /// 没有提前暴露引用的机制，循环依赖无论如何都会以
    /// [`BeanError::CurrentlyInCreation`] 失败。
    pub fn set_allow_circular_references(&self, allow: bool) {
        self.allow_circular_references.store(allow, Ordering::Release);
    }

    pub fn is_allow_circular_references(&self) -> bool {
        self.allow_circular_references.load(Ordering::Acquire)
    }

    /// 添加 BeanPostProcessor
    pub fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        let mut processors = self.bean_post_processors.write();
        tracing::debug!("Adding bean post processor '{}'", processor.name());
        processors.push(processor);

        // 按优先级排序（order 值越小优先级越高）
        processors.sort_by_key(|p| p.order());
    }

    pub fn bean_post_processor_count(&self) -> usize {
        self.bean_post_processors.read().len()
    }

    /// 解析别名得到规范名称
    pub fn canonical_name(&self, name: &str) -> String {
        self.aliases.canonical_name(name)
    }

    // ========== Merged definitions ==========

    /// 获取合并了父定义的定义，首次计算后缓存
    pub fn get_merged_bean_definition(&self, name: &str) -> BeanResult<Arc<BeanDefinition>> {
        let bean_name = self.canonical_name(name);
        if let Some(merged) = self.merged_definitions.read().get(&bean_name) {
            return Ok(Arc::clone(merged));
        }

        let raw = self
            .definitions
            .read()
            .get(&bean_name)
            .cloned()
            .ok_or_else(|| BeanError::NoSuchDefinition(name.to_string()))?;

        let mut chain = vec![bean_name.clone()];
        let merged = Arc::new(self.merge_definition(&bean_name, &raw, &mut chain)?);
        self.merged_definitions
            .write()
            .insert(bean_name, Arc::clone(&merged));
        Ok(merged)
    }

    fn merge_definition(
        &self,
        name: &str,
        definition: &BeanDefinition,
        chain: &mut Vec<String>,
    ) -> BeanResult<BeanDefinition> {
        let Some(parent_name) = &definition.parent_name else {
            return Ok(definition.clone());
        };

        let parent_bean_name = self.canonical_name(parent_name);
        if parent_bean_name == name {
            return Err(BeanError::store_for(
                name,
                definition.resource_description(),
                format!("Parent name '{}' is equal to bean name '{}'", parent_name, name),
            ));
        }
        if chain.contains(&parent_bean_name) {
            return Err(BeanError::store_for(
                name,
                definition.resource_description(),
                format!(
                    "Circular parent reference: {} -> {}",
                    chain.join(" -> "),
                    parent_bean_name
                ),
            ));
        }

        let parent = self
            .definitions
            .read()
            .get(&parent_bean_name)
            .cloned()
            .ok_or_else(|| {
                BeanError::store_for(
                    name,
                    definition.resource_description(),
                    format!("Could not resolve parent bean definition '{}'", parent_name),
                )
            })?;

        chain.push(parent_bean_name.clone());
        let merged_parent = self.merge_definition(&parent_bean_name, &parent, chain)?;
        Ok(merged_parent.overridden_by(definition))
    }

    fn clear_merged_definitions(&self) {
        self.merged_definitions.write().clear();
    }

    // ========== Singletons ==========

    /// 手动注册一个已经存在的单例
    pub fn register_singleton(&self, name: &str, instance: SharedInstance) -> BeanResult<()> {
        let mut singletons = self.singletons.write();
        if singletons.contains_key(name) {
            return Err(BeanError::IllegalState(format!(
                "Could not register object under bean name '{}': there is already an object bound",
                name
            )));
        }
        singletons.insert(name.to_string(), instance);
        tracing::debug!("Registered singleton '{}'", name);
        Ok(())
    }

    pub fn contains_singleton(&self, name: &str) -> bool {
        self.singletons.read().contains_key(name)
    }

    /// 已创建的单例名称，按创建顺序
    pub fn singleton_names(&self) -> Vec<String> {
        self.singletons.read().keys().cloned().collect()
    }

    pub fn singleton_count(&self) -> usize {
        self.singletons.read().len()
    }

    /// 预实例化所有非延迟、非抽象的单例
    pub fn preinstantiate_singletons(&self) -> BeanResult<()> {
        let names = self.bean_definition_names();
        tracing::debug!("Pre-instantiating singletons in {}", self.display_id());

        for name in names {
            let definition = self.get_merged_bean_definition(&name)?;
            if !definition.abstract_definition && definition.is_singleton() && !definition.is_lazy_init() {
                self.get_bean(&name)?;
            }
        }
        Ok(())
    }

    /// 按创建的逆序销毁所有单例
    pub fn destroy_singletons(&self) {
        let _lock = self.creation_lock.lock();
        self.singletons_currently_in_destruction
            .store(true, Ordering::Release);

        let disposables: Vec<(String, DisposableBean)> =
            self.disposable_beans.write().drain(..).collect();
        tracing::debug!(
            "Destroying singletons in {} ({} with destroy methods)",
            self.display_id(),
            disposables.len()
        );

        for (name, disposable) in disposables.into_iter().rev() {
            disposable.destroy(&name);
        }

        self.singletons.write().clear();
        self.singletons_currently_in_destruction
            .store(false, Ordering::Release);
    }

    /// 销毁单个单例（如果已创建）
    pub fn destroy_singleton(&self, name: &str) {
        let _lock = self.creation_lock.lock();
        self.singletons.write().shift_remove(name);
        let disposable = self.disposable_beans.write().shift_remove(name);
        if let Some(disposable) = disposable {
            disposable.destroy(name);
        }
    }

    // ========== Creation ==========

    fn resolve_class(&self, name: &str, definition: &BeanDefinition) -> BeanResult<Arc<BeanClass>> {
        let class_name = definition
            .bean_class_name
            .as_deref()
            .ok_or_else(|| BeanError::creation(name, "No bean class specified on bean definition"))?;
        self.classes
            .get(class_name)
            .ok_or_else(|| BeanError::CannotLoadClass {
                name: name.to_string(),
                class: class_name.to_string(),
            })
    }

    /// 创建一个实例：依赖 -> 实例化 -> 属性注入 -> 前置处理 -> init -> 后置处理
    ///
    /// `top_level` 为 false 时是内部 Bean，不登记销毁回调
    fn create_bean(&self, name: &str, definition: &BeanDefinition, top_level: bool) -> BeanResult<SharedInstance> {
        let _guard = CreationGuard::enter(&self.creation_tracker, name).ok_or_else(|| {
            BeanError::CurrentlyInCreation {
                name: name.to_string(),
                chain: self.creation_tracker.chain_to(name),
            }
        })?;
        tracing::trace!("Creating instance of bean '{}'", name);

        for dependency in &definition.depends_on {
            self.get_bean(dependency).map_err(|e| {
                BeanError::creation_caused_by(name, format!("'{}' depends on bean '{}'", name, dependency), e)
            })?;
        }

        let (mut instance, class) = self.instantiate(name, definition)?;
        self.populate(name, definition, class.as_deref(), instance.as_mut())?;

        let mut bean: SharedInstance = Arc::from(instance);
        bean = self.apply_bean_post_processors_before_initialization(bean, name)?;
        if let Some(init_method) = &definition.init_method_name {
            self.invoke_init_method(name, definition, class.as_deref(), &bean, init_method)?;
        }
        bean = self.apply_bean_post_processors_after_initialization(bean, name)?;

        if top_level && definition.is_singleton() {
            self.register_disposable_bean(name, definition, class.as_deref(), &bean)?;
        }
        Ok(bean)
    }

    /// 返回实例以及用于属性注入和生命周期的类描述符
    fn instantiate(&self, name: &str, definition: &BeanDefinition) -> BeanResult<(Instance, Option<Arc<BeanClass>>)> {
        let args = self.resolve_arguments(name, definition)?;

        match (&definition.factory_bean_name, &definition.factory_method_name) {
            (Some(factory_bean), Some(method)) => {
                let factory = self.get_bean(factory_bean).map_err(|e| {
                    BeanError::creation_caused_by(name, format!("Cannot obtain factory bean '{}'", factory_bean), e)
                })?;
                let factory_class = self
                    .type_name_of(factory_bean)
                    .and_then(|class_name| self.classes.get(&class_name))
                    .or_else(|| self.classes.find_by_type(instance_type_id(factory.as_ref())))
                    .ok_or_else(|| {
                        BeanError::creation(name, format!("No class descriptor for factory bean '{}'", factory_bean))
                    })?;
                if !factory_class.has_factory_method(method) {
                    return Err(BeanError::creation(
                        name,
                        format!(
                            "No matching factory method found: factory bean '{}'; factory method '{}'",
                            factory_bean, method
                        ),
                    ));
                }
                let instance = factory_class
                    .invoke_factory_method(factory.as_ref(), method, &args)
                    .map_err(|e| {
                        BeanError::creation_caused_by(name, format!("Factory method '{}' threw exception", method), e)
                    })?;
                let class = self.classes.find_by_type(instance_type_id(instance.as_ref()));
                Ok((instance, class))
            }
            (Some(factory_bean), None) => Err(BeanError::creation(
                name,
                format!("factory-bean '{}' specified without a factory-method", factory_bean),
            )),
            (None, Some(method)) => {
                let class = self.resolve_class(name, definition)?;
                if !class.has_static_factory(method) {
                    return Err(BeanError::creation(
                        name,
                        format!(
                            "No matching factory method found: factory method '{}' on class [{}]",
                            method,
                            class.name()
                        ),
                    ));
                }
                let instance = class.invoke_static_factory(method, &args).map_err(|e| {
                    BeanError::creation_caused_by(name, format!("Factory method '{}' threw exception", method), e)
                })?;
                let produced = self
                    .classes
                    .find_by_type(instance_type_id(instance.as_ref()))
                    .or(Some(class));
                Ok((instance, produced))
            }
            (None, None) => {
                let class = self.resolve_class(name, definition)?;
                let instance = class.construct(&args).map_err(|e| {
                    BeanError::creation_caused_by(name, "Instantiation of bean failed", e)
                })?;
                Ok((instance, Some(class)))
            }
        }
    }

    fn resolve_arguments(&self, name: &str, definition: &BeanDefinition) -> BeanResult<Arguments> {
        let holders = definition.constructor_args.positional().map_err(|index| {
            BeanError::creation(name, format!("No constructor argument specified for index {}", index))
        })?;

        let mut args = Arguments::new();
        for (index, holder) in holders.into_iter().enumerate() {
            let what = format!("constructor argument with index {}", index);
            let value = self.resolve_value(name, &holder.value, &what)?;
            args.push(holder.name.clone(), value);
        }
        Ok(args)
    }

    fn resolve_value(&self, name: &str, value: &BeanValue, what: &str) -> BeanResult<ResolvedValue> {
        match value {
            BeanValue::Literal(text) => Ok(ResolvedValue::Str(text.clone())),
            BeanValue::Null => Ok(ResolvedValue::Null),
            BeanValue::Reference(reference) => self.get_bean(reference).map(ResolvedValue::Bean).map_err(|e| {
                BeanError::creation_caused_by(
                    name,
                    format!("Cannot resolve reference to bean '{}' while setting {}", reference, what),
                    e,
                )
            }),
            BeanValue::Inner(holder) => {
                let mut chain = vec![holder.bean_name.clone()];
                let inner = self.merge_definition(&holder.bean_name, &holder.definition, &mut chain)?;
                self.create_bean(&holder.bean_name, &inner, false)
                    .map(ResolvedValue::Bean)
                    .map_err(|e| {
                        BeanError::creation_caused_by(
                            name,
                            format!("Cannot create inner bean '{}' while setting {}", holder.bean_name, what),
                            e,
                        )
                    })
            }
            BeanValue::List(items) => items
                .iter()
                .map(|item| self.resolve_value(name, item, what))
                .collect::<BeanResult<Vec<_>>>()
                .map(ResolvedValue::List),
            BeanValue::Map(entries) => entries
                .iter()
                .map(|(key, item)| Ok((key.clone(), self.resolve_value(name, item, what)?)))
                .collect::<BeanResult<Vec<_>>>()
                .map(ResolvedValue::Map),
        }
    }

    fn populate(
        &self,
        name: &str,
        definition: &BeanDefinition,
        class: Option<&BeanClass>,
        instance: &mut (dyn Any + Send + Sync),
    ) -> BeanResult<()> {
        if definition.property_values.is_empty() && definition.autowire_mode == AutowireMode::No {
            return Ok(());
        }
        let class = class.ok_or_else(|| {
            BeanError::creation(name, "Cannot apply property values: no class descriptor for the bean instance")
        })?;

        if definition.autowire_mode == AutowireMode::ByName {
            let candidates: Vec<String> = class
                .property_names()
                .filter(|property| *property != name && definition.property(property).is_none())
                .map(String::from)
                .collect();
            for property in candidates {
                if !self.contains_bean(&property) {
                    continue;
                }
                let bean = self.get_bean(&property).map_err(|e| {
                    BeanError::creation_caused_by(name, format!("Cannot autowire property '{}'", property), e)
                })?;
                class
                    .set_property(instance, &property, ResolvedValue::Bean(bean))
                    .map_err(|e| BeanError::creation_caused_by(name, "Error setting property values", e))?;
                tracing::trace!(
                    "Added autowiring by name from bean name '{}' via property '{}' to bean named '{}'",
                    property,
                    property,
                    name
                );
            }
        }

        for property in &definition.property_values {
            if !class.has_property(&property.name) {
                return Err(BeanError::creation(
                    name,
                    format!(
                        "Invalid property '{}' of bean class [{}]: Bean property '{}' is not writable",
                        property.name,
                        class.name(),
                        property.name
                    ),
                ));
            }
            let what = format!("bean property '{}'", property.name);
            let value = self.resolve_value(name, &property.value, &what)?;
            class
                .set_property(instance, &property.name, value)
                .map_err(|e| {
                    BeanError::creation_caused_by(
                        name,
                        format!("Error setting property values; failed to set property '{}'", property.name),
                        e,
                    )
                })?;
        }
        Ok(())
    }

    fn invoke_init_method(
        &self,
        name: &str,
        definition: &BeanDefinition,
        class: Option<&BeanClass>,
        bean: &SharedInstance,
        method: &str,
    ) -> BeanResult<()> {
        let Some(class) = class.filter(|class| class.has_init_method(method)) else {
            if definition.enforce_init_method {
                return Err(BeanError::creation(
                    name,
                    format!("Could not find an init method named '{}' on bean with name '{}'", method, name),
                ));
            }
            tracing::trace!("No default init method named '{}' found on bean with name '{}'", method, name);
            return Ok(());
        };

        tracing::trace!("Invoking init method '{}' on bean with name '{}'", method, name);
        class
            .invoke_init_method(&**bean, method)
            .map_err(|e| BeanError::creation_caused_by(name, "Invocation of init method failed", e))
    }

    fn register_disposable_bean(
        &self,
        name: &str,
        definition: &BeanDefinition,
        class: Option<&BeanClass>,
        bean: &SharedInstance,
    ) -> BeanResult<()> {
        let Some(method) = &definition.destroy_method_name else {
            return Ok(());
        };

        match class.and_then(|class| class.destroy_method(method)) {
            Some(destroy) => {
                self.disposable_beans.write().insert(
                    name.to_string(),
                    DisposableBean {
                        instance: Arc::clone(bean),
                        method: method.clone(),
                        destroy,
                    },
                );
                Ok(())
            }
            None if definition.enforce_destroy_method => Err(BeanError::creation(
                name,
                format!("Could not find a destroy method named '{}' on bean with name '{}'", method, name),
            )),
            None => Ok(()),
        }
    }

    /// 应用 BeanPostProcessor.postProcessBeforeInitialization
    fn apply_bean_post_processors_before_initialization(
        &self,
        bean: SharedInstance,
        bean_name: &str,
    ) -> BeanResult<SharedInstance> {
        let processors = self.bean_post_processors.read().clone();
        let mut current_bean = bean;

        for processor in processors.iter() {
            current_bean = processor
                .post_process_before_initialization(current_bean, bean_name)
                .map_err(|e| {
                    BeanError::creation_caused_by(
                        bean_name,
                        format!("BeanPostProcessor '{}' failed before initialization", processor.name()),
                        e,
                    )
                })?;
        }

        Ok(current_bean)
    }

    /// 应用 BeanPostProcessor.postProcessAfterInitialization
    fn apply_bean_post_processors_after_initialization(
        &self,
        bean: SharedInstance,
        bean_name: &str,
    ) -> BeanResult<SharedInstance> {
        let processors = self.bean_post_processors.read().clone();
        let mut current_bean = bean;

        for processor in processors.iter() {
            current_bean = processor
                .post_process_after_initialization(current_bean, bean_name)
                .map_err(|e| {
                    BeanError::creation_caused_by(
                        bean_name,
                        format!("BeanPostProcessor '{}' failed after initialization", processor.name()),
                        e,
                    )
                })?;
        }

        Ok(current_bean)
    }
}

impl Default for DefaultListableBeanFactory {
    fn default() -> Self {
        Self::new(Arc::new(ClassRegistry::new()))
    }
}

impl fmt::Debug for DefaultListableBeanFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultListableBeanFactory")
            .field("id", &self.serialization_id())
            .field("definitions", &self.bean_definition_names())
            .field("singletons", &self.singleton_names())
            .finish()
    }
}

impl BeanFactory for DefaultListableBeanFactory {
    fn get_bean(&self, name: &str) -> BeanResult<SharedInstance> {
        let bean_name = self.canonical_name(name);
        tracing::trace!("Requesting bean: '{}'", bean_name);

        if let Some(bean) = self.singletons.read().get(&bean_name) {
            tracing::trace!("Returning cached instance of singleton bean '{}'", bean_name);
            return Ok(Arc::clone(bean));
        }

        let definition = self.get_merged_bean_definition(&bean_name)?;
        if definition.abstract_definition {
            return Err(BeanError::BeanIsAbstract(bean_name));
        }

        let _lock = self.creation_lock.lock();

        if !definition.is_singleton() {
            tracing::trace!("Creating new instance of prototype bean '{}'", bean_name);
            return self.create_bean(&bean_name, &definition, true);
        }

        // 持锁后再检查一次
        if let Some(bean) = self.singletons.read().get(&bean_name) {
            return Ok(Arc::clone(bean));
        }
        if self.singletons_currently_in_destruction.load(Ordering::Acquire) {
            return Err(BeanError::IllegalState(format!(
                "Singleton bean creation not allowed while singletons of this factory are in destruction: '{}'",
                bean_name
            )));
        }

        tracing::debug!("Creating shared instance of singleton bean '{}'", bean_name);
        let bean = self.create_bean(&bean_name, &definition, true)?;
        self.singletons
            .write()
            .insert(bean_name, Arc::clone(&bean));
        Ok(bean)
    }

    fn contains_bean(&self, name: &str) -> bool {
        let bean_name = self.canonical_name(name);
        self.contains_singleton(&bean_name) || self.definitions.read().contains_key(&bean_name)
    }

    fn is_singleton(&self, name: &str) -> BeanResult<bool> {
        let bean_name = self.canonical_name(name);
        if self.contains_singleton(&bean_name) {
            return Ok(true);
        }
        Ok(self.get_merged_bean_definition(&bean_name)?.is_singleton())
    }

    fn is_prototype(&self, name: &str) -> BeanResult<bool> {
        let bean_name = self.canonical_name(name);
        if self.definitions.read().contains_key(&bean_name) {
            return Ok(self.get_merged_bean_definition(&bean_name)?.is_prototype());
        }
        if self.contains_singleton(&bean_name) {
            return Ok(false);
        }
        Err(BeanError::NoSuchDefinition(name.to_string()))
    }

    fn type_name_of(&self, name: &str) -> Option<String> {
        self.get_merged_bean_definition(name)
            .ok()
            .and_then(|definition| definition.bean_class_name.clone())
    }
}

impl BeanDefinitionRegistry for DefaultListableBeanFactory {
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> BeanResult<()> {
        if name.trim().is_empty() {
            return Err(BeanError::store("Bean name must not be empty"));
        }

        tracing::trace!("Attempting to register bean definition '{}'", name);

        let mut definitions = self.definitions.write();
        if let Some(existing) = definitions.get(name) {
            if **existing == definition {
                tracing::debug!(
                    "Ignoring re-registration of bean '{}' with an equivalent definition",
                    name
                );
                return Ok(());
            }
            if !self.is_allow_bean_definition_overriding() {
                return Err(BeanError::store_for(
                    name,
                    definition.resource_description(),
                    format!(
                        "Cannot register bean definition [{}] for bean '{}': There is already [{}] bound.",
                        definition, name, existing
                    ),
                ));
            }
            tracing::warn!(
                "Overriding bean definition for bean '{}' with a different definition: replacing [{}] with [{}]",
                name,
                existing,
                definition
            );
        } else if self.aliases.is_alias(name) {
            if !self.is_allow_bean_definition_overriding() {
                return Err(BeanError::store_for(
                    name,
                    definition.resource_description(),
                    format!(
                        "Cannot register bean definition for bean '{}' since there is already an alias for bean '{}' bound.",
                        name,
                        self.canonical_name(name)
                    ),
                ));
            }
            self.aliases.remove_alias(name)?;
            tracing::debug!("Removed alias '{}' to make room for a bean definition", name);
        }

        definitions.insert(name.to_string(), Arc::new(definition));
        drop(definitions);

        self.clear_merged_definitions();
        tracing::debug!("Bean definition registered: '{}'", name);
        Ok(())
    }

    fn remove_bean_definition(&self, name: &str) -> BeanResult<()> {
        self.definitions
            .write()
            .shift_remove(name)
            .ok_or_else(|| BeanError::NoSuchDefinition(name.to_string()))?;
        self.clear_merged_definitions();
        self.destroy_singleton(name);

        tracing::debug!("Bean definition removed: '{}'", name);
        Ok(())
    }

    fn get_bean_definition(&self, name: &str) -> BeanResult<Arc<BeanDefinition>> {
        let bean_name = self.canonical_name(name);
        self.definitions
            .read()
            .get(&bean_name)
            .cloned()
            .ok_or_else(|| BeanError::NoSuchDefinition(name.to_string()))
    }

    fn contains_bean_definition(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name)
    }

    fn bean_definition_names(&self) -> Vec<String> {
        self.definitions.read().keys().cloned().collect()
    }

    fn bean_definition_count(&self) -> usize {
        self.definitions.read().len()
    }

    fn register_alias(&self, name: &str, alias: &str) -> BeanResult<()> {
        if alias != name && self.definitions.read().contains_key(alias) {
            return Err(BeanError::store_for(
                alias,
                None,
                format!(
                    "Cannot register alias '{}' for name '{}': '{}' is already a registered bean name",
                    alias, name, alias
                ),
            ));
        }
        self.aliases.register_alias(name, alias)
    }

    fn remove_alias(&self, alias: &str) -> BeanResult<()> {
        self.aliases.remove_alias(alias)
    }

    fn is_alias(&self, name: &str) -> bool {
        self.aliases.is_alias(name)
    }

    fn get_aliases(&self, name: &str) -> Vec<String> {
        let bean_name = self.canonical_name(name);
        let mut aliases = Vec::new();
        if bean_name != name {
            aliases.push(bean_name.clone());
        }
        aliases.extend(
            self.aliases
                .aliases_of(&bean_name)
                .into_iter()
                .filter(|alias| alias != name),
        );
        aliases
    }

    fn is_bean_name_in_use(&self, name: &str) -> bool {
        self.aliases.is_alias(name)
            || self.definitions.read().contains_key(name)
            || self.contains_singleton(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{Scope, ValueHolder};
    use parking_lot::Mutex;

    #[derive(Debug)]
    struct User {
        name: String,
        friend: Option<Arc<User>>,
        initialized: AtomicBool,
    }

    #[derive(Debug)]
    struct Config;

    fn classes(log: Arc<Mutex<Vec<String>>>) -> Arc<ClassRegistry> {
        let registry = ClassRegistry::new();
        let destroy_log = Arc::clone(&log);
        registry.register(
            BeanClass::builder::<User>("User")
                .constructor(|args| {
                    Ok(User {
                        name: args.string_or(0, "nankong")?,
                        friend: None,
                        initialized: AtomicBool::new(false),
                    })
                })
                .static_factory("named", |args| {
                    Ok(User {
                        name: args.string(0)?,
                        friend: None,
                        initialized: AtomicBool::new(false),
                    })
                })
                .property("name", |user, value| {
                    user.name = value.to_text()?;
                    Ok(())
                })
                .property("friend", |user, value| {
                    user.friend = Some(value.bean::<User>()?);
                    Ok(())
                })
                .init_method("init", |user| {
                    user.initialized.store(true, Ordering::SeqCst);
                    Ok(())
                })
                .destroy_method("close", move |user| {
                    destroy_log.lock().push(user.name.clone());
                    Ok(())
                })
                .build(),
        );
        registry.register(
            BeanClass::builder::<Config>("Config")
                .constructor(|_| Ok(Config))
                .factory_method("user", |_: &Config, _| {
                    Ok(User {
                        name: "user1".into(),
                        friend: None,
                        initialized: AtomicBool::new(false),
                    })
                })
                .build(),
        );
        Arc::new(registry)
    }

    fn factory() -> (DefaultListableBeanFactory, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (DefaultListableBeanFactory::new(classes(Arc::clone(&log))), log)
    }

    fn user(name: &str) -> BeanDefinition {
        BeanDefinition::of_class("User").with_constructor_arg(BeanValue::literal(name))
    }

    #[test]
    fn test_identical_registration_is_noop() {
        let (factory, _) = factory();
        factory.set_allow_bean_definition_overriding(false);
        factory.register_bean_definition("user", user("nankong")).unwrap();
        factory.register_bean_definition("user", user("nankong")).unwrap();
        assert_eq!(factory.bean_definition_count(), 1);
    }

    #[test]
    fn test_override_policy() {
        let (factory, _) = factory();
        factory.set_allow_bean_definition_overriding(false);
        factory.register_bean_definition("x", user("a")).unwrap();
        let err = factory.register_bean_definition("x", user("b")).unwrap_err();
        assert!(matches!(err, BeanError::DefinitionStore { .. }));

        factory.set_allow_bean_definition_overriding(true);
        factory.register_bean_definition("y", user("first")).unwrap();
        factory.register_bean_definition("x", user("b")).unwrap();
        assert_eq!(*factory.get_bean_definition("x").unwrap(), user("b"));
        // 覆盖保持原来的位置
        assert_eq!(factory.bean_definition_names(), vec!["x", "y"]);
    }

    #[test]
    fn test_empty_name_rejected() {
        let (factory, _) = factory();
        assert!(factory.register_bean_definition(" ", user("a")).is_err());
    }

    #[test]
    fn test_alias_resolves_to_same_singleton() {
        let (factory, _) = factory();
        factory.register_bean_definition("user", user("nankong")).unwrap();
        factory.register_alias("user", "u").unwrap();
        factory.register_alias("u", "u2").unwrap();

        let a = factory.get_bean_typed::<User>("user").unwrap();
        let b = factory.get_bean_typed::<User>("u2").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.name, "nankong");

        assert_eq!(factory.get_aliases("user"), vec!["u", "u2"]);
        assert_eq!(factory.get_aliases("u"), vec!["user", "u2"]);

        factory.remove_alias("u2").unwrap();
        assert_eq!(factory.get_aliases("user"), vec!["u"]);
    }

    #[test]
    fn test_alias_equal_to_bean_name_rejected() {
        let (factory, _) = factory();
        factory.register_bean_definition("a", user("a")).unwrap();
        factory.register_bean_definition("b", user("b")).unwrap();
        assert!(factory.register_alias("a", "b").is_err());
    }

    #[test]
    fn test_forward_alias_fails_on_lookup() {
        let (factory, _) = factory();
        factory.register_alias("missing", "m").unwrap();
        assert!(factory.is_alias("m"));
        assert!(matches!(factory.get_bean("m"), Err(BeanError::NoSuchDefinition(_))));
    }

    #[test]
    fn test_definition_replacing_alias() {
        let (factory, _) = factory();
        factory.register_bean_definition("user", user("a")).unwrap();
        factory.register_alias("user", "u").unwrap();

        factory.set_allow_bean_definition_overriding(false);
        assert!(factory.register_bean_definition("u", user("b")).is_err());

        factory.set_allow_bean_definition_overriding(true);
        factory.register_bean_definition("u", user("b")).unwrap();
        assert!(!factory.is_alias("u"));
        assert_eq!(factory.get_bean_typed::<User>("u").unwrap().name, "b");
    }

    #[test]
    fn test_bean_name_in_use() {
        let (factory, _) = factory();
        factory.register_bean_definition("user", user("a")).unwrap();
        factory.register_alias("user", "u").unwrap();
        factory.register_singleton("manual", Arc::new(7_i32)).unwrap();

        assert!(factory.is_bean_name_in_use("user"));
        assert!(factory.is_bean_name_in_use("u"));
        assert!(factory.is_bean_name_in_use("manual"));
        assert!(!factory.is_bean_name_in_use("other"));
    }

    #[test]
    fn test_remove_definition() {
        let (factory, log) = factory();
        factory
            .register_bean_definition("user", user("a").with_destroy_method("close"))
            .unwrap();
        factory.get_bean("user").unwrap();

        factory.remove_bean_definition("user").unwrap();
        assert!(!factory.contains_bean("user"));
        assert_eq!(*log.lock(), vec!["a"]);
        assert!(matches!(
            factory.remove_bean_definition("user"),
            Err(BeanError::NoSuchDefinition(_))
        ));
    }

    #[test]
    fn test_parent_registered_later_still_merges() {
        let (factory, _) = factory();
        factory
            .register_bean_definition(
                "child",
                BeanDefinition::child_of("base").with_property("name", BeanValue::literal("child")),
            )
            .unwrap();
        factory
            .register_bean_definition(
                "base",
                BeanDefinition::of_class("User")
                    .with_abstract(true)
                    .with_scope(Scope::Prototype),
            )
            .unwrap();

        let merged = factory.get_merged_bean_definition("child").unwrap();
        assert_eq!(merged.bean_class_name.as_deref(), Some("User"));
        assert!(merged.is_prototype());
        assert_eq!(factory.get_bean_typed::<User>("child").unwrap().name, "child");
        assert!(matches!(factory.get_bean("base"), Err(BeanError::BeanIsAbstract(_))));
    }

    #[test]
    fn test_merged_cache_invalidated_on_mutation() {
        let (factory, _) = factory();
        factory.register_bean_definition("base", user("a")).unwrap();
        factory
            .register_bean_definition("child", BeanDefinition::child_of("base"))
            .unwrap();
        assert!(factory.get_merged_bean_definition("child").unwrap().is_singleton());

        factory
            .register_bean_definition("base", user("a").with_scope(Scope::Prototype))
            .unwrap();
        assert!(factory.get_merged_bean_definition("child").unwrap().is_prototype());
    }

    #[test]
    fn test_parent_cycle_is_store_error() {
        let (factory, _) = factory();
        factory.register_bean_definition("a", BeanDefinition::child_of("b")).unwrap();
        factory.register_bean_definition("b", BeanDefinition::child_of("a")).unwrap();
        factory.register_bean_definition("self", BeanDefinition::child_of("self")).unwrap();
        assert!(matches!(
            factory.get_merged_bean_definition("a"),
            Err(BeanError::DefinitionStore { .. })
        ));
        assert!(matches!(
            factory.get_merged_bean_definition("self"),
            Err(BeanError::DefinitionStore { .. })
        ));
    }

    #[test]
    fn test_references_properties_and_init() {
        let (factory, _) = factory();
        factory.register_bean_definition("friend", user("bob")).unwrap();
        factory
            .register_bean_definition(
                "user",
                BeanDefinition::of_class("User")
                    .with_property("name", BeanValue::literal("alice"))
                    .with_property("friend", BeanValue::reference("friend"))
                    .with_init_method("init"),
            )
            .unwrap();

        let user = factory.get_bean_typed::<User>("user").unwrap();
        assert_eq!(user.name, "alice");
        assert!(user.initialized.load(Ordering::SeqCst));
        assert_eq!(user.friend.as_ref().unwrap().name, "bob");
    }

    #[test]
    fn test_autowire_by_name() {
        let (factory, _) = factory();
        factory.register_bean_definition("friend", user("bob")).unwrap();
        let mut definition = user("alice");
        definition.autowire_mode = AutowireMode::ByName;
        factory.register_bean_definition("user", definition).unwrap();

        let user = factory.get_bean_typed::<User>("user").unwrap();
        assert_eq!(user.friend.as_ref().unwrap().name, "bob");
    }

    #[test]
    fn test_missing_init_method_enforced_only_when_explicit() {
        let (factory, _) = factory();
        factory
            .register_bean_definition("strict", user("a").with_init_method("setup"))
            .unwrap();
        let mut lenient = user("b").with_init_method("setup");
        lenient.enforce_init_method = false;
        factory.register_bean_definition("lenient", lenient).unwrap();

        assert!(factory.get_bean("strict").is_err());
        assert!(factory.get_bean("lenient").is_ok());
    }

    #[test]
    fn test_factory_methods() {
        let (factory, _) = factory();
        factory.register_bean_definition("config", BeanDefinition::of_class("Config")).unwrap();
        factory
            .register_bean_definition(
                "fromConfig",
                BeanDefinition::new().with_factory_method(Some("config"), "user"),
            )
            .unwrap();
        factory
            .register_bean_definition(
                "fromStatic",
                BeanDefinition::of_class("User")
                    .with_factory_method(None, "named")
                    .with_constructor_arg(BeanValue::literal("static")),
            )
            .unwrap();

        assert_eq!(factory.get_bean_typed::<User>("fromConfig").unwrap().name, "user1");
        assert_eq!(factory.get_bean_typed::<User>("fromStatic").unwrap().name, "static");
    }

    #[test]
    fn test_prototype_creates_new_instances() {
        let (factory, _) = factory();
        factory
            .register_bean_definition("user", user("a").with_scope(Scope::Prototype))
            .unwrap();
        let a = factory.get_bean("user").unwrap();
        let b = factory.get_bean("user").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(factory.is_prototype("user").unwrap());
    }

    #[test]
    fn test_circular_reference_detected() {
        let (factory, _) = factory();
        factory
            .register_bean_definition("a", user("a").with_property("friend", BeanValue::reference("b")))
            .unwrap();
        factory
            .register_bean_definition("b", user("b").with_property("friend", BeanValue::reference("a")))
            .unwrap();

        let err = factory.get_bean("a").unwrap_err();
        assert!(err.is_currently_in_creation());
        assert!(!factory.contains_singleton("a"));
    }

    #[test]
    fn test_depends_on_creates_dependency_first() {
        let (factory, _) = factory();
        factory
            .register_bean_definition("first", user("first").with_depends_on(["second"]))
            .unwrap();
        factory.register_bean_definition("second", user("second")).unwrap();

        factory.preinstantiate_singletons().unwrap();
        assert_eq!(factory.singleton_names(), vec!["second", "first"]);
    }

    #[test]
    fn test_lazy_and_abstract_skipped_by_preinstantiation() {
        let (factory, _) = factory();
        factory
            .register_bean_definition("lazy", user("lazy").with_lazy_init(true))
            .unwrap();
        factory
            .register_bean_definition("template", user("t").with_abstract(true))
            .unwrap();
        factory.register_bean_definition("eager", user("eager")).unwrap();

        factory.preinstantiate_singletons().unwrap();
        assert_eq!(factory.singleton_names(), vec!["eager"]);
    }

    #[test]
    fn test_destroy_in_reverse_creation_order() {
        let (factory, log) = factory();
        for name in ["one", "two", "three"] {
            factory
                .register_bean_definition(name, user(name).with_destroy_method("close"))
                .unwrap();
        }
        factory.preinstantiate_singletons().unwrap();
        factory.destroy_singletons();

        assert_eq!(*log.lock(), vec!["three", "two", "one"]);
        assert_eq!(factory.singleton_count(), 0);
    }

    #[test]
    fn test_indexed_and_named_constructor_args() {
        let (factory, _) = factory();
        let mut definition = BeanDefinition::of_class("User");
        definition
            .constructor_args
            .add_indexed(0, ValueHolder::new(BeanValue::literal("indexed")).named("name"));
        factory.register_bean_definition("user", definition).unwrap();
        assert_eq!(factory.get_bean_typed::<User>("user").unwrap().name, "indexed");
    }

    #[test]
    fn test_wrong_type_reported() {
        let (factory, _) = factory();
        factory.register_bean_definition("user", user("a")).unwrap();
        let err = factory.get_bean_typed::<String>("user").unwrap_err();
        assert!(matches!(err, BeanError::BeanNotOfRequiredType { ref actual, .. } if actual == "User"));
    }

    #[test]
    fn test_unknown_class() {
        let (factory, _) = factory();
        factory
            .register_bean_definition("ghost", BeanDefinition::of_class("Ghost"))
            .unwrap();
        assert!(matches!(factory.get_bean("ghost"), Err(BeanError::CannotLoadClass { .. })));
    }

    #[test]
    fn test_bean_post_processors_run_in_order() {
        struct Recorder {
            order: i32,
            seen: Arc<Mutex<Vec<String>>>,
        }

        impl BeanPostProcessor for Recorder {
            fn post_process_after_initialization(
                &self,
                bean: SharedInstance,
                bean_name: &str,
            ) -> anyhow::Result<SharedInstance> {
                self.seen.lock().push(format!("{}:{}", self.order, bean_name));
                Ok(bean)
            }

            fn order(&self) -> i32 {
                self.order
            }
        }

        let (factory, _) = factory();
        let seen = Arc::new(Mutex::new(Vec::new()));
        factory.add_bean_post_processor(Arc::new(Recorder { order: 20, seen: Arc::clone(&seen) }));
        factory.add_bean_post_processor(Arc::new(Recorder { order: 10, seen: Arc::clone(&seen) }));
        factory.register_bean_definition("user", user("a")).unwrap();
        factory.get_bean("user").unwrap();

        assert_eq!(*seen.lock(), vec!["10:user", "20:user"]);
    }

    #[test]
    fn test_init_method_runs_after_processor_keeps_instance() {
        struct Retainer {
            retained: Mutex<Vec<SharedInstance>>,
        }

        impl BeanPostProcessor for Retainer {
            fn post_process_before_initialization(
                &self,
                bean: SharedInstance,
                _bean_name: &str,
            ) -> anyhow::Result<SharedInstance> {
                self.retained.lock().push(Arc::clone(&bean));
                Ok(bean)
            }
        }

        let (factory, _) = factory();
        let retainer = Arc::new(Retainer { retained: Mutex::new(Vec::new()) });
        factory.add_bean_post_processor(Arc::clone(&retainer) as Arc<dyn BeanPostProcessor>);
        factory
            .register_bean_definition("user", user("a").with_init_method("init"))
            .unwrap();

        let user = factory.get_bean_typed::<User>("user").unwrap();
        assert!(user.initialized.load(Ordering::SeqCst));

        let retained = retainer.retained.lock();
        assert_eq!(retained.len(), 1);
        assert!(retained[0].downcast_ref::<User>().unwrap().initialized.load(Ordering::SeqCst));
    }

    #[test]
    fn test_out_of_range_constructor_index_is_creation_error() {
        let (factory, _) = factory();
        let mut definition = BeanDefinition::of_class("User");
        definition
            .constructor_args
            .add_indexed(usize::MAX, ValueHolder::new(BeanValue::literal("x")));
        factory.register_bean_definition("user", definition).unwrap();

        let err = factory.get_bean("user").unwrap_err();
        assert!(matches!(err, BeanError::BeanCreation { .. }));
        assert!(err.to_string().contains("No constructor argument specified for index 0"));
    }
}
