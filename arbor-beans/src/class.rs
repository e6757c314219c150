//! 类描述符
//!
//! Rust 没有反射，定义中的 `class` 是 [`ClassRegistry`] 中的一个键，
//! 对应的 [`BeanClass`] 提供构造函数、工厂方法、属性 setter 与生命周期方法。
//!
//! # 示例
//!
//! ```
//! use arbor_beans::{BeanClass, ClassRegistry};
//!
//! struct User {
//!     name: String,
//! }
//!
//! let registry = ClassRegistry::new();
//! registry.register(
//!     BeanClass::builder::<User>("User")
//!         .constructor(|args| {
//!             let name = args.string_or(0, "nankong")?;
//!             Ok(User { name })
//!         })
//!         .property("name", |user, value| {
//!             user.name = value.to_text()?;
//!             Ok(())
//!         })
//!         .build(),
//! );
//! assert!(registry.contains("User"));
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use indexmap::IndexMap;
use parking_lot::RwLock;

/// 刚创建、尚未共享的实例
pub type Instance = Box<dyn Any + Send + Sync>;

/// 容器管理的共享实例
pub type SharedInstance = Arc<dyn Any + Send + Sync>;

type Constructor = Arc<dyn Fn(&Arguments) -> anyhow::Result<Instance> + Send + Sync>;
type InstanceFactory =
    Arc<dyn Fn(&(dyn Any + Send + Sync), &Arguments) -> anyhow::Result<Instance> + Send + Sync>;
type Setter = Arc<dyn Fn(&mut (dyn Any + Send + Sync), ResolvedValue) -> anyhow::Result<()> + Send + Sync>;
type InitMethod = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> anyhow::Result<()> + Send + Sync>;

/// 销毁回调，只能拿到共享引用
pub type DestroyMethod = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> anyhow::Result<()> + Send + Sync>;

// ========== Resolved values ==========

/// 已解析的参数或属性值
#[derive(Clone)]
pub enum ResolvedValue {
    Str(String),
    Bean(SharedInstance),
    List(Vec<ResolvedValue>),
    Map(Vec<(String, ResolvedValue)>),
    Null,
}

impl ResolvedValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ResolvedValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// 字面量文本，其他类型报错
    pub fn to_text(&self) -> anyhow::Result<String> {
        self.as_str()
            .map(String::from)
            .ok_or_else(|| anyhow!("expected a literal value but found {}", self.kind()))
    }

    /// 把字面量解析为任意 `FromStr` 类型
    pub fn parse<T>(&self) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let text = self.to_text()?;
        text.trim()
            .parse::<T>()
            .map_err(|e| anyhow!("cannot convert '{}' to {}: {}", text, std::any::type_name::<T>(), e))
    }

    /// 引用的 Bean 向下转型
    pub fn bean<T: Any + Send + Sync>(&self) -> anyhow::Result<Arc<T>> {
        match self {
            ResolvedValue::Bean(bean) => Arc::clone(bean)
                .downcast::<T>()
                .map_err(|_| anyhow!("referenced bean is not of type {}", std::any::type_name::<T>())),
            other => Err(anyhow!("expected a bean reference but found {}", other.kind())),
        }
    }

    pub fn as_list(&self) -> Option<&[ResolvedValue]> {
        match self {
            ResolvedValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(String, ResolvedValue)]> {
        match self {
            ResolvedValue::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ResolvedValue::Null)
    }

    fn kind(&self) -> &'static str {
        match self {
            ResolvedValue::Str(_) => "a literal",
            ResolvedValue::Bean(_) => "a bean reference",
            ResolvedValue::List(_) => "a list",
            ResolvedValue::Map(_) => "a map",
            ResolvedValue::Null => "null",
        }
    }
}

impl fmt::Debug for ResolvedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedValue::Str(s) => f.debug_tuple("Str").field(s).finish(),
            ResolvedValue::Bean(_) => f.write_str("Bean(..)"),
            ResolvedValue::List(items) => f.debug_tuple("List").field(items).finish(),
            ResolvedValue::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
            ResolvedValue::Null => f.write_str("Null"),
        }
    }
}

/// 构造函数与工厂方法收到的参数
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: Vec<(Option<String>, ResolvedValue)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: Option<String>, value: ResolvedValue) {
        self.values.push((name, value));
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ResolvedValue> {
        self.values.get(index).map(|(_, value)| value)
    }

    /// 按参数名查找
    pub fn named(&self, name: &str) -> Option<&ResolvedValue> {
        self.values
            .iter()
            .find(|(arg_name, _)| arg_name.as_deref() == Some(name))
            .map(|(_, value)| value)
    }

    pub fn value(&self, index: usize) -> anyhow::Result<&ResolvedValue> {
        self.get(index)
            .ok_or_else(|| anyhow!("missing constructor argument at index {}", index))
    }

    pub fn string(&self, index: usize) -> anyhow::Result<String> {
        self.value(index)?
            .to_text()
            .with_context(|| format!("argument {}", index))
    }

    /// 参数缺失时使用默认值
    pub fn string_or(&self, index: usize, default: &str) -> anyhow::Result<String> {
        match self.get(index) {
            Some(value) => value.to_text().with_context(|| format!("argument {}", index)),
            None => Ok(default.to_string()),
        }
    }

    pub fn parse<T>(&self, index: usize) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.value(index)?
            .parse()
            .with_context(|| format!("argument {}", index))
    }

    pub fn bean<T: Any + Send + Sync>(&self, index: usize) -> anyhow::Result<Arc<T>> {
        self.value(index)?
            .bean()
            .with_context(|| format!("argument {}", index))
    }
}

// ========== BeanClass ==========

/// 一个可实例化的"类"
pub struct BeanClass {
    name: String,
    type_id: TypeId,
    type_name: &'static str,
    constructor: Option<Constructor>,
    static_factories: HashMap<String, Constructor>,
    instance_factories: HashMap<String, InstanceFactory>,
    setters: IndexMap<String, Setter>,
    init_methods: HashMap<String, InitMethod>,
    destroy_methods: HashMap<String, DestroyMethod>,
}

impl BeanClass {
    /// 开始描述类型 `T`
    pub fn builder<T: Any + Send + Sync>(name: impl Into<String>) -> BeanClassBuilder<T> {
        BeanClassBuilder {
            class: BeanClass {
                name: name.into(),
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                constructor: None,
                static_factories: HashMap::new(),
                instance_factories: HashMap::new(),
                setters: IndexMap::new(),
                init_methods: HashMap::new(),
                destroy_methods: HashMap::new(),
            },
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn has_constructor(&self) -> bool {
        self.constructor.is_some()
    }

    pub fn construct(&self, args: &Arguments) -> anyhow::Result<Instance> {
        let constructor = self
            .constructor
            .as_ref()
            .ok_or_else(|| anyhow!("class [{}] has no constructor", self.name))?;
        constructor(args)
    }

    pub fn has_static_factory(&self, method: &str) -> bool {
        self.static_factories.contains_key(method)
    }

    pub fn invoke_static_factory(&self, method: &str, args: &Arguments) -> anyhow::Result<Instance> {
        let factory = self
            .static_factories
            .get(method)
            .ok_or_else(|| anyhow!("no static factory method '{}' on class [{}]", method, self.name))?;
        factory(args)
    }

    pub fn has_factory_method(&self, method: &str) -> bool {
        self.instance_factories.contains_key(method)
    }

    pub fn invoke_factory_method(
        &self,
        target: &(dyn Any + Send + Sync),
        method: &str,
        args: &Arguments,
    ) -> anyhow::Result<Instance> {
        let factory = self
            .instance_factories
            .get(method)
            .ok_or_else(|| anyhow!("no factory method '{}' on class [{}]", method, self.name))?;
        factory(target, args)
    }

    pub fn has_property(&self, property: &str) -> bool {
        self.setters.contains_key(property)
    }

    /// 所有可写属性，按声明顺序
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.setters.keys().map(String::as_str)
    }

    pub fn set_property(
        &self,
        target: &mut (dyn Any + Send + Sync),
        property: &str,
        value: ResolvedValue,
    ) -> anyhow::Result<()> {
        let setter = self
            .setters
            .get(property)
            .ok_or_else(|| anyhow!("Invalid property '{}' of bean class [{}]: no setter", property, self.name))?;
        setter(target, value)
    }

    pub fn has_init_method(&self, method: &str) -> bool {
        self.init_methods.contains_key(method)
    }

    pub fn invoke_init_method(&self, target: &(dyn Any + Send + Sync), method: &str) -> anyhow::Result<()> {
        let init = self
            .init_methods
            .get(method)
            .ok_or_else(|| anyhow!("no init method '{}' on class [{}]", method, self.name))?;
        init(target)
    }

    pub fn destroy_method(&self, method: &str) -> Option<DestroyMethod> {
        self.destroy_methods.get(method).cloned()
    }
}

impl fmt::Debug for BeanClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanClass")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("constructor", &self.constructor.is_some())
            .field("static_factories", &self.static_factories.keys().collect::<Vec<_>>())
            .field("factory_methods", &self.instance_factories.keys().collect::<Vec<_>>())
            .field("properties", &self.setters.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn downcast_mut<'a, T: Any>(target: &'a mut (dyn Any + Send + Sync), class: &str) -> anyhow::Result<&'a mut T> {
    target
        .downcast_mut::<T>()
        .ok_or_else(|| anyhow!("instance is not of class [{}]", class))
}

fn downcast_ref<'a, T: Any>(target: &'a (dyn Any + Send + Sync), class: &str) -> anyhow::Result<&'a T> {
    target
        .downcast_ref::<T>()
        .ok_or_else(|| anyhow!("instance is not of class [{}]", class))
}

/// 类型化的 [`BeanClass`] 构建器
pub struct BeanClassBuilder<T> {
    class: BeanClass,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> BeanClassBuilder<T> {
    /// 构造函数
    pub fn constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn(&Arguments) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.class.constructor = Some(Arc::new(move |args: &Arguments| {
            constructor(args).map(|value| Box::new(value) as Instance)
        }));
        self
    }

    /// 以 `Default` 作为无参构造函数
    pub fn default_constructor(self) -> Self
    where
        T: Default,
    {
        self.constructor(|_| Ok(T::default()))
    }

    /// 静态工厂方法，返回值可以是任意类型
    pub fn static_factory<U, F>(mut self, method: impl Into<String>, factory: F) -> Self
    where
        U: Any + Send + Sync,
        F: Fn(&Arguments) -> anyhow::Result<U> + Send + Sync + 'static,
    {
        self.class.static_factories.insert(
            method.into(),
            Arc::new(move |args: &Arguments| factory(args).map(|value| Box::new(value) as Instance)),
        );
        self
    }

    /// 实例工厂方法，在工厂 Bean 上调用
    pub fn factory_method<U, F>(mut self, method: impl Into<String>, factory: F) -> Self
    where
        U: Any + Send + Sync,
        F: Fn(&T, &Arguments) -> anyhow::Result<U> + Send + Sync + 'static,
    {
        let class_name = self.class.name.clone();
        self.class.instance_factories.insert(
            method.into(),
            Arc::new(move |target: &(dyn Any + Send + Sync), args: &Arguments| {
                let target = downcast_ref::<T>(target, &class_name)?;
                factory(target, args).map(|value| Box::new(value) as Instance)
            }),
        );
        self
    }

    /// 属性 setter
    pub fn property<F>(mut self, property: impl Into<String>, setter: F) -> Self
    where
        F: Fn(&mut T, ResolvedValue) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let class_name = self.class.name.clone();
        self.class.setters.insert(
            property.into(),
            Arc::new(move |target: &mut (dyn Any + Send + Sync), value: ResolvedValue| setter(downcast_mut::<T>(target, &class_name)?, value)),
        );
        self
    }

    /// 初始化方法
    ///
    /// 与销毁方法一样只拿到共享引用，需要修改的状态放在内部可变的字段里。
    pub fn init_method<F>(mut self, method: impl Into<String>, init: F) -> Self
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let class_name = self.class.name.clone();
        self.class.init_methods.insert(
            method.into(),
            Arc::new(move |target: &(dyn Any + Send + Sync)| init(downcast_ref::<T>(target, &class_name)?)),
        );
        self
    }

    /// 销毁方法
    pub fn destroy_method<F>(mut self, method: impl Into<String>, destroy: F) -> Self
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let class_name = self.class.name.clone();
        self.class.destroy_methods.insert(
            method.into(),
            Arc::new(move |target: &(dyn Any + Send + Sync)| destroy(downcast_ref::<T>(target, &class_name)?)),
        );
        self
    }

    pub fn build(self) -> BeanClass {
        self.class
    }
}

// ========== ClassRegistry ==========

/// 类描述符提交 - 用于 inventory 收集
///
/// ```ignore
/// fn user_class() -> BeanClass {
///     BeanClass::builder::<User>("User").default_constructor().build()
/// }
///
/// inventory::submit! { ClassSubmission::new(user_class) }
/// ```
pub struct ClassSubmission {
    pub describe: fn() -> BeanClass,
}

impl ClassSubmission {
    pub const fn new(describe: fn() -> BeanClass) -> Self {
        Self { describe }
    }
}

inventory::collect!(ClassSubmission);

/// 类名到类描述符的映射
#[derive(Default)]
pub struct ClassRegistry {
    classes: RwLock<HashMap<String, Arc<BeanClass>>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建并加载所有通过 inventory 提交的类
    pub fn with_submitted() -> Self {
        let registry = Self::new();
        let count = registry.load_submitted();
        tracing::debug!("Loaded {} submitted bean classes", count);
        registry
    }

    /// 加载所有通过 inventory 提交的类，返回数量
    pub fn load_submitted(&self) -> usize {
        let mut count = 0;
        for submission in inventory::iter::<ClassSubmission> {
            self.register((submission.describe)());
            count += 1;
        }
        count
    }

    /// 注册类描述符，同名覆盖
    pub fn register(&self, class: BeanClass) {
        let name = class.name.clone();
        if self.classes.write().insert(name.clone(), Arc::new(class)).is_some() {
            tracing::debug!("Replaced bean class '{}'", name);
        } else {
            tracing::trace!("Registered bean class '{}'", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<BeanClass>> {
        self.classes.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.read().contains_key(name)
    }

    /// 按运行时类型查找（工厂方法产出的对象）
    pub fn find_by_type(&self, type_id: TypeId) -> Option<Arc<BeanClass>> {
        self.classes
            .read()
            .values()
            .find(|class| class.type_id == type_id)
            .cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.classes.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("classes", &self.names())
            .finish()
    }
}
