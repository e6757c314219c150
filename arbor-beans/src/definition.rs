//! Bean 定义模型
//!
//! [`BeanDefinition`] 只描述"如何创建"一个具名对象：类、构造参数、属性值、
//! 作用域与生命周期方法。它在解析阶段构建，注册之后以 `Arc` 共享且不再修改。

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Bean 的作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// 单例模式 - 容器中只有一个实例
    #[default]
    Singleton,

    /// 原型模式 - 每次请求都创建新实例
    Prototype,
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "singleton" => Ok(Scope::Singleton),
            "prototype" => Ok(Scope::Prototype),
            other => Err(format!("Invalid scope '{}': expected 'singleton' or 'prototype'", other)),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Singleton => write!(f, "singleton"),
            Scope::Prototype => write!(f, "prototype"),
        }
    }
}

/// 自动装配模式（仅支持按名称）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutowireMode {
    #[default]
    No,
    ByName,
}

impl FromStr for AutowireMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no" => Ok(AutowireMode::No),
            "byName" => Ok(AutowireMode::ByName),
            other => Err(format!("Unsupported autowire mode '{}': only 'no' and 'byName' are available", other)),
        }
    }
}

/// 定义的来源，用于诊断信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub resource: String,
    pub element: String,
    pub line: Option<u32>,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} <{}> (line {})", self.resource, self.element, line),
            None => write!(f, "{} <{}>", self.resource, self.element),
        }
    }
}

/// 属性值或构造参数值
#[derive(Debug, Clone, PartialEq)]
pub enum BeanValue {
    /// 字面量
    Literal(String),
    /// 对另一个 Bean 的引用（名称或别名）
    Reference(String),
    /// 内部 Bean，不注册到容器
    Inner(Box<BeanDefinitionHolder>),
    List(Vec<BeanValue>),
    Map(Vec<(String, BeanValue)>),
    Null,
}

impl BeanValue {
    pub fn literal(value: impl Into<String>) -> Self {
        BeanValue::Literal(value.into())
    }

    pub fn reference(name: impl Into<String>) -> Self {
        BeanValue::Reference(name.into())
    }
}

/// 一个构造参数
#[derive(Debug, Clone, PartialEq)]
pub struct ValueHolder {
    pub value: BeanValue,
    pub name: Option<String>,
    pub type_name: Option<String>,
}

impl ValueHolder {
    pub fn new(value: BeanValue) -> Self {
        Self {
            value,
            name: None,
            type_name: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// 构造参数：按下标的与按顺序的
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstructorArgumentValues {
    indexed: BTreeMap<usize, ValueHolder>,
    generic: Vec<ValueHolder>,
}

impl ConstructorArgumentValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_indexed(&mut self, index: usize, holder: ValueHolder) {
        self.indexed.insert(index, holder);
    }

    pub fn add_generic(&mut self, holder: ValueHolder) {
        self.generic.push(holder);
    }

    pub fn has_indexed(&self, index: usize) -> bool {
        self.indexed.contains_key(&index)
    }

    pub fn indexed(&self) -> &BTreeMap<usize, ValueHolder> {
        &self.indexed
    }

    pub fn generic(&self) -> &[ValueHolder] {
        &self.generic
    }

    pub fn len(&self) -> usize {
        self.indexed.len() + self.generic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexed.is_empty() && self.generic.is_empty()
    }

    /// 子定义覆盖父定义：下标参数按下标覆盖，顺序参数追加
    fn merge_from(&mut self, other: &ConstructorArgumentValues) {
        for (index, holder) in &other.indexed {
            self.indexed.insert(*index, holder.clone());
        }
        for holder in &other.generic {
            if !self.generic.contains(holder) {
                self.generic.push(holder.clone());
            }
        }
    }

    /// 按位置展开：下标参数占据各自位置，顺序参数依次填补空位
    ///
    /// 返回 `Err(index)` 表示该位置没有任何参数。下标超出参数总数时
    /// 必然出现空位，不会按下标分配空间。
    pub fn positional(&self) -> Result<Vec<&ValueHolder>, usize> {
        let mut generic = self.generic.iter();
        let mut slots = Vec::with_capacity(self.len());
        for index in 0..self.len() {
            match self.indexed.get(&index).or_else(|| generic.next()) {
                Some(holder) => slots.push(holder),
                None => return Err(index),
            }
        }
        Ok(slots)
    }
}

/// 一个属性值
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyValue {
    pub name: String,
    pub value: BeanValue,
}

impl PropertyValue {
    pub fn new(name: impl Into<String>, value: BeanValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Bean 定义
#[derive(Debug, Clone, Default)]
pub struct BeanDefinition {
    pub bean_class_name: Option<String>,
    pub parent_name: Option<String>,
    /// `None` 表示继承父定义或默认单例
    pub scope: Option<Scope>,
    /// `None` 表示继承父定义或默认非延迟
    pub lazy_init: Option<bool>,
    pub abstract_definition: bool,
    pub primary: bool,
    pub autowire_mode: AutowireMode,
    pub constructor_args: ConstructorArgumentValues,
    pub property_values: Vec<PropertyValue>,
    pub factory_bean_name: Option<String>,
    pub factory_method_name: Option<String>,
    pub init_method_name: Option<String>,
    pub enforce_init_method: bool,
    pub destroy_method_name: Option<String>,
    pub enforce_destroy_method: bool,
    pub depends_on: Vec<String>,
    pub description: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub source: Option<SourceLocation>,
}

impl BeanDefinition {
    pub fn new() -> Self {
        Self {
            enforce_init_method: true,
            enforce_destroy_method: true,
            ..Self::default()
        }
    }

    /// 以类名创建定义
    pub fn of_class(class_name: impl Into<String>) -> Self {
        Self {
            bean_class_name: Some(class_name.into()),
            ..Self::new()
        }
    }

    /// 以父定义创建子定义
    pub fn child_of(parent_name: impl Into<String>) -> Self {
        Self {
            parent_name: Some(parent_name.into()),
            ..Self::new()
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_lazy_init(mut self, lazy: bool) -> Self {
        self.lazy_init = Some(lazy);
        self
    }

    pub fn with_abstract(mut self, abstract_definition: bool) -> Self {
        self.abstract_definition = abstract_definition;
        self
    }

    pub fn with_constructor_arg(mut self, value: BeanValue) -> Self {
        self.constructor_args.add_generic(ValueHolder::new(value));
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: BeanValue) -> Self {
        self.add_property(PropertyValue::new(name, value));
        self
    }

    pub fn with_factory_method(mut self, factory_bean: Option<&str>, method: &str) -> Self {
        self.factory_bean_name = factory_bean.map(String::from);
        self.factory_method_name = Some(method.to_string());
        self
    }

    pub fn with_init_method(mut self, method: impl Into<String>) -> Self {
        self.init_method_name = Some(method.into());
        self
    }

    pub fn with_destroy_method(mut self, method: impl Into<String>) -> Self {
        self.destroy_method_name = Some(method.into());
        self
    }

    pub fn with_depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = names.into_iter().map(Into::into).collect();
        self
    }

    /// 添加或替换同名属性，保持首次出现的位置
    pub fn add_property(&mut self, property: PropertyValue) {
        match self.property_values.iter_mut().find(|p| p.name == property.name) {
            Some(existing) => *existing = property,
            None => self.property_values.push(property),
        }
    }

    pub fn property(&self, name: &str) -> Option<&BeanValue> {
        self.property_values
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    pub fn effective_scope(&self) -> Scope {
        self.scope.unwrap_or_default()
    }

    pub fn is_singleton(&self) -> bool {
        self.effective_scope() == Scope::Singleton
    }

    pub fn is_prototype(&self) -> bool {
        self.effective_scope() == Scope::Prototype
    }

    pub fn is_lazy_init(&self) -> bool {
        self.lazy_init.unwrap_or(false)
    }

    pub fn resource_description(&self) -> Option<String> {
        self.source.as_ref().map(|s| s.resource.clone())
    }

    /// 以当前定义为父、`child` 为子，计算合并后的定义
    ///
    /// `abstract` 不继承；`depends-on` 由子定义整体替换。
    pub fn overridden_by(&self, child: &BeanDefinition) -> BeanDefinition {
        let mut merged = self.clone();

        merged.parent_name = None;
        merged.abstract_definition = child.abstract_definition;
        merged.source = child.source.clone();

        if child.bean_class_name.is_some() {
            merged.bean_class_name = child.bean_class_name.clone();
        }
        if child.scope.is_some() {
            merged.scope = child.scope;
        }
        if child.lazy_init.is_some() {
            merged.lazy_init = child.lazy_init;
        }
        if child.factory_bean_name.is_some() {
            merged.factory_bean_name = child.factory_bean_name.clone();
        }
        if child.factory_method_name.is_some() {
            merged.factory_method_name = child.factory_method_name.clone();
        }
        if child.init_method_name.is_some() {
            merged.init_method_name = child.init_method_name.clone();
            merged.enforce_init_method = child.enforce_init_method;
        }
        if child.destroy_method_name.is_some() {
            merged.destroy_method_name = child.destroy_method_name.clone();
            merged.enforce_destroy_method = child.enforce_destroy_method;
        }
        if child.autowire_mode != AutowireMode::No {
            merged.autowire_mode = child.autowire_mode;
        }
        if child.description.is_some() {
            merged.description = child.description.clone();
        }
        merged.primary = child.primary;
        merged.depends_on = child.depends_on.clone();

        merged.constructor_args.merge_from(&child.constructor_args);
        for property in &child.property_values {
            merged.add_property(property.clone());
        }
        merged
            .attributes
            .extend(child.attributes.iter().map(|(k, v)| (k.clone(), v.clone())));

        merged
    }

    fn properties_equal(&self, other: &BeanDefinition) -> bool {
        self.property_values.len() == other.property_values.len()
            && self
                .property_values
                .iter()
                .all(|p| other.property(&p.name) == Some(&p.value))
    }
}

/// 结构相等：`source` 与 `description` 不参与比较，属性值按名称比较、与顺序无关
impl PartialEq for BeanDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.bean_class_name == other.bean_class_name
            && self.parent_name == other.parent_name
            && self.scope == other.scope
            && self.lazy_init == other.lazy_init
            && self.abstract_definition == other.abstract_definition
            && self.primary == other.primary
            && self.autowire_mode == other.autowire_mode
            && self.constructor_args == other.constructor_args
            && self.properties_equal(other)
            && self.factory_bean_name == other.factory_bean_name
            && self.factory_method_name == other.factory_method_name
            && self.init_method_name == other.init_method_name
            && self.enforce_init_method == other.enforce_init_method
            && self.destroy_method_name == other.destroy_method_name
            && self.enforce_destroy_method == other.enforce_destroy_method
            && self.depends_on == other.depends_on
            && self.attributes == other.attributes
    }
}

impl fmt::Display for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bean definition [class={}; parent={}; scope={}; abstract={}; lazyInit={:?}; \
             autowireMode={:?}; primary={}; factoryBeanName={}; factoryMethodName={}; \
             initMethodName={}; destroyMethodName={}]",
            self.bean_class_name.as_deref().unwrap_or("null"),
            self.parent_name.as_deref().unwrap_or("null"),
            self.scope.map_or_else(String::new, |s| s.to_string()),
            self.abstract_definition,
            self.lazy_init,
            self.autowire_mode,
            self.primary,
            self.factory_bean_name.as_deref().unwrap_or("null"),
            self.factory_method_name.as_deref().unwrap_or("null"),
            self.init_method_name.as_deref().unwrap_or("null"),
            self.destroy_method_name.as_deref().unwrap_or("null"),
        )?;
        if let Some(source) = &self.source {
            write!(f, "; defined in {}", source.resource)?;
        }
        Ok(())
    }
}

/// 定义 + 主名称 + 元素上声明的别名
#[derive(Debug, Clone, PartialEq)]
pub struct BeanDefinitionHolder {
    pub definition: BeanDefinition,
    pub bean_name: String,
    pub aliases: Vec<String>,
}

impl BeanDefinitionHolder {
    pub fn new(definition: BeanDefinition, bean_name: impl Into<String>) -> Self {
        Self {
            definition,
            bean_name: bean_name.into(),
            aliases: Vec::new(),
        }
    }

    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }

    /// 名称或任一别名是否匹配
    pub fn matches_name(&self, candidate: &str) -> bool {
        self.bean_name == candidate || self.aliases.iter().any(|a| a == candidate)
    }
}

impl fmt::Display for BeanDefinitionHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bean definition with name '{}'", self.bean_name)?;
        if !self.aliases.is_empty() {
            write!(f, " and aliases [{}]", self.aliases.join(","))?;
        }
        write!(f, ": {}", self.definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_definition() -> BeanDefinition {
        BeanDefinition::of_class("User")
            .with_constructor_arg(BeanValue::literal("nankong"))
            .with_property("age", BeanValue::literal("18"))
            .with_property("friend", BeanValue::reference("other"))
    }

    #[test]
    fn test_equality_ignores_property_order_and_source() {
        let a = user_definition();
        let mut b = BeanDefinition::of_class("User")
            .with_constructor_arg(BeanValue::literal("nankong"))
            .with_property("friend", BeanValue::reference("other"))
            .with_property("age", BeanValue::literal("18"));
        b.source = Some(SourceLocation {
            resource: "class path resource [beans.xml]".into(),
            element: "bean".into(),
            line: Some(4),
        });
        b.description = Some("a user".into());
        assert_eq!(a, b);

        let c = user_definition().with_property("age", BeanValue::literal("19"));
        assert_ne!(a, c);
        assert_ne!(a, user_definition().with_scope(Scope::Prototype));
    }

    #[test]
    fn test_add_property_replaces_in_place() {
        let def = user_definition().with_property("age", BeanValue::literal("20"));
        let names: Vec<_> = def.property_values.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["age", "friend"]);
        assert_eq!(def.property("age"), Some(&BeanValue::literal("20")));
    }

    #[test]
    fn test_merge_child_over_parent() {
        let parent = BeanDefinition::of_class("User")
            .with_scope(Scope::Prototype)
            .with_abstract(true)
            .with_property("age", BeanValue::literal("18"))
            .with_property("city", BeanValue::literal("Nanjing"))
            .with_init_method("setup");
        let child = BeanDefinition::child_of("base")
            .with_property("age", BeanValue::literal("30"))
            .with_lazy_init(true);

        let merged = parent.overridden_by(&child);
        assert_eq!(merged.bean_class_name.as_deref(), Some("User"));
        assert_eq!(merged.effective_scope(), Scope::Prototype);
        assert!(!merged.abstract_definition);
        assert!(merged.is_lazy_init());
        assert_eq!(merged.property("age"), Some(&BeanValue::literal("30")));
        assert_eq!(merged.property("city"), Some(&BeanValue::literal("Nanjing")));
        assert_eq!(merged.init_method_name.as_deref(), Some("setup"));
        assert!(merged.parent_name.is_none());
    }

    #[test]
    fn test_positional_arguments_fill_gaps() {
        let mut args = ConstructorArgumentValues::new();
        args.add_indexed(1, ValueHolder::new(BeanValue::literal("second")));
        args.add_generic(ValueHolder::new(BeanValue::literal("first")));
        args.add_generic(ValueHolder::new(BeanValue::literal("third")));

        let values: Vec<_> = args
            .positional()
            .unwrap()
            .into_iter()
            .map(|h| h.value.clone())
            .collect();
        assert_eq!(
            values,
            vec![
                BeanValue::literal("first"),
                BeanValue::literal("second"),
                BeanValue::literal("third")
            ]
        );

        let mut sparse = ConstructorArgumentValues::new();
        sparse.add_indexed(2, ValueHolder::new(BeanValue::Null));
        assert_eq!(sparse.positional().unwrap_err(), 0);
    }

    #[test]
    fn test_positional_with_huge_index_reports_gap() {
        let mut args = ConstructorArgumentValues::new();
        args.add_indexed(usize::MAX, ValueHolder::new(BeanValue::literal("x")));
        assert_eq!(args.positional().unwrap_err(), 0);

        args.add_generic(ValueHolder::new(BeanValue::literal("first")));
        assert_eq!(args.positional().unwrap_err(), 1);
    }

    #[test]
    fn test_scope_and_autowire_parse() {
        assert_eq!("prototype".parse::<Scope>().unwrap(), Scope::Prototype);
        assert!("request".parse::<Scope>().is_err());
        assert_eq!("byName".parse::<AutowireMode>().unwrap(), AutowireMode::ByName);
        assert!("byType".parse::<AutowireMode>().is_err());
    }
}
