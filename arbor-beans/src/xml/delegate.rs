//! `<bean>` 元素解析
//!
//! 每个 `<beans>` 层级一个 [`ParserDelegate`]，持有该层的默认值与已使用的名称。
//! 嵌套的 `<beans>` 创建引用父级的子 delegate，默认值为 `default` 时向上继承。

use std::cell::RefCell;
use std::collections::HashSet;

use arbor_core::utils::strings::{has_text, tokenize, MULTI_VALUE_DELIMITERS};
use roxmltree::Node;

use crate::definition::{
    AutowireMode, BeanDefinition, BeanDefinitionHolder, BeanValue, PropertyValue, Scope, ValueHolder,
};

use super::context::ReaderContext;
use super::namespace::DecoratorNode;
use super::{
    attribute_text, is_default_namespace, is_default_namespace_uri, node_name_equals, text_content,
    BEAN_ELEMENT, DEFAULT_VALUE, DESCRIPTION_ELEMENT, META_ELEMENT, TRUE_VALUE, XSI_NAMESPACE_URI,
};

const ID_ATTRIBUTE: &str = "id";
const NAME_ATTRIBUTE: &str = "name";
const CLASS_ATTRIBUTE: &str = "class";
const PARENT_ATTRIBUTE: &str = "parent";
const SCOPE_ATTRIBUTE: &str = "scope";
const SINGLETON_ATTRIBUTE: &str = "singleton";
const ABSTRACT_ATTRIBUTE: &str = "abstract";
const LAZY_INIT_ATTRIBUTE: &str = "lazy-init";
const AUTOWIRE_ATTRIBUTE: &str = "autowire";
const DEPENDS_ON_ATTRIBUTE: &str = "depends-on";
const PRIMARY_ATTRIBUTE: &str = "primary";
const INIT_METHOD_ATTRIBUTE: &str = "init-method";
const DESTROY_METHOD_ATTRIBUTE: &str = "destroy-method";
const FACTORY_METHOD_ATTRIBUTE: &str = "factory-method";
const FACTORY_BEAN_ATTRIBUTE: &str = "factory-bean";

const DEFAULT_LAZY_INIT_ATTRIBUTE: &str = "default-lazy-init";
const DEFAULT_AUTOWIRE_ATTRIBUTE: &str = "default-autowire";
const DEFAULT_INIT_METHOD_ATTRIBUTE: &str = "default-init-method";
const DEFAULT_DESTROY_METHOD_ATTRIBUTE: &str = "default-destroy-method";

const CONSTRUCTOR_ARG_ELEMENT: &str = "constructor-arg";
const PROPERTY_ELEMENT: &str = "property";
const INDEX_ATTRIBUTE: &str = "index";
const TYPE_ATTRIBUTE: &str = "type";
const REF_ATTRIBUTE: &str = "ref";
const VALUE_ATTRIBUTE: &str = "value";
const KEY_ATTRIBUTE: &str = "key";
const BEAN_REF_ATTRIBUTE: &str = "bean";
const VALUE_REF_ATTRIBUTE: &str = "value-ref";
const KEY_REF_ATTRIBUTE: &str = "key-ref";

const REF_ELEMENT: &str = "ref";
const IDREF_ELEMENT: &str = "idref";
const VALUE_ELEMENT: &str = "value";
const NULL_ELEMENT: &str = "null";
const LIST_ELEMENT: &str = "list";
const ARRAY_ELEMENT: &str = "array";
const SET_ELEMENT: &str = "set";
const MAP_ELEMENT: &str = "map";
const ENTRY_ELEMENT: &str = "entry";
const KEY_ELEMENT: &str = "key";
const PROPS_ELEMENT: &str = "props";
const PROP_ELEMENT: &str = "prop";

/// 一个 `<beans>` 层级的默认值
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentDefaults {
    pub lazy_init: bool,
    pub autowire: AutowireMode,
    pub init_method: Option<String>,
    pub destroy_method: Option<String>,
}

/// 单层解析 delegate
pub struct ParserDelegate<'p> {
    defaults: DocumentDefaults,
    parent: Option<&'p ParserDelegate<'p>>,
    used_names: RefCell<HashSet<String>>,
}

impl<'p> ParserDelegate<'p> {
    /// 从 `<beans>` 元素的 `default-*` 属性计算默认值，缺省或 `default` 时继承父级
    pub fn new(root: Node<'_, '_>, parent: Option<&'p ParserDelegate<'p>>, ctx: &ReaderContext<'_>) -> Self {
        let inherited = parent.map(|p| p.defaults.clone()).unwrap_or_default();

        let lazy_init = match explicit(root, DEFAULT_LAZY_INIT_ATTRIBUTE) {
            Some(value) => value == TRUE_VALUE,
            None => inherited.lazy_init,
        };

        let autowire = match explicit(root, DEFAULT_AUTOWIRE_ATTRIBUTE) {
            Some(value) => value.parse().unwrap_or_else(|e: String| {
                ctx.error(e, root);
                inherited.autowire
            }),
            None => inherited.autowire,
        };

        let init_method = match root.attribute(DEFAULT_INIT_METHOD_ATTRIBUTE) {
            Some(value) => Some(value.to_string()).filter(|v| has_text(v)),
            None => inherited.init_method.clone(),
        };
        let destroy_method = match root.attribute(DEFAULT_DESTROY_METHOD_ATTRIBUTE) {
            Some(value) => Some(value.to_string()).filter(|v| has_text(v)),
            None => inherited.destroy_method.clone(),
        };

        Self {
            defaults: DocumentDefaults {
                lazy_init,
                autowire,
                init_method,
                destroy_method,
            },
            parent,
            used_names: RefCell::new(HashSet::new()),
        }
    }

    pub fn defaults(&self) -> &DocumentDefaults {
        &self.defaults
    }

    pub fn parent(&self) -> Option<&'p ParserDelegate<'p>> {
        self.parent
    }

    /// 解析 `<bean>`；有问题时返回 `None`，问题已记录在上下文中
    pub fn parse_bean_definition_element(
        &self,
        ele: Node<'_, '_>,
        ctx: &ReaderContext<'_>,
        inner: bool,
    ) -> Option<BeanDefinitionHolder> {
        let id = ele.attribute(ID_ATTRIBUTE).unwrap_or_default();
        let mut aliases = tokenize(ele.attribute(NAME_ATTRIBUTE).unwrap_or_default(), MULTI_VALUE_DELIMITERS);

        let mut bean_name = id.trim().to_string();
        if !has_text(&bean_name) && !aliases.is_empty() {
            bean_name = aliases.remove(0);
            tracing::trace!(
                "No XML 'id' specified - using '{}' as bean name and {:?} as aliases",
                bean_name,
                aliases
            );
        }

        let problems_before = ctx.problem_count();
        if !inner {
            self.check_name_uniqueness(&bean_name, &aliases, ele, ctx);
        }

        let definition = self.parse_bean_definition(ele, ctx);
        if ctx.problem_count() > problems_before {
            return None;
        }

        if !has_text(&bean_name) {
            match ctx.generate_bean_name(&definition, inner) {
                Ok(generated) => {
                    if !inner {
                        if let Some(class_name) = &definition.bean_class_name {
                            if generated.len() > class_name.len()
                                && generated.starts_with(class_name.as_str())
                                && !ctx.registry().is_bean_name_in_use(class_name)
                            {
                                aliases.push(class_name.clone());
                            }
                        }
                    }
                    tracing::trace!(
                        "Neither XML 'id' nor 'name' specified - using generated bean name [{}]",
                        generated
                    );
                    bean_name = generated;
                }
                Err(e) => {
                    ctx.error_with_cause("Cannot generate a bean name", ele, e);
                    return None;
                }
            }
        }

        Some(BeanDefinitionHolder::new(definition, bean_name).with_aliases(aliases))
    }

    fn check_name_uniqueness(&self, bean_name: &str, aliases: &[String], ele: Node<'_, '_>, ctx: &ReaderContext<'_>) {
        let mut used = self.used_names.borrow_mut();

        let found = if has_text(bean_name) && used.contains(bean_name) {
            Some(bean_name.to_string())
        } else {
            aliases.iter().find(|alias| used.contains(alias.as_str())).cloned()
        };
        if let Some(found) = found {
            ctx.error(
                format!("Bean name '{}' is already used in this <beans> element", found),
                ele,
            );
        }

        if has_text(bean_name) {
            used.insert(bean_name.to_string());
        }
        used.extend(aliases.iter().cloned());
    }

    fn parse_bean_definition(&self, ele: Node<'_, '_>, ctx: &ReaderContext<'_>) -> BeanDefinition {
        let mut definition = BeanDefinition::new();
        definition.bean_class_name = attribute_text(ele, CLASS_ATTRIBUTE).map(|c| c.trim().to_string());
        definition.parent_name = attribute_text(ele, PARENT_ATTRIBUTE);

        self.parse_bean_definition_attributes(ele, ctx, &mut definition);

        let arg_count = ele
            .children()
            .filter(|n| node_name_equals(*n, CONSTRUCTOR_ARG_ELEMENT))
            .count();
        for child in ele.children().filter(|n| n.is_element() && is_default_namespace(*n)) {
            match child.tag_name().name() {
                DESCRIPTION_ELEMENT => definition.description = Some(text_content(child).trim().to_string()),
                META_ELEMENT => match (child.attribute(KEY_ATTRIBUTE), child.attribute(VALUE_ATTRIBUTE)) {
                    (Some(key), Some(value)) if has_text(key) => {
                        definition.attributes.insert(key.to_string(), value.to_string());
                    }
                    _ => ctx.error("<meta> element requires 'key' and 'value' attributes", child),
                },
                CONSTRUCTOR_ARG_ELEMENT => self.parse_constructor_arg_element(child, arg_count, ctx, &mut definition),
                PROPERTY_ELEMENT => self.parse_property_element(child, ctx, &mut definition),
                other => ctx.error(format!("Unknown <bean> sub-element: <{}>", other), child),
            }
        }

        definition.source = Some(ctx.source(ele));
        definition
    }

    fn parse_bean_definition_attributes(
        &self,
        ele: Node<'_, '_>,
        ctx: &ReaderContext<'_>,
        definition: &mut BeanDefinition,
    ) {
        if ele.has_attribute(SINGLETON_ATTRIBUTE) {
            ctx.error("Old 1.x 'singleton' attribute in use - upgrade to 'scope' declaration", ele);
        } else if let Some(scope) = attribute_text(ele, SCOPE_ATTRIBUTE) {
            match scope.parse::<Scope>() {
                Ok(scope) => definition.scope = Some(scope),
                Err(e) => ctx.error(e, ele),
            }
        }

        if let Some(value) = ele.attribute(ABSTRACT_ATTRIBUTE) {
            definition.abstract_definition = value == TRUE_VALUE;
        }

        definition.lazy_init = match explicit(ele, LAZY_INIT_ATTRIBUTE) {
            Some(value) => Some(value == TRUE_VALUE),
            None if self.defaults.lazy_init => Some(true),
            None => None,
        };

        definition.autowire_mode = match explicit(ele, AUTOWIRE_ATTRIBUTE) {
            Some(value) => value.parse().unwrap_or_else(|e: String| {
                ctx.error(e, ele);
                AutowireMode::No
            }),
            None => self.defaults.autowire,
        };

        if let Some(depends_on) = ele.attribute(DEPENDS_ON_ATTRIBUTE) {
            definition.depends_on = tokenize(depends_on, MULTI_VALUE_DELIMITERS);
        }

        if let Some(value) = ele.attribute(PRIMARY_ATTRIBUTE) {
            definition.primary = value == TRUE_VALUE;
        }

        match ele.attribute(INIT_METHOD_ATTRIBUTE) {
            Some(method) => definition.init_method_name = Some(method.to_string()).filter(|m| has_text(m)),
            None => {
                if let Some(method) = &self.defaults.init_method {
                    definition.init_method_name = Some(method.clone());
                    definition.enforce_init_method = false;
                }
            }
        }

        match ele.attribute(DESTROY_METHOD_ATTRIBUTE) {
            Some(method) => definition.destroy_method_name = Some(method.to_string()).filter(|m| has_text(m)),
            None => {
                if let Some(method) = &self.defaults.destroy_method {
                    definition.destroy_method_name = Some(method.clone());
                    definition.enforce_destroy_method = false;
                }
            }
        }

        definition.factory_method_name = attribute_text(ele, FACTORY_METHOD_ATTRIBUTE);
        definition.factory_bean_name = attribute_text(ele, FACTORY_BEAN_ATTRIBUTE);
    }

    /// `arg_count` 为该 `<bean>` 下 `<constructor-arg>` 的个数
    ///
    /// 没有父定义时下标必须小于它；子定义可以覆盖父定义中更靠后的参数。
    fn parse_constructor_arg_element(
        &self,
        ele: Node<'_, '_>,
        arg_count: usize,
        ctx: &ReaderContext<'_>,
        definition: &mut BeanDefinition,
    ) {
        let Some(value) = self.parse_property_value(ele, ctx, "<constructor-arg> element") else {
            return;
        };

        let mut holder = ValueHolder::new(value);
        holder.type_name = attribute_text(ele, TYPE_ATTRIBUTE);
        holder.name = attribute_text(ele, NAME_ATTRIBUTE);

        match ele.attribute(INDEX_ATTRIBUTE) {
            Some(index) => match index.trim().parse::<usize>() {
                Ok(index) if definition.parent_name.is_none() && index >= arg_count => {
                    ctx.error(
                        format!(
                            "Attribute 'index' of tag 'constructor-arg' is out of range: {} (bean declares {} constructor arguments)",
                            index, arg_count
                        ),
                        ele,
                    );
                }
                Ok(index) if definition.constructor_args.has_indexed(index) => {
                    ctx.error(format!("Ambiguous constructor-arg entries for index {}", index), ele);
                }
                Ok(index) => definition.constructor_args.add_indexed(index, holder),
                Err(_) => ctx.error(
                    format!("Attribute 'index' of tag 'constructor-arg' must be a non-negative integer, found '{}'", index),
                    ele,
                ),
            },
            None => definition.constructor_args.add_generic(holder),
        }
    }

    fn parse_property_element(&self, ele: Node<'_, '_>, ctx: &ReaderContext<'_>, definition: &mut BeanDefinition) {
        let Some(name) = attribute_text(ele, NAME_ATTRIBUTE) else {
            ctx.error("Tag 'property' must have a 'name' attribute", ele);
            return;
        };
        if definition.property(&name).is_some() {
            ctx.error(format!("Multiple 'property' definitions for property '{}'", name), ele);
            return;
        }

        let element_name = format!("<property> element for property '{}'", name);
        if let Some(value) = self.parse_property_value(ele, ctx, &element_name) {
            definition.add_property(PropertyValue::new(name, value));
        }
    }

    /// `ref`/`value` 属性或唯一的值子元素
    fn parse_property_value(&self, ele: Node<'_, '_>, ctx: &ReaderContext<'_>, element_name: &str) -> Option<BeanValue> {
        let mut sub_element = None;
        for child in ele.children().filter(|n| n.is_element()) {
            if node_name_equals(child, DESCRIPTION_ELEMENT) || node_name_equals(child, META_ELEMENT) {
                continue;
            }
            if sub_element.is_some() {
                ctx.error(format!("{} must not contain more than one sub-element", element_name), ele);
                return None;
            }
            sub_element = Some(child);
        }

        let ref_attribute = ele.attribute(REF_ATTRIBUTE);
        let value_attribute = ele.attribute(VALUE_ATTRIBUTE);
        if (ref_attribute.is_some() && value_attribute.is_some())
            || ((ref_attribute.is_some() || value_attribute.is_some()) && sub_element.is_some())
        {
            ctx.error(
                format!(
                    "{} is only allowed to contain either 'ref' attribute OR 'value' attribute OR sub-element",
                    element_name
                ),
                ele,
            );
            return None;
        }

        if let Some(reference) = ref_attribute {
            if !has_text(reference) {
                ctx.error(format!("{} contains empty 'ref' attribute", element_name), ele);
                return None;
            }
            return Some(BeanValue::reference(reference.trim()));
        }
        if let Some(value) = value_attribute {
            return Some(BeanValue::literal(value));
        }
        if let Some(sub_element) = sub_element {
            return self.parse_value_element(sub_element, ctx);
        }

        ctx.error(format!("{} must specify a ref or value", element_name), ele);
        None
    }

    /// 值元素：value、ref、idref、null、list/array/set、map、props 或内部 bean
    fn parse_value_element(&self, ele: Node<'_, '_>, ctx: &ReaderContext<'_>) -> Option<BeanValue> {
        if !is_default_namespace(ele) {
            ctx.error(
                format!(
                    "Unsupported nested element <{}> in namespace [{}]",
                    ele.tag_name().name(),
                    ele.tag_name().namespace().unwrap_or_default()
                ),
                ele,
            );
            return None;
        }

        match ele.tag_name().name() {
            BEAN_ELEMENT => {
                let holder = self.parse_bean_definition_element(ele, ctx, true)?;
                let holder = self.decorate_bean_definition_if_required(ele, holder, ctx);
                Some(BeanValue::Inner(Box::new(holder)))
            }
            REF_ELEMENT => match attribute_text(ele, BEAN_REF_ATTRIBUTE) {
                Some(bean) => Some(BeanValue::reference(bean.trim())),
                None => {
                    ctx.error("'bean' is required for <ref> element", ele);
                    None
                }
            },
            IDREF_ELEMENT => match attribute_text(ele, BEAN_REF_ATTRIBUTE) {
                Some(bean) => Some(BeanValue::literal(bean.trim())),
                None => {
                    ctx.error("'bean' is required for <idref> element", ele);
                    None
                }
            },
            VALUE_ELEMENT => Some(BeanValue::literal(text_content(ele))),
            NULL_ELEMENT => Some(BeanValue::Null),
            LIST_ELEMENT | ARRAY_ELEMENT => self.parse_collection_elements(ele, ctx).map(BeanValue::List),
            SET_ELEMENT => self.parse_collection_elements(ele, ctx).map(|items| {
                let mut unique: Vec<BeanValue> = Vec::with_capacity(items.len());
                for item in items {
                    if !unique.contains(&item) {
                        unique.push(item);
                    }
                }
                BeanValue::List(unique)
            }),
            MAP_ELEMENT => self.parse_map_element(ele, ctx),
            PROPS_ELEMENT => self.parse_props_element(ele, ctx),
            other => {
                ctx.error(format!("Unknown property sub-element: <{}>", other), ele);
                None
            }
        }
    }

    fn parse_collection_elements(&self, ele: Node<'_, '_>, ctx: &ReaderContext<'_>) -> Option<Vec<BeanValue>> {
        let mut items = Vec::new();
        let mut valid = true;
        for child in ele.children().filter(|n| n.is_element()) {
            if node_name_equals(child, DESCRIPTION_ELEMENT) {
                continue;
            }
            match self.parse_value_element(child, ctx) {
                Some(item) => items.push(item),
                None => valid = false,
            }
        }
        valid.then_some(items)
    }

    fn parse_map_element(&self, ele: Node<'_, '_>, ctx: &ReaderContext<'_>) -> Option<BeanValue> {
        let mut entries = Vec::new();
        let mut valid = true;

        for entry in ele.children().filter(|n| n.is_element()) {
            if node_name_equals(entry, DESCRIPTION_ELEMENT) {
                continue;
            }
            if !node_name_equals(entry, ENTRY_ELEMENT) {
                ctx.error(format!("Unknown <map> sub-element: <{}>", entry.tag_name().name()), entry);
                valid = false;
                continue;
            }
            match self.parse_entry_element(entry, ctx) {
                Some(pair) => entries.push(pair),
                None => valid = false,
            }
        }

        valid.then_some(BeanValue::Map(entries))
    }

    fn parse_entry_element(&self, entry: Node<'_, '_>, ctx: &ReaderContext<'_>) -> Option<(String, BeanValue)> {
        if entry.has_attribute(KEY_REF_ATTRIBUTE) {
            ctx.error("<entry> element 'key-ref' is not supported: map keys must be literal", entry);
            return None;
        }

        let mut key_element = None;
        let mut value_element = None;
        for child in entry.children().filter(|n| n.is_element()) {
            if node_name_equals(child, DESCRIPTION_ELEMENT) {
                continue;
            }
            if node_name_equals(child, KEY_ELEMENT) {
                key_element = Some(child);
            } else if value_element.is_some() {
                ctx.error("<entry> element must not contain more than one value sub-element", entry);
                return None;
            } else {
                value_element = Some(child);
            }
        }

        let key = match (entry.attribute(KEY_ATTRIBUTE), key_element) {
            (Some(_), Some(_)) => {
                ctx.error(
                    "<entry> element is only allowed to contain either a 'key' attribute OR a <key> sub-element",
                    entry,
                );
                return None;
            }
            (Some(key), None) => key.to_string(),
            (None, Some(key_element)) => {
                let Some(value_node) = key_element.children().find(|n| n.is_element()) else {
                    ctx.error("<key> element must contain a value element", key_element);
                    return None;
                };
                match self.parse_value_element(value_node, ctx)? {
                    BeanValue::Literal(key) => key,
                    _ => {
                        ctx.error("<key> element must contain a literal value", key_element);
                        return None;
                    }
                }
            }
            (None, None) => {
                ctx.error("<entry> element is missing a 'key' attribute", entry);
                return None;
            }
        };

        let value_attribute = entry.attribute(VALUE_ATTRIBUTE);
        let value_ref_attribute = entry.attribute(VALUE_REF_ATTRIBUTE);
        let specified = [value_attribute.is_some(), value_ref_attribute.is_some(), value_element.is_some()]
            .iter()
            .filter(|present| **present)
            .count();
        if specified > 1 {
            ctx.error(
                "<entry> element is only allowed to contain either 'value' attribute OR 'value-ref' attribute OR sub-element",
                entry,
            );
            return None;
        }

        let value = if let Some(value) = value_attribute {
            BeanValue::literal(value)
        } else if let Some(reference) = value_ref_attribute.filter(|r| has_text(r)) {
            BeanValue::reference(reference.trim())
        } else if let Some(value_element) = value_element {
            self.parse_value_element(value_element, ctx)?
        } else {
            ctx.error(format!("<entry> element for key '{}' must specify a value", key), entry);
            return None;
        };

        Some((key, value))
    }

    fn parse_props_element(&self, ele: Node<'_, '_>, ctx: &ReaderContext<'_>) -> Option<BeanValue> {
        let mut entries = Vec::new();
        let mut valid = true;
        for prop in ele.children().filter(|n| node_name_equals(*n, PROP_ELEMENT)) {
            match prop.attribute(KEY_ATTRIBUTE) {
                Some(key) => entries.push((key.to_string(), BeanValue::literal(text_content(prop).trim()))),
                None => {
                    ctx.error("<prop> element is missing a 'key' attribute", prop);
                    valid = false;
                }
            }
        }
        valid.then_some(BeanValue::Map(entries))
    }

    /// 把自定义命名空间的属性和子元素交给对应的处理器
    pub fn decorate_bean_definition_if_required(
        &self,
        ele: Node<'_, '_>,
        holder: BeanDefinitionHolder,
        ctx: &ReaderContext<'_>,
    ) -> BeanDefinitionHolder {
        let mut decorated = holder;

        for attribute in ele.attributes() {
            let namespace = attribute.namespace();
            if is_default_namespace_uri(namespace) || namespace == Some(XSI_NAMESPACE_URI) {
                continue;
            }
            decorated = self.decorate_if_required(DecoratorNode::Attribute(attribute), ele, decorated, ctx);
        }

        for child in ele.children().filter(|n| n.is_element() && !is_default_namespace(*n)) {
            decorated = self.decorate_if_required(DecoratorNode::Element(child), child, decorated, ctx);
        }

        decorated
    }

    fn decorate_if_required(
        &self,
        node: DecoratorNode<'_, '_>,
        element: Node<'_, '_>,
        holder: BeanDefinitionHolder,
        ctx: &ReaderContext<'_>,
    ) -> BeanDefinitionHolder {
        let namespace = node.namespace().unwrap_or_default().to_string();
        let Some(handler) = ctx.namespace_handler(&namespace) else {
            match node {
                DecoratorNode::Attribute(attribute) => tracing::debug!(
                    "Ignoring attribute '{}' in unknown namespace [{}]",
                    attribute.name(),
                    namespace
                ),
                DecoratorNode::Element(_) => ctx.error(
                    format!("Unable to locate NamespaceHandler for XML schema namespace [{}]", namespace),
                    element,
                ),
            }
            return holder;
        };

        let local_name = node.local_name().to_string();
        match handler.decorate(node, holder.clone(), ctx) {
            Ok(decorated) => decorated,
            Err(e) => {
                ctx.error_with_cause(
                    format!("Failed to decorate bean '{}' with [{}:{}]", holder.bean_name, namespace, local_name),
                    element,
                    e,
                );
                holder
            }
        }
    }
}

/// 显式给出且不是 `default` 的属性值
fn explicit<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attribute(name)
        .map(str::trim)
        .filter(|value| !value.is_empty() && *value != DEFAULT_VALUE)
}
