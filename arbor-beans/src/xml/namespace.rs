use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use roxmltree::{Attribute, Node};

use crate::definition::{BeanDefinitionHolder, BeanValue, PropertyValue};
use crate::error::{BeanError, BeanResult};

use super::context::ReaderContext;
use super::P_NAMESPACE_URI;

/// 需要装饰的节点：`<bean>` 上的自定义属性或自定义子元素
#[derive(Debug, Clone)]
pub enum DecoratorNode<'a, 'input> {
    Attribute(Attribute<'a, 'input>),
    Element(Node<'a, 'input>),
}

impl DecoratorNode<'_, '_> {
    /// 不带前缀的本地名称
    pub fn local_name(&self) -> &str {
        match self {
            DecoratorNode::Attribute(attribute) => attribute.name(),
            DecoratorNode::Element(element) => element.tag_name().name(),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        match self {
            DecoratorNode::Attribute(attribute) => attribute.namespace(),
            DecoratorNode::Element(element) => element.tag_name().namespace(),
        }
    }
}

/// 自定义命名空间处理器
pub trait NamespaceHandler: Send + Sync {
    /// 处理 `<beans>` 下的顶层自定义元素，通常直接向注册表写入定义
    fn parse(&self, element: Node<'_, '_>, _context: &ReaderContext<'_>) -> BeanResult<()> {
        Err(BeanError::IllegalState(format!(
            "Namespace handler does not support top-level element <{}>",
            element.tag_name().name()
        )))
    }

    /// 装饰一个已解析的 `<bean>`
    fn decorate(
        &self,
        _node: DecoratorNode<'_, '_>,
        holder: BeanDefinitionHolder,
        _context: &ReaderContext<'_>,
    ) -> BeanResult<BeanDefinitionHolder> {
        Ok(holder)
    }
}

/// `p:` 属性简写：`p:name="v"` 为字面量，`p:friend-ref="b"` 为引用
#[derive(Debug, Default, Clone, Copy)]
pub struct PNamespaceHandler;

const REF_SUFFIX: &str = "-ref";

impl NamespaceHandler for PNamespaceHandler {
    fn decorate(
        &self,
        node: DecoratorNode<'_, '_>,
        mut holder: BeanDefinitionHolder,
        _context: &ReaderContext<'_>,
    ) -> BeanResult<BeanDefinitionHolder> {
        let attribute = match node {
            DecoratorNode::Attribute(attribute) => attribute,
            DecoratorNode::Element(element) => {
                return Err(BeanError::IllegalState(format!(
                    "p namespace does not define element <{}>",
                    element.tag_name().name()
                )));
            }
        };

        let (property, value) = match attribute.name().strip_suffix(REF_SUFFIX) {
            Some(property) => (property, BeanValue::reference(attribute.value())),
            None => (attribute.name(), BeanValue::literal(attribute.value())),
        };

        if holder.definition.property(property).is_some() {
            return Err(BeanError::store_for(
                &holder.bean_name,
                holder.definition.resource_description(),
                format!(
                    "Property '{}' is already defined using both <property> and inline syntax. Only one approach may be used per property.",
                    property
                ),
            ));
        }
        holder
            .definition
            .add_property(PropertyValue::new(property, value));
        Ok(holder)
    }
}

/// 命名空间 URI 到处理器的映射
pub struct NamespaceHandlerResolver {
    handlers: HashMap<String, Arc<dyn NamespaceHandler>>,
}

impl NamespaceHandlerResolver {
    /// 内置 `p:` 处理器
    pub fn new() -> Self {
        let mut resolver = Self::empty();
        resolver.register(P_NAMESPACE_URI, Arc::new(PNamespaceHandler));
        resolver
    }

    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// 注册处理器，同一 URI 覆盖
    pub fn register(&mut self, namespace_uri: impl Into<String>, handler: Arc<dyn NamespaceHandler>) {
        let namespace_uri = namespace_uri.into();
        tracing::debug!("Registered namespace handler for [{}]", namespace_uri);
        self.handlers.insert(namespace_uri, handler);
    }

    pub fn resolve(&self, namespace_uri: &str) -> Option<Arc<dyn NamespaceHandler>> {
        self.handlers.get(namespace_uri).cloned()
    }
}

impl Default for NamespaceHandlerResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NamespaceHandlerResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespaceHandlerResolver")
            .field("namespaces", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// 在处理每个 `<beans>` 元素的子元素之前和之后调用
pub trait DocumentHooks: Send + Sync {
    fn pre_process(&self, _root: Node<'_, '_>, _context: &ReaderContext<'_>) {}

    fn post_process(&self, _root: Node<'_, '_>, _context: &ReaderContext<'_>) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultDocumentHooks;

impl DocumentHooks for DefaultDocumentHooks {}
