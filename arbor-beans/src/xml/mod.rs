//! XML 定义读取
//!
//! 文档使用 `roxmltree` 解析。没有命名空间或者使用 [`BEANS_NAMESPACE_URI`]
//! 的元素属于默认语法，其他命名空间交给注册的 [`NamespaceHandler`]。
//!
//! ```xml
//! <beans xmlns:p="http://arbor.rs/schema/p" default-lazy-init="false">
//!     <bean id="user" class="User" p:name="nankong"/>
//!     <alias name="user" alias="u"/>
//!     <import resource="services.xml"/>
//! </beans>
//! ```

mod context;
mod delegate;
mod document;
mod namespace;
mod reader;

pub use context::ReaderContext;
pub use delegate::{DocumentDefaults, ParserDelegate};
pub use namespace::{
    DecoratorNode, DefaultDocumentHooks, DocumentHooks, NamespaceHandler, NamespaceHandlerResolver,
    PNamespaceHandler,
};
pub use reader::XmlBeanDefinitionReader;

/// 默认语法的命名空间
pub const BEANS_NAMESPACE_URI: &str = "http://arbor.rs/schema/beans";

/// `p:` 属性简写的命名空间
pub const P_NAMESPACE_URI: &str = "http://arbor.rs/schema/p";

pub const XSI_NAMESPACE_URI: &str = "http://www.w3.org/2001/XMLSchema-instance";

pub(crate) const BEANS_ELEMENT: &str = "beans";
pub(crate) const BEAN_ELEMENT: &str = "bean";
pub(crate) const IMPORT_ELEMENT: &str = "import";
pub(crate) const ALIAS_ELEMENT: &str = "alias";
pub(crate) const DESCRIPTION_ELEMENT: &str = "description";
pub(crate) const META_ELEMENT: &str = "meta";

pub(crate) const DEFAULT_VALUE: &str = "default";
pub(crate) const TRUE_VALUE: &str = "true";

/// 命名空间是否属于默认语法
pub(crate) fn is_default_namespace_uri(uri: Option<&str>) -> bool {
    matches!(uri, None | Some("") | Some(BEANS_NAMESPACE_URI))
}

pub(crate) fn is_default_namespace(node: roxmltree::Node<'_, '_>) -> bool {
    is_default_namespace_uri(node.tag_name().namespace())
}

/// 默认命名空间中名为 `name` 的元素
pub(crate) fn node_name_equals(node: roxmltree::Node<'_, '_>, name: &str) -> bool {
    node.is_element() && is_default_namespace(node) && node.tag_name().name() == name
}

/// 有文本内容的属性值
pub(crate) fn attribute_text(node: roxmltree::Node<'_, '_>, name: &str) -> Option<String> {
    node.attribute(name)
        .filter(|value| arbor_core::utils::strings::has_text(value))
        .map(String::from)
}

/// 元素的全部文本内容（包括 CDATA）
pub(crate) fn text_content(node: roxmltree::Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}
