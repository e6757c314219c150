use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arbor_core::{Environment, Resource};
use roxmltree::Node;

use crate::definition::{BeanDefinition, SourceLocation};
use crate::error::{BeanError, BeanResult, Problem, ProblemLocation};
use crate::event::ReaderEventListener;
use crate::registry::BeanDefinitionRegistry;

use super::namespace::{DocumentHooks, NamespaceHandler};
use super::reader::XmlBeanDefinitionReader;

/// 内部 Bean 名称后缀，进程内唯一
static INNER_BEAN_COUNTER: AtomicUsize = AtomicUsize::new(0);

const GENERATED_BEAN_NAME_SEPARATOR: char = '#';

/// 读取单个资源时的上下文：当前资源、问题收集与读取器的共享组件
pub struct ReaderContext<'c> {
    reader: &'c XmlBeanDefinitionReader<'c>,
    resource: Arc<dyn Resource>,
    problems: RefCell<Vec<Problem>>,
}

impl<'c> ReaderContext<'c> {
    pub(crate) fn new(reader: &'c XmlBeanDefinitionReader<'c>, resource: Arc<dyn Resource>) -> Self {
        Self {
            reader,
            resource,
            problems: RefCell::new(Vec::new()),
        }
    }

    /// 正在读取的资源
    pub fn resource(&self) -> &Arc<dyn Resource> {
        &self.resource
    }

    pub fn registry(&self) -> &dyn BeanDefinitionRegistry {
        self.reader.registry()
    }

    pub fn environment(&self) -> &Environment {
        self.reader.environment()
    }

    pub fn listener(&self) -> &dyn ReaderEventListener {
        self.reader.listener()
    }

    pub(crate) fn reader(&self) -> &'c XmlBeanDefinitionReader<'c> {
        self.reader
    }

    pub(crate) fn hooks(&self) -> &dyn DocumentHooks {
        self.reader.hooks()
    }

    pub fn namespace_handler(&self, namespace_uri: &str) -> Option<Arc<dyn NamespaceHandler>> {
        self.reader.namespace_handlers().resolve(namespace_uri)
    }

    fn line_of(node: Node<'_, '_>) -> u32 {
        node.document().text_pos_at(node.range().start).row
    }

    /// 元素在当前资源中的位置
    pub fn source(&self, node: Node<'_, '_>) -> SourceLocation {
        SourceLocation {
            resource: self.resource.description(),
            element: node.tag_name().name().to_string(),
            line: Some(Self::line_of(node)),
        }
    }

    fn location(&self, node: Node<'_, '_>) -> ProblemLocation {
        ProblemLocation {
            resource: self.resource.description(),
            element: Some(node.tag_name().name().to_string()),
            line: Some(Self::line_of(node)),
        }
    }

    /// 记录一个问题，解析继续
    pub fn error(&self, message: impl Into<String>, node: Node<'_, '_>) {
        let problem = Problem::new(message, self.location(node));
        tracing::debug!("{}", problem);
        self.problems.borrow_mut().push(problem);
    }

    /// 记录一个带原因的问题
    pub fn error_with_cause(&self, message: impl Into<String>, node: Node<'_, '_>, cause: BeanError) {
        let problem = Problem::new(message, self.location(node)).with_cause(cause);
        tracing::debug!("{}", problem);
        self.problems.borrow_mut().push(problem);
    }

    pub fn warning(&self, message: impl AsRef<str>, node: Node<'_, '_>) {
        tracing::warn!("{} ({})", message.as_ref(), self.location(node));
    }

    pub fn problem_count(&self) -> usize {
        self.problems.borrow().len()
    }

    pub(crate) fn into_problems(self) -> Vec<Problem> {
        self.problems.into_inner()
    }

    /// 为匿名定义生成名称
    ///
    /// 顶层定义使用 `<class>#<n>`，n 为第一个未被占用的序号；内部 Bean
    /// 不注册，后缀取进程内唯一的计数。
    pub fn generate_bean_name(&self, definition: &BeanDefinition, inner: bool) -> BeanResult<String> {
        let base = match (
            &definition.bean_class_name,
            &definition.parent_name,
            &definition.factory_bean_name,
        ) {
            (Some(class_name), _, _) => class_name.clone(),
            (None, Some(parent), _) => format!("{}$child", parent),
            (None, None, Some(factory_bean)) => format!("{}$created", factory_bean),
            (None, None, None) => {
                return Err(BeanError::store(
                    "Unnamed bean definition specifies neither 'class' nor 'parent' nor 'factory-bean' - can't generate bean name",
                ))
            }
        };

        if inner {
            let id = INNER_BEAN_COUNTER.fetch_add(1, Ordering::Relaxed);
            return Ok(format!("{}{}inner-{}", base, GENERATED_BEAN_NAME_SEPARATOR, id));
        }

        let registry = self.registry();
        let mut counter = 0usize;
        loop {
            let candidate = format!("{}{}{}", base, GENERATED_BEAN_NAME_SEPARATOR, counter);
            if !registry.is_bean_name_in_use(&candidate) {
                return Ok(candidate);
            }
            counter += 1;
        }
    }
}
