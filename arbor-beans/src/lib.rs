// arbor-beans: Bean 定义注册表与实例化引擎
//
// 提供：
// - BeanDefinition 模型与父子定义合并
// - 别名表与定义注册表（覆盖策略、名称占用判定）
// - DefaultListableBeanFactory：单例/原型、init/destroy 回调、后置处理器
// - XML 定义读取器（import、alias、profile、自定义命名空间）

pub mod alias;
pub mod class;
pub mod definition;
pub mod error;
pub mod event;
pub mod factory;
pub mod lifecycle;
pub mod registry;
pub mod utils;
pub mod xml;

// 重新导出常用类型
pub use alias::AliasRegistry;
pub use class::{
    Arguments, BeanClass, BeanClassBuilder, ClassRegistry, ClassSubmission, DestroyMethod, Instance,
    ResolvedValue, SharedInstance,
};
pub use definition::{
    AutowireMode, BeanDefinition, BeanDefinitionHolder, BeanValue, ConstructorArgumentValues,
    PropertyValue, Scope, SourceLocation, ValueHolder,
};
pub use error::{BeanError, BeanResult, Problem, ProblemLocation, ProblemReport};
pub use event::{EmptyReaderEventListener, ReaderEventListener};
pub use factory::{BeanFactory, BeanFactoryExt, DefaultListableBeanFactory};
pub use lifecycle::{BeanFactoryPostProcessor, BeanPostProcessor};
pub use registry::{register_bean_definition_holder, BeanDefinitionRegistry};
pub use xml::{
    DocumentDefaults, DocumentHooks, NamespaceHandler, NamespaceHandlerResolver, ReaderContext,
    XmlBeanDefinitionReader,
};

// 重新导出 inventory，供 submit! 使用
pub use inventory;
