use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use arbor_core::{ByteArrayResource, DefaultResourceLoader, Environment, Resource, ResourceLoader};

use crate::error::{BeanError, BeanResult, Problem, ProblemLocation, ProblemReport};
use crate::event::{EmptyReaderEventListener, ReaderEventListener};
use crate::registry::BeanDefinitionRegistry;

use super::context::ReaderContext;
use super::document;
use super::namespace::{DefaultDocumentHooks, DocumentHooks, NamespaceHandler, NamespaceHandlerResolver};
use super::{is_default_namespace, BEANS_ELEMENT};

/// XML 定义读取器
///
/// 把资源解析为定义并写入注册表。元素级问题会累积，整个资源处理完之后以
/// [`BeanError::Configuration`] 一次性返回；非良构文档对该资源是致命的。
pub struct XmlBeanDefinitionReader<'r> {
    registry: &'r dyn BeanDefinitionRegistry,
    environment: Arc<Environment>,
    resource_loader: Arc<dyn ResourceLoader>,
    namespace_handlers: NamespaceHandlerResolver,
    listener: Arc<dyn ReaderEventListener>,
    hooks: Arc<dyn DocumentHooks>,
    /// 正在加载的资源（按解析后的路径），用于检测循环 import
    resources_currently_being_loaded: RefCell<Vec<String>>,
}

impl<'r> XmlBeanDefinitionReader<'r> {
    pub fn new(registry: &'r dyn BeanDefinitionRegistry) -> Self {
        Self {
            registry,
            environment: Arc::new(Environment::standard()),
            resource_loader: Arc::new(DefaultResourceLoader::default()),
            namespace_handlers: NamespaceHandlerResolver::new(),
            listener: Arc::new(EmptyReaderEventListener),
            hooks: Arc::new(DefaultDocumentHooks),
            resources_currently_being_loaded: RefCell::new(Vec::new()),
        }
    }

    pub fn with_environment(mut self, environment: Arc<Environment>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_resource_loader(mut self, resource_loader: Arc<dyn ResourceLoader>) -> Self {
        self.resource_loader = resource_loader;
        self
    }

    pub fn with_event_listener(mut self, listener: Arc<dyn ReaderEventListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn with_document_hooks(mut self, hooks: Arc<dyn DocumentHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_namespace_handler(
        mut self,
        namespace_uri: impl Into<String>,
        handler: Arc<dyn NamespaceHandler>,
    ) -> Self {
        self.namespace_handlers.register(namespace_uri, handler);
        self
    }

    pub fn registry(&self) -> &'r dyn BeanDefinitionRegistry {
        self.registry
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn resource_loader(&self) -> &Arc<dyn ResourceLoader> {
        &self.resource_loader
    }

    pub(crate) fn listener(&self) -> &dyn ReaderEventListener {
        self.listener.as_ref()
    }

    pub(crate) fn hooks(&self) -> &dyn DocumentHooks {
        self.hooks.as_ref()
    }

    pub(crate) fn namespace_handlers(&self) -> &NamespaceHandlerResolver {
        &self.namespace_handlers
    }

    /// 从资源加载定义，返回新注册的定义数量
    pub fn load_bean_definitions(&self, resource: Arc<dyn Resource>) -> BeanResult<usize> {
        tracing::trace!("Loading XML bean definitions from {}", resource.description());

        let key = resource.resolved_path();
        if self.resources_currently_being_loaded.borrow().contains(&key) {
            return Err(BeanError::DefinitionStore {
                name: None,
                resource: Some(resource.description()),
                message: format!(
                    "Detected cyclic loading of {} - check your import definitions!",
                    resource.description()
                ),
            });
        }

        self.resources_currently_being_loaded
            .borrow_mut()
            .push(key.clone());
        let result = self.do_load_bean_definitions(resource);
        self.resources_currently_being_loaded
            .borrow_mut()
            .retain(|loading| loading != &key);
        result
    }

    fn do_load_bean_definitions(&self, resource: Arc<dyn Resource>) -> BeanResult<usize> {
        let description = resource.description();
        let content = resource.read_to_string()?;

        let document = roxmltree::Document::parse(&content).map_err(|e| BeanError::MalformedConfiguration {
            resource: description.clone(),
            message: e.to_string(),
        })?;

        let root = document.root_element();
        if !is_default_namespace(root) || root.tag_name().name() != BEANS_ELEMENT {
            return Err(BeanError::MalformedConfiguration {
                resource: description,
                message: format!("Root element must be <beans> but was <{}>", root.tag_name().name()),
            });
        }

        let count_before = self.registry.bean_definition_count();
        let context = ReaderContext::new(self, resource);
        document::register_bean_definitions(root, &context);

        let problems = context.into_problems();
        if !problems.is_empty() {
            return Err(BeanError::Configuration(ProblemReport::new(problems)));
        }

        let count = self
            .registry
            .bean_definition_count()
            .saturating_sub(count_before);
        tracing::debug!("Loaded {} bean definitions from {}", count, description);
        Ok(count)
    }

    /// 通过资源加载器解析位置并加载，实际资源追加到 `actual_resources`
    pub(crate) fn load_location(
        &self,
        location: &str,
        actual_resources: &mut Vec<Arc<dyn Resource>>,
    ) -> BeanResult<usize> {
        let resource = self.resource_loader.get_resource(location)?;
        let count = self.load_bean_definitions(Arc::clone(&resource))?;
        actual_resources.push(resource);
        Ok(count)
    }

    /// 从位置字符串加载
    pub fn load_bean_definitions_from_location(&self, location: &str) -> BeanResult<usize> {
        self.load_location(location, &mut Vec::new())
    }

    /// 依次加载多个位置
    ///
    /// 每个位置都会尝试；只有一个失败时原样返回，多个失败合并为一份问题报告。
    pub fn load_bean_definitions_from_locations<S: AsRef<str>>(&self, locations: &[S]) -> BeanResult<usize> {
        let mut count = 0;
        let mut failures = Vec::new();

        for location in locations {
            let location = location.as_ref();
            match self.load_bean_definitions_from_location(location) {
                Ok(loaded) => count += loaded,
                Err(e) => failures.push((location.to_string(), e)),
            }
        }

        if failures.len() == 1 {
            if let Some((_, error)) = failures.pop() {
                return Err(error);
            }
        }
        if !failures.is_empty() {
            let mut problems = Vec::new();
            for (location, error) in failures {
                match error {
                    BeanError::Configuration(report) => problems.extend(report.into_problems()),
                    other => problems.push(
                        Problem::new(
                            format!("Failed to load bean definitions from location [{}]", location),
                            ProblemLocation {
                                resource: location,
                                element: None,
                                line: None,
                            },
                        )
                        .with_cause(other),
                    ),
                }
            }
            return Err(BeanError::Configuration(ProblemReport::new(problems)));
        }

        Ok(count)
    }

    /// 从内存中的文档加载
    pub fn load_bean_definitions_from_str(&self, content: &str, description: &str) -> BeanResult<usize> {
        self.load_bean_definitions(Arc::new(ByteArrayResource::new(content.as_bytes(), description)))
    }
}

impl fmt::Debug for XmlBeanDefinitionReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlBeanDefinitionReader")
            .field("namespace_handlers", &self.namespace_handlers)
            .field("resources_currently_being_loaded", &self.resources_currently_being_loaded)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{AutowireMode, BeanDefinitionHolder, BeanValue, Scope, SourceLocation};
    use crate::factory::DefaultListableBeanFactory;
    use crate::xml::DocumentDefaults;
    use arbor_core::{ClassPath, FileSystemResource, MapPropertySource};
    use parking_lot::Mutex;
    use std::fs;

    fn load(factory: &DefaultListableBeanFactory, xml: &str) -> BeanResult<usize> {
        XmlBeanDefinitionReader::new(factory).load_bean_definitions_from_str(xml, "test.xml")
    }

    #[test]
    fn test_bean_with_id_names_and_properties() {
        let factory = DefaultListableBeanFactory::default();
        let count = load(
            &factory,
            r#"<beans>
                <bean id="user" name="u1, u2" class="User" scope="prototype" lazy-init="true">
                    <constructor-arg index="0" value="nankong"/>
                    <property name="friend" ref="other"/>
                    <property name="tags">
                        <list><value>a</value><value>b</value></list>
                    </property>
                </bean>
            </beans>"#,
        )
        .unwrap();
        assert_eq!(count, 1);

        let definition = factory.get_bean_definition("user").unwrap();
        assert_eq!(definition.bean_class_name.as_deref(), Some("User"));
        assert_eq!(definition.scope, Some(Scope::Prototype));
        assert!(definition.is_lazy_init());
        assert_eq!(
            definition.property("friend"),
            Some(&BeanValue::reference("other"))
        );
        assert_eq!(
            definition.property("tags"),
            Some(&BeanValue::List(vec![BeanValue::literal("a"), BeanValue::literal("b")]))
        );
        assert_eq!(factory.get_aliases("user"), vec!["u1", "u2"]);
        assert_eq!(definition.source.as_ref().unwrap().line, Some(2));
    }

    #[test]
    fn test_first_name_becomes_id() {
        let factory = DefaultListableBeanFactory::default();
        load(&factory, r#"<beans><bean name="a;b" class="User"/></beans>"#).unwrap();
        assert!(factory.contains_bean_definition("a"));
        assert_eq!(factory.get_aliases("a"), vec!["b"]);
    }

    #[test]
    fn test_generated_names_alias_class_once() {
        let factory = DefaultListableBeanFactory::default();
        load(
            &factory,
            r#"<beans>
                <bean class="User"/>
                <bean class="User"/>
                <bean parent="User#0"/>
            </beans>"#,
        )
        .unwrap();

        assert_eq!(
            factory.bean_definition_names(),
            vec!["User#0", "User#1", "User#0$child#0"]
        );
        assert_eq!(factory.canonical_name("User"), "User#0");
    }

    #[test]
    fn test_duplicate_name_in_same_level_is_problem() {
        let factory = DefaultListableBeanFactory::default();
        let err = load(
            &factory,
            r#"<beans>
                <bean id="a" class="User"/>
                <bean id="b" name="a" class="User"/>
                <beans><bean id="a" class="User"/></beans>
            </beans>"#,
        )
        .unwrap_err();

        match err {
            BeanError::Configuration(report) => {
                assert_eq!(report.len(), 1);
                assert!(report.mentions("Bean name 'a' is already used"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_problems_accumulate_and_parsing_continues() {
        let factory = DefaultListableBeanFactory::default();
        let err = load(
            &factory,
            r#"<beans>
                <alias/>
                <bean id="bad" class="User" scope="session"/>
                <bean id="good" class="User"/>
                <bean id="args" class="User">
                    <constructor-arg index="0" value="a"/>
                    <constructor-arg index="0" value="b"/>
                </bean>
                <bean id="props" class="User">
                    <property name="x" value="1" ref="y"/>
                </bean>
            </beans>"#,
        )
        .unwrap_err();

        let BeanError::Configuration(report) = err else {
            panic!("expected a problem report");
        };
        // alias 缺 name 与 alias 各算一个问题
        assert_eq!(report.len(), 5);
        assert!(report.mentions("Name must not be empty"));
        assert!(report.mentions("Alias must not be empty"));
        assert!(report.mentions("Invalid scope 'session'"));
        assert!(report.mentions("Ambiguous constructor-arg entries for index 0"));
        assert!(report.mentions("either 'ref' attribute OR 'value' attribute"));
        assert!(factory.contains_bean_definition("good"));
        assert!(!factory.contains_bean_definition("bad"));
    }

    #[test]
    fn test_constructor_index_out_of_range_is_problem() {
        let factory = DefaultListableBeanFactory::default();
        let err = load(
            &factory,
            r#"<beans>
                <bean id="huge" class="User"><constructor-arg index="18446744073709551615" value="x"/></bean>
                <bean id="gap" class="User"><constructor-arg index="1" value="x"/></bean>
                <bean id="ok" class="User">
                    <constructor-arg index="1" value="b"/>
                    <constructor-arg index="0" value="a"/>
                </bean>
                <bean id="child" parent="ok"><constructor-arg index="1" value="c"/></bean>
            </beans>"#,
        )
        .unwrap_err();

        let BeanError::Configuration(report) = err else {
            panic!("expected a problem report");
        };
        assert_eq!(report.len(), 2);
        assert!(report.mentions("is out of range: 18446744073709551615 (bean declares 1 constructor arguments)"));
        assert!(report.mentions("is out of range: 1 (bean declares 1 constructor arguments)"));
        assert!(!factory.contains_bean_definition("huge"));
        assert!(!factory.contains_bean_definition("gap"));
        assert!(factory.contains_bean_definition("ok"));
        assert!(factory.contains_bean_definition("child"));
    }

    #[test]
    fn test_malformed_document_registers_nothing() {
        let factory = DefaultListableBeanFactory::default();
        let err = load(&factory, r#"<beans><bean id="a" class="User"></beans>"#).unwrap_err();
        assert!(matches!(err, BeanError::MalformedConfiguration { .. }));

        let err = load(&factory, r#"<components/>"#).unwrap_err();
        assert!(matches!(err, BeanError::MalformedConfiguration { .. }));
        assert_eq!(factory.bean_definition_count(), 0);
    }

    #[test]
    fn test_store_conflict_reported() {
        let factory = DefaultListableBeanFactory::default();
        factory.set_allow_bean_definition_overriding(false);
        load(&factory, r#"<beans><bean id="a" class="User"/></beans>"#).unwrap();

        let err = load(&factory, r#"<beans><bean id="a" class="Other"/><bean id="b" class="User"/></beans>"#)
            .unwrap_err();
        assert!(matches!(err, BeanError::Configuration(ref report) if report.mentions("There is already")));
        assert!(factory.contains_bean_definition("b"));
    }

    #[test]
    fn test_profiles_skip_elements() {
        let factory = DefaultListableBeanFactory::default();
        let environment = Arc::new(Environment::new());
        environment.set_active_profiles(["dev"]);

        let count = XmlBeanDefinitionReader::new(&factory)
            .with_environment(environment)
            .load_bean_definitions_from_str(
                r#"<beans>
                    <beans profile="dev,test"><bean id="dev" class="User"/></beans>
                    <beans profile="prod"><bean id="prod" class="User"/></beans>
                    <beans profile="!prod"><bean id="notProd" class="User"/></beans>
                </beans>"#,
                "profiles.xml",
            )
            .unwrap();

        assert_eq!(count, 2);
        assert!(factory.contains_bean_definition("dev"));
        assert!(!factory.contains_bean_definition("prod"));
        assert!(factory.contains_bean_definition("notProd"));
    }

    #[test]
    fn test_nested_defaults_inherit() {
        let factory = DefaultListableBeanFactory::default();
        load(
            &factory,
            r#"<beans default-lazy-init="true" default-init-method="setup" default-autowire="byName">
                <bean id="outer" class="User"/>
                <beans default-lazy-init="default" default-init-method="">
                    <bean id="inner" class="User" lazy-init="false"/>
                </beans>
            </beans>"#,
        )
        .unwrap();

        let outer = factory.get_bean_definition("outer").unwrap();
        assert!(outer.is_lazy_init());
        assert_eq!(outer.init_method_name.as_deref(), Some("setup"));
        assert!(!outer.enforce_init_method);
        assert_eq!(outer.autowire_mode, AutowireMode::ByName);

        let inner = factory.get_bean_definition("inner").unwrap();
        assert!(!inner.is_lazy_init());
        assert_eq!(inner.init_method_name, None);
        assert_eq!(inner.autowire_mode, AutowireMode::ByName);
    }

    #[test]
    fn test_value_elements() {
        let factory = DefaultListableBeanFactory::default();
        load(
            &factory,
            r#"<beans>
                <bean id="values" class="Holder">
                    <property name="map">
                        <map>
                            <entry key="a" value="1"/>
                            <entry key="b" value-ref="other"/>
                            <entry><key><value>c</value></key><null/></entry>
                        </map>
                    </property>
                    <property name="props">
                        <props><prop key="x"> 1 </prop></props>
                    </property>
                    <property name="set">
                        <set><value>a</value><value>a</value><ref bean="b"/></set>
                    </property>
                    <property name="inner">
                        <bean class="User"><property name="name" value="in"/></bean>
                    </property>
                </bean>
            </beans>"#,
        )
        .unwrap();

        let definition = factory.get_bean_definition("values").unwrap();
        assert_eq!(
            definition.property("map"),
            Some(&BeanValue::Map(vec![
                ("a".to_string(), BeanValue::literal("1")),
                ("b".to_string(), BeanValue::reference("other")),
                ("c".to_string(), BeanValue::Null),
            ]))
        );
        assert_eq!(
            definition.property("props"),
            Some(&BeanValue::Map(vec![("x".to_string(), BeanValue::literal("1"))]))
        );
        assert_eq!(
            definition.property("set"),
            Some(&BeanValue::List(vec![BeanValue::literal("a"), BeanValue::reference("b")]))
        );
        match definition.property("inner") {
            Some(BeanValue::Inner(holder)) => {
                assert!(holder.bean_name.starts_with("User#"));
                assert!(!factory.contains_bean_definition(&holder.bean_name));
            }
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn test_p_namespace_decoration() {
        let factory = DefaultListableBeanFactory::default();
        load(
            &factory,
            r#"<beans xmlns:p="http://arbor.rs/schema/p">
                <bean id="user" class="User" p:name="nankong" p:friend-ref="other"/>
            </beans>"#,
        )
        .unwrap();

        let definition = factory.get_bean_definition("user").unwrap();
        assert_eq!(definition.property("name"), Some(&BeanValue::literal("nankong")));
        assert_eq!(definition.property("friend"), Some(&BeanValue::reference("other")));
    }

    #[test]
    fn test_unknown_namespace_element_is_problem() {
        let factory = DefaultListableBeanFactory::default();
        let err = load(
            &factory,
            r#"<beans xmlns:tx="http://example.com/tx"><tx:annotation-driven/></beans>"#,
        )
        .unwrap_err();
        assert!(matches!(err, BeanError::Configuration(ref r) if r.mentions("http://example.com/tx")));
    }

    #[test]
    fn test_failed_decoration_skips_registration() {
        let factory = DefaultListableBeanFactory::default();
        let listener = Arc::new(RecordingListener::default());
        let err = XmlBeanDefinitionReader::new(&factory)
            .with_event_listener(listener.clone())
            .load_bean_definitions_from_str(
                r#"<beans xmlns:tx="http://example.com/tx">
                    <bean id="plain" class="User"/>
                    <bean id="decorated" class="User"><tx:advice/></bean>
                </beans>"#,
                "test.xml",
            )
            .unwrap_err();

        let BeanError::Configuration(report) = err else {
            panic!("expected a problem report");
        };
        assert_eq!(report.len(), 1);
        assert!(report.mentions("http://example.com/tx"));
        assert!(factory.contains_bean_definition("plain"));
        assert!(!factory.contains_bean_definition("decorated"));
        assert_eq!(*listener.events.lock(), vec!["defaults:false", "component:plain"]);
    }

    #[derive(Default)]
    struct RecordingListener {
        events: Mutex<Vec<String>>,
    }

    impl ReaderEventListener for RecordingListener {
        fn defaults_registered(&self, defaults: &DocumentDefaults) {
            self.events.lock().push(format!("defaults:{}", defaults.lazy_init));
        }

        fn component_registered(&self, holder: &BeanDefinitionHolder) {
            self.events.lock().push(format!("component:{}", holder.bean_name));
        }

        fn alias_registered(&self, name: &str, alias: &str, _source: &SourceLocation) {
            self.events.lock().push(format!("alias:{}->{}", alias, name));
        }

        fn import_processed(&self, location: &str, resources: &[Arc<dyn Resource>], _source: &SourceLocation) {
            self.events
                .lock()
                .push(format!("import:{}:{}", location, resources.len()));
        }
    }

    #[test]
    fn test_relative_import_and_events() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("conf")).unwrap();
        fs::write(
            dir.path().join("conf/root.xml"),
            r#"<beans>
                <import resource="${sub.dir}/child.xml"/>
                <bean id="user" class="User"/>
                <alias name="user" alias="u"/>
            </beans>"#,
        )
        .unwrap();
        fs::create_dir(dir.path().join("conf/sub")).unwrap();
        fs::write(
            dir.path().join("conf/sub/child.xml"),
            r#"<beans default-lazy-init="true"><bean id="child" class="User"/></beans>"#,
        )
        .unwrap();

        let environment = Arc::new(Environment::new());
        environment.add_property_source(Box::new(MapPropertySource::new("test").with("sub.dir", "sub")));

        let factory = DefaultListableBeanFactory::default();
        let listener = Arc::new(RecordingListener::default());
        let count = XmlBeanDefinitionReader::new(&factory)
            .with_environment(environment)
            .with_event_listener(listener.clone())
            .load_bean_definitions(Arc::new(FileSystemResource::new(dir.path().join("conf/root.xml"))))
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(
            *listener.events.lock(),
            vec![
                "defaults:false",
                "defaults:true",
                "component:child",
                "import:sub/child.xml:1",
                "component:user",
                "alias:u->user",
            ]
        );
    }

    #[test]
    fn test_import_by_class_path_url() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("root.xml"),
            r#"<beans><import resource="classpath:shared.xml"/></beans>"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("shared.xml"),
            r#"<beans><bean id="shared" class="User"/></beans>"#,
        )
        .unwrap();

        let factory = DefaultListableBeanFactory::default();
        let loader = Arc::new(DefaultResourceLoader::new(ClassPath::new([dir.path()])));
        let count = XmlBeanDefinitionReader::new(&factory)
            .with_resource_loader(loader)
            .load_bean_definitions_from_location("classpath:root.xml")
            .unwrap();
        assert_eq!(count, 1);
        assert!(factory.contains_bean_definition("shared"));
    }

    #[test]
    fn test_cyclic_import_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.xml"), r#"<beans><import resource="b.xml"/></beans>"#).unwrap();
        fs::write(dir.path().join("b.xml"), r#"<beans><import resource="a.xml"/></beans>"#).unwrap();

        let factory = DefaultListableBeanFactory::default();
        let err = XmlBeanDefinitionReader::new(&factory)
            .load_bean_definitions(Arc::new(FileSystemResource::new(dir.path().join("a.xml"))))
            .unwrap_err();

        let BeanError::Configuration(report) = err else {
            panic!("expected a problem report");
        };
        assert!(report.mentions("Failed to import bean definitions from relative location [b.xml]"));
    }

    #[test]
    fn test_multiple_location_failures_are_merged() {
        let factory = DefaultListableBeanFactory::default();
        let reader = XmlBeanDefinitionReader::new(&factory);

        let single = reader.load_bean_definitions_from_locations(&["missing.xml"]).unwrap_err();
        assert!(matches!(single, BeanError::Core(_)));

        let merged = reader
            .load_bean_definitions_from_locations(&["missing.xml", "also-missing.xml"])
            .unwrap_err();
        assert!(matches!(merged, BeanError::Configuration(ref r) if r.len() == 2));
    }
}
