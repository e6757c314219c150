use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier};
use std::thread;

use arbor_beans::{BeanClass, BeanError, BeanFactory, BeanFactoryExt, ClassSubmission};
use arbor_context::{
    AnnotationConfigApplicationContext, ApplicationContext, BeanMethod, ClassPathStrategy,
    ClassPathXmlApplicationContext, ComponentSubmission, ConfigurationClass, ContextError, ContextSettings,
    FileSystemStrategy, FileSystemXmlApplicationContext, GenericApplicationContext,
};
use arbor_core::{ClassPath, CoreError, CoreResult, Environment, Resource};
use parking_lot::Mutex;
use url::Url;

static EVENTS: Mutex<Vec<String>> = Mutex::new(Vec::new());

/// 当前测试关心的事件（按名称前缀过滤，测试并行执行）
fn events_for(prefix: &str) -> Vec<String> {
    EVENTS
        .lock()
        .iter()
        .filter(|event| event.split(':').nth(1).is_some_and(|name| name.starts_with(prefix)))
        .cloned()
        .collect()
}

#[derive(Debug)]
struct User {
    name: String,
}

#[derive(Debug)]
struct Registry {
    size: usize,
}

struct AppConfig;

fn user_class() -> BeanClass {
    BeanClass::builder::<User>("User")
        .constructor(|args| {
            let name = args.string_or(0, "anonymous")?;
            EVENTS.lock().push(format!("create:{}", name));
            Ok(User { name })
        })
        .property("name", |user, value| {
            user.name = value.to_text()?;
            Ok(())
        })
        .destroy_method("close", |user| {
            EVENTS.lock().push(format!("destroy:{}", user.name));
            Ok(())
        })
        .build()
}

fn registry_class() -> BeanClass {
    BeanClass::builder::<Registry>("itest::component::Registry")
        .constructor(|_| Ok(Registry { size: 3 }))
        .build()
}

fn app_config_class() -> BeanClass {
    BeanClass::builder::<AppConfig>("itest::AppConfig")
        .constructor(|_| Ok(AppConfig))
        .factory_method("owner", |_: &AppConfig, _| Ok(User { name: "config-owner".into() }))
        .build()
}

arbor_beans::inventory::submit! { ClassSubmission::new(user_class) }
arbor_beans::inventory::submit! { ClassSubmission::new(registry_class) }
arbor_beans::inventory::submit! { ClassSubmission::new(app_config_class) }
arbor_beans::inventory::submit! { ComponentSubmission::new("itest::component::Registry") }

fn write(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[test]
fn test_user_bean_and_alias_share_instance() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "beans.xml",
        r#"<beans xmlns="http://arbor.rs/schema/beans">
            <bean name="user" class="User"><constructor-arg value="nankong"/></bean>
            <alias name="user" alias="u"/>
        </beans>"#,
    );

    let context = ClassPathXmlApplicationContext::from_builder(
        ApplicationContext::builder()
            .environment(Arc::new(Environment::new()))
            .strategy(Arc::new(ClassPathStrategy::new(ClassPath::new([dir.path()]))))
            .config_location("beans.xml"),
    )
    .unwrap();
    context.refresh().unwrap();

    let user = context.get_bean_typed::<User>("user").unwrap();
    assert_eq!(user.name, "nankong");
    let alias = context.get_bean_typed::<User>("u").unwrap();
    assert!(Arc::ptr_eq(&user, &alias));
    assert_eq!(context.get_aliases("user").unwrap(), vec!["u"]);
}

#[test]
fn test_refreshable_context_destroys_previous_singletons_in_reverse_order() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "conf/beans.xml",
        r#"<beans default-destroy-method="close">
            <bean id="first" class="User"><constructor-arg value="refresh-1"/></bean>
            <bean id="second" class="User"><constructor-arg value="refresh-2"/></bean>
            <bean id="third" class="User"><constructor-arg value="refresh-3"/></bean>
        </beans>"#,
    );

    let context = FileSystemXmlApplicationContext::from_builder(
        ApplicationContext::builder()
            .environment(Arc::new(Environment::new()))
            .strategy(Arc::new(FileSystemStrategy::with_base_dir(dir.path())))
            .config_location("conf/beans.xml"),
    )
    .unwrap();

    context.refresh().unwrap();
    assert_eq!(
        events_for("refresh-"),
        vec!["create:refresh-1", "create:refresh-2", "create:refresh-3"]
    );

    context.refresh().unwrap();
    let events = events_for("refresh-");
    assert_eq!(
        &events[3..],
        &[
            "destroy:refresh-3",
            "destroy:refresh-2",
            "destroy:refresh-1",
            "create:refresh-1",
            "create:refresh-2",
            "create:refresh-3",
        ]
    );
    assert!(context.is_active());
}

#[test]
fn test_generic_context_allows_a_single_refresh() {
    let context = GenericApplicationContext::new();
    context
        .load_xml_str(
            r#"<beans><bean id="user" class="User"><constructor-arg value="generic-once"/></bean></beans>"#,
            "generic beans",
        )
        .unwrap();
    context.refresh().unwrap();
    let first = context.get_bean("user").unwrap();

    let err = context.refresh().unwrap_err();
    assert!(matches!(err, ContextError::IllegalState(ref message) if message.contains("just call 'refresh' once")));
    assert!(Arc::ptr_eq(&first, &context.get_bean("user").unwrap()));
    assert_eq!(events_for("generic-once"), vec!["create:generic-once"]);
}

#[test]
fn test_profile_specific_beans_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "beans.xml",
        r#"<beans>
            <bean id="always" class="User"><constructor-arg value="profile-always"/></bean>
            <beans profile="test">
                <bean id="testOnly" class="User"><constructor-arg value="profile-test"/></bean>
            </beans>
            <beans profile="dev, staging">
                <bean id="devOnly" class="User"><constructor-arg value="profile-dev"/></bean>
            </beans>
        </beans>"#,
    );

    let context = ClassPathXmlApplicationContext::from_builder(
        ApplicationContext::builder()
            .environment(Arc::new(Environment::new()))
            .strategy(Arc::new(ClassPathStrategy::new(ClassPath::new([dir.path()]))))
            .active_profile("dev")
            .config_location("beans.xml"),
    )
    .unwrap();
    context.refresh().unwrap();

    assert!(context.contains_bean("always"));
    assert!(context.contains_bean("devOnly"));
    assert!(!context.contains_bean("testOnly"));
    assert!(matches!(context.get_bean("testOnly"), Err(BeanError::NoSuchDefinition(_))));
}

/// 只存在于内存中的根文档：相对资源都不存在，但 URL 指向真实目录
#[derive(Debug)]
struct DetachedResource {
    content: &'static str,
    url: Url,
}

impl Resource for DetachedResource {
    fn exists(&self) -> bool {
        true
    }

    fn open_read(&self) -> CoreResult<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.content.as_bytes())))
    }

    fn url(&self) -> CoreResult<Url> {
        Ok(self.url.clone())
    }

    fn create_relative(&self, relative_path: &str) -> CoreResult<Arc<dyn Resource>> {
        Ok(Arc::new(MissingResource(PathBuf::from(relative_path))))
    }

    fn description(&self) -> String {
        format!("detached resource [{}]", self.url)
    }

    fn resolved_path(&self) -> String {
        format!("detached:{}", self.url)
    }
}

#[derive(Debug)]
struct MissingResource(PathBuf);

impl Resource for MissingResource {
    fn exists(&self) -> bool {
        false
    }

    fn open_read(&self) -> CoreResult<Box<dyn Read + Send>> {
        Err(CoreError::resolution(self.description(), "does not exist"))
    }

    fn url(&self) -> CoreResult<Url> {
        Err(CoreError::resolution(self.description(), "has no URL"))
    }

    fn create_relative(&self, relative_path: &str) -> CoreResult<Arc<dyn Resource>> {
        Ok(Arc::new(MissingResource(self.0.join(relative_path))))
    }

    fn description(&self) -> String {
        format!("missing resource [{}]", self.0.display())
    }

    fn resolved_path(&self) -> String {
        format!("missing:{}", self.0.display())
    }
}

#[test]
fn test_relative_import_falls_back_to_url_of_importing_resource() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "a/child.xml",
        r#"<beans><bean id="child" class="User"><constructor-arg value="import-child"/></bean></beans>"#,
    );

    let root = DetachedResource {
        content: r#"<beans>
            <import resource="child.xml"/>
            <bean id="root" class="User"><constructor-arg value="import-root"/></bean>
        </beans>"#,
        url: Url::from_file_path(dir.path().join("a/root.xml")).unwrap(),
    };

    let context = GenericApplicationContext::new();
    assert_eq!(context.load_xml(Arc::new(root)).unwrap(), 2);
    context.refresh().unwrap();
    assert_eq!(context.get_bean_typed::<User>("child").unwrap().name, "import-child");
}

#[test]
fn test_relative_import_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let root = DetachedResource {
        content: r#"<beans><import resource="absent.xml"/></beans>"#,
        url: Url::from_file_path(dir.path().join("root.xml")).unwrap(),
    };

    let context = GenericApplicationContext::new();
    let err = context.load_xml(Arc::new(root)).unwrap_err();
    let Some(BeanError::Configuration(report)) = err.bean_error() else {
        panic!("expected a configuration report, got {err}");
    };
    assert_eq!(report.len(), 1);
    assert!(report.mentions("Failed to import bean definitions from relative location [absent.xml]"));
}

#[test]
fn test_annotation_context_registers_bean_methods_and_components() {
    let context = AnnotationConfigApplicationContext::from_builder(
        ApplicationContext::builder().environment(Arc::new(Environment::new())),
    )
    .unwrap();
    context
        .register(&ConfigurationClass::new("itest::AppConfig").bean(BeanMethod::new("owner").named("owner").named("boss")))
        .unwrap();
    assert_eq!(context.scan("itest::component").unwrap(), 1);
    context.refresh().unwrap();

    assert!(context.contains_bean("appConfig"));
    let owner = context.get_bean_typed::<User>("boss").unwrap();
    assert_eq!(owner.name, "config-owner");
    assert_eq!(context.get_bean_typed::<Registry>("registry").unwrap().size, 3);
}

#[test]
fn test_settings_file_configures_context() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "beans.xml",
        r#"<beans><bean id="user" class="User"><constructor-arg value="settings-user"/></bean></beans>"#,
    );
    write(
        dir.path(),
        "app.toml",
        r#"
        [context]
        id = "settings-context"
        allow-bean-definition-overriding = false
        config-locations = ["classpath:beans.xml"]
        "#,
    );

    let settings = ContextSettings::from_file(dir.path().join("app.toml")).unwrap();
    let context = ClassPathXmlApplicationContext::from_builder(
        ApplicationContext::builder()
            .environment(Arc::new(Environment::new()))
            .strategy(Arc::new(ClassPathStrategy::new(ClassPath::new([dir.path()]))))
            .settings(settings),
    )
    .unwrap();
    context.refresh().unwrap();

    assert_eq!(context.id(), "settings-context");
    let factory = context.get_bean_factory().unwrap();
    assert_eq!(factory.serialization_id().as_deref(), Some("settings-context"));
    assert!(!factory.is_allow_bean_definition_overriding());
    assert_eq!(context.get_bean_typed::<User>("user").unwrap().name, "settings-user");

    context.close();
    assert!(matches!(context.get_bean("user"), Err(BeanError::IllegalState(_))));
}

#[test]
fn test_concurrent_refresh_has_single_winner() {
    let context = GenericApplicationContext::new();
    context
        .load_xml_str(
            r#"<beans><bean id="user" class="User"><constructor-arg value="race-user"/></bean></beans>"#,
            "race beans",
        )
        .unwrap();

    let barrier = Barrier::new(2);
    let (barrier, shared) = (&barrier, &context);
    let results: Vec<_> = thread::scope(|scope| {
        let first = scope.spawn(move || {
            barrier.wait();
            shared.refresh()
        });
        let second = scope.spawn(move || {
            barrier.wait();
            shared.refresh()
        });
        vec![first.join().unwrap(), second.join().unwrap()]
    });

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|result| matches!(result, Err(ContextError::IllegalState(message)) if message.contains("just call 'refresh' once"))));
    assert!(context.is_active());
    assert_eq!(events_for("race-user"), vec!["create:race-user"]);
}
