use std::sync::Arc;

use arbor_core::utils::paths::apply_relative_path;
use arbor_core::utils::strings::{has_text, tokenize, MULTI_VALUE_DELIMITERS};
use arbor_core::{is_url, Resource};
use roxmltree::Node;

use crate::error::BeanResult;
use crate::registry::register_bean_definition_holder;

use super::context::ReaderContext;
use super::delegate::ParserDelegate;
use super::{
    is_default_namespace, ALIAS_ELEMENT, BEANS_ELEMENT, BEAN_ELEMENT, DESCRIPTION_ELEMENT, IMPORT_ELEMENT,
};

const PROFILE_ATTRIBUTE: &str = "profile";
const RESOURCE_ATTRIBUTE: &str = "resource";
const NAME_ATTRIBUTE: &str = "name";
const ALIAS_ATTRIBUTE: &str = "alias";

/// 注册根 `<beans>` 元素中的全部定义
pub(crate) fn register_bean_definitions(root: Node<'_, '_>, ctx: &ReaderContext<'_>) {
    do_register_bean_definitions(root, None, ctx);
}

fn do_register_bean_definitions(root: Node<'_, '_>, parent: Option<&ParserDelegate<'_>>, ctx: &ReaderContext<'_>) {
    let delegate = ParserDelegate::new(root, parent, ctx);
    ctx.listener().defaults_registered(delegate.defaults());

    if let Some(profile) = root.attribute(PROFILE_ATTRIBUTE).filter(|p| has_text(p)) {
        let profiles = tokenize(profile, MULTI_VALUE_DELIMITERS);
        if !ctx.environment().accepts_profiles(&profiles) {
            tracing::debug!(
                "Skipped XML bean definition element due to specified profiles [{}] not matching: {}",
                profile,
                ctx.resource().description()
            );
            return;
        }
    }

    ctx.hooks().pre_process(root, ctx);
    parse_bean_definitions(root, &delegate, ctx);
    ctx.hooks().post_process(root, ctx);
}

fn parse_bean_definitions(root: Node<'_, '_>, delegate: &ParserDelegate<'_>, ctx: &ReaderContext<'_>) {
    for ele in root.children().filter(|n| n.is_element()) {
        if !is_default_namespace(ele) {
            parse_custom_element(ele, ctx);
            continue;
        }
        match ele.tag_name().name() {
            IMPORT_ELEMENT => import_bean_definition_resource(ele, ctx),
            ALIAS_ELEMENT => process_alias_registration(ele, ctx),
            BEAN_ELEMENT => process_bean_definition(ele, delegate, ctx),
            BEANS_ELEMENT => do_register_bean_definitions(ele, Some(delegate), ctx),
            DESCRIPTION_ELEMENT => {}
            other => ctx.error(format!("Unknown element <{}> in <beans>", other), ele),
        }
    }
}

fn parse_custom_element(ele: Node<'_, '_>, ctx: &ReaderContext<'_>) {
    let namespace = ele.tag_name().namespace().unwrap_or_default();
    let Some(handler) = ctx.namespace_handler(namespace) else {
        ctx.error(
            format!("Unable to locate NamespaceHandler for XML schema namespace [{}]", namespace),
            ele,
        );
        return;
    };
    if let Err(e) = handler.parse(ele, ctx) {
        ctx.error_with_cause(format!("Failed to parse custom element <{}>", ele.tag_name().name()), ele, e);
    }
}

fn import_bean_definition_resource(ele: Node<'_, '_>, ctx: &ReaderContext<'_>) {
    let Some(location) = ele.attribute(RESOURCE_ATTRIBUTE).filter(|l| has_text(l)) else {
        ctx.error("Resource location must not be empty", ele);
        return;
    };

    let location = match ctx.environment().resolve_required_placeholders(location.trim()) {
        Ok(location) => location,
        Err(e) => {
            ctx.error_with_cause(
                format!("Failed to resolve placeholders in resource location [{}]", location),
                ele,
                e.into(),
            );
            return;
        }
    };

    let mut actual_resources: Vec<Arc<dyn Resource>> = Vec::new();
    if is_url(&location) {
        match ctx.reader().load_location(&location, &mut actual_resources) {
            Ok(count) => tracing::trace!("Imported {} bean definitions from URL location [{}]", count, location),
            Err(e) => {
                ctx.error_with_cause(
                    format!("Failed to import bean definitions from URL location [{}]", location),
                    ele,
                    e,
                );
                return;
            }
        }
    } else {
        match import_relative(&location, ctx, &mut actual_resources) {
            Ok(count) => tracing::trace!("Imported {} bean definitions from relative location [{}]", count, location),
            Err(e) => {
                ctx.error_with_cause(
                    format!("Failed to import bean definitions from relative location [{}]", location),
                    ele,
                    e,
                );
                return;
            }
        }
    }

    ctx.listener()
        .import_processed(&location, &actual_resources, &ctx.source(ele));
}

/// 先相对当前资源解析；不存在时把位置拼接到当前资源的 URL 上再交给加载器
fn import_relative(
    location: &str,
    ctx: &ReaderContext<'_>,
    actual_resources: &mut Vec<Arc<dyn Resource>>,
) -> BeanResult<usize> {
    let relative = ctx.resource().create_relative(location)?;
    if relative.exists() {
        let count = ctx.reader().load_bean_definitions(Arc::clone(&relative))?;
        actual_resources.push(relative);
        return Ok(count);
    }

    let base_url = ctx.resource().url()?;
    let absolute = apply_relative_path(base_url.as_str(), location);
    tracing::trace!(
        "Relative resource [{}] does not exist, trying [{}]",
        relative.description(),
        absolute
    );
    ctx.reader().load_location(&absolute, actual_resources)
}

fn process_alias_registration(ele: Node<'_, '_>, ctx: &ReaderContext<'_>) {
    let name = ele.attribute(NAME_ATTRIBUTE).filter(|n| has_text(n));
    let alias = ele.attribute(ALIAS_ATTRIBUTE).filter(|a| has_text(a));
    if name.is_none() {
        ctx.error("Name must not be empty", ele);
    }
    if alias.is_none() {
        ctx.error("Alias must not be empty", ele);
    }
    let (Some(name), Some(alias)) = (name, alias) else {
        return;
    };

    match ctx.registry().register_alias(name, alias) {
        Ok(()) => ctx
            .listener()
            .alias_registered(name, alias, &ctx.source(ele)),
        Err(e) => ctx.error_with_cause(
            format!("Failed to register alias '{}' for bean with name '{}'", alias, name),
            ele,
            e,
        ),
    }
}

fn process_bean_definition(ele: Node<'_, '_>, delegate: &ParserDelegate<'_>, ctx: &ReaderContext<'_>) {
    let Some(holder) = delegate.parse_bean_definition_element(ele, ctx, false) else {
        return;
    };
    let problems_before = ctx.problem_count();
    let holder = delegate.decorate_bean_definition_if_required(ele, holder, ctx);
    if ctx.problem_count() > problems_before {
        tracing::debug!("Skipping registration of bean '{}': decoration reported problems", holder.bean_name);
        return;
    }

    match register_bean_definition_holder(&holder, ctx.registry()) {
        Ok(()) => {
            tracing::trace!("Registered {}", holder);
            ctx.listener().component_registered(&holder);
        }
        Err(e) => ctx.error_with_cause(
            format!("Failed to register bean definition with name '{}'", holder.bean_name),
            ele,
            e,
        ),
    }
}
