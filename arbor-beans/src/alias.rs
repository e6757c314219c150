use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::error::{BeanError, BeanResult};

/// 别名表：alias -> name
///
/// 别名可以指向另一个别名，解析时沿链查找直到规范名称；注册时拒绝形成环。
#[derive(Debug, Default)]
pub struct AliasRegistry {
    aliases: RwLock<IndexMap<String, String>>,
}

impl AliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_alias(&self, name: &str, alias: &str) -> BeanResult<()> {
        if name.trim().is_empty() {
            return Err(BeanError::store("'name' must not be empty"));
        }
        if alias.trim().is_empty() {
            return Err(BeanError::store("'alias' must not be empty"));
        }

        let mut aliases = self.aliases.write();

        if alias == name {
            if aliases.shift_remove(alias).is_some() {
                tracing::debug!("Alias definition '{}' ignored since it points to same name", alias);
            }
            return Ok(());
        }

        if let Some(registered_name) = aliases.get(alias) {
            if registered_name == name {
                // 相同映射重复注册
                return Ok(());
            }
            return Err(BeanError::store(format!(
                "Cannot define alias '{}' for name '{}': It is already registered for name '{}'.",
                alias, name, registered_name
            )));
        }

        if has_alias(&aliases, alias, name) {
            return Err(BeanError::store(format!(
                "Cannot register alias '{}' for name '{}': Circular reference - '{}' is a direct or indirect alias for '{}' already",
                alias, name, name, alias
            )));
        }

        aliases.insert(alias.to_string(), name.to_string());
        tracing::trace!("Alias definition '{}' registered for name '{}'", alias, name);
        Ok(())
    }

    pub fn remove_alias(&self, alias: &str) -> BeanResult<()> {
        self.aliases
            .write()
            .shift_remove(alias)
            .map(|_| ())
            .ok_or_else(|| BeanError::IllegalState(format!("No alias '{}' registered", alias)))
    }

    pub fn is_alias(&self, name: &str) -> bool {
        self.aliases.read().contains_key(name)
    }

    /// 沿别名链解析出规范名称；不是别名时原样返回
    pub fn canonical_name(&self, name: &str) -> String {
        let aliases = self.aliases.read();
        let mut canonical = name;
        while let Some(resolved) = aliases.get(canonical) {
            canonical = resolved;
        }
        canonical.to_string()
    }

    /// 直接或间接指向 `name` 的所有别名，按注册顺序
    pub fn aliases_of(&self, name: &str) -> Vec<String> {
        let aliases = self.aliases.read();
        let mut result = Vec::new();
        retrieve_aliases(&aliases, name, &mut result);
        result
    }
}

/// `name` 是否已经（直接或间接）以 `alias` 为别名
fn has_alias(aliases: &IndexMap<String, String>, name: &str, alias: &str) -> bool {
    aliases.iter().any(|(registered_alias, registered_name)| {
        registered_name == name
            && (registered_alias == alias || has_alias(aliases, registered_alias, alias))
    })
}

fn retrieve_aliases(aliases: &IndexMap<String, String>, name: &str, result: &mut Vec<String>) {
    for (alias, registered_name) in aliases {
        if registered_name == name {
            result.push(alias.clone());
            retrieve_aliases(aliases, alias, result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_chain_resolves_transitively() {
        let registry = AliasRegistry::new();
        registry.register_alias("user", "u").unwrap();
        registry.register_alias("u", "u2").unwrap();

        assert_eq!(registry.canonical_name("u2"), "user");
        assert_eq!(registry.canonical_name("user"), "user");
        assert_eq!(registry.aliases_of("user"), vec!["u", "u2"]);
    }

    #[test]
    fn test_same_mapping_is_idempotent_and_conflict_fails() {
        let registry = AliasRegistry::new();
        registry.register_alias("user", "u").unwrap();
        registry.register_alias("user", "u").unwrap();

        let err = registry.register_alias("admin", "u").unwrap_err();
        assert!(err.to_string().contains("already registered for name 'user'"));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let registry = AliasRegistry::new();
        registry.register_alias("a", "b").unwrap();
        registry.register_alias("b", "c").unwrap();
        let err = registry.register_alias("c", "a").unwrap_err();
        assert!(err.to_string().contains("Circular reference"));
    }

    #[test]
    fn test_self_alias_removes_stale_entry() {
        let registry = AliasRegistry::new();
        registry.register_alias("user", "u").unwrap();
        registry.register_alias("u", "u").unwrap();
        assert!(!registry.is_alias("u"));
    }

    #[test]
    fn test_remove_unknown_alias_fails() {
        let registry = AliasRegistry::new();
        assert!(matches!(registry.remove_alias("ghost"), Err(BeanError::IllegalState(_))));
    }
}
