use std::sync::Arc;

use crate::definition::{BeanDefinition, BeanDefinitionHolder};
use crate::error::BeanResult;

/// BeanDefinitionRegistry - 定义与别名的可变存储
///
/// 由 [`DefaultListableBeanFactory`](crate::DefaultListableBeanFactory) 实现，
/// 上下文层也可以通过委托实现它，使 XML 读取器可以直接写入上下文。
pub trait BeanDefinitionRegistry: Send + Sync {
    /// 注册定义
    ///
    /// 相同（相等）的定义重复注册是无副作用的成功；不同的定义在禁止覆盖时失败。
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> BeanResult<()>;

    /// 移除定义
    fn remove_bean_definition(&self, name: &str) -> BeanResult<()>;

    /// 获取原始（未合并的）定义
    fn get_bean_definition(&self, name: &str) -> BeanResult<Arc<BeanDefinition>>;

    fn contains_bean_definition(&self, name: &str) -> bool;

    /// 按注册顺序返回所有定义名称
    fn bean_definition_names(&self) -> Vec<String>;

    fn bean_definition_count(&self) -> usize;

    fn register_alias(&self, name: &str, alias: &str) -> BeanResult<()>;

    fn remove_alias(&self, alias: &str) -> BeanResult<()>;

    fn is_alias(&self, name: &str) -> bool;

    /// 指向同一个规范名称的所有别名
    ///
    /// `name` 本身是别名时，规范名称排在第一位，且结果不包含 `name`。
    fn get_aliases(&self, name: &str) -> Vec<String>;

    /// 名称是否已被定义、别名或单例实例占用
    fn is_bean_name_in_use(&self, name: &str) -> bool;
}

/// 以主名称及全部别名注册一个 holder
pub fn register_bean_definition_holder(
    holder: &BeanDefinitionHolder,
    registry: &dyn BeanDefinitionRegistry,
) -> BeanResult<()> {
    registry.register_bean_definition(&holder.bean_name, holder.definition.clone())?;
    for alias in &holder.aliases {
        registry.register_alias(&holder.bean_name, alias)?;
    }
    Ok(())
}
