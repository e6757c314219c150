//! Bean 工厂扩展机制
//!
//! 提供在 Bean 初始化前后以及定义加载完成后进行自定义处理的钩子。

use crate::class::SharedInstance;
use crate::factory::DefaultListableBeanFactory;

/// BeanPostProcessor trait
///
/// 在 Bean 初始化的不同阶段提供钩子，允许替换或包装 Bean 实例
pub trait BeanPostProcessor: Send + Sync {
    /// 在 init 方法之前调用
    ///
    /// 返回处理后的实例，init 方法作用在返回的实例上
    fn post_process_before_initialization(
        &self,
        bean: SharedInstance,
        _bean_name: &str,
    ) -> anyhow::Result<SharedInstance> {
        Ok(bean)
    }

    /// 在 init 方法之后调用
    fn post_process_after_initialization(
        &self,
        bean: SharedInstance,
        _bean_name: &str,
    ) -> anyhow::Result<SharedInstance> {
        Ok(bean)
    }

    /// 获取处理器的名称（用于日志和调试）
    fn name(&self) -> &str {
        "BeanPostProcessor"
    }

    /// 获取处理器的优先级（数字越小优先级越高）
    fn order(&self) -> i32 {
        1000
    }
}

/// BeanFactoryPostProcessor trait
///
/// 在所有定义加载完成之后、任何单例实例化之前调用，可以修改或追加定义
pub trait BeanFactoryPostProcessor: Send + Sync {
    fn post_process_bean_factory(&self, factory: &DefaultListableBeanFactory) -> anyhow::Result<()>;

    fn name(&self) -> &str {
        "BeanFactoryPostProcessor"
    }

    /// 数字越小越先执行
    fn order(&self) -> i32 {
        1000
    }
}
