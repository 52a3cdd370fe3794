//! 宿主执行环境 Trait 定义
//!
//! 引擎本身不关心运行在裸机、RTOS 线程还是测试进程中，
//! 只通过这些 trait 获取时间和挂起当前上下文。

/// 宿主执行环境
///
/// 只有 `Rtio::wait` 会使用它，完成回调（中断上下文）中绝不能调用。
pub trait Host {
    /// 当前时间（tick）
    fn now(&self) -> u32;

    /// 挂起当前主线上下文，直到可能有新的完成到达
    ///
    /// 允许提前返回（虚假唤醒），调用方会重新检查完成队列和超时。
    ///
    /// # 参数
    /// - `deadline`: 最晚应当返回的时间，`None` 表示不限
    fn suspend(&self, deadline: Option<u32>);
}

impl<H: Host + ?Sized> Host for &H {
    fn now(&self) -> u32 {
        (**self).now()
    }

    fn suspend(&self, deadline: Option<u32>) {
        (**self).suspend(deadline)
    }
}
