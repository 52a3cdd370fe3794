//! 硬件抽象层 (HAL)
//!
//! 提供引擎运行所需的宿主接口：临界区、时钟、挂起。

pub mod traits;

#[cfg(all(feature = "cortex_m3", not(test), target_arch = "arm"))]
pub mod cortex_m3;

// 重新导出 traits
pub use traits::*;

use crate::time::Systick;

/// 让出处理器直到下一次中断
///
/// Cortex-M 上执行 `wfi`；宿主环境只做自旋提示。
#[inline]
pub fn idle() {
    #[cfg(all(feature = "cortex_m3", not(test), target_arch = "arm"))]
    cortex_m::asm::wfi();

    #[cfg(test)]
    std::thread::yield_now();

    #[cfg(all(not(test), not(all(feature = "cortex_m3", target_arch = "arm"))))]
    core::hint::spin_loop();
}

/// 基于全局 [`Systick`] 和 [`idle`] 的默认宿主
#[derive(Debug, Default, Clone, Copy)]
pub struct SystickHost;

impl Host for SystickHost {
    fn now(&self) -> u32 {
        Systick::now()
    }

    fn suspend(&self, _deadline: Option<u32>) {
        idle();
    }
}
