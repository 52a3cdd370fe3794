//! Cortex-M3 宿主支持
//!
//! - 基于 PRIMASK 的 `critical-section` 实现
//! - SysTick 中断驱动 [`Systick`]

use crate::time::Systick;
use cortex_m::peripheral::SYST;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m_rt::exception;

pub const SYST_FREQ: u32 = 1000;

/// 配置 SysTick 以 `SYST_FREQ` 产生 tick
///
/// # 参数
/// - `syst`: SysTick 外设
/// - `sys_clock`: 内核时钟频率 (Hz)
pub fn systick_init(syst: &mut SYST, sys_clock: u32) {
    syst.set_clock_source(SystClkSource::Core);
    syst.set_reload(sys_clock / SYST_FREQ - 1);
    syst.clear_current();
    syst.enable_counter();
    syst.enable_interrupt();
}

#[exception]
fn SysTick() {
    Systick::tick();
}

use critical_section::RawRestoreState;
struct CriticalSection;
critical_section::set_impl!(CriticalSection);

unsafe impl critical_section::Impl for CriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        // 返回进入前中断是否打开，嵌套时只有最外层恢复
        let was_active = cortex_m::register::primask::read().is_active();
        cortex_m::interrupt::disable();
        was_active
    }

    unsafe fn release(was_active: RawRestoreState) {
        if was_active {
            unsafe {
                cortex_m::interrupt::enable();
            }
        }
    }
}
