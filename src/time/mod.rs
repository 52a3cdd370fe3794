//! # 系统时钟
//!
//! 为 `Rtio::wait` 提供超时计时。tick 由宿主的周期中断驱动
//! （Cortex-M 上由 `hal::cortex_m3` 中的 SysTick 处理函数调用 [`Systick::tick`]），
//! 没有周期中断的宿主可以用 [`Systick::advance`] 手动推进。
//!
//! tick 计数为 `u32`，回绕后比较仍然正确，只要单次超时小于 `u32::MAX / 2`。

use core::sync::atomic::{AtomicU32, Ordering};

static CURRENT_TIME: AtomicU32 = AtomicU32::new(0);

pub struct Systick;

impl Systick {
    /// 在 tick 中断中调用
    #[inline]
    pub fn tick() {
        CURRENT_TIME.fetch_add(1, Ordering::Release);
    }

    pub fn now() -> u32 {
        CURRENT_TIME.load(Ordering::Acquire)
    }

    /// 推进时钟，返回推进后的时间
    pub fn advance(ticks: u32) -> u32 {
        CURRENT_TIME.fetch_add(ticks, Ordering::AcqRel).wrapping_add(ticks)
    }

    pub fn reset() {
        CURRENT_TIME.store(0, Ordering::Release);
    }
}

/// 等待超时
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// 不等待，相当于 poll
    NoWait,
    /// 最多等待指定 tick 数
    Ticks(u32),
    /// 一直等待
    Forever,
}

impl Timeout {
    /// 根据起始时间计算截止时间，`Forever` 没有截止时间
    pub fn deadline(&self, now: u32) -> Option<u32> {
        match *self {
            Timeout::NoWait => Some(now),
            Timeout::Ticks(ticks) => Some(now.wrapping_add(ticks)),
            Timeout::Forever => None,
        }
    }
}

/// `now` 是否已经到达或超过 `deadline`（回绕安全）
#[inline]
pub fn is_expired(now: u32, deadline: u32) -> bool {
    (now.wrapping_sub(deadline) as i32) >= 0
}
