//! # Mock Counter 驱动
//!
//! 模拟带一个闹钟通道的硬件计数器。
//!
//! ## 使用示例
//!
//! ```rust
//! use neon_rtio::drivers::mock::MockCounter;
//! use neon_rtio::drivers::{CounterDevice, Device};
//!
//! let mut counter = MockCounter::new(1_000_000);
//! counter.init().unwrap();
//! counter.start().unwrap();
//!
//! counter.set_alarm(100).unwrap();
//! assert!(!counter.mock_tick(99));
//! assert!(counter.mock_tick(1)); // 闹钟到期
//! assert_eq!(counter.count(), 100);
//! ```

use crate::drivers::{CounterDevice, Device, DeviceError};

/// Mock Counter 驱动
///
/// # 工作原理
///
/// - 通过 `mock_tick()` 模拟时间流逝，计数到 `top_value` 后回绕
/// - 闹钟以剩余计数值记录，`mock_tick()` 跨过闹钟时返回 `true`，
///   调用方此时应当像中断处理函数一样通知适配器
pub struct MockCounter {
    /// 计数频率 (Hz)
    frequency: u32,
    /// 已经过的计数值
    counter: u32,
    /// 计数上限
    top: u32,
    /// 是否向上计数
    counting_up: bool,
    running: bool,
    initialized: bool,
    /// 闹钟剩余计数值
    alarm: Option<u32>,
    /// 已触发的闹钟次数
    alarms_fired: usize,
}

impl MockCounter {
    /// 创建新的 Mock Counter 实例
    ///
    /// # 参数
    ///
    /// - `frequency`: 计数频率 (Hz)
    pub const fn new(frequency: u32) -> Self {
        Self {
            frequency,
            counter: 0,
            top: u32::MAX,
            counting_up: true,
            running: false,
            initialized: false,
            alarm: None,
            alarms_fired: 0,
        }
    }

    /// 改为向下计数（测试用）
    pub fn set_counting_down(&mut self, down: bool) {
        self.counting_up = !down;
    }

    /// 模拟时间流逝（测试用）
    ///
    /// # 参数
    ///
    /// - `ticks`: 要增加的计数值
    ///
    /// # 返回值
    ///
    /// 这段时间内闹钟是否到期
    pub fn mock_tick(&mut self, ticks: u32) -> bool {
        if !self.running {
            return false;
        }

        self.counter = match self.top {
            u32::MAX => self.counter.wrapping_add(ticks),
            top => ((self.counter as u64 + ticks as u64) % (top as u64 + 1)) as u32,
        };

        match self.alarm {
            Some(remaining) if ticks >= remaining => {
                self.alarm = None;
                self.alarms_fired += 1;
                true
            }
            Some(remaining) => {
                self.alarm = Some(remaining - ticks);
                false
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn alarm_pending(&self) -> bool {
        self.alarm.is_some()
    }

    pub fn alarms_fired(&self) -> usize {
        self.alarms_fired
    }
}

impl Default for MockCounter {
    fn default() -> Self {
        Self::new(1_000_000)
    }
}

impl Device for MockCounter {
    type Error = DeviceError;

    fn init(&mut self) -> Result<(), Self::Error> {
        self.counter = 0;
        self.running = false;
        self.alarm = None;
        self.alarms_fired = 0;
        self.initialized = true;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "MockCounter"
    }

    fn is_ready(&self) -> bool {
        self.initialized && self.running
    }
}

impl CounterDevice for MockCounter {
    fn start(&mut self) -> Result<(), Self::Error> {
        if !self.initialized {
            return Err(DeviceError::NotInitialized);
        }
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        if !self.initialized {
            return Err(DeviceError::NotInitialized);
        }
        self.running = false;
        Ok(())
    }

    fn count(&self) -> u32 {
        if self.counting_up {
            self.counter
        } else {
            self.top - self.counter
        }
    }

    fn top_value(&self) -> u32 {
        self.top
    }

    fn is_counting_up(&self) -> bool {
        self.counting_up
    }

    fn frequency(&self) -> u32 {
        self.frequency
    }

    fn set_alarm(&mut self, ticks: u32) -> Result<(), Self::Error> {
        if !self.initialized {
            return Err(DeviceError::NotInitialized);
        }
        if ticks == 0 || ticks > self.top {
            return Err(DeviceError::InvalidParameter);
        }
        if self.alarm.is_some() {
            return Err(DeviceError::Busy);
        }
        self.alarm = Some(ticks);
        Ok(())
    }

    fn cancel_alarm(&mut self) -> Result<(), Self::Error> {
        self.alarm = None;
        Ok(())
    }
}

// ============================================================================
// 单元测试
// ============================================================================
