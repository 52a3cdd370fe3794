//! # Mock 驱动
//!
//! 基于 drivers traits 的模拟驱动，用于：
//! - 单元测试和集成测试
//! - 在没有真实硬件时演示适配器的用法
//!
//! ## 可用驱动
//!
//! | 驱动 | 说明 |
//! |------|------|
//! | [`MockI2c`] | 模拟 I2C EEPROM |
//! | [`MockCounter`] | 模拟带闹钟的计数器 |
//! | [`MockCapture`] | 模拟 PWM 输入捕获 |
//!
//! 异步驱动（计数器、捕获）的 `mock_*` 方法返回是否产生了中断，
//! 由测试代码代替中断处理函数调用适配器的 `on_alarm` / `on_capture`。

mod capture;
mod counter;
mod i2c;

pub use capture::{CAPTURE_CHANNELS, MockCapture};
pub use counter::MockCounter;
pub use i2c::MockI2c;
