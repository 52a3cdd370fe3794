//! # 设备驱动框架
//!
//! 适配器背后的外设抽象。
//!
//! ## 模块结构
//!
//! - [`traits`]: 设备驱动 trait 定义
//! - [`mock`]: 测试和演示用的模拟驱动
//!
//! ## 支持的设备类型
//!
//! | 设备类型 | Trait | 说明 | 适配器 |
//! |---------|-------|------|--------|
//! | 基础设备 | `Device` | 所有设备的基础 trait | |
//! | I2C | `I2c` | I2C 总线（同步） | `I2cIodev` |
//! | 计数器 | `CounterDevice` | 计数器 + 闹钟（异步） | `CounterIodev` |
//! | 输入捕获 | `CaptureDevice` | PWM 周期 / 脉宽（异步） | `CaptureIodev` |

pub mod mock;
pub mod traits;

// 重新导出常用类型
pub use traits::{
    // 基础 trait
    Device,
    // I2C
    I2c,
    I2cConfig,
    // 计数器
    CounterDevice,
    // 输入捕获
    CaptureConfig,
    CaptureDevice,
    CaptureMode,
    CaptureType,
    // 错误类型
    DeviceError,
};
