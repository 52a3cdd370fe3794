//! # 设备驱动 Trait 定义
//!
//! 适配器（`rtio::iodev`）通过这些 trait 访问外设，不关心具体芯片。
//!
//! ## Trait 层次结构
//!
//! ```text
//! Device (基础设备)
//!    ├── I2c (I2C 总线，同步)
//!    ├── CounterDevice (计数器 + 通道闹钟，异步)
//!    └── CaptureDevice (PWM 输入捕获，异步)
//! ```
//!
//! 同步驱动在调用返回时已经完成传输；异步驱动只负责启动，结果由驱动的
//! 中断处理函数上报。
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! # use neon_rtio::drivers::{Device, DeviceError, I2c, I2cConfig};
//! struct MyI2c {
//!     base_addr: usize,
//! }
//!
//! impl Device for MyI2c {
//!     type Error = DeviceError;
//!
//!     fn init(&mut self) -> Result<(), Self::Error> {
//!         // 初始化 I2C 控制器
//!         Ok(())
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "I2C0"
//!     }
//! }
//!
//! impl I2c for MyI2c {
//!     fn configure(&mut self, _config: I2cConfig) -> Result<(), Self::Error> {
//!         Ok(())
//!     }
//!
//!     fn write(&mut self, _addr: u8, _data: &[u8]) -> Result<(), Self::Error> {
//!         Ok(())
//!     }
//!
//!     fn read(&mut self, _addr: u8, _data: &mut [u8]) -> Result<(), Self::Error> {
//!         Ok(())
//!     }
//!
//!     fn write_read(&mut self, _addr: u8, _w: &[u8], _r: &mut [u8]) -> Result<(), Self::Error> {
//!         Ok(())
//!     }
//! }
//! ```

// ============================================================================
// 基础设备 Trait
// ============================================================================

/// 基础设备 trait
///
/// 所有设备驱动都必须实现此 trait，提供基本的设备管理功能。
///
/// # 关联类型
///
/// - `Error`: 设备特定的错误类型
pub trait Device {
    /// 设备错误类型
    type Error;

    /// 初始化设备
    ///
    /// 在使用设备之前必须调用此方法进行初始化。
    ///
    /// # 返回值
    ///
    /// 成功返回 `Ok(())`，失败返回设备特定的错误
    fn init(&mut self) -> Result<(), Self::Error>;

    /// 获取设备名称
    ///
    /// 返回设备的静态名称字符串，用于调试和日志。
    fn name(&self) -> &'static str;

    /// 检查设备是否就绪
    ///
    /// 默认实现返回 `true`。适配器在设备未就绪时会把请求交回引擎重试。
    fn is_ready(&self) -> bool {
        true
    }

    /// 重置设备
    ///
    /// 将设备恢复到初始状态。默认实现调用 `init()`。
    fn reset(&mut self) -> Result<(), Self::Error> {
        self.init()
    }
}

// ============================================================================
// I2C Trait
// ============================================================================

/// I2C 配置
#[derive(Debug, Clone, Copy)]
pub struct I2cConfig {
    /// 时钟频率 (Hz)
    pub frequency: u32,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self {
            frequency: 100_000, // 标准模式 100kHz
        }
    }
}

/// I2C 设备 trait
pub trait I2c: Device {
    /// 配置 I2C
    fn configure(&mut self, config: I2cConfig) -> Result<(), Self::Error>;

    /// 写入数据到指定地址
    ///
    /// # 参数
    ///
    /// - `addr`: 7位设备地址
    /// - `data`: 要写入的数据
    fn write(&mut self, addr: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// 从指定地址读取数据
    ///
    /// # 参数
    ///
    /// - `addr`: 7位设备地址
    /// - `data`: 读取缓冲区
    fn read(&mut self, addr: u8, data: &mut [u8]) -> Result<(), Self::Error>;

    /// 写入后读取
    ///
    /// 先写入数据，然后读取响应（不发送停止位）
    ///
    /// # 参数
    ///
    /// - `addr`: 7位设备地址
    /// - `write`: 要写入的数据
    /// - `read`: 读取缓冲区
    fn write_read(&mut self, addr: u8, write: &[u8], read: &mut [u8]) -> Result<(), Self::Error>;
}

// ============================================================================
// 计数器 Trait
// ============================================================================

/// 计数器设备 trait
///
/// 自由运行的硬件计数器，带一个相对闹钟通道。闹钟到期时驱动在中断中通知
/// 上层（见 `CounterIodev::on_alarm`），闹钟是单次的。
pub trait CounterDevice: Device {
    /// 启动计数
    fn start(&mut self) -> Result<(), Self::Error>;

    /// 停止计数
    fn stop(&mut self) -> Result<(), Self::Error>;

    /// 获取当前计数值
    fn count(&self) -> u32;

    /// 计数上限，计数到此值后回绕
    fn top_value(&self) -> u32;

    /// 是否向上计数
    fn is_counting_up(&self) -> bool {
        true
    }

    /// 计数频率 (Hz)
    fn frequency(&self) -> u32;

    /// 设置相对闹钟
    ///
    /// # 参数
    ///
    /// - `ticks`: 从现在起的计数值，必须大于 0
    ///
    /// # 返回值
    ///
    /// 已有闹钟未到期时返回 `DeviceError::Busy` 一类的错误
    fn set_alarm(&mut self, ticks: u32) -> Result<(), Self::Error>;

    /// 取消闹钟
    fn cancel_alarm(&mut self) -> Result<(), Self::Error>;

    /// 微秒转换为计数值
    fn us_to_ticks(&self, us: u64) -> u64 {
        us * self.frequency() as u64 / 1_000_000
    }

    /// 计数值转换为微秒
    fn ticks_to_us(&self, ticks: u64) -> u64 {
        match self.frequency() {
            0 => 0,
            freq => ticks * 1_000_000 / freq as u64,
        }
    }
}

// ============================================================================
// 输入捕获 Trait
// ============================================================================

/// 捕获内容
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureType {
    /// 只捕获周期
    Period,
    /// 只捕获脉宽
    Pulse,
    /// 周期和脉宽
    Both,
}

/// 捕获模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// 捕获一次后自动停止
    Single,
    /// 持续捕获直到禁用
    Continuous,
}

/// 捕获配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    pub kind: CaptureType,
    pub mode: CaptureMode,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            kind: CaptureType::Both,
            mode: CaptureMode::Single,
        }
    }
}

/// PWM 输入捕获设备 trait
///
/// 捕获结果 `(周期, 脉宽)`（单位为计数值）由驱动在中断中上报
/// （见 `CaptureIodev::on_capture`）。
pub trait CaptureDevice: Device {
    /// 配置通道
    ///
    /// # 参数
    ///
    /// - `channel`: 通道号
    /// - `config`: 捕获配置
    fn configure_capture(&mut self, channel: u8, config: CaptureConfig)
    -> Result<(), Self::Error>;

    /// 开始捕获
    fn enable_capture(&mut self, channel: u8) -> Result<(), Self::Error>;

    /// 停止捕获
    fn disable_capture(&mut self, channel: u8) -> Result<(), Self::Error>;
}

// ============================================================================
// 设备错误类型
// ============================================================================

/// 通用设备错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// 设备未初始化
    NotInitialized,
    /// 设备忙
    Busy,
    /// 超时
    Timeout,
    /// 无效参数
    InvalidParameter,
    /// 通信错误
    CommunicationError,
    /// 从机无应答
    Nack,
    /// 设备不存在
    NotFound,
    /// 缓冲区溢出
    BufferOverflow,
    /// 其他错误
    Other,
}

impl core::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            DeviceError::NotInitialized => "device not initialized",
            DeviceError::Busy => "device busy",
            DeviceError::Timeout => "device timeout",
            DeviceError::InvalidParameter => "invalid parameter",
            DeviceError::CommunicationError => "communication error",
            DeviceError::Nack => "no acknowledge",
            DeviceError::NotFound => "device not found",
            DeviceError::BufferOverflow => "buffer overflow",
            DeviceError::Other => "device error",
        };
        f.write_str(msg)
    }
}

// ============================================================================
// 单元测试
// ============================================================================
