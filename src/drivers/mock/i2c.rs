//! # Mock I2C 驱动
//!
//! 模拟挂在总线上的一片 256 字节 EEPROM。
//!
//! ## 功能特性
//!
//! - 实现 `Device`, `I2c` trait
//! - 写入的第一个字节设置寄存器指针，后续字节从指针处依次写入
//! - 读取从寄存器指针处开始，指针自动递增（256 字节回绕）
//! - 访问其他地址返回 `DeviceError::Nack`
//! - 可模拟总线忙、注入一次性错误
//!
//! ## 使用示例
//!
//! ```rust
//! use neon_rtio::drivers::mock::MockI2c;
//! use neon_rtio::drivers::{Device, I2c};
//!
//! let mut eeprom = MockI2c::new(0x50);
//! eeprom.init().unwrap();
//!
//! // 在 0x10 处写入两个字节
//! eeprom.write(0x50, &[0x10, 0xAA, 0xBB]).unwrap();
//!
//! let mut buf = [0u8; 2];
//! eeprom.write_read(0x50, &[0x10], &mut buf).unwrap();
//! assert_eq!(buf, [0xAA, 0xBB]);
//! ```

use crate::drivers::{Device, DeviceError, I2c, I2cConfig};

/// 模拟存储大小
const MEMORY_SIZE: usize = 256;

/// Mock I2C 驱动
pub struct MockI2c {
    /// 从机地址
    target: u8,
    /// 总线频率
    frequency: u32,
    /// EEPROM 内容
    memory: [u8; MEMORY_SIZE],
    /// 寄存器指针
    pointer: u8,
    initialized: bool,
    busy: bool,
    /// 下一次传输返回的错误
    injected: Option<DeviceError>,
    /// 完成的传输次数
    transfers: usize,
}

impl MockI2c {
    /// 创建新的 Mock I2C 实例
    ///
    /// # 参数
    ///
    /// - `target`: 模拟从机的 7 位地址
    pub const fn new(target: u8) -> Self {
        Self {
            target,
            frequency: 100_000,
            memory: [0xFF; MEMORY_SIZE],
            pointer: 0,
            initialized: false,
            busy: false,
            injected: None,
            transfers: 0,
        }
    }

    /// 模拟总线被占用（测试用）
    ///
    /// 忙期间 `is_ready()` 返回 `false`，传输返回 `DeviceError::Busy`。
    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    /// 让下一次传输失败（测试用）
    pub fn inject_error(&mut self, err: DeviceError) {
        self.injected = Some(err);
    }

    /// 直接查看存储内容
    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn transfers(&self) -> usize {
        self.transfers
    }

    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    fn begin(&mut self, addr: u8) -> Result<(), DeviceError> {
        if !self.initialized {
            return Err(DeviceError::NotInitialized);
        }
        if self.busy {
            return Err(DeviceError::Busy);
        }
        if let Some(err) = self.injected.take() {
            return Err(err);
        }
        if addr != self.target {
            return Err(DeviceError::Nack);
        }
        self.transfers += 1;
        Ok(())
    }

    fn store(&mut self, data: &[u8]) {
        let Some((&reg, payload)) = data.split_first() else {
            return;
        };
        self.pointer = reg;
        for &byte in payload {
            self.memory[self.pointer as usize] = byte;
            self.pointer = self.pointer.wrapping_add(1);
        }
    }

    fn load(&mut self, buf: &mut [u8]) {
        for byte in buf.iter_mut() {
            *byte = self.memory[self.pointer as usize];
            self.pointer = self.pointer.wrapping_add(1);
        }
    }
}

impl Device for MockI2c {
    type Error = DeviceError;

    fn init(&mut self) -> Result<(), Self::Error> {
        self.pointer = 0;
        self.busy = false;
        self.injected = None;
        self.initialized = true;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "MockI2c"
    }

    fn is_ready(&self) -> bool {
        self.initialized && !self.busy
    }
}

impl I2c for MockI2c {
    fn configure(&mut self, config: I2cConfig) -> Result<(), Self::Error> {
        if config.frequency == 0 || config.frequency > 1_000_000 {
            return Err(DeviceError::InvalidParameter);
        }
        self.frequency = config.frequency;
        Ok(())
    }

    fn write(&mut self, addr: u8, data: &[u8]) -> Result<(), Self::Error> {
        self.begin(addr)?;
        self.store(data);
        Ok(())
    }

    fn read(&mut self, addr: u8, data: &mut [u8]) -> Result<(), Self::Error> {
        self.begin(addr)?;
        self.load(data);
        Ok(())
    }

    fn write_read(&mut self, addr: u8, write: &[u8], read: &mut [u8]) -> Result<(), Self::Error> {
        self.begin(addr)?;
        self.store(write);
        self.load(read);
        Ok(())
    }
}

impl Default for MockI2c {
    fn default() -> Self {
        Self::new(0x50)
    }
}

// ============================================================================
// 单元测试
// ============================================================================
