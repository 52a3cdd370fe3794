//! # Mock Capture 驱动
//!
//! 模拟多通道 PWM 输入捕获。
//!
//! ## 使用示例
//!
//! ```rust
//! use neon_rtio::drivers::mock::MockCapture;
//! use neon_rtio::drivers::{CaptureConfig, CaptureDevice, Device};
//!
//! let mut pwm = MockCapture::new();
//! pwm.init().unwrap();
//! pwm.configure_capture(0, CaptureConfig::default()).unwrap();
//! pwm.enable_capture(0).unwrap();
//!
//! assert_eq!(pwm.mock_edge(0, 1000, 300), Some((1000, 300)));
//! // 单次模式捕获一次后自动停止
//! assert_eq!(pwm.mock_edge(0, 1000, 300), None);
//! ```

use crate::drivers::{CaptureConfig, CaptureDevice, CaptureMode, CaptureType, Device, DeviceError};

/// 通道数
pub const CAPTURE_CHANNELS: usize = 4;

/// Mock Capture 驱动
pub struct MockCapture {
    configs: [Option<CaptureConfig>; CAPTURE_CHANNELS],
    enabled: [bool; CAPTURE_CHANNELS],
    initialized: bool,
    /// 完成的捕获次数
    captures: usize,
}

impl MockCapture {
    pub const fn new() -> Self {
        Self {
            configs: [None; CAPTURE_CHANNELS],
            enabled: [false; CAPTURE_CHANNELS],
            initialized: false,
            captures: 0,
        }
    }

    fn channel(&self, channel: u8) -> Result<usize, DeviceError> {
        if !self.initialized {
            return Err(DeviceError::NotInitialized);
        }
        match channel as usize {
            ch if ch < CAPTURE_CHANNELS => Ok(ch),
            _ => Err(DeviceError::InvalidParameter),
        }
    }

    pub fn is_capture_enabled(&self, channel: u8) -> bool {
        self.enabled
            .get(channel as usize)
            .copied()
            .unwrap_or(false)
    }

    pub fn captures(&self) -> usize {
        self.captures
    }

    /// 模拟输入信号的一个完整周期（测试用）
    ///
    /// # 参数
    ///
    /// - `channel`: 通道号
    /// - `period`: 周期（计数值）
    /// - `pulse`: 脉宽（计数值）
    ///
    /// # 返回值
    ///
    /// 通道已使能时返回按配置捕获到的 `(周期, 脉宽)`，
    /// 调用方此时应当像中断处理函数一样通知适配器
    pub fn mock_edge(&mut self, channel: u8, period: u32, pulse: u32) -> Option<(u32, u32)> {
        let ch = channel as usize;
        if !self.is_capture_enabled(channel) {
            return None;
        }
        let config = self.configs[ch]?;

        if config.mode == CaptureMode::Single {
            self.enabled[ch] = false;
        }
        self.captures += 1;

        Some(match config.kind {
            CaptureType::Period => (period, 0),
            CaptureType::Pulse => (0, pulse),
            CaptureType::Both => (period, pulse),
        })
    }
}

impl Default for MockCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for MockCapture {
    type Error = DeviceError;

    fn init(&mut self) -> Result<(), Self::Error> {
        self.configs = [None; CAPTURE_CHANNELS];
        self.enabled = [false; CAPTURE_CHANNELS];
        self.captures = 0;
        self.initialized = true;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "MockCapture"
    }

    fn is_ready(&self) -> bool {
        self.initialized
    }
}

impl CaptureDevice for MockCapture {
    fn configure_capture(&mut self, channel: u8, config: CaptureConfig) -> Result<(), Self::Error> {
        let ch = self.channel(channel)?;
        if self.enabled[ch] {
            return Err(DeviceError::Busy);
        }
        self.configs[ch] = Some(config);
        Ok(())
    }

    fn enable_capture(&mut self, channel: u8) -> Result<(), Self::Error> {
        let ch = self.channel(channel)?;
        if self.configs[ch].is_none() {
            return Err(DeviceError::InvalidParameter);
        }
        self.enabled[ch] = true;
        Ok(())
    }

    fn disable_capture(&mut self, channel: u8) -> Result<(), Self::Error> {
        let ch = self.channel(channel)?;
        self.enabled[ch] = false;
        Ok(())
    }
}

// ============================================================================
// 单元测试
// ============================================================================
