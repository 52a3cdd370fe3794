// 引擎的编译期默认配置
pub const MAX_IODEVS: usize = 8;
pub const DEFAULT_BUSY_RETRIES: u8 = 3;
// 句柄中 slot 索引用 u16 表示
pub const MAX_QUEUE_DEPTH: usize = u16::MAX as usize;

/// 引擎运行期配置
///
/// ```rust
/// use neon_rtio::config::RtioConfig;
///
/// let config = RtioConfig::new().busy_retries(5);
/// assert_eq!(config.max_busy_retries(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtioConfig {
    busy_retries: u8,
}

impl RtioConfig {
    pub const fn new() -> Self {
        Self {
            busy_retries: DEFAULT_BUSY_RETRIES,
        }
    }

    /// 后端返回 `Rejected` 时最多重试的次数，超过后以
    /// `IoError::BackendBusyTimeout` 完成
    pub const fn busy_retries(mut self, retries: u8) -> Self {
        self.busy_retries = retries;
        self
    }

    pub const fn max_busy_retries(&self) -> u8 {
        self.busy_retries
    }
}

impl Default for RtioConfig {
    fn default() -> Self {
        Self::new()
    }
}
