use crate::drivers::DeviceError;

/// 引擎 API 返回的错误
///
/// 只描述调用方可以处理的运行期状况；槽位重复释放、未知句柄的完成
/// 等内部一致性破坏直接 panic，不会出现在这里。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtioError {
    // 提交相关
    PoolExhausted,
    QueueFull,
    UnknownIodev,

    // 取消相关
    NotCancellable,
    UnknownTag,

    // 完成队列相关
    DroppedCompletion(u32),
    Timeout,

    // 通用错误
    InvalidArgument,
}

impl core::fmt::Display for RtioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            // 提交
            RtioError::PoolExhausted => write!(f, "Submission pool exhausted"),
            RtioError::QueueFull => write!(f, "Submission queue full"),
            RtioError::UnknownIodev => write!(f, "Unknown iodev"),

            // 取消
            RtioError::NotCancellable => write!(f, "Entry already dispatched, not cancellable"),
            RtioError::UnknownTag => write!(f, "Unknown submission handle"),

            // 完成队列
            RtioError::DroppedCompletion(n) => write!(f, "{} completion(s) dropped", n),
            RtioError::Timeout => write!(f, "Operation timed out"),

            // Generic
            RtioError::InvalidArgument => write!(f, "Invalid argument"),
        }
    }
}

pub type Result<T> = core::result::Result<T, RtioError>;

/// 单个请求的失败原因，通过完成队列交给调用方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoError {
    /// 设备超时
    Timeout,
    /// 总线错误（NACK、仲裁丢失等）
    Bus,
    /// 缓冲区溢出
    Overflow,
    /// 请求在派发前被取消，或者链上前驱失败
    Cancelled,
    /// 后端拒绝执行（不支持的操作、参数错误）
    BackendRejected,
    /// 后端持续忙，重试次数耗尽
    BackendBusyTimeout,
}

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            IoError::Timeout => write!(f, "Device timeout"),
            IoError::Bus => write!(f, "Bus error"),
            IoError::Overflow => write!(f, "Buffer overflow"),
            IoError::Cancelled => write!(f, "Cancelled"),
            IoError::BackendRejected => write!(f, "Rejected by backend"),
            IoError::BackendBusyTimeout => write!(f, "Backend busy, retries exhausted"),
        }
    }
}

impl From<DeviceError> for IoError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::Timeout => IoError::Timeout,
            DeviceError::BufferOverflow => IoError::Overflow,
            DeviceError::CommunicationError | DeviceError::Nack => IoError::Bus,
            DeviceError::NotInitialized
            | DeviceError::Busy
            | DeviceError::InvalidParameter
            | DeviceError::NotFound
            | DeviceError::Other => IoError::BackendRejected,
        }
    }
}
