//! 完成条目（CQE）

use crate::error::IoError;

/// 操作相关的结果数据
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Payload {
    #[default]
    None,
    /// 实际传输的字节数
    Bytes(usize),
    /// 采样值，例如闹钟触发时的计数器值
    Value(u32),
    /// PWM 捕获的周期和脉宽（时钟周期数）
    Capture { period: u32, pulse: u32 },
}

/// 单个请求的结果
pub type IoResult = core::result::Result<Payload, IoError>;

/// 完成条目
///
/// 携带提交时的 `userdata`、结果，以及（读类操作）归还的接收缓冲区。
#[derive(Debug)]
pub struct Cqe {
    pub(crate) userdata: u32,
    pub(crate) result: IoResult,
    pub(crate) buf: Option<&'static mut [u8]>,
}

impl Cqe {
    pub fn userdata(&self) -> u32 {
        self.userdata
    }

    pub fn result(&self) -> IoResult {
        self.result
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// 取回接收缓冲区
    pub fn take_buf(&mut self) -> Option<&'static mut [u8]> {
        self.buf.take()
    }

    pub fn buf(&self) -> Option<&[u8]> {
        self.buf.as_deref()
    }
}
