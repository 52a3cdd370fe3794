//! # 设备适配器
//!
//! 引擎通过 [`Iodev`] trait 把请求交给具体后端，后端有两种完成方式：
//!
//! - 同步：在 `execute` 内直接完成，返回 [`Execute::Completed`]
//!   （[`NopIodev`]、[`I2cIodev`]）
//! - 异步：返回 [`Execute::Accepted`] 并持有 `IodevSqe`，之后在中断或轮询上下文中
//!   通过 [`Completer::on_backend_completion`] 交回（[`CounterIodev`]、[`CaptureIodev`]）
//!
//! 后端暂时无法接收新请求时返回 [`Execute::Rejected`]，引擎把请求放回提交队列
//! 队首，下一次 `drive` 重试。
//!
//! ## 实现自定义适配器
//!
//! ```rust
//! use neon_rtio::rtio::{Execute, Iodev, IodevSqe, Op, Payload};
//! use neon_rtio::error::IoError;
//!
//! struct Loopback;
//!
//! impl Iodev for Loopback {
//!     fn name(&self) -> &'static str {
//!         "loopback"
//!     }
//!
//!     fn execute(&self, mut sqe: IodevSqe) -> Execute {
//!         let result = match sqe.op_mut() {
//!             Op::Read { buf, .. } => {
//!                 buf.fill(0xAA);
//!                 Ok(Payload::Bytes(buf.len()))
//!             }
//!             _ => Err(IoError::BackendRejected),
//!         };
//!         Execute::Completed(sqe, result)
//!     }
//! }
//! ```

mod capture;
mod counter;
mod i2c;

pub use capture::CaptureIodev;
pub use counter::CounterIodev;
pub use i2c::I2cIodev;

use super::cqe::{IoResult, Payload};
use super::sqe::IodevSqe;
use core::sync::atomic::{AtomicU32, Ordering};

/// `Iodev::execute` 的结果
#[derive(Debug)]
pub enum Execute {
    /// 后端已接收，之后会异步完成
    Accepted,
    /// 后端忙，交回请求等待重试
    Rejected(IodevSqe),
    /// 已同步完成
    Completed(IodevSqe, IoResult),
}

/// 设备适配器
///
/// `execute` 只在主线上下文（`Rtio::drive`）中调用，且不在引擎临界区内，
/// 但不能阻塞。适配器可能同时被完成回调访问，因此要求 `Sync`。
pub trait Iodev: Sync {
    /// 适配器名称，用于日志
    fn name(&self) -> &'static str;

    /// 执行一个请求
    fn execute(&self, sqe: IodevSqe) -> Execute;
}

/// 接收异步完成的一方
///
/// 由 `Rtio` 实现；异步适配器的中断处理函数通过它交回请求，
/// 这样适配器不需要知道引擎的队列容量参数。
pub trait Completer {
    /// 交回已派发的请求及其结果，可以在中断上下文中调用
    fn on_backend_completion(&self, sqe: IodevSqe, result: IoResult);
}

/// 空操作适配器
///
/// 每个请求都在 `execute` 内立即以 `Ok(Payload::None)` 完成，
/// 用来在没有硬件时测试队列本身。
pub struct NopIodev {
    executed: AtomicU32,
}

impl NopIodev {
    pub const fn new() -> Self {
        Self {
            executed: AtomicU32::new(0),
        }
    }

    /// 已执行的请求数
    pub fn executed(&self) -> u32 {
        self.executed.load(Ordering::Relaxed)
    }
}

impl Default for NopIodev {
    fn default() -> Self {
        Self::new()
    }
}

impl Iodev for NopIodev {
    fn name(&self) -> &'static str {
        "nop"
    }

    fn execute(&self, sqe: IodevSqe) -> Execute {
        self.executed.fetch_add(1, Ordering::Relaxed);
        Execute::Completed(sqe, Ok(Payload::None))
    }
}
