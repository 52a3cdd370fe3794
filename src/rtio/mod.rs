//! # 实时异步 I/O
//!
//! 面向嵌入式的提交 / 完成队列引擎，全部存储静态分配：
//!
//! 1. 调用方用 [`Sqe`] 描述请求（读、写、写后读、定时等待……），[`Rtio::submit`]
//!    放入提交队列，缓冲区的所有权随请求一起交给引擎
//! 2. [`Rtio::drive`] 把就绪的请求派发给对应的设备适配器（[`Iodev`]）
//! 3. 适配器同步或异步地完成请求，结果以 [`Cqe`] 进入完成队列，
//!    缓冲区的所有权随之回到调用方
//! 4. 调用方用 [`Rtio::poll`] / [`Rtio::wait`] 取出完成条目
//!
//! 带链标志（[`Sqe::chained`]）的请求完成之前，下一个提交的请求不会被派发；
//! 链上某个请求失败时，后续请求全部以 `IoError::Cancelled` 完成。
//!
//! ## 使用示例
//!
//! ```rust
//! use neon_rtio::rtio::{Iodev, IodevId, NopIodev, Payload, Rtio, Sqe};
//!
//! let nop = NopIodev::new();
//! let iodevs: [&dyn Iodev; 1] = [&nop];
//! let rtio: Rtio<'_, 4, 4> = Rtio::new(&iodevs);
//! let dev = IodevId::new(0);
//!
//! rtio.submit(Sqe::nop(dev).chained().with_userdata(1)).unwrap();
//! rtio.submit(Sqe::nop(dev).with_userdata(2)).unwrap();
//! assert_eq!(rtio.drive_all(), 2);
//!
//! let first = rtio.poll().unwrap();
//! assert_eq!(first.userdata(), 1);
//! assert_eq!(first.result(), Ok(Payload::None));
//! assert_eq!(rtio.poll().unwrap().userdata(), 2);
//! ```

mod cqe;
mod engine;
pub mod iodev;
mod macros;
mod pool;
mod ring;
mod sqe;

pub use cqe::{Cqe, IoResult, Payload};
pub use engine::{Rtio, SubmitError};
pub use iodev::{CaptureIodev, Completer, CounterIodev, Execute, I2cIodev, Iodev, NopIodev};
pub use sqe::{IodevId, IodevSqe, Op, Sqe, SqeHandle, SqeState};
