//! I2C 控制器适配器（同步驱动）

use super::{Execute, Iodev};
use crate::drivers::{DeviceError, I2c};
use crate::error::IoError;
use crate::rtio::cqe::{IoResult, Payload};
use crate::rtio::sqe::{IodevSqe, Op};
use spin::Mutex;

/// 包装同步 I2C 总线驱动
///
/// 读、写、写后读都在 `execute` 内完成。总线未就绪或驱动返回
/// `DeviceError::Busy` 时交回请求等待重试；地址超出 7 位范围或请求
/// `TimedWait` 时以 `IoError::BackendRejected` 完成。
///
/// 驱动只在主线上下文中访问，所以用自旋锁而不是临界区保护，
/// 传输期间不会屏蔽中断。
pub struct I2cIodev<B> {
    bus: Mutex<B>,
}

impl<B> I2cIodev<B> {
    pub const fn new(bus: B) -> Self {
        Self {
            bus: Mutex::new(bus),
        }
    }

    /// 直接访问底层驱动（初始化、测试辅助）
    pub fn with_device<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        f(&mut self.bus.lock())
    }
}

impl<B> I2cIodev<B>
where
    B: I2c<Error = DeviceError>,
{
    fn transfer(bus: &mut B, op: &mut Op) -> core::result::Result<IoResult, DeviceError> {
        let addr = match op {
            Op::Read { addr, .. } | Op::Write { addr, .. } | Op::Transceive { addr, .. } => {
                match u8::try_from(*addr) {
                    Ok(addr) if addr < 0x80 => addr,
                    _ => return Ok(Err(IoError::BackendRejected)),
                }
            }
            Op::Nop => return Ok(Ok(Payload::None)),
            Op::TimedWait { .. } => return Ok(Err(IoError::BackendRejected)),
        };

        let transferred = match op {
            Op::Read { buf, .. } => {
                bus.read(addr, buf)?;
                buf.len()
            }
            Op::Write { buf, .. } => {
                bus.write(addr, buf)?;
                buf.len()
            }
            Op::Transceive { tx, rx, .. } => {
                bus.write_read(addr, tx, rx)?;
                tx.len() + rx.len()
            }
            Op::Nop | Op::TimedWait { .. } => 0,
        };
        Ok(Ok(Payload::Bytes(transferred)))
    }
}

impl<B> Iodev for I2cIodev<B>
where
    B: I2c<Error = DeviceError> + Send,
{
    fn name(&self) -> &'static str {
        "i2c"
    }

    fn execute(&self, mut sqe: IodevSqe) -> Execute {
        let Some(mut bus) = self.bus.try_lock() else {
            return Execute::Rejected(sqe);
        };
        if !bus.is_ready() {
            return Execute::Rejected(sqe);
        }

        match Self::transfer(&mut bus, sqe.op_mut()) {
            Ok(result) => Execute::Completed(sqe, result),
            Err(DeviceError::Busy) => Execute::Rejected(sqe),
            Err(err) => {
                crate::debug!("{}: {} failed: {:?}", bus.name(), sqe.op().name(), err);
                Execute::Completed(sqe, Err(err.into()))
            }
        }
    }
}
