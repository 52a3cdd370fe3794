//! 计数器闹钟适配器（异步驱动）

use super::{Completer, Execute, Iodev};
use crate::drivers::{CounterDevice, DeviceError};
use crate::error::IoError;
use crate::rtio::cqe::Payload;
use crate::rtio::sqe::{IodevSqe, Op};
use core::cell::RefCell;
use critical_section::Mutex;

struct CounterState<C> {
    counter: C,
    /// 正在等待闹钟的请求，同一时刻最多一个
    pending: Option<IodevSqe>,
}

/// 把 `TimedWait` 映射为计数器通道闹钟
///
/// 派发时设置相对闹钟；闹钟中断中调用 [`CounterIodev::on_alarm`]，
/// 以触发时刻的计数值（`Payload::Value`）完成请求。闹钟占用期间到来的
/// 请求会被交回重试。`Nop` 直接完成，其他操作以 `IoError::BackendRejected` 完成。
pub struct CounterIodev<C> {
    state: Mutex<RefCell<CounterState<C>>>,
}

impl<C> CounterIodev<C> {
    pub const fn new(counter: C) -> Self {
        Self {
            state: Mutex::new(RefCell::new(CounterState {
                counter,
                pending: None,
            })),
        }
    }

    /// 直接访问底层驱动（初始化、测试辅助）
    pub fn with_device<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        critical_section::with(|cs| f(&mut self.state.borrow_ref_mut(cs).counter))
    }

    /// 是否有请求在等待闹钟
    pub fn is_pending(&self) -> bool {
        critical_section::with(|cs| self.state.borrow_ref(cs).pending.is_some())
    }
}

impl<C> CounterIodev<C>
where
    C: CounterDevice<Error = DeviceError>,
{
    /// 闹钟中断处理
    ///
    /// 在中断上下文中调用，不会阻塞。
    ///
    /// # 返回值
    /// - `true` - 完成了一个等待中的请求
    /// - `false` - 没有等待中的请求（多余的中断）
    pub fn on_alarm(&self, completer: &impl Completer) -> bool {
        let fired = critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            let sqe = state.pending.take()?;
            let mut now = state.counter.count();
            if !state.counter.is_counting_up() {
                now = state.counter.top_value() - now;
            }
            Some((sqe, now))
        });

        match fired {
            Some((sqe, ticks)) => {
                completer.on_backend_completion(sqe, Ok(Payload::Value(ticks)));
                true
            }
            None => false,
        }
    }
}

impl<C> Iodev for CounterIodev<C>
where
    C: CounterDevice<Error = DeviceError> + Send,
{
    fn name(&self) -> &'static str {
        "counter"
    }

    fn execute(&self, sqe: IodevSqe) -> Execute {
        let ticks = match sqe.op() {
            Op::TimedWait { ticks } => *ticks,
            Op::Nop => return Execute::Completed(sqe, Ok(Payload::None)),
            _ => return Execute::Completed(sqe, Err(IoError::BackendRejected)),
        };

        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if state.pending.is_some() || !state.counter.is_ready() {
                return Execute::Rejected(sqe);
            }
            match state.counter.set_alarm(ticks) {
                Ok(()) => {
                    state.pending = Some(sqe);
                    Execute::Accepted
                }
                Err(DeviceError::Busy) => Execute::Rejected(sqe),
                Err(err) => Execute::Completed(sqe, Err(err.into())),
            }
        })
    }
}
