//! # RTIO 引擎
//!
//! 把提交队列、完成队列和设备适配器表组合在一起。
//!
//! ## 执行上下文
//!
//! - `submit` / `drive` / `poll` / `wait` / `cancel` 只在主线上下文调用，彼此不并发
//! - `on_backend_completion` 可能在任意时刻从完成回调（中断）上下文调用，
//!   包括 `drive` 执行期间
//!
//! 所有队列状态放在一个 `critical_section::Mutex` 里，每次操作只在修改
//! 描述符池和环形队列索引的瞬间进入临界区；适配器的 `execute` 总是在
//! 临界区外调用。
//!
//! ## 条目状态机
//!
//! ```text
//! Free ──submit──▶ Submitted ──drive──▶ Dispatched ──complete──▶ Completed ──▶ Free
//!                      │                    │ Rejected
//!                      │                    └──────────▶ Submitted（队首，重试）
//!                      └──cancel / 链上前驱失败──▶ Completed(Cancelled) ──▶ Free
//! ```

use super::cqe::{Cqe, IoResult};
use super::iodev::{Completer, Execute, Iodev};
use super::pool::Pool;
use super::ring::Ring;
use super::sqe::{IodevId, IodevSqe, Op, Sqe, SqeHandle, SqeState};
use crate::config::{MAX_IODEVS, RtioConfig};
use crate::error::{IoError, Result, RtioError};
use crate::hal::{Host, SystickHost};
use crate::time::{Timeout, is_expired};
use core::cell::RefCell;
use critical_section::Mutex;

/// 提交槽位
struct SqeSlot {
    /// 排队期间持有操作；派发后操作归适配器所有，这里为 `None`
    op: Option<Op>,
    iodev: IodevId,
    userdata: u32,
    /// 链上前驱，前驱完成之前本条目不可派发
    blocked_by: Option<u16>,
    /// 链上后继
    successor: Option<u16>,
    retries: u8,
}

impl SqeSlot {
    fn state(&self) -> SqeState {
        if self.op.is_some() {
            SqeState::Submitted
        } else {
            SqeState::Dispatched
        }
    }
}

/// 提交失败
///
/// 原样交回请求，调用方可以取回其中的缓冲区。
#[derive(Debug)]
pub struct SubmitError {
    error: RtioError,
    sqe: Sqe,
}

impl SubmitError {
    pub fn error(&self) -> RtioError {
        self.error
    }

    pub fn into_sqe(self) -> Sqe {
        self.sqe
    }
}

impl From<SubmitError> for RtioError {
    fn from(err: SubmitError) -> Self {
        err.error
    }
}

impl core::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "submit failed: {}", self.error)
    }
}

/// 一次派发的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatch {
    /// 没有就绪条目
    Idle,
    /// 交给了后端（接受、同步完成或重试耗尽）
    Handed,
    /// 后端忙，条目已放回队首
    Rejected,
}

struct Queues<const SQ: usize, const CQ: usize> {
    sqes: Pool<SqeSlot, SQ>,
    sq: Ring<SQ>,
    cqes: Pool<Cqe, CQ>,
    cq: Ring<CQ>,
    /// 最近一个带链标志、后继尚未提交的条目
    chain_tail: Option<u16>,
    dropped: u32,
    dropped_acked: u32,
    /// 本次操作中被淘汰的完成条目数，由 `Rtio` 在临界区外取走并记录
    evicted: u32,
}

impl<const SQ: usize, const CQ: usize> Queues<SQ, CQ> {
    const fn new() -> Self {
        Self {
            sqes: Pool::new(),
            sq: Ring::new(),
            cqes: Pool::new(),
            cq: Ring::new(),
            chain_tail: None,
            dropped: 0,
            dropped_acked: 0,
            evicted: 0,
        }
    }

    fn lookup(&self, handle: SqeHandle) -> Option<&SqeSlot> {
        if self.sqes.generation(handle.index)? != handle.generation {
            return None;
        }
        self.sqes.get(handle.index)
    }

    /// 校验句柄指向一个已派发的条目
    ///
    /// # Panics
    ///
    /// 句柄过期或条目尚未派发。说明适配器交回了不属于它的请求。
    fn expect_dispatched(&mut self, handle: SqeHandle) -> &mut SqeSlot {
        if self.sqes.generation(handle.index) != Some(handle.generation) {
            panic!("completion for unknown sqe {:?}", handle);
        }
        match self.sqes.get_mut(handle.index) {
            Some(slot) if slot.op.is_none() => slot,
            _ => panic!("completion for sqe {:?} that was never dispatched", handle),
        }
    }

    fn submit(&mut self, sqe: Sqe) -> core::result::Result<SqeHandle, SubmitError> {
        if self.sq.is_full() {
            return Err(SubmitError {
                error: RtioError::QueueFull,
                sqe,
            });
        }
        if self.sqes.available() == 0 {
            return Err(SubmitError {
                error: RtioError::PoolExhausted,
                sqe,
            });
        }

        let Sqe {
            op,
            iodev,
            chained,
            userdata,
        } = sqe;
        let slot = SqeSlot {
            op: Some(op),
            iodev,
            userdata,
            blocked_by: self.chain_tail,
            successor: None,
            retries: 0,
        };
        let Ok(index) = self.sqes.acquire(slot) else {
            panic!("sqe pool accounting corrupted");
        };

        if let Some(pred) = self.chain_tail.take() {
            if let Some(pred) = self.sqes.get_mut(pred) {
                pred.successor = Some(index);
            }
        }
        if chained {
            self.chain_tail = Some(index);
        }
        self.sq.push_back(index);

        let generation = self.sqes.generation(index).unwrap_or_default();
        Ok(SqeHandle { index, generation })
    }

    /// 取出最早的就绪条目
    ///
    /// 被链上前驱阻塞的条目留在原位，不影响后面未被阻塞的条目。
    fn dequeue_for_dispatch(&mut self) -> Option<IodevSqe> {
        let sqes = &self.sqes;
        let pos = self.sq.position(|index| {
            sqes.get(index)
                .is_some_and(|slot| slot.blocked_by.is_none())
        })?;
        let index = self.sq.remove(pos)?;

        let generation = self.sqes.generation(index)?;
        let slot = self.sqes.get_mut(index)?;
        let op = slot.op.take()?;
        Some(IodevSqe::new(SqeHandle { index, generation }, slot.iodev, op))
    }

    /// 后端忙，放回队首
    ///
    /// 重试次数耗尽时交回请求，由调用方以 `BackendBusyTimeout` 完成。
    fn requeue(&mut self, sqe: IodevSqe, max_retries: u8) -> Option<IodevSqe> {
        let handle = sqe.handle();
        let slot = self.expect_dispatched(handle);
        if slot.retries >= max_retries {
            return Some(sqe);
        }
        slot.retries += 1;
        let (_, op) = sqe.into_parts();
        slot.op = Some(op);
        self.sq.push_front(handle.index);
        None
    }

    fn complete(&mut self, sqe: IodevSqe, result: IoResult) {
        let (handle, op) = sqe.into_parts();
        self.expect_dispatched(handle);
        let slot = self.sqes.release(handle.index);

        if self.chain_tail == Some(handle.index) {
            self.chain_tail = None;
        }
        self.publish(slot.userdata, result, op.into_buf());

        if let Some(next) = slot.successor {
            if result.is_ok() {
                if let Some(next) = self.sqes.get_mut(next) {
                    next.blocked_by = None;
                }
            } else {
                self.cancel_chain(next);
            }
        }
    }

    /// 从 `first` 开始沿链取消尚未派发的条目，返回取消的数量
    fn cancel_chain(&mut self, first: u16) -> usize {
        let mut next = Some(first);
        let mut cancelled = 0;
        while let Some(index) = next {
            self.sq.remove_value(index);
            let slot = self.sqes.release(index);
            if self.chain_tail == Some(index) {
                self.chain_tail = None;
            }
            next = slot.successor;
            let buf = slot.op.and_then(Op::into_buf);
            self.publish(slot.userdata, Err(IoError::Cancelled), buf);
            cancelled += 1;
        }
        cancelled
    }

    fn cancel(&mut self, handle: SqeHandle) -> Result<usize> {
        let slot = self.lookup(handle).ok_or(RtioError::UnknownTag)?;
        if slot.state() != SqeState::Submitted {
            return Err(RtioError::NotCancellable);
        }
        if let Some(pred) = slot.blocked_by {
            if let Some(pred) = self.sqes.get_mut(pred) {
                pred.successor = None;
            }
        }
        Ok(self.cancel_chain(handle.index))
    }

    /// 发布完成条目
    ///
    /// 完成队列满时淘汰最旧的条目并计入 `dropped`，从不阻塞生产者。
    /// 淘汰数记入 `evicted`，出临界区后再记录日志。
    fn publish(&mut self, userdata: u32, result: IoResult, buf: Option<&'static mut [u8]>) {
        if self.cq.is_full() {
            if let Some(oldest) = self.cq.pop_front() {
                self.cqes.release(oldest);
                self.dropped = self.dropped.saturating_add(1);
                self.evicted += 1;
            }
        }

        let cqe = Cqe {
            userdata,
            result,
            buf,
        };
        let Ok(index) = self.cqes.acquire(cqe) else {
            panic!("cqe pool accounting corrupted");
        };
        self.cq.push_back(index);
    }

    fn take_evicted(&mut self) -> (u32, u32) {
        (core::mem::take(&mut self.evicted), self.dropped)
    }

    fn poll(&mut self) -> Option<Cqe> {
        let index = self.cq.pop_front()?;
        Some(self.cqes.release(index))
    }
}

/// 提交 / 完成队列引擎
///
/// # 类型参数
/// - `SQ`: 提交槽位数（同时存活的提交条目上限，也是提交队列容量）
/// - `CQ`: 完成队列容量
///
/// # 示例
///
/// ```rust
/// use neon_rtio::rtio::{Iodev, IodevId, NopIodev, Rtio, Sqe};
///
/// let nop = NopIodev::new();
/// let iodevs: [&dyn Iodev; 1] = [&nop];
/// let rtio: Rtio<'_, 4, 4> = Rtio::new(&iodevs);
/// const NOP: IodevId = IodevId::new(0);
///
/// rtio.submit(Sqe::nop(NOP).with_userdata(42)).unwrap();
/// assert!(rtio.drive());
///
/// let cqe = rtio.poll().unwrap();
/// assert_eq!(cqe.userdata(), 42);
/// assert!(cqe.is_ok());
/// ```
pub struct Rtio<'a, const SQ: usize, const CQ: usize> {
    iodevs: &'a [&'a dyn Iodev],
    config: RtioConfig,
    queues: Mutex<RefCell<Queues<SQ, CQ>>>,
}

impl<'a, const SQ: usize, const CQ: usize> Rtio<'a, SQ, CQ> {
    /// 以默认配置创建引擎
    ///
    /// 适配器表在创建后不可更改，`IodevId::new(i)` 对应表中第 `i` 项。
    pub const fn new(iodevs: &'a [&'a dyn Iodev]) -> Self {
        Self::with_config(iodevs, RtioConfig::new())
    }

    pub const fn with_config(iodevs: &'a [&'a dyn Iodev], config: RtioConfig) -> Self {
        assert!(iodevs.len() <= MAX_IODEVS, "too many iodevs");
        Self {
            iodevs,
            config,
            queues: Mutex::new(RefCell::new(Queues::new())),
        }
    }

    fn with_queues<R>(&self, f: impl FnOnce(&mut Queues<SQ, CQ>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.queues.borrow_ref_mut(cs)))
    }

    pub fn config(&self) -> &RtioConfig {
        &self.config
    }

    pub fn iodev(&self, id: IodevId) -> Option<&'a dyn Iodev> {
        self.iodevs.get(id.index()).copied()
    }

    /// 提交请求
    ///
    /// 不会阻塞。
    ///
    /// # 返回值
    /// - `Ok(SqeHandle)` - 用于 `cancel` / `state` 的句柄
    /// - `Err(SubmitError)` - `QueueFull` / `PoolExhausted` / `UnknownIodev` /
    ///   `InvalidArgument`（空的接收缓冲区），请求原样交回
    pub fn submit(&self, sqe: Sqe) -> core::result::Result<SqeHandle, SubmitError> {
        if self.iodev(sqe.iodev).is_none() {
            return Err(SubmitError {
                error: RtioError::UnknownIodev,
                sqe,
            });
        }
        // 接收缓冲区不能为空
        if let Op::Read { buf: rx, .. } | Op::Transceive { rx, .. } = &sqe.op {
            if rx.is_empty() {
                return Err(SubmitError {
                    error: RtioError::InvalidArgument,
                    sqe,
                });
            }
        }

        let userdata = sqe.userdata;
        let op = sqe.op.name();
        let result = self.with_queues(|q| q.submit(sqe));
        match &result {
            Ok(handle) => crate::debug!("submit {} userdata={} slot={}", op, userdata, handle.index),
            Err(err) => crate::debug!("submit {} userdata={} failed: {}", op, userdata, err.error),
        }
        result
    }

    /// 派发一个就绪条目
    ///
    /// # 返回值
    /// 是否派发了条目（被拒绝后放回队列也算）
    pub fn drive(&self) -> bool {
        self.dispatch() != Dispatch::Idle
    }

    /// 本轮派发所有就绪条目，返回派发次数
    ///
    /// 后端拒绝时结束本轮，被拒绝的条目留在队首，下一轮再试。
    pub fn drive_all(&self) -> usize {
        let mut dispatched = 0;
        loop {
            match self.dispatch() {
                Dispatch::Idle => break,
                Dispatch::Rejected => {
                    dispatched += 1;
                    break;
                }
                Dispatch::Handed => dispatched += 1,
            }
        }
        dispatched
    }

    fn dispatch(&self) -> Dispatch {
        let Some(sqe) = self.with_queues(|q| q.dequeue_for_dispatch()) else {
            return Dispatch::Idle;
        };

        let Some(iodev) = self.iodev(sqe.iodev()) else {
            self.on_backend_completion(sqe, Err(IoError::BackendRejected));
            return Dispatch::Handed;
        };

        crate::debug!("dispatch {} slot={} to {}", sqe.op().name(), sqe.handle().index, iodev.name());
        match iodev.execute(sqe) {
            Execute::Accepted => Dispatch::Handed,
            Execute::Completed(sqe, result) => {
                self.on_backend_completion(sqe, result);
                Dispatch::Handed
            }
            Execute::Rejected(sqe) => {
                let max_retries = self.config.max_busy_retries();
                match self.with_queues(|q| q.requeue(sqe, max_retries)) {
                    None => Dispatch::Rejected,
                    Some(sqe) => {
                        crate::warn!(
                            "{} busy, giving up on slot={} after {} retries",
                            iodev.name(),
                            sqe.handle().index,
                            max_retries
                        );
                        self.on_backend_completion(sqe, Err(IoError::BackendBusyTimeout));
                        Dispatch::Handed
                    }
                }
            }
        }
    }

    /// 接收后端完成
    ///
    /// 可以在中断上下文中调用。释放提交槽位，发布完成条目；链上后继在成功时
    /// 解除阻塞，失败时全部以 `IoError::Cancelled` 完成。
    ///
    /// # Panics
    ///
    /// `sqe` 不是本引擎派发出去、尚未完成的请求。
    pub fn on_backend_completion(&self, sqe: IodevSqe, result: IoResult) {
        let index = sqe.handle().index;
        let evicted = self.with_queues(|q| {
            q.complete(sqe, result);
            q.take_evicted()
        });
        crate::debug!("complete slot={} result={:?}", index, result);
        warn_evicted(evicted);
    }

    /// 非阻塞地取出一个完成条目
    pub fn poll(&self) -> Option<Cqe> {
        self.with_queues(|q| q.poll())
    }

    /// 等待完成条目，使用全局 `Systick` 计时
    ///
    /// 只能在允许挂起的主线上下文调用。
    pub fn wait(&self, timeout: Timeout) -> Result<Cqe> {
        self.wait_with(timeout, &SystickHost)
    }

    /// 等待完成条目
    ///
    /// # 返回值
    /// - `Ok(Cqe)` - 取到的完成条目
    /// - `Err(RtioError::Timeout)` - 超时
    pub fn wait_with(&self, timeout: Timeout, host: &impl Host) -> Result<Cqe> {
        let deadline = timeout.deadline(host.now());
        loop {
            if let Some(cqe) = self.poll() {
                return Ok(cqe);
            }
            if let Some(deadline) = deadline {
                if is_expired(host.now(), deadline) {
                    return Err(RtioError::Timeout);
                }
            }
            host.suspend(deadline);
        }
    }

    /// 取消尚未派发的条目
    ///
    /// 被取消的条目（以及链在它后面的条目）以 `IoError::Cancelled` 完成。
    ///
    /// # 返回值
    /// - `Ok(())` - 已取消
    /// - `Err(RtioError::NotCancellable)` - 已经派发
    /// - `Err(RtioError::UnknownTag)` - 句柄已过期
    pub fn cancel(&self, handle: SqeHandle) -> Result<()> {
        let (cancelled, evicted) = self.with_queues(|q| {
            let cancelled = q.cancel(handle)?;
            Ok::<_, RtioError>((cancelled, q.take_evicted()))
        })?;
        crate::info!("cancelled slot={} ({} entries)", handle.index, cancelled);
        warn_evicted(evicted);
        Ok(())
    }

    /// 查询条目状态
    pub fn state(&self, handle: SqeHandle) -> SqeState {
        self.with_queues(|q| q.lookup(handle).map_or(SqeState::Free, SqeSlot::state))
    }

    /// 提交队列中等待派发的条目数
    pub fn sq_len(&self) -> usize {
        self.with_queues(|q| q.sq.len())
    }

    /// 存活的提交条目数（排队中 + 已派发）
    pub fn sqes_in_use(&self) -> usize {
        self.with_queues(|q| q.sqes.in_use())
    }

    /// 等待消费的完成条目数
    pub fn cq_len(&self) -> usize {
        self.with_queues(|q| q.cq.len())
    }

    /// 因完成队列溢出而丢弃的完成条目总数
    pub fn dropped_completions(&self) -> u32 {
        self.with_queues(|q| q.dropped)
    }

    /// 确认丢弃计数
    ///
    /// # 返回值
    /// - `Ok(())` - 上次确认以来没有丢弃
    /// - `Err(RtioError::DroppedCompletion(n))` - 上次确认以来丢弃了 `n` 个
    pub fn ack_dropped(&self) -> Result<()> {
        self.with_queues(|q| {
            let since = q.dropped - q.dropped_acked;
            q.dropped_acked = q.dropped;
            match since {
                0 => Ok(()),
                n => Err(RtioError::DroppedCompletion(n)),
            }
        })
    }
}

fn warn_evicted((evicted, dropped): (u32, u32)) {
    if evicted > 0 {
        crate::warn!("completion queue full, dropped {} cqe ({} total)", evicted, dropped);
    }
}

impl<const SQ: usize, const CQ: usize> Completer for Rtio<'_, SQ, CQ> {
    fn on_backend_completion(&self, sqe: IodevSqe, result: IoResult) {
        Rtio::on_backend_completion(self, sqe, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtio::cqe::Payload;
    use crate::rtio::iodev::NopIodev;
    use crate::rtio::iodev::test_util::leak;
    use core::cell::Cell;

    const NOP: IodevId = IodevId::new(0);
    const HW: IodevId = IodevId::new(1);

    /// 接收请求后挂起，由测试手动完成
    struct Deferred {
        pending: critical_section::Mutex<RefCell<Vec<IodevSqe>>>,
        busy_for: critical_section::Mutex<Cell<u32>>,
    }

    impl Deferred {
        fn new() -> Self {
            Self {
                pending: critical_section::Mutex::new(RefCell::new(Vec::new())),
                busy_for: critical_section::Mutex::new(Cell::new(0)),
            }
        }

        fn busy(&self, times: u32) {
            critical_section::with(|cs| self.busy_for.borrow(cs).set(times));
        }

        fn take(&self, userdata_order: usize) -> IodevSqe {
            critical_section::with(|cs| self.pending.borrow_ref_mut(cs).remove(userdata_order))
        }

        fn pending(&self) -> usize {
            critical_section::with(|cs| self.pending.borrow_ref(cs).len())
        }
    }

    impl Iodev for Deferred {
        fn name(&self) -> &'static str {
            "deferred"
        }

        fn execute(&self, sqe: IodevSqe) -> Execute {
            critical_section::with(|cs| {
                let busy = self.busy_for.borrow(cs);
                if busy.get() > 0 {
                    busy.set(busy.get() - 1);
                    return Execute::Rejected(sqe);
                }
                self.pending.borrow_ref_mut(cs).push(sqe);
                Execute::Accepted
            })
        }
    }

    fn drain<const SQ: usize, const CQ: usize>(rtio: &Rtio<'_, SQ, CQ>) -> Vec<(u32, IoResult)> {
        core::iter::from_fn(|| rtio.poll())
            .map(|cqe| (cqe.userdata(), cqe.result()))
            .collect()
    }

    #[test]
    fn test_nop_roundtrip_in_submission_order() {
        let nop = NopIodev::new();
        let iodevs: [&dyn Iodev; 1] = [&nop];
        let rtio: Rtio<'_, 4, 4> = Rtio::new(&iodevs);

        for tag in 0..4 {
            rtio.submit(Sqe::nop(NOP).with_userdata(tag)).unwrap();
        }
        for _ in 0..4 {
            assert!(rtio.drive());
        }
        assert!(!rtio.drive());

        let done = drain(&rtio);
        assert_eq!(
            done,
            (0..4).map(|tag| (tag, Ok(Payload::None))).collect::<Vec<_>>()
        );
        assert_eq!(rtio.sqes_in_use(), 0);
        assert_eq!(nop.executed(), 4);
    }

    #[test]
    fn test_queue_full_returns_sqe() {
        let nop = NopIodev::new();
        let iodevs: [&dyn Iodev; 1] = [&nop];
        let rtio: Rtio<'_, 4, 4> = Rtio::new(&iodevs);
        let handles: Vec<_> = (0..4)
            .map(|tag| rtio.submit(Sqe::nop(NOP).with_userdata(tag)).unwrap())
            .collect();

        let buf = leak(&[7u8; 3]);
        let err = rtio.submit(Sqe::read(NOP, 0, buf).with_userdata(99)).unwrap_err();
        assert_eq!(err.error(), RtioError::QueueFull);

        // 缓冲区随请求一起交回
        let sqe = err.into_sqe();
        assert_eq!(sqe.userdata(), 99);
        assert_eq!(sqe.into_op().into_buf().unwrap(), &[7u8, 7, 7]);

        // 之前的条目不受影响
        for handle in handles {
            assert_eq!(rtio.state(handle), SqeState::Submitted);
        }
        assert_eq!(rtio.sq_len(), 4);
    }

    #[test]
    fn test_pool_exhausted_while_dispatched() {
        let nop = NopIodev::new();
        let hw = Deferred::new();
        let iodevs: [&dyn Iodev; 2] = [&nop, &hw];
        let rtio: Rtio<'_, 2, 4> = Rtio::new(&iodevs);

        rtio.submit(Sqe::nop(HW)).unwrap();
        rtio.submit(Sqe::nop(HW)).unwrap();
        rtio.drive_all();
        assert_eq!(rtio.sq_len(), 0);

        // 提交队列有空位，但两个槽位都被已派发的条目占着
        let err = rtio.submit(Sqe::nop(NOP)).unwrap_err();
        assert_eq!(err.error(), RtioError::PoolExhausted);

        rtio.on_backend_completion(hw.take(0), Ok(Payload::None));
        assert!(rtio.submit(Sqe::nop(NOP)).is_ok());
    }

    #[test]
    fn test_empty_receive_buffer_is_invalid() {
        let nop = NopIodev::new();
        let iodevs: [&dyn Iodev; 1] = [&nop];
        let rtio: Rtio<'_, 2, 2> = Rtio::new(&iodevs);

        let err = rtio.submit(Sqe::read(NOP, 0, leak(&[]))).unwrap_err();
        assert_eq!(err.error(), RtioError::InvalidArgument);
        assert_eq!(rtio.sq_len(), 0);

        // 只写不读时允许空缓冲区
        assert!(rtio.submit(Sqe::write(NOP, 0, leak(&[]))).is_ok());
    }

    #[test]
    fn test_unknown_iodev() {
        let nop = NopIodev::new();
        let iodevs: [&dyn Iodev; 1] = [&nop];
        let rtio: Rtio<'_, 2, 2> = Rtio::new(&iodevs);
        let err = rtio.submit(Sqe::nop(IodevId::new(5))).unwrap_err();
        assert_eq!(RtioError::from(err), RtioError::UnknownIodev);
    }

    #[test]
    fn test_chain_waits_for_predecessor() {
        let nop = NopIodev::new();
        let hw = Deferred::new();
        let iodevs: [&dyn Iodev; 2] = [&nop, &hw];
        let rtio: Rtio<'_, 4, 4> = Rtio::new(&iodevs);

        let a = rtio.submit(Sqe::nop(HW).chained().with_userdata(1)).unwrap();
        let b = rtio.submit(Sqe::nop(HW).with_userdata(2)).unwrap();

        assert!(rtio.drive());
        assert!(!rtio.drive());
        assert_eq!(rtio.state(a), SqeState::Dispatched);
        assert_eq!(rtio.state(b), SqeState::Submitted);

        rtio.on_backend_completion(hw.take(0), Ok(Payload::Value(5)));
        assert_eq!(rtio.state(a), SqeState::Free);

        assert!(rtio.drive());
        assert_eq!(rtio.state(b), SqeState::Dispatched);
        rtio.on_backend_completion(hw.take(0), Ok(Payload::None));

        assert_eq!(
            drain(&rtio),
            vec![(1, Ok(Payload::Value(5))), (2, Ok(Payload::None))]
        );
    }

    #[test]
    fn test_unchained_entries_pass_blocked_chain() {
        let nop = NopIodev::new();
        let hw = Deferred::new();
        let iodevs: [&dyn Iodev; 2] = [&nop, &hw];
        let rtio: Rtio<'_, 4, 4> = Rtio::new(&iodevs);

        rtio.submit(Sqe::nop(HW).chained().with_userdata(1)).unwrap();
        rtio.submit(Sqe::nop(NOP).with_userdata(2)).unwrap();
        rtio.submit(Sqe::nop(NOP).with_userdata(3)).unwrap();

        // 1 派发后 2 被阻塞，3 不受影响
        assert_eq!(rtio.drive_all(), 2);
        assert_eq!(drain(&rtio), vec![(3, Ok(Payload::None))]);

        rtio.on_backend_completion(hw.take(0), Ok(Payload::None));
        assert_eq!(rtio.drive_all(), 1);
        assert_eq!(
            drain(&rtio),
            vec![(1, Ok(Payload::None)), (2, Ok(Payload::None))]
        );
    }

    #[test]
    fn test_chain_failure_cancels_successors() {
        let nop = NopIodev::new();
        let hw = Deferred::new();
        let iodevs: [&dyn Iodev; 2] = [&nop, &hw];
        let rtio: Rtio<'_, 4, 4> = Rtio::new(&iodevs);

        let buf = leak(&[0u8; 4]);
        rtio.submit(Sqe::nop(HW).chained().with_userdata(1)).unwrap();
        rtio.submit(Sqe::read(NOP, 0, buf).chained().with_userdata(2)).unwrap();
        rtio.submit(Sqe::nop(NOP).with_userdata(3)).unwrap();
        rtio.drive_all();

        rtio.on_backend_completion(hw.take(0), Err(IoError::Bus));
        assert_eq!(rtio.sqes_in_use(), 0);
        assert!(!rtio.drive());

        let mut second = {
            let first = rtio.poll().unwrap();
            assert_eq!(first.result(), Err(IoError::Bus));
            rtio.poll().unwrap()
        };
        assert_eq!(second.userdata(), 2);
        assert_eq!(second.result(), Err(IoError::Cancelled));
        assert_eq!(second.take_buf().map(|b| b.len()), Some(4));
        assert_eq!(drain(&rtio), vec![(3, Err(IoError::Cancelled))]);
        assert_eq!(nop.executed(), 0);
    }

    #[test]
    fn test_chain_link_dropped_when_predecessor_done_first() {
        let nop = NopIodev::new();
        let iodevs: [&dyn Iodev; 1] = [&nop];
        let rtio: Rtio<'_, 4, 4> = Rtio::new(&iodevs);

        rtio.submit(Sqe::nop(NOP).chained().with_userdata(1)).unwrap();
        assert!(rtio.drive());
        // 前驱已经完成，后继不再被阻塞
        rtio.submit(Sqe::nop(NOP).with_userdata(2)).unwrap();
        assert!(rtio.drive());
        assert_eq!(drain(&rtio).len(), 2);
    }

    #[test]
    fn test_rejected_retries_then_busy_timeout() {
        let nop = NopIodev::new();
        let hw = Deferred::new();
        let iodevs: [&dyn Iodev; 2] = [&nop, &hw];
        let rtio: Rtio<'_, 4, 4> = Rtio::with_config(&iodevs, RtioConfig::new().busy_retries(2));

        hw.busy(10);
        rtio.submit(Sqe::nop(HW).with_userdata(1)).unwrap();
        rtio.submit(Sqe::nop(NOP).with_userdata(2)).unwrap();

        // 被拒绝的条目放回队首，先于后面的条目重试
        assert!(rtio.drive());
        assert!(rtio.drive());
        assert_eq!(rtio.cq_len(), 0);
        assert!(rtio.drive());
        assert_eq!(drain(&rtio), vec![(1, Err(IoError::BackendBusyTimeout))]);

        assert!(rtio.drive());
        assert_eq!(drain(&rtio), vec![(2, Ok(Payload::None))]);
    }

    #[test]
    fn test_rejected_then_accepted() {
        let nop = NopIodev::new();
        let hw = Deferred::new();
        let iodevs: [&dyn Iodev; 2] = [&nop, &hw];
        let rtio: Rtio<'_, 4, 4> = Rtio::new(&iodevs);

        hw.busy(1);
        let handle = rtio.submit(Sqe::nop(HW)).unwrap();
        assert!(rtio.drive());
        assert_eq!(rtio.state(handle), SqeState::Submitted);
        assert!(rtio.drive());
        assert_eq!(rtio.state(handle), SqeState::Dispatched);
        assert_eq!(hw.pending(), 1);
    }

    #[test]
    fn test_drive_all_stops_pass_on_rejection() {
        let nop = NopIodev::new();
        let hw = Deferred::new();
        let iodevs: [&dyn Iodev; 2] = [&nop, &hw];
        let rtio: Rtio<'_, 4, 4> = Rtio::new(&iodevs);

        hw.busy(1);
        let busy = rtio.submit(Sqe::nop(HW).with_userdata(1)).unwrap();
        rtio.submit(Sqe::nop(NOP).with_userdata(2)).unwrap();

        // 被拒绝后本轮结束，不会立刻耗尽重试次数
        assert_eq!(rtio.drive_all(), 1);
        assert_eq!(rtio.state(busy), SqeState::Submitted);
        assert_eq!(rtio.cq_len(), 0);
        assert_eq!(nop.executed(), 0);

        assert_eq!(rtio.drive_all(), 2);
        assert_eq!(rtio.state(busy), SqeState::Dispatched);
        assert_eq!(drain(&rtio), vec![(2, Ok(Payload::None))]);
        assert_eq!(hw.pending(), 1);
    }

    #[test]
    fn test_cancelled_chain_overflowing_cq_is_counted() {
        let nop = NopIodev::new();
        let iodevs: [&dyn Iodev; 1] = [&nop];
        let rtio: Rtio<'_, 4, 2> = Rtio::new(&iodevs);

        let head = rtio.submit(Sqe::nop(NOP).chained().with_userdata(1)).unwrap();
        rtio.submit(Sqe::nop(NOP).chained().with_userdata(2)).unwrap();
        rtio.submit(Sqe::nop(NOP).with_userdata(3)).unwrap();

        rtio.cancel(head).unwrap();
        assert_eq!(rtio.dropped_completions(), 1);
        assert_eq!(rtio.ack_dropped(), Err(RtioError::DroppedCompletion(1)));
        assert_eq!(
            drain(&rtio),
            vec![(2, Err(IoError::Cancelled)), (3, Err(IoError::Cancelled))]
        );
    }

    #[test]
    fn test_cancel() {
        let nop = NopIodev::new();
        let hw = Deferred::new();
        let iodevs: [&dyn Iodev; 2] = [&nop, &hw];
        let rtio: Rtio<'_, 4, 4> = Rtio::new(&iodevs);

        let dispatched = rtio.submit(Sqe::nop(HW).with_userdata(1)).unwrap();
        rtio.drive();
        let queued = rtio.submit(Sqe::nop(NOP).with_userdata(2)).unwrap();

        assert_eq!(rtio.cancel(dispatched), Err(RtioError::NotCancellable));
        assert_eq!(rtio.cancel(queued), Ok(()));
        assert_eq!(rtio.cancel(queued), Err(RtioError::UnknownTag));
        assert_eq!(rtio.state(queued), SqeState::Free);

        assert_eq!(drain(&rtio), vec![(2, Err(IoError::Cancelled))]);
        assert!(!rtio.drive());
    }

    #[test]
    fn test_cancel_middle_of_chain() {
        let nop = NopIodev::new();
        let hw = Deferred::new();
        let iodevs: [&dyn Iodev; 2] = [&nop, &hw];
        let rtio: Rtio<'_, 4, 4> = Rtio::new(&iodevs);

        rtio.submit(Sqe::nop(HW).chained().with_userdata(1)).unwrap();
        let b = rtio.submit(Sqe::nop(NOP).chained().with_userdata(2)).unwrap();
        rtio.submit(Sqe::nop(NOP).with_userdata(3)).unwrap();
        rtio.drive_all();

        rtio.cancel(b).unwrap();
        assert_eq!(
            drain(&rtio),
            vec![(2, Err(IoError::Cancelled)), (3, Err(IoError::Cancelled))]
        );

        // 前驱之后完成不再影响已取消的条目
        rtio.on_backend_completion(hw.take(0), Ok(Payload::None));
        assert_eq!(drain(&rtio), vec![(1, Ok(Payload::None))]);
    }

    #[test]
    fn test_cq_overflow_evicts_oldest() {
        let nop = NopIodev::new();
        let iodevs: [&dyn Iodev; 1] = [&nop];
        let rtio: Rtio<'_, 4, 2> = Rtio::new(&iodevs);

        for tag in 1..=3 {
            rtio.submit(Sqe::nop(NOP).with_userdata(tag)).unwrap();
        }
        assert_eq!(rtio.drive_all(), 3);

        assert_eq!(rtio.dropped_completions(), 1);
        assert_eq!(rtio.ack_dropped(), Err(RtioError::DroppedCompletion(1)));
        assert_eq!(rtio.ack_dropped(), Ok(()));
        assert_eq!(rtio.dropped_completions(), 1);

        let tags: Vec<_> = drain(&rtio).into_iter().map(|(tag, _)| tag).collect();
        assert_eq!(tags, vec![2, 3]);
    }

    #[test]
    fn test_consumed_slot_never_yields_stale_data() {
        let nop = NopIodev::new();
        let iodevs: [&dyn Iodev; 1] = [&nop];
        let rtio: Rtio<'_, 1, 1> = Rtio::new(&iodevs);

        for tag in 0..5 {
            rtio.submit(Sqe::nop(NOP).with_userdata(tag)).unwrap();
            rtio.drive();
            assert_eq!(rtio.poll().map(|cqe| cqe.userdata()), Some(tag));
            assert!(rtio.poll().is_none());
        }
    }

    #[test]
    fn test_stale_handle_after_reuse() {
        let nop = NopIodev::new();
        let iodevs: [&dyn Iodev; 1] = [&nop];
        let rtio: Rtio<'_, 1, 2> = Rtio::new(&iodevs);

        let old = rtio.submit(Sqe::nop(NOP)).unwrap();
        rtio.drive();
        let new = rtio.submit(Sqe::nop(NOP)).unwrap();
        assert_eq!(old.index(), new.index());
        assert_eq!(rtio.state(old), SqeState::Free);
        assert_eq!(rtio.cancel(old), Err(RtioError::UnknownTag));
        assert_eq!(rtio.state(new), SqeState::Submitted);
    }

    #[test]
    #[should_panic]
    fn test_foreign_completion_panics() {
        let nop = NopIodev::new();
        let hw = Deferred::new();
        let iodevs: [&dyn Iodev; 2] = [&nop, &hw];
        let rtio: Rtio<'_, 2, 2> = Rtio::new(&iodevs);
        let other: Rtio<'_, 2, 2> = Rtio::new(&iodevs);

        rtio.submit(Sqe::nop(HW)).unwrap();
        rtio.drive();
        // 交给了错误的引擎，该槽位在 other 中从未派发
        other.on_backend_completion(hw.take(0), Ok(Payload::None));
    }

    /// 每次挂起推进一个 tick 的宿主
    struct StepHost {
        now: Cell<u32>,
        suspended: Cell<u32>,
    }

    impl Host for StepHost {
        fn now(&self) -> u32 {
            self.now.get()
        }

        fn suspend(&self, _deadline: Option<u32>) {
            self.suspended.set(self.suspended.get() + 1);
            self.now.set(self.now.get().wrapping_add(1));
        }
    }

    #[test]
    fn test_wait_times_out() {
        let nop = NopIodev::new();
        let iodevs: [&dyn Iodev; 1] = [&nop];
        let rtio: Rtio<'_, 2, 2> = Rtio::new(&iodevs);
        let host = StepHost {
            now: Cell::new(u32::MAX - 1),
            suspended: Cell::new(0),
        };

        assert_eq!(rtio.wait_with(Timeout::Ticks(3), &host).unwrap_err(), RtioError::Timeout);
        assert_eq!(host.suspended.get(), 3);

        assert_eq!(rtio.wait_with(Timeout::NoWait, &host).unwrap_err(), RtioError::Timeout);
        assert_eq!(host.suspended.get(), 3);
    }

    #[test]
    fn test_wait_returns_ready_completion() {
        let nop = NopIodev::new();
        let iodevs: [&dyn Iodev; 1] = [&nop];
        let rtio: Rtio<'_, 2, 2> = Rtio::new(&iodevs);
        let host = StepHost {
            now: Cell::new(0),
            suspended: Cell::new(0),
        };

        rtio.submit(Sqe::nop(NOP).with_userdata(8)).unwrap();
        rtio.drive();
        let cqe = rtio.wait_with(Timeout::Forever, &host).unwrap();
        assert_eq!(cqe.userdata(), 8);
        assert_eq!(host.suspended.get(), 0);
    }
}
