//! 提交条目（SQE）
//!
//! 调用方用 [`Sqe`] 描述一次 I/O 请求并交给 `Rtio::submit`；
//! 派发时引擎把操作连同缓冲区的所有权打包成 [`IodevSqe`] 交给设备适配器，
//! 适配器完成后必须原样交回同一个 `IodevSqe`。

/// 设备适配器在引擎适配器表中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IodevId(u8);

impl IodevId {
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// 具体的 I/O 操作
///
/// 接收缓冲区以 `&'static mut` 形式移交，随完成条目归还给调用方。
#[derive(Debug)]
pub enum Op {
    /// 空操作
    Nop,
    /// 从目标地址读取，填满 `buf`
    Read { addr: u16, buf: &'static mut [u8] },
    /// 向目标地址写入 `buf`
    Write { addr: u16, buf: &'static [u8] },
    /// 先写 `tx` 再读入 `rx`，中间不释放总线
    Transceive {
        addr: u16,
        tx: &'static [u8],
        rx: &'static mut [u8],
    },
    /// 等待 `ticks` 个设备计数周期（从派发时刻算起）
    TimedWait { ticks: u32 },
}

impl Op {
    /// 取回接收缓冲区
    pub fn into_buf(self) -> Option<&'static mut [u8]> {
        match self {
            Op::Read { buf, .. } => Some(buf),
            Op::Transceive { rx, .. } => Some(rx),
            Op::Nop | Op::Write { .. } | Op::TimedWait { .. } => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Op::Nop => "nop",
            Op::Read { .. } => "read",
            Op::Write { .. } => "write",
            Op::Transceive { .. } => "transceive",
            Op::TimedWait { .. } => "timed_wait",
        }
    }
}

/// 待提交的请求
///
/// # 示例
///
/// ```rust
/// use neon_rtio::rtio::{IodevId, Sqe};
///
/// const SENSOR: IodevId = IodevId::new(0);
///
/// let first = Sqe::nop(SENSOR).chained().with_userdata(1);
/// let second = Sqe::timed_wait(SENSOR, 100).with_userdata(2);
/// assert!(first.is_chained());
/// assert!(!second.is_chained());
/// ```
#[derive(Debug)]
pub struct Sqe {
    pub(crate) op: Op,
    pub(crate) iodev: IodevId,
    pub(crate) chained: bool,
    pub(crate) userdata: u32,
}

impl Sqe {
    pub fn new(iodev: IodevId, op: Op) -> Self {
        Self {
            op,
            iodev,
            chained: false,
            userdata: 0,
        }
    }

    pub fn nop(iodev: IodevId) -> Self {
        Self::new(iodev, Op::Nop)
    }

    pub fn read(iodev: IodevId, addr: u16, buf: &'static mut [u8]) -> Self {
        Self::new(iodev, Op::Read { addr, buf })
    }

    pub fn write(iodev: IodevId, addr: u16, buf: &'static [u8]) -> Self {
        Self::new(iodev, Op::Write { addr, buf })
    }

    pub fn transceive(
        iodev: IodevId,
        addr: u16,
        tx: &'static [u8],
        rx: &'static mut [u8],
    ) -> Self {
        Self::new(iodev, Op::Transceive { addr, tx, rx })
    }

    pub fn timed_wait(iodev: IodevId, ticks: u32) -> Self {
        Self::new(iodev, Op::TimedWait { ticks })
    }

    /// 下一个提交的条目必须等本条目完成后才能派发
    pub fn chained(mut self) -> Self {
        self.chained = true;
        self
    }

    /// 原样复制到对应完成条目中的关联值
    pub fn with_userdata(mut self, userdata: u32) -> Self {
        self.userdata = userdata;
        self
    }

    pub fn is_chained(&self) -> bool {
        self.chained
    }

    pub fn userdata(&self) -> u32 {
        self.userdata
    }

    pub fn iodev(&self) -> IodevId {
        self.iodev
    }

    pub fn op(&self) -> &Op {
        &self.op
    }

    /// 拆出操作，提交失败时用来取回缓冲区
    pub fn into_op(self) -> Op {
        self.op
    }
}

/// `Rtio::submit` 返回的关联句柄
///
/// 槽位索引加代数，槽位被回收再利用后旧句柄自动失效。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SqeHandle {
    pub(crate) index: u16,
    pub(crate) generation: u16,
}

impl SqeHandle {
    pub fn index(&self) -> u16 {
        self.index
    }
}

/// 条目生命周期中可以从外部观察到的状态
///
/// `Completed` 只在引擎内部短暂存在：完成条目发布的同时提交槽位即被回收。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqeState {
    /// 槽位空闲，或句柄已过期
    Free,
    /// 在提交队列中等待派发
    Submitted,
    /// 已交给设备适配器，等待完成
    Dispatched,
}

/// 派发给设备适配器的请求
///
/// 既不能 `Clone` 也不能 `Copy`：适配器要么在 `execute` 的返回值里交回，
/// 要么之后交给 `on_backend_completion`，不可能完成两次。
#[derive(Debug)]
pub struct IodevSqe {
    handle: SqeHandle,
    iodev: IodevId,
    op: Op,
}

impl IodevSqe {
    pub(crate) fn new(handle: SqeHandle, iodev: IodevId, op: Op) -> Self {
        Self { handle, iodev, op }
    }

    pub fn handle(&self) -> SqeHandle {
        self.handle
    }

    pub fn iodev(&self) -> IodevId {
        self.iodev
    }

    pub fn op(&self) -> &Op {
        &self.op
    }

    pub fn op_mut(&mut self) -> &mut Op {
        &mut self.op
    }

    pub(crate) fn into_parts(self) -> (SqeHandle, Op) {
        (self.handle, self.op)
    }
}
