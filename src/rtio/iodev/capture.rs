//! PWM 输入捕获适配器（异步驱动）

use super::{Completer, Execute, Iodev};
use crate::drivers::{CaptureConfig, CaptureDevice, CaptureMode, CaptureType, DeviceError};
use crate::error::IoError;
use crate::rtio::cqe::Payload;
use crate::rtio::sqe::{IodevSqe, Op};
use core::cell::RefCell;
use critical_section::Mutex;

struct CaptureState<P> {
    dev: P,
    channel: u8,
    pending: Option<IodevSqe>,
}

/// 每个 `Read` 请求在指定通道上做一次单次捕获
///
/// 捕获中断中调用 [`CaptureIodev::on_capture`]。结果以
/// `Payload::Capture` 返回，同时把周期、脉宽按小端 `u32` 依次写入读缓冲区
/// （缓冲区放不下的部分被截断）。
pub struct CaptureIodev<P> {
    state: Mutex<RefCell<CaptureState<P>>>,
}

impl<P> CaptureIodev<P> {
    pub const fn new(dev: P, channel: u8) -> Self {
        Self {
            state: Mutex::new(RefCell::new(CaptureState {
                dev,
                channel,
                pending: None,
            })),
        }
    }

    /// 直接访问底层驱动（初始化、测试辅助）
    pub fn with_device<R>(&self, f: impl FnOnce(&mut P) -> R) -> R {
        critical_section::with(|cs| f(&mut self.state.borrow_ref_mut(cs).dev))
    }

    pub fn is_pending(&self) -> bool {
        critical_section::with(|cs| self.state.borrow_ref(cs).pending.is_some())
    }
}

impl<P> CaptureIodev<P>
where
    P: CaptureDevice<Error = DeviceError>,
{
    /// 捕获中断处理
    ///
    /// # 参数
    /// - `completer`: 引擎
    /// - `capture`: 驱动上报的 `(周期, 脉宽)` 或错误
    ///
    /// # 返回值
    /// 是否完成了一个等待中的请求
    pub fn on_capture(
        &self,
        completer: &impl Completer,
        capture: Result<(u32, u32), DeviceError>,
    ) -> bool {
        let pending = critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            let sqe = state.pending.take()?;
            let channel = state.channel;
            // 单次捕获，驱动可能已经自行停止
            let disabled = state.dev.disable_capture(channel);
            Some((sqe, channel, disabled))
        });
        let Some((mut sqe, channel, disabled)) = pending else {
            return false;
        };
        if let Err(err) = disabled {
            crate::debug!("capture: disable channel {} failed: {:?}", channel, err);
        }

        let result = match capture {
            Ok((period, pulse)) => {
                if let Op::Read { buf, .. } = sqe.op_mut() {
                    let mut bytes = [0u8; 8];
                    bytes[..4].copy_from_slice(&period.to_le_bytes());
                    bytes[4..].copy_from_slice(&pulse.to_le_bytes());
                    let n = buf.len().min(bytes.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                }
                Ok(Payload::Capture { period, pulse })
            }
            Err(err) => Err(err.into()),
        };
        completer.on_backend_completion(sqe, result);
        true
    }
}

impl<P> Iodev for CaptureIodev<P>
where
    P: CaptureDevice<Error = DeviceError> + Send,
{
    fn name(&self) -> &'static str {
        "capture"
    }

    fn execute(&self, sqe: IodevSqe) -> Execute {
        match sqe.op() {
            Op::Read { .. } => {}
            Op::Nop => return Execute::Completed(sqe, Ok(Payload::None)),
            _ => return Execute::Completed(sqe, Err(IoError::BackendRejected)),
        }

        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if state.pending.is_some() || !state.dev.is_ready() {
                return Execute::Rejected(sqe);
            }

            let channel = state.channel;
            let config = CaptureConfig {
                kind: CaptureType::Both,
                mode: CaptureMode::Single,
            };
            let armed = state
                .dev
                .configure_capture(channel, config)
                .and_then(|()| state.dev.enable_capture(channel));
            match armed {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::Device;
    use crate::drivers::mock::MockCapture;
    use crate::rtio::cqe::IoResult;
    use crate::rtio::iodev::test_util::{iodev_sqe, leak};
    use core::cell::RefCell as StdRefCell;

    #[derive(Default)]
    struct Recorder {
        done: StdRefCell<Option<(IoResult, Option<&'static mut [u8]>)>>,
    }

    impl Completer for Recorder {
        fn on_backend_completion(&self, sqe: IodevSqe, result: IoResult) {
            let (_, op) = sqe.into_parts();
            *self.done.borrow_mut() = Some((result, op.into_buf()));
        }
    }

    fn ready_capture() -> CaptureIodev<MockCapture> {
        let iodev = CaptureIodev::new(MockCapture::new(), 2);
        iodev.with_device(|dev| dev.init().unwrap());
        iodev
    }

    #[test]
    fn test_capture_fills_buffer() {
        let iodev = ready_capture();
        let recorder = Recorder::default();

        let buf = leak(&[0u8; 8]);
        assert!(matches!(
            iodev.execute(iodev_sqe(0, Op::Read { addr: 0, buf })),
            Execute::Accepted
        ));
        assert!(iodev.with_device(|dev| dev.is_capture_enabled(2)));

        let edge = iodev.with_device(|dev| dev.mock_edge(2, 1000, 250));
        assert_eq!(edge, Some((1000, 250)));
        assert!(iodev.on_capture(&recorder, Ok(edge.unwrap())));

        let (result, buf) = recorder.done.borrow_mut().take().unwrap();
        assert_eq!(result, Ok(Payload::Capture { period: 1000, pulse: 250 }));
        let buf = buf.unwrap();
        assert_eq!(&buf[..4], &1000u32.to_le_bytes());
        assert_eq!(&buf[4..], &250u32.to_le_bytes());
        assert!(!iodev.with_device(|dev| dev.is_capture_enabled(2)));
    }

    #[test]
    fn test_capture_error() {
        let iodev = ready_capture();
        let recorder = Recorder::default();
        let buf = leak(&[0u8; 2]);
        iodev.execute(iodev_sqe(0, Op::Read { addr: 0, buf }));

        assert!(iodev.on_capture(&recorder, Err(DeviceError::BufferOverflow)));
        let (result, _) = recorder.done.borrow_mut().take().unwrap();
        assert_eq!(result, Err(IoError::Overflow));
    }

    #[test]
    fn test_short_buffer_truncates() {
        let iodev = ready_capture();
        let recorder = Recorder::default();
        let buf = leak(&[0u8; 2]);
        iodev.execute(iodev_sqe(0, Op::Read { addr: 0, buf }));
        iodev.on_capture(&recorder, Ok((0x0102_0304, 5)));

        let (_, buf) = recorder.done.borrow_mut().take().unwrap();
        assert_eq!(buf.unwrap(), &[0x04u8, 0x03]);
    }

    /// 停止捕获总是失败的驱动
    struct StuckCapture;

    impl Device for StuckCapture {
        type Error = DeviceError;

        fn init(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "stuck"
        }
    }

    impl CaptureDevice for StuckCapture {
        fn configure_capture(&mut self, _: u8, _: CaptureConfig) -> Result<(), Self::Error> {
            Ok(())
        }

        fn enable_capture(&mut self, _: u8) -> Result<(), Self::Error> {
            Ok(())
        }

        fn disable_capture(&mut self, _: u8) -> Result<(), Self::Error> {
            Err(DeviceError::Other)
        }
    }

    #[test]
    fn test_completes_when_disable_fails() {
        let iodev = CaptureIodev::new(StuckCapture, 0);
        let recorder = Recorder::default();
        let buf = leak(&[0u8; 8]);
        assert!(matches!(
            iodev.execute(iodev_sqe(0, Op::Read { addr: 0, buf })),
            Execute::Accepted
        ));

        assert!(iodev.on_capture(&recorder, Ok((40, 10))));
        let (result, _) = recorder.done.borrow_mut().take().unwrap();
        assert_eq!(result, Ok(Payload::Capture { period: 40, pulse: 10 }));
        assert!(!iodev.is_pending());
    }

    #[test]
    fn test_write_is_rejected() {
        let iodev = ready_capture();
        let tx: &'static [u8] = leak(&[1]);
        match iodev.execute(iodev_sqe(0, Op::Write { addr: 0, buf: tx })) {
            Execute::Completed(_, result) => assert_eq!(result, Err(IoError::BackendRejected)),
            other => panic!("unexpected {:?}", other),
        }
    }
}
