/// 静态定义一个引擎及其适配器表
///
/// # 语法
///
/// ```rust,ignore
/// rtio_define!(pub NAME: [SQ, CQ] {
///     label => IODEV_STATIC,
///     ...
/// });
/// ```
///
/// # 生成内容
///
/// - `static NAME: Rtio<'static, SQ, CQ>`
/// - 每个适配器一个 `const NAME_LABEL: IodevId`，按书写顺序编号
///
/// # 示例
///
/// ```rust
/// use neon_rtio::rtio::{NopIodev, Sqe};
/// use neon_rtio::rtio_define;
///
/// static NOP_DEV: NopIodev = NopIodev::new();
///
/// rtio_define!(pub SENSORS: [4, 4] {
///     nop => NOP_DEV,
/// });
///
/// SENSORS.submit(Sqe::nop(SENSORS_NOP).with_userdata(1)).unwrap();
/// SENSORS.drive_all();
/// assert_eq!(SENSORS.poll().unwrap().userdata(), 1);
/// ```
#[macro_export]
macro_rules! rtio_define {
    ($vis:vis $name:ident : [$sq:expr, $cq:expr] { $($label:ident => $iodev:path),+ $(,)? }) => {
        $crate::paste::paste! {
            #[doc(hidden)]
            #[repr(u8)]
            #[allow(non_camel_case_types, dead_code)]
            enum [<__ $name:camel Iodevs>] {
                $($label),+
            }

            $(
                $vis const [<$name _ $label:upper>]: $crate::rtio::IodevId =
                    $crate::rtio::IodevId::new([<__ $name:camel Iodevs>]::$label as u8);
            )+

            #[doc(hidden)]
            static [<__ $name _IODEVS>]: &[&dyn $crate::rtio::Iodev] = &[$(&$iodev),+];

            $vis static $name: $crate::rtio::Rtio<'static, $sq, $cq> =
                $crate::rtio::Rtio::new([<__ $name _IODEVS>]);
        }
    };
}
