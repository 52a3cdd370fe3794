//! 定长描述符池
//!
//! 槽位数组 + 空闲索引栈，不做任何堆分配。每个槽位带一个代数（generation），
//! 释放时递增，用来识别过期句柄。

use crate::config::MAX_QUEUE_DEPTH;

struct Slot<T> {
    value: Option<T>,
    generation: u16,
}

pub(crate) struct Pool<T, const N: usize> {
    slots: [Slot<T>; N],
    /// 空闲索引栈，`free[..free_len]` 有效
    free: [u16; N],
    free_len: usize,
}

impl<T, const N: usize> Pool<T, N> {
    pub const fn new() -> Self {
        const { assert!(N > 0 && N <= MAX_QUEUE_DEPTH, "pool capacity out of range") };

        let mut free = [0u16; N];
        let mut i = 0;
        // 倒序入栈，保证先取到索引 0
        while i < N {
            free[i] = (N - 1 - i) as u16;
            i += 1;
        }

        Self {
            slots: [const { Slot { value: None, generation: 0 } }; N],
            free,
            free_len: N,
        }
    }

    /// 占用一个空闲槽位
    ///
    /// # 返回值
    /// - `Ok(index)` - 槽位索引
    /// - `Err(value)` - 池已耗尽，原样归还 `value`
    pub fn acquire(&mut self, value: T) -> Result<u16, T> {
        if self.free_len == 0 {
            return Err(value);
        }
        self.free_len -= 1;
        let index = self.free[self.free_len];
        let slot = &mut self.slots[index as usize];
        debug_assert!(slot.value.is_none());
        slot.value = Some(value);
        Ok(index)
    }

    /// 归还槽位并取出其中的值
    ///
    /// # Panics
    ///
    /// 槽位未被占用（重复释放）时 panic，这意味着内部状态已经损坏。
    pub fn release(&mut self, index: u16) -> T {
        let slot = &mut self.slots[index as usize];
        let Some(value) = slot.value.take() else {
            panic!("pool slot {} released while free", index);
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free[self.free_len] = index;
        self.free_len += 1;
        value
    }

    pub fn get(&self, index: u16) -> Option<&T> {
        self.slots.get(index as usize)?.value.as_ref()
    }

    pub fn get_mut(&mut self, index: u16) -> Option<&mut T> {
        self.slots.get_mut(index as usize)?.value.as_mut()
    }

    /// 槽位当前代数，只有被占用的槽位才返回
    pub fn generation(&self, index: u16) -> Option<u16> {
        let slot = self.slots.get(index as usize)?;
        slot.value.as_ref().map(|_| slot.generation)
    }

    pub fn available(&self) -> usize {
        self.free_len
    }

    pub fn in_use(&self) -> usize {
        N - self.free_len
    }
}
