//! 定长环形队列
//!
//! 元素为描述符池中的索引。除了常规的 FIFO 操作，还支持从中间移除
//! （链上被阻塞的条目需要跳过、取消的条目需要摘除），这时后续元素整体前移。

pub(crate) struct Ring<const N: usize> {
    buf: [u16; N],
    head: usize,
    len: usize,
}

impl<const N: usize> Ring<N> {
    pub const fn new() -> Self {
        Self {
            buf: [0; N],
            head: 0,
            len: 0,
        }
    }

    #[inline]
    fn slot(&self, pos: usize) -> usize {
        (self.head + pos) % N
    }

    /// 向队尾推送
    ///
    /// # 返回值
    /// - `true` - 成功推送
    /// - `false` - 队列已满
    pub fn push_back(&mut self, value: u16) -> bool {
        if self.len == N {
            return false;
        }
        let tail = self.slot(self.len);
        self.buf[tail] = value;
        self.len += 1;
        true
    }

    /// 插入到队首，用于重试的条目
    pub fn push_front(&mut self, value: u16) -> bool {
        if self.len == N {
            return false;
        }
        self.head = (self.head + N - 1) % N;
        self.buf[self.head] = value;
        self.len += 1;
        true
    }

    pub fn pop_front(&mut self) -> Option<u16> {
        if self.len == 0 {
            return None;
        }
        let value = self.buf[self.head];
        self.head = (self.head + 1) % N;
        self.len -= 1;
        Some(value)
    }

    /// 第一个满足条件的元素位置（相对队首）
    pub fn position<F>(&self, mut pred: F) -> Option<usize>
    where
        F: FnMut(u16) -> bool,
    {
        (0..self.len).find(|&pos| pred(self.buf[self.slot(pos)]))
    }

    /// 移除指定位置的元素
    pub fn remove(&mut self, pos: usize) -> Option<u16> {
        if pos >= self.len {
            return None;
        }
        let value = self.buf[self.slot(pos)];
        for i in pos..self.len - 1 {
            let (dst, src) = (self.slot(i), self.slot(i + 1));
            self.buf[dst] = self.buf[src];
        }
        self.len -= 1;
        Some(value)
    }

    /// 按值移除
    pub fn remove_value(&mut self, value: u16) -> bool {
        match self.position(|v| v == value) {
            Some(pos) => self.remove(pos).is_some(),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }
}
