//! 哈希桶
//!
//! 每个桶是一把自旋锁加一条以槽位下标链接的循环双向链表，
//! 表头由哨兵下标 `HEAD` 表示。链表顺序不表示新旧程度，
//! 只表示成员关系；新成员插入表头之后（`next` 端），
//! 因此沿 `prev` 方向遍历即从最早加入的成员开始。

use super::slot::{Slot, SlotId};
use crate::consts::HEAD;
use spin::{Mutex, MutexGuard};

/// 桶链表表头（哨兵）
#[derive(Debug)]
pub(crate) struct ListHead {
    next: SlotId,
    prev: SlotId,
    len: usize,
}

impl ListHead {
    const fn new() -> Self {
        Self {
            next: HEAD,
            prev: HEAD,
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    fn set_next_of(&mut self, slots: &[Slot], at: SlotId, to: SlotId) {
        if at == HEAD {
            self.next = to;
        } else {
            slots[at].set_next(to);
        }
    }

    fn set_prev_of(&mut self, slots: &[Slot], at: SlotId, to: SlotId) {
        if at == HEAD {
            self.prev = to;
        } else {
            slots[at].set_prev(to);
        }
    }

    /// 把槽位插入表头之后，并记录其所属桶
    pub(crate) fn push_front(&mut self, slots: &[Slot], id: SlotId, bucket: usize) {
        let first = self.next;
        slots[id].set_next(first);
        slots[id].set_prev(HEAD);
        self.set_prev_of(slots, first, id);
        self.next = id;
        slots[id].set_bucket(bucket);
        self.len += 1;
    }

    /// 把槽位从本链表摘下
    pub(crate) fn unlink(&mut self, slots: &[Slot], id: SlotId) {
        let next = slots[id].next();
        let prev = slots[id].prev();
        self.set_next_of(slots, prev, next);
        self.set_prev_of(slots, next, prev);
        slots[id].set_next(HEAD);
        slots[id].set_prev(HEAD);
        self.len -= 1;
    }

    /// 从最近加入的成员开始遍历
    pub(crate) fn iter<'a>(&self, slots: &'a [Slot]) -> Iter<'a> {
        Iter {
            slots,
            cursor: self.next,
            forward: true,
        }
    }

    /// 从最早加入的成员开始遍历
    pub(crate) fn iter_oldest<'a>(&self, slots: &'a [Slot]) -> Iter<'a> {
        Iter {
            slots,
            cursor: self.prev,
            forward: false,
        }
    }
}

/// 桶链表迭代器
///
/// 只能在持有对应桶锁期间使用。
pub(crate) struct Iter<'a> {
    slots: &'a [Slot],
    cursor: SlotId,
    forward: bool,
}

impl Iterator for Iter<'_> {
    type Item = SlotId;

    fn next(&mut self) -> Option<SlotId> {
        if self.cursor == HEAD {
            return None;
        }
        let id = self.cursor;
        self.cursor = if self.forward {
            self.slots[id].next()
        } else {
            self.slots[id].prev()
        };
        Some(id)
    }
}

/// 哈希桶
pub(crate) struct Bucket {
    head: Mutex<ListHead>,
}

impl Bucket {
    pub(crate) const fn new() -> Self {
        Self {
            head: Mutex::new(ListHead::new()),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ListHead> {
        self.head.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    fn arena(n: usize) -> Vec<Slot> {
        (0..n).map(|_| Slot::new(16)).collect()
    }

    #[test]
    fn test_push_and_iterate() {
        let slots = arena(3);
        let mut head = ListHead::new();
        for id in 0..3 {
            head.push_front(&slots, id, 4);
        }

        assert_eq!(head.len(), 3);
        assert_eq!(head.iter(&slots).collect::<Vec<_>>(), [2, 1, 0]);
        assert_eq!(head.iter_oldest(&slots).collect::<Vec<_>>(), [0, 1, 2]);
        assert!(slots.iter().all(|s| s.bucket() == 4));
    }

    #[test]
    fn test_empty_list() {
        let slots = arena(1);
        let head = ListHead::new();
        assert_eq!(head.len(), 0);
        assert_eq!(head.iter(&slots).next(), None);
        assert_eq!(head.iter_oldest(&slots).next(), None);
    }

    #[test]
    fn test_unlink_positions() {
        let slots = arena(4);
        let mut head = ListHead::new();
        for id in 0..4 {
            head.push_front(&slots, id, 0);
        }

        // 中间
        head.unlink(&slots, 2);
        assert_eq!(head.iter(&slots).collect::<Vec<_>>(), [3, 1, 0]);

        // 表头端
        head.unlink(&slots, 3);
        assert_eq!(head.iter(&slots).collect::<Vec<_>>(), [1, 0]);

        // 表尾端
        head.unlink(&slots, 0);
        assert_eq!(head.iter(&slots).collect::<Vec<_>>(), [1]);
        assert_eq!(head.iter_oldest(&slots).collect::<Vec<_>>(), [1]);

        head.unlink(&slots, 1);
        assert_eq!(head.len(), 0);
        assert_eq!(head.iter(&slots).next(), None);
    }

    #[test]
    fn test_move_between_buckets() {
        let slots = arena(3);
        let from = Bucket::new();
        let to = Bucket::new();
        {
            let mut head = from.lock();
            for id in 0..3 {
                head.push_front(&slots, id, 0);
            }
        }

        let mut src = from.lock();
        let mut dst = to.lock();
        src.unlink(&slots, 0);
        dst.push_front(&slots, 0, 1);

        assert_eq!(src.iter(&slots).collect::<Vec<_>>(), [2, 1]);
        assert_eq!(dst.iter(&slots).collect::<Vec<_>>(), [0]);
        assert_eq!(slots[0].bucket(), 1);
        assert_eq!(slots[1].bucket(), 0);
    }
}
