//! Intrusive list tests.

use alloc::vec::Vec;
use core::mem::offset_of;
use seos::list::{Link, List};

struct Item {
    value: i64,
    seq: i64,
    link: Link,
}

impl Item {
    fn new(value: i64, seq: i64) -> Self {
        Self {
            value,
            seq,
            link: Link::new(),
        }
    }
}

unsafe fn item(link: *const Link) -> *const Item {
    unsafe { link.byte_sub(offset_of!(Item, link)) as *const Item }
}

fn by_value(a: *const Link, b: *const Link) -> bool {
    unsafe { (*item(a)).value < (*item(b)).value }
}

fn collect(list: &List) -> Vec<(i64, i64)> {
    list.iter()
        .map(|link| unsafe {
            let it = item(link.as_ptr());
            ((*it).value, (*it).seq)
        })
        .collect()
}

unsafe fn drain(list: &mut List) {
    unsafe { while list.pop_front().is_some() {} }
}

pub fn push_pop() {
    let mut items = [Item::new(1, 0), Item::new(2, 1), Item::new(3, 2)];
    let mut list = List::new();
    assert!(list.is_empty());

    unsafe {
        for it in items.iter_mut() {
            list.push_back(&raw mut it.link);
        }
        assert!(!list.is_empty());
        assert_eq!(collect(&list), [(1, 0), (2, 1), (3, 2)]);

        let front = list.pop_front().unwrap();
        assert_eq!((*item(front.as_ptr())).value, 1);
        assert_eq!(collect(&list), [(2, 1), (3, 2)]);
        drain(&mut list);
    }
    assert!(list.is_empty());
}

pub fn ordered_insert() {
    let mut items = [
        Item::new(3, 0),
        Item::new(1, 1),
        Item::new(2, 2),
        Item::new(1, 3),
        Item::new(3, 4),
    ];
    let mut list = List::new();

    unsafe {
        for it in items.iter_mut() {
            list.insert_ordered(&raw mut it.link, by_value);
        }
        // Sorted ascending; equal keys keep insertion order.
        assert_eq!(collect(&list), [(1, 1), (1, 3), (2, 2), (3, 0), (3, 4)]);
        drain(&mut list);
    }
}

pub fn sort_stable() {
    let mut items = [
        Item::new(2, 0),
        Item::new(1, 1),
        Item::new(2, 2),
        Item::new(0, 3),
        Item::new(1, 4),
    ];
    let mut list = List::new();

    unsafe {
        for it in items.iter_mut() {
            list.push_back(&raw mut it.link);
        }
        list.sort(by_value);
        assert_eq!(collect(&list), [(0, 3), (1, 1), (1, 4), (2, 0), (2, 2)]);
        drain(&mut list);
    }
}

pub fn remove_and_refill() {
    let mut items = [
        Item::new(1, 0),
        Item::new(2, 1),
        Item::new(3, 2),
        Item::new(4, 3),
    ];
    let mut list = List::new();

    unsafe {
        for it in items.iter_mut() {
            list.push_back(&raw mut it.link);
        }

        // In-place removal given only the link.
        list.remove(&raw mut items[2].link);
        assert_eq!(collect(&list), [(1, 0), (2, 1), (4, 3)]);

        // A removed link is reusable.
        list.push_back(&raw mut items[2].link);
        assert_eq!(collect(&list), [(1, 0), (2, 1), (4, 3), (3, 2)]);

        // Removal at both ends updates the ends correctly.
        list.remove(&raw mut items[0].link);
        list.remove(&raw mut items[2].link);
        assert_eq!(collect(&list), [(2, 1), (4, 3)]);
        drain(&mut list);
    }
}
