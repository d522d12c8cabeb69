use std::mem::size_of;

use crate::value::Value;

#[derive(Clone, Debug)]
struct Node {
    value: Value,
    prev: Option<u32>,
    next: Option<u32>,
}

/// A doubly linked list of values.
///
/// Nodes live in an arena `Vec` and link by index; removed nodes go on a
/// free list for reuse. Push and pop at either end are O(1).
#[derive(Clone, Debug, Default)]
pub struct ValueList {
    nodes: Vec<Node>,
    free: Vec<u32>,
    head: Option<u32>,
    tail: Option<u32>,
    len: usize,
}

impl ValueList {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push_back(&mut self, value: Value) {
        let index = self.alloc(Node {
            value,
            prev: self.tail,
            next: None,
        });
        match self.tail {
            Some(tail) => self.nodes[tail as usize].next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;
    }

    pub fn push_front(&mut self, value: Value) {
        let index = self.alloc(Node {
            value,
            prev: None,
            next: self.head,
        });
        match self.head {
            Some(head) => self.nodes[head as usize].prev = Some(index),
            None => self.tail = Some(index),
        }
        self.head = Some(index);
        self.len += 1;
    }

    pub fn pop_back(&mut self) -> Option<Value> {
        let index = self.tail?;
        let node = self.nodes[index as usize].clone();
        self.tail = node.prev;
        match node.prev {
            Some(prev) => self.nodes[prev as usize].next = None,
            None => self.head = None,
        }
        self.release(index);
        Some(node.value)
    }

    pub fn pop_front(&mut self) -> Option<Value> {
        let index = self.head?;
        let node = self.nodes[index as usize].clone();
        self.head = node.next;
        match node.next {
            Some(next) => self.nodes[next as usize].prev = None,
            None => self.tail = None,
        }
        self.release(index);
        Some(node.value)
    }

    /// Value at position `n` from the front. O(n).
    pub fn get(&self, n: usize) -> Option<Value> {
        self.iter().nth(n)
    }

    /// Replace the value at position `n` from the front. O(n).
    ///
    /// Returns `false`, leaving the list unchanged, if `n` is out of range.
    pub fn set(&mut self, n: usize, value: Value) -> bool {
        let mut cursor = self.head;
        for _ in 0..n {
            match cursor {
                Some(index) => cursor = self.nodes[index as usize].next,
                None => return false,
            }
        }
        match cursor {
            Some(index) => {
                self.nodes[index as usize].value = value;
                true
            }
            None => false,
        }
    }

    pub fn front(&self) -> Option<Value> {
        self.head.map(|i| self.nodes[i as usize].value)
    }

    pub fn back(&self) -> Option<Value> {
        self.tail.map(|i| self.nodes[i as usize].value)
    }

    /// Values front to back.
    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = &self.nodes[cursor? as usize];
            cursor = node.next;
            Some(node.value)
        })
    }

    pub fn heap_size(&self) -> usize {
        self.nodes.capacity() * size_of::<Node>() + self.free.capacity() * size_of::<u32>()
    }

    fn alloc(&mut self, node: Node) -> u32 {
        match self.free.pop() {
            Some(index) => {
                self.nodes[index as usize] = node;
                index
            }
            None => {
                self.nodes.push(node);
                (self.nodes.len() - 1) as u32
            }
        }
    }

    fn release(&mut self, index: u32) {
        self.nodes[index as usize].value = Value::Nil;
        self.free.push(index);
        self.len -= 1;
    }
}
