// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// constants and class-variable memory
// -----------------------------------
//
// a pool is a byte region shared by every interpreter running against
// the same context. each slot starts with a one-byte "initialized" flag,
// the value bytes follow at a fixed distance:
//
// | flag | padding (7 bytes) | value bytes ... | <-- one slot
// ^                          ^
// slot start                 slot start + OFFSET_FROM_INITIALIZED
//
// the flag transitions exactly once from 0 to 1, through a sequentially
// consistent atomic swap, after which the value bytes are stable. the
// region is resized only between top-level invocations, while no
// interpreter holds pointers into it.

use std::{cell::UnsafeCell, sync::atomic::AtomicU8, sync::atomic::Ordering};

/// The distance from a slot's init flag to its value bytes.
pub const OFFSET_FROM_INITIALIZED: usize = 8;

pub struct ValuePool {
    data: UnsafeCell<Vec<u8>>,
}

// Concurrent access is limited to the per-slot init-flag protocol, see
// the module comment.
unsafe impl Sync for ValuePool {}
unsafe impl Send for ValuePool {}

impl ValuePool {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            data: UnsafeCell::new(Vec::new()),
        }
    }

    pub fn total_bytesize(&self) -> usize {
        unsafe { (*self.data.get()).len() }
    }

    /// Grow the pool to the declared total. Shrinking never happens, a
    /// re-entered session keeps the already-initialized slots.
    pub fn resize(&self, total_bytesize: usize) {
        let data = unsafe { &mut *self.data.get() };
        if total_bytesize > data.len() {
            data.resize(total_bytesize, 0);
        }
    }

    fn check_range(&self, offset: usize, bytesize: usize) {
        let len = self.total_bytesize();
        if offset + bytesize > len {
            panic!(
                "BUG: pool access out of range, offset 0x{:x}, {} bytes, pool bytesize 0x{:x}",
                offset, bytesize, len
            );
        }
    }

    fn flag(&self, slot_offset: usize) -> &AtomicU8 {
        self.check_range(slot_offset, 1);
        unsafe {
            let ptr = (*self.data.get()).as_mut_ptr().add(slot_offset);
            AtomicU8::from_ptr(ptr)
        }
    }

    /// Atomically set the slot's init flag, returning whether it was
    /// already set.
    pub fn test_and_set_initialized(&self, slot_offset: usize) -> bool {
        self.flag(slot_offset).swap(1, Ordering::SeqCst) != 0
    }

    pub fn initialized(&self, slot_offset: usize) -> bool {
        self.flag(slot_offset).load(Ordering::SeqCst) != 0
    }

    /// The address of the slot's value bytes.
    pub fn value_ptr(&self, slot_offset: usize) -> *mut u8 {
        self.check_range(slot_offset, OFFSET_FROM_INITIALIZED);
        unsafe {
            (*self.data.get())
                .as_mut_ptr()
                .add(slot_offset + OFFSET_FROM_INITIALIZED)
        }
    }
}
