// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// atomic read-modify-write
// ------------------------
//
// every operation is dispatched on the popped element bytesize, is
// sequentially consistent, and pushes the pre-operation value. min and
// max compare signed. an element bytesize outside {1, 2, 4, 8} is a
// fatal internal error.

use std::sync::atomic::{
    AtomicI16, AtomicI32, AtomicI64, AtomicI8, AtomicU16, AtomicU32, AtomicU64, AtomicU8,
    Ordering,
};

use crate::{interpreter::Interpreter, process::HandleResult};

#[derive(Clone, Copy)]
enum RmwOp {
    Add,
    Sub,
    And,
    Or,
    Xor,
    Min,
    Max,
    Xchg,
}

pub fn atomic_add(interpreter: &mut Interpreter) -> HandleResult {
    do_atomic_rmw(interpreter, RmwOp::Add)
}

pub fn atomic_sub(interpreter: &mut Interpreter) -> HandleResult {
    do_atomic_rmw(interpreter, RmwOp::Sub)
}

pub fn atomic_and(interpreter: &mut Interpreter) -> HandleResult {
    do_atomic_rmw(interpreter, RmwOp::And)
}

pub fn atomic_or(interpreter: &mut Interpreter) -> HandleResult {
    do_atomic_rmw(interpreter, RmwOp::Or)
}

pub fn atomic_xor(interpreter: &mut Interpreter) -> HandleResult {
    do_atomic_rmw(interpreter, RmwOp::Xor)
}

pub fn atomic_min(interpreter: &mut Interpreter) -> HandleResult {
    do_atomic_rmw(interpreter, RmwOp::Min)
}

pub fn atomic_max(interpreter: &mut Interpreter) -> HandleResult {
    do_atomic_rmw(interpreter, RmwOp::Max)
}

pub fn atomic_xchg(interpreter: &mut Interpreter) -> HandleResult {
    do_atomic_rmw(interpreter, RmwOp::Xchg)
}

fn do_atomic_rmw(interpreter: &mut Interpreter, op: RmwOp) -> HandleResult {
    // (operand ptr:ptr value:i64 element_bytesize:i32)
    let element_bytesize = interpreter.stack.pop::<u32>();
    let value = interpreter.stack.pop::<u64>();
    let address = interpreter.stack.pop::<u64>();

    let previous = match element_bytesize {
        1 => unsafe { rmw_8(address as *mut u8, value as u8, op) as u64 },
        2 => unsafe { rmw_16(address as *mut u16, value as u16, op) as u64 },
        4 => unsafe { rmw_32(address as *mut u32, value as u32, op) as u64 },
        8 => unsafe { rmw_64(address as *mut u64, value, op) },
        _ => panic!(
            "BUG: invalid atomic element bytesize {}, must be 1, 2, 4 or 8",
            element_bytesize
        ),
    };

    interpreter.stack.push(previous);
    HandleResult::Move(1)
}

pub fn atomic_cmpxchg(interpreter: &mut Interpreter) -> HandleResult {
    // (operand ptr:ptr expected:i64 new:i64 element_bytesize:i32)
    let element_bytesize = interpreter.stack.pop::<u32>();
    let new = interpreter.stack.pop::<u64>();
    let expected = interpreter.stack.pop::<u64>();
    let address = interpreter.stack.pop::<u64>();

    let previous = match element_bytesize {
        1 => {
            let atomic = unsafe { AtomicU8::from_ptr(address as *mut u8) };
            match atomic.compare_exchange(
                expected as u8,
                new as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(value) | Err(value) => value as u64,
            }
        }
        2 => {
            let atomic = unsafe { AtomicU16::from_ptr(address as *mut u16) };
            match atomic.compare_exchange(
                expected as u16,
                new as u16,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(value) | Err(value) => value as u64,
            }
        }
        4 => {
            let atomic = unsafe { AtomicU32::from_ptr(address as *mut u32) };
            match atomic.compare_exchange(
                expected as u32,
                new as u32,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(value) | Err(value) => value as u64,
            }
        }
        8 => {
            let atomic = unsafe { AtomicU64::from_ptr(address as *mut u64) };
            match atomic.compare_exchange(expected, new, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(value) | Err(value) => value,
            }
        }
        _ => panic!(
            "BUG: invalid atomic element bytesize {}, must be 1, 2, 4 or 8",
            element_bytesize
        ),
    };

    interpreter.stack.push(previous);
    HandleResult::Move(1)
}

unsafe fn rmw_8(address: *mut u8, value: u8, op: RmwOp) -> u8 {
    let atomic = AtomicU8::from_ptr(address);
    match op {
        RmwOp::Add => atomic.fetch_add(value, Ordering::SeqCst),
        RmwOp::Sub => atomic.fetch_sub(value, Ordering::SeqCst),
        RmwOp::And => atomic.fetch_and(value, Ordering::SeqCst),
        RmwOp::Or => atomic.fetch_or(value, Ordering::SeqCst),
        RmwOp::Xor => atomic.fetch_xor(value, Ordering::SeqCst),
        RmwOp::Min => {
            AtomicI8::from_ptr(address as *mut i8).fetch_min(value as i8, Ordering::SeqCst) as u8
        }
        RmwOp::Max => {
            AtomicI8::from_ptr(address as *mut i8).fetch_max(value as i8, Ordering::SeqCst) as u8
        }
        RmwOp::Xchg => atomic.swap(value, Ordering::SeqCst),
    }
}

unsafe fn rmw_16(address: *mut u16, value: u16, op: RmwOp) -> u16 {
    let atomic = AtomicU16::from_ptr(address);
    match op {
        RmwOp::Add => atomic.fetch_add(value, Ordering::SeqCst),
        RmwOp::Sub => atomic.fetch_sub(value, Ordering::SeqCst),
        RmwOp::And => atomic.fetch_and(value, Ordering::SeqCst),
        RmwOp::Or => atomic.fetch_or(value, Ordering::SeqCst),
        RmwOp::Xor => atomic.fetch_xor(value, Ordering::SeqCst),
        RmwOp::Min => {
            AtomicI16::from_ptr(address as *mut i16).fetch_min(value as i16, Ordering::SeqCst)
                as u16
        }
        RmwOp::Max => {
            AtomicI16::from_ptr(address as *mut i16).fetch_max(value as i16, Ordering::SeqCst)
                as u16
        }
        RmwOp::Xchg => atomic.swap(value, Ordering::SeqCst),
    }
}

unsafe fn rmw_32(address: *mut u32, value: u32, op: RmwOp) -> u32 {
    let atomic = AtomicU32::from_ptr(address);
    match op {
        RmwOp::Add => atomic.fetch_add(value, Ordering::SeqCst),
        RmwOp::Sub => atomic.fetch_sub(value, Ordering::SeqCst),
        RmwOp::And => atomic.fetch_and(value, Ordering::SeqCst),
        RmwOp::Or => atomic.fetch_or(value, Ordering::SeqCst),
        RmwOp::Xor => atomic.fetch_xor(value, Ordering::SeqCst),
        RmwOp::Min => {
            AtomicI32::from_ptr(address as *mut i32).fetch_min(value as i32, Ordering::SeqCst)
                as u32
        }
        RmwOp::Max => {
            AtomicI32::from_ptr(address as *mut i32).fetch_max(value as i32, Ordering::SeqCst)
                as u32
        }
        RmwOp::Xchg => atomic.swap(value, Ordering::SeqCst),
    }
}

unsafe fn rmw_64(address: *mut u64, value: u64, op: RmwOp) -> u64 {
    let atomic = AtomicU64::from_ptr(address);
    match op {
        RmwOp::Add => atomic.fetch_add(value, Ordering::SeqCst),
        RmwOp::Sub => atomic.fetch_sub(value, Ordering::SeqCst),
        RmwOp::And => atomic.fetch_and(value, Ordering::SeqCst),
        RmwOp::Or => atomic.fetch_or(value, Ordering::SeqCst),
        RmwOp::Xor => atomic.fetch_xor(value, Ordering::SeqCst),
        RmwOp::Min => {
            AtomicI64::from_ptr(address as *mut i64).fetch_min(value as i64, Ordering::SeqCst)
                as u64
        }
        RmwOp::Max => {
            AtomicI64::from_ptr(address as *mut i64).fetch_max(value as i64, Ordering::SeqCst)
                as u64
        }
        RmwOp::Xchg => atomic.swap(value, Ordering::SeqCst),
    }
}
