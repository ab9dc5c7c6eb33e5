// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// the inbound callback
// --------------------
//
//        libxyz.so                        interpreter
// /----------------------\     /--------------------------------\
// | void qsort(...,      |     | suspended inside `lib_call`    |
// |     int (*cmp)()) {  |     |                                |
// |     ...              |     |  stack_top snapshot            |
// |     (cmp)(a, b)  ----|---->|  + args   <- native pointers   |
// | }                    |     |  + frame  (exit_loop)          |
// |                      |     |  run the dispatch loop         |
// |            result <--|-----|  move the return value out     |
// \----------------------/     \--------------------------------/
//
// the closure built at the out-call boundary lands here with the
// closure context as userdata. execution continues on the same
// interpreter, in a fresh logical top frame above the captured
// stack_top, and runs synchronously to completion. recursive
// native -> interpreted -> native chains work because each out-call
// re-snapshots stack_top and each callback restores it.

use std::ffi::c_void;

use icr_context::FfiClosureContext;
use libffi::raw::ffi_cif;

use crate::{
    interpreter::{Frame, Interpreter},
    process::process_continuous_instructions,
};

/// The dispatcher handed to the context's closure factory.
///
/// Safety: the userdata must be the `FfiClosureContext` built at the
/// matching `lib_call`, and the captured interpreter must still be
/// suspended inside that call.
pub unsafe extern "C" fn delegate_closure_callback(
    _cif: *mut ffi_cif,
    result: *mut c_void,
    args: *mut *mut c_void,
    userdata: *mut c_void,
) {
    let closure_context = &*(userdata as *const FfiClosureContext);
    let interpreter = &mut *(closure_context.interpreter as *mut Interpreter);
    let callee = interpreter.context.compiled_def(closure_context.callable_id);

    let base = interpreter.stack_top;
    let saved_ip = interpreter.ip;

    // continue the stack from the snapshot taken before the out-call
    interpreter.stack.set_top(base);

    // push the arguments from the native pointers, in declaration order
    for (index, &arg_bytesize) in closure_context.arg_bytesizes.iter().enumerate() {
        let arg_pointer = *args.add(index) as *const u8;
        interpreter.stack.move_from(arg_pointer, arg_bytesize);
    }

    // the standard call setup, with an entry frame so the nested loop
    // ends when the callee returns
    let args_bytesize = callee.args_bytesize;
    let max_bytesize = callee.max_bytesize();
    if max_bytesize < args_bytesize {
        panic!(
            "BUG: the locals region of {} ({} bytes) is smaller than its arguments ({} bytes), \
             the clear width would be negative",
            callee.name, max_bytesize, args_bytesize
        );
    }
    let stack_bottom = interpreter.stack.top() - args_bytesize;
    interpreter.stack.grow_by(max_bytesize - args_bytesize);

    let real_frame_index = interpreter.frames.len();
    interpreter.frames.push(Frame {
        compiled_def: callee.clone(),
        instructions: callee.instructions.clone(),
        ip: 0,
        stack: stack_bottom + max_bytesize,
        stack_bottom,
        block_caller_frame_index: -1,
        real_frame_index,
        exit_loop: true,
    });
    interpreter.ip = 0;

    let return_bytes = match process_continuous_instructions(interpreter, None) {
        Ok(return_bytes) => return_bytes,
        Err(error) => panic!("{}", error),
    };

    // hand the result to the native caller; the slot is at least one
    // promoted register wide, integral values must fill it
    if closure_context.return_bytesize > 0 {
        std::ptr::write_bytes(result as *mut u8, 0, 8);
        std::ptr::copy(
            return_bytes.as_ptr(),
            result as *mut u8,
            closure_context.return_bytesize,
        );
    }

    // leave the stack exactly where the suspended out-call expects it
    interpreter.stack.truncate_to(base);
    interpreter.stack_top = base;
    interpreter.ip = saved_ip;
}
