// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// the native out-call
// -------------------
//
//      interpreter
// /------------------------------------\
// |  bytecode:  ... lib_call n ...     |
// |                     |              |
// |  argument slots on the stack       |
// |                     |              |
// \---------------------|--------------/
//                       v  ffi_call through the prepared cif
// /----------------------------------------------\
// | int qsort(void*, size_t, size_t, int (*)())  |
// \----------------------------------------------/
//
// the arguments are already on the stack in declaration order, each in
// its aligned slot. the call interface receives a vector of pointers to
// the slots, so nothing is copied on the way out. the return value is
// written at the stack top and then compacted down over the argument
// region.
//
// an argument that is an interpreter procedure occupies a
// `{callable_id, closure_data}` slot; exactly here it is replaced by a
// freshly built native closure (see the bridge module for the inbound
// half). the closure_data half must be null: a procedure that captured
// a closure can not cross the native boundary.

use std::ffi::c_void;

use icr_context::FfiClosureContext;
use icr_isa::align_up;
use libffi::raw::ffi_call;

use crate::{
    bridge_handler::delegate_closure_callback,
    interpreter::Interpreter,
    process::HandleResult,
    InterpreterError, InterpreterErrorType,
};

const INSTRUCTION_LIB_CALL_LENGTH: usize = 5;

/// The capacity of the argument-pointer scratch vector.
pub const MAX_LIB_CALL_ARGS: usize = 100;

pub fn do_lib_call(interpreter: &mut Interpreter, lib_function_id: u32) -> HandleResult {
    let lib_function = interpreter.context.lib_function(lib_function_id);

    let arg_count = lib_function.arg_stack_bytesizes.len();
    if arg_count > MAX_LIB_CALL_ARGS {
        panic!(
            "BUG: lib call {} declares {} arguments, the limit is {}",
            lib_function.name, arg_count, MAX_LIB_CALL_ARGS
        );
    }

    // walk the arguments last to first, recording a pointer to each
    // slot; `offset` accumulates the aligned slot sizes
    let top = interpreter.stack.top();
    let mut offset = 0usize;
    let mut arg_pointers: Vec<*mut c_void> = vec![std::ptr::null_mut(); arg_count];
    for index in (0..arg_count).rev() {
        offset += align_up(lib_function.arg_stack_bytesizes[index]);
        arg_pointers[index] = interpreter.stack.get_mut_ptr(top - offset) as *mut c_void;
    }

    // wrap procedure arguments as native callbacks, in place
    for (index, proc_interface) in lib_function.proc_call_interfaces.iter().enumerate() {
        let Some(proc_interface) = proc_interface else {
            continue;
        };
        let slot = arg_pointers[index] as *mut u8;
        let callable_id = unsafe { std::ptr::read_unaligned(slot as *const u64) };
        let closure_data = unsafe { std::ptr::read_unaligned(slot.add(8) as *const u64) };
        if closure_data != 0 {
            return HandleResult::Error(InterpreterError::new(InterpreterErrorType::Runtime(
                format!(
                    "the procedure passed to {} captures a closure and can not be sent \
                     to native code",
                    lib_function.name
                ),
            )));
        }

        let closure_context = FfiClosureContext {
            interpreter: interpreter as *mut Interpreter as *mut c_void,
            callable_id: callable_id as u32,
            arg_bytesizes: proc_interface.arg_bytesizes(),
            return_bytesize: proc_interface.return_bytesize(),
        };
        let code_pointer = interpreter.context.ffi_closure(
            proc_interface.cif_ptr(),
            closure_context,
            delegate_closure_callback,
        );
        unsafe {
            std::ptr::write_unaligned(slot as *mut u64, code_pointer as u64);
        }
    }

    // an inbound callback continues the stack from here
    interpreter.stack_top = top;

    // the return value lands at the stack top
    let rvalue = interpreter.stack.get_mut_ptr(top) as *mut c_void;
    unsafe {
        let function: unsafe extern "C" fn() =
            std::mem::transmute(lib_function.function_pointer);
        ffi_call(
            lib_function.call_interface.cif_ptr(),
            Some(function),
            rvalue,
            arg_pointers.as_mut_ptr(),
        );
    }

    // compact: the raw return bytes move down over the argument region,
    // then the top is re-aligned with zero padding
    let return_bytesize = lib_function.return_bytesize();
    let aligned_return_bytesize = align_up(return_bytesize);
    let args_start = top - offset;
    if return_bytesize > 0 {
        interpreter
            .stack
            .copy_within(top, args_start, return_bytesize);
    }

    // zero everything between the compacted value and the end of the
    // region the native call may have written (the return slot is at
    // least promoted-register wide)
    let dirty_end = if return_bytesize > 0 {
        top + align_up(return_bytesize.max(8))
    } else {
        top
    };
    let value_end = args_start + return_bytesize;
    interpreter.stack.fill_zero(value_end, dirty_end - value_end);
    interpreter.stack.set_top(args_start + aligned_return_bytesize);

    HandleResult::Move(INSTRUCTION_LIB_CALL_LENGTH)
}
