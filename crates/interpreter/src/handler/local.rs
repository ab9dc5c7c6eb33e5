// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use crate::{interpreter::Interpreter, process::HandleResult};

pub fn get_local(interpreter: &mut Interpreter) -> HandleResult {
    // (param offset:i32 bytesize:i32)
    let (offset, bytesize) = interpreter.get_param_i32_i32();
    let stack_bottom = interpreter.current_frame().stack_bottom;
    interpreter
        .stack
        .push_from_within(stack_bottom + offset as usize, bytesize as usize);
    HandleResult::Move(9)
}

pub fn set_local(interpreter: &mut Interpreter) -> HandleResult {
    // (param offset:i32 bytesize:i32) (operand value)
    let (offset, bytesize) = interpreter.get_param_i32_i32();
    let stack_bottom = interpreter.current_frame().stack_bottom;
    interpreter
        .stack
        .pop_to_within(stack_bottom + offset as usize, bytesize as usize);
    HandleResult::Move(9)
}

pub fn get_local_pointer(interpreter: &mut Interpreter) -> HandleResult {
    // (param offset:i32)
    let offset = interpreter.get_param_i32();
    let stack_bottom = interpreter.current_frame().stack_bottom;
    let address = interpreter.stack.get_ptr(stack_bottom + offset as usize) as u64;
    interpreter.stack.push(address);
    HandleResult::Move(5)
}

pub fn get_ivar_pointer(interpreter: &mut Interpreter) -> HandleResult {
    // (param offset:i32)
    //
    // `self` is the pointer local at offset 0
    let offset = interpreter.get_param_i32();
    let stack_bottom = interpreter.current_frame().stack_bottom;
    let self_pointer: u64 = interpreter.stack.read(stack_bottom);
    interpreter.stack.push(self_pointer + offset as u64);
    HandleResult::Move(5)
}
