// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use crate::{interpreter::Interpreter, process::HandleResult};

pub fn nop(_interpreter: &mut Interpreter) -> HandleResult {
    HandleResult::Move(1)
}

pub fn imm_i32(interpreter: &mut Interpreter) -> HandleResult {
    // (param value:i32)
    let value = interpreter.get_param_i32();
    interpreter.stack.push(value as i32);
    HandleResult::Move(5)
}

pub fn imm_i64(interpreter: &mut Interpreter) -> HandleResult {
    // (param value:i64)
    let value = interpreter.get_param_i64();
    interpreter.stack.push(value as i64);
    HandleResult::Move(9)
}

pub fn imm_f64(interpreter: &mut Interpreter) -> HandleResult {
    // (param value:f64)
    let value = interpreter.get_param_f64();
    interpreter.stack.push(value);
    HandleResult::Move(9)
}

pub fn imm_bool(interpreter: &mut Interpreter) -> HandleResult {
    // (param value:i8)
    let value = interpreter.get_param_i8();
    interpreter.stack.push(value);
    HandleResult::Move(2)
}

pub fn imm_nil(_interpreter: &mut Interpreter) -> HandleResult {
    // nil occupies zero bytes, nothing reaches the stack
    HandleResult::Move(1)
}

pub fn imm_ptr(interpreter: &mut Interpreter) -> HandleResult {
    // (param value:i64)
    let value = interpreter.get_param_i64();
    interpreter.stack.push(value);
    HandleResult::Move(9)
}

pub fn pop(interpreter: &mut Interpreter) -> HandleResult {
    // (param bytesize:i32)
    let bytesize = interpreter.get_param_i32() as usize;
    interpreter.stack.shrink_by(bytesize);
    HandleResult::Move(5)
}
