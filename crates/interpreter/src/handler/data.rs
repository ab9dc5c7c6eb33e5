// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// constants and class variables
// -----------------------------
//
// both pools share the slot protocol: the compiler emits
//
//     const_initialized slot     ;; -> bool
//     branch_if          DONE
//     ...initializer...
//     set_const          slot, bytesize
//     set_ip             DONE'   ;; when the initializer leaves a copy
// DONE:
//     get_const          slot, bytesize
//
// so the initializer of a slot runs exactly once per process, no matter
// how many interpreters race on it.

use crate::{interpreter::Interpreter, process::HandleResult};

pub fn const_initialized(interpreter: &mut Interpreter) -> HandleResult {
    // (param slot:i32)
    let slot = interpreter.get_param_i32() as usize;
    let was_initialized = interpreter.context.constants.test_and_set_initialized(slot);
    interpreter.stack.push(was_initialized as u8);
    HandleResult::Move(5)
}

pub fn get_const(interpreter: &mut Interpreter) -> HandleResult {
    // (param slot:i32 bytesize:i32)
    let (slot, bytesize) = interpreter.get_param_i32_i32();
    let value_ptr = interpreter.context.constants.value_ptr(slot as usize);
    interpreter.stack.move_from(value_ptr, bytesize as usize);
    HandleResult::Move(9)
}

pub fn set_const(interpreter: &mut Interpreter) -> HandleResult {
    // (param slot:i32 bytesize:i32) (operand value)
    let (slot, bytesize) = interpreter.get_param_i32_i32();
    let value_ptr = interpreter.context.constants.value_ptr(slot as usize);
    interpreter.stack.move_to(value_ptr, bytesize as usize);
    HandleResult::Move(9)
}

pub fn get_const_pointer(interpreter: &mut Interpreter) -> HandleResult {
    // (param slot:i32)
    let slot = interpreter.get_param_i32() as usize;
    let value_ptr = interpreter.context.constants.value_ptr(slot);
    interpreter.stack.push(value_ptr as u64);
    HandleResult::Move(5)
}

pub fn class_var_initialized(interpreter: &mut Interpreter) -> HandleResult {
    // (param slot:i32)
    let slot = interpreter.get_param_i32() as usize;
    let was_initialized = interpreter.context.class_vars.test_and_set_initialized(slot);
    interpreter.stack.push(was_initialized as u8);
    HandleResult::Move(5)
}

pub fn get_class_var(interpreter: &mut Interpreter) -> HandleResult {
    // (param slot:i32 bytesize:i32)
    let (slot, bytesize) = interpreter.get_param_i32_i32();
    let value_ptr = interpreter.context.class_vars.value_ptr(slot as usize);
    interpreter.stack.move_from(value_ptr, bytesize as usize);
    HandleResult::Move(9)
}

pub fn set_class_var(interpreter: &mut Interpreter) -> HandleResult {
    // (param slot:i32 bytesize:i32) (operand value)
    let (slot, bytesize) = interpreter.get_param_i32_i32();
    let value_ptr = interpreter.context.class_vars.value_ptr(slot as usize);
    interpreter.stack.move_to(value_ptr, bytesize as usize);
    HandleResult::Move(9)
}

pub fn get_class_var_pointer(interpreter: &mut Interpreter) -> HandleResult {
    // (param slot:i32)
    let slot = interpreter.get_param_i32() as usize;
    let value_ptr = interpreter.context.class_vars.value_ptr(slot);
    interpreter.stack.push(value_ptr as u64);
    HandleResult::Move(5)
}
