// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use crate::{interpreter::Interpreter, process::HandleResult};

pub fn eq_i32(interpreter: &mut Interpreter) -> HandleResult {
    let right = interpreter.stack.pop::<i32>();
    let left = interpreter.stack.pop::<i32>();
    interpreter.stack.push((left == right) as u8);
    HandleResult::Move(1)
}

pub fn ne_i32(interpreter: &mut Interpreter) -> HandleResult {
    let right = interpreter.stack.pop::<i32>();
    let left = interpreter.stack.pop::<i32>();
    interpreter.stack.push((left != right) as u8);
    HandleResult::Move(1)
}

pub fn lt_i32(interpreter: &mut Interpreter) -> HandleResult {
    let right = interpreter.stack.pop::<i32>();
    let left = interpreter.stack.pop::<i32>();
    interpreter.stack.push((left < right) as u8);
    HandleResult::Move(1)
}

pub fn le_i32(interpreter: &mut Interpreter) -> HandleResult {
    let right = interpreter.stack.pop::<i32>();
    let left = interpreter.stack.pop::<i32>();
    interpreter.stack.push((left <= right) as u8);
    HandleResult::Move(1)
}

pub fn gt_i32(interpreter: &mut Interpreter) -> HandleResult {
    let right = interpreter.stack.pop::<i32>();
    let left = interpreter.stack.pop::<i32>();
    interpreter.stack.push((left > right) as u8);
    HandleResult::Move(1)
}

pub fn ge_i32(interpreter: &mut Interpreter) -> HandleResult {
    let right = interpreter.stack.pop::<i32>();
    let left = interpreter.stack.pop::<i32>();
    interpreter.stack.push((left >= right) as u8);
    HandleResult::Move(1)
}

pub fn eq_i64(interpreter: &mut Interpreter) -> HandleResult {
    let right = interpreter.stack.pop::<i64>();
    let left = interpreter.stack.pop::<i64>();
    interpreter.stack.push((left == right) as u8);
    HandleResult::Move(1)
}

pub fn lt_i64(interpreter: &mut Interpreter) -> HandleResult {
    let right = interpreter.stack.pop::<i64>();
    let left = interpreter.stack.pop::<i64>();
    interpreter.stack.push((left < right) as u8);
    HandleResult::Move(1)
}

pub fn eq_f64(interpreter: &mut Interpreter) -> HandleResult {
    let right = interpreter.stack.pop::<f64>();
    let left = interpreter.stack.pop::<f64>();
    interpreter.stack.push((left == right) as u8);
    HandleResult::Move(1)
}

pub fn lt_f64(interpreter: &mut Interpreter) -> HandleResult {
    let right = interpreter.stack.pop::<f64>();
    let left = interpreter.stack.pop::<f64>();
    interpreter.stack.push((left < right) as u8);
    HandleResult::Move(1)
}
