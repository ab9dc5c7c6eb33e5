// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use crate::{interpreter::Interpreter, process::HandleResult};

pub fn i32_to_i64(interpreter: &mut Interpreter) -> HandleResult {
    let value = interpreter.stack.pop::<i32>();
    interpreter.stack.push(value as i64);
    HandleResult::Move(1)
}

pub fn i32_to_f64(interpreter: &mut Interpreter) -> HandleResult {
    let value = interpreter.stack.pop::<i32>();
    interpreter.stack.push(value as f64);
    HandleResult::Move(1)
}
