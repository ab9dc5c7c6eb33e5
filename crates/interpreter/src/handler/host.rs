// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use crate::{interpreter::Interpreter, process::HandleResult};

pub fn argc(interpreter: &mut Interpreter) -> HandleResult {
    // the program name counts as the first argument
    let count = interpreter.argv.len() as i32 + 1;
    interpreter.stack.push(count);
    HandleResult::Move(1)
}

pub fn argv(interpreter: &mut Interpreter) -> HandleResult {
    let pointer = interpreter.argv_pointer() as u64;
    interpreter.stack.push(pointer);
    HandleResult::Move(1)
}

pub fn pry(interpreter: &mut Interpreter) -> HandleResult {
    interpreter.pry = true;
    HandleResult::Move(1)
}
