// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use crate::{handler::Handler, interpreter::Interpreter, pry, Frontend, InterpreterError};

pub type HandleFunc = fn(&mut Interpreter) -> HandleResult;

pub enum HandleResult {
    // advance the instruction pointer past the current instruction
    // param (instruction_length_in_bytes: usize)
    Move(usize),

    // transfer to another address, either within the current
    // instructions (branches) or at the start of a callee's (calls)
    // param (target: usize)
    Jump(usize),

    // the frame that entered the current dispatch loop has been popped,
    // the loop ends and hands the extracted return bytes to whoever
    // started it: the driver, or a suspended native callback
    // param (return_bytes: Vec<u8>)
    End(Vec<u8>),

    // a recoverable failure, the loop ends with an error
    Error(InterpreterError),
}

/// Drive the dispatch loop until the frame that entered it returns.
///
/// Nested loops exist: an inbound native callback re-enters this
/// function on the same interpreter, on top of a loop that is suspended
/// inside a `lib_call`. The `exit_loop` marker on entry frames keeps
/// each loop bounded to its own frames.
///
/// The `frontend` is only needed while the debugger may stop; nested
/// callback loops run without one.
pub fn process_continuous_instructions(
    interpreter: &mut Interpreter,
    mut frontend: Option<&mut dyn Frontend>,
) -> Result<Vec<u8>, InterpreterError> {
    let handler = Handler::get();

    loop {
        if interpreter.trace {
            interpreter.print_trace();
        }

        if interpreter.pry {
            let within_target_frame = match interpreter.pry_max_target_frame {
                None => true,
                Some(max_target_frame) => {
                    (interpreter.current_frame().real_frame_index as isize) <= max_target_frame
                }
            };
            if within_target_frame {
                if let Some(frontend) = frontend.as_mut() {
                    pry::stop(interpreter, &mut **frontend);
                }
            }
        }

        let opcode_num = interpreter.opcode_num();
        if interpreter.stats {
            interpreter.opcode_counters[opcode_num as usize] += 1;
        }

        let handle_func = handler.handlers[opcode_num as usize];
        match handle_func(interpreter) {
            HandleResult::Move(instruction_length) => {
                interpreter.ip += instruction_length;
            }
            HandleResult::Jump(target) => {
                interpreter.ip = target;
            }
            HandleResult::End(return_bytes) => {
                break Ok(return_bytes);
            }
            HandleResult::Error(error) => {
                break Err(error);
            }
        }
    }
}
