// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// the calling convention
// ----------------------
//
// 1. the caller pushes the arguments, left to right:
//
// |         |
// |  arg 1  |
// |  arg 0  |
// |   ###   | <-- other operands of the caller
// |---------|
// |   ...   |
// \---------/
//
// 2. `call`: the argument region becomes the head of the callee's
//    locals, the rest of the locals region is zero-filled:
//
// |          | <-- top = stack_bottom + max_bytesize
// | 0 0 0 0  | <-- the callee's other locals
// |  arg 1   |
// |  arg 0   |
// |----------| <-- callee stack_bottom (= caller top before the args)
// |   ###    |
// |----------|
// |   ...    |
// \----------/
//
// 3. a leave flavor pops the frame and carries the result slot down to
//    the caller's saved top through the swap area.
//
// a frame executing yielded block code is a copy of the frame of the
// def that supplied the block: same stack_bottom, same real frame
// index, the block's instructions. writes to locals inside the block
// are therefore visible in the enclosing def.
//
// the three leave flavors differ only in how many frames they unwind:
//
// | instruction  | unwinds to                           | used for      |
// |--------------|--------------------------------------|---------------|
// | leave        | one frame                            | def/block end |
// | leave_def    | frame count == real_frame_index      | `return`      |
// | break_block  | frame count == real_frame_index + 1  | `break`       |

use crate::{
    extcall_handler,
    interpreter::{Frame, Interpreter},
    process::HandleResult,
};

const INSTRUCTION_CALL_LENGTH: usize = 5;

pub fn call(interpreter: &mut Interpreter) -> HandleResult {
    // (param def_id:i32)
    let def_id = interpreter.get_param_i32();
    do_call(interpreter, def_id, false)
}

pub fn call_with_block(interpreter: &mut Interpreter) -> HandleResult {
    // (param def_id:i32)
    let def_id = interpreter.get_param_i32();
    do_call(interpreter, def_id, true)
}

fn do_call(interpreter: &mut Interpreter, def_id: u32, with_block: bool) -> HandleResult {
    let callee = interpreter.context.compiled_def(def_id);
    let args_bytesize = callee.args_bytesize;
    let max_bytesize = callee.max_bytesize();
    if max_bytesize < args_bytesize {
        panic!(
            "BUG: the locals region of {} ({} bytes) is smaller than its arguments ({} bytes), \
             the clear width would be negative",
            callee.name, max_bytesize, args_bytesize
        );
    }

    let stack_before_args = interpreter.stack.top() - args_bytesize;

    // suspend the caller
    let caller_index = interpreter.frames.len() - 1;
    {
        let caller = &mut interpreter.frames[caller_index];
        caller.ip = interpreter.ip + INSTRUCTION_CALL_LENGTH;
        caller.stack = stack_before_args;
    }

    // the arguments become the head of the callee's locals, the rest of
    // the locals region starts zeroed
    interpreter.stack.grow_by(max_bytesize - args_bytesize);

    let real_frame_index = interpreter.frames.len();
    interpreter.frames.push(Frame {
        compiled_def: callee.clone(),
        instructions: callee.instructions.clone(),
        ip: 0,
        stack: stack_before_args + max_bytesize,
        stack_bottom: stack_before_args,
        block_caller_frame_index: if with_block { caller_index as isize } else { -1 },
        real_frame_index,
        exit_loop: false,
    });

    HandleResult::Jump(0)
}

pub fn call_block(interpreter: &mut Interpreter) -> HandleResult {
    // (param block_id:i32)
    //
    // invoked by a callee that received a block, at a yield. the yielded
    // expressions are on the top of the stack.
    let block_id = interpreter.get_param_i32();
    let block = interpreter.context.compiled_block(block_id);

    let current_index = interpreter.frames.len() - 1;
    let block_caller_frame_index = interpreter.frames[current_index].block_caller_frame_index;
    if block_caller_frame_index < 0 {
        panic!("BUG: call_block inside a def that was not called with a block");
    }
    let caller_bottom = interpreter.frames[block_caller_frame_index as usize].stack_bottom;

    // move the yielded arguments into the block's argument slots, which
    // live at the start of the block's locals sub-range
    let args_bytesize = block.args_bytesize;
    let args_offset = interpreter.stack.top() - args_bytesize;
    interpreter.stack.copy_within(
        args_offset,
        caller_bottom + block.locals_bytesize_start,
        args_bytesize,
    );
    interpreter.stack.truncate_to(args_offset);

    // suspend the yielding frame
    {
        let yielding = &mut interpreter.frames[current_index];
        yielding.ip = interpreter.ip + INSTRUCTION_CALL_LENGTH;
        yielding.stack = args_offset;
    }

    // the block runs in a copy of the frame of the def that supplied
    // it: same stack_bottom and real frame index, the block's code
    let mut block_frame = interpreter.frames[block_caller_frame_index as usize].clone();
    block_frame.instructions = block.instructions.clone();
    block_frame.ip = 0;
    block_frame.stack = args_offset;
    block_frame.exit_loop = false;
    interpreter.frames.push(block_frame);

    // clear the block's own locals, its arguments excluded
    let clear_start = caller_bottom + block.locals_bytesize_start + args_bytesize;
    let clear_end = caller_bottom + block.locals_bytesize_end;
    if clear_end < clear_start {
        panic!(
            "BUG: the block locals sub-range ({} bytes) is smaller than its arguments \
             ({} bytes), the clear width would be negative",
            block.locals_bytesize_end - block.locals_bytesize_start,
            args_bytesize
        );
    }
    interpreter.stack.fill_zero(clear_start, clear_end - clear_start);

    HandleResult::Jump(0)
}

pub fn lib_call(interpreter: &mut Interpreter) -> HandleResult {
    // (param lib_function_id:i32)
    let lib_function_id = interpreter.get_param_i32();
    extcall_handler::do_lib_call(interpreter, lib_function_id)
}

pub fn leave(interpreter: &mut Interpreter) -> HandleResult {
    // (param bytesize:i32)
    let bytesize = interpreter.get_param_i32() as usize;
    let target_frame_count = interpreter.frames.len() - 1;
    do_leave(interpreter, target_frame_count, bytesize)
}

pub fn leave_def(interpreter: &mut Interpreter) -> HandleResult {
    // (param bytesize:i32)
    //
    // a non-local return: unwinds through any yield-copied frames down
    // to the original frame of the def, that frame included.
    let bytesize = interpreter.get_param_i32() as usize;
    let target_frame_count = interpreter.current_frame().real_frame_index;
    do_leave(interpreter, target_frame_count, bytesize)
}

pub fn break_block(interpreter: &mut Interpreter) -> HandleResult {
    // (param bytesize:i32)
    //
    // `break` inside a yielded block: one frame shallower than a
    // non-local return, the def that received the block returns.
    let bytesize = interpreter.get_param_i32() as usize;
    let target_frame_count = interpreter.current_frame().real_frame_index + 1;
    do_leave(interpreter, target_frame_count, bytesize)
}

fn do_leave(
    interpreter: &mut Interpreter,
    target_frame_count: usize,
    bytesize: usize,
) -> HandleResult {
    let mut entry_frame: Option<Frame> = None;
    while interpreter.frames.len() > target_frame_count {
        let frame = interpreter.frames.pop().unwrap();
        if frame.exit_loop {
            entry_frame = Some(frame);
            break;
        }
    }

    if let Some(entry_frame) = entry_frame {
        // the frame that entered the current dispatch loop is gone, the
        // return value leaves in a fresh buffer; the locals region
        // stays in place for the next run
        let mut return_bytes = vec![0u8; bytesize];
        interpreter.stack.copy_to(return_bytes.as_mut_ptr(), bytesize);
        interpreter
            .stack
            .truncate_to(entry_frame.stack_bottom + entry_frame.compiled_def.max_bytesize());
        return HandleResult::End(return_bytes);
    }

    if interpreter.frames.is_empty() {
        panic!("BUG: the frame stack unwound past its entry frame");
    }

    // restore the suspended caller and carry the result slot down to
    // its saved top
    interpreter.stack.move_bytes_to_swap(bytesize);
    let (caller_ip, caller_stack) = {
        let caller = interpreter.frames.last().unwrap();
        (caller.ip, caller.stack)
    };
    interpreter.stack.truncate_to(caller_stack);
    interpreter.stack.restore_bytes_from_swap();

    HandleResult::Jump(caller_ip)
}
