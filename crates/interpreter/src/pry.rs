// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// the interactive debugger
// ------------------------
//
// once the `pry` instruction has armed the debugger, the dispatch loop
// offers every instruction that maps to a new source line as a stop.
// at a stop, a child interpreter is built that shares the context and
// aliases the stack at the stopped frame's bottom, so input expressions
// see and mutate the live locals. the operand region beyond the locals
// is saved around the session, a nested evaluation scribbles over it.
//
// recognized commands:
//
// | command     | effect                                             |
// |-------------|----------------------------------------------------|
// | continue    | disarm and resume                                  |
// | step        | stop at every following line                       |
// | next        | stop in the current frame or shallower             |
// | finish      | stop in the caller's frame or shallower            |
// | whereami    | print the stop location                            |
// | disassemble | print the bytecode of the stopped def              |
// | anything    | compiled and evaluated against the live locals     |

use std::io::{BufRead, Write};

use icr_isa::bytecode_reader::format_bytecode_as_text;
use icr_stack::ValueStack;

use crate::{frontend::Frontend, interpreter::Interpreter};

/// Offer a debugger stop at the current instruction. Returns without
/// stopping unless the instruction maps to a source line different from
/// the previous stop's.
pub(crate) fn stop(interpreter: &mut Interpreter, frontend: &mut dyn Frontend) {
    let node = match interpreter
        .current_frame()
        .instructions
        .nodes
        .get(&interpreter.ip)
    {
        Some(node) => node.clone(),
        None => return,
    };
    let location = match &node.location {
        Some(location) => location.clone(),
        None => return,
    };
    if let Some(previous_node) = &interpreter.pry_node {
        if let Some(previous_location) = &previous_node.location {
            if previous_location.line == location.line
                && previous_location.filename == location.filename
            {
                return;
            }
        }
    }

    let (stack_bottom, max_bytesize, real_frame_index, compiled_def) = {
        let frame = interpreter.current_frame();
        (
            frame.stack_bottom,
            frame.compiled_def.max_bytesize(),
            frame.real_frame_index,
            frame.compiled_def.clone(),
        )
    };

    let mut input = interpreter.pry_input.take();
    let mut output = interpreter.pry_output.take();

    write_line(&mut output, &format!("from {}:", location));
    write_line(&mut output, &format!("    {}", node.expression));

    // a nested evaluation may overwrite the operands beyond the locals
    let saved_start = stack_bottom + max_bytesize;
    let saved_bytesize = interpreter.stack.top() - saved_start;
    let mut saved = vec![0u8; saved_bytesize];
    unsafe {
        std::ptr::copy(
            interpreter.stack.get_ptr(saved_start),
            saved.as_mut_ptr(),
            saved_bytesize,
        );
    }

    // the child shares the context and the live locals
    let (gathered_meta_vars, block_level) = frontend.gather_local_vars(&compiled_def, &location);
    let child_local_vars = interpreter
        .context
        .local_vars_from_meta_vars(&gathered_meta_vars);
    let child_stack = unsafe {
        ValueStack::aliasing(
            interpreter.stack.get_mut_ptr(stack_bottom),
            interpreter.stack.capacity() - stack_bottom,
        )
    };
    let mut child = Interpreter::child(
        interpreter.context.clone(),
        child_stack,
        child_local_vars,
        block_level,
    );

    loop {
        write_prompt(&mut output, "pry> ");
        let Some(line) = read_line(&mut input) else {
            // end of input resumes, like `continue`
            interpreter.pry = false;
            interpreter.pry_node = None;
            interpreter.pry_max_target_frame = None;
            break;
        };
        let line = line.trim().to_owned();
        match line.as_str() {
            "" => {}
            "continue" => {
                interpreter.pry = false;
                interpreter.pry_node = None;
                interpreter.pry_max_target_frame = None;
                break;
            }
            "step" => {
                interpreter.pry_node = Some(node.clone());
                interpreter.pry_max_target_frame = None;
                break;
            }
            "next" => {
                interpreter.pry_node = Some(node.clone());
                interpreter.pry_max_target_frame = Some(real_frame_index as isize);
                break;
            }
            "finish" => {
                interpreter.pry_node = Some(node.clone());
                interpreter.pry_max_target_frame = Some(real_frame_index as isize - 1);
                break;
            }
            "whereami" => {
                write_line(&mut output, &format!("from {}:", location));
                write_line(&mut output, &format!("    {}", node.expression));
            }
            "disassemble" => {
                write_line(
                    &mut output,
                    &format_bytecode_as_text(&compiled_def.instructions.code),
                );
            }
            source => {
                let mut local_vars = std::mem::take(&mut child.current_local_vars);
                let compiled = frontend.compile_expression(
                    &child.context.clone(),
                    &mut local_vars,
                    source,
                    child.block_level,
                );
                child.current_local_vars = local_vars;
                match compiled {
                    Err(error) => {
                        write_line(&mut output, &format!("error: {}", error));
                    }
                    Ok((instructions, result_type)) => {
                        match child.run_expression(instructions, result_type) {
                            Ok(value) => {
                                write_line(
                                    &mut output,
                                    &format!("=> {}", value.format(&child.context)),
                                );
                            }
                            Err(error) => {
                                write_line(&mut output, &format!("error: {}", error));
                            }
                        }
                    }
                }
            }
        }
    }

    // put the saved operand region back
    unsafe {
        std::ptr::copy(
            saved.as_ptr(),
            interpreter.stack.get_mut_ptr(saved_start),
            saved_bytesize,
        );
    }

    interpreter.pry_input = input;
    interpreter.pry_output = output;
}

fn read_line(input: &mut Option<Box<dyn BufRead + Send>>) -> Option<String> {
    let mut line = String::new();
    let read = match input.as_mut() {
        Some(reader) => reader.read_line(&mut line),
        None => std::io::stdin().lock().read_line(&mut line),
    };
    match read {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line),
    }
}

fn write_line(output: &mut Option<Box<dyn Write + Send>>, text: &str) {
    match output.as_mut() {
        Some(writer) => {
            let _ = writeln!(writer, "{}", text);
        }
        None => println!("{}", text),
    }
}

fn write_prompt(output: &mut Option<Box<dyn Write + Send>>, text: &str) {
    match output.as_mut() {
        Some(writer) => {
            let _ = write!(writer, "{}", text);
            let _ = writer.flush();
        }
        None => {
            print!("{}", text);
            let _ = std::io::stdout().flush();
        }
    }
}
