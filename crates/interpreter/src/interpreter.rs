// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// the interpreter
// ---------------
//
// one interpreter instance owns a value stack and a call stack and runs
// single-threaded. the locals of a top-level body live at the base of
// the value stack and persist across `interpret` calls, which is what
// lets a session re-enter with the previous run's variables still in
// place (see the migration module for how a changed type environment is
// reconciled).
//
// the layout of a running frame:
//
// |               | <-- top, operands grow upward
// | operands      |
// |---------------| <-- stack_bottom + max_bytesize
// | other locals  |
// |---------------|
// | arguments     | <-- arguments are the head of the locals
// |---------------| <-- stack_bottom
// | caller frames |
// \---------------/
//
// a debugger child interpreter shares the context and aliases the
// parent's stack at the stopped frame's bottom, so expressions read and
// write the live locals directly.

use std::{
    ffi::{c_char, CString},
    io::{BufRead, Write},
    sync::Arc,
};

use icr_context::{
    CompiledDef, CompiledInstructions, Context, LocalVars, MetaVars, TypeId,
};
use icr_isa::{
    bytecode_reader::{format_bytecode_as_text, format_bytes_as_hex},
    node::AstNode,
    opcode::{Opcode, MAX_OPCODE_NUMBER},
};
use icr_stack::ValueStack;

use crate::{
    frontend::Frontend,
    migrate::migrate_local_vars,
    process::process_continuous_instructions,
    InterpreterError, InterpreterErrorType,
};

/// One record on the call stack.
///
/// Frames are addressed by index, never by pointer, so pushing new
/// frames never invalidates a reference. `ip` and `stack` are live only
/// while the frame is suspended by a call; for the top frame the live
/// instruction pointer is `Interpreter::ip`.
#[derive(Clone)]
pub struct Frame {
    pub compiled_def: Arc<CompiledDef>,
    /// The def's own instructions, or a block's for a frame executing
    /// yielded block code.
    pub instructions: Arc<CompiledInstructions>,
    pub ip: usize,
    pub stack: usize,
    pub stack_bottom: usize,
    /// The index of the def frame that supplied the block this callee
    /// may yield to, -1 when the callee received no block.
    pub block_caller_frame_index: isize,
    /// The index of the original (not yield-copied) frame of the def
    /// whose code is running, the target for non-local returns.
    pub real_frame_index: usize,
    /// Set on frames entered from outside the dispatch loop (the
    /// top-level driver and inbound native callbacks); popping such a
    /// frame ends the current loop.
    pub exit_loop: bool,
}

/// The raw result of a top-level run.
pub struct Value {
    pub type_id: TypeId,
    pub bytes: Vec<u8>,
}

impl Value {
    pub fn as_i32(&self) -> i32 {
        i32::from_le_bytes(self.bytes[0..4].try_into().unwrap())
    }

    pub fn as_i64(&self) -> i64 {
        i64::from_le_bytes(self.bytes[0..8].try_into().unwrap())
    }

    pub fn as_f64(&self) -> f64 {
        f64::from_le_bytes(self.bytes[0..8].try_into().unwrap())
    }

    pub fn as_bool(&self) -> bool {
        self.bytes.first().copied().unwrap_or(0) != 0
    }

    pub fn format(&self, context: &Context) -> String {
        context.format_value(self.type_id, &self.bytes)
    }
}

pub(crate) struct ArgvArray {
    _strings: Vec<CString>,
    pointers: Vec<*const c_char>,
}

pub struct Interpreter {
    pub context: Arc<Context>,
    pub stack: ValueStack,
    pub frames: Vec<Frame>,
    /// The live instruction pointer of the top frame.
    pub ip: usize,

    /// The layout of the persisted top-level locals, carried from one
    /// `interpret` call to the next.
    pub current_local_vars: LocalVars,
    pub block_level: usize,

    // diagnostics switches
    pub trace: bool,
    pub dump_decompiled: bool,
    pub stats: bool,

    // debugger state
    pub pry: bool,
    pub(crate) pry_node: Option<Arc<AstNode>>,
    pub(crate) pry_max_target_frame: Option<isize>,
    pub(crate) pry_input: Option<Box<dyn BufRead + Send>>,
    pub(crate) pry_output: Option<Box<dyn Write + Send>>,

    /// The program arguments the interpreted code observes.
    pub argv: Vec<String>,
    pub(crate) argv_array: Option<ArgvArray>,

    /// Snapshot of the stack top taken before a native out-call, the
    /// base an inbound callback continues from.
    pub(crate) stack_top: usize,

    pub(crate) opcode_counters: Vec<u64>,
}

impl Interpreter {
    pub fn new(context: Arc<Context>) -> Self {
        Self {
            context,
            stack: ValueStack::new(),
            frames: Vec::new(),
            ip: 0,
            current_local_vars: LocalVars::new(),
            block_level: 0,
            trace: false,
            dump_decompiled: false,
            stats: false,
            pry: false,
            pry_node: None,
            pry_max_target_frame: None,
            pry_input: None,
            pry_output: None,
            argv: Vec::new(),
            argv_array: None,
            stack_top: 0,
            opcode_counters: vec![0; MAX_OPCODE_NUMBER],
        }
    }

    /// A debugger child: shares the context, aliases the parent's stack
    /// at the stopped frame's bottom, and evaluates expressions against
    /// the locals visible there.
    pub(crate) fn child(
        context: Arc<Context>,
        stack: ValueStack,
        local_vars: LocalVars,
        block_level: usize,
    ) -> Self {
        let mut child = Self::new(context);
        child.stack = stack;
        child.current_local_vars = local_vars;
        child.block_level = block_level;
        child
    }

    /// Route the debugger's read-eval-print loop through the given
    /// channel instead of the terminal.
    pub fn set_pry_channel(
        &mut self,
        input: Box<dyn BufRead + Send>,
        output: Box<dyn Write + Send>,
    ) {
        self.pry_input = Some(input);
        self.pry_output = Some(output);
    }

    /// Run one top-level body against the session's persisted locals.
    ///
    /// The previous run's locals are migrated to the new type
    /// environment first, then the body is compiled and executed.
    pub fn interpret(
        &mut self,
        node: &AstNode,
        meta_vars: &MetaVars,
        frontend: &mut dyn Frontend,
    ) -> Result<Value, InterpreterError> {
        migrate_local_vars(self, meta_vars);
        self.context.prepare_value_pools();

        let mut local_vars = std::mem::take(&mut self.current_local_vars);
        let compiled = frontend.compile(&self.context.clone(), &mut local_vars, node);
        self.current_local_vars = local_vars;
        let (instructions, result_type) = compiled.map_err(|error| {
            InterpreterError::new(InterpreterErrorType::Compile(error.to_string()))
        })?;

        if self.dump_decompiled {
            println!("{}", format_bytecode_as_text(&instructions.code));
        }

        let compiled_def = self.register_body("<top-level>", instructions, result_type);
        let bytes = self.run_body(compiled_def, Some(frontend))?;

        if self.stats {
            self.print_stats();
        }

        Ok(Value {
            type_id: result_type,
            bytes,
        })
    }

    /// Run one compiled debugger expression against the live locals.
    pub(crate) fn run_expression(
        &mut self,
        instructions: CompiledInstructions,
        result_type: TypeId,
    ) -> Result<Value, InterpreterError> {
        let compiled_def = self.register_body("<expression>", instructions, result_type);
        let bytes = self.run_body(compiled_def, None)?;
        Ok(Value {
            type_id: result_type,
            bytes,
        })
    }

    fn register_body(
        &mut self,
        name: &str,
        instructions: CompiledInstructions,
        result_type: TypeId,
    ) -> Arc<CompiledDef> {
        let return_bytesize = self.context.inner_sizeof_type(result_type);
        let compiled_def = CompiledDef {
            name: name.to_owned(),
            owner: None,
            args_bytesize: 0,
            local_vars: self.current_local_vars.clone(),
            return_type: result_type,
            return_bytesize,
            instructions: Arc::new(instructions),
        };
        let callable_id = self.context.add_compiled_def(compiled_def);
        self.context.compiled_def(callable_id)
    }

    fn run_body(
        &mut self,
        compiled_def: Arc<CompiledDef>,
        frontend: Option<&mut dyn Frontend>,
    ) -> Result<Vec<u8>, InterpreterError> {
        let max_bytesize = compiled_def.max_bytesize();

        // the locals region at the stack base is pre-existing state
        // (persisted, migrated, or aliased from a parent), only the
        // region above it is reset
        if self.stack.top() > max_bytesize {
            self.stack.truncate_to(max_bytesize);
        } else {
            self.stack.set_top(max_bytesize);
        }

        self.frames.clear();
        self.frames.push(Frame {
            compiled_def: compiled_def.clone(),
            instructions: compiled_def.instructions.clone(),
            ip: 0,
            stack: max_bytesize,
            stack_bottom: 0,
            block_caller_frame_index: -1,
            real_frame_index: 0,
            exit_loop: true,
        });
        self.ip = 0;

        process_continuous_instructions(self, frontend)
    }

    // decoding helpers, all relative to the live instruction pointer

    #[inline]
    pub(crate) fn code(&self) -> &[u8] {
        &self.frames.last().unwrap().instructions.code
    }

    #[inline]
    pub(crate) fn opcode_num(&self) -> u8 {
        self.code()[self.ip]
    }

    #[inline]
    pub(crate) fn get_param_i8(&self) -> u8 {
        self.code()[self.ip + 1]
    }

    #[inline]
    pub(crate) fn get_param_i32(&self) -> u32 {
        let code = self.code();
        u32::from_le_bytes(code[self.ip + 1..self.ip + 5].try_into().unwrap())
    }

    #[inline]
    pub(crate) fn get_param_i32_i32(&self) -> (u32, u32) {
        let code = self.code();
        (
            u32::from_le_bytes(code[self.ip + 1..self.ip + 5].try_into().unwrap()),
            u32::from_le_bytes(code[self.ip + 5..self.ip + 9].try_into().unwrap()),
        )
    }

    #[inline]
    pub(crate) fn get_param_i64(&self) -> u64 {
        let code = self.code();
        u64::from_le_bytes(code[self.ip + 1..self.ip + 9].try_into().unwrap())
    }

    #[inline]
    pub(crate) fn get_param_f64(&self) -> f64 {
        f64::from_bits(self.get_param_i64())
    }

    #[inline]
    pub(crate) fn current_frame(&self) -> &Frame {
        self.frames.last().unwrap()
    }

    // host interface

    pub(crate) fn argv_pointer(&mut self) -> *const *const c_char {
        if self.argv_array.is_none() {
            let mut strings = vec![CString::new("icr").unwrap()];
            for argument in &self.argv {
                strings.push(CString::new(argument.as_str()).unwrap());
            }
            let mut pointers = strings
                .iter()
                .map(|string| string.as_ptr())
                .collect::<Vec<*const c_char>>();
            pointers.push(std::ptr::null());
            self.argv_array = Some(ArgvArray {
                _strings: strings,
                pointers,
            });
        }
        self.argv_array.as_ref().unwrap().pointers.as_ptr()
    }

    // diagnostics

    pub(crate) fn print_trace(&self) {
        let frame_index = self.frames.len() - 1;
        let frame = self.current_frame();
        println!(
            "frame {} ({}) offset 0x{:04x}",
            frame_index, frame.compiled_def.name, self.ip
        );
        let live = unsafe {
            std::slice::from_raw_parts(
                self.stack.get_ptr(frame.stack_bottom),
                self.stack.top() - frame.stack_bottom,
            )
        };
        println!("{}", format_bytes_as_hex(live));
    }

    pub(crate) fn print_stats(&self) {
        let mut counters = self
            .opcode_counters
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(number, count)| (number, *count))
            .collect::<Vec<(usize, u64)>>();
        counters.sort_by(|left, right| right.1.cmp(&left.1));

        println!("instructions executed:");
        for (number, count) in counters {
            let name = Opcode::from_u8(number as u8)
                .map(|opcode| opcode.get_name())
                .unwrap_or("<invalid>");
            println!("{:24} {}", name, count);
        }
    }
}
