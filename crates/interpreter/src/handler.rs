// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::sync::OnceLock;

use icr_isa::{
    bytecode_reader::format_bytecode_as_text,
    opcode::{Opcode, MAX_OPCODE_NUMBER},
};

use crate::{
    interpreter::Interpreter,
    process::{HandleFunc, HandleResult},
};

mod arithmetic;
mod atomic;
mod calling;
mod comparison;
mod control_flow;
mod conversion;
mod data;
mod fundamental;
mod host;
mod local;
mod memory;

fn unreachable_handler(interpreter: &mut Interpreter) -> HandleResult {
    let code = interpreter.code().to_vec();
    unreachable!(
        "\
Invalid opcode: 0x{:02x}
Instruction address: 0x{:04x}
Bytecode:
{}",
        interpreter.opcode_num(),
        interpreter.ip,
        format_bytecode_as_text(&code)
    );
}

pub struct Handler {
    pub handlers: [HandleFunc; MAX_OPCODE_NUMBER],
}

static HANDLER: OnceLock<Handler> = OnceLock::new();

impl Handler {
    pub fn get() -> &'static Handler {
        HANDLER.get_or_init(Handler::new)
    }

    fn new() -> Self {
        let mut handlers: [HandleFunc; MAX_OPCODE_NUMBER] =
            [unreachable_handler; MAX_OPCODE_NUMBER];

        // fundamental
        handlers[Opcode::nop as usize] = fundamental::nop;
        handlers[Opcode::imm_i32 as usize] = fundamental::imm_i32;
        handlers[Opcode::imm_i64 as usize] = fundamental::imm_i64;
        handlers[Opcode::imm_f64 as usize] = fundamental::imm_f64;
        handlers[Opcode::imm_bool as usize] = fundamental::imm_bool;
        handlers[Opcode::imm_nil as usize] = fundamental::imm_nil;
        handlers[Opcode::imm_ptr as usize] = fundamental::imm_ptr;
        handlers[Opcode::pop as usize] = fundamental::pop;

        // local variables
        handlers[Opcode::get_local as usize] = local::get_local;
        handlers[Opcode::set_local as usize] = local::set_local;
        handlers[Opcode::get_local_pointer as usize] = local::get_local_pointer;
        handlers[Opcode::get_ivar_pointer as usize] = local::get_ivar_pointer;

        // constants and class variables
        handlers[Opcode::const_initialized as usize] = data::const_initialized;
        handlers[Opcode::get_const as usize] = data::get_const;
        handlers[Opcode::set_const as usize] = data::set_const;
        handlers[Opcode::get_const_pointer as usize] = data::get_const_pointer;
        handlers[Opcode::class_var_initialized as usize] = data::class_var_initialized;
        handlers[Opcode::get_class_var as usize] = data::get_class_var;
        handlers[Opcode::set_class_var as usize] = data::set_class_var;
        handlers[Opcode::get_class_var_pointer as usize] = data::get_class_var_pointer;

        // arithmetic
        handlers[Opcode::add_i32 as usize] = arithmetic::add_i32;
        handlers[Opcode::sub_i32 as usize] = arithmetic::sub_i32;
        handlers[Opcode::mul_i32 as usize] = arithmetic::mul_i32;
        handlers[Opcode::add_i64 as usize] = arithmetic::add_i64;
        handlers[Opcode::sub_i64 as usize] = arithmetic::sub_i64;
        handlers[Opcode::mul_i64 as usize] = arithmetic::mul_i64;
        handlers[Opcode::add_f64 as usize] = arithmetic::add_f64;
        handlers[Opcode::sub_f64 as usize] = arithmetic::sub_f64;
        handlers[Opcode::mul_f64 as usize] = arithmetic::mul_f64;

        // comparison
        handlers[Opcode::eq_i32 as usize] = comparison::eq_i32;
        handlers[Opcode::ne_i32 as usize] = comparison::ne_i32;
        handlers[Opcode::lt_i32 as usize] = comparison::lt_i32;
        handlers[Opcode::le_i32 as usize] = comparison::le_i32;
        handlers[Opcode::gt_i32 as usize] = comparison::gt_i32;
        handlers[Opcode::ge_i32 as usize] = comparison::ge_i32;
        handlers[Opcode::eq_i64 as usize] = comparison::eq_i64;
        handlers[Opcode::lt_i64 as usize] = comparison::lt_i64;
        handlers[Opcode::eq_f64 as usize] = comparison::eq_f64;
        handlers[Opcode::lt_f64 as usize] = comparison::lt_f64;

        // conversion
        handlers[Opcode::i32_to_i64 as usize] = conversion::i32_to_i64;
        handlers[Opcode::i32_to_f64 as usize] = conversion::i32_to_f64;

        // raw memory access
        handlers[Opcode::ptr_load_i32 as usize] = memory::ptr_load_i32;
        handlers[Opcode::ptr_load_i64 as usize] = memory::ptr_load_i64;
        handlers[Opcode::ptr_store_i32 as usize] = memory::ptr_store_i32;
        handlers[Opcode::ptr_store_i64 as usize] = memory::ptr_store_i64;

        // control flow
        handlers[Opcode::set_ip as usize] = control_flow::set_ip;
        handlers[Opcode::branch_if as usize] = control_flow::branch_if;
        handlers[Opcode::branch_unless as usize] = control_flow::branch_unless;

        // calling
        handlers[Opcode::call as usize] = calling::call;
        handlers[Opcode::call_with_block as usize] = calling::call_with_block;
        handlers[Opcode::call_block as usize] = calling::call_block;
        handlers[Opcode::lib_call as usize] = calling::lib_call;
        handlers[Opcode::leave as usize] = calling::leave;
        handlers[Opcode::leave_def as usize] = calling::leave_def;
        handlers[Opcode::break_block as usize] = calling::break_block;

        // atomic read-modify-write
        handlers[Opcode::atomic_add as usize] = atomic::atomic_add;
        handlers[Opcode::atomic_sub as usize] = atomic::atomic_sub;
        handlers[Opcode::atomic_and as usize] = atomic::atomic_and;
        handlers[Opcode::atomic_or as usize] = atomic::atomic_or;
        handlers[Opcode::atomic_xor as usize] = atomic::atomic_xor;
        handlers[Opcode::atomic_min as usize] = atomic::atomic_min;
        handlers[Opcode::atomic_max as usize] = atomic::atomic_max;
        handlers[Opcode::atomic_xchg as usize] = atomic::atomic_xchg;
        handlers[Opcode::atomic_cmpxchg as usize] = atomic::atomic_cmpxchg;

        // host interface
        handlers[Opcode::argc as usize] = host::argc;
        handlers[Opcode::argv as usize] = host::argv;
        handlers[Opcode::pry as usize] = host::pry;

        Self { handlers }
    }
}
