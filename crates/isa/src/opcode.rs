// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// instruction encoding
// --------------------
//
// an instruction is a single opcode byte followed by its operands,
// packed without padding and encoded little-endian:
//
// | opcode (1 byte) | operand 0 | operand 1 | ... |
//
// the operand layout is static per opcode, so the stream can be decoded
// without any out-of-band information. operands that refer to stack data
// always use byte offsets/bytesizes; the bytesizes are the RAW sizes of
// the values, the aligned size is computed by the consumer.
//
// notation used in the per-opcode comments:
//
// - `(param ...)`   operands read from the instruction stream
// - `(operand ...)` values popped from the stack, the last declared
//                   one is popped first
// - `-> ...`        the pushed result, if any

pub const MAX_OPCODE_NUMBER: usize = 0x80;

#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[allow(non_camel_case_types)]
pub enum Opcode {
    // does nothing
    nop = 0x00,

    // literals
    imm_i32 = 0x01, // (param value:i32) -> i32
    imm_i64,        // (param value:i64) -> i64
    imm_f64,        // (param value:f64) -> f64
    imm_bool,       // (param value:i8) -> bool
    imm_nil,        // () -> nil, nil is zero-sized so nothing is pushed
    imm_ptr,        // (param value:i64) -> ptr, string literals and other host pointers

    // discards the value slot on the top of the stack
    pop = 0x08, // (param bytesize:i32)

    // local variables, the offsets are byte offsets from the
    // current frame's stack bottom
    get_local = 0x10,  // (param offset:i32 bytesize:i32) -> value
    set_local,         // (param offset:i32 bytesize:i32) (operand value)
    get_local_pointer, // (param offset:i32) -> ptr

    // `self` is the pointer-sized local at offset 0
    get_ivar_pointer, // (param offset:i32) -> ptr

    // constants pool
    //
    // the `slot` operand is the byte offset of the slot start within the
    // pool, the pool itself locates the one-byte init flag and the value
    // area inside the slot.
    const_initialized = 0x18, // (param slot:i32) -> bool, atomic test-and-set of the init flag
    get_const,                // (param slot:i32 bytesize:i32) -> value
    set_const,                // (param slot:i32 bytesize:i32) (operand value)
    get_const_pointer,        // (param slot:i32) -> ptr

    // class variables pool, a mirror of the constants ops
    class_var_initialized = 0x20, // (param slot:i32) -> bool
    get_class_var,                // (param slot:i32 bytesize:i32) -> value
    set_class_var,                // (param slot:i32 bytesize:i32) (operand value)
    get_class_var_pointer,        // (param slot:i32) -> ptr

    // arithmetic, wrapping on overflow
    add_i32 = 0x28, // (operand left:i32 right:i32) -> i32
    sub_i32,        // (operand left:i32 right:i32) -> i32
    mul_i32,        // (operand left:i32 right:i32) -> i32
    add_i64,        // (operand left:i64 right:i64) -> i64
    sub_i64,        // (operand left:i64 right:i64) -> i64
    mul_i64,        // (operand left:i64 right:i64) -> i64
    add_f64,        // (operand left:f64 right:f64) -> f64
    sub_f64,        // (operand left:f64 right:f64) -> f64
    mul_f64,        // (operand left:f64 right:f64) -> f64

    // comparison, the result is a bool
    eq_i32 = 0x38, // (operand left:i32 right:i32) -> bool
    ne_i32,        // (operand left:i32 right:i32) -> bool
    lt_i32,        // (operand left:i32 right:i32) -> bool
    le_i32,        // (operand left:i32 right:i32) -> bool
    gt_i32,        // (operand left:i32 right:i32) -> bool
    ge_i32,        // (operand left:i32 right:i32) -> bool
    eq_i64,        // (operand left:i64 right:i64) -> bool
    lt_i64,        // (operand left:i64 right:i64) -> bool
    eq_f64,        // (operand left:f64 right:f64) -> bool
    lt_f64,        // (operand left:f64 right:f64) -> bool

    // conversion
    i32_to_i64 = 0x44, // (operand value:i32) -> i64
    i32_to_f64,        // (operand value:i32) -> f64

    // raw memory access through a pointer value
    ptr_load_i32 = 0x48, // (operand ptr:ptr) -> i32
    ptr_load_i64,        // (operand ptr:ptr) -> i64
    ptr_store_i32,       // (operand ptr:ptr value:i32)
    ptr_store_i64,       // (operand ptr:ptr value:i64)

    // control flow, the targets are absolute byte offsets within the
    // current instruction stream
    set_ip = 0x50, // (param target:i32)
    branch_if,     // (param target:i32) (operand condition:bool)
    branch_unless, // (param target:i32) (operand condition:bool)

    // calls
    //
    // `def_id`/`block_id`/`lib_function_id` index the registries on the
    // context. the `bytesize` of the leave family is the raw bytesize of
    // the value carried back to the caller.
    call = 0x58,     // (param def_id:i32)
    call_with_block, // (param def_id:i32)
    call_block,      // (param block_id:i32)
    lib_call,        // (param lib_function_id:i32)
    leave,           // (param bytesize:i32)
    leave_def,       // (param bytesize:i32)
    break_block,     // (param bytesize:i32)

    // atomic read-modify-write, sequentially consistent
    //
    // the element bytesize must be 1, 2, 4 or 8, every other width is a
    // fatal error. the pre-operation value is pushed back.
    atomic_add = 0x68, // (operand ptr:ptr value:i64 element_bytesize:i32) -> i64
    atomic_sub,        // (operand ptr:ptr value:i64 element_bytesize:i32) -> i64
    atomic_and,        // (operand ptr:ptr value:i64 element_bytesize:i32) -> i64
    atomic_or,         // (operand ptr:ptr value:i64 element_bytesize:i32) -> i64
    atomic_xor,        // (operand ptr:ptr value:i64 element_bytesize:i32) -> i64
    atomic_min,        // (operand ptr:ptr value:i64 element_bytesize:i32) -> i64, signed
    atomic_max,        // (operand ptr:ptr value:i64 element_bytesize:i32) -> i64, signed
    atomic_xchg,       // (operand ptr:ptr value:i64 element_bytesize:i32) -> i64
    atomic_cmpxchg,    // (operand ptr:ptr expected:i64 new:i64 element_bytesize:i32) -> i64

    // host interface
    argc = 0x78, // () -> i32, the number of user arguments plus one
    argv,        // () -> ptr, the null-terminated program argument array
    pry,         // arms the interactive debugger
}

/// The operand kinds an instruction can carry in the stream.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum OperandKind {
    I8,
    I32,
    I64,
    F64,
}

impl OperandKind {
    pub fn bytesize(&self) -> usize {
        match self {
            OperandKind::I8 => 1,
            OperandKind::I32 => 4,
            OperandKind::I64 => 8,
            OperandKind::F64 => 8,
        }
    }
}

impl Opcode {
    pub fn from_u8(value: u8) -> Option<Opcode> {
        let opcode = match value {
            0x00 => Opcode::nop,
            0x01 => Opcode::imm_i32,
            0x02 => Opcode::imm_i64,
            0x03 => Opcode::imm_f64,
            0x04 => Opcode::imm_bool,
            0x05 => Opcode::imm_nil,
            0x06 => Opcode::imm_ptr,
            0x08 => Opcode::pop,
            0x10 => Opcode::get_local,
            0x11 => Opcode::set_local,
            0x12 => Opcode::get_local_pointer,
            0x13 => Opcode::get_ivar_pointer,
            0x18 => Opcode::const_initialized,
            0x19 => Opcode::get_const,
            0x1a => Opcode::set_const,
            0x1b => Opcode::get_const_pointer,
            0x20 => Opcode::class_var_initialized,
            0x21 => Opcode::get_class_var,
            0x22 => Opcode::set_class_var,
            0x23 => Opcode::get_class_var_pointer,
            0x28 => Opcode::add_i32,
            0x29 => Opcode::sub_i32,
            0x2a => Opcode::mul_i32,
            0x2b => Opcode::add_i64,
            0x2c => Opcode::sub_i64,
            0x2d => Opcode::mul_i64,
            0x2e => Opcode::add_f64,
            0x2f => Opcode::sub_f64,
            0x30 => Opcode::mul_f64,
            0x38 => Opcode::eq_i32,
            0x39 => Opcode::ne_i32,
            0x3a => Opcode::lt_i32,
            0x3b => Opcode::le_i32,
            0x3c => Opcode::gt_i32,
            0x3d => Opcode::ge_i32,
            0x3e => Opcode::eq_i64,
            0x3f => Opcode::lt_i64,
            0x40 => Opcode::eq_f64,
            0x41 => Opcode::lt_f64,
            0x44 => Opcode::i32_to_i64,
            0x45 => Opcode::i32_to_f64,
            0x48 => Opcode::ptr_load_i32,
            0x49 => Opcode::ptr_load_i64,
            0x4a => Opcode::ptr_store_i32,
            0x4b => Opcode::ptr_store_i64,
            0x50 => Opcode::set_ip,
            0x51 => Opcode::branch_if,
            0x52 => Opcode::branch_unless,
            0x58 => Opcode::call,
            0x59 => Opcode::call_with_block,
            0x5a => Opcode::call_block,
            0x5b => Opcode::lib_call,
            0x5c => Opcode::leave,
            0x5d => Opcode::leave_def,
            0x5e => Opcode::break_block,
            0x68 => Opcode::atomic_add,
            0x69 => Opcode::atomic_sub,
            0x6a => Opcode::atomic_and,
            0x6b => Opcode::atomic_or,
            0x6c => Opcode::atomic_xor,
            0x6d => Opcode::atomic_min,
            0x6e => Opcode::atomic_max,
            0x6f => Opcode::atomic_xchg,
            0x70 => Opcode::atomic_cmpxchg,
            0x78 => Opcode::argc,
            0x79 => Opcode::argv,
            0x7a => Opcode::pry,
            _ => return None,
        };
        Some(opcode)
    }

    pub fn get_name(&self) -> &'static str {
        match self {
            Opcode::nop => "nop",
            Opcode::imm_i32 => "imm_i32",
            Opcode::imm_i64 => "imm_i64",
            Opcode::imm_f64 => "imm_f64",
            Opcode::imm_bool => "imm_bool",
            Opcode::imm_nil => "imm_nil",
            Opcode::imm_ptr => "imm_ptr",
            Opcode::pop => "pop",
            Opcode::get_local => "get_local",
            Opcode::set_local => "set_local",
            Opcode::get_local_pointer => "get_local_pointer",
            Opcode::get_ivar_pointer => "get_ivar_pointer",
            Opcode::const_initialized => "const_initialized",
            Opcode::get_const => "get_const",
            Opcode::set_const => "set_const",
            Opcode::get_const_pointer => "get_const_pointer",
            Opcode::class_var_initialized => "class_var_initialized",
            Opcode::get_class_var => "get_class_var",
            Opcode::set_class_var => "set_class_var",
            Opcode::get_class_var_pointer => "get_class_var_pointer",
            Opcode::add_i32 => "add_i32",
            Opcode::sub_i32 => "sub_i32",
            Opcode::mul_i32 => "mul_i32",
            Opcode::add_i64 => "add_i64",
            Opcode::sub_i64 => "sub_i64",
            Opcode::mul_i64 => "mul_i64",
            Opcode::add_f64 => "add_f64",
            Opcode::sub_f64 => "sub_f64",
            Opcode::mul_f64 => "mul_f64",
            Opcode::eq_i32 => "eq_i32",
            Opcode::ne_i32 => "ne_i32",
            Opcode::lt_i32 => "lt_i32",
            Opcode::le_i32 => "le_i32",
            Opcode::gt_i32 => "gt_i32",
            Opcode::ge_i32 => "ge_i32",
            Opcode::eq_i64 => "eq_i64",
            Opcode::lt_i64 => "lt_i64",
            Opcode::eq_f64 => "eq_f64",
            Opcode::lt_f64 => "lt_f64",
            Opcode::i32_to_i64 => "i32_to_i64",
            Opcode::i32_to_f64 => "i32_to_f64",
            Opcode::ptr_load_i32 => "ptr_load_i32",
            Opcode::ptr_load_i64 => "ptr_load_i64",
            Opcode::ptr_store_i32 => "ptr_store_i32",
            Opcode::ptr_store_i64 => "ptr_store_i64",
            Opcode::set_ip => "set_ip",
            Opcode::branch_if => "branch_if",
            Opcode::branch_unless => "branch_unless",
            Opcode::call => "call",
            Opcode::call_with_block => "call_with_block",
            Opcode::call_block => "call_block",
            Opcode::lib_call => "lib_call",
            Opcode::leave => "leave",
            Opcode::leave_def => "leave_def",
            Opcode::break_block => "break_block",
            Opcode::atomic_add => "atomic_add",
            Opcode::atomic_sub => "atomic_sub",
            Opcode::atomic_and => "atomic_and",
            Opcode::atomic_or => "atomic_or",
            Opcode::atomic_xor => "atomic_xor",
            Opcode::atomic_min => "atomic_min",
            Opcode::atomic_max => "atomic_max",
            Opcode::atomic_xchg => "atomic_xchg",
            Opcode::atomic_cmpxchg => "atomic_cmpxchg",
            Opcode::argc => "argc",
            Opcode::argv => "argv",
            Opcode::pry => "pry",
        }
    }

    pub fn operand_layout(&self) -> &'static [OperandKind] {
        match self {
            Opcode::nop
            | Opcode::imm_nil
            | Opcode::add_i32
            | Opcode::sub_i32
            | Opcode::mul_i32
            | Opcode::add_i64
            | Opcode::sub_i64
            | Opcode::mul_i64
            | Opcode::add_f64
            | Opcode::sub_f64
            | Opcode::mul_f64
            | Opcode::eq_i32
            | Opcode::ne_i32
            | Opcode::lt_i32
            | Opcode::le_i32
            | Opcode::gt_i32
            | Opcode::ge_i32
            | Opcode::eq_i64
            | Opcode::lt_i64
            | Opcode::eq_f64
            | Opcode::lt_f64
            | Opcode::i32_to_i64
            | Opcode::i32_to_f64
            | Opcode::ptr_load_i32
            | Opcode::ptr_load_i64
            | Opcode::ptr_store_i32
            | Opcode::ptr_store_i64
            | Opcode::atomic_add
            | Opcode::atomic_sub
            | Opcode::atomic_and
            | Opcode::atomic_or
            | Opcode::atomic_xor
            | Opcode::atomic_min
            | Opcode::atomic_max
            | Opcode::atomic_xchg
            | Opcode::atomic_cmpxchg
            | Opcode::argc
            | Opcode::argv
            | Opcode::pry => &[],
            Opcode::imm_bool => &[OperandKind::I8],
            Opcode::imm_i32
            | Opcode::pop
            | Opcode::get_local_pointer
            | Opcode::get_ivar_pointer
            | Opcode::const_initialized
            | Opcode::get_const_pointer
            | Opcode::class_var_initialized
            | Opcode::get_class_var_pointer
            | Opcode::set_ip
            | Opcode::branch_if
            | Opcode::branch_unless
            | Opcode::call
            | Opcode::call_with_block
            | Opcode::call_block
            | Opcode::lib_call
            | Opcode::leave
            | Opcode::leave_def
            | Opcode::break_block => &[OperandKind::I32],
            Opcode::imm_i64 | Opcode::imm_ptr => &[OperandKind::I64],
            Opcode::imm_f64 => &[OperandKind::F64],
            Opcode::get_local
            | Opcode::set_local
            | Opcode::get_const
            | Opcode::set_const
            | Opcode::get_class_var
            | Opcode::set_class_var => &[OperandKind::I32, OperandKind::I32],
        }
    }

    /// The full encoded length of the instruction, opcode byte included.
    pub fn instruction_length(&self) -> usize {
        1 + self
            .operand_layout()
            .iter()
            .map(|kind| kind.bytesize())
            .sum::<usize>()
    }
}
