// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// the native-call bridge, both directions
// ---------------------------------------
//
//     cmp = ->(a : Pointer, b : Pointer) { a.value - b.value }
//     LibC.qsort(array, 3, 4, cmp)
//
// qsort calls back into the interpreter for every comparison; each
// callback re-enters the dispatch loop above the captured stack top
// and must leave the suspended caller's stack untouched.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;

use icr_context::{
    CallInterface, CompiledDef, CompiledInstructions, Context, FfiValueType, LibFunction,
    LocalVars, MetaVars,
};
use icr_interpreter::Interpreter;
use icr_isa::{bytecode_writer::BytecodeWriter, node::AstNode, node::NodeMap, opcode::Opcode};

use common::{register_basic_types, ScriptedFrontend, TestTypes};

// def cmp(a : Pointer, b : Pointer) : Int32 = a.value - b.value
fn register_cmp(context: &Context, types: &TestTypes) -> u32 {
    let code = {
        let mut writer = BytecodeWriter::new();
        writer.write_opcode_i32_i32(Opcode::get_local, 0, 8);
        writer.write_opcode(Opcode::ptr_load_i32);
        writer.write_opcode_i32_i32(Opcode::get_local, 8, 8);
        writer.write_opcode(Opcode::ptr_load_i32);
        writer.write_opcode(Opcode::sub_i32);
        writer.write_opcode_i32(Opcode::leave_def, 4);
        writer.to_bytes()
    };
    let mut local_vars = LocalVars::new();
    local_vars.declare("a", 0, types.pointer, 8);
    local_vars.declare("b", 0, types.pointer, 8);
    context.add_compiled_def(CompiledDef {
        name: "cmp".to_owned(),
        owner: None,
        args_bytesize: 16,
        local_vars,
        return_type: types.int32,
        return_bytesize: 4,
        instructions: Arc::new(CompiledInstructions::new(code, NodeMap::new())),
    })
}

fn register_qsort(context: &Context) -> u32 {
    let cmp_interface = CallInterface::new(
        &[FfiValueType::Pointer, FfiValueType::Pointer],
        FfiValueType::SInt32,
    );
    context.add_lib_function(LibFunction::new(
        "qsort",
        &[
            FfiValueType::Pointer,
            FfiValueType::UInt64,
            FfiValueType::UInt64,
            FfiValueType::Pointer,
        ],
        FfiValueType::Void,
        libc::qsort as usize as *const libc::c_void,
        vec![None, None, None, Some(cmp_interface)],
    ))
}

#[test]
fn test_qsort_with_an_interpreted_comparator() {
    let context = Arc::new(Context::new());
    let types = register_basic_types(&context);

    let cmp_id = register_cmp(&context, &types);
    let qsort_id = register_qsort(&context);

    let mut numbers: Vec<i32> = vec![3, 1, 2];
    let numbers_pointer = numbers.as_mut_ptr() as u64;

    // LibC.qsort(numbers, 3, 4, cmp); 0
    let code = {
        let mut writer = BytecodeWriter::new();
        writer.write_opcode_i64(Opcode::imm_ptr, numbers_pointer);
        writer.write_opcode_i64(Opcode::imm_i64, 3);
        writer.write_opcode_i64(Opcode::imm_i64, 4);
        // the procedure value: {callable_id, closure_data}
        writer.write_opcode_i64(Opcode::imm_i64, cmp_id as u64);
        writer.write_opcode_i64(Opcode::imm_i64, 0);
        writer.write_opcode_i32(Opcode::lib_call, qsort_id);
        writer.write_opcode_i32(Opcode::imm_i32, 0);
        writer.write_opcode_i32(Opcode::leave, 4);
        writer.to_bytes()
    };

    let mut frontend = ScriptedFrontend::new();
    frontend.push_program(code, NodeMap::new(), types.int32);

    let mut interpreter = Interpreter::new(context);
    let value = interpreter
        .interpret(&AstNode::new("qsort(...)"), &MetaVars::new(), &mut frontend)
        .unwrap();

    assert_eq!(value.as_i32(), 0);
    assert_eq!(numbers, vec![1, 2, 3]);
    assert!(interpreter.frames.is_empty());
    assert_eq!(interpreter.stack.top(), 0);
}

#[test]
fn test_callbacks_preserve_the_callers_locals() {
    // the same qsort call from a body that owns locals; the callbacks
    // run above the captured stack top and must not clobber them
    let context = Arc::new(Context::new());
    let types = register_basic_types(&context);

    let cmp_id = register_cmp(&context, &types);
    let qsort_id = register_qsort(&context);

    let mut numbers: Vec<i32> = vec![9, 7, 8, 6];
    let numbers_pointer = numbers.as_mut_ptr() as u64;

    // keep = 1234; qsort(...); keep
    let code = {
        let mut writer = BytecodeWriter::new();
        writer.write_opcode_i32(Opcode::imm_i32, 1234);
        writer.write_opcode_i32_i32(Opcode::set_local, 0, 4);
        writer.write_opcode_i64(Opcode::imm_ptr, numbers_pointer);
        writer.write_opcode_i64(Opcode::imm_i64, 4);
        writer.write_opcode_i64(Opcode::imm_i64, 4);
        writer.write_opcode_i64(Opcode::imm_i64, cmp_id as u64);
        writer.write_opcode_i64(Opcode::imm_i64, 0);
        writer.write_opcode_i32(Opcode::lib_call, qsort_id);
        writer.write_opcode_i32_i32(Opcode::get_local, 0, 4);
        writer.write_opcode_i32(Opcode::leave, 4);
        writer.to_bytes()
    };

    let mut meta_vars = MetaVars::new();
    meta_vars.declare("keep", types.int32);

    let mut frontend = ScriptedFrontend::new();
    frontend.push_program(code, NodeMap::new(), types.int32);

    let mut interpreter = Interpreter::new(context);
    let value = interpreter
        .interpret(&AstNode::new("qsort(...)"), &meta_vars, &mut frontend)
        .unwrap();

    assert_eq!(value.as_i32(), 1234);
    assert_eq!(numbers, vec![6, 7, 8, 9]);
}

#[test]
fn test_a_closured_procedure_is_rejected() {
    // a procedure whose closure_data is non-null can not cross the
    // native boundary
    let context = Arc::new(Context::new());
    let types = register_basic_types(&context);

    let cmp_id = register_cmp(&context, &types);
    let qsort_id = register_qsort(&context);

    let mut numbers: Vec<i32> = vec![2, 1];
    let numbers_pointer = numbers.as_mut_ptr() as u64;

    let code = {
        let mut writer = BytecodeWriter::new();
        writer.write_opcode_i64(Opcode::imm_ptr, numbers_pointer);
        writer.write_opcode_i64(Opcode::imm_i64, 2);
        writer.write_opcode_i64(Opcode::imm_i64, 4);
        writer.write_opcode_i64(Opcode::imm_i64, cmp_id as u64);
        writer.write_opcode_i64(Opcode::imm_i64, 0xdead_beef); // captured closure
        writer.write_opcode_i32(Opcode::lib_call, qsort_id);
        writer.write_opcode_i32(Opcode::imm_i32, 0);
        writer.write_opcode_i32(Opcode::leave, 4);
        writer.to_bytes()
    };

    let mut frontend = ScriptedFrontend::new();
    frontend.push_program(code, NodeMap::new(), types.int32);

    let mut interpreter = Interpreter::new(context);
    let result = interpreter.interpret(&AstNode::new("qsort(...)"), &MetaVars::new(), &mut frontend);

    let error = result.err().unwrap();
    assert!(error.to_string().contains("captures a closure"));
}

#[test]
fn test_lib_call_return_value_compaction() {
    // a native call with a return value: labs(-5) == 5; afterwards the
    // stack top is exactly the aligned return slot above the pre-args
    // position
    let context = Arc::new(Context::new());
    let types = register_basic_types(&context);

    let labs_id = context.add_lib_function(LibFunction::new(
        "labs",
        &[FfiValueType::SInt64],
        FfiValueType::SInt64,
        libc::labs as usize as *const libc::c_void,
        vec![None],
    ));

    let code = {
        let mut writer = BytecodeWriter::new();
        writer.write_opcode_i64(Opcode::imm_i64, (-5i64) as u64);
        writer.write_opcode_i32(Opcode::lib_call, labs_id);
        writer.write_opcode_i32(Opcode::leave, 8);
        writer.to_bytes()
    };

    let mut frontend = ScriptedFrontend::new();
    frontend.push_program(code, NodeMap::new(), types.int64);

    let mut interpreter = Interpreter::new(context);
    let value = interpreter
        .interpret(&AstNode::new("labs(-5)"), &MetaVars::new(), &mut frontend)
        .unwrap();

    assert_eq!(value.as_i64(), 5);
    assert_eq!(interpreter.stack.top(), 0);
}
