// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// union widening across a session re-entry
// ----------------------------------------
//
//     icr> x = 1          # x : Int32
//     icr> x              # re-enter, x widened to (Int32 | Float64)
//     icr> x = 1.5; x + 0.5
//     => 2.0

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;

use icr_context::{Context, MetaVars, TypeDesc};
use icr_interpreter::Interpreter;
use icr_isa::{bytecode_writer::BytecodeWriter, node::AstNode, node::NodeMap, opcode::Opcode};

use common::{register_basic_types, ScriptedFrontend};

#[test]
fn test_union_widening_on_re_entry() {
    let context = Arc::new(Context::new());
    let types = register_basic_types(&context);
    let union = context.type_id(&TypeDesc::MixedUnion(vec![types.int32, types.float64]));

    // run 1: x = 1, with x : Int32
    let run1 = {
        let mut writer = BytecodeWriter::new();
        writer.write_opcode_i32(Opcode::imm_i32, 1);
        writer.write_opcode_i32_i32(Opcode::set_local, 0, 4);
        writer.write_opcode_i32_i32(Opcode::get_local, 0, 4);
        writer.write_opcode_i32(Opcode::leave, 4);
        writer.to_bytes()
    };

    // run 2: x, with x : (Int32 | Float64) -- observes the migrated slot
    let run2 = {
        let mut writer = BytecodeWriter::new();
        writer.write_opcode_i32_i32(Opcode::get_local, 0, 16);
        writer.write_opcode_i32(Opcode::leave, 16);
        writer.to_bytes()
    };

    // run 3: x = 1.5; x + 0.5, with the compiler's union-tag dispatch
    let run3 = {
        let mut writer = BytecodeWriter::new();
        // x = 1.5
        writer.write_opcode_f64(Opcode::imm_f64, 1.5);
        writer.write_opcode_i32_i32(Opcode::set_local, 8, 8); // payload
        writer.write_opcode_i64(Opcode::imm_i64, types.float64 as u64);
        writer.write_opcode_i32_i32(Opcode::set_local, 0, 8); // tag
        // x + 0.5, dispatching on the tag
        writer.write_opcode_i32_i32(Opcode::get_local, 0, 8);
        writer.write_opcode_i64(Opcode::imm_i64, types.float64 as u64);
        writer.write_opcode(Opcode::eq_i64);
        let float_branch = writer.write_opcode_i32(Opcode::branch_if, 0);
        // Int32 member: reinterpret the payload
        writer.write_opcode_i32_i32(Opcode::get_local, 8, 4);
        writer.write_opcode(Opcode::i32_to_f64);
        let join_jump = writer.write_opcode_i32(Opcode::set_ip, 0);
        // Float64 member
        let float_target = writer.addr();
        writer.patch_param_i32(float_branch, float_target as u32);
        writer.write_opcode_i32_i32(Opcode::get_local, 8, 8);
        let join_target = writer.addr();
        writer.patch_param_i32(join_jump, join_target as u32);
        writer.write_opcode_f64(Opcode::imm_f64, 0.5);
        writer.write_opcode(Opcode::add_f64);
        writer.write_opcode_i32(Opcode::leave, 8);
        writer.to_bytes()
    };

    let mut frontend = ScriptedFrontend::new();
    frontend.push_program(run1, NodeMap::new(), types.int32);
    frontend.push_program(run2, NodeMap::new(), union);
    frontend.push_program(run3, NodeMap::new(), types.float64);

    let mut interpreter = Interpreter::new(context.clone());

    let mut run1_meta = MetaVars::new();
    run1_meta.declare("x", types.int32);
    let value1 = interpreter
        .interpret(&AstNode::new("x = 1"), &run1_meta, &mut frontend)
        .unwrap();
    assert_eq!(value1.as_i32(), 1);
    assert_eq!(interpreter.stack.top(), 8);

    // re-enter with the widened type: the old Int32 value is carried
    // into the union as tag + payload
    let mut widened_meta = MetaVars::new();
    widened_meta.declare("x", union);
    let value2 = interpreter
        .interpret(&AstNode::new("x"), &widened_meta, &mut frontend)
        .unwrap();

    let tag = i64::from_le_bytes(value2.bytes[0..8].try_into().unwrap());
    let payload = i32::from_le_bytes(value2.bytes[8..12].try_into().unwrap());
    assert_eq!(tag, types.int32 as i64);
    assert_eq!(payload, 1);
    assert_eq!(value2.format(&context), "1");

    // byte-level check of the migrated slot on the live stack
    assert_eq!(interpreter.stack.read::<i64>(0), types.int32 as i64);
    assert_eq!(interpreter.stack.read::<i32>(8), 1);
    assert_eq!(interpreter.stack.top(), 16);

    // the re-assignment retags the slot, the addition sees a Float64
    let value3 = interpreter
        .interpret(&AstNode::new("x = 1.5; x + 0.5"), &widened_meta, &mut frontend)
        .unwrap();
    assert_eq!(value3.as_f64(), 2.0);

    assert_eq!(interpreter.stack.read::<i64>(0), types.float64 as i64);
    assert_eq!(interpreter.stack.read::<f64>(8), 1.5);
}

#[test]
fn test_migration_round_trip_for_unchanged_vars() {
    // a second variable with an unchanged size is byte-identical after
    // a migration that rewrites its neighbor
    let context = Arc::new(Context::new());
    let types = register_basic_types(&context);
    let union = context.type_id(&TypeDesc::MixedUnion(vec![types.int32, types.float64]));

    let run1 = {
        let mut writer = BytecodeWriter::new();
        writer.write_opcode_i32(Opcode::imm_i32, 7);
        writer.write_opcode_i32_i32(Opcode::set_local, 0, 4);
        writer.write_opcode_f64(Opcode::imm_f64, 2.5);
        writer.write_opcode_i32_i32(Opcode::set_local, 8, 8);
        writer.write_opcode_i32(Opcode::imm_i32, 0);
        writer.write_opcode_i32(Opcode::leave, 4);
        writer.to_bytes()
    };
    let run2 = {
        let mut writer = BytecodeWriter::new();
        writer.write_opcode_i32_i32(Opcode::get_local, 16, 8);
        writer.write_opcode_i32(Opcode::leave, 8);
        writer.to_bytes()
    };

    let mut frontend = ScriptedFrontend::new();
    frontend.push_program(run1, NodeMap::new(), types.int32);
    frontend.push_program(run2, NodeMap::new(), types.float64);

    let mut interpreter = Interpreter::new(context);

    let mut run1_meta = MetaVars::new();
    run1_meta.declare("x", types.int32);
    run1_meta.declare("y", types.float64);
    interpreter
        .interpret(&AstNode::new("x = 7; y = 2.5"), &run1_meta, &mut frontend)
        .unwrap();

    // x widens, y moves from offset 8 to offset 16 byte-identically
    let mut run2_meta = MetaVars::new();
    run2_meta.declare("x", union);
    run2_meta.declare("y", types.float64);
    let value = interpreter
        .interpret(&AstNode::new("y"), &run2_meta, &mut frontend)
        .unwrap();

    assert_eq!(value.as_f64(), 2.5);
    assert_eq!(interpreter.stack.read::<i64>(0), types.int32 as i64);
    assert_eq!(interpreter.stack.read::<i32>(8), 7);
    assert_eq!(interpreter.stack.read::<f64>(16), 2.5);
}
