// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// the interactive debugger
// ------------------------
//
// the session under test:
//
//     icr> pry
//     from demo.icr:10:1:
//         a = 1
//     pry> next
//     from demo.icr:11:1:
//         sub
//     pry> next          # steps over sub, not into its line 20
//     from demo.icr:12:1:
//         a
//     pry> continue

mod common;

use std::{io::Cursor, sync::Arc};

use pretty_assertions::assert_eq;

use icr_context::{CompiledDef, CompiledInstructions, Context, LocalVars, MetaVars};
use icr_interpreter::Interpreter;
use icr_isa::{
    bytecode_writer::BytecodeWriter,
    node::{AstNode, NodeMap},
    opcode::Opcode,
};

use common::{register_basic_types, ScriptedFrontend, SharedWriter};

#[test]
fn test_next_stays_in_the_frame() {
    let context = Arc::new(Context::new());
    let types = register_basic_types(&context);

    // def sub, one instruction on line 20
    let sub_id = {
        let mut nodes = NodeMap::new();
        let code = {
            let mut writer = BytecodeWriter::new();
            let addr = writer.write_opcode_i32(Opcode::imm_i32, 7);
            nodes.insert(addr, Arc::new(AstNode::with_location("7", "demo.icr", 20, 1)));
            writer.write_opcode_i32(Opcode::leave, 4);
            writer.to_bytes()
        };
        context.add_compiled_def(CompiledDef {
            name: "sub".to_owned(),
            owner: None,
            args_bytesize: 0,
            local_vars: LocalVars::new(),
            return_type: types.int32,
            return_bytesize: 4,
            instructions: Arc::new(CompiledInstructions::new(code, nodes)),
        })
    };

    // the top-level body: a = 1 (line 10); sub (line 11); a (line 12)
    let mut nodes = NodeMap::new();
    let code = {
        let mut writer = BytecodeWriter::new();
        writer.write_opcode(Opcode::pry);
        let addr = writer.write_opcode_i32(Opcode::imm_i32, 1);
        nodes.insert(
            addr,
            Arc::new(AstNode::with_location("a = 1", "demo.icr", 10, 1)),
        );
        writer.write_opcode_i32_i32(Opcode::set_local, 0, 4);
        let addr = writer.write_opcode_i32(Opcode::call, sub_id);
        nodes.insert(
            addr,
            Arc::new(AstNode::with_location("sub", "demo.icr", 11, 1)),
        );
        writer.write_opcode_i32(Opcode::pop, 4);
        let addr = writer.write_opcode_i32_i32(Opcode::get_local, 0, 4);
        nodes.insert(addr, Arc::new(AstNode::with_location("a", "demo.icr", 12, 1)));
        writer.write_opcode_i32(Opcode::leave, 4);
        writer.to_bytes()
    };

    let mut meta_vars = MetaVars::new();
    meta_vars.declare("a", types.int32);

    let mut frontend = ScriptedFrontend::new();
    frontend.push_program(code, nodes, types.int32);
    frontend.set_gathered(meta_vars.clone(), 0);

    let output = SharedWriter::new();
    let mut interpreter = Interpreter::new(context);
    interpreter.set_pry_channel(
        Box::new(Cursor::new(b"next\nnext\ncontinue\n".to_vec())),
        Box::new(output.clone()),
    );

    let value = interpreter
        .interpret(&AstNode::new("..."), &meta_vars, &mut frontend)
        .unwrap();
    assert_eq!(value.as_i32(), 1);

    let text = output.text();
    let line10 = text.find("demo.icr:10").expect("stop at line 10");
    let line11 = text.find("demo.icr:11").expect("stop at line 11");
    let line12 = text.find("demo.icr:12").expect("stop at line 12");
    assert!(line10 < line11 && line11 < line12);

    // `next` stepped over the callee, never stopping on its line
    assert!(!text.contains("demo.icr:20"));
}

#[test]
fn test_expressions_run_against_the_live_locals() {
    let context = Arc::new(Context::new());
    let types = register_basic_types(&context);

    // a = 1 (line 10); a = a + 4 (line 11); a (line 12)
    let mut nodes = NodeMap::new();
    let code = {
        let mut writer = BytecodeWriter::new();
        writer.write_opcode(Opcode::pry);
        let addr = writer.write_opcode_i32(Opcode::imm_i32, 1);
        nodes.insert(
            addr,
            Arc::new(AstNode::with_location("a = 1", "demo.icr", 10, 1)),
        );
        writer.write_opcode_i32_i32(Opcode::set_local, 0, 4);
        let addr = writer.write_opcode_i32_i32(Opcode::get_local, 0, 4);
        nodes.insert(
            addr,
            Arc::new(AstNode::with_location("a = a + 4", "demo.icr", 11, 1)),
        );
        writer.write_opcode_i32(Opcode::imm_i32, 4);
        writer.write_opcode(Opcode::add_i32);
        writer.write_opcode_i32_i32(Opcode::set_local, 0, 4);
        let addr = writer.write_opcode_i32_i32(Opcode::get_local, 0, 4);
        nodes.insert(addr, Arc::new(AstNode::with_location("a", "demo.icr", 12, 1)));
        writer.write_opcode_i32(Opcode::leave, 4);
        writer.to_bytes()
    };

    let mut meta_vars = MetaVars::new();
    meta_vars.declare("a", types.int32);

    // the debugger expression `a`
    let expression_a = {
        let mut writer = BytecodeWriter::new();
        writer.write_opcode_i32_i32(Opcode::get_local, 0, 4);
        writer.write_opcode_i32(Opcode::leave, 4);
        writer.to_bytes()
    };

    let mut frontend = ScriptedFrontend::new();
    frontend.push_program(code, nodes, types.int32);
    frontend.set_gathered(meta_vars.clone(), 0);
    frontend.add_expression("a", expression_a, types.int32);

    // stop at line 10 (a still 0), inspect, step to line 11 (a == 1),
    // inspect again, then run free
    let output = SharedWriter::new();
    let mut interpreter = Interpreter::new(context);
    interpreter.set_pry_channel(
        Box::new(Cursor::new(b"a\nstep\na\ncontinue\n".to_vec())),
        Box::new(output.clone()),
    );

    let value = interpreter
        .interpret(&AstNode::new("..."), &meta_vars, &mut frontend)
        .unwrap();
    assert_eq!(value.as_i32(), 5);

    let text = output.text();
    let first = text.find("=> 0").expect("a reads 0 before the assignment");
    let second = text.find("=> 1").expect("a reads 1 at the next line");
    assert!(first < second);

    // an unknown input is treated as an expression and reported
    assert!(!text.contains("error:"));
}

#[test]
fn test_pry_preserves_operands_beyond_the_locals() {
    let context = Arc::new(Context::new());
    let types = register_basic_types(&context);

    // an operand is live on the stack when the stop happens; the
    // debugger expression evaluation scribbles over that region and
    // the session must restore it
    let mut nodes = NodeMap::new();
    let code = {
        let mut writer = BytecodeWriter::new();
        writer.write_opcode_i64(Opcode::imm_i64, 42);
        writer.write_opcode(Opcode::pry);
        let addr = writer.write_opcode(Opcode::nop);
        nodes.insert(
            addr,
            Arc::new(AstNode::with_location("rest", "demo.icr", 10, 1)),
        );
        // consume the pending operand only after the stop
        writer.write_opcode_i32(Opcode::pop, 8);
        writer.write_opcode_i32(Opcode::imm_i32, 3);
        writer.write_opcode_i32(Opcode::leave, 4);
        writer.to_bytes()
    };

    let expression_one = {
        let mut writer = BytecodeWriter::new();
        writer.write_opcode_i32(Opcode::imm_i32, 1);
        writer.write_opcode_i32(Opcode::leave, 4);
        writer.to_bytes()
    };

    let mut frontend = ScriptedFrontend::new();
    frontend.push_program(code, nodes, types.int32);
    frontend.add_expression("1", expression_one, types.int32);

    let output = SharedWriter::new();
    let mut interpreter = Interpreter::new(context);
    interpreter.set_pry_channel(
        Box::new(Cursor::new(b"1\ncontinue\n".to_vec())),
        Box::new(output.clone()),
    );

    let value = interpreter
        .interpret(&AstNode::new("..."), &MetaVars::new(), &mut frontend)
        .unwrap();

    // the pending operand survived the nested evaluation
    assert_eq!(value.as_i32(), 3);
    assert!(output.text().contains("=> 1"));
}

#[test]
fn test_whereami_and_disassemble() {
    let context = Arc::new(Context::new());
    let types = register_basic_types(&context);

    let mut nodes = NodeMap::new();
    let code = {
        let mut writer = BytecodeWriter::new();
        writer.write_opcode(Opcode::pry);
        let addr = writer.write_opcode_i32(Opcode::imm_i32, 9);
        nodes.insert(
            addr,
            Arc::new(AstNode::with_location("9", "demo.icr", 10, 1)),
        );
        writer.write_opcode_i32(Opcode::leave, 4);
        writer.to_bytes()
    };

    let mut frontend = ScriptedFrontend::new();
    frontend.push_program(code, nodes, types.int32);

    let output = SharedWriter::new();
    let mut interpreter = Interpreter::new(context);
    interpreter.set_pry_channel(
        Box::new(Cursor::new(b"whereami\ndisassemble\ncontinue\n".to_vec())),
        Box::new(output.clone()),
    );

    let value = interpreter
        .interpret(&AstNode::new("9"), &MetaVars::new(), &mut frontend)
        .unwrap();
    assert_eq!(value.as_i32(), 9);

    let text = output.text();
    assert!(text.contains("demo.icr:10"));
    // the disassembly of the stopped def
    assert!(text.contains("imm_i32"));
    assert!(text.contains("leave"));
}
