// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// helpers shared by the end-to-end tests: a context pre-loaded with the
// primitive types, and a scripted front end that hands out canned
// instruction streams the way the real compiler would.

#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    io::Write,
    sync::{Arc, Mutex},
};

use icr_context::{
    CompiledDef, CompiledInstructions, Context, LocalVars, MetaVars, TypeDesc, TypeId,
};
use icr_interpreter::{Frontend, FrontendError};
use icr_isa::node::{AstNode, NodeMap, SourceLocation};

pub struct TestTypes {
    pub nil: TypeId,
    pub bool_: TypeId,
    pub int32: TypeId,
    pub int64: TypeId,
    pub float64: TypeId,
    pub pointer: TypeId,
}

pub fn register_basic_types(context: &Context) -> TestTypes {
    TestTypes {
        nil: context.type_id(&TypeDesc::Nil),
        bool_: context.type_id(&TypeDesc::Bool),
        int32: context.type_id(&TypeDesc::Int32),
        int64: context.type_id(&TypeDesc::Int64),
        float64: context.type_id(&TypeDesc::Float64),
        pointer: context.type_id(&TypeDesc::Pointer),
    }
}

/// A front end whose outputs are scripted by the test: `compile` hands
/// out the queued programs in order, `compile_expression` looks the
/// source text up in a table.
pub struct ScriptedProgram {
    pub code: Vec<u8>,
    pub nodes: NodeMap,
    pub result_type: TypeId,
    /// extra (block-level) locals the compiler would declare while
    /// lowering: (name, block_level, type, aligned bytesize)
    pub declares: Vec<(String, usize, TypeId, usize)>,
}

pub struct ScriptedFrontend {
    programs: VecDeque<ScriptedProgram>,
    expressions: HashMap<String, (Vec<u8>, TypeId)>,
    gathered: Option<(MetaVars, usize)>,
}

impl ScriptedFrontend {
    pub fn new() -> Self {
        Self {
            programs: VecDeque::new(),
            expressions: HashMap::new(),
            gathered: None,
        }
    }

    pub fn push_program(&mut self, code: Vec<u8>, nodes: NodeMap, result_type: TypeId) {
        self.programs.push_back(ScriptedProgram {
            code,
            nodes,
            result_type,
            declares: Vec::new(),
        });
    }

    pub fn push_program_with_locals(
        &mut self,
        code: Vec<u8>,
        nodes: NodeMap,
        result_type: TypeId,
        declares: Vec<(String, usize, TypeId, usize)>,
    ) {
        self.programs.push_back(ScriptedProgram {
            code,
            nodes,
            result_type,
            declares,
        });
    }

    pub fn add_expression(&mut self, source: &str, code: Vec<u8>, result_type: TypeId) {
        self.expressions
            .insert(source.to_owned(), (code, result_type));
    }

    pub fn set_gathered(&mut self, meta_vars: MetaVars, block_level: usize) {
        self.gathered = Some((meta_vars, block_level));
    }
}

impl Frontend for ScriptedFrontend {
    fn compile(
        &mut self,
        _context: &Arc<Context>,
        local_vars: &mut LocalVars,
        _node: &AstNode,
    ) -> Result<(CompiledInstructions, TypeId), FrontendError> {
        let program = self
            .programs
            .pop_front()
            .expect("no more scripted programs");
        for (name, block_level, type_id, aligned_bytesize) in &program.declares {
            local_vars.declare(name, *block_level, *type_id, *aligned_bytesize);
        }
        Ok((
            CompiledInstructions::new(program.code, program.nodes),
            program.result_type,
        ))
    }

    fn compile_expression(
        &mut self,
        _context: &Arc<Context>,
        _local_vars: &mut LocalVars,
        source: &str,
        _block_level: usize,
    ) -> Result<(CompiledInstructions, TypeId), FrontendError> {
        match self.expressions.get(source) {
            Some((code, result_type)) => Ok((
                CompiledInstructions::new(code.clone(), NodeMap::new()),
                *result_type,
            )),
            None => Err(FrontendError::new(&format!(
                "undefined method or variable: {}",
                source
            ))),
        }
    }

    fn gather_local_vars(
        &mut self,
        _compiled_def: &CompiledDef,
        _location: &SourceLocation,
    ) -> (MetaVars, usize) {
        self.gathered
            .clone()
            .unwrap_or_else(|| (MetaVars::new(), 0))
    }
}

/// A writer the test can inspect after the debugger session finished.
#[derive(Clone)]
pub struct SharedWriter {
    pub buffer: Arc<Mutex<Vec<u8>>>,
}

impl SharedWriter {
    pub fn new() -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).to_string()
    }
}

impl Write for SharedWriter {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
