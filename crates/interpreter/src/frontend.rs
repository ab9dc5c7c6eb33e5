// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::{fmt::Display, sync::Arc};

use icr_context::{CompiledDef, CompiledInstructions, Context, LocalVars, MetaVars, TypeId};
use icr_isa::node::{AstNode, SourceLocation};

/// A parse or semantic failure reported by the front end.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct FrontendError {
    pub message: String,
}

impl FrontendError {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_owned(),
        }
    }
}

impl Display for FrontendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for FrontendError {}

/// The compiler-side collaborators the interpreter drives: lowering a
/// typed tree (or a debugger input line) to an instruction stream, and
/// gathering the locals visible at a source location.
///
/// The interpreter never inspects programs, it only runs what the front
/// end hands over, so everything language-shaped lives behind this
/// trait.
pub trait Frontend {
    /// Lower a typed tree against the given local-variable layout. The
    /// layout may gain declarations. Returns the instruction stream and
    /// the static type of the resulting value.
    fn compile(
        &mut self,
        context: &Arc<Context>,
        local_vars: &mut LocalVars,
        node: &AstNode,
    ) -> Result<(CompiledInstructions, TypeId), FrontendError>;

    /// Parse, normalize, type-check and lower one debugger input line
    /// against the locals visible at the stop location.
    fn compile_expression(
        &mut self,
        context: &Arc<Context>,
        local_vars: &mut LocalVars,
        source: &str,
        block_level: usize,
    ) -> Result<(CompiledInstructions, TypeId), FrontendError>;

    /// The locals visible at a location inside a def, with the block
    /// nesting level of that location.
    fn gather_local_vars(
        &mut self,
        compiled_def: &CompiledDef,
        location: &SourceLocation,
    ) -> (MetaVars, usize);
}
