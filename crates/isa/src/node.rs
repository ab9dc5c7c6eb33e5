// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::{collections::HashMap, fmt::Display, sync::Arc};

/// A position in the program source.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SourceLocation {
    pub filename: String,
    pub line: u32,
    pub column: u32,
}

impl Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.filename, self.line, self.column)
    }
}

/// The slice of the typed syntax tree an instruction was lowered from.
///
/// The interpreter only consumes the source location (tracing and the
/// debugger stop on line changes) and the printable expression text, the
/// full tree stays with the front end.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AstNode {
    pub expression: String,
    pub location: Option<SourceLocation>,
}

impl AstNode {
    pub fn new(expression: &str) -> Self {
        Self {
            expression: expression.to_owned(),
            location: None,
        }
    }

    pub fn with_location(expression: &str, filename: &str, line: u32, column: u32) -> Self {
        Self {
            expression: expression.to_owned(),
            location: Some(SourceLocation {
                filename: filename.to_owned(),
                line,
                column,
            }),
        }
    }
}

/// Sparse map from instruction offset to the node it was lowered from.
/// A missing entry is never an error.
pub type NodeMap = HashMap<usize, Arc<AstNode>>;
