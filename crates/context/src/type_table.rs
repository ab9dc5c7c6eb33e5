// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// value representations
// ---------------------
//
// | type              | inner size | representation                     |
// |-------------------|------------|------------------------------------|
// | Nil               | 0          | nothing                            |
// | Bool              | 1          | 0 or 1                             |
// | IntN / FloatN     | N/8        | little-endian / IEEE 754           |
// | Pointer           | 8          | host address                       |
// | reference types   | 8          | address of a heap object whose     |
// |                   |            | first 8 bytes are its type id      |
// | mixed union       | 8 + max    | 8-byte type-id tag followed by the |
// |                   |            | widest member payload              |
//
// type ids are assigned at registration time and never change while any
// interpreter runs against the table.

use std::collections::HashMap;

use icr_isa::align_up;

pub type TypeId = i32;

/// The bytesize of a heap object's type-id header, which is also the
/// bytesize of a mixed union's tag.
pub const TYPE_ID_HEADER_BYTES: usize = 8;

#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum TypeDesc {
    Nil,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt64,
    Float32,
    Float64,
    Pointer,
    /// A class instance, stored as the address of its heap object.
    Reference(String),
    NilableReference(String),
    ReferenceUnion(Vec<TypeId>),
    Virtual(String),
    MixedUnion(Vec<TypeId>),
}

pub struct TypeTable {
    types: Vec<TypeDesc>,
    index: HashMap<TypeDesc, TypeId>,
}

impl TypeTable {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let mut table = Self {
            types: Vec::new(),
            index: HashMap::new(),
        };
        // Nil is always type id 0, it doubles as the "no type" tag of a
        // zeroed mixed-union slot.
        table.register(&TypeDesc::Nil);
        table
    }

    pub fn register(&mut self, desc: &TypeDesc) -> TypeId {
        if let Some(id) = self.index.get(desc) {
            return *id;
        }
        let id = self.types.len() as TypeId;
        self.types.push(desc.clone());
        self.index.insert(desc.clone(), id);
        id
    }

    pub fn get(&self, type_id: TypeId) -> TypeDesc {
        if type_id < 0 || type_id as usize >= self.types.len() {
            panic!("BUG: unknown type id {}", type_id);
        }
        self.types[type_id as usize].clone()
    }

    pub fn inner_sizeof(&self, type_id: TypeId) -> usize {
        match self.get(type_id) {
            TypeDesc::Nil => 0,
            TypeDesc::Bool | TypeDesc::Int8 => 1,
            TypeDesc::Int16 => 2,
            TypeDesc::Int32 | TypeDesc::Float32 => 4,
            TypeDesc::Int64 | TypeDesc::UInt64 | TypeDesc::Float64 | TypeDesc::Pointer => 8,
            TypeDesc::Reference(_) | TypeDesc::NilableReference(_) | TypeDesc::Virtual(_) => 8,
            TypeDesc::ReferenceUnion(_) => 8,
            TypeDesc::MixedUnion(members) => {
                let payload = members
                    .iter()
                    .map(|member| self.aligned_sizeof(*member))
                    .max()
                    .unwrap_or(0);
                TYPE_ID_HEADER_BYTES + payload
            }
        }
    }

    pub fn aligned_sizeof(&self, type_id: TypeId) -> usize {
        align_up(self.inner_sizeof(type_id))
    }

    pub fn is_mixed_union(&self, type_id: TypeId) -> bool {
        matches!(self.get(type_id), TypeDesc::MixedUnion(_))
    }

    /// True for the types stored as a bare heap address whose referent
    /// carries a type-id header.
    pub fn is_reference_like(&self, type_id: TypeId) -> bool {
        matches!(
            self.get(type_id),
            TypeDesc::Reference(_)
                | TypeDesc::NilableReference(_)
                | TypeDesc::ReferenceUnion(_)
                | TypeDesc::Virtual(_)
        )
    }

    pub fn name(&self, type_id: TypeId) -> String {
        match self.get(type_id) {
            TypeDesc::Nil => "Nil".to_owned(),
            TypeDesc::Bool => "Bool".to_owned(),
            TypeDesc::Int8 => "Int8".to_owned(),
            TypeDesc::Int16 => "Int16".to_owned(),
            TypeDesc::Int32 => "Int32".to_owned(),
            TypeDesc::Int64 => "Int64".to_owned(),
            TypeDesc::UInt64 => "UInt64".to_owned(),
            TypeDesc::Float32 => "Float32".to_owned(),
            TypeDesc::Float64 => "Float64".to_owned(),
            TypeDesc::Pointer => "Pointer".to_owned(),
            TypeDesc::Reference(name) => name,
            TypeDesc::NilableReference(name) => format!("{}?", name),
            TypeDesc::Virtual(name) => format!("{}+", name),
            TypeDesc::ReferenceUnion(members) | TypeDesc::MixedUnion(members) => {
                let names = members
                    .iter()
                    .map(|member| self.name(*member))
                    .collect::<Vec<String>>();
                format!("({})", names.join(" | "))
            }
        }
    }
}
