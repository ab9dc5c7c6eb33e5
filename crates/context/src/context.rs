// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// the context
// -----------
//
// the process-wide state shared by every interpreter of one session:
//
// - the type table
// - the constants and class-variables memory
// - the compiled-callable registry
// - the native-function registry
// - the pool of live native closures
//
// interpreters own their value stack and call stack exclusively, the
// context owns everything above. a parent interpreter and the debugger
// children it spawns share one context, as do interpreters running in
// separate OS threads.

use std::{
    ffi::c_void,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use icr_isa::align_up;
use libffi::raw::ffi_cif;

use crate::{
    compiled_unit::{CallableId, CompiledBlock, CompiledCallable, CompiledDef},
    ffi_closure::{FfiClosureContext, FfiClosureFun, FfiClosureHandle},
    lib_function::LibFunction,
    local_vars::{LocalVars, MetaVars},
    type_table::{TypeDesc, TypeId, TypeTable},
    value_pool::ValuePool,
};

pub struct Context {
    type_table: Mutex<TypeTable>,

    pub constants: ValuePool,
    pub class_vars: ValuePool,

    // the slot totals declared by semantic analysis, the pools are
    // grown to these before each top-level invocation
    constants_bytesize: AtomicUsize,
    class_vars_bytesize: AtomicUsize,

    callables: Mutex<Vec<CompiledCallable>>,
    lib_functions: Mutex<Vec<Arc<LibFunction>>>,
    ffi_closures: Mutex<Vec<FfiClosureHandle>>,
}

impl Context {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            type_table: Mutex::new(TypeTable::new()),
            constants: ValuePool::new(),
            class_vars: ValuePool::new(),
            constants_bytesize: AtomicUsize::new(0),
            class_vars_bytesize: AtomicUsize::new(0),
            callables: Mutex::new(Vec::new()),
            lib_functions: Mutex::new(Vec::new()),
            ffi_closures: Mutex::new(Vec::new()),
        }
    }

    // type system

    pub fn type_id(&self, desc: &TypeDesc) -> TypeId {
        self.type_table.lock().unwrap().register(desc)
    }

    pub fn type_from_id(&self, type_id: TypeId) -> TypeDesc {
        self.type_table.lock().unwrap().get(type_id)
    }

    pub fn type_name(&self, type_id: TypeId) -> String {
        self.type_table.lock().unwrap().name(type_id)
    }

    pub fn inner_sizeof_type(&self, type_id: TypeId) -> usize {
        self.type_table.lock().unwrap().inner_sizeof(type_id)
    }

    pub fn aligned_sizeof_type(&self, type_id: TypeId) -> usize {
        self.type_table.lock().unwrap().aligned_sizeof(type_id)
    }

    pub fn is_mixed_union(&self, type_id: TypeId) -> bool {
        self.type_table.lock().unwrap().is_mixed_union(type_id)
    }

    pub fn is_reference_like(&self, type_id: TypeId) -> bool {
        self.type_table.lock().unwrap().is_reference_like(type_id)
    }

    pub fn align(&self, bytesize: usize) -> usize {
        align_up(bytesize)
    }

    // constants and class-variables memory

    pub fn declare_constants_bytesize(&self, total_bytesize: usize) {
        self.constants_bytesize
            .fetch_max(total_bytesize, Ordering::SeqCst);
    }

    pub fn declare_class_vars_bytesize(&self, total_bytesize: usize) {
        self.class_vars_bytesize
            .fetch_max(total_bytesize, Ordering::SeqCst);
    }

    /// Grow the pools to the declared totals. Called by the driver
    /// before each top-level invocation, while no interpreter holds
    /// pointers into the pools.
    pub fn prepare_value_pools(&self) {
        self.constants
            .resize(self.constants_bytesize.load(Ordering::SeqCst));
        self.class_vars
            .resize(self.class_vars_bytesize.load(Ordering::SeqCst));
    }

    // compiled callables

    pub fn add_compiled_def(&self, def: CompiledDef) -> CallableId {
        let mut callables = self.callables.lock().unwrap();
        let id = callables.len() as CallableId;
        callables.push(CompiledCallable::Def(Arc::new(def)));
        id
    }

    pub fn add_compiled_block(&self, block: CompiledBlock) -> CallableId {
        let mut callables = self.callables.lock().unwrap();
        let id = callables.len() as CallableId;
        callables.push(CompiledCallable::Block(Arc::new(block)));
        id
    }

    pub fn compiled_def(&self, callable_id: CallableId) -> Arc<CompiledDef> {
        let callables = self.callables.lock().unwrap();
        match callables.get(callable_id as usize) {
            Some(CompiledCallable::Def(def)) => def.clone(),
            Some(CompiledCallable::Block(_)) => {
                panic!("BUG: callable {} is a block, not a def", callable_id)
            }
            None => panic!("BUG: unknown callable id {}", callable_id),
        }
    }

    pub fn compiled_block(&self, callable_id: CallableId) -> Arc<CompiledBlock> {
        let callables = self.callables.lock().unwrap();
        match callables.get(callable_id as usize) {
            Some(CompiledCallable::Block(block)) => block.clone(),
            Some(CompiledCallable::Def(_)) => {
                panic!("BUG: callable {} is a def, not a block", callable_id)
            }
            None => panic!("BUG: unknown callable id {}", callable_id),
        }
    }

    // native functions

    pub fn add_lib_function(&self, lib_function: LibFunction) -> u32 {
        let mut lib_functions = self.lib_functions.lock().unwrap();
        let id = lib_functions.len() as u32;
        lib_functions.push(Arc::new(lib_function));
        id
    }

    pub fn lib_function(&self, lib_function_id: u32) -> Arc<LibFunction> {
        let lib_functions = self.lib_functions.lock().unwrap();
        match lib_functions.get(lib_function_id as usize) {
            Some(lib_function) => lib_function.clone(),
            None => panic!("BUG: unknown lib function id {}", lib_function_id),
        }
    }

    /// Build an inbound closure and return its callable code pointer.
    /// The handle is pooled on the context and reclaimed when the
    /// context is dropped.
    pub fn ffi_closure(
        &self,
        cif_ptr: *mut ffi_cif,
        closure_context: FfiClosureContext,
        fun: FfiClosureFun,
    ) -> *const c_void {
        let handle = FfiClosureHandle::new(cif_ptr, closure_context, fun);
        let code = handle.code_pointer();
        self.ffi_closures.lock().unwrap().push(handle);
        code
    }

    // local variables

    /// Lay the block-level-0 variables out in declaration order.
    pub fn local_vars_from_meta_vars(&self, meta_vars: &MetaVars) -> LocalVars {
        let table = self.type_table.lock().unwrap();
        let mut local_vars = LocalVars::new();
        for (name, type_id) in meta_vars.iter() {
            local_vars.declare(name, 0, type_id, table.aligned_sizeof(type_id));
        }
        local_vars
    }

    // diagnostics

    pub fn format_value(&self, type_id: TypeId, bytes: &[u8]) -> String {
        let desc = self.type_from_id(type_id);
        match desc {
            TypeDesc::Nil => "nil".to_owned(),
            TypeDesc::Bool => {
                if bytes.first().copied().unwrap_or(0) != 0 {
                    "true".to_owned()
                } else {
                    "false".to_owned()
                }
            }
            TypeDesc::Int8 => (bytes[0] as i8).to_string(),
            TypeDesc::Int16 => i16::from_le_bytes(bytes[0..2].try_into().unwrap()).to_string(),
            TypeDesc::Int32 => i32::from_le_bytes(bytes[0..4].try_into().unwrap()).to_string(),
            TypeDesc::Int64 => i64::from_le_bytes(bytes[0..8].try_into().unwrap()).to_string(),
            TypeDesc::UInt64 => u64::from_le_bytes(bytes[0..8].try_into().unwrap()).to_string(),
            TypeDesc::Float32 => {
                f32::from_le_bytes(bytes[0..4].try_into().unwrap()).to_string()
            }
            TypeDesc::Float64 => {
                f64::from_le_bytes(bytes[0..8].try_into().unwrap()).to_string()
            }
            TypeDesc::Pointer => {
                format!(
                    "0x{:016x}",
                    u64::from_le_bytes(bytes[0..8].try_into().unwrap())
                )
            }
            TypeDesc::Reference(_)
            | TypeDesc::NilableReference(_)
            | TypeDesc::ReferenceUnion(_)
            | TypeDesc::Virtual(_) => {
                let address = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
                if address == 0 {
                    "nil".to_owned()
                } else {
                    format!("#<{}:0x{:016x}>", self.type_name(type_id), address)
                }
            }
            TypeDesc::MixedUnion(_) => {
                let tag = i64::from_le_bytes(bytes[0..8].try_into().unwrap()) as TypeId;
                if tag == 0 {
                    "nil".to_owned()
                } else {
                    let payload_bytesize = self.inner_sizeof_type(tag);
                    self.format_value(tag, &bytes[8..8 + payload_bytesize])
                }
            }
        }
    }
}
