// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// the native function descriptor
// ------------------------------
//
// a LibFunction record describes one native C function. it carries a
// call interface (a prepared libffi `ffi_cif`), the resolved function
// pointer, and one optional call interface per argument for arguments
// that are interpreter procedures to be wrapped as native callbacks.
//
// the records are produced by the semantic analyzer, the interpreter
// only consumes them at `lib_call`.

use std::{ffi::c_void, ptr::addr_of_mut};

use libffi::raw::{
    ffi_abi_FFI_DEFAULT_ABI, ffi_cif, ffi_prep_cif, ffi_status_FFI_OK, ffi_type,
    ffi_type_double, ffi_type_float, ffi_type_pointer, ffi_type_sint16, ffi_type_sint32,
    ffi_type_sint64, ffi_type_sint8, ffi_type_uint16, ffi_type_uint32, ffi_type_uint64,
    ffi_type_uint8, ffi_type_void,
};

use crate::compiled_unit::PROC_VALUE_SIZE_IN_BYTES;

/// The value types the native ABI boundary understands.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FfiValueType {
    UInt8,
    SInt8,
    UInt16,
    SInt16,
    UInt32,
    SInt32,
    UInt64,
    SInt64,
    Float32,
    Float64,
    Pointer,
    Void,
}

impl FfiValueType {
    pub fn bytesize(&self) -> usize {
        match self {
            FfiValueType::UInt8 | FfiValueType::SInt8 => 1,
            FfiValueType::UInt16 | FfiValueType::SInt16 => 2,
            FfiValueType::UInt32 | FfiValueType::SInt32 | FfiValueType::Float32 => 4,
            FfiValueType::UInt64
            | FfiValueType::SInt64
            | FfiValueType::Float64
            | FfiValueType::Pointer => 8,
            FfiValueType::Void => 0,
        }
    }

    fn ffi_type_ptr(&self) -> *mut ffi_type {
        unsafe {
            match self {
                FfiValueType::UInt8 => addr_of_mut!(ffi_type_uint8),
                FfiValueType::SInt8 => addr_of_mut!(ffi_type_sint8),
                FfiValueType::UInt16 => addr_of_mut!(ffi_type_uint16),
                FfiValueType::SInt16 => addr_of_mut!(ffi_type_sint16),
                FfiValueType::UInt32 => addr_of_mut!(ffi_type_uint32),
                FfiValueType::SInt32 => addr_of_mut!(ffi_type_sint32),
                FfiValueType::UInt64 => addr_of_mut!(ffi_type_uint64),
                FfiValueType::SInt64 => addr_of_mut!(ffi_type_sint64),
                FfiValueType::Float32 => addr_of_mut!(ffi_type_float),
                FfiValueType::Float64 => addr_of_mut!(ffi_type_double),
                FfiValueType::Pointer => addr_of_mut!(ffi_type_pointer),
                FfiValueType::Void => addr_of_mut!(ffi_type_void),
            }
        }
    }
}

/// A prepared native call interface, i.e. an owned `ffi_cif`.
pub struct CallInterface {
    cif: Box<ffi_cif>,
    // the cif points into this array
    _arg_type_pointers: Box<[*mut ffi_type]>,
    arg_types: Vec<FfiValueType>,
    return_type: FfiValueType,
}

// The raw pointers inside only refer to the boxed members and to the
// process-wide static ffi_type descriptors.
unsafe impl Send for CallInterface {}
unsafe impl Sync for CallInterface {}

impl CallInterface {
    pub fn new(arg_types: &[FfiValueType], return_type: FfiValueType) -> Self {
        let mut arg_type_pointers = arg_types
            .iter()
            .map(|arg_type| arg_type.ffi_type_ptr())
            .collect::<Vec<*mut ffi_type>>()
            .into_boxed_slice();

        let mut cif = Box::new(unsafe { std::mem::zeroed::<ffi_cif>() });
        let status = unsafe {
            ffi_prep_cif(
                &mut *cif,
                ffi_abi_FFI_DEFAULT_ABI,
                arg_types.len() as u32,
                return_type.ffi_type_ptr(),
                arg_type_pointers.as_mut_ptr(),
            )
        };
        if status != ffi_status_FFI_OK {
            panic!(
                "BUG: preparing a native call interface failed, status {}",
                status
            );
        }

        Self {
            cif,
            _arg_type_pointers: arg_type_pointers,
            arg_types: arg_types.to_vec(),
            return_type,
        }
    }

    pub fn cif_ptr(&self) -> *mut ffi_cif {
        &*self.cif as *const ffi_cif as *mut ffi_cif
    }

    pub fn arg_types(&self) -> &[FfiValueType] {
        &self.arg_types
    }

    pub fn return_type(&self) -> FfiValueType {
        self.return_type
    }

    pub fn arg_bytesizes(&self) -> Vec<usize> {
        self.arg_types
            .iter()
            .map(|arg_type| arg_type.bytesize())
            .collect()
    }

    pub fn return_bytesize(&self) -> usize {
        self.return_type.bytesize()
    }
}

/// One native function as seen from `lib_call`.
pub struct LibFunction {
    pub name: String,
    pub call_interface: CallInterface,
    pub function_pointer: *const c_void,
    /// A non-empty entry at index `i` means argument `i` is an
    /// interpreter procedure with the given native signature, to be
    /// wrapped as a callback at the call boundary.
    pub proc_call_interfaces: Vec<Option<CallInterface>>,
    /// The raw bytesize each argument occupies on the value stack.
    /// Procedure arguments occupy `PROC_VALUE_SIZE_IN_BYTES` before they
    /// are wrapped.
    pub arg_stack_bytesizes: Vec<usize>,
}

unsafe impl Send for LibFunction {}
unsafe impl Sync for LibFunction {}

impl LibFunction {
    pub fn new(
        name: &str,
        arg_types: &[FfiValueType],
        return_type: FfiValueType,
        function_pointer: *const c_void,
        proc_call_interfaces: Vec<Option<CallInterface>>,
    ) -> Self {
        if proc_call_interfaces.len() != arg_types.len() {
            panic!(
                "BUG: lib function {} declares {} arguments but {} proc entries",
                name,
                arg_types.len(),
                proc_call_interfaces.len()
            );
        }

        let arg_stack_bytesizes = arg_types
            .iter()
            .zip(proc_call_interfaces.iter())
            .map(|(arg_type, proc_interface)| {
                if proc_interface.is_some() {
                    PROC_VALUE_SIZE_IN_BYTES
                } else {
                    arg_type.bytesize()
                }
            })
            .collect();

        Self {
            name: name.to_owned(),
            call_interface: CallInterface::new(arg_types, return_type),
            function_pointer,
            proc_call_interfaces,
            arg_stack_bytesizes,
        }
    }

    pub fn return_bytesize(&self) -> usize {
        self.call_interface.return_bytesize()
    }
}
