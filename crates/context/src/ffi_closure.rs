// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// inbound closures
// ----------------
//
// when an interpreter procedure is passed to native code, a libffi
// closure is built whose code pointer is a callable C function. invoking
// it lands in the dispatcher the interpreter supplied (`FfiClosureFun`)
// with the closure context as userdata; the dispatcher re-enters the
// dispatch loop on the captured interpreter.
//
// the context keeps every handle alive until it is dropped, so a closure
// always outlives the native call it was created for.

use std::{ffi::c_void, mem::size_of, ptr::null_mut};

use libffi::raw::{
    ffi_cif, ffi_closure, ffi_closure_alloc, ffi_closure_free, ffi_prep_closure_loc,
    ffi_status_FFI_OK,
};

use crate::compiled_unit::CallableId;

/// The inbound dispatcher signature, the raw libffi closure callback.
pub type FfiClosureFun = unsafe extern "C" fn(
    cif: *mut ffi_cif,
    result: *mut c_void,
    args: *mut *mut c_void,
    userdata: *mut c_void,
);

/// What an inbound callback needs to re-enter the interpreter: the
/// interpreter itself (opaque at this layer), the procedure to run, and
/// the shape of the native arguments.
pub struct FfiClosureContext {
    pub interpreter: *mut c_void,
    pub callable_id: CallableId,
    pub arg_bytesizes: Vec<usize>,
    pub return_bytesize: usize,
}

pub(crate) struct FfiClosureHandle {
    writable: *mut c_void,
    code: *const c_void,
    _context: Box<FfiClosureContext>,
}

unsafe impl Send for FfiClosureHandle {}

impl FfiClosureHandle {
    /// Safety: `cif_ptr` must stay valid for the life of the handle, the
    /// context registry guarantees this by keeping the owning
    /// `LibFunction` records alive.
    pub fn new(cif_ptr: *mut ffi_cif, context: FfiClosureContext, fun: FfiClosureFun) -> Self {
        let context_box = Box::new(context);

        let mut code: *mut c_void = null_mut();
        let writable = unsafe { ffi_closure_alloc(size_of::<ffi_closure>(), &mut code) };
        if writable.is_null() {
            panic!("BUG: allocating a native closure failed");
        }

        let status = unsafe {
            ffi_prep_closure_loc(
                writable as *mut ffi_closure,
                cif_ptr,
                Some(fun),
                &*context_box as *const FfiClosureContext as *mut c_void,
                code,
            )
        };
        if status != ffi_status_FFI_OK {
            unsafe { ffi_closure_free(writable) };
            panic!("BUG: preparing a native closure failed, status {}", status);
        }

        Self {
            writable,
            code,
            _context: context_box,
        }
    }

    pub fn code_pointer(&self) -> *const c_void {
        self.code
    }
}

impl Drop for FfiClosureHandle {
    fn drop(&mut self) {
        unsafe { ffi_closure_free(self.writable) };
    }
}
