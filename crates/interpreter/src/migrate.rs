// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// local-variable migration
// ------------------------
//
// a re-entered session still has the previous run's locals at the base
// of the stack, laid out by the previous type environment. the new
// semantic analysis may have widened some variables (a union gained
// members), which changes their aligned sizes and therefore every
// later offset.
//
// when no aligned size changed the bytes are reused in place, only the
// layout object is replaced. otherwise the whole region is copied to a
// scratch buffer and rebuilt variable by variable:
//
//   scratch:  | x: Int32 | y: Bool |
//                  |          \----------------------\
//                  v                                 v
//   stack:    | x: tag + payload (mixed union) | y: Bool |
//
// the only supported widenings produce a mixed union; every other type
// change of a persisted variable is fatal.

use icr_context::{MetaVars, TYPE_ID_HEADER_BYTES};

use crate::interpreter::Interpreter;

pub(crate) fn migrate_local_vars(interpreter: &mut Interpreter, meta_vars: &MetaVars) {
    let context = interpreter.context.clone();
    let previous = std::mem::take(&mut interpreter.current_local_vars);
    let new_local_vars = context.local_vars_from_meta_vars(meta_vars);
    let new_max_bytesize = new_local_vars.max_bytesize();

    // first run of the session, nothing to reconcile
    if previous.entries().is_empty() {
        interpreter.stack.truncate_to(0);
        interpreter.stack.grow_by(new_max_bytesize);
        interpreter.current_local_vars = new_local_vars;
        return;
    }

    let sizes_changed = previous
        .entries()
        .iter()
        .filter(|entry| entry.block_level == 0)
        .any(|entry| match meta_vars.get(&entry.name) {
            Some(new_type_id) => {
                context.aligned_sizeof_type(new_type_id) != entry.aligned_bytesize
            }
            None => false,
        });

    if !sizes_changed {
        // the bytes are valid in place even when a union's member set
        // differed, the fresh layout has the same offsets
        let old_top = interpreter.stack.top();
        if new_max_bytesize > old_top {
            interpreter.stack.grow_by(new_max_bytesize - old_top);
        } else {
            interpreter.stack.truncate_to(new_max_bytesize);
        }
        interpreter.current_local_vars = new_local_vars;
        return;
    }

    // copy the whole current-locals region out, then walk the names in
    // order from the base of the stack
    let old_total = previous.max_bytesize();
    let mut scratch = vec![0u8; old_total];
    unsafe {
        std::ptr::copy(
            interpreter.stack.get_ptr(0),
            scratch.as_mut_ptr(),
            old_total,
        );
    }
    interpreter.stack.truncate_to(0);
    interpreter.stack.grow_by(new_max_bytesize);

    for new_entry in new_local_vars
        .entries()
        .iter()
        .filter(|entry| entry.block_level == 0)
    {
        let Some(old_entry) = previous.find(&new_entry.name, 0) else {
            // a variable new to this run, its slot stays zeroed
            continue;
        };
        let old_bytes = &scratch[old_entry.offset..old_entry.offset + old_entry.aligned_bytesize];

        if old_entry.aligned_bytesize == new_entry.aligned_bytesize {
            // unchanged width, copied back verbatim
            write_bytes(interpreter, new_entry.offset, old_bytes);
            continue;
        }

        if !context.is_mixed_union(new_entry.type_id) {
            panic!(
                "can't change the type of local variable {} from {} to {}, \
                 only widening into a mixed union is supported",
                new_entry.name,
                context.type_name(old_entry.type_id),
                context.type_name(new_entry.type_id)
            );
        }

        if context.is_mixed_union(old_entry.type_id) {
            // a union that grew: the tag and the old payload are copied
            // verbatim into the wider slot
            let old_inner = context.inner_sizeof_type(old_entry.type_id);
            write_bytes(interpreter, new_entry.offset, &old_bytes[..old_inner]);
        } else if context.is_reference_like(old_entry.type_id) {
            // the referent's header supplies the tag; a null reference
            // becomes a zeroed (nil) slot
            let pointer = u64::from_le_bytes(old_bytes[0..8].try_into().unwrap());
            if pointer != 0 {
                let tag = unsafe { std::ptr::read_unaligned(pointer as *const i64) };
                interpreter.stack.write(new_entry.offset, tag);
                interpreter
                    .stack
                    .write(new_entry.offset + TYPE_ID_HEADER_BYTES, pointer);
            }
        } else {
            // a plain value: its type id becomes the tag, the value
            // becomes the payload
            let old_inner = context.inner_sizeof_type(old_entry.type_id);
            interpreter
                .stack
                .write(new_entry.offset, old_entry.type_id as i64);
            write_bytes(
                interpreter,
                new_entry.offset + TYPE_ID_HEADER_BYTES,
                &old_bytes[..old_inner],
            );
        }
    }

    interpreter.current_local_vars = new_local_vars;
}

fn write_bytes(interpreter: &mut Interpreter, offset: usize, bytes: &[u8]) {
    unsafe {
        std::ptr::copy(
            bytes.as_ptr(),
            interpreter.stack.get_mut_ptr(offset),
            bytes.len(),
        );
    }
}
