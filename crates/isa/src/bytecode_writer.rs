// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::io::Write;

use crate::opcode::Opcode;

/// Builds an instruction stream.
///
/// This is the writer the compiler emits through, and the unit tests use
/// it to assemble programs by hand. Forward branches are written with a
/// placeholder target first and patched once the target address is known:
///
/// ```rust
/// use icr_isa::bytecode_writer::BytecodeWriter;
/// use icr_isa::opcode::Opcode;
///
/// let mut writer = BytecodeWriter::new();
/// let branch_addr = writer.write_opcode_i32(Opcode::branch_if, 0);
/// writer.write_opcode_i32(Opcode::imm_i32, 11);
/// let target = writer.addr();
/// writer.patch_param_i32(branch_addr, target as u32);
/// ```
pub struct BytecodeWriter {
    buffer: Vec<u8>, // trait std::io::Write
}

/// note that the word 'i32' in these function names indicates a 32-bit
/// integer, which is equivalent to the 'uint32_t' in C or 'u32' in Rust.
/// do not confuse it with 'i32' in Rust, the same applies to the words
/// 'i8' and 'i64'.
impl BytecodeWriter {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            buffer: Vec::<u8>::new(),
        }
    }

    /// the address the next instruction will be written at
    pub fn addr(&self) -> usize {
        self.buffer.len()
    }

    fn write_i8(&mut self, value: u8) {
        self.buffer.write_all(&[value]).unwrap();
    }

    fn write_i32(&mut self, value: u32) {
        let data = value.to_le_bytes();
        self.buffer.write_all(&data).unwrap();
    }

    fn write_i64(&mut self, value: u64) {
        let data = value.to_le_bytes();
        self.buffer.write_all(&data).unwrap();
    }

    /// return the address of the instruction
    pub fn write_opcode(&mut self, opcode: Opcode) -> usize {
        let addr = self.addr();
        self.write_i8(opcode as u8);
        addr
    }

    pub fn write_opcode_i8(&mut self, opcode: Opcode, value: u8) -> usize {
        let addr = self.write_opcode(opcode);
        self.write_i8(value);
        addr
    }

    pub fn write_opcode_i32(&mut self, opcode: Opcode, value: u32) -> usize {
        let addr = self.write_opcode(opcode);
        self.write_i32(value);
        addr
    }

    pub fn write_opcode_i32_i32(&mut self, opcode: Opcode, param0: u32, param1: u32) -> usize {
        let addr = self.write_opcode(opcode);
        self.write_i32(param0);
        self.write_i32(param1);
        addr
    }

    pub fn write_opcode_i64(&mut self, opcode: Opcode, value: u64) -> usize {
        let addr = self.write_opcode(opcode);
        self.write_i64(value);
        addr
    }

    pub fn write_opcode_f64(&mut self, opcode: Opcode, value: f64) -> usize {
        let addr = self.write_opcode(opcode);
        self.write_i64(value.to_bits());
        addr
    }

    /// overwrite the first i32 operand of the instruction written at
    /// `instruction_addr`, for fixing up forward branch targets
    pub fn patch_param_i32(&mut self, instruction_addr: usize, value: u32) {
        let data = value.to_le_bytes();
        self.buffer[instruction_addr + 1..instruction_addr + 5].copy_from_slice(&data);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.buffer.clone()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{bytecode_writer::BytecodeWriter, opcode::Opcode};

    #[test]
    fn test_write_instructions() {
        let code = {
            let mut writer = BytecodeWriter::new();
            writer.write_opcode_i32(Opcode::imm_i32, 11);
            writer.write_opcode_i32(Opcode::imm_i32, 13);
            writer.write_opcode(Opcode::add_i32);
            writer.write_opcode_i32(Opcode::leave, 4);
            writer.to_bytes()
        };

        assert_eq!(
            code,
            vec![
                0x01, 11, 0, 0, 0, // imm_i32 11
                0x01, 13, 0, 0, 0, // imm_i32 13
                0x28, // add_i32
                0x5c, 4, 0, 0, 0, // leave 4
            ]
        );
    }

    #[test]
    fn test_patch_branch_target() {
        let mut writer = BytecodeWriter::new();
        writer.write_opcode_i8(Opcode::imm_bool, 1);
        let branch_addr = writer.write_opcode_i32(Opcode::branch_if, 0);
        writer.write_opcode_i32(Opcode::imm_i32, 11);
        let target = writer.addr();
        writer.patch_param_i32(branch_addr, target as u32);

        let code = writer.to_bytes();
        let operand = u32::from_le_bytes(code[branch_addr + 1..branch_addr + 5].try_into().unwrap());
        assert_eq!(operand as usize, target);
    }
}
