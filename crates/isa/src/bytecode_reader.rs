// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use crate::opcode::{Opcode, OperandKind};

// format the bytecode as the following text:
//
// 0x0000  01 0b 00 00 00              imm_i32         11
// 0x0005  01 0d 00 00 00              imm_i32         13
// 0x000a  28                          add_i32
// 0x000b  5c 04 00 00 00              leave           4
//
pub fn format_bytecode_as_text(codes: &[u8]) -> String {
    let mut lines: Vec<String> = Vec::new();

    let code_length = codes.len(); // in bytes
    let mut offset = 0; // in bytes

    while offset < code_length {
        let opcode_num = codes[offset];
        let Some(opcode) = Opcode::from_u8(opcode_num) else {
            lines.push(format!(
                "0x{:04x}  {:02x}{:26}  <invalid opcode>",
                offset, opcode_num, ""
            ));
            offset += 1;
            continue;
        };

        let instruction_length = opcode.instruction_length();
        let instruction_bytes = &codes[offset..(offset + instruction_length).min(code_length)];

        let binary = instruction_bytes
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect::<Vec<String>>()
            .join(" ");

        let mut params: Vec<String> = Vec::new();
        let mut param_offset = offset + 1;
        for kind in opcode.operand_layout() {
            match kind {
                OperandKind::I8 => {
                    params.push(format!("{}", codes[param_offset]));
                }
                OperandKind::I32 => {
                    let value = read_param_i32(codes, param_offset);
                    params.push(format!("{}", value));
                }
                OperandKind::I64 => {
                    let value = read_param_i64(codes, param_offset);
                    params.push(format!("0x{:x}", value));
                }
                OperandKind::F64 => {
                    let value = f64::from_bits(read_param_i64(codes, param_offset));
                    params.push(format!("{}", value));
                }
            }
            param_offset += kind.bytesize();
        }

        if params.is_empty() {
            lines.push(format!("0x{:04x}  {:28}  {}", offset, binary, opcode.get_name()));
        } else {
            lines.push(format!(
                "0x{:04x}  {:28}  {:16}{}",
                offset,
                binary,
                opcode.get_name(),
                params.join(" ")
            ));
        }

        offset += instruction_length;
    }

    lines.join("\n")
}

// format a byte region as the following text:
//
// 0x0000  00 11 22 33  44 55 66 77
// 0x0008  88 99 aa bb  cc dd ee ff
//
pub fn format_bytes_as_hex(data: &[u8]) -> String {
    data.chunks(8)
        .enumerate()
        .map(|(chunk_index, chunk)| {
            let binary = chunk
                .iter()
                .enumerate()
                .map(|(idx, byte)| {
                    if idx == 4 {
                        format!("  {:02x}", byte)
                    } else if idx == 0 {
                        format!("{:02x}", byte)
                    } else {
                        format!(" {:02x}", byte)
                    }
                })
                .collect::<Vec<String>>()
                .join("");

            format!("0x{:04x}  {}", chunk_index * 8, binary)
        })
        .collect::<Vec<String>>()
        .join("\n")
}

pub fn read_param_i32(codes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(codes[offset..offset + 4].try_into().unwrap())
}

pub fn read_param_i64(codes: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(codes[offset..offset + 8].try_into().unwrap())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        bytecode_reader::format_bytecode_as_text, bytecode_writer::BytecodeWriter, opcode::Opcode,
    };

    #[test]
    fn test_format_bytecode_as_text() {
        let code = {
            let mut writer = BytecodeWriter::new();
            writer.write_opcode_i32(Opcode::imm_i32, 11);
            writer.write_opcode_i32(Opcode::imm_i32, 13);
            writer.write_opcode(Opcode::add_i32);
            writer.write_opcode_i32(Opcode::leave, 4);
            writer.to_bytes()
        };

        let text = format_bytecode_as_text(&code);
        let lines = text.lines().collect::<Vec<&str>>();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("0x0000"));
        assert!(lines[0].contains("imm_i32"));
        assert!(lines[0].ends_with("11"));
        assert!(lines[1].starts_with("0x0005"));
        assert!(lines[2].starts_with("0x000a"));
        assert!(lines[2].ends_with("add_i32"));
        assert!(lines[3].contains("leave"));
    }
}
