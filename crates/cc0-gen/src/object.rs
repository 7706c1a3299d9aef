//! The binary assembler.
//!
//! Parses an assembly listing back into the VM's object-file format:
//!
//! 1. magic `0x43 0x30 0x3A 0x29`;
//! 2. version `0x00 0x00 0x00 0x01`;
//! 3. constants: count as u16, then per entry a type tag (0 = string
//!    with u16 length, 1 = int as i32, 2 = double as 8 IEEE-754 bytes);
//! 4. start section: instruction count as u16, then the encoded
//!    instructions;
//! 5. function briefings: count as u16; then per `.F<k>:` section the
//!    name index, parameter size, level (always 1), and instruction
//!    count, each u16, followed by the encoded instructions.
//!
//! Instructions encode as the opcode byte followed by each operand
//! big-endian at the width the opcode table declares.

use byteorder::{BigEndian, WriteBytesExt};
use cc0_ir::Opcode;

use crate::error::AssembleError;

const MAGIC: [u8; 4] = [0x43, 0x30, 0x3a, 0x29];
const VERSION: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// Assemble a textual listing into the binary object format.
pub fn assemble_binary(listing: &str) -> Result<Vec<u8>, AssembleError> {
    let lines: Vec<&str> = listing.lines().collect();
    let mut out = Vec::new();
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&VERSION);

    let mut cursor = 0usize;
    let mut param_sizes: Vec<u16> = Vec::new();
    let mut current_fn: u16 = 0;

    while cursor < lines.len() {
        let line = lines[cursor].trim();
        if line.is_empty() {
            cursor += 1;
            continue;
        }
        if !line.starts_with('.') {
            return Err(AssembleError::MalformedListing {
                line: line.to_string(),
            });
        }

        if line == ".constants:" {
            cursor += 1;
            let section = collect_section(&lines, &mut cursor);
            write_count(&mut out, section.len())?;
            for entry in section {
                write_constant(&mut out, entry)?;
            }
        } else if line == ".start:" {
            cursor += 1;
            let section = collect_section(&lines, &mut cursor);
            write_count(&mut out, section.len())?;
            for entry in section {
                write_instruction(&mut out, entry)?;
            }
        } else if line == ".functions:" {
            cursor += 1;
            let section = collect_section(&lines, &mut cursor);
            write_count(&mut out, section.len())?;
            for entry in section {
                param_sizes.push(parse_briefing(entry)?);
            }
        } else if is_function_header(line) {
            cursor += 1;
            let section = collect_section(&lines, &mut cursor);
            let params = *param_sizes.get(usize::from(current_fn)).ok_or_else(|| {
                AssembleError::MalformedListing {
                    line: line.to_string(),
                }
            })?;
            put_u16(&mut out, current_fn);
            put_u16(&mut out, params);
            put_u16(&mut out, 1);
            write_count(&mut out, section.len())?;
            for entry in section {
                write_instruction(&mut out, entry)?;
            }
            current_fn += 1;
        } else {
            return Err(AssembleError::MalformedListing {
                line: line.to_string(),
            });
        }
    }

    Ok(out)
}

/// `.F<digits>:` possibly followed by a `# name` comment.
fn is_function_header(line: &str) -> bool {
    let Some(rest) = line.strip_prefix(".F") else {
        return false;
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    !digits.is_empty() && rest[digits.len()..].starts_with(':')
}

/// Advance past a run of non-empty, non-section lines, returning them.
fn collect_section<'a>(lines: &[&'a str], cursor: &mut usize) -> Vec<&'a str> {
    let mut section = Vec::new();
    while *cursor < lines.len() {
        let line = lines[*cursor].trim();
        if line.is_empty() || line.starts_with('.') {
            break;
        }
        section.push(line);
        *cursor += 1;
    }
    section
}

// Writing into a Vec cannot fail.
fn put_u8(out: &mut Vec<u8>, value: u8) {
    out.write_u8(value).expect("writes to a Vec are infallible");
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.write_u16::<BigEndian>(value).expect("writes to a Vec are infallible");
}

fn write_count(out: &mut Vec<u8>, count: usize) -> Result<(), AssembleError> {
    let count = u16::try_from(count).map_err(|_| {
        AssembleError::InconsistentProgram("section exceeds 65535 entries".into())
    })?;
    put_u16(out, count);
    Ok(())
}

/// `<index> <I|D|S> <literal>`
fn write_constant(out: &mut Vec<u8>, line: &str) -> Result<(), AssembleError> {
    let malformed = || AssembleError::MalformedListing {
        line: line.to_string(),
    };

    let mut fields = line.splitn(3, ' ');
    let _index = fields.next().ok_or_else(malformed)?;
    let kind = fields.next().ok_or_else(malformed)?;
    let value = fields.next().ok_or_else(malformed)?;

    match kind {
        "I" => {
            let parsed: i32 = value.parse().map_err(|_| malformed())?;
            put_u8(out, 1);
            out.extend_from_slice(&parsed.to_be_bytes());
        }
        "D" => {
            let digits = value.strip_prefix("0x").ok_or_else(malformed)?;
            if digits.len() != 16 {
                return Err(malformed());
            }
            let bits = u64::from_str_radix(digits, 16).map_err(|_| malformed())?;
            put_u8(out, 2);
            out.extend_from_slice(&bits.to_be_bytes());
        }
        "S" => {
            let body = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .ok_or_else(malformed)?;
            put_u8(out, 0);
            let len = u16::try_from(body.len()).map_err(|_| malformed())?;
            put_u16(out, len);
            out.extend_from_slice(body.as_bytes());
        }
        _ => return Err(malformed()),
    }
    Ok(())
}

/// `<idx> <nameIndex> <paramsSize> <level>`. Only the parameter size is
/// needed here; the name index is reproduced from section order.
fn parse_briefing(line: &str) -> Result<u16, AssembleError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let params = fields.get(2).ok_or_else(|| AssembleError::MalformedListing {
        line: line.to_string(),
    })?;
    params.parse().map_err(|_| AssembleError::MalformedListing {
        line: line.to_string(),
    })
}

/// `mnemonic [operand…]`, encoded at the opcode table's widths.
fn write_instruction(out: &mut Vec<u8>, line: &str) -> Result<(), AssembleError> {
    let mut fields = line.split_whitespace();
    let mnemonic = fields.next().ok_or_else(|| AssembleError::MalformedListing {
        line: line.to_string(),
    })?;
    let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| AssembleError::UnknownMnemonic {
        mnemonic: mnemonic.to_string(),
    })?;

    let operands: Vec<i64> = fields
        .map(|field| field.parse::<i64>())
        .collect::<Result<_, _>>()
        .map_err(|_| AssembleError::MalformedListing {
            line: line.to_string(),
        })?;
    if operands.len() != opcode.operand_count() {
        return Err(AssembleError::MalformedListing {
            line: line.to_string(),
        });
    }

    put_u8(out, opcode.code());
    for (&operand, &width) in operands.iter().zip(opcode.operand_widths()) {
        match width {
            1 => put_u8(out, (operand & 0xff) as u8),
            2 => put_u16(out, (operand & 0xffff) as u16),
            _ => out.extend_from_slice(&((operand & 0xffff_ffff) as u32).to_be_bytes()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_bytes() {
        let listing = ".constants:\n\n.start:\n\n.functions:\n";
        let bytes = assemble_binary(listing).unwrap();
        assert_eq!(
            &bytes[..8],
            &[0x43, 0x30, 0x3a, 0x29, 0x00, 0x00, 0x00, 0x01]
        );
    }

    #[test]
    fn test_empty_main_object() {
        let listing = ".constants:\n\
                       0 S \"main\"\n\
                       \n\
                       .start:\n\
                       \n\
                       .functions:\n\
                       0 0 0 1\n\
                       \n\
                       .F0:\t# main\n\
                       ipush 0\n\
                       iret\n";
        let bytes = assemble_binary(listing).unwrap();
        let expected: Vec<u8> = vec![
            0x43, 0x30, 0x3a, 0x29, // magic
            0x00, 0x00, 0x00, 0x01, // version
            0x00, 0x01, // one constant
            0x00, 0x00, 0x04, b'm', b'a', b'i', b'n', // 0 S "main"
            0x00, 0x00, // empty start section
            0x00, 0x01, // one function briefing
            0x00, 0x00, // name index 0
            0x00, 0x00, // zero parameters
            0x00, 0x01, // level 1
            0x00, 0x02, // two instructions
            0x02, 0x00, 0x00, 0x00, 0x00, // ipush 0
            0x89, // iret
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_constant_payloads() {
        let listing = ".constants:\n\
                       0 I -2\n\
                       1 D 0x4004000000000000\n\
                       2 S \"ab\"\n";
        let bytes = assemble_binary(listing).unwrap();
        let body = &bytes[8..];
        assert_eq!(body[..2], [0x00, 0x03]);
        assert_eq!(body[2..7], [0x01, 0xff, 0xff, 0xff, 0xfe]); // int -2
        assert_eq!(
            body[7..16],
            [0x02, 0x40, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        ); // double 2.5
        assert_eq!(body[16..21], [0x00, 0x00, 0x02, b'a', b'b']); // "ab"
    }

    #[test]
    fn test_operand_widths_and_endianness() {
        let listing = ".start:\n\
                       bipush 65\n\
                       loada 1 3\n\
                       jmp 18\n";
        let bytes = assemble_binary(listing).unwrap();
        let body = &bytes[8..];
        assert_eq!(body[..2], [0x00, 0x03]);
        assert_eq!(body[2..4], [0x01, 65]); // bipush 65
        assert_eq!(body[4..11], [0x0a, 0x00, 0x01, 0x00, 0x00, 0x00, 0x03]); // loada 1 3
        assert_eq!(body[11..14], [0x70, 0x00, 0x12]); // jmp 18
    }

    #[test]
    fn test_unknown_mnemonic_is_rejected() {
        let err = assemble_binary(".start:\nfly 1\n").unwrap_err();
        assert_eq!(
            err,
            AssembleError::UnknownMnemonic {
                mnemonic: "fly".to_string()
            }
        );
    }

    #[test]
    fn test_operand_count_is_checked() {
        let err = assemble_binary(".start:\nipush\n").unwrap_err();
        assert!(matches!(err, AssembleError::MalformedListing { .. }));
        let err = assemble_binary(".start:\nnop 3\n").unwrap_err();
        assert!(matches!(err, AssembleError::MalformedListing { .. }));
    }

    #[test]
    fn test_stray_text_is_rejected() {
        let err = assemble_binary("hello\n").unwrap_err();
        assert!(matches!(err, AssembleError::MalformedListing { .. }));
    }

    #[test]
    fn test_function_header_recognition() {
        assert!(is_function_header(".F0:"));
        assert!(is_function_header(".F12:\t# main"));
        assert!(!is_function_header(".Fx:"));
        assert!(!is_function_header(".functions:"));
        assert!(!is_function_header("F0:"));
    }
}
