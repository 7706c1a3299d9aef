//! The text assembler.
//!
//! Renders the analyzed program as an assembly listing:
//!
//! ```text
//! .constants:
//! <index> <I|D|S> <literal>      function names first, then literals
//!
//! .start:
//! <instructions of the global initialization code>
//!
//! .functions:
//! <idx> <nameIndex> <paramsSize> <level>
//!
//! .F<idx>:	# <name>
//! <instructions of the function>
//! ```
//!
//! Pool indices are dense and start at 0 with the function names, which
//! is what makes `call <function index>` also a valid pool reference.
//! `loadc` operands still carrying the analyzer's non-positive sentinel
//! are translated here to `numberOfFunctions - sentinel`. Doubles are
//! rendered as `0x` plus their big-endian IEEE-754 bytes.

use std::fmt::Write as _;

use cc0_ir::{Constant, Line, Opcode, Program};

use crate::error::AssembleError;

/// Render the full assembly listing of an analyzed program.
///
/// Fails with [`AssembleError::NoMainDefined`] before writing anything
/// when the program lacks a `main` function.
pub fn assemble_text(program: &Program) -> Result<String, AssembleError> {
    if program
        .lookup(program.global_scope, "main")
        .filter(|sym| sym.is_callable)
        .is_none()
    {
        return Err(AssembleError::NoMainDefined);
    }

    let callables: Vec<_> = program.callables().collect();
    let n_functions = callables.len() as i64;

    let mut out = String::new();

    out.push_str(".constants:\n");
    let mut index = 0usize;
    for (name, _) in &callables {
        let _ = writeln!(out, "{} S \"{}\"", index, name);
        index += 1;
    }
    for entry in program.pool.entries() {
        match entry {
            Constant::String(value) => {
                let _ = writeln!(out, "{} S \"{}\"", index, value);
            }
            Constant::Int(value) => {
                let _ = writeln!(out, "{} I {}", index, value);
            }
            Constant::Double(value) => {
                let _ = writeln!(out, "{} D 0x{:016x}", index, value.to_bits());
            }
        }
        index += 1;
    }
    out.push('\n');

    out.push_str(".start:\n");
    for line in program.functions[program.start].lines() {
        let _ = writeln!(out, "{}", render_line(line, n_functions));
    }
    out.push('\n');

    out.push_str(".functions:\n");
    for (idx, (_, symbol)) in callables.iter().enumerate() {
        let func = callee_record(program, symbol)?;
        let _ = writeln!(out, "{} {} {} 1", idx, idx, func.param_slots());
    }
    out.push('\n');

    for (idx, (name, symbol)) in callables.iter().enumerate() {
        let func = callee_record(program, symbol)?;
        let _ = writeln!(out, ".F{}:\t# {}", idx, name);
        for line in func.lines() {
            let _ = writeln!(out, "{}", render_line(line, n_functions));
        }
        out.push('\n');
    }

    Ok(out)
}

fn callee_record<'a>(
    program: &'a Program,
    symbol: &cc0_ir::Symbol,
) -> Result<&'a cc0_ir::Function, AssembleError> {
    let func = symbol.func.ok_or_else(|| {
        AssembleError::InconsistentProgram("callable symbol without a function record".into())
    })?;
    Ok(&program.functions[func])
}

/// Render one instruction line, translating `loadc` pool sentinels.
fn render_line(line: &Line, n_functions: i64) -> String {
    let mut rendered = line.opcode.mnemonic().to_string();
    for (i, &operand) in line.operands.iter().enumerate() {
        let value = if line.opcode == Opcode::Loadc && i == 0 && operand <= 0 {
            n_functions - operand
        } else {
            operand
        };
        let _ = write!(rendered, " {}", value);
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc0_ir::{Function, ValueType};

    /// A program with one `main` whose body is the given lines.
    fn program_with_main(lines: &[(Opcode, &[i64])]) -> Program {
        let mut program = Program::new();
        let mut main = Function::new(ValueType::Int);
        for (opcode, operands) in lines {
            main.append(*opcode, operands).unwrap();
        }
        let func = program.functions.push(main);
        program.add_function("main", ValueType::Int, func).unwrap();
        program
    }

    #[test]
    fn test_missing_main_is_detected_first() {
        let program = Program::new();
        assert_eq!(assemble_text(&program), Err(AssembleError::NoMainDefined));
    }

    #[test]
    fn test_minimal_listing_shape() {
        let program = program_with_main(&[
            (Opcode::Ipush, &[0]),
            (Opcode::Iret, &[]),
        ]);
        let listing = assemble_text(&program).unwrap();
        let expected = ".constants:\n\
                        0 S \"main\"\n\
                        \n\
                        .start:\n\
                        \n\
                        .functions:\n\
                        0 0 0 1\n\
                        \n\
                        .F0:\t# main\n\
                        ipush 0\n\
                        iret\n\
                        \n";
        assert_eq!(listing, expected);
    }

    #[test]
    fn test_loadc_sentinel_translation() {
        let mut program = program_with_main(&[]);
        // Two pooled literals: sentinels 0 and -1. With one function the
        // listing indices become 1 and 2.
        let s0 = program.add_double_literal(2.5);
        let s1 = program.add_string_literal("hi");
        assert_eq!((s0, s1), (0, -1));

        let symbol = program.lookup(program.global_scope, "main").unwrap();
        let func = symbol.func.unwrap();
        program.functions[func].append(Opcode::Loadc, &[s0]).unwrap();
        program.functions[func].append(Opcode::Loadc, &[s1]).unwrap();

        let listing = assemble_text(&program).unwrap();
        assert!(listing.contains("loadc 1\nloadc 2\n"), "{}", listing);
        assert!(listing.contains("1 D 0x4004000000000000\n"), "{}", listing);
        assert!(listing.contains("2 S \"hi\"\n"), "{}", listing);
    }

    #[test]
    fn test_function_briefings_report_param_slots() {
        let mut program = Program::new();

        let mut main = Function::new(ValueType::Int);
        main.append(Opcode::Iret, &[]).unwrap();
        let main = program.functions.push(main);
        program.add_function("main", ValueType::Int, main).unwrap();

        let mut mix = Function::new(ValueType::Void);
        mix.add_parameter("a", ValueType::Int);
        mix.add_parameter("x", ValueType::Double);
        mix.append(Opcode::Ret, &[]).unwrap();
        let mix = program.functions.push(mix);
        program.add_function("mix", ValueType::Void, mix).unwrap();

        let listing = assemble_text(&program).unwrap();
        assert!(listing.contains("\n0 0 0 1\n1 1 3 1\n"), "{}", listing);
        assert!(listing.contains(".F1:\t# mix\n"), "{}", listing);
    }

    #[test]
    fn test_call_operands_match_constant_indices() {
        let mut program = Program::new();

        let mut callee = Function::new(ValueType::Void);
        callee.append(Opcode::Ret, &[]).unwrap();
        let callee = program.functions.push(callee);
        let address = program.add_function("tick", ValueType::Void, callee).unwrap();

        let mut main = Function::new(ValueType::Int);
        main.append(Opcode::Call, &[address]).unwrap();
        main.append(Opcode::Iret, &[]).unwrap();
        let main = program.functions.push(main);
        program.add_function("main", ValueType::Int, main).unwrap();

        let listing = assemble_text(&program).unwrap();
        // `tick` is function 0, and its name is constant 0.
        assert!(listing.contains("0 S \"tick\"\n1 S \"main\"\n"), "{}", listing);
        assert!(listing.contains("call 0\n"), "{}", listing);
    }
}
