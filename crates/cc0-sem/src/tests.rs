//! Analyzer tests built around whole-program snippets.

use cc0_ir::{Opcode, Program, StackEffect};
use cc0_lex::tokenize;
use cc0_util::Handler;

use crate::{analyze, AnalyzeError};

fn analyze_source(source: &str) -> Result<Program, AnalyzeError> {
    let handler = Handler::new();
    let stream = tokenize(source, &handler).expect("lexing failed");
    analyze(stream)
}

fn program_of(source: &str) -> Program {
    analyze_source(source).expect("analysis failed")
}

/// Rendered instruction lines of a named function.
fn lines_of(program: &Program, name: &str) -> Vec<String> {
    let symbol = program
        .lookup(program.global_scope, name)
        .unwrap_or_else(|| panic!("no function '{}'", name));
    let func = symbol.func.expect("symbol is not callable");
    program.functions[func]
        .lines()
        .iter()
        .map(|line| line.to_string())
        .collect()
}

#[test]
fn test_empty_main() {
    let program = program_of("int main() { return 0; }");

    // No globals: the start section stays empty.
    assert!(program.functions[program.start].lines().is_empty());

    assert_eq!(
        lines_of(&program, "main"),
        vec!["ipush 0", "iret", "ipush 0", "iret"]
    );
}

#[test]
fn test_arithmetic_precedence() {
    let program = program_of("int main() { print(1 + 2 * 3); return 0; }");
    let lines = lines_of(&program, "main");
    assert_eq!(
        &lines[..7],
        &["ipush 1", "ipush 2", "ipush 3", "imul", "iadd", "iprint", "printl"]
    );
}

#[test]
fn test_while_loop_jump_offsets() {
    let program =
        program_of("int main() { int i = 0; while (i < 3) { i = i + 1; } return 0; }");
    let symbol = program.lookup(program.global_scope, "main").unwrap();
    let main = &program.functions[symbol.func.unwrap()];

    // Declaration: ipush 0 / loada 0 0 / ipush 0 / istore = 18 bytes,
    // so the condition starts at byte offset 18.
    let jmp = main
        .lines()
        .iter()
        .find(|l| l.opcode == Opcode::Jmp)
        .expect("no backward jmp emitted");
    assert_eq!(jmp.operands, vec![18]);

    // The complement of `<` jumps past the loop body, i.e. to the
    // offset right after the backward jmp.
    let jge = main
        .lines()
        .iter()
        .find(|l| l.opcode == Opcode::Jge)
        .expect("no jge emitted");
    assert_eq!(jge.operands, vec![60]);
}

#[test]
fn test_implicit_widening_converts_the_left_operand() {
    let program =
        program_of("double main() { int a = 1; double b = 2.5; return a + b; }");
    let lines = lines_of(&program, "main");

    // The int load is widened before the double load, not after.
    let expected_tail = [
        "loada 0 0", "iload", "i2d", "loada 0 1", "dload", "dadd", "dret",
    ];
    let rendered = lines.join(" / ");
    let needle = expected_tail.join(" / ");
    assert!(
        rendered.contains(&needle),
        "expected `{}` within `{}`",
        needle,
        rendered
    );
}

#[test]
fn test_double_literal_uses_the_pool() {
    let program = program_of("int main() { double d = 2.5; return 0; }");
    let lines = lines_of(&program, "main");
    // First pooled literal gets sentinel 0.
    assert!(lines.contains(&"loadc 0".to_string()), "{:?}", lines);
    assert_eq!(program.pool.len(), 1);
}

#[test]
fn test_scan_print_cycle() {
    let program = program_of("int main() { int n; scan(n); print(n, n); return 0; }");
    let lines = lines_of(&program, "main");
    assert_eq!(
        &lines[..11],
        &[
            "snew 1", "loada 0 0", "iscan", "istore", "loada 0 0", "iload", "iprint",
            "bipush 32", "cprint", "loada 0 0", "iload",
        ]
    );
    assert_eq!(&lines[11..13], &["iprint", "printl"]);
}

#[test]
fn test_recursion_resolves_the_callee() {
    let program = program_of(
        "int fact(int n) {\n\
         \tif (n <= 1) { return 1; }\n\
         \treturn n * fact(n - 1);\n\
         }\n\
         int main() { print(fact(5)); return 0; }",
    );

    // `fact` is function 0, so both call sites use operand 0.
    let fact = lines_of(&program, "fact");
    assert!(fact.contains(&"call 0".to_string()), "{:?}", fact);
    let main = lines_of(&program, "main");
    assert!(main.contains(&"call 0".to_string()), "{:?}", main);
}

#[test]
fn test_if_else_patches_both_jumps() {
    let program = program_of(
        "int main() { int a = 1; if (a == 1) { print(1); } else { print(2); } return 0; }",
    );
    let symbol = program.lookup(program.global_scope, "main").unwrap();
    let main = &program.functions[symbol.func.unwrap()];

    let jne_index = main
        .lines()
        .iter()
        .position(|l| l.opcode == Opcode::Jne)
        .expect("no conditional jump");
    let jmp_index = main
        .lines()
        .iter()
        .position(|l| l.opcode == Opcode::Jmp)
        .expect("no skip-else jump");
    assert!(jne_index < jmp_index);

    // The conditional jump lands right after the placeholder jmp; the
    // placeholder lands after the else branch.
    let offset_of = |index: usize| -> i64 {
        i64::from(
            main.lines()[..index]
                .iter()
                .map(|l| l.opcode.encoded_size())
                .sum::<u32>(),
        )
    };
    assert_eq!(
        main.lines()[jne_index].operands[0],
        offset_of(jmp_index + 1)
    );
    let jmp_target = main.lines()[jmp_index].operands[0];
    assert!(jmp_target > offset_of(jmp_index + 1));
}

#[test]
fn test_if_without_else_leaves_a_nop() {
    let program = program_of("int main() { if (1) { print(1); } return 0; }");
    let lines = lines_of(&program, "main");
    assert!(lines.contains(&"nop".to_string()), "{:?}", lines);
    // A lone condition jumps when the value is zero.
    assert!(lines.contains(&"ipush 1".to_string()));
    assert!(lines.iter().any(|l| l.starts_with("je ")), "{:?}", lines);
}

#[test]
fn test_global_initialization_goes_to_start() {
    let program = program_of("int g = 7;\nint main() { return g; }");
    let start = &program.functions[program.start];
    let rendered: Vec<String> = start.lines().iter().map(|l| l.to_string()).collect();
    assert_eq!(rendered, vec!["ipush 0", "loada 0 0", "ipush 7", "istore"]);

    // Accessing the global from main crosses one scope level.
    let main = lines_of(&program, "main");
    assert!(main.contains(&"loada 1 0".to_string()), "{:?}", main);
}

#[test]
fn test_void_function_emits_plain_ret() {
    let program = program_of("void greet() { print(); return; }\nint main() { greet(); return 0; }");
    let greet = lines_of(&program, "greet");
    assert_eq!(greet, vec!["printl", "ret", "ret"]);
}

#[test]
fn test_cast_expression_narrows() {
    let program = program_of("int main() { double d = 1.5; print((int)d); return 0; }");
    let lines = lines_of(&program, "main");
    let rendered = lines.join(" / ");
    assert!(
        rendered.contains("loada 0 0 / dload / d2i / iprint"),
        "{}",
        rendered
    );
}

#[test]
fn test_negation_is_typed() {
    let program = program_of("int main() { double d = 0.5; print(-d, -2); return 0; }");
    let lines = lines_of(&program, "main");
    assert!(lines.contains(&"dneg".to_string()), "{:?}", lines);
    assert!(lines.contains(&"ineg".to_string()), "{:?}", lines);
}

#[test]
fn test_argument_coercion_and_count() {
    let program = program_of(
        "double half(double x) { return x / 2; }\nint main() { print(half(3)); return 0; }",
    );
    let main = lines_of(&program, "main");
    let rendered = main.join(" / ");
    // The int argument widens to the double parameter before the call.
    assert!(rendered.contains("ipush 3 / i2d / call 0"), "{}", rendered);

    let err = analyze_source(
        "double half(double x) { return x / 2; }\nint main() { print(half(3, 4)); return 0; }",
    )
    .unwrap_err();
    assert!(matches!(err, AnalyzeError::ArgumentCountMismatch { expected: 1, found: 2, .. }));
}

#[test]
fn test_parameters_occupy_lowest_slots_in_order() {
    let program = program_of(
        "int add(int a, int b) { int c = 0; c = a + b; return c; }\nint main() { return add(1, 2); }",
    );
    let add = lines_of(&program, "add");
    let rendered = add.join(" / ");
    // a at slot 0, b at slot 1, local c at slot 2.
    assert!(rendered.contains("loada 0 0 / iload / loada 0 1 / iload / iadd"), "{}", rendered);
    assert!(rendered.contains("loada 0 2"), "{}", rendered);
}

#[test]
fn test_redeclaration_is_rejected() {
    let err = analyze_source("int main() { int x; int x; return 0; }").unwrap_err();
    assert!(matches!(err, AnalyzeError::RedeclaredIdentifier { .. }));
}

#[test]
fn test_undefined_identifier_is_rejected() {
    let err = analyze_source("int main() { int x = y; return 0; }").unwrap_err();
    assert!(matches!(err, AnalyzeError::UndefinedIdentifier { .. }));
}

#[test]
fn test_assignment_to_constant_is_rejected() {
    let err = analyze_source("int main() { const int c = 1; c = 2; return 0; }").unwrap_err();
    assert!(matches!(err, AnalyzeError::AssignmentToConstant { .. }));
}

#[test]
fn test_scan_into_constant_is_rejected() {
    let err = analyze_source("int main() { const int c = 1; scan(c); return 0; }").unwrap_err();
    assert!(matches!(err, AnalyzeError::AssignmentToConstant { .. }));
}

#[test]
fn test_const_parameter_is_a_constant() {
    let err = analyze_source(
        "int id(const int n) { n = 2; return n; }\nint main() { return id(1); }",
    )
    .unwrap_err();
    assert!(matches!(err, AnalyzeError::AssignmentToConstant { .. }));

    // Reading a const parameter stays legal.
    analyze_source("int id(const int n) { return n; }\nint main() { return id(1); }")
        .expect("const parameters must be readable");
}

#[test]
fn test_uninitialized_constant_is_rejected() {
    let err = analyze_source("int main() { const int c; return 0; }").unwrap_err();
    assert!(matches!(err, AnalyzeError::IncompleteExpression { .. }));
}

#[test]
fn test_void_variable_is_rejected() {
    let err = analyze_source("void v;\nint main() { return 0; }").unwrap_err();
    assert!(matches!(err, AnalyzeError::InvalidDeclaration { .. }));
}

#[test]
fn test_trailing_garbage_is_rejected() {
    let err = analyze_source("int main() { return 0; } }").unwrap_err();
    assert!(matches!(err, AnalyzeError::InvalidDeclaration { .. }));
}

#[test]
fn test_empty_print_emits_only_the_newline() {
    let program = program_of("int main() { print(); return 0; }");
    let lines = lines_of(&program, "main");
    assert_eq!(lines[0], "printl");
}

#[test]
fn test_string_literals_are_pooled_and_deduplicated() {
    let program =
        program_of("int main() { print(\"hi\"); print(\"hi\"); return 0; }");
    assert_eq!(program.pool.len(), 1);
    let lines = lines_of(&program, "main");
    let loadc_count = lines.iter().filter(|l| l.starts_with("loadc")).count();
    assert_eq!(loadc_count, 2);
    assert!(lines.contains(&"sprint".to_string()));
}

#[test]
fn test_offset_correctness_for_every_function() {
    let program = program_of(
        "int g = 1;\n\
         double half(double x) { return x / 2; }\n\
         int main() { int i = 0; while (i < 3) { i = i + 1; print(half(i)); } return g; }",
    );
    for func in program.functions.iter() {
        let total: u32 = func.lines().iter().map(|l| l.opcode.encoded_size()).sum();
        assert_eq!(total, func.current_offset());
    }
}

#[test]
fn test_jump_locality_for_every_function() {
    let program = program_of(
        "int main() {\n\
         \tint i = 0;\n\
         \twhile (i < 5) { if (i == 2) { print(i); } else { print(0); } i = i + 1; }\n\
         \treturn 0;\n\
         }",
    );
    for func in program.functions.iter() {
        for line in func.lines() {
            if line.opcode.is_jump() {
                let target = line.operands[0];
                assert!(
                    target >= 0 && target <= i64::from(func.current_offset()),
                    "jump target {} escapes [0, {}]",
                    target,
                    func.current_offset()
                );
            }
        }
    }
}

#[test]
fn test_stack_effect_metadata_is_queryable() {
    // The popn sizing path depends on variable-effect opcodes being
    // marked as such.
    assert_eq!(Opcode::Popn.stack_effect(), StackEffect::Variable);
    assert_eq!(Opcode::Iprint.stack_effect(), StackEffect::Fixed(-1));
}
