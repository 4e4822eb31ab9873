use std::collections::HashMap;

use super::CodeGenerator;
use crate::compiler::ast::{
    AddOp, Assignment, Call, CondBranch, DisplayStatement, Expression, Factor, FactorKind,
    GuardStatement, IfStatement, MulOp, Param, ParamMode, Program, RelOp, Routine, RoutineKind,
    Sign, SimpleExpression, Statement, Term, TypeName, VariableRef, WhileStatement,
};
use crate::compiler::semantics::Semantics;

// Tree-building helpers, shared shape with the semantic tests.

fn factor(kind: FactorKind, line: u32) -> Factor {
    Factor {
        kind,
        line,
        ty: None,
    }
}

fn single(kind: FactorKind, line: u32) -> Expression {
    Expression {
        first: SimpleExpression {
            sign: None,
            terms: vec![Term {
                factors: vec![factor(kind, line)],
                ops: vec![],
                line,
                ty: None,
            }],
            ops: vec![],
            line,
            ty: None,
        },
        rel: None,
        line,
        ty: None,
    }
}

fn number(value: f32, line: u32) -> Expression {
    single(FactorKind::NumberLiteral(value), line)
}

fn string(text: &str, line: u32) -> Expression {
    single(FactorKind::StringLiteral(text.to_string()), line)
}

fn variable(name: &str, line: u32) -> Expression {
    single(
        FactorKind::Variable(VariableRef {
            name: name.to_string(),
            line,
            entry: None,
            ty: None,
        }),
        line,
    )
}

fn binary(left: Expression, op: AddOp, right: Expression, line: u32) -> Expression {
    let mut terms = left.first.terms;
    terms.extend(right.first.terms);
    let mut ops = left.first.ops;
    ops.push(op);
    ops.extend(right.first.ops);
    Expression {
        first: SimpleExpression {
            sign: None,
            terms,
            ops,
            line,
            ty: None,
        },
        rel: None,
        line,
        ty: None,
    }
}

fn product(left: Expression, op: MulOp, right: Expression, line: u32) -> Expression {
    let mut factors = left
        .first
        .terms
        .into_iter()
        .next()
        .map(|t| t.factors)
        .unwrap_or_default();
    factors.extend(
        right
            .first
            .terms
            .into_iter()
            .next()
            .map(|t| t.factors)
            .unwrap_or_default(),
    );
    Expression {
        first: SimpleExpression {
            sign: None,
            terms: vec![Term {
                factors,
                ops: vec![op],
                line,
                ty: None,
            }],
            ops: vec![],
            line,
            ty: None,
        },
        rel: None,
        line,
        ty: None,
    }
}

fn compare(left: Expression, op: RelOp, right: Expression, line: u32) -> Expression {
    Expression {
        first: left.first,
        rel: Some((op, right.first)),
        line,
        ty: None,
    }
}

fn negated(mut expr: Expression) -> Expression {
    expr.first.sign = Some(Sign::Minus);
    expr
}

fn declare(name: &str, type_name: TypeName, rhs: Expression, line: u32) -> Statement {
    Statement::Assignment(Assignment {
        declared: Some(type_name),
        lhs: VariableRef {
            name: name.to_string(),
            line,
            entry: None,
            ty: None,
        },
        rhs,
        line,
    })
}

fn assign(name: &str, rhs: Expression, line: u32) -> Statement {
    Statement::Assignment(Assignment {
        declared: None,
        lhs: VariableRef {
            name: name.to_string(),
            line,
            entry: None,
            ty: None,
        },
        rhs,
        line,
    })
}

fn display(expr: Expression, line: u32) -> Statement {
    Statement::Display(DisplayStatement {
        value: Some(expr),
        line,
    })
}

fn program(routines: Vec<Routine>, main: Vec<Statement>) -> Program {
    Program {
        name: "Test".to_string(),
        line: 1,
        routines,
        main,
        entry: None,
    }
}

/// Run both passes and return the emitted assembly, panicking on any
/// semantic error since the generator requires a clean tree.
fn generate(program: &mut Program) -> String {
    let mut semantics = Semantics::new();
    semantics.check(program);
    assert_eq!(
        semantics.error_count(),
        0,
        "{}",
        semantics.errors().format_table()
    );
    let (types, predefined, stack, _) = semantics.into_parts();
    CodeGenerator::new(&types, &predefined, &stack, &program.name).generate(program)
}

/// A routine `double(n)` returning `r = n * 2`.
fn double_routine() -> Routine {
    Routine {
        kind: RoutineKind::Definition,
        name: "double".to_string(),
        line: 2,
        params: vec![Param {
            name: "n".to_string(),
            type_name: TypeName::Number,
            mode: ParamMode::Value,
            line: 2,
            entry: None,
        }],
        return_type: Some(TypeName::Number),
        return_var: Some(VariableRef {
            name: "r".to_string(),
            line: 2,
            entry: None,
            ty: None,
        }),
        body: vec![assign(
            "r",
            product(variable("n", 3), MulOp::Multiply, number(2.0, 3), 3),
            3,
        )],
        entry: None,
    }
}

#[test]
fn increment_compiles_to_static_field_traffic() {
    let mut p = program(
        vec![],
        vec![
            declare("x", TypeName::Number, number(1.0, 2), 2),
            assign(
                "x",
                binary(variable("x", 3), AddOp::Add, number(1.0, 3), 3),
                3,
            ),
            display(variable("x", 4), 4),
        ],
    );
    let text = generate(&mut p);

    assert!(text.contains(".class public Test\n"));
    assert!(text.contains(".field private static x F\n"));
    assert!(text.contains("\tfconst_1\n\tputstatic Test/x F\n"));
    assert!(text.contains("\tgetstatic Test/x F\n\tfconst_1\n\tfadd\n\tputstatic Test/x F\n"));
    assert!(text.contains("\tldc \"%f\\n\"\n"));
    assert!(text.contains("java/lang/Float/valueOf(F)Ljava/lang/Float;"));
}

#[test]
fn routine_method_signature_and_return_sequence() {
    let mut p = program(
        vec![double_routine()],
        vec![display(
            single(
                FactorKind::Call(Call {
                    name: "double".to_string(),
                    args: vec![number(7.0, 6)],
                    line: 6,
                    entry: None,
                    ty: None,
                }),
                6,
            ),
            6,
        )],
    );
    let text = generate(&mut p);

    assert!(text.contains(".method private static double(F)F\n"));
    assert!(text.contains(".var 0 is n F\n"));
    assert!(text.contains(".var 1 is r F\n"));
    assert!(text.contains(".var 2 is double F\n"));
    // Result value is copied through the slot named after the routine.
    assert!(text.contains("\tfload_1\n\tfstore_2\n\tfload_2\n\tfreturn\n"));
    assert!(text.contains("\tinvokestatic Test/double(F)F\n"));

    let body = method_lines(&text, "double(F)F");
    assert!(body.iter().any(|l| l == ".limit locals 3"));
}

#[test]
fn guard_reevaluates_conditions_before_each_statement() {
    let mut p = program(
        vec![],
        vec![
            declare(
                "b",
                TypeName::Boolean,
                single(FactorKind::BooleanLiteral(true), 2),
                2,
            ),
            declare("x", TypeName::Number, number(0.0, 3), 3),
            Statement::Guard(GuardStatement {
                conditions: vec![variable("b", 4)],
                body: vec![assign("x", number(1.0, 5), 5), assign("x", number(2.0, 6), 6)],
                line: 4,
            }),
        ],
    );
    let text = generate(&mut p);

    // Once before entry plus once before each of the two statements.
    let loads = text.matches("\tgetstatic Test/b Z\n").count();
    assert_eq!(loads, 3);
}

#[test]
fn labels_are_strictly_increasing() {
    let mut p = program(
        vec![],
        vec![
            declare("x", TypeName::Number, number(5.0, 2), 2),
            Statement::While(WhileStatement {
                condition: compare(variable("x", 3), RelOp::Gt, number(0.0, 3), 3),
                body: vec![assign(
                    "x",
                    binary(variable("x", 4), AddOp::Subtract, number(1.0, 4), 4),
                    4,
                )],
                line: 3,
            }),
            Statement::If(IfStatement {
                if_branch: CondBranch {
                    condition: compare(variable("x", 6), RelOp::Eq, number(0.0, 6), 6),
                    statements: vec![display(string("done", 7), 7)],
                },
                elseif_branches: vec![CondBranch {
                    condition: compare(variable("x", 8), RelOp::Lt, number(0.0, 8), 8),
                    statements: vec![display(string("under", 9), 9)],
                }],
                else_branch: Some(vec![display(string("over", 11), 11)]),
                line: 6,
            }),
        ],
    );
    let text = generate(&mut p);

    // Every minted number is defined exactly once; together they cover
    // 1..=n with no gaps or reuse.
    let mut defined: Vec<u32> = text
        .lines()
        .filter_map(|line| line.strip_suffix(':'))
        .filter_map(|name| name.strip_prefix('L'))
        .map(|digits| digits.parse().unwrap())
        .collect();
    defined.sort_unstable();
    assert!(defined.len() >= 6);
    let expected: Vec<u32> = (1..=defined.len() as u32).collect();
    assert_eq!(defined, expected);
    assert!(text.contains("L001:"));
}

#[test]
fn display_format_flags_follow_the_value_type() {
    let mut p = program(
        vec![],
        vec![
            declare("x", TypeName::Number, number(1.0, 2), 2),
            declare(
                "b",
                TypeName::Boolean,
                single(FactorKind::BooleanLiteral(true), 3),
                3,
            ),
            declare("s", TypeName::String, string("hi", 4), 4),
            display(variable("x", 5), 5),
            display(variable("b", 6), 6),
            display(variable("s", 7), 7),
        ],
    );
    let text = generate(&mut p);

    assert!(text.contains("\tldc \"%f\\n\"\n"));
    assert!(text.contains("\tldc \"%b\\n\"\n"));
    assert!(text.contains("\tldc \"%s\\n\"\n"));
    // Scalar values box for printf; the string goes in as is.
    assert!(text.contains("java/lang/Float/valueOf(F)Ljava/lang/Float;"));
    assert!(text.contains("java/lang/Boolean/valueOf(Z)Ljava/lang/Boolean;"));
    assert!(!text.contains("java/lang/String/valueOf(Ljava/lang/String;)"));
}

#[test]
fn class_init_and_constructor_limits() {
    let mut p = program(vec![], vec![]);
    let text = generate(&mut p);

    let clinit = method_lines(&text, "<clinit>()V");
    assert!(clinit.iter().any(|l| l == ".limit locals 0"));
    assert!(clinit.iter().any(|l| l == ".limit stack 3"));
    assert!(clinit.iter().any(|l| l == "\tnew java/util/Scanner"));
    assert!(clinit
        .iter()
        .any(|l| l == "\tputstatic Test/_sysin Ljava/util/Scanner;"));

    let init = method_lines(&text, "<init>()V");
    assert!(init.iter().any(|l| l == ".limit locals 1"));
    assert!(init.iter().any(|l| l == ".limit stack 1"));
    assert!(init.iter().any(|l| l == ".var 0 is this LTest;"));
}

#[test]
fn declared_stack_limits_cover_simulated_depth() {
    let mut p = program(
        vec![double_routine()],
        vec![
            declare("x", TypeName::Number, number(1.0, 5), 5),
            declare(
                "s",
                TypeName::String,
                binary(string("n = ", 6), AddOp::Add, variable("x", 6), 6),
                6,
            ),
            declare(
                "b",
                TypeName::Boolean,
                compare(variable("x", 7), RelOp::Gt, number(0.0, 7), 7),
                7,
            ),
            declare("y", TypeName::Number, negated(variable("x", 8)), 8),
            declare(
                "t",
                TypeName::Boolean,
                binary(variable("b", 9), AddOp::Or, variable("x", 9), 9),
                9,
            ),
            declare(
                "f",
                TypeName::Boolean,
                single(
                    FactorKind::Not(Box::new(factor(
                        FactorKind::Variable(VariableRef {
                            name: "b".to_string(),
                            line: 10,
                            entry: None,
                            ty: None,
                        }),
                        10,
                    ))),
                    10,
                ),
                10,
            ),
            Statement::If(IfStatement {
                if_branch: CondBranch {
                    condition: variable("b", 11),
                    statements: vec![assign(
                        "x",
                        single(
                            FactorKind::Call(Call {
                                name: "double".to_string(),
                                args: vec![variable("x", 12)],
                                line: 12,
                                entry: None,
                                ty: None,
                            }),
                            12,
                        ),
                        12,
                    )],
                },
                elseif_branches: vec![CondBranch {
                    condition: compare(variable("x", 13), RelOp::Lt, number(10.0, 13), 13),
                    statements: vec![assign("x", number(2.0, 14), 14)],
                }],
                else_branch: Some(vec![assign("x", number(3.0, 16), 16)]),
                line: 11,
            }),
            Statement::While(WhileStatement {
                condition: compare(variable("x", 18), RelOp::Gt, number(0.0, 18), 18),
                body: vec![assign(
                    "x",
                    binary(variable("x", 19), AddOp::Subtract, number(1.0, 19), 19),
                    19,
                )],
                line: 18,
            }),
            Statement::Guard(GuardStatement {
                conditions: vec![variable("b", 21)],
                body: vec![display(variable("s", 22), 22)],
                line: 21,
            }),
            display(variable("b", 24), 24),
            display(variable("x", 25), 25),
            Statement::Display(DisplayStatement {
                value: None,
                line: 26,
            }),
        ],
    );
    let text = generate(&mut p);

    for (header, lines) in methods(&text) {
        let declared = lines
            .iter()
            .find_map(|l| l.strip_prefix(".limit stack "))
            .and_then(|n| n.parse::<i32>().ok())
            .unwrap_or_else(|| panic!("no stack limit in {}", header));
        let simulated = simulate_max_depth(&header, &lines);
        assert!(
            simulated <= declared,
            "method {} declares stack {} but needs {}",
            header,
            declared,
            simulated
        );
    }
}

// A small symbolic executor over the emitted text. It tracks the exact
// operand stack depth through every instruction, records the depth
// carried into each branch target, and checks that methods end balanced.

fn methods(text: &str) -> Vec<(String, Vec<String>)> {
    let mut methods = Vec::new();
    let mut current: Option<(String, Vec<String>)> = None;
    for line in text.lines() {
        if line.starts_with(".method") {
            current = Some((line.to_string(), Vec::new()));
        } else if line == ".end method" {
            if let Some(method) = current.take() {
                methods.push(method);
            }
        } else if let Some((_, lines)) = &mut current {
            lines.push(line.to_string());
        }
    }
    methods
}

fn method_lines(text: &str, name: &str) -> Vec<String> {
    methods(text)
        .into_iter()
        .find(|(header, _)| header.contains(name))
        .map(|(_, lines)| lines)
        .unwrap_or_else(|| panic!("no method {}", name))
}

fn argument_slots(descriptor: &str) -> i32 {
    let open = descriptor.find('(').unwrap();
    let close = descriptor.find(')').unwrap();
    let mut slots = 0;
    let mut chars = descriptor[open + 1..close].chars();
    while let Some(c) = chars.next() {
        match c {
            'J' | 'D' => slots += 2,
            'L' => {
                for c2 in chars.by_ref() {
                    if c2 == ';' {
                        break;
                    }
                }
                slots += 1;
            }
            '[' => {
                // The array reference counts as one slot whatever the
                // element type.
                let mut element = chars.next();
                while element == Some('[') {
                    element = chars.next();
                }
                if element == Some('L') {
                    for c2 in chars.by_ref() {
                        if c2 == ';' {
                            break;
                        }
                    }
                }
                slots += 1;
            }
            _ => slots += 1,
        }
    }
    slots
}

fn return_slots(descriptor: &str) -> i32 {
    let close = descriptor.find(')').unwrap();
    match &descriptor[close + 1..] {
        "V" => 0,
        "J" | "D" => 2,
        _ => 1,
    }
}

fn field_slots(descriptor: &str) -> i32 {
    match descriptor {
        "J" | "D" => 2,
        _ => 1,
    }
}

enum Effect {
    Delta(i32),
    Branch(i32, String),
    Jump(String),
    Return(i32),
}

fn classify(line: &str) -> Option<Effect> {
    let trimmed = line.trim_start_matches('\t');
    let mut parts = trimmed.splitn(2, ' ');
    let mnemonic = parts.next()?;
    let operand = parts.next().unwrap_or("");

    let effect = match mnemonic {
        m if m.starts_with("iconst") || m.starts_with("fconst") => Effect::Delta(1),
        "bipush" | "sipush" | "ldc" | "dup" | "dup_x1" | "new" => Effect::Delta(1),
        m if m.starts_with("fload") || m.starts_with("iload") || m.starts_with("aload") => {
            Effect::Delta(1)
        }
        "lload_3" => Effect::Delta(2),
        m if m.starts_with("fstore") || m.starts_with("istore") || m.starts_with("astore") => {
            Effect::Delta(-1)
        }
        "lstore_3" => Effect::Delta(-2),
        "pop" => Effect::Delta(-1),
        "swap" | "fneg" | "f2i" | "anewarray" => Effect::Delta(0),
        "aastore" => Effect::Delta(-3),
        "getstatic" => {
            let descriptor = operand.split(' ').nth(1).unwrap_or("");
            Effect::Delta(field_slots(descriptor))
        }
        "putstatic" => {
            let descriptor = operand.split(' ').nth(1).unwrap_or("");
            Effect::Delta(-field_slots(descriptor))
        }
        "invokestatic" => Effect::Delta(return_slots(operand) - argument_slots(operand)),
        "invokevirtual" | "invokespecial" => {
            Effect::Delta(return_slots(operand) - argument_slots(operand) - 1)
        }
        "fadd" | "fsub" | "fmul" | "fdiv" | "ior" | "iand" | "ixor" | "fcmpg" => Effect::Delta(-1),
        "goto" => Effect::Jump(operand.to_string()),
        "ifeq" | "ifne" | "iflt" | "ifle" | "ifgt" | "ifge" => {
            Effect::Branch(-1, operand.to_string())
        }
        "return" => Effect::Return(0),
        "freturn" | "ireturn" | "areturn" => Effect::Return(1),
        _ => return None,
    };
    Some(effect)
}

fn simulate_max_depth(header: &str, lines: &[String]) -> i32 {
    let mut depth: Option<i32> = Some(0);
    let mut max_depth = 0;
    let mut label_depths: HashMap<String, i32> = HashMap::new();

    let mut record = |label_depths: &mut HashMap<String, i32>, label: String, d: i32| {
        if let Some(existing) = label_depths.get(&label) {
            assert_eq!(*existing, d, "{}: depth mismatch at {}", header, label);
        } else {
            label_depths.insert(label, d);
        }
    };

    for line in lines {
        if !line.starts_with('\t') {
            if let Some(label) = line.strip_suffix(':') {
                depth = match (depth, label_depths.get(label)) {
                    (Some(d), Some(&r)) => {
                        assert_eq!(d, r, "{}: fallthrough mismatch at {}", header, label);
                        Some(d)
                    }
                    (Some(d), None) => Some(d),
                    (None, Some(&r)) => Some(r),
                    (None, None) => None,
                };
            }
            continue;
        }
        let effect = match classify(line) {
            Some(effect) => effect,
            None => panic!("{}: unknown instruction {:?}", header, line),
        };
        let d = match depth {
            Some(d) => d,
            None => continue,
        };
        match effect {
            Effect::Delta(delta) => {
                let next = d + delta;
                assert!(next >= 0, "{}: stack underflow at {:?}", header, line);
                max_depth = max_depth.max(next);
                depth = Some(next);
            }
            Effect::Branch(delta, target) => {
                let next = d + delta;
                assert!(next >= 0, "{}: stack underflow at {:?}", header, line);
                record(&mut label_depths, target, next);
                depth = Some(next);
            }
            Effect::Jump(target) => {
                record(&mut label_depths, target, d);
                depth = None;
            }
            Effect::Return(popped) => {
                assert_eq!(d, popped, "{}: unbalanced stack at {:?}", header, line);
                depth = None;
            }
        }
    }

    max_depth
}
