use super::error::SemanticCode;
use super::Semantics;
use crate::compiler::ast::{
    AddOp, Assignment, Call, CondBranch, DisplayStatement, Expression, Factor, FactorKind,
    GuardStatement, IfStatement, Param, ParamMode, Program, RelOp, Routine, RoutineKind,
    SimpleExpression, Statement, Term, TypeName, VariableRef,
};

// Tree-building helpers. The parser normally produces these nodes; the
// tests build them directly.

fn factor(kind: FactorKind, line: u32) -> Factor {
    Factor {
        kind,
        line,
        ty: None,
    }
}

fn term(factors: Vec<Factor>, ops: Vec<crate::compiler::ast::MulOp>, line: u32) -> Term {
    Term {
        factors,
        ops,
        line,
        ty: None,
    }
}

fn simple(terms: Vec<Term>, ops: Vec<AddOp>, line: u32) -> SimpleExpression {
    SimpleExpression {
        sign: None,
        terms,
        ops,
        line,
        ty: None,
    }
}

fn expr_from(first: SimpleExpression, line: u32) -> Expression {
    Expression {
        first,
        rel: None,
        line,
        ty: None,
    }
}

fn single(kind: FactorKind, line: u32) -> Expression {
    expr_from(
        simple(vec![term(vec![factor(kind, line)], vec![], line)], vec![], line),
        line,
    )
}

fn number(value: f32, line: u32) -> Expression {
    single(FactorKind::NumberLiteral(value), line)
}

fn string(text: &str, line: u32) -> Expression {
    single(FactorKind::StringLiteral(text.to_string()), line)
}

fn boolean(value: bool, line: u32) -> Expression {
    single(FactorKind::BooleanLiteral(value), line)
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
    expr_from(simple(terms, ops, line), line)
}

fn compare(left: Expression, op: RelOp, right: Expression, line: u32) -> Expression {
    Expression {
        first: left.first,
        rel: Some((op, right.first)),
        line,
        ty: None,
    }
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

fn program(routines: Vec<Routine>, main: Vec<Statement>) -> Program {
    Program {
        name: "Test".to_string(),
        line: 1,
        routines,
        main,
        entry: None,
    }
}

fn analyze(program: &mut Program) -> Semantics {
    let mut semantics = Semantics::new();
    semantics.check(program);
    semantics
}

fn codes(semantics: &Semantics) -> Vec<SemanticCode> {
    semantics.errors().errors().iter().map(|e| e.code).collect()
}

#[test]
fn declaring_then_rebinding_a_number() {
    let mut p = program(
        vec![],
        vec![
            declare("x", TypeName::Number, number(1.0, 2), 2),
            assign(
                "x",
                binary(variable("x", 3), AddOp::Add, number(1.0, 3), 3),
                3,
            ),
            Statement::Display(DisplayStatement {
                value: Some(variable("x", 4)),
                line: 4,
            }),
        ],
    );

    let semantics = analyze(&mut p);
    assert_eq!(codes(&semantics), vec![]);

    let (_, predefined, stack, _) = semantics.into_parts();
    match &p.main[1] {
        Statement::Assignment(a) => {
            assert_eq!(a.lhs.ty, Some(predefined.number_type));
            assert_eq!(a.rhs.ty, Some(predefined.number_type));
            let entry = a.lhs.entry.unwrap();
            assert_eq!(stack.entry(entry).slot_number, 0);
        }
        stmt => panic!("expected assignment, got {:?}", stmt),
    }
}

#[test]
fn mixed_concatenation_types_as_string() {
    let mut p = program(
        vec![],
        vec![Statement::Display(DisplayStatement {
            value: Some(binary(string("n = ", 2), AddOp::Add, number(7.0, 2), 2)),
            line: 2,
        })],
    );

    let semantics = analyze(&mut p);
    assert_eq!(codes(&semantics), vec![]);

    let (_, predefined, _, _) = semantics.into_parts();
    match &p.main[0] {
        Statement::Display(d) => {
            let value = d.value.as_ref().unwrap();
            assert_eq!(value.ty, Some(predefined.string_type));
        }
        stmt => panic!("expected display, got {:?}", stmt),
    }
}

#[test]
fn guard_conditions_must_be_boolean() {
    let mut p = program(
        vec![],
        vec![Statement::Guard(GuardStatement {
            conditions: vec![number(1.0, 2), boolean(true, 2)],
            body: vec![],
            line: 2,
        })],
    );

    let semantics = analyze(&mut p);
    assert_eq!(codes(&semantics), vec![SemanticCode::TypeMustBeBoolean]);
}

#[test]
fn undeclared_variable_recovers_as_number() {
    let mut p = program(
        vec![],
        vec![assign(
            "y",
            binary(variable("y", 2), AddOp::Add, number(1.0, 2), 2),
            2,
        )],
    );

    let semantics = analyze(&mut p);
    // Both references to y are flagged; the recovery type keeps the
    // addition itself clean.
    assert_eq!(
        codes(&semantics),
        vec![
            SemanticCode::UndeclaredIdentifier,
            SemanticCode::UndeclaredIdentifier
        ]
    );
}

#[test]
fn redeclared_routine_body_is_skipped() {
    let routine = |line| Routine {
        kind: RoutineKind::DefinitionNoReturn,
        name: "p".to_string(),
        line,
        params: vec![],
        return_type: None,
        return_var: None,
        body: vec![assign("ghost", number(1.0, line), line)],
        entry: None,
    };
    let mut first = routine(2);
    first.body = vec![];
    let second = routine(5);

    let mut p = program(vec![first, second], vec![]);
    let semantics = analyze(&mut p);
    // No UndeclaredIdentifier for ghost: the duplicate body is never
    // analyzed.
    assert_eq!(codes(&semantics), vec![SemanticCode::RedeclaredIdentifier]);
}

#[test]
fn boolean_parameter_rejects_string_argument() {
    let greet = Routine {
        kind: RoutineKind::DefinitionNoReturn,
        name: "greet".to_string(),
        line: 2,
        params: vec![Param {
            name: "excited".to_string(),
            type_name: TypeName::Boolean,
            mode: ParamMode::Value,
            line: 2,
            entry: None,
        }],
        return_type: None,
        return_var: None,
        body: vec![],
        entry: None,
    };
    let mut p = program(
        vec![greet],
        vec![Statement::Call(Call {
            name: "greet".to_string(),
            args: vec![string("hello", 5)],
            line: 5,
            entry: None,
            ty: None,
        })],
    );

    let semantics = analyze(&mut p);
    assert_eq!(codes(&semantics), vec![SemanticCode::TypeMismatch]);
}

#[test]
fn argument_count_mismatch_skips_argument_checks() {
    let one_arg = Routine {
        kind: RoutineKind::DefinitionNoReturn,
        name: "p".to_string(),
        line: 2,
        params: vec![Param {
            name: "n".to_string(),
            type_name: TypeName::Number,
            mode: ParamMode::Value,
            line: 2,
            entry: None,
        }],
        return_type: None,
        return_var: None,
        body: vec![],
        entry: None,
    };
    let mut p = program(
        vec![one_arg],
        vec![Statement::Call(Call {
            name: "p".to_string(),
            args: vec![number(1.0, 5), variable("ghost", 5)],
            line: 5,
            entry: None,
            ty: None,
        })],
    );

    let semantics = analyze(&mut p);
    // ghost is never visited, so no UndeclaredIdentifier.
    assert_eq!(codes(&semantics), vec![SemanticCode::ArgumentCountMismatch]);
}

#[test]
fn return_variable_check_is_shallow() {
    let body = vec![Statement::If(IfStatement {
        if_branch: CondBranch {
            condition: boolean(true, 4),
            statements: vec![assign("r", number(1.0, 5), 5)],
        },
        elseif_branches: vec![],
        else_branch: None,
        line: 4,
    })];
    let f = Routine {
        kind: RoutineKind::Definition,
        name: "f".to_string(),
        line: 2,
        params: vec![],
        return_type: Some(TypeName::Number),
        return_var: Some(VariableRef {
            name: "r".to_string(),
            line: 2,
            entry: None,
            ty: None,
        }),
        body,
        entry: None,
    };

    let mut p = program(vec![f], vec![]);
    let semantics = analyze(&mut p);
    // The assignment inside the if does not count.
    assert_eq!(
        codes(&semantics),
        vec![SemanticCode::ReturnVariableUninitialized]
    );
}

#[test]
fn top_level_return_assignment_satisfies_the_check() {
    let f = Routine {
        kind: RoutineKind::Definition,
        name: "f".to_string(),
        line: 2,
        params: vec![],
        return_type: Some(TypeName::Number),
        return_var: Some(VariableRef {
            name: "r".to_string(),
            line: 2,
            entry: None,
            ty: None,
        }),
        body: vec![assign("r", number(1.0, 3), 3)],
        entry: None,
    };

    let mut p = program(vec![f], vec![]);
    let semantics = analyze(&mut p);
    assert_eq!(codes(&semantics), vec![]);
}

#[test]
fn boolean_return_type_is_rejected() {
    let f = Routine {
        kind: RoutineKind::Definition,
        name: "f".to_string(),
        line: 2,
        params: vec![],
        return_type: Some(TypeName::Boolean),
        return_var: Some(VariableRef {
            name: "r".to_string(),
            line: 2,
            entry: None,
            ty: None,
        }),
        body: vec![assign("r", boolean(false, 3), 3)],
        entry: None,
    };

    let mut p = program(vec![f], vec![]);
    let semantics = analyze(&mut p);
    // boolean is an enumeration, which the return check rejects; the
    // routine's return type falls back to number while the return
    // variable itself keeps its declared type.
    assert_eq!(codes(&semantics), vec![SemanticCode::InvalidReturnType]);

    let (_, predefined, stack, _) = semantics.into_parts();
    let f_entry = p.routines[0].entry.unwrap();
    assert_eq!(
        stack.entry(f_entry).typespec,
        Some(predefined.number_type)
    );
}

#[test]
fn number_compared_to_boolean_is_promoted() {
    let mut p = program(
        vec![],
        vec![declare(
            "b",
            TypeName::Boolean,
            compare(number(1.0, 2), RelOp::Lt, boolean(true, 2), 2),
            2,
        )],
    );

    let semantics = analyze(&mut p);
    // The first operand is reinterpreted as boolean, so the comparison
    // passes. The promotion is one-directional.
    assert_eq!(codes(&semantics), vec![]);
}

#[test]
fn string_compared_to_boolean_is_not_promoted() {
    let mut p = program(
        vec![],
        vec![declare(
            "b",
            TypeName::Boolean,
            compare(string("a", 2), RelOp::Lt, boolean(true, 2), 2),
            2,
        )],
    );

    let semantics = analyze(&mut p);
    assert_eq!(
        codes(&semantics),
        vec![SemanticCode::IncompatibleComparison]
    );
}

#[test]
fn or_over_two_numbers_recovers_as_boolean() {
    let mut p = program(
        vec![],
        vec![declare(
            "b",
            TypeName::Boolean,
            binary(number(1.0, 2), AddOp::Or, number(2.0, 2), 2),
            2,
        )],
    );

    let semantics = analyze(&mut p);
    // The operands are flagged once; the result type stays boolean so
    // the declaring assignment itself is clean.
    assert_eq!(
        codes(&semantics),
        vec![SemanticCode::TypeMustBeBooleanOrNumeric]
    );
}

#[test]
fn redeclaring_a_variable_is_flagged() {
    let mut p = program(
        vec![],
        vec![
            declare("x", TypeName::Number, number(1.0, 2), 2),
            declare("x", TypeName::String, string("a", 3), 3),
        ],
    );

    let semantics = analyze(&mut p);
    assert_eq!(codes(&semantics), vec![SemanticCode::RedeclaredIdentifier]);
}

#[test]
fn assignment_types_must_match() {
    let mut p = program(
        vec![],
        vec![declare("x", TypeName::Number, string("a", 2), 2)],
    );

    let semantics = analyze(&mut p);
    assert_eq!(
        codes(&semantics),
        vec![SemanticCode::IncompatibleAssignment]
    );
}

#[test]
fn calling_a_procedure_as_a_function_is_flagged() {
    let p_routine = Routine {
        kind: RoutineKind::DefinitionNoReturn,
        name: "p".to_string(),
        line: 2,
        params: vec![],
        return_type: None,
        return_var: None,
        body: vec![],
        entry: None,
    };
    let mut p = program(
        vec![p_routine],
        vec![declare(
            "x",
            TypeName::Number,
            single(
                FactorKind::Call(Call {
                    name: "p".to_string(),
                    args: vec![],
                    line: 5,
                    entry: None,
                    ty: None,
                }),
                5,
            ),
            5,
        )],
    );

    let semantics = analyze(&mut p);
    // The call factor recovers as number, so the assignment stays clean.
    assert_eq!(codes(&semantics), vec![SemanticCode::NameMustBeDefinition]);
}
