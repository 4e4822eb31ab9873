//! Emission of expressions. Numbers compute as floats, booleans as
//! ints holding 0 or 1, and mixed number/boolean operands blend by
//! converting the numeric side to a 0/1 flag. Mixed string/number
//! addition concatenates through a `StringBuilder`.

use crate::compiler::ast::{
    AddOp, Expression, Factor, FactorKind, MulOp, RelOp, Sign, SimpleExpression, Term,
};

use super::emitter::Opcode;
use super::CodeGenerator;

impl<'a> CodeGenerator<'a> {
    pub(super) fn emit_expression(&mut self, expr: &Expression) {
        self.emit_simple_expression(&expr.first);

        if let Some((op, second)) = &expr.rel {
            let type1 = expr.first.ty;
            let type2 = second.ty;
            let number_mode = type1 == Some(self.predefined.number_type)
                && type2 == Some(self.predefined.number_type);

            let branch_op = match op {
                RelOp::Eq => Opcode::Ifeq,
                RelOp::Ne => Opcode::Ifne,
                RelOp::Lt => Opcode::Iflt,
                RelOp::Le => Opcode::Ifle,
                RelOp::Gt => Opcode::Ifgt,
                RelOp::Ge => Opcode::Ifge,
            };
            let true_label = self.emitter.next_label();
            let exit_label = self.emitter.next_label();

            self.emit_simple_expression(second);
            if number_mode {
                self.emitter.emit(Opcode::Fcmpg);
            } else {
                self.emitter.emit_operand(
                    Opcode::Invokevirtual,
                    "java/lang/String.compareTo(Ljava/lang/String;)I",
                );
                self.emitter.local_stack.decrease(1);
            }
            self.emitter.emit_operand(branch_op, &true_label);

            self.emitter.emit(Opcode::Iconst0);
            self.emitter.emit_operand(Opcode::Goto, &exit_label);
            self.emitter.emit_label(&true_label);
            self.emitter.emit(Opcode::Iconst1);
            self.emitter.emit_label(&exit_label);
            self.emitter.local_stack.decrease(1);
        }
    }

    fn emit_simple_expression(&mut self, simple: &SimpleExpression) {
        let negate = simple.sign == Some(Sign::Minus);

        self.emit_term(&simple.terms[0]);
        let mut type1 = simple.terms[0].ty;
        if negate {
            self.emitter.emit(Opcode::Fneg);
        }

        for i in 1..simple.terms.len() {
            let op = simple.ops[i - 1];
            let term2 = &simple.terms[i];
            let type2 = term2.ty;

            let number1 = type1 == Some(self.predefined.number_type);
            let number2 = type2 == Some(self.predefined.number_type);
            let boolean1 = type1 == Some(self.predefined.boolean_type);
            let boolean2 = type2 == Some(self.predefined.boolean_type);
            let string1 = type1 == Some(self.predefined.string_type);
            let string2 = type2 == Some(self.predefined.string_type);

            if number1 && number2 {
                self.emit_term(term2);
                self.emitter.emit(if op == AddOp::Subtract {
                    Opcode::Fsub
                } else {
                    Opcode::Fadd
                });
            } else if boolean1 && boolean2 {
                self.emit_term(term2);
                self.emitter.emit(Opcode::Ior);
            } else if boolean1 && number2 {
                // Blend: the numeric side collapses to a 0/1 flag.
                let false_label = self.emitter.next_label();
                let skip_label = self.emitter.next_label();
                self.emit_term(term2);
                self.emitter.emit(Opcode::F2i);
                self.emitter.emit_operand(Opcode::Ifeq, &false_label);
                self.emitter.emit(Opcode::Iconst1);
                self.emitter.emit_operand(Opcode::Goto, &skip_label);
                self.emitter.emit_label(&false_label);
                self.emitter.emit(Opcode::Iconst0);
                self.emitter.emit_label(&skip_label);
                self.emitter.emit(Opcode::Ior);
                self.emitter.local_stack.decrease(1);
            } else if number1 && boolean2 {
                let false_label = self.emitter.next_label();
                let skip_label = self.emitter.next_label();
                self.emitter.emit(Opcode::F2i);
                self.emitter.emit_operand(Opcode::Ifeq, &false_label);
                self.emitter.emit(Opcode::Iconst1);
                self.emitter.emit_operand(Opcode::Goto, &skip_label);
                self.emitter.emit_label(&false_label);
                self.emitter.emit(Opcode::Iconst0);
                self.emitter.emit_label(&skip_label);
                self.emit_term(term2);
                self.emitter.emit(Opcode::Ior);
                self.emitter.local_stack.decrease(1);
            } else if string1 && number2 {
                self.emit_concatenation(
                    term2,
                    "java/lang/String/valueOf(Ljava/lang/Object;)Ljava/lang/String;",
                    "java/lang/StringBuilder/append(F)Ljava/lang/StringBuilder;",
                );
            } else if number1 && string2 {
                self.emit_concatenation(
                    term2,
                    "java/lang/String/valueOf(F)Ljava/lang/String;",
                    "java/lang/StringBuilder/append(Ljava/lang/String;)Ljava/lang/StringBuilder;",
                );
                type1 = Some(self.predefined.string_type);
            } else {
                self.emit_concatenation(
                    term2,
                    "java/lang/String/valueOf(Ljava/lang/Object;)Ljava/lang/String;",
                    "java/lang/StringBuilder/append(Ljava/lang/String;)Ljava/lang/StringBuilder;",
                );
            }
        }
    }

    /// Concatenate the value already on the stack with the next term:
    /// wrap the first value in a fresh `StringBuilder`, append the
    /// second, and take the resulting string.
    fn emit_concatenation(
        &mut self,
        term2: &Term,
        value_of: &str,
        append: &str,
    ) {
        self.emitter
            .emit_operand(Opcode::New, "java/lang/StringBuilder");
        self.emitter.emit(Opcode::DupX1);
        self.emitter.emit(Opcode::Swap);
        self.emitter.emit_operand(Opcode::Invokestatic, value_of);
        self.emitter.emit_operand(
            Opcode::Invokespecial,
            "java/lang/StringBuilder/<init>(Ljava/lang/String;)V",
        );
        self.emitter.local_stack.decrease(1);
        self.emit_term(term2);
        self.emitter.emit_operand(Opcode::Invokevirtual, append);
        self.emitter.local_stack.decrease(1);
        self.emitter.emit_operand(
            Opcode::Invokevirtual,
            "java/lang/StringBuilder/toString()Ljava/lang/String;",
        );
        self.emitter.local_stack.decrease(1);
    }

    fn emit_term(&mut self, term: &Term) {
        self.emit_factor(&term.factors[0]);
        let type1 = term.factors[0].ty;

        for i in 1..term.factors.len() {
            let op = term.ops[i - 1];
            let factor2 = &term.factors[i];
            let type2 = factor2.ty;

            let number1 = type1 == Some(self.predefined.number_type);
            let number2 = type2 == Some(self.predefined.number_type);
            let boolean1 = type1 == Some(self.predefined.boolean_type);
            let boolean2 = type2 == Some(self.predefined.boolean_type);

            if number1 && number2 {
                self.emit_factor(factor2);
                self.emitter.emit(if op == MulOp::Divide {
                    Opcode::Fdiv
                } else {
                    Opcode::Fmul
                });
            } else if number1 && boolean2 {
                let false_label = self.emitter.next_label();
                let skip_label = self.emitter.next_label();
                self.emitter.emit(Opcode::F2i);
                self.emitter.emit_operand(Opcode::Ifeq, &false_label);
                self.emitter.emit(Opcode::Iconst1);
                self.emitter.emit_operand(Opcode::Goto, &skip_label);
                self.emitter.emit_label(&false_label);
                self.emitter.emit(Opcode::Iconst0);
                self.emitter.emit_label(&skip_label);
                self.emit_factor(factor2);
                self.emitter.emit(Opcode::Iand);
                self.emitter.local_stack.decrease(1);
            } else if boolean1 && number2 {
                let false_label = self.emitter.next_label();
                let skip_label = self.emitter.next_label();
                self.emit_factor(factor2);
                self.emitter.emit(Opcode::F2i);
                self.emitter.emit_operand(Opcode::Ifeq, &false_label);
                self.emitter.emit(Opcode::Iconst1);
                self.emitter.emit_operand(Opcode::Goto, &skip_label);
                self.emitter.emit_label(&false_label);
                self.emitter.emit(Opcode::Iconst0);
                self.emitter.emit_label(&skip_label);
                self.emitter.emit(Opcode::Iand);
                self.emitter.local_stack.decrease(1);
            } else {
                self.emit_factor(factor2);
                self.emitter.emit(Opcode::Iand);
            }
        }
    }

    fn emit_factor(&mut self, factor: &Factor) {
        match &factor.kind {
            FactorKind::Variable(variable) => {
                if let Some(entry_id) = variable.entry {
                    self.emit_load_variable(entry_id);
                }
            }
            FactorKind::NumberLiteral(value) => {
                self.emitter.emit_load_float(*value);
            }
            FactorKind::StringLiteral(text) => {
                self.emitter.emit_load_string(text);
            }
            FactorKind::BooleanLiteral(value) => {
                self.emitter.emit(if *value {
                    Opcode::Iconst1
                } else {
                    Opcode::Iconst0
                });
            }
            FactorKind::Call(call) => {
                self.emit_call(call);
            }
            FactorKind::Not(inner) => {
                self.emit_factor(inner);
                self.emitter.emit(Opcode::Iconst1);
                self.emitter.emit(Opcode::Ixor);
            }
            FactorKind::Parenthesized(expr) => {
                self.emit_expression(expr);
            }
        }
    }
}
