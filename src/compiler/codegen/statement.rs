//! Emission of statements: assignments, control flow, calls, display.

use crate::compiler::ast::{
    Assignment, Call, DisplayStatement, GuardStatement, IfStatement, Statement, WhileStatement,
};
use crate::compiler::intermediate::symtab::Kind;
use crate::compiler::intermediate::typespec::Form;

use super::emitter::Opcode;
use super::CodeGenerator;

impl<'a> CodeGenerator<'a> {
    pub(super) fn emit_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Assignment(assignment) => self.emit_assignment(assignment),
            Statement::If(if_stmt) => self.emit_if(if_stmt),
            Statement::While(while_stmt) => self.emit_while(while_stmt),
            Statement::Guard(guard) => self.emit_guard(guard),
            Statement::Call(call) => self.emit_call(call),
            Statement::Display(display) => self.emit_display(display),
        }
    }

    fn emit_assignment(&mut self, assignment: &Assignment) {
        self.emit_expression(&assignment.rhs);
        if let Some(entry_id) = assignment.lhs.entry {
            self.emit_store_variable(entry_id);
        }
    }

    fn emit_if(&mut self, if_stmt: &IfStatement) {
        let next_label = self.emitter.next_label();
        self.emit_expression(&if_stmt.if_branch.condition);

        let has_elseifs = !if_stmt.elseif_branches.is_empty();
        match (&if_stmt.else_branch, has_elseifs) {
            (None, false) => {
                self.emitter.emit_operand(Opcode::Ifeq, &next_label);
                for stmt in &if_stmt.if_branch.statements {
                    self.emit_statement(stmt);
                }
            }
            (Some(else_stmts), false) => {
                let false_label = self.emitter.next_label();
                self.emitter.emit_operand(Opcode::Ifeq, &false_label);
                for stmt in &if_stmt.if_branch.statements {
                    self.emit_statement(stmt);
                }
                self.emitter.emit_operand(Opcode::Goto, &next_label);
                self.emitter.emit_label(&false_label);
                for stmt in else_stmts {
                    self.emit_statement(stmt);
                }
            }
            (else_branch, true) => {
                let mut elseif_label = self.emitter.next_label();
                self.emitter.emit_operand(Opcode::Ifeq, &elseif_label);
                for stmt in &if_stmt.if_branch.statements {
                    self.emit_statement(stmt);
                }
                self.emitter.emit_operand(Opcode::Goto, &next_label);
                for branch in &if_stmt.elseif_branches {
                    self.emitter.emit_label(&elseif_label);
                    self.emit_expression(&branch.condition);
                    elseif_label = self.emitter.next_label();
                    self.emitter.emit_operand(Opcode::Ifeq, &elseif_label);
                    for stmt in &branch.statements {
                        self.emit_statement(stmt);
                    }
                    self.emitter.emit_operand(Opcode::Goto, &next_label);
                }
                self.emitter.emit_label(&elseif_label);
                if let Some(else_stmts) = else_branch {
                    for stmt in else_stmts {
                        self.emit_statement(stmt);
                    }
                }
            }
        }

        self.emitter.emit_label(&next_label);
    }

    fn emit_while(&mut self, while_stmt: &WhileStatement) {
        let top_label = self.emitter.next_label();
        let exit_label = self.emitter.next_label();

        self.emitter.emit_label(&top_label);
        self.emit_expression(&while_stmt.condition);
        self.emitter.emit_operand(Opcode::Ifeq, &exit_label);
        for stmt in &while_stmt.body {
            self.emit_statement(stmt);
        }
        self.emitter.emit_operand(Opcode::Goto, &top_label);
        self.emitter.emit_label(&exit_label);
    }

    /// Every guard condition is re-checked before each body statement,
    /// so a statement that falsifies a condition stops the body at the
    /// next step.
    fn emit_guard(&mut self, guard: &GuardStatement) {
        let start_label = self.emitter.next_label();
        let end_label = self.emitter.next_label();

        for condition in &guard.conditions {
            self.emit_expression(condition);
            self.emitter.emit_operand(Opcode::Ifeq, &end_label);
        }
        self.emitter.emit_label(&start_label);
        for stmt in &guard.body {
            for condition in &guard.conditions {
                self.emit_expression(condition);
                self.emitter.emit_operand(Opcode::Ifeq, &end_label);
            }
            self.emit_statement(stmt);
        }
        self.emitter.emit_label(&end_label);
    }

    /// Invoke a routine as a private static method of the program class.
    /// Shared by procedure call statements and function call factors.
    pub(super) fn emit_call(&mut self, call: &Call) {
        let entry_id = match call.entry {
            Some(id) => id,
            None => return,
        };
        let name = self.stack.entry(entry_id).name.clone();

        let mut signature = format!("{}/{}(", self.program_name, name);
        for arg in &call.args {
            self.emit_expression(arg);
            signature.push_str(self.type_descriptor(arg.ty));
        }
        signature.push(')');
        let return_descriptor = if self.stack.entry(entry_id).kind == Kind::Definition {
            self.type_descriptor(self.stack.entry(entry_id).typespec)
        } else {
            "V"
        };
        signature.push_str(return_descriptor);

        self.emitter.emit_operand(Opcode::Invokestatic, signature);
        self.emitter.local_stack.decrease(call.args.len() as i32);
        if return_descriptor != "V" {
            self.emitter.local_stack.increase(1);
        }
    }

    fn emit_display(&mut self, display: &DisplayStatement) {
        self.emitter.emit_operands(
            Opcode::Getstatic,
            "java/lang/System/out",
            "Ljava/io/PrintStream;",
        );

        match &display.value {
            None => {
                self.emitter
                    .emit_operand(Opcode::Invokevirtual, "java/io/PrintStream/println()V");
                self.emitter.local_stack.decrease(1);
            }
            Some(expr) => {
                let ty = expr.ty;
                let format = if ty == Some(self.predefined.number_type) {
                    "%f"
                } else if ty == Some(self.predefined.boolean_type) {
                    "%b"
                } else {
                    "%s"
                };
                self.emitter.emit_load_string(&format!("{}\\n", format));
                self.emitter.emit(Opcode::Iconst1);
                self.emitter
                    .emit_operand(Opcode::Anewarray, "java/lang/Object");
                self.emitter.emit(Opcode::Dup);
                self.emitter.emit(Opcode::Iconst0);

                self.emit_expression(expr);

                // printf takes objects, so scalar values get boxed.
                let boxable = ty.map_or(false, |t| {
                    matches!(
                        self.types.get(self.types.base_type(t)).form,
                        Form::Scalar | Form::Enumeration { .. }
                    )
                }) && ty != Some(self.predefined.string_type);
                if boxable {
                    if let Some(signature) = self.value_of_signature(ty) {
                        self.emitter.emit_operand(Opcode::Invokestatic, signature);
                    }
                }

                self.emitter.emit(Opcode::Aastore);
                self.emitter.emit_operand(
                    Opcode::Invokevirtual,
                    "java/io/PrintStream/printf(Ljava/lang/String;[Ljava/lang/Object;)Ljava/io/PrintStream;",
                );
                self.emitter.local_stack.decrease(2);
                self.emitter.emit(Opcode::Pop);
            }
        }
    }
}
