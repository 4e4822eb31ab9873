/*!
The semantic pass.

Walks the annotated tree once, building scopes and symbol tables,
resolving every identifier, applying the permissive
number/boolean/string coercion rules, and recording each node's
resolved type and entry in its annotation slots. Errors accumulate in
the [`SemanticErrorHandler`]; analysis always continues with a recovery
type so that independent errors surface in a single run. The error
count gates code generation afterwards.
*/

pub mod error;

#[cfg(test)]
mod tests;

use log::debug;

use crate::compiler::ast::{
    AddOp, Assignment, Call, DisplayStatement, Expression, Factor, FactorKind, GuardStatement,
    IfStatement, MulOp, ParamMode, Program, Routine, RoutineKind, SimpleExpression, Statement,
    Term, TypeName, VariableRef, WhileStatement,
};
use crate::compiler::intermediate::predefined::Predefined;
use crate::compiler::intermediate::stack::SymtabStack;
use crate::compiler::intermediate::symtab::{EntryId, EntryInfo, Kind, SymtabId};
use crate::compiler::intermediate::type_checker as check;
use crate::compiler::intermediate::typespec::{Form, TypeId, Types};

use self::error::{SemanticCode, SemanticErrorHandler};

pub struct Semantics {
    types: Types,
    predefined: Predefined,
    stack: SymtabStack,
    errors: SemanticErrorHandler,
}

impl Semantics {
    pub fn new() -> Self {
        let mut types = Types::new();
        let mut stack = SymtabStack::new();
        let predefined = Predefined::initialize(&mut types, &mut stack);

        Semantics {
            types,
            predefined,
            stack,
            errors: SemanticErrorHandler::new(),
        }
    }

    pub fn error_count(&self) -> usize {
        self.errors.count()
    }

    pub fn errors(&self) -> &SemanticErrorHandler {
        &self.errors
    }

    pub fn program_id(&self) -> Option<EntryId> {
        self.stack.program_id()
    }

    /// Hand the resolved tables over to the code generator.
    pub fn into_parts(self) -> (Types, Predefined, SymtabStack, SemanticErrorHandler) {
        (self.types, self.predefined, self.stack, self.errors)
    }

    /// Run the pass over a whole program.
    pub fn check(&mut self, program: &mut Program) {
        debug!("semantic pass over program {}", program.name);

        let program_id = self.stack.enter_local(&program.name, Kind::Program);
        let scope = self.stack.push();
        if let EntryInfo::Routine { symtab, .. } = &mut self.stack.entry_mut(program_id).info {
            *symtab = Some(scope);
        }
        self.stack.set_program_id(program_id);
        self.stack.table_mut(scope).owner = Some(program_id);
        program.entry = Some(program_id);

        for index in 0..program.routines.len() {
            self.visit_routine(index, &mut program.routines[index]);
        }
        for stmt in &mut program.main {
            self.visit_statement(stmt);
        }
    }

    fn named_type(&self, name: TypeName) -> TypeId {
        match name {
            TypeName::Number => self.predefined.number_type,
            TypeName::Boolean => self.predefined.boolean_type,
            TypeName::String => self.predefined.string_type,
        }
    }

    // Routines ____________________________________________________________

    fn visit_routine(&mut self, index: usize, routine: &mut Routine) {
        let name = routine.name.to_lowercase();

        // A redeclared routine keeps the first declaration; the body of
        // the second is not analyzed at all.
        if self.stack.lookup_local(&name).is_some() {
            self.errors
                .flag(SemanticCode::RedeclaredIdentifier, routine.line, &name);
            return;
        }

        let kind = match routine.kind {
            RoutineKind::Definition => Kind::Definition,
            RoutineKind::DefinitionNoReturn => Kind::DefinitionNoReturn,
        };
        let routine_id = self.stack.enter_local(&name, kind);
        routine.entry = Some(routine_id);

        let parent = self.stack.table(self.stack.local_symtab()).owner;
        if let Some(parent_id) = parent {
            if let EntryInfo::Routine { subroutines, .. } =
                &mut self.stack.entry_mut(parent_id).info
            {
                subroutines.push(routine_id);
            }
        }

        let scope = self.stack.push();
        if let EntryInfo::Routine { symtab, .. } = &mut self.stack.entry_mut(routine_id).info {
            *symtab = Some(scope);
        }
        self.stack.table_mut(scope).owner = Some(routine_id);
        debug!("entering routine {} at scope {:?}", name, scope);

        self.declare_parameters(routine, routine_id, scope);

        if routine.kind == RoutineKind::Definition {
            self.resolve_definition_return(routine, routine_id, scope, &name);
        } else {
            for stmt in &mut routine.body {
                self.visit_statement(stmt);
            }
        }

        if let EntryInfo::Routine { executable, .. } = &mut self.stack.entry_mut(routine_id).info {
            *executable = Some(index);
        }

        self.stack.pop();
    }

    fn declare_parameters(&mut self, routine: &mut Routine, routine_id: EntryId, scope: SymtabId) {
        let mut parameter_ids = Vec::with_capacity(routine.params.len());

        for param in &mut routine.params {
            let kind = match param.mode {
                ParamMode::Value => Kind::ValueParameter,
                ParamMode::Reference => Kind::ReferenceParameter,
            };
            let id = match self.stack.lookup_local(&param.name) {
                None => self.stack.enter_local(&param.name, kind),
                Some(existing) => {
                    self.errors.flag(
                        SemanticCode::RedeclaredIdentifier,
                        param.line,
                        &param.name,
                    );
                    existing
                }
            };
            let ty = self.named_type(param.type_name);
            self.stack.entry_mut(id).typespec = Some(ty);
            self.stack.entry_mut(id).append_line_number(param.line);
            param.entry = Some(id);
            parameter_ids.push(id);
        }

        if let EntryInfo::Routine { parameters, .. } = &mut self.stack.entry_mut(routine_id).info {
            *parameters = parameter_ids.clone();
        }
        for id in parameter_ids {
            let slot = self.stack.table_mut(scope).next_slot_number();
            self.stack.entry_mut(id).slot_number = slot;
        }
    }

    /// Resolve a function's return type, declare the implicit result
    /// variable, analyze the body, and apply the top-level-only check
    /// that the designated return variable was assigned.
    fn resolve_definition_return(
        &mut self,
        routine: &mut Routine,
        routine_id: EntryId,
        scope: SymtabId,
        name: &str,
    ) {
        let (mut return_type, return_var_name, return_var_line) = match &mut routine.return_var {
            Some(return_var) => {
                let var_name = return_var.name.to_lowercase();
                let ty = match routine.return_type {
                    Some(type_name) => {
                        let declared = self.named_type(type_name);
                        let return_id = match self.stack.lookup_local(&var_name) {
                            None => {
                                let id = self.stack.enter_local(&var_name, Kind::ValueParameter);
                                let slot = self.stack.table_mut(scope).next_slot_number();
                                self.stack.entry_mut(id).slot_number = slot;
                                id
                            }
                            Some(existing) => {
                                self.errors.flag(
                                    SemanticCode::RedeclaredIdentifier,
                                    return_var.line,
                                    &var_name,
                                );
                                existing
                            }
                        };
                        self.visit_variable(return_var);
                        self.stack.entry_mut(return_id).typespec = Some(declared);
                        declared
                    }
                    None => {
                        // Inferred from whatever the return variable
                        // resolves to.
                        self.visit_variable(return_var);
                        return_var.ty.unwrap_or(self.predefined.undefined_type)
                    }
                };
                (ty, var_name, return_var.line)
            }
            None => {
                self.errors.flag(
                    SemanticCode::ReturnVariableUninitialized,
                    routine.line,
                    name,
                );
                (self.predefined.number_type, String::new(), routine.line)
            }
        };

        // boolean is an enumeration, so a boolean return flags this too.
        if !matches!(self.types.get(return_type).form, Form::Scalar) {
            self.errors.flag(
                SemanticCode::InvalidReturnType,
                return_var_line,
                &return_var_name,
            );
            return_type = self.predefined.number_type;
        }

        self.stack.entry_mut(routine_id).typespec = Some(return_type);

        // The implicit result variable shares the routine's name.
        let result_id = self.stack.enter_local(name, Kind::Variable);
        let slot = self.stack.table_mut(scope).next_slot_number();
        self.stack.entry_mut(result_id).slot_number = slot;
        self.stack.entry_mut(result_id).typespec = Some(return_type);

        for stmt in &mut routine.body {
            self.visit_statement(stmt);
        }

        if routine.return_var.is_some() {
            // Deliberately shallow: only direct assignments in the body's
            // top-level statement list count.
            let assigned = routine.body.iter().any(|stmt| match stmt {
                Statement::Assignment(a) => a.lhs.name.to_lowercase() == return_var_name,
                _ => false,
            });
            if !assigned {
                self.errors.flag(
                    SemanticCode::ReturnVariableUninitialized,
                    return_var_line,
                    &return_var_name,
                );
            }
        }
    }

    // Statements __________________________________________________________

    fn visit_statement(&mut self, stmt: &mut Statement) {
        match stmt {
            Statement::Assignment(assignment) => self.visit_assignment(assignment),
            Statement::If(if_stmt) => self.visit_if(if_stmt),
            Statement::While(while_stmt) => self.visit_while(while_stmt),
            Statement::Guard(guard) => self.visit_guard(guard),
            Statement::Call(call) => self.visit_procedure_call(call),
            Statement::Display(display) => self.visit_display(display),
        }
    }

    fn visit_assignment(&mut self, assignment: &mut Assignment) {
        let lhs_type = match assignment.declared {
            // Declaring assignment: enters the name into the local scope.
            Some(type_name) => {
                if self.stack.lookup_local(&assignment.lhs.name).is_some() {
                    self.errors.flag(
                        SemanticCode::RedeclaredIdentifier,
                        assignment.lhs.line,
                        &assignment.lhs.name,
                    );
                }
                let declared = self.named_type(type_name);
                let var_id = self.stack.enter_local(&assignment.lhs.name, Kind::Variable);
                self.stack.entry_mut(var_id).typespec = Some(declared);

                // The name is in scope for its own initializer.
                self.visit_variable(&mut assignment.lhs);
                self.visit_expression(&mut assignment.rhs);

                let table = self.stack.local_symtab();
                let slot = self.stack.table_mut(table).next_slot_number();
                self.stack.entry_mut(var_id).slot_number = slot;
                Some(declared)
            }
            None => {
                self.visit_variable(&mut assignment.lhs);
                self.visit_expression(&mut assignment.rhs);
                assignment.lhs.ty
            }
        };

        if !check::are_assignment_compatible(&self.types, lhs_type, assignment.rhs.ty) {
            self.errors.flag(
                SemanticCode::IncompatibleAssignment,
                assignment.rhs.line,
                assignment.rhs.to_string(),
            );
        }
    }

    fn visit_condition(&mut self, condition: &mut Expression) {
        self.visit_expression(condition);
        if !check::is_boolean(&self.types, &self.predefined, condition.ty) {
            self.errors.flag(
                SemanticCode::TypeMustBeBoolean,
                condition.line,
                condition.to_string(),
            );
        }
    }

    fn visit_if(&mut self, if_stmt: &mut IfStatement) {
        self.visit_condition(&mut if_stmt.if_branch.condition);
        for stmt in &mut if_stmt.if_branch.statements {
            self.visit_statement(stmt);
        }
        for branch in &mut if_stmt.elseif_branches {
            self.visit_condition(&mut branch.condition);
            for stmt in &mut branch.statements {
                self.visit_statement(stmt);
            }
        }
        if let Some(else_stmts) = &mut if_stmt.else_branch {
            for stmt in else_stmts {
                self.visit_statement(stmt);
            }
        }
    }

    fn visit_while(&mut self, while_stmt: &mut WhileStatement) {
        self.visit_condition(&mut while_stmt.condition);
        for stmt in &mut while_stmt.body {
            self.visit_statement(stmt);
        }
    }

    fn visit_guard(&mut self, guard: &mut GuardStatement) {
        for condition in &mut guard.conditions {
            self.visit_condition(condition);
        }
        for stmt in &mut guard.body {
            self.visit_statement(stmt);
        }
    }

    fn visit_display(&mut self, display: &mut DisplayStatement) {
        if let Some(expr) = &mut display.value {
            self.visit_expression(expr);
        }
    }

    fn visit_procedure_call(&mut self, call: &mut Call) {
        let name = call.name.to_lowercase();
        let routine_id = self.stack.lookup(&name);

        match routine_id {
            Some(id) if self.stack.entry(id).kind == Kind::DefinitionNoReturn => {
                let parameters = self.stack.entry(id).routine_parameters().to_vec();
                self.check_call_arguments(&mut call.args, &parameters, call.line);
            }
            Some(_) => {
                self.errors
                    .flag(SemanticCode::NameMustBeDefinitionNoReturn, call.line, &name);
                for arg in &mut call.args {
                    self.visit_expression(arg);
                }
            }
            None => {
                self.errors
                    .flag(SemanticCode::UndeclaredIdentifier, call.line, &name);
                for arg in &mut call.args {
                    self.visit_expression(arg);
                }
            }
        }

        call.entry = routine_id;
    }

    fn visit_function_call(&mut self, call: &mut Call) {
        let name = call.name.to_lowercase();
        let routine_id = self.stack.lookup(&name);

        // Recovery type for a bad callee.
        call.ty = Some(self.predefined.number_type);

        match routine_id {
            Some(id) if self.stack.entry(id).kind == Kind::Definition => {
                let parameters = self.stack.entry(id).routine_parameters().to_vec();
                self.check_call_arguments(&mut call.args, &parameters, call.line);
                if let Some(return_type) = self.stack.entry(id).typespec {
                    call.ty = Some(return_type);
                }
            }
            Some(_) => {
                self.errors
                    .flag(SemanticCode::NameMustBeDefinition, call.line, &name);
                for arg in &mut call.args {
                    self.visit_expression(arg);
                }
            }
            None => {
                self.errors
                    .flag(SemanticCode::UndeclaredIdentifier, call.line, &name);
                for arg in &mut call.args {
                    self.visit_expression(arg);
                }
            }
        }

        call.entry = routine_id;
    }

    /// Check a call's arguments against the callee's formal parameters.
    /// A count mismatch skips the per-argument checks entirely.
    fn check_call_arguments(
        &mut self,
        args: &mut [Expression],
        parameters: &[EntryId],
        line: u32,
    ) {
        if parameters.len() != args.len() {
            let text = args
                .iter()
                .map(|arg| arg.to_string())
                .collect::<Vec<_>>()
                .join(",");
            self.errors
                .flag(SemanticCode::ArgumentCountMismatch, line, text);
            return;
        }

        for (arg, &parm_id) in args.iter_mut().zip(parameters) {
            self.visit_expression(arg);

            let parm_kind = self.stack.entry(parm_id).kind;
            let parm_type = self.stack.entry(parm_id).typespec;

            if parm_kind == Kind::ReferenceParameter {
                // The argument must be a bare variable of the exact type.
                if arg.is_variable() {
                    if parm_type != arg.ty {
                        self.errors
                            .flag(SemanticCode::TypeMismatch, arg.line, arg.to_string());
                    }
                } else {
                    self.errors.flag(
                        SemanticCode::ArgumentMustBeVariable,
                        arg.line,
                        arg.to_string(),
                    );
                }
            } else if !check::are_assignment_compatible(&self.types, parm_type, arg.ty) {
                self.errors
                    .flag(SemanticCode::TypeMismatch, arg.line, arg.to_string());
            }
        }
    }

    // Expressions _________________________________________________________

    fn visit_expression(&mut self, expr: &mut Expression) {
        self.visit_simple_expression(&mut expr.first);
        expr.ty = expr.first.ty;

        let mut incompatible = false;
        if let Some((_, second)) = &mut expr.rel {
            self.visit_simple_expression(second);

            // Promotion quirk: a boolean second operand reinterprets a
            // non-string first operand as boolean before the check. There
            // is no symmetric rule for a boolean first operand.
            if second.ty == Some(self.predefined.boolean_type)
                && expr.first.ty != Some(self.predefined.string_type)
            {
                expr.first.ty = Some(self.predefined.boolean_type);
            }

            if !check::are_comparison_compatible(&self.types, expr.first.ty, second.ty) {
                incompatible = true;
            }
        }

        if expr.rel.is_some() {
            if incompatible {
                self.errors.flag(
                    SemanticCode::IncompatibleComparison,
                    expr.line,
                    expr.to_string(),
                );
            }
            expr.ty = Some(self.predefined.boolean_type);
        }
    }

    fn visit_simple_expression(&mut self, simple: &mut SimpleExpression) {
        let has_sign = simple.sign.is_some();
        let sign_text = simple.sign.map(|s| s.to_string()).unwrap_or_default();

        self.visit_term(&mut simple.terms[0]);
        let mut type1 = simple.terms[0].ty;

        for i in 1..simple.terms.len() {
            let op = simple.ops[i - 1];
            self.visit_term(&mut simple.terms[i]);
            let mut type2 = simple.terms[i].ty;

            let first_text = simple.terms[0].to_string();
            let first_line = simple.terms[0].line;
            let second_text = simple.terms[i].to_string();
            let second_line = simple.terms[i].line;

            match op {
                AddOp::Or => {
                    if check::is_string(&self.types, &self.predefined, type1) {
                        self.errors.flag(
                            SemanticCode::TypeMustBeBooleanOrNumeric,
                            first_line,
                            &first_text,
                        );
                        type1 = Some(self.predefined.boolean_type);
                    }
                    if check::is_string(&self.types, &self.predefined, type2) {
                        self.errors.flag(
                            SemanticCode::TypeMustBeBooleanOrNumeric,
                            second_line,
                            &second_text,
                        );
                        type2 = Some(self.predefined.boolean_type);
                    }
                    let blendable = (check::is_boolean(&self.types, &self.predefined, type1)
                        && check::is_number(&self.types, &self.predefined, type2))
                        || (check::is_boolean(&self.types, &self.predefined, type2)
                            && check::is_number(&self.types, &self.predefined, type1))
                        || check::are_both_boolean(&self.types, &self.predefined, type1, type2);
                    if !blendable {
                        self.errors.flag(
                            SemanticCode::TypeMustBeBooleanOrNumeric,
                            second_line,
                            &second_text,
                        );
                    }
                    if has_sign {
                        self.errors
                            .flag(SemanticCode::InvalidSign, simple.line, &sign_text);
                    }
                    type2 = Some(self.predefined.boolean_type);
                }
                AddOp::Add => {
                    if check::are_both_number(&self.types, &self.predefined, type1, type2) {
                        type2 = Some(self.predefined.number_type);
                    } else if check::are_both_string(&self.types, &self.predefined, type1, type2) {
                        if has_sign {
                            self.errors
                                .flag(SemanticCode::InvalidSign, simple.line, &sign_text);
                        }
                        type2 = Some(self.predefined.string_type);
                    } else if (type1 == Some(self.predefined.string_type)
                        && type2 == Some(self.predefined.number_type))
                        || (type1 == Some(self.predefined.number_type)
                            && type2 == Some(self.predefined.string_type))
                    {
                        // Mixed concatenation stringifies the numeric side.
                        if has_sign {
                            self.errors
                                .flag(SemanticCode::InvalidSign, simple.line, &sign_text);
                        }
                        type2 = Some(self.predefined.string_type);
                    } else {
                        if !check::is_number(&self.types, &self.predefined, type1) {
                            self.errors.flag(
                                SemanticCode::TypeMustBeNumeric,
                                first_line,
                                &first_text,
                            );
                        }
                        if !check::is_number(&self.types, &self.predefined, type2) {
                            self.errors.flag(
                                SemanticCode::TypeMustBeNumeric,
                                second_line,
                                &second_text,
                            );
                        }
                        type2 = Some(self.predefined.number_type);
                    }
                }
                AddOp::Subtract => {
                    if check::are_both_number(&self.types, &self.predefined, type1, type2) {
                        type2 = Some(self.predefined.number_type);
                    } else {
                        if !check::is_number(&self.types, &self.predefined, type1) {
                            self.errors.flag(
                                SemanticCode::TypeMustBeNumeric,
                                first_line,
                                &first_text,
                            );
                        }
                        if !check::is_number(&self.types, &self.predefined, type2) {
                            self.errors.flag(
                                SemanticCode::TypeMustBeNumeric,
                                second_line,
                                &second_text,
                            );
                        }
                        type2 = Some(self.predefined.number_type);
                    }
                }
            }

            type1 = type2;
        }

        simple.ty = type1;
    }

    fn visit_term(&mut self, term: &mut Term) {
        self.visit_factor(&mut term.factors[0]);
        let mut type1 = term.factors[0].ty;

        for i in 1..term.factors.len() {
            let op = term.ops[i - 1];
            self.visit_factor(&mut term.factors[i]);
            let mut type2 = term.factors[i].ty;

            let first_text = term.factors[0].to_string();
            let first_line = term.factors[0].line;
            let second_text = term.factors[i].to_string();
            let second_line = term.factors[i].line;

            match op {
                MulOp::Multiply | MulOp::Divide => {
                    if check::are_both_number(&self.types, &self.predefined, type1, type2) {
                        type2 = Some(self.predefined.number_type);
                    } else {
                        if !check::is_number(&self.types, &self.predefined, type1) {
                            self.errors.flag(
                                SemanticCode::TypeMustBeNumeric,
                                first_line,
                                &first_text,
                            );
                        }
                        if !check::is_number(&self.types, &self.predefined, type2) {
                            self.errors.flag(
                                SemanticCode::TypeMustBeNumeric,
                                second_line,
                                &second_text,
                            );
                        }
                        type2 = Some(self.predefined.number_type);
                    }
                }
                MulOp::And => {
                    if check::is_string(&self.types, &self.predefined, type1) {
                        self.errors.flag(
                            SemanticCode::TypeMustBeBooleanOrNumeric,
                            first_line,
                            &first_text,
                        );
                        type1 = Some(self.predefined.boolean_type);
                    }
                    if check::is_string(&self.types, &self.predefined, type2) {
                        self.errors.flag(
                            SemanticCode::TypeMustBeBooleanOrNumeric,
                            second_line,
                            &second_text,
                        );
                        type2 = Some(self.predefined.boolean_type);
                    }
                    let blendable = (check::is_boolean(&self.types, &self.predefined, type1)
                        && check::is_number(&self.types, &self.predefined, type2))
                        || (check::is_number(&self.types, &self.predefined, type1)
                            && check::is_boolean(&self.types, &self.predefined, type2))
                        || check::are_both_boolean(&self.types, &self.predefined, type1, type2);
                    if blendable {
                        type2 = Some(self.predefined.boolean_type);
                    } else {
                        self.errors.flag(
                            SemanticCode::TypeMustBeBooleanOrNumeric,
                            second_line,
                            &second_text,
                        );
                        type2 = Some(self.predefined.boolean_type);
                    }
                }
            }

            type1 = type2;
        }

        term.ty = type1;
    }

    fn visit_factor(&mut self, factor: &mut Factor) {
        match &mut factor.kind {
            FactorKind::Variable(variable) => {
                self.visit_variable(variable);
                factor.ty = variable.ty;
            }
            FactorKind::NumberLiteral(_) => {
                factor.ty = Some(self.predefined.number_type);
            }
            FactorKind::StringLiteral(_) => {
                factor.ty = Some(self.predefined.string_type);
            }
            FactorKind::BooleanLiteral(_) => {
                factor.ty = Some(self.predefined.boolean_type);
            }
            FactorKind::Call(call) => {
                self.visit_function_call(call);
                factor.ty = call.ty;
            }
            FactorKind::Not(inner) => {
                self.visit_factor(inner);
                if inner.ty != Some(self.predefined.boolean_type) {
                    self.errors.flag(
                        SemanticCode::TypeMustBeBoolean,
                        inner.line,
                        inner.to_string(),
                    );
                }
                factor.ty = Some(self.predefined.boolean_type);
            }
            FactorKind::Parenthesized(expr) => {
                self.visit_expression(expr);
                factor.ty = expr.ty;
            }
        }
    }

    fn visit_variable(&mut self, variable: &mut VariableRef) {
        let name = variable.name.to_lowercase();

        match self.stack.lookup(&name) {
            Some(id) => {
                variable.ty = self.stack.entry(id).typespec;
                variable.entry = Some(id);
                self.stack.entry_mut(id).append_line_number(variable.line);

                match self.stack.entry(id).kind {
                    Kind::Type | Kind::Program | Kind::DefinitionNoReturn | Kind::Undefined => {
                        self.errors.flag(
                            SemanticCode::InvalidVariable,
                            variable.line,
                            &variable.name,
                        );
                    }
                    _ => {}
                }
            }
            None => {
                self.errors.flag(
                    SemanticCode::UndeclaredIdentifier,
                    variable.line,
                    &variable.name,
                );
                // Recovery type so analysis can continue.
                variable.ty = Some(self.predefined.number_type);
            }
        }
    }
}

impl Default for Semantics {
    fn default() -> Self {
        Semantics::new()
    }
}
