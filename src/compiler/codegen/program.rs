//! Emission of the class structure: fields, `<clinit>`, the
//! constructor, routine methods, and `main` with its timing harness.

use crate::compiler::ast::{Program, Routine, RoutineKind};
use crate::compiler::intermediate::symtab::Kind;

use super::emitter::{Directive, LocalVariables, Opcode};
use super::{CodeGenerator, JvmClass};

impl<'a> CodeGenerator<'a> {
    pub(super) fn emit_program(&mut self, program: &Program) {
        self.emitter
            .emit_directive(Directive::ClassPublic, self.program_name.clone());
        self.emitter
            .emit_directive(Directive::Super, "java/lang/Object");

        self.emit_fields(program);
        self.emit_class_init();
        self.emit_constructor();

        for routine in &program.routines {
            self.emit_routine(routine);
        }

        self.emit_main(program);
    }

    /// One static field per program-scoped variable, plus the shared
    /// input scanner.
    fn emit_fields(&mut self, program: &Program) {
        self.emitter.emit_blank_line();
        self.emitter.emit_directive(
            Directive::FieldPrivateStatic,
            "_sysin Ljava/util/Scanner;",
        );

        let symtab_id = match program.entry.map(|id| self.stack.entry(id).routine_symtab()) {
            Some(Some(id)) => id,
            _ => return,
        };
        let fields: Vec<(String, &'static str)> = self
            .stack
            .table(symtab_id)
            .sorted_entries()
            .filter(|&id| self.stack.entry(id).kind == Kind::Variable)
            .map(|id| {
                let entry = self.stack.entry(id);
                (entry.name.clone(), self.type_descriptor(entry.typespec))
            })
            .collect();
        for (name, descriptor) in fields {
            self.emitter.emit_directive(
                Directive::FieldPrivateStatic,
                format!("{} {}", name, descriptor),
            );
        }
    }

    fn emit_class_init(&mut self) {
        self.emitter.emit_blank_line();
        self.emitter.emit_comment("Runtime input scanner");
        self.emitter
            .emit_directive(Directive::MethodStatic, "<clinit>()V");
        self.emitter.emit_blank_line();

        self.emitter.local_variables = LocalVariables::new(0);
        self.emitter.local_stack.reset();

        self.emitter.emit_operand(Opcode::New, "java/util/Scanner");
        self.emitter.emit(Opcode::Dup);
        self.emitter.emit_operands(
            Opcode::Getstatic,
            "java/lang/System/in",
            "Ljava/io/InputStream;",
        );
        self.emitter.emit_operand(
            Opcode::Invokespecial,
            "java/util/Scanner/<init>(Ljava/io/InputStream;)V",
        );
        self.emitter.local_stack.decrease(2);
        self.emitter.emit_operands(
            Opcode::Putstatic,
            format!("{}/_sysin", self.program_name),
            "Ljava/util/Scanner;",
        );
        self.emitter.emit(Opcode::Return);

        self.emit_method_epilogue();
    }

    fn emit_constructor(&mut self) {
        self.emitter.emit_blank_line();
        self.emitter.emit_comment("Main class constructor");
        self.emitter
            .emit_directive(Directive::MethodPublic, "<init>()V");
        self.emitter.emit_directive(
            Directive::Var,
            format!("0 is this L{};", self.program_name),
        );
        self.emitter.emit_blank_line();

        self.emitter.local_variables = LocalVariables::new(1);
        self.emitter.local_stack.reset();

        self.emitter.emit(Opcode::Aload0);
        self.emitter
            .emit_operand(Opcode::Invokespecial, "java/lang/Object/<init>()V");
        self.emitter.local_stack.decrease(1);
        self.emitter.emit(Opcode::Return);

        self.emit_method_epilogue();
    }

    fn emit_routine(&mut self, routine: &Routine) {
        let entry_id = match routine.entry {
            Some(id) => id,
            None => return,
        };
        let entry = self.stack.entry(entry_id);
        let name = entry.name.clone();
        let return_type = entry.typespec;
        let symtab_id = match entry.routine_symtab() {
            Some(id) => id,
            None => return,
        };

        let mut signature = String::from("(");
        for &param_id in self.stack.entry(entry_id).routine_parameters() {
            signature.push_str(self.type_descriptor(self.stack.entry(param_id).typespec));
        }
        signature.push(')');
        signature.push_str(match routine.kind {
            RoutineKind::Definition => self.type_descriptor(return_type),
            RoutineKind::DefinitionNoReturn => "V",
        });

        self.emitter.emit_blank_line();
        match routine.kind {
            RoutineKind::Definition => {
                self.emitter
                    .emit_comment(&format!("DEFINITION {}", routine.name));
            }
            RoutineKind::DefinitionNoReturn => {
                self.emitter
                    .emit_comment(&format!("DEFINITION NO RETURN {}", routine.name));
            }
        }
        self.emitter.emit_directive(
            Directive::MethodPrivateStatic,
            format!("{}{}", name, signature),
        );

        let locals: Vec<(i32, String, &'static str)> = self
            .stack
            .table(symtab_id)
            .sorted_entries()
            .filter(|&id| {
                matches!(
                    self.stack.entry(id).kind,
                    Kind::Variable | Kind::ValueParameter | Kind::ReferenceParameter
                )
            })
            .map(|id| {
                let local = self.stack.entry(id);
                (
                    local.slot_number,
                    local.name.clone(),
                    self.type_descriptor(local.typespec),
                )
            })
            .collect();
        for (slot, local_name, descriptor) in locals {
            self.emitter.emit_directive(
                Directive::Var,
                format!("{} is {} {}", slot, local_name, descriptor),
            );
        }
        self.emitter.emit_blank_line();

        let slot_count = self.stack.table(symtab_id).max_slot_number() + 1;
        self.emitter.local_variables = LocalVariables::new(slot_count as usize);
        self.emitter.local_stack.reset();

        for stmt in &routine.body {
            self.emit_statement(stmt);
        }

        if routine.kind == RoutineKind::Definition {
            // Copy the designated return variable into the result slot
            // named after the routine, then return its value.
            if let Some(return_var) = &routine.return_var {
                if let Some(return_entry) = return_var.entry {
                    self.emit_load_variable(return_entry);
                }
            }
            if let Some(result_id) = self.stack.table(symtab_id).lookup(&name) {
                self.emit_store_variable(result_id);
                self.emit_load_variable(result_id);
            }
            let return_op = match self.jvm_class(return_type) {
                JvmClass::Float => Opcode::Freturn,
                JvmClass::Int => Opcode::Ireturn,
                JvmClass::Reference => Opcode::Areturn,
            };
            self.emitter.emit(return_op);
        } else {
            self.emitter.emit(Opcode::Return);
        }

        self.emit_method_epilogue();
    }

    fn emit_main(&mut self, program: &Program) {
        self.emitter.emit_blank_line();
        self.emitter.emit_comment("MAIN");
        self.emitter.emit_directive(
            Directive::MethodPublicStatic,
            "main([Ljava/lang/String;)V",
        );
        self.emitter
            .emit_directive(Directive::Var, "0 is args [Ljava/lang/String;");
        self.emitter
            .emit_directive(Directive::Var, "1 is _start Ljava/time/Instant;");
        self.emitter
            .emit_directive(Directive::Var, "2 is _end Ljava/time/Instant;");
        self.emitter
            .emit_directive(Directive::Var, "3 is _elapsed J");
        self.emitter.emit_blank_line();

        self.emitter.local_variables = LocalVariables::new(5);
        self.emitter.local_stack.reset();

        self.emitter.emit_operand(
            Opcode::Invokestatic,
            "java/time/Instant/now()Ljava/time/Instant;",
        );
        self.emitter.local_stack.increase(1);
        self.emitter.emit(Opcode::Astore1);

        for stmt in &program.main {
            self.emit_statement(stmt);
        }

        // Elapsed-time report.
        self.emitter.emit_blank_line();
        self.emitter.emit_operand(
            Opcode::Invokestatic,
            "java/time/Instant/now()Ljava/time/Instant;",
        );
        self.emitter.local_stack.increase(1);
        self.emitter.emit(Opcode::Astore2);
        self.emitter.emit(Opcode::Aload1);
        self.emitter.emit(Opcode::Aload2);
        self.emitter.emit_operand(
            Opcode::Invokestatic,
            "java/time/Duration/between(Ljava/time/temporal/Temporal;\
             Ljava/time/temporal/Temporal;)Ljava/time/Duration;",
        );
        self.emitter.local_stack.decrease(1);
        self.emitter
            .emit_operand(Opcode::Invokevirtual, "java/time/Duration/toMillis()J");
        self.emitter.local_stack.increase(1);
        self.emitter.emit(Opcode::Lstore3);
        self.emitter.emit_operands(
            Opcode::Getstatic,
            "java/lang/System/out",
            "Ljava/io/PrintStream;",
        );
        self.emitter
            .emit_load_string("\\n[%,d milliseconds execution time.]\\n");
        self.emitter.emit(Opcode::Iconst1);
        self.emitter
            .emit_operand(Opcode::Anewarray, "java/lang/Object");
        self.emitter.emit(Opcode::Dup);
        self.emitter.emit(Opcode::Iconst0);
        self.emitter.emit(Opcode::Lload3);
        self.emitter.emit_operand(
            Opcode::Invokestatic,
            "java/lang/Long/valueOf(J)Ljava/lang/Long;",
        );
        self.emitter.local_stack.decrease(1);
        self.emitter.emit(Opcode::Aastore);
        self.emitter.emit_operand(
            Opcode::Invokevirtual,
            "java/io/PrintStream/printf(Ljava/lang/String;[Ljava/lang/Object;)Ljava/io/PrintStream;",
        );
        self.emitter.local_stack.decrease(2);
        self.emitter.emit(Opcode::Pop);
        self.emitter.emit(Opcode::Return);

        self.emit_method_epilogue();
    }

    fn emit_method_epilogue(&mut self) {
        self.emitter.emit_blank_line();
        let locals = self.emitter.local_variables.count();
        let stack = self.emitter.local_stack.capacity();
        self.emitter
            .emit_directive(Directive::LimitLocals, locals);
        self.emitter.emit_directive(Directive::LimitStack, stack);
        self.emitter.emit_bare_directive(Directive::EndMethod);
    }
}
