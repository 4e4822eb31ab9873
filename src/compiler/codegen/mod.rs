/*!
The code generation pass.

Walks a fully resolved tree and emits Jasmin assembly for a single
class. The program becomes the class; its global variables become
static fields, routines become private static methods, and the main
statement list becomes `main`. Numbers map to JVM floats, booleans to
ints holding 0 or 1, and strings to `java/lang/String` references.

This pass assumes the semantic pass reported zero errors: every `ty`
and `entry` annotation it reads must be resolved.
*/

pub mod emitter;

mod expression;
mod program;
mod statement;

#[cfg(test)]
mod tests;

use crate::compiler::ast::Program;
use crate::compiler::intermediate::predefined::Predefined;
use crate::compiler::intermediate::stack::SymtabStack;
use crate::compiler::intermediate::symtab::EntryId;
use crate::compiler::intermediate::typespec::{TypeId, Types};

use self::emitter::{Emitter, Opcode};

/// Which JVM category a language type lowers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum JvmClass {
    Float,
    Int,
    Reference,
}

pub struct CodeGenerator<'a> {
    emitter: Emitter,
    types: &'a Types,
    predefined: &'a Predefined,
    stack: &'a SymtabStack,
    program_name: String,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(
        types: &'a Types,
        predefined: &'a Predefined,
        stack: &'a SymtabStack,
        program_name: &str,
    ) -> Self {
        CodeGenerator {
            emitter: Emitter::new(),
            types,
            predefined,
            stack,
            program_name: program_name.to_string(),
        }
    }

    /// Emit the whole object file and hand back its text.
    pub fn generate(mut self, program: &Program) -> String {
        self.emit_program(program);
        self.emitter.into_text()
    }

    // Type lowering _______________________________________________________

    fn jvm_class(&self, ty: Option<TypeId>) -> JvmClass {
        match ty {
            Some(t) if self.types.base_type(t) == self.predefined.number_type => JvmClass::Float,
            Some(t) if self.types.base_type(t) == self.predefined.boolean_type => JvmClass::Int,
            _ => JvmClass::Reference,
        }
    }

    fn type_descriptor(&self, ty: Option<TypeId>) -> &'static str {
        match ty {
            Some(t) if self.types.base_type(t) == self.predefined.number_type => "F",
            Some(t) if self.types.base_type(t) == self.predefined.boolean_type => "Z",
            Some(t) if self.types.base_type(t) == self.predefined.string_type => {
                "Ljava/lang/String;"
            }
            _ => "V",
        }
    }

    /// The boxing call for a value printed through `printf`.
    fn value_of_signature(&self, ty: Option<TypeId>) -> Option<&'static str> {
        match self.jvm_class(ty) {
            JvmClass::Float => Some("java/lang/Float/valueOf(F)Ljava/lang/Float;"),
            JvmClass::Int => Some("java/lang/Boolean/valueOf(Z)Ljava/lang/Boolean;"),
            JvmClass::Reference => None,
        }
    }

    // Loads and stores ____________________________________________________

    fn emit_load_local(&mut self, ty: Option<TypeId>, slot: i32) {
        let short = match (self.jvm_class(ty), slot) {
            (JvmClass::Float, 0) => Some(Opcode::Fload0),
            (JvmClass::Float, 1) => Some(Opcode::Fload1),
            (JvmClass::Float, 2) => Some(Opcode::Fload2),
            (JvmClass::Float, 3) => Some(Opcode::Fload3),
            (JvmClass::Int, 0) => Some(Opcode::Iload0),
            (JvmClass::Int, 1) => Some(Opcode::Iload1),
            (JvmClass::Int, 2) => Some(Opcode::Iload2),
            (JvmClass::Int, 3) => Some(Opcode::Iload3),
            (JvmClass::Reference, 0) => Some(Opcode::Aload0),
            (JvmClass::Reference, 1) => Some(Opcode::Aload1),
            (JvmClass::Reference, 2) => Some(Opcode::Aload2),
            (JvmClass::Reference, 3) => Some(Opcode::Aload3),
            _ => None,
        };
        match short {
            Some(opcode) => self.emitter.emit(opcode),
            None => {
                let opcode = match self.jvm_class(ty) {
                    JvmClass::Float => Opcode::Fload,
                    JvmClass::Int => Opcode::Iload,
                    JvmClass::Reference => Opcode::Aload,
                };
                self.emitter.emit_operand(opcode, slot);
            }
        }
    }

    fn emit_store_local(&mut self, ty: Option<TypeId>, slot: i32) {
        let short = match (self.jvm_class(ty), slot) {
            (JvmClass::Float, 0) => Some(Opcode::Fstore0),
            (JvmClass::Float, 1) => Some(Opcode::Fstore1),
            (JvmClass::Float, 2) => Some(Opcode::Fstore2),
            (JvmClass::Float, 3) => Some(Opcode::Fstore3),
            (JvmClass::Int, 0) => Some(Opcode::Istore0),
            (JvmClass::Int, 1) => Some(Opcode::Istore1),
            (JvmClass::Int, 2) => Some(Opcode::Istore2),
            (JvmClass::Int, 3) => Some(Opcode::Istore3),
            (JvmClass::Reference, 0) => Some(Opcode::Astore0),
            (JvmClass::Reference, 1) => Some(Opcode::Astore1),
            (JvmClass::Reference, 2) => Some(Opcode::Astore2),
            (JvmClass::Reference, 3) => Some(Opcode::Astore3),
            _ => None,
        };
        match short {
            Some(opcode) => self.emitter.emit(opcode),
            None => {
                let opcode = match self.jvm_class(ty) {
                    JvmClass::Float => Opcode::Fstore,
                    JvmClass::Int => Opcode::Istore,
                    JvmClass::Reference => Opcode::Astore,
                };
                self.emitter.emit_operand(opcode, slot);
            }
        }
    }

    /// True iff the entry lives in the program scope and is therefore a
    /// static field rather than a method local.
    fn is_program_scoped(&self, entry_id: EntryId) -> bool {
        let entry = self.stack.entry(entry_id);
        self.stack.table(entry.symtab).nesting_level() == 1
    }

    fn emit_load_variable(&mut self, entry_id: EntryId) {
        let entry = self.stack.entry(entry_id);
        let ty = entry.typespec;
        if self.is_program_scoped(entry_id) {
            let field = format!("{}/{}", self.program_name, entry.name);
            let descriptor = self.type_descriptor(ty);
            self.emitter
                .emit_operands(Opcode::Getstatic, field, descriptor);
        } else {
            let slot = entry.slot_number;
            self.emit_load_local(ty, slot);
        }
    }

    fn emit_store_variable(&mut self, entry_id: EntryId) {
        let entry = self.stack.entry(entry_id);
        let ty = entry.typespec;
        if self.is_program_scoped(entry_id) {
            let field = format!("{}/{}", self.program_name, entry.name);
            let descriptor = self.type_descriptor(ty);
            self.emitter
                .emit_operands(Opcode::Putstatic, field, descriptor);
        } else {
            let slot = entry.slot_number;
            self.emit_store_local(ty, slot);
        }
    }
}
