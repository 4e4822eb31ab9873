/*!
A two-pass back end for the AKA language.

The front end (an external collaborator) parses source text and hands
over an annotated syntax tree as JSON. This crate deserializes that
tree ([`ast`]), resolves names and types over it in a single semantic
pass ([`semantics`]), and, only when that pass flags zero errors,
lowers it to Jasmin JVM assembly ([`codegen`]). The passes share the
intermediate representation in [`intermediate`]: a type registry and a
scope stack whose arenas keep every entry addressable for the second
pass.

The gate between the passes is strict: any semantic error count above
zero means no object file is created or modified.
*/

pub mod ast;
pub mod codegen;
pub mod error;
pub mod intermediate;
pub mod semantics;

pub use error::CompileError;

use ast::Program;
use codegen::CodeGenerator;
use semantics::Semantics;

/// Deserialize an annotated program tree from JSON text.
pub fn parse_program(source: &str) -> Result<Program, CompileError> {
    let program = serde_json::from_str(source)?;
    Ok(program)
}

/// Run both passes over a program and return the object file text.
/// Fails without emitting anything when the semantic pass flags errors.
pub fn compile(program: &mut Program) -> Result<String, CompileError> {
    let mut semantics = Semantics::new();
    semantics.check(program);

    if semantics.error_count() > 0 {
        return Err(CompileError::Semantic {
            count: semantics.error_count(),
            table: semantics.errors().format_table(),
        });
    }

    let (types, predefined, stack, _) = semantics.into_parts();
    let generator = CodeGenerator::new(&types, &predefined, &stack, &program.name);
    Ok(generator.generate(program))
}
