extern crate log;
extern crate simplelog;

use std::fs;
use std::path::Path;

use aka_lang::compiler::ast::Program;
use aka_lang::compiler::codegen::CodeGenerator;
use aka_lang::compiler::semantics::Semantics;
use aka_lang::*;

fn main() -> Result<(), i32> {
    let config = configure_cli().get_matches();

    if let Some(level) = get_log_level(&config) {
        configure_logging(level).expect("Failed to configure logger.")
    }

    let mode = config.value_of("mode").unwrap_or("compile");
    if mode != "compile" {
        println!("{} mode is not supported.", mode);
        return Err(ERR_USAGE);
    }

    let input = config
        .value_of("input")
        .expect("Expected an input tree file to compile");
    let source = match fs::read_to_string(input) {
        Ok(source) => source,
        Err(err) => {
            println!("{}: {}", input, err);
            return Err(ERR_SYNTAX);
        }
    };

    println!("PASS 1 Syntax:");
    let mut program: Program = match serde_json::from_str(&source) {
        Ok(program) => program,
        Err(err) => {
            println!("Syntax error: {}", err);
            return Err(ERR_SYNTAX);
        }
    };
    println!("There were no syntax errors.");

    println!("PASS 2 Semantics:");
    let mut semantics = Semantics::new();
    semantics.check(&mut program);
    if semantics.error_count() > 0 {
        print!("{}", semantics.errors().format_table());
        println!("\nThere were {} semantic errors.", semantics.error_count());
        println!("Object file not created or modified.");
        return Err(ERR_SEMANTIC);
    }

    println!("PASS 3 Compilation:");
    let (types, predefined, stack, _) = semantics.into_parts();
    let object_text =
        CodeGenerator::new(&types, &predefined, &stack, &program.name).generate(&program);

    let output_dir = config.value_of("output").unwrap_or(".");
    let object_path = Path::new(output_dir).join(format!("{}.j", program.name));
    // A single write at the very end: a failed compile never leaves a
    // partial object file behind.
    match fs::write(&object_path, object_text) {
        Ok(()) => {
            println!("Object file \"{}\" created.", object_path.display());
            Ok(())
        }
        Err(err) => {
            println!("{}: {}", object_path.display(), err);
            Err(ERR_CODEGEN)
        }
    }
}
