use std::fmt;

/// The closed set of semantic error codes. Each carries a fixed
/// human-facing message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SemanticCode {
    UndeclaredIdentifier,
    RedeclaredIdentifier,
    InvalidConstant,
    InvalidSign,
    InvalidType,
    InvalidVariable,
    TypeMismatch,
    TypeMustBeNumeric,
    TypeMustBeBoolean,
    TypeMustBeBooleanOrNumeric,
    IncompatibleAssignment,
    IncompatibleComparison,
    ReturnVariableUninitialized,
    NameMustBeDefinition,
    NameMustBeDefinitionNoReturn,
    ArgumentCountMismatch,
    ArgumentMustBeVariable,
    InvalidReturnType,
}

impl SemanticCode {
    pub fn message(&self) -> &'static str {
        match self {
            SemanticCode::UndeclaredIdentifier => "Undeclared identifier",
            SemanticCode::RedeclaredIdentifier => "Redeclared identifier",
            SemanticCode::InvalidConstant => "Invalid constant",
            SemanticCode::InvalidSign => "Invalid sign",
            SemanticCode::InvalidType => "Invalid type",
            SemanticCode::InvalidVariable => "Invalid variable",
            SemanticCode::TypeMismatch => "Mismatched datatype",
            SemanticCode::TypeMustBeNumeric => "Datatype must be integer or real",
            SemanticCode::TypeMustBeBoolean => "Datatype must be boolean",
            SemanticCode::TypeMustBeBooleanOrNumeric => "Datatype must be boolean or number",
            SemanticCode::IncompatibleAssignment => "Incompatible assignment",
            SemanticCode::IncompatibleComparison => "Incompatible comparison",
            SemanticCode::ReturnVariableUninitialized => "Return variable never initialized",
            SemanticCode::NameMustBeDefinition => "Must be a definition name",
            SemanticCode::NameMustBeDefinitionNoReturn => "Must be a definitionnoreturn name",
            SemanticCode::ArgumentCountMismatch => "Invalid number of arguments",
            SemanticCode::ArgumentMustBeVariable => "Argument must be a variable",
            SemanticCode::InvalidReturnType => "Invalid function return type",
        }
    }
}

impl fmt::Display for SemanticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// One flagged error: source line, code, and the offending source text.
#[derive(Clone, Debug, PartialEq)]
pub struct SemanticError {
    pub line: u32,
    pub code: SemanticCode,
    pub text: String,
}

/// Accumulates semantic errors across a whole pass. Analysis never aborts
/// on a single error; the count gates code generation afterwards.
#[derive(Debug, Default)]
pub struct SemanticErrorHandler {
    errors: Vec<SemanticError>,
}

impl SemanticErrorHandler {
    pub fn new() -> Self {
        SemanticErrorHandler::default()
    }

    pub fn flag(&mut self, code: SemanticCode, line: u32, text: impl Into<String>) {
        let text = text.into();
        log::debug!("semantic error at line {}: {} near {:?}", line, code, text);
        self.errors.push(SemanticError { line, code, text });
    }

    pub fn count(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[SemanticError] {
        &self.errors
    }

    /// Render the human-facing error table, or an empty string when no
    /// error was flagged.
    pub fn format_table(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }

        let mut table = String::from("\n===== SEMANTIC ERRORS =====\n\n");
        table.push_str(&format!("{:<4} {:<40} {}\n", "Line", "Message", "Found near"));
        table.push_str(&format!("{:<4} {:<40} {}\n", "----", "-------", "----------"));
        for err in &self.errors {
            table.push_str(&format!(
                "{:03}  {:<40} \"{}\"\n",
                err.line,
                err.code.message(),
                err.text
            ));
        }
        table
    }
}
