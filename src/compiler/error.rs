use std::fmt;
use std::io;

/// Errors surfaced by the compilation pipeline.
#[derive(Debug)]
pub enum CompileError {
    /// The input was not a valid annotated program tree.
    Syntax(serde_json::Error),
    /// The semantic pass flagged errors. The table is preformatted for
    /// display and no object code was produced.
    Semantic { count: usize, table: String },
    Io(io::Error),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Syntax(err) => write!(f, "syntax error: {}", err),
            CompileError::Semantic { count, .. } => {
                write!(f, "there were {} semantic errors", count)
            }
            CompileError::Io(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompileError::Syntax(err) => Some(err),
            CompileError::Semantic { .. } => None,
            CompileError::Io(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for CompileError {
    fn from(err: serde_json::Error) -> Self {
        CompileError::Syntax(err)
    }
}

impl From<io::Error> for CompileError {
    fn from(err: io::Error) -> Self {
        CompileError::Io(err)
    }
}
