use std::fmt;

use super::symtab::{EntryId, SymtabId};

/// Index handle into the [`Types`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeId(pub(crate) usize);

/// The form a type specification can take. `Array`, `Record`, and
/// `Unknown` are recognized but no source construct produces them yet.
#[derive(Clone, Debug, PartialEq)]
pub enum Form {
    Scalar,
    Enumeration {
        constants: Vec<EntryId>,
    },
    Subrange {
        base: Option<TypeId>,
        min: i32,
        max: i32,
    },
    Array {
        index: Option<TypeId>,
        element: Option<TypeId>,
        count: usize,
    },
    Record {
        type_path: Option<String>,
        symtab: Option<SymtabId>,
    },
    Unknown,
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Form::Scalar => "scalar",
            Form::Enumeration { .. } => "enumeration",
            Form::Subrange { .. } => "subrange",
            Form::Array { .. } => "array",
            Form::Record { .. } => "record",
            Form::Unknown => "unknown",
        })
    }
}

/// The type specification of a datatype.
#[derive(Clone, Debug, PartialEq)]
pub struct Typespec {
    pub form: Form,
    /// Symbol table entry of the type's identifier, if the type is named.
    pub identifier: Option<EntryId>,
}

impl Typespec {
    pub fn new(form: Form) -> Self {
        Typespec {
            form,
            identifier: None,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self.form, Form::Array { .. } | Form::Record { .. })
    }
}

/// Arena of type specifications. Handles stay valid for the arena's
/// lifetime; nothing is ever removed.
#[derive(Debug, Default)]
pub struct Types {
    specs: Vec<Typespec>,
}

impl Types {
    pub fn new() -> Self {
        Types::default()
    }

    pub fn alloc(&mut self, form: Form) -> TypeId {
        let id = TypeId(self.specs.len());
        self.specs.push(Typespec::new(form));
        id
    }

    pub fn get(&self, id: TypeId) -> &Typespec {
        &self.specs[id.0]
    }

    pub fn get_mut(&mut self, id: TypeId) -> &mut Typespec {
        &mut self.specs[id.0]
    }

    /// Resolve one level of subrange indirection. Every compatibility
    /// comparison goes through this.
    pub fn base_type(&self, id: TypeId) -> TypeId {
        match self.get(id).form {
            Form::Subrange { base: Some(b), .. } => b,
            _ => id,
        }
    }
}
