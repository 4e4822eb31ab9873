use std::collections::BTreeMap;

use super::typespec::TypeId;

/// Index handle into the entry arena owned by
/// [`SymtabStack`](super::stack::SymtabStack).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntryId(pub(crate) usize);

/// Index handle into the symbol table arena owned by
/// [`SymtabStack`](super::stack::SymtabStack).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SymtabId(pub(crate) usize);

/// What kind of identifier an entry names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Variable,
    ValueParameter,
    ReferenceParameter,
    Type,
    Program,
    Definition,
    DefinitionNoReturn,
    EnumerationConstant,
    RecordField,
    Undefined,
}

/// Payload keyed by the entry's kind.
#[derive(Clone, Debug, PartialEq)]
pub enum EntryInfo {
    None,
    Value {
        value: Option<i32>,
    },
    Routine {
        /// The routine's own scope.
        symtab: Option<SymtabId>,
        parameters: Vec<EntryId>,
        subroutines: Vec<EntryId>,
        /// Index of the routine's body in the program tree.
        executable: Option<usize>,
    },
}

impl EntryInfo {
    fn for_kind(kind: Kind) -> Self {
        match kind {
            Kind::Variable
            | Kind::ValueParameter
            | Kind::EnumerationConstant
            | Kind::RecordField => EntryInfo::Value { value: None },
            Kind::Program | Kind::Definition | Kind::DefinitionNoReturn => EntryInfo::Routine {
                symtab: None,
                parameters: Vec::new(),
                subroutines: Vec::new(),
                executable: None,
            },
            _ => EntryInfo::None,
        }
    }
}

/// One symbol table entry. Names are stored case-folded.
#[derive(Clone, Debug, PartialEq)]
pub struct SymtabEntry {
    pub name: String,
    pub kind: Kind,
    /// The table this entry lives in.
    pub symtab: SymtabId,
    pub typespec: Option<TypeId>,
    pub slot_number: i32,
    pub line_numbers: Vec<u32>,
    pub info: EntryInfo,
}

impl SymtabEntry {
    pub(crate) fn new(name: &str, kind: Kind, symtab: SymtabId) -> Self {
        SymtabEntry {
            name: name.to_lowercase(),
            kind,
            symtab,
            typespec: None,
            slot_number: 0,
            line_numbers: Vec::new(),
            info: EntryInfo::for_kind(kind),
        }
    }

    pub fn append_line_number(&mut self, line: u32) {
        self.line_numbers.push(line);
    }

    /// The routine's own scope. Meaningful only for routine kinds.
    pub fn routine_symtab(&self) -> Option<SymtabId> {
        match &self.info {
            EntryInfo::Routine { symtab, .. } => *symtab,
            _ => None,
        }
    }

    pub fn routine_parameters(&self) -> &[EntryId] {
        match &self.info {
            EntryInfo::Routine { parameters, .. } => parameters,
            _ => &[],
        }
    }

    pub fn subroutines(&self) -> &[EntryId] {
        match &self.info {
            EntryInfo::Routine { subroutines, .. } => subroutines,
            _ => &[],
        }
    }

    pub fn executable(&self) -> Option<usize> {
        match &self.info {
            EntryInfo::Routine { executable, .. } => *executable,
            _ => None,
        }
    }
}

/// One scope's symbol table. The name map is sorted so iteration order is
/// deterministic, which the code generator relies on when it emits fields
/// and locals.
#[derive(Clone, Debug)]
pub struct Symtab {
    entries: BTreeMap<String, EntryId>,
    nesting_level: usize,
    slot_number: i32,
    max_slot_number: i32,
    pub owner: Option<EntryId>,
}

impl Symtab {
    pub(crate) fn new(nesting_level: usize) -> Self {
        Symtab {
            entries: BTreeMap::new(),
            nesting_level,
            slot_number: -1,
            max_slot_number: 0,
            owner: None,
        }
    }

    pub fn nesting_level(&self) -> usize {
        self.nesting_level
    }

    /// Compute the next local variables array slot number.
    pub fn next_slot_number(&mut self) -> i32 {
        self.slot_number += 1;
        self.max_slot_number = self.slot_number;
        self.slot_number
    }

    pub fn max_slot_number(&self) -> i32 {
        self.max_slot_number
    }

    pub(crate) fn insert(&mut self, name: &str, id: EntryId) {
        self.entries.insert(name.to_lowercase(), id);
    }

    pub fn lookup(&self, name: &str) -> Option<EntryId> {
        self.entries.get(&name.to_lowercase()).copied()
    }

    /// Entries in name-sorted order.
    pub fn sorted_entries(&self) -> impl Iterator<Item = EntryId> + '_ {
        self.entries.values().copied()
    }
}
