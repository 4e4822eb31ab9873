use log::debug;

use super::symtab::{EntryId, Kind, Symtab, SymtabEntry, SymtabId};

/// The symbol table stack.
///
/// Owns the arenas for every table and entry ever created, so that index
/// handles held by the annotated tree stay valid after their scope has been
/// popped. The `display` tracks which tables are currently open, indexed by
/// nesting level; level 0 is the predefined scope created at construction.
#[derive(Debug)]
pub struct SymtabStack {
    tables: Vec<Symtab>,
    entries: Vec<SymtabEntry>,
    display: Vec<SymtabId>,
    program_id: Option<EntryId>,
}

impl SymtabStack {
    pub fn new() -> Self {
        let mut stack = SymtabStack {
            tables: Vec::new(),
            entries: Vec::new(),
            display: Vec::new(),
            program_id: None,
        };
        let predefined = stack.alloc_table(0);
        stack.display.push(predefined);
        stack
    }

    fn alloc_table(&mut self, nesting_level: usize) -> SymtabId {
        let id = SymtabId(self.tables.len());
        self.tables.push(Symtab::new(nesting_level));
        id
    }

    pub fn current_nesting_level(&self) -> usize {
        self.display.len() - 1
    }

    pub fn program_id(&self) -> Option<EntryId> {
        self.program_id
    }

    pub fn set_program_id(&mut self, id: EntryId) {
        self.program_id = Some(id);
    }

    /// The table at the top of the stack.
    pub fn local_symtab(&self) -> SymtabId {
        *self.display.last().unwrap_or(&SymtabId(0))
    }

    /// Open a fresh scope one level deeper.
    pub fn push(&mut self) -> SymtabId {
        let level = self.current_nesting_level() + 1;
        let id = self.alloc_table(level);
        self.display.push(id);
        debug!("pushed scope at nesting level {}", level);
        id
    }

    pub fn pop(&mut self) -> SymtabId {
        let id = self.display.pop().unwrap_or(SymtabId(0));
        debug!(
            "popped scope, back at nesting level {}",
            self.current_nesting_level()
        );
        id
    }

    /// Create and enter a new entry into the local table.
    pub fn enter_local(&mut self, name: &str, kind: Kind) -> EntryId {
        let table_id = self.local_symtab();
        let entry_id = EntryId(self.entries.len());
        self.entries.push(SymtabEntry::new(name, kind, table_id));
        self.tables[table_id.0].insert(name, entry_id);
        entry_id
    }

    /// Look up a name in the local table only.
    pub fn lookup_local(&self, name: &str) -> Option<EntryId> {
        self.tables[self.local_symtab().0].lookup(name)
    }

    /// Look up a name from the innermost scope outward.
    pub fn lookup(&self, name: &str) -> Option<EntryId> {
        self.display
            .iter()
            .rev()
            .find_map(|id| self.tables[id.0].lookup(name))
    }

    pub fn table(&self, id: SymtabId) -> &Symtab {
        &self.tables[id.0]
    }

    pub fn table_mut(&mut self, id: SymtabId) -> &mut Symtab {
        &mut self.tables[id.0]
    }

    pub fn entry(&self, id: EntryId) -> &SymtabEntry {
        &self.entries[id.0]
    }

    pub fn entry_mut(&mut self, id: EntryId) -> &mut SymtabEntry {
        &mut self.entries[id.0]
    }
}

impl Default for SymtabStack {
    fn default() -> Self {
        SymtabStack::new()
    }
}
