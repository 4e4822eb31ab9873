/*!
The intermediate representation shared by the two passes: the type
registry, the symbol tables, and the compatibility predicates.

Tables, entries, and types live in arenas and are referred to by `Copy`
index handles (`SymtabId`, `EntryId`, `TypeId`). Owner and scope
back-references would otherwise form cycles; with handles they are plain
data, and entries remain addressable after their scope has been popped.
*/

pub mod predefined;
pub mod stack;
pub mod symtab;
pub mod type_checker;
pub mod typespec;
