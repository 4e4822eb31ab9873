use super::stack::SymtabStack;
use super::symtab::{EntryId, EntryInfo, Kind};
use super::typespec::{Form, TypeId, Types};

/// The predefined types and constants, entered into the level 0 scope.
///
/// `number` and `string` are scalars. `boolean` is an enumeration whose
/// constants are `false` = 0 and `true` = 1, which is what lets the
/// analyzer treat booleans as blendable with numbers. `undefined` is a
/// scalar used only as a recovery placeholder and is never entered into
/// any scope.
#[derive(Debug)]
pub struct Predefined {
    pub number_type: TypeId,
    pub boolean_type: TypeId,
    pub string_type: TypeId,
    pub undefined_type: TypeId,

    pub number_id: EntryId,
    pub boolean_id: EntryId,
    pub string_id: EntryId,
    pub false_id: EntryId,
    pub true_id: EntryId,
}

impl Predefined {
    pub fn initialize(types: &mut Types, stack: &mut SymtabStack) -> Self {
        // Types.
        let number_id = stack.enter_local("number", Kind::Type);
        let number_type = types.alloc(Form::Scalar);
        types.get_mut(number_type).identifier = Some(number_id);
        stack.entry_mut(number_id).typespec = Some(number_type);

        let boolean_id = stack.enter_local("boolean", Kind::Type);
        let boolean_type = types.alloc(Form::Enumeration {
            constants: Vec::new(),
        });
        types.get_mut(boolean_type).identifier = Some(boolean_id);
        stack.entry_mut(boolean_id).typespec = Some(boolean_type);

        let string_id = stack.enter_local("string", Kind::Type);
        let string_type = types.alloc(Form::Scalar);
        types.get_mut(string_type).identifier = Some(string_id);
        stack.entry_mut(string_id).typespec = Some(string_type);

        let undefined_type = types.alloc(Form::Scalar);

        // Constants.
        let false_id = stack.enter_local("false", Kind::EnumerationConstant);
        stack.entry_mut(false_id).typespec = Some(boolean_type);
        stack.entry_mut(false_id).info = EntryInfo::Value { value: Some(0) };

        let true_id = stack.enter_local("true", Kind::EnumerationConstant);
        stack.entry_mut(true_id).typespec = Some(boolean_type);
        stack.entry_mut(true_id).info = EntryInfo::Value { value: Some(1) };

        if let Form::Enumeration { constants } = &mut types.get_mut(boolean_type).form {
            constants.push(false_id);
            constants.push(true_id);
        }

        Predefined {
            number_type,
            boolean_type,
            string_type,
            undefined_type,
            number_id,
            boolean_id,
            string_id,
            false_id,
            true_id,
        }
    }
}
