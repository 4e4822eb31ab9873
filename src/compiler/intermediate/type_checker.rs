//! Type compatibility predicates. Every check normalizes through
//! [`Types::base_type`] first, so a subrange behaves as its base type.

use super::predefined::Predefined;
use super::typespec::{Form, TypeId, Types};

pub fn is_number(types: &Types, predefined: &Predefined, ty: Option<TypeId>) -> bool {
    ty.map_or(false, |t| types.base_type(t) == predefined.number_type)
}

pub fn are_both_number(
    types: &Types,
    predefined: &Predefined,
    ty1: Option<TypeId>,
    ty2: Option<TypeId>,
) -> bool {
    is_number(types, predefined, ty1) && is_number(types, predefined, ty2)
}

pub fn is_boolean(types: &Types, predefined: &Predefined, ty: Option<TypeId>) -> bool {
    ty.map_or(false, |t| types.base_type(t) == predefined.boolean_type)
}

pub fn are_both_boolean(
    types: &Types,
    predefined: &Predefined,
    ty1: Option<TypeId>,
    ty2: Option<TypeId>,
) -> bool {
    is_boolean(types, predefined, ty1) && is_boolean(types, predefined, ty2)
}

pub fn is_string(types: &Types, predefined: &Predefined, ty: Option<TypeId>) -> bool {
    ty.map_or(false, |t| types.base_type(t) == predefined.string_type)
}

pub fn are_both_string(
    types: &Types,
    predefined: &Predefined,
    ty1: Option<TypeId>,
    ty2: Option<TypeId>,
) -> bool {
    is_string(types, predefined, ty1) && is_string(types, predefined, ty2)
}

/// A value can be assigned to a target iff their base types are identical.
pub fn are_assignment_compatible(
    types: &Types,
    target: Option<TypeId>,
    value: Option<TypeId>,
) -> bool {
    match (target, value) {
        (Some(t), Some(v)) => types.base_type(t) == types.base_type(v),
        _ => false,
    }
}

/// Two values can be compared iff their base types are identical and
/// scalar or enumeration.
pub fn are_comparison_compatible(
    types: &Types,
    ty1: Option<TypeId>,
    ty2: Option<TypeId>,
) -> bool {
    let (t1, t2) = match (ty1, ty2) {
        (Some(t1), Some(t2)) => (types.base_type(t1), types.base_type(t2)),
        _ => return false,
    };
    t1 == t2
        && matches!(
            types.get(t1).form,
            Form::Scalar | Form::Enumeration { .. }
        )
}

#[cfg(test)]
mod tests {
    use super::super::stack::SymtabStack;
    use super::*;

    fn universe() -> (Types, Predefined) {
        let mut types = Types::new();
        let mut stack = SymtabStack::new();
        let predefined = Predefined::initialize(&mut types, &mut stack);
        (types, predefined)
    }

    #[test]
    fn scalar_predicates() {
        let (types, predefined) = universe();

        assert!(is_number(&types, &predefined, Some(predefined.number_type)));
        assert!(!is_number(&types, &predefined, Some(predefined.boolean_type)));
        assert!(!is_number(&types, &predefined, None));
        assert!(is_boolean(&types, &predefined, Some(predefined.boolean_type)));
        assert!(is_string(&types, &predefined, Some(predefined.string_type)));
    }

    #[test]
    fn subrange_reduces_to_its_base() {
        let (mut types, predefined) = universe();
        let digit = types.alloc(Form::Subrange {
            base: Some(predefined.number_type),
            min: 0,
            max: 9,
        });

        assert!(is_number(&types, &predefined, Some(digit)));
        assert!(are_assignment_compatible(
            &types,
            Some(predefined.number_type),
            Some(digit)
        ));
        assert!(are_comparison_compatible(
            &types,
            Some(digit),
            Some(predefined.number_type)
        ));
    }

    #[test]
    fn assignment_requires_identical_base_types() {
        let (types, predefined) = universe();

        assert!(are_assignment_compatible(
            &types,
            Some(predefined.string_type),
            Some(predefined.string_type)
        ));
        assert!(!are_assignment_compatible(
            &types,
            Some(predefined.number_type),
            Some(predefined.boolean_type)
        ));
        assert!(!are_assignment_compatible(
            &types,
            None,
            Some(predefined.number_type)
        ));
    }

    #[test]
    fn comparison_accepts_scalar_and_enumeration_only() {
        let (mut types, predefined) = universe();

        assert!(are_comparison_compatible(
            &types,
            Some(predefined.boolean_type),
            Some(predefined.boolean_type)
        ));
        assert!(!are_comparison_compatible(
            &types,
            Some(predefined.number_type),
            Some(predefined.string_type)
        ));

        let arr = types.alloc(Form::Array {
            index: None,
            element: None,
            count: 0,
        });
        assert!(!are_comparison_compatible(&types, Some(arr), Some(arr)));
    }
}
