//! Type inspection helpers for the rule macro

use syn::{FnArg, ReturnType, Signature, Type, TypePath};

/// Last path segment of a type, if it is a path type
///
/// # Examples
///
/// ```ignore
/// let ty: Type = parse_quote!(std::result::Result<bool, E>);
/// assert_eq!(last_segment(&ty).as_deref(), Some("Result"));
/// ```
pub fn last_segment(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(TypePath { path, .. }) => path.segments.last().map(|seg| seg.ident.to_string()),
        Type::Group(group) => last_segment(&group.elem),
        Type::Paren(paren) => last_segment(&paren.elem),
        _ => None,
    }
}

/// Fact store parameter kind: `Some(false)` for `&Facts`, `Some(true)` for `&mut Facts`
pub fn facts_reference(ty: &Type) -> Option<bool> {
    match ty {
        Type::Reference(reference) => {
            (last_segment(&reference.elem).as_deref() == Some("Facts"))
                .then_some(reference.mutability.is_some())
        },
        _ => None,
    }
}

/// Whether the type is the unit type `()`
pub fn is_unit(ty: &Type) -> bool {
    matches!(ty, Type::Tuple(tuple) if tuple.elems.is_empty())
}

/// Whether a condition may return this: `bool` or a `Result`
pub fn is_condition_return(output: &ReturnType) -> bool {
    match output {
        ReturnType::Default => false,
        ReturnType::Type(_, ty) => {
            matches!(last_segment(ty).as_deref(), Some("bool") | Some("Result"))
        },
    }
}

/// Whether an action may return this: nothing, `()` or a `Result`
pub fn is_action_return(output: &ReturnType) -> bool {
    match output {
        ReturnType::Default => true,
        ReturnType::Type(_, ty) => is_unit(ty) || last_segment(ty).as_deref() == Some("Result"),
    }
}

/// Whether the method takes `&self` (not `self`, not `&mut self`)
pub fn takes_shared_self(sig: &Signature) -> bool {
    match sig.inputs.first() {
        Some(FnArg::Receiver(receiver)) => {
            receiver.reference.is_some() && receiver.mutability.is_none()
        },
        _ => false,
    }
}
