//! Rule model extracted from an annotated impl block
//!
//! Parsing strips every marker attribute from the impl block (the compiler
//! would reject them otherwise) and checks the shape of the marked methods.
//! All problems found are reported together.

use syn::{FnArg, Ident, ImplItem, ImplItemFn, ItemImpl, Pat, Type};

use crate::attributes::{fact_name, is_fact, ActionArgs, Marker};
use crate::utils::{
    facts_reference, is_action_return, is_condition_return, last_segment, takes_shared_self,
};

/// How one method parameter is supplied at call time
#[derive(Debug, Clone)]
pub enum Param {
    /// Named fact, cloned out (`T`) or borrowed (`&T`)
    Fact {
        name: String,
        ty: Type,
        borrowed: bool,
    },
    /// The fact store itself
    Facts { mutable: bool },
}

/// A `#[condition]` or `#[action]` method
#[derive(Debug, Clone)]
pub struct Method {
    pub ident: Ident,
    pub params: Vec<Param>,
}

#[derive(Debug, Clone)]
pub struct Action {
    pub method: Method,
    pub order: i32,
}

/// Everything code generation needs
#[derive(Debug)]
pub struct RuleModel {
    /// Short name of the host type
    pub type_name: String,
    pub condition: Method,
    /// Sorted by order; equal orders keep declaration order
    pub actions: Vec<Action>,
    pub name_method: Option<Ident>,
    pub description_method: Option<Ident>,
    pub priority_method: Option<Ident>,
}

impl RuleModel {
    /// Build the model, stripping marker attributes from `item`
    pub fn parse(item: &mut ItemImpl) -> darling::Result<Self> {
        let mut errors = darling::Error::accumulator();

        if let Some((_, path, _)) = &item.trait_ {
            errors.push(
                darling::Error::custom("#[rule] goes on an inherent impl block, not a trait impl")
                    .with_span(path),
            );
        }

        let type_name = match last_segment(&item.self_ty) {
            Some(name) => name,
            None => {
                errors.push(
                    darling::Error::custom("#[rule] requires a named host type")
                        .with_span(&item.self_ty),
                );
                String::new()
            },
        };

        let mut conditions = Vec::new();
        let mut actions = Vec::new();
        let mut name_methods = Vec::new();
        let mut description_methods = Vec::new();
        let mut priority_methods = Vec::new();

        for impl_item in &mut item.items {
            let ImplItem::Fn(method) = impl_item else {
                continue;
            };
            let Some(marker) = take_marker(method, &mut errors) else {
                strip_fact_attributes(method);
                continue;
            };

            match marker {
                (Marker::Condition, _) => {
                    check_method(method, marker.0, &mut errors);
                    if !is_condition_return(&method.sig.output) {
                        errors.push(
                            darling::Error::custom(
                                "#[condition] must return bool or Result<bool, E>",
                            )
                            .with_span(&method.sig.ident),
                        );
                    }
                    if let Some(params) = collect_params(method, false, &mut errors) {
                        conditions.push(Method {
                            ident: method.sig.ident.clone(),
                            params,
                        });
                    }
                },
                (Marker::Action, args) => {
                    check_method(method, marker.0, &mut errors);
                    if !is_action_return(&method.sig.output) {
                        errors.push(
                            darling::Error::custom("#[action] must return () or Result<(), E>")
                                .with_span(&method.sig.ident),
                        );
                    }
                    if let Some(params) = collect_params(method, true, &mut errors) {
                        actions.push(Action {
                            method: Method {
                                ident: method.sig.ident.clone(),
                                params,
                            },
                            order: args.order,
                        });
                    }
                },
                (other, _) => {
                    check_method(method, other, &mut errors);
                    if method.sig.inputs.len() != 1 {
                        errors.push(
                            darling::Error::custom(format!(
                                "{} method takes no parameters besides &self",
                                other.label()
                            ))
                            .with_span(&method.sig.ident),
                        );
                    }
                    let ident = method.sig.ident.clone();
                    match other {
                        Marker::Name => name_methods.push(ident),
                        Marker::Description => description_methods.push(ident),
                        _ => priority_methods.push(ident),
                    }
                },
            }
        }

        if conditions.len() != 1 {
            errors.push(
                darling::Error::custom(format!(
                    "#[rule] requires exactly one #[condition] method, found {}",
                    conditions.len()
                ))
                .with_span(&item.self_ty),
            );
        }
        if actions.is_empty() {
            errors.push(
                darling::Error::custom("#[rule] requires at least one #[action] method")
                    .with_span(&item.self_ty),
            );
        }
        let name_method = single(name_methods, Marker::Name, &mut errors);
        let description_method = single(description_methods, Marker::Description, &mut errors);
        let priority_method = single(priority_methods, Marker::Priority, &mut errors);

        errors.finish()?;

        // Stable: equal orders keep declaration order
        actions.sort_by_key(|action| action.order);

        let condition = conditions
            .pop()
            .ok_or_else(|| darling::Error::custom("missing #[condition] method"))?;

        Ok(Self {
            type_name,
            condition,
            actions,
            name_method,
            description_method,
            priority_method,
        })
    }
}

/// Remove the method's marker attribute, returning it with its action args
fn take_marker(
    method: &mut ImplItemFn,
    errors: &mut darling::error::Accumulator,
) -> Option<(Marker, ActionArgs)> {
    let mut found: Option<(Marker, ActionArgs)> = None;

    method.attrs.retain(|attr| {
        let Some(marker) = Marker::of(attr) else {
            return true;
        };
        let args = match marker {
            Marker::Action => errors
                .handle(ActionArgs::from_attribute(attr))
                .unwrap_or_default(),
            _ => ActionArgs::default(),
        };
        if let Some((previous, _)) = found {
            errors.push(
                darling::Error::custom(format!(
                    "{} cannot be combined with {}",
                    marker.label(),
                    previous.label()
                ))
                .with_span(attr),
            );
        } else {
            found = Some((marker, args));
        }
        false
    });

    found
}

/// Checks shared by every marked method
fn check_method(method: &ImplItemFn, marker: Marker, errors: &mut darling::error::Accumulator) {
    let sig = &method.sig;
    if !takes_shared_self(sig) {
        errors.push(
            darling::Error::custom(format!("{} method must take &self", marker.label()))
                .with_span(&sig.ident),
        );
    }
    if sig.asyncness.is_some() {
        errors.push(
            darling::Error::custom(format!("{} method cannot be async", marker.label()))
                .with_span(&sig.ident),
        );
    }
    if !sig.generics.params.is_empty() {
        errors.push(
            darling::Error::custom(format!("{} method cannot be generic", marker.label()))
                .with_span(&sig.generics),
        );
    }
}

/// Classify every non-receiver parameter, stripping #[fact] attributes
fn collect_params(
    method: &mut ImplItemFn,
    is_action: bool,
    errors: &mut darling::error::Accumulator,
) -> Option<Vec<Param>> {
    let mut params = Vec::new();
    let mut valid = true;

    for input in method.sig.inputs.iter_mut() {
        let FnArg::Typed(pat_type) = input else {
            continue;
        };

        let fact_attr = pat_type.attrs.iter().position(is_fact);
        let param = match fact_attr {
            Some(index) => {
                let attr = pat_type.attrs.remove(index);
                match errors.handle(fact_name(&attr)) {
                    Some(name) => fact_param(name, &pat_type.ty, errors),
                    None => None,
                }
            },
            None => match facts_reference(&pat_type.ty) {
                Some(true) if !is_action => {
                    errors.push(
                        darling::Error::custom("#[condition] cannot take &mut Facts")
                            .with_span(&pat_type.ty),
                    );
                    None
                },
                Some(mutable) => Some(Param::Facts { mutable }),
                None => {
                    errors.push(
                        darling::Error::custom(format!(
                            "parameter `{}` must be a #[fact(\"name\")] binding or the fact store (&Facts{})",
                            param_label(&pat_type.pat),
                            if is_action { " or &mut Facts" } else { "" }
                        ))
                        .with_span(&pat_type.pat),
                    );
                    None
                },
            },
        };

        match param {
            Some(param) => params.push(param),
            None => valid = false,
        }
    }

    if is_action && !check_action_borrows(&params) {
        errors.push(
            darling::Error::custom(
                "an #[action] taking &mut Facts cannot take it twice, nor alongside &Facts or borrowed facts",
            )
            .with_span(&method.sig.ident),
        );
        valid = false;
    }

    valid.then_some(params)
}

fn fact_param(name: String, ty: &Type, errors: &mut darling::error::Accumulator) -> Option<Param> {
    match ty {
        Type::Reference(reference) if reference.mutability.is_some() => {
            errors.push(
                darling::Error::custom("bound facts cannot be borrowed mutably; take &mut Facts")
                    .with_span(ty),
            );
            None
        },
        Type::Reference(reference) => Some(Param::Fact {
            name,
            ty: (*reference.elem).clone(),
            borrowed: true,
        }),
        _ => Some(Param::Fact {
            name,
            ty: ty.clone(),
            borrowed: false,
        }),
    }
}

/// `&mut Facts` must be the only view of the store
fn check_action_borrows(params: &[Param]) -> bool {
    let mutable = params
        .iter()
        .filter(|p| matches!(p, Param::Facts { mutable: true }))
        .count();
    if mutable == 0 {
        return true;
    }
    let shared = params.iter().any(|p| {
        matches!(
            p,
            Param::Facts { mutable: false } | Param::Fact { borrowed: true, .. }
        )
    });
    mutable == 1 && !shared
}

fn strip_fact_attributes(method: &mut ImplItemFn) {
    for input in method.sig.inputs.iter_mut() {
        if let FnArg::Typed(pat_type) = input {
            pat_type.attrs.retain(|attr| !is_fact(attr));
        }
    }
}

fn single(
    mut idents: Vec<Ident>,
    marker: Marker,
    errors: &mut darling::error::Accumulator,
) -> Option<Ident> {
    if idents.len() > 1 {
        for ident in &idents[1..] {
            errors.push(
                darling::Error::custom(format!("at most one {} method is allowed", marker.label()))
                    .with_span(ident),
            );
        }
    }
    if idents.is_empty() {
        None
    } else {
        Some(idents.swap_remove(0))
    }
}

fn param_label(pat: &Pat) -> String {
    match pat {
        Pat::Ident(ident) => ident.ident.to_string(),
        _ => "_".to_string(),
    }
}
