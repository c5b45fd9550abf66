//! Code generation for `#[rule]`
//!
//! Emits the `DeclaredRule` implementation for the host type. Generated code
//! only refers to the runtime crate through absolute `::rule_engine` paths.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Ident, ItemImpl};

use crate::attributes::RuleArgs;
use crate::model::{Method, Param, RuleModel};

/// Generate `impl ::rule_engine::DeclaredRule for <host>`
pub fn generate_declared_rule(item: &ItemImpl, args: &RuleArgs, model: &RuleModel) -> TokenStream {
    let (impl_generics, _, where_clause) = item.generics.split_for_impl();
    let self_ty = &item.self_ty;

    let declaration = generate_declaration(args, model);
    let overrides = generate_overrides(model);
    let condition = generate_condition(&model.condition);
    let actions = model
        .actions
        .iter()
        .map(|action| generate_action_call(&action.method));

    quote! {
        impl #impl_generics ::rule_engine::DeclaredRule for #self_ty #where_clause {
            fn declaration() -> ::rule_engine::RuleDeclaration {
                #declaration
            }

            #overrides

            #[allow(unused_variables)]
            fn evaluate_condition(
                &self,
                __facts: &::rule_engine::Facts,
            ) -> ::rule_engine::Result<bool> {
                #condition
            }

            #[allow(unused_variables)]
            fn execute_actions(
                &self,
                __facts: &mut ::rule_engine::Facts,
            ) -> ::rule_engine::Result<()> {
                #(#actions)*
                ::core::result::Result::Ok(())
            }
        }
    }
}

/// `RuleDeclaration { ... }` literal
fn generate_declaration(args: &RuleArgs, model: &RuleModel) -> TokenStream {
    let type_name = &model.type_name;
    let name = optional(args.name.as_ref().map(|name| quote!(#name)));
    let description = optional(args.description.as_ref().map(|d| quote!(#d)));
    let priority = optional(args.priority.map(|p| quote!(#p)));
    let condition = model.condition.ident.to_string();
    let actions = model
        .actions
        .iter()
        .map(|action| action.method.ident.to_string());

    quote! {
        ::rule_engine::RuleDeclaration {
            type_name: #type_name,
            name: #name,
            description: #description,
            priority: #priority,
            condition: #condition,
            actions: &[#(#actions),*],
        }
    }
}

fn optional(value: Option<TokenStream>) -> TokenStream {
    match value {
        Some(value) => quote!(::core::option::Option::Some(#value)),
        None => quote!(::core::option::Option::None),
    }
}

/// `rule_name` / `rule_description` / `rule_priority` for marked methods
fn generate_overrides(model: &RuleModel) -> TokenStream {
    let name = model.name_method.as_ref().map(|method| {
        quote! {
            fn rule_name(&self) -> ::core::option::Option<::std::string::String> {
                ::core::option::Option::Some(::core::convert::Into::into(self.#method()))
            }
        }
    });
    let description = model.description_method.as_ref().map(|method| {
        quote! {
            fn rule_description(&self) -> ::core::option::Option<::std::string::String> {
                ::core::option::Option::Some(::core::convert::Into::into(self.#method()))
            }
        }
    });
    let priority = model.priority_method.as_ref().map(|method| {
        quote! {
            fn rule_priority(&self) -> ::core::option::Option<i32> {
                ::core::option::Option::Some(self.#method())
            }
        }
    });

    quote! {
        #name
        #description
        #priority
    }
}

fn generate_condition(method: &Method) -> TokenStream {
    let (bindings, call) = generate_call(method, false);
    quote! {
        #(#bindings)*
        ::rule_engine::ConditionOutcome::into_outcome(#call)
    }
}

fn generate_action_call(method: &Method) -> TokenStream {
    let (bindings, call) = generate_call(method, true);
    quote! {
        {
            #(#bindings)*
            ::rule_engine::ActionOutcome::into_outcome(#call)?;
        }
    }
}

/// Fact bindings plus the method call expression
///
/// Undeclared or mistyped facts return early with the store's error.
fn generate_call(method: &Method, in_action: bool) -> (Vec<TokenStream>, TokenStream) {
    let ident = &method.ident;
    let mut bindings = Vec::new();
    let mut args = Vec::new();

    // In actions the store is `&mut Facts`; reborrow it shared for lookups
    let shared_store = if in_action {
        quote!(&*__facts)
    } else {
        quote!(__facts)
    };

    for (index, param) in method.params.iter().enumerate() {
        match param {
            Param::Fact { name, ty, borrowed } => {
                let arg: Ident = format_ident!("__fact_{}", index);
                let lookup = if *borrowed {
                    quote!(::rule_engine::Facts::get::<#ty>(#shared_store, #name)?)
                } else {
                    quote!(::rule_engine::Facts::value::<#ty>(#shared_store, #name)?)
                };
                bindings.push(quote!(let #arg = #lookup;));
                args.push(quote!(#arg));
            },
            Param::Facts { mutable: true } => args.push(quote!(&mut *__facts)),
            Param::Facts { mutable: false } => args.push(shared_store.clone()),
        }
    }

    (bindings, quote!(self.#ident(#(#args),*)))
}
