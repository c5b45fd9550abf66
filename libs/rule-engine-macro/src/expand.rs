//! Core macro implementation
//!
//! Ties together argument parsing, model extraction and code generation for
//! the `#[rule]` attribute.

use proc_macro2::TokenStream;
use quote::quote;
use syn::ItemImpl;

use crate::{attributes::RuleArgs, codegen::generate_declared_rule, model::RuleModel};

/// Main implementation of the rule attribute
///
/// # Flow
///
/// 1. Parse attribute arguments using darling → `RuleArgs`
/// 2. Extract and validate marked methods → `RuleModel` (markers stripped)
/// 3. Re-emit the impl block followed by the `DeclaredRule` impl
pub fn expand_rule(args: TokenStream, mut item: ItemImpl) -> darling::Result<TokenStream> {
    let mut errors = darling::Error::accumulator();
    let args = errors.handle(RuleArgs::parse(args));
    let model = errors.handle(RuleModel::parse(&mut item));
    errors.finish()?;

    let (Some(args), Some(model)) = (args, model) else {
        return Err(darling::Error::custom("invalid #[rule] declaration"));
    };
    let declared = generate_declared_rule(&item, &args, &model);

    Ok(quote! {
        #item
        #declared
    })
}
