//! Procedural macros for shell-dispatch

use darling::{FromDeriveInput, FromField, FromVariant};
use proc_macro::TokenStream;
use proc_macro2::Ident;
use quote::{format_ident, quote};
use std::collections::HashMap;
use syn::{parse_macro_input, DeriveInput};

/// Container-level attributes for #[derive(Action)]
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(action), supports(enum_any))]
struct ActionOpts {
    ident: syn::Ident,
    data: darling::ast::Data<ActionVariant, ()>,

    /// Enable automatic category inference from variant name prefixes
    #[darling(default)]
    infer_categories: bool,
}

/// Variant-level attributes
#[derive(Debug, FromVariant)]
#[darling(attributes(action))]
struct ActionVariant {
    ident: syn::Ident,
    fields: darling::ast::Fields<()>,

    /// Explicit category override
    #[darling(default)]
    category: Option<String>,

    /// Exclude from category inference
    #[darling(default)]
    skip_category: bool,
}

// Verbs that end the subject part of a variant name
const ACTION_VERBS: &[&str] = &[
    "Start", "End", "Open", "Close", "Submit", "Confirm", "Cancel", "Add", "Remove", "Clear",
    "Update", "Set", "Get", "Load", "Save", "Delete", "Create", "Show", "Hide", "Enable",
    "Disable", "Toggle", "Reset", "Check", "Lock", "Unlock", "Sign", "Prompt", "Rate",
];

/// Marker for result actions: `UserDidLoad` is the result of `UserUpdate`
const RESULT_MARKER: &str = "Did";

/// Split a PascalCase string into parts
fn split_pascal_case(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();

    for ch in s.chars() {
        if ch.is_uppercase() && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Convert PascalCase to snake_case
fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}

/// Convert snake_case to PascalCase
fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect()
}

/// Infer a category from a variant name
///
/// The category is the subject before the first verb or `Did` marker:
/// `UserClear` -> "user", `UserDidLoad` -> "user",
/// `PreferenceDidChange` -> "preference". Names that start with a verb or
/// contain neither a verb nor the marker are uncategorized.
fn infer_category(name: &str) -> Option<String> {
    let parts = split_pascal_case(name);
    if parts.len() < 2 {
        return None;
    }

    let is_boundary = |part: &str| part == RESULT_MARKER || ACTION_VERBS.contains(&part);
    if is_boundary(&parts[0]) {
        return None;
    }

    let prefix_end = parts.iter().skip(1).position(|p| is_boundary(p))? + 1;
    Some(to_snake_case(&parts[..prefix_end].concat()))
}

/// Derive macro for the Action trait
///
/// Generates a `name()` method that returns the variant name as a static string.
///
/// With `#[action(infer_categories)]`, also generates:
/// - `category() -> Option<&'static str>` - Get action's category
/// - `category_enum() -> {Name}Category` - Get category as enum
/// - `is_{category}()` predicates for each category
/// - `{Name}Category` enum with all discovered categories
/// - an `ActionCategory` impl
///
/// Variants may override the inferred category with
/// `#[action(category = "...")]` or opt out with `#[action(skip_category)]`.
///
/// # Example
/// ```ignore
/// #[derive(Action, Clone, Debug)]
/// #[action(infer_categories)]
/// enum AppAction {
///     UserClear,
///     UserDidLoad(UserProfile),
///     #[action(category = "general")]
///     GeneralFullScreenSet(bool),
///     Tick,  // uncategorized
/// }
///
/// let action = AppAction::UserClear;
/// assert_eq!(action.name(), "UserClear");
/// assert_eq!(action.category(), Some("user"));
/// assert!(action.is_user());
/// ```
#[proc_macro_derive(Action, attributes(action))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let opts = match ActionOpts::from_derive_input(&input) {
        Ok(opts) => opts,
        Err(e) => return e.write_errors().into(),
    };

    let name = &opts.ident;

    let variants = match &opts.data {
        darling::ast::Data::Enum(variants) => variants,
        _ => {
            return syn::Error::new_spanned(&input, "Action can only be derived for enums")
                .to_compile_error()
                .into();
        }
    };

    let name_arms = variants.iter().map(|v| {
        let variant_name = &v.ident;
        let variant_str = variant_name.to_string();

        match &v.fields.style {
            darling::ast::Style::Unit => quote! {
                #name::#variant_name => #variant_str
            },
            darling::ast::Style::Tuple => quote! {
                #name::#variant_name(..) => #variant_str
            },
            darling::ast::Style::Struct => quote! {
                #name::#variant_name { .. } => #variant_str
            },
        }
    });

    let mut expanded = quote! {
        impl ::shell_dispatch::Action for #name {
            fn name(&self) -> &'static str {
                match self {
                    #(#name_arms),*
                }
            }
        }
    };

    if opts.infer_categories {
        let mut categories: HashMap<String, Vec<&Ident>> = HashMap::new();
        let mut variant_categories: Vec<(&Ident, Option<String>)> = Vec::new();

        for v in variants.iter() {
            let cat = if v.skip_category {
                None
            } else if let Some(ref explicit_cat) = v.category {
                Some(explicit_cat.clone())
            } else {
                infer_category(&v.ident.to_string())
            };

            if let Some(ref category) = cat {
                categories
                    .entry(category.clone())
                    .or_default()
                    .push(&v.ident);
            }
            variant_categories.push((&v.ident, cat));
        }

        // Sorted for deterministic output
        let mut sorted_categories: Vec<_> = categories.keys().cloned().collect();
        sorted_categories.sort();

        let category_arms: Vec<_> = variant_categories
            .iter()
            .map(|(variant, cat)| {
                let cat_expr = match cat {
                    Some(c) => quote! { ::core::option::Option::Some(#c) },
                    None => quote! { ::core::option::Option::None },
                };
                quote! { #name::#variant { .. } => #cat_expr }
            })
            .collect();

        let category_enum_name = format_ident!("{}Category", name);
        let category_variants: Vec<_> = sorted_categories
            .iter()
            .map(|c| format_ident!("{}", to_pascal_case(c)))
            .collect();

        let category_enum_arms: Vec<_> = variant_categories
            .iter()
            .map(|(variant, cat)| {
                let cat_variant = match cat {
                    Some(c) => format_ident!("{}", to_pascal_case(c)),
                    None => format_ident!("Uncategorized"),
                };
                quote! { #name::#variant { .. } => #category_enum_name::#cat_variant }
            })
            .collect();

        let predicates: Vec<_> = sorted_categories
            .iter()
            .map(|cat| {
                let predicate_name = format_ident!("is_{}", cat);
                let patterns: Vec<_> = categories
                    .get(cat)
                    .into_iter()
                    .flatten()
                    .map(|v| quote! { #name::#v { .. } })
                    .collect();
                let doc = format!(
                    "Returns true if this action belongs to the `{}` category.",
                    cat
                );

                quote! {
                    #[doc = #doc]
                    pub fn #predicate_name(&self) -> bool {
                        matches!(self, #(#patterns)|*)
                    }
                }
            })
            .collect();

        let category_enum_doc = format!(
            "Action categories for [`{}`].\n\n\
             Use [`{}::category_enum()`] to get the category of an action.",
            name, name
        );

        expanded = quote! {
            #expanded

            #[doc = #category_enum_doc]
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub enum #category_enum_name {
                #(#category_variants,)*
                /// Actions that don't belong to any specific category.
                Uncategorized,
            }

            impl #category_enum_name {
                /// Get all category values
                pub fn all() -> &'static [Self] {
                    &[#(Self::#category_variants,)* Self::Uncategorized]
                }

                /// Get category name as string
                pub fn name(&self) -> &'static str {
                    match self {
                        #(Self::#category_variants => #sorted_categories,)*
                        Self::Uncategorized => "uncategorized",
                    }
                }
            }

            impl #name {
                /// Get the action's category (if categorized)
                pub fn category(&self) -> ::core::option::Option<&'static str> {
                    match self {
                        #(#category_arms,)*
                    }
                }

                /// Get the category as an enum value
                pub fn category_enum(&self) -> #category_enum_name {
                    match self {
                        #(#category_enum_arms,)*
                    }
                }

                #(#predicates)*
            }

            impl ::shell_dispatch::ActionCategory for #name {
                fn category(&self) -> ::core::option::Option<&'static str> {
                    #name::category(self)
                }
            }
        };
    }

    TokenStream::from(expanded)
}

/// Container for #[derive(StateTree)]
#[derive(Debug, FromDeriveInput)]
#[darling(supports(struct_named))]
struct StateTreeOpts {
    ident: syn::Ident,
    generics: syn::Generics,
    data: darling::ast::Data<(), StateTreeField>,
}

#[derive(Debug, FromField)]
struct StateTreeField {
    ident: Option<syn::Ident>,
    ty: syn::Type,
}

/// Extract `T` from `Arc<T>` (any path ending in `Arc`)
fn arc_inner(ty: &syn::Type) -> Option<&syn::Type> {
    let syn::Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Arc" {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        syn::GenericArgument::Type(inner) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}

/// Derive macro for the StateTree trait
///
/// Every field must be an `Arc<T>` where `T` implements `Slice<A>`. The
/// generated `reduce` runs each slice reducer against the same tree and
/// action, and builds a new tree only if some slice changed; unchanged slices
/// keep their `Arc`. `slice_keys()` lists each slice's `KEY` in field order.
///
/// # Example
/// ```ignore
/// #[derive(Clone, Debug, Default, StateTree)]
/// struct AppState {
///     user: Arc<UserState>,
///     general: Arc<GeneralState>,
/// }
/// ```
#[proc_macro_derive(StateTree)]
pub fn derive_state_tree(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let opts = match StateTreeOpts::from_derive_input(&input) {
        Ok(opts) => opts,
        Err(e) => return e.write_errors().into(),
    };

    if !opts.generics.params.is_empty() {
        return syn::Error::new_spanned(
            &opts.generics,
            "StateTree cannot be derived for generic structs",
        )
        .to_compile_error()
        .into();
    }

    let name = &opts.ident;
    let fields = match &opts.data {
        darling::ast::Data::Struct(fields) => &fields.fields,
        _ => {
            return syn::Error::new_spanned(&input, "StateTree can only be derived for structs")
                .to_compile_error()
                .into();
        }
    };

    let mut idents = Vec::new();
    let mut slice_types = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        match arc_inner(&field.ty) {
            Some(inner) => {
                idents.push(ident);
                slice_types.push(inner);
            }
            None => {
                return syn::Error::new_spanned(
                    &field.ty,
                    "StateTree fields must be `Arc<impl Slice>`",
                )
                .to_compile_error()
                .into();
            }
        }
    }

    let next_idents: Vec<_> = idents.iter().map(|i| format_ident!("__next_{}", i)).collect();

    let expanded = quote! {
        impl<__A: ::shell_dispatch::Action> ::shell_dispatch::StateTree<__A> for #name
        where
            #(#slice_types: ::shell_dispatch::Slice<__A>,)*
        {
            fn slice_keys() -> ::std::vec::Vec<&'static str> {
                ::std::vec![#(<#slice_types as ::shell_dispatch::Slice<__A>>::KEY),*]
            }

            fn reduce(
                &self,
                action: &__A,
            ) -> ::core::result::Result<::core::option::Option<Self>, ::shell_dispatch::ReducerError> {
                #(
                    let #next_idents = ::shell_dispatch::reduce_slice(&self.#idents, action)?;
                )*
                if true #(&& #next_idents.is_none())* {
                    return ::core::result::Result::Ok(::core::option::Option::None);
                }
                ::core::result::Result::Ok(::core::option::Option::Some(Self {
                    #(
                        #idents: #next_idents
                            .unwrap_or_else(|| ::std::sync::Arc::clone(&self.#idents)),
                    )*
                }))
            }
        }
    };

    TokenStream::from(expanded)
}
