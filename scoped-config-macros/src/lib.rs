//! Proc macros for the scoped-config crate.
//!
//! This crate provides the `#[derive(Plugin)]` macro

use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, Expr, Lit, parse_macro_input, spanned::Spanned};

/// Options parsed from the `#[plugin(...)]` attribute.
struct PluginOptions {
    class: Option<String>,
}

impl PluginOptions {
    fn from_attrs(attrs: &[syn::Attribute]) -> syn::Result<Self> {
        let mut class = None;

        for attr in attrs {
            if attr.path().is_ident("plugin") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("class") {
                        let value: Expr = meta.value()?.parse()?;
                        if let Expr::Lit(expr_lit) = value {
                            if let Lit::Str(lit_str) = expr_lit.lit {
                                class = Some(lit_str.value());
                            } else {
                                return Err(syn::Error::new(
                                    expr_lit.span(),
                                    "class must be a string",
                                ));
                            }
                        } else {
                            return Err(syn::Error::new(value.span(), "class must be a literal"));
                        }
                    } else {
                        return Err(syn::Error::new(
                            meta.path.span(),
                            format!("unknown plugin attribute: {:?}", meta.path.get_ident()),
                        ));
                    }
                    Ok(())
                })?;
            }
        }

        Ok(Self { class })
    }
}

/// Derive macro for the `Plugin` trait.
///
/// This macro automatically:
/// - Implements the `Plugin` trait with the given class name
/// - Registers the type with `inventory` so every store can resolve it
///
/// The type must implement `FromConfig` itself. Without `#[plugin(class = ...)]`
/// the class name is the type's name.
///
/// # Example
///
/// ```rust,ignore
/// use scoped_config::{ConfigView, Error, FromConfig, Params, Plugin};
///
/// #[derive(Plugin)]
/// #[plugin(class = "mymodule.PgStore")]
/// struct PgStore {
///     config: ConfigView,
/// }
///
/// impl FromConfig for PgStore {
///     fn from_config(config: ConfigView, _params: &Params) -> Result<Self, Error> {
///         Ok(Self { config })
///     }
/// }
/// ```
///
/// This expands to roughly:
///
/// ```rust,ignore
/// impl scoped_config::Plugin for PgStore {
///     const CLASS: &'static str = "mymodule.PgStore";
/// }
///
/// scoped_config::inventory::submit! {
///     scoped_config::RegisteredClass::new::<PgStore>("mymodule.PgStore")
/// }
/// ```
#[proc_macro_derive(Plugin, attributes(plugin))]
pub fn derive_plugin(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_plugin_impl(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_plugin_impl(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "Plugin cannot be derived for generic types",
        ));
    }

    let options = PluginOptions::from_attrs(&input.attrs)?;
    let name = &input.ident;
    let class = options.class.unwrap_or_else(|| name.to_string());

    Ok(quote! {
        impl ::scoped_config::Plugin for #name {
            const CLASS: &'static str = #class;
        }

        ::scoped_config::inventory::submit! {
            ::scoped_config::RegisteredClass::new::<#name>(#class)
        }
    })
}
