//! `#[suite]` attribute implementation.
//!
//! Generates `::rig_suite::DeclaredSuite` for the annotated type. The
//! generated code refers to `rig_suite` by absolute path, so callers must
//! depend on it under that name.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{ImplItem, ImplItemFn, ItemImpl, LitStr};

use crate::utils::{is_marker, parse_case_args, require_bare, validate_method, CaseArgs};

/// Main entry point for the suite attribute.
pub fn expand_suite(args: TokenStream, item: TokenStream) -> TokenStream {
    match expand_suite_impl(args.into(), item.into()) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_suite_impl(args: TokenStream2, item: TokenStream2) -> syn::Result<TokenStream2> {
    let title = if args.is_empty() {
        None
    } else {
        Some(syn::parse2::<LitStr>(args)?)
    };
    let mut block: ItemImpl = syn::parse2(item)?;

    if let Some((_, path, _)) = &block.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[suite] goes on an inherent impl block, not a trait impl",
        ));
    }
    if !block.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &block.generics,
            "#[suite] does not support generic impl blocks",
        ));
    }

    let mut registrations = Vec::new();
    let mut injected = false;
    for item in &mut block.items {
        let ImplItem::Fn(method) = item else {
            continue;
        };
        let markers: Vec<_> = method.attrs.iter().filter(|a| is_marker(a)).cloned().collect();
        method.attrs.retain(|a| !is_marker(a));

        for attr in &markers {
            let marker = attr
                .path()
                .get_ident()
                .map(ToString::to_string)
                .unwrap_or_default();
            let registration = match marker.as_str() {
                "test_case" => register_test(method, &parse_case_args(attr)?, "test_case")?,
                "test_only" => register_test(method, &parse_case_args(attr)?, "test_only")?,
                "inject_topo" => {
                    if injected {
                        return Err(syn::Error::new_spanned(
                            attr,
                            "a suite can inject only one topology resource",
                        ));
                    }
                    injected = true;
                    let kind: LitStr = attr.parse_args()?;
                    register_injection(method, &kind)?
                }
                hook => {
                    require_bare(attr, hook)?;
                    register_hook(method, hook)?
                }
            };
            registrations.push(registration);
        }
    }

    let self_ty = &block.self_ty;
    let env = if registrations.is_empty() {
        quote! { _env }
    } else {
        quote! { env }
    };
    let title = match title {
        Some(title) => quote! { ::core::option::Option::Some(#title) },
        None => quote! { ::core::option::Option::None },
    };

    Ok(quote! {
        #block

        impl ::rig_suite::DeclaredSuite for #self_ty {
            const TITLE: ::core::option::Option<&'static str> = #title;

            fn declare(#env: &mut ::rig_suite::Environment) {
                #(#registrations)*
            }
        }
    })
}

/// `env.add_test(...)` or `env.add_test_only(...)` for one method.
fn register_test(method: &ImplItemFn, args: &CaseArgs, marker: &str) -> syn::Result<TokenStream2> {
    validate_method(method, marker, 0)?;
    let ident = &method.sig.ident;
    let name = ident.to_string();
    let message = match &args.message {
        Some(message) => quote! { #message },
        None => quote! { #name },
    };
    let timeout = match args.timeout {
        Some(millis) => {
            quote! { ::core::option::Option::Some(::std::time::Duration::from_millis(#millis)) }
        }
        None => quote! { ::core::option::Option::None },
    };
    let add = if marker == "test_only" {
        quote! { add_test_only }
    } else {
        quote! { add_test }
    };

    Ok(quote! {
        env.#add(#name, |this: &mut Self| Self::#ident(this), #message, #timeout);
    })
}

/// `env.add_before_all(...)` and friends.
fn register_hook(method: &ImplItemFn, hook: &str) -> syn::Result<TokenStream2> {
    validate_method(method, hook, 0)?;
    let ident = &method.sig.ident;
    let name = ident.to_string();
    let add = syn::Ident::new(&format!("add_{hook}"), proc_macro2::Span::call_site());

    Ok(quote! {
        env.#add(#name, |this: &mut Self| Self::#ident(this));
    })
}

/// `env.inject_topo(...)` calling the setter with the converted resource.
fn register_injection(method: &ImplItemFn, kind: &LitStr) -> syn::Result<TokenStream2> {
    validate_method(method, "inject_topo", 1)?;
    let ident = &method.sig.ident;
    let name = ident.to_string();

    Ok(quote! {
        env.inject_topo(#name, #kind, |this: &mut Self, resource: ::rig_suite::Resource| {
            let resource = ::rig_suite::FromResource::from_resource(resource)?;
            ::rig_suite::IntoStepResult::into_step_result(Self::#ident(this, resource))
        });
    })
}
