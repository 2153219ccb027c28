//! Shared parsing helpers for the suite macro.

use syn::parse::ParseStream;
use syn::{Attribute, FnArg, Ident, ImplItemFn, LitInt, LitStr, Meta, Token};

/// Arguments of `#[test_case(...)]` and `#[test_only(...)]`.
#[derive(Default)]
pub struct CaseArgs {
    pub message: Option<LitStr>,
    /// Timeout in milliseconds.
    pub timeout: Option<u64>,
}

/// Parse `"message"`, `timeout = <ms>` or both, in that order.
pub fn parse_case_args(attr: &Attribute) -> syn::Result<CaseArgs> {
    match &attr.meta {
        Meta::Path(_) => Ok(CaseArgs::default()),
        Meta::List(_) => attr.parse_args_with(|input: ParseStream| {
            let mut args = CaseArgs::default();
            if input.peek(LitStr) {
                args.message = Some(input.parse()?);
                if !input.is_empty() {
                    input.parse::<Token![,]>()?;
                }
            }
            while !input.is_empty() {
                let key: Ident = input.parse()?;
                if key != "timeout" {
                    return Err(syn::Error::new(
                        key.span(),
                        format!("unknown argument `{key}`; expected `timeout = <millis>`"),
                    ));
                }
                if args.timeout.is_some() {
                    return Err(syn::Error::new(key.span(), "duplicate `timeout` argument"));
                }
                input.parse::<Token![=]>()?;
                let millis: LitInt = input.parse()?;
                args.timeout = Some(millis.base10_parse()?);
                if !input.is_empty() {
                    input.parse::<Token![,]>()?;
                }
            }
            Ok(args)
        }),
        Meta::NameValue(meta) => Err(syn::Error::new_spanned(
            meta,
            "expected `#[test_case]` or `#[test_case(\"message\", timeout = <millis>)]`",
        )),
    }
}

/// Require a bare marker such as `#[before_each]`.
pub fn require_bare(attr: &Attribute, name: &str) -> syn::Result<()> {
    match &attr.meta {
        Meta::Path(_) => Ok(()),
        other => Err(syn::Error::new_spanned(
            other,
            format!("`#[{name}]` takes no arguments"),
        )),
    }
}

/// Check the method has a `&self` or `&mut self` receiver and exactly
/// `extra` further arguments.
pub fn validate_method(method: &ImplItemFn, marker: &str, extra: usize) -> syn::Result<()> {
    let sig = &method.sig;
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new_spanned(
            asyncness,
            format!("`#[{marker}]` methods cannot be async"),
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            format!("`#[{marker}]` methods cannot be generic"),
        ));
    }

    match sig.inputs.first() {
        Some(FnArg::Receiver(receiver)) if receiver.reference.is_some() => {}
        Some(FnArg::Receiver(receiver)) => {
            return Err(syn::Error::new_spanned(
                receiver,
                format!("`#[{marker}]` methods must take `&self` or `&mut self`, not `self`"),
            ));
        }
        _ => {
            return Err(syn::Error::new_spanned(
                &sig.ident,
                format!("`#[{marker}]` methods need a `&self` or `&mut self` receiver"),
            ));
        }
    }

    let found = sig.inputs.len() - 1;
    if found != extra {
        let expected = match extra {
            0 => "no arguments".to_owned(),
            1 => "exactly one argument".to_owned(),
            n => format!("{n} arguments"),
        };
        return Err(syn::Error::new_spanned(
            &sig.inputs,
            format!("`#[{marker}]` methods take {expected} besides the receiver"),
        ));
    }
    Ok(())
}

/// Marker attribute names recognised inside a `#[suite]` block.
pub const MARKERS: [&str; 7] = [
    "test_case",
    "test_only",
    "before_all",
    "after_all",
    "before_each",
    "after_each",
    "inject_topo",
];

/// Whether `attr` is one of the suite markers.
pub fn is_marker(attr: &Attribute) -> bool {
    MARKERS.iter().any(|name| attr.path().is_ident(name))
}
