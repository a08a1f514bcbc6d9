//! Parsing of `#[logged(...)]` options

use proc_macro2::TokenStream;
use quote::quote;
use syn::{meta::ParseNestedMeta, Ident, LitBool, LitStr};

#[derive(Default)]
pub(crate) struct Options {
    pub(crate) name: Option<LitStr>,
    pub(crate) level: Option<TokenStream>,
    pub(crate) failure_level: Option<TokenStream>,
    pub(crate) log_none_return: Option<bool>,
    pub(crate) fallible: Option<bool>,
    pub(crate) skip: Vec<Ident>,
}

impl Options {
    pub(crate) fn parse(&mut self, meta: ParseNestedMeta<'_>) -> syn::Result<()> {
        if meta.path.is_ident("name") {
            self.name = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("level") {
            self.level = Some(parse_level(&meta.value()?.parse()?)?);
        } else if meta.path.is_ident("failure_level") {
            self.failure_level = Some(parse_level(&meta.value()?.parse()?)?);
        } else if meta.path.is_ident("log_none_return") {
            let value: LitBool = meta.value()?.parse()?;
            self.log_none_return = Some(value.value);
        } else if meta.path.is_ident("fallible") {
            let value: LitBool = meta.value()?.parse()?;
            self.fallible = Some(value.value);
        } else if meta.path.is_ident("skip") {
            meta.parse_nested_meta(|inner| match inner.path.get_ident() {
                Some(ident) => {
                    self.skip.push(ident.clone());
                    Ok(())
                }
                None => Err(inner.error("expected an argument name")),
            })?;
        } else {
            return Err(meta.error(
                "unsupported option; expected `name`, `level`, `failure_level`, \
                 `log_none_return`, `fallible` or `skip`",
            ));
        }
        Ok(())
    }
}

fn parse_level(lit: &LitStr) -> syn::Result<TokenStream> {
    let level = match lit.value().to_ascii_lowercase().as_str() {
        "trace" => quote!(TRACE),
        "debug" => quote!(DEBUG),
        "info" => quote!(INFO),
        "warn" => quote!(WARN),
        "error" => quote!(ERROR),
        _ => {
            return Err(syn::Error::new(
                lit.span(),
                "expected one of \"trace\", \"debug\", \"info\", \"warn\", \"error\"",
            ))
        }
    };
    Ok(quote!(::autopsy_instrument::Level::#level))
}
