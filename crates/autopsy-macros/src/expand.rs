//! Code generation for `#[logged]`

use crate::options::Options;
use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{
    visit::{self, Visit},
    FnArg, Ident, ItemFn, Pat, ReturnType, Type, TypeImplTrait,
};

pub(crate) fn expand(options: Options, function: ItemFn) -> syn::Result<TokenStream> {
    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = function;

    if let Some(constness) = &sig.constness {
        return Err(syn::Error::new_spanned(
            constness,
            "#[logged] cannot be applied to a `const fn`",
        ));
    }

    let mut args = quote!(::autopsy_instrument::Args::new());
    let mut unused_skips = options.skip.clone();
    for input in &sig.inputs {
        let FnArg::Typed(typed) = input else {
            // Receivers are never rendered
            continue;
        };
        match &*typed.pat {
            Pat::Ident(pat) if !options.skip.contains(&pat.ident) => {
                let ident = &pat.ident;
                args.extend(quote!(.arg(&#ident)));
            }
            Pat::Ident(pat) => {
                unused_skips.retain(|skipped| skipped != &pat.ident);
                args.extend(quote!(.skipped()));
            }
            _ => args.extend(quote!(.skipped())),
        }
    }
    if let Some(unknown) = unused_skips.first() {
        return Err(syn::Error::new(
            unknown.span(),
            format!("`{}` is not an argument of this function", unknown),
        ));
    }

    let name = match &options.name {
        Some(name) => quote!(#name),
        None => {
            let ident = sig.ident.to_string();
            quote!(#ident)
        }
    };

    let mut instrumentation = quote!(::autopsy_instrument::Instrumentation::new(#name));
    if let Some(level) = &options.level {
        instrumentation.extend(quote!(.level(#level)));
    }
    if let Some(level) = &options.failure_level {
        instrumentation.extend(quote!(.failure_level(#level)));
    }
    if let Some(enabled) = options.log_none_return {
        instrumentation.extend(quote!(.log_none_return(#enabled)));
    }

    let fallible = options
        .fallible
        .unwrap_or_else(|| returns_result(&sig.output));
    let type_hint = return_type_hint(&sig.output);

    // Not nameable from the function body
    let call = Ident::new("__autopsy_instrumentation", Span::mixed_site());

    let body = match (sig.asyncness.is_some(), fallible) {
        (false, false) => quote! {
            #call.call(#args, move || { #type_hint #block })
        },
        (false, true) => quote! {
            #call.call_fallible(#args, move || { #type_hint #block })
        },
        (true, false) => quote! {
            #call.call_async(#args, async move { #type_hint #block }).await
        },
        (true, true) => quote! {
            #call.call_async_fallible(#args, async move { #type_hint #block }).await
        },
    };

    Ok(quote! {
        #(#attrs)*
        #vis #sig {
            let #call = #instrumentation;
            #body
        }
    })
}

/// Whether the declared return type is spelled `Result<..>` (any path)
fn returns_result(output: &ReturnType) -> bool {
    match output {
        ReturnType::Type(_, ty) => match &**ty {
            Type::Path(path) => path
                .path
                .segments
                .last()
                .is_some_and(|segment| segment.ident == "Result"),
            _ => false,
        },
        ReturnType::Default => false,
    }
}

/// Pins the closure or async block output to the declared return type so
/// `?` and coercions in the body resolve as they would in the function.
fn return_type_hint(output: &ReturnType) -> TokenStream {
    let ReturnType::Type(_, ty) = output else {
        return TokenStream::new();
    };

    let mut finder = ImplTraitFinder::default();
    finder.visit_type(ty);
    if finder.found {
        // `impl Trait` cannot be named in a let binding
        return TokenStream::new();
    }

    quote! {
        #[allow(
            unreachable_code,
            clippy::diverging_sub_expression,
            clippy::empty_loop,
            clippy::let_unit_value
        )]
        if false {
            let __autopsy_return: #ty = loop {};
            return __autopsy_return;
        }
    }
}

#[derive(Default)]
struct ImplTraitFinder {
    found: bool,
}

impl<'ast> Visit<'ast> for ImplTraitFinder {
    fn visit_type_impl_trait(&mut self, node: &'ast TypeImplTrait) {
        self.found = true;
        visit::visit_type_impl_trait(self, node);
    }
}
