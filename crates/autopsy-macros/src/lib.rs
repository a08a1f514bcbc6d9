//! Procedural macros for `autopsy-instrument`.
//!
//! Use the re-export `autopsy_instrument::logged` rather than this crate
//! directly; the generated code refers to `::autopsy_instrument`.

extern crate proc_macro;

mod expand;
mod options;

use options::Options;
use proc_macro::TokenStream;
use syn::{parse_macro_input, ItemFn};

/// Log entry, return value and failures of a function.
///
/// ```rust,ignore
/// #[logged(level = "info", log_none_return = false, skip(password))]
/// async fn login(user: &str, password: &str) -> Result<Session, AuthError> {
///     // ...
/// }
/// ```
///
/// Options:
/// - `level`: level of the entry and return lines (default `"debug"`)
/// - `failure_level`: level of the failure line (default: `level`)
/// - `log_none_return`: log a `()` or `None` result (default `true`)
/// - `name`: name used in log lines (default: the function name)
/// - `skip(a, b)`: arguments rendered as `_`; `self` is never rendered
/// - `fallible`: treat `Err` as a failure; inferred from a `Result` return type
///
/// The strategy is chosen from the signature: `async fn`s are awaited inside
/// the wrapper, everything else is called directly. Name, signature,
/// attributes and doc comments of the function are left as written.
#[proc_macro_attribute]
pub fn logged(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut options = Options::default();
    let parser = syn::meta::parser(|meta| options.parse(meta));
    parse_macro_input!(attr with parser);

    let function = parse_macro_input!(item as ItemFn);
    match expand::expand(options, function) {
        Ok(expanded) => expanded.into(),
        Err(e) => e.to_compile_error().into(),
    }
}
