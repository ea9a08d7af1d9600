//! `register_strategy!` — registers a [`StrategyLogic`](../signal_strategy/trait.StrategyLogic.html)
//! implementation with the process-wide registry at program startup, the way
//! the teacher framework auto-registers its built-in strategies.
//!
//! ```ignore
//! register_strategy!(SmaCross, "SmaCross");
//! register_strategy!(PairsTradingArbitrage, "PairsTradingArbitrage", aliases = ["Pairs"]);
//! ```

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{
    parse::{Parse, ParseStream},
    parse_macro_input,
    punctuated::Punctuated,
    Ident, LitStr, Path, Token,
};

struct RegisterStrategyInput {
    ty: Path,
    canonical: LitStr,
    aliases: Vec<LitStr>,
}

impl Parse for RegisterStrategyInput {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let ty: Path = input.parse()?;
        input.parse::<Token![,]>()?;
        let canonical: LitStr = input.parse()?;

        let mut aliases = Vec::new();
        if input.peek(Token![,]) {
            input.parse::<Token![,]>()?;
            let ident: Ident = input.parse()?;
            if ident != "aliases" {
                return Err(syn::Error::new(ident.span(), "expected `aliases`"));
            }
            input.parse::<Token![=]>()?;
            let content;
            syn::bracketed!(content in input);
            let list: Punctuated<LitStr, Token![,]> = content.parse_terminated(LitStr::parse, Token![,])?;
            aliases.extend(list);
        }

        Ok(RegisterStrategyInput {
            ty,
            canonical,
            aliases,
        })
    }
}

#[proc_macro]
pub fn register_strategy(input: TokenStream) -> TokenStream {
    let RegisterStrategyInput {
        ty,
        canonical,
        aliases,
    } = parse_macro_input!(input as RegisterStrategyInput);

    let type_name = ty
        .segments
        .last()
        .map(|segment| segment.ident.to_string())
        .unwrap_or_else(|| "strategy".to_string());
    let fn_name = Ident::new(
        &format!("__register_signal_strategy_{type_name}"),
        Span::call_site(),
    );

    let expanded = quote! {
        #[allow(non_snake_case)]
        #[ctor::ctor]
        fn #fn_name() {
            signal_strategy::register_strategy_factory(
                std::sync::Arc::new(signal_strategy::GenericStrategyFactory::<#ty>::new(
                    #canonical,
                    &[#(#aliases),*],
                )),
            );
        }
    };

    TokenStream::from(expanded)
}
