// derive macros for the wire-codec traits used throughout the message layer.
use proc_macro::TokenStream;
use syn::parse_macro_input;
use syn::DeriveInput;

mod dns_struct;
use dns_struct::dns_derive;

mod dns_enum;
use dns_enum::dns_enum;

/// Derives `ToFromNetworkOrder` for a struct by encoding/decoding each field in
/// declaration order. Works for both plain structs and ones carrying a single
/// lifetime parameter.
#[proc_macro_derive(DnsStruct)]
pub fn dns_macro_length(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    dns_derive(&ast)
}

/// Derives `Default`, `TryFrom<u8>`, `TryFrom<u16>` and `FromStr` for a
/// fieldless enum whose variants all carry an explicit integer discriminant.
#[proc_macro_derive(DnsEnum)]
pub fn tls_macro_enum(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    dns_enum(&ast)
}

#[cfg(test)]
fn get_derive_input(s: &str) -> DeriveInput {
    syn::parse_str(s).unwrap()
}