//! Type inspection helpers shared by the derive implementations

use proc_macro2::TokenStream;
use quote::quote;
use syn::Type;

/// Check if a type is an Option<T>
pub fn is_option_type(ty: &Type) -> bool {
    match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option"),
        _ => false,
    }
}

/// Strip one level of `Option<...>`, returning the inner type
pub fn inner_type(ty: &Type) -> &Type {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            if segment.ident == "Option" {
                if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(syn::GenericArgument::Type(inner)) = args.args.first() {
                        return inner;
                    }
                }
            }
        }
    }
    ty
}

/// Infer the column kind variant from a field type
///
/// Unknown types fall back to text, which is what a domain newtype stored
/// as a label (a region, a period) looks like on disk.
pub fn infer_kind(ty: &Type) -> TokenStream {
    let ty = inner_type(ty);
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            let ident = segment.ident.to_string();
            return match ident.as_str() {
                "f32" | "f64" => quote! { Float },
                "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" | "u64" | "usize" => {
                    quote! { Integer }
                }
                "NaiveDate" => quote! { Date },
                "NaiveDateTime" | "DateTime" => quote! { DateTime },
                _ => quote! { Text },
            };
        }
    }
    quote! { Text }
}

/// Map an explicit `kind = "..."` attribute to a variant
pub fn kind_from_name(name: &str) -> Option<TokenStream> {
    match name {
        "text" => Some(quote! { Text }),
        "float" => Some(quote! { Float }),
        "integer" => Some(quote! { Integer }),
        "date" => Some(quote! { Date }),
        "datetime" => Some(quote! { DateTime }),
        _ => None,
    }
}
