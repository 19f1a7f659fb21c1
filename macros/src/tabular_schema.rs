//! TabularSchema derive macro implementation

use darling::util::Flag;
use darling::{ast, FromDeriveInput, FromField};
use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

use crate::utils;

/// Receiver for the struct that derives `TabularSchema`
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(table), supports(struct_named))]
struct TabularSchemaReceiver {
    ident: syn::Ident,
    /// Table name used in error messages
    #[darling(default)]
    name: Option<String>,
    data: ast::Data<(), ColumnReceiver>,
}

/// Receiver for the fields in the struct
#[derive(Debug, FromField)]
#[darling(attributes(column))]
struct ColumnReceiver {
    ident: Option<syn::Ident>,
    ty: syn::Type,
    /// Column header on disk (defaults to the field name)
    #[darling(default)]
    name: Option<String>,
    /// Explicit column kind
    #[darling(default)]
    kind: Option<String>,
    /// Present in memory but not required on disk
    #[darling(default)]
    optional: Flag,
    /// Column must exist on disk even though its values may be null
    #[darling(default)]
    required: Flag,
    /// Not a column at all
    #[darling(default)]
    skip: Flag,
}

/// Process the TabularSchema derive macro
pub fn process_derive_tabular_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let receiver = match TabularSchemaReceiver::from_derive_input(&input) {
        Ok(receiver) => receiver,
        Err(err) => return err.write_errors().into(),
    };

    let struct_name = &receiver.ident;
    let table_name = receiver
        .name
        .clone()
        .unwrap_or_else(|| struct_name.to_string());

    let ast::Data::Struct(fields) = &receiver.data else {
        unreachable!("Darling ensures this is a struct")
    };

    let mut columns = Vec::new();
    for field in fields.iter().filter(|field| !field.skip.is_present()) {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let column_name = field.name.clone().unwrap_or_else(|| ident.to_string());
        let required = field.required.is_present()
            || (!utils::is_option_type(&field.ty) && !field.optional.is_present());

        let kind = match field.kind.as_deref() {
            Some(name) => match utils::kind_from_name(name) {
                Some(kind) => kind,
                None => {
                    return syn::Error::new_spanned(
                        ident,
                        format!("unknown column kind '{name}'"),
                    )
                    .to_compile_error()
                    .into();
                }
            },
            None => utils::infer_kind(&field.ty),
        };

        columns.push(quote! {
            ::onehealth::schema::ColumnSpec {
                name: #column_name,
                kind: ::onehealth::schema::ColumnKind::#kind,
                required: #required,
            }
        });
    }

    let expanded = quote! {
        impl ::onehealth::schema::TabularSchema for #struct_name {
            const TABLE_NAME: &'static str = #table_name;
            const COLUMNS: &'static [::onehealth::schema::ColumnSpec] = &[
                #(#columns),*
            ];
        }
    };

    TokenStream::from(expanded)
}
