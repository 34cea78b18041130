use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Data, DeriveInput, Field, Fields, GenericArgument, LitStr, PathArguments,
    Type, Visibility,
};

/// Derive macro describing a struct's fields for CSV mapping.
///
/// Generates `CsvRecord::fields()`, listing every visible field in declaration
/// order. Field types are classified at compile time: custom unmarshal hooks
/// first, then nested records, then built-in primitives.
///
/// # Example
///
/// ```ignore
/// #[derive(CsvRecord, Default)]
/// pub struct Row {
///     #[csv("[line]")]
///     pub line: usize,
///
///     #[csv("First name")]
///     pub first_name: String,
///
///     pub age: Option<u8>,
///
///     #[csv(flatten)]
///     pub extra: Extra,
/// }
/// ```
///
/// Fields without `pub` (or `pub(...)`) visibility are skipped.
#[proc_macro_derive(CsvRecord, attributes(csv))]
pub fn derive_csv_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn derive_impl(input: &DeriveInput) -> Result<TokenStream2, syn::Error> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "CsvRecord does not support generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "CsvRecord only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "CsvRecord only supports structs",
            ))
        }
    };

    let mut descriptors = Vec::new();
    for field in fields {
        if matches!(field.vis, Visibility::Inherited) {
            continue;
        }
        descriptors.push(field_descriptor(name, field)?);
    }

    Ok(quote! {
        impl ::csvmap_format::CsvRecord for #name {
            fn fields() -> ::std::vec::Vec<::csvmap_format::FieldDescriptor<Self>> {
                #[allow(unused_imports)]
                use ::csvmap_format::capability::probe::{
                    ViaBuiltin as _, ViaNestedRecord as _, ViaUnmarshalCsv as _,
                    ViaUnmarshalQuotedCsv as _, ViaUnmarshalText as _, ViaUnsupported as _,
                };
                ::std::vec![#(#descriptors),*]
            }
        }
    })
}

enum FieldAttr {
    Tag(String),
    Flatten,
}

fn field_attr(field: &Field) -> Result<Option<FieldAttr>, syn::Error> {
    let mut parsed = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("csv") {
            continue;
        }
        if parsed.is_some() {
            return Err(syn::Error::new_spanned(attr, "duplicate #[csv(...)] attribute"));
        }
        if let Ok(tag) = attr.parse_args::<LitStr>() {
            parsed = Some(FieldAttr::Tag(tag.value()));
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("flatten") {
                parsed = Some(FieldAttr::Flatten);
                Ok(())
            } else {
                Err(meta.error("expected #[csv(\"...\")] or #[csv(flatten)]"))
            }
        })?;
    }
    Ok(parsed)
}

fn field_descriptor(record: &syn::Ident, field: &Field) -> Result<TokenStream2, syn::Error> {
    let field_name = field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new_spanned(field, "expected named field"))?;
    let field_name_str = field_name.to_string();
    let field_ty = &field.ty;
    let accessor = quote! { |r: &mut #record| &mut r.#field_name };

    let tag = match field_attr(field)? {
        Some(FieldAttr::Flatten) => {
            return Ok(quote! {
                ::csvmap_format::FieldDescriptor::flatten::<#field_ty, _>(#field_name_str, #accessor)
            });
        }
        Some(FieldAttr::Tag(tag)) => quote! { ::std::option::Option::Some(#tag) },
        None => quote! { ::std::option::Option::None },
    };

    if let Some(inner) = option_inner(field_ty) {
        return Ok(quote! {
            ::csvmap_format::FieldDescriptor::optional(
                #field_name_str,
                #tag,
                (&&&&&&::csvmap_format::capability::probe::Probe::<#inner>::new()).field_type(),
                #accessor,
            )
        });
    }

    Ok(quote! {
        ::csvmap_format::FieldDescriptor::new(
            #field_name_str,
            #tag,
            (&&&&&&::csvmap_format::capability::probe::Probe::<#field_ty>::new()).field_type(),
            #accessor,
        )
    })
}

/// `T` for a field declared as `Option<T>`
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}
