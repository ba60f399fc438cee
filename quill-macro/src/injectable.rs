use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Type};

pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let expanded = generate_injectable_impl(&input).unwrap_or_else(syn::Error::into_compile_error);
    TokenStream::from(expanded)
}

fn generate_injectable_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => fields.named.iter().collect::<Vec<_>>(),
            Fields::Unit => Vec::new(),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    input,
                    "#[derive(Injectable)] only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "#[derive(Injectable)] can only be applied to structs",
            ))
        }
    };

    let mut injection_points = Vec::new();
    for field in fields {
        let Some(field_name) = &field.ident else {
            continue;
        };
        if !field.attrs.iter().any(|attr| attr.path().is_ident("inject")) {
            continue;
        }

        let dependency = extract_injected_type(&field.ty).ok_or_else(|| {
            syn::Error::new_spanned(&field.ty, "#[inject] fields must have type `Injected<T>`")
        })?;

        injection_points.push(quote! {
            ::quill::InjectionPoint::new::<#dependency>(
                ::core::stringify!(#field_name),
                |this: &Self| &this.#field_name,
            )
        });
    }

    Ok(quote! {
        impl #impl_generics ::quill::Injectable for #struct_name #ty_generics #where_clause {
            fn injection_points() -> ::std::vec::Vec<::quill::InjectionPoint<Self>> {
                ::std::vec![#(#injection_points),*]
            }
        }
    })
}

/// Extract `T` from `Injected<T>`
fn extract_injected_type(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Injected" {
        return None;
    }
    match &segment.arguments {
        syn::PathArguments::AngleBracketed(args) => match args.args.first()? {
            syn::GenericArgument::Type(inner) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}
