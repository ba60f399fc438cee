use darling::{ast::NestedMeta, FromMeta};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, FnArg, GenericArgument, ImplItem, ImplItemFn, ItemImpl, PathArguments,
    ReturnType, Type,
};

#[derive(Debug, Default, FromMeta)]
struct ModuleArgs {
    /// Submit the type to `quill::discover()`; defaults to true
    #[darling(default)]
    discover: Option<bool>,
}

#[derive(Clone, Copy, PartialEq)]
enum Phase {
    PostConstruct,
    PreDestroy,
}

/// How a constructor hands back the module value
enum Output {
    Value,
    Fallible,
}

pub fn module_attribute(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attr_args = match NestedMeta::parse_meta_list(attr.into()) {
        Ok(args) => args,
        Err(e) => return TokenStream::from(darling::Error::from(e).write_errors()),
    };
    let args = match ModuleArgs::from_list(&attr_args) {
        Ok(args) => args,
        Err(e) => return TokenStream::from(e.write_errors()),
    };
    let input = parse_macro_input!(item as ItemImpl);

    let expanded = generate_module_impl(&args, input).unwrap_or_else(syn::Error::into_compile_error);
    TokenStream::from(expanded)
}

fn generate_module_impl(args: &ModuleArgs, mut input: ItemImpl) -> syn::Result<TokenStream2> {
    if let Some((_, path, _)) = &input.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[module] must be placed on an inherent impl block",
        ));
    }
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "#[module] does not support generic impl blocks",
        ));
    }

    let self_ty = input.self_ty.clone();
    let mut constructors = Vec::new();
    let mut lifecycle_methods = Vec::new();

    for item in input.items.iter_mut() {
        let ImplItem::Fn(method) = item else {
            continue;
        };

        let inject = take_marker(method, "inject");
        let post_construct = take_marker(method, "post_construct");
        let pre_destroy = take_marker(method, "pre_destroy");

        let phase = match (post_construct, pre_destroy) {
            (true, true) => {
                return Err(syn::Error::new_spanned(
                    &method.sig.ident,
                    "a method cannot be both #[post_construct] and #[pre_destroy]",
                ))
            }
            (true, false) => Some(Phase::PostConstruct),
            (false, true) => Some(Phase::PreDestroy),
            (false, false) => None,
        };

        if let Some(phase) = phase {
            if inject {
                return Err(syn::Error::new_spanned(
                    &method.sig.ident,
                    "#[inject] cannot be combined with lifecycle attributes",
                ));
            }
            lifecycle_methods.push(lifecycle_method(method, phase)?);
            continue;
        }

        if method.sig.receiver().is_some() {
            if inject {
                return Err(syn::Error::new_spanned(
                    &method.sig.ident,
                    "#[inject] constructors must be associated functions without `self`",
                ));
            }
            continue;
        }

        match constructor(method, &self_ty, inject)? {
            Some(tokens) => constructors.push(tokens),
            None if inject => {
                return Err(syn::Error::new_spanned(
                    &method.sig,
                    "#[inject] constructors must return `Self` or `Result<Self, E>` and take only `Arc<T>` parameters",
                ))
            }
            None => {}
        }
    }

    let registration = if args.discover.unwrap_or(true) {
        quote! {
            ::quill::inventory::submit! {
                ::quill::ModuleRegistration::of::<#self_ty>()
            }
        }
    } else {
        TokenStream2::new()
    };

    Ok(quote! {
        #input

        impl ::quill::Module for #self_ty {
            fn constructors() -> ::std::vec::Vec<::quill::Constructor<Self>> {
                ::std::vec![#(#constructors),*]
            }

            fn lifecycle_methods() -> ::std::vec::Vec<::quill::LifecycleMethod<Self>> {
                ::std::vec![#(#lifecycle_methods),*]
            }
        }

        #registration
    })
}

/// Remove the `#[name]` marker from `method`, returning whether it was present
fn take_marker(method: &mut ImplItemFn, name: &str) -> bool {
    let before = method.attrs.len();
    method.attrs.retain(|attr| !attr.path().is_ident(name));
    method.attrs.len() != before
}

fn lifecycle_method(method: &ImplItemFn, phase: Phase) -> syn::Result<TokenStream2> {
    let name = &method.sig.ident;

    if method.sig.asyncness.is_some() {
        return Err(syn::Error::new_spanned(
            &method.sig.asyncness,
            "lifecycle methods cannot be async",
        ));
    }
    match method.sig.receiver() {
        Some(receiver) if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => {
            return Err(syn::Error::new_spanned(
                &method.sig,
                "lifecycle methods must take `&self`",
            ))
        }
    }

    let arity = method.sig.inputs.len() - 1;
    if arity > 0 {
        // Rejected when the module is registered, with the module name attached.
        let phase = match phase {
            Phase::PostConstruct => quote!(::quill::Phase::PostConstruct),
            Phase::PreDestroy => quote!(::quill::Phase::PreDestroy),
        };
        return Ok(quote! {
            ::quill::LifecycleMethod::parameterized(#phase, ::core::stringify!(#name), #arity)
        });
    }

    let body = match &method.sig.output {
        ReturnType::Default => quote! {
            this.#name();
            ::std::result::Result::Ok(())
        },
        ReturnType::Type(..) => quote! {
            this.#name()?;
            ::std::result::Result::Ok(())
        },
    };
    let constructor = match phase {
        Phase::PostConstruct => quote!(post_construct),
        Phase::PreDestroy => quote!(pre_destroy),
    };

    Ok(quote! {
        ::quill::LifecycleMethod::#constructor(::core::stringify!(#name), |this: &Self| {
            #body
        })
    })
}

/// Build a `Constructor` for `method`, or `None` when it is not one
fn constructor(method: &ImplItemFn, self_ty: &Type, inject: bool) -> syn::Result<Option<TokenStream2>> {
    let name = &method.sig.ident;

    let output = match &method.sig.output {
        ReturnType::Type(_, ty) if is_self(ty, self_ty) => Output::Value,
        ReturnType::Type(_, ty) if is_result_of_self(ty, self_ty) => Output::Fallible,
        _ => return Ok(None),
    };

    let mut parameters = Vec::new();
    for input in &method.sig.inputs {
        let FnArg::Typed(pat_type) = input else {
            return Ok(None);
        };
        match arc_inner(&pat_type.ty) {
            Some(Type::TraitObject(obj)) => {
                return Err(syn::Error::new_spanned(
                    obj,
                    "constructor parameters must be concrete modules; resolve trait objects with `Container::get_trait`",
                ))
            }
            Some(inner) => parameters.push(inner),
            None => return Ok(None),
        }
    }
    if method.sig.asyncness.is_some() {
        return Err(syn::Error::new_spanned(
            &method.sig.asyncness,
            "constructors cannot be async",
        ));
    }

    let bindings: Vec<_> = (0..parameters.len())
        .map(|idx| quote::format_ident!("__arg{}", idx))
        .collect();
    let value = match output {
        Output::Value => quote!(Self::#name(#(#bindings),*)),
        Output::Fallible => quote!(Self::#name(#(#bindings),*)?),
    };
    let inject = inject.then(|| quote!(.inject()));

    Ok(Some(quote! {
        ::quill::Constructor::new(::core::stringify!(#name), |args: &mut ::quill::Arguments| {
            #(let #bindings = args.take::<#parameters>()?;)*
            ::std::result::Result::Ok(#value)
        })
        #(.param::<#parameters>())*
        #inject
    }))
}

fn is_self(ty: &Type, self_ty: &Type) -> bool {
    let (Type::Path(ty), Type::Path(self_ty)) = (ty, self_ty) else {
        return false;
    };
    if ty.path.is_ident("Self") {
        return true;
    }
    match (ty.path.segments.last(), self_ty.path.segments.last()) {
        (Some(a), Some(b)) => a.ident == b.ident,
        _ => false,
    }
}

fn is_result_of_self(ty: &Type, self_ty: &Type) -> bool {
    match first_generic(ty, "Result") {
        Some(inner) => is_self(inner, self_ty),
        None => false,
    }
}

/// Extract `T` from `Arc<T>`
fn arc_inner(ty: &Type) -> Option<&Type> {
    first_generic(ty, "Arc")
}

fn first_generic<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}
