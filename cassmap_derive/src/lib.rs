use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Data, DeriveInput, ExprPath, Fields, GenericArgument, LitStr, PathArguments, Type,
    parse_macro_input, spanned::Spanned,
};

/// Implements `cassmap::Entity` from field annotations.
///
/// - `#[entity(table = "...", constructor = "path::to::fn")]` on the struct
/// - `#[id]` on the identity field
/// - `#[column(index)]`, `#[column(name = "...")]`, `#[column(skip)]` on columns
/// - `#[one_to_many]` on `Vec<R>` fields where `R` is itself an entity
///
/// Unannotated fields are plain columns. Without an explicit constructor the
/// struct's `Default` implementation is used.
#[proc_macro_derive(Entity, attributes(entity, id, column, one_to_many))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_entity(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct EntityOptions {
    table_name: Option<String>,
    constructor: Option<ExprPath>,
}

#[derive(Default)]
struct ColumnOptions {
    indexed: bool,
    skip: bool,
    column_name: Option<String>,
}

enum FieldKind {
    Identity,
    Column(ColumnOptions),
    OneToMany(Type),
    Skipped,
}

fn expand_entity(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            input.generics,
            "Entity does not support generic structs",
        ));
    }

    let options = parse_entity_options(&input.attrs)?;

    let data_struct = match input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Entity can only be derived for structs",
            ));
        }
    };

    let named_fields = match data_struct.fields {
        Fields::Named(fields) => fields,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Entity requires named fields",
            ));
        }
    };

    let mut field_tokens = Vec::<TokenStream2>::new();
    for field in named_fields.named {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(field.span(), "Entity requires named fields"))?;
        let field_name = ident.to_string().trim_start_matches("r#").to_string();
        let ty = field.ty;

        let tokens = match classify_field(&field.attrs, &ty)? {
            FieldKind::Skipped => continue,
            FieldKind::Identity => quote! {
                ::cassmap::FieldMetadata::id::<#ty>(
                    #field_name,
                    |entity: &Self| &entity.#ident,
                    |entity: &mut Self| &mut entity.#ident,
                )
            },
            FieldKind::Column(column) => {
                let indexed = column.indexed.then(|| quote!(.indexed()));
                let named = column.column_name.map(|name| quote!(.named(#name)));
                quote! {
                    ::cassmap::FieldMetadata::column::<#ty>(
                        #field_name,
                        |entity: &Self| &entity.#ident,
                        |entity: &mut Self| &mut entity.#ident,
                    )
                    #indexed
                    #named
                }
            }
            FieldKind::OneToMany(related) => quote! {
                ::cassmap::FieldMetadata::one_to_many::<#related>(
                    #field_name,
                    |entity: &Self| &entity.#ident,
                    |entity: &mut Self| &mut entity.#ident,
                )
            },
        };
        field_tokens.push(quote!(.field(#tokens)));
    }

    let table = options.table_name.map(|table| quote!(.table(#table)));
    let constructor = match options.constructor {
        Some(path) => quote!(#path),
        None => quote!(<Self as ::core::default::Default>::default),
    };

    Ok(quote! {
        impl ::cassmap::Entity for #struct_name {
            fn metadata() -> ::cassmap::EntityMetadata<Self> {
                ::cassmap::EntityMetadata::<Self>::new(stringify!(#struct_name))
                    #table
                    .constructor(#constructor)
                    #(#field_tokens)*
            }
        }
    })
}

fn classify_field(attrs: &[syn::Attribute], ty: &Type) -> syn::Result<FieldKind> {
    let mut kind: Option<FieldKind> = None;

    for attr in attrs {
        let parsed = if attr.path().is_ident("id") {
            if !matches!(attr.meta, syn::Meta::Path(_)) {
                return Err(syn::Error::new(attr.span(), "#[id] does not accept arguments"));
            }
            FieldKind::Identity
        } else if attr.path().is_ident("one_to_many") {
            if !matches!(attr.meta, syn::Meta::Path(_)) {
                return Err(syn::Error::new(
                    attr.span(),
                    "#[one_to_many] does not accept arguments",
                ));
            }
            let related = vec_element(ty).ok_or_else(|| {
                syn::Error::new(ty.span(), "#[one_to_many] fields must be declared as Vec<T>")
            })?;
            FieldKind::OneToMany(related.clone())
        } else if attr.path().is_ident("column") {
            let column = parse_column_options(attr)?;
            if column.skip {
                FieldKind::Skipped
            } else {
                FieldKind::Column(column)
            }
        } else {
            continue;
        };

        if kind.is_some() {
            return Err(syn::Error::new(
                attr.span(),
                "a field takes only one of #[id], #[column(...)] and #[one_to_many]",
            ));
        }
        kind = Some(parsed);
    }

    Ok(kind.unwrap_or_else(|| FieldKind::Column(ColumnOptions::default())))
}

fn parse_column_options(attr: &syn::Attribute) -> syn::Result<ColumnOptions> {
    let mut parsed = ColumnOptions::default();
    match &attr.meta {
        syn::Meta::Path(_) => {}
        syn::Meta::List(list) => {
            list.parse_nested_meta(|meta| {
                if meta.path.is_ident("index") {
                    parsed.indexed = true;
                    return Ok(());
                }

                if meta.path.is_ident("skip") {
                    parsed.skip = true;
                    return Ok(());
                }

                if meta.path.is_ident("name") {
                    let value = meta.value()?;
                    let lit: LitStr = value.parse()?;
                    parsed.column_name = Some(lit.value());
                    return Ok(());
                }

                Err(meta.error(
                    "Unsupported #[column(...)] option. Supported: index, skip, name = \"...\"",
                ))
            })?;
        }
        syn::Meta::NameValue(_) => {
            return Err(syn::Error::new(
                attr.span(),
                "Unsupported #[column = ...] syntax. Use #[column(index)], #[column(skip)], #[column(name = \"...\")]",
            ));
        }
    }

    if parsed.skip && (parsed.indexed || parsed.column_name.is_some()) {
        return Err(syn::Error::new(
            attr.span(),
            "#[column(skip)] cannot be combined with other column options",
        ));
    }

    Ok(parsed)
}

fn parse_entity_options(attrs: &[syn::Attribute]) -> syn::Result<EntityOptions> {
    let mut options = EntityOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                options.table_name = Some(lit.value());
                return Ok(());
            }

            if meta.path.is_ident("constructor") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                options.constructor = Some(lit.parse()?);
                return Ok(());
            }

            Err(meta.error(
                "Unsupported entity attribute. Supported: table = \"...\", constructor = \"...\"",
            ))
        })?;
    }

    Ok(options)
}

/// `T` out of `Vec<T>`, `std::vec::Vec<T>` and friends.
fn vec_element(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Vec" {
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

