use crate::attributes::{FieldInjection, InjectableAttributes};
use itertools::Itertools;
use proc_macro2::{Ident, TokenStream};
use quote::quote;
use syn::spanned::Spanned;
use syn::{
    Attribute, Data, DataStruct, DeriveInput, Error, Field, Fields, GenericArgument,
    PathArguments, Result, Type,
};

const INJECT: &str = "inject";
const INJECTABLE: &str = "injectable";

#[derive(Default)]
struct InjectionPoints {
    initializers: Vec<TokenStream>,
    constructor_arguments: Vec<TokenStream>,
    property_injections: Vec<TokenStream>,
    property_assignments: Vec<TokenStream>,
    base: Option<Ident>,
}

fn option_inner_type(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };

    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }

    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };

    match arguments.args.first() {
        Some(GenericArgument::Type(inner)) if arguments.args.len() == 1 => Some(inner),
        _ => None,
    }
}

fn dependency_type(ty: &Type) -> TokenStream {
    quote!(<#ty as std::ops::Deref>::Target)
}

fn extract_field_injection(field: &Field) -> Result<Option<FieldInjection>> {
    field
        .attrs
        .iter()
        .filter(|attribute| attribute.path().is_ident(INJECT))
        .map(FieldInjection::try_from)
        .next()
        .transpose()
}

fn extract_injectable_attributes(attributes: &[Attribute]) -> Result<InjectableAttributes> {
    attributes
        .iter()
        .filter(|attribute| attribute.path().is_ident(INJECTABLE))
        .map(InjectableAttributes::try_from)
        .next()
        .unwrap_or_else(|| Ok(Default::default()))
}

fn collect_injection_points<'a>(
    fields: impl Iterator<Item = &'a Field>,
) -> Result<InjectionPoints> {
    let mut points = InjectionPoints::default();

    for field in fields {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| Error::new(field.span(), "Expected named field!"))?;

        let initializer = match extract_field_injection(field)? {
            None => quote!(std::default::Default::default()),
            Some(FieldInjection::Default(path)) => quote!(#path()),
            Some(FieldInjection::Base) => {
                if points.base.is_some() {
                    return Err(Error::new(
                        field.span(),
                        "Only a single base can be injected!",
                    ));
                }

                points.base = Some(ident.clone());
                quote!(std::default::Default::default())
            }
            Some(FieldInjection::Constructor) => {
                let index = points.constructor_arguments.len();
                let (ty, is_optional, accessor) = match option_inner_type(&field.ty) {
                    Some(inner) => (dependency_type(inner), true, quote!(optional)),
                    None => (dependency_type(&field.ty), false, quote!(required)),
                };

                points.constructor_arguments.push(quote! {
                    keystone_di::metadata::ConstructorArgument {
                        type_key: keystone_di::instance::TypeKey::of::<#ty>(),
                        is_optional: #is_optional,
                    }
                });

                quote!(arguments.#accessor::<#ty>(#index)?)
            }
            Some(FieldInjection::Property { is_optional }) => {
                let inner = option_inner_type(&field.ty).ok_or_else(|| {
                    Error::new(field.ty.span(), "Injected properties must be Options!")
                })?;
                let ty = dependency_type(inner);
                let name = ident.to_string();

                points.property_injections.push(quote! {
                    keystone_di::metadata::PropertyInjection {
                        name: #name.to_string(),
                        type_key: keystone_di::instance::TypeKey::of::<#ty>(),
                        is_optional: #is_optional,
                    }
                });
                points.property_assignments.push(quote! {
                    #name => {
                        self.#ident = Some(keystone_di::instance::downcast::<#ty>(&value)?);
                        Ok(())
                    }
                });

                quote!(None)
            }
        };

        points.initializers.push(quote!(#ident: #initializer));
    }

    Ok(points)
}

pub fn expand_injectable(input: &DeriveInput) -> Result<TokenStream> {
    let Data::Struct(DataStruct { fields, .. }) = &input.data else {
        return Err(Error::new(
            input.span(),
            "Can only derive Injectable on structs!",
        ));
    };

    if !input.generics.params.is_empty() {
        return Err(Error::new(
            input.generics.span(),
            "Cannot derive Injectable for generic types!",
        ));
    }

    let ident = &input.ident;
    let points = match fields {
        Fields::Named(fields) => collect_injection_points(fields.named.iter())?,
        Fields::Unit => Default::default(),
        Fields::Unnamed(_) => {
            return Err(Error::new(
                input.span(),
                "Can only derive Injectable on structs with named fields!",
            ))
        }
    };

    let InjectableAttributes {
        post_construct,
        pre_destroy,
    } = extract_injectable_attributes(&input.attrs)?;

    let InjectionPoints {
        initializers,
        constructor_arguments,
        property_injections,
        property_assignments,
        base,
    } = points;

    let construction = if let Fields::Unit = fields {
        quote!(Self)
    } else {
        quote! {
            Self {
                #(#initializers),*
            }
        }
    };

    let lifecycle_methods: Vec<_> = post_construct
        .iter()
        .chain(pre_destroy.iter())
        .unique()
        .map(|name| -> Result<TokenStream> {
            let method: Ident = syn::parse_str(name)
                .map_err(|error| Error::new(input.span(), format!("Invalid method name: {error}")))?;
            Ok(quote! {
                #name => {
                    self.#method();
                    Ok(())
                }
            })
        })
        .try_collect()?;

    let (base_chain, unknown_property, unknown_method) = if let Some(base) = base {
        (
            quote! {
                chain.extend(keystone_di::component::InjectionTarget::type_chain(&self.#base));
            },
            quote!(keystone_di::component::InjectionTarget::inject_property(&mut self.#base, name, value)),
            quote!(keystone_di::component::InjectionTarget::invoke_lifecycle_method(&mut self.#base, name)),
        )
    } else {
        (
            quote!(),
            quote! {
                Err(keystone_di::error::InjectorError::UnknownInjectionPoint {
                    target: keystone_di::instance::TypeKey::of::<Self>(),
                    name: name.to_string(),
                })
            },
            quote! {
                Err(keystone_di::error::InjectorError::UnknownLifecycleMethod {
                    target: keystone_di::instance::TypeKey::of::<Self>(),
                    name: name.to_string(),
                })
            },
        )
    };

    Ok(quote! {
        #[automatically_derived]
        impl keystone_di::component::InjectionTarget for #ident {
            fn type_chain(&self) -> Vec<keystone_di::instance::TypeKey> {
                #[allow(unused_mut)]
                let mut chain = vec![keystone_di::instance::TypeKey::of::<Self>()];
                #base_chain
                chain
            }

            #[allow(unused_variables)]
            fn inject_property(
                &mut self,
                name: &str,
                value: keystone_di::instance::InstanceAnyPtr,
            ) -> Result<(), keystone_di::error::InjectorError> {
                match name {
                    #(#property_assignments)*
                    _ => #unknown_property,
                }
            }

            fn invoke_lifecycle_method(
                &mut self,
                name: &str,
            ) -> Result<(), keystone_di::error::InjectorError> {
                match name {
                    #(#lifecycle_methods)*
                    _ => #unknown_method,
                }
            }
        }

        #[automatically_derived]
        impl keystone_di::component::Injectable for #ident {
            #[allow(unused_variables)]
            fn construct(
                arguments: keystone_di::component::ConstructorArguments,
            ) -> Result<Self, keystone_di::error::InjectorError> {
                Ok(#construction)
            }
        }

        const _: () = {
            fn register() -> keystone_di::metadata::TypeMetadata {
                keystone_di::metadata::TypeMetadata {
                    constructor_arguments: vec![#(#constructor_arguments),*],
                    property_injections: vec![#(#property_injections),*],
                    post_construct_methods: vec![#(#post_construct.to_string()),*],
                    pre_destroy_methods: vec![#(#pre_destroy.to_string()),*],
                    ..keystone_di::metadata::TypeMetadata::new(
                        keystone_di::instance::TypeKey::of::<#ident>(),
                    )
                }
            }

            keystone_di::metadata::internal::submit! {
                keystone_di::metadata::internal::TypeMetadataRegisterer {
                    register
                }
            };
        };
    })
}
