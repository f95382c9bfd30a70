use syn::{Attribute, Error, Expr, ExprArray, ExprLit, ExprPath, Lit, LitStr, Meta, Result};

pub enum FieldInjection {
    Constructor,
    Property { is_optional: bool },
    Base,
    Default(ExprPath),
}

impl TryFrom<&Attribute> for FieldInjection {
    type Error = Error;

    fn try_from(value: &Attribute) -> Result<Self> {
        if let Meta::Path(_) = value.meta {
            return Ok(Self::Constructor);
        }

        let mut is_property = false;
        let mut is_optional = false;
        let mut is_base = false;
        let mut default: Option<ExprPath> = None;

        value.parse_nested_meta(|meta| {
            if meta.path.is_ident("property") {
                is_property = true;
            } else if meta.path.is_ident("optional") {
                is_optional = true;
            } else if meta.path.is_ident("base") {
                is_base = true;
            } else if meta.path.is_ident("default") {
                let expr: LitStr = meta.value()?.parse()?;
                default = Some(expr.parse()?);
            } else {
                return Err(meta.error("Unsupported injection option!"));
            }

            Ok(())
        })?;

        match (is_property, is_base, default) {
            (true, false, None) => Ok(Self::Property { is_optional }),
            (false, true, None) if !is_optional => Ok(Self::Base),
            (false, false, Some(default)) if !is_optional => Ok(Self::Default(default)),
            (false, false, None) if !is_optional => Ok(Self::Constructor),
            (false, false, None) => Err(Error::new_spanned(
                value,
                "Only properties can be marked as optional - constructor arguments are optional when wrapped in Option!",
            )),
            _ => Err(Error::new_spanned(
                value,
                "Conflicting injection options!",
            )),
        }
    }
}

#[derive(Default)]
pub struct InjectableAttributes {
    pub post_construct: Vec<String>,
    pub pre_destroy: Vec<String>,
}

impl TryFrom<&Attribute> for InjectableAttributes {
    type Error = Error;

    fn try_from(value: &Attribute) -> Result<Self> {
        let mut post_construct = vec![];
        let mut pre_destroy = vec![];

        value.parse_nested_meta(|meta| {
            if meta.path.is_ident("post_construct") {
                post_construct = method_names(meta.value()?.parse()?)?;
            } else if meta.path.is_ident("pre_destroy") {
                pre_destroy = method_names(meta.value()?.parse()?)?;
            } else {
                return Err(meta.error("Unsupported injectable option!"));
            }

            Ok(())
        })?;

        Ok(Self {
            post_construct,
            pre_destroy,
        })
    }
}

fn method_names(names: ExprArray) -> Result<Vec<String>> {
    names
        .elems
        .iter()
        .map(|elem| {
            if let Expr::Lit(ExprLit {
                lit: Lit::Str(string),
                ..
            }) = elem
            {
                Ok(string.value())
            } else {
                Err(Error::new_spanned(elem, "Expected method name string!"))
            }
        })
        .collect()
}
