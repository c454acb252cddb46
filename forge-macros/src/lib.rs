//! Function adapter proc-macro: `#[forge_module]`.
//!
//! Adapts a plain async function into a [`forge_types::Module`] impl by
//! deriving an input schema from its parameters, an output schema from its
//! return type, and a description from its doc comment.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{FnArg, GenericArgument, ItemFn, Pat, PathArguments, ReturnType, Type};

/// Adapt an async function into a zero-sized [`forge_types::Module`]
/// implementation.
///
/// The target function must be `async`, every parameter must carry an
/// explicit type, and the function must declare a return type. A
/// parameter whose type is `&Context` (by type, never by name) is
/// injected by the adapter rather than taken from the input map.
///
/// # Example
///
/// ```ignore
/// /// Greets a caller by name.
/// #[forge_module]
/// async fn greet(name: String) -> forge_core::error::Result<GreetOutput> {
///     Ok(GreetOutput { message: format!("Hello, {name}!") })
/// }
/// ```
///
/// Expands to a `GreetModule` unit struct implementing `Module`, with the
/// original function kept in scope (renamed) so `GreetModule::new()` can
/// call it.
#[proc_macro_attribute]
pub fn forge_module(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as ItemFn);

    match expand(input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(func: ItemFn) -> syn::Result<TokenStream2> {
    if func.sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(&func.sig.fn_token, "#[forge_module] requires an async fn"));
    }

    let description = doc_comment(&func.attrs).ok_or_else(|| {
        syn::Error::new_spanned(
            &func.sig.ident,
            "#[forge_module] requires a doc comment to use as the module description",
        )
    })?;

    let ReturnType::Type(_, return_type) = &func.sig.output else {
        return Err(syn::Error::new_spanned(
            &func.sig,
            "function has no return type annotation (FUNC_MISSING_RETURN_TYPE)",
        ));
    };

    let mut params = Vec::new();
    let mut context_param: Option<syn::Ident> = None;

    for arg in &func.sig.inputs {
        let FnArg::Typed(pat_type) = arg else {
            return Err(syn::Error::new_spanned(arg, "#[forge_module] does not support methods (no `self`)"));
        };

        if matches!(*pat_type.ty, Type::Infer(_)) {
            let name = pat_name(&pat_type.pat).unwrap_or_else(|| "_".to_string());
            return Err(syn::Error::new_spanned(
                &pat_type.pat,
                format!("parameter '{name}' has no type annotation (FUNC_MISSING_TYPE_HINT)"),
            ));
        }

        if is_context_ref(&pat_type.ty) {
            let ident = match &*pat_type.pat {
                Pat::Ident(p) => p.ident.clone(),
                _ => format_ident!("ctx"),
            };
            context_param = Some(ident);
            continue;
        }

        let Some(name) = pat_name(&pat_type.pat) else {
            return Err(syn::Error::new_spanned(&pat_type.pat, "unsupported parameter pattern"));
        };

        params.push((name, pat_type.ty.clone()));
    }

    let fn_ident = &func.sig.ident;
    let module_ident = format_ident!("{}Module", to_pascal_case(&fn_ident.to_string()));
    let inner_ident = format_ident!("__forge_inner_{}", fn_ident);

    let mut inner_fn = func.clone();
    inner_fn.sig.ident = inner_ident.clone();
    inner_fn.attrs.retain(|a| !a.path().is_ident("doc"));
    inner_fn.vis = syn::Visibility::Inherited;

    let schema_properties: Vec<TokenStream2> = params
        .iter()
        .map(|(name, ty)| {
            let optional = is_option(ty);
            quote! {
                {
                    let schema = gen.subschema_for::<#ty>();
                    properties.insert(#name.to_string(), serde_json::to_value(&schema).unwrap_or(serde_json::Value::Null));
                    if !#optional {
                        required.push(#name.to_string());
                    }
                }
            }
        })
        .collect();

    let output_schema_body = output_schema_tokens(return_type);

    let unpack_args: Vec<TokenStream2> = params
        .iter()
        .map(|(name, ty)| {
            let ident = format_ident!("{}", name);
            quote! {
                let #ident: #ty = match inputs.get(#name).cloned() {
                    Some(v) => serde_json::from_value(v).map_err(|e| forge_core::error::ForgeError::InvalidInput {
                        message: format!("parameter '{}': {e}", #name),
                    })?,
                    None => serde_json::from_value(serde_json::Value::Null).map_err(|_| forge_core::error::ForgeError::InvalidInput {
                        message: format!("missing required parameter '{}'", #name),
                    })?,
                };
            }
        })
        .collect();

    let call_arg_idents: Vec<TokenStream2> = params
        .iter()
        .map(|(name, _)| {
            let ident = format_ident!("{}", name);
            quote! { #ident }
        })
        .collect();

    let call_expr = match &context_param {
        Some(_) => quote! { #inner_ident(#(#call_arg_idents),*, ctx).await },
        None => quote! { #inner_ident(#(#call_arg_idents),*).await },
    };

    let normalize = quote! {
        let value = result?;
        let json = serde_json::to_value(value).map_err(|e| forge_core::error::ForgeError::Internal(e.to_string()))?;
        Ok(match json {
            serde_json::Value::Null => serde_json::json!({}),
            serde_json::Value::Object(_) => json,
            other => serde_json::json!({ "result": other }),
        })
    };

    let expanded = quote! {
        #inner_fn

        #[doc = #description]
        #[derive(Debug, Default, Clone, Copy)]
        pub struct #module_ident;

        impl #module_ident {
            /// Construct the adapted module.
            pub fn new() -> Self {
                Self
            }
        }

        impl forge_types::Module for #module_ident {
            fn input_schema(&self) -> serde_json::Value {
                let mut gen = schemars::gen::SchemaGenerator::default();
                let mut properties = serde_json::Map::new();
                let mut required: Vec<String> = Vec::new();
                #(#schema_properties)*
                serde_json::json!({
                    "type": "object",
                    "properties": properties,
                    "required": required,
                })
            }

            fn output_schema(&self) -> serde_json::Value {
                #output_schema_body
            }

            fn description(&self) -> &str {
                #description
            }

            fn execute<'a>(
                &'a self,
                inputs: serde_json::Value,
                ctx: &'a forge_core::context::Context,
            ) -> forge_core::future::BoxFuture<'a, forge_core::error::Result<serde_json::Value>> {
                Box::pin(async move {
                    #(#unpack_args)*
                    let result: forge_core::error::Result<_> = #call_expr;
                    #normalize
                })
            }
        }
    };

    Ok(expanded)
}

fn doc_comment(attrs: &[syn::Attribute]) -> Option<String> {
    let mut lines = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        if let syn::Meta::NameValue(nv) = &attr.meta {
            if let syn::Expr::Lit(expr_lit) = &nv.value {
                if let syn::Lit::Str(s) = &expr_lit.lit {
                    lines.push(s.value().trim().to_string());
                }
            }
        }
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join(" ").trim().to_string())
    }
}

fn pat_name(pat: &Pat) -> Option<String> {
    match pat {
        Pat::Ident(p) => Some(p.ident.to_string()),
        _ => None,
    }
}

fn is_context_ref(ty: &Type) -> bool {
    if let Type::Reference(r) = ty {
        if let Type::Path(p) = &*r.elem {
            return p.path.segments.last().map(|s| s.ident == "Context").unwrap_or(false);
        }
    }
    false
}

fn is_option(ty: &Type) -> bool {
    matches!(ty, Type::Path(p) if p.path.segments.last().map(|s| s.ident == "Option").unwrap_or(false))
}

fn last_segment_ident(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(p) => p.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    }
}

/// Unwrap a `Result<T, E>` return type to its inner `T`, if shaped that way.
fn unwrap_result(ty: &Type) -> &Type {
    if let Type::Path(p) = ty {
        if let Some(seg) = p.path.segments.last() {
            if seg.ident == "Result" {
                if let PathArguments::AngleBracketed(args) = &seg.arguments {
                    if let Some(GenericArgument::Type(inner)) = args.args.first() {
                        return inner;
                    }
                }
            }
        }
    }
    ty
}

const PRIMITIVE_IDENTS: &[&str] = &[
    "String", "str", "bool", "i8", "i16", "i32", "i64", "i128", "u8", "u16", "u32", "u64", "u128", "f32", "f64",
    "char", "Vec", "HashMap", "BTreeMap",
];

fn output_schema_tokens(return_type: &Type) -> TokenStream2 {
    let inner = unwrap_result(return_type);

    match last_segment_ident(inner).as_deref() {
        Some("Value") => quote! { serde_json::json!({ "type": "object" }) },
        Some(ident) if PRIMITIVE_IDENTS.contains(&ident) => quote! {
            {
                let mut gen = schemars::gen::SchemaGenerator::default();
                let schema = gen.subschema_for::<#inner>();
                serde_json::json!({
                    "type": "object",
                    "properties": { "result": serde_json::to_value(&schema).unwrap_or(serde_json::Value::Null) },
                    "required": ["result"],
                })
            }
        },
        _ => quote! {
            {
                let mut gen = schemars::gen::SchemaGenerator::default();
                let schema = gen.root_schema_for::<#inner>();
                serde_json::to_value(&schema).unwrap_or_else(|_| serde_json::json!({ "type": "object" }))
            }
        },
    }
}

fn to_pascal_case(name: &str) -> String {
    name.split('_')
        .filter(|s| !s.is_empty())
        .map(|s| {
            let mut chars = s.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::to_pascal_case;

    #[test]
    fn pascal_cases_snake_case_names() {
        assert_eq!(to_pascal_case("greet"), "Greet");
        assert_eq!(to_pascal_case("read_file"), "ReadFile");
    }
}
