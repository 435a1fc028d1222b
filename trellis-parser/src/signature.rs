//! Handler signature validation.
//!
//! A message handler must be a free function of one of two shapes:
//!
//! - `fn(&Context, &Message) -> Result<(), E>` — fire-and-forget
//! - `fn(&Context, &Message) -> Result<Reply, E>` — request-reply
//!
//! [`HandlerSignature`] is the abstract, read-only view of a declaration,
//! lowered from [`syn::Signature`] so validation never touches the AST.

use quote::ToTokens;

use crate::errors::{ErrorSink, Pos, ResourceError};

/// Reference to a named structural payload type, as written at the handler.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TypeRef {
    /// Final path segment, e.g. `OrderCreated`.
    pub ident: String,
    /// Full path as written, e.g. `orders::OrderCreated`.
    pub path: String,
}

impl TypeRef {
    fn from_path(path: &syn::Path) -> Option<Self> {
        let last = path.segments.last()?;
        let rendered = path
            .segments
            .iter()
            .map(|seg| seg.ident.to_string())
            .collect::<Vec<_>>()
            .join("::");
        Some(Self {
            ident: last.ident.to_string(),
            path: rendered,
        })
    }
}

/// Classified parameter type descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    /// A context-carrier parameter: a path type (or reference to one) whose
    /// final segment is `Context`.
    Context,
    /// A `&T` reference to a named message struct.
    Message(TypeRef),
    /// Anything else, rendered for diagnostics.
    Other(String),
}

/// Classified result type descriptor, lowered from the return type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultKind {
    /// The error slot of a `Result`.
    Error,
    /// The ok slot of a `Result` carrying a named reply struct.
    Reply(TypeRef),
    /// Anything else, rendered for diagnostics.
    Other(String),
}

/// Abstract view of an annotated function declaration. Never mutated by
/// this subsystem.
#[derive(Debug, Clone)]
pub struct HandlerSignature {
    pub params: Vec<ParamKind>,
    pub results: Vec<ResultKind>,
    pub has_receiver: bool,
    pub pos: Pos,
}

impl HandlerSignature {
    pub fn from_syn(sig: &syn::Signature, pos: Pos) -> Self {
        let params = sig
            .inputs
            .iter()
            .filter_map(|arg| match arg {
                syn::FnArg::Receiver(_) => None,
                syn::FnArg::Typed(pat) => Some(classify_param(&pat.ty)),
            })
            .collect();

        let results = match &sig.output {
            syn::ReturnType::Default => Vec::new(),
            syn::ReturnType::Type(_, ty) => lower_return(ty),
        };

        Self {
            params,
            results,
            has_receiver: sig.receiver().is_some(),
            pos,
        }
    }
}

fn render(ty: &syn::Type) -> String {
    ty.to_token_stream().to_string()
}

fn classify_param(ty: &syn::Type) -> ParamKind {
    let (inner, is_ref) = match ty {
        syn::Type::Reference(r) => (r.elem.as_ref(), true),
        other => (other, false),
    };
    match inner {
        syn::Type::Path(p) => {
            let is_context = p
                .path
                .segments
                .last()
                .map(|seg| seg.ident == "Context")
                .unwrap_or(false);
            if is_context {
                ParamKind::Context
            } else if is_ref {
                match TypeRef::from_path(&p.path) {
                    Some(type_ref) => ParamKind::Message(type_ref),
                    None => ParamKind::Other(render(ty)),
                }
            } else {
                ParamKind::Other(render(ty))
            }
        }
        _ => ParamKind::Other(render(ty)),
    }
}

fn lower_return(ty: &syn::Type) -> Vec<ResultKind> {
    let path = match ty {
        syn::Type::Path(p) => &p.path,
        _ => return vec![ResultKind::Other(render(ty))],
    };
    let last = match path.segments.last() {
        Some(seg) if seg.ident == "Result" => seg,
        _ => return vec![ResultKind::Other(render(ty))],
    };
    let args = match &last.arguments {
        syn::PathArguments::AngleBracketed(args) if args.args.len() == 2 => &args.args,
        _ => return vec![ResultKind::Other(render(ty))],
    };
    let ok = match &args[0] {
        syn::GenericArgument::Type(ok) => ok,
        _ => return vec![ResultKind::Other(render(ty))],
    };

    match ok {
        syn::Type::Tuple(tuple) if tuple.elems.is_empty() => vec![ResultKind::Error],
        syn::Type::Path(p) => match TypeRef::from_path(&p.path) {
            Some(type_ref) => vec![ResultKind::Reply(type_ref), ResultKind::Error],
            None => vec![ResultKind::Other(render(ok)), ResultKind::Error],
        },
        other => vec![ResultKind::Other(render(other)), ResultKind::Error],
    }
}

/// Validate a handler signature against the two accepted shapes.
///
/// Pure and order-independent: the outcome depends only on the signature,
/// never on directive contents. On success returns the message type and,
/// for request-reply handlers, the reply type.
pub fn validate_handler(
    errs: &mut ErrorSink,
    sig: &HandlerSignature,
) -> Option<(TypeRef, Option<TypeRef>)> {
    let fail = |errs: &mut ErrorSink, message: &str| {
        errs.report(ResourceError::Signature {
            pos: sig.pos.clone(),
            message: message.into(),
        });
    };

    if sig.has_receiver {
        fail(errs, "nats handler must be a free function, not a method");
        return None;
    }
    if sig.params.len() != 2 {
        fail(errs, "nats handler must take two parameters (&Context, &Message)");
        return None;
    }
    if sig.params[0] != ParamKind::Context {
        fail(errs, "nats first handler parameter must be &Context");
        return None;
    }
    let message_type = match &sig.params[1] {
        ParamKind::Message(type_ref) => type_ref.clone(),
        _ => {
            fail(
                errs,
                "nats second handler parameter must be a reference to a named message struct",
            );
            return None;
        }
    };

    match sig.results.as_slice() {
        [ResultKind::Error] => Some((message_type, None)),
        [ResultKind::Reply(reply), ResultKind::Error] => Some((message_type, Some(reply.clone()))),
        [ResultKind::Other(_), ResultKind::Error] => {
            fail(errs, "nats reply type must be a named struct");
            None
        }
        _ => {
            fail(errs, "nats handler must return Result<(), _> or Result<Reply, _>");
            None
        }
    }
}
