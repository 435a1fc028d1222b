//! Source scanning: find annotated handlers and build the registry.
//!
//! Each file is parsed with [`syn::parse_file`] and walked for free
//! functions (and impl items, which are rejected with a placement error)
//! whose doc comment carries a `trellis:` directive line. Files scan in
//! parallel; every worker owns a private registry and error sink, merged in
//! sorted-path order after the scan so output is stable regardless of
//! scheduling.
//!
//! A malformed file or directive never aborts the scan of the remaining
//! files — the goal is maximum error yield per pass.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use proc_macro2::Span;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::directive::{parse_doc_comment, DirectiveInput, DirectiveRegistry, DocParse};
use crate::errors::{ErrorSink, Pos, ResourceError};
use crate::registry::ResourceRegistry;
use crate::signature::HandlerSignature;

fn pos_of(file: &str, span: Span) -> Pos {
    let start = span.start();
    Pos::new(file, start.line as u32, start.column as u32 + 1)
}

fn doc_lines(attrs: &[syn::Attribute]) -> Vec<String> {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            syn::Meta::NameValue(nv) => match &nv.value {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(s),
                    ..
                }) => Some(s.value()),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

fn inspect_fn(
    directives: &DirectiveRegistry,
    file: &str,
    attrs: &[syn::Attribute],
    sig: &syn::Signature,
    in_impl: bool,
    registry: &mut ResourceRegistry,
    errs: &mut ErrorSink,
) {
    let lines = doc_lines(attrs);
    if lines.is_empty() {
        return;
    }
    let pos = pos_of(file, sig.ident.span());

    let (directive, doc) = match parse_doc_comment(errs, &pos, &lines) {
        DocParse::NoDirective | DocParse::Invalid => return,
        DocParse::Directive { directive, doc } => (directive, doc),
    };

    if in_impl {
        errs.report(ResourceError::Placement {
            pos,
            message: format!(
                "directive {:?} must annotate a module-level function, not an impl item",
                directive.name
            ),
        });
        return;
    }

    let handler = match directives.get(&directive.name) {
        Some(handler) => handler,
        None => {
            errs.report(ResourceError::DirectiveSyntax {
                pos,
                message: format!("Unknown directive {:?}.", directive.name),
            });
            return;
        }
    };

    let handler_name = sig.ident.to_string();
    let lowered = HandlerSignature::from_syn(sig, pos.clone());
    let input = DirectiveInput {
        directive: &directive,
        signature: &lowered,
        handler_name: &handler_name,
        doc: &doc,
        pos: &pos,
    };
    if let Some(resource) = handler(errs, input) {
        debug!(file, handler = %handler_name, resource = resource.name(), "registered resource");
        registry.insert(errs, &handler_name, resource);
    }
}

fn visit_items(
    directives: &DirectiveRegistry,
    file: &str,
    items: &[syn::Item],
    registry: &mut ResourceRegistry,
    errs: &mut ErrorSink,
) {
    for item in items {
        match item {
            syn::Item::Fn(item_fn) => {
                inspect_fn(directives, file, &item_fn.attrs, &item_fn.sig, false, registry, errs);
            }
            syn::Item::Mod(item_mod) => {
                if let Some((_, nested)) = &item_mod.content {
                    visit_items(directives, file, nested, registry, errs);
                }
            }
            syn::Item::Impl(item_impl) => {
                for impl_item in &item_impl.items {
                    if let syn::ImplItem::Fn(impl_fn) = impl_item {
                        inspect_fn(directives, file, &impl_fn.attrs, &impl_fn.sig, true, registry, errs);
                    }
                }
            }
            _ => {}
        }
    }
}

fn scan_file(
    directives: &DirectiveRegistry,
    file: &str,
    source: &str,
) -> (ResourceRegistry, ErrorSink) {
    let mut registry = ResourceRegistry::new();
    let mut errs = ErrorSink::new();

    let parsed = match syn::parse_file(source) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(file, error = %err, "file failed to parse");
            let pos = pos_of(file, err.span());
            errs.report(ResourceError::DirectiveSyntax {
                pos,
                message: format!("file is not valid Rust: {}", err),
            });
            return (registry, errs);
        }
    };

    visit_items(directives, file, &parsed.items, &mut registry, &mut errs);
    debug!(file, resources = registry.len(), errors = errs.len(), "scanned file");
    (registry, errs)
}

/// Scan in-memory `(path, source)` pairs into a registry plus accumulated
/// errors. Files are processed in parallel and merged in sorted-path order.
pub fn scan_sources(
    directives: &DirectiveRegistry,
    sources: &[(String, String)],
) -> (ResourceRegistry, ErrorSink) {
    let mut ordered: Vec<&(String, String)> = sources.iter().collect();
    ordered.sort_by(|a, b| a.0.cmp(&b.0));

    let partials: Vec<(ResourceRegistry, ErrorSink)> = ordered
        .par_iter()
        .map(|(file, source)| scan_file(directives, file, source))
        .collect();

    let mut registry = ResourceRegistry::new();
    let mut errs = ErrorSink::new();
    for (partial_registry, partial_errs) in partials {
        errs.merge(partial_errs);
        registry.merge(&mut errs, partial_registry);
    }
    (registry, errs)
}

fn collect_rs_files(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_rs_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            out.push(path);
        }
    }
    Ok(())
}

/// Scan every `.rs` file under `root`. Paths are recorded relative to
/// `root` so registries and errors are stable across machines.
pub fn scan_dir(
    directives: &DirectiveRegistry,
    root: &Path,
) -> io::Result<(ResourceRegistry, ErrorSink)> {
    let mut paths = Vec::new();
    collect_rs_files(root, &mut paths)?;

    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let source = fs::read_to_string(&path)?;
        let name = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .into_owned();
        sources.push((name, source));
    }
    Ok(scan_sources(directives, &sources))
}
