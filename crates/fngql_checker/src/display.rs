//! TypeScript-style rendering of checker types.

use crate::types::{DeclName, ObjectType, Signature, Type, TypeId, TypeKind};
use fngql_core::Arena;

const MAX_DEPTH: usize = 32;

/// What a rendering is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Human-readable, as `tsc` would print it.
    Display,
    /// Identity: declared names are qualified by their declaring file.
    Key,
}

pub(crate) fn render(types: &Arena<Type>, id: TypeId, mode: Mode) -> String {
    let mut out = String::new();
    Printer { types, mode }.write(id, 0, &mut out);
    out
}

struct Printer<'a> {
    types: &'a Arena<Type>,
    mode: Mode,
}

impl Printer<'_> {
    fn write(&self, id: TypeId, depth: usize, out: &mut String) {
        if depth > MAX_DEPTH {
            out.push_str("...");
            return;
        }
        let ty = &self.types[id];
        if let Some(name) = &ty.name {
            self.write_name(name, depth, out);
            return;
        }

        match &ty.kind {
            TypeKind::Any => out.push_str("any"),
            TypeKind::Unknown => out.push_str("unknown"),
            TypeKind::Never => out.push_str("never"),
            TypeKind::Void => out.push_str("void"),
            TypeKind::Undefined => out.push_str("undefined"),
            TypeKind::Null => out.push_str("null"),
            TypeKind::String => out.push_str("string"),
            TypeKind::Number => out.push_str("number"),
            TypeKind::Boolean => out.push_str("boolean"),
            TypeKind::BigInt => out.push_str("bigint"),
            TypeKind::Symbol => out.push_str("symbol"),
            TypeKind::NonPrimitive => out.push_str("object"),
            TypeKind::Literal(literal) => out.push_str(&literal.to_source()),
            TypeKind::Union(members) => self.write_list(members, " | ", depth, out),
            TypeKind::Intersection(members) => self.write_list(members, " & ", depth, out),
            TypeKind::Array(element) => {
                self.write_operand(*element, depth, out);
                out.push_str("[]");
            }
            TypeKind::Tuple(elements) => {
                out.push('[');
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    if element.rest {
                        out.push_str("...");
                    }
                    match &element.label {
                        Some(label) => {
                            out.push_str(label);
                            if element.optional {
                                out.push('?');
                            }
                            out.push_str(": ");
                            self.write(element.ty, depth + 1, out);
                        }
                        None => {
                            self.write(element.ty, depth + 1, out);
                            if element.optional {
                                out.push('?');
                            }
                        }
                    }
                }
                out.push(']');
            }
            TypeKind::Object(object) => self.write_object(object, depth, out),
            TypeKind::Enum(_) => out.push_str("enum"),
            TypeKind::TypeParam { name, .. } => out.push_str(name),
            TypeKind::Builtin(builtin, args) => {
                out.push_str(builtin.as_str());
                self.write_args(args, depth, out);
            }
            TypeKind::Unresolved => out.push_str(match self.mode {
                Mode::Display => "any",
                Mode::Key => "__error",
            }),
            TypeKind::Pending => out.push_str("__pending"),
        }
    }

    fn write_name(&self, name: &DeclName, depth: usize, out: &mut String) {
        out.push_str(&name.name);
        self.write_args(&name.args, depth, out);
        if self.mode == Mode::Key {
            if let Some(file) = &name.file {
                out.push('@');
                out.push_str(file);
            }
        }
    }

    fn write_args(&self, args: &[TypeId], depth: usize, out: &mut String) {
        if args.is_empty() {
            return;
        }
        out.push('<');
        self.write_list(args, ", ", depth, out);
        out.push('>');
    }

    fn write_list(&self, members: &[TypeId], separator: &str, depth: usize, out: &mut String) {
        for (i, member) in members.iter().enumerate() {
            if i > 0 {
                out.push_str(separator);
            }
            if separator != ", " {
                self.write_operand(*member, depth, out);
            } else {
                self.write(*member, depth + 1, out);
            }
        }
    }

    /// Writes a type in operand position, parenthesised when it would bind loosely.
    fn write_operand(&self, id: TypeId, depth: usize, out: &mut String) {
        let ty = &self.types[id];
        let loose = ty.name.is_none()
            && match &ty.kind {
                TypeKind::Union(_) | TypeKind::Intersection(_) => true,
                TypeKind::Object(object) => {
                    object.is_function() || is_constructor(object)
                }
                _ => false,
            };
        if loose {
            out.push('(');
            self.write(id, depth + 1, out);
            out.push(')');
        } else {
            self.write(id, depth + 1, out);
        }
    }

    fn write_object(&self, object: &ObjectType, depth: usize, out: &mut String) {
        if object.is_function() {
            self.write_signature(&object.call_signatures[0], " => ", depth, out);
            return;
        }
        if is_constructor(object) {
            out.push_str("new ");
            self.write_signature(&object.construct_signatures[0], " => ", depth, out);
            return;
        }

        let empty = object.properties.is_empty()
            && object.call_signatures.is_empty()
            && object.construct_signatures.is_empty()
            && object.string_index.is_none()
            && object.number_index.is_none();
        if empty {
            out.push_str("{}");
            return;
        }

        out.push_str("{ ");
        for signature in &object.call_signatures {
            self.write_signature(signature, ": ", depth, out);
            out.push_str("; ");
        }
        for signature in &object.construct_signatures {
            out.push_str("new ");
            self.write_signature(signature, ": ", depth, out);
            out.push_str("; ");
        }
        if let Some(value) = object.string_index {
            out.push_str("[key: string]: ");
            self.write(value, depth + 1, out);
            out.push_str("; ");
        }
        if let Some(value) = object.number_index {
            out.push_str("[key: number]: ");
            self.write(value, depth + 1, out);
            out.push_str("; ");
        }
        for property in &object.properties {
            if property.readonly {
                out.push_str("readonly ");
            }
            write_property_name(&property.name, out);
            let method = property.is_method
                && match &self.types[property.ty].kind {
                    TypeKind::Object(o) => !o.call_signatures.is_empty(),
                    _ => false,
                };
            if method {
                if let TypeKind::Object(o) = &self.types[property.ty].kind {
                    for (i, signature) in o.call_signatures.iter().enumerate() {
                        if i > 0 {
                            write_property_name(&property.name, out);
                        }
                        if property.optional {
                            out.push('?');
                        }
                        self.write_signature(signature, ": ", depth, out);
                        out.push_str("; ");
                    }
                }
                continue;
            }
            if property.optional {
                out.push('?');
            }
            out.push_str(": ");
            self.write(property.ty, depth + 1, out);
            out.push_str("; ");
        }
        out.push('}');
    }

    fn write_signature(&self, signature: &Signature, arrow: &str, depth: usize, out: &mut String) {
        if !signature.type_params.is_empty() {
            self.write_args(&signature.type_params, depth, out);
        }
        out.push('(');
        let mut first = true;
        if let Some(this_type) = signature.this_type {
            out.push_str("this: ");
            self.write(this_type, depth + 1, out);
            first = false;
        }
        for param in &signature.params {
            if !first {
                out.push_str(", ");
            }
            first = false;
            if param.rest {
                out.push_str("...");
            }
            out.push_str(&param.name);
            if param.optional {
                out.push('?');
            }
            out.push_str(": ");
            self.write(param.ty, depth + 1, out);
        }
        out.push(')');
        out.push_str(arrow);
        self.write(signature.return_type, depth + 1, out);
    }
}

fn is_constructor(object: &ObjectType) -> bool {
    object.properties.is_empty()
        && object.call_signatures.is_empty()
        && object.construct_signatures.len() == 1
}

fn write_property_name(name: &str, out: &mut String) {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$');
    if plain || name.parse::<f64>().is_ok() {
        out.push_str(name);
    } else {
        out.push_str(&crate::types::quote_string(name));
    }
}
