//! Lowering Tree-sitter Go syntax into the core syntax model.

use std::path::{Path, PathBuf};

use gostable_core::{LiteralKind, NodeId, NodeKind, Span, SyntaxTree, TypeExpr};
use tree_sitter::{Language, Node, Parser};

/// Errors from parsing Go source.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The Go grammar could not be loaded into the parser.
    #[error("failed to load the Go grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    /// The source contains a syntax error.
    #[error("{}:{line}:{column}: syntax error near `{snippet}`", .path.display())]
    Syntax {
        /// File path.
        path: PathBuf,
        /// Line number (1-indexed).
        line: usize,
        /// Column number (1-indexed).
        column: usize,
        /// Source text at the error.
        snippet: String,
    },

    /// Tree-sitter returned no tree.
    #[error("{}: parser produced no syntax tree", .path.display())]
    NoTree {
        /// File path.
        path: PathBuf,
    },
}

/// A single import spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Explicit alias (`name`, `.` or `_`), if written.
    pub alias: Option<String>,
    /// Import path.
    pub path: String,
    /// Line number (1-indexed).
    pub line: usize,
}

impl Import {
    /// Name the package is referred to by in the file.
    ///
    /// `None` for blank and dot imports. Without an alias this is the last
    /// path segment, skipping a trailing major-version segment (`/v2`).
    #[must_use]
    pub fn local_name(&self) -> Option<&str> {
        match self.alias.as_deref() {
            Some("_" | ".") => None,
            Some(alias) => Some(alias),
            None => {
                let mut segments = self.path.rsplit('/');
                let last = segments.next()?;
                let is_major_version = last.len() > 1
                    && last.starts_with('v')
                    && last[1..].bytes().all(|b| b.is_ascii_digit());
                if is_major_version {
                    segments.next()
                } else {
                    Some(last)
                }
            }
        }
    }
}

/// A struct type declared in the unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDecl {
    /// Type name.
    pub name: String,
    /// Named fields and their written types.
    pub fields: Vec<(String, TypeExpr)>,
}

/// What lowering one file produced besides its nodes.
#[derive(Debug, Clone)]
pub struct GoFile {
    /// File root node.
    pub root: NodeId,
    /// File path.
    pub path: PathBuf,
    /// Name from the `package` clause.
    pub package: Option<String>,
    /// Import specs in source order.
    pub imports: Vec<Import>,
    /// Struct types declared at the top level.
    pub structs: Vec<StructDecl>,
}

/// Parses `source` and lowers it into `tree`.
///
/// Nothing is added to `tree` when the source has a syntax error.
///
/// # Errors
///
/// Returns an error if the grammar cannot be loaded or the source does not
/// parse cleanly.
pub fn lower_source(tree: &mut SyntaxTree, path: &Path, source: &str) -> Result<GoFile, ParseError> {
    let language: Language = tree_sitter_go::LANGUAGE.into();
    let mut parser = Parser::new();
    parser.set_language(&language)?;

    let src = source.as_bytes();
    let parsed = parser.parse(src, None).ok_or_else(|| ParseError::NoTree {
        path: path.to_path_buf(),
    })?;
    let root = parsed.root_node();
    if root.has_error() {
        let at = first_error(root);
        let snippet: String = at
            .utf8_text(src)
            .unwrap_or_default()
            .chars()
            .take(40)
            .collect();
        return Err(ParseError::Syntax {
            path: path.to_path_buf(),
            line: at.start_position().row + 1,
            column: column(src, at),
            snippet,
        });
    }

    let mut lowering = Lowering { src, tree };
    Ok(lowering.file(root, path))
}

fn first_error(node: Node<'_>) -> Node<'_> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.is_error() || child.is_missing() {
            return child;
        }
        if child.has_error() {
            return first_error(child);
        }
    }
    node
}

fn span(src: &[u8], node: Node<'_>) -> Span {
    Span::new(node.start_position().row + 1, column(src, node))
        .with_bytes(node.start_byte(), node.end_byte() - node.start_byte())
}

/// 1-indexed column in characters; tree-sitter counts bytes.
fn column(src: &[u8], node: Node<'_>) -> usize {
    let start = node.start_byte();
    let bytes = node.start_position().column;
    src.get(start - bytes..start)
        .and_then(|prefix| std::str::from_utf8(prefix).ok())
        .map_or(bytes, |prefix| prefix.chars().count())
        + 1
}

/// Named children without comments.
fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect()
}

fn field_children<'n>(node: Node<'n>, field: &str) -> Vec<Node<'n>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

/// Looks through a `literal_element` wrapper.
fn unwrap_element(node: Node<'_>) -> Node<'_> {
    if node.kind() == "literal_element" {
        if let Some(inner) = named_children(node).into_iter().next() {
            return inner;
        }
    }
    node
}

struct Lowering<'s, 't> {
    src: &'s [u8],
    tree: &'t mut SyntaxTree,
}

impl<'s> Lowering<'s, '_> {
    fn text(&self, node: Node<'_>) -> &'s str {
        node.utf8_text(self.src).unwrap_or_default()
    }

    fn push(&mut self, kind: NodeKind, node: Node<'_>) -> NodeId {
        self.tree.push(kind, span(self.src, node))
    }

    fn file(&mut self, root: Node<'_>, path: &Path) -> GoFile {
        let mut package = None;
        let mut imports = Vec::new();
        let mut structs = Vec::new();
        let mut items = Vec::new();

        for child in named_children(root) {
            match child.kind() {
                "package_clause" => {
                    package = named_children(child)
                        .first()
                        .map(|n| self.text(*n).to_string());
                }
                "import_declaration" => self.imports(child, &mut imports),
                "type_declaration" => self.structs(child, &mut structs),
                _ => items.extend(self.lower(child)),
            }
        }

        let root_id = self.push(
            NodeKind::File {
                path: path.to_path_buf(),
                items,
            },
            root,
        );
        GoFile {
            root: root_id,
            path: path.to_path_buf(),
            package,
            imports,
            structs,
        }
    }

    fn imports(&self, node: Node<'_>, out: &mut Vec<Import>) {
        for child in named_children(node) {
            match child.kind() {
                "import_spec" => {
                    let Some(path) = child.child_by_field_name("path") else {
                        continue;
                    };
                    out.push(Import {
                        alias: child
                            .child_by_field_name("name")
                            .map(|n| self.text(n).to_string()),
                        path: unquote(self.text(path)).to_string(),
                        line: child.start_position().row + 1,
                    });
                }
                "import_spec_list" => self.imports(child, out),
                _ => {}
            }
        }
    }

    fn structs(&self, node: Node<'_>, out: &mut Vec<StructDecl>) {
        for spec in named_children(node) {
            if spec.kind() != "type_spec" {
                continue;
            }
            let (Some(name), Some(ty)) = (
                spec.child_by_field_name("name"),
                spec.child_by_field_name("type"),
            ) else {
                continue;
            };
            if ty.kind() != "struct_type" {
                continue;
            }
            let mut fields = Vec::new();
            for list in named_children(ty) {
                for decl in named_children(list) {
                    if decl.kind() != "field_declaration" {
                        continue;
                    }
                    let Some(field_ty) = decl.child_by_field_name("type") else {
                        continue;
                    };
                    let field_ty = self.type_expr(field_ty);
                    for field_name in field_children(decl, "name") {
                        fields.push((self.text(field_name).to_string(), field_ty.clone()));
                    }
                }
            }
            out.push(StructDecl {
                name: self.text(name).to_string(),
                fields,
            });
        }
    }

    /// Lowers a statement or expression. `None` for constructs the checker
    /// never looks at.
    fn lower(&mut self, node: Node<'_>) -> Option<NodeId> {
        let id = match node.kind() {
            "comment" | "type_declaration" | "empty_statement" | "break_statement"
            | "continue_statement" | "goto_statement" | "fallthrough_statement"
            | "label_name" => return None,

            "expression_statement" | "parenthesized_expression" | "literal_element" => {
                let inner = named_children(node).into_iter().next()?;
                return self.lower(inner);
            }

            "function_declaration" | "method_declaration" | "func_literal" => {
                self.function(node)
            }
            "block" | "if_statement" | "for_statement" | "expression_switch_statement"
            | "type_switch_statement" | "select_statement" | "expression_case"
            | "default_case" | "type_case" | "communication_case" => self.scope(node),

            "short_var_declaration" => self.assignment(node, true),
            "assignment_statement" => self.assignment(node, false),
            "var_declaration" | "const_declaration" => self.declaration(node),

            "call_expression" => self.call(node),
            "selector_expression" => self.selector(node),
            "composite_literal" => {
                let ty = node.child_by_field_name("type").map(|t| self.type_expr(t));
                let elements = node
                    .child_by_field_name("body")
                    .map(|body| self.elements(body))
                    .unwrap_or_default();
                self.push(NodeKind::StructuredLiteral { ty, elements }, node)
            }
            "literal_value" => {
                let elements = self.elements(node);
                self.push(NodeKind::StructuredLiteral { ty: None, elements }, node)
            }
            "keyed_element" => self.keyed_element(node),
            "unary_expression" => self.unary(node),

            "identifier" | "field_identifier" | "package_identifier" | "type_identifier"
            | "blank_identifier" => {
                let name = self.text(node).to_string();
                self.push(NodeKind::Identifier { name }, node)
            }
            "interpreted_string_literal" | "raw_string_literal" => {
                let value = unquote(self.text(node)).to_string();
                self.literal(LiteralKind::String, value, node)
            }
            "int_literal" | "float_literal" | "imaginary_literal" => {
                let value = self.text(node).to_string();
                self.literal(LiteralKind::Number, value, node)
            }
            "rune_literal" | "true" | "false" | "nil" | "iota" => {
                let value = self.text(node).to_string();
                self.literal(LiteralKind::Other, value, node)
            }

            _ => self.other(node),
        };
        Some(id)
    }

    fn literal(&mut self, kind: LiteralKind, value: String, node: Node<'_>) -> NodeId {
        self.push(NodeKind::Literal { kind, value }, node)
    }

    fn other(&mut self, node: Node<'_>) -> NodeId {
        let children = named_children(node)
            .into_iter()
            .filter_map(|c| self.lower(c))
            .collect();
        self.push(NodeKind::Other { children }, node)
    }

    /// Children of a block-like node, with `statement_list` flattened.
    fn statements(&mut self, node: Node<'_>) -> Vec<NodeId> {
        let mut out = Vec::new();
        for child in named_children(node) {
            if child.kind() == "statement_list" {
                out.extend(self.statements(child));
            } else {
                out.extend(self.lower(child));
            }
        }
        out
    }

    fn scope(&mut self, node: Node<'_>) -> NodeId {
        let body = self.statements(node);
        self.push(NodeKind::Scope { body }, node)
    }

    /// Functions become a scope holding their parameters, then their body.
    fn function(&mut self, node: Node<'_>) -> NodeId {
        let mut body = Vec::new();
        for list in ["receiver", "parameters"] {
            if let Some(params) = node.child_by_field_name(list) {
                body.extend(self.parameters(params));
            }
        }
        if let Some(block) = node.child_by_field_name("body") {
            body.extend(self.statements(block));
        }
        self.push(NodeKind::Scope { body }, node)
    }

    fn parameters(&mut self, list: Node<'_>) -> Vec<NodeId> {
        let mut out = Vec::new();
        for param in named_children(list) {
            let Some(ty) = param.child_by_field_name("type") else {
                continue;
            };
            let mut declared = self.type_expr(ty);
            if param.kind() == "variadic_parameter_declaration" {
                declared = declared.slice();
            }
            for name in field_children(param, "name") {
                let ident = self.push(
                    NodeKind::Identifier {
                        name: self.text(name).to_string(),
                    },
                    name,
                );
                out.push(self.push(
                    NodeKind::Assignment {
                        lhs: vec![ident],
                        rhs: Vec::new(),
                        declared: Some(declared.clone()),
                        define: true,
                    },
                    param,
                ));
            }
        }
        out
    }

    fn expression_list(&mut self, node: Option<Node<'_>>) -> Vec<NodeId> {
        let Some(node) = node else {
            return Vec::new();
        };
        if node.kind() == "expression_list" {
            named_children(node)
                .into_iter()
                .filter_map(|c| self.lower(c))
                .collect()
        } else {
            self.lower(node).into_iter().collect()
        }
    }

    fn assignment(&mut self, node: Node<'_>, define: bool) -> NodeId {
        let lhs = self.expression_list(node.child_by_field_name("left"));
        let rhs = self.expression_list(node.child_by_field_name("right"));
        self.push(
            NodeKind::Assignment {
                lhs,
                rhs,
                declared: None,
                define,
            },
            node,
        )
    }

    fn declaration(&mut self, node: Node<'_>) -> NodeId {
        let mut specs = Vec::new();
        self.specs(node, &mut specs);
        match specs.as_slice() {
            [single] => *single,
            _ => self.push(NodeKind::Other { children: specs }, node),
        }
    }

    fn specs(&mut self, node: Node<'_>, out: &mut Vec<NodeId>) {
        for child in named_children(node) {
            match child.kind() {
                "var_spec" | "const_spec" => {
                    let lhs = field_children(child, "name")
                        .into_iter()
                        .filter_map(|n| self.lower(n))
                        .collect();
                    let declared = child.child_by_field_name("type").map(|t| self.type_expr(t));
                    let rhs = self.expression_list(child.child_by_field_name("value"));
                    out.push(self.push(
                        NodeKind::Assignment {
                            lhs,
                            rhs,
                            declared,
                            define: true,
                        },
                        child,
                    ));
                }
                "var_spec_list" | "const_spec_list" => self.specs(child, out),
                _ => {}
            }
        }
    }

    fn call(&mut self, node: Node<'_>) -> NodeId {
        let Some(callee) = node
            .child_by_field_name("function")
            .and_then(|f| self.lower(f))
        else {
            return self.other(node);
        };
        let args = node
            .child_by_field_name("arguments")
            .map(|list| {
                named_children(list)
                    .into_iter()
                    .filter_map(|a| self.lower(a))
                    .collect()
            })
            .unwrap_or_default();
        self.push(NodeKind::Invocation { callee, args }, node)
    }

    fn selector(&mut self, node: Node<'_>) -> NodeId {
        let (Some(operand), Some(field)) = (
            node.child_by_field_name("operand"),
            node.child_by_field_name("field"),
        ) else {
            return self.other(node);
        };
        let Some(operand) = self.lower(operand) else {
            return self.other(node);
        };
        let member = self.text(field).to_string();
        self.push(NodeKind::MemberAccess { operand, member }, node)
    }

    fn elements(&mut self, body: Node<'_>) -> Vec<NodeId> {
        named_children(body)
            .into_iter()
            .filter_map(|e| self.lower(unwrap_element(e)))
            .collect()
    }

    fn keyed_element(&mut self, node: Node<'_>) -> NodeId {
        let parts: Vec<Node<'_>> = named_children(node);
        let [key, value] = parts.as_slice() else {
            return self.other(node);
        };
        let (Some(key), Some(value)) = (
            self.lower(unwrap_element(*key)),
            self.lower(unwrap_element(*value)),
        ) else {
            return self.other(node);
        };
        self.push(NodeKind::KeyValue { key, value }, node)
    }

    fn unary(&mut self, node: Node<'_>) -> NodeId {
        let op = node
            .child_by_field_name("operator")
            .map(|o| self.text(o).to_string())
            .unwrap_or_default();
        let Some(operand) = node
            .child_by_field_name("operand")
            .and_then(|o| self.lower(o))
        else {
            return self.other(node);
        };
        self.push(NodeKind::Unary { op, operand }, node)
    }

    fn type_expr(&self, node: Node<'_>) -> TypeExpr {
        match node.kind() {
            "type_identifier" => TypeExpr::local(self.text(node)),
            "qualified_type" => {
                match (
                    node.child_by_field_name("package"),
                    node.child_by_field_name("name"),
                ) {
                    (Some(pkg), Some(name)) => TypeExpr::qualified(self.text(pkg), self.text(name)),
                    _ => TypeExpr::Other,
                }
            }
            "pointer_type" => named_children(node)
                .first()
                .map_or(TypeExpr::Other, |inner| self.type_expr(*inner).pointer()),
            "slice_type" | "array_type" | "implicit_length_array_type" => node
                .child_by_field_name("element")
                .map_or(TypeExpr::Other, |inner| self.type_expr(inner).slice()),
            "map_type" => match (
                node.child_by_field_name("key"),
                node.child_by_field_name("value"),
            ) {
                (Some(key), Some(value)) => TypeExpr::Map {
                    key: Box::new(self.type_expr(key)),
                    value: Box::new(self.type_expr(value)),
                },
                _ => TypeExpr::Other,
            },
            "generic_type" => node
                .child_by_field_name("type")
                .map_or(TypeExpr::Other, |inner| self.type_expr(inner)),
            "parenthesized_type" => named_children(node)
                .first()
                .map_or(TypeExpr::Other, |inner| self.type_expr(*inner)),
            _ => TypeExpr::Other,
        }
    }
}

/// Strips the quotes of a string literal.
fn unquote(text: &str) -> &str {
    let trimmed = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .or_else(|| text.strip_prefix('`').and_then(|t| t.strip_suffix('`')));
    trimmed.unwrap_or(text)
}
