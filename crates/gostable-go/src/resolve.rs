//! Scoped type resolution for one Go package.
//!
//! This is not a type checker. It follows declarations, parameters, struct
//! fields and the driver's handle-returning calls far enough to type the
//! receivers and literals the policy cares about. Everything else stays
//! unknown.

use std::collections::HashMap;

use gostable_core::{NodeId, NodeKind, SyntaxTree, TypeExpr, TypeIdentity, TypeResolver, TypeTable};
use tracing::trace;

use crate::driver;
use crate::parse::GoFile;

type Frame = HashMap<String, Option<TypeIdentity>>;

/// Builds a [`TypeTable`] for every file of a unit.
pub(crate) fn resolve(tree: &SyntaxTree, files: &[GoFile]) -> TypeTable {
    let mut resolver = Resolver {
        tree,
        table: TypeTable::new(),
        frames: vec![Frame::new()],
        imports: HashMap::new(),
        package: String::new(),
        structs: HashMap::new(),
    };

    for file in files {
        resolver.enter_file(file);
        for decl in &file.structs {
            let fields = decl
                .fields
                .iter()
                .filter_map(|(name, ty)| Some((name.clone(), resolver.type_from_expr(ty)?)))
                .collect();
            resolver.structs.insert(decl.name.clone(), fields);
        }
    }

    // Package-level declarations are visible from every file.
    for file in files {
        resolver.enter_file(file);
        if let NodeKind::File { items, .. } = tree.kind(file.root) {
            for item in items {
                match tree.kind(*item) {
                    NodeKind::Assignment { .. } => {
                        resolver.walk(*item);
                    }
                    NodeKind::Other { children } => {
                        for child in children {
                            if matches!(tree.kind(*child), NodeKind::Assignment { .. }) {
                                resolver.walk(*child);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    for file in files {
        resolver.enter_file(file);
        resolver.walk(file.root);
    }

    trace!(typed = resolver.table.typed_nodes(), "resolved unit types");
    resolver.table
}

struct Resolver<'t> {
    tree: &'t SyntaxTree,
    table: TypeTable,
    frames: Vec<Frame>,
    /// Local name -> import path for the current file.
    imports: HashMap<String, String>,
    package: String,
    /// Struct name -> field -> type.
    structs: HashMap<String, HashMap<String, TypeIdentity>>,
}

impl Resolver<'_> {
    fn enter_file(&mut self, file: &GoFile) {
        self.imports = file
            .imports
            .iter()
            .filter_map(|i| Some((i.local_name()?.to_string(), i.path.clone())))
            .collect();
        self.package = file.package.clone().unwrap_or_default();
    }

    fn lookup(&self, name: &str) -> Option<&Option<TypeIdentity>> {
        self.frames.iter().rev().find_map(|f| f.get(name))
    }

    fn bind(&mut self, name: &str, ty: Option<TypeIdentity>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), ty);
        }
    }

    fn rebind(&mut self, name: &str, ty: Option<TypeIdentity>) {
        if let Some(frame) = self.frames.iter_mut().rev().find(|f| f.contains_key(name)) {
            frame.insert(name.to_string(), ty);
        }
    }

    fn type_from_expr(&self, ty: &TypeExpr) -> Option<TypeIdentity> {
        match ty {
            TypeExpr::Named {
                qualifier: Some(q),
                name,
            } => self
                .imports
                .get(q)
                .map(|path| TypeIdentity::named(path.clone(), name.clone())),
            TypeExpr::Named {
                qualifier: None,
                name,
            } => self
                .structs
                .contains_key(name)
                .then(|| TypeIdentity::named(self.package.clone(), name.clone())),
            TypeExpr::Pointer(inner) => self.type_from_expr(inner).map(TypeIdentity::into_pointer),
            TypeExpr::Slice(_) | TypeExpr::Map { .. } => Some(TypeIdentity::Unnamed),
            TypeExpr::Other => None,
        }
    }

    fn record(&mut self, node: NodeId, ty: Option<TypeIdentity>) -> Option<TypeIdentity> {
        if let Some(ty) = &ty {
            self.table.insert_type(node, ty.clone());
        }
        ty
    }

    /// Walks `node` and its children, returning the type of `node`.
    fn walk(&mut self, node: NodeId) -> Option<TypeIdentity> {
        let tree = self.tree;
        match tree.kind(node) {
            NodeKind::File { items, .. } => {
                for item in items {
                    self.walk(*item);
                }
                None
            }
            NodeKind::Scope { body } => {
                self.frames.push(Frame::new());
                for stmt in body {
                    self.walk(*stmt);
                }
                self.frames.pop();
                None
            }
            NodeKind::Assignment {
                lhs,
                rhs,
                declared,
                define,
            } => {
                self.assignment(lhs, rhs, declared.as_ref(), *define);
                None
            }
            NodeKind::Identifier { name } => match self.lookup(name) {
                Some(ty) => {
                    let ty = ty.clone();
                    self.record(node, ty)
                }
                None => {
                    if let Some(path) = self.imports.get(name) {
                        self.table.insert_package(node, path.clone());
                    }
                    None
                }
            },
            NodeKind::MemberAccess { operand, member } => {
                let operand_ty = self.walk(*operand);
                let field = operand_ty.as_ref().and_then(|ty| {
                    let named = ty.named_type()?;
                    if named.package != self.package {
                        return None;
                    }
                    self.structs.get(&named.name)?.get(member).cloned()
                });
                self.record(node, field)
            }
            NodeKind::Invocation { callee, args } => {
                self.walk(*callee);
                for arg in args {
                    self.walk(*arg);
                }
                let result = match tree.kind(*callee) {
                    NodeKind::MemberAccess { operand, member } => {
                        match self.table.package_of(*operand) {
                            Some(package) => driver::package_function(&package, member),
                            None => self
                                .table
                                .type_of(*operand)
                                .and_then(|recv| driver::method_result(&recv, member)),
                        }
                    }
                    _ => None,
                };
                self.record(node, result)
            }
            NodeKind::StructuredLiteral { ty, elements } => {
                for element in elements {
                    self.walk(*element);
                }
                let ty = ty.as_ref().and_then(|t| self.type_from_expr(t));
                self.record(node, ty)
            }
            NodeKind::KeyValue { key, value } => {
                // Field names are not expressions.
                if tree.identifier(*key).is_none() {
                    self.walk(*key);
                }
                self.walk(*value);
                None
            }
            NodeKind::Unary { op, operand } => {
                let inner = self.walk(*operand);
                let ty = match op.as_str() {
                    "&" => inner.map(TypeIdentity::into_pointer),
                    "*" => inner.map(TypeIdentity::deref),
                    _ => None,
                };
                self.record(node, ty)
            }
            NodeKind::Literal { .. } => None,
            NodeKind::Other { children } => {
                for child in children {
                    self.walk(*child);
                }
                None
            }
        }
    }

    fn assignment(
        &mut self,
        lhs: &[NodeId],
        rhs: &[NodeId],
        declared: Option<&TypeExpr>,
        define: bool,
    ) {
        let values: Vec<Option<TypeIdentity>> = rhs.iter().map(|r| self.walk(*r)).collect();
        let declared = declared.and_then(|t| self.type_from_expr(t));

        for (i, target) in lhs.iter().enumerate() {
            let Some(name) = self.tree.identifier(*target) else {
                self.walk(*target);
                continue;
            };
            if name == "_" {
                continue;
            }
            let ty = declared.clone().or_else(|| {
                if lhs.len() == values.len() {
                    values[i].clone()
                } else if i == 0 && values.len() == 1 {
                    // `x, err := f()`
                    values[0].clone()
                } else {
                    None
                }
            });
            self.record(*target, ty.clone());
            if define {
                self.bind(name, ty);
            } else {
                self.rebind(name, ty);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use gostable_core::{MONGO_PACKAGE, OPTIONS_PACKAGE};

    use crate::GoUnit;

    use super::*;

    fn unit(src: &str) -> (GoUnit, TypeTable) {
        let mut unit = GoUnit::new();
        unit.add_source("main.go", src).unwrap();
        let types = unit.resolve_types();
        (unit, types)
    }

    /// Type of the receiver of the first call to `method`.
    fn receiver_type(unit: &GoUnit, types: &TypeTable, method: &str) -> Option<TypeIdentity> {
        let tree = unit.tree();
        tree.ids().find_map(|id| match tree.kind(id) {
            NodeKind::MemberAccess { operand, member } if member == method => {
                Some(types.type_of(*operand))
            }
            _ => None,
        })?
    }

    const HEADER: &str = r#"package main

import (
	"context"

	"go.mongodb.org/mongo-driver/mongo"
	"go.mongodb.org/mongo-driver/mongo/options"
)
"#;

    #[test]
    fn follows_client_database_collection_chain() {
        let src = format!(
            "{HEADER}
func main() {{
	client, err := mongo.Connect(context.TODO(), options.Client())
	coll := client.Database(\"app\").Collection(\"users\")
	coll.Distinct(context.TODO(), \"name\", nil)
}}
"
        );
        let (unit, types) = unit(&src);
        assert_eq!(
            receiver_type(&unit, &types, "Distinct"),
            Some(TypeIdentity::pointer_to(MONGO_PACKAGE, "Collection"))
        );
        assert_eq!(
            receiver_type(&unit, &types, "Database"),
            Some(TypeIdentity::pointer_to(MONGO_PACKAGE, "Client"))
        );
    }

    #[test]
    fn parameters_and_struct_fields_are_typed() {
        let src = format!(
            "{HEADER}
type Store struct {{
	users *mongo.Collection
}}

func (s *Store) Names(ctx context.Context) {{
	s.users.Distinct(ctx, \"name\", nil)
}}

func count(db *mongo.Database) {{
	db.RunCommand(context.TODO(), nil)
}}
"
        );
        let (unit, types) = unit(&src);
        assert_eq!(
            receiver_type(&unit, &types, "Distinct"),
            Some(TypeIdentity::pointer_to(MONGO_PACKAGE, "Collection"))
        );
        assert_eq!(
            receiver_type(&unit, &types, "RunCommand"),
            Some(TypeIdentity::pointer_to(MONGO_PACKAGE, "Database"))
        );
    }

    #[test]
    fn option_setters_keep_the_builder_type() {
        let src = format!(
            "{HEADER}
func main() {{
	opts := options.Find().SetLimit(10)
	opts.SetMax(nil)
}}
"
        );
        let (unit, types) = unit(&src);
        assert_eq!(
            receiver_type(&unit, &types, "SetMax"),
            Some(TypeIdentity::pointer_to(OPTIONS_PACKAGE, "FindOptions"))
        );
    }

    #[test]
    fn composite_literals_take_their_written_type() {
        let src = format!(
            "{HEADER}
func main() {{
	opts := &options.FindOptions{{}}
	opts.SetMax(nil)
}}
"
        );
        let (unit, types) = unit(&src);
        assert_eq!(
            receiver_type(&unit, &types, "SetMax"),
            Some(TypeIdentity::pointer_to(OPTIONS_PACKAGE, "FindOptions"))
        );
        let tree = unit.tree();
        let literal = tree
            .ids()
            .find(|id| matches!(tree.kind(*id), NodeKind::StructuredLiteral { .. }))
            .unwrap();
        assert_eq!(
            types.type_of(literal),
            Some(TypeIdentity::named(OPTIONS_PACKAGE, "FindOptions"))
        );
    }

    #[test]
    fn package_identifiers_resolve_through_aliases() {
        let src = r#"package main

import opts "go.mongodb.org/mongo-driver/mongo/options"

func main() {
	_ = opts.TailableAwait
}
"#;
        let (unit, types) = unit(src);
        let tree = unit.tree();
        let alias = tree
            .ids()
            .find(|id| tree.identifier(*id) == Some("opts"))
            .unwrap();
        assert_eq!(types.package_of(alias).as_deref(), Some(OPTIONS_PACKAGE));
    }

    #[test]
    fn local_variables_shadow_packages_and_outer_bindings() {
        let src = format!(
            "{HEADER}
func main(coll *mongo.Collection) {{
	{{
		coll := lookup()
		coll.Distinct(context.TODO(), \"name\", nil)
	}}
	options := lookup()
	options.Find()
}}
"
        );
        let (unit, types) = unit(&src);
        assert_eq!(receiver_type(&unit, &types, "Distinct"), None);

        let tree = unit.tree();
        let shadowed = tree
            .ids()
            .filter(|id| tree.identifier(*id) == Some("options"))
            .last()
            .unwrap();
        assert_eq!(types.package_of(shadowed), None);
    }

    #[test]
    fn package_level_variables_are_visible_before_their_declaration() {
        let src = format!(
            "{HEADER}
func main() {{
	users.Distinct(context.TODO(), \"name\", nil)
}}

var users *mongo.Collection
"
        );
        let (unit, types) = unit(&src);
        assert_eq!(
            receiver_type(&unit, &types, "Distinct"),
            Some(TypeIdentity::pointer_to(MONGO_PACKAGE, "Collection"))
        );
    }
}
