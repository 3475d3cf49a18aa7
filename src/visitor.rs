use crate::utils::LineIndex;
use rustpython_ast::{self as ast, Expr, Stmt};
use serde::Serialize;
use std::collections::HashSet;

/// One name bound by an import statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportedName {
    /// The name as written, e.g. `a.b.c` in `import a.b.c`, `x` in `from m import x`, or `*`.
    pub name: String,
    /// The `as` alias, if any.
    pub asname: Option<String>,
}

/// An import statement reduced to what the resolver needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ImportRequest {
    /// `import a.b.c [as x], d`
    Import { names: Vec<ImportedName>, line: usize },
    /// `from [.]*module import n1 [as x], n2` with `level` leading dots.
    From {
        module: Option<String>,
        level: u32,
        names: Vec<ImportedName>,
        line: usize,
    },
}

impl ImportRequest {
    pub fn line(&self) -> usize {
        match self {
            ImportRequest::Import { line, .. } | ImportRequest::From { line, .. } => *line,
        }
    }
}

/// Collects every import statement of a module, wherever it lexically occurs.
///
/// Imports inside function bodies, class bodies, conditional branches, loops, `with`,
/// `try` and `match` blocks are all collected, since discovery must not depend on
/// whether the statement runs at load time.
pub struct ImportVisitor<'a> {
    /// Collected import statements, in source order.
    pub imports: Vec<ImportRequest>,
    /// Names listed in a literal module-level `__all__`.
    pub exports: Vec<String>,
    /// Lines excluded through the ignore pragma.
    pub ignored_lines: &'a HashSet<usize>,
    pub line_index: &'a LineIndex,
    depth: usize,
}

impl<'a> ImportVisitor<'a> {
    pub fn new(line_index: &'a LineIndex, ignored_lines: &'a HashSet<usize>) -> Self {
        Self {
            imports: Vec::new(),
            exports: Vec::new(),
            ignored_lines,
            line_index,
            depth: 0,
        }
    }

    fn visit_body(&mut self, body: &[Stmt]) {
        self.depth += 1;
        for stmt in body {
            self.visit_stmt(stmt);
        }
        self.depth -= 1;
    }

    pub fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Import(node) => {
                let line = self.line_index.line_index(node.range.start());
                if self.ignored_lines.contains(&line) {
                    return;
                }
                self.imports.push(ImportRequest::Import {
                    names: node.names.iter().map(imported_name).collect(),
                    line,
                });
            }
            Stmt::ImportFrom(node) => {
                let line = self.line_index.line_index(node.range.start());
                if self.ignored_lines.contains(&line) {
                    return;
                }
                let module = node.module.as_ref().map(|m| m.to_string());
                // `from __future__ import ...` is a compiler directive.
                if module.as_deref() == Some("__future__") {
                    return;
                }
                self.imports.push(ImportRequest::From {
                    module,
                    level: node.level.as_ref().map_or(0, |level| level.to_u32()),
                    names: node.names.iter().map(imported_name).collect(),
                    line,
                });
            }
            Stmt::Assign(node) => {
                if self.depth == 0 {
                    self.collect_exports(&node.targets, &node.value);
                }
            }
            Stmt::FunctionDef(node) => self.visit_body(&node.body),
            Stmt::AsyncFunctionDef(node) => self.visit_body(&node.body),
            Stmt::ClassDef(node) => self.visit_body(&node.body),
            Stmt::If(node) => {
                self.visit_body(&node.body);
                self.visit_body(&node.orelse);
            }
            Stmt::For(node) => {
                self.visit_body(&node.body);
                self.visit_body(&node.orelse);
            }
            Stmt::AsyncFor(node) => {
                self.visit_body(&node.body);
                self.visit_body(&node.orelse);
            }
            Stmt::While(node) => {
                self.visit_body(&node.body);
                self.visit_body(&node.orelse);
            }
            Stmt::With(node) => self.visit_body(&node.body),
            Stmt::AsyncWith(node) => self.visit_body(&node.body),
            Stmt::Try(node) => {
                self.visit_body(&node.body);
                self.visit_handlers(&node.handlers);
                self.visit_body(&node.orelse);
                self.visit_body(&node.finalbody);
            }
            Stmt::TryStar(node) => {
                self.visit_body(&node.body);
                self.visit_handlers(&node.handlers);
                self.visit_body(&node.orelse);
                self.visit_body(&node.finalbody);
            }
            Stmt::Match(node) => {
                for case in &node.cases {
                    self.visit_body(&case.body);
                }
            }
            _ => {}
        }
    }

    fn visit_handlers(&mut self, handlers: &[ast::ExceptHandler]) {
        for handler in handlers {
            if let ast::ExceptHandler::ExceptHandler(handler_node) = handler {
                self.visit_body(&handler_node.body);
            }
        }
    }

    /// Records `__all__ = ["a", "b"]` (list or tuple of string literals).
    fn collect_exports(&mut self, targets: &[Expr], value: &Expr) {
        let is_all = matches!(targets.first(), Some(Expr::Name(target)) if target.id.as_str() == "__all__");
        if !is_all {
            return;
        }
        let elts = match value {
            Expr::List(list) => &list.elts,
            Expr::Tuple(tuple) => &tuple.elts,
            _ => return,
        };
        self.exports.clear();
        for elt in elts {
            if let Expr::Constant(constant) = elt {
                if let ast::Constant::Str(s) = &constant.value {
                    self.exports.push(s.to_string());
                }
            }
        }
    }
}

fn imported_name(alias: &ast::Alias) -> ImportedName {
    ImportedName {
        name: alias.name.to_string(),
        asname: alias.asname.as_ref().map(|a| a.to_string()),
    }
}
