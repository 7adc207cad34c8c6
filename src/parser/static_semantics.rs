//! Hoisting analysis over a freshly built function body.
//!
//! `var` declarations and function declarations are scoped to the nearest enclosing
//! function no matter how deeply they are nested in blocks, so both collectors walk
//! every statement form but never descend into nested functions.

use std::collections::HashSet;
use std::rc::Rc;

use crate::parser::ast::{
    ForInTarget, FunctionData, StatementType, VariableDeclarationData,
    VariableDeclarationOrExpression,
};

pub(crate) struct Semantics {
    pub(crate) declared_variables: Vec<String>,
    pub(crate) hoisted_functions: Vec<Rc<FunctionData>>,
    seen: HashSet<String>,
}

impl Semantics {
    pub(crate) fn of_statements(statements: &[StatementType]) -> Self {
        let mut semantics = Semantics {
            declared_variables: vec![],
            hoisted_functions: vec![],
            seen: HashSet::new(),
        };
        for s in statements {
            semantics.collect_statement(s);
        }
        semantics
    }

    fn add_name(&mut self, name: &str) {
        if self.seen.insert(name.to_string()) {
            self.declared_variables.push(name.to_string());
        }
    }

    fn add_declaration(&mut self, d: &VariableDeclarationData) {
        for declarator in &d.declarations {
            self.add_name(&declarator.id.name);
        }
    }

    fn collect_statement(&mut self, statement: &StatementType) {
        match statement {
            StatementType::VariableDeclaration(d) => self.add_declaration(d),
            StatementType::FunctionDeclaration(f) => self.hoisted_functions.push(f.clone()),
            StatementType::BlockStatement(b) => {
                for s in &b.body {
                    self.collect_statement(s);
                }
            }
            StatementType::LabeledStatement { body, .. }
            | StatementType::WhileStatement { body, .. }
            | StatementType::DoWhileStatement { body, .. }
            | StatementType::WithStatement { body, .. } => self.collect_statement(body),
            StatementType::IfStatement {
                consequent,
                alternate,
                ..
            } => {
                self.collect_statement(consequent);
                if let Some(a) = alternate {
                    self.collect_statement(a);
                }
            }
            StatementType::ForStatement { init, body, .. } => {
                if let Some(VariableDeclarationOrExpression::VariableDeclaration(d)) = init {
                    self.add_declaration(d);
                }
                self.collect_statement(body);
            }
            StatementType::ForInStatement { left, body, .. } => {
                if let ForInTarget::VariableDeclaration(id) = left {
                    self.add_name(&id.name);
                }
                self.collect_statement(body);
            }
            StatementType::SwitchStatement { cases, .. } => {
                for case in cases {
                    for s in &case.consequent {
                        self.collect_statement(s);
                    }
                }
            }
            StatementType::TryStatement {
                block,
                handler,
                finalizer,
                ..
            } => {
                for s in &block.body {
                    self.collect_statement(s);
                }
                if let Some(h) = handler {
                    for s in &h.body.body {
                        self.collect_statement(s);
                    }
                }
                if let Some(f) = finalizer {
                    for s in &f.body {
                        self.collect_statement(s);
                    }
                }
            }
            StatementType::ExpressionStatement { .. }
            | StatementType::EmptyStatement { .. }
            | StatementType::DebuggerStatement { .. }
            | StatementType::ReturnStatement { .. }
            | StatementType::BreakStatement { .. }
            | StatementType::ContinueStatement { .. }
            | StatementType::ThrowStatement { .. } => {}
        }
    }
}
