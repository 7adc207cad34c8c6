use std::rc::Rc;

use tracing::{debug, trace};

use crate::parser::ast::{
    ExpressionType, ForInTarget, FunctionData, FunctionId, IdentifierData, MemberExpressionType,
    NodeId, ProgramData, StatementType, UnaryOperator, VariableDeclarationData,
    VariableDeclarationOrExpression, PROGRAM_FUNCTION_ID,
};
use crate::runner::analysis::variable::{
    ValueType, Variable, VariableId, VariableType, WithScope,
};
use crate::runner::analysis::Analysis;
use crate::runner::ds::error::CompileError;

/// A binding introduced inside a function body rather than hoisted to it.
enum LexicalEntry {
    Catch { name: String, variable: VariableId },
    With { variable: VariableId },
}

/// Resolution state for one function body on the marker's stack.
struct BlockManager {
    function_id: FunctionId,
    /// Catch and with scopes currently open in this body, outermost first.
    entries: Vec<LexicalEntry>,
}

fn is_restricted_name(name: &str) -> bool {
    name == "eval" || name == "arguments"
}

/// Classifies every identifier occurrence and records which variables nested
/// functions capture.
pub(crate) struct VariableMarker<'a> {
    analysis: &'a mut Analysis,
    stack: Vec<BlockManager>,
    next_synthetic_id: usize,
    force_strict: bool,
}

impl<'a> VariableMarker<'a> {
    pub(crate) fn new(analysis: &'a mut Analysis, force_strict: bool) -> Self {
        VariableMarker {
            analysis,
            stack: vec![],
            next_synthetic_id: 0,
            force_strict,
        }
    }

    pub(crate) fn mark_program(&mut self, program: &ProgramData) -> Result<(), CompileError> {
        {
            let block = &mut self.analysis.blocks[PROGRAM_FUNCTION_ID];
            block.strict = program.strict || self.force_strict;
            block.name = "%program".to_string();
        }
        self.stack.push(BlockManager {
            function_id: PROGRAM_FUNCTION_ID,
            entries: vec![],
        });
        for name in &program.body.declared_variables {
            self.declare_global(name);
        }
        for f in &program.body.hoisted_functions {
            let v = self.declare_global(f.name());
            if let Some(id) = &f.id {
                self.analysis.references.insert(id.id, v);
            }
        }
        self.mark_statements(&program.body.statements)?;
        self.stack.pop();
        Ok(())
    }

    fn current(&self) -> FunctionId {
        self.stack
            .last()
            .map(|m| m.function_id)
            .unwrap_or(PROGRAM_FUNCTION_ID)
    }

    fn is_strict(&self) -> bool {
        self.analysis.blocks[self.current()].strict
    }

    fn next_synthetic(&mut self) -> usize {
        self.next_synthetic_id += 1;
        self.next_synthetic_id
    }

    fn add_variable(&mut self, variable: Variable) -> VariableId {
        self.analysis.variables.push(variable);
        self.analysis.variables.len() - 1
    }

    fn declare(&mut self, block: FunctionId, name: &str, var_type: VariableType) -> VariableId {
        let id = self.add_variable(Variable::new(name, var_type, block));
        self.analysis.blocks[block].declared.insert(name, id);
        id
    }

    fn declare_global(&mut self, name: &str) -> VariableId {
        match self.analysis.blocks[PROGRAM_FUNCTION_ID].declared.get(name) {
            Some(v) => v,
            None => {
                trace!(name, "global declared");
                self.declare(PROGRAM_FUNCTION_ID, name, VariableType::Global)
            }
        }
    }

    fn capture(&mut self, variable: VariableId) {
        let v = &self.analysis.variables[variable];
        if !v.is_capturable() {
            return;
        }
        let block = v.block;
        let closed_over = &mut self.analysis.blocks[block].closed_over;
        if !closed_over.contains(&variable) {
            closed_over.push(variable);
            debug!(
                name = %self.analysis.variables[variable].name,
                block,
                "variable captured by a nested function"
            );
        }
    }

    /// Resolves `name` from the innermost open scope outwards. Catch and with scopes
    /// are searched before the hoisted declarations of the body that opened them.
    fn resolve(&mut self, name: &str) -> VariableId {
        let depth = self.stack.len();
        let mut withs: Vec<VariableId> = vec![];
        let mut found = None;
        'levels: for level in (0..depth).rev() {
            let manager = &self.stack[level];
            for entry in manager.entries.iter().rev() {
                match entry {
                    LexicalEntry::Catch {
                        name: catch_name,
                        variable,
                    } if catch_name == name => {
                        found = Some((level, *variable));
                        break 'levels;
                    }
                    LexicalEntry::With { variable } => withs.push(*variable),
                    LexicalEntry::Catch { .. } => {}
                }
            }
            if let Some(v) = self.analysis.blocks[manager.function_id].declared.get(name) {
                found = Some((level, v));
                break;
            }
        }
        let target = match found {
            Some((level, v)) => {
                if level + 1 < depth {
                    self.capture(v);
                }
                v
            }
            None => self.declare_global(name),
        };
        if withs.is_empty() {
            return target;
        }

        let current = self.current();
        for w in &withs {
            if self.analysis.variables[*w].block != current {
                self.capture(*w);
            }
        }
        let chain = withs.iter().rev().fold(None, |parent, w| {
            Some(Rc::new(WithScope {
                variable: *w,
                block: self.analysis.variables[*w].block,
                parent,
            }))
        });
        let mut variable = Variable::new(name, VariableType::WithScope, current);
        variable.fallback = Some(target);
        variable.with_scope = chain;
        trace!(name, depth = withs.len(), "identifier resolved through with scopes");
        self.add_variable(variable)
    }

    fn mark_identifier(&mut self, identifier: &IdentifierData) {
        let v = self.resolve(&identifier.name);
        self.analysis.references.insert(identifier.id, v);
    }

    fn mark_function(&mut self, f: &FunctionData) -> Result<(), CompileError> {
        let parent = self.current();
        let strict = f.strict || self.is_strict();
        if strict {
            if let Some(id) = &f.id {
                if is_restricted_name(&id.name) {
                    return Err(CompileError::RestrictedName(id.name.clone()));
                }
            }
            for (i, p) in f.params.iter().enumerate() {
                if is_restricted_name(&p.name) {
                    return Err(CompileError::RestrictedName(p.name.clone()));
                }
                if f.params[..i].iter().any(|q| q.name == p.name) {
                    return Err(CompileError::DuplicateParameter(p.name.clone()));
                }
            }
        }

        let fid = f.function_id;
        {
            let block = &mut self.analysis.blocks[fid];
            block.parent = Some(parent);
            block.strict = strict;
            block.name = f.name().to_string();
        }
        self.stack.push(BlockManager {
            function_id: fid,
            entries: vec![],
        });

        for (i, p) in f.params.iter().enumerate() {
            let v = match self.analysis.blocks[fid].declared.get(&p.name) {
                Some(v) => v,
                None => self.declare(fid, &p.name, VariableType::Parameter),
            };
            // A repeated name binds the last position.
            self.analysis.variables[v].index = Some(i);
            self.analysis.blocks[fid].params.push(v);
            self.analysis.references.insert(p.id, v);
        }
        if !self.analysis.blocks[fid].declared.contains("arguments") {
            let v = self.declare(fid, "arguments", VariableType::Arguments);
            self.analysis.blocks[fid].arguments = Some(v);
        }
        for name in &f.body.declared_variables {
            if !self.analysis.blocks[fid].declared.contains(name) {
                self.declare(fid, name, VariableType::Local);
            }
        }
        for inner in &f.body.hoisted_functions {
            let name = inner.name();
            let v = match self.analysis.blocks[fid].declared.get(name) {
                Some(v) => v,
                None => self.declare(fid, name, VariableType::Local),
            };
            if let Some(id) = &inner.id {
                self.analysis.references.insert(id.id, v);
            }
        }
        if f.is_expression {
            if let Some(id) = &f.id {
                if !self.analysis.blocks[fid].declared.contains(&id.name) {
                    let v = self.declare(fid, &id.name, VariableType::Local);
                    self.analysis.variables[v].value_type = ValueType::Object;
                    self.analysis.variables[v].immutable = true;
                    self.analysis.blocks[fid].self_binding = Some(v);
                    self.analysis.references.insert(id.id, v);
                }
            }
        }

        self.mark_statements(&f.body.statements)?;
        self.stack.pop();
        Ok(())
    }

    /// Function declarations are instantiated on entry to their enclosing body, so the
    /// catch and with scopes open at their source position are not visible to them.
    fn mark_hoisted_function(&mut self, f: &FunctionData) -> Result<(), CompileError> {
        let level = self.stack.len() - 1;
        let saved = std::mem::take(&mut self.stack[level].entries);
        let result = self.mark_function(f);
        self.stack[level].entries = saved;
        result
    }

    fn mark_statements(&mut self, statements: &[StatementType]) -> Result<(), CompileError> {
        for s in statements {
            self.mark_statement(s)?;
        }
        Ok(())
    }

    fn mark_variable_declaration(
        &mut self,
        declaration: &VariableDeclarationData,
    ) -> Result<(), CompileError> {
        for d in &declaration.declarations {
            self.mark_identifier(&d.id);
            if let Some(init) = &d.init {
                self.mark_expression(init)?;
            }
        }
        Ok(())
    }

    fn mark_statement(&mut self, statement: &StatementType) -> Result<(), CompileError> {
        match statement {
            StatementType::ExpressionStatement { expression, .. } => {
                self.mark_expression(expression)
            }
            StatementType::BlockStatement(b) => self.mark_statements(&b.body),
            StatementType::EmptyStatement { .. }
            | StatementType::DebuggerStatement { .. }
            | StatementType::BreakStatement { .. }
            | StatementType::ContinueStatement { .. } => Ok(()),
            StatementType::ReturnStatement { argument, .. } => match argument {
                Some(a) => self.mark_expression(a),
                None => Ok(()),
            },
            StatementType::LabeledStatement { body, .. } => self.mark_statement(body),
            StatementType::IfStatement {
                test,
                consequent,
                alternate,
                ..
            } => {
                self.mark_expression(test)?;
                self.mark_statement(consequent)?;
                if let Some(a) = alternate {
                    self.mark_statement(a)?;
                }
                Ok(())
            }
            StatementType::SwitchStatement {
                discriminant,
                cases,
                ..
            } => {
                self.mark_expression(discriminant)?;
                for case in cases {
                    if let Some(test) = &case.test {
                        self.mark_expression(test)?;
                    }
                    self.mark_statements(&case.consequent)?;
                }
                Ok(())
            }
            StatementType::ThrowStatement { argument, .. } => self.mark_expression(argument),
            StatementType::TryStatement {
                block,
                handler,
                finalizer,
                ..
            } => {
                self.mark_statements(&block.body)?;
                if let Some(handler) = handler {
                    self.mark_catch(&handler.param, &handler.body.body)?;
                }
                if let Some(f) = finalizer {
                    self.mark_statements(&f.body)?;
                }
                Ok(())
            }
            StatementType::WhileStatement { test, body, .. }
            | StatementType::DoWhileStatement { test, body, .. } => {
                self.mark_expression(test)?;
                self.mark_statement(body)
            }
            StatementType::ForStatement {
                init,
                test,
                update,
                body,
                ..
            } => {
                match init {
                    Some(VariableDeclarationOrExpression::VariableDeclaration(d)) => {
                        self.mark_variable_declaration(d)?
                    }
                    Some(VariableDeclarationOrExpression::Expression(e)) => {
                        self.mark_expression(e)?
                    }
                    None => {}
                }
                if let Some(test) = test {
                    self.mark_expression(test)?;
                }
                if let Some(update) = update {
                    self.mark_expression(update)?;
                }
                self.mark_statement(body)
            }
            StatementType::ForInStatement {
                left, right, body, ..
            } => {
                match left {
                    ForInTarget::VariableDeclaration(id) => self.mark_identifier(id),
                    ForInTarget::Expression(e) => self.mark_expression(e)?,
                }
                self.mark_expression(right)?;
                self.mark_statement(body)
            }
            StatementType::WithStatement {
                id, object, body, ..
            } => self.mark_with(*id, object, body),
            StatementType::VariableDeclaration(d) => self.mark_variable_declaration(d),
            StatementType::FunctionDeclaration(f) => self.mark_hoisted_function(f),
        }
    }

    fn mark_catch(
        &mut self,
        param: &IdentifierData,
        body: &[StatementType],
    ) -> Result<(), CompileError> {
        if self.is_strict() && is_restricted_name(&param.name) {
            return Err(CompileError::RestrictedName(param.name.clone()));
        }
        let current = self.current();
        let n = self.next_synthetic();
        let mut variable = Variable::new(&param.name, VariableType::Local, current);
        variable.storage_name = format!("%catch{}", n);
        let v = self.add_variable(variable);
        self.analysis.blocks[current].synthetic.push(v);
        self.analysis.references.insert(param.id, v);

        let level = self.stack.len() - 1;
        self.stack[level].entries.push(LexicalEntry::Catch {
            name: param.name.clone(),
            variable: v,
        });
        let result = self.mark_statements(body);
        self.stack[level].entries.pop();
        result
    }

    fn mark_with(
        &mut self,
        id: NodeId,
        object: &ExpressionType,
        body: &StatementType,
    ) -> Result<(), CompileError> {
        if self.is_strict() {
            return Err(CompileError::WithInStrictMode);
        }
        self.mark_expression(object)?;
        let current = self.current();
        let n = self.next_synthetic();
        let name = format!("%with{}", n);
        let mut variable = Variable::new(&name, VariableType::Local, current);
        variable.value_type = ValueType::Object;
        let v = self.add_variable(variable);
        self.analysis.blocks[current].synthetic.push(v);
        self.analysis.with_variables.insert(id, v);
        trace!(%name, block = current, "with scope opened");

        let level = self.stack.len() - 1;
        self.stack[level]
            .entries
            .push(LexicalEntry::With { variable: v });
        let result = self.mark_statement(body);
        self.stack[level].entries.pop();
        result
    }

    fn check_assignment_target(&self, target: &ExpressionType) -> Result<(), CompileError> {
        if let ExpressionType::Identifier(id) = target {
            if self.is_strict() && is_restricted_name(&id.name) {
                return Err(CompileError::RestrictedName(id.name.clone()));
            }
        }
        Ok(())
    }

    fn mark_expressions(&mut self, expressions: &[ExpressionType]) -> Result<(), CompileError> {
        for e in expressions {
            self.mark_expression(e)?;
        }
        Ok(())
    }

    fn mark_expression(&mut self, expression: &ExpressionType) -> Result<(), CompileError> {
        match expression {
            ExpressionType::Literal(_) | ExpressionType::ThisExpression { .. } => Ok(()),
            ExpressionType::Identifier(id) => {
                self.mark_identifier(id);
                Ok(())
            }
            ExpressionType::ArrayExpression { elements, .. } => {
                for e in elements.iter().flatten() {
                    self.mark_expression(e)?;
                }
                Ok(())
            }
            ExpressionType::ObjectExpression { properties, .. } => {
                for p in properties {
                    self.mark_expression(&p.value)?;
                }
                Ok(())
            }
            ExpressionType::FunctionExpression(f) => self.mark_function(f),
            ExpressionType::UnaryExpression {
                operator, argument, ..
            } => {
                if let (UnaryOperator::Delete, ExpressionType::Identifier(id)) =
                    (operator, argument.as_ref())
                {
                    if self.is_strict() {
                        return Err(CompileError::DeleteOfIdentifier(id.name.clone()));
                    }
                }
                self.mark_expression(argument)
            }
            ExpressionType::UpdateExpression { argument, .. } => {
                self.check_assignment_target(argument)?;
                self.mark_expression(argument)
            }
            ExpressionType::BinaryExpression { left, right, .. }
            | ExpressionType::LogicalExpression { left, right, .. } => {
                self.mark_expression(left)?;
                self.mark_expression(right)
            }
            ExpressionType::AssignmentExpression { left, right, .. } => {
                self.check_assignment_target(left)?;
                self.mark_expression(left)?;
                self.mark_expression(right)
            }
            ExpressionType::ConditionalExpression {
                test,
                consequent,
                alternate,
                ..
            } => {
                self.mark_expression(test)?;
                self.mark_expression(consequent)?;
                self.mark_expression(alternate)
            }
            ExpressionType::CallExpression {
                callee, arguments, ..
            }
            | ExpressionType::NewExpression {
                callee, arguments, ..
            } => {
                self.mark_expression(callee)?;
                self.mark_expressions(arguments)
            }
            ExpressionType::SequenceExpression { expressions, .. } => {
                self.mark_expressions(expressions)
            }
            ExpressionType::MemberExpression(m) => match m {
                MemberExpressionType::SimpleMemberExpression { object, .. } => {
                    self.mark_expression(object)
                }
                MemberExpressionType::ComputedMemberExpression {
                    object, property, ..
                } => {
                    self.mark_expression(object)?;
                    self.mark_expression(property)
                }
            },
        }
    }
}
