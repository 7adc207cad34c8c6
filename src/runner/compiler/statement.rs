use crate::parser::ast::{
    BinaryOperator, CatchClauseData, ExpressionType, ForInTarget, StatementType,
    SwitchCaseData, VariableDeclarationData, VariableDeclarationOrExpression,
};
use crate::runner::compiler::code::{Code, Completion, StatementCode, TargetId, TypedCode};
use crate::runner::compiler::expression::Writer;
use crate::runner::compiler::operators::specialize_binary;
use crate::runner::compiler::scope::TargetKind;
use crate::runner::compiler::FunctionCompiler;
use crate::runner::ds::error::{CompileError, JErrorType};
use crate::runner::ds::operations::object::{enumerate_keys, has_property};
use crate::runner::ds::operations::type_conversion::to_object;
use crate::runner::ds::value::JsValue;

enum Flow {
    Next,
    Exit,
    Propagate(Completion),
}

/// What a loop does after one run of its body.
fn loop_flow(completion: Completion, id: TargetId) -> Flow {
    match completion {
        Completion::Normal => Flow::Next,
        Completion::Continue(t) if t == id => Flow::Next,
        Completion::Break(t) if t == id => Flow::Exit,
        other => Flow::Propagate(other),
    }
}

fn normal() -> StatementCode {
    Box::new(|_| Ok(Completion::Normal))
}

fn block(mut codes: Vec<StatementCode>) -> StatementCode {
    match codes.len() {
        0 => normal(),
        1 => codes.remove(0),
        _ => Box::new(move |a| {
            for c in &codes {
                match c(a)? {
                    Completion::Normal => {}
                    abrupt => return Ok(abrupt),
                }
            }
            Ok(Completion::Normal)
        }),
    }
}

fn effect(code: Code<()>) -> StatementCode {
    Box::new(move |a| {
        code(a)?;
        Ok(Completion::Normal)
    })
}

fn is_breakable(statement: &StatementType) -> bool {
    matches!(
        statement,
        StatementType::WhileStatement { .. }
            | StatementType::DoWhileStatement { .. }
            | StatementType::ForStatement { .. }
            | StatementType::ForInStatement { .. }
            | StatementType::SwitchStatement { .. }
            | StatementType::LabeledStatement { .. }
    )
}

impl<'a> FunctionCompiler<'a> {
    pub(crate) fn compile_statements(&mut self, statements: &[StatementType]) -> Result<StatementCode, CompileError> {
        let mut codes = vec![];
        for s in statements {
            if matches!(
                s,
                StatementType::FunctionDeclaration(_) | StatementType::EmptyStatement { .. }
            ) {
                continue;
            }
            codes.push(self.compile_statement(s)?);
        }
        Ok(block(codes))
    }

    fn compile_declaration(&mut self, d: &VariableDeclarationData) -> Result<Code<()>, CompileError> {
        let strict = self.scope.strict;
        let mut stores = vec![];
        for declarator in &d.declarations {
            if let Some(init) = &declarator.init {
                let access = self.identifier_access(&declarator.id)?;
                let value = self.compile_expression(init)?;
                stores.push(access.store(value, strict)?.into_effect());
            }
        }
        Ok(Box::new(move |a| {
            for s in &stores {
                s(a)?;
            }
            Ok(())
        }))
    }

    fn compile_statement(&mut self, statement: &StatementType) -> Result<StatementCode, CompileError> {
        Ok(match statement {
            StatementType::ExpressionStatement { expression, .. } => {
                if self.scope.is_program {
                    let code = self.compile_expression(expression)?.into_boxed();
                    Box::new(move |a| {
                        a.completion_value = code(a)?;
                        Ok(Completion::Normal)
                    })
                } else {
                    effect(self.compile_expression(expression)?.into_effect())
                }
            }
            StatementType::BlockStatement(b) => self.compile_statements(&b.body)?,
            StatementType::EmptyStatement { .. }
            | StatementType::DebuggerStatement { .. }
            | StatementType::FunctionDeclaration(_) => normal(),
            StatementType::VariableDeclaration(d) => effect(self.compile_declaration(d)?),
            StatementType::ReturnStatement { argument, .. } => {
                if self.scope.is_program {
                    return Err(CompileError::IllegalReturn);
                }
                match argument {
                    Some(e) => {
                        let code = self.compile_expression(e)?.into_boxed();
                        Box::new(move |a| Ok(Completion::Return(code(a)?)))
                    }
                    None => Box::new(|_| Ok(Completion::Return(JsValue::Undefined))),
                }
            }
            StatementType::BreakStatement { label, .. } => {
                let id = self.scope.break_target(label.as_deref())?;
                Box::new(move |_| Ok(Completion::Break(id)))
            }
            StatementType::ContinueStatement { label, .. } => {
                let id = self.scope.continue_target(label.as_deref())?;
                Box::new(move |_| Ok(Completion::Continue(id)))
            }
            StatementType::LabeledStatement { label, body, .. } => {
                self.scope.add_pending_label(label)?;
                if is_breakable(body) {
                    self.compile_statement(body)?
                } else {
                    let id = self.scope.push_target(TargetKind::Labeled);
                    let body = self.compile_statement(body);
                    self.scope.pop_target();
                    let body = body?;
                    Box::new(move |a| match body(a)? {
                        Completion::Break(t) if t == id => Ok(Completion::Normal),
                        other => Ok(other),
                    })
                }
            }
            StatementType::IfStatement {
                test,
                consequent,
                alternate,
                ..
            } => {
                let test = self.compile_expression(test)?.into_boolean();
                let consequent = self.compile_statement(consequent)?;
                match alternate {
                    Some(alt) => {
                        let alternate = self.compile_statement(alt)?;
                        Box::new(move |a| {
                            if test(a)? {
                                consequent(a)
                            } else {
                                alternate(a)
                            }
                        })
                    }
                    None => Box::new(move |a| {
                        if test(a)? {
                            consequent(a)
                        } else {
                            Ok(Completion::Normal)
                        }
                    }),
                }
            }
            StatementType::SwitchStatement {
                discriminant,
                cases,
                ..
            } => self.compile_switch(discriminant, cases)?,
            StatementType::ThrowStatement { argument, .. } => {
                let code = self.compile_expression(argument)?.into_boxed();
                Box::new(move |a| Err(JErrorType::Thrown(code(a)?)))
            }
            StatementType::TryStatement {
                block,
                handler,
                finalizer,
                ..
            } => self.compile_try(&block.body, handler.as_ref(), finalizer.as_ref().map(|f| &f.body[..]))?,
            StatementType::WhileStatement { test, body, .. } => {
                let id = self.scope.push_target(TargetKind::Loop);
                let compiled = self.compile_while(test, body);
                self.scope.pop_target();
                let (test, body) = compiled?;
                Box::new(move |a| {
                    while test(a)? {
                        match loop_flow(body(a)?, id) {
                            Flow::Next => {}
                            Flow::Exit => break,
                            Flow::Propagate(c) => return Ok(c),
                        }
                    }
                    Ok(Completion::Normal)
                })
            }
            StatementType::DoWhileStatement { test, body, .. } => {
                let id = self.scope.push_target(TargetKind::Loop);
                let compiled = self.compile_while(test, body);
                self.scope.pop_target();
                let (test, body) = compiled?;
                Box::new(move |a| {
                    loop {
                        match loop_flow(body(a)?, id) {
                            Flow::Next => {}
                            Flow::Exit => break,
                            Flow::Propagate(c) => return Ok(c),
                        }
                        if !test(a)? {
                            break;
                        }
                    }
                    Ok(Completion::Normal)
                })
            }
            StatementType::ForStatement {
                init,
                test,
                update,
                body,
                ..
            } => {
                let id = self.scope.push_target(TargetKind::Loop);
                let compiled = self.compile_for(init.as_ref(), test.as_deref(), update.as_deref(), body);
                self.scope.pop_target();
                let (init, test, update, body) = compiled?;
                Box::new(move |a| {
                    if let Some(init) = &init {
                        init(a)?;
                    }
                    loop {
                        if let Some(test) = &test {
                            if !test(a)? {
                                break;
                            }
                        }
                        match loop_flow(body(a)?, id) {
                            Flow::Next => {}
                            Flow::Exit => break,
                            Flow::Propagate(c) => return Ok(c),
                        }
                        if let Some(update) = &update {
                            update(a)?;
                        }
                    }
                    Ok(Completion::Normal)
                })
            }
            StatementType::ForInStatement {
                left, right, body, ..
            } => {
                let id = self.scope.push_target(TargetKind::Loop);
                let compiled = self.compile_for_in(left, right, body);
                self.scope.pop_target();
                let (writer, right, body) = compiled?;
                Box::new(move |a| {
                    let v = right(a)?;
                    if v.is_nullish() {
                        return Ok(Completion::Normal);
                    }
                    let o = match to_object(&a.realm, &v)? {
                        JsValue::Object(o) => o,
                        _ => return Ok(Completion::Normal),
                    };
                    for key in enumerate_keys(&o) {
                        // Keys deleted by earlier iterations are skipped.
                        if !has_property(&o, &key) {
                            continue;
                        }
                        writer(a, JsValue::from_str(&key))?;
                        match loop_flow(body(a)?, id) {
                            Flow::Next => {}
                            Flow::Exit => break,
                            Flow::Propagate(c) => return Ok(c),
                        }
                    }
                    Ok(Completion::Normal)
                })
            }
            StatementType::WithStatement {
                id, object, body, ..
            } => {
                let strict = self.scope.strict;
                let variable = self.analysis.with_variable(*id)?;
                let access = self.scope.access(variable)?;
                let object = self.compile_expression(object)?.into_boxed();
                let target = TypedCode::Boxed(Box::new(move |a| {
                    let v = object(a)?;
                    to_object(&a.realm, &v)
                }));
                let enter = access.store(target, strict)?.into_effect();
                let body = self.compile_statement(body)?;
                Box::new(move |a| {
                    enter(a)?;
                    body(a)
                })
            }
        })
    }

    fn compile_while(
        &mut self,
        test: &ExpressionType,
        body: &StatementType,
    ) -> Result<(Code<bool>, StatementCode), CompileError> {
        let test = self.compile_expression(test)?.into_boolean();
        let body = self.compile_statement(body)?;
        Ok((test, body))
    }

    #[allow(clippy::type_complexity)]
    fn compile_for(
        &mut self,
        init: Option<&VariableDeclarationOrExpression>,
        test: Option<&ExpressionType>,
        update: Option<&ExpressionType>,
        body: &StatementType,
    ) -> Result<(Option<Code<()>>, Option<Code<bool>>, Option<Code<()>>, StatementCode), CompileError> {
        let init = match init {
            Some(VariableDeclarationOrExpression::VariableDeclaration(d)) => {
                Some(self.compile_declaration(d)?)
            }
            Some(VariableDeclarationOrExpression::Expression(e)) => {
                Some(self.compile_expression(e)?.into_effect())
            }
            None => None,
        };
        let test = match test {
            Some(t) => Some(self.compile_expression(t)?.into_boolean()),
            None => None,
        };
        let update = match update {
            Some(u) => Some(self.compile_expression(u)?.into_effect()),
            None => None,
        };
        let body = self.compile_statement(body)?;
        Ok((init, test, update, body))
    }

    fn compile_for_in(
        &mut self,
        left: &ForInTarget,
        right: &ExpressionType,
        body: &StatementType,
    ) -> Result<(Writer, Code<JsValue>, StatementCode), CompileError> {
        let strict = self.scope.strict;
        let writer: Writer = match left {
            ForInTarget::VariableDeclaration(id) => {
                let access = self.identifier_access(id)?;
                Box::new(move |a, v| access.write(a, v, strict))
            }
            ForInTarget::Expression(e) => self.compile_reference_writer(e)?,
        };
        let right = self.compile_expression(right)?.into_boxed();
        let body = self.compile_statement(body)?;
        Ok((writer, right, body))
    }

    fn compile_switch(
        &mut self,
        discriminant: &ExpressionType,
        cases: &[SwitchCaseData],
    ) -> Result<StatementCode, CompileError> {
        let discriminant = self.compile_expression(discriminant)?.into_boxed();
        let id = self.scope.push_target(TargetKind::Switch);
        let compiled = self.compile_cases(cases);
        self.scope.pop_target();
        let (slot, tests, default, bodies) = compiled?;
        Ok(Box::new(move |a| {
            a.values[slot] = discriminant(a)?;
            let mut start = None;
            for (i, test) in &tests {
                if test(a)? {
                    start = Some(*i);
                    break;
                }
            }
            let start = match start.or(default) {
                Some(s) => s,
                None => return Ok(Completion::Normal),
            };
            for body in &bodies[start..] {
                match body(a)? {
                    Completion::Normal => {}
                    Completion::Break(t) if t == id => break,
                    abrupt => return Ok(abrupt),
                }
            }
            Ok(Completion::Normal)
        }))
    }

    #[allow(clippy::type_complexity)]
    fn compile_cases(
        &mut self,
        cases: &[SwitchCaseData],
    ) -> Result<(usize, Vec<(usize, Code<bool>)>, Option<usize>, Vec<StatementCode>), CompileError> {
        let slot = self.scope.temp_value().index;
        let mut tests = vec![];
        let mut default = None;
        let mut bodies = vec![];
        for (i, case) in cases.iter().enumerate() {
            match &case.test {
                Some(test) => {
                    let value = TypedCode::Boxed(Box::new(move |a| Ok(a.values[slot].clone())));
                    let test = self.compile_expression(test)?;
                    tests.push((
                        i,
                        specialize_binary(BinaryOperator::StrictlyEqual, value, test).into_boolean(),
                    ));
                }
                None => default = Some(i),
            }
            bodies.push(self.compile_statements(&case.consequent)?);
        }
        Ok((slot, tests, default, bodies))
    }

    fn compile_try(
        &mut self,
        block: &[StatementType],
        handler: Option<&CatchClauseData>,
        finalizer: Option<&[StatementType]>,
    ) -> Result<StatementCode, CompileError> {
        let strict = self.scope.strict;
        let block = self.compile_statements(block)?;
        let handler = match handler {
            Some(h) => {
                let access = self.identifier_access(&h.param)?;
                Some((access, self.compile_statements(&h.body.body)?))
            }
            None => None,
        };
        let finalizer = match finalizer {
            Some(f) => Some(self.compile_statements(f)?),
            None => None,
        };
        Ok(Box::new(move |a| {
            let mut result = block(a);
            if let Some((access, body)) = &handler {
                if let Err(e) = result {
                    let v = a.realm.error_to_value(e);
                    result = match access.write(a, v, strict) {
                        Ok(()) => body(a),
                        Err(e) => Err(e),
                    };
                }
            }
            if let Some(finalizer) = &finalizer {
                // Only an abrupt finally overrides the try/catch outcome.
                match finalizer(a)? {
                    Completion::Normal => {}
                    abrupt => return Ok(abrupt),
                }
            }
            result
        }))
    }
}
