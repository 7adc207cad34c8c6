use tracing::{debug, trace};

use crate::parser::ast::{
    AssignmentOperator, BinaryOperator, ExpressionType, ForInTarget, FunctionBodyData,
    IdentifierData, LiteralType, LogicalOperator, MemberExpressionType, ProgramData,
    StatementType, UnaryOperator, VariableDeclarationData, VariableDeclarationOrExpression,
};
use crate::runner::analysis::variable::{ValueType, VariableId, VariableType};
use crate::runner::analysis::Analysis;

pub fn literal_type(literal: &LiteralType) -> ValueType {
    match literal {
        LiteralType::NullLiteral => ValueType::Unknown,
        LiteralType::BooleanLiteral(_) => ValueType::Boolean,
        LiteralType::StringLiteral(_) => ValueType::String,
        LiteralType::NumberLiteral(_) => ValueType::Double,
        LiteralType::RegExpLiteral(_) => ValueType::Object,
    }
}

fn is_numeric(t: ValueType) -> bool {
    matches!(t, ValueType::Double | ValueType::Boolean)
}

/// Static result type of a binary operator given its operand types.
pub fn binary_result_type(operator: BinaryOperator, left: ValueType, right: ValueType) -> ValueType {
    match operator {
        BinaryOperator::Add => {
            if left == ValueType::String || right == ValueType::String {
                ValueType::String
            } else if is_numeric(left) && is_numeric(right) {
                ValueType::Double
            } else {
                ValueType::Unknown
            }
        }
        BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Modulo
        | BinaryOperator::BitwiseLeftShift
        | BinaryOperator::BitwiseRightShift
        | BinaryOperator::BitwiseUnsignedRightShift
        | BinaryOperator::BitwiseOr
        | BinaryOperator::BitwiseXor
        | BinaryOperator::BitwiseAnd => ValueType::Double,
        BinaryOperator::LooselyEqual
        | BinaryOperator::LooselyUnequal
        | BinaryOperator::StrictlyEqual
        | BinaryOperator::StrictlyUnequal
        | BinaryOperator::LessThan
        | BinaryOperator::LessThanEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterThanEqual
        | BinaryOperator::In
        | BinaryOperator::InstanceOf => ValueType::Boolean,
    }
}

pub fn unary_result_type(operator: UnaryOperator) -> ValueType {
    match operator {
        UnaryOperator::Minus | UnaryOperator::Plus | UnaryOperator::BitwiseNot => ValueType::Double,
        UnaryOperator::LogicalNot | UnaryOperator::Delete => ValueType::Boolean,
        UnaryOperator::TypeOf => ValueType::String,
        UnaryOperator::Void => ValueType::Unknown,
    }
}

/// Both sides agree, or the result is dynamic.
pub fn join_type(a: ValueType, b: ValueType) -> ValueType {
    if a == b {
        a
    } else {
        ValueType::Unknown
    }
}

/// Infers a value type per variable so the compiler can keep locals unboxed.
///
/// A local narrows to a concrete type only when its first write is an unconditional
/// statement at the top of its own function body and every later write agrees.
/// The traversal repeats until nothing changes, so a variable typed from another
/// variable sees that variable's final type.
pub(crate) fn mark_types(analysis: &mut Analysis, program: &ProgramData) {
    seed(analysis, program);
    let mut marker = TypeMarker {
        analysis,
        changed: true,
    };
    let mut passes = 0;
    while marker.changed {
        marker.changed = false;
        passes += 1;
        marker.visit_body(&program.body);
        trace!(passes, changed = marker.changed, "type marking pass");
    }
    for v in analysis.variables.iter_mut() {
        v.value_type = v.value_type.or_unknown();
    }
    debug!(passes, "type marking converged");
}

/// Without specialization every variable is boxed.
pub(crate) fn mark_all_unknown(analysis: &mut Analysis) {
    for v in analysis.variables.iter_mut() {
        v.value_type = ValueType::Unknown;
    }
}

fn seed(analysis: &mut Analysis, program: &ProgramData) {
    let fallbacks: Vec<VariableId> = analysis
        .variables
        .iter()
        .filter_map(|v| v.fallback)
        .collect();
    for v in analysis.variables.iter_mut() {
        let dynamic = match v.var_type {
            VariableType::Local => v.is_captured(),
            _ => true,
        };
        if dynamic {
            v.value_type = ValueType::Unknown;
        }
    }
    for f in fallbacks {
        analysis.variables[f].value_type = ValueType::Unknown;
    }
    for block in analysis.blocks.iter() {
        for s in &block.synthetic {
            let v = &mut analysis.variables[*s];
            // With targets were seeded `Object` when declared; the rest are catch bindings.
            if v.value_type == ValueType::Unset {
                v.value_type = ValueType::Unknown;
            }
        }
    }
    seed_hoisted_functions(analysis, &program.body);
}

fn seed_hoisted_functions(analysis: &mut Analysis, body: &FunctionBodyData) {
    for f in &body.hoisted_functions {
        if let Some(id) = &f.id {
            if let Some(v) = analysis.references.get(&id.id).copied() {
                let variable = &mut analysis.variables[v];
                if variable.value_type == ValueType::Unset {
                    variable.value_type = ValueType::Object;
                }
            }
        }
        seed_hoisted_functions(analysis, &f.body);
    }
    for s in &body.statements {
        seed_nested_expressions(analysis, s);
    }
}

/// Function expressions can declare functions too.
fn seed_nested_expressions(analysis: &mut Analysis, statement: &StatementType) {
    let mut functions = vec![];
    collect_function_expressions_in_statement(statement, &mut functions);
    for f in functions {
        seed_hoisted_functions(analysis, f);
    }
}

fn collect_function_expressions_in_statement<'s>(
    statement: &'s StatementType,
    out: &mut Vec<&'s FunctionBodyData>,
) {
    let mut expressions: Vec<&'s ExpressionType> = vec![];
    let mut statements: Vec<&'s StatementType> = vec![];
    match statement {
        StatementType::ExpressionStatement { expression, .. }
        | StatementType::ThrowStatement {
            argument: expression,
            ..
        } => expressions.push(expression),
        StatementType::ReturnStatement { argument, .. } => {
            expressions.extend(argument.as_deref());
        }
        StatementType::BlockStatement(b) => statements.extend(b.body.iter()),
        StatementType::LabeledStatement { body, .. } => statements.push(body),
        StatementType::IfStatement {
            test,
            consequent,
            alternate,
            ..
        } => {
            expressions.push(test);
            statements.push(consequent);
            statements.extend(alternate.as_deref());
        }
        StatementType::SwitchStatement {
            discriminant,
            cases,
            ..
        } => {
            expressions.push(discriminant);
            for c in cases {
                expressions.extend(c.test.as_ref());
                statements.extend(c.consequent.iter());
            }
        }
        StatementType::TryStatement {
            block,
            handler,
            finalizer,
            ..
        } => {
            statements.extend(block.body.iter());
            if let Some(h) = handler {
                statements.extend(h.body.body.iter());
            }
            if let Some(f) = finalizer {
                statements.extend(f.body.iter());
            }
        }
        StatementType::WhileStatement { test, body, .. }
        | StatementType::DoWhileStatement { test, body, .. } => {
            expressions.push(test);
            statements.push(body);
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
                    expressions.extend(d.declarations.iter().filter_map(|d| d.init.as_ref()))
                }
                Some(VariableDeclarationOrExpression::Expression(e)) => expressions.push(e),
                None => {}
            }
            expressions.extend(test.as_deref());
            expressions.extend(update.as_deref());
            statements.push(body);
        }
        StatementType::ForInStatement {
            left, right, body, ..
        } => {
            if let ForInTarget::Expression(e) = left {
                expressions.push(e);
            }
            expressions.push(right);
            statements.push(body);
        }
        StatementType::WithStatement { object, body, .. } => {
            expressions.push(object);
            statements.push(body);
        }
        StatementType::VariableDeclaration(d) => {
            expressions.extend(d.declarations.iter().filter_map(|d| d.init.as_ref()))
        }
        StatementType::EmptyStatement { .. }
        | StatementType::DebuggerStatement { .. }
        | StatementType::BreakStatement { .. }
        | StatementType::ContinueStatement { .. }
        | StatementType::FunctionDeclaration(_) => {}
    }
    for s in statements {
        collect_function_expressions_in_statement(s, out);
    }
    for e in expressions {
        collect_function_expressions(e, out);
    }
}

fn collect_function_expressions<'s>(
    expression: &'s ExpressionType,
    out: &mut Vec<&'s FunctionBodyData>,
) {
    match expression {
        ExpressionType::FunctionExpression(f) => out.push(&f.body),
        ExpressionType::Literal(_)
        | ExpressionType::Identifier(_)
        | ExpressionType::ThisExpression { .. } => {}
        ExpressionType::ArrayExpression { elements, .. } => {
            for e in elements.iter().flatten() {
                collect_function_expressions(e, out);
            }
        }
        ExpressionType::ObjectExpression { properties, .. } => {
            for p in properties {
                collect_function_expressions(&p.value, out);
            }
        }
        ExpressionType::UnaryExpression { argument, .. }
        | ExpressionType::UpdateExpression { argument, .. } => {
            collect_function_expressions(argument, out)
        }
        ExpressionType::BinaryExpression { left, right, .. }
        | ExpressionType::LogicalExpression { left, right, .. }
        | ExpressionType::AssignmentExpression { left, right, .. } => {
            collect_function_expressions(left, out);
            collect_function_expressions(right, out);
        }
        ExpressionType::ConditionalExpression {
            test,
            consequent,
            alternate,
            ..
        } => {
            collect_function_expressions(test, out);
            collect_function_expressions(consequent, out);
            collect_function_expressions(alternate, out);
        }
        ExpressionType::CallExpression {
            callee, arguments, ..
        }
        | ExpressionType::NewExpression {
            callee, arguments, ..
        } => {
            collect_function_expressions(callee, out);
            for a in arguments {
                collect_function_expressions(a, out);
            }
        }
        ExpressionType::SequenceExpression { expressions, .. } => {
            for e in expressions {
                collect_function_expressions(e, out);
            }
        }
        ExpressionType::MemberExpression(m) => match m {
            MemberExpressionType::SimpleMemberExpression { object, .. } => {
                collect_function_expressions(object, out)
            }
            MemberExpressionType::ComputedMemberExpression {
                object, property, ..
            } => {
                collect_function_expressions(object, out);
                collect_function_expressions(property, out);
            }
        },
    }
}

struct TypeMarker<'a> {
    analysis: &'a mut Analysis,
    changed: bool,
}

impl<'a> TypeMarker<'a> {
    fn variable_of(&self, identifier: &IdentifierData) -> Option<VariableId> {
        self.analysis.references.get(&identifier.id).copied()
    }

    fn set(&mut self, variable: VariableId, value_type: ValueType) {
        let v = &mut self.analysis.variables[variable];
        if v.value_type != value_type {
            trace!(name = %v.name, from = ?v.value_type, to = ?value_type, "variable type widened");
            v.value_type = value_type;
            self.changed = true;
        }
    }

    fn read(&mut self, variable: VariableId) -> ValueType {
        let current = self.analysis.variables[variable].value_type;
        if current == ValueType::Unset {
            self.set(variable, ValueType::Unknown);
            return ValueType::Unknown;
        }
        current
    }

    fn write(&mut self, variable: VariableId, value_type: ValueType, unconditional: bool) {
        let current = self.analysis.variables[variable].value_type;
        let next = match current {
            ValueType::Unset if unconditional => value_type.or_unknown(),
            ValueType::Unset => ValueType::Unknown,
            _ => current.merge(value_type),
        };
        self.set(variable, next);
    }

    fn write_identifier(&mut self, identifier: &IdentifierData, value_type: ValueType, unconditional: bool) {
        if let Some(v) = self.variable_of(identifier) {
            self.write(v, value_type, unconditional);
        }
    }

    fn visit_body(&mut self, body: &FunctionBodyData) {
        for s in &body.statements {
            self.visit_statement(s, true);
        }
    }

    fn visit_statements(&mut self, statements: &[StatementType]) {
        for s in statements {
            self.visit_statement(s, false);
        }
    }

    fn visit_variable_declaration(&mut self, d: &VariableDeclarationData, top_level: bool) {
        for declarator in &d.declarations {
            if let Some(init) = &declarator.init {
                let t = self.visit_expression(init);
                self.write_identifier(&declarator.id, t, top_level);
            }
        }
    }

    /// `x = e;` as a whole statement at the top of a body is the one unconditional write.
    fn visit_top_level_expression(&mut self, expression: &ExpressionType) {
        if let ExpressionType::AssignmentExpression {
            operator: AssignmentOperator::Equals,
            left,
            right,
            ..
        } = expression
        {
            if let ExpressionType::Identifier(id) = left.as_ref() {
                let t = self.visit_expression(right);
                self.write_identifier(id, t, true);
                return;
            }
        }
        self.visit_expression(expression);
    }

    fn visit_statement(&mut self, statement: &StatementType, top_level: bool) {
        match statement {
            StatementType::ExpressionStatement { expression, .. } => {
                if top_level {
                    self.visit_top_level_expression(expression);
                } else {
                    self.visit_expression(expression);
                }
            }
            StatementType::BlockStatement(b) => self.visit_statements(&b.body),
            StatementType::EmptyStatement { .. }
            | StatementType::DebuggerStatement { .. }
            | StatementType::BreakStatement { .. }
            | StatementType::ContinueStatement { .. } => {}
            StatementType::ReturnStatement { argument, .. } => {
                if let Some(a) = argument {
                    self.visit_expression(a);
                }
            }
            StatementType::ThrowStatement { argument, .. } => {
                self.visit_expression(argument);
            }
            StatementType::LabeledStatement { body, .. } => self.visit_statement(body, false),
            StatementType::IfStatement {
                test,
                consequent,
                alternate,
                ..
            } => {
                self.visit_expression(test);
                self.visit_statement(consequent, false);
                if let Some(a) = alternate {
                    self.visit_statement(a, false);
                }
            }
            StatementType::SwitchStatement {
                discriminant,
                cases,
                ..
            } => {
                self.visit_expression(discriminant);
                for c in cases {
                    if let Some(test) = &c.test {
                        self.visit_expression(test);
                    }
                    self.visit_statements(&c.consequent);
                }
            }
            StatementType::TryStatement {
                block,
                handler,
                finalizer,
                ..
            } => {
                self.visit_statements(&block.body);
                if let Some(h) = handler {
                    self.visit_statements(&h.body.body);
                }
                if let Some(f) = finalizer {
                    self.visit_statements(&f.body);
                }
            }
            StatementType::WhileStatement { test, body, .. } => {
                self.visit_expression(test);
                self.visit_statement(body, false);
            }
            StatementType::DoWhileStatement { test, body, .. } => {
                self.visit_statement(body, false);
                self.visit_expression(test);
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
                        self.visit_variable_declaration(d, top_level)
                    }
                    Some(VariableDeclarationOrExpression::Expression(e)) => {
                        if top_level {
                            self.visit_top_level_expression(e);
                        } else {
                            self.visit_expression(e);
                        }
                    }
                    None => {}
                }
                if let Some(test) = test {
                    self.visit_expression(test);
                }
                self.visit_statement(body, false);
                if let Some(update) = update {
                    self.visit_expression(update);
                }
            }
            StatementType::ForInStatement {
                left, right, body, ..
            } => {
                self.visit_expression(right);
                match left {
                    ForInTarget::VariableDeclaration(id) => {
                        self.write_identifier(id, ValueType::String, false)
                    }
                    ForInTarget::Expression(e) => self.visit_assignment_target(e, ValueType::String),
                }
                self.visit_statement(body, false);
            }
            StatementType::WithStatement { object, body, .. } => {
                self.visit_expression(object);
                self.visit_statement(body, false);
            }
            StatementType::VariableDeclaration(d) => self.visit_variable_declaration(d, top_level),
            StatementType::FunctionDeclaration(f) => self.visit_body(&f.body),
        }
    }

    /// A conditional write of `value_type` into a reference expression.
    fn visit_assignment_target(&mut self, target: &ExpressionType, value_type: ValueType) {
        match target {
            ExpressionType::Identifier(id) => self.write_identifier(id, value_type, false),
            other => {
                self.visit_expression(other);
            }
        }
    }

    fn visit_expression(&mut self, expression: &ExpressionType) -> ValueType {
        match expression {
            ExpressionType::Literal(l) => literal_type(&l.value),
            ExpressionType::Identifier(id) => match self.variable_of(id) {
                Some(v) => self.read(v),
                None => ValueType::Unknown,
            },
            ExpressionType::ThisExpression { .. } => ValueType::Unknown,
            ExpressionType::ArrayExpression { elements, .. } => {
                for e in elements.iter().flatten() {
                    self.visit_expression(e);
                }
                ValueType::Object
            }
            ExpressionType::ObjectExpression { properties, .. } => {
                for p in properties {
                    self.visit_expression(&p.value);
                }
                ValueType::Object
            }
            ExpressionType::FunctionExpression(f) => {
                self.visit_body(&f.body);
                ValueType::Object
            }
            ExpressionType::UnaryExpression {
                operator, argument, ..
            } => {
                self.visit_expression(argument);
                unary_result_type(*operator)
            }
            ExpressionType::UpdateExpression { argument, .. } => {
                match argument.as_ref() {
                    ExpressionType::Identifier(id) => {
                        if let Some(v) = self.variable_of(id) {
                            self.read(v);
                            self.write(v, ValueType::Double, false);
                        }
                    }
                    other => {
                        self.visit_expression(other);
                    }
                }
                ValueType::Double
            }
            ExpressionType::BinaryExpression {
                operator,
                left,
                right,
                ..
            } => {
                let l = self.visit_expression(left);
                let r = self.visit_expression(right);
                binary_result_type(*operator, l, r)
            }
            ExpressionType::LogicalExpression {
                operator: LogicalOperator::And | LogicalOperator::Or,
                left,
                right,
                ..
            } => {
                let l = self.visit_expression(left);
                let r = self.visit_expression(right);
                join_type(l, r)
            }
            ExpressionType::AssignmentExpression {
                operator,
                left,
                right,
                ..
            } => match (operator.binary_operator(), left.as_ref()) {
                (None, ExpressionType::Identifier(id)) => {
                    let t = self.visit_expression(right);
                    self.write_identifier(id, t, false);
                    t
                }
                (Some(op), ExpressionType::Identifier(id)) => {
                    let current = match self.variable_of(id) {
                        Some(v) => self.read(v),
                        None => ValueType::Unknown,
                    };
                    let r = self.visit_expression(right);
                    let t = binary_result_type(op, current, r);
                    self.write_identifier(id, t, false);
                    t
                }
                (op, target) => {
                    self.visit_expression(target);
                    let r = self.visit_expression(right);
                    match op {
                        Some(op) => binary_result_type(op, ValueType::Unknown, r),
                        None => r,
                    }
                }
            },
            ExpressionType::ConditionalExpression {
                test,
                consequent,
                alternate,
                ..
            } => {
                self.visit_expression(test);
                let c = self.visit_expression(consequent);
                let a = self.visit_expression(alternate);
                join_type(c, a)
            }
            ExpressionType::CallExpression {
                callee, arguments, ..
            } => {
                self.visit_expression(callee);
                for a in arguments {
                    self.visit_expression(a);
                }
                ValueType::Unknown
            }
            ExpressionType::NewExpression {
                callee, arguments, ..
            } => {
                self.visit_expression(callee);
                for a in arguments {
                    self.visit_expression(a);
                }
                ValueType::Object
            }
            ExpressionType::SequenceExpression { expressions, .. } => {
                let mut t = ValueType::Unknown;
                for e in expressions {
                    t = self.visit_expression(e);
                }
                t
            }
            ExpressionType::MemberExpression(m) => {
                match m {
                    MemberExpressionType::SimpleMemberExpression { object, .. } => {
                        self.visit_expression(object);
                    }
                    MemberExpressionType::ComputedMemberExpression {
                        object, property, ..
                    } => {
                        self.visit_expression(object);
                        self.visit_expression(property);
                    }
                }
                ValueType::Unknown
            }
        }
    }
}
