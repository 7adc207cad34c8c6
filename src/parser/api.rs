use std::rc::Rc;
use std::time::Instant;

use pest::error::{Error, ErrorVariant};
use pest::iterators::{Pair, Pairs};
use pest::{Parser, Span};
use pest_derive::Parser;
use tracing::debug;

use super::ast::*;
use super::static_semantics::Semantics;

#[derive(Parser)]
#[grammar = "parser/js_grammar.pest"] // relative to src
pub struct JsParser;

const TAB_WIDTH: usize = 2;

type BuildResult<T> = Result<T, Error<Rule>>;

impl JsParser {
    /// Parses a script into an AST whose identifiers, functions and `with` statements
    /// carry the ids the analysis passes annotate.
    pub fn parse_to_ast_from_str(script: &str) -> BuildResult<ProgramData> {
        let start = Instant::now();
        let pairs = JsParser::parse(Rule::script, script)?;
        let program = AstBuilder::new().build_program(pairs)?;
        debug!(
            functions = program.function_count,
            nodes = program.node_count,
            elapsed_us = start.elapsed().as_micros() as u64,
            "parsed script"
        );
        Ok(program)
    }

    /// Renders the raw pest token tree, one rule per line.
    pub fn parse_to_token_tree(script: &str) -> BuildResult<String> {
        let mut tree = vec![];
        for pair in JsParser::parse(Rule::script, script)? {
            tree.push(pair_to_string(pair, 0).join("\n"));
        }
        Ok(tree.join("\n"))
    }
}

fn pair_to_string(pair: Pair<Rule>, level: usize) -> Vec<String> {
    let mut tree = vec![];
    let span = pair.as_span();
    tree.push(format!(
        "{}{:?} => ({},{}) #{:?}",
        " ".repeat(level * TAB_WIDTH),
        pair.as_rule(),
        span.start(),
        span.end(),
        span.as_str()
    ));
    for child_pair in pair.into_inner() {
        tree.append(pair_to_string(child_pair, level + 1).as_mut());
    }
    tree
}

fn get_unexpected_error(id: &'static str, pair: &Pair<Rule>) -> Error<Rule> {
    let message = format!("Unexpected state reached [{:?}] - {}", pair.as_rule(), id);
    Error::new_from_span(ErrorVariant::CustomError { message }, pair.as_span())
}

fn get_syntax_error(message: &str, span: Span) -> Error<Rule> {
    Error::new_from_span(
        ErrorVariant::CustomError {
            message: message.to_string(),
        },
        span,
    )
}

fn get_meta(pair: &Pair<Rule>) -> Meta {
    let span = pair.as_span();
    Meta {
        start_index: span.start(),
        end_index: span.end(),
    }
}

fn join_meta(first: &Meta, last: &Meta) -> Meta {
    Meta {
        start_index: first.start_index,
        end_index: last.end_index,
    }
}

fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_break
            | Rule::kw_case
            | Rule::kw_catch
            | Rule::kw_continue
            | Rule::kw_debugger
            | Rule::kw_default
            | Rule::kw_do
            | Rule::kw_else
            | Rule::kw_finally
            | Rule::kw_for
            | Rule::kw_function
            | Rule::kw_if
            | Rule::kw_in
            | Rule::kw_new
            | Rule::kw_return
            | Rule::kw_switch
            | Rule::kw_throw
            | Rule::kw_try
            | Rule::kw_var
            | Rule::kw_while
            | Rule::kw_with
    )
}

/// Children of `pair` without the keyword tokens.
fn significant(pair: Pair<Rule>) -> Vec<Pair<Rule>> {
    pair.into_inner()
        .filter(|p| !is_keyword(p.as_rule()))
        .collect()
}

/// True when the leading string-literal statements contain a `"use strict"` directive.
fn has_use_strict_directive(elements: &[Pair<Rule>]) -> bool {
    for element in elements {
        if element.as_rule() != Rule::expression_statement {
            return false;
        }
        let text = element.as_str().trim().trim_end_matches(';').trim();
        let quote = match text.chars().next() {
            Some(q @ '"') | Some(q @ '\'') => q,
            _ => return false,
        };
        if text.len() < 2 || !text.ends_with(quote) || text[1..text.len() - 1].contains(quote) {
            return false;
        }
        if &text[1..text.len() - 1] == "use strict" {
            return true;
        }
    }
    false
}

pub(crate) fn parse_numeric_literal(text: &str) -> Option<f64> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        let mut value = 0.0;
        for c in hex.chars() {
            value = value * 16.0 + c.to_digit(16)? as f64;
        }
        return Some(value);
    }
    let mut normalized = String::with_capacity(text.len() + 2);
    if text.starts_with('.') {
        normalized.push('0');
    }
    normalized.push_str(text);
    let normalized = normalized.replace(".e", ".0e").replace(".E", ".0E");
    let normalized = if normalized.ends_with('.') {
        format!("{}0", normalized)
    } else {
        normalized
    };
    normalized.parse::<f64>().ok()
}

fn read_hex(chars: &mut std::iter::Peekable<std::str::Chars>, digits: usize) -> Option<u32> {
    let mut value = 0;
    for _ in 0..digits {
        value = value * 16 + chars.peek()?.to_digit(16)?;
        chars.next();
    }
    Some(value)
}

/// Strips the quotes of a string literal and resolves its escape sequences.
///
/// Lone UTF-16 surrogates cannot be represented in a Rust string and become U+FFFD.
pub(crate) fn unescape_string_literal(raw: &str) -> String {
    let body = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') if !chars.peek().map_or(false, |c| c.is_ascii_digit()) => out.push('\0'),
            Some('x') => match read_hex(&mut chars, 2).and_then(char::from_u32) {
                Some(ch) => out.push(ch),
                None => out.push('x'),
            },
            Some('u') => match read_hex(&mut chars, 4) {
                Some(high @ 0xD800..=0xDBFF) => {
                    let mut lookahead = chars.clone();
                    let low = if lookahead.next() == Some('\\') && lookahead.next() == Some('u') {
                        read_hex(&mut lookahead, 4).filter(|l| (0xDC00..=0xDFFF).contains(l))
                    } else {
                        None
                    };
                    match low {
                        Some(low) => {
                            chars = lookahead;
                            let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                            out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
                        }
                        None => out.push('\u{FFFD}'),
                    }
                }
                Some(code) => out.push(char::from_u32(code).unwrap_or('\u{FFFD}')),
                None => out.push('u'),
            },
            Some('\r') => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            Some('\n') | Some('\u{2028}') | Some('\u{2029}') => {}
            Some(other) => out.push(other),
            None => break,
        }
    }
    out
}

fn property_key_from_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Builds the AST from pest pairs. Node and function ids come from the counters held here.
struct AstBuilder {
    next_node_id: NodeId,
    next_function_id: FunctionId,
    strict_stack: Vec<bool>,
}

impl AstBuilder {
    fn new() -> Self {
        AstBuilder {
            next_node_id: 0,
            next_function_id: PROGRAM_FUNCTION_ID + 1,
            strict_stack: vec![],
        }
    }

    fn new_node_id(&mut self) -> NodeId {
        let id = self.next_node_id;
        self.next_node_id += 1;
        id
    }

    fn build_program(mut self, mut pairs: Pairs<Rule>) -> BuildResult<ProgramData> {
        let script = match pairs.next() {
            Some(p) => p,
            None => {
                return Err(Error::new_from_pos(
                    ErrorVariant::CustomError {
                        message: "Empty token stream".to_string(),
                    },
                    pest::Position::from_start(""),
                ))
            }
        };
        let meta = get_meta(&script);
        let elements: Vec<Pair<Rule>> = script
            .into_inner()
            .filter(|p| p.as_rule() != Rule::EOI)
            .collect();
        let strict = has_use_strict_directive(&elements);
        let body = self.build_function_body(meta, elements, strict)?;
        Ok(ProgramData {
            meta,
            body,
            strict,
            function_count: self.next_function_id,
            node_count: self.next_node_id,
        })
    }

    fn build_function_body(
        &mut self,
        meta: Meta,
        elements: Vec<Pair<Rule>>,
        strict: bool,
    ) -> BuildResult<FunctionBodyData> {
        self.strict_stack.push(strict);
        let mut statements = Vec::with_capacity(elements.len());
        for element in elements {
            statements.push(self.build_statement(element)?);
        }
        self.strict_stack.pop();
        let semantics = Semantics::of_statements(&statements);
        Ok(FunctionBodyData {
            meta,
            statements,
            declared_variables: semantics.declared_variables,
            hoisted_functions: semantics.hoisted_functions,
        })
    }

    fn build_function(&mut self, pair: Pair<Rule>, is_expression: bool) -> BuildResult<Rc<FunctionData>> {
        let meta = get_meta(&pair);
        let span = pair.as_span();
        let function_id = self.next_function_id;
        self.next_function_id += 1;
        let mut id = None;
        let mut params = vec![];
        let mut body_pair = None;
        for inner in significant(pair) {
            match inner.as_rule() {
                Rule::identifier => id = Some(self.build_identifier(&inner)),
                Rule::formal_parameter_list => {
                    for p in inner.into_inner() {
                        params.push(self.build_identifier(&p));
                    }
                }
                Rule::function_body => body_pair = Some(inner),
                _ => return Err(get_unexpected_error("function child", &inner)),
            }
        }
        let body_pair = body_pair.ok_or_else(|| get_syntax_error("Missing function body", span))?;
        let body_meta = get_meta(&body_pair);
        let elements: Vec<Pair<Rule>> = body_pair.into_inner().collect();
        let outer_strict = self.strict_stack.last().copied().unwrap_or(false);
        let strict = outer_strict || has_use_strict_directive(&elements);
        let body = self.build_function_body(body_meta, elements, strict)?;
        Ok(Rc::new(FunctionData {
            meta,
            function_id,
            id,
            params,
            body,
            strict,
            is_expression,
        }))
    }

    fn build_identifier(&mut self, pair: &Pair<Rule>) -> IdentifierData {
        IdentifierData {
            id: self.new_node_id(),
            name: pair.as_str().to_string(),
            meta: get_meta(pair),
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn build_block(&mut self, pair: Pair<Rule>) -> BuildResult<BlockStatementData> {
        let meta = get_meta(&pair);
        let mut body = vec![];
        for inner in pair.into_inner() {
            body.push(self.build_statement(inner)?);
        }
        Ok(BlockStatementData { meta, body })
    }

    fn build_statement(&mut self, pair: Pair<Rule>) -> BuildResult<StatementType> {
        let meta = get_meta(&pair);
        let span = pair.as_span();
        Ok(match pair.as_rule() {
            Rule::function_declaration => {
                StatementType::FunctionDeclaration(self.build_function(pair, false)?)
            }
            Rule::block => StatementType::BlockStatement(self.build_block(pair)?),
            Rule::variable_statement => {
                let list = self.single_child(pair)?;
                StatementType::VariableDeclaration(self.build_variable_declaration_list(meta, list)?)
            }
            Rule::empty_statement => StatementType::EmptyStatement { meta },
            Rule::debugger_statement => StatementType::DebuggerStatement { meta },
            Rule::expression_statement => {
                let expression = self.single_child(pair)?;
                StatementType::ExpressionStatement {
                    meta,
                    expression: Box::new(self.build_expression(expression)?),
                }
            }
            Rule::if_statement => {
                let mut inner = significant(pair).into_iter();
                let test = self.next_expression(&mut inner, span)?;
                let consequent = self.next_statement(&mut inner, span)?;
                let alternate = match inner.next() {
                    Some(p) => Some(Box::new(self.build_statement(p)?)),
                    None => None,
                };
                StatementType::IfStatement {
                    meta,
                    test: Box::new(test),
                    consequent: Box::new(consequent),
                    alternate,
                }
            }
            Rule::do_while_statement => {
                let mut inner = significant(pair).into_iter();
                let body = self.next_statement(&mut inner, span)?;
                let test = self.next_expression(&mut inner, span)?;
                StatementType::DoWhileStatement {
                    meta,
                    test: Box::new(test),
                    body: Box::new(body),
                }
            }
            Rule::while_statement => {
                let mut inner = significant(pair).into_iter();
                let test = self.next_expression(&mut inner, span)?;
                let body = self.next_statement(&mut inner, span)?;
                StatementType::WhileStatement {
                    meta,
                    test: Box::new(test),
                    body: Box::new(body),
                }
            }
            Rule::for_statement => self.build_for_statement(pair)?,
            Rule::for_in_statement => self.build_for_in_statement(pair)?,
            Rule::continue_statement => StatementType::ContinueStatement {
                meta,
                label: significant(pair).first().map(|p| p.as_str().to_string()),
            },
            Rule::break_statement => StatementType::BreakStatement {
                meta,
                label: significant(pair).first().map(|p| p.as_str().to_string()),
            },
            Rule::return_statement => {
                let argument = match significant(pair).into_iter().next() {
                    Some(p) => Some(Box::new(self.build_expression(p)?)),
                    None => None,
                };
                StatementType::ReturnStatement { meta, argument }
            }
            Rule::with_statement => {
                let mut inner = significant(pair).into_iter();
                let object = self.next_expression(&mut inner, span)?;
                let body = self.next_statement(&mut inner, span)?;
                StatementType::WithStatement {
                    meta,
                    id: self.new_node_id(),
                    object: Box::new(object),
                    body: Box::new(body),
                }
            }
            Rule::switch_statement => self.build_switch_statement(pair)?,
            Rule::throw_statement => {
                let mut inner = significant(pair).into_iter();
                StatementType::ThrowStatement {
                    meta,
                    argument: Box::new(self.next_expression(&mut inner, span)?),
                }
            }
            Rule::try_statement => self.build_try_statement(pair)?,
            Rule::labelled_statement => {
                let mut inner = pair.into_inner();
                let label = inner
                    .next()
                    .ok_or_else(|| get_syntax_error("Missing label", span))?
                    .as_str()
                    .to_string();
                let body = self.next_statement(&mut inner, span)?;
                StatementType::LabeledStatement {
                    meta,
                    label,
                    body: Box::new(body),
                }
            }
            _ => return Err(get_unexpected_error("statement", &pair)),
        })
    }

    fn single_child<'i>(&self, pair: Pair<'i, Rule>) -> BuildResult<Pair<'i, Rule>> {
        let span = pair.as_span();
        pair.into_inner()
            .find(|p| !is_keyword(p.as_rule()))
            .ok_or_else(|| get_syntax_error("Incomplete statement", span))
    }

    fn next_expression<'i, I: Iterator<Item = Pair<'i, Rule>>>(
        &mut self,
        inner: &mut I,
        span: Span,
    ) -> BuildResult<ExpressionType> {
        let pair = inner
            .next()
            .ok_or_else(|| get_syntax_error("Expected an expression", span))?;
        self.build_expression(pair)
    }

    fn next_statement<'i, I: Iterator<Item = Pair<'i, Rule>>>(
        &mut self,
        inner: &mut I,
        span: Span,
    ) -> BuildResult<StatementType> {
        let pair = inner
            .next()
            .ok_or_else(|| get_syntax_error("Expected a statement", span))?;
        self.build_statement(pair)
    }

    fn build_variable_declaration_list(
        &mut self,
        meta: Meta,
        pair: Pair<Rule>,
    ) -> BuildResult<VariableDeclarationData> {
        let mut declarations = vec![];
        for declaration in pair.into_inner() {
            let d_meta = get_meta(&declaration);
            let span = declaration.as_span();
            let mut inner = declaration.into_inner();
            let id_pair = inner
                .next()
                .ok_or_else(|| get_syntax_error("Expected an identifier", span))?;
            let id = self.build_identifier(&id_pair);
            let init = match inner.next() {
                Some(p) => Some(self.build_assignment_expression(p)?),
                None => None,
            };
            declarations.push(VariableDeclaratorData {
                meta: d_meta,
                id,
                init,
            });
        }
        Ok(VariableDeclarationData { meta, declarations })
    }

    fn build_for_statement(&mut self, pair: Pair<Rule>) -> BuildResult<StatementType> {
        let meta = get_meta(&pair);
        let span = pair.as_span();
        let mut init = None;
        let mut test = None;
        let mut update = None;
        let mut body = None;
        for inner in significant(pair) {
            match inner.as_rule() {
                Rule::for_init => {
                    let i_meta = get_meta(&inner);
                    let child = self.single_child(inner)?;
                    init = Some(match child.as_rule() {
                        Rule::variable_declaration_list => {
                            VariableDeclarationOrExpression::VariableDeclaration(
                                self.build_variable_declaration_list(i_meta, child)?,
                            )
                        }
                        _ => VariableDeclarationOrExpression::Expression(Box::new(
                            self.build_expression(child)?,
                        )),
                    });
                }
                Rule::for_test => {
                    let child = self.single_child(inner)?;
                    test = Some(Box::new(self.build_expression(child)?));
                }
                Rule::for_update => {
                    let child = self.single_child(inner)?;
                    update = Some(Box::new(self.build_expression(child)?));
                }
                _ => body = Some(Box::new(self.build_statement(inner)?)),
            }
        }
        Ok(StatementType::ForStatement {
            meta,
            init,
            test,
            update,
            body: body.ok_or_else(|| get_syntax_error("Missing loop body", span))?,
        })
    }

    fn build_for_in_statement(&mut self, pair: Pair<Rule>) -> BuildResult<StatementType> {
        let meta = get_meta(&pair);
        let span = pair.as_span();
        let mut inner = significant(pair).into_iter();
        let binding = inner
            .next()
            .ok_or_else(|| get_syntax_error("Missing for-in binding", span))?;
        let binding_span = binding.as_span();
        let target = self.single_child(binding)?;
        let left = match target.as_rule() {
            Rule::identifier => ForInTarget::VariableDeclaration(self.build_identifier(&target)),
            _ => {
                let e = self.build_lhs_expression(target)?;
                if !e.is_reference() {
                    return Err(get_syntax_error(
                        "Invalid left-hand side in for-in",
                        binding_span,
                    ));
                }
                ForInTarget::Expression(Box::new(e))
            }
        };
        let right = self.next_expression(&mut inner, span)?;
        let body = self.next_statement(&mut inner, span)?;
        Ok(StatementType::ForInStatement {
            meta,
            left,
            right: Box::new(right),
            body: Box::new(body),
        })
    }

    fn build_switch_statement(&mut self, pair: Pair<Rule>) -> BuildResult<StatementType> {
        let meta = get_meta(&pair);
        let span = pair.as_span();
        let mut inner = significant(pair).into_iter();
        let discriminant = self.next_expression(&mut inner, span)?;
        let mut cases = vec![];
        let mut seen_default = false;
        for clause in inner {
            let c_meta = get_meta(&clause);
            let c_span = clause.as_span();
            let is_default = clause.as_rule() == Rule::default_clause;
            let mut children = significant(clause).into_iter();
            let test = if is_default {
                if seen_default {
                    return Err(get_syntax_error(
                        "More than one default clause in switch statement",
                        c_span,
                    ));
                }
                seen_default = true;
                None
            } else {
                Some(self.next_expression(&mut children, c_span)?)
            };
            let mut consequent = vec![];
            for s in children {
                consequent.push(self.build_statement(s)?);
            }
            cases.push(SwitchCaseData {
                meta: c_meta,
                test,
                consequent,
            });
        }
        Ok(StatementType::SwitchStatement {
            meta,
            discriminant: Box::new(discriminant),
            cases,
        })
    }

    fn build_try_statement(&mut self, pair: Pair<Rule>) -> BuildResult<StatementType> {
        let meta = get_meta(&pair);
        let span = pair.as_span();
        let mut block = None;
        let mut handler = None;
        let mut finalizer = None;
        for inner in significant(pair) {
            match inner.as_rule() {
                Rule::block => block = Some(self.build_block(inner)?),
                Rule::catch_clause => {
                    let h_meta = get_meta(&inner);
                    let h_span = inner.as_span();
                    let mut children = significant(inner).into_iter();
                    let param_pair = children
                        .next()
                        .ok_or_else(|| get_syntax_error("Missing catch parameter", h_span))?;
                    let param = self.build_identifier(&param_pair);
                    let body_pair = children
                        .next()
                        .ok_or_else(|| get_syntax_error("Missing catch block", h_span))?;
                    handler = Some(CatchClauseData {
                        meta: h_meta,
                        param,
                        body: self.build_block(body_pair)?,
                    });
                }
                Rule::finally_clause => {
                    let body_pair = self.single_child(inner)?;
                    finalizer = Some(self.build_block(body_pair)?);
                }
                _ => return Err(get_unexpected_error("try child", &inner)),
            }
        }
        Ok(StatementType::TryStatement {
            meta,
            block: block.ok_or_else(|| get_syntax_error("Missing try block", span))?,
            handler,
            finalizer,
        })
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn build_expression(&mut self, pair: Pair<Rule>) -> BuildResult<ExpressionType> {
        let meta = get_meta(&pair);
        let mut expressions = vec![];
        for inner in pair.into_inner() {
            expressions.push(self.build_assignment_expression(inner)?);
        }
        if expressions.len() == 1 {
            Ok(expressions.remove(0))
        } else {
            Ok(ExpressionType::SequenceExpression { meta, expressions })
        }
    }

    fn build_assignment_expression(&mut self, pair: Pair<Rule>) -> BuildResult<ExpressionType> {
        let meta = get_meta(&pair);
        let span = pair.as_span();
        let mut inner = pair.into_inner();
        let first = inner
            .next()
            .ok_or_else(|| get_syntax_error("Expected an expression", span))?;
        match first.as_rule() {
            Rule::lhs_expression => {
                let left_span = first.as_span();
                let left = self.build_lhs_expression(first)?;
                if !left.is_reference() {
                    return Err(get_syntax_error(
                        "Invalid left-hand side in assignment",
                        left_span,
                    ));
                }
                let op_pair = inner
                    .next()
                    .ok_or_else(|| get_syntax_error("Expected an assignment operator", span))?;
                let operator = match op_pair.as_str() {
                    "=" => AssignmentOperator::Equals,
                    "+=" => AssignmentOperator::AddEquals,
                    "-=" => AssignmentOperator::SubtractEquals,
                    "*=" => AssignmentOperator::MultiplyEquals,
                    "/=" => AssignmentOperator::DivideEquals,
                    "%=" => AssignmentOperator::ModuloEquals,
                    "<<=" => AssignmentOperator::BitwiseLeftShiftEquals,
                    ">>=" => AssignmentOperator::BitwiseRightShiftEquals,
                    ">>>=" => AssignmentOperator::BitwiseUnsignedRightShiftEquals,
                    "|=" => AssignmentOperator::BitwiseOrEquals,
                    "^=" => AssignmentOperator::BitwiseXorEquals,
                    "&=" => AssignmentOperator::BitwiseAndEquals,
                    _ => return Err(get_unexpected_error("assignment operator", &op_pair)),
                };
                let right = self.next_assignment(&mut inner, span)?;
                Ok(ExpressionType::AssignmentExpression {
                    meta,
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            Rule::conditional_expression => self.build_conditional_expression(first),
            _ => Err(get_unexpected_error("assignment expression", &first)),
        }
    }

    fn next_assignment<'i, I: Iterator<Item = Pair<'i, Rule>>>(
        &mut self,
        inner: &mut I,
        span: Span,
    ) -> BuildResult<ExpressionType> {
        let pair = inner
            .next()
            .ok_or_else(|| get_syntax_error("Expected an expression", span))?;
        self.build_assignment_expression(pair)
    }

    fn build_conditional_expression(&mut self, pair: Pair<Rule>) -> BuildResult<ExpressionType> {
        let meta = get_meta(&pair);
        let span = pair.as_span();
        let mut inner = pair.into_inner();
        let test_pair = inner
            .next()
            .ok_or_else(|| get_syntax_error("Expected an expression", span))?;
        let test = self.build_binary_chain(test_pair)?;
        match inner.next() {
            None => Ok(test),
            Some(consequent) => {
                let consequent = self.build_assignment_expression(consequent)?;
                let alternate = self.next_assignment(&mut inner, span)?;
                Ok(ExpressionType::ConditionalExpression {
                    meta,
                    test: Box::new(test),
                    consequent: Box::new(consequent),
                    alternate: Box::new(alternate),
                })
            }
        }
    }

    /// Folds one precedence level (`a op b op c`) to the left.
    fn build_binary_chain(&mut self, pair: Pair<Rule>) -> BuildResult<ExpressionType> {
        if pair.as_rule() == Rule::unary_expression {
            return self.build_unary_expression(pair);
        }
        let span = pair.as_span();
        let mut inner = pair.into_inner();
        let first = inner
            .next()
            .ok_or_else(|| get_syntax_error("Expected an operand", span))?;
        let mut left = self.build_binary_chain(first)?;
        while let Some(op_pair) = inner.next() {
            let right_pair = inner
                .next()
                .ok_or_else(|| get_unexpected_error("missing right operand", &op_pair))?;
            let right = self.build_binary_chain(right_pair)?;
            let meta = join_meta(left.get_meta(), right.get_meta());
            left = match op_pair.as_rule() {
                Rule::logical_or_operator => ExpressionType::LogicalExpression {
                    meta,
                    operator: LogicalOperator::Or,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                Rule::logical_and_operator => ExpressionType::LogicalExpression {
                    meta,
                    operator: LogicalOperator::And,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                _ => ExpressionType::BinaryExpression {
                    meta,
                    operator: binary_operator(&op_pair)?,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            };
        }
        Ok(left)
    }

    fn build_unary_expression(&mut self, pair: Pair<Rule>) -> BuildResult<ExpressionType> {
        let meta = get_meta(&pair);
        let span = pair.as_span();
        let mut inner = pair.into_inner();
        let first = inner
            .next()
            .ok_or_else(|| get_syntax_error("Expected an operand", span))?;
        if first.as_rule() == Rule::postfix_expression {
            return self.build_postfix_expression(first);
        }
        let operand_pair = inner
            .next()
            .ok_or_else(|| get_syntax_error("Expected an operand", span))?;
        let operand_span = operand_pair.as_span();
        let argument = Box::new(self.build_unary_expression(operand_pair)?);
        let operator = match first.as_str() {
            "++" | "--" => {
                if !argument.is_reference() {
                    return Err(get_syntax_error(
                        "Invalid left-hand side expression in prefix operation",
                        operand_span,
                    ));
                }
                let operator = if first.as_str() == "++" {
                    UpdateOperator::PlusPlus
                } else {
                    UpdateOperator::MinusMinus
                };
                return Ok(ExpressionType::UpdateExpression {
                    meta,
                    operator,
                    argument,
                    prefix: true,
                });
            }
            "delete" => UnaryOperator::Delete,
            "void" => UnaryOperator::Void,
            "typeof" => UnaryOperator::TypeOf,
            "+" => UnaryOperator::Plus,
            "-" => UnaryOperator::Minus,
            "~" => UnaryOperator::BitwiseNot,
            "!" => UnaryOperator::LogicalNot,
            _ => return Err(get_unexpected_error("unary operator", &first)),
        };
        Ok(ExpressionType::UnaryExpression {
            meta,
            operator,
            argument,
        })
    }

    fn build_postfix_expression(&mut self, pair: Pair<Rule>) -> BuildResult<ExpressionType> {
        let meta = get_meta(&pair);
        let span = pair.as_span();
        let mut inner = pair.into_inner();
        let lhs = inner
            .next()
            .ok_or_else(|| get_syntax_error("Expected an operand", span))?;
        let lhs_span = lhs.as_span();
        let argument = self.build_lhs_expression(lhs)?;
        match inner.next() {
            None => Ok(argument),
            Some(op) => {
                if !argument.is_reference() {
                    return Err(get_syntax_error(
                        "Invalid left-hand side expression in postfix operation",
                        lhs_span,
                    ));
                }
                Ok(ExpressionType::UpdateExpression {
                    meta,
                    operator: if op.as_str() == "++" {
                        UpdateOperator::PlusPlus
                    } else {
                        UpdateOperator::MinusMinus
                    },
                    argument: Box::new(argument),
                    prefix: false,
                })
            }
        }
    }

    /// Handles `lhs_expression` and `member_expression`: a head followed by call and member suffixes.
    fn build_lhs_expression(&mut self, pair: Pair<Rule>) -> BuildResult<ExpressionType> {
        let span = pair.as_span();
        let mut inner = pair.into_inner();
        let head = inner
            .next()
            .ok_or_else(|| get_syntax_error("Expected an expression", span))?;
        let mut expression = self.build_lhs_head(head)?;
        for suffix in inner {
            expression = self.apply_suffix(expression, suffix)?;
        }
        Ok(expression)
    }

    fn build_lhs_head(&mut self, pair: Pair<Rule>) -> BuildResult<ExpressionType> {
        let meta = get_meta(&pair);
        let span = pair.as_span();
        match pair.as_rule() {
            Rule::primary_expression => self.build_primary_expression(pair),
            Rule::member_expression => self.build_lhs_expression(pair),
            Rule::new_expression_with_arguments => {
                let mut inner = significant(pair).into_iter();
                let callee_pair = inner
                    .next()
                    .ok_or_else(|| get_syntax_error("Expected a constructor", span))?;
                let callee = self.build_lhs_expression(callee_pair)?;
                let arguments = match inner.next() {
                    Some(args) => self.build_arguments(args)?,
                    None => vec![],
                };
                Ok(ExpressionType::NewExpression {
                    meta,
                    callee: Box::new(callee),
                    arguments,
                })
            }
            Rule::new_expression => {
                let callee_pair = self.single_child(pair)?;
                let callee = self.build_lhs_head(callee_pair)?;
                Ok(ExpressionType::NewExpression {
                    meta,
                    callee: Box::new(callee),
                    arguments: vec![],
                })
            }
            _ => Err(get_unexpected_error("expression head", &pair)),
        }
    }

    fn apply_suffix(&mut self, object: ExpressionType, suffix: Pair<Rule>) -> BuildResult<ExpressionType> {
        let meta = join_meta(object.get_meta(), &get_meta(&suffix));
        match suffix.as_rule() {
            Rule::arguments => Ok(ExpressionType::CallExpression {
                meta,
                callee: Box::new(object),
                arguments: self.build_arguments(suffix)?,
            }),
            Rule::dot_member => {
                let name = self.single_child(suffix)?;
                Ok(ExpressionType::MemberExpression(
                    MemberExpressionType::SimpleMemberExpression {
                        meta,
                        object: Box::new(object),
                        property: name.as_str().to_string(),
                    },
                ))
            }
            Rule::computed_member => {
                let property = self.single_child(suffix)?;
                Ok(ExpressionType::MemberExpression(
                    MemberExpressionType::ComputedMemberExpression {
                        meta,
                        object: Box::new(object),
                        property: Box::new(self.build_expression(property)?),
                    },
                ))
            }
            _ => Err(get_unexpected_error("member suffix", &suffix)),
        }
    }

    fn build_arguments(&mut self, pair: Pair<Rule>) -> BuildResult<Vec<ExpressionType>> {
        let mut arguments = vec![];
        for inner in pair.into_inner() {
            arguments.push(self.build_assignment_expression(inner)?);
        }
        Ok(arguments)
    }

    fn build_primary_expression(&mut self, pair: Pair<Rule>) -> BuildResult<ExpressionType> {
        let span = pair.as_span();
        let inner = pair
            .into_inner()
            .next()
            .ok_or_else(|| get_syntax_error("Expected an expression", span))?;
        let meta = get_meta(&inner);
        let literal = |value| ExpressionType::Literal(LiteralData { meta, value });
        Ok(match inner.as_rule() {
            Rule::kw_this => ExpressionType::ThisExpression { meta },
            Rule::identifier => ExpressionType::Identifier(self.build_identifier(&inner)),
            Rule::null_literal => literal(LiteralType::NullLiteral),
            Rule::boolean_literal => literal(LiteralType::BooleanLiteral(inner.as_str() == "true")),
            Rule::numeric_literal => match parse_numeric_literal(inner.as_str()) {
                Some(n) => literal(LiteralType::NumberLiteral(n)),
                None => return Err(get_syntax_error("Invalid number", inner.as_span())),
            },
            Rule::string_literal => {
                literal(LiteralType::StringLiteral(unescape_string_literal(inner.as_str())))
            }
            Rule::regular_expression_literal => {
                let raw = inner.as_str();
                let end = raw.rfind('/').unwrap_or(0);
                literal(LiteralType::RegExpLiteral(RegExpLiteralData {
                    pattern: raw[1..end].to_string(),
                    flags: raw[end + 1..].to_string(),
                }))
            }
            Rule::array_literal => {
                let mut elements = vec![];
                for element in inner.into_inner() {
                    elements.push(match element.into_inner().next() {
                        Some(e) => Some(self.build_assignment_expression(e)?),
                        None => None,
                    });
                }
                // A trailing comma does not add a hole.
                if let Some(None) = elements.last() {
                    elements.pop();
                }
                ExpressionType::ArrayExpression { meta, elements }
            }
            Rule::object_literal => {
                let mut properties = vec![];
                for property in inner.into_inner() {
                    let p_meta = get_meta(&property);
                    let p_span = property.as_span();
                    let mut children = property.into_inner();
                    let key_pair = children
                        .next()
                        .ok_or_else(|| get_syntax_error("Expected a property name", p_span))?;
                    let key = match key_pair.as_rule() {
                        Rule::string_literal => unescape_string_literal(key_pair.as_str()),
                        Rule::numeric_literal => match parse_numeric_literal(key_pair.as_str()) {
                            Some(n) => property_key_from_number(n),
                            None => return Err(get_syntax_error("Invalid number", key_pair.as_span())),
                        },
                        _ => key_pair.as_str().to_string(),
                    };
                    let value = self.next_assignment(&mut children, p_span)?;
                    properties.push(PropertyData {
                        meta: p_meta,
                        key,
                        value,
                    });
                }
                ExpressionType::ObjectExpression { meta, properties }
            }
            Rule::function_expression => {
                ExpressionType::FunctionExpression(self.build_function(inner, true)?)
            }
            Rule::parenthesized_expression => {
                let e = self.single_child(inner)?;
                self.build_expression(e)?
            }
            _ => return Err(get_unexpected_error("primary expression", &inner)),
        })
    }
}

fn binary_operator(pair: &Pair<Rule>) -> BuildResult<BinaryOperator> {
    Ok(match pair.as_str() {
        "*" => BinaryOperator::Multiply,
        "/" => BinaryOperator::Divide,
        "%" => BinaryOperator::Modulo,
        "+" => BinaryOperator::Add,
        "-" => BinaryOperator::Subtract,
        "<<" => BinaryOperator::BitwiseLeftShift,
        ">>" => BinaryOperator::BitwiseRightShift,
        ">>>" => BinaryOperator::BitwiseUnsignedRightShift,
        "<" => BinaryOperator::LessThan,
        "<=" => BinaryOperator::LessThanEqual,
        ">" => BinaryOperator::GreaterThan,
        ">=" => BinaryOperator::GreaterThanEqual,
        "instanceof" => BinaryOperator::InstanceOf,
        "in" => BinaryOperator::In,
        "==" => BinaryOperator::LooselyEqual,
        "!=" => BinaryOperator::LooselyUnequal,
        "===" => BinaryOperator::StrictlyEqual,
        "!==" => BinaryOperator::StrictlyUnequal,
        "&" => BinaryOperator::BitwiseAnd,
        "^" => BinaryOperator::BitwiseXor,
        "|" => BinaryOperator::BitwiseOr,
        _ => return Err(get_unexpected_error("binary operator", pair)),
    })
}
