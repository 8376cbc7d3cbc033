//! Static script analysis.
//!
//! Finds what a script subscribes to and which lifecycle handlers it
//! defines, without executing anything. Unparseable scripts analyze to
//! nothing so one broken script cannot block a graph rebuild.

use std::collections::BTreeMap;

use questbound_domain::ScriptEvent;
use serde::Serialize;

use super::ast::{Expr, Program, Stmt, StmtKind};
use super::lexer::tokenize_partial;
use super::parser::parse;
use super::value::Builtin;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptAnalysis {
    /// Attribute titles, first appearance order, no duplicates.
    pub subscriptions: Vec<String>,
    /// Handler name to dedented body text.
    pub event_handlers: BTreeMap<String, String>,
}

pub fn analyze_script(source: &str) -> ScriptAnalysis {
    match parse_for_analysis(source) {
        Some(program) => ScriptAnalysis {
            subscriptions: subscriptions_in(&program),
            event_handlers: handlers_in(&program, source),
        },
        None => ScriptAnalysis::default(),
    }
}

pub fn extract_subscriptions(source: &str) -> Vec<String> {
    parse_for_analysis(source)
        .map(|program| subscriptions_in(&program))
        .unwrap_or_default()
}

pub fn extract_event_handlers(source: &str) -> BTreeMap<String, String> {
    parse_for_analysis(source)
        .map(|program| handlers_in(&program, source))
        .unwrap_or_default()
}

fn parse_for_analysis(source: &str) -> Option<Program> {
    let (tokens, diagnostics) = tokenize_partial(source);
    if !diagnostics.is_empty() {
        tracing::debug!(errors = diagnostics.len(), "Skipping analysis of script with lex errors");
        return None;
    }
    match parse(tokens) {
        Ok(program) => Some(program),
        Err(error) => {
            tracing::debug!(error = %error, "Skipping analysis of unparseable script");
            None
        }
    }
}

fn subscriptions_in(program: &Program) -> Vec<String> {
    let mut found = Vec::new();
    visit_statements(&program.statements, &mut found);
    found
}

fn visit_statements(statements: &[Stmt], found: &mut Vec<String>) {
    for statement in statements {
        match &statement.kind {
            StmtKind::Expr(expr) => visit_expr(expr, found),
            StmtKind::Assign { target, value, .. } => {
                visit_expr(target, found);
                visit_expr(value, found);
            }
            StmtKind::If {
                branches,
                else_branch,
            } => {
                for (condition, body) in branches {
                    visit_expr(condition, found);
                    visit_statements(body, found);
                }
                if let Some(body) = else_branch {
                    visit_statements(body, found);
                }
            }
            StmtKind::For { iterable, body, .. } => {
                visit_expr(iterable, found);
                visit_statements(body, found);
            }
            StmtKind::FunctionDef(def) => visit_statements(&def.body, found),
            StmtKind::Return(Some(expr)) => visit_expr(expr, found),
            StmtKind::Return(None) => {}
        }
    }
}

fn visit_expr(expr: &Expr, found: &mut Vec<String>) {
    match expr {
        Expr::Call { callee, args } => {
            if expr.called_name() == Some(Builtin::Subscribe.name()) {
                for arg in args {
                    if let Expr::String(title) = arg {
                        if !found.contains(title) {
                            found.push(title.clone());
                        }
                    }
                }
            }
            visit_expr(callee, found);
            for arg in args {
                visit_expr(arg, found);
            }
        }
        Expr::List(items) => items.iter().for_each(|item| visit_expr(item, found)),
        Expr::Unary { operand, .. } => visit_expr(operand, found),
        Expr::Binary { left, right, .. } => {
            visit_expr(left, found);
            visit_expr(right, found);
        }
        Expr::Member { object, .. } => visit_expr(object, found),
        Expr::Index { object, index } => {
            visit_expr(object, found);
            visit_expr(index, found);
        }
        Expr::Number(_)
        | Expr::String(_)
        | Expr::Boolean(_)
        | Expr::Null
        | Expr::Identifier(_) => {}
    }
}

fn handlers_in(program: &Program, source: &str) -> BTreeMap<String, String> {
    program
        .statements
        .iter()
        .filter_map(|statement| match &statement.kind {
            StmtKind::FunctionDef(def) if ScriptEvent::from_name(&def.name).is_some() => {
                let (start, end) = def.body_span;
                let body = source.get(start..end).unwrap_or_default();
                Some((def.name.clone(), dedent(body)))
            }
            _ => None,
        })
        .collect()
}

/// Strip the common leading whitespace of the non-blank lines.
fn dedent(body: &str) -> String {
    let indent = body
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    body.lines()
        .map(|line| line.get(indent..).unwrap_or_else(|| line.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
        .trim_end()
        .to_string()
}
