//! Tree pane rendering
//!
//! Shows the last parsed tree one node per row, indented by depth. After a
//! bind the rows carry each node's resolved type and binding, and the
//! instructions emitted for the program follow the tree.

use crate::interpreter::value::Value;
use crate::parser::ast::*;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{List, ListItem, Padding},
    Frame,
};

use super::utils::{clamp_scroll, pane_block, visible_rows};

/// One row of the tree view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLine {
    pub depth: usize,
    pub label: String,
    pub ty: Option<String>,
    pub binding: Option<String>,
}

impl TreeLine {
    fn node(depth: usize, label: impl Into<String>) -> Self {
        TreeLine {
            depth,
            label: label.into(),
            ty: None,
            binding: None,
        }
    }
}

/// Flatten `statements` into tree rows.
pub fn collect_tree(statements: &[Statement]) -> Vec<TreeLine> {
    let mut lines = Vec::new();
    for statement in statements {
        statement_lines(statement, 0, &mut lines);
    }
    lines
}

fn statement_lines(statement: &Statement, depth: usize, out: &mut Vec<TreeLine>) {
    match statement {
        Statement::Expression(expr) => expression_lines(expr, depth, out),
        Statement::Block { statements, .. } => {
            out.push(TreeLine::node(depth, "block"));
            for statement in statements {
                statement_lines(statement, depth + 1, out);
            }
        }
        Statement::If {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            out.push(TreeLine::node(depth, "if"));
            expression_lines(condition, depth + 1, out);
            statement_lines(then_branch, depth + 1, out);
            if let Some(else_branch) = else_branch {
                out.push(TreeLine::node(depth, "else"));
                statement_lines(else_branch, depth + 1, out);
            }
        }
        Statement::Return { value, .. } => {
            out.push(TreeLine::node(depth, "return"));
            if let Some(value) = value {
                expression_lines(value, depth + 1, out);
            }
        }
        Statement::Throw { value, .. } => {
            out.push(TreeLine::node(depth, "throw"));
            if let Some(value) = value {
                expression_lines(value, depth + 1, out);
            }
        }
        Statement::VariableDeclaration { declarations, .. } => {
            for declaration in declarations {
                expression_lines(declaration, depth, out);
            }
        }
        Statement::FunctionDefinition { signature, body, .. } => {
            let params: Vec<&str> = signature.params.iter().map(|p| p.name.as_str()).collect();
            out.push(TreeLine::node(
                depth,
                format!("function {}({})", signature.name, params.join(", ")),
            ));
            for statement in body.iter() {
                statement_lines(statement, depth + 1, out);
            }
        }
    }
}

fn label(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Literal(Value::Str(s)) => format!("`{}`", s),
        ExprKind::Literal(value) => value.to_string(),
        ExprKind::Identifier(name) => name.clone(),
        ExprKind::VariableRef(name) => format!("@{}", name),
        ExprKind::ConstantRef(name) => format!("_{}", name),
        ExprKind::Unary { op, .. } => format!("unary {:?}", op),
        ExprKind::Binary { op, .. } => format!("binary {}", op.symbol()),
        ExprKind::NullCoalesce { .. } => "??".to_string(),
        ExprKind::Ternary { .. } => "?:".to_string(),
        ExprKind::Assignment { .. } => "=".to_string(),
        ExprKind::Call { .. } => "call".to_string(),
        ExprKind::New { .. } => "new".to_string(),
        ExprKind::MemberAccess { name, .. } => format!(".{}", name),
        ExprKind::Index { .. } => "[]".to_string(),
        ExprKind::Declaration { name, annotation, .. } => match annotation {
            Some(annotation) => format!("var {}: {}", name, annotation),
            None => format!("var {}", name),
        },
        ExprKind::ArrayLiteral { .. } => "array".to_string(),
        ExprKind::AnonymousFunction { params, .. } => {
            let params: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
            format!("lambda({})", params.join(", "))
        }
        ExprKind::This => "this".to_string(),
        ExprKind::Null => "null".to_string(),
        ExprKind::Block(_) => "block".to_string(),
        ExprKind::Empty => "(empty)".to_string(),
    }
}

fn expression_lines(expr: &Expr, depth: usize, out: &mut Vec<TreeLine>) {
    out.push(TreeLine {
        depth,
        label: label(expr),
        ty: expr.resolved_type().map(|ty| ty.to_string()),
        binding: expr.binding().map(|binding| binding.to_string()),
    });

    let child = depth + 1;
    match &expr.kind {
        ExprKind::Unary { operand, .. } => expression_lines(operand, child, out),
        ExprKind::Binary { left, right, .. } | ExprKind::NullCoalesce { left, right } => {
            expression_lines(left, child, out);
            expression_lines(right, child, out);
        }
        ExprKind::Ternary {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            expression_lines(condition, child, out);
            expression_lines(then_branch, child, out);
            expression_lines(else_branch, child, out);
        }
        ExprKind::Assignment { target, value, .. } => {
            expression_lines(target, child, out);
            expression_lines(value, child, out);
        }
        ExprKind::Call { target, args, .. }
        | ExprKind::New { target, args, .. }
        | ExprKind::Index { target, args, .. } => {
            expression_lines(target, child, out);
            for arg in args {
                expression_lines(arg, child, out);
            }
        }
        ExprKind::MemberAccess { target, .. } => expression_lines(target, child, out),
        ExprKind::Declaration {
            initializer: Some(init),
            ..
        } => expression_lines(init, child, out),
        ExprKind::ArrayLiteral { items, .. } => {
            for item in items {
                expression_lines(item, child, out);
            }
        }
        ExprKind::AnonymousFunction { body, .. } => {
            for statement in body.iter() {
                statement_lines(statement, child, out);
            }
        }
        ExprKind::Block(statements) => {
            for statement in statements {
                statement_lines(statement, child, out);
            }
        }
        _ => {}
    }
}

fn tree_item(line: &TreeLine) -> ListItem<'_> {
    let mut spans = vec![Span::styled(
        format!("{}{}", "  ".repeat(line.depth), line.label),
        Style::default().fg(DEFAULT_THEME.fg),
    )];
    if let Some(ty) = &line.ty {
        spans.push(Span::styled(format!(" : {}", ty), Style::default().fg(DEFAULT_THEME.type_name)));
    }
    if let Some(binding) = &line.binding {
        spans.push(Span::styled(format!("  [{}]", binding), Style::default().fg(DEFAULT_THEME.comment)));
    }
    ListItem::new(Line::from(spans))
}

pub fn render_tree_pane(
    frame: &mut Frame,
    area: Rect,
    tree: &[TreeLine],
    instructions: &[String],
    scroll_offset: &mut usize,
) {
    let mut items: Vec<ListItem> = tree.iter().map(tree_item).collect();
    if !instructions.is_empty() {
        items.push(ListItem::new(Line::from(Span::styled(
            "-- emitted --",
            Style::default().fg(DEFAULT_THEME.comment),
        ))));
        items.extend(
            instructions
                .iter()
                .map(|i| ListItem::new(i.as_str()).style(Style::default().fg(DEFAULT_THEME.instruction))),
        );
    }

    let block = pane_block(" Tree ", false).padding(Padding::new(1, 0, 0, 0));
    let visible_height = visible_rows(area);
    clamp_scroll(scroll_offset, items.len(), visible_height);
    let visible_items: Vec<ListItem> = items.into_iter().skip(*scroll_offset).take(visible_height).collect();

    frame.render_widget(List::new(visible_items).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::types::TypeRegistry;
    use crate::parser::Parser;

    #[test]
    fn test_rows_follow_tree_shape() {
        let program = Parser::new("var x = 1 + 2").parse_program().unwrap();
        let labels: Vec<(usize, String)> = collect_tree(&program)
            .into_iter()
            .map(|line| (line.depth, line.label))
            .collect();
        assert_eq!(
            labels,
            vec![
                (0, "var x".to_string()),
                (1, "binary +".to_string()),
                (2, "1".to_string()),
                (2, "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_bound_rows_carry_types() {
        let registry = TypeRegistry::new();
        let program = Parser::new("var x = 2; x * 1.5").parse_program().unwrap();
        crate::bind(&program, &registry, None).unwrap();
        let lines = collect_tree(&program);
        let product = lines.iter().find(|line| line.label == "binary *").unwrap();
        assert_eq!(product.ty.as_deref(), Some("double"));
        let x = lines.iter().find(|line| line.label == "x").unwrap();
        assert!(x.binding.as_deref().is_some_and(|b| b.starts_with("local #0")));
    }
}
