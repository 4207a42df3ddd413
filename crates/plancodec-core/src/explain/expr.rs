use crate::{
    explain::InfoStyle,
    plan::{ByItem, Escaped, Expr, Literal},
};
use std::fmt::Write;

/// Append `items` separated by `sep`.
pub(crate) fn write_joined<T>(
    out: &mut String,
    items: &[T],
    sep: &str,
    mut write_item: impl FnMut(&mut String, &T),
) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        write_item(out, item);
    }
}

pub(crate) fn write_literal<S: InfoStyle>(out: &mut String, literal: &Literal, _style: &S) {
    if S::NORMALIZED {
        out.push('?');
    } else {
        let _ = write!(out, "{literal}");
    }
}

pub(crate) fn write_expr<S: InfoStyle>(out: &mut String, expr: &Expr, style: &S) {
    match expr {
        Expr::Column(column) => style.column(out, column),
        Expr::Constant(literal) => write_literal(out, literal, style),
        Expr::Func { name, args } if S::NORMALIZED && expr.is_in_list() => {
            write_in_list(out, name, args, style);
        }
        Expr::Func { name, args } => {
            let _ = write!(out, "{}", Escaped::name(name));
            out.push('(');
            write_exprs(out, args, style);
            out.push(')');
        }
    }
}

pub(crate) fn write_exprs<S: InfoStyle>(out: &mut String, exprs: &[Expr], style: &S) {
    write_joined(out, exprs, ", ", |out, expr| write_expr(out, expr, style));
}

pub(crate) fn write_by_items<S: InfoStyle>(out: &mut String, items: &[ByItem], style: &S) {
    write_joined(out, items, ", ", |out, item| {
        write_expr(out, &item.expr, style);
        if item.desc {
            out.push_str(":desc");
        }
    });
}

// Membership lists keep the probed operand and any non-constant members;
// every constant member collapses into one `...` whatever the list length.
fn write_in_list<S: InfoStyle>(out: &mut String, name: &str, args: &[Expr], style: &S) {
    let _ = write!(out, "{}", Escaped::name(name));
    out.push('(');

    if let Some((probe, members)) = args.split_first() {
        write_expr(out, probe, style);

        let mut erased = false;
        for member in members {
            if matches!(member, Expr::Constant(_)) {
                erased = true;
            } else {
                out.push_str(", ");
                write_expr(out, member, style);
            }
        }
        if erased {
            out.push_str(", ...");
        }
    }

    out.push(')');
}
