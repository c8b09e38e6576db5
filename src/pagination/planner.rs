//! Keyset and offset page planning.
//!
//! One boundary comparison serves both directions: backward navigation flips
//! the operator and the fetch order, then restores display order after the
//! over-fetch is trimmed.

use serde::{Deserialize, Serialize};

use crate::catalog::{
    CompareOp, OrderBy, Predicate, SortField, SortOrder, SortSpec, SortValue, Sortable,
};
use crate::pagination::Cursor;

/// Navigation direction relative to a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Rows after the cursor (`after=`)
    Forward,
    /// Rows before the cursor (`before=`)
    Backward,
}

/// Navigation metadata for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

/// Boundary predicate equivalent to `(field, id) > (value, id)` for forward
/// ascending pages, with the comparison mirrored for descending order and
/// for backward navigation.
pub fn build_where_clause(cursor: &Cursor, direction: Direction) -> Predicate {
    let op = boundary_op(cursor.sort_order(), direction);
    let id_bound = Predicate::Compare {
        field: SortField::Id,
        op,
        value: SortValue::Int(cursor.boundary_id()),
    };

    if cursor.sort_field() == SortField::Id {
        return id_bound;
    }

    Predicate::Or(vec![
        Predicate::Compare {
            field: cursor.sort_field(),
            op,
            value: cursor.boundary_value().clone(),
        },
        Predicate::And(vec![
            Predicate::Compare {
                field: cursor.sort_field(),
                op: CompareOp::Eq,
                value: cursor.boundary_value().clone(),
            },
            id_bound,
        ]),
    ])
}

fn boundary_op(order: SortOrder, direction: Direction) -> CompareOp {
    match (order, direction) {
        (SortOrder::Asc, Direction::Forward) | (SortOrder::Desc, Direction::Backward) => {
            CompareOp::Gt
        }
        (SortOrder::Desc, Direction::Forward) | (SortOrder::Asc, Direction::Backward) => {
            CompareOp::Lt
        }
    }
}

/// Fetch ordering. Backward pages read away from the boundary, so the order
/// is reversed; [`generate_page_info`] puts rows back in display order.
pub fn order_by(sort: SortSpec, direction: Direction) -> Vec<OrderBy> {
    let order = match direction {
        Direction::Forward => sort.order,
        Direction::Backward => sort.order.reversed(),
    };
    let mut terms = vec![OrderBy {
        field: sort.field,
        order,
    }];
    if sort.field != SortField::Id {
        terms.push(OrderBy {
            field: SortField::Id,
            order,
        });
    }
    terms
}

/// Mints the cursor pointing at `row`.
pub fn cursor_for<T: Sortable>(row: &T, sort: SortSpec, limit: u32, fingerprint: &str) -> String {
    Cursor::new(sort, row.sort_value(sort.field), row.id(), limit, fingerprint).encode()
}

/// Trims a keyset over-fetch and derives its page info.
///
/// `rows` must be in fetch order and fetched with `limit + 1`. With
/// `arrived_via_cursor`, the page on the far side of the cursor is known to
/// exist: forward pages report a previous page, backward pages a next page.
pub fn generate_page_info<T: Sortable>(
    mut rows: Vec<T>,
    limit: u32,
    sort: SortSpec,
    fingerprint: &str,
    direction: Direction,
    arrived_via_cursor: bool,
) -> (Vec<T>, PageInfo) {
    let over_fetched = rows.len() > limit as usize;
    rows.truncate(limit as usize);
    if direction == Direction::Backward {
        rows.reverse();
    }

    let (has_next_page, has_previous_page) = match direction {
        Direction::Forward => (over_fetched, arrived_via_cursor),
        Direction::Backward => (arrived_via_cursor, over_fetched),
    };

    let page_info = PageInfo {
        has_next_page,
        has_previous_page,
        start_cursor: rows.first().map(|row| cursor_for(row, sort, limit, fingerprint)),
        end_cursor: rows.last().map(|row| cursor_for(row, sort, limit, fingerprint)),
    };
    (rows, page_info)
}

/// Page info for legacy offset pages.
///
/// Start and end cursors are still minted so offset clients can switch to
/// keyset navigation from any page.
pub fn offset_page_info<T: Sortable>(
    rows: &[T],
    page: u64,
    limit: u32,
    total: u64,
    sort: SortSpec,
    fingerprint: &str,
) -> PageInfo {
    PageInfo {
        has_next_page: page.saturating_mul(limit as u64) < total,
        has_previous_page: page > 1,
        start_cursor: rows.first().map(|row| cursor_for(row, sort, limit, fingerprint)),
        end_cursor: rows.last().map(|row| cursor_for(row, sort, limit, fingerprint)),
    }
}

pub fn total_pages(total: u64, limit: u32) -> u64 {
    if limit == 0 {
        0
    } else {
        total.div_ceil(limit as u64)
    }
}
