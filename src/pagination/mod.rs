//! Pagination Module
//!
//! Cursor encoding and page planning for keyset and offset navigation.

mod cursor;
mod planner;

pub use cursor::{Cursor, CursorError};
pub use planner::{
    build_where_clause, cursor_for, generate_page_info, offset_page_info, order_by, total_pages,
    Direction, PageInfo,
};
