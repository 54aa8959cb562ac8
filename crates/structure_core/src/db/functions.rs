//! SQL functions registered on every store connection.
//!
//! # Invariants
//! - `fold_case(text)` lowercases with Unicode rules; SQLite's `lower()`
//!   only folds ASCII. Name matching must compare folded text on both sides.
//! - `fold_case(NULL)` is `NULL`.

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

pub(crate) fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|value| value.to_lowercase()))
        },
    )
}
