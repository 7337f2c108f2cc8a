//! SQLite driver for CRMSQL.
//!
// FFI bindings require unsafe code
#![allow(unsafe_code)]
//!
//! Implements the `Connection` contract from crmsql-core on top of
//! `libsqlite3-sys` (bundled SQLite). Statements run synchronously under a
//! mutex; the async surface wraps the finished result so cancellation is
//! observed between statements, never inside one.
//!
//! # Type Mapping
//!
//! | Value | SQLite |
//! |-------|--------|
//! | `Bool` | INTEGER (0/1) |
//! | `Int`, `BigInt` | INTEGER |
//! | `Double` | REAL |
//! | `Text` | TEXT |
//! | `Bytes` | BLOB |
//! | `Null` | NULL |
//!
//! # Example
//!
//! ```rust,ignore
//! use crmsql_sqlite::SqliteConnection;
//! use crmsql_core::{Connection, Cx, Value};
//!
//! let conn = SqliteConnection::open_memory()?;
//! conn.execute_raw("CREATE TABLE CRM_KP (recid TEXT PRIMARY KEY, title TEXT)")?;
//! let cx = Cx::for_testing();
//! conn.execute(&cx, "INSERT INTO CRM_KP VALUES (?, ?)", &[Value::from("KP1"), Value::from("KP")]).await;
//! ```

pub mod connection;
pub mod types;

pub use connection::{OpenFlags, SqliteConfig, SqliteConnection, SqliteTransaction};

/// SQLite library version string.
pub fn sqlite_version() -> &'static str {
    // SAFETY: sqlite3_libversion returns a pointer to a static string
    unsafe {
        std::ffi::CStr::from_ptr(libsqlite3_sys::sqlite3_libversion())
            .to_str()
            .unwrap_or("unknown")
    }
}
