//! SQLite connection implementation.
//!
//! Safe wrappers around the SQLite C API implementing the `Connection`
//! trait from crmsql-core. Prepared statements are compiled once per SQL
//! text and kept on the connection until it closes.

// Allow casts in FFI code where we need to match C types exactly
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::result_large_err)] // Error type is defined in crmsql-core
#![allow(clippy::borrow_as_ptr)] // FFI requires raw pointers
#![allow(clippy::if_not_else)] // Clearer for error handling

use crate::types;
use crmsql_core::{
    Connection, Cx, Error, Outcome, PreparedStatement, Row, TransactionOps, Value,
    error::{
        ConnectionError, ConnectionErrorKind, QueryError, QueryErrorKind, TransactionError,
        TransactionErrorKind,
    },
    row::ColumnInfo,
};
use libsqlite3_sys as ffi;
use std::collections::HashMap;
use std::ffi::{CStr, CString, c_int};
use std::future::Future;
use std::ptr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// libsqlite3-sys 0.37 omits `sqlite3_close_v2` from its generated bindings;
// the bundled library still exports the symbol.
unsafe extern "C" {
    fn sqlite3_close_v2(db: *mut ffi::sqlite3) -> c_int;
}

/// Configuration for opening SQLite connections.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Path to the database file, or ":memory:" for in-memory database.
    pub path: String,
    /// Open flags (read-only, read-write, create, etc.)
    pub flags: OpenFlags,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

/// Flags controlling how the database is opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFlags {
    /// Open for reading only.
    pub read_only: bool,
    /// Open for reading and writing.
    pub read_write: bool,
    /// Create the database if it doesn't exist.
    pub create: bool,
    /// Enable URI filename interpretation.
    pub uri: bool,
    /// Open in multi-thread mode (connections not shared between threads).
    pub no_mutex: bool,
    /// Open in serialized mode (connections can be shared).
    pub full_mutex: bool,
    /// Enable shared cache mode.
    pub shared_cache: bool,
    /// Disable shared cache mode.
    pub private_cache: bool,
}

impl OpenFlags {
    /// Create flags for read-only access.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Default::default()
        }
    }

    /// Create flags for read-write access (database must exist).
    pub fn read_write() -> Self {
        Self {
            read_write: true,
            ..Default::default()
        }
    }

    /// Create flags for read-write access with creation if needed.
    pub fn create_read_write() -> Self {
        Self {
            read_write: true,
            create: true,
            ..Default::default()
        }
    }

    fn to_sqlite_flags(self) -> c_int {
        let mut flags = 0;

        if self.read_only {
            flags |= ffi::SQLITE_OPEN_READONLY;
        }
        if self.read_write {
            flags |= ffi::SQLITE_OPEN_READWRITE;
        }
        if self.create {
            flags |= ffi::SQLITE_OPEN_CREATE;
        }
        if self.uri {
            flags |= ffi::SQLITE_OPEN_URI;
        }
        if self.no_mutex {
            flags |= ffi::SQLITE_OPEN_NOMUTEX;
        }
        if self.full_mutex {
            flags |= ffi::SQLITE_OPEN_FULLMUTEX;
        }
        if self.shared_cache {
            flags |= ffi::SQLITE_OPEN_SHAREDCACHE;
        }
        if self.private_cache {
            flags |= ffi::SQLITE_OPEN_PRIVATECACHE;
        }

        // Default to read-write if no mode specified
        if flags & (ffi::SQLITE_OPEN_READONLY | ffi::SQLITE_OPEN_READWRITE) == 0 {
            flags |= ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE;
        }

        flags
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: ":memory:".to_string(),
            flags: OpenFlags::create_read_write(),
            busy_timeout_ms: 5000,
        }
    }
}

impl SqliteConfig {
    /// Create a new config for a file-based database.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Create a new config for an in-memory database.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Set open flags.
    pub fn flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set busy timeout.
    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = ms;
        self
    }
}

/// Inner state of the SQLite connection, protected by a mutex.
struct SqliteInner {
    db: *mut ffi::sqlite3,
    in_transaction: bool,
    /// Compiled statements handed out by `prepare`, keyed by statement id.
    statements: HashMap<u64, *mut ffi::sqlite3_stmt>,
    /// Statement id of each kept SQL text; one handle per distinct text.
    statement_ids: HashMap<String, u64>,
    next_statement_id: u64,
}

// SAFETY: SQLite handles can be sent between threads when access is
// synchronized. Every use goes through the Mutex.
unsafe impl Send for SqliteInner {}

/// A connection to a SQLite database.
///
/// This is a thread-safe wrapper around a SQLite database handle.
pub struct SqliteConnection {
    inner: Mutex<SqliteInner>,
    path: String,
}

// SqliteConnection is Send + Sync because all access goes through the Mutex
unsafe impl Send for SqliteConnection {}
unsafe impl Sync for SqliteConnection {}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteConnection {
    /// Open a new SQLite connection with the given configuration.
    pub fn open(config: &SqliteConfig) -> Result<Self, Error> {
        let c_path = CString::new(config.path.as_str()).map_err(|_| {
            Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Connect,
                message: "Invalid path: contains null byte".to_string(),
            })
        })?;

        let mut db: *mut ffi::sqlite3 = ptr::null_mut();
        let flags = config.flags.to_sqlite_flags();

        // SAFETY: We pass valid pointers and check the return value
        let rc = unsafe { ffi::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };

        if rc != ffi::SQLITE_OK {
            let msg = if !db.is_null() {
                // SAFETY: db is valid, errmsg returns a valid C string
                unsafe {
                    let msg = error_message(db);
                    ffi::sqlite3_close(db);
                    msg
                }
            } else {
                error_string(rc)
            };

            return Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Connect,
                message: format!("Failed to open database: {}", msg),
            }));
        }

        if config.busy_timeout_ms > 0 {
            // SAFETY: db is valid
            unsafe {
                ffi::sqlite3_busy_timeout(db, config.busy_timeout_ms as c_int);
            }
        }

        tracing::debug!(path = %config.path, "opened sqlite database");

        Ok(Self {
            inner: Mutex::new(SqliteInner {
                db,
                in_transaction: false,
                statements: HashMap::new(),
                statement_ids: HashMap::new(),
                next_statement_id: 1,
            }),
            path: config.path.clone(),
        })
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, Error> {
        Self::open(&SqliteConfig::memory())
    }

    /// Open a file-based database.
    pub fn open_file(path: impl Into<String>) -> Result<Self, Error> {
        Self::open(&SqliteConfig::file(path))
    }

    /// Get the database path.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, SqliteInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Execute SQL directly without preparing (for DDL, etc.)
    pub fn execute_raw(&self, sql: &str) -> Result<(), Error> {
        let inner = self.lock();
        exec(inner.db, sql)
    }

    /// Get the number of rows changed by the last statement.
    pub fn changes(&self) -> i32 {
        let inner = self.lock();
        // SAFETY: db is valid
        unsafe { ffi::sqlite3_changes(inner.db) }
    }

    /// Is a transaction open on this connection?
    pub fn in_transaction(&self) -> bool {
        self.lock().in_transaction
    }

    /// Number of statements kept by `prepare`.
    pub fn prepared_statement_count(&self) -> usize {
        self.lock().statements.len()
    }

    /// Prepare and execute a query, returning all rows.
    fn query_sync(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, Error> {
        tracing::trace!(sql = %sql, params = params.len(), "query");
        let inner = self.lock();
        let stmt = prepare_stmt(inner.db, sql)?;
        let result = bind_params(inner.db, stmt, sql, params).and_then(|()| fetch_rows(inner.db, stmt, sql));
        // SAFETY: stmt is valid and not used afterwards
        unsafe { ffi::sqlite3_finalize(stmt) };
        result
    }

    /// Prepare and execute a statement, returning rows affected.
    fn execute_sync(&self, sql: &str, params: &[Value]) -> Result<u64, Error> {
        tracing::trace!(sql = %sql, params = params.len(), "execute");
        let inner = self.lock();
        let stmt = prepare_stmt(inner.db, sql)?;
        let result = bind_params(inner.db, stmt, sql, params).and_then(|()| step_to_end(inner.db, stmt, sql));
        // SAFETY: stmt is valid and not used afterwards
        unsafe { ffi::sqlite3_finalize(stmt) };
        result
    }

    /// Compile a statement and keep it for repeated execution.
    ///
    /// Preparing the same text again hands out the already kept handle, so
    /// the number of kept statements is bounded by the distinct texts.
    fn prepare_sync(&self, sql: &str) -> Result<PreparedStatement, Error> {
        let mut inner = self.lock();

        if let Some(&id) = inner.statement_ids.get(sql) {
            if let Some(&stmt) = inner.statements.get(&id) {
                tracing::trace!(id, "reusing prepared statement");
                return Ok(describe(id, sql, stmt));
            }
        }

        let stmt = prepare_stmt(inner.db, sql)?;
        let id = inner.next_statement_id;
        inner.next_statement_id += 1;
        inner.statements.insert(id, stmt);
        inner.statement_ids.insert(sql.to_string(), id);
        tracing::trace!(id, sql = %sql, "prepared statement");

        Ok(describe(id, sql, stmt))
    }

    /// Run `f` on the kept handle of `prepared`. A statement this
    /// connection did not prepare is compiled for this one call.
    fn with_prepared<T>(
        &self,
        prepared: &PreparedStatement,
        params: &[Value],
        f: impl FnOnce(*mut ffi::sqlite3, *mut ffi::sqlite3_stmt, &str) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let sql = prepared.sql();
        if !prepared.validate_params(params) {
            return Err(parameter_count_error(sql, prepared.param_count(), params.len()));
        }

        let inner = self.lock();
        let db = inner.db;
        let kept = inner
            .statements
            .get(&prepared.id())
            .copied()
            // SAFETY: kept handles stay valid until the connection drops
            .filter(|&stmt| unsafe { statement_sql(stmt) }.as_deref() == Some(sql));

        match kept {
            Some(stmt) => {
                // SAFETY: stmt is a live handle owned by this connection
                unsafe {
                    ffi::sqlite3_reset(stmt);
                    ffi::sqlite3_clear_bindings(stmt);
                }
                let result = bind_params(db, stmt, sql, params).and_then(|()| f(db, stmt, sql));
                // Release locks held by a partially stepped statement
                // SAFETY: as above
                unsafe { ffi::sqlite3_reset(stmt) };
                result
            }
            None => {
                let stmt = prepare_stmt(db, sql)?;
                let result = bind_params(db, stmt, sql, params).and_then(|()| f(db, stmt, sql));
                // SAFETY: stmt is valid and not used afterwards
                unsafe { ffi::sqlite3_finalize(stmt) };
                result
            }
        }
    }

    fn query_prepared_sync(&self, stmt: &PreparedStatement, params: &[Value]) -> Result<Vec<Row>, Error> {
        tracing::trace!(id = stmt.id(), "query prepared");
        self.with_prepared(stmt, params, fetch_rows)
    }

    fn execute_prepared_sync(&self, stmt: &PreparedStatement, params: &[Value]) -> Result<u64, Error> {
        tracing::trace!(id = stmt.id(), "execute prepared");
        self.with_prepared(stmt, params, step_to_end)
    }

    /// Begin a transaction.
    fn begin_sync(&self) -> Result<(), Error> {
        let mut inner = self.lock();
        if inner.in_transaction {
            return Err(Error::Transaction(TransactionError {
                kind: TransactionErrorKind::AlreadyActive,
                message: "Already in a transaction".to_string(),
            }));
        }
        exec(inner.db, "BEGIN IMMEDIATE")?;
        inner.in_transaction = true;
        tracing::trace!("BEGIN");
        Ok(())
    }

    /// End the current transaction with `COMMIT` or `ROLLBACK`.
    fn finish_sync(&self, sql: &str) -> Result<(), Error> {
        let mut inner = self.lock();
        if !inner.in_transaction {
            return Err(Error::Transaction(TransactionError {
                kind: TransactionErrorKind::NotActive,
                message: "Not in a transaction".to_string(),
            }));
        }
        let result = exec(inner.db, sql);
        // SAFETY: db is valid
        if unsafe { ffi::sqlite3_get_autocommit(inner.db) } != 0 {
            inner.in_transaction = false;
        }
        tracing::trace!(outcome = sql, ok = result.is_ok(), "transaction finished");
        result
    }

    fn commit_sync(&self) -> Result<(), Error> {
        self.finish_sync("COMMIT")
    }

    fn rollback_sync(&self) -> Result<(), Error> {
        self.finish_sync("ROLLBACK")
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        inner.statement_ids.clear();
        for (_, stmt) in inner.statements.drain() {
            // SAFETY: every kept handle is finalized exactly once
            unsafe { ffi::sqlite3_finalize(stmt) };
        }
        if !inner.db.is_null() {
            // SAFETY: db is valid
            unsafe {
                sqlite3_close_v2(inner.db);
            }
        }
    }
}

/// A SQLite transaction.
pub struct SqliteTransaction<'conn> {
    conn: &'conn SqliteConnection,
    committed: bool,
}

impl<'conn> SqliteTransaction<'conn> {
    fn new(conn: &'conn SqliteConnection) -> Self {
        Self {
            conn,
            committed: false,
        }
    }
}

impl Drop for SqliteTransaction<'_> {
    fn drop(&mut self) {
        if !self.committed {
            // Auto-rollback on drop if not committed
            if let Err(e) = self.conn.rollback_sync() {
                tracing::warn!(error = %e, "rollback of dropped transaction failed");
            }
        }
    }
}

impl Connection for SqliteConnection {
    type Tx<'conn>
        = SqliteTransaction<'conn>
    where
        Self: 'conn;

    fn query(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send {
        let result = self.query_sync(sql, params);
        async move { result.map_or_else(Outcome::Err, Outcome::Ok) }
    }

    fn query_one(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Option<Row>, Error>> + Send {
        let result = self
            .query_sync(sql, params)
            .map(|rows| rows.into_iter().next());
        async move { result.map_or_else(Outcome::Err, Outcome::Ok) }
    }

    fn execute(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        let result = self.execute_sync(sql, params);
        async move { result.map_or_else(Outcome::Err, Outcome::Ok) }
    }

    fn batch(
        &self,
        _cx: &Cx,
        statements: &[(String, Vec<Value>)],
    ) -> impl Future<Output = Outcome<Vec<u64>, Error>> + Send {
        let mut results = Vec::with_capacity(statements.len());
        let mut error = None;

        for (sql, params) in statements {
            match self.execute_sync(sql, params) {
                Ok(n) => results.push(n),
                Err(e) => {
                    error = Some(e);
                    break;
                }
            }
        }

        async move {
            match error {
                Some(e) => Outcome::Err(e),
                None => Outcome::Ok(results),
            }
        }
    }

    fn begin(&self, _cx: &Cx) -> impl Future<Output = Outcome<Self::Tx<'_>, Error>> + Send {
        let result = self.begin_sync().map(|()| SqliteTransaction::new(self));
        async move { result.map_or_else(Outcome::Err, Outcome::Ok) }
    }

    fn prepare(
        &self,
        _cx: &Cx,
        sql: &str,
    ) -> impl Future<Output = Outcome<PreparedStatement, Error>> + Send {
        let result = self.prepare_sync(sql);
        async move { result.map_or_else(Outcome::Err, Outcome::Ok) }
    }

    fn query_prepared(
        &self,
        _cx: &Cx,
        stmt: &PreparedStatement,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send {
        let result = self.query_prepared_sync(stmt, params);
        async move { result.map_or_else(Outcome::Err, Outcome::Ok) }
    }

    fn execute_prepared(
        &self,
        _cx: &Cx,
        stmt: &PreparedStatement,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        let result = self.execute_prepared_sync(stmt, params);
        async move { result.map_or_else(Outcome::Err, Outcome::Ok) }
    }

    fn ping(&self, _cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send {
        let result = self.query_sync("SELECT 1", &[]).map(|_| ());
        async move { result.map_or_else(Outcome::Err, Outcome::Ok) }
    }
}

impl TransactionOps for SqliteTransaction<'_> {
    fn query(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send {
        let result = self.conn.query_sync(sql, params);
        async move { result.map_or_else(Outcome::Err, Outcome::Ok) }
    }

    fn execute(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        let result = self.conn.execute_sync(sql, params);
        async move { result.map_or_else(Outcome::Err, Outcome::Ok) }
    }

    async fn commit(mut self, _cx: &Cx) -> Outcome<(), Error> {
        self.committed = true;
        self.conn
            .commit_sync()
            .map_or_else(Outcome::Err, Outcome::Ok)
    }

    async fn rollback(mut self, _cx: &Cx) -> Outcome<(), Error> {
        self.committed = true; // Prevent double rollback in drop
        self.conn
            .rollback_sync()
            .map_or_else(Outcome::Err, Outcome::Ok)
    }
}

// Helper functions

fn exec(db: *mut ffi::sqlite3, sql: &str) -> Result<(), Error> {
    let c_sql = CString::new(sql).map_err(|_| null_byte_error(sql))?;
    let mut errmsg: *mut std::ffi::c_char = ptr::null_mut();

    // SAFETY: All pointers are valid
    let rc = unsafe { ffi::sqlite3_exec(db, c_sql.as_ptr(), None, ptr::null_mut(), &mut errmsg) };

    if rc != ffi::SQLITE_OK {
        let message = if !errmsg.is_null() {
            // SAFETY: errmsg is a valid C string allocated by SQLite
            let msg = unsafe { CStr::from_ptr(errmsg).to_string_lossy().into_owned() };
            unsafe { ffi::sqlite3_free(errmsg.cast()) };
            msg
        } else {
            error_string(rc)
        };

        return Err(Error::Query(QueryError {
            kind: error_code_to_kind(rc),
            sql: Some(sql.to_string()),
            message,
            code: Some(rc),
        }));
    }

    Ok(())
}

fn prepare_stmt(db: *mut ffi::sqlite3, sql: &str) -> Result<*mut ffi::sqlite3_stmt, Error> {
    let c_sql = CString::new(sql).map_err(|_| null_byte_error(sql))?;
    let mut stmt: *mut ffi::sqlite3_stmt = ptr::null_mut();

    // SAFETY: All pointers are valid
    let rc = unsafe {
        ffi::sqlite3_prepare_v2(
            db,
            c_sql.as_ptr(),
            c_sql.as_bytes().len() as c_int,
            &mut stmt,
            ptr::null_mut(),
        )
    };

    if rc != ffi::SQLITE_OK {
        return Err(database_error(db, sql));
    }

    Ok(stmt)
}

/// Handle-independent description of a kept statement.
fn describe(id: u64, sql: &str, stmt: *mut ffi::sqlite3_stmt) -> PreparedStatement {
    // SAFETY: stmt is a live handle owned by the connection
    let param_count = unsafe { ffi::sqlite3_bind_parameter_count(stmt) } as usize;
    let col_count = unsafe { ffi::sqlite3_column_count(stmt) };
    let columns = (0..col_count)
        .map(|i| unsafe { types::column_name(stmt, i) }.unwrap_or_else(|| format!("col{}", i)))
        .collect();
    PreparedStatement::new(id, sql.to_string(), param_count, columns)
}

fn bind_params(
    db: *mut ffi::sqlite3,
    stmt: *mut ffi::sqlite3_stmt,
    sql: &str,
    params: &[Value],
) -> Result<(), Error> {
    // SAFETY: stmt is valid
    let expected = unsafe { ffi::sqlite3_bind_parameter_count(stmt) } as usize;
    if expected != params.len() {
        return Err(parameter_count_error(sql, expected, params.len()));
    }

    for (i, param) in params.iter().enumerate() {
        // SAFETY: stmt is valid, index is 1-based
        let rc = unsafe { types::bind_value(stmt, (i + 1) as c_int, param) };
        if rc != ffi::SQLITE_OK {
            return Err(Error::Query(QueryError {
                kind: QueryErrorKind::Database,
                sql: Some(sql.to_string()),
                message: format!("Failed to bind parameter {}: {}", i + 1, unsafe {
                    error_message(db)
                }),
                code: Some(rc),
            }));
        }
    }
    Ok(())
}

fn fetch_rows(db: *mut ffi::sqlite3, stmt: *mut ffi::sqlite3_stmt, sql: &str) -> Result<Vec<Row>, Error> {
    // SAFETY: stmt is valid
    let col_count = unsafe { ffi::sqlite3_column_count(stmt) };
    let col_names = (0..col_count)
        .map(|i| unsafe { types::column_name(stmt, i) }.unwrap_or_else(|| format!("col{}", i)))
        .collect();
    let columns = Arc::new(ColumnInfo::new(col_names));

    let mut rows = Vec::new();
    loop {
        // SAFETY: stmt is valid
        match unsafe { ffi::sqlite3_step(stmt) } {
            ffi::SQLITE_ROW => {
                let values = (0..col_count)
                    // SAFETY: stmt is valid, we just got SQLITE_ROW
                    .map(|i| unsafe { types::read_column(stmt, i) })
                    .collect();
                rows.push(Row::with_columns(Arc::clone(&columns), values));
            }
            ffi::SQLITE_DONE => break,
            _ => return Err(database_error(db, sql)),
        }
    }
    Ok(rows)
}

fn step_to_end(db: *mut ffi::sqlite3, stmt: *mut ffi::sqlite3_stmt, sql: &str) -> Result<u64, Error> {
    // SAFETY: stmt is valid
    match unsafe { ffi::sqlite3_step(stmt) } {
        // SAFETY: db is valid
        ffi::SQLITE_DONE | ffi::SQLITE_ROW => Ok(unsafe { ffi::sqlite3_changes(db) } as u64),
        _ => Err(database_error(db, sql)),
    }
}

/// Message of the last error on `db`.
///
/// # Safety
/// `db` must be a valid connection handle.
unsafe fn error_message(db: *mut ffi::sqlite3) -> String {
    // SAFETY: guaranteed by the caller
    unsafe {
        let ptr = ffi::sqlite3_errmsg(db);
        if ptr.is_null() {
            return String::new();
        }
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

/// Original text of a compiled statement.
///
/// # Safety
/// `stmt` must be a valid statement handle.
unsafe fn statement_sql(stmt: *mut ffi::sqlite3_stmt) -> Option<String> {
    // SAFETY: guaranteed by the caller
    unsafe {
        let ptr = ffi::sqlite3_sql(stmt);
        if ptr.is_null() {
            None
        } else {
            CStr::from_ptr(ptr).to_str().ok().map(String::from)
        }
    }
}

fn error_string(rc: c_int) -> String {
    // SAFETY: sqlite3_errstr returns a pointer to a static string
    unsafe {
        let ptr = ffi::sqlite3_errstr(rc);
        if ptr.is_null() {
            return format!("SQLite error {}", rc);
        }
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

fn database_error(db: *mut ffi::sqlite3, sql: &str) -> Error {
    // SAFETY: db is valid
    let (message, code) = unsafe { (error_message(db), ffi::sqlite3_errcode(db)) };
    let kind = if code == ffi::SQLITE_ERROR && message.contains("syntax error") {
        QueryErrorKind::Syntax
    } else if code == ffi::SQLITE_ERROR && message.starts_with("no such") {
        QueryErrorKind::NotFound
    } else {
        error_code_to_kind(code)
    };
    Error::Query(QueryError {
        kind,
        sql: Some(sql.to_string()),
        message,
        code: Some(code),
    })
}

fn parameter_count_error(sql: &str, expected: usize, actual: usize) -> Error {
    Error::Query(QueryError {
        kind: QueryErrorKind::ParameterCount,
        sql: Some(sql.to_string()),
        message: format!("expected {} parameters, got {}", expected, actual),
        code: None,
    })
}

fn null_byte_error(sql: &str) -> Error {
    Error::Query(QueryError {
        kind: QueryErrorKind::Syntax,
        sql: Some(sql.to_string()),
        message: "SQL contains null byte".to_string(),
        code: None,
    })
}

fn error_code_to_kind(code: c_int) -> QueryErrorKind {
    match code & 0xff {
        ffi::SQLITE_CONSTRAINT => QueryErrorKind::Constraint,
        ffi::SQLITE_BUSY | ffi::SQLITE_LOCKED => QueryErrorKind::Busy,
        ffi::SQLITE_NOTFOUND => QueryErrorKind::NotFound,
        ffi::SQLITE_RANGE => QueryErrorKind::ParameterCount,
        _ => QueryErrorKind::Database,
    }
}
