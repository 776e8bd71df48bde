use sqlx::{PgConnection, PgPool};
use tracing::debug;

use super::manager::DatabaseError;
use super::value::{bind_query, bind_query_scalar, SqlValue};

/// One parameterised SQL statement
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, args: Vec<SqlValue>) -> Self {
        Self { sql: sql.into(), args }
    }

    pub async fn execute(&self, conn: &mut PgConnection) -> Result<u64, DatabaseError> {
        let mut q = sqlx::query(&self.sql);
        for arg in &self.args {
            q = bind_query(q, arg);
        }
        Ok(q.execute(conn).await?.rows_affected())
    }
}

/// An ordered batch of statements applied all-or-nothing.
///
/// With `main` set, the first statement is the one the caller cares about:
/// its affected-row count is the result, and when it touched nothing the
/// whole batch is rolled back and `0` is returned. Without `main` the result
/// is the total of all affected rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Statements {
    main: bool,
    items: Vec<Statement>,
}

impl Statements {
    pub fn new(main: bool) -> Self {
        Self { main, items: Vec::new() }
    }

    pub fn add(&mut self, statement: Statement) -> &mut Self {
        self.items.push(statement);
        self
    }

    pub fn add_opt(&mut self, statement: Option<Statement>) -> &mut Self {
        if let Some(st) = statement {
            self.items.push(st);
        }
        self
    }

    pub fn is_main(&self) -> bool {
        self.main
    }

    pub fn items(&self) -> &[Statement] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Run the batch inside one transaction on `pool`.
    ///
    /// The transaction is only committed after the last statement succeeds.
    /// If this future is dropped before that, the transaction is dropped with
    /// it and Postgres rolls everything back.
    pub async fn exec(&self, pool: &PgPool) -> Result<i64, DatabaseError> {
        if self.items.is_empty() {
            return Ok(0);
        }
        let mut tx = pool.begin().await?;
        let mut first = 0i64;
        let mut total = 0i64;
        for (i, st) in self.items.iter().enumerate() {
            let affected = st.execute(&mut *tx).await? as i64;
            debug!(statement = i, affected, "batch statement executed");
            if i == 0 {
                first = affected;
                if self.main && first == 0 {
                    tx.rollback().await?;
                    return Ok(0);
                }
            }
            total += affected;
        }
        tx.commit().await?;
        Ok(if self.main { first } else { total })
    }
}

/// True when `sql` returns at least one row
pub async fn exists(pool: &PgPool, sql: &str, args: &[SqlValue]) -> Result<bool, DatabaseError> {
    let wrapped = format!("select 1 from ({}) as t limit 1", sql);
    let mut q = sqlx::query_scalar::<_, i32>(&wrapped);
    for arg in args {
        q = bind_query_scalar(q, arg);
    }
    Ok(q.fetch_optional(pool).await?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_statements_in_order() {
        let mut sts = Statements::new(true);
        sts.add(Statement::new("delete from a where id = $1", vec!["x".into()]))
            .add_opt(None)
            .add_opt(Some(Statement::new("delete from b", vec![])));
        assert!(sts.is_main());
        assert_eq!(sts.items().len(), 2);
        assert_eq!(sts.items()[1].sql, "delete from b");
        assert!(Statements::new(false).is_empty());
    }
}
