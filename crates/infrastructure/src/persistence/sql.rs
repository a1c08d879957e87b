//! SQL text for the table store
//!
//! Statements use `$N` placeholders, which both Postgres and SQLite accept.
//! Identifiers are checked and double-quoted; values are always bound,
//! except `NULL`, which is written inline so no parameter type has to be
//! guessed for it.

use application::ApplicationError;
use application::ports::{FetchQuery, Filter, FilterOp, SortOrder};
use domain::DomainError;
use domain::value_objects::{Record, SqlValue};

/// SQL text plus the values for its placeholders, in order
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    fn new() -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Placeholder for `value`, or `NULL`
    fn push_value(&mut self, value: &SqlValue) {
        if value.is_null() {
            self.sql.push_str("NULL");
        } else {
            self.params.push(value.clone());
            self.sql.push_str(&format!("${}", self.params.len()));
        }
    }

    fn push_conditions<'a>(
        &mut self,
        conditions: impl IntoIterator<Item = (&'a str, FilterOp, &'a SqlValue)>,
    ) -> Result<(), ApplicationError> {
        for (i, (column, op, value)) in conditions.into_iter().enumerate() {
            self.sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            self.sql.push_str(&quote_ident(column)?);
            match (op, value.is_null()) {
                (FilterOp::Eq, true) => self.sql.push_str(" IS NULL"),
                (FilterOp::Ne, true) => self.sql.push_str(" IS NOT NULL"),
                _ => {
                    self.sql.push(' ');
                    self.sql.push_str(op.as_sql());
                    self.sql.push(' ');
                    self.push_value(value);
                },
            }
        }
        Ok(())
    }

    fn push_filters(&mut self, filters: &[Filter]) -> Result<(), ApplicationError> {
        self.push_conditions(filters.iter().map(|f| (f.column.as_str(), f.op, &f.value)))
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `"name"`, or an error for anything that is not a plain identifier
pub fn quote_ident(name: &str) -> Result<String, ApplicationError> {
    if is_identifier(name) {
        Ok(format!("\"{name}\""))
    } else {
        Err(DomainError::ValidationError(format!("Invalid identifier: {name:?}")).into())
    }
}

/// Column list for a batch, taken from the first row
pub fn batch_columns(rows: &[Record]) -> Vec<String> {
    rows.first()
        .map(|row| row.columns().map(ToString::to_string).collect())
        .unwrap_or_default()
}

/// `INSERT` of one row; columns missing from `row` are written as `NULL`
pub fn insert(table: &str, columns: &[String], row: &Record) -> Result<Statement, ApplicationError> {
    if columns.is_empty() {
        return Err(DomainError::ValidationError(format!("Insert into {table} has no columns")).into());
    }
    let mut stmt = Statement::new();
    let names = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Result<Vec<_>, _>>()?;
    stmt.sql = format!(
        "INSERT INTO {} ({}) VALUES (",
        quote_ident(table)?,
        names.join(", ")
    );
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            stmt.sql.push_str(", ");
        }
        stmt.push_value(row.get(column).unwrap_or(&SqlValue::Null));
    }
    stmt.sql.push(')');
    Ok(stmt)
}

/// `UPDATE` setting every non-key column of `row`, matched on `key_columns`
pub fn update(table: &str, row: &Record, key_columns: &[String]) -> Result<Statement, ApplicationError> {
    if key_columns.is_empty() {
        return Err(DomainError::ValidationError(format!("Update of {table} has no key columns")).into());
    }
    let mut stmt = Statement::new();
    stmt.sql = format!("UPDATE {} SET ", quote_ident(table)?);

    let mut assigned = 0;
    for (column, value) in row
        .iter()
        .filter(|(c, _)| !key_columns.iter().any(|k| k.as_str() == *c))
    {
        if assigned > 0 {
            stmt.sql.push_str(", ");
        }
        stmt.sql.push_str(&quote_ident(column)?);
        stmt.sql.push_str(" = ");
        stmt.push_value(value);
        assigned += 1;
    }
    if assigned == 0 {
        return Err(DomainError::ValidationError(format!(
            "Update of {table} has nothing to set"
        ))
        .into());
    }

    let keys = key_columns
        .iter()
        .map(|key| {
            row.get(key)
                .map(|value| (key.as_str(), FilterOp::Eq, value))
                .ok_or_else(|| DomainError::MissingColumn(key.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    stmt.push_conditions(keys)?;
    Ok(stmt)
}

/// `DELETE` of rows equal to `condition`; an empty condition deletes all
pub fn delete(table: &str, condition: &Record) -> Result<Statement, ApplicationError> {
    let mut stmt = Statement::new();
    stmt.sql = format!("DELETE FROM {}", quote_ident(table)?);
    stmt.push_conditions(condition.iter().map(|(c, v)| (c, FilterOp::Eq, v)))?;
    Ok(stmt)
}

pub fn select(table: &str, query: &FetchQuery) -> Result<Statement, ApplicationError> {
    let columns = if query.columns.is_empty() {
        "*".to_string()
    } else {
        query
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ")
    };

    let mut stmt = Statement::new();
    stmt.sql = format!("SELECT {columns} FROM {}", quote_ident(table)?);
    stmt.push_filters(&query.filters)?;

    for (i, (column, order)) in query.order_by.iter().enumerate() {
        stmt.sql.push_str(if i == 0 { " ORDER BY " } else { ", " });
        stmt.sql.push_str(&quote_ident(column)?);
        stmt.sql.push_str(match order {
            SortOrder::Asc => " ASC",
            SortOrder::Desc => " DESC",
        });
    }
    if let Some(limit) = query.limit {
        stmt.sql.push_str(&format!(" LIMIT {limit}"));
    }
    Ok(stmt)
}

pub fn count(table: &str, filters: &[Filter]) -> Result<Statement, ApplicationError> {
    let mut stmt = Statement::new();
    stmt.sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table)?);
    stmt.push_filters(filters)?;
    Ok(stmt)
}
