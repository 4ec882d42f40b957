use sqlx::MySqlPool;

use crate::error::AppError;
use crate::model::config_request::ProfilePatch;

/// SQL bindable value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
}

#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Build `UPDATE {table} SET ... WHERE {id_column} = ?` from `(column, value)`
/// pairs. Column names come from code, never from request bodies.
pub fn build_update_sql(
    table: &str,
    fields: Vec<(&'static str, SqlValue)>,
    id_column: &str,
    id_value: u64,
) -> Result<SqlUpdate, AppError> {
    if fields.is_empty() {
        return Err(AppError::validation("No fields provided for update"));
    }

    let set_clause = fields
        .iter()
        .map(|(column, _)| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {table} SET {set_clause} WHERE {id_column} = ?");

    let mut values: Vec<SqlValue> = fields.into_iter().map(|(_, value)| value).collect();
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate { sql, values })
}

/// Column/value pairs for the fields a profile patch actually sets.
pub fn profile_columns(patch: &ProfilePatch) -> Vec<(&'static str, SqlValue)> {
    let text = [
        ("first_name", &patch.first_name),
        ("last_name", &patch.last_name),
        ("email", &patch.email),
        ("phone", &patch.phone),
    ];
    let ids = [
        ("department_id", patch.department_id),
        ("job_title_id", patch.job_title_id),
    ];

    text.into_iter()
        .filter_map(|(column, value)| value.clone().map(|v| (column, SqlValue::String(v))))
        .chain(
            ids.into_iter()
                .filter_map(|(column, value)| value.map(|v| (column, SqlValue::U64(v)))),
        )
        .collect()
}

pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_set_clause_in_field_order() {
        let patch = ProfilePatch {
            last_name: Some("Reyes".into()),
            department_id: Some(4),
            ..Default::default()
        };

        let update =
            build_update_sql("employees", profile_columns(&patch), "id", 12).unwrap();

        assert_eq!(
            update.sql,
            "UPDATE employees SET last_name = ?, department_id = ? WHERE id = ?"
        );
        assert_eq!(
            update.values,
            vec![
                SqlValue::String("Reyes".into()),
                SqlValue::U64(4),
                SqlValue::U64(12)
            ]
        );
    }

    #[test]
    fn empty_update_is_rejected() {
        let err = build_update_sql("employees", Vec::new(), "id", 1).unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }
}
