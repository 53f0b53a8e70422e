use chrono::NaiveDate;
use serde_json::{Map, Value};
use sqlx::{postgres::PgRow, Postgres, QueryBuilder, Row};

use crate::error::AppError;

const ALLOWED_TABLES: &[&str] = &["owner_payouts", "properties", "rent_invoices", "tenants"];

pub async fn list_rows(
    pool: &sqlx::PgPool,
    table: &str,
    filters: Option<&Map<String, Value>>,
    limit: i64,
    offset: i64,
    order_by: &str,
    ascending: bool,
) -> Result<Vec<Value>, AppError> {
    let table_name = validate_table(table)?;
    let order_name = if order_by.trim().is_empty() {
        "created_at"
    } else {
        validate_identifier(order_by)?
    };

    let mut query = QueryBuilder::<Postgres>::new("SELECT row_to_json(t) AS row FROM ");
    query.push(table_name).push(" t WHERE 1=1");

    if let Some(filter_map) = filters {
        for (key, value) in filter_map {
            push_filter_clause(&mut query, key, value)?;
        }
    }

    query.push(" ORDER BY t.").push(order_name);
    if ascending {
        query.push(" ASC");
    } else {
        query.push(" DESC");
    }
    query
        .push(" LIMIT ")
        .push_bind(limit.clamp(1, 1000))
        .push(" OFFSET ")
        .push_bind(offset.max(0));

    let rows = query.build().fetch_all(pool).await.map_err(map_db_error)?;
    Ok(read_rows(rows))
}

pub async fn get_row(
    pool: &sqlx::PgPool,
    table: &str,
    row_id: &str,
    id_field: &str,
) -> Result<Value, AppError> {
    let table_name = validate_table(table)?;
    let id_name = validate_identifier(id_field)?;

    let mut query = QueryBuilder::<Postgres>::new("SELECT row_to_json(t) AS row FROM ");
    query.push(table_name).push(" t WHERE ");
    push_scalar_filter(
        &mut query,
        id_name,
        FilterOperator::Eq,
        &infer_scalar_filter(id_name, row_id),
    );
    query.push(" LIMIT 1");

    let row = query
        .build()
        .fetch_optional(pool)
        .await
        .map_err(map_db_error)?;

    row.and_then(|value| value.try_get::<Option<Value>, _>("row").ok().flatten())
        .ok_or_else(|| AppError::NotFound(format!("{table_name} record not found.")))
}

pub async fn create_row(
    pool: &sqlx::PgPool,
    table: &str,
    payload: &Map<String, Value>,
) -> Result<Value, AppError> {
    let table_name = validate_table(table)?;
    if payload.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Could not create {table_name} record."
        )));
    }

    let mut keys = payload.keys().cloned().collect::<Vec<_>>();
    keys.sort_unstable();
    for key in &keys {
        validate_identifier(key)?;
    }

    // jsonb_populate_record lets PostgreSQL resolve column types (uuid, enum,
    // date, jsonb, numeric) from the table definition.
    let mut query = QueryBuilder::<Postgres>::new("INSERT INTO ");
    query.push(table_name).push(" (");
    {
        let mut separated = query.separated(", ");
        for key in &keys {
            separated.push(validate_identifier(key)?);
        }
    }
    query.push(") SELECT ");
    {
        let mut separated = query.separated(", ");
        for key in &keys {
            separated.push("r.");
            separated.push_unseparated(validate_identifier(key)?);
        }
    }
    query
        .push(" FROM jsonb_populate_record(NULL::")
        .push(table_name)
        .push(", ");
    query.push_bind(Value::Object(payload.clone()));
    query
        .push(") r RETURNING row_to_json(")
        .push(table_name)
        .push(".*) AS row");

    let row = query
        .build()
        .fetch_optional(pool)
        .await
        .map_err(map_db_error)?;

    row.and_then(|value| value.try_get::<Option<Value>, _>("row").ok().flatten())
        .ok_or_else(|| AppError::Internal(format!("Could not create {table_name} record.")))
}

pub async fn update_row(
    pool: &sqlx::PgPool,
    table: &str,
    row_id: &str,
    payload: &Map<String, Value>,
    id_field: &str,
) -> Result<Value, AppError> {
    let table_name = validate_table(table)?;
    let id_name = validate_identifier(id_field)?;
    if payload.is_empty() {
        return Err(AppError::BadRequest("No fields to update.".to_string()));
    }

    let mut keys = payload.keys().cloned().collect::<Vec<_>>();
    keys.sort_unstable();
    for key in &keys {
        validate_identifier(key)?;
    }

    let mut query = QueryBuilder::<Postgres>::new("UPDATE ");
    query.push(table_name).push(" t SET ");
    {
        let mut separated = query.separated(", ");
        for key in &keys {
            let col = validate_identifier(key)?;
            separated.push(col);
            separated.push_unseparated(" = r.");
            separated.push_unseparated(col);
        }
    }
    query
        .push(" FROM jsonb_populate_record(NULL::")
        .push(table_name)
        .push(", ");
    query.push_bind(Value::Object(payload.clone()));
    query.push(") r WHERE ");
    push_scalar_filter(
        &mut query,
        id_name,
        FilterOperator::Eq,
        &infer_scalar_filter(id_name, row_id),
    );
    query.push(" RETURNING row_to_json(t) AS row");

    let row = query
        .build()
        .fetch_optional(pool)
        .await
        .map_err(map_db_error)?;

    row.and_then(|value| value.try_get::<Option<Value>, _>("row").ok().flatten())
        .ok_or_else(|| AppError::NotFound(format!("{table_name} record not found.")))
}

pub async fn delete_row(
    pool: &sqlx::PgPool,
    table: &str,
    row_id: &str,
    id_field: &str,
) -> Result<Value, AppError> {
    let existing = get_row(pool, table, row_id, id_field).await?;
    let table_name = validate_table(table)?;
    let id_name = validate_identifier(id_field)?;

    let mut query = QueryBuilder::<Postgres>::new("DELETE FROM ");
    query.push(table_name).push(" t WHERE ");
    push_scalar_filter(
        &mut query,
        id_name,
        FilterOperator::Eq,
        &infer_scalar_filter(id_name, row_id),
    );
    query.build().execute(pool).await.map_err(map_db_error)?;

    Ok(existing)
}

/// Delete every row matching `filters`. An empty filter map is rejected so a
/// missing predicate can never wipe a table.
pub async fn delete_rows(
    pool: &sqlx::PgPool,
    table: &str,
    filters: &Map<String, Value>,
) -> Result<u64, AppError> {
    let table_name = validate_table(table)?;
    if filters.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Refusing to delete from {table_name} without filters."
        )));
    }

    let mut query = QueryBuilder::<Postgres>::new("DELETE FROM ");
    query.push(table_name).push(" t WHERE 1=1");
    for (key, value) in filters {
        push_filter_clause(&mut query, key, value)?;
    }

    let result = query.build().execute(pool).await.map_err(map_db_error)?;
    Ok(result.rows_affected())
}

pub async fn count_rows(
    pool: &sqlx::PgPool,
    table: &str,
    filters: Option<&Map<String, Value>>,
) -> Result<i64, AppError> {
    let table_name = validate_table(table)?;

    let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*)::bigint AS total FROM ");
    query.push(table_name).push(" t WHERE 1=1");

    if let Some(filter_map) = filters {
        for (key, value) in filter_map {
            push_filter_clause(&mut query, key, value)?;
        }
    }

    let row = query.build().fetch_one(pool).await.map_err(map_db_error)?;

    Ok(row.try_get::<i64, _>("total").unwrap_or(0))
}

pub async fn row_exists(
    pool: &sqlx::PgPool,
    table: &str,
    filters: &Map<String, Value>,
) -> Result<bool, AppError> {
    let table_name = validate_table(table)?;

    let mut query = QueryBuilder::<Postgres>::new("SELECT EXISTS(SELECT 1 FROM ");
    query.push(table_name).push(" t WHERE 1=1");
    for (key, value) in filters {
        push_filter_clause(&mut query, key, value)?;
    }
    query.push(") AS found");

    let row = query.build().fetch_one(pool).await.map_err(map_db_error)?;

    row.try_get::<bool, _>("found").map_err(map_db_error)
}

pub(crate) fn read_rows(rows: Vec<PgRow>) -> Vec<Value> {
    rows.into_iter()
        .filter_map(|row| row.try_get::<Option<Value>, _>("row").ok().flatten())
        .collect()
}

fn validate_table(table: &str) -> Result<&str, AppError> {
    let normalized = validate_identifier(table)?;
    if ALLOWED_TABLES.contains(&normalized) {
        return Ok(normalized);
    }
    Err(AppError::Forbidden(format!(
        "Table '{normalized}' is not allowed."
    )))
}

fn validate_identifier(identifier: &str) -> Result<&str, AppError> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(
            "Identifier cannot be empty.".to_string(),
        ));
    }
    if !trimmed.chars().all(|character| {
        character.is_ascii_lowercase() || character.is_ascii_digit() || character == '_'
    }) {
        return Err(AppError::BadRequest(format!(
            "Invalid identifier '{trimmed}'."
        )));
    }
    if trimmed
        .chars()
        .next()
        .is_some_and(|first| first.is_ascii_digit())
    {
        return Err(AppError::BadRequest(format!(
            "Invalid identifier '{trimmed}'."
        )));
    }
    Ok(trimmed)
}

#[derive(Debug, Clone)]
enum ScalarFilter {
    Text(String),
    Uuid(uuid::Uuid),
    Date(NaiveDate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterOperator {
    Eq,
    Gt,
    Gte,
    Lt,
}

fn parse_filter_key(filter_key: &str) -> Result<(&str, FilterOperator), AppError> {
    let mut column = filter_key;
    let mut operator = FilterOperator::Eq;

    if let Some((candidate_column, suffix)) = filter_key.rsplit_once("__") {
        operator = match suffix {
            "gt" => FilterOperator::Gt,
            "gte" => FilterOperator::Gte,
            "lt" => FilterOperator::Lt,
            _ => FilterOperator::Eq,
        };
        if !matches!(operator, FilterOperator::Eq) {
            column = candidate_column;
        }
    }

    Ok((validate_identifier(column)?, operator))
}

fn push_filter_clause(
    query: &mut QueryBuilder<Postgres>,
    filter_key: &str,
    value: &Value,
) -> Result<(), AppError> {
    let (column, operator) = parse_filter_key(filter_key)?;
    let Value::String(text) = value else {
        return Err(AppError::BadRequest(format!(
            "Filter '{filter_key}' only supports string values."
        )));
    };

    query.push(" AND ");
    push_scalar_filter(query, column, operator, &infer_scalar_filter(column, text));
    Ok(())
}

fn push_scalar_filter(
    query: &mut QueryBuilder<Postgres>,
    column: &str,
    operator: FilterOperator,
    value: &ScalarFilter,
) {
    query.push("t.").push(column);
    let sql_operator = match operator {
        FilterOperator::Eq => " = ",
        FilterOperator::Gt => " > ",
        FilterOperator::Gte => " >= ",
        FilterOperator::Lt => " < ",
    };
    match value {
        ScalarFilter::Text(text) => {
            query
                .push("::text")
                .push(sql_operator)
                .push_bind(text.clone());
        }
        ScalarFilter::Uuid(id) => {
            query.push(sql_operator).push_bind(*id);
        }
        ScalarFilter::Date(value) => {
            query.push(sql_operator).push_bind(*value);
        }
    }
}

fn infer_scalar_filter(column: &str, text: &str) -> ScalarFilter {
    let trimmed = text.trim();
    if is_uuid_identifier(column) {
        if let Ok(parsed) = uuid::Uuid::parse_str(trimmed) {
            return ScalarFilter::Uuid(parsed);
        }
    }
    if is_date_identifier(column) {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return ScalarFilter::Date(parsed);
        }
    }
    ScalarFilter::Text(text.to_string())
}

fn is_uuid_identifier(identifier: &str) -> bool {
    let normalized = identifier.trim();
    normalized == "id" || normalized.ends_with("_id")
}

fn is_date_identifier(identifier: &str) -> bool {
    let normalized = identifier.trim();
    normalized.ends_with("_date")
        || normalized.ends_with("_month")
        || matches!(normalized, "lease_start" | "lease_end")
}

pub(crate) fn map_db_error(error: sqlx::Error) -> AppError {
    let message = error.to_string();
    tracing::error!(db_error = %message, "Database query failed");

    let code = error
        .as_database_error()
        .and_then(|db_error| db_error.code())
        .map(|code| code.into_owned());
    error_for_sqlstate(code.as_deref())
}

fn error_for_sqlstate(code: Option<&str>) -> AppError {
    match code {
        Some("23505") => {
            AppError::Conflict("Duplicate value violates a unique constraint.".to_string())
        }
        Some("23503") => {
            AppError::UnprocessableEntity("Referenced record does not exist.".to_string())
        }
        Some("22P02") | Some("22007") | Some("22008") => {
            AppError::BadRequest("Invalid value for a typed column.".to_string())
        }
        Some("23514") => {
            AppError::UnprocessableEntity("Value violates a check constraint.".to_string())
        }
        _ => AppError::Dependency("Database operation failed.".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use sqlx::{Postgres, QueryBuilder};

    use super::{
        error_for_sqlstate, parse_filter_key, push_filter_clause, validate_table, FilterOperator,
    };
    use crate::error::AppError;

    #[test]
    fn parses_range_suffixes() {
        assert_eq!(
            parse_filter_key("due_date__gte").expect("valid key"),
            ("due_date", FilterOperator::Gte)
        );
        assert_eq!(
            parse_filter_key("due_date__lt").expect("valid key"),
            ("due_date", FilterOperator::Lt)
        );
        assert_eq!(
            parse_filter_key("tenant_id").expect("valid key"),
            ("tenant_id", FilterOperator::Eq)
        );
        assert!(parse_filter_key("Due-Date").is_err());
    }

    #[test]
    fn unknown_suffix_stays_part_of_the_column() {
        assert_eq!(
            parse_filter_key("lease_end__lte").expect("valid key"),
            ("lease_end__lte", FilterOperator::Eq)
        );
    }

    #[test]
    fn non_string_filter_values_are_rejected() {
        let mut query = QueryBuilder::<Postgres>::new("SELECT 1 FROM tenants t WHERE 1=1");
        assert!(matches!(
            push_filter_clause(&mut query, "monthly_rent", &json!(900)),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn month_range_filter_renders_half_open_interval() {
        let mut query = QueryBuilder::<Postgres>::new("SELECT 1 FROM rent_invoices t WHERE 1=1");
        push_filter_clause(
            &mut query,
            "tenant_id",
            &Value::String("550e8400-e29b-41d4-a716-446655440000".to_string()),
        )
        .expect("tenant filter");
        push_filter_clause(&mut query, "due_date__gte", &json!("2026-03-01")).expect("gte");
        push_filter_clause(&mut query, "due_date__lt", &json!("2026-04-01")).expect("lt");

        let sql = query.sql();
        assert!(
            sql.contains("t.tenant_id = $1 AND t.due_date >= $2 AND t.due_date < $3"),
            "Expected half-open range in SQL but got: {sql}"
        );
    }

    #[test]
    fn status_filter_compares_as_text() {
        let mut query = QueryBuilder::<Postgres>::new("SELECT 1 FROM rent_invoices t WHERE 1=1");
        push_filter_clause(&mut query, "status", &json!("pending")).expect("status filter");
        assert!(query.sql().contains("t.status::text = $1"));
    }

    #[test]
    fn rejects_unknown_tables() {
        assert!(validate_table("rent_invoices").is_ok());
        assert!(validate_table("app_users").is_err());
    }

    #[test]
    fn maps_sqlstate_to_client_errors() {
        assert!(matches!(
            error_for_sqlstate(Some("23505")),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            error_for_sqlstate(Some("23503")),
            AppError::UnprocessableEntity(_)
        ));
        assert!(matches!(
            error_for_sqlstate(Some("23514")),
            AppError::UnprocessableEntity(_)
        ));
        assert!(matches!(
            error_for_sqlstate(Some("22P02")),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            error_for_sqlstate(Some("57014")),
            AppError::Dependency(_)
        ));
        assert!(matches!(error_for_sqlstate(None), AppError::Dependency(_)));
    }
}
