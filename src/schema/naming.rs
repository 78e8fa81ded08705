/// Lowercases an identifier and replaces anything outside `[a-z0-9]` with `_`.
fn sanitize_identifier(input: &str) -> String {
    let mut sanitized = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
        } else {
            sanitized.push('_');
        }
    }
    sanitized
}

/// Table name for an entity type.
///
/// Only the last path segment of the type name is used, so `crate::model::Person`
/// maps to `person`.
pub fn table_name(type_name: &str) -> String {
    let short = type_name.rsplit("::").next().unwrap_or(type_name);
    sanitize_identifier(short)
}

/// Format: `<table>_<column>_idx`
pub fn index_table_name(table: &str, column: &str) -> String {
    format!("{}_{}_idx", table, column)
}

/// Format: `<owner>_<related>`
pub fn join_table_name(owner: &str, related: &str) -> String {
    format!("{}_{}", owner, related)
}

/// Format: `<table>_id`
pub fn join_column_name(table: &str) -> String {
    format!("{}_id", table)
}

/// Owner and related column names of a join table.
///
/// A self-referencing relation would name both columns `<table>_id`, so the
/// related side becomes `<table>_related_id` instead.
pub fn join_columns(owner: &str, related: &str) -> (String, String) {
    let owner_column = join_column_name(owner);
    let related_column = if owner == related {
        format!("{}_related_id", related)
    } else {
        join_column_name(related)
    };
    (owner_column, related_column)
}
