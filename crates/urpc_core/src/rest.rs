//! REST route convention and query-string decoding for HTTP bindings.
//!
//! # Responsibility
//! - Map `(method, action)` route pairs to operation names.
//! - Decode `where`, `order_by`, `limit` and `offset` query parameters.
//!
//! # Invariants
//! - Query values are JSON when they start with `{` or `[`, otherwise the
//!   simple comma form.
//! - Unknown routes are `NOT_FOUND`; undecodable parameters are `BAD_REQUEST`.

use crate::adapter::ops;
use crate::error::{UrpcError, UrpcResult};
use crate::query::{
    encode_args, FindManyArgs, FindOneArgs, OrderBy, OrderTerm, SortDirection, WhereClause,
};
use log::debug;
use serde_json::Value;

const ROUTES: &[(&str, &str, &str)] = &[
    ("GET", "list", ops::FIND_MANY),
    ("GET", "find_one", ops::FIND_ONE),
    ("POST", "create", ops::CREATE),
    ("POST", "create_many", ops::CREATE_MANY),
    ("PATCH", "update", ops::UPDATE),
    ("PATCH", "update_many", ops::UPDATE_MANY),
    ("POST", "upsert", ops::UPSERT),
    ("POST", "upsert_many", ops::UPSERT_MANY),
    ("DELETE", "delete", ops::DELETE),
    ("POST", "call", ops::CALL),
];

/// Operation served by `METHOD .../<action>`.
pub fn operation_for(method: &str, action: &str) -> UrpcResult<&'static str> {
    let method = method.trim().to_ascii_uppercase();
    let action = action.trim().trim_matches('/');
    ROUTES
        .iter()
        .find(|(route_method, route_action, _)| *route_method == method && *route_action == action)
        .map(|(_, _, operation)| *operation)
        .ok_or_else(|| UrpcError::not_found(format!("no route for {method} {action}")))
}

fn is_json(text: &str) -> bool {
    text.starts_with('{') || text.starts_with('[')
}

/// Numbers, booleans and `null` keep their JSON type; a double-quoted value
/// is the string inside the quotes; anything else is the raw string.
fn parse_scalar(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(value @ (Value::Number(_) | Value::Bool(_) | Value::Null | Value::String(_))) => value,
        _ => Value::String(text.to_string()),
    }
}

fn parse_where(text: &str) -> UrpcResult<WhereClause> {
    if is_json(text) {
        let value: Value = serde_json::from_str(text)
            .map_err(|err| UrpcError::bad_request(format!("where: invalid JSON: {err}")))?;
        return WhereClause::try_from(value);
    }
    text.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .try_fold(WhereClause::new(), |clause, part| {
            let (field, value) = part.split_once(':').ok_or_else(|| {
                UrpcError::bad_request(format!("where: expected `field:value`, got `{part}`"))
            })?;
            let field = field.trim();
            if field.is_empty() {
                return Err(UrpcError::bad_request(format!("where: empty field in `{part}`")));
            }
            Ok(clause.and_eq(field, parse_scalar(value.trim())))
        })
}

fn parse_order_by(text: &str) -> UrpcResult<OrderBy> {
    if is_json(text) {
        let value: Value = serde_json::from_str(text)
            .map_err(|err| UrpcError::bad_request(format!("order_by: invalid JSON: {err}")))?;
        return OrderBy::try_from(value);
    }
    text.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .try_fold(OrderBy::new(), |order, part| {
            let (field, direction) = match part.split_once(':') {
                Some((field, direction)) => {
                    let direction = SortDirection::parse(direction).ok_or_else(|| {
                        UrpcError::bad_request(format!(
                            "order_by: expected asc|desc in `{part}`"
                        ))
                    })?;
                    (field.trim(), direction)
                }
                None => (part, SortDirection::Asc),
            };
            Ok(order.then(OrderTerm::new(field, direction)))
        })
}

fn parse_count(name: &str, text: &str) -> UrpcResult<usize> {
    text.trim().parse().map_err(|_| {
        UrpcError::bad_request(format!("{name}: expected a non-negative integer, got `{text}`"))
    })
}

/// Decodes list query parameters; unknown keys are ignored.
pub fn parse_query<'a, I>(pairs: I) -> UrpcResult<FindManyArgs>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut args = FindManyArgs::new();
    for (key, value) in pairs {
        let value = value.trim();
        match key {
            "where" => args.filter = Some(parse_where(value)?),
            "order_by" => args.order_by = Some(parse_order_by(value)?),
            "limit" => args.limit = Some(parse_count(key, value)?),
            "offset" => args.offset = Some(parse_count(key, value)?),
            other => debug!(
                "event=rest_query module=rest status=skipped key={}",
                other
            ),
        }
    }
    Ok(args)
}

/// Arguments for one routed request: query parameters for reads, the JSON
/// body for everything else.
pub fn request_args<'a, I>(operation: &str, query: I, body: Option<Value>) -> UrpcResult<Value>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    match operation {
        ops::FIND_MANY => encode_args(&parse_query(query)?),
        ops::FIND_ONE => {
            let args = parse_query(query)?;
            encode_args(&FindOneArgs::new(args.filter.unwrap_or_default()))
        }
        _ => Ok(body.unwrap_or(Value::Null)),
    }
}

#[cfg(test)]
mod tests {
    use super::{operation_for, parse_query, request_args};
    use crate::error::ErrorCode;
    use serde_json::json;

    #[test]
    fn routes_follow_convention() {
        assert_eq!(operation_for("GET", "list").expect("route"), "findMany");
        assert_eq!(operation_for("get", "/find_one").expect("route"), "findOne");
        assert_eq!(operation_for("POST", "create").expect("route"), "create");
        assert_eq!(operation_for("PATCH", "update").expect("route"), "update");
        assert_eq!(operation_for("DELETE", "delete").expect("route"), "delete");

        let err = operation_for("GET", "delete").expect_err("wrong method");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[test]
    fn simple_strings_decode() {
        let args = parse_query([
            ("where", "role:admin,age:30"),
            ("order_by", "age:desc,name"),
            ("limit", "10"),
            ("offset", "5"),
        ])
        .expect("query");
        let filter = args.filter.expect("where");
        assert!(filter.matches(&json!({"role": "admin", "age": 30})));
        assert!(!filter.matches(&json!({"role": "admin", "age": "30"})));
        let order = args.order_by.expect("order");
        assert_eq!(order.terms().len(), 2);
        assert_eq!(args.limit, Some(10));
        assert_eq!(args.offset, Some(5));
    }

    #[test]
    fn json_strings_decode() {
        let args = parse_query([
            ("where", r#"{"age":{"gte":18}}"#),
            ("order_by", r#"[{"age":"desc"}]"#),
        ])
        .expect("query");
        assert!(args.filter.expect("where").matches(&json!({"age": 20})));
    }

    #[test]
    fn bad_limit_is_bad_request() {
        let err = parse_query([("limit", "-1")]).expect_err("negative");
        assert_eq!(err.code(), ErrorCode::BadRequest);
    }

    #[test]
    fn find_one_reads_where_from_query() {
        let args = request_args("findOne", [("where", "id:1")], None).expect("args");
        assert_eq!(args, json!({"where": {"id": 1}}));
    }

    #[test]
    fn quoted_values_stay_strings() {
        let args = parse_query([("where", r#"id:"1",name:Ann"#)]).expect("query");
        let filter = args.filter.expect("where");
        assert!(filter.matches(&json!({"id": "1", "name": "Ann"})));
        assert!(!filter.matches(&json!({"id": 1, "name": "Ann"})));

        let bare = parse_query([("where", "id:1")]).expect("query");
        let filter = bare.filter.expect("where");
        assert!(filter.matches(&json!({"id": 1})));
        assert!(!filter.matches(&json!({"id": "1"})));
    }
}
