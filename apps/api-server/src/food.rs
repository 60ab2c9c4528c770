//! `/food` routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mock_store::Entity;
use serde_json::{Map, Value};
use tracing::info;

use crate::error::ApiError;
use crate::models::Food;
use crate::validate::{each, is_non_empty_string, is_number, is_unit_id, required, MAX_UNIT_ID};
use crate::AppState;

const LIST_FAILED: &str = "Unable to retrieve the Food records";
const GET_FAILED: &str = "Unable to retrieve the specified Food record";
const UPDATE_FAILED: &str = "Unable to update the specified Food record";

pub async fn list_food(State(state): State<AppState>) -> Result<Response, ApiError> {
    let food = state.food.find_all().map_err(ApiError::internal(LIST_FAILED))?;
    let body: Vec<Value> = food.iter().map(Food::exportable).collect();
    Ok(Json(http_common::wrap(Value::Array(body))).into_response())
}

pub async fn get_food(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let food = state
        .food
        .find_one(&id)
        .map_err(ApiError::internal(GET_FAILED))?
        .await?;
    Ok(Json(http_common::wrap(food.exportable())).into_response())
}

pub async fn update_food(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<StatusCode, ApiError> {
    let update = food_update(&body).map_err(ApiError::BadRequest)?;

    let mut food = state
        .food
        .find_one(&id)
        .map_err(ApiError::internal(UPDATE_FAILED))?
        .await?;
    food.record_mut()
        .assign(update)
        .map_err(ApiError::internal(UPDATE_FAILED))?;
    food.save().map_err(ApiError::internal(UPDATE_FAILED))?;

    info!(%id, "food updated");
    Ok(StatusCode::NO_CONTENT)
}

/// Validate a food update body and pick out the fields it may change.
/// A `null` field counts as not supplied.
fn food_update(body: &Value) -> Result<Map<String, Value>, String> {
    if !body.is_object() {
        return Err("Food update must be a JSON object".into());
    }
    let mut update = Map::new();

    if let Some(name) = body.get("name").filter(|v| !v.is_null()) {
        required(
            name.get("singular"),
            is_non_empty_string,
            "If name is updated, name.singular must be a non-empty string",
        )?;
        required(
            name.get("plural"),
            is_non_empty_string,
            "If name is updated, name.plural must be a non-empty string",
        )?;
        update.insert("name".into(), name.clone());
    }

    if let Some(conversions) = body.get("conversions").filter(|v| !v.is_null()) {
        if !conversions.is_array() {
            return Err("If conversions is updated, it must be an array".into());
        }
        each(Some(conversions), |idx, conversion| {
            required(
                conversion.get("unit_id"),
                is_unit_id,
                &format!(
                    "conversions[{}].unit_id must be an integer between 0 and {}",
                    idx, MAX_UNIT_ID
                ),
            )?;
            required(
                conversion.get("ratio"),
                is_number,
                &format!("conversions[{}].ratio must be a number", idx),
            )
        })?;
        update.insert("conversions".into(), conversions.clone());
    }

    Ok(update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_name_and_conversions() {
        let update = food_update(&json!({
            "name": {"singular": "egg", "plural": "eggs"},
            "conversions": [{"unit_id": 0, "ratio": 50}],
            "ignored": true
        }))
        .unwrap();
        assert_eq!(update.len(), 2);
        assert!(!update.contains_key("ignored"));
    }

    #[test]
    fn rejects_partial_name() {
        let err = food_update(&json!({"name": {"singular": "egg"}})).unwrap_err();
        assert!(err.contains("name.plural"));
    }

    #[test]
    fn rejects_out_of_range_unit() {
        let err = food_update(&json!({"conversions": [
            {"unit_id": 1, "ratio": 2},
            {"unit_id": 13, "ratio": 2}
        ]}))
        .unwrap_err();
        assert_eq!(err, "conversions[1].unit_id must be an integer between 0 and 12");
    }

    #[test]
    fn null_fields_are_ignored() {
        assert!(food_update(&json!({"name": null})).unwrap().is_empty());
        assert!(food_update(&json!([])).is_err());
    }
}
