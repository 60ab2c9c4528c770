//! `/recipes` routes. Recipes reference food records by id, so reads resolve
//! those references and writes refuse ids the food model does not know.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mock_store::{Collection, Entity};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::models::{ingredient_food_ids, Food, Recipe};
use crate::validate::{
    each, is_non_empty_array, is_non_empty_string, is_positive_number, is_unit_id, optional,
    required, MAX_UNIT_ID,
};
use crate::AppState;

pub const RECIPES_PER_PAGE: usize = 10;

const GET_FAILED: &str = "Unable to retrieve the specified Recipe record";
const PAGE_FAILED: &str = "Unable to retrieve the Recipe records";
const UPDATE_FAILED: &str = "Unable to update the specified Recipe record";
const DELETE_FAILED: &str = "Unable to delete the specified Recipe record";

/// Fields a recipe update may carry. Anything else in the body is dropped.
const UPDATABLE: &[&str] = &[
    "title",
    "serves",
    "makes",
    "prep_time",
    "cook_time",
    "ingredient_sections",
    "method",
    "reference_url",
];

pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let recipe = state
        .recipes
        .find_one(&id)
        .map_err(ApiError::internal(GET_FAILED))?
        .await?;
    let food = resolve_food(&state.food, &recipe.food_ids(), GET_FAILED).await?;

    let body = json!({ "recipe": recipe.exportable(), "food": food });
    Ok(Json(http_common::wrap(body)).into_response())
}

pub async fn list_recipes_page(
    State(state): State<AppState>,
    Path(page): Path<String>,
) -> Result<Response, ApiError> {
    let page: usize = page
        .parse()
        .map_err(|_| ApiError::BadRequest("page must be a non-negative integer".into()))?;

    let mut recipes = state
        .recipes
        .find_all()
        .map_err(ApiError::internal(PAGE_FAILED))?;
    // Most recently updated first; records without a timestamp keep their
    // enumeration order after the rest.
    recipes.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));

    let start = page.checked_mul(RECIPES_PER_PAGE).unwrap_or(usize::MAX);
    let page_recipes: Vec<Recipe> = recipes
        .into_iter()
        .skip(start)
        .take(RECIPES_PER_PAGE)
        .collect();
    if page_recipes.is_empty() {
        return Err(ApiError::NotFound(format!("recipe page {} is empty", page)));
    }

    let mut food_ids: Vec<String> = Vec::new();
    for id in page_recipes.iter().flat_map(Recipe::food_ids) {
        if !food_ids.contains(&id) {
            food_ids.push(id);
        }
    }
    let food = resolve_food(&state.food, &food_ids, PAGE_FAILED).await?;

    debug!(page, count = page_recipes.len(), "recipe page served");
    let recipes: Vec<Value> = page_recipes.iter().map(Recipe::exportable).collect();
    let body = json!({ "recipes": recipes, "food": food });
    Ok(Json(http_common::wrap(body)).into_response())
}

pub async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<StatusCode, ApiError> {
    let update = recipe_update(&body).map_err(ApiError::BadRequest)?;

    let referenced = update
        .get("ingredient_sections")
        .map(|sections| ingredient_food_ids(Some(&mock_store::Value::from(sections.clone()))))
        .unwrap_or_default();
    let invalid = unknown_food_ids(&state.food, &referenced).await?;
    if !invalid.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Invalid food ids: {}",
            invalid.join(";")
        )));
    }

    let serves_requested = update.contains_key("serves");
    let mut recipe = state
        .recipes
        .find_one(&id)
        .map_err(ApiError::internal(UPDATE_FAILED))?
        .await?;
    let record = recipe.record_mut();
    record
        .assign(update)
        .map_err(ApiError::internal(UPDATE_FAILED))?;
    // A recipe either serves people or makes items, never both.
    if record.get("serves").is_some() && record.get("makes").is_some() {
        let stale = if serves_requested { "makes" } else { "serves" };
        record
            .unset(stale)
            .map_err(ApiError::internal(UPDATE_FAILED))?;
    }
    recipe.save().map_err(ApiError::internal(UPDATE_FAILED))?;

    info!(%id, "recipe updated");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let recipe = state
        .recipes
        .find_one(&id)
        .map_err(ApiError::internal(DELETE_FAILED))?
        .await?;
    recipe.remove().map_err(ApiError::internal(DELETE_FAILED))?;

    info!(%id, "recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Export every referenced food record. A reference that no longer resolves
/// is a server-side inconsistency, not a client error.
async fn resolve_food(
    food: &Collection<Food>,
    ids: &[String],
    context: &'static str,
) -> Result<Vec<Value>, ApiError> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        let item = food
            .find_one(id)
            .map_err(ApiError::internal(context))?
            .await
            .map_err(ApiError::internal(context))?;
        out.push(item.exportable());
    }
    Ok(out)
}

async fn unknown_food_ids(food: &Collection<Food>, ids: &[String]) -> Result<Vec<String>, ApiError> {
    let mut unknown = Vec::new();
    for id in ids {
        let found = food
            .find_one(id)
            .map_err(ApiError::internal(UPDATE_FAILED))?
            .await;
        if found.is_err() {
            unknown.push(id.clone());
        }
    }
    Ok(unknown)
}

/// Validate a recipe update body and pick out the fields it may change.
fn recipe_update(body: &Value) -> Result<Map<String, Value>, String> {
    if !body.is_object() {
        return Err("Recipe update must be a JSON object".into());
    }
    let field = |name: &str| body.get(name).filter(|v| !v.is_null());

    optional(
        field("title"),
        is_non_empty_string,
        "Recipe title (if defined) must be a non-empty string",
    )?;
    optional(
        field("serves"),
        is_positive_number,
        "Recipe serves (if defined) must be a positive number",
    )?;
    optional(
        field("makes"),
        is_positive_number,
        "Recipe makes (if defined) must be a positive number",
    )?;
    if field("serves").is_some() && field("makes").is_some() {
        return Err("Recipe serves and makes cannot both be defined".into());
    }
    optional(
        field("prep_time"),
        is_positive_number,
        "Recipe prep_time (if defined) must be a positive number",
    )?;
    optional(
        field("cook_time"),
        is_positive_number,
        "Recipe cook_time (if defined) must be a positive number",
    )?;

    optional(
        field("ingredient_sections"),
        is_non_empty_array,
        "Recipe ingredient_sections (if defined) must be a non-empty array",
    )?;
    each(field("ingredient_sections"), check_section)?;

    optional(
        field("method"),
        is_non_empty_array,
        "Recipe method (if defined) must be a non-empty array",
    )?;
    each(field("method"), |idx, step| {
        required(
            Some(step),
            is_non_empty_string,
            &format!("Recipe method[{}] must be a non-empty string", idx),
        )
    })?;

    optional(
        field("reference_url"),
        is_non_empty_string,
        "Recipe reference_url (if defined) must be a non-empty string",
    )?;

    Ok(UPDATABLE
        .iter()
        .filter_map(|key| field(*key).map(|v| (key.to_string(), v.clone())))
        .collect())
}

fn check_section(idx: usize, section: &Value) -> Result<(), String> {
    let prefix = format!("Recipe ingredient_sections[{}]", idx);
    optional(
        section.get("heading"),
        is_non_empty_string,
        &format!("{}.heading (if defined) must be a non-empty string", prefix),
    )?;
    required(
        section.get("ingredients"),
        is_non_empty_array,
        &format!("{}.ingredients must be a non-empty array", prefix),
    )?;
    each(section.get("ingredients"), |i, ingredient| {
        let at = format!("{}.ingredients[{}]", prefix, i);
        required(
            ingredient.get("amount"),
            is_positive_number,
            &format!("{}.amount must be a positive number", at),
        )?;
        required(
            ingredient.get("unit_id"),
            is_unit_id,
            &format!("{}.unit_id must be an integer between 0 and {}", at, MAX_UNIT_ID),
        )?;
        required(
            ingredient.get("food_id"),
            is_non_empty_string,
            &format!("{}.food_id must be a non-empty string", at),
        )
    })
}
