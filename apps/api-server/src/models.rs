//! Record variants the routes work with.

use mock_store::{Entity, Record, Value};

/// A food item: `{name: {singular, plural}, conversions: [{unit_id, ratio}]}`.
pub struct Food(Record);

impl Food {
    /// Exported JSON shape sent to clients.
    pub fn exportable(&self) -> serde_json::Value {
        self.0.export()
    }
}

impl Entity for Food {
    fn from_record(record: Record) -> Self {
        Food(record)
    }

    fn record(&self) -> &Record {
        &self.0
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.0
    }

    fn into_record(self) -> Record {
        self.0
    }
}

/// A recipe whose ingredients reference food records by id.
pub struct Recipe(Record);

impl Recipe {
    pub fn exportable(&self) -> serde_json::Value {
        self.0.export()
    }

    /// Distinct ingredient `food_id`s in first-seen order.
    pub fn food_ids(&self) -> Vec<String> {
        ingredient_food_ids(self.0.get("ingredient_sections"))
    }

    /// Sort key for "most recently updated first" listings.
    pub fn updated_at(&self) -> Option<&str> {
        self.0.get("updatedAt").and_then(Value::as_str)
    }
}

impl Entity for Recipe {
    fn from_record(record: Record) -> Self {
        Recipe(record)
    }

    fn record(&self) -> &Record {
        &self.0
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.0
    }

    fn into_record(self) -> Record {
        self.0
    }
}

/// Distinct `food_id`s across `[{ingredients: [{food_id}]}]`, first-seen order.
/// Anything not shaped like that is skipped.
pub fn ingredient_food_ids(sections: Option<&Value>) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    let sections = sections
        .and_then(Value::as_array)
        .into_iter()
        .flat_map(|a| a.iter());
    for section in sections {
        let ingredients = section
            .as_object()
            .and_then(|s| s.get("ingredients"))
            .and_then(Value::as_array)
            .into_iter()
            .flat_map(|a| a.iter());
        for ingredient in ingredients {
            if let Some(id) = ingredient
                .as_object()
                .and_then(|i| i.get("food_id"))
                .and_then(Value::as_str)
            {
                if !ids.iter().any(|seen| seen == id) {
                    ids.push(id.to_string());
                }
            }
        }
    }
    ids
}
