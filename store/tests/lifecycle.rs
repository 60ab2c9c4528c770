//! End-to-end behaviour of the store across simulated test cycles.

use mock_store::{Collection, Entity, NotFound, Record, Store, StoreError, Value};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Handle variant with the accessors a food route would use.
struct Food(Record);

impl Food {
    fn singular(&self) -> Option<&str> {
        self.0
            .get("name")
            .and_then(Value::as_object)
            .and_then(|n| n.get("singular"))
            .and_then(Value::as_str)
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

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct FoodName {
    singular: String,
    plural: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct FoodPayload {
    name: FoodName,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

fn apple() -> FoodPayload {
    FoodPayload {
        name: FoodName {
            singular: "apple".into(),
            plural: "apples".into(),
        },
        note: Some("crunchy".into()),
    }
}

fn setup() -> (Store, Collection<Food>) {
    let mut store = Store::new();
    let food = Collection::new("Food");
    store
        .register(
            &food,
            "food",
            vec![
                apple(),
                FoodPayload {
                    name: FoodName {
                        singular: "pear".into(),
                        plural: "pears".into(),
                    },
                    note: None,
                },
            ],
        )
        .expect("register food");
    store.reset().expect("reset");
    (store, food)
}

#[tokio::test]
async fn apple_pear_scenario() {
    let mut store = Store::new();
    let food: Collection = Collection::new("Food");
    store
        .register(&food, "food", vec![json!({"name": "Apple"})])
        .unwrap();
    store.reset().unwrap();

    let found = store.find("food", "MOCK_food_0_ID").unwrap().await.unwrap();
    assert_eq!(found.export(), json!({"id": "MOCK_food_0_ID", "name": "Apple"}));

    let mut writable = food.find_one("MOCK_food_0_ID").unwrap().await.unwrap();
    writable.set("name", "Pear").unwrap();
    writable.save().unwrap();

    let after_save = store
        .lookup("food", "MOCK_food_0_ID", true)
        .unwrap()
        .await
        .unwrap();
    assert_eq!(after_save.get("name").and_then(Value::as_str), Some("Pear"));

    store.reset().unwrap();
    let after_reset = store.find("food", "MOCK_food_0_ID").unwrap().await.unwrap();
    assert_eq!(after_reset.get("name").and_then(Value::as_str), Some("Apple"));
}

#[tokio::test]
async fn handles_keep_their_variant() {
    let (_store, food) = setup();
    let pear = food.find_one("MOCK_food_1_ID").unwrap().await.unwrap();
    assert_eq!(pear.singular(), Some("pear"));

    let exported = pear.clone_handle(false);
    assert_eq!(exported.singular(), Some("pear"));
    assert!(!exported.record().has_hooks());
    assert!(matches!(
        exported.clone_handle(false).into_record().save(),
        Err(StoreError::Detached(_))
    ));
}

#[tokio::test]
async fn mutating_a_result_never_leaks_back() {
    let (store, food) = setup();
    let mut first = food.find_one("MOCK_food_0_ID").unwrap().await.unwrap();
    first.record_mut().set("note", "bruised").unwrap();

    let again = store.find("food", "MOCK_food_0_ID").unwrap().await.unwrap();
    assert_eq!(again.decode::<FoodPayload>().unwrap(), apple());
}

#[tokio::test]
async fn save_only_touches_its_own_identity() {
    let (store, food) = setup();
    let mut apple_handle = food.find_one("MOCK_food_0_ID").unwrap().await.unwrap();
    apple_handle.record_mut().set("note", "green").unwrap();
    apple_handle.save().unwrap();

    let apple_now = store.find("food", "MOCK_food_0_ID").unwrap().await.unwrap();
    assert_eq!(apple_now.get("note").and_then(Value::as_str), Some("green"));

    let pear_now = store.find("food", "MOCK_food_1_ID").unwrap().await.unwrap();
    assert_eq!(pear_now.get("note"), None);
    assert_eq!(pear_now.get("name").unwrap().to_json()["singular"], json!("pear"));
}

#[tokio::test]
async fn absent_fields_are_stripped_on_save() {
    let (store, food) = setup();
    let mut handle = food.find_one("MOCK_food_0_ID").unwrap().await.unwrap();
    handle.record_mut().unset("note").unwrap();
    handle.save().unwrap();

    let stored = store.find("food", "MOCK_food_0_ID").unwrap().await.unwrap();
    assert!(stored.get("note").is_none());
    assert!(stored.fields().field("note").is_none());
    assert_eq!(
        stored.export(),
        json!({"id": "MOCK_food_0_ID", "name": {"singular": "apple", "plural": "apples"}})
    );
}

#[tokio::test]
async fn removal_takes_precedence_over_update() {
    let (store, food) = setup();
    let mut handle = food.find_one("MOCK_food_0_ID").unwrap().await.unwrap();
    handle.save().unwrap();
    handle.remove().unwrap();

    let err = store.find("food", "MOCK_food_0_ID").unwrap().await.unwrap_err();
    assert!(matches!(err, NotFound::Removed { .. }));
    let err = food.find_one("MOCK_food_0_ID").unwrap().await.err().unwrap();
    assert!(matches!(err, NotFound::Removed { .. }));
}

#[tokio::test]
async fn saving_a_removed_record_is_a_consistency_error() {
    let (store, food) = setup();
    let mut stale = food.find_one("MOCK_food_1_ID").unwrap().await.unwrap();
    food.find_one("MOCK_food_1_ID")
        .unwrap()
        .await
        .unwrap()
        .remove()
        .unwrap();

    let err = stale.save().unwrap_err();
    assert!(err.is_consistency());
    assert_eq!(store.pending_writes("food").unwrap(), (0, 1));
}

#[tokio::test]
async fn enumeration_reflects_overlays() {
    let (store, food) = setup();
    let mut apple_handle = food.find_one("MOCK_food_0_ID").unwrap().await.unwrap();
    apple_handle.record_mut().set("note", "baked").unwrap();
    apple_handle.save().unwrap();
    food.find_one("MOCK_food_1_ID")
        .unwrap()
        .await
        .unwrap()
        .remove()
        .unwrap();

    let all = store.enumerate("food").unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id().as_str(), "MOCK_food_0_ID");
    assert_eq!(all[0].get("note").and_then(Value::as_str), Some("baked"));
    assert!(all.iter().all(|r| !r.has_hooks()));

    let via_collection = food.find_all().unwrap();
    assert_eq!(via_collection.len(), 1);
    assert_eq!(via_collection[0].singular(), Some("apple"));
}

#[tokio::test]
async fn reset_isolates_test_cycles() {
    let (store, food) = setup();
    for cycle in 0..3 {
        store.reset().unwrap();
        let before = store.enumerate("food").unwrap();
        assert_eq!(before.len(), 2, "cycle {cycle} starts from registered data");

        let mut handle = food.find_one("MOCK_food_0_ID").unwrap().await.unwrap();
        handle.record_mut().set("note", format!("cycle {cycle}")).unwrap();
        handle.save().unwrap();
        food.find_one("MOCK_food_1_ID")
            .unwrap()
            .await
            .unwrap()
            .remove()
            .unwrap();
    }

    store.reset().unwrap();
    let original = store.find("food", "MOCK_food_0_ID").unwrap().await.unwrap();
    assert_eq!(original.decode::<FoodPayload>().unwrap(), apple());
}

#[tokio::test]
async fn stored_records_serialize_to_their_exported_shape() {
    let (store, food) = setup();
    let mut handle = food.find_one("MOCK_food_0_ID").unwrap().await.unwrap();
    assert!(handle.record_mut().get_mut("id").unwrap_err().is_setup());
    handle.record_mut().set("note", "tart").unwrap();
    handle.save().unwrap();

    let stored = store.find("food", "MOCK_food_0_ID").unwrap().await.unwrap();
    assert_eq!(serde_json::to_value(&stored).unwrap(), stored.export());
    assert_eq!(stored.export()["id"], json!("MOCK_food_0_ID"));
}

#[tokio::test]
async fn missing_identity_is_not_found() {
    let (store, food) = setup();
    let err = store.find("food", "MOCK_food_7_ID").unwrap().await.unwrap_err();
    assert!(matches!(err, NotFound::Missing { .. }));
    assert!(food.find_one("nope").unwrap().await.is_err());
}

#[test]
fn unregistered_names_fail_synchronously() {
    let (store, _food) = setup();
    let err = store.find("drinks", "MOCK_drinks_0_ID").err().unwrap();
    assert!(err.is_setup());
    assert!(store.enumerate("drinks").unwrap_err().is_setup());

    let never_registered: Collection = Collection::new("Drink");
    assert!(never_registered.find_one("x").err().unwrap().is_setup());
}
