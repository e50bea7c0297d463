use recipe_catalog::{create_recipe, EntityStore, MemoryStore};
use serde_json::json;

#[tokio::test]
async fn test_plain_string_ingredients() {
    let _ = env_logger::try_init();
    let store = MemoryStore::new();
    let payload = json!({
        "title": "Lemon Orzo",
        "servings": 3,
        "tags": ["quick", {"label": "vegetarian"}],
        "ingredients": ["Orzo", "Lemon", "  "],
        "instructions": ["Boil the orzo", {"text": "Zest the lemon", "ingredients": ["lemon"]}]
    });

    let recipe = create_recipe(&store, &payload).await.unwrap();

    assert_eq!(recipe.fields.recipe_id, "lemon-orzo");
    assert_eq!(recipe.fields.name, "Lemon Orzo");
    assert_eq!(recipe.fields.servings, 3);
    assert!(recipe.fields.is_curated);

    let tags: Vec<_> = recipe.fields.tags.iter().map(|tag| tag.name.as_str()).collect();
    assert_eq!(tags, vec!["quick", "vegetarian"]);

    assert_eq!(recipe.ingredients.len(), 2);
    for ingredient in &recipe.ingredients {
        assert_eq!(ingredient.fields.quantity, "");
        assert!(!ingredient.fields.is_pantry);
        assert_eq!(ingredient.recipe, recipe.id);
    }

    assert_eq!(recipe.instructions.len(), 2);
    assert!(recipe.instructions[0].ingredients_used.is_empty());
    assert_eq!(recipe.instructions[1].ingredients_used.len(), 1);
    assert_eq!(recipe.instructions[1].ingredients_used[0].fields.name, "Lemon");
}

#[tokio::test]
async fn test_object_ingredients_with_aliases() {
    let store = MemoryStore::new();
    let payload = json!({
        "name": "Pancakes",
        "recipeId": "pancakes-v2",
        "ingredients": [
            {"title": "Flour", "amount": "200g", "isPantry": true},
            {"name": "Milk", "quantity": "300ml", "supermarkets": [
                {"name": "Tesco", "price": "1.10", "link": "https://example.com/milk"}
            ]}
        ],
        "instructions": [
            {"step": "Whisk", "ingredients_used": ["flour", "Milk"]},
            {"step": ""}
        ]
    });

    let recipe = create_recipe(&store, &payload).await.unwrap();
    assert_eq!(recipe.fields.recipe_id, "pancakes-v2");

    let flour = recipe
        .ingredients
        .iter()
        .find(|ingredient| ingredient.fields.name == "Flour")
        .unwrap();
    assert_eq!(flour.fields.quantity, "200g");
    assert!(flour.fields.is_pantry);

    let milk = recipe
        .ingredients
        .iter()
        .find(|ingredient| ingredient.fields.name == "Milk")
        .unwrap();
    assert_eq!(milk.fields.supermarkets[0].supermarket, "Tesco");
    assert_eq!(milk.fields.supermarkets[0].price, Some(1.10));
    assert_eq!(
        milk.fields.supermarkets[0].url.as_deref(),
        Some("https://example.com/milk")
    );

    assert_eq!(recipe.instructions.len(), 1);
    assert_eq!(recipe.instructions[0].ingredients_used.len(), 2);
}

#[tokio::test]
async fn test_resubmitting_updates_in_place() {
    let store = MemoryStore::new();
    let first = create_recipe(
        &store,
        &json!({"name": "Chilli", "ingredients": [{"name": "Beans", "quantity": "1 tin"}]}),
    )
    .await
    .unwrap();

    let second = create_recipe(
        &store,
        &json!({"name": "Chilli", "description": "Smoky", "ingredients": [{"name": "beans ", "quantity": "1 TIN"}]}),
    )
    .await
    .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.fields.description.as_deref(), Some("Smoky"));
    // Same normalized key, so the ingredient row is kept
    assert_eq!(second.ingredients.len(), 1);
    assert_eq!(second.ingredients[0].id, first.ingredients[0].id);
    assert_eq!(store.list_recipes().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_accented_name_slug_is_stable() {
    let store = MemoryStore::new();
    let first = create_recipe(&store, &json!({"name": "Crème Brûlée"}))
        .await
        .unwrap();
    assert_eq!(first.fields.recipe_id, "creme-brulee");

    let second = create_recipe(&store, &json!({"title": "Crème Brûlée", "servings": 6}))
        .await
        .unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.fields.servings, 6);
}
