//! Demo catalog seed for first-run and local testing.

use rust_decimal::Decimal;

use snapcart_catalog::{CatalogError, CatalogStore, NewProduct};

fn demo_product(
    name: &str,
    category: &str,
    description: &str,
    price: i64,
    barcode: &str,
) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        category: Some(category.to_string()),
        description: Some(description.to_string()),
        price: Decimal::from(price),
        image_url: None,
        barcode: Some(barcode.to_string()),
        in_stock: true,
    }
}

/// The ten demo products. Prices are in major currency units.
fn demo_products() -> Vec<NewProduct> {
    vec![
        demo_product("Coca-Cola 1L", "Drinks", "Coca-Cola sparkling drink, 1 liter", 450, "4870200013834"),
        demo_product("Lay's Sour Cream 150g", "Snacks", "Potato chips, sour cream flavor", 350, "4823063107456"),
        demo_product("Sprite 0.5L", "Drinks", "Sprite sparkling drink, 500 ml", 320, "5449000014238"),
        demo_product("Milka Chocolate 90g", "Sweets", "Milk chocolate with alpine milk", 520, "7622300441937"),
        demo_product("Lipton Tea 25 bags", "Grocery", "Black tea in bags", 680, "8712100851637"),
        demo_product("Red Bull 250ml", "Drinks", "Red Bull energy drink", 750, "9002490100070"),
        demo_product("Snickers 50g", "Sweets", "Snickers chocolate bar", 280, "4600831012501"),
        demo_product("Orbit Spearmint", "Other", "Orbit spearmint chewing gum", 250, "4009900476003"),
        demo_product("Bonaqua Water 1L", "Drinks", "Still drinking water", 200, "4870200011502"),
        demo_product("Pringles Original", "Snacks", "Pringles original chips in a tube", 890, "0038000845598"),
    ]
}

/// Insert the demo products. Returns how many were created.
pub(crate) async fn seed_demo(catalog: &dyn CatalogStore) -> Result<usize, CatalogError> {
    let products = demo_products();
    let count = products.len();
    for product in products {
        catalog.create(product).await?;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapcart_catalog::MemoryCatalog;

    #[tokio::test]
    async fn seeds_ten_products() {
        let catalog = MemoryCatalog::new();
        let count = seed_demo(&catalog).await.unwrap();
        assert_eq!(count, 10);
        assert_eq!(catalog.list_all().await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn seeded_catalog_finds_demo_products() {
        let catalog = MemoryCatalog::new();
        seed_demo(&catalog).await.unwrap();
        let hits = catalog.search(&["Sprite".to_string()]).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Sprite 0.5L");
    }
}
