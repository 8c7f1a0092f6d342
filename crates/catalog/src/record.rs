use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// A catalog product as stored in the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Store-assigned id, stable for the lifetime of the record.
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub barcode: Option<String>,
    pub in_stock: bool,
    /// ISO 8601 / RFC 3339 timestamp string, set once at creation.
    pub created_at: String,
}

/// Payload for creating a product. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

fn default_in_stock() -> bool {
    true
}

/// A partial product update. `None` fields are left unchanged; a patch
/// with no fields supplied is a no-op success. Applied field-by-field,
/// never by dynamic query assembly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub in_stock: Option<bool>,
}

impl ProductPatch {
    /// Apply this patch to a product in place.
    pub fn apply(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(category) = &self.category {
            product.category = Some(category.clone());
        }
        if let Some(description) = &self.description {
            product.description = Some(description.clone());
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(image_url) = &self.image_url {
            product.image_url = Some(image_url.clone());
        }
        if let Some(barcode) = &self.barcode {
            product.barcode = Some(barcode.clone());
        }
        if let Some(in_stock) = self.in_stock {
            product.in_stock = in_stock;
        }
    }
}

impl Product {
    /// Materialize a new product record from a creation payload.
    pub fn from_new(id: i64, new: NewProduct) -> Self {
        let created_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"));
        Product {
            id,
            name: new.name,
            category: new.category,
            description: new.description,
            price: new.price,
            image_url: new.image_url,
            barcode: new.barcode,
            in_stock: new.in_stock,
            created_at,
        }
    }

    /// Concatenated searchable text: name plus description.
    pub(crate) fn search_text(&self) -> String {
        match &self.description {
            Some(d) => format!("{} {}", self.name, d),
            None => self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn sample() -> Product {
        Product::from_new(
            1,
            NewProduct {
                name: "Sprite 0.5L".to_string(),
                category: Some("Drinks".to_string()),
                description: Some("Sprite soda 500 ml".to_string()),
                price: Decimal::from(320),
                image_url: None,
                barcode: Some("5449000014238".to_string()),
                in_stock: true,
            },
        )
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let mut p = sample();
        let before = format!("{:?}", p);
        ProductPatch::default().apply(&mut p);
        assert_eq!(before, format!("{:?}", p));
    }

    #[test]
    fn patch_updates_only_supplied_fields() {
        let mut p = sample();
        let patch = ProductPatch {
            price: Some(Decimal::from(350)),
            in_stock: Some(false),
            ..Default::default()
        };
        patch.apply(&mut p);
        assert_eq!(p.price, Decimal::from(350));
        assert!(!p.in_stock);
        assert_eq!(p.name, "Sprite 0.5L");
        assert_eq!(p.barcode.as_deref(), Some("5449000014238"));
    }

    #[test]
    fn product_serializes_with_decimal_price_as_string() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["price"], "320");
        assert_eq!(json["in_stock"], true);
        assert!(json["created_at"].is_string());
    }

    #[test]
    fn new_product_defaults_to_in_stock() {
        let new: NewProduct =
            serde_json::from_str(r#"{"name": "Fanta 1L", "price": "400"}"#).unwrap();
        assert!(new.in_stock);
        assert!(new.category.is_none());
    }

    #[test]
    fn created_at_is_rfc3339() {
        let p = sample();
        assert!(
            OffsetDateTime::parse(&p.created_at, &Rfc3339).is_ok(),
            "created_at should parse as RFC 3339: {}",
            p.created_at
        );
    }
}
