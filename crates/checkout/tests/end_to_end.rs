//! End-to-end flow across the library crates: a seeded catalog, a scripted
//! vision model, and a scripted gateway carry one purchase from photo to
//! paid order without any network access.

use async_trait::async_trait;
use rust_decimal::Decimal;

use snapcart_catalog::{CatalogStore, MemoryCatalog, NewProduct};
use snapcart_checkout::{CartItem, Checkout, MemoryOrderStore, OrderStatus};
use snapcart_gateway::{CreatedGatewayOrder, GatewayError, GatewayOrderStatus, PaymentGateway};
use snapcart_vision::{ContentBlock, RecognitionError, RecognitionPipeline, ToolCallTurn, VisionModel};

/// Vision fake: always "sees" one Sprite, and builds its summary from the
/// actual tool result so catalog data flows through unmodified.
struct SpriteVision;

#[async_trait]
impl VisionModel for SpriteVision {
    async fn request_tool_call(
        &self,
        _system: &str,
        user_content: Vec<ContentBlock>,
        _tool: &serde_json::Value,
    ) -> Result<ToolCallTurn, RecognitionError> {
        Ok(ToolCallTurn {
            tool_use_id: "tu_1".to_string(),
            tool_input: serde_json::json!({"queries": ["Sprite"]}),
            user_content,
            assistant_content: vec![],
        })
    }

    async fn request_summary(
        &self,
        _system: &str,
        _tool: &serde_json::Value,
        _turn: ToolCallTurn,
        tool_result_json: String,
    ) -> Result<String, RecognitionError> {
        let products: serde_json::Value = serde_json::from_str(&tool_result_json).unwrap();
        let hit = &products[0];
        let summary = serde_json::json!({
            "recognized_items": [{
                "product_id": hit["id"],
                "name": hit["name"],
                "price": hit["price"],
                "quantity": 2,
                "confidence": 0.97
            }],
            "unrecognized": [],
            "total": 0
        });
        Ok(summary.to_string())
    }
}

/// Gateway fake: creation succeeds, the status query confirms payment.
struct PayingGateway;

#[async_trait]
impl PaymentGateway for PayingGateway {
    async fn create_order(
        &self,
        _amount: Decimal,
        _description: &str,
        redirect_url: &str,
    ) -> Result<CreatedGatewayOrder, GatewayError> {
        assert!(redirect_url.contains("our_order_id=ORDER-"));
        Ok(CreatedGatewayOrder {
            gateway_order_id: "GW-77".to_string(),
            gateway_secret: "order-pw".to_string(),
            hpp_url: "https://pay.example/hpp?id=GW-77&password=order-pw".to_string(),
            status: GatewayOrderStatus::Preparing,
        })
    }

    async fn get_order_status(
        &self,
        gateway_order_id: &str,
        gateway_secret: &str,
    ) -> Result<GatewayOrderStatus, GatewayError> {
        assert_eq!(gateway_order_id, "GW-77");
        assert_eq!(gateway_secret, "order-pw");
        Ok(GatewayOrderStatus::FullyPaid)
    }
}

#[tokio::test]
async fn photo_to_paid_order() {
    // Seeded catalog
    let catalog = MemoryCatalog::new();
    let sprite = catalog
        .create(NewProduct {
            name: "Sprite 0.5L".to_string(),
            category: Some("Drinks".to_string()),
            description: Some("Sprite sparkling drink, 500 ml".to_string()),
            price: Decimal::from(320),
            image_url: None,
            barcode: Some("5449000014238".to_string()),
            in_stock: true,
        })
        .await
        .unwrap();

    // Recognize: items and total come from catalog data, not model arithmetic
    let pipeline = RecognitionPipeline::new(SpriteVision, catalog);
    let result = pipeline.recognize("aW1hZ2U=", "image/jpeg").await.unwrap();
    assert_eq!(result.recognized_items.len(), 1);
    assert_eq!(result.recognized_items[0].product_id, sprite.id);
    assert_eq!(result.total, Decimal::from(640));

    // Checkout with the recognized cart
    let items: Vec<CartItem> = result
        .recognized_items
        .iter()
        .map(|item| CartItem {
            product_id: item.product_id,
            name: item.name.clone(),
            price: item.price,
            quantity: item.quantity,
        })
        .collect();
    let checkout = Checkout::new(PayingGateway, MemoryOrderStore::new());
    let created = checkout
        .create(items, result.total, "http://localhost:8080/checkout/callback")
        .await
        .unwrap();
    assert!(created.hpp_url.contains("pay.example"));

    // Callback resolves the order, poll agrees
    let view = checkout
        .handle_callback(&created.order_id, Some("FullyPaid"))
        .await
        .unwrap();
    assert_eq!(view.status, OrderStatus::Paid);
    assert_eq!(view.total, Decimal::from(640));

    let polled = checkout.poll_status(&created.order_id).await.unwrap();
    assert_eq!(polled.status, OrderStatus::Paid);
}
