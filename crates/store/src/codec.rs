//! Persisted representation of the cart.
//!
//! The cart is stored as a JSON array of items with the fields `id`,
//! `title`, `imageUrl`, `price` and `quantity`, in cart order. Prices are
//! written as JSON numbers carrying every digit of the `Decimal`, so a
//! decoded cart equals the one that was encoded.

use pocket_cart_core::{CartItem, CartState, CartStateError};
use thiserror::Error;

/// Errors decoding or encoding a persisted cart.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The payload is not a JSON array of cart items.
    #[error("malformed cart JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload parsed but breaks a cart invariant.
    #[error("invalid cart contents: {0}")]
    InvalidState(#[from] CartStateError),
}

/// Serialize a cart snapshot.
///
/// # Errors
///
/// Returns [`CodecError::Json`] if serialization fails.
pub fn encode(state: &CartState) -> Result<String, CodecError> {
    Ok(serde_json::to_string(state.items())?)
}

/// Parse a persisted cart, checking its invariants.
///
/// # Errors
///
/// Returns [`CodecError::Json`] for malformed input and
/// [`CodecError::InvalidState`] for duplicate ids or zero quantities.
pub fn decode(payload: &str) -> Result<CartState, CodecError> {
    let items: Vec<CartItem> = serde_json::from_str(payload)?;
    Ok(CartState::from_items(items)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use pocket_cart_core::{CartCommand, ItemId, NewItem};
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_encode_decode_round_trip() {
        let state = CartState::empty()
            .apply(CartCommand::AddOrIncrement(NewItem::new(
                "shoe",
                "Running shoe",
                "https://img/shoe.png",
                Decimal::new(24_990, 2),
            )))
            .state
            .apply(CartCommand::AddOrIncrement(NewItem::new(
                "sock",
                "Sock",
                "https://img/sock.png",
                Decimal::new(5, 0),
            )))
            .state
            .apply(CartCommand::Increment(ItemId::new("sock")))
            .state;

        let decoded = decode(&encode(&state).unwrap()).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_round_trip_keeps_high_precision_price() {
        let price = Decimal::new(1_234_567_890_123_456_789, 18);
        let state = CartState::empty()
            .apply(CartCommand::AddOrIncrement(NewItem::new(
                "lens",
                "Lens",
                "https://img/lens.png",
                price,
            )))
            .state;

        let payload = encode(&state).unwrap();
        assert!(payload.contains("1.234567890123456789"));

        let decoded = decode(&payload).unwrap();
        assert_eq!(decoded, state);
        assert_eq!(decoded.items()[0].price, price);
    }

    #[test]
    fn test_decode_huge_price_totals_saturate() {
        let payload = r#"[{"id":"a","title":"t","imageUrl":"u","price":70000000000000000000000000000,"quantity":2}]"#;
        let state = decode(payload).unwrap();
        assert_eq!(state.total_item_count(), 2);
        assert_eq!(state.total_price(), Decimal::MAX);
    }

    #[test]
    fn test_decode_legacy_snake_case_payload() {
        let payload = r#"[{"id":"1","title":"Cadeira Rivatti","image_url":"https://x/1.jpg","price":400,"quantity":2}]"#;
        let state = decode(payload).unwrap();
        assert_eq!(state.total_item_count(), 2);
        assert_eq!(state.total_price(), Decimal::from(800));
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(decode("not json"), Err(CodecError::Json(_))));
        assert!(matches!(decode(r#"{"id":"a"}"#), Err(CodecError::Json(_))));
    }

    #[test]
    fn test_decode_invalid_state() {
        let payload = r#"[{"id":"a","title":"t","imageUrl":"u","price":1,"quantity":0}]"#;
        assert!(matches!(
            decode(payload),
            Err(CodecError::InvalidState(CartStateError::ZeroQuantity(_)))
        ));
    }
}
