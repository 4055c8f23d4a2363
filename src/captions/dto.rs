use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::captions::repo::Caption;

/// Response for a freshly generated caption.
#[derive(Debug, Serialize)]
pub struct GenerateCaptionResponse {
    pub caption: String,
    pub image_base64: String,
}

/// A stored caption paired with its source image for display.
#[derive(Debug, Serialize)]
pub struct CaptionItem {
    pub id: Uuid,
    pub caption: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub image_base64: String,
}

impl From<Caption> for CaptionItem {
    fn from(row: Caption) -> Self {
        Self {
            id: row.id,
            caption: row.caption,
            timestamp: row.created_at,
            image_base64: BASE64.encode(&row.image_data),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_base64_roundtrips_to_original_bytes() {
        let bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46];
        let row = Caption {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            caption: "a jpeg header".into(),
            image_data: bytes.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        let item = CaptionItem::from(row);
        let decoded = BASE64.decode(&item.image_base64).expect("decode");
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn caption_item_serializes_expected_fields() {
        let row = Caption {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            caption: "a dog on a beach".into(),
            image_data: vec![1, 2, 3],
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_value(CaptionItem::from(row)).expect("serialize");
        assert!(json.get("id").is_some());
        assert_eq!(json["caption"], "a dog on a beach");
        assert!(json.get("timestamp").is_some());
        assert!(json.get("image_base64").is_some());
        // the owning user id is not part of the listing shape
        assert!(json.get("user_id").is_none());
    }
}
