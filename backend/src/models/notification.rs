use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const NOTIFICATION_TYPE_REVIEW_REQUEST: &str = "review_request";

/// Body posted by the frontend when a petition is finished or a paid review is ordered.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub name: Option<String>,
    pub user_type: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub crime_types: Option<String>,
    pub timestamp: Option<String>,
    pub plan: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub price: Option<String>,
    pub deadline: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl NotificationRequest {
    pub fn is_review_request(&self) -> bool {
        self.kind.as_deref() == Some(NOTIFICATION_TYPE_REVIEW_REQUEST)
    }
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "groupId")]
    pub group_id: String,
}

/// Accepts strings, numbers and string arrays (joined with ", ").
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .map(|item| match item {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Some(other) => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_numeric_price_and_crime_type_list() {
        let request: NotificationRequest = serde_json::from_value(serde_json::json!({
            "type": "review_request",
            "name": "홍길동",
            "userType": "victim",
            "crimeTypes": ["폭행", "협박"],
            "price": 39000
        }))
        .unwrap();

        assert!(request.is_review_request());
        assert_eq!(request.user_type.as_deref(), Some("victim"));
        assert_eq!(request.crime_types.as_deref(), Some("폭행, 협박"));
        assert_eq!(request.price.as_deref(), Some("39000"));
        assert_eq!(request.email, None);
    }

    #[test]
    fn response_uses_frontend_field_names() {
        let response = NotificationResponse {
            success: true,
            message: "문자 발송 성공".to_string(),
            group_id: "G4V-1".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({ "success": true, "message": "문자 발송 성공", "groupId": "G4V-1" })
        );
    }
}
