use serde::{Deserialize, Serialize};

/// `GET /v4/users/me`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    #[serde(alias = "userId")]
    pub id: i64,
    pub name: String,
    pub student_id: Option<String>,
    pub role: Option<String>,
    pub coin: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case("admin"))
    }
}

/// `POST /v4/auth/reissue`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReissueResponse {
    #[serde(alias = "access_token", alias = "token")]
    pub access_token: String,
}
