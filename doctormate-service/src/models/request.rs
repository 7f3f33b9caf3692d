use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SymptomsRequest {
    #[validate(length(min = 1, message = "symptoms must not be empty"))]
    pub symptoms: String,
}
