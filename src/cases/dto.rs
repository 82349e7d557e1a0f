use serde::{Deserialize, Serialize};

use crate::salesforce::Case;

#[derive(Debug, Deserialize)]
pub struct CreateCaseRequest {
    pub subject: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CaseListResponse {
    pub cases: Vec<Case>,
}

#[derive(Debug, Serialize)]
pub struct CaseCreateResponse {
    pub case_id: String,
    pub message: String,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_requires_subject() {
        let err = serde_json::from_str::<CreateCaseRequest>(r#"{"description":"no subject"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn create_request_description_is_optional() {
        let req: CreateCaseRequest = serde_json::from_str(r#"{"subject":"Billing"}"#).unwrap();
        assert_eq!(req.subject, "Billing");
        assert!(req.description.is_none());
    }
}
