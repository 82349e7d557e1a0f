use serde::Serialize;

use crate::salesforce::Document;

#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<Document>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_serializes_with_documents_key() {
        let json = serde_json::to_string(&DocumentListResponse { documents: vec![] }).unwrap();
        assert_eq!(json, r#"{"documents":[]}"#);
    }
}
