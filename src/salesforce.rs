use std::path::{Path, PathBuf};

use axum::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Document record as stored in the per-customer mock file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub document_id: String,
    pub customer_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub download_url: String,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub created_date: Option<OffsetDateTime>,
}

/// Case record as stored in the per-customer mock file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub case_id: String,
    pub customer_id: String,
    pub subject: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub case_type: Option<String>,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_date: OffsetDateTime,
}

/// Salesforce-style record id: 3-char object prefix plus 15 hex chars.
pub fn sf_record_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}{}", prefix, &hex[..15])
}

/// Read/append access to per-customer document and case records.
///
/// In production this would sit in front of the Salesforce REST API
/// (OAuth2, rate limits, retries); the mock keeps the same contract over
/// local JSON files so the handlers never know the difference.
#[async_trait]
pub trait SalesforceStore: Send + Sync {
    async fn get_documents(&self, customer_id: &str) -> anyhow::Result<Vec<Document>>;
    async fn append_document(&self, customer_id: &str, document: &Document) -> anyhow::Result<()>;
    async fn get_cases(&self, customer_id: &str) -> anyhow::Result<Vec<Case>>;
    async fn append_case(&self, customer_id: &str, case: &Case) -> anyhow::Result<()>;
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct DocumentsFile {
    documents: Vec<Document>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct CasesFile {
    cases: Vec<Case>,
}

/// File-backed mock store: one `documents-{customer_id}.json` and one
/// `cases-{customer_id}.json` per customer under the mock data dir.
pub struct MockSalesforce {
    data_dir: PathBuf,
}

impl MockSalesforce {
    pub fn new(data_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    fn documents_path(&self, customer_id: &str) -> PathBuf {
        self.data_dir.join(format!("documents-{}.json", customer_id))
    }

    fn cases_path(&self, customer_id: &str) -> PathBuf {
        self.data_dir.join(format!("cases-{}.json", customer_id))
    }

    async fn read_json<T: serde::de::DeserializeOwned + Default>(
        path: &Path,
    ) -> anyhow::Result<T> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl SalesforceStore for MockSalesforce {
    async fn get_documents(&self, customer_id: &str) -> anyhow::Result<Vec<Document>> {
        let file: DocumentsFile = Self::read_json(&self.documents_path(customer_id)).await?;
        Ok(file.documents)
    }

    async fn append_document(&self, customer_id: &str, document: &Document) -> anyhow::Result<()> {
        let path = self.documents_path(customer_id);
        let mut file: DocumentsFile = Self::read_json(&path).await?;
        file.documents.push(document.clone());
        Self::write_json(&path, &file).await
    }

    async fn get_cases(&self, customer_id: &str) -> anyhow::Result<Vec<Case>> {
        let file: CasesFile = Self::read_json(&self.cases_path(customer_id)).await?;
        Ok(file.cases)
    }

    async fn append_case(&self, customer_id: &str, case: &Case) -> anyhow::Result<()> {
        let path = self.cases_path(customer_id);
        let mut file: CasesFile = Self::read_json(&path).await?;
        file.cases.push(case.clone());
        Self::write_json(&path, &file).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> (tempfile::TempDir, MockSalesforce) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = MockSalesforce::new(dir.path().join("salesforce")).expect("store");
        (dir, store)
    }

    fn sample_case(customer_id: &str) -> Case {
        Case {
            case_id: sf_record_id("500"),
            customer_id: customer_id.into(),
            subject: "Meter reading dispute".into(),
            description: Some("Reading looks double-counted".into()),
            case_type: Some("Customer Request".into()),
            status: "New".into(),
            created_date: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn get_on_missing_file_returns_empty() {
        let (_dir, store) = make_store();
        let docs = store.get_documents("cust-1").await.expect("get documents");
        assert!(docs.is_empty());
        let cases = store.get_cases("cust-1").await.expect("get cases");
        assert!(cases.is_empty());
    }

    #[tokio::test]
    async fn append_then_get_roundtrip() {
        let (_dir, store) = make_store();
        let case = sample_case("cust-2");
        store.append_case("cust-2", &case).await.expect("append");
        store
            .append_case("cust-2", &sample_case("cust-2"))
            .await
            .expect("append second");

        let cases = store.get_cases("cust-2").await.expect("get");
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].case_id, case.case_id);
        assert_eq!(cases[0].status, "New");

        // Other customers are unaffected
        assert!(store.get_cases("cust-3").await.expect("get").is_empty());
    }

    #[tokio::test]
    async fn document_records_keep_type_field_name_on_disk() {
        let (_dir, store) = make_store();
        let doc = Document {
            document_id: sf_record_id("069"),
            customer_id: "cust-4".into(),
            name: "invoice.pdf".into(),
            doc_type: "PDF".into(),
            download_url: "/customer/cust-4/documents/x/download".into(),
            created_date: Some(OffsetDateTime::now_utc()),
        };
        store.append_document("cust-4", &doc).await.expect("append");

        let json = serde_json::to_value(&doc).expect("serialize");
        assert_eq!(json["type"], "PDF");

        let docs = store.get_documents("cust-4").await.expect("get");
        assert_eq!(docs[0].name, "invoice.pdf");
        assert_eq!(docs[0].doc_type, "PDF");
    }

    #[test]
    fn sf_record_ids_have_prefix_and_length() {
        let id = sf_record_id("500");
        assert!(id.starts_with("500"));
        assert_eq!(id.len(), 18);
        assert_ne!(sf_record_id("500"), sf_record_id("500"));
    }
}
