//! Invoice Text Extraction Client
//!
//! Client for a vision/text-extraction service that reads a photographed or
//! scanned supplier invoice and answers with free-form text expected to
//! contain one JSON object. The surrounding prose and markdown fences are
//! tolerated: the first balanced `{...}` block is extracted and parsed.
//! A response without a parseable block is a recoverable extraction failure,
//! never a crash.

use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

const EXTRACTION_PROMPT: &str = "Extract invoice data: supplier (fornitore), date (data_acquisto), \
and a list of items with description (descrizione), quantity (quantita), and price (prezzo). \
Response must be a valid JSON object matching the following structure: \
{ \"supplier\": \"...\", \"date\": \"...\", \"items\": [ { \"description\": \"...\", \
\"quantity\": 0, \"price\": 0 } ] }. Response must be in Italian.";

/// Client for the invoice extraction service
#[derive(Clone)]
pub struct InvoiceExtractionClient {
    api_endpoint: String,
    api_key: String,
    http_client: Client,
}

/// Request sent to the extraction service
#[derive(Debug, Serialize)]
struct ExtractionRequest<'a> {
    image_url: &'a str,
    prompt: &'a str,
}

/// Raw response from the extraction service
#[derive(Debug, Deserialize)]
struct ExtractionResponse {
    text: String,
}

/// Structured invoice data recovered from the response text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedInvoice {
    pub supplier: Option<String>,
    pub date: Option<String>,
    #[serde(default)]
    pub items: Vec<ExtractedItem>,
}

/// One invoice line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedItem {
    pub description: String,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
}

impl InvoiceExtractionClient {
    /// Create a new invoice extraction client
    pub fn new(api_endpoint: String, api_key: String) -> Self {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_default();

        Self {
            api_endpoint,
            api_key,
            http_client,
        }
    }

    /// Extract structured invoice data from an uploaded document photo
    pub async fn extract_invoice(&self, image_url: &str) -> AppResult<ExtractedInvoice> {
        let request = ExtractionRequest {
            image_url,
            prompt: EXTRACTION_PROMPT,
        };

        let response = self
            .http_client
            .post(&self.api_endpoint)
            .header("x-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalService(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let result: ExtractionResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to parse response: {}", e)))?;

        parse_extraction_text(&result.text)
    }
}

/// Parse the model's free-form answer into invoice data
pub fn parse_extraction_text(text: &str) -> AppResult<ExtractedInvoice> {
    let block = extract_json_block(text).ok_or_else(|| {
        AppError::ExtractionError("No JSON object found in response".to_string())
    })?;

    serde_json::from_str(block)
        .map_err(|e| AppError::ExtractionError(format!("Invalid JSON object: {}", e)))
}

/// First balanced `{...}` block of a text, string-literal aware.
///
/// Model answers routinely wrap the object in prose or markdown fences;
/// braces inside JSON strings must not confuse the balance count.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_object() {
        let text = r#"{"supplier": "Caseificio Rossi", "date": "2026-03-01", "items": []}"#;
        assert_eq!(extract_json_block(text), Some(text));
    }

    #[test]
    fn tolerates_surrounding_prose_and_fences() {
        let text = "Ecco i dati estratti:\n```json\n{\"supplier\": \"Molino Bianchi\", \
                    \"date\": \"2026-02-10\", \"items\": [{\"description\": \"Farina\", \
                    \"quantity\": 25, \"price\": 1.2}]}\n```\nFammi sapere se serve altro.";
        let block = extract_json_block(text).unwrap();
        let invoice: ExtractedInvoice = serde_json::from_str(block).unwrap();
        assert_eq!(invoice.supplier.as_deref(), Some("Molino Bianchi"));
        assert_eq!(invoice.items.len(), 1);
    }

    #[test]
    fn braces_inside_strings_do_not_break_balance() {
        let text = r#"nota {"supplier": "Ditta {strana}", "items": []} fine"#;
        let block = extract_json_block(text).unwrap();
        assert!(block.ends_with("]}"));
        assert!(serde_json::from_str::<ExtractedInvoice>(block).is_ok());
    }

    #[test]
    fn missing_object_is_a_recoverable_error() {
        let err = parse_extraction_text("spiacente, non riesco a leggere la foto");
        assert!(matches!(err, Err(AppError::ExtractionError(_))));
    }

    #[test]
    fn malformed_object_is_a_recoverable_error() {
        let err = parse_extraction_text("{\"supplier\": }");
        assert!(matches!(err, Err(AppError::ExtractionError(_))));
    }
}
