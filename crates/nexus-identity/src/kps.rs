//! KPS (Kimlik Paylaşım Sistemi) public verifier.
//!
//! Posts a SOAP 1.2 `TCKimlikNoDogrula` envelope to the population registry
//! and reads back the boolean result.

use std::time::Duration;

use reqwest::{Client, StatusCode, header};
use tracing::{debug, warn};

use crate::VerificationOutcome;
use crate::checksum;

pub const KPS_ENDPOINT: &str = "https://tckimlik.nvi.gov.tr/Service/KPSPublic.asmx";
pub const KPS_ACTION: &str = "http://tckimlik.nvi.gov.tr/WS/TCKimlikNoDogrula";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const RESULT_TAG: &str = "TCKimlikNoDogrulaResult";

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("verification request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Person details checked against the registry.
#[derive(Debug, Clone)]
pub struct IdentityQuery<'a> {
    pub tc_no: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub year_of_birth: &'a str,
}

#[derive(Debug, Clone)]
pub struct KpsVerifier {
    client: Client,
    endpoint: String,
}

impl KpsVerifier {
    pub fn new() -> Result<Self, IdentityError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, KPS_ENDPOINT))
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Checksum first, then ask the registry.
    pub async fn verify(&self, query: &IdentityQuery<'_>) -> Result<VerificationOutcome, IdentityError> {
        if !checksum::is_valid(query.tc_no) {
            debug!("National ID failed the offline checksum");
            return Ok(VerificationOutcome::rejected("National ID checksum failed"));
        }

        let response = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", KPS_ACTION)
            .body(envelope(query))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!("KPS service returned {}", status);
            return Ok(VerificationOutcome::rejected(format!(
                "Service error: {}",
                status.as_u16()
            )));
        }

        let body = response.text().await?;
        match parse_result(&body) {
            Some(true) => Ok(VerificationOutcome::ok("Identity verification succeeded")),
            _ => Ok(VerificationOutcome::rejected("Identity details do not match")),
        }
    }
}

fn envelope(query: &IdentityQuery<'_>) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<soap12:Envelope xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:soap12="http://www.w3.org/2003/05/soap-envelope">
  <soap12:Body>
    <TCKimlikNoDogrula xmlns="http://tckimlik.nvi.gov.tr/WS">
      <TCKimlikNo>{}</TCKimlikNo>
      <Ad>{}</Ad>
      <Soyad>{}</Soyad>
      <DogumYili>{}</DogumYili>
    </TCKimlikNoDogrula>
  </soap12:Body>
</soap12:Envelope>"#,
        escape_xml(query.tc_no),
        escape_xml(&to_registry_case(query.first_name)),
        escape_xml(&to_registry_case(query.last_name)),
        escape_xml(query.year_of_birth),
    )
}

/// The registry stores names upper-cased with Turkish casing for dotted i.
fn to_registry_case(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            'i' => "İ".to_string(),
            'ı' => "I".to_string(),
            other => other.to_uppercase().collect(),
        })
        .collect()
}

fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

/// Read the boolean inside the `TCKimlikNoDogrulaResult` element. The
/// element may carry a namespace prefix and attributes.
fn parse_result(body: &str) -> Option<bool> {
    let mut search = body;
    loop {
        let at = search.find(RESULT_TAG)?;
        let before = &search[..at];
        let after = &search[at + RESULT_TAG.len()..];
        search = after;

        let opens_here = before.rfind('<').is_some_and(|lt| {
            before[lt + 1..]
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
        });
        let name_ends = after.starts_with('>') || after.starts_with(char::is_whitespace);
        if !(opens_here && name_ends) {
            continue;
        }

        let tag_end = after.find('>')?;
        if after[..tag_end].ends_with('/') {
            return None;
        }
        let rest = &after[tag_end + 1..];
        let close = rest.find('<')?;
        return Some(rest[..close].trim().eq_ignore_ascii_case("true"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::{Router, http::HeaderMap, routing::post};

    const TRUE_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?><soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope"><soap:Body><TCKimlikNoDogrulaResponse xmlns="http://tckimlik.nvi.gov.tr/WS"><TCKimlikNoDogrulaResult>true</TCKimlikNoDogrulaResult></TCKimlikNoDogrulaResponse></soap:Body></soap:Envelope>"#;

    fn query<'a>(tc_no: &'a str) -> IdentityQuery<'a> {
        IdentityQuery {
            tc_no,
            first_name: "ayşe",
            last_name: "yılmaz",
            year_of_birth: "1990",
        }
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/Service/KPSPublic.asmx")
    }

    #[test]
    fn parses_result_element() {
        assert_eq!(parse_result(TRUE_BODY), Some(true));
        assert_eq!(parse_result("<x:TCKimlikNoDogrulaResult>False</x:TCKimlikNoDogrulaResult>"), Some(false));
        assert_eq!(parse_result("<Envelope/>"), None);
    }

    #[test]
    fn result_element_may_carry_attributes() {
        assert_eq!(
            parse_result(r#"<TCKimlikNoDogrulaResult xsi:type="xsd:boolean">true</TCKimlikNoDogrulaResult>"#),
            Some(true)
        );
        assert_eq!(
            parse_result("<ns1:TCKimlikNoDogrulaResult\n  xmlns:ns1=\"http://tckimlik.nvi.gov.tr/WS\">TRUE</ns1:TCKimlikNoDogrulaResult>"),
            Some(true)
        );
        assert_eq!(parse_result(r#"<TCKimlikNoDogrulaResult xsi:nil="true"/>"#), None);
        assert_eq!(parse_result("<TCKimlikNoDogrulaResultX>true</TCKimlikNoDogrulaResultX>"), None);
    }

    #[test]
    fn envelope_upper_cases_and_escapes_names() {
        let body = envelope(&IdentityQuery {
            tc_no: "10000000146",
            first_name: "ali & <veli>",
            last_name: "ışık",
            year_of_birth: "1985",
        });
        assert!(body.contains("<Ad>ALİ &amp; &lt;VELİ&gt;</Ad>"));
        assert!(body.contains("<Soyad>IŞIK</Soyad>"));
        assert!(body.contains("<DogumYili>1985</DogumYili>"));
    }

    #[tokio::test]
    async fn checksum_failure_skips_the_network() {
        let verifier = KpsVerifier::with_client(Client::new(), "http://127.0.0.1:9/unreachable");
        let outcome = verifier.verify(&query("11111111111")).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, "National ID checksum failed");
    }

    #[tokio::test]
    async fn registry_match_is_success() {
        let router = Router::new().route(
            "/Service/KPSPublic.asmx",
            post(|headers: HeaderMap, body: String| async move {
                assert_eq!(headers.get("SOAPAction").unwrap(), KPS_ACTION);
                assert!(body.contains("<Ad>AYŞE</Ad>"));
                TRUE_BODY
            }),
        );
        let endpoint = serve(router).await;

        let verifier = KpsVerifier::with_client(Client::new(), endpoint);
        let outcome = verifier.verify(&query("10000000146")).await.unwrap();
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn service_error_reports_status() {
        let router = Router::new().route(
            "/Service/KPSPublic.asmx",
            post(|| async { (axum::http::StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let endpoint = serve(router).await;

        let verifier = KpsVerifier::with_client(Client::new(), endpoint);
        let outcome = verifier.verify(&query("10000000146")).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Service error: 503");
    }
}
