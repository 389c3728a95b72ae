//! Human-facing rendering of extraction results.
//!
//! Used by the CLI. The HTTP service has its own JSON envelopes in
//! [`crate::server`]; nothing here reinterprets a result, it only formats.

use crate::error::CertScanError;
use crate::output::{CertificateData, Extraction, ExtractionOutcome};
use std::fmt::Write as _;

/// Render a result: pretty JSON, a "not recognised" notice, or the error
/// with its code.
pub fn render(result: &Result<Extraction, CertScanError>) -> String {
    match result {
        Ok(extraction) => match &extraction.outcome {
            ExtractionOutcome::Recognized(cert) => serde_json::to_string_pretty(cert.raw())
                .unwrap_or_else(|e| format!("error [INTERNAL_ERROR]: {e}")),
            ExtractionOutcome::NotRecognized(reason) => format!(
                "Not recognized: the upload does not look like an ACORD 25 certificate ({reason})."
            ),
        },
        Err(e) => format!("error [{}]: {}", e.code(), e),
    }
}

/// A short digest of the certificate's key fields.
pub fn summary(data: &CertificateData) -> String {
    let mut out = String::new();
    let dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "—".to_string());

    if let Some(ref info) = data.certificate_information {
        let _ = writeln!(out, "Holder:       {}", dash(&info.certificate_holder));
        let _ = writeln!(out, "Certificate:  {}", dash(&info.certificate_number));
        let _ = writeln!(out, "Issued:       {}", dash(&info.issue_date));
    }

    if let Some(ref producer) = data.producer_information {
        let name = producer.name.as_ref().and_then(|n| n.producer_name.clone());
        let _ = writeln!(out, "Producer:     {}", dash(&name));
    }

    if !data.insurers.is_empty() {
        let _ = writeln!(out, "Insurers:");
        for insurer in &data.insurers {
            let _ = writeln!(
                out,
                "  {}  {}  (NAIC {})",
                dash(&insurer.insurer_letter),
                dash(&insurer.insurer_name),
                dash(&insurer.naic_code)
            );
        }
    }

    if !data.policies.is_empty() {
        let _ = writeln!(out, "Policies:");
        for policy in &data.policies {
            let info = policy.policy_information.clone().unwrap_or_default();
            let _ = writeln!(
                out,
                "  {}  {}  {} → {}  ({} limits)",
                dash(&info.type_of_insurance),
                dash(&info.policy_number),
                dash(&info.policy_effective_date),
                dash(&info.policy_expiration_date),
                policy.coverages.len()
            );
        }
    }

    if out.is_empty() {
        out.push_str("(no fields extracted)\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{Certificate, Insurer, NotRecognizedReason};
    use serde_json::json;

    #[test]
    fn render_error_includes_code() {
        let result = Err(CertScanError::TooManyFiles { count: 6, max: 5 });
        let text = render(&result);
        assert!(text.starts_with("error [TOO_MANY_FILES]"), "got: {text}");
    }

    #[test]
    fn render_not_recognized() {
        let result = Ok(Extraction {
            outcome: ExtractionOutcome::NotRecognized(NotRecognizedReason::ExplicitNull),
            model: "m".into(),
            files_processed: 1,
        });
        assert!(render(&result).starts_with("Not recognized"));
    }

    #[test]
    fn render_recognized_is_pretty_json() {
        let raw = json!({ "insurers": [{ "insurer_letter": "A" }] });
        let serde_json::Value::Object(map) = raw.clone() else {
            unreachable!()
        };
        let result = Ok(Extraction {
            outcome: ExtractionOutcome::Recognized(Certificate::from_object(map)),
            model: "m".into(),
            files_processed: 2,
        });
        let text = render(&result);
        assert!(text.contains('\n'));
        assert_eq!(serde_json::from_str::<serde_json::Value>(&text).unwrap(), raw);
    }

    #[test]
    fn summary_lists_insurers() {
        let data = CertificateData {
            insurers: vec![Insurer {
                insurer_letter: Some("A".into()),
                insurer_name: Some("Acme Mutual".into()),
                naic_code: None,
            }],
            ..Default::default()
        };
        let text = summary(&data);
        assert!(text.contains("Acme Mutual"));
        assert!(text.contains("NAIC —"));
        assert_eq!(summary(&CertificateData::default()), "(no fields extracted)\n");
    }
}
