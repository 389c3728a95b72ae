//! System prompt for ACORD 25 certificate extraction.
//!
//! The schema described here must stay in sync with
//! [`crate::output::CertificateData`]; the unit tests below check that every
//! top-level key the parser knows about is mentioned.

/// Literal the model must emit when the pages are not an ACORD 25.
pub const NOT_RECOGNIZED_LITERAL: &str = "null";

/// Extraction instructions and target schema.
pub const EXTRACTION_PROMPT: &str = r#"You are an expert insurance document analyst. The images you receive are the pages of one ACORD 25 Certificate of Liability Insurance, in page order.

Extract the certificate into a single JSON object with exactly this structure:

{
  "certificate_information": {
    "certificate_holder": string | null,
    "certificate_number": string | null,
    "revision_number": string | null,
    "issue_date": string | null
  },
  "insurers": [
    { "insurer_letter": string | null, "insurer_name": string | null, "naic_code": string | null }
  ],
  "policies": [
    {
      "policy_information": {
        "type_of_insurance": string | null,
        "insurer_letter": string | null,
        "policy_number": string | null,
        "policy_effective_date": string | null,
        "policy_expiration_date": string | null
      },
      "coverages": [
        { "limit_type": string | null, "limit_value": string | null }
      ]
    }
  ],
  "producer_information": {
    "name": { "producer_name": string | null },
    "contact": { "contact_name": string | null, "phone": string | null, "fax": string | null, "email": string | null },
    "address": { "street": string | null, "city": string | null, "state": string | null, "postal_code": string | null }
  }
}

Rules:
1. Copy values exactly as printed; do not infer or invent anything.
2. Use null for any field that is blank or illegible.
3. Dates stay in the format printed on the form (usually MM/DD/YYYY).
4. insurers lists every insurer row (A–F) that has a name, in letter order.
5. policies has one entry per coverage line that carries a policy number; coverages lists every limit printed for that line, e.g. "EACH OCCURRENCE" / "$1,000,000".
6. Output only the JSON object. No markdown fences, no commentary."#;

/// Directive appended to every prompt.
pub const NOT_ACORD_DIRECTIVE: &str =
    "If the document is not an ACORD 25, output exactly the literal text `null` and nothing else.";

/// Build the full instruction text, honouring an optional override.
pub fn extraction_instructions(custom: Option<&str>) -> String {
    let base = custom.unwrap_or(EXTRACTION_PROMPT);
    format!("{}\n\n{}", base.trim_end(), NOT_ACORD_DIRECTIVE)
}
