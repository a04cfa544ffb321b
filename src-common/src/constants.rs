//! Static catalogs served to the frontend.

use crate::types::{CountryInfo, DocumentTypeInfo};

/// Document types the flow accepts, in display order.
pub fn document_types() -> Vec<DocumentTypeInfo> {
    [
        (
            "aadhaar-card",
            "Aadhaar card",
            "Government-issued Aadhaar identity card",
        ),
        (
            "pan-card",
            "PAN card",
            "Permanent Account Number (tax identity)",
        ),
        ("passport", "Passport", "International travel document"),
        ("drivers-license", "Driver's license", "Official driving permit"),
    ]
    .into_iter()
    .map(|(id, label, description)| DocumentTypeInfo {
        id: id.to_string(),
        label: label.to_string(),
        description: description.to_string(),
    })
    .collect()
}

/// Whether `id` names a known document type.
pub fn is_known_document_type(id: &str) -> bool {
    document_types().iter().any(|d| d.id == id)
}

/// Supported countries, in display order.
pub fn countries() -> Vec<CountryInfo> {
    [
        ("IN", "India"),
        ("ES", "Spain"),
        ("US", "United States"),
        ("GB", "United Kingdom"),
        ("DE", "Germany"),
        ("FR", "France"),
        ("IT", "Italy"),
    ]
    .into_iter()
    .map(|(code, name)| CountryInfo {
        code: code.to_string(),
        name: name.to_string(),
    })
    .collect()
}

/// Whether `code` is a supported country code.
pub fn is_known_country(code: &str) -> bool {
    countries().iter().any(|c| c.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lookups() {
        assert!(is_known_document_type("passport"));
        assert!(!is_known_document_type("library-card"));
        assert!(is_known_country("IN"));
        assert!(!is_known_country("ZZ"));
        assert_eq!(document_types().len(), 4);
        assert_eq!(countries()[0].code, "IN");
    }
}
