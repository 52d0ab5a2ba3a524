//! Bibliographic record model
//!
//! Deserialized shape of the Discovery API's brief records, plus the
//! flattening used when exporting batch results to a spreadsheet. The API
//! omits many fields depending on the material, so everything defaults.

use serde::{Deserialize, Serialize};

/// One brief bibliographic record with its institution holdings.
///
/// `mms_id` is not part of the API response — the search client attaches
/// the caller-supplied correlation id there so batch callers can map
/// results back to their input rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BriefRecord {
    pub mms_id: String,
    pub oclc_number: String,
    pub title: String,
    pub creator: String,
    pub date: String,
    pub language: String,
    pub general_format: String,
    pub specific_format: String,
    pub edition: String,
    pub publisher: String,
    pub publication_place: String,
    pub merged_oclc_numbers: Vec<String>,
    pub isbns: Vec<String>,
    pub issns: Vec<String>,
    pub cataloging_info: Option<CatalogingInfo>,
    pub institution_holding: Option<GeneralHoldings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogingInfo {
    pub cataloging_agency: String,
    pub transcribing_agency: String,
    pub cataloging_language: String,
    pub level_of_cataloging: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneralHoldings {
    pub total_holding_count: u32,
    pub total_shared_print_count: u32,
    pub total_editions: u32,
    pub brief_holdings: Vec<BriefHolding>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BriefHolding {
    pub country: String,
    pub state: String,
    pub oclc_symbol: String,
    pub registry_id: i64,
    pub institution_name: String,
    #[serde(rename = "self")]
    pub self_link: String,
    pub ill_status: String,
    pub address: Option<Address>,
    pub institution_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub street1: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub lat: String,
    pub lon: String,
}

/// Column headers matching the rows produced by [`export_rows`].
pub const EXPORT_HEADERS: [&str; 21] = [
    "MMS ID",
    "OCLC Number",
    "Title",
    "Creator",
    "Date",
    "Language",
    "General Format",
    "Specific Format",
    "Edition",
    "Publisher",
    "Publication Place",
    "Merged Oclc Numbers",
    "ISBNs",
    "ISSNs",
    "Institution Name",
    "OCLC Symbol",
    "Registry Id",
    "Country",
    "State",
    "ILL Status",
    "Institution Type",
];

/// Flatten one record into spreadsheet rows, one row per holding.
///
/// A record with no holdings yields a single row marked
/// "No holdings found". Pass `exclude_symbol` to drop the local
/// institution's own holdings from the export.
pub fn export_rows(record: &BriefRecord, exclude_symbol: Option<&str>) -> Vec<Vec<String>> {
    let base = vec![
        record.mms_id.clone(),
        record.oclc_number.clone(),
        record.title.clone(),
        record.creator.clone(),
        record.date.clone(),
        record.language.clone(),
        record.general_format.clone(),
        record.specific_format.clone(),
        record.edition.clone(),
        record.publisher.clone(),
        record.publication_place.clone(),
        record.merged_oclc_numbers.join(", "),
        record.isbns.join(", "),
        record.issns.join(", "),
    ];

    let holdings = record
        .institution_holding
        .as_ref()
        .map(|h| h.brief_holdings.as_slice())
        .unwrap_or_default();

    if holdings.is_empty() {
        let mut row = base;
        row.push("No holdings found".into());
        return vec![row];
    }

    holdings
        .iter()
        .filter(|holding| exclude_symbol.is_none_or(|sym| holding.oclc_symbol != sym))
        .map(|holding| {
            let mut row = base.clone();
            row.extend([
                holding.institution_name.clone(),
                holding.oclc_symbol.clone(),
                holding.registry_id.to_string(),
                holding.country.clone(),
                holding.state.clone(),
                holding.ill_status.clone(),
                holding.institution_type.clone(),
            ]);
            row
        })
        .collect()
}
