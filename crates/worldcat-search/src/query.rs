//! Holdings search query model
//!
//! A query is one required identifier (OCLC number, ISBN, or ISSN) plus
//! optional holdings filters. Serialization produces the flat parameter set
//! the Discovery API expects: empty strings, empty lists, unset options and
//! `false` booleans are omitted, and list values are comma-joined.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Which identifier the query searches by. Determines the parameter name
/// (`oclcNumber`, `isbn`, `issn`) the search number is sent under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    Oclc,
    Isbn,
    Issn,
}

impl SearchType {
    /// The Discovery API parameter the search number goes under.
    pub fn param_name(self) -> &'static str {
        match self {
            SearchType::Oclc => "oclcNumber",
            SearchType::Isbn => "isbn",
            SearchType::Issn => "issn",
        }
    }
}

impl FromStr for SearchType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "oclc" => Ok(SearchType::Oclc),
            "isbn" => Ok(SearchType::Isbn),
            "issn" => Ok(SearchType::Issn),
            other => Err(Error::InvalidArgument(format!(
                "invalid search type {other:?}, must be one of OCLC, ISBN, or ISSN"
            ))),
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchType::Oclc => "oclc",
            SearchType::Isbn => "isbn",
            SearchType::Issn => "issn",
        })
    }
}

/// Unit for the geo-radius filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    Miles,
    Kilometers,
}

impl DistanceUnit {
    /// The single-letter code the API expects.
    pub fn code(self) -> &'static str {
        match self {
            DistanceUnit::Miles => "m",
            DistanceUnit::Kilometers => "k",
        }
    }
}

impl FromStr for DistanceUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" => Ok(DistanceUnit::Miles),
            "k" => Ok(DistanceUnit::Kilometers),
            other => Err(Error::InvalidArgument(format!(
                "invalid unit {other:?}, must be either \"m\" (miles) or \"k\" (kilometers)"
            ))),
        }
    }
}

/// A bibs-holdings search: one identifier plus optional filters.
#[derive(Debug, Clone)]
pub struct HoldingsQuery {
    search_type: SearchType,
    search_number: String,
    holdings_all_editions: bool,
    holdings_all_variant_records: bool,
    preferred_language: String,
    holdings_filter_format: Vec<String>,
    held_in_country: String,
    held_in_state: String,
    held_by_group: String,
    held_by_symbol: Vec<String>,
    held_by_institution_id: Vec<String>,
    held_by_library_type: Vec<String>,
    coords: Option<(f64, f64)>,
    distance: Option<(u32, DistanceUnit)>,
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.iter().any(|v| v.eq_ignore_ascii_case(&value)) {
        list.push(value);
    }
}

impl HoldingsQuery {
    /// Build a query for the given identifier. Fails fast, before any I/O,
    /// when the search type is not one of `oclc`, `isbn`, `issn`
    /// (case/whitespace insensitive).
    pub fn new(search_type: &str, search_number: impl Into<String>) -> Result<Self> {
        Ok(Self {
            search_type: search_type.parse()?,
            search_number: search_number.into(),
            holdings_all_editions: false,
            holdings_all_variant_records: false,
            preferred_language: "en".into(),
            holdings_filter_format: Vec::new(),
            held_in_country: String::new(),
            held_in_state: String::new(),
            held_by_group: String::new(),
            held_by_symbol: Vec::new(),
            held_by_institution_id: Vec::new(),
            held_by_library_type: Vec::new(),
            coords: None,
            distance: None,
        })
    }

    pub fn search_type(&self) -> SearchType {
        self.search_type
    }

    pub fn search_number(&self) -> &str {
        &self.search_number
    }

    pub fn holdings_all_editions(mut self, value: bool) -> Self {
        self.holdings_all_editions = value;
        self
    }

    pub fn holdings_all_variant_records(mut self, value: bool) -> Self {
        self.holdings_all_variant_records = value;
        self
    }

    pub fn preferred_language(mut self, value: impl Into<String>) -> Self {
        self.preferred_language = value.into();
        self
    }

    pub fn holdings_filter_format(mut self, value: Vec<String>) -> Self {
        self.holdings_filter_format = value;
        self
    }

    pub fn add_holdings_filter_format(mut self, value: impl Into<String>) -> Self {
        push_unique(&mut self.holdings_filter_format, value.into());
        self
    }

    pub fn held_in_country(mut self, value: impl Into<String>) -> Self {
        self.held_in_country = value.into();
        self
    }

    pub fn held_in_state(mut self, value: impl Into<String>) -> Self {
        self.held_in_state = value.into();
        self
    }

    pub fn held_by_group(mut self, value: impl Into<String>) -> Self {
        self.held_by_group = value.into();
        self
    }

    pub fn held_by_symbol(mut self, value: Vec<String>) -> Self {
        self.held_by_symbol = value;
        self
    }

    pub fn add_held_by_symbol(mut self, value: impl Into<String>) -> Self {
        push_unique(&mut self.held_by_symbol, value.into());
        self
    }

    pub fn held_by_institution_id(mut self, value: Vec<String>) -> Self {
        self.held_by_institution_id = value;
        self
    }

    pub fn add_held_by_institution_id(mut self, value: impl Into<String>) -> Self {
        push_unique(&mut self.held_by_institution_id, value.into());
        self
    }

    pub fn held_by_library_type(mut self, value: Vec<String>) -> Self {
        self.held_by_library_type = value;
        self
    }

    pub fn add_held_by_library_type(mut self, value: impl Into<String>) -> Self {
        push_unique(&mut self.held_by_library_type, value.into());
        self
    }

    /// Center of the geo-radius filter. Only emitted as a `lat`/`lon` pair.
    pub fn coords(mut self, lat: f64, lon: f64) -> Self {
        self.coords = Some((lat, lon));
        self
    }

    /// Radius for the geo filter, with its unit.
    pub fn distance(mut self, value: u32, unit: DistanceUnit) -> Self {
        self.distance = Some((value, unit));
        self
    }

    /// Serialize to the flat parameter set the Discovery API expects.
    ///
    /// The identifier is keyed by the search type; empty/false/unset fields
    /// are omitted; list fields are comma-joined.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![(self.search_type.param_name(), self.search_number.clone())];

        if self.holdings_all_editions {
            params.push(("holdingsAllEditions", "true".into()));
        }
        if self.holdings_all_variant_records {
            params.push(("holdingsAllVariantRecords", "true".into()));
        }
        if !self.preferred_language.is_empty() {
            params.push(("preferredLanguage", self.preferred_language.clone()));
        }
        if !self.holdings_filter_format.is_empty() {
            params.push(("holdingsFilterFormat", self.holdings_filter_format.join(",")));
        }
        if !self.held_in_country.is_empty() {
            params.push(("heldInCountry", self.held_in_country.clone()));
        }
        if !self.held_in_state.is_empty() {
            params.push(("heldInState", self.held_in_state.clone()));
        }
        if !self.held_by_group.is_empty() {
            params.push(("heldByGroup", self.held_by_group.clone()));
        }
        if !self.held_by_symbol.is_empty() {
            params.push(("heldBySymbol", self.held_by_symbol.join(",")));
        }
        if !self.held_by_institution_id.is_empty() {
            params.push(("heldByInstitutionId", self.held_by_institution_id.join(",")));
        }
        if !self.held_by_library_type.is_empty() {
            params.push(("heldByLibraryType", self.held_by_library_type.join(",")));
        }
        if let Some((lat, lon)) = self.coords {
            params.push(("lat", lat.to_string()));
            params.push(("lon", lon.to_string()));
        }
        if let Some((distance, unit)) = self.distance {
            params.push(("distance", distance.to_string()));
            params.push(("unit", unit.code().into()));
        }

        params
    }
}
