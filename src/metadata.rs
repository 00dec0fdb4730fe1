//! Target metadata fields for rental agreements.
//!
//! Each field carries the retrieval question and the formatting instruction
//! sent alongside it. The downstream contract: the model answers 'Not Found'
//! (any case) when the context has no evidence, otherwise the raw answer is
//! kept after trimming surrounding markdown.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// The fields extracted from every agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    AgreementValue,
    StartDate,
    EndDate,
    RenewalNoticeDays,
    PartyOne,
    PartyTwo,
}

impl MetadataField {
    pub const ALL: [MetadataField; 6] = [
        MetadataField::AgreementValue,
        MetadataField::StartDate,
        MetadataField::EndDate,
        MetadataField::RenewalNoticeDays,
        MetadataField::PartyOne,
        MetadataField::PartyTwo,
    ];

    /// Human-readable field name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AgreementValue => "Agreement Value",
            Self::StartDate => "Agreement Start Date",
            Self::EndDate => "Agreement End Date",
            Self::RenewalNoticeDays => "Renewal Notice (Days)",
            Self::PartyOne => "Party One",
            Self::PartyTwo => "Party Two",
        }
    }

    /// Natural-language retrieval question.
    pub fn question(&self) -> &'static str {
        match self {
            Self::AgreementValue => {
                "What is the primary monetary value of the agreement, such as monthly rent, \
                 total rent, or security deposit amount?"
            }
            Self::StartDate => {
                "What is the commencement date, start date, or effective date of this agreement?"
            }
            Self::EndDate => {
                "What is the termination date, end date, or expiration date of this agreement term?"
            }
            Self::RenewalNoticeDays => {
                "How many days notice is required before the end date for renewal or non-renewal \
                 termination? Look for phrases like 'notice period', 'days prior', 'written notice'."
            }
            Self::PartyOne => {
                "Identify the full name of the Tenant(s), Lessee(s), Resident(s), or the primary \
                 party agreeing to rent (often listed first or defined as such)."
            }
            Self::PartyTwo => {
                "Identify the full name of the Landlord, Lessor, Owner, Property Manager, or the \
                 second party providing the rental property."
            }
        }
    }

    /// Formatting instruction appended to the question.
    pub fn format_hint(&self) -> &'static str {
        match self {
            Self::AgreementValue => {
                "Extract ONLY the monetary value mentioned (e.g., '1500/month', 'Rupees 18,000', \
                 'Rs.2000', '50000 rupees'). If multiple values exist (like rent and deposit), \
                 prioritize rent. If no value is found, return 'Not Found'."
            }
            Self::StartDate | Self::EndDate => {
                "Extract ONLY the date. Return the date in YYYY-MM-DD format if possible, \
                 otherwise return the date as written. If no date is found, return 'Not Found'."
            }
            Self::RenewalNoticeDays => {
                "Extract ONLY the number of days (e.g., 30, 60, 90). Ignore other details. \
                 If no specific number of days is mentioned, return 'Not Found'."
            }
            Self::PartyOne => {
                "Extract ONLY the full name(s) of the tenant/lessee/first party. If multiple \
                 tenants, list them separated by 'and' or commas as written. If not clearly \
                 identified, return 'Not Found'."
            }
            Self::PartyTwo => {
                "Extract ONLY the full name(s) or company name of the landlord/lessor/second \
                 party. If not clearly identified, return 'Not Found'."
            }
        }
    }

    /// Question with its formatting instruction, as sent to the model.
    pub fn query_with_format(&self) -> String {
        format!("{} Instruction: {}", self.question(), self.format_hint())
    }
}

/// Extracted agreement metadata. `None` means the field was not found.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AgreementMetadata {
    pub agreement_value: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub renewal_notice_days: Option<String>,
    pub party_one: Option<String>,
    pub party_two: Option<String>,
}

impl AgreementMetadata {
    pub fn set(&mut self, field: MetadataField, value: Option<String>) {
        match field {
            MetadataField::AgreementValue => self.agreement_value = value,
            MetadataField::StartDate => self.start_date = value,
            MetadataField::EndDate => self.end_date = value,
            MetadataField::RenewalNoticeDays => self.renewal_notice_days = value,
            MetadataField::PartyOne => self.party_one = value,
            MetadataField::PartyTwo => self.party_two = value,
        }
    }

    pub fn get(&self, field: MetadataField) -> Option<&str> {
        match field {
            MetadataField::AgreementValue => self.agreement_value.as_deref(),
            MetadataField::StartDate => self.start_date.as_deref(),
            MetadataField::EndDate => self.end_date.as_deref(),
            MetadataField::RenewalNoticeDays => self.renewal_notice_days.as_deref(),
            MetadataField::PartyOne => self.party_one.as_deref(),
            MetadataField::PartyTwo => self.party_two.as_deref(),
        }
    }

    /// Number of fields that were found.
    pub fn found_count(&self) -> usize {
        MetadataField::ALL
            .iter()
            .filter(|f| self.get(**f).is_some())
            .count()
    }
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?s)^```[a-zA-Z]*\n?(.*?)\n?```$").expect("fence regex"))
}

/// Clean a raw model answer into a field value.
///
/// Strips surrounding markdown fences and backticks, trims, and maps
/// 'Not Found' (any case) or an empty answer to absent.
pub fn clean_answer(raw: &str) -> Option<String> {
    let mut cleaned = raw.trim();

    if let Some(captures) = fence_regex().captures(cleaned) {
        cleaned = captures.get(1).map(|m| m.as_str()).unwrap_or(cleaned);
    }
    let cleaned = cleaned.trim().trim_matches('`').trim();

    if cleaned.is_empty() || cleaned.to_lowercase().contains("not found") {
        return None;
    }
    Some(cleaned.to_string())
}
