//! Logical selector keys and their ordered fallback candidates.
//!
//! Steps never embed selector strings. They ask the catalog for a key and
//! get back the candidate list to sweep, most specific first. Candidates
//! may contain a `{name}` placeholder filled in per lookup (process rows,
//! modal items).

use std::collections::HashMap;

use crate::error::ConfigError;

type Entry = (&'static str, &'static [&'static str]);

const BUILTIN: &[Entry] = &[
    // Organisation login
    ("login.company.username", &["#CompanyCode", "input[name='CompanyCode']", "input[placeholder*='Company']"]),
    ("login.company.password", &["#CompanyPassword", "input[name='CompanyPassword']", "form#companyLogin input[type='password']"]),
    ("login.company.submit", &["#btnCompanyLogin", "form#companyLogin button[type='submit']", "button:has-text('Next')"]),
    // User login
    ("login.user.username", &["#UserName", "input[name='UserName']", "input[placeholder*='User']"]),
    ("login.user.password", &["#UserPassword", "input[name='Password']", "form#userLogin input[type='password']"]),
    ("login.user.year", &["#FYear", "[aria-label='Financial Year']", "select[name='FYear']"]),
    ("login.user.submit", &["#btnLogin", "form#userLogin button[type='submit']", "button:has-text('Login')"]),
    // Onboarding tour
    ("tour.dismiss", &[".introjs-skipbutton", ".shepherd-cancel-icon", "button:has-text('Skip Tour')", "[aria-label='Close tour']"]),
    ("tour.background", &["#main-content", "header.navbar", "body"]),
    // Content selection modal
    ("content.open", &["#btnAddContent", "[data-action='add-content']", "button:has-text('Add Content')"]),
    ("content.item", &["#contentModal [title='{name}']", ".modal.show .content-item:has-text('{name}')", "#contentModal div:has-text('{name}')"]),
    ("content.confirm", &["#contentModal button:has-text('OK')", ".modal.show .btn-primary"]),
    // Job details
    ("job.client", &["#ClientName", "input[name='ClientName']", "[aria-label='Client']"]),
    ("job.quantity", &["#Quantity", "input[name='Quantity']", "[aria-label='Quantity']"]),
    ("job.name", &["#JobName", "input[name='JobName']"]),
    // Job size
    ("size.closed_height", &["#SizeHeight", "input[name='SizeHeight']"]),
    ("size.closed_length", &["#SizeLength", "input[name='SizeLength']"]),
    ("size.open_height", &["#SizeOpenHeight", "input[name='OpenHeight']"]),
    ("size.open_length", &["#SizeOpenLength", "input[name='OpenLength']"]),
    ("size.spine", &["#SizeSpine", "input[name='Spine']"]),
    // Material
    ("material.quality", &["#PaperQuality", "input[name='Quality']", "[aria-label='Quality']"]),
    ("material.gsm", &["#PaperGSM", "input[name='GSM']", "[aria-label='GSM']"]),
    ("material.mill", &["#PaperMill", "input[name='Mill']"]),
    ("material.finish", &["#PaperFinish", "input[name='Finish']"]),
    // Printing
    ("printing.front_colors", &["#FrontColor", "input[name='FrontColor']"]),
    ("printing.back_colors", &["#BackColor", "input[name='BackColor']"]),
    ("printing.special_colors", &["#SpecialColor", "input[name='SpecialColor']"]),
    ("printing.style", &["#PrintingStyle", "input[name='PrintingStyle']"]),
    ("printing.plate_type", &["#PlateType", "input[name='PlateType']"]),
    // Wastage and finishing
    ("finishing.make_ready", &["#MakeReadySheets", "input[name='MakeReady']"]),
    ("finishing.wastage_type", &["#WastageType", "input[name='WastageType']"]),
    ("finishing.grain_direction", &["#GrainDirection", "input[name='Grain']"]),
    ("finishing.coating", &["#Coating", "input[name='Coating']"]),
    ("finishing.trim_top", &["#TrimTop", "input[name='TrimTop']"]),
    ("finishing.trim_bottom", &["#TrimBottom", "input[name='TrimBottom']"]),
    ("finishing.trim_left", &["#TrimLeft", "input[name='TrimLeft']"]),
    ("finishing.trim_right", &["#TrimRight", "input[name='TrimRight']"]),
    ("finishing.strip_top", &["#StripTop", "input[name='StripTop']"]),
    ("finishing.strip_bottom", &["#StripBottom", "input[name='StripBottom']"]),
    ("finishing.strip_left", &["#StripLeft", "input[name='StripLeft']"]),
    ("finishing.strip_right", &["#StripRight", "input[name='StripRight']"]),
    // Search dropdown results, shared by every searchable field
    ("dropdown.options", &["ul.select2-results__options li.select2-results__option", ".dx-list-item", "ul[role='listbox'] li", ".autocomplete-suggestions div"]),
    // Process grid
    ("process.tab", &["#tabProcess", "[data-tab='process']", "a:has-text('Process')"]),
    ("process.table", &["#ProcessGrid", "table.process-grid", "[role='grid']"]),
    ("process.filter", &["#ProcessGrid .dx-datagrid-filter-row input", "#ProcessGrid input.column-filter", "[role='grid'] input[type='text']"]),
    ("process.row", &["#ProcessGrid tr:has-text('{name}')", "[role='grid'] [role='row']:has-text('{name}')"]),
    ("process.add", &["#ProcessGrid tr:has-text('{name}') .btn-add", "#ProcessGrid tr:has-text('{name}') button:has-text('Add')", "[role='row']:has-text('{name}') [title='Add']"]),
    // Costing
    ("estimate.calculate", &["#btnCalculate", "button:has-text('Calculate')", "button:has-text('Show Cost')"]),
    ("estimate.cost_summary", &["#CostSummary", ".cost-summary", "[data-section='cost-summary']"]),
];

/// Ordered candidate lists keyed by logical UI node name.
#[derive(Debug, Clone)]
pub struct SelectorCatalog {
    entries: HashMap<String, Vec<String>>,
}

impl Default for SelectorCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SelectorCatalog {
    pub fn builtin() -> Self {
        let entries = BUILTIN
            .iter()
            .map(|(key, candidates)| {
                (
                    key.to_string(),
                    candidates.iter().map(|c| c.to_string()).collect(),
                )
            })
            .collect();
        Self { entries }
    }

    pub fn is_known_key(key: &str) -> bool {
        BUILTIN.iter().any(|(k, _)| *k == key)
    }

    /// Replaces the candidate lists of the given keys.
    pub fn with_overrides(mut self, overrides: &HashMap<String, Vec<String>>) -> Self {
        for (key, candidates) in overrides {
            self.entries.insert(key.clone(), candidates.clone());
        }
        self
    }

    /// Candidates for `key`; empty for unknown keys, which then resolve
    /// to nothing.
    pub fn candidates(&self, key: &str) -> &[String] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Candidates for `key` with `{name}` replaced by `name`.
    pub fn candidates_for(&self, key: &str, name: &str) -> Vec<String> {
        let escaped = name.replace('\'', "\\'");
        self.candidates(key)
            .iter()
            .map(|c| c.replace("{name}", &escaped))
            .collect()
    }
}

pub(crate) fn validate_overrides(
    overrides: &HashMap<String, Vec<String>>,
) -> Result<(), ConfigError> {
    for (key, candidates) in overrides {
        if !SelectorCatalog::is_known_key(key) {
            return Err(ConfigError::InvalidSelector {
                key: key.clone(),
                reason: "unknown selector key".to_string(),
            });
        }
        if candidates.is_empty() || candidates.iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigError::InvalidSelector {
                key: key.clone(),
                reason: "candidate list must contain only non-empty selectors".to_string(),
            });
        }
    }
    Ok(())
}
