// UNFCCC Annex I (CRF) inventory category recognition.
//
// Sector and second-level categories are matched by code and name. Deeper
// sub-categories (1.A.1.a ...) are accepted when their code is well formed and
// hangs off a known second-level category, with any non-empty label.

use regex::Regex;
use std::sync::OnceLock;

pub const UNFCCC_CATEGORIES: &[(&str, &str)] = &[
    ("1", "Energy"),
    ("1.A", "Fuel Combustion"),
    ("1.B", "Fugitive Emissions from Fuels"),
    ("1.C", "CO2 Transport and Storage"),
    ("2", "Industrial Processes and Product Use"),
    ("2.A", "Mineral Industry"),
    ("2.B", "Chemical Industry"),
    ("2.C", "Metal Industry"),
    ("2.D", "Non-energy Products from Fuels and Solvent Use"),
    ("2.E", "Electronics Industry"),
    ("2.F", "Product Uses as Substitutes for ODS"),
    ("2.G", "Other Product Manufacture and Use"),
    ("2.H", "Other"),
    ("3", "Agriculture"),
    ("3.A", "Enteric Fermentation"),
    ("3.B", "Manure Management"),
    ("3.C", "Rice Cultivation"),
    ("3.D", "Agricultural Soils"),
    ("3.E", "Prescribed Burning of Savannas"),
    ("3.F", "Field Burning of Agricultural Residues"),
    ("3.G", "Liming"),
    ("3.H", "Urea Application"),
    ("3.I", "Other Carbon-containing Fertilizers"),
    ("3.J", "Other"),
    ("4", "Land Use, Land-Use Change and Forestry"),
    ("4.A", "Forest Land"),
    ("4.B", "Cropland"),
    ("4.C", "Grassland"),
    ("4.D", "Wetlands"),
    ("4.E", "Settlements"),
    ("4.F", "Other Land"),
    ("4.G", "Harvested Wood Products"),
    ("4.H", "Other"),
    ("5", "Waste"),
    ("5.A", "Solid Waste Disposal"),
    ("5.B", "Biological Treatment of Solid Waste"),
    ("5.C", "Incineration and Open Burning of Waste"),
    ("5.D", "Wastewater Treatment and Discharge"),
    ("5.E", "Other"),
    ("6", "Other"),
];

fn squash(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn subcategory_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?P<parent>[1-5]\.[a-j])\.\d{1,2}(?:\.[a-z](?:\.[ivx]+)?)?\s*[^\s.\d]")
            .expect("unfccc sub-category regex is valid")
    })
}

/// True when `value` names a UNFCCC category, ignoring whitespace and case in
/// the comparison against known categories.
pub fn is_valid_unfccc_category(value: &str) -> bool {
    let squashed = squash(value);
    if squashed.is_empty() {
        return false;
    }
    if UNFCCC_CATEGORIES
        .iter()
        .any(|(code, name)| squash(&format!("{code}{name}")) == squashed)
    {
        return true;
    }

    let trimmed = value.trim();
    match subcategory_regex().captures(trimmed) {
        Some(caps) => {
            let parent = &caps["parent"];
            UNFCCC_CATEGORIES
                .iter()
                .any(|(code, _)| code.eq_ignore_ascii_case(parent))
        }
        None => false,
    }
}
