//! Built-in model for the national address register extract

use crate::models::{
    ChildLayout, DimensionDefinition, FactColumn, ParentLayout, ReferenceDimension, ReferenceRow,
};

pub const RECORD_ID: &str = "ADDR_GUID";
pub const GROUP_ID: &str = "LOC_GUID";

/// Derived lookup dimensions
pub fn dimensions() -> Vec<DimensionDefinition> {
    vec![
        DimensionDefinition::single(
            "street_type",
            "street_type",
            ["OFFICIAL_STREET_TYPE", "MAIL_STREET_TYPE"],
        ),
        // MAIL_STEET_DIR is the column name the register publishes
        DimensionDefinition::single(
            "street_dir",
            "street_dir",
            ["OFFICIAL_STREET_DIR", "MAIL_STEET_DIR"],
        ),
        DimensionDefinition::composite(
            "csd_name",
            "csd_name_id",
            &["csd_name_eng", "csd_name_fre"],
            &["CSD_ENG_NAME", "CSD_FRE_NAME"],
        ),
        DimensionDefinition::composite(
            "csd_type",
            "csd_type_id",
            &["csd_type_eng", "csd_type_fre"],
            &["CSD_TYPE_ENG_CODE", "CSD_TYPE_FRE_CODE"],
        ),
        DimensionDefinition::single("mail_mun_name", "mail_mun_name", ["MAIL_MUN_NAME"]),
        DimensionDefinition::single("bg_dls_qtr", "bg_dls_qtr", ["BG_DLS_QTR"]),
        DimensionDefinition::single("bg_dls_mrd", "bg_dls_mrd", ["BG_DLS_MRD"]),
    ]
}

/// Provinces and territories keyed by their statistical area code
pub fn province_codes() -> ReferenceDimension {
    ReferenceDimension {
        name: "prov_code".to_string(),
        key_column: "prov_code".to_string(),
        natural_key: vec![
            "prov_abrv".to_string(),
            "prov_desc_eng".to_string(),
            "prov_desc_fre".to_string(),
        ],
        rows: vec![
            ReferenceRow::new(10, &["NL", "Newfoundland and Labrador", "Terre-Neuve-et-Labrador"]),
            ReferenceRow::new(11, &["PE", "Prince Edward Island", "Île-du-Prince-Édouard"]),
            ReferenceRow::new(12, &["NS", "Nova Scotia", "Nouvelle-Écosse"]),
            ReferenceRow::new(13, &["NB", "New Brunswick", "Nouveau-Brunswick"]),
            ReferenceRow::new(24, &["QC", "Quebec", "Québec"]),
            ReferenceRow::new(35, &["ON", "Ontario", "Ontario"]),
            ReferenceRow::new(46, &["MB", "Manitoba", "Manitoba"]),
            ReferenceRow::new(47, &["SK", "Saskatchewan", "Saskatchewan"]),
            ReferenceRow::new(48, &["AB", "Alberta", "Alberta"]),
            ReferenceRow::new(59, &["BC", "British Columbia", "Colombie-Britannique"]),
            ReferenceRow::new(60, &["YT", "Yukon", "Yukon"]),
            ReferenceRow::new(61, &["NT", "Northwest Territories", "Territoires du Nord-Ouest"]),
            ReferenceRow::new(62, &["NU", "Nunavut", "Nunavut"]),
        ],
    }
}

/// One row per location
pub fn location() -> ParentLayout {
    ParentLayout {
        table: "location".to_string(),
        columns: vec![
            FactColumn::carried("CIVIC_NO"),
            FactColumn::carried("CIVIC_NO_SUFFIX"),
            FactColumn::carried("OFFICIAL_STREET_NAME"),
            FactColumn::lookup("OFFICIAL_STREET_TYPE_ID", "street_type", &["OFFICIAL_STREET_TYPE"]),
            FactColumn::lookup("OFFICIAL_STREET_DIR_ID", "street_dir", &["OFFICIAL_STREET_DIR"]),
            FactColumn::lookup_by("PROV_CODE", "prov_code", &["PROV_CODE"], &["prov_code"]),
            FactColumn::lookup("CSD_NAME_ID", "csd_name", &["CSD_ENG_NAME", "CSD_FRE_NAME"]),
            FactColumn::lookup(
                "CSD_TYPE_ID",
                "csd_type",
                &["CSD_TYPE_ENG_CODE", "CSD_TYPE_FRE_CODE"],
            ),
            FactColumn::carried("MAIL_STREET_NAME"),
            FactColumn::lookup("MAIL_STREET_TYPE_ID", "street_type", &["MAIL_STREET_TYPE"]),
            FactColumn::lookup("MAIL_STEET_DIR_ID", "street_dir", &["MAIL_STEET_DIR"]),
            FactColumn::lookup("MAIL_MUN_NAME_ID", "mail_mun_name", &["MAIL_MUN_NAME"]),
            FactColumn::lookup_by("MAIL_PROV", "prov_code", &["MAIL_PROV_ABVN"], &["prov_abrv"]),
            FactColumn::carried("MAIL_POSTAL_CODE"),
            FactColumn::carried("BG_DLS_LSD"),
            FactColumn::lookup("BG_DLS_QTR", "bg_dls_qtr", &["BG_DLS_QTR"]),
            FactColumn::carried("BG_DLS_SCTN"),
            FactColumn::carried("BG_DLS_TWNSHP"),
            FactColumn::carried("BG_DLS_RNG"),
            FactColumn::lookup("BG_DLS_MRD", "bg_dls_mrd", &["BG_DLS_MRD"]),
            FactColumn::carried("BG_X"),
            FactColumn::carried("BG_Y"),
        ],
    }
}

/// One row per address record
pub fn address() -> ChildLayout {
    ChildLayout {
        table: "address".to_string(),
        columns: vec![
            "APT_NO_LABEL".to_string(),
            "BU_N_CIVIC_ADD".to_string(),
            "BU_USE".to_string(),
        ],
    }
}
