//! CSV fixtures shaped like the register extract

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use tempfile::TempDir;

pub const HEADER: &[&str] = &[
    "ADDR_GUID",
    "LOC_GUID",
    "APT_NO_LABEL",
    "CIVIC_NO",
    "CIVIC_NO_SUFFIX",
    "OFFICIAL_STREET_NAME",
    "OFFICIAL_STREET_TYPE",
    "OFFICIAL_STREET_DIR",
    "PROV_CODE",
    "CSD_ENG_NAME",
    "CSD_FRE_NAME",
    "CSD_TYPE_ENG_CODE",
    "CSD_TYPE_FRE_CODE",
    "MAIL_STREET_NAME",
    "MAIL_STREET_TYPE",
    "MAIL_STEET_DIR",
    "MAIL_MUN_NAME",
    "MAIL_PROV_ABVN",
    "MAIL_POSTAL_CODE",
    "BG_DLS_LSD",
    "BG_DLS_QTR",
    "BG_DLS_SCTN",
    "BG_DLS_TWNSHP",
    "BG_DLS_RNG",
    "BG_DLS_MRD",
    "BG_X",
    "BG_Y",
    "BU_N_CIVIC_ADD",
    "BU_USE",
];

pub fn csv_line(values: &[(&str, &str)]) -> String {
    HEADER
        .iter()
        .map(|h| {
            values
                .iter()
                .find(|(k, _)| k == h)
                .map(|(_, v)| v.to_string())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Five records, group ids [A, A, B, null, B], written out of record order
pub fn sample_records() -> Vec<String> {
    vec![
        csv_line(&[
            ("ADDR_GUID", "a2"),
            ("LOC_GUID", "A"),
            ("CIVIC_NO", "12"),
            ("OFFICIAL_STREET_TYPE", "AVE"),
            ("MAIL_STREET_TYPE", "RD"),
            ("PROV_CODE", "35"),
            ("MAIL_PROV_ABVN", "ON"),
            ("BU_USE", "1"),
        ]),
        csv_line(&[
            ("ADDR_GUID", "a1"),
            ("LOC_GUID", "A"),
            ("CIVIC_NO", "10"),
            ("OFFICIAL_STREET_NAME", "MAIN"),
            ("OFFICIAL_STREET_TYPE", "ST"),
            ("MAIL_STREET_TYPE", "AVE"),
            ("PROV_CODE", "35"),
            ("CSD_ENG_NAME", "Ottawa"),
            ("CSD_FRE_NAME", "Ottawa"),
            ("CSD_TYPE_ENG_CODE", "CY"),
            ("CSD_TYPE_FRE_CODE", "V"),
            ("MAIL_PROV_ABVN", "ON"),
            ("BU_USE", "1"),
        ]),
        csv_line(&[
            ("ADDR_GUID", "b2"),
            ("LOC_GUID", "B"),
            ("CIVIC_NO", "5"),
            ("PROV_CODE", "24"),
            ("MAIL_PROV_ABVN", "QC"),
        ]),
        csv_line(&[
            ("ADDR_GUID", "n1"),
            ("CIVIC_NO", "7"),
            ("OFFICIAL_STREET_TYPE", "AVE"),
        ]),
        csv_line(&[
            ("ADDR_GUID", "b1"),
            ("LOC_GUID", "B"),
            ("CIVIC_NO", "3"),
            ("OFFICIAL_STREET_TYPE", "ST"),
            ("PROV_CODE", "99"),
            ("MAIL_PROV_ABVN", "XX"),
            ("BU_USE", "2"),
        ]),
    ]
}

pub fn write_csv(dir: &Path, name: &str, header: &[&str], lines: &[String]) {
    let mut content = header.join(",");
    content.push('\n');
    for line in lines {
        content.push_str(line);
        content.push('\n');
    }
    fs::write(dir.join(name), content).unwrap();
}

pub fn input_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "nar_part1.csv", HEADER, &sample_records());
    dir
}
