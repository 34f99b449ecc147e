//! Built-in source catalog.
//!
//! The core abstracts pack *fetch* out of scope (`Installer::materialize`
//! only implements `Local`; `Git`/`Zip` report `NetworkError` since no
//! transport is wired into this crate). This module declares two catalog
//! entries as a running example — `SBLGNT` as the spine and `WH` as a
//! comparative edition — so `redletters source status` has something
//! real to report against.

use redletters_catalog::{CitationMetadata, InstallSource, PackRole, SourceCatalog, SourcePack};

/// The catalog shipped with this binary.
#[must_use]
pub fn seed_catalog() -> SourceCatalog {
    SourceCatalog::from_packs([
        SourcePack::new(
            "sblgnt",
            "SBLGNT",
            "2010",
            "CC-BY-SA-4.0",
            PackRole::Spine,
            InstallSource::Git {
                url: "https://github.com/LogosBible/SBLGNT.git".to_string(),
                revision: "master".to_string(),
            },
            CitationMetadata {
                source_title: "SBL Greek New Testament".to_string(),
                edition: "1st".to_string(),
                publisher: "Society of Biblical Literature / Logos Bible Software".to_string(),
                year: "2010".to_string(),
                license_url: "https://creativecommons.org/licenses/by-sa/4.0/".to_string(),
            },
        ),
        SourcePack::new(
            "wh",
            "Westcott and Hort",
            "1881",
            "Public Domain",
            PackRole::Comparative,
            InstallSource::Git {
                url: "https://github.com/morphgnt/tischendorf-ugnt.git".to_string(),
                revision: "master".to_string(),
            },
            CitationMetadata {
                source_title: "The New Testament in the Original Greek".to_string(),
                edition: "1st".to_string(),
                publisher: "Macmillan".to_string(),
                year: "1881".to_string(),
                license_url: String::new(),
            },
        ),
        SourcePack::new(
            "na28",
            "Novum Testamentum Graece",
            "28th",
            "EULA",
            PackRole::Comparative,
            InstallSource::Manual,
            CitationMetadata {
                source_title: "Nestle-Aland Novum Testamentum Graece".to_string(),
                edition: "28th".to_string(),
                publisher: "Deutsche Bibelgesellschaft".to_string(),
                year: "2012".to_string(),
                license_url: String::new(),
            },
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use redletters_utils::PackId;

    #[test]
    fn spine_pack_is_catalogued() {
        let catalog = seed_catalog();
        let sblgnt = catalog.get(&PackId::from("sblgnt")).unwrap();
        assert_eq!(sblgnt.role, PackRole::Spine);
    }

    #[test]
    fn eula_pack_requires_acceptance() {
        let catalog = seed_catalog();
        let na28 = catalog.get(&PackId::from("na28")).unwrap();
        assert!(redletters_catalog::requires_eula(na28));
    }
}
