//! Persistent variant store.
//!
//! Three tables: `variant_units`, `witness_readings`, `reading_support`.
//! The `(reading_id, siglum, source_pack_id)` unique constraint on
//! `reading_support` is what makes multi-pack aggregation idempotent —
//! `add_support` is an INSERT-OR-IGNORE against it.

use rusqlite::{params, Connection, OptionalExtension};

use redletters_utils::VerseId;

use crate::types::{Classification, Reason, Significance, VariantUnit, WitnessReading, WitnessSupport, WitnessType};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid stored value for {field}: {value}")]
    InvalidData { field: &'static str, value: String },
}

/// Owns the sqlite connection backing the variant store. One connection per
/// process/job is expected; rusqlite serializes access internally.
pub struct VariantStore {
    conn: Connection,
}

impl VariantStore {
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn open(path: &std::path::Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS variant_units (
                id INTEGER PRIMARY KEY,
                ref TEXT NOT NULL,
                position INTEGER NOT NULL,
                classification TEXT NOT NULL,
                significance TEXT NOT NULL,
                sblgnt_reading_index INTEGER NOT NULL,
                reason_code TEXT NOT NULL,
                reason_summary TEXT NOT NULL,
                reason_detail TEXT NOT NULL,
                source_pack_id TEXT,
                UNIQUE(ref, position)
            );

            CREATE TABLE IF NOT EXISTS witness_readings (
                id INTEGER PRIMARY KEY,
                variant_unit_id INTEGER NOT NULL REFERENCES variant_units(id) ON DELETE CASCADE,
                reading_index INTEGER NOT NULL,
                surface_text TEXT NOT NULL,
                normalized_text TEXT NOT NULL,
                notes TEXT NOT NULL,
                source_pack_id TEXT,
                UNIQUE(variant_unit_id, reading_index)
            );

            CREATE TABLE IF NOT EXISTS reading_support (
                id INTEGER PRIMARY KEY,
                reading_id INTEGER NOT NULL REFERENCES witness_readings(id) ON DELETE CASCADE,
                siglum TEXT NOT NULL,
                type TEXT NOT NULL,
                century_earliest INTEGER,
                century_latest INTEGER,
                source_pack_id TEXT NOT NULL,
                UNIQUE(reading_id, siglum, source_pack_id)
            );

            CREATE INDEX IF NOT EXISTS idx_variant_units_ref ON variant_units(ref);
            ",
        )?;
        Ok(())
    }

    /// `(ref, position)` lookup.
    pub fn get(&self, verse_id: &VerseId, position: i32) -> Result<Option<VariantUnit>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id FROM variant_units WHERE ref = ?1 AND position = ?2",
                params![verse_id.to_string(), position],
                |r| r.get::<_, i64>(0),
            )
            .optional()?;
        match row {
            Some(id) => Ok(Some(self.load_variant(id)?)),
            None => Ok(None),
        }
    }

    /// Internal: find the row id for `(ref, position)`, used by the
    /// aggregator to decide merge-vs-create without paying for a full load.
    pub(crate) fn get_id(&self, verse_id: &VerseId, position: i32) -> Result<Option<i64>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM variant_units WHERE ref = ?1 AND position = ?2",
                params![verse_id.to_string(), position],
                |r| r.get(0),
            )
            .optional()?)
    }

    /// List every variant unit anchored to a verse, ordered by position.
    pub fn list_by_verse(&self, verse_id: &VerseId) -> Result<Vec<VariantUnit>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM variant_units WHERE ref = ?1 ORDER BY position ASC")?;
        let ids: Vec<i64> = stmt
            .query_map(params![verse_id.to_string()], |r| r.get(0))?
            .collect::<Result<_, _>>()?;
        ids.into_iter().map(|id| self.load_variant(id)).collect()
    }

    /// List variants at a verse with `significance ∈ {significant, major}`.
    pub fn list_significant(&self, verse_id: &VerseId) -> Result<Vec<VariantUnit>, StoreError> {
        Ok(self
            .list_by_verse(verse_id)?
            .into_iter()
            .filter(|v| v.significance.requires_ack())
            .collect())
    }

    fn load_variant(&self, id: i64) -> Result<VariantUnit, StoreError> {
        let (ref_str, position, classification, significance, sblgnt_idx, reason_code, reason_summary, reason_detail, source_pack_id): (
            String,
            i32,
            String,
            String,
            i64,
            String,
            String,
            String,
            Option<String>,
        ) = self.conn.query_row(
            "SELECT ref, position, classification, significance, sblgnt_reading_index, reason_code, reason_summary, reason_detail, source_pack_id FROM variant_units WHERE id = ?1",
            params![id],
            |r| {
                Ok((
                    r.get(0)?,
                    r.get(1)?,
                    r.get(2)?,
                    r.get(3)?,
                    r.get(4)?,
                    r.get(5)?,
                    r.get(6)?,
                    r.get(7)?,
                    r.get(8)?,
                ))
            },
        )?;

        let ref_: VerseId = ref_str
            .parse()
            .map_err(|_| StoreError::InvalidData { field: "ref", value: ref_str })?;
        let classification = Classification::from_str_opt(&classification).ok_or_else(|| StoreError::InvalidData {
            field: "classification",
            value: classification,
        })?;
        let significance = Significance::from_str_opt(&significance).ok_or_else(|| StoreError::InvalidData {
            field: "significance",
            value: significance,
        })?;

        let mut stmt = self.conn.prepare(
            "SELECT id, surface_text, normalized_text, notes, source_pack_id FROM witness_readings WHERE variant_unit_id = ?1 ORDER BY reading_index ASC",
        )?;
        let reading_rows: Vec<(i64, String, String, String, Option<String>)> = stmt
            .query_map(params![id], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?))
            })?
            .collect::<Result<_, _>>()?;

        let mut readings = Vec::with_capacity(reading_rows.len());
        for (reading_id, surface_text, normalized_text, notes, rp_source_pack_id) in reading_rows {
            let mut sstmt = self.conn.prepare(
                "SELECT siglum, type, century_earliest, century_latest, source_pack_id FROM reading_support WHERE reading_id = ?1 ORDER BY id ASC",
            )?;
            let supports: Vec<WitnessSupport> = sstmt
                .query_map(params![reading_id], |r| {
                    let siglum: String = r.get(0)?;
                    let wtype: String = r.get(1)?;
                    let earliest: Option<i32> = r.get(2)?;
                    let latest: Option<i32> = r.get(3)?;
                    let source_pack_id: String = r.get(4)?;
                    Ok((siglum, wtype, earliest, latest, source_pack_id))
                })?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .map(|(siglum, wtype, earliest, latest, source_pack_id)| {
                    Ok(WitnessSupport {
                        siglum,
                        witness_type: WitnessType::from_str_opt(&wtype).ok_or_else(|| StoreError::InvalidData {
                            field: "witness_type",
                            value: wtype.clone(),
                        })?,
                        source_pack_id,
                        century_range: match (earliest, latest) {
                            (Some(e), Some(l)) => Some((e, l)),
                            _ => None,
                        },
                    })
                })
                .collect::<Result<_, StoreError>>()?;

            readings.push(WitnessReading {
                surface_text,
                normalized_text,
                notes,
                source_pack_id: rp_source_pack_id,
                support_set: supports,
            });
        }

        Ok(VariantUnit {
            ref_,
            position,
            classification,
            significance,
            sblgnt_reading_index: sblgnt_idx as usize,
            readings,
            reason: Reason {
                code: reason_code,
                summary: reason_summary,
                detail: reason_detail,
            },
            source_pack_id,
        })
    }

    /// Upsert a variant unit: replaces all its readings/supports wholesale.
    /// Used for the "create mode" path; the "merge
    /// mode" path instead uses [`add_reading`]/[`add_support`] directly.
    pub fn save_variant(&mut self, variant: &VariantUnit) -> Result<i64, StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO variant_units (ref, position, classification, significance, sblgnt_reading_index, reason_code, reason_summary, reason_detail, source_pack_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(ref, position) DO UPDATE SET
               classification = excluded.classification,
               significance = excluded.significance,
               sblgnt_reading_index = excluded.sblgnt_reading_index,
               reason_code = excluded.reason_code,
               reason_summary = excluded.reason_summary,
               reason_detail = excluded.reason_detail,
               source_pack_id = excluded.source_pack_id",
            params![
                variant.ref_.to_string(),
                variant.position,
                variant.classification.as_str(),
                variant.significance.as_str(),
                variant.sblgnt_reading_index as i64,
                variant.reason.code,
                variant.reason.summary,
                variant.reason.detail,
                variant.source_pack_id,
            ],
        )?;
        let variant_id: i64 = tx.query_row(
            "SELECT id FROM variant_units WHERE ref = ?1 AND position = ?2",
            params![variant.ref_.to_string(), variant.position],
            |r| r.get(0),
        )?;

        tx.execute("DELETE FROM witness_readings WHERE variant_unit_id = ?1", params![variant_id])?;

        for (idx, reading) in variant.readings.iter().enumerate() {
            let reading_id = insert_reading(&tx, variant_id, idx as i64, reading)?;
            for support in &reading.support_set {
                insert_support(&tx, reading_id, support)?;
            }
        }

        tx.commit()?;
        Ok(variant_id)
    }

    /// Append a brand-new reading to an existing variant unit, at the next
    /// available `reading_index`.
    pub fn add_reading(&mut self, variant_id: i64, reading: &WitnessReading) -> Result<i64, StoreError> {
        let tx = self.conn.transaction()?;
        let next_index: i64 = tx.query_row(
            "SELECT COALESCE(MAX(reading_index), -1) + 1 FROM witness_readings WHERE variant_unit_id = ?1",
            params![variant_id],
            |r| r.get(0),
        )?;
        let reading_id = insert_reading(&tx, variant_id, next_index, reading)?;
        for support in &reading.support_set {
            insert_support(&tx, reading_id, support)?;
        }
        tx.commit()?;
        Ok(reading_id)
    }

    /// Look up a reading by normalized text within a variant unit.
    pub fn find_reading_by_normalized(
        &self,
        variant_id: i64,
        normalized_text: &str,
    ) -> Result<Option<i64>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM witness_readings WHERE variant_unit_id = ?1 AND normalized_text = ?2",
                params![variant_id, normalized_text],
                |r| r.get(0),
            )
            .optional()?)
    }

    /// INSERT-OR-IGNORE a support entry against the `reading_support`
    /// unique constraint; returns whether a new row was actually inserted
    /// (idempotency signal used by the aggregator's updated/unchanged
    /// bookkeeping).
    pub fn add_support(&mut self, reading_id: i64, support: &WitnessSupport) -> Result<bool, StoreError> {
        let changed = insert_support(&self.conn, reading_id, support)?;
        Ok(changed)
    }
}

fn insert_reading(
    conn: &Connection,
    variant_id: i64,
    reading_index: i64,
    reading: &WitnessReading,
) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT INTO witness_readings (variant_unit_id, reading_index, surface_text, normalized_text, notes, source_pack_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            variant_id,
            reading_index,
            reading.surface_text,
            reading.normalized_text,
            reading.notes,
            reading.source_pack_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_support(conn: &Connection, reading_id: i64, support: &WitnessSupport) -> Result<bool, StoreError> {
    let (earliest, latest) = support.century_range.map_or((None, None), |(e, l)| (Some(e), Some(l)));
    let changed = conn.execute(
        "INSERT OR IGNORE INTO reading_support (reading_id, siglum, type, century_earliest, century_latest, source_pack_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![reading_id, support.siglum, support.witness_type.as_str(), earliest, latest, support.source_pack_id],
    )?;
    Ok(changed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Reason;

    fn sample_variant(verse: &str) -> VariantUnit {
        VariantUnit {
            ref_: verse.parse().unwrap(),
            position: 0,
            classification: Classification::Substitution,
            significance: Significance::Major,
            sblgnt_reading_index: 0,
            readings: vec![
                WitnessReading {
                    surface_text: "μονογενὴς θεός".to_string(),
                    normalized_text: "μονογενης θεος".to_string(),
                    notes: "spine".to_string(),
                    source_pack_id: None,
                    support_set: vec![WitnessSupport {
                        siglum: "SBLGNT".to_string(),
                        witness_type: WitnessType::Edition,
                        source_pack_id: "sblgnt".to_string(),
                        century_range: Some((21, 21)),
                    }],
                },
                WitnessReading {
                    surface_text: "μονογενὴς υἱός".to_string(),
                    normalized_text: "μονογενης υιος".to_string(),
                    notes: "From WH".to_string(),
                    source_pack_id: Some("wh".to_string()),
                    support_set: vec![WitnessSupport {
                        siglum: "WH".to_string(),
                        witness_type: WitnessType::Edition,
                        source_pack_id: "wh".to_string(),
                        century_range: Some((19, 19)),
                    }],
                },
            ],
            reason: Reason {
                code: "theological_keyword".to_string(),
                summary: "Theological term change".to_string(),
                detail: String::new(),
            },
            source_pack_id: None,
        }
    }

    #[test]
    fn save_and_get_round_trips() {
        let mut store = VariantStore::open_in_memory().unwrap();
        let variant = sample_variant("John.1.18");
        store.save_variant(&variant).unwrap();

        let loaded = store.get(&variant.ref_, 0).unwrap().unwrap();
        assert_eq!(loaded.readings.len(), 2);
        assert_eq!(loaded.significance, Significance::Major);
    }

    #[test]
    fn add_support_is_idempotent_via_unique_constraint() {
        let mut store = VariantStore::open_in_memory().unwrap();
        let variant = sample_variant("John.1.18");
        let variant_id = store.save_variant(&variant).unwrap();
        let reading_id = store.find_reading_by_normalized(variant_id, "μονογενης υιος").unwrap().unwrap();

        let support = WitnessSupport {
            siglum: "WH".to_string(),
            witness_type: WitnessType::Edition,
            source_pack_id: "wh".to_string(),
            century_range: Some((19, 19)),
        };
        let first = store.add_support(reading_id, &support).unwrap();
        let second = store.add_support(reading_id, &support).unwrap();
        assert!(!first, "support already present from save_variant");
        assert!(!second);

        let loaded = store.get(&variant.ref_, 0).unwrap().unwrap();
        assert_eq!(loaded.readings[1].support_set.len(), 1);
    }

    #[test]
    fn list_significant_filters_by_significance() {
        let mut store = VariantStore::open_in_memory().unwrap();
        let major = sample_variant("John.1.18");
        let mut trivial = sample_variant("John.1.18");
        trivial.position = 1;
        trivial.significance = Significance::Trivial;

        store.save_variant(&major).unwrap();
        store.save_variant(&trivial).unwrap();

        let significant = store.list_significant(&"John.1.18".parse().unwrap()).unwrap();
        assert_eq!(significant.len(), 1);
        assert_eq!(significant[0].position, 0);
    }

    #[test]
    fn delete_cascades_to_readings_and_support() {
        let mut store = VariantStore::open_in_memory().unwrap();
        let variant = sample_variant("John.1.18");
        store.save_variant(&variant).unwrap();
        store
            .conn
            .execute("DELETE FROM variant_units WHERE ref = ?1", params!["John.1.18"])
            .unwrap();

        let count: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM witness_readings", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
