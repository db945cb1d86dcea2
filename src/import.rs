//! Import of authoritative inventory into the local snapshot
//!
//! 1. keep only records of the selected domain
//! 2. offer the distinct sites found in that data
//! 3. apply site, storage location and part filters
//! 4. replace the snapshot in one transaction

use crate::database::{replace_snapshot, NewSnapshotRecord};
use crate::error::{InventoryError, Result};
use crate::qad::{AuthoritativeRecord, QadClient};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Filter value matching everything
pub const MATCH_ALL: &str = "*";

/// Operator-selected import filters
///
/// `storage_location` and `part` accept a trailing `*` for prefix matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImportFilters {
    pub site: String,
    pub storage_location: String,
    pub part: String,
}

impl Default for ImportFilters {
    fn default() -> Self {
        Self {
            site: MATCH_ALL.to_string(),
            storage_location: MATCH_ALL.to_string(),
            part: MATCH_ALL.to_string(),
        }
    }
}

impl ImportFilters {
    /// Check one record against all three filters
    pub fn matches(&self, record: &AuthoritativeRecord) -> bool {
        let site_match = self.site == MATCH_ALL || record.site() == self.site;
        site_match
            && wildcard_match(&self.storage_location, record.location())
            && wildcard_match(&self.part, record.part())
    }
}

/// `*` matches anything, `A1*` matches values starting with `A1`,
/// anything else must match exactly.
pub fn wildcard_match(pattern: &str, value: &str) -> bool {
    if pattern == MATCH_ALL {
        return true;
    }
    match pattern.strip_suffix('*') {
        Some(prefix) => value.starts_with(prefix),
        None => value == pattern,
    }
}

/// Site offered to the operator as a filter choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteOption {
    pub code: String,
    pub description: String,
}

/// Distinct non-empty site codes, numerically sorted when every code is an
/// integer, lexicographically otherwise
pub fn distinct_sites(records: &[AuthoritativeRecord]) -> Vec<SiteOption> {
    let codes: BTreeSet<&str> = records
        .iter()
        .map(|r| r.site())
        .filter(|s| !s.is_empty())
        .collect();
    let mut codes: Vec<&str> = codes.into_iter().collect();

    let numeric: Option<Vec<i64>> = codes
        .iter()
        .map(|c| c.trim().parse::<i64>().ok())
        .collect();
    if let Some(numbers) = numeric {
        let mut pairs: Vec<(i64, &str)> = numbers.into_iter().zip(codes).collect();
        pairs.sort();
        codes = pairs.into_iter().map(|(_, c)| c).collect();
    }

    codes
        .into_iter()
        .map(|code| SiteOption {
            code: code.to_string(),
            description: format!("Site {}", code),
        })
        .collect()
}

/// Backend data narrowed to one domain, ready for filter selection
#[derive(Debug, Clone)]
pub struct DomainData {
    domain: String,
    records: Vec<AuthoritativeRecord>,
    sites: Vec<SiteOption>,
    received_domains: Vec<String>,
}

impl DomainData {
    /// Keep only `domain`'s records, even if the backend already filtered them
    pub fn prepare(domain: &str, raw: Vec<AuthoritativeRecord>) -> Self {
        let received_domains: Vec<String> = raw
            .iter()
            .map(|r| r.domain().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let total = raw.len();

        let records: Vec<AuthoritativeRecord> =
            raw.into_iter().filter(|r| r.domain() == domain).collect();
        let sites = distinct_sites(&records);

        log::info!(
            "Data before filtering: {}, after filtering by domain '{}': {}",
            total,
            domain,
            records.len()
        );

        Self {
            domain: domain.to_string(),
            records,
            sites,
            received_domains,
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn records(&self) -> &[AuthoritativeRecord] {
        &self.records
    }

    pub fn sites(&self) -> &[SiteOption] {
        &self.sites
    }

    /// Domains present in the unfiltered backend response
    pub fn received_domains(&self) -> &[String] {
        &self.received_domains
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records passing the filters, in backend order
    pub fn filtered<'a>(
        &'a self,
        filters: &'a ImportFilters,
    ) -> impl Iterator<Item = &'a AuthoritativeRecord> {
        self.records.iter().filter(move |r| filters.matches(r))
    }

    /// Replace the snapshot with the filtered records
    pub fn import(&self, conn: &mut Connection, filters: &ImportFilters) -> Result<ImportSummary> {
        let rows: Vec<NewSnapshotRecord> = self.filtered(filters).map(to_snapshot_record).collect();

        if rows.is_empty() {
            return Err(InventoryError::Import(
                "no records match the selected filters".to_string(),
            ));
        }

        let imported = replace_snapshot(conn, &rows).map_err(|e| {
            log::error!("Snapshot replace rolled back: {}", e);
            InventoryError::Import(format!("snapshot replace failed: {}", e))
        })?;

        log::info!(
            "Import completed! Imported records: {} of {}",
            imported,
            self.len()
        );
        Ok(ImportSummary {
            imported,
            available: self.len(),
        })
    }
}

/// Outcome of a successful import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    /// Records committed to the snapshot
    pub imported: usize,
    /// Records of the selected domain before filtering
    pub available: usize,
}

/// Map a backend record to its snapshot row, blanks for missing text and
/// `"0"` for a missing quantity
pub fn to_snapshot_record(record: &AuthoritativeRecord) -> NewSnapshotRecord {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    let quantity = match record.qty_on_hand.as_deref() {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => "0".to_string(),
    };

    NewSnapshotRecord {
        domain: text(&record.domain),
        part_number: text(&record.part),
        site: text(&record.site),
        storage_location: text(&record.location),
        batch: text(&record.lot),
        reference: text(&record.reference),
        quantity,
    }
}

/// Filter `raw` to `domain`, apply `filters` and replace the snapshot
pub fn import_filtered(
    conn: &mut Connection,
    domain: &str,
    raw: Vec<AuthoritativeRecord>,
    filters: &ImportFilters,
) -> Result<ImportSummary> {
    if domain.is_empty() {
        return Err(InventoryError::Import("no domain selected".to_string()));
    }
    DomainData::prepare(domain, raw).import(conn, filters)
}

/// Fetch the domain's inventory from the backend and narrow it to the domain
///
/// Nothing is written here; a failed fetch leaves the snapshot untouched.
pub async fn fetch_domain_data(client: &QadClient, token: &str, domain: &str) -> Result<DomainData> {
    if domain.is_empty() {
        return Err(InventoryError::Import("no domain selected".to_string()));
    }
    let raw = client.fetch_inventory(token, domain).await.map_err(|e| {
        log::error!("Error loading domain data: {}", e);
        InventoryError::Import(format!("fetching inventory for {} failed: {}", domain, e))
    })?;
    Ok(DomainData::prepare(domain, raw))
}

/// Fetch the domain's inventory and replace the snapshot with the filtered set
pub async fn fetch_and_import(
    client: &QadClient,
    token: &str,
    conn: &mut Connection,
    domain: &str,
    filters: &ImportFilters,
) -> Result<ImportSummary> {
    let data = fetch_domain_data(client, token, domain).await?;
    log::info!(
        "Fetched {} records for {} (sites: {})",
        data.len(),
        domain,
        data.sites().len()
    );
    data.import(conn, filters)
}
