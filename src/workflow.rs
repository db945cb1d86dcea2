//! Scan workflow: storage location → item → quantity → commit
//!
//! The workflow never holds state of its own. Each operator action is applied
//! with [`ScanWorkflow::apply`], which takes the current [`WorkflowState`] and
//! returns the next one together with the outcome. Failed actions return the
//! state they were given, with only the status message changed.

use crate::barcode::{decode, DecodedScan, ScanMetadata, ScanMode};
use crate::database::{append_scan_event, NewScanEvent, SnapshotRecord};
use crate::error::{InventoryError, Result};
use crate::matching::{lookup, MatchResult, MatchStatus};
use crate::settings::{ScannerSettings, SettingsProvider};
use rusqlite::Connection;

/// Quantity proposed when the operator is not asked to type one
const DEFAULT_QUANTITY: &str = "1";

/// Who is counting, and where the counts are booked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub domain: String,
    /// Site used when the scanned item is not in the snapshot
    pub site: String,
    pub operator: String,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            domain: "OFFLINE".to_string(),
            site: "1".to_string(),
            operator: "Unknown".to_string(),
        }
    }
}

/// A decoded storage location together with the raw scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedLocation {
    pub parsed: String,
    pub raw: String,
}

/// A decoded item and how it matched the snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedItem {
    pub parsed_ref: String,
    pub raw: String,
    pub metadata: ScanMetadata,
    pub matched: Option<SnapshotRecord>,
    pub status: MatchStatus,
}

/// Item waiting for its quantity
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCount {
    pub location: ScannedLocation,
    pub item: ScannedItem,
    pub quantity: String,
    /// Quantity was typed by the operator rather than defaulted
    pub manual: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    AwaitingLocation,
    AwaitingItem { location: ScannedLocation },
    ConfirmingQuantity(PendingCount),
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::AwaitingLocation => "AwaitingLocation",
            Step::AwaitingItem { .. } => "AwaitingItem",
            Step::ConfirmingQuantity(_) => "ConfirmingQuantity",
        }
    }
}

/// Operator input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    /// Raw text from the scanner or typed in
    Scan(String),
    /// Quantity typed while confirming
    EnterQuantity(String),
    /// Save the pending count
    Commit,
    /// Drop the pending count
    Cancel,
}

impl WorkflowEvent {
    fn name(&self) -> &'static str {
        match self {
            WorkflowEvent::Scan(_) => "scan",
            WorkflowEvent::EnterQuantity(_) => "quantity entry",
            WorkflowEvent::Commit => "commit",
            WorkflowEvent::Cancel => "cancel",
        }
    }
}

/// In-memory state of one scan session, never persisted
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowState {
    pub step: Step,
    pub status_message: String,
}

impl WorkflowState {
    pub fn new(settings: &ScannerSettings) -> Self {
        Self {
            step: Step::AwaitingLocation,
            status_message: location_prompt(settings),
        }
    }

    /// Decoded storage location, if one has been scanned
    pub fn current_location(&self) -> Option<&str> {
        match &self.step {
            Step::AwaitingLocation => None,
            Step::AwaitingItem { location } => Some(&location.parsed),
            Step::ConfirmingQuantity(pending) => Some(&pending.location.parsed),
        }
    }

    pub fn scanned_item(&self) -> Option<&ScannedItem> {
        match &self.step {
            Step::ConfirmingQuantity(pending) => Some(&pending.item),
            _ => None,
        }
    }

    pub fn match_status(&self) -> Option<MatchStatus> {
        self.scanned_item().map(|item| item.status)
    }

    pub fn pending_quantity(&self) -> Option<&str> {
        match &self.step {
            Step::ConfirmingQuantity(pending) => Some(&pending.quantity),
            _ => None,
        }
    }
}

/// What a successful action did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    LocationSet,
    ItemScanned(MatchStatus),
    QuantityEntered,
    Committed { event_id: i64 },
    Cancelled,
}

/// Next state plus the outcome of the action that produced it
#[derive(Debug)]
pub struct Transition {
    pub state: WorkflowState,
    pub result: Result<StepOutcome>,
}

impl Transition {
    fn ok(step: Step, status_message: String, outcome: StepOutcome) -> Self {
        Self {
            state: WorkflowState {
                step,
                status_message,
            },
            result: Ok(outcome),
        }
    }

    /// Stay in `step`; only the status message reports the error
    fn fail(step: Step, err: InventoryError) -> Self {
        Self {
            state: WorkflowState {
                step,
                status_message: format!("Error: {}", err),
            },
            result: Err(err),
        }
    }
}

fn location_prompt(settings: &ScannerSettings) -> String {
    if settings.sm_prefix.is_empty() {
        "Scan storage location".to_string()
    } else {
        format!("Scan storage location (prefix: {})", settings.sm_prefix)
    }
}

fn item_prompt(location: &ScannedLocation) -> String {
    format!("SM: {}. Scan an item.", location.parsed)
}

/// Parse a quantity typed by the operator
fn parse_quantity(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(InventoryError::Validation("enter a quantity".to_string()));
    }
    match trimmed.parse::<f64>() {
        Ok(q) if q.is_finite() => Ok(q),
        _ => Err(InventoryError::Validation(format!(
            "\"{}\" is not a valid quantity",
            text
        ))),
    }
}

/// Drives one operator's scan session
#[derive(Debug, Clone)]
pub struct ScanWorkflow {
    settings: ScannerSettings,
    context: SessionContext,
}

impl ScanWorkflow {
    pub fn new(settings: ScannerSettings, context: SessionContext) -> Self {
        Self { settings, context }
    }

    /// Enter a session: load settings and return the initial state
    pub fn start(
        provider: &impl SettingsProvider,
        context: SessionContext,
    ) -> (Self, WorkflowState) {
        let settings = provider.load_settings();
        log::info!(
            "Scan session started for {} in {} (check against db: {})",
            context.operator,
            context.domain,
            settings.check_against_db
        );
        let state = WorkflowState::new(&settings);
        (Self::new(settings, context), state)
    }

    /// Re-read settings when the session is resumed, e.g. after the operator
    /// changed them. The state itself is kept; new settings apply from the next
    /// action onward.
    pub fn resume(
        &mut self,
        provider: &impl SettingsProvider,
        state: WorkflowState,
    ) -> WorkflowState {
        self.settings = provider.load_settings();
        log::debug!("Scan session resumed with settings {:?}", self.settings);
        match state.step {
            Step::AwaitingLocation => WorkflowState::new(&self.settings),
            _ => state,
        }
    }

    pub fn settings(&self) -> &ScannerSettings {
        &self.settings
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Apply one operator action
    pub fn apply(&self, conn: &Connection, state: WorkflowState, event: WorkflowEvent) -> Transition {
        match (state.step, event) {
            (Step::AwaitingLocation, WorkflowEvent::Scan(raw)) => self.scan_location(&raw),
            (Step::AwaitingItem { location }, WorkflowEvent::Scan(raw)) => {
                self.scan_item(conn, location, &raw)
            }
            (Step::ConfirmingQuantity(mut pending), WorkflowEvent::EnterQuantity(quantity)) => {
                pending.quantity = quantity;
                pending.manual = true;
                let message = format!("Quantity: {}", pending.quantity);
                Transition::ok(
                    Step::ConfirmingQuantity(pending),
                    message,
                    StepOutcome::QuantityEntered,
                )
            }
            (Step::ConfirmingQuantity(pending), WorkflowEvent::Commit) => self.commit(conn, pending),
            (Step::ConfirmingQuantity(pending), WorkflowEvent::Cancel) => {
                log::debug!("Count of {} cancelled", pending.item.parsed_ref);
                let message = format!("Cancelled. {}", item_prompt(&pending.location));
                Transition::ok(
                    Step::AwaitingItem {
                        location: pending.location,
                    },
                    message,
                    StepOutcome::Cancelled,
                )
            }
            (step, event) => {
                let err = InventoryError::Validation(format!(
                    "{} is not possible in step {}",
                    event.name(),
                    step.name()
                ));
                Transition::fail(step, err)
            }
        }
    }

    fn scan_location(&self, raw: &str) -> Transition {
        match decode(raw, ScanMode::Location, &self.settings) {
            Ok(DecodedScan {
                original, parsed, ..
            }) => {
                let location = ScannedLocation {
                    parsed,
                    raw: original,
                };
                log::debug!("Storage location set: {}", location.parsed);
                let message = item_prompt(&location);
                Transition::ok(
                    Step::AwaitingItem { location },
                    message,
                    StepOutcome::LocationSet,
                )
            }
            Err(e) => Transition::fail(Step::AwaitingLocation, e),
        }
    }

    fn scan_item(&self, conn: &Connection, location: ScannedLocation, raw: &str) -> Transition {
        let decoded = match decode(raw, ScanMode::Item, &self.settings) {
            Ok(decoded) => decoded,
            Err(e) => return Transition::fail(Step::AwaitingItem { location }, e),
        };

        let result = if self.settings.check_against_db {
            match lookup(conn, &decoded.parsed, &location.parsed) {
                Ok(result) => result,
                Err(e) => {
                    log::error!("Snapshot lookup failed: {}", e);
                    return Transition::fail(Step::AwaitingItem { location }, e);
                }
            }
        } else {
            MatchResult::unchecked()
        };

        let message = result.message();
        let status = result.status;
        let quantity = if self.settings.manual_qty {
            String::new()
        } else {
            DEFAULT_QUANTITY.to_string()
        };

        let pending = PendingCount {
            location,
            item: ScannedItem {
                parsed_ref: decoded.parsed,
                raw: decoded.original,
                metadata: decoded.metadata,
                matched: result.record,
                status,
            },
            quantity,
            manual: false,
        };
        Transition::ok(
            Step::ConfirmingQuantity(pending),
            message,
            StepOutcome::ItemScanned(status),
        )
    }

    fn commit(&self, conn: &Connection, pending: PendingCount) -> Transition {
        let quantity = match parse_quantity(&pending.quantity) {
            Ok(q) => q,
            Err(e) => return Transition::fail(Step::ConfirmingQuantity(pending), e),
        };

        let event = self.build_event(&pending, quantity);
        let event_id = match append_scan_event(conn, &event) {
            Ok(id) => id,
            Err(e) => {
                log::error!("Failed to save scan event: {}", e);
                return Transition::fail(Step::ConfirmingQuantity(pending), e.into());
            }
        };
        log::info!(
            "Saved count: {} x{} at {} ({})",
            event.reference,
            quantity,
            event.storage_location,
            event.status
        );

        let outcome = StepOutcome::Committed { event_id };
        if self.settings.reset_sm_after_item {
            let message = format!("Saved. {}", location_prompt(&self.settings));
            Transition::ok(Step::AwaitingLocation, message, outcome)
        } else {
            let message = format!("Saved. SM: {}. Scan the next item.", pending.location.parsed);
            Transition::ok(
                Step::AwaitingItem {
                    location: pending.location,
                },
                message,
                outcome,
            )
        }
    }

    fn build_event(&self, pending: &PendingCount, quantity: f64) -> NewScanEvent {
        let matched = pending.item.matched.as_ref();
        let site = matched
            .map(|r| r.site.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(self.context.site.as_str());
        let part_number = matched
            .map(|r| r.part_number.as_str())
            .filter(|p| !p.is_empty())
            .unwrap_or(pending.item.parsed_ref.as_str());

        NewScanEvent {
            domain: self.context.domain.clone(),
            site: site.to_string(),
            storage_location: pending.location.parsed.clone(),
            original_location_scan: pending.location.raw.clone(),
            part_number: part_number.to_string(),
            batch: matched.map(|r| r.batch.clone()).unwrap_or_default(),
            reference: pending.item.parsed_ref.clone(),
            original_reference_scan: pending.item.raw.clone(),
            quantity,
            scan_date: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            scanned_by: self.context.operator.clone(),
            is_manual_qty: pending.manual,
            status: pending.item.status,
        }
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
