//! Generation bookkeeping: at most one network rebuild per calendar date.

use chrono::NaiveDate;
use hurricane_core::{HistoricMarker, HurricaneError, HurricaneResult};

/// Decisions over the historic-marker ledgers.
///
/// The gate itself is pure; persisting ledgers and archiving generations is
/// left to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionGate {
    markers: Vec<HistoricMarker>,
}

impl VersionGate {
    /// Fails with [`HurricaneError::Integrity`] when the ledger dates do not
    /// strictly increase.
    pub fn new(markers: Vec<HistoricMarker>) -> HurricaneResult<Self> {
        if let Some(pair) = markers.windows(2).find(|w| w[0] >= w[1]) {
            return Err(HurricaneError::Integrity(format!(
                "historic ledger is not strictly increasing: {} then {}",
                pair[0].label(),
                pair[1].label()
            )));
        }
        Ok(Self { markers })
    }

    pub fn markers(&self) -> &[HistoricMarker] {
        &self.markers
    }

    pub fn latest(&self) -> Option<HistoricMarker> {
        self.markers.last().copied()
    }

    /// Check that a rebuild may run on `today`.
    ///
    /// A marker dated `today` already in the ledger is a
    /// [`HurricaneError::Conflict`]; so is a date earlier than the latest
    /// marker, which would break the ordering of the ledger.
    pub fn check_rebuild(&self, today: NaiveDate) -> HurricaneResult<()> {
        match self.latest() {
            Some(latest) if latest.date == today => Err(HurricaneError::Conflict(format!(
                "network already rebuilt on {}",
                latest.label()
            ))),
            Some(latest) if latest.date > today => Err(HurricaneError::Conflict(format!(
                "latest rebuild {} is after {today}",
                latest.label()
            ))),
            _ => Ok(()),
        }
    }

    /// Append the marker of a rebuild completed on `today`.
    pub fn record(&mut self, today: NaiveDate) -> HurricaneResult<HistoricMarker> {
        self.check_rebuild(today)?;
        let marker = HistoricMarker::new(today);
        self.markers.push(marker);
        Ok(marker)
    }

    /// Whether the network moved on since the event pipeline last looked.
    ///
    /// `seen` is the ledger the event pipeline recorded on its previous run.
    /// An empty `seen` ledger (first run) counts as changed, as does any
    /// difference between the two latest markers.
    pub fn changed_since(&self, seen: &[HistoricMarker]) -> bool {
        match (self.latest(), seen.iter().max()) {
            (_, None) => true,
            (Some(latest), Some(last_seen)) => latest != *last_seen,
            (None, Some(_)) => true,
        }
    }
}
