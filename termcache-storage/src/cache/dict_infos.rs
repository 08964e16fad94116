//! DictInfo cache: per-id dictionary metadata.
//!
//! Two request shapes share one record store. A fetch-all request loads every
//! record in one query; a by-id request queries only ids nobody has asked for
//! yet and otherwise waits on the queries already covering them. Ids the
//! source does not know are tombstoned and never queried again.
//!
//! # Failure
//!
//! A failed query fails exactly the waiting requests that needed it:
//!
//! - a failed fetch-all fails fetch-all requests and by-id requests that were
//!   registered while it was in flight (they launched nothing of their own);
//! - a failed by-id query fails by-id requests still missing one of its ids,
//!   unless they are waiting on a fetch-all that will cover them anyway.
//!
//! Everything else keeps waiting. Failed ids become eligible for querying
//! again.

use std::collections::{HashMap, HashSet};

use termcache_core::{DictInfo, DictInfoOptions, Items};

use super::dispatch::{self, Completion, Pending};

/// Whether the full record set has been loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GotAllState {
    #[default]
    Never,
    InFlight,
    Complete,
}

#[derive(Debug, Clone)]
enum DictInfoRecord {
    Found(DictInfo),
    /// Confirmed absent from the source.
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
enum CellStatus {
    /// Settled for this request; `None` when the source has no such id.
    Resolved(Option<DictInfo>),
    Pending,
    Unqueried,
}

impl CellStatus {
    fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

#[derive(Debug)]
struct IdCell {
    id: String,
    status: CellStatus,
}

#[derive(Debug)]
enum RequestedItems {
    FetchAll,
    ByIds(Vec<IdCell>),
}

#[derive(Debug)]
struct PendingRequest<E> {
    items: RequestedItems,
    options: DictInfoOptions,
    behind_fetch_all: bool,
    completion: Completion<Items<DictInfo>, E>,
}

/// A backing query the caller must run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictInfoQuery {
    All,
    Ids(Vec<String>),
}

impl DictInfoQuery {
    /// Options sent to the source. They never carry pagination or sorting, so
    /// every record of interest gets cached.
    pub fn options(&self) -> DictInfoOptions {
        match self {
            Self::All => DictInfoOptions::all(),
            Self::Ids(ids) => DictInfoOptions::by_ids(ids.iter().cloned()),
        }
    }
}

/// How a request selects its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<'a> {
    All,
    Ids(&'a [String]),
    /// Any other filter; answered by the source directly.
    Passthrough,
}

impl<'a> Selection<'a> {
    pub fn of(options: &'a DictInfoOptions) -> Self {
        match &options.filter {
            None => Self::All,
            Some(filter) => match (&filter.id, &filter.name) {
                (Some(ids), _) => Self::Ids(ids),
                (None, None) => Self::All,
                (None, Some(_)) => Self::Passthrough,
            },
        }
    }
}

#[derive(Debug)]
pub enum DictInfoLookup<E> {
    Ready(Items<DictInfo>),
    Wait {
        pending: Pending<Items<DictInfo>, E>,
        query: Option<DictInfoQuery>,
    },
}

enum Verdict<E> {
    Keep,
    Resolve,
    Fail(E),
}

#[derive(Debug)]
pub struct DictInfoCache<E> {
    records: HashMap<String, DictInfoRecord>,
    queried: HashSet<String>,
    got_all: GotAllState,
    pending: Vec<PendingRequest<E>>,
}

impl<E: Clone> Default for DictInfoCache<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone> DictInfoCache<E> {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            queried: HashSet::new(),
            got_all: GotAllState::Never,
            pending: Vec::new(),
        }
    }

    /// The settled answer for `id`, if the store has one.
    fn resolution(&self, id: &str) -> Option<Option<DictInfo>> {
        match self.records.get(id) {
            Some(DictInfoRecord::Found(info)) => Some(Some(info.clone())),
            Some(DictInfoRecord::Missing) => Some(None),
            None if self.got_all == GotAllState::Complete => Some(None),
            None => None,
        }
    }

    fn classify(&self, id: &str) -> CellStatus {
        match self.resolution(id) {
            Some(info) => CellStatus::Resolved(info),
            None if self.queried.contains(id) => CellStatus::Pending,
            None => CellStatus::Unqueried,
        }
    }

    /// Records held by the cells themselves, so a clear between registration
    /// and resolution cannot drop any of them.
    fn found(cells: &[IdCell]) -> Vec<DictInfo> {
        cells
            .iter()
            .filter_map(|c| match &c.status {
                CellStatus::Resolved(info) => info.clone(),
                _ => None,
            })
            .collect()
    }

    fn all_found(&self) -> Vec<DictInfo> {
        self.records
            .values()
            .filter_map(|record| match record {
                DictInfoRecord::Found(info) => Some(info.clone()),
                DictInfoRecord::Missing => None,
            })
            .collect()
    }

    /// Requests records by id. Duplicate ids count once.
    pub fn request_ids(&mut self, ids: &[String], options: &DictInfoOptions) -> DictInfoLookup<E> {
        let mut seen = HashSet::new();
        let mut cells: Vec<IdCell> = ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .map(|id| IdCell {
                id: id.clone(),
                status: self.classify(id),
            })
            .collect();

        if cells.iter().all(|c| c.status.is_resolved()) {
            let infos = Self::found(&cells);
            return DictInfoLookup::Ready(Items::new(options.arrange(infos)));
        }

        let behind_fetch_all = self.got_all == GotAllState::InFlight;
        let mut query = None;
        if !behind_fetch_all {
            let fresh: Vec<String> = cells
                .iter_mut()
                .filter(|c| matches!(c.status, CellStatus::Unqueried))
                .map(|c| {
                    c.status = CellStatus::Pending;
                    c.id.clone()
                })
                .collect();
            if !fresh.is_empty() {
                self.queried.extend(fresh.iter().cloned());
                query = Some(DictInfoQuery::Ids(fresh));
            }
        }

        let (completion, pending) = dispatch::channel();
        self.pending.push(PendingRequest {
            items: RequestedItems::ByIds(cells),
            options: options.clone(),
            behind_fetch_all,
            completion,
        });
        DictInfoLookup::Wait { pending, query }
    }

    /// Requests every record.
    pub fn request_all(&mut self, options: &DictInfoOptions) -> DictInfoLookup<E> {
        if self.got_all == GotAllState::Complete {
            return DictInfoLookup::Ready(Items::new(options.arrange(self.all_found())));
        }

        let query = if self.got_all == GotAllState::InFlight {
            None
        } else {
            self.got_all = GotAllState::InFlight;
            Some(DictInfoQuery::All)
        };

        let (completion, pending) = dispatch::channel();
        self.pending.push(PendingRequest {
            items: RequestedItems::FetchAll,
            options: options.clone(),
            behind_fetch_all: false,
            completion,
        });
        DictInfoLookup::Wait { pending, query }
    }

    /// Stores records obtained outside the by-id and fetch-all paths. Nothing
    /// is tombstoned, as absent ids were not necessarily asked for.
    pub fn store(&mut self, infos: &[DictInfo]) {
        for info in infos {
            self.records
                .insert(info.id.clone(), DictInfoRecord::Found(info.clone()));
        }
    }

    /// Applies a finished query and re-evaluates every waiting request in
    /// registration order. Returns how many requests were answered.
    pub fn complete(&mut self, query: &DictInfoQuery, outcome: Result<Items<DictInfo>, E>) -> usize {
        let failure = match (query, outcome) {
            (DictInfoQuery::All, Ok(items)) => {
                self.records = items
                    .into_inner()
                    .into_iter()
                    .map(|info| (info.id.clone(), DictInfoRecord::Found(info)))
                    .collect();
                self.got_all = GotAllState::Complete;
                None
            }
            (DictInfoQuery::All, Err(err)) => {
                if self.got_all == GotAllState::InFlight {
                    self.got_all = GotAllState::Never;
                }
                Some(err)
            }
            (DictInfoQuery::Ids(ids), Ok(items)) => {
                for id in ids {
                    self.queried.remove(id);
                }
                let returned: HashSet<String> = items.items.iter().map(|i| i.id.clone()).collect();
                self.store(&items.items);
                for id in ids.iter().filter(|id| !returned.contains(*id)) {
                    self.records
                        .entry(id.clone())
                        .or_insert(DictInfoRecord::Missing);
                }
                None
            }
            (DictInfoQuery::Ids(ids), Err(err)) => {
                for id in ids {
                    self.queried.remove(id);
                }
                Some(err)
            }
        };

        let mut answered = 0;
        for mut request in std::mem::take(&mut self.pending) {
            match self.judge(&mut request, query, failure.as_ref()) {
                Verdict::Keep => self.pending.push(request),
                Verdict::Resolve => {
                    let infos = match &request.items {
                        RequestedItems::FetchAll => self.all_found(),
                        RequestedItems::ByIds(cells) => Self::found(cells),
                    };
                    dispatch::resolve(request.completion, Ok(Items::new(request.options.arrange(infos))));
                    answered += 1;
                }
                Verdict::Fail(err) => {
                    dispatch::resolve(request.completion, Err(err));
                    answered += 1;
                }
            }
        }
        answered
    }

    fn judge(
        &self,
        request: &mut PendingRequest<E>,
        query: &DictInfoQuery,
        failure: Option<&E>,
    ) -> Verdict<E> {
        let failed_ids: &[String] = match (query, failure) {
            (DictInfoQuery::Ids(ids), Some(_)) => ids.as_slice(),
            _ => &[],
        };

        match &mut request.items {
            RequestedItems::FetchAll => match (query, failure) {
                (DictInfoQuery::All, Some(err)) => Verdict::Fail(err.clone()),
                _ if self.got_all == GotAllState::Complete => Verdict::Resolve,
                _ => Verdict::Keep,
            },
            RequestedItems::ByIds(cells) => {
                let mut needed_failed = false;
                for cell in cells.iter_mut().filter(|c| !c.status.is_resolved()) {
                    if let Some(info) = self.resolution(&cell.id) {
                        cell.status = CellStatus::Resolved(info);
                    } else if failed_ids.contains(&cell.id) {
                        cell.status = CellStatus::Unqueried;
                        needed_failed = true;
                    }
                }

                if let Some(err) = failure {
                    let depends = match query {
                        DictInfoQuery::All => request.behind_fetch_all,
                        DictInfoQuery::Ids(_) => !request.behind_fetch_all && needed_failed,
                    };
                    if depends {
                        return Verdict::Fail(err.clone());
                    }
                }

                if cells.iter().all(|c| c.status.is_resolved()) {
                    Verdict::Resolve
                } else {
                    Verdict::Keep
                }
            }
        }
    }

    /// Forgets stored records and a completed fetch-all. The `queried` marks
    /// and a fetch-all still in flight are kept, so no query is duplicated and
    /// their results repopulate the store when they land. Waiting requests
    /// keep the records they had already resolved.
    pub fn clear(&mut self) {
        self.records.clear();
        if self.got_all == GotAllState::Complete {
            self.got_all = GotAllState::Never;
        }
    }

    pub fn got_all(&self) -> GotAllState {
        self.got_all
    }

    pub fn found_count(&self) -> usize {
        self.records
            .values()
            .filter(|r| matches!(r, DictInfoRecord::Found(_)))
            .count()
    }

    pub fn tombstone_count(&self) -> usize {
        self.records.len() - self.found_count()
    }

    pub fn queried_count(&self) -> usize {
        self.queried.len()
    }

    pub fn waiting(&self) -> usize {
        self.pending.len()
    }
}
