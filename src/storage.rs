use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    ChatRole, Customer, CustomerCategory, CustomerStats, ExtractedRecord, FinancialCategory,
    FinancialData, HistoryTurn, UploadedFile,
};

/// One conversation context: append-only history plus the extracted
/// entities accumulated by chat calls carrying this session's id.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub history: Vec<HistoryTurn>,
    pub customer_info: Vec<Customer>,
    pub financial_data: Vec<FinancialData>,
    pub uploaded_files: Vec<UploadedFile>,
    /// Opaque state the agent runtime returned on the last turn, handed
    /// back verbatim on the next one. Last writer wins.
    pub runtime_state: Option<serde_json::Value>,
    pub last_touched: DateTime<Utc>,
}

impl Session {
    fn new(id: String) -> Self {
        Self {
            id,
            history: Vec::new(),
            customer_info: Vec::new(),
            financial_data: Vec::new(),
            uploaded_files: Vec::new(),
            runtime_state: None,
            last_touched: Utc::now(),
        }
    }
}

/// Counts returned by the clear-storage operation.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ClearSummary {
    pub cleared_session_count: usize,
    pub cleared_customer_count: usize,
    pub cleared_financial_count: usize,
    pub cleared_uploaded_file_count: usize,
}

/// Full contents of the flat repository, for the storage endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StorageSnapshot {
    pub session_count: usize,
    pub customer_info: Vec<Customer>,
    pub financial_data: Vec<FinancialData>,
    pub uploaded_files: Vec<UploadedFile>,
}

/// Process-wide session store and record repository.
///
/// An explicit handle passed through `AppState`, not a hidden global.
/// Everything lives in memory and is lost on restart by design. Sessions
/// are bounded: when `max_sessions` is exceeded the least-recently-touched
/// session is evicted.
pub struct Store {
    sessions: DashMap<String, Session>,
    customers: RwLock<Vec<Customer>>,
    financial: RwLock<Vec<FinancialData>>,
    uploaded_files: RwLock<Vec<UploadedFile>>,
    max_sessions: usize,
}

impl Store {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            customers: RwLock::new(Vec::new()),
            financial: RwLock::new(Vec::new()),
            uploaded_files: RwLock::new(Vec::new()),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Resolve a caller-supplied session id without creating anything.
    ///
    /// Returns the id to use for this call (generated when the caller
    /// omitted one) and a snapshot of the existing session if there is one.
    /// An unknown id is adopted as-is; the session materializes on the
    /// first successful commit, so a failed chat call leaves no ghost
    /// session behind.
    pub fn resolve_session(&self, session_id: Option<&str>) -> (String, Option<Session>) {
        match session_id {
            Some(id) if !id.is_empty() => {
                let snapshot = self.sessions.get_mut(id).map(|mut entry| {
                    entry.last_touched = Utc::now();
                    entry.clone()
                });
                (id.to_string(), snapshot)
            }
            _ => (Uuid::new_v4().to_string(), None),
        }
    }

    /// Read-only lookup for the session-state endpoint.
    pub fn session_snapshot(&self, session_id: &str) -> Option<Session> {
        self.sessions.get_mut(session_id).map(|mut entry| {
            entry.last_touched = Utc::now();
            entry.clone()
        })
    }

    /// Append one turn to a session's history. Never removes prior turns;
    /// creates the session if this is the first write under this id.
    pub fn append_history(&self, session_id: &str, role: ChatRole, message: &str) {
        let mut session = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id.to_string()));
        session.history.push(HistoryTurn::new(role, message));
        session.last_touched = Utc::now();
        drop(session);
        self.evict_over_bound();
    }

    /// Commit the outcome of one successful chat call: both history turns,
    /// every extracted record (folded into the session's buckets and the
    /// flat repository), the uploaded-file record if the call carried file
    /// content, and the runtime's opaque state. Called only after the agent
    /// runtime has answered, so a remote failure mutates nothing.
    ///
    /// The repository locks are awaited before the session entry is taken:
    /// a dashmap shard guard must never be held across a suspension point,
    /// or a parked commit can wedge every worker thread touching that shard.
    pub async fn commit_chat_turn(
        &self,
        session_id: &str,
        user_message: &str,
        reply: &str,
        extracted: Vec<ExtractedRecord>,
        uploaded: Option<UploadedFile>,
        runtime_state: Option<serde_json::Value>,
    ) {
        let mut customers = Vec::new();
        let mut financial = Vec::new();
        let mut files = Vec::new();

        if let Some(file) = uploaded {
            files.push(file);
        }
        for record in extracted {
            match record {
                ExtractedRecord::Customer(mut customer) => {
                    if customer.id.is_nil() {
                        customer.id = Uuid::new_v4();
                    }
                    customer.timestamp.get_or_insert_with(Utc::now);
                    debug!(session_id, customer_id = %customer.id, "storing extracted customer");
                    customers.push(customer);
                }
                ExtractedRecord::Financial(mut data) => {
                    if data.id.is_nil() {
                        data.id = Uuid::new_v4();
                    }
                    data.timestamp.get_or_insert_with(Utc::now);
                    debug!(session_id, record_id = %data.id, "storing extracted financial data");
                    financial.push(data);
                }
                ExtractedRecord::UploadedFile(file) => {
                    files.push(file);
                }
                ExtractedRecord::Unrecognized(value) => {
                    warn!(session_id, "dropping unrecognized extracted record: {}", value);
                }
            }
        }

        if !customers.is_empty() {
            self.customers.write().await.extend(customers.iter().cloned());
        }
        if !financial.is_empty() {
            self.financial.write().await.extend(financial.iter().cloned());
        }
        if !files.is_empty() {
            self.uploaded_files.write().await.extend(files.iter().cloned());
        }

        // Synchronous from here on; no .await while the entry guard is live.
        let mut session = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id.to_string()));
        session
            .history
            .push(HistoryTurn::new(ChatRole::User, user_message));
        session
            .history
            .push(HistoryTurn::new(ChatRole::Assistant, reply));
        session.customer_info.extend(customers);
        session.financial_data.extend(financial);
        session.uploaded_files.extend(files);
        if runtime_state.is_some() {
            session.runtime_state = runtime_state;
        }
        session.last_touched = Utc::now();
        drop(session);
        self.evict_over_bound();
    }

    fn evict_over_bound(&self) {
        while self.sessions.len() > self.max_sessions {
            let oldest = self
                .sessions
                .iter()
                .min_by_key(|entry| entry.last_touched)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(id) => {
                    info!(session_id = %id, "evicting least-recently-touched session");
                    self.sessions.remove(&id);
                }
                None => break,
            }
        }
    }

    /// All customers, insertion order, optionally filtered by category.
    pub async fn list_customers(&self, category: Option<CustomerCategory>) -> Vec<Customer> {
        let customers = self.customers.read().await;
        match category {
            Some(wanted) => customers
                .iter()
                .filter(|c| c.category == Some(wanted))
                .cloned()
                .collect(),
            None => customers.clone(),
        }
    }

    pub async fn get_customer(&self, id: Uuid) -> Option<Customer> {
        self.customers
            .read()
            .await
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    pub async fn customer_stats(&self) -> CustomerStats {
        let customers = self.customers.read().await;
        let mut stats = CustomerStats {
            total: customers.len(),
            ..Default::default()
        };
        for customer in customers.iter() {
            match customer.category {
                Some(CustomerCategory::Prospective) => stats.prospective += 1,
                Some(CustomerCategory::Current) => stats.current += 1,
                Some(CustomerCategory::Inactive) => stats.inactive += 1,
                None => stats.uncategorized += 1,
            }
        }
        stats
    }

    /// Overwrite `category` on every stored customer. Administrative
    /// correction, not a per-record edit.
    pub async fn bulk_set_category(&self, category: CustomerCategory) -> usize {
        let mut customers = self.customers.write().await;
        for customer in customers.iter_mut() {
            customer.category = Some(category);
        }
        info!(category = %category, count = customers.len(), "bulk-updated customer categories");
        customers.len()
    }

    pub async fn list_financial(&self, category: Option<FinancialCategory>) -> Vec<FinancialData> {
        let financial = self.financial.read().await;
        match category {
            Some(wanted) => financial
                .iter()
                .filter(|f| f.category == Some(wanted))
                .cloned()
                .collect(),
            None => financial.clone(),
        }
    }

    pub async fn storage_snapshot(&self) -> StorageSnapshot {
        StorageSnapshot {
            session_count: self.sessions.len(),
            customer_info: self.customers.read().await.clone(),
            financial_data: self.financial.read().await.clone(),
            uploaded_files: self.uploaded_files.read().await.clone(),
        }
    }

    /// Wipe every session and every repository bucket. Irreversible.
    pub async fn clear_all(&self) -> ClearSummary {
        let mut customers = self.customers.write().await;
        let mut financial = self.financial.write().await;
        let mut uploaded = self.uploaded_files.write().await;

        let summary = ClearSummary {
            cleared_session_count: self.sessions.len(),
            cleared_customer_count: customers.len(),
            cleared_financial_count: financial.len(),
            cleared_uploaded_file_count: uploaded.len(),
        };

        self.sessions.clear();
        customers.clear();
        financial.clear();
        uploaded.clear();

        info!(
            sessions = summary.cleared_session_count,
            customers = summary.cleared_customer_count,
            "cleared all storage"
        );
        summary
    }
}
