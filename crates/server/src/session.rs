use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::{AHashMap, AHashSet};
use parking_lot::Mutex;
use tessera_helpers::IndexMap;
use tessera_lib::Program;
use tessera_lib_core::Value;
use tessera_lib_core::bitset::BitSet;
use tessera_lib_core::value::Timestamp;

use crate::privilege::{Category, Privilege, PrivilegeSet};
use crate::transaction::Transaction;
use crate::user::{UserEntry, UserId};

pub type SessionId = u64;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide session-id → usable flag, consulted by the admission gate
/// to fail fast on sessions already poisoned by an unrecoverable error.
static AVAILABILITY: LazyLock<Mutex<AHashMap<SessionId, bool>>> =
    LazyLock::new(Mutex::default);

/// Named session-scoped bitset, created on demand by the query layer.
#[derive(Debug)]
pub struct BitSetVariable {
    name: String,
    table_id: Option<u64>,
    value: BitSet,
}

impl BitSetVariable {
    fn new(name: String) -> BitSetVariable {
        BitSetVariable {
            name,
            table_id: None,
            value: BitSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &BitSet {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut BitSet {
        &mut self.value
    }

    pub fn schema_table_id(&self) -> Option<u64> {
        self.table_id
    }

    pub fn set_schema_table_id(&mut self, table_id: u64) {
        self.table_id = Some(table_id);
    }
}

/// Statement text an administrative tool can sample while it runs.
#[derive(Debug, Clone)]
pub struct CurrentSql {
    pub text: String,
    pub parameters: Option<Vec<Value>>,
}

/// Per-client server state: database binding, identity, the embedded
/// transaction, prepared plans and session-scoped variables.
///
/// A session is mutated only by its owner thread; the one cross-thread
/// window is the current-SQL sample, which sits behind its own latch.
#[derive(Debug)]
pub struct Session {
    transaction: Transaction,
    database_name: String,
    database_id: Option<u64>,
    slave: bool,
    user_name: String,
    user_id: Option<UserId>,
    super_user: bool,
    locked: bool,
    statement_type: i32,
    prepare_ids: AHashSet<i32>,
    prepared_plans: Vec<Option<(Program, String)>>,
    privileges: Option<PrivilegeSet>,
    explain_stack: Vec<u32>,
    start_time: Timestamp,
    bitset_variables: IndexMap<String, BitSetVariable>,
    current_sql: Mutex<Option<CurrentSql>>,
}

impl Session {
    pub fn new(database_name: impl Into<String>) -> Session {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        AVAILABILITY.lock().insert(id, true);
        Session {
            transaction: Transaction::new(id),
            database_name: database_name.into(),
            database_id: None,
            slave: false,
            user_name: String::new(),
            user_id: None,
            super_user: false,
            locked: false,
            statement_type: 0,
            prepare_ids: AHashSet::new(),
            prepared_plans: Vec::new(),
            privileges: None,
            explain_stack: Vec::new(),
            start_time: Timestamp::now(),
            bitset_variables: IndexMap::default(),
            current_sql: Mutex::new(None),
        }
    }

    /// Session id, inherited from the embedded transaction.
    pub fn id(&self) -> SessionId {
        self.transaction.session_id()
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn transaction_mut(&mut self) -> &mut Transaction {
        &mut self.transaction
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    pub fn database_id(&self) -> Option<u64> {
        self.database_id
    }

    pub fn is_slave_database(&self) -> bool {
        self.slave
    }

    pub fn set_database_info(&mut self, database_id: u64, slave: bool) {
        self.database_id = Some(database_id);
        self.slave = slave;
    }

    /// Bind the authenticated identity resolved at admission.
    pub fn set_user(&mut self, name: impl Into<String>, entry: &UserEntry) {
        self.user_name = name.into();
        self.user_id = Some(entry.id());
        self.super_user = entry.is_super_user();
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn is_super_user(&self) -> bool {
        self.super_user
    }

    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    /// Claim the session for one statement. Only one statement may hold the
    /// session at a time.
    pub fn try_lock(&mut self, statement_type: i32) -> bool {
        if self.locked {
            return false;
        }
        self.locked = true;
        self.statement_type = statement_type;
        true
    }

    pub fn unlock(&mut self) {
        self.locked = false;
        self.statement_type = 0;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn statement_type(&self) -> i32 {
        self.statement_type
    }

    pub fn change_statement_type(&mut self, statement_type: i32) {
        if self.locked {
            self.statement_type = statement_type;
        }
    }

    pub fn is_privilege_initialized(&self) -> bool {
        self.privileges.is_some()
    }

    /// Cache the privilege vector loaded from the schema catalog. Loaded on
    /// first use and kept for the session's lifetime.
    pub fn initialize_privilege(&mut self, privileges: PrivilegeSet) {
        self.privileges = Some(privileges);
    }

    pub fn check_privilege(&self, category: Category, mask: Privilege) -> bool {
        if self.super_user {
            return true;
        }
        self.privileges
            .as_ref()
            .is_some_and(|set| set.check(category, mask))
    }

    pub fn push_prepare_id(&mut self, id: i32) {
        self.prepare_ids.insert(id);
    }

    pub fn check_prepare_id(&self, id: i32) -> bool {
        self.prepare_ids.contains(&id)
    }

    pub fn pop_prepare_id(&mut self, id: i32) {
        self.prepare_ids.remove(&id);
    }

    /// Store a prepared plan; ids are slot numbers and stay valid until the
    /// plan is popped.
    pub fn push_prepare_plan(&mut self, program: Program, sql: impl Into<String>) -> i32 {
        let entry = Some((program, sql.into()));
        if let Some(free) = self.prepared_plans.iter().position(Option::is_none) {
            self.prepared_plans[free] = entry;
            return free as i32 + 1;
        }
        self.prepared_plans.push(entry);
        self.prepared_plans.len() as i32
    }

    pub fn get_prepare_plan(&self, id: i32) -> Option<&Program> {
        self.slot(id).map(|(program, _)| program)
    }

    pub fn get_prepare_sql(&self, id: i32) -> Option<&str> {
        self.slot(id).map(|(_, sql)| sql.as_str())
    }

    pub fn pop_prepare_plan(&mut self, id: i32) {
        if id >= 1 {
            if let Some(slot) = self.prepared_plans.get_mut(id as usize - 1) {
                *slot = None;
            }
        }
    }

    fn slot(&self, id: i32) -> Option<&(Program, String)> {
        if id < 1 {
            return None;
        }
        self.prepared_plans.get(id as usize - 1)?.as_ref()
    }

    /// Create (or return) the named session-scoped bitset.
    pub fn generate_bitset_variable(&mut self, name: &str) -> &mut BitSetVariable {
        self.bitset_variables
            .entry(name.to_owned())
            .or_insert_with(|| BitSetVariable::new(name.to_owned()))
    }

    pub fn get_bitset_variable(&self, name: &str) -> Option<&BitSetVariable> {
        self.bitset_variables.get(name)
    }

    pub fn start_explain(&mut self, option: u32) {
        self.explain_stack.push(option);
    }

    pub fn end_explain(&mut self) {
        self.explain_stack.pop();
    }

    pub fn explain_option(&self) -> Option<u32> {
        self.explain_stack.last().copied()
    }

    /// Publish the in-flight statement for administrative sampling. The
    /// caller that owns the statement clears it with [`Session::clear_current_sql`].
    pub fn set_current_sql(&self, text: impl Into<String>, parameters: Option<Vec<Value>>) {
        *self.current_sql.lock() = Some(CurrentSql {
            text: text.into(),
            parameters,
        });
    }

    pub fn clear_current_sql(&self) {
        *self.current_sql.lock() = None;
    }

    /// Sample the in-flight statement; the returned copy is the caller's.
    pub fn current_sql(&self) -> Option<String> {
        self.current_sql.lock().as_ref().map(|sql| sql.text.clone())
    }

    pub fn is_available(&self) -> bool {
        Session::availability(self.id())
    }

    /// Mark a session usable or poisoned; returns the previous flag.
    pub fn set_availability(id: SessionId, usable: bool) -> bool {
        AVAILABILITY.lock().insert(id, usable).unwrap_or(true)
    }

    /// A session unknown to the map counts as usable.
    pub fn availability(id: SessionId) -> bool {
        AVAILABILITY.lock().get(&id).copied().unwrap_or(true)
    }

    pub fn erase_availability(id: SessionId) {
        AVAILABILITY.lock().remove(&id);
    }

    pub fn clear_availability() {
        AVAILABILITY.lock().clear();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        Session::erase_availability(self.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_lock_is_exclusive() {
        let mut session = Session::new("db");
        assert!(session.try_lock(1));
        assert!(!session.try_lock(2));
        assert_eq!(session.statement_type(), 1);

        session.change_statement_type(3);
        assert_eq!(session.statement_type(), 3);

        session.unlock();
        assert!(!session.is_locked());
        assert!(session.try_lock(2));
    }

    #[test]
    fn prepared_plan_slots_are_stable_and_reusable() {
        let mut session = Session::new("db");
        let first = session.push_prepare_plan(Program::new(), "select 1");
        let second = session.push_prepare_plan(Program::new(), "select 2");
        assert_ne!(first, second);

        assert_eq!(session.get_prepare_sql(first), Some("select 1"));
        session.pop_prepare_plan(first);
        assert!(session.get_prepare_plan(first).is_none());
        assert_eq!(session.get_prepare_sql(second), Some("select 2"));

        // The freed slot is handed out again.
        let third = session.push_prepare_plan(Program::new(), "select 3");
        assert_eq!(third, first);
    }

    #[test]
    fn availability_map_lifecycle() {
        let session = Session::new("db");
        let id = session.id();
        assert!(session.is_available());

        assert!(Session::set_availability(id, false));
        assert!(!Session::availability(id));

        drop(session);
        // Unknown sessions read as usable again.
        assert!(Session::availability(id));
    }

    #[test]
    fn bitset_variables_are_created_on_demand() {
        let mut session = Session::new("db");
        assert!(session.get_bitset_variable("returning").is_none());

        session
            .generate_bitset_variable("returning")
            .value_mut()
            .set(42);
        session
            .generate_bitset_variable("returning")
            .set_schema_table_id(7);

        let variable = session.get_bitset_variable("returning").unwrap();
        assert!(variable.value().test(42));
        assert_eq!(variable.schema_table_id(), Some(7));
        assert_eq!(variable.name(), "returning");
    }

    #[test]
    fn current_sql_sampling() {
        let session = Session::new("db");
        assert!(session.current_sql().is_none());

        session.set_current_sql("select * from t", None);
        assert_eq!(session.current_sql().as_deref(), Some("select * from t"));

        session.clear_current_sql();
        assert!(session.current_sql().is_none());
    }

    #[test]
    fn explain_options_nest() {
        let mut session = Session::new("db");
        assert_eq!(session.explain_option(), None);
        session.start_explain(1);
        session.start_explain(3);
        assert_eq!(session.explain_option(), Some(3));
        session.end_explain();
        assert_eq!(session.explain_option(), Some(1));
        session.end_explain();
        assert_eq!(session.explain_option(), None);
    }
}
